use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransferType {
    /// Buy: fiat in, crypto out.
    TransferIn,
    /// Sell / withdraw: crypto in, fiat out.
    #[default]
    TransferOut,
}

impl TransferType {
    pub fn order_type(&self) -> OrderType {
        match self {
            TransferType::TransferIn => OrderType::Buying,
            TransferType::TransferOut => OrderType::Selling,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Buying,
    Selling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub exchange: Decimal,
}

/// Body sent to the quote backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub address: String,
    pub country: String,
    pub crypto_amount: String,
    pub crypto_type: String,
    pub fiat_type: String,
    pub network: String,
}

/// Priced offer returned by the quote backend. Never mutated once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub quote_id: String,
    pub transfer_type: TransferType,
    #[serde(default)]
    pub fiat_type: String,
    #[serde(default)]
    pub crypto_type: String,
    #[serde(default)]
    pub fiat_amount: Option<Decimal>,
    #[serde(default)]
    pub crypto_amount: Option<Decimal>,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub quote: Quote,
}

/// Transfer states reported by the status backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    TransferStarted,
    #[serde(alias = "Processing")]
    TransferProcessing,
    TransferWaitingForUserAction,
    TransferReceivedFiatFunds,
    TransferComplete,
    TransferFailed,
    TransferRefunded,
    TransferExpired,
    #[serde(other)]
    Unknown,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::TransferComplete
                | TransferState::TransferFailed
                | TransferState::TransferRefunded
                | TransferState::TransferExpired
        )
    }

    pub fn is_success(&self) -> bool {
        *self == TransferState::TransferComplete
    }
}

/// A submitted transfer. Its status only changes through polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub transfer_id: String,
    pub status: TransferState,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
}

/// One answer from the status backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStatus {
    pub transfer_id: String,
    pub status: TransferState,
    #[serde(default)]
    pub transfer_type: Option<TransferType>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub amount_provided: Option<Decimal>,
    #[serde(default)]
    pub fiat_type: Option<String>,
    #[serde(default)]
    pub crypto_type: Option<String>,
}

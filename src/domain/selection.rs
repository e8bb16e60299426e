use super::country::Country;
use super::quote::TransferType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Bank,
    Momo,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Bank => "bank",
            PaymentMethod::Momo => "momo",
        }
    }
}

/// A bank or mobile-money operator in a given country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub account_number_type: Option<String>,
}

impl Institution {
    /// Payment rail implied by the institution's type, falling back to its account number type.
    pub fn payment_method(&self) -> PaymentMethod {
        let kind = self
            .r#type
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.account_number_type.as_deref())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if kind.contains("mobile") || kind == "momo" {
            PaymentMethod::Momo
        } else {
            PaymentMethod::Bank
        }
    }
}

/// Ordered lifecycle of one payment. Only moves forward until reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LifecyclePhase {
    #[default]
    Initial,
    GotQuote,
    ProcessingPayment,
    GotTransfer,
    PaymentCompleted,
    PaymentFailed,
}

impl LifecyclePhase {
    fn rank(&self) -> u8 {
        match self {
            LifecyclePhase::Initial => 0,
            LifecyclePhase::GotQuote => 1,
            LifecyclePhase::ProcessingPayment => 2,
            LifecyclePhase::GotTransfer => 3,
            LifecyclePhase::PaymentCompleted | LifecyclePhase::PaymentFailed => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecyclePhase::PaymentCompleted | LifecyclePhase::PaymentFailed
        )
    }

    pub fn can_advance_to(&self, next: LifecyclePhase) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

/// The user's in-progress choices for one payment.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct SessionSelection {
    pub direction: TransferType,
    pub country: Option<Country>,
    pub asset: Option<String>,
    pub network: Option<String>,
    pub institution: Option<Institution>,
    pub payment_method: Option<PaymentMethod>,
    pub account_number: String,
    pub account_name: Option<String>,
    pub use_kyc_name_as_account_name: bool,
    /// Connected wallet.
    pub wallet_address: Option<String>,
    /// Destination pasted by the user on the buy tab.
    pub pasted_address: Option<String>,
    pub phase: LifecyclePhase,
}

impl SessionSelection {
    /// Address that should receive crypto or send it, depending on direction.
    pub fn effective_address(&self) -> Option<&str> {
        match self.direction {
            TransferType::TransferIn => self
                .pasted_address
                .as_deref()
                .filter(|a| !a.is_empty())
                .or(self.wallet_address.as_deref()),
            TransferType::TransferOut => self.wallet_address.as_deref(),
        }
    }

    pub fn country_code(&self) -> Option<&str> {
        self.country.as_ref().map(|c| c.country_code.as_str())
    }
}

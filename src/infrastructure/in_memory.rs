use crate::domain::amount::{convert, parse_unrounded};
use crate::domain::kyc::KycRecord;
use crate::domain::payload::RequestPayload;
use crate::domain::ports::{
    BackendResult, InstitutionDirectory, KycProvider, QuoteBackend, RateProvider, TransferBackend,
};
use crate::domain::quote::{
    ExchangeRate, OrderType, Quote, QuoteRequest, QuoteResponse, Transfer, TransferState,
    TransferStatus, TransferType,
};
use crate::domain::selection::{Institution, PaymentMethod};
use crate::error::BackendError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// One scripted answer from the status backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusStep {
    Status(TransferState),
    Error(BackendError),
}

#[derive(Debug, Default)]
struct BackendState {
    rates: HashMap<String, Decimal>,
    rate_failure: Option<BackendError>,
    institutions: HashMap<String, Vec<Institution>>,
    institution_failures: HashMap<String, BackendError>,
    institution_calls: HashMap<String, usize>,
    kyc: HashMap<String, KycRecord>,
    quote_rejection: Option<BackendError>,
    transfer_failure: Option<BackendError>,
    statuses: HashMap<String, VecDeque<StatusStep>>,
    transfers: HashMap<String, Transfer>,
    payloads: Vec<RequestPayload>,
    latency: Option<Duration>,
}

/// Scripted stand-in for every backend port.
///
/// Rates, KYC records and transfer statuses are set up front; quote and
/// transfer ids are handed out as `quote-N` and `transfer-N`. A status script
/// is consumed one step per poll and its last step repeats forever.
#[derive(Default, Clone)]
pub struct InMemoryBackend {
    state: Arc<RwLock<BackendState>>,
    rate_calls: Arc<AtomicUsize>,
    quotes_created: Arc<AtomicUsize>,
    transfers_created: Arc<AtomicUsize>,
    status_calls: Arc<AtomicUsize>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_rate(&self, country: &str, rate: Decimal) {
        let mut state = self.state.write().await;
        state.rates.insert(country.to_string(), rate);
        state.rate_failure = None;
    }

    /// Every rate lookup fails with `err` until a rate is set again.
    pub async fn fail_rates(&self, err: BackendError) {
        self.state.write().await.rate_failure = Some(err);
    }

    pub async fn set_institutions(&self, country: &str, institutions: Vec<Institution>) {
        self.state
            .write()
            .await
            .institutions
            .insert(country.to_string(), institutions);
    }

    pub async fn fail_institutions(&self, country: &str, err: BackendError) {
        self.state
            .write()
            .await
            .institution_failures
            .insert(country.to_string(), err);
    }

    pub async fn set_kyc(&self, wallet: &str, record: KycRecord) {
        self.state
            .write()
            .await
            .kyc
            .insert(wallet.to_string(), record);
    }

    pub async fn clear_kyc(&self, wallet: &str) {
        self.state.write().await.kyc.remove(wallet);
    }

    pub async fn reject_quotes(&self, err: BackendError) {
        self.state.write().await.quote_rejection = Some(err);
    }

    pub async fn fail_transfers(&self, err: BackendError) {
        self.state.write().await.transfer_failure = Some(err);
    }

    pub async fn script_statuses(&self, transfer_id: &str, steps: Vec<StatusStep>) {
        self.state
            .write()
            .await
            .statuses
            .insert(transfer_id.to_string(), steps.into());
    }

    /// Delay applied to quote and transfer creation.
    pub async fn set_latency(&self, latency: Duration) {
        self.state.write().await.latency = Some(latency);
    }

    pub async fn submitted_payloads(&self) -> Vec<RequestPayload> {
        self.state.read().await.payloads.clone()
    }

    pub async fn institution_calls(&self, country: &str) -> usize {
        self.state
            .read()
            .await
            .institution_calls
            .get(country)
            .copied()
            .unwrap_or_default()
    }

    pub fn rate_calls(&self) -> usize {
        self.rate_calls.load(Ordering::SeqCst)
    }

    pub fn quotes_created(&self) -> usize {
        self.quotes_created.load(Ordering::SeqCst)
    }

    pub fn transfers_created(&self) -> usize {
        self.transfers_created.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        let latency = self.state.read().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn create_quote(
        &self,
        request: QuoteRequest,
        transfer_type: TransferType,
    ) -> BackendResult<QuoteResponse> {
        self.simulate_latency().await;
        let state = self.state.read().await;
        if let Some(err) = &state.quote_rejection {
            return Err(err.clone());
        }
        let crypto_amount = parse_unrounded(&request.crypto_amount);
        let fiat_amount = crypto_amount
            .zip(state.rates.get(&request.country).copied())
            .map(|(amount, rate)| convert(amount, rate));
        let n = self.quotes_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(QuoteResponse {
            quote: Quote {
                quote_id: format!("quote-{}", n),
                transfer_type,
                fiat_type: request.fiat_type,
                crypto_type: request.crypto_type,
                fiat_amount,
                crypto_amount,
                fee: None,
                expires_at: None,
            },
        })
    }

    async fn create_transfer(&self, payload: RequestPayload) -> BackendResult<Transfer> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        if let Some(err) = &state.transfer_failure {
            return Err(err.clone());
        }
        let n = self.transfers_created.fetch_add(1, Ordering::SeqCst) + 1;
        let transfer = Transfer {
            transfer_id: format!("transfer-{}", n),
            status: TransferState::TransferStarted,
            tx_hash: None,
            operator: Some(payload.operator.clone()),
            account_number: None,
        };
        state
            .transfers
            .insert(transfer.transfer_id.clone(), transfer.clone());
        state.payloads.push(payload);
        Ok(transfer)
    }
}

#[async_trait]
impl RateProvider for InMemoryBackend {
    async fn country_exchange_rate(
        &self,
        country: &str,
        _order_type: OrderType,
        _provider_type: PaymentMethod,
    ) -> BackendResult<ExchangeRate> {
        self.rate_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        if let Some(err) = &state.rate_failure {
            return Err(err.clone());
        }
        state
            .rates
            .get(country)
            .map(|exchange| ExchangeRate {
                exchange: *exchange,
            })
            .ok_or_else(|| BackendError::NotFound(format!("no rate for {}", country)))
    }
}

#[async_trait]
impl InstitutionDirectory for InMemoryBackend {
    async fn institutions(
        &self,
        country_code: &str,
        _order_type: OrderType,
    ) -> BackendResult<Vec<Institution>> {
        let mut state = self.state.write().await;
        *state
            .institution_calls
            .entry(country_code.to_string())
            .or_default() += 1;
        if let Some(err) = state.institution_failures.get(country_code) {
            return Err(err.clone());
        }
        Ok(state
            .institutions
            .get(country_code)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl QuoteBackend for InMemoryBackend {
    async fn create_quote_in(&self, request: QuoteRequest) -> BackendResult<QuoteResponse> {
        self.create_quote(request, TransferType::TransferIn).await
    }

    async fn create_quote_out(&self, request: QuoteRequest) -> BackendResult<QuoteResponse> {
        self.create_quote(request, TransferType::TransferOut).await
    }
}

#[async_trait]
impl TransferBackend for InMemoryBackend {
    async fn create_transfer_in(&self, payload: RequestPayload) -> BackendResult<Transfer> {
        self.create_transfer(payload).await
    }

    async fn create_transfer_out(&self, payload: RequestPayload) -> BackendResult<Transfer> {
        self.create_transfer(payload).await
    }

    async fn transfer_status(&self, transfer_id: &str) -> BackendResult<TransferStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;
        let step = match state.statuses.get_mut(transfer_id) {
            Some(steps) if steps.len() > 1 => steps.pop_front(),
            Some(steps) => steps.front().cloned(),
            None => None,
        };
        let status = match step {
            Some(StatusStep::Status(status)) => status,
            Some(StatusStep::Error(err)) => return Err(err),
            None => state
                .transfers
                .get(transfer_id)
                .map(|t| t.status)
                .ok_or_else(|| BackendError::NotFound(transfer_id.to_string()))?,
        };
        if let Some(transfer) = state.transfers.get_mut(transfer_id) {
            transfer.status = status;
        }
        Ok(TransferStatus {
            transfer_id: transfer_id.to_string(),
            status,
            transfer_type: None,
            tx_hash: status.is_success().then(|| format!("0x{}", transfer_id)),
            amount_provided: None,
            fiat_type: None,
            crypto_type: None,
        })
    }
}

#[async_trait]
impl KycProvider for InMemoryBackend {
    async fn kyc(&self, wallet_address: &str) -> BackendResult<Option<KycRecord>> {
        Ok(self.state.read().await.kyc.get(wallet_address).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payload::{BankDetails, Recipient, UserDetails};
    use rust_decimal_macros::dec;

    fn payload() -> RequestPayload {
        RequestPayload {
            recipient: Recipient::Bank {
                bank: BankDetails::default(),
            },
            operator: "bank".to_string(),
            quote_id: Some("quote-1".to_string()),
            user_details: UserDetails {
                name: "Ada".to_string(),
                country: "NG".to_string(),
                address: "Nigeria".to_string(),
                phone: "+234800".to_string(),
                dob: "1990-01-01".to_string(),
                id_number: "1".to_string(),
                id_type: "NIN".to_string(),
                additional_id_type: "NIN".to_string(),
                additional_id_number: "BVN".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_quote_is_priced_from_rate() {
        let backend = InMemoryBackend::new();
        backend.set_rate("KE", dec!(130)).await;
        let response = backend
            .create_quote_out(QuoteRequest {
                address: "0xabc".to_string(),
                country: "KE".to_string(),
                crypto_amount: "12.5".to_string(),
                crypto_type: "USDC".to_string(),
                fiat_type: "KES".to_string(),
                network: "base".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.quote.quote_id, "quote-1");
        assert_eq!(response.quote.fiat_amount, Some(dec!(1625.00)));
        assert_eq!(backend.quotes_created(), 1);
    }

    #[tokio::test]
    async fn test_status_script_repeats_last_step() {
        let backend = InMemoryBackend::new();
        let transfer = backend.create_transfer_out(payload()).await.unwrap();
        backend
            .script_statuses(
                &transfer.transfer_id,
                vec![
                    StatusStep::Error(BackendError::Timeout),
                    StatusStep::Status(TransferState::TransferComplete),
                ],
            )
            .await;

        assert_eq!(
            backend.transfer_status("transfer-1").await,
            Err(BackendError::Timeout)
        );
        for _ in 0..2 {
            let status = backend.transfer_status("transfer-1").await.unwrap();
            assert_eq!(status.status, TransferState::TransferComplete);
            assert!(status.tx_hash.is_some());
        }
        assert_eq!(backend.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_unscripted_status_reports_stored_transfer() {
        let backend = InMemoryBackend::new();
        backend.create_transfer_in(payload()).await.unwrap();
        let status = backend.transfer_status("transfer-1").await.unwrap();
        assert_eq!(status.status, TransferState::TransferStarted);
        assert_eq!(
            backend.transfer_status("transfer-9").await,
            Err(BackendError::NotFound("transfer-9".to_string()))
        );
    }
}

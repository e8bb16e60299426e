use super::kyc::KycRecord;
use super::payload::RequestPayload;
use super::quote::{ExchangeRate, OrderType, QuoteRequest, QuoteResponse, Transfer, TransferStatus};
use super::selection::{Institution, PaymentMethod};
use crate::error::BackendError;
use async_trait::async_trait;
use std::sync::Arc;

pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn country_exchange_rate(
        &self,
        country: &str,
        order_type: OrderType,
        provider_type: PaymentMethod,
    ) -> BackendResult<ExchangeRate>;
}

#[async_trait]
pub trait InstitutionDirectory: Send + Sync {
    async fn institutions(
        &self,
        country_code: &str,
        order_type: OrderType,
    ) -> BackendResult<Vec<Institution>>;
}

#[async_trait]
pub trait QuoteBackend: Send + Sync {
    async fn create_quote_in(&self, request: QuoteRequest) -> BackendResult<QuoteResponse>;
    async fn create_quote_out(&self, request: QuoteRequest) -> BackendResult<QuoteResponse>;
}

#[async_trait]
pub trait TransferBackend: Send + Sync {
    async fn create_transfer_in(&self, payload: RequestPayload) -> BackendResult<Transfer>;
    async fn create_transfer_out(&self, payload: RequestPayload) -> BackendResult<Transfer>;
    async fn transfer_status(&self, transfer_id: &str) -> BackendResult<TransferStatus>;
}

#[async_trait]
pub trait KycProvider: Send + Sync {
    async fn kyc(&self, wallet_address: &str) -> BackendResult<Option<KycRecord>>;
}

pub type RateProviderRef = Arc<dyn RateProvider>;
pub type InstitutionDirectoryRef = Arc<dyn InstitutionDirectory>;
pub type QuoteBackendRef = Arc<dyn QuoteBackend>;
pub type TransferBackendRef = Arc<dyn TransferBackend>;
pub type KycProviderRef = Arc<dyn KycProvider>;

use crate::application::converter::Converter;
use crate::application::gate::IdentityGate;
use crate::application::orchestrator::{Orchestrator, QuoteOutcome};
use crate::application::poller::{PollOutcome, StatusPoller};
use crate::application::prefetch::Prefetcher;
use crate::application::session::{SelectionWriter, SessionReader, SessionSnapshot, SessionStore};
use crate::config::EngineConfig;
use crate::domain::amount::AmountValidator;
use crate::domain::country::Country;
use crate::domain::kyc::GateResult;
use crate::domain::ports::{
    InstitutionDirectory, InstitutionDirectoryRef, KycProvider, KycProviderRef, QuoteBackend,
    QuoteBackendRef, RateProvider, RateProviderRef, TransferBackend, TransferBackendRef,
};
use crate::domain::quote::{Transfer, TransferType};
use crate::domain::selection::{Institution, LifecyclePhase, PaymentMethod};
use crate::error::{PayloadError, RampError, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// The backend ports one session talks to.
#[derive(Clone)]
pub struct Backends {
    pub rates: RateProviderRef,
    pub institutions: InstitutionDirectoryRef,
    pub quotes: QuoteBackendRef,
    pub transfers: TransferBackendRef,
    pub kyc: KycProviderRef,
}

impl Backends {
    /// Uses one implementation for every port.
    pub fn shared<B>(backend: Arc<B>) -> Self
    where
        B: RateProvider + InstitutionDirectory + QuoteBackend + TransferBackend + KycProvider + 'static,
    {
        Self {
            rates: backend.clone(),
            institutions: backend.clone(),
            quotes: backend.clone(),
            transfers: backend.clone(),
            kyc: backend,
        }
    }
}

/// Entry point for one user session: user actions in, snapshots out.
pub struct RampSession {
    store: SessionStore,
    reader: SessionReader,
    selection: SelectionWriter,
    converter: Converter,
    gate: Arc<IdentityGate>,
    orchestrator: Orchestrator,
    poller: Arc<StatusPoller>,
    prefetcher: Prefetcher,
}

impl RampSession {
    pub fn new(config: EngineConfig, backends: Backends) -> Self {
        let store = SessionStore::new(AmountValidator::new(config.global_bounds));
        let reader = store.reader();
        let gate = Arc::new(IdentityGate::new(
            backends.kyc.clone(),
            store.reader(),
            store.kyc_writer(),
        ));
        Self {
            converter: Converter::new(
                backends.rates.clone(),
                store.reader(),
                store.rate_writer(),
                config.rate_retry,
            ),
            orchestrator: Orchestrator::new(
                backends.quotes.clone(),
                backends.transfers.clone(),
                gate.clone(),
                store.reader(),
                store.lifecycle_writer(),
                config.support_email.clone(),
                config.default_asset.clone(),
            ),
            poller: Arc::new(StatusPoller::new(
                backends.transfers.clone(),
                store.reader(),
                store.lifecycle_writer(),
                config.poll_interval,
                config.support_email.clone(),
            )),
            prefetcher: Prefetcher::new(
                backends.rates,
                backends.institutions,
                config.supported_countries.clone(),
                config.rate_prefetch_retry,
                config.institution_prefetch_retry,
            ),
            selection: store.selection_writer(),
            reader,
            gate,
            store,
        }
    }

    pub fn reader(&self) -> SessionReader {
        self.store.reader()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.reader.snapshot().await
    }

    pub async fn select_direction(&self, direction: TransferType) -> Result<Option<Decimal>> {
        self.selection.set_direction(direction).await;
        self.converter.refresh().await
    }

    /// Also refreshes the rate; the returned error is the rate failure, if any.
    pub async fn select_country(&self, country: Country) -> Result<Option<Decimal>> {
        self.selection.select_country(country).await;
        self.converter.refresh().await
    }

    pub async fn select_institution(&self, institution: Institution) -> Result<Option<Decimal>> {
        self.selection.select_institution(institution).await;
        self.converter.refresh().await
    }

    /// Rates of every supported country for the current direction, for the country picker.
    pub async fn rate_board(&self, method: PaymentMethod) -> HashMap<String, Decimal> {
        let order_type = self.reader.selection().await.direction.order_type();
        self.prefetcher.prefetch_rates(order_type, method).await
    }

    /// Institutions offered in the selected country for the current direction.
    pub async fn institutions(&self) -> Vec<Institution> {
        let selection = self.reader.selection().await;
        match selection.country_code() {
            Some(country) => {
                self.prefetcher
                    .institutions_for(country, selection.direction.order_type())
                    .await
            }
            None => Vec::new(),
        }
    }

    /// Picks an institution by code from the selected country's list.
    pub async fn select_institution_code(&self, code: &str) -> Result<Option<Decimal>> {
        let institution = self
            .institutions()
            .await
            .into_iter()
            .find(|institution| institution.code == code)
            .ok_or(PayloadError::MissingInstitution)?;
        self.select_institution(institution).await
    }

    pub async fn clear_institution(&self) {
        self.selection.clear_institution().await;
    }

    pub async fn enter_amount(&self, raw: &str) {
        self.selection.set_amount(raw).await;
    }

    pub async fn set_account_number(&self, account_number: &str) {
        self.selection.set_account_number(account_number).await;
    }

    pub async fn set_account_name(&self, name: Option<String>, use_kyc_name: bool) {
        self.selection.set_account_name(name, use_kyc_name).await;
    }

    pub async fn select_asset(&self, asset: &str, network: &str) {
        self.selection.select_asset(asset, network).await;
    }

    pub async fn paste_address(&self, address: Option<String>) {
        self.selection.set_pasted_address(address).await;
    }

    pub async fn connect_wallet(&self, address: &str) -> Result<GateResult> {
        self.selection.connect_wallet(address).await;
        self.gate.refresh().await
    }

    pub async fn refresh_kyc(&self) -> Result<GateResult> {
        self.gate.refresh().await
    }

    pub async fn disconnect_wallet(&self) {
        self.selection.disconnect_wallet().await;
        self.gate.disconnect().await;
    }

    pub async fn submit(&self) -> Result<QuoteOutcome> {
        self.orchestrator.request_quote().await
    }

    pub async fn confirm(&self) -> Result<Transfer> {
        self.orchestrator.confirm_payment().await
    }

    async fn current_transfer(&self) -> Result<Transfer> {
        match self.reader.transfer().await {
            Some(transfer) => Ok(transfer),
            None => Err(RampError::InvalidTransition {
                from: self.reader.phase().await,
                to: LifecyclePhase::PaymentCompleted,
            }),
        }
    }

    /// Polls the current transfer in a background task.
    pub async fn start_polling(&self) -> Result<JoinHandle<Result<PollOutcome>>> {
        let transfer = self.current_transfer().await?;
        info!(transfer_id = %transfer.transfer_id, "polling started");
        let poller = self.poller.clone();
        Ok(tokio::spawn(async move {
            poller.run(&transfer.transfer_id).await
        }))
    }

    /// Polls the current transfer to completion on the caller's task.
    pub async fn track(&self) -> Result<PollOutcome> {
        let transfer = self.current_transfer().await?;
        self.poller.run(&transfer.transfer_id).await
    }

    pub async fn new_payment(&self) {
        self.orchestrator.new_payment().await;
    }
}

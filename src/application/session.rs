use crate::domain::amount::{AmountValidator, convert};
use crate::domain::country::Country;
use crate::domain::kyc::{GateResult, KycRecord, KycStatus, check_gate};
use crate::domain::quote::{OrderType, Quote, Transfer, TransferState, TransferStatus, TransferType};
use crate::domain::selection::{Institution, LifecyclePhase, PaymentMethod, SessionSelection};
use crate::error::{RampError, Result, ValidationError};
use rust_decimal::Decimal;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Amount as entered plus everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AmountState {
    pub raw: String,
    pub normalized: String,
    pub crypto_amount: Option<Decimal>,
    pub fiat_amount: Option<Decimal>,
    pub is_valid: bool,
    pub message: Option<String>,
    #[serde(skip)]
    pub error: Option<ValidationError>,
}

impl AmountState {
    /// The reason the amount cannot be submitted, if any.
    pub fn validation_error(&self) -> Option<ValidationError> {
        if self.is_valid {
            None
        } else {
            Some(self.error.clone().unwrap_or(ValidationError::InvalidNumber))
        }
    }
}

/// What a rate was fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateKey {
    pub country: String,
    pub order_type: OrderType,
    pub method: PaymentMethod,
}

impl RateKey {
    /// Key of the current selection, if country and payment method are known.
    pub fn for_selection(selection: &SessionSelection) -> Option<Self> {
        Some(Self {
            country: selection.country_code()?.to_string(),
            order_type: selection.direction.order_type(),
            method: selection.payment_method?,
        })
    }
}

/// Last known exchange rate, tagged with the key it was fetched for.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub enum RateState {
    #[default]
    Unknown,
    Ready { key: RateKey, rate: Decimal },
    Failed { key: RateKey, reason: String },
}

impl RateState {
    /// Rate usable for `key`. Anything else fails closed.
    pub fn rate_for(&self, key: Option<&RateKey>) -> Option<Decimal> {
        match self {
            RateState::Ready { key: k, rate } if Some(k) == key => Some(*rate),
            _ => None,
        }
    }

    fn key(&self) -> Option<&RateKey> {
        match self {
            RateState::Ready { key, .. } | RateState::Failed { key, .. } => Some(key),
            RateState::Unknown => None,
        }
    }
}

/// Human-readable reason a payment failed, with a way to reach support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    pub reason: String,
    pub transfer_id: Option<String>,
    pub support_link: String,
}

impl FailureReport {
    pub fn new(reason: impl Into<String>, transfer_id: Option<String>, support_email: &str) -> Self {
        let subject_id = transfer_id.clone().unwrap_or_else(|| "unknown".to_string());
        Self {
            reason: reason.into(),
            support_link: format!(
                "mailto:{}?subject=Support Request for Transaction {}",
                support_email, subject_id
            ),
            transfer_id,
        }
    }

    pub fn for_terminal_status(state: TransferState, transfer_id: &str, support_email: &str) -> Self {
        let reason = match state {
            TransferState::TransferRefunded => "Transfer was refunded",
            TransferState::TransferExpired => "Transfer expired before funds were received",
            _ => "Transfer failed",
        };
        Self::new(reason, Some(transfer_id.to_string()), support_email)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub seq: usize,
    pub phase: LifecyclePhase,
    pub status: Option<TransferState>,
    pub note: String,
}

/// Read-only projection handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub epoch: u64,
    pub selection: SessionSelection,
    pub amount: AmountState,
    pub rate: RateState,
    pub kyc_status: Option<KycStatus>,
    pub gate: GateResult,
    pub verification_link: Option<String>,
    pub quote: Option<Quote>,
    pub transfer: Option<Transfer>,
    pub failure: Option<FailureReport>,
    pub timeline: Vec<TimelineEntry>,
}

impl SessionSnapshot {
    pub fn phase(&self) -> LifecyclePhase {
        self.selection.phase
    }
}

#[derive(Debug)]
struct SessionState {
    epoch: u64,
    cancel: CancellationToken,
    selection: SessionSelection,
    amount: AmountState,
    rate: RateState,
    /// KYC record and the wallet it was fetched for.
    kyc: Option<(String, KycRecord)>,
    quote: Option<Quote>,
    transfer: Option<Transfer>,
    failure: Option<FailureReport>,
    timeline: Vec<TimelineEntry>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            epoch: 0,
            cancel: CancellationToken::new(),
            selection: SessionSelection::default(),
            amount: AmountState::default(),
            rate: RateState::Unknown,
            kyc: None,
            quote: None,
            transfer: None,
            failure: None,
            timeline: Vec::new(),
        }
    }

    /// Cancels everything in flight and starts a new epoch.
    fn invalidate(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.epoch += 1;
    }

    /// The KYC record, only while its wallet is still the connected one.
    fn current_kyc(&self) -> Option<&KycRecord> {
        match (&self.kyc, &self.selection.wallet_address) {
            (Some((owner, record)), Some(wallet)) if owner == wallet => Some(record),
            _ => None,
        }
    }

    fn guard(&self) -> EpochGuard {
        EpochGuard {
            epoch: self.epoch,
            token: self.cancel.clone(),
        }
    }

    fn check(&self, guard: &EpochGuard) -> Result<()> {
        if guard.epoch == self.epoch {
            Ok(())
        } else {
            debug!(stale = guard.epoch, current = self.epoch, "discarding stale response");
            Err(RampError::StaleSession)
        }
    }

    /// Re-derives amount validity and conversions from the tracked inputs.
    fn recompute(&mut self, validator: &AmountValidator) {
        let check = validator.validate(&self.amount.raw, self.selection.country.as_ref());
        let rate = self
            .rate
            .rate_for(RateKey::for_selection(&self.selection).as_ref());
        self.amount = AmountState {
            raw: std::mem::take(&mut self.amount.raw),
            normalized: check.normalized,
            crypto_amount: check.value,
            fiat_amount: check.value.zip(rate).map(|(value, rate)| convert(value, rate)),
            is_valid: check.is_valid,
            message: check.message,
            error: check.error,
        };
    }

    fn push_timeline(&mut self, status: Option<TransferState>, note: impl Into<String>) {
        let entry = TimelineEntry {
            seq: self.timeline.len() + 1,
            phase: self.selection.phase,
            status,
            note: note.into(),
        };
        self.timeline.push(entry);
    }

    fn advance(&mut self, next: LifecyclePhase) -> Result<()> {
        let current = self.selection.phase;
        if !current.can_advance_to(next) {
            return Err(RampError::InvalidTransition {
                from: current,
                to: next,
            });
        }
        info!(from = ?current, to = ?next, "lifecycle transition");
        self.selection.phase = next;
        Ok(())
    }

    fn snapshot(&self) -> SessionSnapshot {
        let kyc = self.current_kyc();
        SessionSnapshot {
            epoch: self.epoch,
            selection: self.selection.clone(),
            amount: self.amount.clone(),
            rate: self.rate.clone(),
            kyc_status: kyc.map(|k| k.kyc_status),
            gate: check_gate(kyc),
            verification_link: kyc.and_then(|k| k.verification_link.clone()),
            quote: self.quote.clone(),
            transfer: self.transfer.clone(),
            failure: self.failure.clone(),
            timeline: self.timeline.clone(),
        }
    }
}

/// Ties an async operation to the session epoch it started in.
#[derive(Debug, Clone)]
pub struct EpochGuard {
    epoch: u64,
    token: CancellationToken,
}

impl EpochGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Awaits `fut` unless the session is reset first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        tokio::select! {
            _ = self.token.cancelled() => Err(RampError::StaleSession),
            output = fut => Ok(output),
        }
    }
}

/// Owned application state for one user session.
///
/// Components never touch the state directly: each gets the view for the
/// fields it owns, and everybody may take a [`SessionReader`].
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionState>>,
    validator: Arc<AmountValidator>,
}

impl SessionStore {
    pub fn new(validator: AmountValidator) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState::new())),
            validator: Arc::new(validator),
        }
    }

    pub fn reader(&self) -> SessionReader {
        SessionReader {
            inner: self.inner.clone(),
        }
    }

    pub fn selection_writer(&self) -> SelectionWriter {
        SelectionWriter {
            inner: self.inner.clone(),
            validator: self.validator.clone(),
        }
    }

    pub fn rate_writer(&self) -> RateWriter {
        RateWriter {
            inner: self.inner.clone(),
            validator: self.validator.clone(),
        }
    }

    pub fn kyc_writer(&self) -> KycWriter {
        KycWriter {
            inner: self.inner.clone(),
        }
    }

    pub fn lifecycle_writer(&self) -> LifecycleWriter {
        LifecycleWriter {
            inner: self.inner.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SessionReader {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionReader {
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().await.snapshot()
    }

    pub async fn selection(&self) -> SessionSelection {
        self.inner.read().await.selection.clone()
    }

    pub async fn phase(&self) -> LifecyclePhase {
        self.inner.read().await.selection.phase
    }

    pub async fn amount(&self) -> AmountState {
        self.inner.read().await.amount.clone()
    }

    pub async fn kyc(&self) -> Option<KycRecord> {
        self.inner.read().await.current_kyc().cloned()
    }

    pub async fn quote(&self) -> Option<Quote> {
        self.inner.read().await.quote.clone()
    }

    pub async fn transfer(&self) -> Option<Transfer> {
        self.inner.read().await.transfer.clone()
    }

    pub async fn guard(&self) -> EpochGuard {
        self.inner.read().await.guard()
    }
}

/// User-driven selection updates. Each one re-runs the amount recompute.
#[derive(Clone)]
pub struct SelectionWriter {
    inner: Arc<RwLock<SessionState>>,
    validator: Arc<AmountValidator>,
}

impl SelectionWriter {
    /// Buy and sell rates differ, so a direction change drops the current rate.
    pub async fn set_direction(&self, direction: TransferType) {
        let mut state = self.inner.write().await;
        if state.selection.direction == direction {
            return;
        }
        debug!(?direction, "direction selected");
        state.selection.direction = direction;
        state.rate = RateState::Unknown;
        state.recompute(&self.validator);
    }

    /// Switching country drops everything that only made sense for the old one.
    pub async fn select_country(&self, country: Country) {
        let mut state = self.inner.write().await;
        info!(country = %country.country_code, "country selected");
        state.selection.country = Some(country);
        state.selection.institution = None;
        state.selection.payment_method = None;
        state.selection.account_number.clear();
        state.selection.pasted_address = None;
        state.rate = RateState::Unknown;
        state.recompute(&self.validator);
    }

    pub async fn select_institution(&self, institution: Institution) {
        let mut state = self.inner.write().await;
        let method = institution.payment_method();
        debug!(institution = %institution.name, ?method, "institution selected");
        state.selection.institution = Some(institution);
        state.selection.payment_method = Some(method);
        state.selection.account_number.clear();
        state.rate = RateState::Unknown;
        state.recompute(&self.validator);
    }

    pub async fn clear_institution(&self) {
        let mut state = self.inner.write().await;
        state.selection.institution = None;
        state.selection.payment_method = None;
        state.selection.account_number.clear();
        state.rate = RateState::Unknown;
        state.recompute(&self.validator);
    }

    pub async fn set_amount(&self, raw: &str) {
        let mut state = self.inner.write().await;
        state.amount.raw = raw.to_string();
        state.recompute(&self.validator);
    }

    pub async fn set_account_number(&self, account_number: &str) {
        self.inner.write().await.selection.account_number = account_number.to_string();
    }

    pub async fn set_account_name(&self, name: Option<String>, use_kyc_name: bool) {
        let mut state = self.inner.write().await;
        state.selection.account_name = name;
        state.selection.use_kyc_name_as_account_name = use_kyc_name;
    }

    pub async fn select_asset(&self, asset: &str, network: &str) {
        let mut state = self.inner.write().await;
        state.selection.asset = Some(asset.to_string());
        state.selection.network = Some(network.to_string());
    }

    pub async fn set_pasted_address(&self, address: Option<String>) {
        self.inner.write().await.selection.pasted_address = address;
    }

    pub async fn connect_wallet(&self, address: &str) {
        let mut state = self.inner.write().await;
        if state.selection.wallet_address.as_deref() != Some(address) {
            state.invalidate();
        }
        state.selection.wallet_address = Some(address.to_string());
    }

    /// Cancels in-flight calls; KYC is cleared by the identity gate.
    pub async fn disconnect_wallet(&self) {
        let mut state = self.inner.write().await;
        info!("wallet disconnected");
        state.invalidate();
        state.selection.wallet_address = None;
    }
}

/// Written only by the converter.
#[derive(Clone)]
pub struct RateWriter {
    inner: Arc<RwLock<SessionState>>,
    validator: Arc<AmountValidator>,
}

impl RateWriter {
    /// Marks the rate unknown before a fetch so nothing stale is shown meanwhile.
    pub async fn begin_fetch(&self) {
        let mut state = self.inner.write().await;
        state.rate = RateState::Unknown;
        state.recompute(&self.validator);
    }

    pub async fn apply(&self, guard: &EpochGuard, rate: RateState) -> Result<()> {
        let mut state = self.inner.write().await;
        state.check(guard)?;
        let expected = RateKey::for_selection(&state.selection);
        if let Some(key) = rate.key() {
            if Some(key) != expected.as_ref() {
                debug!(?key, "discarding rate for a previous selection");
                return Err(RampError::StaleSession);
            }
        }
        state.rate = rate;
        state.recompute(&self.validator);
        Ok(())
    }
}

/// Written only by the identity gate.
#[derive(Clone)]
pub struct KycWriter {
    inner: Arc<RwLock<SessionState>>,
}

impl KycWriter {
    pub async fn set_record(&self, guard: &EpochGuard, wallet: &str, record: KycRecord) -> Result<()> {
        let mut state = self.inner.write().await;
        state.check(guard)?;
        if state.selection.wallet_address.as_deref() != Some(wallet) {
            return Err(RampError::StaleSession);
        }
        info!(wallet, status = ?record.kyc_status, "kyc record updated");
        state.kyc = Some((wallet.to_string(), record));
        Ok(())
    }

    pub async fn clear(&self) {
        self.inner.write().await.kyc = None;
    }
}

/// Written only by the orchestrator and the status poller it drives.
#[derive(Clone)]
pub struct LifecycleWriter {
    inner: Arc<RwLock<SessionState>>,
}

impl LifecycleWriter {
    pub async fn record_quote(&self, guard: &EpochGuard, quote: Quote) -> Result<()> {
        let mut state = self.inner.write().await;
        state.check(guard)?;
        state.advance(LifecyclePhase::GotQuote)?;
        let note = format!("quote {}", quote.quote_id);
        state.quote = Some(quote);
        state.push_timeline(None, note);
        Ok(())
    }

    pub async fn begin_processing(&self, guard: &EpochGuard) -> Result<()> {
        let mut state = self.inner.write().await;
        state.check(guard)?;
        state.advance(LifecyclePhase::ProcessingPayment)?;
        state.push_timeline(None, "submitting transfer");
        Ok(())
    }

    pub async fn record_transfer(&self, guard: &EpochGuard, transfer: Transfer) -> Result<()> {
        let mut state = self.inner.write().await;
        state.check(guard)?;
        state.advance(LifecyclePhase::GotTransfer)?;
        let status = transfer.status;
        let note = format!("transfer {}", transfer.transfer_id);
        state.transfer = Some(transfer);
        state.push_timeline(Some(status), note);
        Ok(())
    }

    /// Moves to `PaymentFailed`, keeping whatever quote and transfer exist.
    pub async fn record_failure(&self, guard: &EpochGuard, report: FailureReport) -> Result<()> {
        let mut state = self.inner.write().await;
        state.check(guard)?;
        state.advance(LifecyclePhase::PaymentFailed)?;
        let note = report.reason.clone();
        state.failure = Some(report);
        state.push_timeline(None, note);
        Ok(())
    }

    /// Applies one polled status; terminal statuses settle the lifecycle.
    pub async fn record_status(
        &self,
        guard: &EpochGuard,
        status: &TransferStatus,
        support_email: &str,
    ) -> Result<LifecyclePhase> {
        let mut state = self.inner.write().await;
        state.check(guard)?;
        let next = status.status.is_terminal().then(|| {
            if status.status.is_success() {
                LifecyclePhase::PaymentCompleted
            } else {
                LifecyclePhase::PaymentFailed
            }
        });
        // Phase first: a refused transition leaves the transfer untouched.
        if let Some(next) = next {
            state.advance(next)?;
            if next == LifecyclePhase::PaymentFailed {
                state.failure = Some(FailureReport::for_terminal_status(
                    status.status,
                    &status.transfer_id,
                    support_email,
                ));
            }
        }
        if let Some(transfer) = state.transfer.as_mut() {
            transfer.status = status.status;
            if status.tx_hash.is_some() {
                transfer.tx_hash = status.tx_hash.clone();
            }
        }
        state.push_timeline(Some(status.status), "status polled");
        Ok(state.selection.phase)
    }

    /// "New payment": back to defaults, keeping the connected wallet and its KYC.
    pub async fn reset(&self) {
        let mut state = self.inner.write().await;
        info!(epoch = state.epoch, "session reset");
        state.invalidate();
        let wallet = state.selection.wallet_address.take();
        let direction = state.selection.direction;
        state.selection = SessionSelection {
            wallet_address: wallet,
            direction,
            ..SessionSelection::default()
        };
        state.amount = AmountState::default();
        state.rate = RateState::Unknown;
        state.quote = None;
        state.transfer = None;
        state.failure = None;
        state.timeline.clear();
    }
}

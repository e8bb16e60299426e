use crate::application::gate::IdentityGate;
use crate::application::session::{EpochGuard, FailureReport, LifecycleWriter, SessionReader};
use crate::domain::amount::{validate_account_number, validate_wallet_address};
use crate::domain::country::CountryRule;
use crate::domain::payload::{self, RequestPayload};
use crate::domain::ports::{QuoteBackendRef, TransferBackendRef};
use crate::domain::quote::{Quote, Transfer, TransferType};
use crate::domain::selection::{LifecyclePhase, SessionSelection};
use crate::error::{RampError, Result, ValidationError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// What happened after a quote was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    /// Buy flow: the user still has to confirm the payment.
    AwaitingConfirmation(Quote),
    /// Sell flow: the transfer was submitted straight away.
    Submitted { quote: Quote, transfer: Transfer },
}

/// Holds the single quote slot; released when dropped.
struct QuoteSlot<'a>(&'a AtomicBool);

impl<'a> QuoteSlot<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for QuoteSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Transfers already created or being created, keyed by quote id.
#[derive(Debug, Default)]
struct SubmissionLedger {
    completed: HashMap<String, Transfer>,
    outstanding: HashSet<String>,
}

/// Drives one session through `Initial → GotQuote → ProcessingPayment → GotTransfer`.
///
/// The orchestrator is the only writer of the lifecycle phase, quote and transfer.
pub struct Orchestrator {
    quotes: QuoteBackendRef,
    transfers: TransferBackendRef,
    gate: Arc<IdentityGate>,
    reader: SessionReader,
    writer: LifecycleWriter,
    ledger: Mutex<SubmissionLedger>,
    quoting: AtomicBool,
    support_email: String,
    default_asset: String,
}

impl Orchestrator {
    pub fn new(
        quotes: QuoteBackendRef,
        transfers: TransferBackendRef,
        gate: Arc<IdentityGate>,
        reader: SessionReader,
        writer: LifecycleWriter,
        support_email: impl Into<String>,
        default_asset: impl Into<String>,
    ) -> Self {
        Self {
            quotes,
            transfers,
            gate,
            reader,
            writer,
            ledger: Mutex::new(SubmissionLedger::default()),
            quoting: AtomicBool::new(false),
            support_email: support_email.into(),
            default_asset: default_asset.into(),
        }
    }

    /// Requests a quote for the current selection.
    ///
    /// Checks run in a fixed order: amount, recipient, KYC, payload. Any of
    /// them failing leaves the session in `Initial` with the form untouched.
    /// A second request while one is outstanding is refused without reaching
    /// the quote backend.
    pub async fn request_quote(&self) -> Result<QuoteOutcome> {
        let Some(_slot) = QuoteSlot::claim(&self.quoting) else {
            info!("duplicate quote request suppressed");
            return Err(RampError::SubmissionInProgress("quote request".to_string()));
        };
        let selection = self.reader.selection().await;
        if selection.phase != LifecyclePhase::Initial {
            return Err(RampError::InvalidTransition {
                from: selection.phase,
                to: LifecyclePhase::GotQuote,
            });
        }

        let amount = self.reader.amount().await;
        if let Some(err) = amount.validation_error() {
            return Err(err.into());
        }
        validate_recipient(&selection)?;
        let kyc = self.gate.require_pass().await?;

        let direction = selection.direction;
        let request = payload::build_quote_request(&selection, &amount.normalized, &self.default_asset)?;
        let transfer_payload = payload::build(&selection, Some(&kyc), direction)?;

        let guard = self.reader.guard().await;
        let response = guard
            .run(async {
                match direction {
                    TransferType::TransferIn => self.quotes.create_quote_in(request).await,
                    TransferType::TransferOut => self.quotes.create_quote_out(request).await,
                }
            })
            .await?;
        let quote = match response {
            Ok(response) => response.quote,
            Err(err) => {
                warn!(error = %err, ?direction, "quote rejected");
                return Err(RampError::Backend(err));
            }
        };
        info!(quote_id = %quote.quote_id, ?direction, "quote received");
        self.writer.record_quote(&guard, quote.clone()).await?;

        match direction {
            TransferType::TransferIn => Ok(QuoteOutcome::AwaitingConfirmation(quote)),
            TransferType::TransferOut => {
                let payload = transfer_payload.with_quote(quote.quote_id.clone());
                let transfer = self.submit(&guard, direction, payload).await?;
                Ok(QuoteOutcome::Submitted { quote, transfer })
            }
        }
    }

    /// Buy flow: the user confirmed the quote they were shown.
    pub async fn confirm_payment(&self) -> Result<Transfer> {
        let quote = match self.reader.quote().await {
            Some(quote) => quote,
            None => {
                return Err(RampError::InvalidTransition {
                    from: self.reader.phase().await,
                    to: LifecyclePhase::ProcessingPayment,
                });
            }
        };
        let selection = self.reader.selection().await;
        let kyc = self.gate.require_pass().await?;
        let payload =
            payload::build(&selection, Some(&kyc), quote.transfer_type)?.with_quote(quote.quote_id);
        let guard = self.reader.guard().await;
        self.submit(&guard, quote.transfer_type, payload).await
    }

    /// Submits the transfer for `payload.quote_id` at most once.
    ///
    /// A repeat for a quote that already has a transfer returns that transfer;
    /// a repeat while the first call is still outstanding is refused.
    async fn submit(
        &self,
        guard: &EpochGuard,
        direction: TransferType,
        payload: RequestPayload,
    ) -> Result<Transfer> {
        let quote_id = payload.quote_id.clone().unwrap_or_default();
        {
            let mut ledger = self.ledger.lock().await;
            if let Some(existing) = ledger.completed.get(&quote_id) {
                info!(%quote_id, transfer_id = %existing.transfer_id, "duplicate submission suppressed");
                return Ok(existing.clone());
            }
            if !ledger.outstanding.insert(quote_id.clone()) {
                return Err(RampError::SubmissionInProgress(format!(
                    "transfer for quote {}",
                    quote_id
                )));
            }
        }

        let result = self.dispatch(guard, direction, payload).await;

        let mut ledger = self.ledger.lock().await;
        ledger.outstanding.remove(&quote_id);
        if let Ok(transfer) = &result {
            ledger.completed.insert(quote_id, transfer.clone());
        }
        result
    }

    async fn dispatch(
        &self,
        guard: &EpochGuard,
        direction: TransferType,
        payload: RequestPayload,
    ) -> Result<Transfer> {
        self.writer.begin_processing(guard).await?;
        let created = guard
            .run(async {
                match direction {
                    TransferType::TransferIn => self.transfers.create_transfer_in(payload).await,
                    TransferType::TransferOut => self.transfers.create_transfer_out(payload).await,
                }
            })
            .await?;
        match created {
            Ok(transfer) => {
                info!(transfer_id = %transfer.transfer_id, status = ?transfer.status, "transfer created");
                self.writer.record_transfer(guard, transfer.clone()).await?;
                Ok(transfer)
            }
            Err(err) => {
                warn!(error = %err, ?direction, "transfer submission failed");
                let report = FailureReport::new(
                    format!("Transfer submission failed: {}", err),
                    None,
                    &self.support_email,
                );
                self.writer.record_failure(guard, report).await?;
                Err(RampError::Backend(err))
            }
        }
    }

    /// Abandons the current payment and returns the session to its defaults.
    pub async fn new_payment(&self) {
        self.writer.reset().await;
    }
}

/// Account number for flows with a recipient panel, pasted address for buys.
fn validate_recipient(selection: &SessionSelection) -> std::result::Result<(), ValidationError> {
    if let Some(country) = &selection.country {
        let bank_only_buy = CountryRule::for_code(&country.country_code).is_bank_only()
            && selection.direction == TransferType::TransferIn;
        if selection.institution.is_some() && !bank_only_buy {
            validate_account_number(&selection.account_number, country, selection.payment_method)?;
        }
    }
    if selection.direction == TransferType::TransferIn {
        if let Some(address) = selection.pasted_address.as_deref().filter(|a| !a.is_empty()) {
            validate_wallet_address(address)?;
        }
    }
    Ok(())
}

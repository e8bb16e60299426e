//! A JSON description of one user session, replayed against the in-memory
//! backends. Used by the binary and by the integration tests.

use crate::application::orchestrator::QuoteOutcome;
use crate::application::ramp::{Backends, RampSession};
use crate::application::session::SessionSnapshot;
use crate::config::EngineConfig;
use crate::domain::country::Country;
use crate::domain::kyc::KycRecord;
use crate::domain::quote::{TransferState, TransferType};
use crate::domain::selection::Institution;
use crate::error::{RampError, Result};
use crate::infrastructure::in_memory::{InMemoryBackend, StatusStep};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub direction: TransferType,
    pub wallet: Option<String>,
    pub country: Country,
    pub institution: Option<Institution>,
    /// Picks from `institutions` by code when no full institution is given.
    pub institution_code: Option<String>,
    /// The institution directory for `country`.
    #[serde(default)]
    pub institutions: Vec<Institution>,
    #[serde(default)]
    pub account_number: String,
    pub account_name: Option<String>,
    #[serde(default)]
    pub use_kyc_name: bool,
    pub pasted_address: Option<String>,
    pub amount: String,
    pub asset: Option<String>,
    pub network: Option<String>,
    pub kyc: Option<KycRecord>,
    pub rate: Option<Decimal>,
    /// Status answers for the created transfer, one per poll.
    #[serde(default)]
    pub statuses: Vec<TransferState>,
    /// Buy flows only: whether the user confirms the quote.
    #[serde(default = "default_confirm")]
    pub confirm: bool,
}

fn default_confirm() -> bool {
    true
}

/// Final session state, plus the error that stopped the flow early, if any.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub snapshot: SessionSnapshot,
    pub error: Option<RampError>,
}

impl Scenario {
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }

    /// Plays the scenario to the end of the payment, or to the first error.
    pub async fn play(self, config: EngineConfig) -> Result<ScenarioOutcome> {
        let backend = Arc::new(InMemoryBackend::new());
        if let Some(rate) = self.rate {
            backend.set_rate(&self.country.country_code, rate).await;
        }
        if !self.institutions.is_empty() {
            backend
                .set_institutions(&self.country.country_code, self.institutions.clone())
                .await;
        }
        if let (Some(wallet), Some(kyc)) = (&self.wallet, &self.kyc) {
            backend.set_kyc(wallet, kyc.clone()).await;
        }

        let session = RampSession::new(config, Backends::shared(backend.clone()));
        let error = self.drive(&session, &backend).await.err();
        if let Some(err) = &error {
            warn!(error = %err, "scenario stopped early");
        }
        Ok(ScenarioOutcome {
            snapshot: session.snapshot().await,
            error,
        })
    }

    async fn drive(&self, session: &RampSession, backend: &InMemoryBackend) -> Result<()> {
        session.select_direction(self.direction).await?;
        if let Some(wallet) = &self.wallet {
            session.connect_wallet(wallet).await?;
        }
        // A missing rate only leaves the fiat amount unknown.
        if let Err(err) = session.select_country(self.country.clone()).await {
            warn!(error = %err, "continuing without exchange rate");
        }
        let picked = match (&self.institution, &self.institution_code) {
            (Some(institution), _) => Some(session.select_institution(institution.clone()).await),
            (None, Some(code)) => Some(session.select_institution_code(code).await),
            (None, None) => None,
        };
        match picked {
            Some(Err(RampError::RateUnavailable(reason))) => {
                warn!(%reason, "continuing without exchange rate")
            }
            Some(Err(err)) => return Err(err),
            _ => {}
        }
        session.set_account_number(&self.account_number).await;
        session
            .set_account_name(self.account_name.clone(), self.use_kyc_name)
            .await;
        if let Some(network) = &self.network {
            let asset = self.asset.as_deref().unwrap_or("USDC");
            session.select_asset(asset, network).await;
        }
        session.paste_address(self.pasted_address.clone()).await;
        session.enter_amount(&self.amount).await;

        let transfer = match session.submit().await? {
            QuoteOutcome::Submitted { transfer, .. } => transfer,
            QuoteOutcome::AwaitingConfirmation(quote) if self.confirm => {
                info!(quote_id = %quote.quote_id, "confirming quote");
                session.confirm().await?
            }
            QuoteOutcome::AwaitingConfirmation(_) => return Ok(()),
        };

        if self.statuses.is_empty() {
            return Ok(());
        }
        let steps = self.statuses.iter().copied().map(StatusStep::Status).collect();
        backend.script_statuses(&transfer.transfer_id, steps).await;
        let outcome = session.track().await?;
        info!(?outcome, "tracking finished");
        Ok(())
    }
}

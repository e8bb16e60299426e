use crate::application::session::{KycWriter, SessionReader};
use crate::domain::kyc::{GateResult, KycRecord, check_gate};
use crate::domain::ports::KycProviderRef;
use crate::error::{GateError, RampError, Result};
use tracing::{debug, warn};

/// Owns the session's KYC record and answers whether a quote may proceed.
pub struct IdentityGate {
    provider: KycProviderRef,
    reader: SessionReader,
    writer: KycWriter,
}

impl IdentityGate {
    pub fn new(provider: KycProviderRef, reader: SessionReader, writer: KycWriter) -> Self {
        Self {
            provider,
            reader,
            writer,
        }
    }

    /// Re-reads the KYC record for the connected wallet.
    ///
    /// A provider answer of "no record" keeps whatever the session already
    /// holds; a record fetched for a wallet that has since changed is dropped.
    pub async fn refresh(&self) -> Result<GateResult> {
        let Some(wallet) = self.reader.selection().await.wallet_address else {
            self.writer.clear().await;
            return Ok(GateResult::BlockedUnverified);
        };
        let guard = self.reader.guard().await;
        match guard.run(self.provider.kyc(&wallet)).await? {
            Ok(Some(record)) => self.writer.set_record(&guard, &wallet, record).await?,
            Ok(None) => debug!(%wallet, "no kyc record returned, keeping current"),
            Err(err) => {
                warn!(%wallet, error = %err, "kyc fetch failed");
                return Err(RampError::Backend(err));
            }
        }
        Ok(self.current().await)
    }

    pub async fn current(&self) -> GateResult {
        check_gate(self.reader.kyc().await.as_ref())
    }

    /// The verified record, or a [`GateError`] carrying the verification link.
    pub async fn require_pass(&self) -> std::result::Result<KycRecord, GateError> {
        let record = self.reader.kyc().await;
        let result = check_gate(record.as_ref());
        match record {
            Some(record) if result.is_pass() => Ok(record),
            record => Err(GateError {
                result,
                verification_link: record.and_then(|r| r.verification_link),
            }),
        }
    }

    pub async fn disconnect(&self) {
        self.writer.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::SessionStore;
    use crate::domain::amount::AmountValidator;
    use crate::domain::country::Bounds;
    use crate::domain::kyc::KycStatus;
    use crate::infrastructure::in_memory::InMemoryBackend;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn record(status: KycStatus) -> KycRecord {
        KycRecord {
            kyc_status: status,
            full_kyc: None,
            verification_link: Some("https://verify.example/abc".to_string()),
        }
    }

    fn setup(backend: Arc<InMemoryBackend>) -> (SessionStore, IdentityGate) {
        let store = SessionStore::new(AmountValidator::new(Bounds::new(dec!(1), dec!(100000))));
        let gate = IdentityGate::new(backend, store.reader(), store.kyc_writer());
        (store, gate)
    }

    #[tokio::test]
    async fn test_no_wallet_blocks() {
        let (_, gate) = setup(Arc::new(InMemoryBackend::new()));
        assert_eq!(gate.refresh().await.unwrap(), GateResult::BlockedUnverified);
    }

    #[tokio::test]
    async fn test_in_review_blocks_with_link() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_kyc("0xabc", record(KycStatus::InReview)).await;
        let (store, gate) = setup(backend);
        store.selection_writer().connect_wallet("0xabc").await;

        assert_eq!(gate.refresh().await.unwrap(), GateResult::BlockedReview);
        let err = gate.require_pass().await.unwrap_err();
        assert_eq!(err.result, GateResult::BlockedReview);
        assert_eq!(
            err.verification_link.as_deref(),
            Some("https://verify.example/abc")
        );
    }

    #[tokio::test]
    async fn test_missing_record_keeps_previous() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_kyc("0xabc", record(KycStatus::Verified)).await;
        let (store, gate) = setup(backend.clone());
        store.selection_writer().connect_wallet("0xabc").await;
        assert_eq!(gate.refresh().await.unwrap(), GateResult::Pass);

        backend.clear_kyc("0xabc").await;
        assert_eq!(gate.refresh().await.unwrap(), GateResult::Pass);

        gate.disconnect().await;
        assert_eq!(gate.current().await, GateResult::BlockedUnverified);
    }
}

mod common;

use common::{WALLET, access_bank, kenya, kenyan_sell, kyc, mpesa, nigeria, session};
use ramp_orchestrator::application::orchestrator::QuoteOutcome;
use ramp_orchestrator::application::poller::PollOutcome;
use ramp_orchestrator::domain::kyc::{GateResult, KycStatus};
use ramp_orchestrator::domain::payload::Recipient;
use ramp_orchestrator::domain::quote::{TransferState, TransferType};
use ramp_orchestrator::domain::selection::{LifecyclePhase, PaymentMethod};
use ramp_orchestrator::error::{PayloadError, RampError};
use ramp_orchestrator::infrastructure::in_memory::{InMemoryBackend, StatusStep};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_sell_completes_after_polling() {
    let backend = Arc::new(InMemoryBackend::new());
    let session = kenyan_sell(&backend, KycStatus::Verified).await;
    assert_eq!(session.snapshot().await.amount.fiat_amount, Some(dec!(12950.00)));

    let outcome = session.submit().await.unwrap();
    let QuoteOutcome::Submitted { transfer, .. } = outcome else {
        panic!("sell should submit immediately");
    };
    backend
        .script_statuses(
            &transfer.transfer_id,
            vec![
                StatusStep::Status(TransferState::TransferProcessing),
                StatusStep::Status(TransferState::TransferComplete),
            ],
        )
        .await;

    let handle = session.start_polling().await.unwrap();
    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        PollOutcome::Terminal {
            status: TransferState::TransferComplete,
            polls: 2
        }
    );

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.phase(), LifecyclePhase::PaymentCompleted);
    assert!(snapshot.transfer.unwrap().tx_hash.is_some());
    assert!(snapshot.failure.is_none());

    // No further polls once settled.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.status_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_status_ends_after_exactly_three_polls() {
    let backend = Arc::new(InMemoryBackend::new());
    let session = kenyan_sell(&backend, KycStatus::Verified).await;
    backend
        .script_statuses(
            "transfer-1",
            vec![
                StatusStep::Status(TransferState::TransferProcessing),
                StatusStep::Status(TransferState::TransferProcessing),
                StatusStep::Status(TransferState::TransferFailed),
            ],
        )
        .await;
    session.submit().await.unwrap();

    let outcome = session.track().await.unwrap();
    assert_eq!(
        outcome,
        PollOutcome::Terminal {
            status: TransferState::TransferFailed,
            polls: 3
        }
    );
    assert_eq!(backend.status_calls(), 3);

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.phase(), LifecyclePhase::PaymentFailed);
    assert_eq!(snapshot.quote.unwrap().quote_id, "quote-1");
    let failure = snapshot.failure.unwrap();
    assert_eq!(failure.transfer_id.as_deref(), Some("transfer-1"));
    assert_eq!(
        failure.support_link,
        "mailto:support@oneramp.io?subject=Support Request for Transaction transfer-1"
    );
}

#[tokio::test(start_paused = true)]
async fn test_refund_is_reported_distinctly() {
    let backend = Arc::new(InMemoryBackend::new());
    let session = kenyan_sell(&backend, KycStatus::Verified).await;
    backend
        .script_statuses(
            "transfer-1",
            vec![StatusStep::Status(TransferState::TransferRefunded)],
        )
        .await;
    session.submit().await.unwrap();
    session.track().await.unwrap();

    let failure = session.snapshot().await.failure.unwrap();
    assert_eq!(failure.reason, "Transfer was refunded");
}

#[tokio::test]
async fn test_in_review_blocks_quote() {
    let backend = Arc::new(InMemoryBackend::new());
    let session = kenyan_sell(&backend, KycStatus::InReview).await;

    let err = session.submit().await.unwrap_err();
    let RampError::Gate(gate) = err else {
        panic!("expected a gate error, got {err:?}");
    };
    assert_eq!(gate.result, GateResult::BlockedReview);

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.gate, GateResult::BlockedReview);
    assert_eq!(snapshot.phase(), LifecyclePhase::Initial);
    assert_eq!(
        snapshot.verification_link.as_deref(),
        Some("https://kyc.example/continue")
    );
    assert_eq!(backend.quotes_created(), 0);

    // Verification finishes: the same form goes through without re-entry.
    backend.set_kyc(WALLET, kyc(KycStatus::Verified)).await;
    assert_eq!(session.refresh_kyc().await.unwrap(), GateResult::Pass);
    assert!(session.submit().await.is_ok());
}

#[tokio::test]
async fn test_nigerian_buy_needs_no_institution() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.set_kyc(WALLET, kyc(KycStatus::Verified)).await;
    let session = session(&backend);
    session.select_direction(TransferType::TransferIn).await.unwrap();
    session.connect_wallet(WALLET).await.unwrap();
    session.select_country(nigeria()).await.unwrap();
    session.select_asset("USDC", "Celo").await;
    session.enter_amount("50").await;

    let outcome = session.submit().await.unwrap();
    assert!(matches!(outcome, QuoteOutcome::AwaitingConfirmation(_)));
    let transfer = session.confirm().await.unwrap();
    assert_eq!(transfer.transfer_id, "transfer-1");

    let payloads = backend.submitted_payloads().await;
    assert_eq!(payloads[0].operator, "bank");
    assert_eq!(payloads[0].user_details.id_type, "NIN");
    assert_eq!(payloads[0].user_details.additional_id_number, "BVN");
    let Recipient::Bank { bank } = &payloads[0].recipient else {
        panic!("expected a bank recipient");
    };
    assert!(bank.account_number.is_empty());
}

#[tokio::test]
async fn test_nigerian_sell_without_institution_is_rejected() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.set_kyc(WALLET, kyc(KycStatus::Verified)).await;
    let session = session(&backend);
    session.connect_wallet(WALLET).await.unwrap();
    session.select_country(nigeria()).await.unwrap();
    session.select_asset("USDC", "Base").await;
    session.enter_amount("50").await;

    let err = session.submit().await.unwrap_err();
    assert_eq!(err.to_string(), "no institution selected");
    assert_eq!(session.snapshot().await.phase(), LifecyclePhase::Initial);

    session.select_institution(access_bank()).await.ok();
    session.set_account_number("0123456789").await;
    session.submit().await.unwrap();
    let payloads = backend.submitted_payloads().await;
    assert_eq!(payloads[0].operator, "bank");
    assert_eq!(payloads[0].user_details.phone, "+254700000001");
}

#[tokio::test]
async fn test_repeated_confirm_creates_one_transfer() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.set_kyc(WALLET, kyc(KycStatus::Verified)).await;
    let session = session(&backend);
    session.select_direction(TransferType::TransferIn).await.unwrap();
    session.connect_wallet(WALLET).await.unwrap();
    session.select_country(nigeria()).await.unwrap();
    session.select_asset("USDC", "Base").await;
    session.enter_amount("50").await;
    session.submit().await.unwrap();

    let first = session.confirm().await.unwrap();
    let second = session.confirm().await.unwrap();
    assert_eq!(first.transfer_id, second.transfer_id);
    assert_eq!(backend.transfers_created(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_discards_late_quote() {
    let backend = Arc::new(InMemoryBackend::new());
    let session = kenyan_sell(&backend, KycStatus::Verified).await;
    backend.set_latency(Duration::from_secs(3)).await;

    let (result, _) = tokio::join!(session.submit(), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        session.disconnect_wallet().await;
    });
    assert!(matches!(result, Err(RampError::StaleSession)));

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.phase(), LifecyclePhase::Initial);
    assert!(snapshot.quote.is_none());
    assert_eq!(snapshot.gate, GateResult::BlockedUnverified);
}

#[tokio::test(start_paused = true)]
async fn test_new_payment_stops_polling() {
    let backend = Arc::new(InMemoryBackend::new());
    let session = kenyan_sell(&backend, KycStatus::Verified).await;
    session.submit().await.unwrap();
    let handle = session.start_polling().await.unwrap();

    tokio::time::sleep(Duration::from_secs(7)).await;
    session.new_payment().await;
    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome, PollOutcome::Cancelled { polls: 2 });

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.phase(), LifecyclePhase::Initial);
    assert!(snapshot.selection.country.is_none());
    assert_eq!(snapshot.amount.raw, "");
}

#[tokio::test(start_paused = true)]
async fn test_directory_feeds_country_and_institution_choice() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.set_rate("KE", dec!(129.5)).await;
    backend.set_rate("NG", dec!(1550)).await;
    backend.set_institutions("KE", vec![mpesa()]).await;
    let session = session(&backend);

    let board = session.rate_board(PaymentMethod::Momo).await;
    assert_eq!(board.len(), 2);
    assert_eq!(board["KE"], dec!(129.5));

    assert!(session.institutions().await.is_empty());
    session.select_country(kenya()).await.unwrap();
    assert_eq!(session.institutions().await, vec![mpesa()]);

    let err = session.select_institution_code("EQUITY").await.unwrap_err();
    assert!(matches!(err, RampError::Payload(PayloadError::MissingInstitution)));
    assert_eq!(
        session.select_institution_code("MPESA").await.unwrap(),
        Some(dec!(129.5))
    );
    let selection = session.snapshot().await.selection;
    assert_eq!(selection.institution, Some(mpesa()));
    assert_eq!(selection.payment_method, Some(PaymentMethod::Momo));
}

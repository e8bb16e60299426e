use crate::application::session::{LifecycleWriter, SessionReader};
use crate::domain::ports::TransferBackendRef;
use crate::domain::quote::{TransferState, TransferStatus};
use crate::error::{RampError, Result};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The backend reported a terminal status and the lifecycle was settled.
    Terminal { status: TransferState, polls: u32 },
    /// The session was reset or the wallet disconnected.
    Cancelled { polls: u32 },
}

/// Polls a transfer's status on a fixed interval until it settles.
pub struct StatusPoller {
    transfers: TransferBackendRef,
    reader: SessionReader,
    writer: LifecycleWriter,
    interval: Duration,
    support_email: String,
}

impl StatusPoller {
    pub fn new(
        transfers: TransferBackendRef,
        reader: SessionReader,
        writer: LifecycleWriter,
        interval: Duration,
        support_email: impl Into<String>,
    ) -> Self {
        Self {
            transfers,
            reader,
            writer,
            interval,
            support_email: support_email.into(),
        }
    }

    pub async fn poll(&self, transfer_id: &str) -> Result<TransferStatus> {
        self.transfers
            .transfer_status(transfer_id)
            .await
            .map_err(RampError::Backend)
    }

    /// Polls `transfer_id` until a terminal status arrives or the session epoch ends.
    ///
    /// The first poll happens immediately. Failed polls are logged and retried
    /// on the next tick without touching the lifecycle.
    pub async fn run(&self, transfer_id: &str) -> Result<PollOutcome> {
        let guard = self.reader.guard().await;
        if self.reader.phase().await.is_terminal() {
            return Ok(PollOutcome::Cancelled { polls: 0 });
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls = 0u32;

        loop {
            tokio::select! {
                _ = guard.token().cancelled() => {
                    info!(transfer_id, polls, "polling cancelled");
                    return Ok(PollOutcome::Cancelled { polls });
                }
                _ = ticker.tick() => {}
            }

            polls += 1;
            let status = match guard.run(self.poll(transfer_id)).await {
                Ok(Ok(status)) => status,
                Ok(Err(err)) => {
                    warn!(transfer_id, polls, error = %err, "status poll failed");
                    continue;
                }
                Err(_) => return Ok(PollOutcome::Cancelled { polls }),
            };
            debug!(transfer_id, polls, status = ?status.status, "status polled");

            match self
                .writer
                .record_status(&guard, &status, &self.support_email)
                .await
            {
                Ok(phase) if phase.is_terminal() => {
                    info!(transfer_id, polls, status = ?status.status, ?phase, "transfer settled");
                    return Ok(PollOutcome::Terminal {
                        status: status.status,
                        polls,
                    });
                }
                Ok(_) => {}
                Err(RampError::StaleSession) => return Ok(PollOutcome::Cancelled { polls }),
                Err(err) => return Err(err),
            }
        }
    }
}

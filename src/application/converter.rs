use crate::application::retry::retry_with_backoff;
use crate::application::session::{RateKey, RateState, RateWriter, SessionReader};
use crate::config::RetryPolicy;
use crate::domain::ports::RateProviderRef;
use crate::error::{RampError, Result};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Keeps the session's exchange rate in step with the selected country, direction and payment method.
pub struct Converter {
    rates: RateProviderRef,
    reader: SessionReader,
    writer: RateWriter,
    policy: RetryPolicy,
}

impl Converter {
    pub fn new(
        rates: RateProviderRef,
        reader: SessionReader,
        writer: RateWriter,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            rates,
            reader,
            writer,
            policy,
        }
    }

    /// Fetches the rate for the current selection.
    ///
    /// Returns `Ok(None)` while country or payment method is still unknown.
    /// On failure the session rate is marked failed, so no earlier rate keeps
    /// being used for conversion.
    pub async fn refresh(&self) -> Result<Option<Decimal>> {
        let selection = self.reader.selection().await;
        let Some(key) = RateKey::for_selection(&selection) else {
            self.writer.begin_fetch().await;
            return Ok(None);
        };
        let guard = self.reader.guard().await;
        self.writer.begin_fetch().await;

        let fetched = guard
            .run(retry_with_backoff("exchange_rate", self.policy, || {
                self.rates
                    .country_exchange_rate(&key.country, key.order_type, key.method)
            }))
            .await?;

        let country = key.country.clone();
        let method = key.method.as_str();
        match fetched {
            Ok(rate) => {
                info!(
                    %country,
                    method,
                    order_type = ?key.order_type,
                    rate = %rate.exchange,
                    "exchange rate updated"
                );
                self.writer
                    .apply(
                        &guard,
                        RateState::Ready {
                            key,
                            rate: rate.exchange,
                        },
                    )
                    .await?;
                Ok(Some(rate.exchange))
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(%country, method, %reason, "exchange rate unavailable");
                self.writer
                    .apply(
                        &guard,
                        RateState::Failed {
                            key,
                            reason: reason.clone(),
                        },
                    )
                    .await?;
                Err(RampError::RateUnavailable(reason))
            }
        }
    }
}

use crate::application::retry::retry_with_backoff;
use crate::config::RetryPolicy;
use crate::domain::ports::{InstitutionDirectoryRef, RateProviderRef};
use crate::domain::quote::OrderType;
use crate::domain::selection::{Institution, PaymentMethod};
use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{info, warn};

/// Warms rates and institution lists for every supported country.
pub struct Prefetcher {
    rates: RateProviderRef,
    institutions: InstitutionDirectoryRef,
    countries: Vec<String>,
    rate_policy: RetryPolicy,
    institution_policy: RetryPolicy,
}

impl Prefetcher {
    pub fn new(
        rates: RateProviderRef,
        institutions: InstitutionDirectoryRef,
        countries: Vec<String>,
        rate_policy: RetryPolicy,
        institution_policy: RetryPolicy,
    ) -> Self {
        Self {
            rates,
            institutions,
            countries,
            rate_policy,
            institution_policy,
        }
    }

    /// Countries whose rate could not be fetched are left out of the map.
    pub async fn prefetch_rates(
        &self,
        order_type: OrderType,
        method: PaymentMethod,
    ) -> HashMap<String, Decimal> {
        let fetches = self.countries.iter().map(|country| async move {
            let result = retry_with_backoff("prefetch_rate", self.rate_policy, || {
                self.rates.country_exchange_rate(country, order_type, method)
            })
            .await;
            (country, result)
        });

        let mut rates = HashMap::new();
        for (country, result) in join_all(fetches).await {
            match result {
                Ok(rate) => {
                    rates.insert(country.clone(), rate.exchange);
                }
                Err(err) => warn!(%country, error = %err, "rate prefetch failed"),
            }
        }
        info!(fetched = rates.len(), total = self.countries.len(), "rates prefetched");
        rates
    }

    /// Countries whose institutions could not be fetched map to an empty list.
    pub async fn prefetch_institutions(&self, order_type: OrderType) -> HashMap<String, Vec<Institution>> {
        let fetches = self.countries.iter().map(|country| async move {
            (country.clone(), self.institutions_for(country, order_type).await)
        });
        join_all(fetches).await.into_iter().collect()
    }

    /// Institutions of one country, or an empty list once retries run out.
    pub async fn institutions_for(&self, country: &str, order_type: OrderType) -> Vec<Institution> {
        retry_with_backoff("prefetch_institutions", self.institution_policy, || {
            self.institutions.institutions(country, order_type)
        })
        .await
        .unwrap_or_else(|err| {
            warn!(%country, error = %err, "institution prefetch failed");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::infrastructure::in_memory::InMemoryBackend;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;

    fn prefetcher(backend: Arc<InMemoryBackend>) -> Prefetcher {
        Prefetcher::new(
            backend.clone(),
            backend,
            vec!["KE".to_string(), "UG".to_string(), "NG".to_string()],
            RetryPolicy::new(2, Duration::from_secs(2), Duration::from_secs(10)),
            RetryPolicy::new(3, Duration::from_secs(2), Duration::from_secs(10)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_rates_are_omitted() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_rate("KE", dec!(129)).await;
        backend.set_rate("NG", dec!(1550)).await;

        let rates = prefetcher(backend.clone())
            .prefetch_rates(OrderType::Selling, PaymentMethod::Bank)
            .await;
        assert_eq!(rates.len(), 2);
        assert_eq!(rates["KE"], dec!(129));
        assert!(!rates.contains_key("UG"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_institutions_degrade_to_empty() {
        let backend = Arc::new(InMemoryBackend::new());
        backend
            .set_institutions(
                "KE",
                vec![Institution {
                    name: "M-Pesa".to_string(),
                    code: "MPESA".to_string(),
                    r#type: Some("momo".to_string()),
                    account_number_type: None,
                }],
            )
            .await;
        backend
            .fail_institutions("UG", BackendError::Timeout)
            .await;

        let lists = prefetcher(backend.clone())
            .prefetch_institutions(OrderType::Buying)
            .await;
        assert_eq!(lists.len(), 3);
        assert_eq!(lists["KE"].len(), 1);
        assert!(lists["UG"].is_empty());
        assert!(lists["NG"].is_empty());
        // three retries after the first attempt
        assert_eq!(backend.institution_calls("UG").await, 4);
    }
}

//! Fill in one provider's missing or failed responses on existing rows

use std::sync::Arc;

use super::dispatcher::Dispatcher;
use super::policy::{FailurePolicy, ItemOutcome, Step};
use super::RunSummary;
use crate::providers::LLMProvider;
use crate::store::{AnalysisStore, StoreResult};

/// Re-sends stored prompts to a single provider
pub struct Backfiller {
    provider_name: String,
    dispatcher: Dispatcher,
    store: Arc<dyn AnalysisStore>,
    policy: FailurePolicy,
}

impl Backfiller {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        store: Arc<dyn AnalysisStore>,
        policy: FailurePolicy,
        timeout_ms: u64,
    ) -> Self {
        Self {
            provider_name: provider.name().to_string(),
            dispatcher: Dispatcher::new(vec![provider], timeout_ms),
            store,
            policy,
        }
    }

    /// Rows the run would touch
    pub fn candidates(&self, include_sentinels: bool) -> StoreResult<Vec<i64>> {
        self.store.ensure_provider(&self.provider_name)?;
        self.store.ids_needing_backfill(&self.provider_name, include_sentinels)
    }

    /// Query the provider for every row whose field is NULL (and, with
    /// `include_sentinels`, every row holding sentinel text).
    ///
    /// The result is always written back, sentinel or not, so the field
    /// reflects the latest attempt. A reply that is still an error
    /// placeholder counts toward `errored` and the halt threshold.
    pub async fn backfill(&self, include_sentinels: bool) -> StoreResult<RunSummary> {
        let ids = self.candidates(include_sentinels)?;
        let total = ids.len();
        tracing::info!("{} rows need {} responses", total, self.provider_name);

        let mut summary = RunSummary::default();
        let mut failures = self.policy.tracker();

        for (index, id) in ids.into_iter().enumerate() {
            let record = match self.store.get_by_id(id)? {
                Some(record) => record,
                None => {
                    tracing::warn!("Row {} disappeared, skipping", id);
                    continue;
                }
            };

            summary.attempted += 1;
            tracing::info!("[{}/{}] row {} ({})", index + 1, total, id, record.error_code);

            let mut replies = self.dispatcher.dispatch(&record.prompt_sent).await;
            let (persisted, rate_limited, errored) = match replies.shift_remove(&self.provider_name) {
                Some(reply) => {
                    let rate_limited = reply.is_rate_limited();
                    let errored = reply.is_error();
                    if errored {
                        tracing::warn!("{} still failing on row {}: {}", self.provider_name, id, reply.text);
                    }
                    let written = self.store.update_provider_fields(
                        id,
                        &self.provider_name,
                        Some(&reply.text),
                        reply.elapsed_ms.map(|ms| ms as i64),
                    );
                    match written {
                        Ok(Some(_)) => (true, rate_limited, errored),
                        Ok(None) => {
                            tracing::warn!("Row {} disappeared before update", id);
                            (false, rate_limited, errored)
                        }
                        Err(e) => {
                            tracing::error!("Failed to update row {}: {}", id, e);
                            (false, rate_limited, errored)
                        }
                    }
                }
                None => (false, false, false),
            };

            if persisted {
                summary.persisted += 1;
            } else {
                summary.failed += 1;
            }
            if rate_limited {
                summary.rate_limited += 1;
            }
            if errored {
                summary.errored += 1;
            }

            match failures.record(ItemOutcome::classify(persisted, rate_limited, errored)) {
                Step::Halt => {
                    tracing::warn!("Stopping backfill after {} consecutive failures", failures.count());
                    summary.halted_early = index + 1 < total;
                    break;
                }
                Step::Proceed { delay } => {
                    if index + 1 < total && !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::{zero_delay_policy, Behavior, MockProvider};
    use crate::store::{NewAnalysis, ProviderField, SqliteStore};
    use indexmap::IndexMap;

    fn seed_rows(store: &SqliteStore) -> (i64, i64, i64) {
        let row = |code: &str, cohere: Option<&str>| {
            let mut providers = IndexMap::new();
            providers.insert("groq".to_string(), ProviderField::new("groq answer", Some(100)));
            if let Some(text) = cohere {
                providers.insert("cohere".to_string(), ProviderField::new(text, Some(50)));
            }
            NewAnalysis {
                developer_name: "Ayse".to_string(),
                error_category: "NET_ERR".to_string(),
                error_code: code.to_string(),
                error_message: "m".to_string(),
                prompt_sent: format!("prompt for {}", code),
                providers,
                ..Default::default()
            }
        };
        store.ensure_provider("cohere").unwrap();
        let missing = store.insert(&row("ConnectionReset", None)).unwrap();
        let failed = store
            .insert(&row("HostUnreachable", Some("Error: Request failed with status code 500")))
            .unwrap();
        let answered = store.insert(&row("DNSResolutionFailed", Some("fine"))).unwrap();
        (missing, failed, answered)
    }

    #[tokio::test]
    async fn test_backfill_fills_null_fields_only() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let (missing, failed, answered) = seed_rows(&store);
        let provider = Arc::new(MockProvider::new("cohere", Behavior::Reply("filled".into())));

        let backfiller = Backfiller::new(provider.clone(), store.clone(), zero_delay_policy(3), 1_000);
        let summary = backfiller.backfill(false).await.unwrap();

        assert_eq!(summary.persisted, 1);
        assert_eq!(provider.prompts(), vec!["prompt for ConnectionReset"]);
        assert_eq!(store.get_by_id(missing).unwrap().unwrap().response("cohere"), Some("filled"));
        assert!(store.get_by_id(failed).unwrap().unwrap().response("cohere").unwrap().starts_with("Error: "));
        assert_eq!(store.get_by_id(answered).unwrap().unwrap().response("cohere"), Some("fine"));
    }

    #[tokio::test]
    async fn test_backfill_can_retry_sentinels() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let (missing, failed, _) = seed_rows(&store);
        let provider = Arc::new(MockProvider::new("cohere", Behavior::Reply("filled".into())));

        let backfiller = Backfiller::new(provider, store.clone(), zero_delay_policy(3), 1_000);
        assert_eq!(backfiller.candidates(true).unwrap(), vec![missing, failed]);

        let summary = backfiller.backfill(true).await.unwrap();
        assert_eq!(summary.persisted, 2);
        assert_eq!(store.get_by_id(failed).unwrap().unwrap().response("cohere"), Some("filled"));
    }

    #[tokio::test]
    async fn test_backfill_new_provider_and_halt_on_rate_limit() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        seed_rows(&store);
        let provider = Arc::new(MockProvider::new("openrouter_hermes", Behavior::RateLimited));

        let backfiller = Backfiller::new(provider, store.clone(), zero_delay_policy(2), 1_000);
        let summary = backfiller.backfill(false).await.unwrap();

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.rate_limited, 2);
        assert!(summary.halted_early);
        let coverage = store.provider_coverage().unwrap();
        let hermes = coverage.iter().find(|c| c.provider == "openrouter_hermes").unwrap();
        assert_eq!((hermes.errored, hermes.missing), (2, 1));
    }

    #[tokio::test]
    async fn test_backfill_with_failing_provider_reports_errors_and_halts() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let (missing, failed, _) = seed_rows(&store);
        let extra = store
            .insert(&NewAnalysis {
                developer_name: "Ayse".to_string(),
                error_category: "NET_ERR".to_string(),
                error_code: "PacketLossDetected".to_string(),
                error_message: "m".to_string(),
                prompt_sent: "prompt for PacketLossDetected".to_string(),
                ..Default::default()
            })
            .unwrap();
        let provider = Arc::new(MockProvider::new("cohere", Behavior::Fail(401)));

        let backfiller = Backfiller::new(provider.clone(), store.clone(), zero_delay_policy(2), 1_000);
        assert_eq!(backfiller.candidates(true).unwrap(), vec![missing, failed, extra]);

        let summary = backfiller.backfill(true).await.unwrap();
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.errored, 2);
        assert_eq!(summary.rate_limited, 0);
        assert!(summary.halted_early);
        assert_eq!(provider.prompts().len(), 2);
        assert!(store.get_by_id(missing).unwrap().unwrap().response("cohere").unwrap().contains("401"));
        assert_eq!(store.get_by_id(extra).unwrap().unwrap().response("cohere"), None);
    }
}

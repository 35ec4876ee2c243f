//! Analysis execution engine

pub mod backfill;
pub mod batch;
pub mod dispatcher;
pub mod policy;

pub use backfill::Backfiller;
pub use batch::{BatchRunner, CategorySelector, ItemReport};
pub use dispatcher::{DispatchResult, Dispatcher, ProviderReply};
pub use policy::{ConsecutiveFailures, FailurePolicy, ItemOutcome, Step};

use serde::Serialize;

/// Counts reported at the end of a batch or backfill run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub attempted: usize,
    pub persisted: usize,
    /// Items whose row could not be written
    pub failed: usize,
    /// Items where at least one provider reported a rate limit
    pub rate_limited: usize,
    /// Items where every provider answered with an error placeholder
    pub errored: usize,
    /// Stopped by the consecutive-failure threshold before the last item
    pub halted_early: bool,
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process providers and stores for runner tests

    use async_trait::async_trait;
    use indexmap::IndexMap;
    use std::collections::BTreeSet;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::FailurePolicy;
    use crate::providers::{CompletionRequest, CompletionResponse, LLMProvider, ProviderError, ProviderResult};
    use crate::store::{
        AnalysisRecord, AnalysisStore, Evaluation, NewAnalysis, ProviderCoverage, SqliteStore, StoreError,
        StoreResult,
    };

    pub enum Behavior {
        Reply(String),
        Fail(u16),
        RateLimited,
        Hang,
        Panic,
    }

    pub struct MockProvider {
        name: String,
        behavior: Behavior,
        prompts: Mutex<Vec<String>>,
    }

    impl MockProvider {
        pub fn new(name: &str, behavior: Behavior) -> Self {
            Self {
                name: name.to_string(),
                behavior,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LLMProvider for MockProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn display_name(&self) -> &str {
            &self.name
        }

        fn model(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
            self.prompts.lock().unwrap().push(request.user_text());
            match &self.behavior {
                Behavior::Reply(text) => Ok(CompletionResponse {
                    content: text.clone(),
                    model: "mock".to_string(),
                    finish_reason: "stop".to_string(),
                    latency_ms: 1,
                }),
                Behavior::Fail(status) => Err(ProviderError::Api {
                    status: *status,
                    message: "Internal Server Error".to_string(),
                }),
                Behavior::RateLimited => Err(ProviderError::RateLimited { retry_after_ms: 0 }),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3_600)).await;
                    Err(ProviderError::Timeout { timeout_ms: 3_600_000 })
                }
                Behavior::Panic => panic!("provider {} crashed", self.name),
            }
        }
    }

    pub fn zero_delay_policy(max_consecutive_failures: u32) -> FailurePolicy {
        FailurePolicy {
            inter_request_delay: Duration::ZERO,
            rate_limit_backoff: Duration::ZERO,
            max_consecutive_failures,
        }
    }

    /// Store whose inserts always fail
    pub struct FailingInsertStore {
        inner: SqliteStore,
    }

    impl FailingInsertStore {
        pub fn new() -> Self {
            Self {
                inner: SqliteStore::in_memory().unwrap(),
            }
        }
    }

    impl AnalysisStore for FailingInsertStore {
        fn ensure_provider(&self, provider: &str) -> StoreResult<()> {
            self.inner.ensure_provider(provider)
        }
        fn provider_columns(&self) -> StoreResult<Vec<String>> {
            self.inner.provider_columns()
        }
        fn insert(&self, _record: &NewAnalysis) -> StoreResult<i64> {
            Err(StoreError::Poisoned)
        }
        fn get_by_id(&self, id: i64) -> StoreResult<Option<AnalysisRecord>> {
            self.inner.get_by_id(id)
        }
        fn list_all(&self) -> StoreResult<Vec<AnalysisRecord>> {
            self.inner.list_all()
        }
        fn list_by_category(&self, category: &str) -> StoreResult<Vec<AnalysisRecord>> {
            self.inner.list_by_category(category)
        }
        fn update_provider_fields(
            &self,
            id: i64,
            provider: &str,
            text: Option<&str>,
            elapsed_ms: Option<i64>,
        ) -> StoreResult<Option<AnalysisRecord>> {
            self.inner.update_provider_fields(id, provider, text, elapsed_ms)
        }
        fn update_evaluation(&self, id: i64, evaluation: &Evaluation) -> StoreResult<Option<AnalysisRecord>> {
            self.inner.update_evaluation(id, evaluation)
        }
        fn distinct_error_codes(&self) -> StoreResult<BTreeSet<String>> {
            self.inner.distinct_error_codes()
        }
        fn aggregate_by_category(&self) -> StoreResult<IndexMap<String, u64>> {
            self.inner.aggregate_by_category()
        }
        fn aggregate_by_best_provider(&self) -> StoreResult<IndexMap<String, u64>> {
            self.inner.aggregate_by_best_provider()
        }
        fn aggregate_by_developer(&self) -> StoreResult<IndexMap<String, u64>> {
            self.inner.aggregate_by_developer()
        }
        fn count(&self) -> StoreResult<u64> {
            self.inner.count()
        }
        fn clear(&self) -> StoreResult<()> {
            self.inner.clear()
        }
        fn provider_coverage(&self) -> StoreResult<Vec<ProviderCoverage>> {
            self.inner.provider_coverage()
        }
        fn ids_needing_backfill(&self, provider: &str, include_sentinels: bool) -> StoreResult<Vec<i64>> {
            self.inner.ids_needing_backfill(provider, include_sentinels)
        }
    }
}

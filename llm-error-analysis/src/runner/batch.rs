//! Sequential batch runs over catalog errors

use indexmap::IndexMap;
use rand::Rng;
use std::sync::Arc;

use super::dispatcher::{DispatchResult, Dispatcher};
use super::policy::{FailurePolicy, ItemOutcome, Step};
use super::RunSummary;
use crate::catalog::{Catalog, CatalogError, ErrorDefinition};
use crate::prompt::build_prompt;
use crate::store::{AnalysisStore, NewAnalysis, ProviderField, StoreResult};

/// How each batch item picks its category
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategorySelector {
    /// Random category and random error per item
    Random,
    /// Item `i` uses category `(seed + i) % categories` and error seed `seed + i`
    Seeded(u64),
    /// Every item from one category; with a seed, item `i` uses error seed `seed + i`
    Fixed { category: String, seed: Option<u64> },
}

/// One analyzed and persisted error
#[derive(Debug, Clone)]
pub struct ItemReport {
    pub id: i64,
    pub error: ErrorDefinition,
    pub replies: DispatchResult,
}

/// Drives select, prompt, dispatch, persist and delay for each item
pub struct BatchRunner {
    catalog: Catalog,
    dispatcher: Dispatcher,
    store: Arc<dyn AnalysisStore>,
    developer_name: String,
    policy: FailurePolicy,
}

impl BatchRunner {
    pub fn new(
        catalog: Catalog,
        dispatcher: Dispatcher,
        store: Arc<dyn AnalysisStore>,
        developer_name: impl Into<String>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            catalog,
            dispatcher,
            store,
            developer_name: developer_name.into(),
            policy,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Make sure every dispatched provider has its columns
    pub fn prepare(&self) -> StoreResult<()> {
        for name in self.dispatcher.provider_names() {
            self.store.ensure_provider(name)?;
        }
        Ok(())
    }

    /// Build the prompt and fan it out
    pub async fn collect(&self, error: &ErrorDefinition) -> (String, DispatchResult) {
        let prompt = build_prompt(error);
        tracing::debug!("Prompt for {}:\n{}", error.code, prompt);
        let replies = self.dispatcher.dispatch(&prompt).await;
        (prompt, replies)
    }

    /// Store one row holding the request and every reply
    pub fn persist(&self, error: &ErrorDefinition, prompt: &str, replies: &DispatchResult) -> StoreResult<i64> {
        let providers: IndexMap<String, ProviderField> = replies
            .iter()
            .map(|(name, reply)| {
                (
                    name.clone(),
                    ProviderField::new(reply.text.clone(), reply.elapsed_ms.map(|ms| ms as i64)),
                )
            })
            .collect();

        self.store.insert(&NewAnalysis {
            developer_name: self.developer_name.clone(),
            error_category: error.category.to_string(),
            error_code: error.code.to_string(),
            error_message: error.message.to_string(),
            prompt_sent: prompt.to_string(),
            providers,
            ..Default::default()
        })
    }

    /// Run the single-item pipeline, surfacing persistence errors
    pub async fn analyze_error(&self, error: &ErrorDefinition) -> StoreResult<ItemReport> {
        tracing::info!("Analyzing {} / {} ({})", error.category, error.code, error.name);
        let (prompt, replies) = self.collect(error).await;
        let id = self.persist(error, &prompt, &replies)?;
        tracing::info!("Saved analysis row {}", id);
        Ok(ItemReport {
            id,
            error: *error,
            replies,
        })
    }

    /// Analyze `count` catalog errors chosen by `selector`
    pub async fn run_batch(&self, count: usize, selector: &CategorySelector) -> Result<RunSummary, CatalogError> {
        let categories = self.catalog.list_categories();
        if categories.is_empty() {
            return Err(CatalogError::InvalidCategory("<empty catalog>".to_string()));
        }
        if let CategorySelector::Fixed { category, .. } = selector {
            self.catalog.category(category)?;
        }

        let catalog = self.catalog;
        let pick = |index: usize| -> Result<ErrorDefinition, CatalogError> {
            match selector {
                CategorySelector::Random => {
                    let category = categories[rand::thread_rng().gen_range(0..categories.len())];
                    catalog.pick_error(category, None)
                }
                CategorySelector::Seeded(seed) => {
                    let item_seed = seed.wrapping_add(index as u64);
                    let category = categories[(item_seed % categories.len() as u64) as usize];
                    catalog.pick_error(category, Some(item_seed))
                }
                CategorySelector::Fixed { category, seed } => {
                    catalog.pick_error(category, seed.map(|s| s.wrapping_add(index as u64)))
                }
            }
        };

        Ok(self.run_items(count, pick).await)
    }

    /// Analyze an explicit list of errors, e.g. the codes still missing
    pub async fn run_errors(&self, errors: &[ErrorDefinition]) -> RunSummary {
        self.run_items(errors.len(), |index| Ok(errors[index])).await
    }

    async fn run_items<F>(&self, total: usize, mut next: F) -> RunSummary
    where
        F: FnMut(usize) -> Result<ErrorDefinition, CatalogError>,
    {
        let mut summary = RunSummary::default();
        let mut failures = self.policy.tracker();

        for index in 0..total {
            summary.attempted += 1;

            let (persisted, rate_limited, all_errored) = match next(index) {
                Ok(error) => {
                    tracing::info!("[{}/{}] {} / {}", index + 1, total, error.category, error.code);
                    let (prompt, replies) = self.collect(&error).await;

                    let rate_limited = replies.values().any(|r| r.is_rate_limited());
                    if rate_limited {
                        let limited: Vec<&str> = replies
                            .iter()
                            .filter(|(_, r)| r.is_rate_limited())
                            .map(|(name, _)| name.as_str())
                            .collect();
                        tracing::warn!("Rate limit hit by {}", limited.join(", "));
                    }
                    let all_errored = !replies.is_empty() && replies.values().all(|r| r.is_error());
                    if all_errored {
                        tracing::warn!("Every provider failed on {}", error.code);
                    }

                    let persisted = match self.persist(&error, &prompt, &replies) {
                        Ok(id) => {
                            tracing::info!("Saved analysis row {}", id);
                            true
                        }
                        Err(e) => {
                            tracing::error!("Failed to save {}: {}", error.code, e);
                            false
                        }
                    };
                    (persisted, rate_limited, all_errored)
                }
                Err(e) => {
                    tracing::error!("Could not select error for item {}: {}", index + 1, e);
                    (false, false, false)
                }
            };

            if persisted {
                summary.persisted += 1;
            } else {
                summary.failed += 1;
            }
            if rate_limited {
                summary.rate_limited += 1;
            }
            if all_errored {
                summary.errored += 1;
            }

            match failures.record(ItemOutcome::classify(persisted, rate_limited, all_errored)) {
                Step::Halt => {
                    tracing::warn!(
                        "Stopping run after {} consecutive failures ({} of {} items done)",
                        failures.count(),
                        index + 1,
                        total
                    );
                    summary.halted_early = index + 1 < total;
                    break;
                }
                Step::Proceed { delay } => {
                    if index + 1 < total && !delay.is_zero() {
                        tracing::debug!("Waiting {}ms before next item", delay.as_millis());
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        summary
    }
}

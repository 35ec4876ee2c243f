//! Multi-provider LLM error analysis
//!
//! This crate sends realistic software-error scenarios to several LLM
//! providers at once, stores every answer side by side in SQLite, and
//! reconciles datasets collected by different operators through CSV.
//!
//! # Features
//!
//! - Built-in catalog of 75 errors across 12 categories
//! - Concurrent fan-out with per-provider timeouts; failures become error placeholders
//! - Chat-completions, Cohere and Gemini adapters configured from TOML
//! - Batch runs with pacing, rate-limit backoff and a consecutive-failure stop
//! - Backfill of a single provider's missing answers
//! - Quote-aware CSV export, import and multi-file merge
//! - Automated scoring and per-provider ranking of stored answers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use llm_error_analysis::{
//!     catalog::Catalog,
//!     config::Config,
//!     providers::create_providers,
//!     runner::{BatchRunner, CategorySelector, Dispatcher, FailurePolicy},
//!     store::SqliteStore,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load_or_default();
//!     let store = Arc::new(SqliteStore::open("data/analysis.db").unwrap());
//!
//!     let runner = BatchRunner::new(
//!         Catalog::builtin(),
//!         Dispatcher::new(create_providers(&config), config.batch.provider_timeout_ms),
//!         store,
//!         Config::developer_name(),
//!         FailurePolicy::from_config(&config.batch),
//!     );
//!     runner.prepare().unwrap();
//!
//!     let summary = runner.run_batch(5, &CategorySelector::Seeded(42)).await.unwrap();
//!     println!("saved {} of {}", summary.persisted, summary.attempted);
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod evaluation;
pub mod prompt;
pub mod providers;
pub mod reconcile;
pub mod reporting;
pub mod runner;
pub mod store;

pub use config::Config;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::catalog::{Catalog, CatalogError, ErrorDefinition};
    pub use crate::config::{ApiKind, Config, ProviderConfig};
    pub use crate::evaluation::{EvaluationReport, Evaluator, ScoreWeights};
    pub use crate::prompt::build_prompt;
    pub use crate::providers::{
        create_providers, create_providers_named, CompletionRequest, CompletionResponse, LLMProvider,
        Message, ProviderError, ProviderResult,
    };
    pub use crate::reconcile::{export_csv, import_csv, merge_files, ImportOptions, MergeMode};
    pub use crate::reporting::DatasetSummary;
    pub use crate::runner::{
        Backfiller, BatchRunner, CategorySelector, Dispatcher, FailurePolicy, ProviderReply, RunSummary,
    };
    pub use crate::store::{AnalysisRecord, AnalysisStore, Evaluation, NewAnalysis, SqliteStore};
}

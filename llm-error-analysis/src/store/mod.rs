//! Persistence for analysis rows
//!
//! One wide table holds a row per dispatched prompt: request metadata, a
//! nullable response/latency pair for every provider ever queried, and
//! evaluation fields. The provider set is an open map, and columns are
//! added as providers appear without rewriting existing rows.

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteStore;

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;

/// Response and latency recorded for one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderField {
    pub response: Option<String>,
    pub response_time_ms: Option<i64>,
}

impl ProviderField {
    pub fn new(response: impl Into<String>, response_time_ms: Option<i64>) -> Self {
        Self {
            response: Some(response.into()),
            response_time_ms,
        }
    }
}

/// Manual evaluation fields
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    pub best_llm: Option<String>,
    pub notes: Option<String>,
    pub worst_llm: Option<String>,
    pub description: Option<String>,
}

impl Evaluation {
    pub fn is_empty(&self) -> bool {
        self.best_llm.is_none()
            && self.notes.is_none()
            && self.worst_llm.is_none()
            && self.description.is_none()
    }
}

/// A stored analysis row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub created_at: String,
    pub developer_name: String,
    pub error_category: String,
    pub error_code: String,
    pub error_message: String,
    pub prompt_sent: String,
    /// Keyed by provider column stem, in column order
    pub providers: IndexMap<String, ProviderField>,
    pub evaluation: Evaluation,
}

impl AnalysisRecord {
    pub fn response(&self, provider: &str) -> Option<&str> {
        self.providers.get(provider).and_then(|f| f.response.as_deref())
    }
}

/// A row to insert. Providers absent from the map are stored as NULL.
#[derive(Debug, Clone, Default)]
pub struct NewAnalysis {
    pub developer_name: String,
    pub error_category: String,
    pub error_code: String,
    pub error_message: String,
    pub prompt_sent: String,
    /// Server default is used when `None`
    pub created_at: Option<String>,
    pub providers: IndexMap<String, ProviderField>,
    pub evaluation: Evaluation,
}

/// Per-provider fill state across the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderCoverage {
    pub provider: String,
    pub answered: u64,
    pub errored: u64,
    pub missing: u64,
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid provider key '{0}' (expected [a-z][a-z0-9_]*)")]
    InvalidProvider(String),

    #[error("Unknown provider '{0}': no such columns")]
    UnknownProvider(String),

    #[error("Store connection lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence port used by the runner and the reconciliation tools
pub trait AnalysisStore: Send + Sync {
    /// Add columns for a provider if absent
    fn ensure_provider(&self, provider: &str) -> StoreResult<()>;

    /// Provider stems present in the table, in column order
    fn provider_columns(&self) -> StoreResult<Vec<String>>;

    /// Insert one row and return its id. Unseen providers get columns first.
    fn insert(&self, record: &NewAnalysis) -> StoreResult<i64>;

    fn get_by_id(&self, id: i64) -> StoreResult<Option<AnalysisRecord>>;

    /// All rows, newest first
    fn list_all(&self) -> StoreResult<Vec<AnalysisRecord>>;

    fn list_by_category(&self, category: &str) -> StoreResult<Vec<AnalysisRecord>>;

    /// Overwrite one provider's response and latency. Returns `None` when the
    /// row does not exist.
    fn update_provider_fields(
        &self,
        id: i64,
        provider: &str,
        text: Option<&str>,
        elapsed_ms: Option<i64>,
    ) -> StoreResult<Option<AnalysisRecord>>;

    /// Set evaluation fields; `None` members keep the stored value
    fn update_evaluation(&self, id: i64, evaluation: &Evaluation) -> StoreResult<Option<AnalysisRecord>>;

    fn distinct_error_codes(&self) -> StoreResult<BTreeSet<String>>;

    /// Row counts per category, largest first
    fn aggregate_by_category(&self) -> StoreResult<IndexMap<String, u64>>;

    /// Counts of rows naming each provider as best, largest first
    fn aggregate_by_best_provider(&self) -> StoreResult<IndexMap<String, u64>>;

    /// Row counts per operator, largest first
    fn aggregate_by_developer(&self) -> StoreResult<IndexMap<String, u64>>;

    fn count(&self) -> StoreResult<u64>;

    /// Delete every row and restart the id sequence
    fn clear(&self) -> StoreResult<()>;

    fn provider_coverage(&self) -> StoreResult<Vec<ProviderCoverage>>;

    /// Ids whose field for `provider` is NULL, or sentinel text when
    /// `include_sentinels` is set, ascending
    fn ids_needing_backfill(&self, provider: &str, include_sentinels: bool) -> StoreResult<Vec<i64>>;
}

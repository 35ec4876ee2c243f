//! CSV exchange between independently collected datasets
//!
//! Export writes every column; import maps columns by case-insensitive
//! header name, so files from operators with different provider rosters or
//! column orders can be merged into one table.

pub mod csv;

use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::catalog::Catalog;
use crate::prompt::build_prompt;
use crate::store::schema::{self, EVALUATION_COLUMNS};
use crate::store::{AnalysisRecord, AnalysisStore, Evaluation, NewAnalysis, ProviderField, StoreError};

/// Older exports named the Llama-on-OpenRouter columns differently
const PROVIDER_ALIASES: &[(&str, &str)] = &[("openrouter_llama", "openrouter")];

/// Rows may be this many fields shorter than the header before being skipped
const COLUMN_SLACK: usize = 5;

const UNKNOWN_DEVELOPER: &str = "unknown";

/// Reconciliation errors
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0} is empty or has only headers")]
    EmptyFile(String),
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Add provider columns that appear only in the file
    pub extend_schema: bool,
}

/// Per-file import counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// Rows with too few fields
    pub skipped: usize,
    /// Rows rejected for missing data or by the store
    pub failed: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.imported + self.skipped + self.failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Keep existing rows
    Append,
    /// Delete every row and restart ids before loading
    Replace,
}

/// Result of a multi-file merge
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub files: Vec<(PathBuf, ImportSummary)>,
    /// Rows in the table after the merge
    pub total_rows: u64,
    /// Rows per operator after the merge, largest first
    pub by_developer: IndexMap<String, u64>,
}

impl MergeReport {
    pub fn imported(&self) -> usize {
        self.files.iter().map(|(_, s)| s.imported).sum()
    }
}

fn column_value(record: &AnalysisRecord, column: &str) -> Option<String> {
    match column {
        "id" => Some(record.id.to_string()),
        "developer_name" => Some(record.developer_name.clone()),
        "created_at" => Some(record.created_at.clone()),
        "error_category" => Some(record.error_category.clone()),
        "error_code" => Some(record.error_code.clone()),
        "error_message" => Some(record.error_message.clone()),
        "prompt_sent" => Some(record.prompt_sent.clone()),
        "best_llm" => record.evaluation.best_llm.clone(),
        "notes" => record.evaluation.notes.clone(),
        "worst_llm" => record.evaluation.worst_llm.clone(),
        "description" => record.evaluation.description.clone(),
        other => {
            if let Some(provider) = other.strip_suffix("_response_time") {
                record
                    .providers
                    .get(provider)
                    .and_then(|f| f.response_time_ms)
                    .map(|ms| ms.to_string())
            } else if let Some(provider) = other.strip_suffix("_response") {
                record.providers.get(provider).and_then(|f| f.response.clone())
            } else {
                None
            }
        }
    }
}

/// Write every row, every column, ordered by id. Returns the row count.
pub fn export_csv<W: Write>(store: &dyn AnalysisStore, writer: &mut W) -> Result<usize, ReconcileError> {
    let layout = schema::export_layout(&store.provider_columns()?);
    let mut records = store.list_all()?;
    records.sort_by_key(|r| r.id);

    csv::write_row(writer, &layout)?;
    for record in &records {
        let values: Vec<String> = layout
            .iter()
            .map(|column| column_value(record, column).unwrap_or_default())
            .collect();
        csv::write_row(writer, &values)?;
    }
    writer.flush()?;

    Ok(records.len())
}

/// `llm_data_export_<developer>_<epoch millis>.csv`
pub fn default_export_name(developer: &str) -> String {
    let developer = if developer.trim().is_empty() {
        UNKNOWN_DEVELOPER
    } else {
        developer
    };
    format!(
        "llm_data_export_{}_{}.csv",
        developer,
        chrono::Utc::now().timestamp_millis()
    )
}

/// Export to `path`, or to the default file name in the working directory
pub fn export_file(
    store: &dyn AnalysisStore,
    path: Option<&Path>,
    developer: &str,
) -> Result<(PathBuf, usize), ReconcileError> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(default_export_name(developer)));

    let mut writer = BufWriter::new(fs::File::create(&path)?);
    let rows = export_csv(store, &mut writer)?;
    tracing::info!("Exported {} rows to {}", rows, path.display());
    Ok((path, rows))
}

/// Integer prefix of a string, like `parseInt`: `"1234ms"` is 1234, `""` is none
fn parse_lenient_int(value: &str) -> Option<i64> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"^\s*([+-]?\d+)").unwrap());
    pattern
        .captures(value)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn canonical_provider(stem: &str) -> &str {
    PROVIDER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == stem)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(stem)
}

/// Header stems that name all spellings of a canonical provider
fn provider_spellings(provider: &str) -> Vec<&str> {
    let mut spellings = vec![provider];
    spellings.extend(
        PROVIDER_ALIASES
            .iter()
            .filter(|(_, canonical)| *canonical == provider)
            .map(|(alias, _)| *alias),
    );
    spellings
}

/// Canonical provider stems mentioned by the headers, in header order
fn providers_in_headers(headers: &[String]) -> Vec<String> {
    let mut providers: Vec<String> = Vec::new();
    for header in headers {
        let stem = header
            .strip_suffix("_response_time")
            .or_else(|| header.strip_suffix("_response"));
        if let Some(stem) = stem {
            let canonical = canonical_provider(stem).to_string();
            if !providers.contains(&canonical) {
                providers.push(canonical);
            }
        }
    }
    providers
}

/// Import rows from CSV text into the store
pub fn import_csv(
    store: &dyn AnalysisStore,
    content: &str,
    options: &ImportOptions,
) -> Result<ImportSummary, ReconcileError> {
    import_rows(store, content, options, "input")
}

/// Import one CSV file
pub fn import_file(
    store: &dyn AnalysisStore,
    path: impl AsRef<Path>,
    options: &ImportOptions,
) -> Result<ImportSummary, ReconcileError> {
    let content = fs::read_to_string(path.as_ref())?;
    import_rows(store, &content, options, &path.as_ref().display().to_string())
}

fn import_rows(
    store: &dyn AnalysisStore,
    content: &str,
    options: &ImportOptions,
    source: &str,
) -> Result<ImportSummary, ReconcileError> {
    let rows = csv::parse_csv(content);
    if rows.len() < 2 {
        return Err(ReconcileError::EmptyFile(source.to_string()));
    }

    let header_names: Vec<String> = rows[0]
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();
    let headers: HashMap<String, usize> = header_names
        .iter()
        .enumerate()
        .map(|(index, name)| (name.clone(), index))
        .collect();
    let data = &rows[1..];
    tracing::info!("{}: {} columns, {} records", source, header_names.len(), data.len());

    let existing = store.provider_columns()?;
    let mut providers = Vec::new();
    for provider in providers_in_headers(&header_names) {
        if existing.contains(&provider) {
            providers.push(provider);
        } else if options.extend_schema {
            match store.ensure_provider(&provider) {
                Ok(()) => providers.push(provider),
                Err(e) => tracing::warn!("Ignoring columns for {}: {}", provider, e),
            }
        } else {
            tracing::warn!("Ignoring columns for {} (not in this database)", provider);
        }
    }

    let catalog = Catalog::builtin();
    let mut summary = ImportSummary::default();

    for (index, values) in data.iter().enumerate() {
        let row_number = index + 1;
        if values.len() + COLUMN_SLACK < header_names.len() {
            tracing::warn!("Row {} skipped (too few columns: {})", row_number, values.len());
            summary.skipped += 1;
            continue;
        }

        let get = |name: &str| -> Option<String> {
            headers
                .get(name)
                .and_then(|&i| values.get(i))
                .filter(|v| !v.is_empty())
                .cloned()
        };

        let (category, code) = match (get("error_category"), get("error_code")) {
            (Some(category), Some(code)) => (category, code),
            _ => {
                tracing::warn!("Row {} failed: missing error_category or error_code", row_number);
                summary.failed += 1;
                continue;
            }
        };

        let (message, prompt) = match (get("error_message"), get("prompt_sent")) {
            (Some(message), Some(prompt)) => (message, prompt),
            (message, prompt) => match catalog.lookup_error(&category, &code) {
                Ok(error) => (
                    message.unwrap_or_else(|| error.message.to_string()),
                    prompt.unwrap_or_else(|| build_prompt(&error)),
                ),
                Err(e) => {
                    tracing::warn!("Row {} failed: cannot rebuild request ({})", row_number, e);
                    summary.failed += 1;
                    continue;
                }
            },
        };

        let mut fields = IndexMap::new();
        for provider in &providers {
            let spellings = provider_spellings(provider);
            let response = spellings
                .iter()
                .find_map(|stem| get(&schema::response_column(stem)));
            let response_time_ms = spellings
                .iter()
                .find_map(|stem| get(&schema::time_column(stem)))
                .and_then(|v| parse_lenient_int(&v));
            if response.is_some() || response_time_ms.is_some() {
                fields.insert(provider.clone(), ProviderField { response, response_time_ms });
            }
        }

        let [best_llm, notes, worst_llm, description] = EVALUATION_COLUMNS.map(get);

        let record = NewAnalysis {
            developer_name: get("developer_name").unwrap_or_else(|| UNKNOWN_DEVELOPER.to_string()),
            error_category: category,
            error_code: code,
            error_message: message,
            prompt_sent: prompt,
            created_at: get("created_at"),
            providers: fields,
            evaluation: Evaluation {
                best_llm,
                notes,
                worst_llm,
                description,
            },
        };

        match store.insert(&record) {
            Ok(_) => {
                summary.imported += 1;
                if summary.imported % 50 == 0 {
                    tracing::info!("Imported {} records from {}...", summary.imported, source);
                }
            }
            Err(e) => {
                tracing::error!("Error importing row {}: {}", row_number, e);
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        "{}: imported {}, skipped {}, failed {}",
        source,
        summary.imported,
        summary.skipped,
        summary.failed
    );
    Ok(summary)
}

/// Import several files into one table.
///
/// Every file is read before anything is written, so an unreadable path
/// never leaves a `Replace` merge with an emptied table.
pub fn merge_files<P: AsRef<Path>>(
    store: &dyn AnalysisStore,
    paths: &[P],
    mode: MergeMode,
    options: &ImportOptions,
) -> Result<MergeReport, ReconcileError> {
    let contents = paths
        .iter()
        .map(|p| fs::read_to_string(p.as_ref()).map(|c| (p.as_ref().to_path_buf(), c)))
        .collect::<Result<Vec<_>, _>>()?;

    if mode == MergeMode::Replace {
        tracing::warn!("Clearing existing data before import");
        store.clear()?;
    }

    let mut files = Vec::with_capacity(contents.len());
    for (index, (path, content)) in contents.into_iter().enumerate() {
        tracing::info!("Processing file {}/{}: {}", index + 1, paths.len(), path.display());
        let summary = match import_rows(store, &content, options, &path.display().to_string()) {
            Ok(summary) => summary,
            Err(ReconcileError::EmptyFile(source)) => {
                tracing::warn!("{} is empty or has only headers, skipping", source);
                ImportSummary::default()
            }
            Err(e) => return Err(e),
        };
        files.push((path, summary));
    }

    Ok(MergeReport {
        files,
        total_rows: store.count()?,
        by_developer: store.aggregate_by_developer()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use tempfile::TempDir;

    const ROSTER: [&str; 6] = [
        "groq",
        "mistral",
        "cohere",
        "openrouter",
        "openrouter_mistral",
        "openrouter_hermes",
    ];

    fn store_with_roster() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        for provider in ROSTER {
            store.ensure_provider(provider).unwrap();
        }
        store
    }

    fn seeded_store() -> SqliteStore {
        let store = store_with_roster();
        let catalog = Catalog::builtin();

        let error = catalog.lookup_error("NET_ERR", "ConnectionReset").unwrap();
        let mut providers = IndexMap::new();
        providers.insert(
            "groq".to_string(),
            ProviderField::new("1. Hatanın Nedeni: \"RST\", sunucu kapattı,\nyeniden dene", Some(1234)),
        );
        providers.insert(
            "openrouter_hermes".to_string(),
            ProviderField::new("Error: Request failed with status code 429 (rate limit): retry after 60000ms", None),
        );
        store
            .insert(&NewAnalysis {
                developer_name: "Ayse".to_string(),
                error_category: error.category.to_string(),
                error_code: error.code.to_string(),
                error_message: error.message.to_string(),
                prompt_sent: build_prompt(&error),
                created_at: Some("2024-11-02 09:15:00".to_string()),
                providers,
                evaluation: Evaluation {
                    best_llm: Some("groq".to_string()),
                    notes: Some("kısa, net".to_string()),
                    ..Default::default()
                },
            })
            .unwrap();

        let error = catalog.lookup_error("API_ERR", "404").unwrap();
        let mut providers = IndexMap::new();
        providers.insert("cohere".to_string(), ProviderField::new("404 analizi", Some(88)));
        store
            .insert(&NewAnalysis {
                developer_name: "Mehmet".to_string(),
                error_category: error.category.to_string(),
                error_code: error.code.to_string(),
                error_message: error.message.to_string(),
                prompt_sent: build_prompt(&error),
                created_at: Some("2024-11-03 10:00:00".to_string()),
                providers,
                ..Default::default()
            })
            .unwrap();

        store
    }

    fn without_ids(mut records: Vec<AnalysisRecord>) -> Vec<AnalysisRecord> {
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        for record in &mut records {
            record.id = 0;
        }
        records
    }

    #[test]
    fn test_export_import_round_trip() {
        let source = seeded_store();
        let mut out = Vec::new();
        assert_eq!(export_csv(&source, &mut out).unwrap(), 2);

        let target = store_with_roster();
        let summary = import_csv(&target, std::str::from_utf8(&out).unwrap(), &ImportOptions::default()).unwrap();
        assert_eq!(summary, ImportSummary { imported: 2, skipped: 0, failed: 0 });

        assert_eq!(
            without_ids(target.list_all().unwrap()),
            without_ids(source.list_all().unwrap())
        );
    }

    #[test]
    fn test_export_header_layout() {
        let source = seeded_store();
        let mut out = Vec::new();
        export_csv(&source, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let header = text.lines().next().unwrap();

        assert!(header.starts_with("id,developer_name,created_at,error_category,error_code,error_message,prompt_sent,groq_response,"));
        assert!(header.ends_with("openrouter_hermes_response_time,best_llm,notes,worst_llm,description"));
    }

    #[test]
    fn test_partial_columns_import_as_null() {
        let csv_text = "\
id,developer_name,created_at,error_category,error_code,error_message,prompt_sent,groq_response,mistral_response,cohere_response,groq_response_time,mistral_response_time,cohere_response_time,best_llm
1,Ayse,2024-11-02 09:15:00,NET_ERR,ConnectionReset,reset,prompt one,g1,m1,c1,100,200,300,groq
2,Ayse,2024-11-02 09:16:00,DB_ERR,DeadlockDetected,deadlock,prompt two,g2,,c2,110,,,
";
        let store = store_with_roster();
        let summary = import_csv(&store, csv_text, &ImportOptions::default()).unwrap();
        assert_eq!(summary.imported, 2);

        for record in store.list_all().unwrap() {
            for provider in ["openrouter", "openrouter_mistral", "openrouter_hermes"] {
                assert_eq!(record.providers[provider], ProviderField::default());
            }
            assert!(record.evaluation.notes.is_none());
            assert!(record.evaluation.worst_llm.is_none());
        }

        let deadlock = store.list_by_category("DB_ERR").unwrap().remove(0);
        assert_eq!(deadlock.response("mistral"), None);
        assert_eq!(deadlock.providers["groq"].response_time_ms, Some(110));
        assert_eq!(deadlock.providers["cohere"].response_time_ms, None);
        assert!(deadlock.evaluation.best_llm.is_none());
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let header = schema::export_layout(&ROSTER.map(String::from));
        assert_eq!(header.len(), 23);

        let mut within_slack = vec!["1", "Ayse", "2024-11-02 09:15:00", "NET_ERR", "ConnectionReset", "reset", "prompt"];
        within_slack.resize(header.len() - COLUMN_SLACK, "");
        let too_short = ["2", "Ayse", "2024-11-02", "NET_ERR"];

        let csv_text = format!("{}\n{}\n{}\n", header.join(","), within_slack.join(","), too_short.join(","));
        let store = store_with_roster();
        let summary = import_csv(&store, &csv_text, &ImportOptions::default()).unwrap();

        assert_eq!(summary, ImportSummary { imported: 1, skipped: 1, failed: 0 });
        assert_eq!(store.list_all().unwrap()[0].error_code, "ConnectionReset");
    }

    #[test]
    fn test_case_insensitive_headers_and_alias() {
        let csv_text = "\
ERROR_CODE,Error_Category,Developer_Name,OpenRouter_Llama_Response,openrouter_llama_response_time,error_message,prompt_sent
404,API_ERR,Ayse,llama says,\" 742ms\",msg,prompt
";
        let store = store_with_roster();
        import_csv(&store, csv_text, &ImportOptions::default()).unwrap();

        let record = store.list_all().unwrap().remove(0);
        assert_eq!(record.error_code, "404");
        assert_eq!(record.developer_name, "Ayse");
        assert_eq!(record.response("openrouter"), Some("llama says"));
        assert_eq!(record.providers["openrouter"].response_time_ms, Some(742));
    }

    #[test]
    fn test_missing_request_fields_rebuilt_from_catalog() {
        let csv_text = "\
error_category,error_code,groq_response
NET_ERR,HostUnreachable,answer
NET_ERR,NoSuchCode,answer
,ConnectionReset,answer
";
        let store = store_with_roster();
        let summary = import_csv(&store, csv_text, &ImportOptions::default()).unwrap();
        assert_eq!(summary, ImportSummary { imported: 1, skipped: 0, failed: 2 });

        let record = store.list_all().unwrap().remove(0);
        let error = Catalog::builtin().lookup_error("NET_ERR", "HostUnreachable").unwrap();
        assert_eq!(record.prompt_sent, build_prompt(&error));
        assert_eq!(record.error_message, error.message);
        assert_eq!(record.developer_name, "unknown");
    }

    #[test]
    fn test_extend_schema_controls_unknown_providers() {
        let csv_text = "\
error_category,error_code,error_message,prompt_sent,gemini_response,gemini_response_time
NET_ERR,ConnectionReset,m,p,gemini says,900
";
        let store = store_with_roster();
        import_csv(&store, csv_text, &ImportOptions::default()).unwrap();
        assert!(!store.provider_columns().unwrap().contains(&"gemini".to_string()));

        import_csv(&store, csv_text, &ImportOptions { extend_schema: true }).unwrap();
        assert!(store.provider_columns().unwrap().contains(&"gemini".to_string()));
        let with_gemini = store
            .list_all()
            .unwrap()
            .into_iter()
            .filter(|r| r.response("gemini").is_some())
            .count();
        assert_eq!(with_gemini, 1);
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let store = store_with_roster();
        let err = import_csv(&store, "id,error_code\n", &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, ReconcileError::EmptyFile(_)));
    }

    #[test]
    fn test_merge_append_and_replace() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("ayse.csv");
        let second = dir.path().join("mehmet.csv");
        let empty = dir.path().join("empty.csv");
        fs::write(
            &first,
            "developer_name,error_category,error_code,error_message,prompt_sent\nAyse,NET_ERR,ConnectionReset,m,p\nAyse,NET_ERR,HostUnreachable,m,p\n",
        )
        .unwrap();
        fs::write(
            &second,
            "error_code,error_category,developer_name,error_message,prompt_sent\n404,API_ERR,Mehmet,m,p\n",
        )
        .unwrap();
        fs::write(&empty, "").unwrap();

        let store = store_with_roster();
        let report = merge_files(&store, &[&first, &second, &empty], MergeMode::Append, &ImportOptions::default()).unwrap();
        assert_eq!(report.imported(), 3);
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.by_developer.get_index(0), Some((&"Ayse".to_string(), &2)));
        assert_eq!(report.files[2].1, ImportSummary::default());

        merge_files(&store, &[&second], MergeMode::Append, &ImportOptions::default()).unwrap();
        assert_eq!(store.count().unwrap(), 4);

        let report = merge_files(&store, &[&second], MergeMode::Replace, &ImportOptions::default()).unwrap();
        assert_eq!(report.total_rows, 1);
        assert_eq!(store.list_all().unwrap()[0].id, 1);
    }

    #[test]
    fn test_merge_with_unreadable_file_keeps_data() {
        let store = seeded_store();
        let missing = Path::new("/definitely/not/here.csv");
        let result = merge_files(&store, &[missing], MergeMode::Replace, &ImportOptions::default());
        assert!(matches!(result, Err(ReconcileError::Io(_))));
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_export_file_default_name() {
        let name = default_export_name("Ayse");
        assert!(name.starts_with("llm_data_export_Ayse_"));
        assert!(name.ends_with(".csv"));
        assert!(default_export_name("").starts_with("llm_data_export_unknown_"));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let (written, rows) = export_file(&seeded_store(), Some(&path), "Ayse").unwrap();
        assert_eq!(written, path);
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_lenient_int() {
        assert_eq!(parse_lenient_int("1234"), Some(1234));
        assert_eq!(parse_lenient_int(" 88ms"), Some(88));
        assert_eq!(parse_lenient_int("12.9"), Some(12));
        assert_eq!(parse_lenient_int("n/a"), None);
        assert_eq!(parse_lenient_int(""), None);
    }
}

//! Table layout and versioned migrations

use rusqlite::Connection;

use super::{StoreError, StoreResult};

pub const TABLE: &str = "llm_error_analysis";

/// Request metadata columns written on insert, in table order
pub const REQUEST_COLUMNS: [&str; 5] = [
    "developer_name",
    "error_category",
    "error_code",
    "error_message",
    "prompt_sent",
];

/// Evaluation columns, in table order
pub const EVALUATION_COLUMNS: [&str; 4] = ["best_llm", "notes", "worst_llm", "description"];

const RESPONSE_SUFFIX: &str = "_response";
const TIME_SUFFIX: &str = "_response_time";

/// Base schema migrations, applied in order and tracked with `PRAGMA user_version`.
/// Provider columns are not part of these; they are added per provider.
const MIGRATIONS: &[&str] = &[
    // v1: request metadata and first evaluation fields
    "CREATE TABLE IF NOT EXISTS llm_error_analysis (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        developer_name TEXT NOT NULL DEFAULT 'unknown',
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        error_category TEXT NOT NULL,
        error_code TEXT NOT NULL,
        error_message TEXT NOT NULL,
        prompt_sent TEXT NOT NULL,
        best_llm TEXT,
        notes TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_analysis_category ON llm_error_analysis(error_category);
    CREATE INDEX IF NOT EXISTS idx_analysis_created_at ON llm_error_analysis(created_at);
    CREATE INDEX IF NOT EXISTS idx_analysis_best_llm ON llm_error_analysis(best_llm);",
    // v2: worst-provider label and free-text description
    "ALTER TABLE llm_error_analysis ADD COLUMN worst_llm TEXT;
    ALTER TABLE llm_error_analysis ADD COLUMN description TEXT;",
];

pub fn schema_version() -> i64 {
    MIGRATIONS.len() as i64
}

/// Bring the base schema up to the latest version
pub fn migrate(conn: &Connection) -> StoreResult<()> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current.max(0) as usize) {
        let version = index as i64 + 1;
        tracing::debug!("Applying schema migration v{}", version);
        conn.execute_batch(sql)?;
        conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
    }

    Ok(())
}

/// Provider keys become column stems, so they are restricted to `[a-z][a-z0-9_]*`
pub fn validate_provider_key(key: &str) -> StoreResult<()> {
    let mut chars = key.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidProvider(key.to_string()))
    }
}

pub fn response_column(provider: &str) -> String {
    format!("{}{}", provider, RESPONSE_SUFFIX)
}

pub fn time_column(provider: &str) -> String {
    format!("{}{}", provider, TIME_SUFFIX)
}

/// Column names in table order
pub fn table_columns(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", TABLE))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Provider stems that have both a response and a time column, in the order
/// their columns were added
pub fn provider_keys(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter_map(|c| c.strip_suffix(RESPONSE_SUFFIX))
        .filter(|stem| columns.iter().any(|c| *c == time_column(stem)))
        .map(str::to_string)
        .collect()
}

/// Add the response and time columns for a provider if absent.
/// Existing rows are left untouched and read back as NULL.
pub fn ensure_provider_columns(conn: &Connection, provider: &str) -> StoreResult<bool> {
    validate_provider_key(provider)?;
    let columns = table_columns(conn)?;
    let response = response_column(provider);
    let time = time_column(provider);

    let mut added = false;
    if !columns.contains(&response) {
        conn.execute_batch(&format!("ALTER TABLE {} ADD COLUMN \"{}\" TEXT", TABLE, response))?;
        added = true;
    }
    if !columns.contains(&time) {
        conn.execute_batch(&format!("ALTER TABLE {} ADD COLUMN \"{}\" INTEGER", TABLE, time))?;
        added = true;
    }

    if added {
        tracing::info!("Added columns for provider {}", provider);
    }
    Ok(added)
}

/// Full column layout used for export: identity, request fields, every
/// provider response, every provider time, evaluation fields
pub fn export_layout(providers: &[String]) -> Vec<String> {
    let mut layout = vec![
        "id".to_string(),
        "developer_name".to_string(),
        "created_at".to_string(),
    ];
    layout.extend(REQUEST_COLUMNS.iter().skip(1).map(|c| c.to_string()));
    layout.extend(providers.iter().map(|p| response_column(p)));
    layout.extend(providers.iter().map(|p| time_column(p)));
    layout.extend(EVALUATION_COLUMNS.iter().map(|c| c.to_string()));
    layout
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();

        let version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0)).unwrap();
        assert_eq!(version, schema_version());

        let columns = table_columns(&conn).unwrap();
        assert!(columns.contains(&"worst_llm".to_string()));
        assert!(columns.contains(&"description".to_string()));
    }

    #[test]
    fn test_provider_key_validation() {
        assert!(validate_provider_key("openrouter_hermes").is_ok());
        assert!(validate_provider_key("groq2").is_ok());
        assert!(validate_provider_key("").is_err());
        assert!(validate_provider_key("2groq").is_err());
        assert!(validate_provider_key("groq; DROP TABLE x").is_err());
        assert!(validate_provider_key("Groq").is_err());
    }

    #[test]
    fn test_provider_columns_added_once() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        assert!(ensure_provider_columns(&conn, "groq").unwrap());
        assert!(!ensure_provider_columns(&conn, "groq").unwrap());
        assert!(ensure_provider_columns(&conn, "openrouter_mistral").unwrap());

        let columns = table_columns(&conn).unwrap();
        assert_eq!(provider_keys(&columns), vec!["groq", "openrouter_mistral"]);
    }

    #[test]
    fn test_export_layout_order() {
        let layout = export_layout(&["groq".to_string(), "cohere".to_string()]);
        assert_eq!(
            layout,
            vec![
                "id",
                "developer_name",
                "created_at",
                "error_category",
                "error_code",
                "error_message",
                "prompt_sent",
                "groq_response",
                "cohere_response",
                "groq_response_time",
                "cohere_response_time",
                "best_llm",
                "notes",
                "worst_llm",
                "description",
            ]
        );
    }
}

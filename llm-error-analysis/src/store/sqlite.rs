//! SQLite-backed analysis store

use indexmap::IndexMap;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Params, Row};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::schema::{self, EVALUATION_COLUMNS, REQUEST_COLUMNS, TABLE};
use super::{
    AnalysisRecord, AnalysisStore, Evaluation, NewAnalysis, ProviderCoverage, ProviderField, StoreError,
    StoreResult,
};
use crate::providers::SENTINEL_PREFIX;

/// Shared SQLite connection; clones share the same connection
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and migrate it
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        tracing::debug!("Opened database {}", path.as_ref().display());
        Self::from_connection(conn)
    }

    pub fn in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Close the connection. Other clones keep it open until they drop.
    pub fn close(self) -> StoreResult<()> {
        match Arc::try_unwrap(self.conn) {
            Ok(mutex) => {
                let conn = mutex.into_inner().map_err(|_| StoreError::Poisoned)?;
                conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
            }
            Err(_) => Ok(()),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn read_record(row: &Row<'_>, providers: &[String]) -> rusqlite::Result<AnalysisRecord> {
    let mut fields = IndexMap::with_capacity(providers.len());
    for provider in providers {
        fields.insert(
            provider.clone(),
            ProviderField {
                response: row.get(schema::response_column(provider).as_str())?,
                response_time_ms: row.get(schema::time_column(provider).as_str())?,
            },
        );
    }

    Ok(AnalysisRecord {
        id: row.get("id")?,
        created_at: row.get("created_at")?,
        developer_name: row.get("developer_name")?,
        error_category: row.get("error_category")?,
        error_code: row.get("error_code")?,
        error_message: row.get("error_message")?,
        prompt_sent: row.get("prompt_sent")?,
        providers: fields,
        evaluation: Evaluation {
            best_llm: row.get("best_llm")?,
            notes: row.get("notes")?,
            worst_llm: row.get("worst_llm")?,
            description: row.get("description")?,
        },
    })
}

fn current_providers(conn: &Connection) -> StoreResult<Vec<String>> {
    Ok(schema::provider_keys(&schema::table_columns(conn)?))
}

fn require_provider(conn: &Connection, provider: &str) -> StoreResult<()> {
    schema::validate_provider_key(provider)?;
    if current_providers(conn)?.iter().any(|p| p == provider) {
        Ok(())
    } else {
        Err(StoreError::UnknownProvider(provider.to_string()))
    }
}

/// Run `SELECT * FROM <table> <tail>` and decode every row
fn query_records<P: Params>(conn: &Connection, tail: &str, params: P) -> StoreResult<Vec<AnalysisRecord>> {
    let providers = current_providers(conn)?;
    let mut stmt = conn.prepare(&format!("SELECT * FROM {} {}", TABLE, tail))?;
    let records = stmt
        .query_map(params, |row| read_record(row, &providers))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

fn fetch_one(conn: &Connection, id: i64) -> StoreResult<Option<AnalysisRecord>> {
    let providers = current_providers(conn)?;
    let mut stmt = conn.prepare(&format!("SELECT * FROM {} WHERE id = ?1", TABLE))?;
    let record = stmt
        .query_row(params![id], |row| read_record(row, &providers))
        .optional()?;
    Ok(record)
}

fn aggregate(conn: &Connection, column: &str) -> StoreResult<IndexMap<String, u64>> {
    let sql = format!(
        "SELECT {col}, COUNT(*) AS n FROM {table}
         WHERE {col} IS NOT NULL AND {col} <> ''
         GROUP BY {col} ORDER BY n DESC, {col} ASC",
        col = column,
        table = TABLE
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

    let mut counts = IndexMap::new();
    for row in rows {
        let (key, n) = row?;
        counts.insert(key, n as u64);
    }
    Ok(counts)
}

fn text_value(value: &Option<String>) -> Value {
    value.clone().map(Value::Text).unwrap_or(Value::Null)
}

impl AnalysisStore for SqliteStore {
    fn ensure_provider(&self, provider: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        schema::ensure_provider_columns(&conn, provider)?;
        Ok(())
    }

    fn provider_columns(&self) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        current_providers(&conn)
    }

    fn insert(&self, record: &NewAnalysis) -> StoreResult<i64> {
        let conn = self.lock()?;
        for provider in record.providers.keys() {
            schema::ensure_provider_columns(&conn, provider)?;
        }

        let mut columns: Vec<String> = REQUEST_COLUMNS.iter().map(|c| c.to_string()).collect();
        let mut values = vec![
            Value::Text(record.developer_name.clone()),
            Value::Text(record.error_category.clone()),
            Value::Text(record.error_code.clone()),
            Value::Text(record.error_message.clone()),
            Value::Text(record.prompt_sent.clone()),
        ];

        if let Some(created_at) = &record.created_at {
            columns.push("created_at".to_string());
            values.push(Value::Text(created_at.clone()));
        }

        for (provider, field) in &record.providers {
            columns.push(schema::response_column(provider));
            values.push(text_value(&field.response));
            columns.push(schema::time_column(provider));
            values.push(field.response_time_ms.map(Value::Integer).unwrap_or(Value::Null));
        }

        let evaluation = &record.evaluation;
        let evaluation_values = [
            &evaluation.best_llm,
            &evaluation.notes,
            &evaluation.worst_llm,
            &evaluation.description,
        ];
        for (column, value) in EVALUATION_COLUMNS.iter().zip(evaluation_values) {
            columns.push(column.to_string());
            values.push(text_value(value));
        }

        let quoted = columns
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");

        conn.execute(
            &format!("INSERT INTO {} ({}) VALUES ({})", TABLE, quoted, placeholders),
            params_from_iter(values),
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!("Inserted analysis row {}", id);
        Ok(id)
    }

    fn get_by_id(&self, id: i64) -> StoreResult<Option<AnalysisRecord>> {
        let conn = self.lock()?;
        fetch_one(&conn, id)
    }

    fn list_all(&self) -> StoreResult<Vec<AnalysisRecord>> {
        let conn = self.lock()?;
        query_records(&conn, "ORDER BY created_at DESC, id DESC", [])
    }

    fn list_by_category(&self, category: &str) -> StoreResult<Vec<AnalysisRecord>> {
        let conn = self.lock()?;
        query_records(
            &conn,
            "WHERE error_category = ?1 ORDER BY created_at DESC, id DESC",
            params![category],
        )
    }

    fn update_provider_fields(
        &self,
        id: i64,
        provider: &str,
        text: Option<&str>,
        elapsed_ms: Option<i64>,
    ) -> StoreResult<Option<AnalysisRecord>> {
        let conn = self.lock()?;
        require_provider(&conn, provider)?;

        let changed = conn.execute(
            &format!(
                "UPDATE {} SET \"{}\" = ?1, \"{}\" = ?2 WHERE id = ?3",
                TABLE,
                schema::response_column(provider),
                schema::time_column(provider)
            ),
            params![text, elapsed_ms, id],
        )?;

        if changed == 0 {
            return Ok(None);
        }
        fetch_one(&conn, id)
    }

    fn update_evaluation(&self, id: i64, evaluation: &Evaluation) -> StoreResult<Option<AnalysisRecord>> {
        let conn = self.lock()?;
        let changed = conn.execute(
            &format!(
                "UPDATE {} SET
                    best_llm = COALESCE(?1, best_llm),
                    notes = COALESCE(?2, notes),
                    worst_llm = COALESCE(?3, worst_llm),
                    description = COALESCE(?4, description)
                 WHERE id = ?5",
                TABLE
            ),
            params![
                evaluation.best_llm,
                evaluation.notes,
                evaluation.worst_llm,
                evaluation.description,
                id
            ],
        )?;

        if changed == 0 {
            return Ok(None);
        }
        fetch_one(&conn, id)
    }

    fn distinct_error_codes(&self) -> StoreResult<BTreeSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("SELECT DISTINCT error_code FROM {}", TABLE))?;
        let codes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(codes)
    }

    fn aggregate_by_category(&self) -> StoreResult<IndexMap<String, u64>> {
        let conn = self.lock()?;
        aggregate(&conn, "error_category")
    }

    fn aggregate_by_best_provider(&self) -> StoreResult<IndexMap<String, u64>> {
        let conn = self.lock()?;
        aggregate(&conn, "best_llm")
    }

    fn aggregate_by_developer(&self) -> StoreResult<IndexMap<String, u64>> {
        let conn = self.lock()?;
        aggregate(&conn, "developer_name")
    }

    fn count(&self) -> StoreResult<u64> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", TABLE), [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn clear(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(&format!(
            "DELETE FROM {table}; DELETE FROM sqlite_sequence WHERE name = '{table}';",
            table = TABLE
        ))?;
        tracing::warn!("Cleared all rows from {}", TABLE);
        Ok(())
    }

    fn provider_coverage(&self) -> StoreResult<Vec<ProviderCoverage>> {
        let conn = self.lock()?;
        let mut coverage = Vec::new();

        for provider in current_providers(&conn)? {
            let column = schema::response_column(&provider);
            let sql = format!(
                "SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN \"{col}\" IS NULL OR \"{col}\" = '' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN substr(\"{col}\", 1, length(?1)) = ?1 THEN 1 ELSE 0 END), 0)
                 FROM {table}",
                col = column,
                table = TABLE
            );
            let (total, missing, errored): (i64, i64, i64) = conn.query_row(&sql, params![SENTINEL_PREFIX], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;

            coverage.push(ProviderCoverage {
                provider,
                answered: (total - missing - errored).max(0) as u64,
                errored: errored as u64,
                missing: missing as u64,
            });
        }

        Ok(coverage)
    }

    fn ids_needing_backfill(&self, provider: &str, include_sentinels: bool) -> StoreResult<Vec<i64>> {
        let conn = self.lock()?;
        require_provider(&conn, provider)?;

        let sql = format!(
            "SELECT id FROM {table}
             WHERE \"{col}\" IS NULL OR \"{col}\" = ''
                OR (?1 AND substr(\"{col}\", 1, length(?2)) = ?2)
             ORDER BY id",
            col = schema::response_column(provider),
            table = TABLE
        );
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params![include_sentinels, SENTINEL_PREFIX], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

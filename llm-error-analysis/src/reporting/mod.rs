//! Console summaries and the JSON dataset snapshot

use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;

use crate::catalog::{Catalog, ErrorDefinition};
use crate::evaluation::{EvaluationReport, WriteBackSummary};
use crate::reconcile::MergeReport;
use crate::runner::{ItemReport, RunSummary};
use crate::store::{AnalysisRecord, AnalysisStore, ProviderCoverage, StoreResult};

/// Point-in-time view of the table
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub generated_at: String,
    pub total_rows: u64,
    pub by_category: IndexMap<String, u64>,
    pub by_best_provider: IndexMap<String, u64>,
    pub by_developer: IndexMap<String, u64>,
    pub provider_coverage: Vec<ProviderCoverage>,
    /// Fraction of catalog codes with at least one row
    pub catalog_coverage: f64,
    pub missing_codes: usize,
}

impl DatasetSummary {
    pub fn collect(store: &dyn AnalysisStore, catalog: &Catalog) -> StoreResult<Self> {
        let present = store.distinct_error_codes()?;
        let missing_codes = catalog.missing_codes(&present).values().map(Vec::len).sum();

        Ok(Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            total_rows: store.count()?,
            by_category: store.aggregate_by_category()?,
            by_best_provider: store.aggregate_by_best_provider()?,
            by_developer: store.aggregate_by_developer()?,
            provider_coverage: store.provider_coverage()?,
            catalog_coverage: catalog.coverage(&present),
            missing_codes,
        })
    }

    /// Write to JSON file
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

/// First `max_chars` characters on one line, with an ellipsis when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

fn print_counts(title: &str, counts: &IndexMap<String, u64>) {
    println!("\n{}:", title);
    println!("{:-<50}", "");
    if counts.is_empty() {
        println!("  (none)");
    }
    for (key, count) in counts {
        println!("  {:<30} {:>6}", key, count);
    }
}

pub fn print_run_summary(title: &str, summary: &RunSummary) {
    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("  Attempted:    {}", summary.attempted);
    println!("  Saved:        {}", summary.persisted);
    println!("  Failed:       {}", summary.failed);
    println!("  Rate limited: {}", summary.rate_limited);
    println!("  All errors:   {}", summary.errored);
    if summary.halted_early {
        println!("  Stopped early after repeated failures");
    }
}

pub fn print_item_report(report: &ItemReport) {
    println!("\n=== {} / {} ===", report.error.category, report.error.code);
    println!("{}: {}", report.error.name, report.error.message);
    println!("Saved as row {}\n", report.id);

    for (provider, reply) in &report.replies {
        let latency = reply
            .elapsed_ms
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "-".to_string());
        let status = if reply.is_error() { "ERROR" } else { "OK" };
        println!("  [{:<5}] {:<20} {:>8}  {}", status, provider, latency, preview(&reply.text, 80));
    }
}

pub fn print_merge_report(report: &MergeReport) {
    println!("\n{}", "=".repeat(60));
    for (path, summary) in &report.files {
        println!(
            "  {}: imported {}, skipped {}, failed {} (of {})",
            path.display(),
            summary.imported,
            summary.skipped,
            summary.failed,
            summary.total()
        );
    }
    println!("\nTotal imported: {}", report.imported());
    print_counts("Data distribution by developer", &report.by_developer);
    println!("\nTotal records in database: {}", report.total_rows);
}

pub fn print_dataset_summary(summary: &DatasetSummary) {
    println!("\n=== Dataset Summary ===");
    println!("Total rows: {}", summary.total_rows);
    println!(
        "Catalog coverage: {:.1}% ({} codes missing)",
        summary.catalog_coverage * 100.0,
        summary.missing_codes
    );

    print_counts("Rows by category", &summary.by_category);
    print_counts("Best provider votes", &summary.by_best_provider);
    print_counts("Rows by developer", &summary.by_developer);

    println!("\nProvider responses:");
    println!("{:-<50}", "");
    println!("  {:<22} {:>8} {:>8} {:>8}", "provider", "answered", "errors", "missing");
    for coverage in &summary.provider_coverage {
        println!(
            "  {:<22} {:>8} {:>8} {:>8}",
            coverage.provider, coverage.answered, coverage.errored, coverage.missing
        );
    }
}

pub fn print_evaluation_report(report: &EvaluationReport) {
    println!("\n=== Automated Evaluation ===");
    println!("Rows evaluated: {}", report.rows_evaluated);
    if report.ranking.is_empty() {
        println!("\nNo responses to score");
        return;
    }

    println!("\nRanking:");
    println!("{:-<50}", "");
    for (position, rank) in report.ranking.iter().enumerate() {
        println!("  {}. {:<26} {:>6.2}/100", position + 1, rank.provider, rank.score);
    }

    println!("\nCriteria averages:");
    println!(
        "  {:<22} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}",
        "provider", "tech", "solve", "clear", "brief", "speed", "rel", "errors"
    );
    for (provider, evaluation) in &report.providers {
        let c = &evaluation.criteria;
        println!(
            "  {:<22} {:>6.1} {:>6.1} {:>6.1} {:>6.1} {:>6.1} {:>6.1} {:>6}",
            provider,
            c.technical_accuracy,
            c.solution_quality,
            c.clarity,
            c.conciseness,
            c.speed,
            c.reliability,
            evaluation.errors
        );
    }

    if let Some(best) = &report.best_llm {
        println!("\nBest provider:  {} ({:.2})", best.provider, best.score);
    }
    if let Some(worst) = &report.worst_llm {
        println!("Worst provider: {} ({:.2})", worst.provider, worst.score);
    }
}

pub fn print_write_back(summary: &WriteBackSummary) {
    println!(
        "\nVerdicts written: {} (kept {} labelled, {} undecided)",
        summary.updated, summary.kept_manual, summary.undecided
    );
}

pub fn print_missing(missing: &IndexMap<&'static str, Vec<ErrorDefinition>>, coverage: f64) {
    let total: usize = missing.values().map(Vec::len).sum();
    println!("\nCoverage: {:.1}%, {} codes without rows", coverage * 100.0, total);
    for (category, errors) in missing {
        println!("\n{} ({}):", category, errors.len());
        for error in errors {
            println!("  - {:<32} {}", error.code, error.name);
        }
    }
}

pub fn print_record(record: &AnalysisRecord) {
    println!("\n=== Row {} ===", record.id);
    println!("Created:   {}", record.created_at);
    println!("Developer: {}", record.developer_name);
    println!("Error:     {} / {}", record.error_category, record.error_code);
    println!("Message:   {}", record.error_message);

    for (provider, field) in &record.providers {
        let latency = field
            .response_time_ms
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "-".to_string());
        println!("\n--- {} ({}) ---", provider, latency);
        println!("{}", field.response.as_deref().unwrap_or("(no response)"));
    }

    let evaluation = &record.evaluation;
    if !evaluation.is_empty() {
        println!("\n--- Evaluation ---");
        if let Some(best) = &evaluation.best_llm {
            println!("Best:  {}", best);
        }
        if let Some(worst) = &evaluation.worst_llm {
            println!("Worst: {}", worst);
        }
        if let Some(notes) = &evaluation.notes {
            println!("Notes: {}", notes);
        }
        if let Some(description) = &evaluation.description {
            println!("Description: {}", description);
        }
    }
}

pub fn print_record_list(records: &[AnalysisRecord]) {
    println!("{:>5}  {:<19}  {:<14}  {:<28}  {}", "id", "created", "category", "code", "answered");
    for record in records {
        let answered = record
            .providers
            .values()
            .filter(|f| f.response.as_deref().is_some_and(|r| !crate::providers::is_sentinel(r)))
            .count();
        println!(
            "{:>5}  {:<19}  {:<14}  {:<28}  {}/{}",
            record.id,
            record.created_at,
            record.error_category,
            record.error_code,
            answered,
            record.providers.len()
        );
    }
    println!("\n{} rows", records.len());
}

pub fn print_categories(catalog: &Catalog) {
    println!("\nAvailable error categories:\n");
    for key in catalog.list_categories() {
        if let Ok(category) = catalog.category(key) {
            println!("  {:<14} {} ({} errors)", key, category.name, category.errors.len());
        }
    }
    println!("\nTotal: {} errors", catalog.error_count());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use tempfile::TempDir;

    #[test]
    fn test_preview_truncates_on_char_boundaries() {
        assert_eq!(preview("kısa", 10), "kısa");
        assert_eq!(preview("çok\nsatırlı   metin", 100), "çok satırlı metin");
        assert_eq!(preview("ğğğğğ", 3), "ğğğ...");
    }

    #[test]
    fn test_summary_of_empty_store() {
        let store = SqliteStore::in_memory().unwrap();
        let catalog = Catalog::builtin();
        let summary = DatasetSummary::collect(&store, &catalog).unwrap();

        assert_eq!(summary.total_rows, 0);
        assert_eq!(summary.missing_codes, catalog.error_count());
        assert_eq!(summary.catalog_coverage, 0.0);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.json");
        summary.write_to_file(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["total_rows"], 0);
    }
}

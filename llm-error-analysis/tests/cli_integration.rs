//! CLI integration tests for the llm-error-analysis binary.
//!
//! Every test runs inside its own temporary directory with provider keys
//! removed from the environment, so nothing here reaches the network.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const KEY_VARS: &[&str] = &[
    "GROQ_API_KEY",
    "MISTRAL_API_KEY",
    "COHERE_API_KEY",
    "OPENROUTER_API_KEY",
    "GEMINI_API_KEY",
];

// =============================================================================
// Helper Functions
// =============================================================================

fn bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_llm-error-analysis"))
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(bin());
    command.current_dir(dir).args(args).env("DEVELOPER_NAME", "tester");
    for var in KEY_VARS {
        command.env_remove(var);
    }
    command.output().expect("Failed to execute llm-error-analysis binary")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "Expected exit code 0, got {:?}\nstderr: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn stdout_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

// =============================================================================
// Catalog
// =============================================================================

#[test]
fn test_categories_lists_catalog() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["categories"]);
    assert_success(&output);

    let stdout = stdout_str(&output);
    assert!(stdout.contains("API_ERR"));
    assert!(stdout.contains("Total: 75 errors"));
}

#[test]
fn test_missing_on_empty_database_reports_everything() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["--database", "db/empty.db", "missing"]);
    assert_success(&output);

    let stdout = stdout_str(&output);
    assert!(stdout.contains("Coverage: 0.0%, 75 codes without rows"), "{}", stdout);
    assert!(dir.path().join("db/empty.db").exists());
}

// =============================================================================
// Providers
// =============================================================================

#[test]
fn test_analyze_without_keys_fails_with_hint() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["--database", "a.db", "analyze", "API_ERR"]);

    assert!(!output.status.success());
    assert!(stderr_str(&output).contains("GROQ_API_KEY"));
}

#[test]
fn test_analyze_unknown_category_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["--database", "a.db", "analyze", "NOPE_ERR"]);

    assert!(!output.status.success());
    assert!(stderr_str(&output).contains("NOPE_ERR"));
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn test_init_config_writes_loadable_file() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["init-config", "-o", "conf/analysis.toml"]);
    assert_success(&output);

    let content = std::fs::read_to_string(dir.path().join("conf/analysis.toml")).unwrap();
    assert!(content.contains("openrouter_mistral"));

    let output = run_in(dir.path(), &["-c", "conf/analysis.toml", "--database", "x.db", "stats"]);
    assert_success(&output);
    assert!(stdout_str(&output).contains("Total rows: 0"));
}

// =============================================================================
// Import / Export
// =============================================================================

#[test]
fn test_import_then_export_and_evaluate() {
    let dir = TempDir::new().unwrap();
    let csv = "id,developer_name,created_at,error_category,error_code,groq_response,groq_response_time,best_llm\n\
               7,alice,2024-05-01 10:00:00,API_ERR,404,\"Kaynak yok, yolu kontrol et\",812,groq\n\
               8,bob,,NET_ERR,ConnectionReset,,,\n";
    std::fs::write(dir.path().join("in.csv"), csv).unwrap();

    let output = run_in(dir.path(), &["--database", "m.db", "import", "in.csv"]);
    assert_success(&output);
    let stdout = stdout_str(&output);
    assert!(stdout.contains("Total imported: 2"), "{}", stdout);
    assert!(stdout.contains("alice"));

    let output = run_in(dir.path(), &["--database", "m.db", "evaluate", "1", "--worst", "mistral"]);
    assert_success(&output);
    assert!(stdout_str(&output).contains("Worst: mistral"));

    let output = run_in(dir.path(), &["--database", "m.db", "export", "-o", "out.csv"]);
    assert_success(&output);
    assert!(stdout_str(&output).contains("Exported 2 rows"));

    let exported = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
    let header = exported.lines().next().unwrap();
    assert!(header.starts_with("id,developer_name,created_at,error_category,error_code"));
    assert!(exported.contains("\"Kaynak yok, yolu kontrol et\""));
    assert!(exported.contains("2024-05-01 10:00:00"));
}

#[test]
fn test_import_clear_replaces_rows() {
    let dir = TempDir::new().unwrap();
    let csv = "developer_name,error_category,error_code\ncarol,API_ERR,500\n";
    std::fs::write(dir.path().join("one.csv"), csv).unwrap();

    assert_success(&run_in(dir.path(), &["--database", "r.db", "import", "one.csv"]));
    assert_success(&run_in(dir.path(), &["--database", "r.db", "import", "one.csv"]));
    let output = run_in(dir.path(), &["--database", "r.db", "import", "--clear", "one.csv"]);
    assert_success(&output);
    assert!(stdout_str(&output).contains("Total records in database: 1"));
}

#[test]
fn test_import_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["--database", "r.db", "import", "absent.csv"]);
    assert!(!output.status.success());
}

// =============================================================================
// Automated evaluation
// =============================================================================

#[test]
fn test_evaluate_all_ranks_and_writes_verdicts() {
    let dir = TempDir::new().unwrap();
    let csv = "developer_name,error_category,error_code,groq_response,groq_response_time,mistral_response,mistral_response_time\n\
               dana,DB_ERR,DeadlockDetected,\"## Neden\n\nKilitlenme sorgu sırası nedeniyle oluşuyor.\n\n1. Çözüm: işlemleri kısalt.\n2. Alternatif olarak kilit sırasını sabitle.\",1500,\"Error: Request failed with status code 500\",200\n";
    std::fs::write(dir.path().join("rows.csv"), csv).unwrap();
    assert_success(&run_in(dir.path(), &["--database", "e.db", "import", "rows.csv"]));

    let output = run_in(
        dir.path(),
        &["--database", "e.db", "evaluate-all", "--write", "-o", "report.json"],
    );
    assert_success(&output);
    let stdout = stdout_str(&output);
    assert!(stdout.contains("Best provider:  groq"), "{}", stdout);
    assert!(stdout.contains("Worst provider: mistral"), "{}", stdout);
    assert!(stdout.contains("Verdicts written: 1"), "{}", stdout);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(report["best_llm"]["provider"], "groq");
    assert_eq!(report["providers"]["mistral"]["errors"], 1);

    let output = run_in(dir.path(), &["--database", "e.db", "show", "1"]);
    assert_success(&output);
    let stdout = stdout_str(&output);
    assert!(stdout.contains("Best:  groq"));
    assert!(stdout.contains("Worst: mistral"));
}

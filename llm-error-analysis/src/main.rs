//! LLM Error Analysis CLI

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use llm_error_analysis::{
    catalog::{Catalog, ErrorDefinition},
    config::Config,
    evaluation::Evaluator,
    providers::{create_providers, create_providers_named, LLMProvider},
    reconcile::{export_file, merge_files, ImportOptions, MergeMode},
    reporting::{
        print_categories, print_dataset_summary, print_evaluation_report, print_item_report, print_merge_report,
        print_missing, print_record, print_record_list, print_run_summary, print_write_back, DatasetSummary,
    },
    runner::{Backfiller, BatchRunner, CategorySelector, Dispatcher, FailurePolicy},
    store::{AnalysisStore, Evaluation, SqliteStore},
};

#[derive(Parser)]
#[command(name = "llm-error-analysis")]
#[command(about = "Send software-error scenarios to several LLM providers and collect their analyses")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides the configured one)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Comma-separated provider keys (default: every enabled provider with a key)
    #[arg(short, long, global = true)]
    providers: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one error from a category
    Analyze {
        /// Category key, e.g. NET_ERR
        category: String,

        /// Operator name stored with the row (default: $DEVELOPER_NAME)
        #[arg(short, long)]
        developer: Option<String>,

        /// Deterministic pick: error index is seed mod category size
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Analyze one specific error code
    AnalyzeCode {
        category: String,
        code: String,

        #[arg(short, long)]
        developer: Option<String>,
    },

    /// Analyze a sequence of errors with pacing and failure limits
    Batch {
        /// Number of errors to analyze
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// Reproducible selection across operators
        #[arg(long)]
        seed: Option<u64>,

        /// Restrict the batch to one category
        #[arg(long)]
        category: Option<String>,

        /// Pause between items in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Consecutive failed items before stopping
        #[arg(long)]
        max_failures: Option<u32>,

        #[arg(short, long)]
        developer: Option<String>,
    },

    /// List catalog errors with no rows yet
    Missing {
        /// Analyze the missing errors
        #[arg(long)]
        generate: bool,

        /// Analyze at most this many
        #[arg(long)]
        limit: Option<usize>,

        #[arg(short, long)]
        developer: Option<String>,
    },

    /// Fill one provider's missing responses on existing rows
    Backfill {
        /// Provider key, e.g. openrouter_mistral
        #[arg(long)]
        provider: String,

        /// Also retry rows holding error placeholders
        #[arg(long)]
        include_errors: bool,

        /// Pause between rows in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Record a manual evaluation
    Evaluate {
        id: i64,

        #[arg(long)]
        best: Option<String>,

        #[arg(long)]
        worst: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Score every stored response and rank the providers
    EvaluateAll {
        /// Write per-row best and worst providers
        #[arg(long)]
        write: bool,

        /// Replace existing best/worst labels when writing
        #[arg(long, requires = "write")]
        overwrite: bool,

        /// Also write the report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List stored rows, newest first
    List {
        #[arg(long)]
        category: Option<String>,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one row with every response
    Show { id: i64 },

    /// Aggregate counts and coverage
    Stats {
        /// Also write the summary as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export every row to CSV
    Export {
        /// Output file (default: llm_data_export_<developer>_<timestamp>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long)]
        developer: Option<String>,
    },

    /// Import and merge CSV exports
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Delete existing rows first
        #[arg(long)]
        clear: bool,

        /// Add columns for providers found only in the files
        #[arg(long)]
        extend_schema: bool,
    },

    /// List error categories
    Categories,

    /// Generate sample configuration
    InitConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config/analysis.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("llm_error_analysis=debug,info")
    } else {
        EnvFilter::new("llm_error_analysis=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let catalog = Catalog::builtin();

    match cli.command {
        Commands::Categories => {
            print_categories(&catalog);
        }

        Commands::InitConfig { output } => {
            Config::default().save_toml(&output)?;
            println!("Configuration written to: {}", output.display());
        }

        Commands::Analyze { category, developer, seed } => {
            let config = load_config(&cli.config)?;
            let error = catalog.pick_error(&category, seed)?;
            analyze_one(&cli.database, &cli.providers, &config, catalog, error, developer).await?;
        }

        Commands::AnalyzeCode { category, code, developer } => {
            let config = load_config(&cli.config)?;
            let error = catalog.lookup_error(&category, &code)?;
            analyze_one(&cli.database, &cli.providers, &config, catalog, error, developer).await?;
        }

        Commands::Batch {
            count,
            seed,
            category,
            delay_ms,
            max_failures,
            developer,
        } => {
            let mut config = load_config(&cli.config)?;
            if let Some(delay_ms) = delay_ms {
                config.batch.inter_request_delay_ms = delay_ms;
            }
            if let Some(max_failures) = max_failures {
                config.batch.max_consecutive_failures = max_failures;
            }

            let selector = match (category, seed) {
                (Some(category), seed) => CategorySelector::Fixed { category, seed },
                (None, Some(seed)) => CategorySelector::Seeded(seed),
                (None, None) => CategorySelector::Random,
            };

            let store = open_store(&cli.database, &config)?;
            let runner = build_runner(&cli.providers, &config, catalog, store, developer)?;
            println!("=== Batch of {} ({:?}) ===", count, selector);
            let summary = runner.run_batch(count, &selector).await?;
            print_run_summary("Batch complete", &summary);
        }

        Commands::Missing { generate, limit, developer } => {
            let config = load_config(&cli.config)?;
            let store = open_store(&cli.database, &config)?;
            let present = store.distinct_error_codes()?;
            let missing = catalog.missing_codes(&present);
            print_missing(&missing, catalog.coverage(&present));

            if generate {
                let errors: Vec<ErrorDefinition> = missing
                    .values()
                    .flatten()
                    .copied()
                    .take(limit.unwrap_or(usize::MAX))
                    .collect();
                if errors.is_empty() {
                    println!("\nNothing to generate");
                    return Ok(());
                }
                let runner = build_runner(&cli.providers, &config, catalog, store, developer)?;
                let summary = runner.run_errors(&errors).await;
                print_run_summary("Missing errors generated", &summary);
            }
        }

        Commands::Backfill {
            provider,
            include_errors,
            delay_ms,
        } => {
            let mut config = load_config(&cli.config)?;
            if let Some(delay_ms) = delay_ms {
                config.batch.backfill_delay_ms = delay_ms;
            }
            let store = open_store(&cli.database, &config)?;
            let client = create_providers_named(&[provider.as_str()], &config)?.remove(0);

            let backfiller = Backfiller::new(
                client,
                store,
                FailurePolicy::for_backfill(&config.batch),
                config.batch.provider_timeout_ms,
            );
            let summary = backfiller.backfill(include_errors).await?;
            print_run_summary(&format!("Backfill of {} complete", provider), &summary);
        }

        Commands::Evaluate {
            id,
            best,
            worst,
            notes,
            description,
        } => {
            let evaluation = Evaluation {
                best_llm: best,
                notes,
                worst_llm: worst,
                description,
            };
            if evaluation.is_empty() {
                return Err("Nothing to update: pass --best, --worst, --notes or --description".into());
            }

            let config = load_config(&cli.config)?;
            let store = open_store(&cli.database, &config)?;
            let record = store
                .update_evaluation(id, &evaluation)?
                .ok_or_else(|| format!("No row with id {}", id))?;
            print_record(&record);
        }

        Commands::EvaluateAll { write, overwrite, output } => {
            let config = load_config(&cli.config)?;
            let store = open_store(&cli.database, &config)?;
            let evaluator = Evaluator::new(config.evaluation.clone());
            let report = evaluator.evaluate_store(store.as_ref())?;
            print_evaluation_report(&report);

            if write {
                let summary = evaluator.apply_verdicts(store.as_ref(), overwrite)?;
                print_write_back(&summary);
            }
            if let Some(output) = output {
                report.write_to_file(&output)?;
                println!("\nReport written to: {}", output.display());
            }
        }

        Commands::List { category, limit } => {
            let config = load_config(&cli.config)?;
            let store = open_store(&cli.database, &config)?;
            let mut records = match category {
                Some(category) => store.list_by_category(&category)?,
                None => store.list_all()?,
            };
            if let Some(limit) = limit {
                records.truncate(limit);
            }
            print_record_list(&records);
        }

        Commands::Show { id } => {
            let config = load_config(&cli.config)?;
            let store = open_store(&cli.database, &config)?;
            let record = store.get_by_id(id)?.ok_or_else(|| format!("No row with id {}", id))?;
            print_record(&record);
        }

        Commands::Stats { output } => {
            let config = load_config(&cli.config)?;
            let store = open_store(&cli.database, &config)?;
            let summary = DatasetSummary::collect(store.as_ref(), &catalog)?;
            print_dataset_summary(&summary);

            if let Some(output) = output {
                summary.write_to_file(&output)?;
                println!("\nSummary written to: {}", output.display());
            }
        }

        Commands::Export { output, developer } => {
            let config = load_config(&cli.config)?;
            let store = open_store(&cli.database, &config)?;
            let developer = developer.unwrap_or_else(Config::developer_name);
            let (path, rows) = export_file(store.as_ref(), output.as_deref(), &developer)?;
            println!("Exported {} rows to: {}", rows, path.display());
        }

        Commands::Import {
            files,
            clear,
            extend_schema,
        } => {
            let config = load_config(&cli.config)?;
            let store = open_store(&cli.database, &config)?;
            let mode = if clear { MergeMode::Replace } else { MergeMode::Append };
            let report = merge_files(store.as_ref(), &files, mode, &ImportOptions { extend_schema })?;
            print_merge_report(&report);
        }
    }

    Ok(())
}

fn load_config(path: &Option<PathBuf>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Config::from_file(path)?),
        None => Ok(Config::load_or_default()),
    }
}

/// Open the database and make sure every enabled provider has columns
fn open_store(
    database: &Option<PathBuf>,
    config: &Config,
) -> Result<Arc<SqliteStore>, Box<dyn std::error::Error>> {
    let path = database
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.database.path));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let store = SqliteStore::open(&path)?;
    for (name, _) in config.enabled_providers() {
        store.ensure_provider(name)?;
    }
    Ok(Arc::new(store))
}

fn select_providers(
    names: &Option<String>,
    config: &Config,
) -> Result<Vec<Arc<dyn LLMProvider>>, Box<dyn std::error::Error>> {
    let providers = match names {
        Some(names) => {
            let names: Vec<&str> = names.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
            create_providers_named(&names, config)?
        }
        None => create_providers(config),
    };

    if providers.is_empty() {
        eprintln!("Error: No providers available. Set API keys in the environment or .env:");
        for (name, provider) in config.enabled_providers() {
            eprintln!("  {} for {}", provider.api_key_env, name);
        }
        return Err("no providers available".into());
    }

    let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
    println!("Providers: {}", names.join(", "));
    Ok(providers)
}

fn build_runner(
    names: &Option<String>,
    config: &Config,
    catalog: Catalog,
    store: Arc<SqliteStore>,
    developer: Option<String>,
) -> Result<BatchRunner, Box<dyn std::error::Error>> {
    let providers = select_providers(names, config)?;
    let developer = developer.unwrap_or_else(Config::developer_name);
    println!("Developer: {}", developer);

    let runner = BatchRunner::new(
        catalog,
        Dispatcher::new(providers, config.batch.provider_timeout_ms),
        store,
        developer,
        FailurePolicy::from_config(&config.batch),
    );
    runner.prepare()?;
    Ok(runner)
}

async fn analyze_one(
    database: &Option<PathBuf>,
    providers: &Option<String>,
    config: &Config,
    catalog: Catalog,
    error: ErrorDefinition,
    developer: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(database, config)?;
    let runner = build_runner(providers, config, catalog, store, developer)?;
    let report = runner.analyze_error(&error).await?;
    print_item_report(&report);
    Ok(())
}

//! Surveygen - AI-assisted survey report generator
//!
//! A CLI tool that reads a spreadsheet of survey responses, aggregates
//! per-question frequency distributions, renders them as tables or bar
//! charts, asks a text-generation service for an interpretation of each
//! question, and assembles everything into a single .docx report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (load failure, service error, write failure, etc.)

mod analysis;
mod chart;
mod cli;
mod config;
mod gemini;
mod loader;
mod models;
mod report;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, QuestionCatalog};
use gemini::GeminiClient;
use indicatif::{ProgressBar, ProgressStyle};
use models::{ReportSection, RunSummary, SurveyTable};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Surveygen v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_report(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Report generation failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .surveygen.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(".surveygen.toml");

    if path.exists() {
        eprintln!("⚠️  .surveygen.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .surveygen.toml")?;

    println!("✅ Created .surveygen.toml with default settings.");
    println!("   Edit it to customize the model, question prefix, and report layout.");
    println!("   Question labels go in a separate questions.toml catalog.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete report workflow.
async fn run_report(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let input = args
        .input
        .clone()
        .context("An input spreadsheet is required")?;

    // Step 1: Load the survey table
    println!("📥 Loading survey responses: {}", input.display());
    let table = loader::load_survey(&input, config.survey.sheet.as_deref())
        .context("Failed to load the survey spreadsheet")?;
    println!(
        "   {} rows, {} columns",
        table.row_count(),
        table.headers().len()
    );

    let columns = table.question_columns(&config.survey.question_prefix);
    if columns.is_empty() {
        warn!(
            "No columns start with the question prefix '{}'",
            config.survey.question_prefix
        );
    }
    println!(
        "   {} question columns (prefix '{}')",
        columns.len(),
        config.survey.question_prefix
    );

    // Handle --dry-run: aggregate and report decisions, no service calls
    if args.dry_run {
        return handle_dry_run(&table, &columns, &config);
    }

    // Step 2: Load the question catalog
    let catalog_path = PathBuf::from(&config.survey.questions_file);
    let catalog = QuestionCatalog::load_or_empty(&catalog_path)?;
    if catalog.questions.is_empty() {
        info!(
            "Question catalog {} not found or empty; analyses run without context",
            catalog_path.display()
        );
    } else {
        info!(
            "Loaded {} question labels from {}",
            catalog.questions.len(),
            catalog_path.display()
        );
    }

    // Step 3: Initialize the analysis client
    let api_key = args
        .api_key
        .clone()
        .context("An API key is required outside --dry-run")?;

    println!("🤖 Using model: {}", config.model.name);
    println!(
        "   Pacing: cooldown {}s after every {} requests, up to {} retries on throttling",
        config.model.cooldown_seconds, config.model.requests_per_batch, config.model.retries
    );

    let client =
        GeminiClient::new(&config.model, api_key).context("Failed to build the API client")?;

    // Step 4: Process each question sequentially
    println!("\n🔬 Processing {} questions...\n", columns.len());
    let progress = make_progress_bar(columns.len() as u64, args.quiet);

    let mut sections: Vec<ReportSection> = Vec::new();
    let mut summary = RunSummary::default();

    for column in &columns {
        progress.set_message(column.clone());

        let Some(dist) = analysis::aggregate_question(&table, column) else {
            warn!("Skipping {}: column not found or empty", column);
            summary.skipped += 1;
            progress.inc(1);
            continue;
        };
        debug!("{}", dist);

        let artifact = match chart::render_artifact(&dist, &config.report) {
            Ok(artifact) => artifact,
            Err(err) => {
                error!("Skipping {}: {}", column, err);
                summary.skipped += 1;
                progress.inc(1);
                continue;
            }
        };
        info!(
            "{}: {} responses, rendering as {}",
            column,
            dist.total_responses(),
            artifact.kind()
        );

        // A service failure here is fatal: no partial document is written.
        let analysis_text = client
            .analyze(column, &dist, summary.requests, &catalog)
            .await
            .with_context(|| format!("Analysis request failed for {}", column))?;
        summary.requests += 1;

        sections.push(ReportSection {
            question: column.clone(),
            total_responses: dist.total_responses(),
            artifact,
            analysis: analysis_text,
        });
        summary.sections += 1;
        progress.inc(1);
    }

    progress.finish_and_clear();

    // Step 5: Assemble and save the document (all-or-nothing)
    println!("\n📝 Assembling report...");
    let docx = report::build_document(&sections, &config.report);
    report::save_document(docx, &args.output)?;

    let duration = start_time.elapsed().as_secs_f64();
    println!("\n📊 Run Summary:");
    println!("   Sections written: {}", summary.sections);
    println!("   Questions skipped: {}", summary.skipped);
    println!("   Service requests: {}", summary.requests);
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Report complete! Saved to: {}",
        args.output.display()
    );

    Ok(())
}

/// Handle --dry-run: aggregate every question and print the render
/// decisions without touching the external service.
fn handle_dry_run(table: &SurveyTable, columns: &[String], config: &Config) -> Result<()> {
    println!("\n🔍 Dry run: aggregating questions (no service calls)...\n");

    if columns.is_empty() {
        println!("   No question columns found.");
        return Ok(());
    }

    let mut skipped = 0usize;
    for column in columns {
        match analysis::aggregate_question(table, column) {
            Some(dist) => {
                let rendering = if dist.distinct_count() > config.report.chart_threshold {
                    "table"
                } else {
                    "chart"
                };
                println!(
                    "   📄 {}: {} responses, {} distinct -> {}",
                    column,
                    dist.total_responses(),
                    dist.distinct_count(),
                    rendering
                );
            }
            None => {
                println!("   ⏭️  {}: empty or missing, would be skipped", column);
                skipped += 1;
            }
        }
    }

    println!(
        "\n   Total: {} questions ({} would be skipped)",
        columns.len(),
        skipped
    );
    println!("\n✅ Dry run complete. No service calls were made.");
    Ok(())
}

/// Progress bar over the question columns; hidden in quiet mode.
fn make_progress_bar(len: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .surveygen.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

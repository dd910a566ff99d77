//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Surveygen - AI-assisted survey report generator
///
/// Reads a spreadsheet of survey responses, aggregates per-question
/// frequency distributions, renders them as tables or bar charts, asks a
/// text-generation service for an interpretation of each question, and
/// assembles everything into a single .docx report.
///
/// Examples:
///   surveygen --input respostas.xlsx
///   surveygen --input respostas.xlsx --sheet "Form responses 1"
///   surveygen --input respostas.xlsx --questions questions.toml --output report.docx
///   surveygen --input respostas.xlsx --dry-run
///   surveygen --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Spreadsheet file with the survey responses (.xlsx, .xls, .ods)
    ///
    /// Columns whose names start with the question prefix are treated as
    /// survey questions; all other columns are ignored.
    /// Not required when using --init-config.
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Sheet name to read
    ///
    /// If not specified, the first sheet of the workbook is used.
    #[arg(short, long, value_name = "NAME")]
    pub sheet: Option<String>,

    /// Output file path for the report document
    #[arg(short, long, default_value = "survey_report.docx", value_name = "FILE")]
    pub output: PathBuf,

    /// Gemini model to use for the per-question analysis
    #[arg(short, long, default_value = "gemini-1.5-flash", env = "GEMINI_MODEL")]
    pub model: String,

    /// API key for the text-generation service
    ///
    /// Prefer setting this through the GEMINI_API_KEY environment variable
    /// rather than on the command line.
    #[arg(long, value_name = "KEY", env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the text-generation API
    #[arg(
        long,
        default_value = "https://generativelanguage.googleapis.com",
        env = "GEMINI_API_BASE",
        value_name = "URL"
    )]
    pub api_base: String,

    /// Question catalog file mapping question ids to labels
    ///
    /// A TOML file describing each question (plain label, or a description
    /// with sub-options). Questions absent from the catalog are analyzed
    /// with an empty context.
    #[arg(long, value_name = "FILE")]
    pub questions: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .surveygen.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Column name prefix that marks a survey question
    #[arg(long, value_name = "PREFIX")]
    pub question_prefix: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load and aggregate without calling the service
    ///
    /// Shows each question column, its response counts, and whether it
    /// would render as a table or a chart, then exits.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .surveygen.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
            if !input.is_file() {
                return Err(format!("Input path is not a file: {}", input.display()));
            }
        }

        // The API base is only contacted outside dry runs
        if !self.dry_run {
            if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
                return Err("API base URL must start with 'http://' or 'https://'".to_string());
            }
            if self.api_key.as_deref().unwrap_or("").is_empty() {
                return Err(
                    "An API key is required: set GEMINI_API_KEY or pass --api-key".to_string(),
                );
            }
        }

        if self.model.trim().is_empty() {
            return Err("Model name must not be empty".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref questions) = self.questions {
            if !questions.exists() {
                return Err(format!(
                    "Question catalog file does not exist: {}",
                    questions.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

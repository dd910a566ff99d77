//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.surveygen.toml` files, plus the hand-authored question catalog that
//! maps question ids to their labels and sub-options.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Text-generation model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Survey input settings.
    #[serde(default)]
    pub survey: SurveyConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "survey_report.docx".to_string()
}

/// Text-generation model settings.
///
/// The API key is deliberately not part of the config file; it comes from
/// the environment or the command line only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Base URL of the generateContent API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Retry cap when the service signals rate limiting.
    #[serde(default = "default_retries")]
    pub retries: usize,

    /// Cooldown in seconds, used both for the preventive pause between
    /// request batches and before each rate-limit retry.
    #[serde(default = "default_cooldown")]
    pub cooldown_seconds: u64,

    /// Number of requests after which the preventive cooldown kicks in.
    #[serde(default = "default_requests_per_batch")]
    pub requests_per_batch: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            api_base: default_api_base(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            cooldown_seconds: default_cooldown(),
            requests_per_batch: default_requests_per_batch(),
        }
    }
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_retries() -> usize {
    3
}

fn default_cooldown() -> u64 {
    60
}

fn default_requests_per_batch() -> u64 {
    15
}

/// Survey input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    /// Column name prefix that marks a survey question.
    #[serde(default = "default_question_prefix")]
    pub question_prefix: String,

    /// Sheet to read; first sheet when absent.
    #[serde(default)]
    pub sheet: Option<String>,

    /// Question catalog file.
    #[serde(default = "default_questions_file")]
    pub questions_file: String,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            question_prefix: default_question_prefix(),
            sheet: None,
            questions_file: default_questions_file(),
        }
    }
}

fn default_question_prefix() -> String {
    "Questao".to_string()
}

fn default_questions_file() -> String {
    "questions.toml".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Document title shown as the top-level heading.
    #[serde(default = "default_title")]
    pub title: String,

    /// Fixed caption appended under every section.
    #[serde(default = "default_source_caption")]
    pub source_caption: String,

    /// Distinct-value count above which a question renders as a table
    /// instead of a bar chart.
    #[serde(default = "default_chart_threshold")]
    pub chart_threshold: usize,

    /// Chart raster size in pixels.
    #[serde(default = "default_chart_width")]
    pub chart_width_px: u32,

    #[serde(default = "default_chart_height")]
    pub chart_height_px: u32,

    /// Width of embedded chart images in the document, in inches.
    #[serde(default = "default_image_width")]
    pub image_width_inches: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            source_caption: default_source_caption(),
            chart_threshold: default_chart_threshold(),
            chart_width_px: default_chart_width(),
            chart_height_px: default_chart_height(),
            image_width_inches: default_image_width(),
        }
    }
}

fn default_title() -> String {
    "Analytical Report - Survey Response Analysis".to_string()
}

fn default_source_caption() -> String {
    "Source: survey data export".to_string()
}

fn default_chart_threshold() -> usize {
    10
}

fn default_chart_width() -> u32 {
    960
}

fn default_chart_height() -> u32 {
    600
}

fn default_image_width() -> f64 {
    6.0
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".surveygen.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Model settings - always override since they have defaults in CLI
        self.model.name = args.model.clone();
        self.model.api_base = args.api_base.clone();

        // Optional settings - only override if provided
        if let Some(ref sheet) = args.sheet {
            self.survey.sheet = Some(sheet.clone());
        }
        if let Some(ref prefix) = args.question_prefix {
            self.survey.question_prefix = prefix.clone();
        }
        if let Some(ref questions) = args.questions {
            self.survey.questions_file = questions.display().to_string();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// A question's label in the catalog.
///
/// Mirrors the three hand-authored shapes: a plain descriptive label, a set
/// of sub-options, or a description plus sub-options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionLabel {
    /// A plain label string.
    Plain(String),
    /// A structured record with optional description and sub-option labels.
    Detailed {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        options: BTreeMap<String, String>,
    },
}

/// Immutable question id → label mapping, loaded once at startup and passed
/// explicitly into the enricher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionCatalog {
    #[serde(default)]
    pub questions: BTreeMap<String, QuestionLabel>,
}

impl QuestionCatalog {
    /// Load a catalog from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read question catalog: {}", path.display()))?;

        let catalog: QuestionCatalog = toml::from_str(&content)
            .with_context(|| format!("Failed to parse question catalog: {}", path.display()))?;

        Ok(catalog)
    }

    /// Load a catalog, treating a missing file as an empty catalog.
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Look up a question's label.
    pub fn get(&self, question: &str) -> Option<&QuestionLabel> {
        self.questions.get(question)
    }
}

//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.llmnav.toml` files.

use crate::models::SimulationParams;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".llmnav.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Simulation settings.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Access control settings.
    #[serde(default)]
    pub access: AccessConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Path of the history/cache store.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Identity used for the analysis history.
    #[serde(default = "default_user")]
    pub user: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            store_path: default_store_path(),
            user: default_user(),
        }
    }
}

fn default_output() -> String {
    "llmnav_report.md".to_string()
}

fn default_store_path() -> String {
    ".llmnav/store.json".to_string()
}

fn default_user() -> String {
    "local@llmnav".to_string()
}

/// AI provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Concurrent provider queries.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Reuse cached answers for identical prompts.
    #[serde(default)]
    pub cache_responses: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            concurrency: default_concurrency(),
            cache_responses: false,
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout() -> u64 {
    120
}

fn default_concurrency() -> usize {
    4
}

/// Analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Keywords used when none are given on the command line.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Competitors shown in the ranking.
    #[serde(default = "default_top_competitors")]
    pub top_competitors: usize,

    /// Context snippets kept per competitor.
    #[serde(default = "default_context_cap")]
    pub context_cap: usize,

    /// Number of past analyses shown by `--history`.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            top_competitors: default_top_competitors(),
            context_cap: default_context_cap(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_top_competitors() -> usize {
    10
}

fn default_context_cap() -> usize {
    crate::analysis::competitors::DEFAULT_CONTEXT_CAP
}

fn default_history_limit() -> usize {
    20
}

/// Simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Probability that the target is cited for a query.
    #[serde(default = "default_cite_probability")]
    pub cite_probability: f64,

    /// Domains simulated competitors are drawn from.
    #[serde(default = "default_competitor_pool")]
    pub competitor_pool: Vec<String>,

    /// Maximum competitor mentions per query.
    #[serde(default = "default_max_competitors")]
    pub max_competitors_per_query: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cite_probability: default_cite_probability(),
            competitor_pool: default_competitor_pool(),
            max_competitors_per_query: default_max_competitors(),
        }
    }
}

fn default_cite_probability() -> f64 {
    SimulationParams::default().cite_probability
}

fn default_competitor_pool() -> Vec<String> {
    SimulationParams::default().competitor_pool
}

fn default_max_competitors() -> usize {
    SimulationParams::default().max_competitors_per_query
}

impl From<&SimulationConfig> for SimulationParams {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            cite_probability: config.cite_probability,
            competitor_pool: config.competitor_pool.clone(),
            max_competitors_per_query: config.max_competitors_per_query,
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include competitor context snippets.
    #[serde(default = "default_true")]
    pub include_contexts: bool,

    /// Include the per-query table.
    #[serde(default = "default_true")]
    pub include_queries: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_contexts: true,
            include_queries: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Access control settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// E-mail addresses granted the admin role.
    #[serde(default)]
    pub admin_emails: Vec<String>,
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
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the user actually passed override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.provider.model = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.provider.ollama_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.provider.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.provider.timeout_seconds = timeout;
        }
        if let Some(concurrency) = args.concurrency {
            self.provider.concurrency = concurrency;
        }
        if args.cache {
            self.provider.cache_responses = true;
        }

        if let Some(ref user) = args.user {
            self.general.user = user.clone();
        }
        if let Some(ref store) = args.store {
            self.general.store_path = store.display().to_string();
        }

        if !args.keywords.is_empty() {
            self.analysis.keywords = args.keywords.clone();
        }
        if let Some(top) = args.top {
            self.analysis.top_competitors = top;
        }
        if let Some(limit) = args.limit {
            self.analysis.history_limit = limit;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

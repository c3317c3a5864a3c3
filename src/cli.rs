//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::AnalysisMode;
use crate::provider::domain::{looks_like_domain, normalize_domain};
use clap::Parser;
use std::path::PathBuf;

/// LLM Navigator - how often do AI assistants cite your website?
///
/// Asks an LLM the questions your customers ask, measures how often your
/// site is cited, ranks the competitors cited instead and tracks the trend
/// across runs.
///
/// Examples:
///   llmnav --site example.com -k "best crm,crm for startups"
///   llmnav --site example.com --keywords-file queries.txt --format json
///   llmnav --site example.com -k "best crm" --simulate --seed 42
///   llmnav --history
///   llmnav --delete 3f2a9c1b
///   llmnav --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Website to analyze (domain or URL)
    #[arg(
        short,
        long,
        value_name = "URL",
        required_unless_present_any = ["init_config", "history", "delete", "show", "trial_signals"]
    )]
    pub site: Option<String>,

    /// Queries to ask the AI provider (comma-separated, repeatable)
    #[arg(short = 'k', long = "keyword", value_name = "QUERY", value_delimiter = ',')]
    pub keywords: Vec<String>,

    /// File with one query per line ('#' starts a comment)
    #[arg(long, value_name = "FILE")]
    pub keywords_file: Option<PathBuf>,

    /// Identity the analysis is recorded under
    #[arg(short, long, env = "LLMNAV_USER", value_name = "EMAIL")]
    pub user: Option<String>,

    /// Ollama model to query
    #[arg(short, long, env = "LLMNAV_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL", value_name = "URL")]
    pub ollama_url: Option<String>,

    /// Temperature for LLM responses (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Number of concurrent provider queries
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Cache provider answers in the store and reuse them
    #[arg(long)]
    pub cache: bool,

    /// Use seeded simulated data instead of querying a provider
    #[arg(long)]
    pub simulate: bool,

    /// Seed for --simulate (random if omitted)
    #[arg(long, requires = "simulate")]
    pub seed: Option<u64>,

    /// Scoring mode
    #[arg(long, default_value = "aeo", value_name = "MODE")]
    pub mode: ModeArg,

    /// Number of competitors to show
    #[arg(long, value_name = "K")]
    pub top: Option<usize>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path of the history/cache store
    #[arg(long, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Do not record this analysis in the history
    #[arg(long)]
    pub no_save: bool,

    /// List past analyses (most recent first)
    #[arg(long, conflicts_with_all = ["delete", "show"])]
    pub history: bool,

    /// With --history: list every user's analyses (admin only)
    #[arg(long, requires = "history")]
    pub all_users: bool,

    /// Maximum entries for --history
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Delete a past analysis by id (or id prefix)
    #[arg(long, value_name = "ID", conflicts_with = "show")]
    pub delete: Option<String>,

    /// Regenerate the report of a past analysis by id (or id prefix)
    #[arg(long, value_name = "ID")]
    pub show: Option<String>,

    /// Evaluate free-trial eligibility from a JSON signals file
    #[arg(long, value_name = "FILE")]
    pub trial_signals: Option<PathBuf>,

    /// Exit with code 2 if the score is below this value
    ///
    /// Useful for CI pipelines.
    #[arg(long, value_name = "SCORE")]
    pub fail_below: Option<u8>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .llmnav.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .llmnav.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Scoring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ModeArg {
    /// Score is the citation rate
    #[default]
    Aeo,
    /// Score is the composite of the content sub-metrics
    Legacy,
}

impl From<ModeArg> for AnalysisMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Aeo => AnalysisMode::Aeo,
            ModeArg::Legacy => AnalysisMode::Legacy,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Whether this run analyzes a website (as opposed to a maintenance command).
    pub fn is_analysis_run(&self) -> bool {
        !self.init_config
            && !self.history
            && self.delete.is_none()
            && self.show.is_none()
            && self.trial_signals.is_none()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        if let Some(score) = self.fail_below {
            if score > 100 {
                return Err("--fail-below must be between 0 and 100".to_string());
            }
        }

        if let Some(ref path) = self.keywords_file {
            if !path.is_file() {
                return Err(format!("Keywords file does not exist: {}", path.display()));
            }
        }

        if self.is_analysis_run() {
            let site = self.site.as_deref().unwrap_or("");
            if !looks_like_domain(&normalize_domain(site)) {
                return Err(format!("Not a valid website: '{}'", site));
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

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args::parse_from(["llmnav", "--site", "example.com", "-k", "best crm,crm pricing"])
    }

    #[test]
    fn test_parse_keywords() {
        let args = make_args();
        assert_eq!(args.keywords, vec!["best crm", "crm pricing"]);
        assert_eq!(args.mode, ModeArg::Aeo);
        assert_eq!(args.format, OutputFormat::Markdown);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_site() {
        let mut args = make_args();
        args.site = Some("not a site".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_ranges() {
        let mut args = make_args();
        args.concurrency = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.fail_below = Some(101);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.ollama_url = Some("localhost:11434".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_history_does_not_need_site() {
        let args = Args::parse_from(["llmnav", "--history"]);
        assert!(!args.is_analysis_run());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_missing_signals_file_is_not_rejected() {
        // An unreadable signals file is a gathering failure, decided later.
        let args = Args::parse_from(["llmnav", "--trial-signals", "/nonexistent/signals.json"]);
        assert!(!args.is_analysis_run());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_site_required_for_analysis() {
        assert!(Args::try_parse_from(["llmnav", "-k", "best crm"]).is_err());
    }

    #[test]
    fn test_seed_requires_simulate() {
        assert!(Args::try_parse_from(["llmnav", "--site", "example.com", "--seed", "4"]).is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_mode_conversion() {
        assert_eq!(AnalysisMode::from(ModeArg::Legacy), AnalysisMode::Legacy);
    }
}

//! Report assembly and rendering.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report};

use crate::analysis::{CitationScore, Evaluation, Trend};
use crate::config::ReportConfig;
use crate::models::{Analysis, AnalysisMode, CompetitorAggregate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata about the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub website: String,
    pub analysis_id: Uuid,
    pub analysis_date: DateTime<Utc>,
    pub user: String,
    /// Model name, or a description of the simulated source.
    pub provider: String,
    pub mode: AnalysisMode,
    pub queries_total: usize,
    pub queries_failed: usize,
    pub duration_seconds: f64,
}

/// A rendered-ready view of one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub analysis: Analysis,
    pub citation: CitationScore,
    pub competitors: Vec<CompetitorAggregate>,
    pub trend: Trend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_score: Option<u8>,
    /// Queries that got no answer, with the error.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_queries: Vec<(String, String)>,
}

impl Report {
    pub fn new(
        evaluation: Evaluation,
        trend: Trend,
        previous_score: Option<u8>,
        provider: String,
        failed_queries: Vec<(String, String)>,
        duration_seconds: f64,
    ) -> Self {
        let Evaluation {
            analysis,
            citation,
            competitors,
        } = evaluation;

        let metadata = ReportMetadata {
            website: analysis.website.clone(),
            analysis_id: analysis.id,
            analysis_date: analysis.created_at,
            user: analysis.user_id.clone(),
            provider,
            mode: analysis.mode,
            queries_total: analysis.keywords.len(),
            queries_failed: failed_queries.len(),
            duration_seconds,
        };

        Self {
            metadata,
            analysis,
            citation,
            competitors,
            trend,
            previous_score,
            failed_queries,
        }
    }
}

/// Rendering switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub include_contexts: bool,
    pub include_queries: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_contexts: true,
            include_queries: true,
        }
    }
}

impl From<&ReportConfig> for ReportOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            include_contexts: config.include_contexts,
            include_queries: config.include_queries,
        }
    }
}

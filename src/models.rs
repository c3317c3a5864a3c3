//! Data models for LLM Navigator.
//!
//! This module contains the core data structures used throughout
//! the application for representing analyses, per-query citation
//! results, competitor mentions and recommendations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::provider::domain::is_same_site;

/// How the headline score of an analysis is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Score is the citation rate across all queries.
    #[default]
    Aeo,
    /// Score is the composite of the five sub-metrics.
    Legacy,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Aeo => write!(f, "AEO"),
            AnalysisMode::Legacy => write!(f, "Legacy"),
        }
    }
}

/// Priority of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
        }
    }
}

impl Priority {
    /// Returns an emoji representation of the priority.
    pub fn emoji(&self) -> &'static str {
        match self {
            Priority::Low => "🟢",
            Priority::Medium => "🟡",
            Priority::High => "🔴",
        }
    }
}

/// One competitor mention within one query result.
///
/// Upstream parsing of provider text is lossy, so the domain may be blank.
/// Blank domains are skipped during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorCitation {
    /// Cited domain (e.g. `acme.com`).
    #[serde(default)]
    pub domain: String,
    /// Why or how the domain was cited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl CompetitorCitation {
    pub fn new(domain: impl Into<String>, context: Option<String>) -> Self {
        Self {
            domain: domain.into(),
            context,
        }
    }
}

/// The outcome of a single query against an AI provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationResult {
    /// The query text that was submitted.
    pub query: String,
    /// Whether the target site was cited in the answer.
    pub is_cited: bool,
    /// Other domains cited for this query.
    #[serde(default)]
    pub competitors: Vec<CompetitorCitation>,
}

impl CitationResult {
    pub fn new(query: impl Into<String>, is_cited: bool) -> Self {
        Self {
            query: query.into(),
            is_cited,
            competitors: Vec::new(),
        }
    }

    /// Builder-style helper to attach a competitor mention.
    #[cfg(test)]
    pub fn with_competitor(mut self, domain: &str, context: Option<&str>) -> Self {
        self.competitors
            .push(CompetitorCitation::new(domain, context.map(str::to_string)));
        self
    }

    /// Drop any competitor entry that is actually the target site
    /// (or one of its subdomains).
    pub fn exclude_target(&mut self, target: &str) {
        self.competitors.retain(|c| !is_same_site(&c.domain, target));
    }
}

/// Aggregated view of one competitor domain across all queries of an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorAggregate {
    pub domain: String,
    /// Number of citations across all query results.
    pub count: usize,
    /// Distinct context snippets, in the order first seen.
    pub contexts: Vec<String>,
}

/// The five named sub-metric scores, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricScores {
    pub content_clarity: u8,
    pub semantic_richness: u8,
    pub structured_data: u8,
    pub natural_language: u8,
    pub keyword_relevance: u8,
}

impl MetricScores {
    /// Sub-metrics for an analysis backed by real provider data.
    ///
    /// Only the citation rate is observed, so every metric reports it.
    pub fn from_citation_rate(rate: u8) -> Self {
        Self {
            content_clarity: rate,
            semantic_richness: rate,
            structured_data: rate,
            natural_language: rate,
            keyword_relevance: rate,
        }
    }

    /// Named view over the metrics, in display order.
    pub fn entries(&self) -> [(&'static str, u8); 5] {
        [
            ("Content Clarity", self.content_clarity),
            ("Semantic Richness", self.semantic_richness),
            ("Structured Data", self.structured_data),
            ("Natural Language", self.natural_language),
            ("Keyword Relevance", self.keyword_relevance),
        ]
    }

    /// Composite quality score: the mean of all five metrics, rounded half-up.
    pub fn composite(&self) -> u8 {
        let sum: u32 = self.entries().iter().map(|(_, v)| u32::from(*v)).sum();
        ((sum * 2 + 5) / 10) as u8
    }

    /// The metric with the lowest score (first one on ties).
    pub fn weakest(&self) -> (&'static str, u8) {
        let entries = self.entries();
        let mut weakest = entries[0];
        for entry in entries.iter().skip(1) {
            if entry.1 < weakest.1 {
                weakest = *entry;
            }
        }
        weakest
    }
}

/// An actionable recommendation attached to an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: String,
}

/// Parameters for the simulated analysis branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Probability (0.0 - 1.0) that the target is cited for a query.
    pub cite_probability: f64,
    /// Domains the simulation draws competitor citations from.
    pub competitor_pool: Vec<String>,
    /// Maximum competitor mentions per query.
    pub max_competitors_per_query: usize,
}

/// Where the citation data of an analysis comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum AnalysisResult {
    /// Parsed responses from real AI providers.
    Real { results: Vec<CitationResult> },
    /// Deterministic, seeded stand-in data.
    Simulated { seed: u64, params: SimulationParams },
}

impl AnalysisResult {
    pub fn is_simulated(&self) -> bool {
        matches!(self, AnalysisResult::Simulated { .. })
    }
}

/// One scoring run for one website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: Uuid,
    pub user_id: String,
    /// Normalized target domain.
    pub website: String,
    pub keywords: Vec<String>,
    pub mode: AnalysisMode,
    /// Headline score, 0-100.
    pub score: u8,
    pub metrics: MetricScores,
    pub insights: String,
    pub recommendations: Vec<Recommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_results: Option<Vec<CitationResult>>,
    /// True if the analysis was built from simulated data.
    pub simulated: bool,
    pub created_at: DateTime<Utc>,
}

impl Analysis {
    /// Short form of the id, for listings.
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

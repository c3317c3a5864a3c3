//! Citation aggregation and scoring.
//!
//! Pure functions over already-fetched citation data: the scorer, the
//! competitor extractor and the trend comparator, plus the glue that turns an
//! [`AnalysisResult`] into a stored [`Analysis`].

pub mod competitors;
pub mod recommendations;
pub mod scorer;
pub mod simulate;
pub mod trend;

pub use competitors::{top_competitor_share, top_competitors};
pub use scorer::{score_citations, CitationScore};
pub use trend::{compare_scores, compare_with_history, Trend};

use crate::models::{
    Analysis, AnalysisMode, AnalysisResult, CitationResult, CompetitorAggregate, MetricScores,
};
use crate::provider::domain::normalize_domain;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

/// What to analyze and how to present it.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub user_id: String,
    pub website: String,
    pub keywords: Vec<String>,
    pub mode: AnalysisMode,
    /// Competitors kept in the ranking (top K).
    pub top_competitors: usize,
    /// Context snippets kept per competitor.
    pub context_cap: usize,
}

/// An analysis together with the figures derived from its citation data.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub analysis: Analysis,
    pub citation: CitationScore,
    pub competitors: Vec<CompetitorAggregate>,
}

impl Evaluation {
    /// Re-derive the citation figures of a stored analysis.
    pub fn from_analysis(analysis: Analysis, top: usize, context_cap: usize) -> Self {
        let results: &[CitationResult] = analysis.citation_results.as_deref().unwrap_or(&[]);
        let citation = score_citations(results);
        let competitors = top_competitors(results, top, context_cap);

        Self {
            analysis,
            citation,
            competitors,
        }
    }
}

/// Score citation data and assemble a new analysis.
pub fn build_analysis(request: &AnalysisRequest, source: AnalysisResult) -> Evaluation {
    let website = normalize_domain(&request.website);
    let simulated = source.is_simulated();

    let (mut results, simulated_metrics) = match source {
        AnalysisResult::Real { results } => (results, None),
        AnalysisResult::Simulated { seed, params } => {
            let data = simulate::simulate(&request.keywords, &website, seed, &params);
            (data.results, Some(data.metrics))
        }
    };

    for result in &mut results {
        result.exclude_target(&website);
    }

    let citation = score_citations(&results);
    let metrics =
        simulated_metrics.unwrap_or_else(|| MetricScores::from_citation_rate(citation.rate));

    let score = match request.mode {
        AnalysisMode::Aeo => citation.rate,
        AnalysisMode::Legacy => metrics.composite(),
    };

    let competitors = top_competitors(&results, request.top_competitors, request.context_cap);
    debug!("{} competitors ranked", competitors.len());

    let recommendations =
        recommendations::build_recommendations(&citation, &results, &competitors, &metrics);
    let insights = recommendations::build_insights(&website, &citation, &competitors);

    info!(
        "Analysis of {}: score {} ({}, {})",
        website,
        score,
        request.mode,
        citation.summary()
    );

    let analysis = Analysis {
        id: Uuid::new_v4(),
        user_id: request.user_id.clone(),
        website,
        keywords: request.keywords.clone(),
        mode: request.mode,
        score,
        metrics,
        insights,
        recommendations,
        citation_results: match request.mode {
            AnalysisMode::Aeo => Some(results),
            AnalysisMode::Legacy => None,
        },
        simulated,
        created_at: Utc::now(),
    };

    Evaluation {
        analysis,
        citation,
        competitors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SimulationParams;

    fn request(mode: AnalysisMode) -> AnalysisRequest {
        AnalysisRequest {
            user_id: "u1".to_string(),
            website: "https://www.Example.com/".to_string(),
            keywords: vec!["best crm".to_string(), "crm pricing".to_string()],
            mode,
            top_competitors: 10,
            context_cap: 5,
        }
    }

    #[test]
    fn test_build_real_aeo_analysis() {
        let results = vec![
            CitationResult::new("best crm", true)
                .with_competitor("acme.com", Some("ctx1"))
                .with_competitor("example.com", Some("self")),
            CitationResult::new("crm pricing", false).with_competitor("acme.com", Some("ctx2")),
        ];

        let eval = build_analysis(&request(AnalysisMode::Aeo), AnalysisResult::Real { results });

        assert_eq!(eval.analysis.website, "example.com");
        assert_eq!(eval.analysis.score, 50);
        assert!(!eval.analysis.simulated);
        assert_eq!(eval.citation.cited, 1);
        assert_eq!(eval.competitors.len(), 1);
        assert_eq!(eval.competitors[0].count, 2);

        let stored = eval.analysis.citation_results.as_ref().unwrap();
        assert!(stored
            .iter()
            .all(|r| r.competitors.iter().all(|c| c.domain != "example.com")));
        assert!(!eval.analysis.recommendations.is_empty());
        assert!(eval.analysis.insights.contains("cited in 1 of 2 queries"));
    }

    #[test]
    fn test_build_simulated_legacy_analysis() {
        let source = AnalysisResult::Simulated {
            seed: 9,
            params: SimulationParams::default(),
        };

        let eval = build_analysis(&request(AnalysisMode::Legacy), source);

        assert!(eval.analysis.simulated);
        assert_eq!(eval.analysis.score, eval.analysis.metrics.composite());
        assert!(eval.analysis.citation_results.is_none());
    }

    #[test]
    fn test_empty_keywords_is_insufficient_data() {
        let mut req = request(AnalysisMode::Aeo);
        req.keywords.clear();

        let eval = build_analysis(&req, AnalysisResult::Real { results: vec![] });

        assert_eq!(eval.analysis.score, 0);
        assert!(eval.citation.insufficient_data);
        assert!(eval.competitors.is_empty());
    }

    #[test]
    fn test_evaluation_from_stored_analysis() {
        let results = vec![
            CitationResult::new("a", true).with_competitor("b.com", None),
            CitationResult::new("b", false).with_competitor("c.com", None),
        ];
        let eval = build_analysis(&request(AnalysisMode::Aeo), AnalysisResult::Real { results });

        let again = Evaluation::from_analysis(eval.analysis.clone(), 1, 5);
        assert_eq!(again.citation, eval.citation);
        assert_eq!(again.competitors.len(), 1);
        assert_eq!(again.competitors[0].domain, "b.com");
    }
}

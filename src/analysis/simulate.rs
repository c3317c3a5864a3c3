//! Seeded simulation of provider results.
//!
//! Used when no provider is available (demos, dry runs). The same seed,
//! parameters and keywords always produce the same data.

use crate::models::{CitationResult, CompetitorCitation, MetricScores, SimulationParams};
use crate::provider::domain::is_same_site;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Range simulated sub-metrics are drawn from.
const METRIC_RANGE: std::ops::RangeInclusive<u8> = 30..=95;

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            cite_probability: 0.4,
            competitor_pool: vec![
                "wikipedia.org".to_string(),
                "reddit.com".to_string(),
                "forbes.com".to_string(),
                "g2.com".to_string(),
                "medium.com".to_string(),
                "nerdwallet.com".to_string(),
            ],
            max_competitors_per_query: 3,
        }
    }
}

/// Simulated citation results and sub-metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedData {
    pub results: Vec<CitationResult>,
    pub metrics: MetricScores,
}

/// Generate simulated data for `keywords` against `target`.
pub fn simulate(
    keywords: &[String],
    target: &str,
    seed: u64,
    params: &SimulationParams,
) -> SimulatedData {
    let mut rng = StdRng::seed_from_u64(seed);
    let probability = if params.cite_probability.is_finite() {
        params.cite_probability.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let pool: Vec<&String> = params
        .competitor_pool
        .iter()
        .filter(|d| !is_same_site(d, target))
        .collect();

    let results = keywords
        .iter()
        .map(|keyword| {
            let is_cited = rng.gen_bool(probability);
            let wanted = rng.gen_range(0..=params.max_competitors_per_query);

            let competitors = pool
                .choose_multiple(&mut rng, wanted.min(pool.len()))
                .map(|domain| {
                    CompetitorCitation::new(
                        domain.as_str(),
                        Some(format!("Recommended when asked \"{}\"", keyword)),
                    )
                })
                .collect();

            CitationResult {
                query: keyword.clone(),
                is_cited,
                competitors,
            }
        })
        .collect();

    let metrics = MetricScores {
        content_clarity: rng.gen_range(METRIC_RANGE),
        semantic_richness: rng.gen_range(METRIC_RANGE),
        structured_data: rng.gen_range(METRIC_RANGE),
        natural_language: rng.gen_range(METRIC_RANGE),
        keyword_relevance: rng.gen_range(METRIC_RANGE),
    };

    debug!("Simulated {} results with seed {}", keywords.len(), seed);
    SimulatedData { results, metrics }
}

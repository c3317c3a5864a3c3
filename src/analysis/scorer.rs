//! Citation rate scoring.

use crate::models::CitationResult;
use serde::{Deserialize, Serialize};

/// Overall citation rate of one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CitationScore {
    /// Percentage of queries citing the target, 0-100.
    pub rate: u8,
    /// Queries in which the target was cited.
    pub cited: usize,
    /// Queries scored.
    pub total: usize,
    /// Set when there were no results to score; `rate` is then 0.
    pub insufficient_data: bool,
}

impl CitationScore {
    /// "cited N of M queries" style summary.
    pub fn summary(&self) -> String {
        if self.insufficient_data {
            "no query results".to_string()
        } else {
            format!("cited in {} of {} queries", self.cited, self.total)
        }
    }
}

/// Round `numerator / denominator` half-up to the nearest integer.
///
/// Both values are non-negative, so half-up and half-away-from-zero agree.
fn round_half_up(numerator: usize, denominator: usize) -> usize {
    (2 * numerator + denominator) / (2 * denominator)
}

/// Compute the citation rate over a set of query results.
pub fn score_citations(results: &[CitationResult]) -> CitationScore {
    let total = results.len();
    if total == 0 {
        return CitationScore {
            insufficient_data: true,
            ..CitationScore::default()
        };
    }

    let cited = results.iter().filter(|r| r.is_cited).count();
    let rate = round_half_up(100 * cited, total).min(100) as u8;

    CitationScore {
        rate,
        cited,
        total,
        insufficient_data: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(cited: usize, total: usize) -> Vec<CitationResult> {
        (0..total)
            .map(|i| CitationResult::new(format!("query {}", i), i < cited))
            .collect()
    }

    #[test]
    fn test_rate_three_of_ten() {
        let score = score_citations(&results(3, 10));
        assert_eq!(score.rate, 30);
        assert_eq!(score.cited, 3);
        assert_eq!(score.total, 10);
        assert!(!score.insufficient_data);
        assert_eq!(score.summary(), "cited in 3 of 10 queries");
    }

    #[test]
    fn test_empty_input_is_insufficient_data() {
        let score = score_citations(&[]);
        assert_eq!(score.rate, 0);
        assert_eq!(score.total, 0);
        assert!(score.insufficient_data);
        assert_eq!(score.summary(), "no query results");
    }

    #[test]
    fn test_rounding_half_up() {
        assert_eq!(score_citations(&results(1, 8)).rate, 13); // 12.5
        assert_eq!(score_citations(&results(1, 3)).rate, 33); // 33.3
        assert_eq!(score_citations(&results(2, 3)).rate, 67); // 66.7
        assert_eq!(score_citations(&results(1, 200)).rate, 1); // 0.5
    }

    #[test]
    fn test_rate_bounds() {
        for total in 1..=25 {
            for cited in 0..=total {
                let score = score_citations(&results(cited, total));
                assert!(score.rate <= 100);
                if cited == 0 {
                    assert_eq!(score.rate, 0);
                }
                if cited == total {
                    assert_eq!(score.rate, 100);
                }
            }
        }
    }
}

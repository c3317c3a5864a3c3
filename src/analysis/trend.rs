//! Trend between consecutive analyses of the same website.

use crate::models::Analysis;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score changes within ±5 points are treated as noise.
pub const TREND_THRESHOLD: i16 = 5;

/// Direction of change between two analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "Up"),
            TrendDirection::Down => write!(f, "Down"),
            TrendDirection::Stable => write!(f, "Stable"),
        }
    }
}

impl TrendDirection {
    pub fn emoji(&self) -> &'static str {
        match self {
            TrendDirection::Up => "📈",
            TrendDirection::Down => "📉",
            TrendDirection::Stable => "➖",
        }
    }
}

/// Direction plus the raw score delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub delta: i16,
}

impl Trend {
    /// No history to compare against.
    pub fn stable() -> Self {
        Self {
            direction: TrendDirection::Stable,
            delta: 0,
        }
    }

    /// Signed delta for display, e.g. `+7`, `-3`, `0`.
    pub fn signed_delta(&self) -> String {
        if self.delta > 0 {
            format!("+{}", self.delta)
        } else {
            self.delta.to_string()
        }
    }
}

/// Classify the change from `previous` to `latest`.
///
/// Without a previous score the trend is stable with delta 0.
pub fn compare_scores(latest: u8, previous: Option<u8>) -> Trend {
    let Some(previous) = previous else {
        return Trend::stable();
    };

    let delta = i16::from(latest) - i16::from(previous);
    let direction = if delta > TREND_THRESHOLD {
        TrendDirection::Up
    } else if delta < -TREND_THRESHOLD {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };

    Trend { direction, delta }
}

/// Compare an analysis with its predecessor, if there is one.
pub fn compare_with_history(current: &Analysis, previous: Option<&Analysis>) -> Trend {
    compare_scores(current.score, previous.map(|p| p.score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisMode, MetricScores};
    use chrono::Utc;
    use uuid::Uuid;

    fn trend_for_delta(delta: i16) -> TrendDirection {
        let previous = 50i16;
        compare_scores((previous + delta) as u8, Some(previous as u8)).direction
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(trend_for_delta(6), TrendDirection::Up);
        assert_eq!(trend_for_delta(-6), TrendDirection::Down);
        assert_eq!(trend_for_delta(5), TrendDirection::Stable);
        assert_eq!(trend_for_delta(-5), TrendDirection::Stable);
        assert_eq!(trend_for_delta(0), TrendDirection::Stable);
    }

    #[test]
    fn test_delta_is_reported() {
        let trend = compare_scores(30, Some(80));
        assert_eq!(trend.delta, -50);
        assert_eq!(trend.direction, TrendDirection::Down);
        assert_eq!(trend.signed_delta(), "-50");
        assert_eq!(compare_scores(100, Some(0)).signed_delta(), "+100");
    }

    #[test]
    fn test_no_previous_is_stable() {
        assert_eq!(compare_scores(90, None), Trend::stable());
        assert_eq!(Trend::stable().signed_delta(), "0");
    }

    #[test]
    fn test_compare_with_history() {
        let current = Analysis {
            id: Uuid::new_v4(),
            user_id: "u".to_string(),
            website: "example.com".to_string(),
            keywords: vec![],
            mode: AnalysisMode::Aeo,
            score: 40,
            metrics: MetricScores::default(),
            insights: String::new(),
            recommendations: vec![],
            citation_results: None,
            simulated: false,
            created_at: Utc::now(),
        };
        let previous = Analysis {
            score: 20,
            id: Uuid::new_v4(),
            ..current.clone()
        };

        assert_eq!(compare_with_history(&current, None), Trend::stable());
        let trend = compare_with_history(&current, Some(&previous));
        assert_eq!(trend.direction, TrendDirection::Up);
        assert_eq!(trend.delta, 20);
    }
}

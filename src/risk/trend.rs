//! Risk score trend detection over a dated series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::risk::TREND_CHANGE_THRESHOLD_PCT;

/// A single point on the risk score history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub risk_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
            Self::InsufficientData => "insufficient_data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    /// Relative change between the last two points, in percent
    pub change_pct: f64,
    pub current: Option<f64>,
    pub previous: Option<f64>,
    pub points: usize,
}

/// Percent change from `previous` to `current`.
///
/// A zero baseline yields 100 for any rise and 0 otherwise.
pub fn percent_change(previous: f64, current: f64) -> f64 {
    if previous.abs() < f64::EPSILON {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    (current - previous) / previous * 100.0
}

/// Compare the two most recent points of `series` (sorted by date first).
pub fn analyze_trend(series: &[TrendPoint]) -> TrendAnalysis {
    analyze_trend_with_threshold(series, TREND_CHANGE_THRESHOLD_PCT)
}

pub fn analyze_trend_with_threshold(series: &[TrendPoint], threshold_pct: f64) -> TrendAnalysis {
    let mut sorted: Vec<&TrendPoint> = series.iter().collect();
    sorted.sort_by_key(|p| p.date);

    let [.., previous, current] = sorted.as_slice() else {
        return TrendAnalysis {
            direction: TrendDirection::InsufficientData,
            change_pct: 0.0,
            current: sorted.last().map(|p| p.risk_score),
            previous: None,
            points: sorted.len(),
        };
    };

    let change_pct = percent_change(previous.risk_score, current.risk_score);
    let direction = if change_pct > threshold_pct {
        TrendDirection::Increasing
    } else if change_pct < -threshold_pct {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    TrendAnalysis {
        direction,
        change_pct,
        current: Some(current.risk_score),
        previous: Some(previous.risk_score),
        points: sorted.len(),
    }
}

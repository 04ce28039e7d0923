//! Chart payloads consumed by the dashboard page.
//!
//! These are plain serializable structures; rendering happens client side.

use serde::Serialize;

use super::scoring::RiskThresholds;
use super::trend::TrendPoint;
use crate::constants::risk::HEATMAP_SPLIT;
use crate::types::{Risk, RiskLevel};

/// Background band of the probability/impact heatmap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapBand {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapPoint {
    pub name: String,
    pub category: String,
    /// x axis
    pub impact: f64,
    /// y axis
    pub probability: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub points: Vec<HeatmapPoint>,
    pub bands: Vec<HeatmapBand>,
}

/// Quadrant color for a probability/impact pair
pub fn quadrant_color(probability: f64, impact: f64) -> &'static str {
    match (probability >= HEATMAP_SPLIT, impact >= HEATMAP_SPLIT) {
        (false, false) => "green",
        (true, true) => "red",
        _ => "yellow",
    }
}

pub fn heatmap(risks: &[Risk]) -> Heatmap {
    let points = risks
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let probability = r.normalized_probability();
            let impact = r.normalized_impact();
            HeatmapPoint {
                name: if r.name.is_empty() {
                    format!("Risk {}", i + 1)
                } else {
                    r.name.clone()
                },
                category: r.category.to_string(),
                impact,
                probability,
                color: quadrant_color(probability, impact),
            }
        })
        .collect();

    let s = HEATMAP_SPLIT;
    let band = |x0: f64, y0: f64, x1: f64, y1: f64, color: &'static str| HeatmapBand {
        x0,
        y0,
        x1,
        y1,
        color,
    };
    Heatmap {
        points,
        bands: vec![
            band(0.0, 0.0, s, s, "green"),
            band(s, 0.0, 1.0, s, "yellow"),
            band(0.0, s, s, 1.0, "yellow"),
            band(s, s, 1.0, 1.0, "red"),
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub label: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendChart {
    pub points: Vec<TrendPoint>,
    pub reference_lines: Vec<ReferenceLine>,
}

/// Date-sorted series with one dashed line per level threshold
pub fn trend_chart(series: &[TrendPoint], thresholds: &RiskThresholds) -> TrendChart {
    let mut points = series.to_vec();
    points.sort_by_key(|p| p.date);

    let reference_lines = thresholds
        .reference_lines()
        .into_iter()
        .map(|(level, value)| ReferenceLine {
            label: format!("{} Risk", level),
            value,
        })
        .collect();

    TrendChart {
        points,
        reference_lines,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
    /// Highest level among the category's risks
    pub level: RiskLevel,
}

/// Risk counts per category, largest first, ties in first-seen order
pub fn category_distribution(risks: &[Risk], thresholds: &RiskThresholds) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = Vec::new();
    for risk in risks {
        let level = risk
            .level
            .unwrap_or_else(|| thresholds.level_for(risk.raw_score()));
        match counts
            .iter_mut()
            .find(|c| c.category == risk.category.as_str())
        {
            Some(entry) => {
                entry.count += 1;
                entry.level = entry.level.max(level);
            }
            None => counts.push(CategoryCount {
                category: risk.category.to_string(),
                count: 1,
                level,
            }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelCount {
    pub level: RiskLevel,
    pub count: usize,
    pub color: &'static str,
}

/// One entry per level, including empty ones
pub fn level_distribution(risks: &[Risk], thresholds: &RiskThresholds) -> Vec<LevelCount> {
    RiskLevel::ALL
        .iter()
        .map(|level| LevelCount {
            level: *level,
            count: risks
                .iter()
                .filter(|r| {
                    r.level
                        .unwrap_or_else(|| thresholds.level_for(r.raw_score()))
                        == *level
                })
                .count(),
            color: level.color(),
        })
        .collect()
}

/// Colored band of the per-risk score gauge
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GaugeBand {
    pub from: u32,
    pub to: u32,
    pub color: &'static str,
}

pub const GAUGE_BANDS: [GaugeBand; 3] = [
    GaugeBand {
        from: 0,
        to: 30,
        color: "green",
    },
    GaugeBand {
        from: 30,
        to: 70,
        color: "yellow",
    },
    GaugeBand {
        from: 70,
        to: 100,
        color: "red",
    },
];

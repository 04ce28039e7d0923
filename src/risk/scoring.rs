//! Risk Score Aggregation and Level Bucketing
//!
//! The aggregate score is the sum of weighted exposures:
//! `p * i * 100 * (weight / 100)` per risk, rounded and clamped to `[0, 100]`.
//! Levels are assigned by scanning ascending inclusive thresholds.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::{RiskConfig, ThresholdConfig};
use crate::constants::risk;
use crate::types::{Risk, RiskCategory, RiskLevel};

/// Category weight table in percent.
///
/// Keys are canonical category labels; lookups go through `RiskCategory` so
/// `"security"` and `"Security"` resolve to the same weight.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryWeights {
    weights: BTreeMap<String, f64>,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self::from_pairs(risk::CATEGORY_WEIGHTS.iter().map(|(c, w)| (*c, *w)))
    }
}

impl CategoryWeights {
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let weights = pairs
            .into_iter()
            .map(|(c, w)| (RiskCategory::from(c).as_str().to_string(), w))
            .collect();
        Self { weights }
    }

    pub fn from_map(map: &BTreeMap<String, f64>) -> Self {
        Self::from_pairs(map.iter().map(|(c, w)| (c.as_str(), *w)))
    }

    /// Weight in percent; unknown categories get `UNKNOWN_CATEGORY_WEIGHT`
    pub fn weight(&self, category: &RiskCategory) -> f64 {
        self.weights
            .get(category.as_str())
            .copied()
            .unwrap_or(risk::UNKNOWN_CATEGORY_WEIGHT)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(c, w)| (c.as_str(), *w))
    }
}

/// Weighted contribution of a single risk, before rounding
pub fn weighted_contribution(risk: &Risk, weights: &CategoryWeights) -> f64 {
    risk.exposure() * 100.0 * (weights.weight(&risk.category) / 100.0)
}

/// Aggregate 0-100 score for a set of risks.
///
/// Contributions are summed in ascending order so the result does not depend
/// on the order of `risks`.
pub fn calculate_risk_score(risks: &[Risk], weights: &CategoryWeights) -> u32 {
    if risks.is_empty() {
        return 0;
    }

    let mut contributions: Vec<f64> = risks
        .iter()
        .map(|r| weighted_contribution(r, weights))
        .filter(|c| c.is_finite())
        .collect();
    contributions.sort_by(f64::total_cmp);

    let total: f64 = contributions.iter().sum();
    total.round().clamp(0.0, risk::MAX_SCORE as f64) as u32
}

/// Inclusive upper bounds for Low, Medium and High
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskThresholds {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: risk::LOW_THRESHOLD,
            medium: risk::MEDIUM_THRESHOLD,
            high: risk::HIGH_THRESHOLD,
        }
    }
}

impl From<&ThresholdConfig> for RiskThresholds {
    fn from(c: &ThresholdConfig) -> Self {
        Self {
            low: c.low,
            medium: c.medium,
            high: c.high,
        }
    }
}

impl RiskThresholds {
    /// First bucket whose upper bound contains `score` wins
    pub fn level_for(&self, score: u32) -> RiskLevel {
        [
            (self.low, RiskLevel::Low),
            (self.medium, RiskLevel::Medium),
            (self.high, RiskLevel::High),
        ]
        .into_iter()
        .find(|(bound, _)| score <= *bound)
        .map(|(_, level)| level)
        .unwrap_or(RiskLevel::Critical)
    }

    /// Reference lines for trend charts: (label, value)
    pub fn reference_lines(&self) -> [(RiskLevel, u32); 3] {
        [
            (RiskLevel::Low, self.low),
            (RiskLevel::Medium, self.medium),
            (RiskLevel::High, self.high),
        ]
    }
}

/// Level for `score` using the default thresholds
pub fn get_risk_level(score: u32) -> RiskLevel {
    RiskThresholds::default().level_for(score)
}

/// Score plus the level it maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreSummary {
    pub score: u32,
    pub level: RiskLevel,
}

/// Scoring context built from configuration.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    weights: CategoryWeights,
    thresholds: RiskThresholds,
}

impl RiskScorer {
    pub fn new(weights: CategoryWeights, thresholds: RiskThresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    pub fn from_config(config: &RiskConfig) -> Self {
        Self::new(
            CategoryWeights::from_map(&config.category_weights),
            RiskThresholds::from(&config.thresholds),
        )
    }

    pub fn weights(&self) -> &CategoryWeights {
        &self.weights
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    pub fn score(&self, risks: &[Risk]) -> ScoreSummary {
        let score = calculate_risk_score(risks, &self.weights);
        ScoreSummary {
            score,
            level: self.thresholds.level_for(score),
        }
    }

    pub fn level_for(&self, score: u32) -> RiskLevel {
        self.thresholds.level_for(score)
    }

    /// Level of an individual risk, from its own unweighted score
    pub fn risk_level(&self, risk: &Risk) -> RiskLevel {
        risk.level
            .unwrap_or_else(|| self.thresholds.level_for(risk.raw_score()))
    }
}

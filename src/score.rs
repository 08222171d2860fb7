//! Composite quality scoring.
//!
//! The score is a weighted blend of fit quality, evidence, and geometry,
//! followed by multiplicative penalties for staleness and poor respect.
//! All terms are normalized to [0, 1] before weighting, so the weights in
//! [`ScoreWeights`] are directly comparable.

use crate::config::ScoreWeights;

/// Span over which the length term saturates, in days.
const FULL_LENGTH_DAYS: f64 = 365.0;
/// Covered-point count at which the evidence term saturates.
const FULL_POINTS: f64 = 10.0;
/// Relative distance from the last close beyond which a line is stale.
const PROXIMITY_LIMIT: f64 = 0.01;

/// Everything the scorer needs about one line.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs {
    pub r_squared: f64,
    pub covered_points: usize,
    /// Anchor span converted to days via `bars_per_day`
    pub span_days: f64,
    pub slope: f64,
    /// Relative distance between the line at the last bar and the last close
    pub proximity: f64,
    /// Violations per anchor-span bar
    pub violation_ratio: f64,
}

/// Blend the weighted terms and apply the penalty ladder.
///
/// Lines far from current price are halved; lines violated on more than a
/// quarter of their span are halved again; lines violated on more than half
/// their span score zero outright. The result is clamped to [0, 1].
pub fn score_line(weights: &ScoreWeights, inputs: &ScoreInputs) -> f64 {
    let norm_points = (inputs.covered_points as f64 / FULL_POINTS).min(1.0);
    let norm_len = (inputs.span_days / FULL_LENGTH_DAYS).min(1.0);

    let angle = inputs.slope.atan().to_degrees().abs();
    let target = weights.angle_target_deg;
    let norm_angle = 1.0 - ((angle - target).abs() / target).min(1.0);

    let mut score = weights.r_squared * inputs.r_squared
        + weights.points * norm_points
        + weights.length * norm_len
        + weights.angle * norm_angle;

    if inputs.proximity > PROXIMITY_LIMIT {
        score *= 0.5;
    }
    if inputs.violation_ratio > 0.25 {
        score *= 0.5;
    }
    if inputs.violation_ratio > 0.5 {
        score = 0.0;
    }
    score.clamp(0.0, 1.0)
}

// ============================================================
// TESTS
// ============================================================

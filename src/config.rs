//! Engine configuration and parameter metadata
//!
//! All parameters are defaulted and overridable per engine. Validation is
//! fail-fast: [`TrendlineConfig::validate`] runs at `EngineBuilder::build`
//! before any computation begins. Parameter metadata enables grid search
//! sweeps over the tunable fields.

use std::collections::HashMap;

use crate::{Frac, Lookback, Result, TrendlineError};

// ============================================================
// CLOSED VARIANT SETS
// ============================================================

/// Candidate generation algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Algorithm {
    /// Exhaustive pairwise fit over pivots. O(k³); only sane for a capped
    /// pivot set (see `max_pivots`).
    Pairwise,
    /// Sequential 2-point RANSAC with OLS inlier refinement.
    Ransac,
}

/// How the final ranked list is truncated
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LineCap {
    /// At most this many lines in total
    Global(usize),
    /// At most this many lines per side (support/resistance)
    PerSide(usize),
}

impl LineCap {
    /// Cap value; also the upper bound on RANSAC rounds per side.
    pub(crate) fn limit(self) -> usize {
        match self {
            LineCap::Global(n) | LineCap::PerSide(n) => n,
        }
    }
}

// ============================================================
// SCORE WEIGHTS
// ============================================================

/// Weights for the composite quality score.
///
/// The angle term favors lines near `angle_target_deg` over near-flat or
/// near-vertical ones. The 45° default is an unverified domain heuristic
/// carried over from daily-bar equity charts; it may not hold across
/// instruments or timeframes, which is why it is a parameter and not a
/// constant.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoreWeights {
    pub r_squared: f64,
    pub points: f64,
    pub length: f64,
    pub angle: f64,
    pub angle_target_deg: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            r_squared: 0.1,
            points: 0.4,
            length: 0.3,
            angle: 0.2,
            angle_target_deg: 45.0,
        }
    }
}

impl ScoreWeights {
    fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("weights.r_squared", self.r_squared),
            ("weights.points", self.points),
            ("weights.length", self.length),
            ("weights.angle", self.angle),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(TrendlineError::InvalidConfig(format!(
                    "{name} must be finite and >= 0, got {v}"
                )));
            }
        }
        if !self.angle_target_deg.is_finite()
            || self.angle_target_deg <= 0.0
            || self.angle_target_deg > 90.0
        {
            return Err(TrendlineError::OutOfRange {
                field: "weights.angle_target_deg",
                value: self.angle_target_deg,
                min: 0.0,
                max: 90.0,
            });
        }
        Ok(())
    }
}

// ============================================================
// CONFIG
// ============================================================

/// Full engine configuration. All fields public; defaults match the
/// reference tunables for daily bars.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrendlineConfig {
    /// Pivot detection window size(s); pivots from all windows are pooled
    pub lookbacks: Vec<usize>,
    /// Relative price distance under which two pivots merge (earliest wins)
    pub pivot_dedupe_frac: f64,
    /// Relative tolerance for pairwise point coverage and violation counting
    pub touch_tolerance: f64,
    /// Minimum covered pivots for a pairwise candidate
    pub min_points: usize,
    /// Minimum inliers for a RANSAC round to produce a line
    pub min_inliers: usize,
    /// Candidates whose covered-point span is shorter than this are rejected
    pub min_span_bars: usize,
    /// Pivot set cap (most recent kept) before the O(k³) pairwise scan
    pub max_pivots: usize,
    pub algorithm: Algorithm,
    /// Random 2-point samples per RANSAC round
    pub ransac_trials: usize,
    /// Relative residual under which a pivot counts as a RANSAC inlier
    pub ransac_tol_frac: f64,
    /// Seed for the RANSAC sample generator
    pub ransac_seed: u64,
    /// Slope distance under which two RANSAC lines merge
    pub slope_tol: f64,
    /// Intercept distance under which two RANSAC lines merge (price units)
    pub intercept_tol: f64,
    /// Relative excursion beyond the line that counts as a decisive break
    pub break_tolerance: f64,
    /// Dashed display-only continuation after the solid segment (0 = none)
    pub projection_bars: usize,
    pub line_cap: LineCap,
    /// Reject lines whose slope sign disagrees with the local close trend
    pub enforce_direction: bool,
    /// Bars per calendar day, for the span-in-days length normalization
    /// (1.0 for daily bars, 26.0 for 15m RTH bars, etc.)
    pub bars_per_day: f64,
    pub weights: ScoreWeights,
}

impl Default for TrendlineConfig {
    fn default() -> Self {
        Self {
            lookbacks: vec![5],
            pivot_dedupe_frac: 0.005,
            touch_tolerance: 0.0015,
            min_points: 3,
            min_inliers: 3,
            min_span_bars: 12,
            max_pivots: 300,
            algorithm: Algorithm::Ransac,
            ransac_trials: 250,
            ransac_tol_frac: 0.003,
            ransac_seed: 42,
            slope_tol: 0.01,
            intercept_tol: 1.0,
            break_tolerance: 0.0015,
            projection_bars: 40,
            line_cap: LineCap::PerSide(2),
            enforce_direction: true,
            bars_per_day: 1.0,
            weights: ScoreWeights::default(),
        }
    }
}

impl TrendlineConfig {
    /// Fail-fast validation of every field. Invalid configuration is a
    /// caller contract violation, reported before any computation.
    pub fn validate(&self) -> Result<()> {
        if self.lookbacks.is_empty() {
            return Err(TrendlineError::InvalidConfig(
                "lookbacks must not be empty".into(),
            ));
        }
        for &lb in &self.lookbacks {
            Lookback::new(lb)?;
        }
        for (name, v) in [
            ("pivot_dedupe_frac", self.pivot_dedupe_frac),
            ("touch_tolerance", self.touch_tolerance),
            ("ransac_tol_frac", self.ransac_tol_frac),
            ("break_tolerance", self.break_tolerance),
        ] {
            Frac::new(v).map_err(|_| TrendlineError::InvalidConfig(format!(
                "{name} must be a fraction in [0, 1], got {v}"
            )))?;
        }
        if self.min_points < 2 {
            return Err(TrendlineError::InvalidConfig(
                "min_points must be >= 2".into(),
            ));
        }
        if self.min_inliers < 2 {
            return Err(TrendlineError::InvalidConfig(
                "min_inliers must be >= 2".into(),
            ));
        }
        if self.min_span_bars < 1 {
            return Err(TrendlineError::InvalidConfig(
                "min_span_bars must be >= 1".into(),
            ));
        }
        if self.max_pivots < 2 {
            return Err(TrendlineError::InvalidConfig(
                "max_pivots must be >= 2".into(),
            ));
        }
        if self.ransac_trials < 1 {
            return Err(TrendlineError::InvalidConfig(
                "ransac_trials must be >= 1".into(),
            ));
        }
        if self.line_cap.limit() < 1 {
            return Err(TrendlineError::InvalidConfig(
                "line cap must be >= 1".into(),
            ));
        }
        for (name, v) in [
            ("slope_tol", self.slope_tol),
            ("intercept_tol", self.intercept_tol),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(TrendlineError::InvalidConfig(format!(
                    "{name} must be finite and >= 0, got {v}"
                )));
            }
        }
        if !self.bars_per_day.is_finite() || self.bars_per_day <= 0.0 {
            return Err(TrendlineError::InvalidConfig(format!(
                "bars_per_day must be > 0, got {}",
                self.bars_per_day
            )));
        }
        self.weights.validate()
    }

    /// Stable 64-bit fingerprint of the configuration (FNV-1a over field
    /// bits). Part of the external cache key: any parameter change yields a
    /// different hash and therefore a fresh computation.
    pub fn config_hash(&self) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;

        fn fold(mut h: u64, bytes: &[u8]) -> u64 {
            for &b in bytes {
                h ^= u64::from(b);
                h = h.wrapping_mul(PRIME);
            }
            h
        }

        let mut h = OFFSET;
        for &lb in &self.lookbacks {
            h = fold(h, &(lb as u64).to_le_bytes());
        }
        for v in [
            self.pivot_dedupe_frac,
            self.touch_tolerance,
            self.ransac_tol_frac,
            self.slope_tol,
            self.intercept_tol,
            self.break_tolerance,
            self.bars_per_day,
            self.weights.r_squared,
            self.weights.points,
            self.weights.length,
            self.weights.angle,
            self.weights.angle_target_deg,
        ] {
            h = fold(h, &v.to_bits().to_le_bytes());
        }
        for v in [
            self.min_points as u64,
            self.min_inliers as u64,
            self.min_span_bars as u64,
            self.max_pivots as u64,
            self.ransac_trials as u64,
            self.ransac_seed,
            self.projection_bars as u64,
            match self.algorithm {
                Algorithm::Pairwise => 0,
                Algorithm::Ransac => 1,
            },
            match self.line_cap {
                LineCap::Global(n) => n as u64,
                LineCap::PerSide(n) => (1 << 32) | n as u64,
            },
            u64::from(self.enforce_direction),
        ] {
            h = fold(h, &v.to_le_bytes());
        }
        h
    }

    /// Creates a config with sweepable parameters taken from a map.
    ///
    /// Missing parameters use their default values; every value is
    /// validated through the same newtypes as `validate()`.
    pub fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let mut cfg = Self::default();
        cfg.pivot_dedupe_frac = get_frac(params, "pivot_dedupe_frac", cfg.pivot_dedupe_frac)?.get();
        cfg.touch_tolerance = get_frac(params, "touch_tolerance", cfg.touch_tolerance)?.get();
        cfg.ransac_tol_frac = get_frac(params, "ransac_tol_frac", cfg.ransac_tol_frac)?.get();
        cfg.break_tolerance = get_frac(params, "break_tolerance", cfg.break_tolerance)?.get();
        cfg.min_points = get_count(params, "min_points", cfg.min_points)?.get();
        cfg.min_inliers = get_count(params, "min_inliers", cfg.min_inliers)?.get();
        cfg.min_span_bars = get_count(params, "min_span_bars", cfg.min_span_bars)?.get();
        cfg.ransac_trials = get_count(params, "ransac_trials", cfg.ransac_trials)?.get();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Returns metadata for the sweepable parameters
    pub fn param_meta() -> &'static [ParamMeta] {
        PARAM_META
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Relative fraction (validated through [`Frac`])
    Frac,
    /// Positive integer count (validated through [`Lookback`])
    Count,
}

/// Metadata for a single sweepable parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: f64,
    /// Range for optimization: (min, max, step)
    pub range: (f64, f64, f64),
    pub description: &'static str,
}

impl ParamMeta {
    /// Generate all values for grid search.
    ///
    /// Values are computed as `min + i * step` rather than by accumulation,
    /// so fractional steps neither drift nor drop the range's endpoint.
    /// Ranges are inclusive and assumed step-aligned.
    pub fn generate_grid(&self) -> Vec<f64> {
        let (min, max, step) = self.range;
        if step <= 0.0 || max < min {
            return vec![min];
        }
        let count = ((max - min) / step).round() as usize + 1;
        (0..count).map(|i| min + i as f64 * step).collect()
    }
}

const PARAM_META: &[ParamMeta] = &[
    ParamMeta {
        name: "pivot_dedupe_frac",
        kind: ParamKind::Frac,
        default: 0.005,
        range: (0.001, 0.02, 0.001),
        description: "Relative price distance under which near-equal pivots merge",
    },
    ParamMeta {
        name: "touch_tolerance",
        kind: ParamKind::Frac,
        default: 0.0015,
        range: (0.0005, 0.01, 0.0005),
        description: "Relative tolerance for point coverage and violation counting",
    },
    ParamMeta {
        name: "ransac_tol_frac",
        kind: ParamKind::Frac,
        default: 0.003,
        range: (0.001, 0.01, 0.001),
        description: "Relative residual under which a pivot counts as an inlier",
    },
    ParamMeta {
        name: "break_tolerance",
        kind: ParamKind::Frac,
        default: 0.0015,
        range: (0.0005, 0.005, 0.0005),
        description: "Relative excursion that counts as a decisive break",
    },
    ParamMeta {
        name: "min_points",
        kind: ParamKind::Count,
        default: 3.0,
        range: (2.0, 6.0, 1.0),
        description: "Minimum covered pivots for a pairwise candidate",
    },
    ParamMeta {
        name: "min_inliers",
        kind: ParamKind::Count,
        default: 3.0,
        range: (2.0, 6.0, 1.0),
        description: "Minimum inliers for a RANSAC round to produce a line",
    },
    ParamMeta {
        name: "min_span_bars",
        kind: ParamKind::Count,
        default: 12.0,
        range: (4.0, 40.0, 4.0),
        description: "Minimum bar distance between a candidate's first and last point",
    },
    ParamMeta {
        name: "ransac_trials",
        kind: ParamKind::Count,
        default: 250.0,
        range: (50.0, 500.0, 50.0),
        description: "Random 2-point samples per RANSAC round",
    },
];

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Frac from params with default fallback
pub fn get_frac(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Frac> {
    let value = params.get(key).copied().unwrap_or(default);
    Frac::new(value)
}

/// Helper to get a positive count from params with default fallback
pub fn get_count(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Lookback> {
    let value = params.get(key).copied().unwrap_or(default as f64);
    if value < 1.0 || value.fract() != 0.0 {
        return Err(TrendlineError::InvalidValue(
            "count parameter must be a positive integer",
        ));
    }
    Lookback::new(value as usize)
}

// ============================================================
// TESTS
// ============================================================

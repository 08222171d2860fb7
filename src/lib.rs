//! # LineScout - Trendline Detection, Clustering, and Scoring
//!
//! Pivot-anchored trendline discovery for OHLC series: extract local price
//! extrema, propose candidate lines (exhaustive pairwise or RANSAC), fit
//! each line as a price envelope, bound its valid segment at the first
//! decisive break, then score, deduplicate, and rank the survivors.
//!
//! ## Quick Start
//!
//! ```rust
//! use linescout::prelude::*;
//!
//! // Define your OHLCV data
//! struct Bar { o: f64, h: f64, l: f64, c: f64, v: f64 }
//!
//! impl OHLCV for Bar {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//!     fn volume(&self) -> f64 { self.v }
//! }
//!
//! // Create an engine with default parameters
//! let engine = EngineBuilder::new()
//!     .algorithm(Algorithm::Ransac)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//!
//! // Compute ranked support/resistance lines
//! let bars: Vec<Bar> = vec![];
//! let lines = engine.compute(&bars).unwrap();
//! assert!(lines.is_empty());
//! ```

pub mod cache;
pub mod candidates;
pub mod cluster;
pub mod config;
pub mod envelope;
pub mod pivots;
pub mod render;
pub mod score;
pub mod touches;

pub mod prelude {
    pub use crate::{
        // Cache
        cache::ComputeCache,
        // Configuration
        config::{Algorithm, LineCap, ParamMeta, ScoreWeights, TrendlineConfig},
        // Parallel
        compute_parallel,
        // Rendering payload
        render::{ChartPayload, Marker, MarkerPosition, Segment, SegmentStyle},
        // Engine
        CandidateLine,
        ComputeError,
        ComputeResult,
        EngineBuilder,
        OHLCVExt,
        // Data model
        Pivot,
        PivotKind,
        Result,
        ScoredLine,
        Side,
        TrendlineEngine,
        // Errors
        TrendlineError,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, TrendlineError>;

/// Errors that can occur during trendline computation
#[derive(Debug, Clone, thiserror::Error)]
pub enum TrendlineError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Relative fraction in range 0.0..=1.0 (tolerances, dedup distances)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Frac(f64);

impl Frac {
    /// Create a new Frac, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(TrendlineError::InvalidValue(
                "Frac cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(TrendlineError::OutOfRange {
                field: "Frac",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Frac {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Frac {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Frac::new(value).map_err(serde::de::Error::custom)
    }
}

/// Lookback window in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Lookback(usize);

impl Lookback {
    /// Create a new Lookback, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(TrendlineError::InvalidValue("Lookback must be > 0"));
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Lookback {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Lookback {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Lookback::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    /// Bar timestamp (unix seconds). When absent, the bar index is used.
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Blanket impl for references to dyn OHLCV
impl OHLCV for &dyn OHLCV {
    fn open(&self) -> f64 {
        (*self).open()
    }

    fn high(&self) -> f64 {
        (*self).high()
    }

    fn low(&self) -> f64 {
        (*self).low()
    }

    fn close(&self) -> f64 {
        (*self).close()
    }

    fn volume(&self) -> f64 {
        (*self).volume()
    }

    fn timestamp(&self) -> Option<i64> {
        (*self).timestamp()
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// True iff `price` falls inside the bar's wick range `[low, high]`.
    #[inline]
    fn wick_contains(&self, price: f64) -> bool {
        self.low() <= price && price <= self.high()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        if self.high() < self.low() {
            return Err(TrendlineError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
        {
            return Err(TrendlineError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(TrendlineError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

// ============================================================
// DATA MODEL
// ============================================================

/// Which price boundary a line tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Side {
    Support,
    Resistance,
}

impl Side {
    #[inline]
    pub fn is_support(self) -> bool {
        matches!(self, Side::Support)
    }

    #[inline]
    pub fn is_resistance(self) -> bool {
        matches!(self, Side::Resistance)
    }
}

/// Kind of local extremum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PivotKind {
    High,
    Low,
}

/// A local price extremum. Identified uniquely by (timestamp, kind).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Pivot {
    /// Bar position in the input series
    pub index: usize,
    pub timestamp: i64,
    pub price: f64,
    pub kind: PivotKind,
    /// Lookback window that first discovered this pivot
    pub lookback: usize,
}

impl Pivot {
    /// Identity key: two pivots on the same bar of the same kind are one pivot.
    #[inline]
    pub fn identity(&self) -> (i64, PivotKind) {
        (self.timestamp, self.kind)
    }
}

/// A raw fitted line before envelope adjustment and scoring.
///
/// `price(i) = slope * i + intercept` over bar indices. Ephemeral: consumed
/// during scoring/clustering and never part of the final output.
#[derive(Debug, Clone)]
pub struct CandidateLine {
    pub side: Side,
    pub slope: f64,
    pub intercept: f64,
    /// Covered pivots (anchor pair/inliers plus any pivot within tolerance), time-ordered
    pub points: Vec<Pivot>,
    pub source_lookback: usize,
}

impl CandidateLine {
    #[inline]
    pub fn price_at(&self, index: usize) -> f64 {
        self.slope * index as f64 + self.intercept
    }

    /// Bar distance between the earliest and latest covered pivot.
    pub fn span_bars(&self) -> usize {
        let min = self.points.iter().map(|p| p.index).min().unwrap_or(0);
        let max = self.points.iter().map(|p| p.index).max().unwrap_or(0);
        max - min
    }
}

/// Final output record: one ranked trendline.
///
/// Built once per [`TrendlineEngine::compute`] call and never mutated; the
/// whole list is replaced wholesale on recomputation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoredLine {
    pub side: Side,
    pub slope: f64,
    pub intercept: f64,
    /// First bar of the solid (validated) segment
    pub segment_start: usize,
    /// Last bar of the solid segment: the first decisive break, or the last bar
    pub segment_solid_end: usize,
    /// End of the optional dashed projection; equals `segment_solid_end` when disabled
    pub segment_projection_end: usize,
    /// Timestamps of bars whose wick crosses the line, within the solid segment
    pub touches: Vec<i64>,
    pub violation_count: usize,
    pub r_squared: f64,
    /// Composite quality score in [0, 1]
    pub score: f64,
}

impl ScoredLine {
    #[inline]
    pub fn price_at(&self, index: usize) -> f64 {
        self.slope * index as f64 + self.intercept
    }
}

// ============================================================
// ENGINE
// ============================================================

use config::{Algorithm, LineCap, TrendlineConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Trendline detection engine.
///
/// One `compute()` call processes one OHLC series end-to-end: no I/O, no
/// shared mutable state across calls. The RANSAC path draws samples from a
/// `StdRng` seeded from the config, so identical series + config + seed
/// yield identical output.
#[derive(Debug)]
pub struct TrendlineEngine {
    config: TrendlineConfig,
}

impl TrendlineEngine {
    /// Create an engine, failing fast on invalid configuration.
    pub fn new(config: TrendlineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &TrendlineConfig {
        &self.config
    }

    /// Compute the ranked set of support/resistance lines for one series.
    ///
    /// Insufficient data (too few bars, pivots, or inliers) is not an error:
    /// the result is simply empty.
    pub fn compute<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<ScoredLine>> {
        let cfg = &self.config;
        if bars.is_empty() {
            return Ok(Vec::new());
        }

        let timestamps: Vec<i64> = bars
            .iter()
            .enumerate()
            .map(|(i, b)| b.timestamp().unwrap_or(i as i64))
            .collect();

        let (highs, lows) =
            pivots::collect_pivots(bars, &timestamps, &cfg.lookbacks, cfg.pivot_dedupe_frac);

        let mut survivors: Vec<cluster::ScoredCandidate> = Vec::new();

        match cfg.algorithm {
            Algorithm::Pairwise => {
                // One pass over the pooled pivots: anchor pairs may mix
                // kinds, and each line's side comes from its covered points.
                let mut pool = highs;
                pool.extend(lows);
                pool.sort_by_key(|p| p.index);

                let mut scored = Vec::new();
                for cand in candidates::pairwise_candidates(&pool, cfg) {
                    if let Some(s) = self.finish_candidate(bars, &timestamps, cand) {
                        scored.push(s);
                    }
                }
                survivors.extend(cluster::dedup_by_overlap(scored));
            }
            Algorithm::Ransac => {
                let mut rng = StdRng::seed_from_u64(cfg.ransac_seed);
                for (side, piv) in [(Side::Resistance, highs), (Side::Support, lows)] {
                    let mut scored = Vec::new();
                    for cand in candidates::ransac_candidates(&piv, side, cfg, &mut rng) {
                        if let Some(s) = self.finish_candidate(bars, &timestamps, cand) {
                            scored.push(s);
                        }
                    }
                    survivors.extend(cluster::merge_by_params(
                        scored,
                        cfg.slope_tol,
                        cfg.intercept_tol,
                    ));
                }
            }
        }

        Ok(rank(survivors, cfg.line_cap))
    }

    /// Envelope-adjust, segment-bound, classify, and score one candidate.
    ///
    /// Returns `None` when the direction filter rejects the line.
    fn finish_candidate<T: OHLCV>(
        &self,
        bars: &[T],
        timestamps: &[i64],
        cand: CandidateLine,
    ) -> Option<cluster::ScoredCandidate> {
        let cfg = &self.config;
        let last = bars.len() - 1;
        let slope = cand.slope;

        // Post-fit correction: slope preserved, intercept shifted so the
        // line hugs the covered pivots from the correct side.
        let intercept = envelope::fit_envelope(cand.side, slope, &cand.points);

        let first_pt = cand.points.iter().map(|p| p.index).min()?;
        let last_pt = cand.points.iter().map(|p| p.index).max()?;

        let segment_start = first_pt;
        let segment_solid_end = match envelope::first_break(
            bars,
            cand.side,
            slope,
            intercept,
            segment_start,
            cfg.break_tolerance,
        ) {
            Some(b) if b > segment_start => b,
            _ => last,
        };

        if cfg.enforce_direction
            && segment_solid_end > segment_start
            && !envelope::direction_ok(slope, bars, segment_start, segment_solid_end)
        {
            return None;
        }

        let segment_projection_end = last.min(segment_solid_end + cfg.projection_bars);

        let touches = touches::collect_touches(
            bars,
            timestamps,
            slope,
            intercept,
            segment_start,
            segment_solid_end,
        );
        let violation_count = touches::count_violations(
            bars,
            slope,
            intercept,
            segment_start,
            last_pt,
            cfg.touch_tolerance,
        );
        let anchor_span = last_pt - first_pt;
        let violation_ratio = violation_count as f64 / anchor_span.max(1) as f64;

        let xs: Vec<f64> = cand.points.iter().map(|p| p.index as f64).collect();
        let ys: Vec<f64> = cand.points.iter().map(|p| p.price).collect();
        let r_squared = candidates::r_squared(&xs, &ys);

        let last_close = bars[last].close();
        let proximity = if last_close.abs() > f64::EPSILON {
            ((slope * last as f64 + intercept) - last_close).abs() / last_close.abs()
        } else {
            0.0
        };

        let score = score::score_line(
            &cfg.weights,
            &score::ScoreInputs {
                r_squared,
                covered_points: cand.points.len(),
                span_days: anchor_span as f64 / cfg.bars_per_day,
                slope,
                proximity,
                violation_ratio,
            },
        );

        Some(cluster::ScoredCandidate {
            record: ScoredLine {
                side: cand.side,
                slope,
                intercept,
                segment_start,
                segment_solid_end,
                segment_projection_end,
                touches,
                violation_count,
                r_squared,
                score,
            },
            points: cand.points,
        })
    }
}

/// Sort by score descending (ties: more recent segment start first), then cap.
fn rank(mut scored: Vec<cluster::ScoredCandidate>, cap: LineCap) -> Vec<ScoredLine> {
    scored.sort_by(|a, b| {
        b.record
            .score
            .partial_cmp(&a.record.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.record.segment_start.cmp(&a.record.segment_start))
    });

    match cap {
        LineCap::Global(n) => scored.into_iter().take(n).map(|s| s.record).collect(),
        LineCap::PerSide(n) => {
            let mut support = 0usize;
            let mut resistance = 0usize;
            let mut kept = Vec::new();
            for s in scored {
                let count = match s.record.side {
                    Side::Support => &mut support,
                    Side::Resistance => &mut resistance,
                };
                if *count < n {
                    *count += 1;
                    kept.push(s.record);
                }
            }
            kept
        }
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating [`TrendlineEngine`] instances
pub struct EngineBuilder {
    config: TrendlineConfig,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: TrendlineConfig::default(),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: TrendlineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.config.algorithm = algorithm;
        self
    }

    pub fn lookbacks(mut self, lookbacks: impl IntoIterator<Item = usize>) -> Self {
        self.config.lookbacks = lookbacks.into_iter().collect();
        self
    }

    /// Seed for the RANSAC sample generator (reproducibility)
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.ransac_seed = seed;
        self
    }

    pub fn line_cap(mut self, cap: LineCap) -> Self {
        self.config.line_cap = cap;
        self
    }

    pub fn enforce_direction(mut self, enable: bool) -> Self {
        self.config.enforce_direction = enable;
        self
    }

    pub fn min_span_bars(mut self, bars: usize) -> Self {
        self.config.min_span_bars = bars;
        self
    }

    pub fn projection_bars(mut self, bars: usize) -> Self {
        self.config.projection_bars = bars;
        self
    }

    pub fn touch_tolerance(mut self, tol: f64) -> Self {
        self.config.touch_tolerance = tol;
        self
    }

    pub fn break_tolerance(mut self, tol: f64) -> Self {
        self.config.break_tolerance = tol;
        self
    }

    pub fn weights(mut self, weights: config::ScoreWeights) -> Self {
        self.config.weights = weights;
        self
    }

    /// Build the engine, validating the configuration
    pub fn build(self) -> Result<TrendlineEngine> {
        TrendlineEngine::new(self.config)
    }
}

// ============================================================
// PARALLEL COMPUTATION
// ============================================================

use rayon::prelude::*;

/// Result of computing a single instrument
#[derive(Debug)]
pub struct ComputeResult {
    pub symbol: String,
    pub lines: Vec<ScoredLine>,
}

/// Error from computing a single instrument
#[derive(Debug)]
pub struct ComputeError {
    pub symbol: String,
    pub error: TrendlineError,
}

/// Parallel computation over multiple instruments.
///
/// The engine itself is single-threaded per series; separate series are
/// independent, so batches parallelize trivially.
pub fn compute_parallel<'a, T, I>(
    engine: &TrendlineEngine,
    instruments: I,
) -> (Vec<ComputeResult>, Vec<ComputeError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .compute(bars)
                .map(|lines| ComputeResult {
                    symbol: symbol.to_string(),
                    lines,
                })
                .map_err(|error| ComputeError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Test OHLCV bar
    #[derive(Debug, Clone)]
    struct Bar {
        o: f64,
        h: f64,
        l: f64,
        c: f64,
        v: f64,
    }

    impl Bar {
        fn new(o: f64, h: f64, l: f64, c: f64) -> Self {
            Self {
                o,
                h,
                l,
                c,
                v: 1000.0,
            }
        }
    }

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            self.o
        }

        fn high(&self) -> f64 {
            self.h
        }

        fn low(&self) -> f64 {
            self.l
        }

        fn close(&self) -> f64 {
            self.c
        }

        fn volume(&self) -> f64 {
            self.v
        }
    }

    fn flat_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|_| Bar::new(100.0, 100.0, 100.0, 100.0))
            .collect()
    }

    /// Rising base with deep wick spikes on alternating sides, so both
    /// pivot kinds appear and each kind lies on one clean line.
    fn zigzag_uptrend(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = 100.0 + 0.5 * i as f64;
                let spike = if i % 16 == 2 { 2.8 } else { 0.2 };
                let dip = if i % 16 == 10 { 2.8 } else { 0.2 };
                Bar::new(c, c + spike, c - dip, c)
            })
            .collect()
    }

    #[test]
    fn test_frac_validation() {
        assert!(Frac::new(0.0).is_ok());
        assert!(Frac::new(1.0).is_ok());
        assert!(Frac::new(0.003).is_ok());
        assert!(Frac::new(-0.1).is_err());
        assert!(Frac::new(1.1).is_err());
        assert!(Frac::new(f64::NAN).is_err());
        assert!(Frac::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_lookback_validation() {
        assert!(Lookback::new(1).is_ok());
        assert!(Lookback::new(100).is_ok());
        assert!(Lookback::new(0).is_err());
    }

    #[test]
    fn test_ohlcv_ext() {
        let bar = Bar::new(100.0, 110.0, 90.0, 105.0);
        assert_eq!(bar.range(), 20.0);
        assert!(bar.wick_contains(95.0));
        assert!(!bar.wick_contains(111.0));
        assert!(bar.validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        assert!(EngineBuilder::new().lookbacks([0]).build().is_err());
        assert!(EngineBuilder::new()
            .line_cap(LineCap::PerSide(0))
            .build()
            .is_err());
        assert!(EngineBuilder::new().touch_tolerance(-1.0).build().is_err());
        assert!(EngineBuilder::new()
            .touch_tolerance(f64::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn test_empty_series() {
        let engine = EngineBuilder::new().build().unwrap();
        let bars: Vec<Bar> = vec![];
        assert!(engine.compute(&bars).unwrap().is_empty());
    }

    #[test]
    fn test_flat_series_yields_no_lines() {
        let engine = EngineBuilder::new().build().unwrap();
        let lines = engine.compute(&flat_bars(50)).unwrap();
        assert!(lines.is_empty(), "constant series has no pivots, no lines");
    }

    #[test]
    fn test_pairwise_pools_both_pivot_kinds() {
        let bars = zigzag_uptrend(120);
        let engine = EngineBuilder::new()
            .algorithm(Algorithm::Pairwise)
            .enforce_direction(false)
            .build()
            .unwrap();

        let lines = engine.compute(&bars).unwrap();
        assert!(lines.iter().any(|l| l.side.is_support()));
        assert!(lines.iter().any(|l| l.side.is_resistance()));
    }

    #[test]
    fn test_idempotent_for_fixed_seed() {
        let bars = zigzag_uptrend(120);
        let engine = EngineBuilder::new()
            .algorithm(Algorithm::Ransac)
            .seed(7)
            .enforce_direction(false)
            .build()
            .unwrap();

        let a = engine.compute(&bars).unwrap();
        let b = engine.compute(&bars).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_per_side_cap() {
        let bars = zigzag_uptrend(200);
        let engine = EngineBuilder::new()
            .algorithm(Algorithm::Ransac)
            .line_cap(LineCap::PerSide(1))
            .enforce_direction(false)
            .build()
            .unwrap();

        let lines = engine.compute(&bars).unwrap();
        let supports = lines.iter().filter(|l| l.side.is_support()).count();
        let resistances = lines.iter().filter(|l| l.side.is_resistance()).count();
        assert!(supports <= 1);
        assert!(resistances <= 1);
    }

    #[test]
    fn test_global_cap() {
        let bars = zigzag_uptrend(200);
        let engine = EngineBuilder::new()
            .algorithm(Algorithm::Ransac)
            .line_cap(LineCap::Global(1))
            .enforce_direction(false)
            .build()
            .unwrap();

        let lines = engine.compute(&bars).unwrap();
        assert!(lines.len() <= 1);
    }

    #[test]
    fn test_ranked_by_score_descending() {
        let bars = zigzag_uptrend(200);
        let engine = EngineBuilder::new()
            .algorithm(Algorithm::Ransac)
            .enforce_direction(false)
            .build()
            .unwrap();

        let lines = engine.compute(&bars).unwrap();
        for pair in lines.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_parallel_compute() {
        let engine = EngineBuilder::new().build().unwrap();
        let bars1 = zigzag_uptrend(80);
        let bars2 = flat_bars(50);

        let instruments: Vec<(&str, &[Bar])> = vec![("AAPL", &bars1), ("GOOGL", &bars2)];
        let (results, errors) = compute_parallel(&engine, instruments);
        assert_eq!(results.len(), 2);
        assert!(errors.is_empty());
    }
}

//! Pivot extraction: local high/low extrema over rolling lookback windows.
//!
//! A bar is a pivot high when its high strictly exceeds every other high in
//! the window `[i - lookback, i + lookback]`; pivot lows mirror with lows.
//! Tie-break policy: the high test is evaluated before the low test for the
//! same bar, and when the high test wins the low test is skipped for that
//! bar. This is a deliberate ordering, not an omission — a single bar never
//! yields both kinds in one pass.
//!
//! Dedup is causal and order-dependent: a pivot is discarded when its price
//! lies within `dedupe_frac` (relative) of any already-accepted pivot of
//! either kind, so earlier-discovered pivots win and are never re-evaluated.

use crate::{Pivot, PivotKind, OHLCV};

/// Find pivot highs and lows for a single lookback window, deduplicated.
///
/// Series shorter than `2 * lookback + 1` bars yield empty lists; that is
/// insufficient data, not an error.
pub fn find_pivots<T: OHLCV>(
    bars: &[T],
    timestamps: &[i64],
    lookback: usize,
    dedupe_frac: f64,
) -> (Vec<Pivot>, Vec<Pivot>) {
    let deduped = dedupe(raw_pivots(bars, timestamps, lookback), dedupe_frac);
    split_by_kind(deduped)
}

/// Pool pivots from all lookback windows and apply the causal dedup rule to
/// the pooled set in time order (earlier lookbacks win on the same bar).
pub fn collect_pivots<T: OHLCV>(
    bars: &[T],
    timestamps: &[i64],
    lookbacks: &[usize],
    dedupe_frac: f64,
) -> (Vec<Pivot>, Vec<Pivot>) {
    let mut pooled: Vec<Pivot> = Vec::new();
    for &lb in lookbacks {
        pooled.extend(raw_pivots(bars, timestamps, lb));
    }
    // Stable by index: same-bar pivots keep lookback configuration order,
    // and per bar the high precedes the low.
    pooled.sort_by_key(|p| p.index);
    split_by_kind(dedupe(pooled, dedupe_frac))
}

/// Strict local extrema in time order, without dedup.
fn raw_pivots<T: OHLCV>(bars: &[T], timestamps: &[i64], lookback: usize) -> Vec<Pivot> {
    let n = bars.len();
    if lookback == 0 || n < 2 * lookback + 1 {
        return Vec::new();
    }

    let mut out = Vec::new();
    for i in lookback..n - lookback {
        let hi = bars[i].high();
        let lo = bars[i].low();

        let window = (i - lookback..=i + lookback).filter(|&j| j != i);
        let mut is_high = true;
        let mut is_low = true;
        for j in window {
            if bars[j].high() >= hi {
                is_high = false;
            }
            if bars[j].low() <= lo {
                is_low = false;
            }
            if !is_high && !is_low {
                break;
            }
        }

        // High before low; a winning high test skips the low test.
        if is_high {
            out.push(Pivot {
                index: i,
                timestamp: timestamps[i],
                price: hi,
                kind: PivotKind::High,
                lookback,
            });
        } else if is_low {
            out.push(Pivot {
                index: i,
                timestamp: timestamps[i],
                price: lo,
                kind: PivotKind::Low,
                lookback,
            });
        }
    }
    out
}

/// Causal price dedup over a time-ordered pivot stream.
///
/// Also drops repeat identities (same bar, same kind) found by more than one
/// lookback window, even when `frac` is zero.
fn dedupe(pivots: Vec<Pivot>, frac: f64) -> Vec<Pivot> {
    let mut accepted: Vec<Pivot> = Vec::with_capacity(pivots.len());
    for p in pivots {
        let near_existing = accepted.iter().any(|a| {
            a.identity() == p.identity()
                || (p.price - a.price).abs() / a.price.abs().max(1e-9) < frac
        });
        if !near_existing {
            accepted.push(p);
        }
    }
    accepted
}

fn split_by_kind(pivots: Vec<Pivot>) -> (Vec<Pivot>, Vec<Pivot>) {
    let mut highs = Vec::new();
    let mut lows = Vec::new();
    for p in pivots {
        match p.kind {
            PivotKind::High => highs.push(p),
            PivotKind::Low => lows.push(p),
        }
    }
    (highs, lows)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct Bar {
        h: f64,
        l: f64,
    }

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            (self.h + self.l) / 2.0
        }

        fn high(&self) -> f64 {
            self.h
        }

        fn low(&self) -> f64 {
            self.l
        }

        fn close(&self) -> f64 {
            (self.h + self.l) / 2.0
        }

        fn volume(&self) -> f64 {
            1000.0
        }
    }

    fn bars_from_mid(mids: &[f64]) -> Vec<Bar> {
        mids.iter().map(|&m| Bar { h: m + 1.0, l: m - 1.0 }).collect()
    }

    fn ts(n: usize) -> Vec<i64> {
        (0..n as i64).collect()
    }

    #[test]
    fn test_too_few_bars_yields_empty() {
        let bars = bars_from_mid(&[100.0, 101.0, 102.0]);
        let (h, l) = find_pivots(&bars, &ts(3), 2, 0.0);
        assert!(h.is_empty());
        assert!(l.is_empty());
    }

    #[test]
    fn test_single_peak_and_trough() {
        // Peak at index 2, trough at index 6
        let bars = bars_from_mid(&[100.0, 104.0, 110.0, 104.0, 100.0, 96.0, 90.0, 96.0, 100.0]);
        let (h, l) = find_pivots(&bars, &ts(9), 2, 0.0);
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].index, 2);
        assert_eq!(h[0].kind, PivotKind::High);
        assert_eq!(l.len(), 1);
        assert_eq!(l[0].index, 6);
    }

    #[test]
    fn test_strict_comparison_rejects_plateau() {
        // Two equal tops: neither strictly exceeds the other
        let bars = bars_from_mid(&[100.0, 105.0, 110.0, 110.0, 105.0, 100.0, 95.0]);
        let (h, _) = find_pivots(&bars, &ts(7), 2, 0.0);
        assert!(h.is_empty(), "plateau bars are not strict extrema");
    }

    #[test]
    fn test_dedup_drops_near_equal_prices() {
        // Two peaks with tops 111.0 and 111.2: within 0.5% of each other
        let bars = bars_from_mid(&[
            100.0, 105.0, 110.0, 105.0, 100.0, 105.0, 110.2, 105.0, 100.0,
        ]);
        let (h, _) = find_pivots(&bars, &ts(9), 2, 0.005);
        assert_eq!(h.len(), 1, "second near-equal pivot is discarded");
        assert_eq!(h[0].index, 2, "earliest discovered pivot wins");
    }

    #[test]
    fn test_dedup_applies_across_kinds() {
        // Low pivot 96.5 at index 4, then a strict high pivot 96.95 at
        // index 6 within 0.5% of it: the later pivot is dropped even though
        // the kinds differ.
        let bars: Vec<Bar> = vec![
            Bar { h: 105.0, l: 104.0 },
            Bar { h: 103.0, l: 102.0 },
            Bar { h: 101.0, l: 100.0 },
            Bar { h: 99.0, l: 98.5 },
            Bar { h: 96.8, l: 96.5 },
            Bar { h: 96.9, l: 96.8 },
            Bar { h: 96.95, l: 96.9 },
            Bar { h: 96.85, l: 96.8 },
            Bar { h: 96.7, l: 96.6 },
        ];
        let (h, l) = find_pivots(&bars, &ts(9), 2, 0.005);
        assert_eq!(l.len(), 1);
        assert_eq!(l[0].index, 4);
        assert!(h.is_empty(), "high within dedup distance of accepted low");
    }

    #[test]
    fn test_pooled_lookbacks_keep_first_discovery() {
        let bars = bars_from_mid(&[100.0, 104.0, 110.0, 104.0, 100.0, 96.0, 90.0, 96.0, 100.0]);
        let (h, l) = collect_pivots(&bars, &ts(9), &[2, 3], 0.005);
        // Both windows find the same extrema; pooling must not duplicate them.
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].lookback, 2);
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn test_no_dedup_when_frac_is_zero_but_identity_holds() {
        let bars = bars_from_mid(&[100.0, 104.0, 110.0, 104.0, 100.0, 96.0, 90.0, 96.0, 100.0]);
        let (h, _) = collect_pivots(&bars, &ts(9), &[2, 2], 0.0);
        assert_eq!(h.len(), 1, "identical (timestamp, kind) collapses even at frac=0");
    }

    #[test]
    fn test_property_no_two_accepted_within_frac() {
        let mids: Vec<f64> = (0..60)
            .map(|i| 100.0 + 10.0 * ((i as f64) * 0.7).sin())
            .collect();
        let bars = bars_from_mid(&mids);
        let frac = 0.01;
        let (h, l) = find_pivots(&bars, &ts(60), 3, frac);

        let all: Vec<&Pivot> = h.iter().chain(l.iter()).collect();
        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                let rel = (a.price - b.price).abs() / a.price.abs().max(1e-9);
                assert!(rel >= frac, "pivots {a:?} and {b:?} violate dedup distance");
            }
        }
    }
}

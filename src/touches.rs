//! Touch classification and violation counting along a fitted line.
//!
//! Touches and violations are deliberately different tests. A touch is a
//! wick event: the bar's `[low, high]` range crosses the line, which is the
//! market probing the level. A violation is a close event: the close
//! settles away from the line by more than the tolerance, which is the bar
//! failing to respect it.

use crate::{OHLCV, OHLCVExt};

/// Timestamps of bars in `[from, to]` whose wick range contains the line.
///
/// The window is clamped to the series; an inverted window yields no
/// touches. Output order follows bar order, so it is already sorted.
pub fn collect_touches<T: OHLCV>(
    bars: &[T],
    timestamps: &[i64],
    slope: f64,
    intercept: f64,
    from: usize,
    to: usize,
) -> Vec<i64> {
    let to = to.min(bars.len().saturating_sub(1)).min(timestamps.len().saturating_sub(1));
    let mut out = Vec::new();
    if from > to {
        return out;
    }
    for i in from..=to {
        let fitted = slope * i as f64 + intercept;
        if bars[i].wick_contains(fitted) {
            out.push(timestamps[i]);
        }
    }
    out
}

/// Count of bars in `[from, to]` whose close deviates from the line by more
/// than `tol`, relative to the close.
pub fn count_violations<T: OHLCV>(
    bars: &[T],
    slope: f64,
    intercept: f64,
    from: usize,
    to: usize,
    tol: f64,
) -> usize {
    let to = to.min(bars.len().saturating_sub(1));
    if from > to {
        return 0;
    }
    bars[from..=to]
        .iter()
        .enumerate()
        .filter(|(i, b)| {
            let fitted = slope * (from + i) as f64 + intercept;
            let close = b.close();
            (fitted - close).abs() / close.abs().max(1e-9) > tol
        })
        .count()
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Bar {
        h: f64,
        l: f64,
        c: f64,
    }

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            self.c
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
            0.0
        }
    }

    fn bar(h: f64, l: f64, c: f64) -> Bar {
        Bar { h, l, c }
    }

    #[test]
    fn test_touch_requires_wick_crossing() {
        // Flat line at 100; only bars 0 and 2 reach it with their wicks.
        let bars = vec![
            bar(100.5, 99.0, 99.5),
            bar(99.5, 98.0, 99.0),
            bar(100.2, 99.5, 99.8),
            bar(99.9, 98.5, 99.0),
        ];
        let ts: Vec<i64> = (0..4).collect();
        let touches = collect_touches(&bars, &ts, 0.0, 100.0, 0, 3);
        assert_eq!(touches, vec![0, 2]);
    }

    #[test]
    fn test_touches_limited_to_window() {
        let bars = vec![
            bar(100.5, 99.5, 100.0),
            bar(100.5, 99.5, 100.0),
            bar(100.5, 99.5, 100.0),
        ];
        let ts: Vec<i64> = (10..13).collect();
        let touches = collect_touches(&bars, &ts, 0.0, 100.0, 1, 2);
        assert_eq!(touches, vec![11, 12]);
        // Inverted window is empty, not a panic.
        assert!(collect_touches(&bars, &ts, 2.0, 0.0, 2, 1).is_empty());
    }

    #[test]
    fn test_touch_window_clamped_to_series() {
        let bars = vec![bar(100.5, 99.5, 100.0)];
        let ts = vec![0i64];
        let touches = collect_touches(&bars, &ts, 0.0, 100.0, 0, 99);
        assert_eq!(touches, vec![0]);
    }

    #[test]
    fn test_violations_count_settled_deviations() {
        // Flat line at 100, 1% tolerance: closes at 100.5 and 99.6 respect
        // it, 102.0 and 97.0 do not.
        let bars = vec![
            bar(101.0, 100.0, 100.5),
            bar(103.0, 101.0, 102.0),
            bar(100.0, 99.0, 99.6),
            bar(98.0, 96.0, 97.0),
        ];
        assert_eq!(count_violations(&bars, 0.0, 100.0, 0, 3, 0.01), 2);
    }

    #[test]
    fn test_violations_respect_sloped_line() {
        // Line 100 + 0.5i; every close stays on it.
        let bars: Vec<Bar> = (0..10)
            .map(|i| {
                let c = 100.0 + 0.5 * i as f64;
                bar(c + 0.2, c - 0.2, c)
            })
            .collect();
        assert_eq!(count_violations(&bars, 0.5, 100.0, 0, 9, 0.0015), 0);
    }

    #[test]
    fn test_violations_empty_window() {
        let bars = vec![bar(101.0, 99.0, 100.0)];
        assert_eq!(count_violations(&bars, 0.0, 100.0, 5, 3, 0.01), 0);
    }
}

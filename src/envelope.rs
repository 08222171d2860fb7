//! Envelope fit, direction filter, and break detection.
//!
//! A fitted candidate runs through the middle of its covered pivots; the
//! envelope correction keeps the slope and shifts the intercept so the line
//! stays inside the price action it bounds: resistance sits at or under its
//! covered highs, support at or over its covered lows. The wicks reach the
//! line instead of the line floating outside them.

use crate::{OHLCV, Pivot, Side};

/// Slopes whose magnitude is under this are treated as flat by the
/// direction filter.
const SLOPE_EPS: f64 = 1e-6;

/// Shift a line of fixed `slope` onto the inner edge of its `points`.
///
/// Returns the corrected intercept: the min of `price - slope * index` for
/// resistance, the max for support. With at least one point the line passes
/// exactly through the extreme pivot.
pub fn fit_envelope(side: Side, slope: f64, points: &[Pivot]) -> f64 {
    let offsets = points.iter().map(|p| p.price - slope * p.index as f64);
    let folded = match side {
        Side::Resistance => offsets.fold(f64::INFINITY, f64::min),
        Side::Support => offsets.fold(f64::NEG_INFINITY, f64::max),
    };
    if folded.is_finite() {
        folded
    } else {
        0.0
    }
}

/// Whether the line slope agrees with the local close trend over
/// `[from, to]`.
///
/// The trend is the least-squares slope of closes on that window. Flat
/// lines always pass. A falling line needs a falling trend and a rising
/// line a rising one, so a flat trend rejects any sloped line: a down line
/// over closes that are net non-decreasing is not a down move.
pub fn direction_ok<T: OHLCV>(slope: f64, bars: &[T], from: usize, to: usize) -> bool {
    if slope.abs() < SLOPE_EPS {
        return true;
    }
    let to = to.min(bars.len().saturating_sub(1));
    if to <= from {
        return true;
    }

    let n = (to - from + 1) as f64;
    let mean_x = (from + to) as f64 / 2.0;
    let mean_y = bars[from..=to].iter().map(|b| b.close()).sum::<f64>() / n;

    let mut var_x = 0.0;
    let mut cov = 0.0;
    for (i, b) in bars[from..=to].iter().enumerate() {
        let dx = (from + i) as f64 - mean_x;
        var_x += dx * dx;
        cov += dx * (b.close() - mean_y);
    }
    let trend = if var_x < 1e-12 { 0.0 } else { cov / var_x };

    if slope < 0.0 {
        trend < -SLOPE_EPS
    } else {
        trend > SLOPE_EPS
    }
}

/// First bar at or after `start` whose wick decisively breaches the line.
///
/// A resistance breaks when a bar's high exceeds `line * (1 + break_tol)`;
/// a support breaks when a bar's low falls under `line * (1 - break_tol)`.
/// Returns `None` when the line survives to the end of the series.
pub fn first_break<T: OHLCV>(
    bars: &[T],
    side: Side,
    slope: f64,
    intercept: f64,
    start: usize,
    break_tol: f64,
) -> Option<usize> {
    for (i, b) in bars.iter().enumerate().skip(start) {
        let fitted = slope * i as f64 + intercept;
        let broken = match side {
            Side::Resistance => b.high() > fitted * (1.0 + break_tol),
            Side::Support => b.low() < fitted * (1.0 - break_tol),
        };
        if broken {
            return Some(i);
        }
    }
    None
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PivotKind;

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

    fn piv(index: usize, price: f64) -> Pivot {
        Pivot {
            index,
            timestamp: index as i64,
            price,
            kind: PivotKind::High,
            lookback: 5,
        }
    }

    #[test]
    fn test_envelope_resistance_takes_lowest_offset() {
        // Flat line through scattered highs: the line must not float above
        // any of them, so the lowest pivot wins.
        let points = vec![piv(0, 100.0), piv(5, 102.0), piv(10, 101.0)];
        let intercept = fit_envelope(Side::Resistance, 0.0, &points);
        assert!((intercept - 100.0).abs() < 1e-12);
        for p in &points {
            assert!(intercept <= p.price + 1e-12);
        }
    }

    #[test]
    fn test_envelope_support_takes_highest_offset() {
        let points = vec![piv(0, 100.0), piv(8, 104.0), piv(16, 108.5)];
        let intercept = fit_envelope(Side::Support, 0.5, &points);
        // Offsets are 100, 100, 100.5; support takes the max.
        assert!((intercept - 100.5).abs() < 1e-12);
        for p in &points {
            assert!(0.5 * p.index as f64 + intercept >= p.price - 1e-12);
        }
    }

    #[test]
    fn test_direction_filter_matches_trend_sign() {
        let rising: Vec<Bar> = (0..20)
            .map(|i| {
                let c = 100.0 + i as f64;
                bar(c + 0.5, c - 0.5, c)
            })
            .collect();
        assert!(direction_ok(0.8, &rising, 0, 19));
        assert!(!direction_ok(-0.8, &rising, 0, 19));
        // Flat lines pass regardless of the trend.
        assert!(direction_ok(0.0, &rising, 0, 19));
    }

    #[test]
    fn test_direction_filter_flat_trend_rejects_sloped_lines() {
        // Exactly flat closes are not a down move, so a falling line is
        // out; same for a rising line. Flat lines still pass.
        let flat: Vec<Bar> = (0..20).map(|_| bar(100.5, 99.5, 100.0)).collect();
        assert!(!direction_ok(0.8, &flat, 0, 19));
        assert!(!direction_ok(-0.8, &flat, 0, 19));
        assert!(direction_ok(0.0, &flat, 0, 19));
    }

    #[test]
    fn test_first_break_on_resistance_high() {
        // Flat resistance at 100; wicks probe it, then bar 7 punches through.
        let mut bars: Vec<Bar> = (0..7).map(|_| bar(100.0, 99.0, 99.5)).collect();
        bars.push(bar(101.0, 99.5, 100.5));
        bars.push(bar(99.8, 98.5, 99.0));
        let b = first_break(&bars, Side::Resistance, 0.0, 100.0, 0, 0.0015);
        assert_eq!(b, Some(7));
    }

    #[test]
    fn test_first_break_tolerance_shields_small_excursions() {
        // A high at 100.1 is only 0.1% over the line, under the 0.15% bar.
        let bars = vec![bar(100.0, 99.0, 99.5), bar(100.1, 99.2, 99.9)];
        assert_eq!(first_break(&bars, Side::Resistance, 0.0, 100.0, 0, 0.0015), None);
    }

    #[test]
    fn test_first_break_on_support_low() {
        let bars = vec![
            bar(101.0, 100.0, 100.5),
            bar(101.0, 100.1, 100.4),
            bar(100.5, 98.0, 98.5),
        ];
        assert_eq!(first_break(&bars, Side::Support, 0.0, 100.0, 0, 0.0015), Some(2));
    }

    #[test]
    fn test_unbroken_line_returns_none() {
        let bars: Vec<Bar> = (0..30).map(|_| bar(99.5, 98.5, 99.0)).collect();
        assert_eq!(first_break(&bars, Side::Resistance, 0.0, 100.0, 0, 0.0015), None);
    }
}

//! Candidate line generation: pairwise enumeration and RANSAC.
//!
//! Pairwise runs on the pooled pivot set (both kinds together), enumerates
//! every pair, and keeps lines with enough covered pivots, inferring each
//! line's side from the kinds it covers. RANSAC runs on one side's pool at
//! a time: it repeatedly samples a pair, gathers inliers under a relative
//! tolerance, refines with least squares, and retires consumed inliers so
//! later rounds find different structure.

use rand::rngs::StdRng;

use crate::config::TrendlineConfig;
use crate::{CandidateLine, Pivot, PivotKind, Side};

// ============================================================
// LINE FITTING
// ============================================================

/// Ordinary least squares fit of `y = slope * x + intercept`.
///
/// Returns `None` for fewer than two points or a degenerate (vertical)
/// arrangement.
pub fn ols_fit(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    if xs.len() < 2 || xs.len() != ys.len() {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut var_x = 0.0;
    let mut cov = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        var_x += dx * dx;
        cov += dx * (y - mean_y);
    }
    if var_x < 1e-12 {
        return None;
    }
    let slope = cov / var_x;
    Some((slope, mean_y - slope * mean_x))
}

/// Squared Pearson correlation of `xs` against `ys`.
///
/// Degenerate inputs resolve in the line's favor where the fit is trivially
/// exact: constant `ys` (or fewer than two points) give `1.0`; constant `xs`
/// with varying `ys` give `0.0`.
pub fn r_squared(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() < 2 || xs.len() != ys.len() {
        return 1.0;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut var_x = 0.0;
    let mut var_y = 0.0;
    let mut cov = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        var_x += dx * dx;
        var_y += dy * dy;
        cov += dx * dy;
    }
    if var_y < 1e-12 {
        return 1.0;
    }
    if var_x < 1e-12 {
        return 0.0;
    }
    (cov * cov) / (var_x * var_y)
}

fn line_through(a: &Pivot, b: &Pivot) -> Option<(f64, f64)> {
    if a.index == b.index {
        return None;
    }
    let slope = (b.price - a.price) / (b.index as f64 - a.index as f64);
    Some((slope, a.price - slope * a.index as f64))
}

/// Keep only the most recent `max_pivots` entries of a time-ordered pool.
fn recent_tail(pivots: &[Pivot], max_pivots: usize) -> &[Pivot] {
    let skip = pivots.len().saturating_sub(max_pivots);
    &pivots[skip..]
}

// ============================================================
// PAIRWISE
// ============================================================

/// Enumerate every pivot pair over the pooled set and keep lines covering
/// enough pivots.
///
/// `pivots` holds both kinds, time-ordered; anchor pairs may mix kinds and
/// the coverage scan runs over the whole pool. A pivot is covered when its
/// relative distance to the line is within `touch_tolerance`. The line's
/// side is the majority kind of its covered points (a tie falls back to the
/// earliest covered point's kind). Lines with fewer than `min_points`
/// covered pivots or a covered span under `min_span_bars` are discarded.
/// Duplicates (many pairs lying on the same line) are expected here and
/// resolved downstream.
pub fn pairwise_candidates(pivots: &[Pivot], cfg: &TrendlineConfig) -> Vec<CandidateLine> {
    let pool = recent_tail(pivots, cfg.max_pivots);
    let mut out = Vec::new();

    for i in 0..pool.len() {
        for j in (i + 1)..pool.len() {
            let Some((slope, intercept)) = line_through(&pool[i], &pool[j]) else {
                continue;
            };
            let points = covered_points(pool, slope, intercept, cfg.touch_tolerance);
            if points.len() < cfg.min_points {
                continue;
            }
            let cand = CandidateLine {
                side: majority_side(&points),
                slope,
                intercept,
                source_lookback: pool[i].lookback,
                points,
            };
            if cand.span_bars() < cfg.min_span_bars {
                continue;
            }
            out.push(cand);
        }
    }
    out
}

fn majority_side(points: &[Pivot]) -> Side {
    let highs = points.iter().filter(|p| p.kind == PivotKind::High).count();
    let lows = points.len() - highs;
    if highs > lows {
        Side::Resistance
    } else if lows > highs {
        Side::Support
    } else {
        match points.first().map(|p| p.kind) {
            Some(PivotKind::High) => Side::Resistance,
            _ => Side::Support,
        }
    }
}

fn covered_points(pool: &[Pivot], slope: f64, intercept: f64, tol: f64) -> Vec<Pivot> {
    pool.iter()
        .filter(|p| {
            let fitted = slope * p.index as f64 + intercept;
            (fitted - p.price).abs() / p.price.abs().max(1e-9) <= tol
        })
        .cloned()
        .collect()
}

// ============================================================
// RANSAC
// ============================================================

/// Sequential RANSAC over one side's pivot pool.
///
/// Each round samples pivot pairs `ransac_trials` times, keeps the consensus
/// with the most inliers, refines it with [`ols_fit`], and retires the
/// inliers from the pool. Rounds stop once the remaining pool is too small
/// or too narrow to yield a valid line, or when the best consensus falls
/// under `min_inliers`. A round whose inlier span is under `min_span_bars`
/// still retires its inliers but emits nothing.
pub fn ransac_candidates(
    pivots: &[Pivot],
    side: Side,
    cfg: &TrendlineConfig,
    rng: &mut StdRng,
) -> Vec<CandidateLine> {
    let pool = recent_tail(pivots, cfg.max_pivots);
    let mut avail: Vec<&Pivot> = pool.iter().collect();
    let mut out = Vec::new();

    for _ in 0..cfg.line_cap.limit() {
        if avail.len() < cfg.min_inliers {
            break;
        }
        let pool_span = avail[avail.len() - 1].index - avail[0].index;
        if pool_span < cfg.min_span_bars {
            break;
        }

        let mut best: Option<(f64, f64, Vec<usize>)> = None;
        for _ in 0..cfg.ransac_trials {
            let pick = rand::seq::index::sample(rng, avail.len(), 2);
            let Some((slope, intercept)) = line_through(avail[pick.index(0)], avail[pick.index(1)])
            else {
                continue;
            };

            let inliers: Vec<usize> = (0..avail.len())
                .filter(|&k| {
                    let fitted = slope * avail[k].index as f64 + intercept;
                    (avail[k].price - fitted).abs() / fitted.abs().max(1e-9)
                        <= cfg.ransac_tol_frac
                })
                .collect();

            if best.as_ref().map_or(true, |(_, _, b)| inliers.len() > b.len()) {
                best = Some((slope, intercept, inliers));
            }
        }

        let Some((raw_slope, raw_intercept, inliers)) = best else {
            break;
        };
        if inliers.len() < cfg.min_inliers {
            break;
        }

        let xs: Vec<f64> = inliers.iter().map(|&k| avail[k].index as f64).collect();
        let ys: Vec<f64> = inliers.iter().map(|&k| avail[k].price).collect();
        let (slope, intercept) = ols_fit(&xs, &ys).unwrap_or((raw_slope, raw_intercept));

        let points: Vec<Pivot> = inliers.iter().map(|&k| avail[k].clone()).collect();
        // Retire inliers regardless of whether the round produces a line, so
        // the next round cannot rediscover the same consensus.
        let mut keep = 0usize;
        avail.retain(|_| {
            let retired = inliers.binary_search(&keep).is_ok();
            keep += 1;
            !retired
        });

        let cand = CandidateLine {
            side,
            slope,
            intercept,
            source_lookback: points[0].lookback,
            points,
        };
        if cand.span_bars() < cfg.min_span_bars {
            continue;
        }
        out.push(cand);
    }
    out
}

// ============================================================
// TESTS
// ============================================================

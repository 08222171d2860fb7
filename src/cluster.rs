//! Duplicate suppression across scored candidates.
//!
//! Pairwise enumeration finds the same physical line through many anchor
//! pairs; RANSAC can emit near-identical lines across rounds. Two distinct
//! strategies resolve this: [`dedup_by_overlap`] keeps the best line per
//! shared-pivot cluster, [`merge_by_params`] folds parameter-close lines
//! into one merged record.

use std::collections::HashSet;

use crate::{Pivot, PivotKind, ScoredLine};

/// A scored line together with the pivots that produced it. The pivot set
/// never leaves the pipeline; only the record does.
pub struct ScoredCandidate {
    pub record: ScoredLine,
    pub points: Vec<Pivot>,
}

/// Shared-identity fraction of the smaller point set above which two lines
/// are the same physical line.
const OVERLAP_LIMIT: f64 = 0.10;

/// Greedy best-first duplicate suppression by pivot overlap.
///
/// Candidates are visited in score order; each is kept only if it shares at
/// most 10% of its (smaller) point set with every already-kept line. Ties
/// in score favor the more recent segment start, matching the final rank
/// order, so suppression never keeps a line that ranking would have placed
/// below its duplicate.
pub fn dedup_by_overlap(mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    candidates.sort_by(|a, b| {
        b.record
            .score
            .partial_cmp(&a.record.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.record.segment_start.cmp(&a.record.segment_start))
    });

    let mut kept: Vec<ScoredCandidate> = Vec::new();
    let mut kept_ids: Vec<HashSet<(i64, PivotKind)>> = Vec::new();

    for cand in candidates {
        let ids: HashSet<(i64, PivotKind)> = cand.points.iter().map(|p| p.identity()).collect();
        let duplicate = kept_ids.iter().any(|other| {
            let shared = ids.intersection(other).count();
            let smaller = ids.len().min(other.len()).max(1);
            shared as f64 / smaller as f64 > OVERLAP_LIMIT
        });
        if !duplicate {
            kept_ids.push(ids);
            kept.push(cand);
        }
    }
    kept
}

/// Fold lines with near-equal parameters into single merged records.
///
/// Grouping is greedy against each group's first member: a candidate joins
/// the first group whose representative is within `slope_tol` and
/// `intercept_tol`. The merged line averages slope, intercept, and r²,
/// unions touches and points, sums violations, and takes the widest
/// segment. Its score is the best member's score; averaging scores would
/// let a weak duplicate drag down a strong line.
pub fn merge_by_params(
    candidates: Vec<ScoredCandidate>,
    slope_tol: f64,
    intercept_tol: f64,
) -> Vec<ScoredCandidate> {
    let mut groups: Vec<Vec<ScoredCandidate>> = Vec::new();

    for cand in candidates {
        let slot = groups.iter().position(|g| {
            let rep = &g[0].record;
            (rep.slope - cand.record.slope).abs() <= slope_tol
                && (rep.intercept - cand.record.intercept).abs() <= intercept_tol
        });
        match slot {
            Some(k) => groups[k].push(cand),
            None => groups.push(vec![cand]),
        }
    }

    groups.into_iter().map(merge_group).collect()
}

fn merge_group(group: Vec<ScoredCandidate>) -> ScoredCandidate {
    if group.len() == 1 {
        let mut only = group;
        return only.remove(0);
    }

    let n = group.len() as f64;
    let side = group[0].record.side;
    let slope = group.iter().map(|c| c.record.slope).sum::<f64>() / n;
    let intercept = group.iter().map(|c| c.record.intercept).sum::<f64>() / n;
    let r_squared = group.iter().map(|c| c.record.r_squared).sum::<f64>() / n;
    let violation_count = group.iter().map(|c| c.record.violation_count).sum();
    let score = group
        .iter()
        .map(|c| c.record.score)
        .fold(f64::NEG_INFINITY, f64::max);

    let segment_start = group
        .iter()
        .map(|c| c.record.segment_start)
        .min()
        .unwrap_or(0);
    let segment_solid_end = group
        .iter()
        .map(|c| c.record.segment_solid_end)
        .max()
        .unwrap_or(0);
    let segment_projection_end = group
        .iter()
        .map(|c| c.record.segment_projection_end)
        .max()
        .unwrap_or(segment_solid_end);

    let mut touches: Vec<i64> = group.iter().flat_map(|c| c.record.touches.clone()).collect();
    touches.sort_unstable();
    touches.dedup();

    let mut points: Vec<Pivot> = Vec::new();
    let mut seen: HashSet<(i64, PivotKind)> = HashSet::new();
    for c in &group {
        for p in &c.points {
            if seen.insert(p.identity()) {
                points.push(p.clone());
            }
        }
    }
    points.sort_by_key(|p| p.index);

    ScoredCandidate {
        record: ScoredLine {
            side,
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
        points,
    }
}

// ============================================================
// TESTS
// ============================================================

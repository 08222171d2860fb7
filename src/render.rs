//! Conversion of scored lines into a plain chart payload.
//!
//! The engine never draws. This module flattens [`ScoredLine`]s into
//! serde-friendly segments and markers so a charting front end can consume
//! them without knowing anything about pivots, envelopes, or scores. Solid
//! segments cover the validated span; the display-only projection becomes a
//! separate dashed segment.

use crate::{OHLCV, ScoredLine, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStyle {
    Solid,
    Dashed,
}

/// One straight drawable piece of a line, in (timestamp, price) space.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    pub side: Side,
    pub x1: i64,
    pub y1: f64,
    pub x2: i64,
    pub y2: f64,
    pub style: SegmentStyle,
    /// Score of the line this segment belongs to, for styling by strength
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerPosition {
    AboveBar,
    BelowBar,
}

/// A touch marker. Support touches render above the bar, resistance
/// touches below it, so the marker never collides with the wick it marks.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Marker {
    pub time: i64,
    pub position: MarkerPosition,
    pub price: f64,
}

/// Everything a chart needs to draw one compute() result.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ChartPayload {
    pub segments: Vec<Segment>,
    pub markers: Vec<Marker>,
}

/// Flatten the top `top_n` lines into segments and, optionally, touch
/// markers.
///
/// `lines` is assumed already ranked; `top_n = 0` yields an empty payload.
/// X coordinates are bar timestamps where the series carries them, bar
/// indices otherwise, matching the timestamps stored in each line's
/// touches.
pub fn to_payload<T: OHLCV>(
    lines: &[ScoredLine],
    bars: &[T],
    include_touches: bool,
    top_n: usize,
) -> ChartPayload {
    let ts = |i: usize| -> i64 {
        bars.get(i)
            .and_then(|b| b.timestamp())
            .unwrap_or(i as i64)
    };

    let mut payload = ChartPayload::default();
    for line in lines.iter().take(top_n) {
        payload.segments.push(Segment {
            side: line.side,
            x1: ts(line.segment_start),
            y1: line.price_at(line.segment_start),
            x2: ts(line.segment_solid_end),
            y2: line.price_at(line.segment_solid_end),
            style: SegmentStyle::Solid,
            score: line.score,
        });
        if line.segment_projection_end > line.segment_solid_end {
            payload.segments.push(Segment {
                side: line.side,
                x1: ts(line.segment_solid_end),
                y1: line.price_at(line.segment_solid_end),
                x2: ts(line.segment_projection_end),
                y2: line.price_at(line.segment_projection_end),
                style: SegmentStyle::Dashed,
                score: line.score,
            });
        }

        if include_touches {
            let position = match line.side {
                Side::Support => MarkerPosition::AboveBar,
                Side::Resistance => MarkerPosition::BelowBar,
            };
            // Touch timestamps are collected over the solid segment only,
            // so the dashed projection never grows markers.
            for &time in &line.touches {
                let bar_index = bar_index_for(bars, time);
                payload.markers.push(Marker {
                    time,
                    position,
                    price: line.price_at(bar_index),
                });
            }
        }
    }
    payload
}

/// Map a stored touch timestamp back to its bar index. Falls back to
/// treating the timestamp as an index for series without timestamps.
fn bar_index_for<T: OHLCV>(bars: &[T], time: i64) -> usize {
    bars.iter()
        .position(|b| b.timestamp() == Some(time))
        .unwrap_or_else(|| (time.max(0) as usize).min(bars.len().saturating_sub(1)))
}

// ============================================================
// TESTS
// ============================================================

//! Structural consistency checks for overlay segments
//!
//! Pure functions over data-space coordinates. Findings are diagnostic only:
//! nothing here corrects or rejects backend output.

use super::types::{Direction, FractalType, OverlayStroke, StrokePoint, TimePrice};

/// Largest tolerated price distance between a segment line and its stroke path
pub const PATH_DEVIATION_TOLERANCE: f64 = 0.3;

/// Price equality tolerance for endpoint comparisons
pub const PRICE_EPSILON: f64 = 1e-9;

/// Endpoints a segment is actually drawn with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedEndpoints {
    pub start: TimePrice,
    pub end: TimePrice,
    pub dir: Direction,
}

/// Joining point between consecutive segments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Join {
    pub price: f64,
    pub fractal: FractalType,
}

/// A join that is not a local extremum among its neighbours
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtremumViolation {
    pub index: usize,
    pub fractal: FractalType,
    pub left: f64,
    pub mid: f64,
    pub right: f64,
}

/// `true` when the drawn prices contradict the declared direction
///
/// Up requires `start < end`, down requires `start > end`; equal prices violate both.
pub fn direction_mismatch(dir: Direction, start_price: f64, end_price: f64) -> bool {
    match dir {
        Direction::Up => start_price >= end_price,
        Direction::Down => start_price <= end_price,
    }
}

/// Ordered joining points of a segment chain
///
/// The first join is the chain's start, followed by each segment's end.
/// Join types derive from direction, not from the declared endpoint types.
pub fn join_sequence(segments: &[RenderedEndpoints]) -> Vec<Join> {
    let Some(first) = segments.first() else {
        return Vec::new();
    };

    let mut joins = Vec::with_capacity(segments.len() + 1);
    joins.push(Join {
        price: first.start.price,
        fractal: first.dir.start_type(),
    });
    joins.extend(segments.iter().map(|s| Join {
        price: s.end.price,
        fractal: s.dir.end_type(),
    }));
    joins
}

/// Interior joins that break the local-extremum rule
///
/// A top must not be lower than either neighbour; a bottom must not be higher.
/// The first and last joins have only one neighbour and are never flagged.
pub fn local_extremum_violations(joins: &[Join]) -> Vec<ExtremumViolation> {
    joins
        .windows(3)
        .enumerate()
        .filter_map(|(offset, w)| {
            let (left, mid, right) = (w[0].price, w[1].price, w[2].price);
            let fractal = w[1].fractal;
            let bad = match fractal {
                FractalType::Top => mid < left || mid < right,
                FractalType::Bottom => mid > left || mid > right,
            };
            bad.then_some(ExtremumViolation {
                index: offset + 1,
                fractal,
                left,
                mid,
                right,
            })
        })
        .collect()
}

/// Largest price distance of any stroke point from the straight segment line
///
/// The line is interpolated linearly in time between `start` and `end`.
/// Returns `None` when fewer than three points are available or the span is zero.
pub fn max_path_deviation(points: &[StrokePoint], start: TimePrice, end: TimePrice) -> Option<f64> {
    if points.len() < 3 || end.time == start.time {
        return None;
    }

    let dt = (end.time - start.time) as f64;
    let dp = end.price - start.price;
    let max = points
        .iter()
        .map(|pt| {
            let alpha = (pt.time - start.time) as f64 / dt;
            (pt.value - (start.price + dp * alpha)).abs()
        })
        .fold(0.0_f64, f64::max);
    Some(max)
}

/// Whether `point` sits on a stroke turning point of the given type
///
/// Checks the referenced stroke's endpoint for `fractal` first, then the raw stroke path.
pub fn lands_on_fractal(
    point: TimePrice,
    stroke: Option<&OverlayStroke>,
    fractal: FractalType,
    stroke_points: &[StrokePoint],
) -> bool {
    let on_stroke = stroke.is_some_and(|s| same_point(s.endpoint_for(fractal), point));
    on_stroke || on_path(stroke_points, point)
}

/// Whether `point` appears in the raw stroke path
pub fn on_path(stroke_points: &[StrokePoint], point: TimePrice) -> bool {
    stroke_points
        .iter()
        .any(|pt| pt.time == point.time && (pt.value - point.price).abs() <= PRICE_EPSILON)
}

pub(crate) fn same_point(a: TimePrice, b: TimePrice) -> bool {
    a.time == b.time && (a.price - b.price).abs() <= PRICE_EPSILON
}

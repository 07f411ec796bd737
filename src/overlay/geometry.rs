//! Geometry builder
//!
//! Maps an [`OverlayResponse`] onto screen-space primitives through a host
//! [`CoordinateMapper`] and runs the segment consistency checks.
//!
//! Segment lines are drawn between the semantic endpoints `ep0`/`ep1` so the line
//! lands on a real turning point; raw `p0/t0/p1/t1` are only a fallback when the
//! endpoints are missing. Primitives with an unmapped endpoint are skipped
//! individually, never the whole frame.

use serde::Serialize;
use tracing::debug;

use super::checks::{
    direction_mismatch, join_sequence, lands_on_fractal, local_extremum_violations,
    max_path_deviation, same_point, ExtremumViolation, RenderedEndpoints,
    PATH_DEVIATION_TOLERANCE,
};
use super::types::{
    CenterKind, Direction, FractalType, OverlayCenter, OverlayResponse, OverlaySegment, TimePrice,
};
use super::viewport::CoordinateMapper;

const MAX_ALIGNMENT_SAMPLES: usize = 3;
const MAX_EXTREMUM_SAMPLES: usize = 3;
const MAX_DEVIATION_SAMPLES: usize = 5;

/// Screen-space line for a stroke or segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineSegment {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    /// Unconfirmed lines render dashed
    pub confirmed: bool,
}

/// Screen-space pivot box
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CenterBox {
    pub x0: f64,
    /// y of the band top (`ZG`)
    pub y0: f64,
    pub x1: f64,
    /// y of the band bottom (`ZD`)
    pub y1: f64,
    pub level: u32,
    pub center_id: i64,
    pub settled: bool,
    /// This box is the decisive anchor of the snapshot
    pub is_anchor: bool,
}

/// Segment whose drawn endpoints disagree with its declared structure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentSample {
    pub id: i64,
    pub index: usize,
    pub start: (i64, f64),
    pub end: (i64, f64),
    pub dir: Direction,
    pub declared_start: FractalType,
    pub declared_end: FractalType,
    pub has_endpoint_fields: bool,
    pub start_on_fractal: bool,
    pub end_on_fractal: bool,
    pub direction_mismatch: bool,
    pub backend_direction_mismatch: bool,
}

/// Segment whose straight line strays from its stroke path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviationSample {
    pub id: i64,
    pub index: usize,
    pub dir: Direction,
    pub s0: usize,
    pub s1: usize,
    pub max_deviation: f64,
    pub points: usize,
}

/// Diagnostic counters for one geometry build
///
/// These never block rendering. They exist to surface upstream decomposition
/// bugs and are asserted on by tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeometryDiagnostics {
    /// Segments missing `ep0` or `ep1`
    pub endpoint_field_missing: usize,
    /// Declared endpoint type disagrees with the direction-implied type
    pub endpoint_type_mismatch: usize,
    /// Drawn start/end prices contradict the segment direction
    pub direction_mismatch: usize,
    /// Raw `p0/p1` contradict the segment direction
    pub backend_direction_mismatch: usize,
    /// Drawn endpoints differ from raw `p0/t0/p1/t1`
    pub endpoint_delta: usize,
    pub start_off_fractal: usize,
    pub end_off_fractal: usize,
    /// Joins that are not local extrema among their neighbours
    pub local_extremum_violations: usize,
    /// Segments whose path deviation exceeds the tolerance
    pub path_deviation_exceeded: usize,
    pub path_deviation_max: f64,
    /// Primitives dropped because an endpoint could not be mapped
    pub skipped_primitives: usize,
    pub alignment_samples: Vec<AlignmentSample>,
    #[serde(skip)]
    pub extremum_samples: Vec<ExtremumViolation>,
    pub deviation_samples: Vec<DeviationSample>,
}

impl GeometryDiagnostics {
    /// Whether any structural check fired
    pub fn has_findings(&self) -> bool {
        self.endpoint_type_mismatch > 0
            || self.direction_mismatch > 0
            || self.backend_direction_mismatch > 0
            || self.start_off_fractal > 0
            || self.end_off_fractal > 0
            || self.local_extremum_violations > 0
            || self.path_deviation_exceeded > 0
    }
}

/// Screen-space primitives for one overlay snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayGeometry {
    pub strokes: Vec<LineSegment>,
    pub segments: Vec<LineSegment>,
    /// Sorted ascending by level (stable within a level)
    pub boxes: Vec<CenterBox>,
    pub diagnostics: GeometryDiagnostics,
}

/// Result of the data-space segment pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentAnalysis {
    pub endpoints: Vec<RenderedEndpoints>,
    pub diagnostics: GeometryDiagnostics,
}

/// Builds [`OverlayGeometry`] from overlay snapshots
#[derive(Debug, Clone, Copy)]
pub struct GeometryBuilder {
    deviation_tolerance: f64,
}

impl Default for GeometryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryBuilder {
    pub fn new() -> Self {
        Self {
            deviation_tolerance: PATH_DEVIATION_TOLERANCE,
        }
    }

    pub fn with_deviation_tolerance(tolerance: f64) -> Self {
        Self {
            deviation_tolerance: tolerance,
        }
    }

    /// Build all primitives and diagnostics for `overlay`
    pub fn build<M: CoordinateMapper + ?Sized>(
        &self,
        overlay: &OverlayResponse,
        mapper: &M,
    ) -> OverlayGeometry {
        let SegmentAnalysis {
            endpoints,
            mut diagnostics,
        } = self.analyze_segments(overlay);

        let strokes: Vec<LineSegment> = overlay
            .strokes
            .iter()
            .filter_map(|s| {
                let line = map_line(
                    mapper,
                    TimePrice::new(s.t0, s.p0),
                    TimePrice::new(s.t1, s.p1),
                    s.confirmed,
                );
                if line.is_none() {
                    diagnostics.skipped_primitives += 1;
                }
                line
            })
            .collect();

        let segments: Vec<LineSegment> = overlay
            .segments
            .iter()
            .zip(&endpoints)
            .filter_map(|(s, ep)| {
                let line = map_line(mapper, ep.start, ep.end, s.confirmed);
                if line.is_none() {
                    diagnostics.skipped_primitives += 1;
                }
                line
            })
            .collect();

        let boxes = build_center_boxes(overlay, mapper, &mut diagnostics.skipped_primitives);

        if diagnostics.has_findings() {
            debug!(
                symbol = %overlay.symbol,
                direction_mismatch = diagnostics.direction_mismatch,
                type_mismatch = diagnostics.endpoint_type_mismatch,
                extremum_violations = diagnostics.local_extremum_violations,
                deviation_exceeded = diagnostics.path_deviation_exceeded,
                deviation_max = diagnostics.path_deviation_max,
                "Overlay segments failed consistency checks"
            );
        }

        OverlayGeometry {
            strokes,
            segments,
            boxes,
            diagnostics,
        }
    }

    /// Resolve drawn segment endpoints and run every consistency check
    ///
    /// Works entirely in data space; no coordinate mapping is involved.
    pub fn analyze_segments(&self, overlay: &OverlayResponse) -> SegmentAnalysis {
        let mut diag = GeometryDiagnostics::default();
        let mut endpoints = Vec::with_capacity(overlay.segments.len());

        for (index, seg) in overlay.segments.iter().enumerate() {
            let rendered = semantic_endpoints(seg);
            let has_fields = seg.ep0.is_some() && seg.ep1.is_some();
            if !has_fields {
                diag.endpoint_field_missing += 1;
            }

            let declared_start = seg.ep0.map_or(seg.dir.start_type(), |e| e.fractal);
            let declared_end = seg.ep1.map_or(seg.dir.end_type(), |e| e.fractal);
            if declared_start != seg.dir.start_type() || declared_end != seg.dir.end_type() {
                diag.endpoint_type_mismatch += 1;
            }

            let start_on_fractal = lands_on_fractal(
                rendered.start,
                overlay.strokes.get(seg.s0),
                declared_start,
                &seg.stroke_points,
            );
            let end_on_fractal = lands_on_fractal(
                rendered.end,
                overlay.strokes.get(seg.s1),
                declared_end,
                &seg.stroke_points,
            );
            let drawn_mismatch =
                direction_mismatch(seg.dir, rendered.start.price, rendered.end.price);
            let backend_mismatch = direction_mismatch(seg.dir, seg.p0, seg.p1);
            let delta = !same_point(rendered.start, TimePrice::new(seg.t0, seg.p0))
                || !same_point(rendered.end, TimePrice::new(seg.t1, seg.p1));

            diag.start_off_fractal += usize::from(!start_on_fractal);
            diag.end_off_fractal += usize::from(!end_on_fractal);
            diag.direction_mismatch += usize::from(drawn_mismatch);
            diag.backend_direction_mismatch += usize::from(backend_mismatch);
            diag.endpoint_delta += usize::from(delta);

            let misaligned =
                !start_on_fractal || !end_on_fractal || drawn_mismatch || backend_mismatch;
            if misaligned && diag.alignment_samples.len() < MAX_ALIGNMENT_SAMPLES {
                diag.alignment_samples.push(AlignmentSample {
                    id: seg.id,
                    index,
                    start: (rendered.start.time, rendered.start.price),
                    end: (rendered.end.time, rendered.end.price),
                    dir: seg.dir,
                    declared_start,
                    declared_end,
                    has_endpoint_fields: has_fields,
                    start_on_fractal,
                    end_on_fractal,
                    direction_mismatch: drawn_mismatch,
                    backend_direction_mismatch: backend_mismatch,
                });
            }

            if let Some(dev) = max_path_deviation(&seg.stroke_points, rendered.start, rendered.end)
            {
                diag.path_deviation_max = diag.path_deviation_max.max(dev);
                if dev > self.deviation_tolerance {
                    diag.path_deviation_exceeded += 1;
                    if diag.deviation_samples.len() < MAX_DEVIATION_SAMPLES {
                        diag.deviation_samples.push(DeviationSample {
                            id: seg.id,
                            index,
                            dir: seg.dir,
                            s0: seg.s0,
                            s1: seg.s1,
                            max_deviation: dev,
                            points: seg.stroke_points.len(),
                        });
                    }
                }
            }

            endpoints.push(rendered);
        }

        let violations = local_extremum_violations(&join_sequence(&endpoints));
        diag.local_extremum_violations = violations.len();
        diag.extremum_samples = violations.into_iter().take(MAX_EXTREMUM_SAMPLES).collect();

        SegmentAnalysis {
            endpoints,
            diagnostics: diag,
        }
    }
}

/// Drawn endpoints of a segment: `ep0`/`ep1` when present, raw coordinates otherwise
pub fn semantic_endpoints(seg: &OverlaySegment) -> RenderedEndpoints {
    let start = seg
        .ep0
        .map_or(TimePrice::new(seg.t0, seg.p0), |e| TimePrice::new(e.time, e.price));
    let end = seg
        .ep1
        .map_or(TimePrice::new(seg.t1, seg.p1), |e| TimePrice::new(e.time, e.price));
    RenderedEndpoints {
        start,
        end,
        dir: seg.dir,
    }
}

fn map_line<M: CoordinateMapper + ?Sized>(
    mapper: &M,
    a: TimePrice,
    b: TimePrice,
    confirmed: bool,
) -> Option<LineSegment> {
    Some(LineSegment {
        x0: mapper.time_to_x(a.time)?,
        y0: mapper.price_to_y(a.price)?,
        x1: mapper.time_to_x(b.time)?,
        y1: mapper.price_to_y(b.price)?,
        confirmed,
    })
}

fn map_box<M: CoordinateMapper + ?Sized>(
    mapper: &M,
    center: &OverlayCenter,
    level: u32,
    is_anchor: bool,
) -> Option<CenterBox> {
    Some(CenterBox {
        x0: mapper.time_to_x(center.t0)?,
        y0: mapper.price_to_y(center.zg)?,
        x1: mapper.time_to_x(center.t1)?,
        y1: mapper.price_to_y(center.zd)?,
        level,
        center_id: center.id,
        settled: center.kind == CenterKind::Settled,
        is_anchor,
    })
}

/// Flatten every level's pivots into boxes, lowest level first
///
/// Without a `levels` array the flat top-level `centers` are treated as level 1.
fn build_center_boxes<M: CoordinateMapper + ?Sized>(
    overlay: &OverlayResponse,
    mapper: &M,
    skipped: &mut usize,
) -> Vec<CenterBox> {
    let anchor = overlay.lstar.as_ref();
    let is_anchor = |level: u32, id: i64| anchor.is_some_and(|l| l.points_at(level, id));

    let tagged: Vec<(u32, &OverlayCenter)> = if overlay.levels.is_empty() {
        overlay.centers.iter().map(|c| (1, c)).collect()
    } else {
        overlay
            .levels
            .iter()
            .flat_map(|lv| lv.centers.iter().map(move |c| (lv.level, c)))
            .collect()
    };

    let mut boxes: Vec<CenterBox> = tagged
        .into_iter()
        .filter_map(|(level, c)| {
            let b = map_box(mapper, c, level, is_anchor(level, c.id));
            if b.is_none() {
                *skipped += 1;
            }
            b
        })
        .collect();

    boxes.sort_by_key(|b| b.level);
    boxes
}

//! Domain events
//!
//! Closed sum type over the 13 structural events the backend emits, grouped in
//! four families (stroke, segment, pivot, move). On the wire an event is a flat
//! JSON object keyed by `event_type`; the common fields sit next to the
//! variant-specific ones.

use serde::{Deserialize, Serialize};

use crate::overlay::types::{Direction, FractalType, TrendKind};

/// Fields every event carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMeta {
    pub bar_idx: u64,
    /// Epoch seconds of the bar the event refers to; rendering time key
    pub bar_ts: f64,
    /// Monotonic per stream; ordering key
    pub seq: u64,
    #[serde(default)]
    pub event_id: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Timeframe tag; empty or absent means the base timeframe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
}

fn default_schema_version() -> u32 {
    1
}

fn default_level() -> u32 {
    1
}

fn default_seg_count() -> u32 {
    3
}

fn default_zs_count() -> u32 {
    1
}

/// Whether a segment break left a gap between strokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapClass {
    #[default]
    None,
    Gap,
}

/// Stroke lifecycle payload (candidate, settled, invalidated)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeEvent {
    pub stroke_id: i64,
    pub direction: Direction,
    pub i0: i64,
    pub i1: i64,
    pub p0: f64,
    pub p1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeExtension {
    pub stroke_id: i64,
    pub direction: Direction,
    pub old_i1: i64,
    pub new_i1: i64,
    pub old_p1: f64,
    pub new_p1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentBreakPending {
    pub segment_id: i64,
    pub direction: Direction,
    pub break_at_stroke: i64,
    #[serde(default)]
    pub gap_class: GapClass,
    pub fractal_type: FractalType,
    pub s0: i64,
    pub s1: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSettle {
    pub segment_id: i64,
    pub direction: Direction,
    pub s0: i64,
    pub s1: i64,
    pub ep0_price: f64,
    pub ep1_price: f64,
    #[serde(default)]
    pub gap_class: GapClass,
    pub new_segment_s0: i64,
    pub new_segment_direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentInvalidate {
    pub segment_id: i64,
    pub direction: Direction,
    pub s0: i64,
    pub s1: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotCandidate {
    pub zhongshu_id: i64,
    pub zd: f64,
    pub zg: f64,
    pub seg_start: i64,
    pub seg_end: i64,
    #[serde(default = "default_seg_count")]
    pub seg_count: u32,
    #[serde(default = "default_level")]
    pub level_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotSettle {
    pub zhongshu_id: i64,
    pub zd: f64,
    pub zg: f64,
    pub seg_start: i64,
    pub seg_end: i64,
    #[serde(default = "default_seg_count")]
    pub seg_count: u32,
    pub break_seg_id: i64,
    pub break_direction: Direction,
    #[serde(default = "default_level")]
    pub level_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotInvalidate {
    pub zhongshu_id: i64,
    pub zd: f64,
    pub zg: f64,
    pub seg_start: i64,
    pub seg_end: i64,
    #[serde(default = "default_level")]
    pub level_id: u32,
}

/// Move lifecycle payload (candidate, settle)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveEvent {
    pub move_id: i64,
    pub kind: TrendKind,
    pub direction: Direction,
    pub seg_start: i64,
    pub seg_end: i64,
    pub zs_start: i64,
    pub zs_end: i64,
    #[serde(default = "default_zs_count")]
    pub zs_count: u32,
    #[serde(default = "default_level")]
    pub level_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveInvalidate {
    pub move_id: i64,
    pub kind: TrendKind,
    pub direction: Direction,
    pub seg_start: i64,
    pub seg_end: i64,
    #[serde(default = "default_level")]
    pub level_id: u32,
}

/// Variant-specific part of an event, tagged by `event_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventKind {
    StrokeCandidate(StrokeEvent),
    StrokeSettled(StrokeEvent),
    StrokeExtended(StrokeExtension),
    StrokeInvalidated(StrokeEvent),
    SegmentBreakPending(SegmentBreakPending),
    SegmentSettle(SegmentSettle),
    SegmentInvalidate(SegmentInvalidate),
    #[serde(rename = "zhongshu_candidate")]
    PivotCandidate(PivotCandidate),
    #[serde(rename = "zhongshu_settle")]
    PivotSettle(PivotSettle),
    #[serde(rename = "zhongshu_invalidate")]
    PivotInvalidate(PivotInvalidate),
    MoveCandidate(MoveEvent),
    MoveSettle(MoveEvent),
    MoveInvalidate(MoveInvalidate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFamily {
    Stroke,
    Segment,
    Pivot,
    Move,
}

impl EventKind {
    /// Wire tag of this variant
    pub fn event_type(&self) -> &'static str {
        match self {
            EventKind::StrokeCandidate(_) => "stroke_candidate",
            EventKind::StrokeSettled(_) => "stroke_settled",
            EventKind::StrokeExtended(_) => "stroke_extended",
            EventKind::StrokeInvalidated(_) => "stroke_invalidated",
            EventKind::SegmentBreakPending(_) => "segment_break_pending",
            EventKind::SegmentSettle(_) => "segment_settle",
            EventKind::SegmentInvalidate(_) => "segment_invalidate",
            EventKind::PivotCandidate(_) => "zhongshu_candidate",
            EventKind::PivotSettle(_) => "zhongshu_settle",
            EventKind::PivotInvalidate(_) => "zhongshu_invalidate",
            EventKind::MoveCandidate(_) => "move_candidate",
            EventKind::MoveSettle(_) => "move_settle",
            EventKind::MoveInvalidate(_) => "move_invalidate",
        }
    }

    pub fn family(&self) -> EventFamily {
        match self {
            EventKind::StrokeCandidate(_)
            | EventKind::StrokeSettled(_)
            | EventKind::StrokeExtended(_)
            | EventKind::StrokeInvalidated(_) => EventFamily::Stroke,
            EventKind::SegmentBreakPending(_)
            | EventKind::SegmentSettle(_)
            | EventKind::SegmentInvalidate(_) => EventFamily::Segment,
            EventKind::PivotCandidate(_)
            | EventKind::PivotSettle(_)
            | EventKind::PivotInvalidate(_) => EventFamily::Pivot,
            EventKind::MoveCandidate(_) | EventKind::MoveSettle(_) | EventKind::MoveInvalidate(_) => {
                EventFamily::Move
            }
        }
    }
}

/// A structural event as delivered by the live feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChanEvent {
    #[serde(flatten)]
    pub meta: EventMeta,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl ChanEvent {
    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    /// Bar time truncated to whole epoch seconds
    pub fn time(&self) -> i64 {
        self.meta.bar_ts as i64
    }
}

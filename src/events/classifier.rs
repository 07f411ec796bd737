//! Event → chart marker classification
//!
//! Each event family maps onto a fixed marker template table. Direction-aware
//! templates pick their side by convention: above the bar for down-leaning
//! events, below the bar for up-leaning ones. Sub-kinds that would only add
//! noise (extensions and invalidations other than stroke invalidation) map to
//! no marker.

use serde::Serialize;

use super::types::{ChanEvent, EventKind};
use crate::overlay::types::{Direction, TrendKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerPosition {
    AboveBar,
    BelowBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerShape {
    ArrowUp,
    ArrowDown,
    Circle,
    Square,
}

/// Point marker drawn at a bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSpec {
    /// Epoch seconds
    pub time: i64,
    pub position: MarkerPosition,
    pub color: &'static str,
    pub shape: MarkerShape,
    pub text: &'static str,
}

/// Marker appearance without a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerTemplate {
    pub position: MarkerPosition,
    pub color: &'static str,
    pub shape: MarkerShape,
    pub text: &'static str,
}

impl MarkerTemplate {
    const fn new(
        position: MarkerPosition,
        color: &'static str,
        shape: MarkerShape,
        text: &'static str,
    ) -> Self {
        Self {
            position,
            color,
            shape,
            text,
        }
    }

    pub fn at(&self, time: i64) -> MarkerSpec {
        MarkerSpec {
            time,
            position: self.position,
            color: self.color,
            shape: self.shape,
            text: self.text,
        }
    }
}

/// Template pair selected by direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directional {
    pub up: MarkerTemplate,
    pub down: MarkerTemplate,
}

impl Directional {
    pub fn pick(&self, dir: Direction) -> &MarkerTemplate {
        match dir {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }
}

use MarkerPosition::{AboveBar, BelowBar};
use MarkerShape::{ArrowDown, ArrowUp, Circle, Square};

pub static STROKE_SETTLED: Directional = Directional {
    up: MarkerTemplate::new(BelowBar, "#26a69a", ArrowUp, "S↑"),
    down: MarkerTemplate::new(AboveBar, "#ef5350", ArrowDown, "S↓"),
};

pub static STROKE_CANDIDATE: Directional = Directional {
    up: MarkerTemplate::new(BelowBar, "#42a5f5", Circle, "C↑"),
    down: MarkerTemplate::new(AboveBar, "#42a5f5", Circle, "C↓"),
};

pub static STROKE_INVALIDATED: MarkerTemplate = MarkerTemplate::new(AboveBar, "#666", Circle, "✕");

pub static SEGMENT_BREAK_PENDING: MarkerTemplate =
    MarkerTemplate::new(AboveBar, "#999", Square, "Brk?");

// a settled up segment marks its top, hence above the bar
pub static SEGMENT_SETTLE: Directional = Directional {
    up: MarkerTemplate::new(AboveBar, "#ef5350", Square, "Seg↑"),
    down: MarkerTemplate::new(BelowBar, "#26a69a", Square, "Seg↓"),
};

pub static PIVOT_CANDIDATE: MarkerTemplate = MarkerTemplate::new(BelowBar, "#ff9800", Square, "ZS?");

/// Keyed by break direction
pub static PIVOT_SETTLE: Directional = Directional {
    up: MarkerTemplate::new(AboveBar, "#ef5350", Square, "ZS↑"),
    down: MarkerTemplate::new(BelowBar, "#26a69a", Square, "ZS↓"),
};

pub static MOVE_TREND_CANDIDATE: Directional = Directional {
    up: MarkerTemplate::new(BelowBar, "#4caf50", Square, "M↑"),
    down: MarkerTemplate::new(AboveBar, "#f44336", Square, "M↓"),
};

pub static MOVE_CONSOLIDATION_CANDIDATE: MarkerTemplate =
    MarkerTemplate::new(BelowBar, "#2196f3", Square, "M?");

pub static MOVE_SETTLE: Directional = Directional {
    up: MarkerTemplate::new(BelowBar, "#388e3c", Circle, "M✓"),
    down: MarkerTemplate::new(AboveBar, "#c62828", Circle, "M✓"),
};

/// Template for an event kind, `None` when the kind is not drawn
pub fn template_for(kind: &EventKind) -> Option<&'static MarkerTemplate> {
    match kind {
        EventKind::StrokeCandidate(s) => Some(STROKE_CANDIDATE.pick(s.direction)),
        EventKind::StrokeSettled(s) => Some(STROKE_SETTLED.pick(s.direction)),
        EventKind::StrokeInvalidated(_) => Some(&STROKE_INVALIDATED),
        EventKind::SegmentBreakPending(_) => Some(&SEGMENT_BREAK_PENDING),
        EventKind::SegmentSettle(s) => Some(SEGMENT_SETTLE.pick(s.direction)),
        EventKind::PivotCandidate(_) => Some(&PIVOT_CANDIDATE),
        EventKind::PivotSettle(p) => Some(PIVOT_SETTLE.pick(p.break_direction)),
        EventKind::MoveCandidate(m) => match m.kind {
            TrendKind::Trend => Some(MOVE_TREND_CANDIDATE.pick(m.direction)),
            TrendKind::Consolidation => Some(&MOVE_CONSOLIDATION_CANDIDATE),
        },
        EventKind::MoveSettle(m) => Some(MOVE_SETTLE.pick(m.direction)),
        EventKind::StrokeExtended(_)
        | EventKind::SegmentInvalidate(_)
        | EventKind::PivotInvalidate(_)
        | EventKind::MoveInvalidate(_) => None,
    }
}

/// Marker for `event`, or `None` when the event is not drawn
pub fn classify(event: &ChanEvent) -> Option<MarkerSpec> {
    template_for(&event.kind).map(|t| t.at(event.time()))
}

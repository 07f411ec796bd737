//! Overlay renderer
//!
//! Pure function from geometry + style settings to an ordered list of paint
//! operations. Layering: pivot boxes (lowest level first), then segment lines,
//! then stroke lines on top. The host surface executes the operations verbatim.

use serde::{Deserialize, Serialize};

use super::geometry::{CenterBox, LineSegment, OverlayGeometry};

/// Per-level pivot palette
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelColorScheme {
    pub fill: &'static str,
    pub border: &'static str,
    pub candidate_fill: &'static str,
    pub candidate_border: &'static str,
}

/// Pivot palettes by level; higher levels are more saturated. Level 4+ reuses the last entry.
pub const LEVEL_COLORS: [LevelColorScheme; 4] = [
    // Level 1: orange
    LevelColorScheme {
        fill: "rgba(255,159,67,0.10)",
        border: "rgba(255,159,67,0.45)",
        candidate_fill: "rgba(255,159,67,0.04)",
        candidate_border: "rgba(255,159,67,0.2)",
    },
    // Level 2: purple
    LevelColorScheme {
        fill: "rgba(140,90,255,0.13)",
        border: "rgba(140,90,255,0.55)",
        candidate_fill: "rgba(140,90,255,0.05)",
        candidate_border: "rgba(140,90,255,0.25)",
    },
    // Level 3: red
    LevelColorScheme {
        fill: "rgba(255,60,90,0.15)",
        border: "rgba(255,60,90,0.6)",
        candidate_fill: "rgba(255,60,90,0.06)",
        candidate_border: "rgba(255,60,90,0.3)",
    },
    // Level 4+: gold
    LevelColorScheme {
        fill: "rgba(255,200,40,0.16)",
        border: "rgba(255,200,40,0.65)",
        candidate_fill: "rgba(255,200,40,0.06)",
        candidate_border: "rgba(255,200,40,0.3)",
    },
];

/// Outline of the decisive-anchor box, independent of level colour
pub const ANCHOR_BORDER_COLOR: &str = "rgba(255,215,0,0.9)";
pub const ANCHOR_BORDER_WIDTH: f64 = 2.5;

/// Dash pattern of unconfirmed lines
pub const CANDIDATE_DASH: [f64; 2] = [4.0, 3.0];

const SEGMENT_LINE_WIDTH: f64 = 3.0;
const STROKE_LINE_WIDTH: f64 = 1.0;

/// Palette for a level (levels start at 1)
pub fn level_colors(level: u32) -> &'static LevelColorScheme {
    let idx = (level.max(1) as usize - 1).min(LEVEL_COLORS.len() - 1);
    &LEVEL_COLORS[idx]
}

/// Style settings for the overlay layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChanDrawingSettings {
    pub stroke_visible: bool,
    pub segment_visible: bool,
    pub center_box_visible: bool,
    pub stroke_color: String,
    pub segment_color: String,
}

impl Default for ChanDrawingSettings {
    fn default() -> Self {
        Self {
            stroke_visible: true,
            segment_visible: true,
            center_box_visible: true,
            stroke_color: "rgba(80,160,255,0.8)".to_string(),
            segment_color: "rgba(255,159,67,0.9)".to_string(),
        }
    }
}

/// Partial settings update; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub stroke_visible: Option<bool>,
    pub segment_visible: Option<bool>,
    pub center_box_visible: Option<bool>,
    pub stroke_color: Option<String>,
    pub segment_color: Option<String>,
}

impl ChanDrawingSettings {
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(v) = patch.stroke_visible {
            self.stroke_visible = v;
        }
        if let Some(v) = patch.segment_visible {
            self.segment_visible = v;
        }
        if let Some(v) = patch.center_box_visible {
            self.center_box_visible = v;
        }
        if let Some(c) = patch.stroke_color {
            self.stroke_color = c;
        }
        if let Some(c) = patch.segment_color {
            self.segment_color = c;
        }
    }
}

/// One drawing instruction for the host surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PaintOp {
    FillRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        color: String,
    },
    StrokeRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        color: String,
        width: f64,
    },
    Line {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        color: String,
        width: f64,
        dash: Option<[f64; 2]>,
    },
}

/// Render geometry into paint operations
///
/// Deterministic and side-effect free; inputs are only borrowed.
pub fn render(geometry: &OverlayGeometry, settings: &ChanDrawingSettings) -> Vec<PaintOp> {
    let mut ops = Vec::with_capacity(
        geometry.boxes.len() * 2 + geometry.segments.len() + geometry.strokes.len(),
    );

    if settings.center_box_visible {
        let mut boxes: Vec<&CenterBox> = geometry.boxes.iter().collect();
        boxes.sort_by_key(|b| b.level);
        for b in boxes {
            paint_box(&mut ops, b);
        }
    }
    if settings.segment_visible {
        paint_lines(
            &mut ops,
            &geometry.segments,
            &settings.segment_color,
            SEGMENT_LINE_WIDTH,
        );
    }
    if settings.stroke_visible {
        paint_lines(
            &mut ops,
            &geometry.strokes,
            &settings.stroke_color,
            STROKE_LINE_WIDTH,
        );
    }
    ops
}

fn paint_box(ops: &mut Vec<PaintOp>, b: &CenterBox) {
    let x = b.x0.min(b.x1);
    let y = b.y0.min(b.y1);
    let w = (b.x1 - b.x0).abs();
    let h = (b.y1 - b.y0).abs();
    let colors = level_colors(b.level);

    let fill = if b.settled {
        colors.fill
    } else {
        colors.candidate_fill
    };
    ops.push(PaintOp::FillRect {
        x,
        y,
        w,
        h,
        color: fill.to_string(),
    });

    let (border, width) = if b.is_anchor {
        (ANCHOR_BORDER_COLOR, ANCHOR_BORDER_WIDTH)
    } else {
        let border = if b.settled {
            colors.border
        } else {
            colors.candidate_border
        };
        (border, 1.0 + f64::from(b.level.saturating_sub(1).min(3)) * 0.5)
    };
    ops.push(PaintOp::StrokeRect {
        x,
        y,
        w,
        h,
        color: border.to_string(),
        width,
    });
}

fn paint_lines(ops: &mut Vec<PaintOp>, lines: &[LineSegment], color: &str, width: f64) {
    ops.extend(lines.iter().map(|l| PaintOp::Line {
        x0: l.x0,
        y0: l.y0,
        x1: l.x1,
        y1: l.y1,
        color: color.to_string(),
        width,
        dash: (!l.confirmed).then_some(CANDIDATE_DASH),
    }));
}

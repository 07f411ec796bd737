//! Overlay data model
//!
//! Hierarchical decomposition snapshot returned by the overlay query.
//! A snapshot is replaced wholesale on every refresh; nothing here is patched in place.
//! All times are epoch seconds, matching the host chart's time axis.

use serde::{Deserialize, Serialize};

/// Schema tag prefix accepted by the overlay pipeline
pub const OVERLAY_SCHEMA_PREFIX: &str = "newchan_overlay_v";

/// Direction of a stroke, segment or move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Kind of turning point an endpoint sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FractalType {
    Top,
    Bottom,
}

impl Direction {
    /// Turning point a move in this direction starts from
    pub fn start_type(self) -> FractalType {
        match self {
            Direction::Up => FractalType::Bottom,
            Direction::Down => FractalType::Top,
        }
    }

    /// Turning point a move in this direction ends on
    pub fn end_type(self) -> FractalType {
        match self {
            Direction::Up => FractalType::Top,
            Direction::Down => FractalType::Bottom,
        }
    }
}

/// Smallest directional primitive between two turning points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayStroke {
    pub id: i64,
    pub t0: i64,
    pub t1: i64,
    pub dir: Direction,
    /// `false` while the stroke is still extending (`p1`/`t1` may grow)
    pub confirmed: bool,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    pub p0: f64,
    pub p1: f64,
}

impl OverlayStroke {
    /// Point of this stroke that carries the given fractal type
    ///
    /// An up stroke starts on a bottom and ends on a top; a down stroke the reverse.
    pub fn endpoint_for(&self, fractal: FractalType) -> TimePrice {
        match (fractal, self.dir) {
            (FractalType::Top, Direction::Down) | (FractalType::Bottom, Direction::Up) => {
                TimePrice::new(self.t0, self.p0)
            }
            (FractalType::Top, Direction::Up) | (FractalType::Bottom, Direction::Down) => {
                TimePrice::new(self.t1, self.p1)
            }
        }
    }
}

/// Semantic endpoint of a segment, pinned to a stroke turning point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentEndpoint {
    #[serde(default)]
    pub merged_i: i64,
    pub time: i64,
    pub price: f64,
    #[serde(rename = "type")]
    pub fractal: FractalType,
}

/// Raw stroke turning point carried alongside a segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub time: i64,
    pub value: f64,
}

/// Higher-order primitive built from strokes `[s0, s1]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySegment {
    pub id: i64,
    pub t0: i64,
    pub t1: i64,
    /// Index of the first constituent stroke
    pub s0: usize,
    /// Index of the last constituent stroke
    pub s1: usize,
    pub dir: Direction,
    pub confirmed: bool,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    pub p0: f64,
    pub p1: f64,
    #[serde(default)]
    pub ep0: Option<SegmentEndpoint>,
    #[serde(default)]
    pub ep1: Option<SegmentEndpoint>,
    #[serde(default)]
    pub stroke_points: Vec<StrokePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CenterKind {
    Candidate,
    Settled,
}

/// Pivot zone: price band `[zd, zg]` over `[t0, t1]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayCenter {
    pub id: i64,
    pub t0: i64,
    pub t1: i64,
    #[serde(rename = "ZD")]
    pub zd: f64,
    #[serde(rename = "ZG")]
    pub zg: f64,
    pub kind: CenterKind,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub sustain: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendKind {
    Trend,
    Consolidation,
}

/// Trend or consolidation move between pivots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayTrend {
    pub id: i64,
    pub t0: i64,
    pub t1: i64,
    pub kind: TrendKind,
    pub dir: Direction,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
}

/// One emergent structural level (`level >= 1`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayLevel {
    pub level: u32,
    #[serde(default)]
    pub n_moves: u32,
    #[serde(default)]
    pub centers: Vec<OverlayCenter>,
    #[serde(default)]
    pub trends: Vec<OverlayTrend>,
}

/// Decisive anchor: reference into the level/center graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayLStar {
    pub level: u32,
    pub center_id: i64,
    pub regime: String,
    #[serde(default = "default_alive")]
    pub is_alive: bool,
    #[serde(default)]
    pub death_reason: Option<String>,
    #[serde(default)]
    pub anchors: Option<OverlayAnchors>,
}

/// Price and event anchors the backend tracks for the decisive center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayAnchors {
    pub settle_core_low: f64,
    pub settle_core_high: f64,
    #[serde(default)]
    pub run_exit_idx: Option<i64>,
    #[serde(default)]
    pub run_exit_side: Option<String>,
    #[serde(default)]
    pub run_exit_extreme: Option<f64>,
    #[serde(default)]
    pub event_seen_pullback: bool,
    #[serde(default)]
    pub event_pullback_settled: bool,
}

fn default_alive() -> bool {
    true
}

impl OverlayLStar {
    pub fn points_at(&self, level: u32, center_id: i64) -> bool {
        self.level == level && self.center_id == center_id
    }
}

/// Full overlay snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayResponse {
    pub schema_version: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub tf: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub lstar: Option<OverlayLStar>,
    #[serde(default)]
    pub strokes: Vec<OverlayStroke>,
    #[serde(default)]
    pub segments: Vec<OverlaySegment>,
    /// Flat level-1 pivots, used when `levels` is absent
    #[serde(default)]
    pub centers: Vec<OverlayCenter>,
    #[serde(default)]
    pub trends: Vec<OverlayTrend>,
    #[serde(default)]
    pub levels: Vec<OverlayLevel>,
    /// Carried for hosts that draw an indicator pane; not drawn here
    #[serde(default)]
    pub macd: Option<OverlayMacd>,
}

/// MACD parameters and series accompanying a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayMacd {
    pub fast: u32,
    pub slow: u32,
    pub signal: u32,
    #[serde(default)]
    pub series: Vec<MacdPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub time: i64,
    pub macd: f64,
    pub signal: f64,
    pub hist: f64,
}

impl OverlayResponse {
    /// Whether this response speaks a schema the overlay pipeline understands
    pub fn is_supported_schema(&self) -> bool {
        self.schema_version.starts_with(OVERLAY_SCHEMA_PREFIX)
    }
}

/// A (time, price) pair in data space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePrice {
    pub time: i64,
    pub price: f64,
}

impl TimePrice {
    pub fn new(time: i64, price: f64) -> Self {
        Self { time, price }
    }
}

//! Overlay geometry and consistency engine
//!
//! Turns a hierarchical overlay snapshot into screen-space primitives,
//! flags structurally inconsistent segments, and paints the result.

pub mod checks;
pub mod controller;
pub mod geometry;
pub mod renderer;
pub mod types;
pub mod viewport;

pub use controller::{ChartSurface, OverlayController, OverlaySource};
pub use geometry::{CenterBox, GeometryBuilder, GeometryDiagnostics, LineSegment, OverlayGeometry};
pub use renderer::{render, ChanDrawingSettings, PaintOp, SettingsPatch};
pub use types::{OverlayAnchors, OverlayLStar, OverlayMacd, OverlayResponse};
pub use viewport::{CoordinateMapper, LinearViewport, VisibleRange};

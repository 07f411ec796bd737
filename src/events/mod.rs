//! Structural domain events and their chart markers

pub mod classifier;
pub mod markers;
pub mod types;
pub mod window;

pub use classifier::{classify, MarkerPosition, MarkerShape, MarkerSpec};
pub use markers::{MarkerManager, MarkerSurface};
pub use types::{ChanEvent, EventFamily, EventKind, EventMeta};
pub use window::{EventWindow, EVENT_WINDOW_CAPACITY};

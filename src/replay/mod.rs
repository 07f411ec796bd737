//! Replay sessions over historical bars

pub mod controller;

pub use crate::feed::{ReplayMode, ReplayStatus};
pub use controller::{ReplayBackend, ReplaySessionController, ReplayStart};

// Library exports for chan-overlay

pub mod error;

pub mod config; // Configuration management

// Overlay geometry, consistency checks and rendering
pub mod overlay;

// Domain events, classification and chart markers
pub mod events;

// Real-time feed: transport, dispatch, shared state
pub mod feed;

// Replay session control
pub mod replay;

// Analysis backend REST client
pub mod api;

pub use error::{ClientError, Result};

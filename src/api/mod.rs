//! REST access to the analysis backend

pub mod client;

pub use client::{ChanApiClient, LiveStatus, OverlayQuery};

//! Configuration Management
//!
//! This module handles loading client configuration from the environment.

pub mod client;

// Re-export
pub use client::ClientConfig;

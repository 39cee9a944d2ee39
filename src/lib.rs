//! Moodboard service layer.
//!
//! The synchronous board engine lives in the `canvas` crate. This crate wraps
//! it with everything asynchronous or process-wide: configuration, the
//! similarity-search client and pipeline, board lifecycle, snapshot
//! persistence, and tracing setup. [`state::AppState`] ties them together.

pub mod config;
pub mod error;
pub mod search;
pub mod services;
pub mod state;
pub mod telemetry;

pub use canvas;

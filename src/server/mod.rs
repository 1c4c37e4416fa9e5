//! HTTP server and daemon configuration.
//!
//! This module provides:
//! - The axum router serving `/api/status` and `/api/generate` (`routes`)
//! - Configuration types and file resolution (`config`)

pub mod config;
pub mod routes;

pub use routes::{AppState, router};

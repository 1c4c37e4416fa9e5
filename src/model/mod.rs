//! Model lifecycle.

mod gate;

pub use gate::{ModelStatus, ReadinessGate, WarmupConfig};

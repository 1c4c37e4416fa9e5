//! Statement synthesis pipeline.
//!
//! [`Synthesizer`] turns a topic and count into statements by driving a
//! [`TextGenerator`](crate::TextGenerator) through the structured, gap-fill
//! and fallback stages. [`PipelineConfig`] carries the template sets and
//! sampling parameters; its presets replace per-variant code paths.

pub mod config;
pub mod synthesizer;

pub use config::{PipelineConfig, PipelineVariant, SamplingConfig};
pub use synthesizer::{Stage, Synthesis, Synthesizer, fallback_statement};

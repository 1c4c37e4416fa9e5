//! Munin - short topic statements from a local language model
//!
//! Given a topic and a count, Munin returns up to five short, well-formed
//! statements about the topic. Statements come from a causal language model
//! behind the [`TextGenerator`] trait; the [`pipeline::Synthesizer`] drives it
//! through a structured list prompt, per-point gap fill, and template
//! fallback, so a request always completes once the model is loaded.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use munin::providers::{TgiClient, TgiLoader};
//! use munin::{PipelineConfig, PointCache, PointCount, PointService, ReadinessGate, Synthesizer};
//!
//! #[tokio::main]
//! async fn main() -> munin::Result<()> {
//!     let client = TgiClient::new("http://127.0.0.1:8080", Duration::from_secs(60))?;
//!     let gate = ReadinessGate::new(Arc::new(TgiLoader::new(client)));
//!
//!     let service = PointService::new(
//!         Arc::new(gate),
//!         PointCache::default(),
//!         Synthesizer::new(PipelineConfig::benefits()),
//!     );
//!
//!     let result = service.generate("solar power", PointCount::clamped(3)).await?;
//!     for point in &result.points {
//!         println!("- {point}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;
pub mod service;
pub mod telemetry;
pub mod text;
pub mod traits;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheConfig, PointCache};
pub use error::{MuninError, Result};
pub use model::{ModelStatus, ReadinessGate, WarmupConfig};
pub use pipeline::{PipelineConfig, PipelineVariant, Stage, Synthesis, Synthesizer};
pub use providers::RetryConfig;
pub use service::{PointService, PointsResult, ServiceStatus};
pub use traits::{ModelLoader, TextGenerator};
pub use types::{GenerateOptions, PointCount, Statement};
pub use version::{PKG_VERSION, version_string};

//! Inference capability implementations.
//!
//! - [`tgi`]: HTTP client and loader for a local text-generation server
//! - [`retry`]: retry decorator for any [`TextGenerator`](crate::TextGenerator)

pub mod retry;
pub mod tgi;

pub use retry::{RetryConfig, RetryingGenerator};
pub use tgi::{TgiClient, TgiLoader};

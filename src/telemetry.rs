//! Telemetry metric name constants.
//!
//! Centralised metric names for munin operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `munin_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `phase`: pipeline phase of an inference call ("structured", "gap_fill")
//! - `status`: outcome: "ok" or "error"
//! - `stage`: terminal pipeline stage ("structured", "gap_fill", "fallback")

/// Total point generation requests served by the service facade.
///
/// Labels: `status` ("ok" | "error"), `cached` ("true" | "false").
pub const REQUESTS_TOTAL: &str = "munin_requests_total";

/// End-to-end request duration in seconds, including gate wait and cache lookup.
///
/// Labels: `cached`.
pub const REQUEST_DURATION_SECONDS: &str = "munin_request_duration_seconds";

/// Synthesis duration in seconds (cache misses only).
///
/// Labels: `stage`.
pub const SYNTHESIS_DURATION_SECONDS: &str = "munin_synthesis_duration_seconds";

/// Total calls issued to the inference capability.
///
/// Labels: `phase`, `status`.
pub const INFERENCE_CALLS_TOTAL: &str = "munin_inference_calls_total";

/// Total fallback statements used to pad results.
pub const FALLBACK_STATEMENTS_TOTAL: &str = "munin_fallback_statements_total";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `generator`.
pub const RETRIES_TOTAL: &str = "munin_retries_total";

/// Total model load attempts.
///
/// Labels: `status`.
pub const MODEL_LOADS_TOTAL: &str = "munin_model_loads_total";

/// Total result cache hits.
pub const CACHE_HITS_TOTAL: &str = "munin_cache_hits_total";

/// Total result cache misses.
pub const CACHE_MISSES_TOTAL: &str = "munin_cache_misses_total";

/// Total entries evicted from the result cache to respect its capacity.
pub const CACHE_EVICTIONS_TOTAL: &str = "munin_cache_evictions_total";

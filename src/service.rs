//! Request-level facade: validation, readiness, caching, synthesis.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::{CacheEntry, CacheKey, PointCache};
use crate::model::{ModelStatus, ReadinessGate};
use crate::pipeline::Synthesizer;
use crate::telemetry;
use crate::types::{PointCount, Statement};
use crate::{MuninError, Result};

/// Longest accepted topic, in characters.
pub const DEFAULT_MAX_TOPIC_CHARS: usize = 200;

/// Message returned for a missing or blank prompt.
pub const PROMPT_REQUIRED: &str = "Valid prompt is required";

/// Statements produced for one request.
#[derive(Debug, Clone)]
pub struct PointsResult {
    /// The trimmed request topic.
    pub topic: String,
    pub requested: PointCount,
    pub points: Vec<Statement>,
    /// Time spent synthesizing. For cached results, the original synthesis time.
    pub generation_time: Duration,
    pub cached: bool,
}

/// Snapshot reported by `/api/status`.
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub status: ModelStatus,
    pub message: String,
    pub cache_size: usize,
    pub cache_hit_rate: Option<f64>,
}

/// Ties the readiness gate, result cache, and synthesizer together.
pub struct PointService {
    gate: Arc<ReadinessGate>,
    cache: PointCache,
    synthesizer: Synthesizer,
    max_topic_chars: usize,
}

impl PointService {
    pub fn new(gate: Arc<ReadinessGate>, cache: PointCache, synthesizer: Synthesizer) -> Self {
        Self {
            gate,
            cache,
            synthesizer,
            max_topic_chars: DEFAULT_MAX_TOPIC_CHARS,
        }
    }

    /// Reject topics longer than `n` characters.
    pub fn max_topic_chars(mut self, n: usize) -> Self {
        self.max_topic_chars = n;
        self
    }

    pub fn gate(&self) -> &Arc<ReadinessGate> {
        &self.gate
    }

    pub fn cache(&self) -> &PointCache {
        &self.cache
    }

    /// Produce up to `count` statements about `prompt`.
    ///
    /// Fails only on invalid input or when the model cannot be loaded;
    /// generation failures are absorbed by the synthesizer's fallback.
    pub async fn generate(&self, prompt: &str, count: PointCount) -> Result<PointsResult> {
        let started = Instant::now();
        let outcome = self.generate_inner(prompt, count).await;

        let (status, cached) = match &outcome {
            Ok(result) => ("ok", if result.cached { "true" } else { "false" }),
            Err(_) => ("error", "false"),
        };
        metrics::counter!(telemetry::REQUESTS_TOTAL, "status" => status, "cached" => cached)
            .increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "cached" => cached)
            .record(started.elapsed().as_secs_f64());

        outcome
    }

    async fn generate_inner(&self, prompt: &str, count: PointCount) -> Result<PointsResult> {
        let topic = self.validate_topic(prompt)?;
        let generator = self.gate.ensure_ready().await?;

        let key = CacheKey::new(topic, count);
        if let Some(entry) = self.cache.get(&key) {
            debug!(topic, count = count.get(), "cache hit");
            return Ok(PointsResult {
                topic: topic.to_string(),
                requested: count,
                points: entry.points,
                generation_time: entry.generation_time,
                cached: true,
            });
        }

        let synthesis = self.synthesizer.synthesize(&*generator, topic, count).await;
        if !synthesis.points.is_empty() {
            self.cache.insert(
                key,
                CacheEntry::new(synthesis.points.clone(), synthesis.elapsed),
            );
        }

        Ok(PointsResult {
            topic: topic.to_string(),
            requested: count,
            points: synthesis.points,
            generation_time: synthesis.elapsed,
            cached: false,
        })
    }

    fn validate_topic<'a>(&self, prompt: &'a str) -> Result<&'a str> {
        let topic = prompt.trim();
        if topic.is_empty() {
            return Err(MuninError::InvalidInput(PROMPT_REQUIRED.to_string()));
        }
        if topic.chars().count() > self.max_topic_chars {
            return Err(MuninError::InvalidInput(format!(
                "Prompt must be at most {} characters",
                self.max_topic_chars
            )));
        }
        Ok(topic)
    }

    /// Current model state and cache statistics.
    pub fn status(&self) -> ServiceStatus {
        let status = self.gate.status();
        let message = match status {
            ModelStatus::Ready => "Model ready".to_string(),
            ModelStatus::Loading => "Model loading".to_string(),
            ModelStatus::NotLoaded => match self.gate.last_error() {
                Some(e) => format!("Model failed to load: {e}"),
                None => "Model not loaded".to_string(),
            },
        };
        ServiceStatus {
            status,
            message,
            cache_size: self.cache.len(),
            cache_hit_rate: self.cache.hit_rate(),
        }
    }
}

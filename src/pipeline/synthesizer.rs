//! Generation strategy orchestration.
//!
//! One request walks a fixed sequence of stages:
//!
//! ```text
//! Structured ──enough──▶ done
//!     │ short (but some)          │ error / none
//!     ▼                           ▼
//!  GapFill ──enough──▶ done    Fallback ──▶ done
//!     │ short / error             ▲
//!     └───────────────────────────┘
//! ```
//!
//! The synthesizer never fails: inference errors route to the fallback
//! stage, and the result holds `min(count, available)` statements.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use super::config::PipelineConfig;
use crate::prompt::{PromptBuilder, TemplatePicker, render};
use crate::telemetry;
use crate::text::{self, clean_single};
use crate::traits::TextGenerator;
use crate::types::{GenerateOptions, PointCount, Statement};
use crate::{MuninError, Result};

/// Terminal stage of a synthesis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// The structured call alone met the count.
    Structured,
    /// Gap-fill calls completed the count.
    GapFill,
    /// Fallback statements were used.
    Fallback,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Structured => "structured",
            Stage::GapFill => "gap_fill",
            Stage::Fallback => "fallback",
        }
    }
}

/// Outcome of one synthesis run.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub points: Vec<Statement>,
    pub stage: Stage,
    /// How many of `points` came from fallback templates.
    pub fallback_count: usize,
    pub elapsed: Duration,
}

/// Drives the inference capability to produce statements about a topic.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    config: PipelineConfig,
    prompts: PromptBuilder,
}

impl Synthesizer {
    pub fn new(config: PipelineConfig) -> Self {
        let prompts = PromptBuilder::new(
            config.structured_templates.clone(),
            config.single_starters.clone(),
        );
        Self { config, prompts }
    }

    /// Replace the structured template picker.
    pub fn with_picker(mut self, picker: Arc<dyn TemplatePicker>) -> Self {
        self.prompts = self.prompts.with_picker(picker);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Produce up to `count` statements about `topic`.
    pub async fn synthesize(
        &self,
        generator: &dyn TextGenerator,
        topic: &str,
        count: PointCount,
    ) -> Synthesis {
        let start = Instant::now();
        let want = count.get();

        let mut points = match self.structured(generator, topic, count).await {
            Ok(points) => points,
            Err(e) => {
                warn!(generator = generator.name(), error = %e, "structured generation failed");
                Vec::new()
            }
        };
        debug!(topic, extracted = points.len(), want, "structured stage complete");

        let mut stage = Stage::Structured;
        if points.len() < want {
            stage = Stage::Fallback;
            let shortfall = want - points.len();
            if !points.is_empty() && shortfall <= self.config.max_gap_fill {
                match self.gap_fill(generator, topic, want, &mut points).await {
                    Ok(()) if points.len() >= want => stage = Stage::GapFill,
                    Ok(()) => debug!(topic, have = points.len(), want, "gap fill fell short"),
                    Err(e) => {
                        warn!(generator = generator.name(), error = %e, "gap fill generation failed")
                    }
                }
            }
        }

        let fallback_count = if stage == Stage::Fallback {
            self.pad_with_fallback(topic, want, &mut points)
        } else {
            0
        };
        if fallback_count > 0 {
            metrics::counter!(telemetry::FALLBACK_STATEMENTS_TOTAL).increment(fallback_count as u64);
        }
        points.truncate(want);

        let elapsed = start.elapsed();
        metrics::histogram!(telemetry::SYNTHESIS_DURATION_SECONDS, "stage" => stage.as_str())
            .record(elapsed.as_secs_f64());
        debug!(topic, stage = stage.as_str(), points = points.len(), fallback_count, "synthesis complete");

        Synthesis {
            points,
            stage,
            fallback_count,
            elapsed,
        }
    }

    async fn structured(
        &self,
        generator: &dyn TextGenerator,
        topic: &str,
        count: PointCount,
    ) -> Result<Vec<Statement>> {
        let prompt = self.prompts.structured(topic, count);
        let options = self
            .config
            .structured_sampling
            .options(self.config.structured_tokens(count.get()));
        let raw = self.call(generator, &prompt, &options, "structured").await?;

        // The prompt ends in "1.", so the continuation usually lacks its first marker.
        let listed = if text::starts_with_number_marker(&raw) {
            raw
        } else {
            format!("1. {}", raw.trim_start())
        };
        Ok(text::extract(&listed, topic, count.get()))
    }

    async fn gap_fill(
        &self,
        generator: &dyn TextGenerator,
        topic: &str,
        want: usize,
        points: &mut Vec<Statement>,
    ) -> Result<()> {
        let first = points.len();
        let prompts: Vec<String> = (first..want)
            .map(|index| self.prompts.single_starter(topic, index))
            .collect();
        let options = self
            .config
            .single_sampling
            .options(self.config.single_max_tokens);

        for batch in prompts.chunks(self.config.gap_fill_batch.max(1)) {
            let results = join_all(
                batch
                    .iter()
                    .map(|prompt| self.call(generator, prompt, &options, "gap_fill")),
            )
            .await;

            let mut failure = None;
            for result in results {
                match result {
                    Ok(text) => {
                        if points.len() < want
                            && let Some(statement) = clean_single(&text, topic)
                            && !points.contains(&statement)
                        {
                            points.push(statement);
                        }
                    }
                    Err(e) => {
                        failure.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = failure {
                return Err(e);
            }
        }
        Ok(())
    }

    fn pad_with_fallback(&self, topic: &str, want: usize, points: &mut Vec<Statement>) -> usize {
        let before = points.len();
        for template in &self.config.fallback_statements {
            if points.len() >= want {
                break;
            }
            if let Some(statement) = fallback_statement(template, topic)
                && !points.contains(&statement)
            {
                points.push(statement);
            }
        }
        points.len() - before
    }

    /// One bounded, fallible inference call.
    async fn call(
        &self,
        generator: &dyn TextGenerator,
        prompt: &str,
        options: &GenerateOptions,
        phase: &'static str,
    ) -> Result<String> {
        let timeout = self.config.generation_timeout;
        let outcome = match tokio::time::timeout(timeout, generator.generate(prompt, options)).await
        {
            Ok(result) => result,
            Err(_) => Err(MuninError::Timeout(timeout)),
        };
        let status = if outcome.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::INFERENCE_CALLS_TOTAL, "phase" => phase, "status" => status)
            .increment(1);
        outcome
    }
}

/// Render one fallback template for `topic`.
///
/// Returns `None` when the rendered text is not a well-formed statement
/// (e.g. an overlong topic).
pub fn fallback_statement(template: &str, topic: &str) -> Option<Statement> {
    let topic = text::clean::strip_wrapping(topic);
    text::clean::finish(render(template, &topic, PointCount::DEFAULT).trim())
}

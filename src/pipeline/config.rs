//! Pipeline configuration and variant presets.
//!
//! A variant is only a choice of template sets and sampling parameters;
//! every variant runs through the same [`Synthesizer`](super::Synthesizer).

use std::time::Duration;

use serde::Deserialize;

use crate::types::GenerateOptions;
use crate::{MuninError, Result};

/// Named pipeline presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineVariant {
    /// Benefits and advantages of the topic.
    #[default]
    Benefits,
    /// Neutral facts and insights about the topic.
    Insights,
}

/// Sampling parameters for one kind of inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: usize,
    pub repetition_penalty: f32,
}

impl SamplingConfig {
    /// Build sampled generation options bounded to `max_new_tokens`.
    pub fn options(&self, max_new_tokens: usize) -> GenerateOptions {
        GenerateOptions::new(max_new_tokens)
            .do_sample(true)
            .temperature(self.temperature)
            .top_p(self.top_p)
            .top_k(self.top_k)
            .repetition_penalty(self.repetition_penalty)
    }
}

/// Configuration for the synthesis pipeline.
///
/// ```rust
/// # use munin::pipeline::{PipelineConfig, PipelineVariant};
/// # use std::time::Duration;
/// let config = PipelineConfig::for_variant(PipelineVariant::Insights)
///     .max_gap_fill(2)
///     .generation_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Numbered-list openers. Default: variant preset.
    pub structured_templates: Vec<String>,
    /// Single-point sentence prefixes. Default: variant preset.
    pub single_starters: Vec<String>,
    /// Generic statements used to pad short results. Default: variant preset.
    pub fallback_statements: Vec<String>,
    /// Sampling for the structured call.
    pub structured_sampling: SamplingConfig,
    /// Sampling for gap-fill calls.
    pub single_sampling: SamplingConfig,
    /// New-token budget per requested point in the structured call. Default: 25.
    pub tokens_per_point: usize,
    /// Cap on structured new tokens. Default: 120.
    pub max_structured_tokens: usize,
    /// New-token budget for one gap-fill call. Default: 30.
    pub single_max_tokens: usize,
    /// Largest shortfall that gap fill will attempt. Default: 3.
    pub max_gap_fill: usize,
    /// Gap-fill calls in flight at once. Default: 2.
    pub gap_fill_batch: usize,
    /// Upper bound on a single inference call. Default: 30s.
    pub generation_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_variant(PipelineVariant::default())
    }
}

impl PipelineConfig {
    /// Preset for the benefits variant.
    pub fn benefits() -> Self {
        Self::base(
            strings(&[
                "Key benefits of {topic}:\n1.",
                "Here are {count} main advantages of {topic}:\n1.",
                "Why {topic} is worth it:\n1.",
                "The most important benefits of {topic} are:\n1.",
            ]),
            strings(&[
                "One major benefit of {topic} is that it",
                "{topic} is valuable because it",
                "Another advantage of {topic} is that it",
                "People choose {topic} because it",
            ]),
            strings(&[
                "{topic} provides significant benefits for users.",
                "{topic} can improve efficiency in many situations.",
                "{topic} offers practical advantages in everyday use.",
                "{topic} supports better long-term outcomes.",
                "{topic} creates new opportunities for people and organizations.",
            ]),
            SamplingConfig {
                temperature: 0.8,
                top_p: 0.95,
                top_k: 50,
                repetition_penalty: 1.15,
            },
        )
    }

    /// Preset for the insights variant.
    pub fn insights() -> Self {
        Self::base(
            strings(&[
                "Interesting facts about {topic}:\n1.",
                "Here are {count} key insights about {topic}:\n1.",
                "What everyone should know about {topic}:\n1.",
                "Key points about {topic}:\n1.",
            ]),
            strings(&[
                "An important fact about {topic} is that it",
                "Many people do not realize that {topic}",
                "Experts often point out that {topic}",
                "One notable aspect of {topic} is that it",
            ]),
            strings(&[
                "{topic} is an important subject worth understanding.",
                "{topic} has a meaningful impact on many people.",
                "{topic} continues to evolve over time.",
                "{topic} is widely studied and discussed.",
                "{topic} connects to many related ideas.",
            ]),
            SamplingConfig {
                temperature: 0.85,
                top_p: 0.95,
                top_k: 50,
                repetition_penalty: 1.2,
            },
        )
    }

    /// Preset for a named variant.
    pub fn for_variant(variant: PipelineVariant) -> Self {
        match variant {
            PipelineVariant::Benefits => Self::benefits(),
            PipelineVariant::Insights => Self::insights(),
        }
    }

    fn base(
        structured_templates: Vec<String>,
        single_starters: Vec<String>,
        fallback_statements: Vec<String>,
        structured_sampling: SamplingConfig,
    ) -> Self {
        let single_sampling = SamplingConfig {
            temperature: structured_sampling.temperature + 0.05,
            ..structured_sampling.clone()
        };
        Self {
            structured_templates,
            single_starters,
            fallback_statements,
            structured_sampling,
            single_sampling,
            tokens_per_point: 25,
            max_structured_tokens: 120,
            single_max_tokens: 30,
            max_gap_fill: 3,
            gap_fill_batch: 2,
            generation_timeout: Duration::from_secs(30),
        }
    }

    /// Set the largest shortfall gap fill will attempt.
    pub fn max_gap_fill(mut self, n: usize) -> Self {
        self.max_gap_fill = n;
        self
    }

    /// Set the number of concurrent gap-fill calls.
    pub fn gap_fill_batch(mut self, n: usize) -> Self {
        self.gap_fill_batch = n;
        self
    }

    /// Set the per-call inference timeout.
    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Replace the fallback statement templates.
    pub fn fallback_statements(mut self, statements: Vec<String>) -> Self {
        self.fallback_statements = statements;
        self
    }

    /// Replace the structured templates.
    pub fn structured_templates(mut self, templates: Vec<String>) -> Self {
        self.structured_templates = templates;
        self
    }

    /// Replace the single-point starters.
    pub fn single_starters(mut self, starters: Vec<String>) -> Self {
        self.single_starters = starters;
        self
    }

    /// New-token budget for a structured call producing `count` points.
    pub fn structured_tokens(&self, count: usize) -> usize {
        (count * self.tokens_per_point).min(self.max_structured_tokens)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.structured_templates.is_empty() {
            return Err(MuninError::Configuration(
                "pipeline needs at least one structured template".into(),
            ));
        }
        if self.single_starters.is_empty() {
            return Err(MuninError::Configuration(
                "pipeline needs at least one single starter".into(),
            ));
        }
        if self.gap_fill_batch == 0 {
            return Err(MuninError::Configuration(
                "gap_fill_batch must be at least 1".into(),
            ));
        }
        if self.generation_timeout.is_zero() {
            return Err(MuninError::Configuration(
                "generation timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

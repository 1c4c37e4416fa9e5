//! Sampling options passed to the inference capability.

use serde::{Deserialize, Serialize};

/// Options for a single text generation call.
///
/// Field names mirror the text-generation parameters understood by local
/// model servers, so the struct serializes directly into a request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Maximum number of new tokens to generate.
    pub max_new_tokens: usize,

    /// Sampling temperature (0.0 to 2.0).
    /// Higher values make output more random.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Whether to sample instead of greedy decoding.
    pub do_sample: bool,

    /// Nucleus sampling threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Top-k sampling: only consider the k most likely tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,

    /// Penalise tokens that already appeared in the output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,

    /// Include the prompt in the returned text. Always `false` in munin.
    pub return_full_text: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::new(32)
    }
}

impl GenerateOptions {
    /// Create greedy options bounded to `max_new_tokens`.
    pub fn new(max_new_tokens: usize) -> Self {
        Self {
            max_new_tokens,
            temperature: None,
            do_sample: false,
            top_p: None,
            top_k: None,
            repetition_penalty: None,
            return_full_text: false,
        }
    }

    /// Set max new tokens.
    pub fn max_new_tokens(mut self, max_new_tokens: usize) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    /// Set temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Enable or disable sampling.
    pub fn do_sample(mut self, enabled: bool) -> Self {
        self.do_sample = enabled;
        self
    }

    /// Set top_p.
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set top-k sampling.
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Set repetition penalty.
    pub fn repetition_penalty(mut self, penalty: f32) -> Self {
        self.repetition_penalty = Some(penalty);
        self
    }
}

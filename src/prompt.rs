//! Prompt construction.
//!
//! Two kinds of prompt are built from configured template sets:
//!
//! - **structured** prompts open a numbered list (`"...:\n1."`) so one call
//!   can yield several points. The template is chosen by a
//!   [`TemplatePicker`]; the default picks uniformly at random.
//! - **single starters** are short sentence prefixes that elicit one
//!   continuation. They are chosen by `index % starters.len()`, so the same
//!   index always yields the same starter.
//!
//! Templates may use the `{topic}` and `{count}` placeholders.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

use crate::types::PointCount;

const FALLBACK_STRUCTURED: &str = "Key points about {topic}:\n1.";
const FALLBACK_STARTER: &str = "One important thing about {topic} is that it";

/// Chooses one template out of `len`.
pub trait TemplatePicker: Send + Sync {
    /// Return an index in `0..len`. `len` is never zero.
    fn pick(&self, len: usize) -> usize;
}

/// Uniform random selection using the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPicker;

impl TemplatePicker for RandomPicker {
    fn pick(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

/// Round-robin selection, for deterministic tests.
#[derive(Debug, Default)]
pub struct CyclicPicker {
    next: AtomicUsize,
}

impl CyclicPicker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplatePicker for CyclicPicker {
    fn pick(&self, len: usize) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % len
    }
}

/// Renders structured prompts and single starters for a topic.
#[derive(Clone)]
pub struct PromptBuilder {
    structured: Vec<String>,
    starters: Vec<String>,
    picker: Arc<dyn TemplatePicker>,
}

impl PromptBuilder {
    /// Create a builder over the given template sets with random selection.
    pub fn new(structured: Vec<String>, starters: Vec<String>) -> Self {
        Self {
            structured,
            starters,
            picker: Arc::new(RandomPicker),
        }
    }

    /// Replace the structured template picker.
    pub fn with_picker(mut self, picker: Arc<dyn TemplatePicker>) -> Self {
        self.picker = picker;
        self
    }

    /// Build a numbered-list prompt for `count` points about `topic`.
    pub fn structured(&self, topic: &str, count: PointCount) -> String {
        let template: &str = if self.structured.is_empty() {
            FALLBACK_STRUCTURED
        } else {
            &self.structured[self.picker.pick(self.structured.len())]
        };
        let mut prompt = render(template, topic, count);
        if !prompt.trim_end().ends_with("1.") {
            prompt.push_str("\n1.");
        }
        prompt
    }

    /// Build the single-point starter for `index`.
    pub fn single_starter(&self, topic: &str, index: usize) -> String {
        let template: &str = if self.starters.is_empty() {
            FALLBACK_STARTER
        } else {
            &self.starters[index % self.starters.len()]
        };
        render(template, topic, PointCount::DEFAULT)
    }
}

impl std::fmt::Debug for PromptBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptBuilder")
            .field("structured", &self.structured)
            .field("starters", &self.starters)
            .finish_non_exhaustive()
    }
}

/// Substitute `{topic}` and `{count}` placeholders.
///
/// `{count}` goes first so placeholder text inside the topic is left as is.
pub fn render(template: &str, topic: &str, count: PointCount) -> String {
    template
        .replace("{count}", &count.to_string())
        .replace("{topic}", topic)
}

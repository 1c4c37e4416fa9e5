//! Statements and requested counts.

use std::fmt;

use serde::Serialize;

/// Maximum length (in characters) of a well-formed statement.
pub const MAX_STATEMENT_CHARS: usize = 200;

/// Substrings that mark a corrupt generation.
const CORRUPTION_MARKERS: &[&str] = &["undefined", "null"];

/// A single well-formed sentence about a topic.
///
/// Only constructible through [`Statement::new`], which enforces the
/// well-formedness predicate: trimmed, contains an alphanumeric, first
/// character an uppercase letter or ASCII digit, terminal `.`/`!`/`?`, at most
/// [`MAX_STATEMENT_CHARS`] characters, no corruption markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Statement(String);

impl Statement {
    /// Validate `text` as a statement.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        is_well_formed(&text).then_some(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Statement {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The statement well-formedness predicate.
pub fn is_well_formed(text: &str) -> bool {
    if text.trim() != text || !text.chars().any(char::is_alphanumeric) {
        return false;
    }
    if text.chars().count() > MAX_STATEMENT_CHARS {
        return false;
    }
    // Digit starts cover topics like "3D printing".
    if !text
        .chars()
        .next()
        .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit())
    {
        return false;
    }
    if !text.ends_with(['.', '!', '?']) {
        return false;
    }
    !contains_corruption_marker(text)
}

/// Whether `text` contains a corrupt-generation marker (case-insensitive).
pub fn contains_corruption_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    CORRUPTION_MARKERS.iter().any(|m| lower.contains(m))
}

/// Number of statements requested, clamped to `[MIN, MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PointCount(u8);

impl PointCount {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;
    pub const DEFAULT: PointCount = PointCount(3);

    /// Clamp any integer into the valid range.
    pub fn clamped(n: i64) -> Self {
        Self(n.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    /// Interpret a JSON `count` field.
    ///
    /// Missing, non-numeric or non-finite values give [`PointCount::DEFAULT`];
    /// fractional values are truncated before clamping.
    pub fn from_json(value: Option<&serde_json::Value>) -> Self {
        match value.and_then(serde_json::Value::as_f64) {
            Some(n) if n.is_finite() => Self::clamped(n.trunc() as i64),
            _ => Self::DEFAULT,
        }
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl Default for PointCount {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for PointCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! Candidate extraction from free-form model output.
//!
//! Three strategies run in order, each only while fewer than the expected
//! number of statements have been accepted:
//!
//! 1. numbered list items (`1. foo`)
//! 2. bullet items (`• foo`, `- foo`, `* foo`)
//! 3. sentence fragments longer than [`MIN_SENTENCE_CHARS`]
//!
//! Every candidate goes through [`clean`]; near-duplicates are skipped.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::clean::clean;
use crate::types::Statement;

/// Sentence fragments must be longer than this to become candidates.
pub const MIN_SENTENCE_CHARS: usize = 15;

/// Candidates sharing this many leading characters are near-duplicates.
pub const DEDUP_PREFIX_CHARS: usize = 20;

static NUMBER_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)\d+\.").expect("number marker regex"));

static BULLET_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)[•*\-]").expect("bullet marker regex"));

/// Extract up to `expected` statements about `topic` from `raw`.
pub fn extract(raw: &str, topic: &str, expected: usize) -> Vec<Statement> {
    let mut acc = Accepted::new(topic, expected);

    acc.offer_all(marked_segments(raw, &NUMBER_MARKER));
    if !acc.is_full() {
        acc.offer_all(marked_segments(raw, &BULLET_MARKER));
    }
    if !acc.is_full() {
        acc.offer_all(sentence_fragments(raw));
    }

    acc.points
}

/// Whether `text` opens with a numbered-list marker.
pub fn starts_with_number_marker(text: &str) -> bool {
    marker_ends(text.trim_start(), &NUMBER_MARKER)
        .first()
        .is_some_and(|&(start, _)| start == 0)
}

struct Accepted<'t> {
    topic: &'t str,
    expected: usize,
    points: Vec<Statement>,
    prefixes: HashSet<String>,
}

impl<'t> Accepted<'t> {
    fn new(topic: &'t str, expected: usize) -> Self {
        Self {
            topic,
            expected,
            points: Vec::with_capacity(expected),
            prefixes: HashSet::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.points.len() >= self.expected
    }

    fn offer_all<'a>(&mut self, candidates: impl IntoIterator<Item = &'a str>) {
        for candidate in candidates {
            if self.is_full() {
                return;
            }
            self.offer(candidate);
        }
    }

    fn offer(&mut self, candidate: &str) {
        let prefix = dedup_prefix(candidate);
        if self.prefixes.contains(&prefix) {
            return;
        }
        let Some(statement) = clean(candidate, self.topic) else {
            return;
        };
        if self.points.contains(&statement) {
            return;
        }
        self.prefixes.insert(prefix);
        self.points.push(statement);
    }
}

fn dedup_prefix(candidate: &str) -> String {
    candidate
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .take(DEDUP_PREFIX_CHARS)
        .collect()
}

/// Text following each marker, up to the next marker or end of line.
fn marked_segments<'a>(raw: &'a str, marker: &Regex) -> Vec<&'a str> {
    let mut segments = Vec::new();
    for line in raw.lines() {
        let markers = marker_ends(line, marker);
        for (i, &(_, end)) in markers.iter().enumerate() {
            let stop = markers.get(i + 1).map_or(line.len(), |&(start, _)| start);
            let segment = line[end..stop].trim();
            if !segment.is_empty() {
                segments.push(segment);
            }
        }
    }
    segments
}

/// `(start, end)` of every marker followed by whitespace or end of line.
///
/// `start` excludes the leading whitespace matched by the pattern.
fn marker_ends(line: &str, marker: &Regex) -> Vec<(usize, usize)> {
    marker
        .find_iter(line)
        .filter(|m| {
            line[m.end()..]
                .chars()
                .next()
                .is_none_or(char::is_whitespace)
        })
        .map(|m| {
            let text = m.as_str();
            let start = m.start() + (text.len() - text.trim_start().len());
            (start, m.end())
        })
        .collect()
}

fn sentence_fragments(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|f| f.chars().count() > MIN_SENTENCE_CHARS)
}

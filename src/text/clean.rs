//! Candidate normalization.
//!
//! Turns one raw fragment of model output into at most one [`Statement`].
//! Both entry points are pure functions of `(text, topic)`.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::Statement;

/// Raw candidates shorter than this are rejected outright.
pub const MIN_RAW_CHARS: usize = 5;

/// Candidates shorter than this after stripping are rejected.
pub const MIN_CLEAN_CHARS: usize = 10;

/// Single-starter fragments must be longer than this.
pub const MIN_SINGLE_FRAGMENT_CHARS: usize = 8;

static LEADING_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[•*\-]+\s*|\d+[.):](?:\s+|$))").expect("leading marker regex")
});

static LEADING_FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:is that|that|because|by|through|and|but|or|so|also)\b[\s,]*")
        .expect("leading filler regex")
});

static LEADING_PRONOUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:it|this|they)\b").expect("leading pronoun regex"));

/// Opening and closing characters that may wrap a candidate or topic.
const WRAPPING_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('“', '”'),
    ('‘', '’'),
    ('(', ')'),
    ('[', ']'),
];

/// Normalize a list or sentence candidate into a statement about `topic`.
///
/// Returns `None` when the candidate is too short, too long, or looks like
/// a corrupt generation.
pub fn clean(candidate: &str, topic: &str) -> Option<Statement> {
    let trimmed = candidate.trim();
    if trimmed.chars().count() < MIN_RAW_CHARS {
        return None;
    }

    let mut text = collapse_whitespace(trimmed);
    loop {
        let stripped = strip_wrapping(strip_prefix_match(&LEADING_MARKER, &text));
        let stripped = strip_prefix_match(&LEADING_FILLER, &stripped).to_string();
        if stripped.len() == text.len() {
            break;
        }
        text = stripped;
    }

    let topic = strip_wrapping(topic);
    let text = LEADING_PRONOUN.replace(&text, regex::NoExpand(&topic));
    if text.chars().count() < MIN_CLEAN_CHARS {
        return None;
    }

    finish(&text)
}

/// Normalize the continuation of a single-point starter prompt.
///
/// Only the first sentence fragment is kept; it is prefixed with `topic`
/// so the statement names its subject.
pub fn clean_single(text: &str, topic: &str) -> Option<Statement> {
    let fragment = text
        .trim()
        .split(['.', '!', '?', '\n'])
        .next()
        .unwrap_or_default();
    let fragment = strip_wrapping(fragment);
    if fragment.chars().count() <= MIN_SINGLE_FRAGMENT_CHARS {
        return None;
    }

    finish(&collapse_whitespace(&format!("{} {fragment}", strip_wrapping(topic))))
}

/// Remove quotes and brackets wrapping `text`, keeping a terminal `.`/`!`/`?`.
///
/// Enclosing pairs are removed, as are an unmatched opener at the start
/// and an unmatched closer at the end. Balanced pairs inside are kept.
pub(crate) fn strip_wrapping(text: &str) -> String {
    let text = text.trim();
    let core = text.trim_end_matches(['.', '!', '?']);
    let terminator = &text[core.len()..];
    let mut core = core.trim();

    loop {
        let before = core.len();

        let mut chars = core.chars();
        if let (Some(first), Some(last)) = (chars.next(), chars.next_back())
            && WRAPPING_PAIRS.contains(&(first, last))
        {
            core = core[first.len_utf8()..core.len() - last.len_utf8()].trim();
        }
        if let Some(first) = core.chars().next()
            && let Some(&(_, close)) = WRAPPING_PAIRS.iter().find(|(open, _)| *open == first)
            && !core[first.len_utf8()..].contains(close)
        {
            core = core[first.len_utf8()..].trim_start();
        }
        if let Some(last) = core.chars().next_back()
            && let Some(&(open, _)) = WRAPPING_PAIRS.iter().find(|(_, close)| *close == last)
            && !core[..core.len() - last.len_utf8()].contains(open)
        {
            core = core[..core.len() - last.len_utf8()].trim_end();
        }

        if core.len() == before {
            break;
        }
    }

    format!("{core}{terminator}")
}

/// Capitalize, terminate, and validate.
pub(crate) fn finish(text: &str) -> Option<Statement> {
    let text =
        text.trim_end_matches(|c: char| matches!(c, ',' | ';' | ':' | '-') || c.is_whitespace());
    let mut out = capitalize(text);
    if !out.ends_with(['.', '!', '?']) {
        out.push('.');
    }
    Statement::new(out)
}

fn strip_prefix_match<'a>(re: &Regex, text: &'a str) -> &'a str {
    match re.find(text) {
        Some(m) => text[m.end()..].trim_start(),
        None => text,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

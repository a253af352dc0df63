//! Institution matching between a declared name and OCR text
//!
//! Rules run in a fixed order and the first hit wins:
//!
//! 1. Containment of the declared name in the document
//! 2. Alias dictionary (acronyms and long forms)
//! 3. Word overlap between declared tokens and the document
//! 4. Keyword line extraction as a diagnostic hint
//!
//! Everything here is pure; identical input always gives identical output.

pub mod aliases;
pub mod normalize;

pub use aliases::{InstitutionEntry, INSTITUTIONS};
pub use normalize::normalize;

use serde::{Deserialize, Serialize};

/// Documents shorter than this carry too little signal to judge
pub const MIN_DOCUMENT_CHARS: usize = 10;

/// Declared names shorter than this skip the containment rule
pub const MIN_CONTAINMENT_CHARS: usize = 4;

/// Minimum significant tokens before word overlap is attempted
pub const MIN_SIGNIFICANT_TOKENS: usize = 2;

/// Longest candidate returned by keyword extraction
pub const MAX_CANDIDATE_CHARS: usize = 80;

/// Connector words ignored when scoring overlap
const CONNECTORS: &[&str] = &[
    "de", "da", "do", "das", "dos", "e", "em", "na", "no", "nas", "nos", "para", "pela", "pelo",
    "pelas", "pelos", "the", "of", "and",
];

/// Generic institution-type keywords, in priority order
const INSTITUTION_KEYWORDS: &[&str] = &[
    "universidade",
    "faculdade",
    "instituto",
    "centro universitario",
    "escola superior",
];

/// Which rule produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// Document too short or declared name empty
    InsufficientInput,
    Containment,
    Alias,
    /// The document names a dictionary institution other than the declared one
    AliasMismatch,
    WordOverlap,
    /// An institution-looking line was found but not confirmed
    KeywordLine,
    NoMatch,
}

/// Outcome of matching a declared institution against document text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionMatch {
    pub found: Option<String>,
    pub matched: bool,
    pub rule: MatchRule,
}

impl InstitutionMatch {
    fn hit(found: impl Into<String>, rule: MatchRule) -> Self {
        Self {
            found: Some(found.into()),
            matched: true,
            rule,
        }
    }

    fn miss(found: Option<String>, rule: MatchRule) -> Self {
        Self {
            found,
            matched: false,
            rule,
        }
    }
}

/// Decide whether `document_text` plausibly names `declared`.
pub fn match_institution(document_text: &str, declared: &str) -> InstitutionMatch {
    let text = normalize(document_text);
    let wanted = normalize(declared);

    if text.chars().count() < MIN_DOCUMENT_CHARS || wanted.is_empty() {
        return InstitutionMatch::miss(None, MatchRule::InsufficientInput);
    }

    // Containment is one-directional on purpose; the alias rule checks both ways.
    if wanted.chars().count() >= MIN_CONTAINMENT_CHARS && text.contains(&wanted) {
        return InstitutionMatch::hit(declared, MatchRule::Containment);
    }

    if let Some(result) = match_alias(&text, &wanted) {
        return result;
    }

    if word_overlap_matches(&text, &wanted) {
        return InstitutionMatch::hit(declared, MatchRule::WordOverlap);
    }

    match keyword_line(document_text) {
        Some(candidate) => InstitutionMatch::miss(Some(candidate), MatchRule::KeywordLine),
        None => InstitutionMatch::miss(None, MatchRule::NoMatch),
    }
}

/// The first dictionary entry present in the document decides, match or not.
fn match_alias(text: &str, wanted: &str) -> Option<InstitutionMatch> {
    aliases::NORMALIZED.iter().find_map(|entry| {
        let in_document = entry.names.iter().any(|name| text.contains(name.as_str()));
        if !in_document {
            return None;
        }

        let declared_is_entry = entry
            .names
            .iter()
            .any(|name| wanted.contains(name.as_str()) || name.contains(wanted));

        Some(if declared_is_entry {
            InstitutionMatch::hit(entry.canonical, MatchRule::Alias)
        } else {
            InstitutionMatch::miss(Some(entry.canonical.to_string()), MatchRule::AliasMismatch)
        })
    })
}

/// Tokens of the declared name that carry meaning
fn significant_tokens(wanted: &str) -> Vec<&str> {
    wanted
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 3)
        .filter(|token| !CONNECTORS.contains(token))
        .collect()
}

/// At least 60% (rounded up) of the significant tokens must appear in the text
fn word_overlap_matches(text: &str, wanted: &str) -> bool {
    let tokens = significant_tokens(wanted);
    if tokens.len() < MIN_SIGNIFICANT_TOKENS {
        return false;
    }

    let hits = tokens.iter().filter(|token| text.contains(*token)).count();
    let required = (tokens.len() * 3).div_ceil(5);
    hits >= required
}

/// First line of the original text that contains an institution keyword
fn keyword_line(document_text: &str) -> Option<String> {
    INSTITUTION_KEYWORDS.iter().find_map(|keyword| {
        document_text
            .lines()
            .find(|line| normalize(line).contains(keyword))
            .map(|line| line.trim().chars().take(MAX_CANDIDATE_CHARS).collect())
    })
}

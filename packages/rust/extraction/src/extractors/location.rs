//! State of operation.

use std::sync::LazyLock;

use intake_shared::FieldName;
use regex::Regex;

use super::{Candidate, FieldExtractor, bare_word};
use crate::states;

/// A state name or uppercase abbreviation after a locative phrase
/// ("in", "state of", "from", "out of", "based in", "located in").
pub struct StateExtractor;

impl FieldExtractor for StateExtractor {
    fn field(&self) -> FieldName {
        FieldName::StateOfOperation
    }

    fn name(&self) -> &'static str {
        "state"
    }

    fn try_extract(&self, text: &str) -> Option<Candidate> {
        static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                r"(?i)\b(?:based\s+in|located\s+in|state\s+of|out\s+of|in|from)\s+(?:the\s+state\s+of\s+)?",
            )
            .expect("valid regex")
        });

        ANCHOR_RE
            .find_iter(text)
            .find_map(|anchor| state_at(&text[anchor.end()..]))
            .map(|state| Candidate::new(state, 90))
    }
}

/// Match the words at the start of `rest`, two-word names first.
fn state_at(rest: &str) -> Option<&'static str> {
    let mut words = rest.split_whitespace();
    let first_raw = words.next()?;
    let first = bare_word(first_raw);

    // Punctuation after the first word closes the name.
    if first.len() == first_raw.len() {
        if let Some(second) = words.next() {
            if let Some(state) = states::from_name(&format!("{first} {}", bare_word(second))) {
                return Some(state);
            }
        }
    }
    if first.len() == 2 {
        return states::from_abbreviation(first);
    }
    states::from_name(first)
}

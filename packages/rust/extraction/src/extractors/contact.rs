//! Caller contact details: email, phone, and personal name.

use std::sync::LazyLock;

use intake_shared::FieldName;
use regex::Regex;

use super::{Candidate, FieldExtractor, bare_word};
use crate::states;
use crate::validators::{canonical_email, canonical_phone, title_case};

/// Words that follow "I'm" / "this is" but are not names.
const NOT_NAMES: &[&str] = &[
    "Looking", "Calling", "Interested", "Here", "Just", "Not", "Trying", "Going", "Starting",
    "Ready", "Happy", "Glad", "Excited", "Thinking", "Planning", "Hoping", "Wondering", "Sure",
    "Still", "Also", "Really", "Very", "Good", "Great", "Fine", "Okay", "Actually", "The",
];

/// Words that end a name span.
const NAME_STOPS: &[&str] = &[
    "and", "i", "im", "i'm", "my", "the", "is", "from", "calling", "with", "here", "so", "but",
    "at", "in", "of", "to", "a", "an", "not", "just", "looking",
];

const LEGAL_SUFFIXES: &[&str] = &["LLC", "Inc", "Corp", "Corporation", "Incorporated", "Ltd"];

/// First `local@domain.tld` token that passes strict validation.
pub struct EmailExtractor;

impl FieldExtractor for EmailExtractor {
    fn field(&self) -> FieldName {
        FieldName::CustomerEmail
    }

    fn name(&self) -> &'static str {
        "email"
    }

    fn try_extract(&self, text: &str) -> Option<Candidate> {
        static EMAIL_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(?i)\b[a-z0-9][a-z0-9._%+\-]*@[a-z0-9\-]+(?:\.[a-z0-9\-]+)+")
                .expect("valid regex")
        });

        let token = EMAIL_TOKEN_RE.find(text)?;
        canonical_email(token.as_str()).map(|email| Candidate::new(email, 95))
    }
}

/// First digit group that reduces to a North American number.
pub struct PhoneExtractor;

impl FieldExtractor for PhoneExtractor {
    fn field(&self) -> FieldName {
        FieldName::CustomerPhone
    }

    fn name(&self) -> &'static str {
        "phone"
    }

    fn try_extract(&self, text: &str) -> Option<Candidate> {
        static PHONE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"\+?\(?\d[\d().\-]{5,}\d").expect("valid regex")
        });

        PHONE_TOKEN_RE
            .find_iter(text)
            .find_map(|m| canonical_phone(m.as_str()))
            .map(|phone| Candidate::new(phone, 95))
    }
}

/// "My name is Bill Clinton", "this is Katie", "I'm Ada Lovelace".
pub struct IntroducedNameExtractor;

impl FieldExtractor for IntroducedNameExtractor {
    fn field(&self) -> FieldName {
        FieldName::CustomerName
    }

    fn name(&self) -> &'static str {
        "name:introduced"
    }

    fn try_extract(&self, text: &str) -> Option<Candidate> {
        static INTRO_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                r"(?i:\b(?:my\s+name\s+is|this\s+is|i['’]m|i\s+am|call\s+me))\s+([A-Z][A-Za-z'’\-]*(?:\s+[A-Z][A-Za-z'’\-]*){0,3})",
            )
            .expect("valid regex")
        });

        INTRO_RE.captures_iter(text).find_map(|caps| {
            let words: Vec<&str> = caps[1]
                .split_whitespace()
                .take_while(|w| !NAME_STOPS.contains(&w.to_lowercase().as_str()))
                .collect();
            let first = *words.first()?;
            if NOT_NAMES.contains(&first)
                || words.iter().any(|w| LEGAL_SUFFIXES.contains(w))
            {
                return None;
            }
            let name = words.join(" ");
            if states::from_name(&name).is_some() {
                return None;
            }
            Some(Candidate::new(name, 85))
        })
    }
}

/// Lowercase transcripts: "my name is bill clinton" → "Bill Clinton".
pub struct LowercaseNameExtractor;

impl FieldExtractor for LowercaseNameExtractor {
    fn field(&self) -> FieldName {
        FieldName::CustomerName
    }

    fn name(&self) -> &'static str {
        "name:lowercase"
    }

    fn try_extract(&self, text: &str) -> Option<Candidate> {
        static LOWER_INTRO_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(?i)\bmy\s+name\s+is\s+([a-z][a-z'\-]*[.,]?)(?:\s+([a-z][a-z'\-]*))?")
                .expect("valid regex")
        });

        let caps = LOWER_INTRO_RE.captures(text)?;
        let first = &caps[1];
        let first_bare = bare_word(first);
        if NAME_STOPS.contains(&first_bare.to_lowercase().as_str()) {
            return None;
        }

        let mut words = vec![first_bare];
        // Punctuation after the first word closes the name.
        if first_bare.len() == first.len() {
            if let Some(second) = caps.get(2).map(|m| m.as_str()) {
                if !NAME_STOPS.contains(&second.to_lowercase().as_str()) {
                    words.push(second);
                }
            }
        }

        Some(Candidate::new(title_case(&words.join(" ")), 65))
    }
}

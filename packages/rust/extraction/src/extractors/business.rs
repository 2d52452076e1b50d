//! Business identity: name, legal entity type, and kind of business.

use std::sync::LazyLock;

use intake_shared::{EntityType, FieldName};
use regex::Regex;

use super::{Candidate, FieldExtractor};
use crate::states;

/// Most words a captured business name may have.
const MAX_NAME_WORDS: usize = 6;

/// Leading words dropped from a capitalised span before a legal suffix.
const LEADING_FILLER: &[&str] = &[
    "My", "Our", "I", "I'd", "I'm", "We", "We're", "A", "An", "It", "Its", "It's", "So", "And",
    "Yes", "Yeah", "Okay", "Ok", "Well", "Like", "Hi", "Hello", "Called", "Named", "Start",
];

/// Lowercase words after "called" that mean the verb, not a name.
const NOT_NAME_STARTS: &[&str] = &[
    "yesterday", "today", "earlier", "last", "before", "about", "you", "me", "him", "her",
    "them", "us", "back", "again", "it", "a", "the",
];

/// Adjectives that say nothing about the kind of business.
const GENERIC_ADJECTIVES: &[&str] = &["new", "small", "own", "little"];

/// Canonical spelling of a legal-entity suffix.
pub(crate) fn canonical_suffix(raw: &str) -> Option<&'static str> {
    let key: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    match key.as_str() {
        "llc" => Some("LLC"),
        "inc" => Some("Inc"),
        "incorporated" => Some("Incorporated"),
        "corp" => Some("Corp"),
        "corporation" => Some("Corporation"),
        "ltd" => Some("Ltd"),
        _ => None,
    }
}

/// True when the last word of `name` is a legal-entity suffix ("Acme LLC").
pub fn has_legal_suffix(name: &str) -> bool {
    name.split_whitespace()
        .last()
        .is_some_and(|w| canonical_suffix(w).is_some())
}

// ---------------------------------------------------------------------------
// Business name
// ---------------------------------------------------------------------------

/// "a bakery called Sunrise Treats", "named Acme, Inc."
pub struct TriggeredBusinessNameExtractor;

impl FieldExtractor for TriggeredBusinessNameExtractor {
    fn field(&self) -> FieldName {
        FieldName::BusinessName
    }

    fn name(&self) -> &'static str {
        "business_name:trigger"
    }

    fn try_extract(&self, text: &str) -> Option<Candidate> {
        static TRIGGER_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(?i)\b(?:called|named)\s+").expect("valid regex"));
        static STOP_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(?i)[.,!?;]|\s(?:in|and|which|that|because)\b").expect("valid regex")
        });
        static SUFFIX_CONT_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(?i)^\s*,?\s*(l\.l\.c|llc|incorporated|inc|corporation|corp|ltd)\b")
                .expect("valid regex")
        });

        TRIGGER_RE.find_iter(text).find_map(|trigger| {
            let rest = &text[trigger.end()..];
            let cut = STOP_RE.find(rest).map_or(rest.len(), |m| m.start());
            let span = rest[..cut]
                .trim()
                .trim_matches(|c: char| matches!(c, '"' | '\'' | '“' | '”'));

            let words: Vec<&str> = span.split_whitespace().collect();
            let first = *words.first()?;
            if words.len() > MAX_NAME_WORDS
                || NOT_NAME_STARTS.contains(&first.to_lowercase().as_str())
            {
                return None;
            }

            let mut name = words.join(" ");
            if !has_legal_suffix(&name) {
                let suffix = SUFFIX_CONT_RE
                    .captures(&rest[cut..])
                    .and_then(|caps| canonical_suffix(&caps[1]));
                if let Some(suffix) = suffix {
                    name = format!("{name} {suffix}");
                }
            }

            let capitalised = first.starts_with(|c: char| c.is_uppercase() || c.is_ascii_digit());
            Some(Candidate::new(name, if capitalised { 80 } else { 60 }))
        })
    }
}

/// "Katy Perry LLC", "our Sunrise Bakery Inc".
pub struct SuffixedBusinessNameExtractor;

impl FieldExtractor for SuffixedBusinessNameExtractor {
    fn field(&self) -> FieldName {
        FieldName::BusinessName
    }

    fn name(&self) -> &'static str {
        "business_name:suffix"
    }

    fn try_extract(&self, text: &str) -> Option<Candidate> {
        static SUFFIXED_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                r"\b((?:[A-Z][A-Za-z0-9&'’\-]*\s+){1,5})(LLC|L\.L\.C|Incorporated|Inc|Corporation|Corp|Ltd)\b",
            )
            .expect("valid regex")
        });

        SUFFIXED_RE.captures_iter(text).find_map(|caps| {
            let words: Vec<&str> = caps[1]
                .split_whitespace()
                .skip_while(|w| LEADING_FILLER.contains(w))
                .collect();
            if words.is_empty() {
                return None;
            }
            let span = words.join(" ");
            if states::from_name(&span).is_some() {
                return None;
            }
            let suffix = canonical_suffix(&caps[2])?;
            Some(Candidate::new(format!("{span} {suffix}"), 85))
        })
    }
}

// ---------------------------------------------------------------------------
// Entity type
// ---------------------------------------------------------------------------

/// Phrase dictionary for legal structures. Earliest mention wins.
pub struct EntityTypeExtractor;

static ENTITY_PATTERNS: LazyLock<Vec<(Regex, EntityType)>> = LazyLock::new(|| {
    [
        (r"(?i)\bs[\s\-]?corp(?:oration)?\b", EntityType::SCorp),
        (
            r"(?i)\b(?:llc|l\.l\.c|limited\s+liability\s+company)\b",
            EntityType::Llc,
        ),
        (
            r"(?i)\b(?:c[\s\-]?corp(?:oration)?|corporation|incorporated|inc|corp)\b",
            EntityType::Corporation,
        ),
        (r"(?i)\bsole\s+proprietor(?:ship)?\b", EntityType::SoleProprietorship),
        (r"(?i)\b(?:partnership|llp)\b", EntityType::Partnership),
        (
            r"(?i)\b(?:non[\s\-]?profit|not[\s\-]for[\s\-]profit|501\s*\(?c\)?\s*\(?3\)?)",
            EntityType::Nonprofit,
        ),
    ]
    .into_iter()
    .map(|(pattern, entity)| (Regex::new(pattern).expect("valid regex"), entity))
    .collect()
});

impl FieldExtractor for EntityTypeExtractor {
    fn field(&self) -> FieldName {
        FieldName::EntityType
    }

    fn name(&self) -> &'static str {
        "entity_type"
    }

    fn try_extract(&self, text: &str) -> Option<Candidate> {
        ENTITY_PATTERNS
            .iter()
            .filter_map(|(re, entity)| re.find(text).map(|m| (m.start(), *entity)))
            .min_by_key(|(start, _)| *start)
            .map(|(_, entity)| Candidate::new(entity.label(), 90))
    }
}

// ---------------------------------------------------------------------------
// Business type
// ---------------------------------------------------------------------------

fn business_type_phrase(raw: &str) -> Option<String> {
    let words: Vec<String> = raw
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|w| !GENERIC_ADJECTIVES.contains(&w.as_str()))
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}

/// "start a political advising business", "open a coffee shop".
pub struct BusinessTypeExtractor;

impl FieldExtractor for BusinessTypeExtractor {
    fn field(&self) -> FieldName {
        FieldName::BusinessType
    }

    fn name(&self) -> &'static str {
        "business_type:venture"
    }

    fn try_extract(&self, text: &str) -> Option<Candidate> {
        static VENTURE_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                r"(?i)\b(?:start|starting|open|opening|launch|launching|run|running|build|building)\s+(?:up\s+)?(?:a|an|my|our)\s+((?:[a-z][a-z\-]*\s+){0,3}[a-z][a-z\-]*)\s+(?:business|company|firm|shop|agency|practice|store|service)\b",
            )
            .expect("valid regex")
        });

        VENTURE_RE
            .captures_iter(text)
            .find_map(|caps| business_type_phrase(&caps[1]))
            .map(|phrase| Candidate::new(phrase, 70))
    }
}

/// "in the restaurant industry".
pub struct IndustryExtractor;

impl FieldExtractor for IndustryExtractor {
    fn field(&self) -> FieldName {
        FieldName::BusinessType
    }

    fn name(&self) -> &'static str {
        "business_type:industry"
    }

    fn try_extract(&self, text: &str) -> Option<Candidate> {
        static INDUSTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                r"(?i)\bin\s+the\s+((?:[a-z][a-z\-]*\s+){0,2}[a-z][a-z\-]*)\s+(?:industry|space|sector|field)\b",
            )
            .expect("valid regex")
        });

        INDUSTRY_RE
            .captures_iter(text)
            .find_map(|caps| business_type_phrase(&caps[1]))
            .map(|phrase| Candidate::new(phrase, 60))
    }
}

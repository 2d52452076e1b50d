//! Per-field canonical validators.
//!
//! [`canonicalize`] turns a loosely-shaped value (from a pattern or from the
//! language model) into the field's canonical form; [`is_valid`] checks an
//! already-canonical value. Both extraction engines and the scorer share
//! these, so a value is "filled" by the same rule everywhere.

use std::sync::LazyLock;

use intake_shared::{EntityType, FieldName, Timeline};
use regex::Regex;

use crate::extractors::timeline::timeline_from_phrase;
use crate::states;

/// Longest free-text value kept in a profile.
pub const MAX_FREE_TEXT_CHARS: usize = 200;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-z0-9](?:[a-z0-9._%+\-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9\-]{0,61}[a-z0-9])?\.)+[a-z]{2,24}$",
    )
    .expect("valid regex")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+1\d{10}$").expect("valid regex"));

/// True when `value` is already in the canonical form for `field`.
pub fn is_valid(field: FieldName, value: &str) -> bool {
    match field {
        FieldName::CustomerEmail => is_valid_email(value),
        FieldName::CustomerPhone => PHONE_RE.is_match(value),
        FieldName::StateOfOperation => states::is_canonical(value),
        FieldName::EntityType => EntityType::ALL.iter().any(|e| e.label() == value),
        FieldName::Timeline => Timeline::ALL.iter().any(|t| t.label() == value),
        _ => is_valid_free_text(value),
    }
}

/// Canonicalise a raw value for `field`, or `None` if it cannot be made valid.
pub fn canonicalize(field: FieldName, raw: &str) -> Option<String> {
    let raw = raw.trim();
    let value = match field {
        FieldName::CustomerEmail => canonical_email(raw)?,
        FieldName::CustomerPhone => canonical_phone(raw)?,
        FieldName::StateOfOperation => states::lookup(raw)?.to_string(),
        FieldName::EntityType => EntityType::from_label(raw)?.label().to_string(),
        FieldName::Timeline => Timeline::from_label(raw)
            .or_else(|| timeline_from_phrase(raw))?
            .label()
            .to_string(),
        FieldName::CustomerName => title_case(&collapse(raw)),
        FieldName::BusinessType => collapse(raw).to_lowercase(),
        _ => collapse(raw),
    };
    is_valid(field, &value).then_some(value)
}

/// Lowercase, strip a `mailto:` prefix, and check strict syntax.
pub fn canonical_email(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_ascii_lowercase();
    let email = lowered.strip_prefix("mailto:").unwrap_or(lowered.as_str());
    is_valid_email(email).then(|| email.to_string())
}

fn is_valid_email(value: &str) -> bool {
    if !EMAIL_RE.is_match(value) {
        return false;
    }
    let local = value.split('@').next().unwrap_or_default();
    !local.contains("..")
}

/// Reduce to digits: 10 digits gain a `+1`, 11 digits starting with `1` gain `+`.
pub fn canonical_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => Some(format!("+1{digits}")),
        11 if digits.starts_with('1') => Some(format!("+{digits}")),
        _ => None,
    }
}

fn is_valid_free_text(value: &str) -> bool {
    !value.is_empty()
        && value.trim() == value
        && value.chars().count() <= MAX_FREE_TEXT_CHARS
        && value.chars().any(char::is_alphanumeric)
}

fn collapse(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', ',', ';', '!', '?'])
        .to_string()
}

/// Title-case words that are all one case; mixed-case words ("McDonald") stay.
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let lower = word.to_lowercase();
            let upper = word.to_uppercase();
            if word != lower && word != upper {
                return word.to_string();
            }
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

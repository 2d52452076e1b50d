//! Deterministic per-field extraction strategies.
//!
//! Each strategy implements [`FieldExtractor`]. The engine walks
//! [`default_extractors`] in order and keeps the first valid candidate per
//! field, so strategy order within a field is precedence order.

pub mod business;
pub mod contact;
pub mod location;
pub mod timeline;

use intake_shared::FieldName;

/// A value proposed by a strategy, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub value: String,
    pub confidence: u8,
}

impl Candidate {
    pub fn new(value: impl Into<String>, confidence: u8) -> Self {
        Self {
            value: value.into(),
            confidence,
        }
    }
}

/// One extraction strategy for one field.
pub trait FieldExtractor: Send + Sync {
    /// The field this strategy fills.
    fn field(&self) -> FieldName;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Propose a value from normalised transcript text.
    fn try_extract(&self, text: &str) -> Option<Candidate>;
}

/// The built-in strategies in evaluation order.
pub fn default_extractors() -> Vec<Box<dyn FieldExtractor>> {
    vec![
        Box::new(contact::EmailExtractor),
        Box::new(contact::PhoneExtractor),
        Box::new(contact::IntroducedNameExtractor),
        Box::new(contact::LowercaseNameExtractor),
        Box::new(business::TriggeredBusinessNameExtractor),
        Box::new(business::SuffixedBusinessNameExtractor),
        Box::new(business::EntityTypeExtractor),
        Box::new(business::BusinessTypeExtractor),
        Box::new(business::IndustryExtractor),
        Box::new(location::StateExtractor),
        Box::new(timeline::TimelineExtractor),
    ]
}

/// Strip sentence punctuation from the end of a word.
pub(crate) fn bare_word(word: &str) -> &str {
    word.trim_end_matches(['.', ',', '!', '?', ';', ':'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_follows_field_order() {
        let fields: Vec<FieldName> = default_extractors().iter().map(|e| e.field()).collect();
        let mut sorted = fields.clone();
        sorted.sort();
        assert_eq!(fields, sorted);
        assert_eq!(fields.first(), Some(&FieldName::CustomerEmail));
        assert_eq!(fields.last(), Some(&FieldName::Timeline));
    }

    #[test]
    fn every_stage_one_field_has_a_strategy() {
        let extractors = default_extractors();
        for field in &FieldName::ALL[..8] {
            assert!(
                extractors.iter().any(|e| e.field() == *field),
                "no strategy for {field}"
            );
        }
    }
}

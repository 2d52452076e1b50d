//! The pattern extraction engine: ordered strategies over normalised text.

use intake_shared::{ExtractedField, FieldSource, StructuredProfile};
use tracing::{debug, warn};

use crate::extractors::{FieldExtractor, default_extractors};
use crate::validators;

/// Runs the ordered strategy list and assembles a complete profile.
///
/// Stateless after construction, so one engine can be shared across tasks.
pub struct PatternExtractionEngine {
    extractors: Vec<Box<dyn FieldExtractor>>,
}

impl PatternExtractionEngine {
    /// Engine with the built-in strategies.
    pub fn new() -> Self {
        Self::with_extractors(default_extractors())
    }

    /// Engine with a custom strategy list, evaluated in the given order.
    pub fn with_extractors(extractors: Vec<Box<dyn FieldExtractor>>) -> Self {
        Self { extractors }
    }

    /// Extract every field the strategies can find from normalised text.
    ///
    /// The first strategy whose candidate validates fills the field; later
    /// strategies for that field are skipped. Candidates failing their
    /// validator are dropped and logged.
    pub fn extract(&self, canonical_text: &str) -> StructuredProfile {
        let mut profile = StructuredProfile::empty();

        for extractor in &self.extractors {
            let field = extractor.field();
            if profile.get(field).is_some() {
                continue;
            }

            let Some(candidate) = extractor.try_extract(canonical_text) else {
                continue;
            };

            if !validators::is_valid(field, &candidate.value) {
                warn!(
                    field = %field,
                    strategy = extractor.name(),
                    value = %candidate.value,
                    "pattern candidate failed validation, dropped"
                );
                continue;
            }

            debug!(
                field = %field,
                strategy = extractor.name(),
                confidence = candidate.confidence,
                "pattern match"
            );
            profile.set(
                field,
                Some(ExtractedField::new(
                    field,
                    candidate.value,
                    FieldSource::Pattern,
                    candidate.confidence,
                )),
            );
        }

        profile
    }
}

impl Default for PatternExtractionEngine {
    fn default() -> Self {
        Self::new()
    }
}

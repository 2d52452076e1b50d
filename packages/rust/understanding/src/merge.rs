//! Precedence between pattern and language-model values, within one
//! transcript and across a caller's calls.

use intake_extraction::has_legal_suffix;
use intake_shared::{ExtractedField, FieldKind, FieldName, FieldSource, StructuredProfile};

/// True when a pattern value must not be overridden by the model.
///
/// Format-exact fields always qualify. A business name qualifies when it
/// carries a legal suffix, since the pattern then matched its exact form.
pub fn pattern_is_authoritative(pattern: &ExtractedField) -> bool {
    match pattern.field.kind() {
        FieldKind::FormatExact => true,
        FieldKind::FreeText => {
            pattern.field == FieldName::BusinessName && has_legal_suffix(&pattern.value)
        }
    }
}

/// Merge validated model fields over the pattern profile.
///
/// Nulls are always filled. An existing pattern value is replaced only for
/// free-text fields where the model is strictly more confident. Returns the
/// merged profile and the number of fields taken from the model.
pub fn merge_language_fields(
    pattern: &StructuredProfile,
    language: impl IntoIterator<Item = ExtractedField>,
) -> (StructuredProfile, usize) {
    let mut merged = pattern.clone();
    let mut taken = 0;

    for candidate in language {
        let take = match pattern.get(candidate.field) {
            None => true,
            Some(existing) if pattern_is_authoritative(existing) => false,
            Some(existing) => candidate.confidence > existing.confidence,
        };
        if take {
            merged.set(candidate.field, Some(candidate));
            taken += 1;
        }
    }

    (merged, taken)
}

/// Fold one call's profile into the caller's accumulated profile.
///
/// Same rule as [`StructuredProfile::merge_from`], except that a model value
/// never replaces an authoritative pattern value stored by an earlier call.
/// Returns the fields that changed.
pub fn merge_into_accumulated(
    accumulated: &mut StructuredProfile,
    newer: &StructuredProfile,
) -> Vec<FieldName> {
    let mut admitted = newer.clone();
    for incoming in newer.filled() {
        let protected = incoming.source == FieldSource::LanguageModel
            && accumulated.get(incoming.field).is_some_and(|current| {
                current.source == FieldSource::Pattern && pattern_is_authoritative(current)
            });
        if protected {
            admitted.set(incoming.field, None);
        }
    }
    accumulated.merge_from(&admitted)
}

#[cfg(test)]
mod tests {
    use intake_shared::FieldSource;

    use super::*;

    fn pattern(field: FieldName, value: &str, confidence: u8) -> ExtractedField {
        ExtractedField::new(field, value, FieldSource::Pattern, confidence)
    }

    fn model(field: FieldName, value: &str, confidence: u8) -> ExtractedField {
        ExtractedField::new(field, value, FieldSource::LanguageModel, confidence)
    }

    fn profile_with(fields: &[ExtractedField]) -> StructuredProfile {
        let mut profile = StructuredProfile::empty();
        for f in fields {
            profile.set(f.field, Some(f.clone()));
        }
        profile
    }

    #[test]
    fn format_exact_pattern_values_win() {
        let base = profile_with(&[pattern(FieldName::CustomerEmail, "bill@clinton.org", 95)]);
        let (merged, taken) = merge_language_fields(
            &base,
            [model(FieldName::CustomerEmail, "william@clinton.org", 99)],
        );
        assert_eq!(merged.value(FieldName::CustomerEmail), Some("bill@clinton.org"));
        assert_eq!(taken, 0);
    }

    #[test]
    fn model_fills_nulls() {
        let base = StructuredProfile::empty();
        let (merged, taken) = merge_language_fields(
            &base,
            [
                model(FieldName::StateOfOperation, "Texas", 40),
                model(FieldName::TargetAudience, "first-time candidates", 75),
            ],
        );
        assert_eq!(merged.value(FieldName::StateOfOperation), Some("Texas"));
        assert_eq!(
            merged.get(FieldName::TargetAudience).unwrap().source,
            FieldSource::LanguageModel
        );
        assert_eq!(taken, 2);
    }

    #[test]
    fn free_text_needs_strictly_higher_confidence() {
        let base = profile_with(&[
            pattern(FieldName::BusinessType, "political advising", 70),
            pattern(FieldName::CustomerName, "Bill Clinton", 85),
        ]);
        let (merged, taken) = merge_language_fields(
            &base,
            [
                model(FieldName::BusinessType, "political consulting", 88),
                model(FieldName::CustomerName, "William Clinton", 85),
            ],
        );
        assert_eq!(merged.value(FieldName::BusinessType), Some("political consulting"));
        assert_eq!(merged.value(FieldName::CustomerName), Some("Bill Clinton"));
        assert_eq!(taken, 1);
    }

    #[test]
    fn suffixed_business_name_is_authoritative() {
        let suffixed = pattern(FieldName::BusinessName, "Katy Perry LLC", 85);
        let plain = pattern(FieldName::BusinessName, "sunny side up", 60);
        assert!(pattern_is_authoritative(&suffixed));
        assert!(!pattern_is_authoritative(&plain));

        let (merged, _) = merge_language_fields(
            &profile_with(&[suffixed]),
            [model(FieldName::BusinessName, "Katie Perry Music", 95)],
        );
        assert_eq!(merged.value(FieldName::BusinessName), Some("Katy Perry LLC"));
    }

    #[test]
    fn stored_pattern_email_survives_later_model_answer() {
        let mut accumulated =
            profile_with(&[pattern(FieldName::CustomerEmail, "bill@clinton.org", 95)]);
        let newer = profile_with(&[
            model(FieldName::CustomerEmail, "william@clinton.org", 99),
            model(FieldName::TargetAudience, "first-time candidates", 80),
        ]);

        let changed = merge_into_accumulated(&mut accumulated, &newer);

        assert_eq!(changed, vec![FieldName::TargetAudience]);
        assert_eq!(accumulated.value(FieldName::CustomerEmail), Some("bill@clinton.org"));
    }

    #[test]
    fn later_values_still_replace_when_allowed() {
        let mut accumulated = profile_with(&[
            pattern(FieldName::CustomerEmail, "bill@clinton.org", 95),
            pattern(FieldName::BusinessType, "political advising", 70),
            model(FieldName::StateOfOperation, "Texas", 60),
        ]);
        let newer = profile_with(&[
            pattern(FieldName::CustomerEmail, "wjc@clinton.org", 95),
            model(FieldName::BusinessType, "political consulting", 88),
            model(FieldName::StateOfOperation, "Arkansas", 75),
        ]);

        let mut changed = merge_into_accumulated(&mut accumulated, &newer);
        changed.sort();

        assert_eq!(changed.len(), 3);
        assert_eq!(accumulated.value(FieldName::CustomerEmail), Some("wjc@clinton.org"));
        assert_eq!(accumulated.value(FieldName::BusinessType), Some("political consulting"));
        assert_eq!(accumulated.value(FieldName::StateOfOperation), Some("Arkansas"));
    }
}

//! Language-model augmentation of pattern results.

use std::sync::Arc;
use std::time::Duration;

use intake_extraction::canonicalize;
use intake_shared::{
    AppConfig, AugmentationStatus, CallStage, ExtractedField, FieldName, FieldSource, Result,
    StructuredProfile, apply_penalty, language_model_api_key,
};
use tracing::{debug, info, instrument, warn};

use crate::merge::merge_language_fields;
use crate::openrouter::OpenRouterService;
use crate::service::{LanguageFields, LanguageService};

/// Result of augmenting one pattern profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Augmentation {
    pub profile: StructuredProfile,
    pub status: AugmentationStatus,
    /// Mean confidence over the profile's filled fields, penalised when degraded.
    pub confidence: u8,
}

/// Fills gaps the pattern engine left, under a fixed precedence policy.
///
/// Never fails: service errors, timeouts, and malformed replies all
/// degrade to the pattern-only profile.
pub struct LanguageUnderstandingEngine {
    service: Option<Arc<dyn LanguageService>>,
    confidence_threshold: u8,
    timeout: Duration,
    degraded_penalty: f64,
}

impl LanguageUnderstandingEngine {
    pub fn new(
        service: Option<Arc<dyn LanguageService>>,
        confidence_threshold: u8,
        timeout: Duration,
        degraded_penalty: f64,
    ) -> Self {
        Self {
            service,
            confidence_threshold,
            timeout,
            degraded_penalty,
        }
    }

    /// Build from configuration, connecting to OpenRouter when a key is set.
    ///
    /// A missing API key disables augmentation rather than failing.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let service: Option<Arc<dyn LanguageService>> = match language_model_api_key(config) {
            Ok(key) => Some(Arc::new(OpenRouterService::new(&config.language_model, key)?)),
            Err(e) => {
                info!(reason = %e, "language model augmentation disabled");
                None
            }
        };
        Ok(Self::with_service(service, config))
    }

    /// Build from configuration around an explicit service (or none).
    pub fn with_service(service: Option<Arc<dyn LanguageService>>, config: &AppConfig) -> Self {
        Self::new(
            service,
            config.language_model.confidence_threshold,
            Duration::from_millis(config.language_model.timeout_ms),
            config.extraction.degraded_confidence_penalty,
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.service.is_some()
    }

    /// Fields below the threshold in both this call's pattern profile and
    /// the caller's accumulated profile, nulls included.
    pub fn requested_fields(
        &self,
        pattern: &StructuredProfile,
        known: Option<&StructuredProfile>,
    ) -> Vec<FieldName> {
        FieldName::ALL
            .into_iter()
            .filter(|f| {
                let known = known.map_or(0, |k| k.confidence(*f));
                pattern.confidence(*f).max(known) < self.confidence_threshold
            })
            .collect()
    }

    /// Ask the service for the uncertain fields and merge its answers.
    ///
    /// `known` is the caller's accumulated profile from earlier calls; fields
    /// it already holds confidently are not requested again.
    #[instrument(skip_all, fields(stage = %stage))]
    pub async fn augment(
        &self,
        text: &str,
        pattern: &StructuredProfile,
        known: Option<&StructuredProfile>,
        stage: CallStage,
    ) -> Augmentation {
        let Some(service) = &self.service else {
            return pattern_only(pattern, AugmentationStatus::Disabled);
        };

        let requested = self.requested_fields(pattern, known);
        if requested.is_empty() {
            debug!("every field already confident, skipping language model");
            return pattern_only(pattern, AugmentationStatus::Skipped);
        }

        let reply = tokio::time::timeout(self.timeout, service.extract(text, stage, &requested));
        match reply.await {
            Ok(Ok(fields)) => {
                let accepted = accept_fields(fields, &requested);
                let (profile, fields_filled) = merge_language_fields(pattern, accepted);
                info!(
                    service = service.name(),
                    requested = requested.len(),
                    fields_filled,
                    "augmented with language model"
                );
                let confidence = profile_confidence(&profile);
                Augmentation {
                    profile,
                    status: AugmentationStatus::Augmented { fields_filled },
                    confidence,
                }
            }
            Ok(Err(e)) => self.degraded(pattern, e.to_string()),
            Err(_) => self.degraded(
                pattern,
                format!("timed out after {} ms", self.timeout.as_millis()),
            ),
        }
    }

    fn degraded(&self, pattern: &StructuredProfile, reason: String) -> Augmentation {
        warn!(%reason, "language model unavailable, keeping pattern results");
        Augmentation {
            profile: pattern.clone(),
            confidence: apply_penalty(profile_confidence(pattern), self.degraded_penalty),
            status: AugmentationStatus::Degraded { reason },
        }
    }
}

fn pattern_only(pattern: &StructuredProfile, status: AugmentationStatus) -> Augmentation {
    Augmentation {
        profile: pattern.clone(),
        confidence: profile_confidence(pattern),
        status,
    }
}

/// Keep requested, non-null answers that survive canonical validation.
fn accept_fields(fields: LanguageFields, requested: &[FieldName]) -> Vec<ExtractedField> {
    let mut accepted = Vec::new();
    for (field, candidate) in fields {
        if !requested.contains(&field) {
            debug!(field = %field, "ignoring unrequested field");
            continue;
        }
        let Some(raw) = candidate.value else {
            continue;
        };
        match canonicalize(field, &raw) {
            Some(value) => accepted.push(ExtractedField::new(
                field,
                value,
                FieldSource::LanguageModel,
                candidate.confidence,
            )),
            None => warn!(field = %field, value = %raw, "language model value failed validation, dropped"),
        }
    }
    accepted
}

/// Floored mean confidence over filled fields; 0 for an empty profile.
pub fn profile_confidence(profile: &StructuredProfile) -> u8 {
    let (sum, count) = profile
        .filled()
        .fold((0u32, 0u32), |(sum, count), f| (sum + u32::from(f.confidence), count + 1));
    if count == 0 { 0 } else { (sum / count) as u8 }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use intake_shared::IntakeError;

    use super::*;
    use crate::service::LanguageCandidate;

    struct Canned {
        reply: LanguageFields,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new(reply: impl IntoIterator<Item = (FieldName, LanguageCandidate)>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.into_iter().collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LanguageService for Canned {
        async fn extract(&self, _: &str, _: CallStage, _: &[FieldName]) -> Result<LanguageFields> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
        fn name(&self) -> &str {
            "canned"
        }
    }

    struct Failing;

    #[async_trait]
    impl LanguageService for Failing {
        async fn extract(&self, _: &str, _: CallStage, _: &[FieldName]) -> Result<LanguageFields> {
            Err(IntakeError::LanguageModel("HTTP 503".into()))
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    struct Slow;

    #[async_trait]
    impl LanguageService for Slow {
        async fn extract(&self, _: &str, _: CallStage, _: &[FieldName]) -> Result<LanguageFields> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(LanguageFields::new())
        }
        fn name(&self) -> &str {
            "slow"
        }
    }

    fn engine(service: Option<Arc<dyn LanguageService>>) -> LanguageUnderstandingEngine {
        LanguageUnderstandingEngine::new(service, 80, Duration::from_millis(50), 0.25)
    }

    fn pattern_profile() -> StructuredProfile {
        let mut profile = StructuredProfile::empty();
        for (field, value, confidence) in [
            (FieldName::CustomerEmail, "bill@clinton.org", 95),
            (FieldName::CustomerName, "Bill Clinton", 85),
            (FieldName::BusinessType, "political advising", 70),
        ] {
            profile.set(
                field,
                Some(ExtractedField::new(field, value, FieldSource::Pattern, confidence)),
            );
        }
        profile
    }

    #[tokio::test]
    async fn test_augment_merges_validated_answers() {
        let service = Canned::new([
            (FieldName::BusinessType, LanguageCandidate::new("Political Consulting", 90)),
            (FieldName::StateOfOperation, LanguageCandidate::new("ca", 70)),
            (FieldName::Timeline, LanguageCandidate::new("whenever, really", 60)),
            (FieldName::CustomerEmail, LanguageCandidate::new("other@clinton.org", 99)),
            (FieldName::TargetAudience, LanguageCandidate::absent()),
        ]);
        let engine = engine(Some(service.clone() as Arc<dyn LanguageService>));

        let result = engine
            .augment("transcript", &pattern_profile(), None, CallStage::FOUNDATION)
            .await;

        assert_eq!(result.status, AugmentationStatus::Augmented { fields_filled: 2 });
        let profile = &result.profile;
        assert_eq!(profile.value(FieldName::BusinessType), Some("political consulting"));
        assert_eq!(profile.value(FieldName::StateOfOperation), Some("California"));
        assert_eq!(profile.value(FieldName::Timeline), None);
        assert_eq!(profile.value(FieldName::CustomerEmail), Some("bill@clinton.org"));
        // (95 + 85 + 90 + 70) / 4
        assert_eq!(result.confidence, 85);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_degrades_with_penalty() {
        let result = engine(Some(Arc::new(Failing)))
            .augment("transcript", &pattern_profile(), None, CallStage::FOUNDATION)
            .await;

        assert!(result.status.is_degraded());
        assert_eq!(result.profile, pattern_profile());
        // floor(83 * 0.75)
        assert_eq!(result.confidence, 62);
    }

    #[tokio::test]
    async fn test_timeout_degrades() {
        let result = engine(Some(Arc::new(Slow)))
            .augment("transcript", &pattern_profile(), None, CallStage::FOUNDATION)
            .await;

        match result.status {
            AugmentationStatus::Degraded { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected degraded, got {other:?}"),
        }
        assert_eq!(result.profile, pattern_profile());
    }

    #[tokio::test]
    async fn test_disabled_keeps_pattern_without_penalty() {
        let result = engine(None)
            .augment("transcript", &pattern_profile(), None, CallStage::FOUNDATION)
            .await;

        assert_eq!(result.status, AugmentationStatus::Disabled);
        assert_eq!(result.confidence, 83);
    }

    #[tokio::test]
    async fn test_skipped_when_every_field_is_confident() {
        let mut profile = StructuredProfile::empty();
        for field in FieldName::ALL {
            let value = match field {
                FieldName::CustomerEmail => "a@b.co",
                FieldName::CustomerPhone => "+16195550100",
                FieldName::StateOfOperation => "Texas",
                FieldName::EntityType => "LLC",
                FieldName::Timeline => "Immediate",
                _ => "known",
            };
            profile.set(
                field,
                Some(ExtractedField::new(field, value, FieldSource::Pattern, 90)),
            );
        }
        let service = Canned::new(LanguageFields::new());
        let result = engine(Some(service.clone() as Arc<dyn LanguageService>))
            .augment("transcript", &profile, None, CallStage::LAUNCH_STRATEGY)
            .await;

        assert_eq!(result.status, AugmentationStatus::Skipped);
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_requested_fields_below_threshold() {
        let requested = engine(None).requested_fields(&pattern_profile(), None);
        assert!(!requested.contains(&FieldName::CustomerEmail));
        assert!(!requested.contains(&FieldName::CustomerName));
        assert!(requested.contains(&FieldName::BusinessType));
        assert!(requested.contains(&FieldName::Timeline));
        assert_eq!(requested.len(), FieldName::ALL.len() - 2);
    }

    #[test]
    fn test_requested_fields_skip_confidently_known() {
        let mut known = StructuredProfile::empty();
        known.set(
            FieldName::BusinessType,
            Some(ExtractedField::new(
                FieldName::BusinessType,
                "political consulting",
                FieldSource::LanguageModel,
                88,
            )),
        );
        known.set(
            FieldName::Timeline,
            Some(ExtractedField::new(FieldName::Timeline, "Immediate", FieldSource::Pattern, 50)),
        );

        let requested = engine(None).requested_fields(&pattern_profile(), Some(&known));
        assert!(!requested.contains(&FieldName::BusinessType));
        assert!(requested.contains(&FieldName::Timeline));
        assert_eq!(requested.len(), FieldName::ALL.len() - 3);
    }

    #[tokio::test]
    async fn test_known_fields_are_not_sent_to_the_service() {
        struct Recording(std::sync::Mutex<Vec<FieldName>>);

        #[async_trait]
        impl LanguageService for Recording {
            async fn extract(
                &self,
                _: &str,
                _: CallStage,
                fields: &[FieldName],
            ) -> Result<LanguageFields> {
                self.0.lock().unwrap().extend_from_slice(fields);
                Ok(LanguageFields::new())
            }
            fn name(&self) -> &str {
                "recording"
            }
        }

        let mut known = StructuredProfile::empty();
        known.set(
            FieldName::StateOfOperation,
            Some(ExtractedField::new(
                FieldName::StateOfOperation,
                "Arkansas",
                FieldSource::Pattern,
                90,
            )),
        );
        let service = Arc::new(Recording(std::sync::Mutex::new(Vec::new())));
        engine(Some(service.clone() as Arc<dyn LanguageService>))
            .augment("transcript", &StructuredProfile::empty(), Some(&known), CallStage::FOUNDATION)
            .await;

        let sent = service.0.lock().unwrap().clone();
        assert!(!sent.contains(&FieldName::StateOfOperation));
        assert!(sent.contains(&FieldName::CustomerEmail));
    }

    #[test]
    fn test_profile_confidence_floor_mean() {
        assert_eq!(profile_confidence(&StructuredProfile::empty()), 0);
        assert_eq!(profile_confidence(&pattern_profile()), 83);
    }
}

//! End-to-end intake pipeline: transcript → normalize → extract → augment → merge → score.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use intake_extraction::{PatternExtractionEngine, normalize};
use intake_shared::{
    AppConfig, AugmentationStatus, CallRecord, CallStage, CallerId, CompletenessResult,
    IntakeError, Result, StagePrompt, StructuredProfile, TranscriptInput,
};
use intake_storage::{ProfileStore, StoredProfile, UpsertOutcome};
use intake_understanding::{
    LanguageService, LanguageUnderstandingEngine, merge_into_accumulated,
};

use crate::prompt::StagePromptGenerator;
use crate::scoring::CompletenessScorer;

/// Result of processing one transcript.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptOutcome {
    pub caller: CallerId,
    pub stage: CallStage,
    /// The caller's accumulated profile after this call.
    pub profile: StructuredProfile,
    /// What this transcript alone yielded.
    pub extracted: StructuredProfile,
    pub completeness: CompletenessResult,
    pub augmentation: AugmentationStatus,
    /// Stored profile version, `None` when nothing was persisted.
    pub version: Option<u64>,
}

/// How the read-merge-write loop ended.
enum Persisted {
    Written {
        profile: StructuredProfile,
        version: u64,
    },
    /// Every attempt conflicted; `profile` is the last merge that was tried.
    Conflicted {
        profile: StructuredProfile,
        attempts: u32,
    },
}

/// Wires the extraction engines, scorer, and prompt generator around a store.
///
/// Holds no per-caller state, so one instance can be shared across tasks.
pub struct IntakeEngine {
    store: Arc<dyn ProfileStore>,
    patterns: PatternExtractionEngine,
    understanding: LanguageUnderstandingEngine,
    scorer: CompletenessScorer,
    prompts: StagePromptGenerator,
    min_transcript_chars: usize,
    max_upsert_retries: u32,
    degraded_penalty: f64,
}

impl IntakeEngine {
    /// Build with an explicit language service (or none).
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn ProfileStore>,
        service: Option<Arc<dyn LanguageService>>,
    ) -> Result<Self> {
        Self::assemble(
            config,
            store,
            LanguageUnderstandingEngine::with_service(service, config),
        )
    }

    /// Build from configuration, connecting to the configured language model when a key is set.
    pub fn from_config(config: &AppConfig, store: Arc<dyn ProfileStore>) -> Result<Self> {
        Self::assemble(config, store, LanguageUnderstandingEngine::from_config(config)?)
    }

    fn assemble(
        config: &AppConfig,
        store: Arc<dyn ProfileStore>,
        understanding: LanguageUnderstandingEngine,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            patterns: PatternExtractionEngine::new(),
            understanding,
            scorer: CompletenessScorer::from_config(config)?,
            prompts: StagePromptGenerator::from_config(config)?,
            min_transcript_chars: config.extraction.min_transcript_chars,
            max_upsert_retries: config.storage.max_upsert_retries,
            degraded_penalty: config.extraction.degraded_confidence_penalty,
        })
    }

    pub fn augmentation_enabled(&self) -> bool {
        self.understanding.is_enabled()
    }

    /// Process one call's transcript and fold the result into the caller's profile.
    ///
    /// 1. Normalize the raw text
    /// 2. Pattern extraction
    /// 3. Language-model augmentation (never fails; degrades instead)
    /// 4. Merge into the stored profile with optimistic retries
    /// 5. Score the current stage and record the call
    ///
    /// When the write keeps conflicting, the error still carries what this
    /// call extracted and how it scored.
    #[instrument(skip_all, fields(caller = %input.caller, stage = %input.call_stage))]
    pub async fn process_transcript(&self, input: &TranscriptInput) -> Result<TranscriptOutcome> {
        let start = Instant::now();
        let stage = input.call_stage;

        // --- Phase 1: Normalize ---
        let text = normalize(&input.raw_text);
        let length = text.chars().count();
        if length < self.min_transcript_chars {
            warn!(
                length,
                min = self.min_transcript_chars,
                "transcript too short to extract from, skipping"
            );
            return Ok(TranscriptOutcome {
                caller: input.caller.clone(),
                stage,
                profile: StructuredProfile::empty(),
                extracted: StructuredProfile::empty(),
                completeness: CompletenessResult::zero(stage, self.scorer.required(stage)),
                augmentation: AugmentationStatus::Skipped,
                version: None,
            });
        }

        // --- Phase 2: Pattern extraction ---
        let pattern = self.patterns.extract(&text);
        debug!(filled = pattern.filled_count(), "pattern extraction complete");

        // --- Phase 3: Augmentation ---
        let known = self.store.get_profile(&input.caller).await?;
        let augmentation = self
            .understanding
            .augment(&text, &pattern, known.as_ref().map(|s| &s.profile), stage)
            .await;
        let extracted = augmentation.profile;

        // --- Phase 4: Merge and persist ---
        let (profile, version) = match self.persist(&input.caller, &extracted).await? {
            Persisted::Written { profile, version } => (profile, version),
            Persisted::Conflicted { profile, attempts } => {
                let completeness = self.score_call(&profile, stage, &augmentation.status);
                return Err(IntakeError::StorageConflict {
                    caller: input.caller.to_string(),
                    attempts,
                    extracted: Box::new(extracted),
                    completeness: Box::new(completeness),
                });
            }
        };

        // --- Phase 5: Score and record ---
        let completeness = self.score_call(&profile, stage, &augmentation.status);

        self.store
            .record_call(&CallRecord {
                id: Uuid::now_v7().to_string(),
                caller: input.caller.clone(),
                stage,
                completeness: completeness.score,
                confidence: completeness.confidence,
                augmentation: augmentation.status.as_str().to_string(),
                profile: profile.clone(),
                created_at: Utc::now(),
            })
            .await?;

        info!(
            extracted = extracted.filled_count(),
            known = profile.filled_count(),
            score = completeness.score,
            confidence = completeness.confidence,
            augmentation = augmentation.status.as_str(),
            version,
            elapsed_ms = start.elapsed().as_millis(),
            "transcript processed"
        );

        Ok(TranscriptOutcome {
            caller: input.caller.clone(),
            stage,
            profile,
            extracted,
            completeness,
            augmentation: augmentation.status,
            version: Some(version),
        })
    }

    /// Stage score for this call, penalised when augmentation degraded.
    fn score_call(
        &self,
        profile: &StructuredProfile,
        stage: CallStage,
        augmentation: &AugmentationStatus,
    ) -> CompletenessResult {
        let completeness = self.scorer.score(profile, stage);
        if augmentation.is_degraded() {
            completeness.penalized(self.degraded_penalty)
        } else {
            completeness
        }
    }

    /// Read-merge-write until the version check passes or retries run out.
    async fn persist(&self, caller: &CallerId, extracted: &StructuredProfile) -> Result<Persisted> {
        let attempts = self.max_upsert_retries.saturating_add(1);
        let mut last_merged = StructuredProfile::empty();

        for attempt in 1..=attempts {
            let stored = self.store.get_profile(caller).await?;
            let (mut merged, expected) = match stored {
                Some(StoredProfile { profile, version }) => (profile, Some(version)),
                None => (StructuredProfile::empty(), None),
            };

            let changed = merge_into_accumulated(&mut merged, extracted);
            if let (Some(version), true) = (expected, changed.is_empty()) {
                debug!(version, "profile unchanged, skipping write");
                return Ok(Persisted::Written {
                    profile: merged,
                    version,
                });
            }

            match self.store.upsert_profile(caller, &merged, expected).await? {
                UpsertOutcome::Written { version } => {
                    debug!(version, changed = changed.len(), attempt, "profile written");
                    return Ok(Persisted::Written {
                        profile: merged,
                        version,
                    });
                }
                UpsertOutcome::Conflict => {
                    warn!(attempt, attempts, "profile changed concurrently, retrying");
                    last_merged = merged;
                }
            }
        }

        warn!(attempts, "profile write kept conflicting, giving up");
        Ok(Persisted::Conflicted {
            profile: last_merged,
            attempts,
        })
    }

    /// Script for the caller's next call, built from their stored profile.
    #[instrument(skip_all, fields(caller = %caller))]
    pub async fn generate_prompt(&self, caller: &CallerId) -> Result<StagePrompt> {
        let stored = self.store.get_profile(caller).await?;
        let prompt = self
            .prompts
            .generate(caller, stored.as_ref().map(|s| &s.profile))?;
        info!(
            stage = prompt.stage.number(),
            missing = prompt.missing_facts.len(),
            "prompt generated"
        );
        Ok(prompt)
    }

    /// Score the stored profile for `stage` without processing a call.
    pub async fn score(&self, caller: &CallerId, stage: CallStage) -> Result<CompletenessResult> {
        let profile = self
            .store
            .get_profile(caller)
            .await?
            .map(|s| s.profile)
            .unwrap_or_default();
        Ok(self.scorer.score(&profile, stage))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use intake_shared::FieldName;
    use intake_storage::{MemoryStore, Storage};
    use intake_understanding::{LanguageCandidate, LanguageFields};

    use super::*;

    fn fixture(name: &str) -> String {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/transcripts")
            .join(name);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("read fixture {}: {e}", path.display()))
    }

    fn caller(id: &str) -> CallerId {
        CallerId::new(id).unwrap()
    }

    fn input(text: &str, stage: CallStage, id: &str) -> TranscriptInput {
        TranscriptInput::new(text, stage, caller(id))
    }

    fn engine(store: Arc<dyn ProfileStore>) -> IntakeEngine {
        IntakeEngine::new(&AppConfig::default(), store, None).unwrap()
    }

    struct Canned(LanguageFields);

    #[async_trait]
    impl LanguageService for Canned {
        async fn extract(&self, _: &str, _: CallStage, _: &[FieldName]) -> Result<LanguageFields> {
            Ok(self.0.clone())
        }
        fn name(&self) -> &str {
            "canned"
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

    /// Reports a conflict on the first `conflicts` writes, then delegates.
    struct Contended {
        inner: MemoryStore,
        conflicts: usize,
        writes: AtomicUsize,
    }

    impl Contended {
        fn new(conflicts: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                conflicts,
                writes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProfileStore for Contended {
        async fn get_profile(&self, caller: &CallerId) -> Result<Option<StoredProfile>> {
            self.inner.get_profile(caller).await
        }
        async fn upsert_profile(
            &self,
            caller: &CallerId,
            profile: &StructuredProfile,
            expected_version: Option<u64>,
        ) -> Result<UpsertOutcome> {
            if self.writes.fetch_add(1, Ordering::SeqCst) < self.conflicts {
                return Ok(UpsertOutcome::Conflict);
            }
            self.inner
                .upsert_profile(caller, profile, expected_version)
                .await
        }
        async fn record_call(&self, record: &CallRecord) -> Result<()> {
            self.inner.record_call(record).await
        }
        async fn list_calls(&self, caller: &CallerId) -> Result<Vec<CallRecord>> {
            self.inner.list_calls(caller).await
        }
    }

    #[tokio::test]
    async fn test_scenario_a_fixture() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store.clone());
        let text = fixture("scenario_a.txt");

        let outcome = engine
            .process_transcript(&input(&text, CallStage::FOUNDATION, "bill"))
            .await
            .unwrap();

        let p = &outcome.profile;
        assert_eq!(p.value(FieldName::CustomerName), Some("Bill Clinton"));
        assert_eq!(p.value(FieldName::CustomerEmail), Some("bill@clinton.org"));
        assert_eq!(p.value(FieldName::BusinessType), Some("political advising"));
        assert_eq!(p.value(FieldName::EntityType), Some("LLC"));
        assert_eq!(p.value(FieldName::StateOfOperation), Some("California"));
        assert_eq!(p.value(FieldName::Timeline), Some("Immediate"));
        assert_eq!(outcome.augmentation, AugmentationStatus::Disabled);
        // 6 of 8 foundation fields
        assert_eq!(outcome.completeness.score, 75);
        assert_eq!(
            outcome.completeness.missing_required.iter().copied().collect::<Vec<_>>(),
            vec![FieldName::CustomerPhone, FieldName::BusinessName]
        );
        assert_eq!(outcome.version, Some(1));
        assert_eq!(store.list_calls(&caller("bill")).await.unwrap().len(), 1);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["augmentation"]["status"], "disabled");
        assert_eq!(json["profile"]["customer_phone"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_scenario_b_fixture() {
        let engine = engine(Arc::new(MemoryStore::new()));
        let text = fixture("scenario_b.txt");

        let outcome = engine
            .process_transcript(&input(&text, CallStage::FOUNDATION, "katie"))
            .await
            .unwrap();

        let p = &outcome.profile;
        assert_eq!(p.value(FieldName::CustomerName), Some("Katie Berry"));
        assert_eq!(p.value(FieldName::CustomerPhone), Some("+16196544321"));
        assert_eq!(p.value(FieldName::BusinessName), Some("Katy Perry LLC"));
        assert_eq!(p.value(FieldName::CustomerEmail), Some("katie@perry.com"));
        assert_eq!(p.value(FieldName::StateOfOperation), Some("California"));
    }

    #[tokio::test]
    async fn test_empty_transcript_leaves_storage_untouched() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store.clone());

        let outcome = engine
            .process_transcript(&input("   ", CallStage::FOUNDATION, "nobody"))
            .await
            .unwrap();

        assert!(outcome.profile.is_empty());
        assert_eq!(outcome.completeness.score, 0);
        assert_eq!(outcome.completeness.confidence, 0);
        assert_eq!(outcome.augmentation, AugmentationStatus::Skipped);
        assert_eq!(outcome.version, None);
        assert!(store.get_profile(&caller("nobody")).await.unwrap().is_none());
        assert!(store.list_calls(&caller("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_transcript_twice_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store.clone());
        let text = fixture("scenario_a.txt");
        let call = input(&text, CallStage::FOUNDATION, "bill");

        let first = engine.process_transcript(&call).await.unwrap();
        let second = engine.process_transcript(&call).await.unwrap();

        assert_eq!(first.profile, second.profile);
        assert_eq!(first.completeness, second.completeness);
        // No new fields, so no new version.
        assert_eq!(second.version, Some(1));
    }

    #[tokio::test]
    async fn test_profile_accumulates_across_calls() {
        let engine = engine(Arc::new(MemoryStore::new()));
        let first = engine
            .process_transcript(&input(
                "My name is Bill Clinton. I want to start a political advising business.",
                CallStage::FOUNDATION,
                "bill",
            ))
            .await
            .unwrap();
        let second = engine
            .process_transcript(&input(
                "Oh and my email is bill at clinton dot org, we are based in Arkansas.",
                CallStage::FOUNDATION,
                "bill",
            ))
            .await
            .unwrap();

        assert!(second.completeness.score >= first.completeness.score);
        let p = &second.profile;
        assert_eq!(p.value(FieldName::CustomerName), Some("Bill Clinton"));
        assert_eq!(p.value(FieldName::CustomerEmail), Some("bill@clinton.org"));
        assert_eq!(p.value(FieldName::StateOfOperation), Some("Arkansas"));
        assert_eq!(second.extracted.value(FieldName::CustomerName), None);
        assert_eq!(second.version, Some(2));
    }

    #[tokio::test]
    async fn test_language_model_fills_later_stage() {
        let reply: LanguageFields = [
            (
                FieldName::TargetAudience,
                LanguageCandidate::new("first-time political candidates", 80),
            ),
            (
                FieldName::BrandPersonality,
                LanguageCandidate::new("warm and seasoned", 75),
            ),
        ]
        .into_iter()
        .collect();
        let service: Arc<dyn LanguageService> = Arc::new(Canned(reply));
        let engine =
            IntakeEngine::new(&AppConfig::default(), Arc::new(MemoryStore::new()), Some(service))
                .unwrap();

        let outcome = engine
            .process_transcript(&input(
                "We mostly help people running for office the first time, and we keep things warm.",
                CallStage::BRAND_IDENTITY,
                "bill",
            ))
            .await
            .unwrap();

        assert_eq!(
            outcome.augmentation,
            AugmentationStatus::Augmented { fields_filled: 2 }
        );
        assert_eq!(outcome.completeness.score, 50);
        // (80 + 75) / 2
        assert_eq!(outcome.completeness.confidence, 77);
    }

    #[tokio::test]
    async fn test_model_never_overrides_stored_pattern_email() {
        let store = Arc::new(MemoryStore::new());
        engine(store.clone())
            .process_transcript(&input(
                "Hi, this is Bill Clinton. My email address is bill at clinton dot org.",
                CallStage::FOUNDATION,
                "bill",
            ))
            .await
            .unwrap();

        let reply: LanguageFields = [
            (
                FieldName::CustomerEmail,
                LanguageCandidate::new("william@clinton.org", 99),
            ),
            (
                FieldName::TargetAudience,
                LanguageCandidate::new("first-time political candidates", 80),
            ),
        ]
        .into_iter()
        .collect();
        let service: Arc<dyn LanguageService> = Arc::new(Canned(reply));
        let engine = IntakeEngine::new(&AppConfig::default(), store.clone(), Some(service)).unwrap();

        let outcome = engine
            .process_transcript(&input(
                "We mostly help people running for office the first time.",
                CallStage::BRAND_IDENTITY,
                "bill",
            ))
            .await
            .unwrap();

        assert_eq!(
            outcome.augmentation,
            AugmentationStatus::Augmented { fields_filled: 1 }
        );
        let stored = store.get_profile(&caller("bill")).await.unwrap().unwrap();
        let email = stored.profile.get(FieldName::CustomerEmail).unwrap();
        assert_eq!(email.value, "bill@clinton.org");
        assert_eq!(email.source, intake_shared::FieldSource::Pattern);
        assert_eq!(
            stored.profile.value(FieldName::TargetAudience),
            Some("first-time political candidates")
        );
    }

    #[tokio::test]
    async fn test_timeout_degrades_but_keeps_pattern_results() {
        let mut config = AppConfig::default();
        config.language_model.timeout_ms = 50;
        let service: Arc<dyn LanguageService> = Arc::new(Slow);
        let engine = IntakeEngine::new(&config, Arc::new(MemoryStore::new()), Some(service)).unwrap();
        let text = fixture("scenario_a.txt");

        let outcome = engine
            .process_transcript(&input(&text, CallStage::FOUNDATION, "bill"))
            .await
            .unwrap();

        assert!(outcome.augmentation.is_degraded());
        assert_eq!(outcome.profile.value(FieldName::CustomerName), Some("Bill Clinton"));
        assert_eq!(outcome.completeness.score, 75);
        let confidence = outcome.completeness.confidence;
        assert!(confidence > 0);

        let undegraded = engine.score(&caller("bill"), CallStage::FOUNDATION).await.unwrap();
        assert!(confidence < undegraded.confidence);
    }

    #[tokio::test]
    async fn test_conflict_is_retried() {
        let store = Arc::new(Contended::new(2));
        let engine = engine(store.clone());
        let text = fixture("scenario_a.txt");

        let outcome = engine
            .process_transcript(&input(&text, CallStage::FOUNDATION, "bill"))
            .await
            .unwrap();

        assert_eq!(outcome.version, Some(1));
        assert_eq!(store.writes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_conflict_exhaustion_is_an_error() {
        let store = Arc::new(Contended::new(usize::MAX));
        let engine = engine(store.clone());
        let text = fixture("scenario_a.txt");

        let err = engine
            .process_transcript(&input(&text, CallStage::FOUNDATION, "bill"))
            .await
            .unwrap_err();

        match err {
            IntakeError::StorageConflict {
                caller,
                attempts,
                extracted,
                completeness,
            } => {
                assert_eq!(caller, "bill");
                assert_eq!(attempts, 4);
                assert_eq!(extracted.value(FieldName::CustomerEmail), Some("bill@clinton.org"));
                assert_eq!(extracted.value(FieldName::CustomerName), Some("Bill Clinton"));
                assert_eq!(completeness.score, 75);
                assert_eq!(
                    completeness.missing_required.iter().copied().collect::<Vec<_>>(),
                    vec![FieldName::CustomerPhone, FieldName::BusinessName]
                );
            }
            other => panic!("expected StorageConflict, got {other:?}"),
        }
        assert!(store.list_calls(&caller("bill")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_calls_keep_both_fields() {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(engine(store.clone()));

        let a = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .process_transcript(&input(
                        "My name is Bill Clinton and I am calling about my company.",
                        CallStage::FOUNDATION,
                        "bill",
                    ))
                    .await
            })
        };
        let b = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .process_transcript(&input(
                        "You can reach me at bill at clinton dot org any time.",
                        CallStage::FOUNDATION,
                        "bill",
                    ))
                    .await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let stored = store.get_profile(&caller("bill")).await.unwrap().unwrap();
        assert_eq!(stored.profile.value(FieldName::CustomerName), Some("Bill Clinton"));
        assert_eq!(stored.profile.value(FieldName::CustomerEmail), Some("bill@clinton.org"));
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_prompt_progresses_with_profile() {
        let engine = engine(Arc::new(MemoryStore::new()));
        let bill = caller("bill");

        let fresh = engine.generate_prompt(&bill).await.unwrap();
        assert_eq!(fresh.stage, CallStage::FOUNDATION);
        assert!(fresh.known_facts.is_empty());

        let text = fixture("scenario_a.txt");
        engine
            .process_transcript(&input(&text, CallStage::FOUNDATION, "bill"))
            .await
            .unwrap();
        let next = engine.generate_prompt(&bill).await.unwrap();
        assert_eq!(next.stage, CallStage::FOUNDATION);
        assert_eq!(
            next.missing_facts,
            vec![FieldName::CustomerPhone, FieldName::BusinessName]
        );
        assert!(next.rendered_text.contains("Greet Bill Clinton warmly"));
        assert_ne!(next.fingerprint, fresh.fingerprint);

        let again = engine.generate_prompt(&bill).await.unwrap();
        assert_eq!(again.rendered_text, next.rendered_text);
    }

    #[tokio::test]
    async fn test_libsql_store_end_to_end() {
        let tmp = std::env::temp_dir().join(format!("intake_core_test_{}.db", Uuid::now_v7()));
        let store: Arc<dyn ProfileStore> = Arc::new(Storage::open(&tmp).await.unwrap());
        let engine = engine(store.clone());
        let text = fixture("scenario_b.txt");

        engine
            .process_transcript(&input(&text, CallStage::FOUNDATION, "katie"))
            .await
            .unwrap();

        let stored = store.get_profile(&caller("katie")).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.profile.value(FieldName::BusinessName), Some("Katy Perry LLC"));
        let calls = store.list_calls(&caller("katie")).await.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].augmentation, "disabled");
        assert!(calls[0].completeness > 0);
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IntakeEngine>();
    }
}

//! Stage completeness and confidence scoring.

use std::collections::{BTreeMap, BTreeSet};

use intake_extraction::is_valid;
use intake_shared::{
    AppConfig, CallStage, CompletenessResult, ExtractedField, FieldName, Result, StageDefinition,
    StructuredProfile,
};

/// Scores a cumulative profile against one stage's required fields.
///
/// Scores are derived on demand and never stored as the source of truth.
#[derive(Debug, Clone)]
pub struct CompletenessScorer {
    stages: Vec<StageDefinition>,
    weights: BTreeMap<FieldName, u32>,
}

impl CompletenessScorer {
    pub fn new(stages: Vec<StageDefinition>, weights: BTreeMap<FieldName, u32>) -> Self {
        Self { stages, weights }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(config.stages.clone(), config.scoring.weights()?))
    }

    /// The definition for `stage`, if configured.
    pub fn stage(&self, stage: CallStage) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.number == stage.number())
    }

    /// Required fields of `stage`; empty when the stage is not configured.
    pub fn required(&self, stage: CallStage) -> &[FieldName] {
        self.stage(stage)
            .map(|s| s.required_fields.as_slice())
            .unwrap_or_default()
    }

    pub fn score(&self, profile: &StructuredProfile, stage: CallStage) -> CompletenessResult {
        let required = self.required(stage);
        if required.is_empty() {
            return CompletenessResult::zero(stage, required);
        }

        let mut missing = BTreeSet::new();
        let mut filled = 0usize;
        let mut weighted_sum = 0u64;
        let mut total_weight = 0u64;

        for field in required {
            match filled_value(profile, *field) {
                Some(entry) => {
                    filled += 1;
                    let weight = u64::from(self.weight(*field));
                    weighted_sum += weight * u64::from(entry.confidence);
                    total_weight += weight;
                }
                None => {
                    missing.insert(*field);
                }
            }
        }

        let score = (100 * filled / required.len()) as u8;
        let confidence = if total_weight == 0 {
            0
        } else {
            (weighted_sum / total_weight) as u8
        };

        CompletenessResult {
            stage,
            score,
            missing_required: missing,
            confidence,
        }
    }

    /// Number of consecutive stages, from stage 1, whose required fields are all filled.
    pub fn completed_stages(&self, profile: &StructuredProfile) -> usize {
        CallStage::all()
            .into_iter()
            .take_while(|stage| self.score(profile, *stage).is_complete())
            .count()
    }

    fn weight(&self, field: FieldName) -> u32 {
        self.weights.get(&field).copied().unwrap_or(1)
    }
}

/// The entry for `field` when it is non-null and passes the field validator.
pub(crate) fn filled_value(profile: &StructuredProfile, field: FieldName) -> Option<&ExtractedField> {
    profile.get(field).filter(|entry| is_valid(field, &entry.value))
}

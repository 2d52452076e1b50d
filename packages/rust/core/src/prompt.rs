//! Personalised scripts for a caller's next call.
//!
//! The stage is chosen from the accumulated profile: the first stage whose
//! required fields are not all filled, counting only an unbroken run of
//! completed stages from stage 1. The stage template is then rendered with
//! everything already known so the assistant never asks for it again.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use intake_shared::{
    AppConfig, CallStage, CallerId, FieldName, IntakeError, Result, StagePrompt,
    StructuredProfile,
};

use crate::scoring::{CompletenessScorer, filled_value};

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("valid regex"));

const NAME_FALLBACK: &str = "there";
const BUSINESS_FALLBACK: &str = "your business";
const NO_FACTS: &str = "- nothing yet";
const NO_QUESTIONS: &str = "- nothing left to ask; confirm the details above";

pub struct StagePromptGenerator {
    scorer: CompletenessScorer,
}

impl StagePromptGenerator {
    pub fn new(scorer: CompletenessScorer) -> Self {
        Self { scorer }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(CompletenessScorer::from_config(config)?))
    }

    /// `min(4, 1 + completed)` where `completed` counts consecutive finished stages.
    pub fn select_stage(&self, profile: Option<&StructuredProfile>) -> CallStage {
        let completed = profile.map_or(0, |p| self.scorer.completed_stages(p));
        let stages = CallStage::all();
        stages[completed.min(stages.len() - 1)]
    }

    /// Render the next call's script. `None` means a caller we have never heard from.
    #[instrument(skip_all, fields(caller = %caller))]
    pub fn generate(
        &self,
        caller: &CallerId,
        profile: Option<&StructuredProfile>,
    ) -> Result<StagePrompt> {
        let stage = self.select_stage(profile);
        let definition = self.scorer.stage(stage).ok_or_else(|| {
            IntakeError::config(format!("no template configured for stage {stage}"))
        })?;

        let empty = StructuredProfile::empty();
        let profile = profile.unwrap_or(&empty);

        let known_facts: BTreeMap<FieldName, String> = FieldName::ALL
            .into_iter()
            .filter_map(|f| filled_value(profile, f).map(|e| (f, e.value.clone())))
            .collect();
        let missing_facts: Vec<FieldName> = self
            .scorer
            .score(profile, stage)
            .missing_required
            .into_iter()
            .collect();

        let rendered_text = render(
            &definition.template,
            &Placeholders {
                stage,
                stage_name: &definition.name,
                known_facts: &known_facts,
                missing_facts: &missing_facts,
            },
        );
        let fingerprint = fingerprint(&rendered_text);

        debug!(
            stage = stage.number(),
            known = known_facts.len(),
            missing = missing_facts.len(),
            %fingerprint,
            "stage prompt rendered"
        );

        Ok(StagePrompt {
            caller: caller.clone(),
            stage,
            stage_name: definition.name.clone(),
            rendered_text,
            known_facts,
            missing_facts,
            fingerprint,
        })
    }
}

struct Placeholders<'a> {
    stage: CallStage,
    stage_name: &'a str,
    known_facts: &'a BTreeMap<FieldName, String>,
    missing_facts: &'a [FieldName],
}

impl Placeholders<'_> {
    fn lookup(&self, name: &str) -> Option<String> {
        let value = match name {
            "stage_number" => self.stage.number().to_string(),
            "stage_name" => self.stage_name.to_string(),
            "customer_name" => self
                .known_facts
                .get(&FieldName::CustomerName)
                .map_or(NAME_FALLBACK, String::as_str)
                .to_string(),
            "business_name" => self
                .known_facts
                .get(&FieldName::BusinessName)
                .map_or(BUSINESS_FALLBACK, String::as_str)
                .to_string(),
            "known_facts" => format_facts(self.known_facts),
            "missing_questions" => format_questions(self.missing_facts),
            _ => return None,
        };
        Some(value)
    }
}

/// Single-pass substitution; unknown placeholders stay as written.
fn render(template: &str, placeholders: &Placeholders<'_>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| {
            placeholders
                .lookup(&caps[1])
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn format_facts(facts: &BTreeMap<FieldName, String>) -> String {
    if facts.is_empty() {
        return NO_FACTS.to_string();
    }
    facts
        .iter()
        .map(|(field, value)| format!("- {}: {value}", field.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_questions(missing: &[FieldName]) -> String {
    if missing.is_empty() {
        return NO_QUESTIONS.to_string();
    }
    missing
        .iter()
        .enumerate()
        .map(|(i, field)| format!("{}. {}", i + 1, field.question()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

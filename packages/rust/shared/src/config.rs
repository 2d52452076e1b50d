//! Application configuration for call intake.
//!
//! User config lives at `~/.intake/intake.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IntakeError, Result};
use crate::types::{CallStage, FieldName};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "intake.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".intake";

// ---------------------------------------------------------------------------
// Config structs (matching intake.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language understanding service settings.
    #[serde(default)]
    pub language_model: LanguageModelConfig,

    /// Pattern extraction and degradation settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Profile storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Confidence weighting.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// The four call stages: required fields and script templates.
    #[serde(default = "default_stages")]
    pub stages: Vec<StageDefinition>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            language_model: LanguageModelConfig::default(),
            extraction: ExtractionConfig::default(),
            storage: StorageConfig::default(),
            scoring: ScoringConfig::default(),
            stages: default_stages(),
        }
    }
}

/// `[language_model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageModelConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model used for extraction.
    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound on one augmentation call, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Fields whose pattern confidence is below this are sent to the model.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: u8,
}

impl Default for LanguageModelConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_ms: default_timeout_ms(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_endpoint() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_confidence_threshold() -> u8 {
    80
}

/// `[extraction]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Normalized transcripts shorter than this are treated as malformed.
    #[serde(default = "default_min_transcript_chars")]
    pub min_transcript_chars: usize,

    /// Fraction of confidence removed when augmentation fails.
    #[serde(default = "default_degraded_penalty")]
    pub degraded_confidence_penalty: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_transcript_chars: default_min_transcript_chars(),
            degraded_confidence_penalty: default_degraded_penalty(),
        }
    }
}

fn default_min_transcript_chars() -> usize {
    10
}
fn default_degraded_penalty() -> f64 {
    0.25
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the profile database. `~/` expands to the home directory.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// How many times a conflicting profile write is retried.
    #[serde(default = "default_max_upsert_retries")]
    pub max_upsert_retries: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_upsert_retries: default_max_upsert_retries(),
        }
    }
}

fn default_db_path() -> String {
    "~/.intake/intake.db".into()
}
fn default_max_upsert_retries() -> u32 {
    3
}

impl StorageConfig {
    /// Resolve `db_path`, expanding a leading `~/`.
    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        match self.db_path.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir()
                    .ok_or_else(|| IntakeError::config("could not determine home directory"))?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(&self.db_path)),
        }
    }
}

/// `[scoring]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Per-field confidence weights keyed by field name. Unlisted fields weigh 1.
    #[serde(default)]
    pub field_weights: BTreeMap<String, u32>,
}

impl ScoringConfig {
    /// Parse the weight table into typed keys.
    pub fn weights(&self) -> Result<BTreeMap<FieldName, u32>> {
        self.field_weights
            .iter()
            .map(|(name, weight)| Ok((name.parse::<FieldName>()?, *weight)))
            .collect()
    }
}

/// `[[stages]]` entry: one call stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Stage number, 1 through 4.
    pub number: u8,
    /// Display name.
    pub name: String,
    /// Fields that must be filled for the stage to count as complete.
    pub required_fields: Vec<FieldName>,
    /// Script template. Supports `{stage_number}`, `{stage_name}`,
    /// `{customer_name}`, `{business_name}`, `{known_facts}`, `{missing_questions}`.
    pub template: String,
}

// ---------------------------------------------------------------------------
// Built-in stages
// ---------------------------------------------------------------------------

const FOUNDATION_TEMPLATE: &str = "\
You are a friendly business formation assistant. This is call {stage_number} of 4: {stage_name}.

Greet {customer_name} warmly and explain that today you will capture the basics of the business they want to form.

What we already know:
{known_facts}

Ask for the following, one question at a time, in this order:
{missing_questions}

Never ask again for anything listed as already known. Read back names, phone numbers, and email addresses to confirm them.";

const BRAND_TEMPLATE: &str = "\
You are a friendly business formation assistant. This is call {stage_number} of 4: {stage_name}.

Welcome {customer_name} back and recap what you know about {business_name} before moving on to the brand.

What we already know:
{known_facts}

Explore the following, one topic at a time, in this order:
{missing_questions}

Never ask again for anything listed as already known.";

const OPERATIONS_TEMPLATE: &str = "\
You are a friendly business formation assistant. This is call {stage_number} of 4: {stage_name}.

Welcome {customer_name} back. Today you will work out how {business_name} will run day to day.

What we already know:
{known_facts}

Cover the following, one topic at a time, in this order:
{missing_questions}

Never ask again for anything listed as already known.";

const LAUNCH_TEMPLATE: &str = "\
You are a friendly business formation assistant. This is call {stage_number} of 4: {stage_name}.

Welcome {customer_name} back. Today you will plan the launch of {business_name}.

What we already know:
{known_facts}

Cover the following, one topic at a time, in this order:
{missing_questions}

Never ask again for anything listed as already known. Close by summarizing the plan.";

/// The built-in four-stage call structure.
pub fn default_stages() -> Vec<StageDefinition> {
    use FieldName::*;

    vec![
        StageDefinition {
            number: 1,
            name: CallStage::FOUNDATION.default_name().into(),
            required_fields: vec![
                CustomerEmail,
                CustomerPhone,
                CustomerName,
                BusinessName,
                EntityType,
                BusinessType,
                StateOfOperation,
                Timeline,
            ],
            template: FOUNDATION_TEMPLATE.into(),
        },
        StageDefinition {
            number: 2,
            name: CallStage::BRAND_IDENTITY.default_name().into(),
            required_fields: vec![
                BusinessDescription,
                TargetAudience,
                BrandPersonality,
                UniqueValueProposition,
            ],
            template: BRAND_TEMPLATE.into(),
        },
        StageDefinition {
            number: 3,
            name: CallStage::OPERATIONS_SETUP.default_name().into(),
            required_fields: vec![
                BusinessAddress,
                ExpectedEmployees,
                RevenueModel,
                BankingPreference,
            ],
            template: OPERATIONS_TEMPLATE.into(),
        },
        StageDefinition {
            number: 4,
            name: CallStage::LAUNCH_STRATEGY.default_name().into(),
            required_fields: vec![LaunchDate, MarketingChannels, InitialBudget, FirstMilestone],
            template: LAUNCH_TEMPLATE.into(),
        },
    ]
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Check cross-field invariants the TOML schema cannot express.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.language_model.endpoint).map_err(|e| {
            IntakeError::config(format!(
                "invalid language_model.endpoint '{}': {e}",
                self.language_model.endpoint
            ))
        })?;

        if self.language_model.confidence_threshold > 100 {
            return Err(IntakeError::config(
                "language_model.confidence_threshold must be at most 100",
            ));
        }

        let penalty = self.extraction.degraded_confidence_penalty;
        if !(0.0..=1.0).contains(&penalty) {
            return Err(IntakeError::config(format!(
                "extraction.degraded_confidence_penalty must be within 0..=1, got {penalty}"
            )));
        }

        self.scoring.weights()?;

        let numbers: Vec<u8> = self.stages.iter().map(|s| s.number).collect();
        if numbers != [1, 2, 3, 4] {
            return Err(IntakeError::config(format!(
                "expected exactly four stages numbered 1-4 in order, got {numbers:?}"
            )));
        }

        let mut seen = BTreeSet::new();
        for stage in &self.stages {
            if stage.required_fields.is_empty() {
                return Err(IntakeError::config(format!(
                    "stage {} has no required fields",
                    stage.number
                )));
            }
            for field in &stage.required_fields {
                if !seen.insert(*field) {
                    return Err(IntakeError::config(format!(
                        "field {field} is required by more than one stage"
                    )));
                }
            }
        }

        Ok(())
    }

    /// The definition for `stage`. Always present once [`validate`](Self::validate) passed.
    pub fn stage(&self, stage: CallStage) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.number == stage.number())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.intake/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| IntakeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.intake/intake.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| IntakeError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        IntakeError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| IntakeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| IntakeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| IntakeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the language model API key from the env var named in config.
pub fn language_model_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.language_model.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(IntakeError::config(format!(
            "language model API key not found. Set the {var_name} environment variable."
        ))),
    }
}

//! Shared types, error model, and configuration for call intake.
//!
//! This crate is the foundation depended on by all other intake crates.
//! It provides:
//! - [`IntakeError`]: the unified error type
//! - Domain types ([`StructuredProfile`], [`FieldName`], [`CallStage`], [`StagePrompt`])
//! - Configuration ([`AppConfig`], [`StageDefinition`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExtractionConfig, LanguageModelConfig, ScoringConfig, StageDefinition,
    StorageConfig, config_dir, config_file_path, default_stages, init_config,
    language_model_api_key, load_config, load_config_from,
};
pub use error::{IntakeError, Result};
pub use types::{
    AugmentationStatus, CallRecord, CallStage, CallerId, CompletenessResult, EntityType,
    ExtractedField, FieldKind, FieldName, FieldSource, MAX_CONFIDENCE, StagePrompt,
    StructuredProfile, Timeline, TranscriptInput, apply_penalty,
};

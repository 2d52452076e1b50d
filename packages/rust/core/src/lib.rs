//! Core pipeline orchestration for call intake.
//!
//! This crate ties together normalization, pattern extraction, language-model
//! augmentation, profile storage, completeness scoring, and stage prompt
//! generation into the two end-to-end operations of [`IntakeEngine`]:
//! processing a transcript and preparing the next call's script.

pub mod pipeline;
pub mod prompt;
pub mod scoring;

pub use pipeline::{IntakeEngine, TranscriptOutcome};
pub use prompt::StagePromptGenerator;
pub use scoring::CompletenessScorer;

//! Language-model augmentation for call intake.
//!
//! The pattern engine handles exact shapes well but misses paraphrase.
//! [`LanguageUnderstandingEngine`] sends the fields it is unsure of to a
//! [`LanguageService`] (in production, [`OpenRouterService`]), validates the
//! answers with the same canonical validators, and merges them under a
//! fixed precedence policy ([`merge`]).

pub mod engine;
pub mod merge;
pub mod openrouter;
pub mod service;

pub use engine::{Augmentation, LanguageUnderstandingEngine, profile_confidence};
pub use merge::{merge_into_accumulated, merge_language_fields, pattern_is_authoritative};
pub use openrouter::OpenRouterService;
pub use service::{LanguageCandidate, LanguageFields, LanguageService};

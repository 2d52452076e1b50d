//! Deterministic transcript extraction.
//!
//! Turns raw speech-to-text output into a partial [`StructuredProfile`]:
//!
//! 1. [`normalize`] rewrites spoken artefacts (spelled emails, digit runs,
//!    letter-by-letter spellings) into canonical text.
//! 2. [`PatternExtractionEngine`] runs ordered [`FieldExtractor`] strategies
//!    and validates each candidate.
//!
//! [`StructuredProfile`]: intake_shared::StructuredProfile

pub mod engine;
pub mod extractors;
pub mod normalizer;
pub mod states;
pub mod validators;

pub use engine::PatternExtractionEngine;
pub use extractors::business::has_legal_suffix;
pub use extractors::{Candidate, FieldExtractor, default_extractors};
pub use normalizer::normalize;
pub use validators::{canonicalize, is_valid};

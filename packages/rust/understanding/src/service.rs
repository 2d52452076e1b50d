//! The seam between the engine and whatever model answers extraction requests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use intake_shared::{CallStage, FieldName, Result};
use serde::{Deserialize, Serialize};

/// A model's answer for one field, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCandidate {
    pub value: Option<String>,
    pub confidence: u8,
}

impl LanguageCandidate {
    pub fn new(value: impl Into<String>, confidence: u8) -> Self {
        Self {
            value: Some(value.into()),
            confidence,
        }
    }

    /// The model looked and found nothing.
    pub fn absent() -> Self {
        Self {
            value: None,
            confidence: 0,
        }
    }
}

/// Field answers keyed by field name.
pub type LanguageFields = BTreeMap<FieldName, LanguageCandidate>;

/// An external extraction service.
///
/// Implementations may be slow or fail; the engine bounds every call with a
/// timeout and degrades to the pattern-only profile on error.
#[async_trait]
pub trait LanguageService: Send + Sync {
    /// Extract `fields` from `text`, a transcript of call `stage`.
    async fn extract(
        &self,
        text: &str,
        stage: CallStage,
        fields: &[FieldName],
    ) -> Result<LanguageFields>;

    /// Identifier for logs.
    fn name(&self) -> &str;
}

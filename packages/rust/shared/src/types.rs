//! Core domain types for call intake: stages, fields, profiles, and scores.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IntakeError, Result};

/// Highest confidence any extraction source may report.
pub const MAX_CONFIDENCE: u8 = 100;

// ---------------------------------------------------------------------------
// CallStage
// ---------------------------------------------------------------------------

/// One of the four sequential call phases. Always in `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CallStage(u8);

impl CallStage {
    pub const FOUNDATION: Self = Self(1);
    pub const BRAND_IDENTITY: Self = Self(2);
    pub const OPERATIONS_SETUP: Self = Self(3);
    pub const LAUNCH_STRATEGY: Self = Self(4);

    /// Number of stages in the call sequence.
    pub const COUNT: u8 = 4;

    /// Validate and wrap a stage number.
    pub fn new(number: u8) -> Result<Self> {
        if (1..=Self::COUNT).contains(&number) {
            Ok(Self(number))
        } else {
            Err(IntakeError::validation(format!(
                "call stage must be between 1 and {}, got {number}",
                Self::COUNT
            )))
        }
    }

    /// The stage number (1-based).
    pub fn number(self) -> u8 {
        self.0
    }

    /// Built-in display name; configured stages may override it.
    pub fn default_name(self) -> &'static str {
        match self.0 {
            1 => "Foundation",
            2 => "Brand Identity",
            3 => "Operations Setup",
            _ => "Launch Strategy",
        }
    }

    /// All stages in call order.
    pub fn all() -> [Self; 4] {
        [
            Self::FOUNDATION,
            Self::BRAND_IDENTITY,
            Self::OPERATIONS_SETUP,
            Self::LAUNCH_STRATEGY,
        ]
    }
}

impl TryFrom<u8> for CallStage {
    type Error = IntakeError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CallStage> for u8 {
    fn from(stage: CallStage) -> Self {
        stage.0
    }
}

impl fmt::Display for CallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CallerId
// ---------------------------------------------------------------------------

/// Identity of the caller a profile belongs to (phone number or user id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    /// Trim and validate a caller identity. Empty identities are rejected.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(IntakeError::validation("caller identity must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CallerId {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// TranscriptInput
// ---------------------------------------------------------------------------

/// A single call's transcript as delivered by the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptInput {
    /// Raw transcript text, exactly as transcribed.
    pub raw_text: String,
    /// Which of the four calls this transcript belongs to.
    pub call_stage: CallStage,
    /// Who was on the call.
    pub caller: CallerId,
}

impl TranscriptInput {
    pub fn new(raw_text: impl Into<String>, call_stage: CallStage, caller: CallerId) -> Self {
        Self {
            raw_text: raw_text.into(),
            call_stage,
            caller,
        }
    }
}

// ---------------------------------------------------------------------------
// FieldName
// ---------------------------------------------------------------------------

/// How strictly a field's value is shaped, which decides merge precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Canonical, validator-checked values (email, phone, state, enums).
    FormatExact,
    /// Open-ended prose where a language model usually does better.
    FreeText,
}

/// Canonical profile field names.
///
/// Declaration order is significant: the first eight variants follow the
/// pattern engine's evaluation order, and the whole list is the order in
/// which missing fields are asked and known facts are listed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    CustomerEmail,
    CustomerPhone,
    CustomerName,
    BusinessName,
    EntityType,
    BusinessType,
    StateOfOperation,
    Timeline,
    BusinessDescription,
    TargetAudience,
    BrandPersonality,
    UniqueValueProposition,
    BusinessAddress,
    ExpectedEmployees,
    RevenueModel,
    BankingPreference,
    LaunchDate,
    MarketingChannels,
    InitialBudget,
    FirstMilestone,
}

impl FieldName {
    /// Every field, in declaration order.
    pub const ALL: [FieldName; 20] = [
        Self::CustomerEmail,
        Self::CustomerPhone,
        Self::CustomerName,
        Self::BusinessName,
        Self::EntityType,
        Self::BusinessType,
        Self::StateOfOperation,
        Self::Timeline,
        Self::BusinessDescription,
        Self::TargetAudience,
        Self::BrandPersonality,
        Self::UniqueValueProposition,
        Self::BusinessAddress,
        Self::ExpectedEmployees,
        Self::RevenueModel,
        Self::BankingPreference,
        Self::LaunchDate,
        Self::MarketingChannels,
        Self::InitialBudget,
        Self::FirstMilestone,
    ];

    /// Storage / wire key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerEmail => "customer_email",
            Self::CustomerPhone => "customer_phone",
            Self::CustomerName => "customer_name",
            Self::BusinessName => "business_name",
            Self::EntityType => "entity_type",
            Self::BusinessType => "business_type",
            Self::StateOfOperation => "state_of_operation",
            Self::Timeline => "timeline",
            Self::BusinessDescription => "business_description",
            Self::TargetAudience => "target_audience",
            Self::BrandPersonality => "brand_personality",
            Self::UniqueValueProposition => "unique_value_proposition",
            Self::BusinessAddress => "business_address",
            Self::ExpectedEmployees => "expected_employees",
            Self::RevenueModel => "revenue_model",
            Self::BankingPreference => "banking_preference",
            Self::LaunchDate => "launch_date",
            Self::MarketingChannels => "marketing_channels",
            Self::InitialBudget => "initial_budget",
            Self::FirstMilestone => "first_milestone",
        }
    }

    /// Human-readable label used in rendered prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CustomerEmail => "Email",
            Self::CustomerPhone => "Phone",
            Self::CustomerName => "Name",
            Self::BusinessName => "Business name",
            Self::EntityType => "Entity type",
            Self::BusinessType => "Type of business",
            Self::StateOfOperation => "State of operation",
            Self::Timeline => "Timeline",
            Self::BusinessDescription => "Business description",
            Self::TargetAudience => "Target audience",
            Self::BrandPersonality => "Brand personality",
            Self::UniqueValueProposition => "Unique value proposition",
            Self::BusinessAddress => "Business address",
            Self::ExpectedEmployees => "Expected employees",
            Self::RevenueModel => "Revenue model",
            Self::BankingPreference => "Banking preference",
            Self::LaunchDate => "Launch date",
            Self::MarketingChannels => "Marketing channels",
            Self::InitialBudget => "Initial budget",
            Self::FirstMilestone => "First milestone",
        }
    }

    /// The question the assistant asks when this field is missing.
    pub fn question(&self) -> &'static str {
        match self {
            Self::CustomerEmail => "What is the best email address to reach you?",
            Self::CustomerPhone => "What is the best phone number to reach you?",
            Self::CustomerName => "May I have your full name?",
            Self::BusinessName => "What would you like to name the business?",
            Self::EntityType => {
                "Which business structure are you leaning toward: LLC, corporation, or something else?"
            }
            Self::BusinessType => "What kind of business are you starting?",
            Self::StateOfOperation => "Which state will the business operate in?",
            Self::Timeline => "How soon are you hoping to get started?",
            Self::BusinessDescription => "In a sentence or two, what does the business do?",
            Self::TargetAudience => "Who are your ideal customers?",
            Self::BrandPersonality => "How would you describe the personality of your brand?",
            Self::UniqueValueProposition => "What sets you apart from competitors?",
            Self::BusinessAddress => "Where will the business be located?",
            Self::ExpectedEmployees => "How many people do you expect to employ in the first year?",
            Self::RevenueModel => "How will the business make money?",
            Self::BankingPreference => "Do you have a preferred bank for the business account?",
            Self::LaunchDate => "When would you like to officially launch?",
            Self::MarketingChannels => "Which channels will you use to reach customers?",
            Self::InitialBudget => "What budget do you have set aside for launch?",
            Self::FirstMilestone => "What is the first milestone you want to hit after launch?",
        }
    }

    /// Instruction for the language model describing what belongs in the field.
    pub fn description(&self) -> &'static str {
        match self {
            Self::CustomerEmail => "the caller's email address",
            Self::CustomerPhone => "the caller's phone number, digits only",
            Self::CustomerName => "the caller's full personal name",
            Self::BusinessName => "the proposed legal or trade name of the business",
            Self::EntityType => {
                "one of: LLC, S-Corp, Corporation, Sole Proprietorship, Partnership, Nonprofit"
            }
            Self::BusinessType => "a short lowercase phrase for the industry or kind of business",
            Self::StateOfOperation => "the US state the business will be formed or operate in",
            Self::Timeline => {
                "one of: Immediate, Within 3 Months, Within 6 Months, Within a Year, Exploring"
            }
            Self::BusinessDescription => "one or two sentences describing what the business does",
            Self::TargetAudience => "the intended customers",
            Self::BrandPersonality => "adjectives describing the brand's tone and personality",
            Self::UniqueValueProposition => "what differentiates the business",
            Self::BusinessAddress => "the business's physical or mailing address",
            Self::ExpectedEmployees => "expected headcount in the first year",
            Self::RevenueModel => "how the business will earn revenue",
            Self::BankingPreference => "preferred bank or banking setup",
            Self::LaunchDate => "the planned launch date or window",
            Self::MarketingChannels => "channels planned for marketing",
            Self::InitialBudget => "the launch budget",
            Self::FirstMilestone => "the first goal after launch",
        }
    }

    /// Merge-precedence class of the field.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::CustomerEmail
            | Self::CustomerPhone
            | Self::StateOfOperation
            | Self::EntityType
            | Self::Timeline => FieldKind::FormatExact,
            _ => FieldKind::FreeText,
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(key))
            .ok_or_else(|| IntakeError::parse(format!("unknown field name: {key}")))
    }
}

// ---------------------------------------------------------------------------
// Closed vocabularies
// ---------------------------------------------------------------------------

/// When the caller wants to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeline {
    Immediate,
    WithinThreeMonths,
    WithinSixMonths,
    WithinYear,
    Exploring,
}

impl Timeline {
    pub const ALL: [Timeline; 5] = [
        Self::Immediate,
        Self::WithinThreeMonths,
        Self::WithinSixMonths,
        Self::WithinYear,
        Self::Exploring,
    ];

    /// Canonical stored value.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Immediate => "Immediate",
            Self::WithinThreeMonths => "Within 3 Months",
            Self::WithinSixMonths => "Within 6 Months",
            Self::WithinYear => "Within a Year",
            Self::Exploring => "Exploring",
        }
    }

    /// Parse a canonical label (case-insensitive).
    pub fn from_label(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s))
    }
}

/// Legal structure of the business being formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Llc,
    SCorp,
    Corporation,
    SoleProprietorship,
    Partnership,
    Nonprofit,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        Self::Llc,
        Self::SCorp,
        Self::Corporation,
        Self::SoleProprietorship,
        Self::Partnership,
        Self::Nonprofit,
    ];

    /// Canonical stored value.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Llc => "LLC",
            Self::SCorp => "S-Corp",
            Self::Corporation => "Corporation",
            Self::SoleProprietorship => "Sole Proprietorship",
            Self::Partnership => "Partnership",
            Self::Nonprofit => "Nonprofit",
        }
    }

    /// Parse a label or common synonym (`"c corp"`, `"inc"`, `"non-profit"`, ...).
    pub fn from_label(s: &str) -> Option<Self> {
        let key: String = s
            .trim()
            .trim_end_matches('.')
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        match key.as_str() {
            "llc" | "limitedliabilitycompany" => Some(Self::Llc),
            "scorp" | "scorporation" => Some(Self::SCorp),
            "corporation" | "corp" | "ccorp" | "ccorporation" | "inc" | "incorporated" => {
                Some(Self::Corporation)
            }
            "soleproprietorship" | "soleproprietor" => Some(Self::SoleProprietorship),
            "partnership" | "generalpartnership" | "limitedpartnership" | "llp" => {
                Some(Self::Partnership)
            }
            "nonprofit" | "notforprofit" | "501c3" => Some(Self::Nonprofit),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ExtractedField
// ---------------------------------------------------------------------------

/// Which extraction stage produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Pattern,
    LanguageModel,
}

/// One extracted, canonicalised field value with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub field: FieldName,
    /// Canonical value.
    pub value: String,
    pub source: FieldSource,
    /// Extraction confidence in `0..=100`.
    pub confidence: u8,
}

impl ExtractedField {
    /// Build a field, clamping confidence into range.
    pub fn new(field: FieldName, value: impl Into<String>, source: FieldSource, confidence: u8) -> Self {
        Self {
            field,
            value: value.into(),
            source,
            confidence: confidence.min(MAX_CONFIDENCE),
        }
    }
}

// ---------------------------------------------------------------------------
// StructuredProfile
// ---------------------------------------------------------------------------

type ProfileMap = BTreeMap<FieldName, Option<ExtractedField>>;

/// The accumulated business-formation facts for one caller.
///
/// Every [`FieldName`] is always present as a key; unknown fields hold `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ProfileMap", into = "ProfileMap")]
pub struct StructuredProfile {
    fields: ProfileMap,
}

impl StructuredProfile {
    /// A profile with every field null.
    pub fn empty() -> Self {
        Self {
            fields: FieldName::ALL.iter().map(|f| (*f, None)).collect(),
        }
    }

    pub fn get(&self, field: FieldName) -> Option<&ExtractedField> {
        self.fields.get(&field).and_then(Option::as_ref)
    }

    /// The canonical value of `field`, if filled.
    pub fn value(&self, field: FieldName) -> Option<&str> {
        self.get(field).map(|f| f.value.as_str())
    }

    /// Confidence of `field`, 0 when null.
    pub fn confidence(&self, field: FieldName) -> u8 {
        self.get(field).map_or(0, |f| f.confidence)
    }

    /// Replace a field's entry outright.
    pub fn set(&mut self, field: FieldName, entry: Option<ExtractedField>) {
        self.fields.insert(field, entry);
    }

    /// Iterate filled entries in declaration order.
    pub fn filled(&self) -> impl Iterator<Item = &ExtractedField> {
        self.fields.values().filter_map(Option::as_ref)
    }

    pub fn filled_count(&self) -> usize {
        self.filled().count()
    }

    /// True when no field holds a value.
    pub fn is_empty(&self) -> bool {
        self.filled_count() == 0
    }

    /// Fold a newer profile into this one.
    ///
    /// A newer non-null value replaces the current one only when its
    /// confidence is at least as high; null never replaces a value.
    /// Returns the fields that changed.
    pub fn merge_from(&mut self, newer: &StructuredProfile) -> Vec<FieldName> {
        let mut changed = Vec::new();
        for incoming in newer.filled() {
            let replace = match self.get(incoming.field) {
                None => true,
                Some(current) => {
                    incoming.confidence >= current.confidence && current != incoming
                }
            };
            if replace {
                self.fields.insert(incoming.field, Some(incoming.clone()));
                changed.push(incoming.field);
            }
        }
        changed
    }

    /// Filled values keyed by field, in declaration order.
    pub fn known_values(&self) -> BTreeMap<FieldName, String> {
        self.filled()
            .map(|f| (f.field, f.value.clone()))
            .collect()
    }
}

impl Default for StructuredProfile {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<ProfileMap> for StructuredProfile {
    fn from(mut map: ProfileMap) -> Self {
        for field in FieldName::ALL {
            map.entry(field).or_insert(None);
        }
        Self { fields: map }
    }
}

impl From<StructuredProfile> for ProfileMap {
    fn from(profile: StructuredProfile) -> Self {
        profile.fields
    }
}

// ---------------------------------------------------------------------------
// Derived results
// ---------------------------------------------------------------------------

/// Completeness and confidence of a profile for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessResult {
    pub stage: CallStage,
    /// Percentage of the stage's required fields filled with valid values.
    pub score: u8,
    /// Required fields still missing, in declaration order.
    pub missing_required: BTreeSet<FieldName>,
    /// Mean confidence of the filled required fields.
    pub confidence: u8,
}

impl CompletenessResult {
    /// A zero result with every required field missing.
    pub fn zero(stage: CallStage, required: &[FieldName]) -> Self {
        Self {
            stage,
            score: 0,
            missing_required: required.iter().copied().collect(),
            confidence: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required.is_empty()
    }

    /// Reduce confidence by `penalty` (a fraction in `0..=1`).
    ///
    /// Non-zero confidence never drops to zero.
    pub fn penalized(mut self, penalty: f64) -> Self {
        self.confidence = apply_penalty(self.confidence, penalty);
        self
    }
}

/// Scale `confidence` by `1 - penalty`, flooring but keeping non-zero values above zero.
pub fn apply_penalty(confidence: u8, penalty: f64) -> u8 {
    if confidence == 0 {
        return 0;
    }
    let factor = (1.0 - penalty.clamp(0.0, 1.0)).max(0.0);
    let scaled = (f64::from(confidence) * factor).floor() as u8;
    scaled.max(1)
}

/// Outcome of the language-model augmentation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AugmentationStatus {
    /// The service answered; `fields_filled` fields came from it.
    Augmented { fields_filled: usize },
    /// Every field was already confident; the service was not called.
    Skipped,
    /// No language service is configured.
    Disabled,
    /// The service failed or timed out; the pattern-only profile was kept.
    Degraded { reason: String },
}

impl AugmentationStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Short tag for storage and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Augmented { .. } => "augmented",
            Self::Skipped => "skipped",
            Self::Disabled => "disabled",
            Self::Degraded { .. } => "degraded",
        }
    }
}

/// A personalised script for the caller's next call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePrompt {
    pub caller: CallerId,
    pub stage: CallStage,
    pub stage_name: String,
    pub rendered_text: String,
    /// Facts interpolated into the script so the assistant does not re-ask.
    pub known_facts: BTreeMap<FieldName, String>,
    /// Current-stage required fields still to ask, in question order.
    pub missing_facts: Vec<FieldName>,
    /// SHA-256 hex digest of `rendered_text`.
    pub fingerprint: String,
}

/// History entry for one processed call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: String,
    pub caller: CallerId,
    pub stage: CallStage,
    pub completeness: u8,
    pub confidence: u8,
    pub augmentation: String,
    /// Profile snapshot the scores describe.
    pub profile: StructuredProfile,
    pub created_at: DateTime<Utc>,
}

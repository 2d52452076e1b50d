//! Start timeline from a fixed phrase dictionary.

use std::sync::LazyLock;

use intake_shared::{FieldName, Timeline};
use regex::Regex;

use super::{Candidate, FieldExtractor};

static TIMELINE_PHRASES: LazyLock<Vec<(Regex, Timeline)>> = LazyLock::new(|| {
    [
        (
            r"(?i)\b(?:immediately|right\s+away|right\s+now|asap|as\s+soon\s+as\s+possible|get\s+started\s+now|start\s+now|ready\s+to\s+go)\b",
            Timeline::Immediate,
        ),
        (
            r"(?i)\b(?:next\s+month|this\s+month|within\s+a\s+month|in\s+a\s+month|(?:a\s+)?few\s+weeks|couple\s+(?:of\s+)?(?:weeks|months)|next\s+few\s+months|(?:within|in)\s+(?:three|3|two|2)\s+months|this\s+quarter)\b",
            Timeline::WithinThreeMonths,
        ),
        (
            r"(?i)\b(?:(?:within|in)\s+(?:six|6)\s+months|(?:six|6)\s+months|half\s+a\s+year|later\s+this\s+year)\b",
            Timeline::WithinSixMonths,
        ),
        (
            r"(?i)\b(?:next\s+year|within\s+a\s+year|in\s+a\s+year|(?:twelve|12)\s+months|end\s+of\s+the\s+year)\b",
            Timeline::WithinYear,
        ),
        (
            r"(?i)\b(?:exploring|just\s+looking|not\s+sure\s+yet|researching|thinking\s+about\s+it|no\s+rush|no\s+timeline|just\s+curious|down\s+the\s+road)\b",
            Timeline::Exploring,
        ),
    ]
    .into_iter()
    .map(|(pattern, timeline)| (Regex::new(pattern).expect("valid regex"), timeline))
    .collect()
});

/// The timeline named by the earliest dictionary phrase in `text`.
pub fn timeline_from_phrase(text: &str) -> Option<Timeline> {
    TIMELINE_PHRASES
        .iter()
        .filter_map(|(re, timeline)| re.find(text).map(|m| (m.start(), *timeline)))
        .min_by_key(|(start, _)| *start)
        .map(|(_, timeline)| timeline)
}

pub struct TimelineExtractor;

impl FieldExtractor for TimelineExtractor {
    fn field(&self) -> FieldName {
        FieldName::Timeline
    }

    fn name(&self) -> &'static str {
        "timeline"
    }

    fn try_extract(&self, text: &str) -> Option<Candidate> {
        timeline_from_phrase(text).map(|t| Candidate::new(t.label(), 85))
    }
}

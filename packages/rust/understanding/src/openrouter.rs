//! OpenRouter chat-completions client for field extraction.
//!
//! Sends the transcript with a system prompt naming the requested fields and
//! asks for a JSON object back. Replies are parsed leniently: code fences
//! are stripped, unknown keys are skipped, and confidences given as
//! fractions are scaled to percentages.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use intake_shared::{CallStage, FieldName, IntakeError, LanguageModelConfig, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::service::{LanguageCandidate, LanguageFields, LanguageService};

/// User-Agent string for model requests.
const USER_AGENT: &str = concat!("intake/", env!("CARGO_PKG_VERSION"));

/// Confidence assumed when the model returns a bare value.
const BARE_VALUE_CONFIDENCE: u8 = 70;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// [`LanguageService`] backed by an OpenAI-compatible chat endpoint.
#[derive(Clone)]
pub struct OpenRouterService {
    client: Client,
    completions_url: Url,
    model: String,
    api_key: String,
}

impl OpenRouterService {
    /// Build a client for `config.endpoint` authenticated with `api_key`.
    pub fn new(config: &LanguageModelConfig, api_key: impl Into<String>) -> Result<Self> {
        let base = config.endpoint.trim_end_matches('/');
        let completions_url = Url::parse(&format!("{base}/chat/completions")).map_err(|e| {
            IntakeError::config(format!("invalid language model endpoint {base}: {e}"))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| IntakeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            completions_url,
            model: config.model.clone(),
            api_key: api_key.into(),
        })
    }
}

impl fmt::Debug for OpenRouterService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterService")
            .field("completions_url", &self.completions_url.as_str())
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LanguageService for OpenRouterService {
    #[instrument(skip_all, fields(model = %self.model, stage = %stage, requested = fields.len()))]
    async fn extract(
        &self,
        text: &str,
        stage: CallStage,
        fields: &[FieldName],
    ) -> Result<LanguageFields> {
        let system_prompt = build_system_prompt(stage, fields);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.0,
        };

        let response = self
            .client
            .post(self.completions_url.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| IntakeError::LanguageModel(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(IntakeError::LanguageModel(format!("HTTP {status}: {snippet}")));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| IntakeError::LanguageModel(format!("invalid response body: {e}")))?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| IntakeError::LanguageModel("response has no message content".into()))?;

        let parsed = parse_field_payload(&content)?;
        debug!(returned = parsed.len(), "language model answered");
        Ok(parsed)
    }

    fn name(&self) -> &str {
        "openrouter"
    }
}

// ---------------------------------------------------------------------------
// Prompt and payload helpers
// ---------------------------------------------------------------------------

/// Instructions naming each requested field and the reply shape.
fn build_system_prompt(stage: CallStage, fields: &[FieldName]) -> String {
    let mut prompt = format!(
        "You extract business-formation facts from a phone call transcript \
         (call {} of 4, {}).\n\
         Return only a JSON object. Use exactly these keys:\n",
        stage.number(),
        stage.default_name()
    );
    for field in fields {
        prompt.push_str(&format!("- {}: {}\n", field.as_str(), field.description()));
    }
    prompt.push_str(
        "Each value must be an object {\"value\": string or null, \"confidence\": integer 0-100}. \
         Use null when the caller did not clearly state the fact. Do not guess.",
    );
    prompt
}

/// Strip a surrounding Markdown code fence, if any.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse the model's JSON object into field candidates.
fn parse_field_payload(content: &str) -> Result<LanguageFields> {
    let value: Value = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| IntakeError::LanguageModel(format!("reply is not JSON: {e}")))?;
    let Value::Object(map) = value else {
        return Err(IntakeError::LanguageModel(
            "reply is not a JSON object".into(),
        ));
    };

    let mut fields = LanguageFields::new();
    for (key, entry) in map {
        let Ok(field) = key.parse::<FieldName>() else {
            debug!(key = %key, "ignoring unknown field in reply");
            continue;
        };
        fields.insert(field, parse_candidate(&entry));
    }
    Ok(fields)
}

fn parse_candidate(entry: &Value) -> LanguageCandidate {
    match entry {
        Value::String(s) => LanguageCandidate::new(s.clone(), BARE_VALUE_CONFIDENCE),
        Value::Object(obj) => {
            let value = match obj.get("value") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };
            let confidence = obj
                .get("confidence")
                .map_or(BARE_VALUE_CONFIDENCE, confidence_percent);
            match value {
                Some(value) => LanguageCandidate::new(value, confidence),
                None => LanguageCandidate::absent(),
            }
        }
        _ => LanguageCandidate::absent(),
    }
}

/// Read a confidence as a percentage; fractions like `0.9` become `90`.
fn confidence_percent(raw: &Value) -> u8 {
    let Some(n) = raw.as_f64() else {
        return 0;
    };
    let scaled = if n < 1.0 || (n == 1.0 && raw.is_f64()) {
        n * 100.0
    } else {
        n
    };
    scaled.clamp(0.0, 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(endpoint: &str) -> LanguageModelConfig {
        LanguageModelConfig {
            endpoint: endpoint.to_string(),
            ..LanguageModelConfig::default()
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "gen-1",
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
    }

    #[test]
    fn test_parse_payload_shapes() {
        let parsed = parse_field_payload(
            r#"{
                "business_description": {"value": "Campaign strategy for local candidates", "confidence": 0.9},
                "target_audience": {"value": null, "confidence": 0},
                "customer_name": "Bill Clinton",
                "expected_employees": {"value": 4, "confidence": 60},
                "favourite_colour": {"value": "blue", "confidence": 99}
            }"#,
        )
        .unwrap();

        assert_eq!(
            parsed[&FieldName::BusinessDescription],
            LanguageCandidate::new("Campaign strategy for local candidates", 90)
        );
        assert_eq!(parsed[&FieldName::TargetAudience], LanguageCandidate::absent());
        assert_eq!(parsed[&FieldName::CustomerName].confidence, BARE_VALUE_CONFIDENCE);
        assert_eq!(
            parsed[&FieldName::ExpectedEmployees],
            LanguageCandidate::new("4", 60)
        );
        assert_eq!(parsed.len(), 4);
    }

    #[test]
    fn test_parse_payload_rejects_non_objects() {
        assert!(parse_field_payload("[1, 2]").is_err());
        assert!(parse_field_payload("sure! here you go").is_err());
    }

    #[test]
    fn test_system_prompt_lists_requested_fields() {
        let prompt = build_system_prompt(
            CallStage::BRAND_IDENTITY,
            &[FieldName::TargetAudience, FieldName::BrandPersonality],
        );
        assert!(prompt.contains("call 2 of 4, Brand Identity"));
        assert!(prompt.contains("- target_audience: the intended customers"));
        assert!(prompt.contains("- brand_personality:"));
        assert!(!prompt.contains("customer_email"));
    }

    #[test]
    fn test_invalid_endpoint_is_config_error() {
        let err = OpenRouterService::new(&config_for("not a url"), "key").unwrap_err();
        assert!(matches!(err, IntakeError::Config { .. }));
    }

    #[test]
    fn test_debug_output_redacts_api_key() {
        let service =
            OpenRouterService::new(&config_for("https://openrouter.ai/api/v1"), "sk-secret-123")
                .unwrap();
        let debug = format!("{service:?}");
        assert!(debug.contains("https://openrouter.ai/api/v1/chat/completions"));
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("sk-secret-123"));
    }

    #[tokio::test]
    async fn test_extract_with_mock_server() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .and(wiremock::matchers::header("authorization", "Bearer test-key"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(completion(
                "```json\n{\"business_type\": {\"value\": \"political consulting\", \"confidence\": 88}}\n```",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let service = OpenRouterService::new(&config_for(&server.uri()), "test-key").unwrap();
        let fields = service
            .extract(
                "I want to start a political advising business",
                CallStage::FOUNDATION,
                &[FieldName::BusinessType],
            )
            .await
            .unwrap();

        assert_eq!(
            fields[&FieldName::BusinessType],
            LanguageCandidate::new("political consulting", 88)
        );
    }

    #[tokio::test]
    async fn test_extract_http_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .respond_with(wiremock::ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let service = OpenRouterService::new(&config_for(&server.uri()), "k").unwrap();
        let err = service
            .extract("text", CallStage::FOUNDATION, &[FieldName::Timeline])
            .await
            .unwrap_err();

        assert!(matches!(err, IntakeError::LanguageModel(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_extract_malformed_content() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(completion("I could not find anything, sorry.")),
            )
            .mount(&server)
            .await;

        let service = OpenRouterService::new(&config_for(&server.uri()), "k").unwrap();
        let result = service
            .extract("text", CallStage::FOUNDATION, &[FieldName::Timeline])
            .await;

        assert!(matches!(result, Err(IntakeError::LanguageModel(_))));
    }

    #[tokio::test]
    async fn test_extract_missing_choices() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let service = OpenRouterService::new(&config_for(&server.uri()), "k").unwrap();
        let err = service
            .extract("text", CallStage::FOUNDATION, &[FieldName::Timeline])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no message content"));
    }
}

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::{AppConfig, DEFAULT_API_BASE, DEFAULT_MODEL, DEMO_KEY};
use crate::error::ServiceError;
use crate::models::GenerationRequest;
use crate::synth;

const LOG_PREVIEW_CHARS: usize = 1000;

/// Anything that can turn a generation request into raw reply text.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ServiceError>;
}

// Keeps large bodies readable in logs
fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...[truncated {} chars]", &text[..cut], text.len() - cut),
        None => text.to_string(),
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_endpoint(api_key, DEFAULT_API_BASE.to_string(), DEFAULT_MODEL.to_string())
    }

    pub fn with_endpoint(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_endpoint(
            config.api_key.clone(),
            config.api_base.clone(),
            config.model.clone(),
        )
    }

    pub fn is_demo(&self) -> bool {
        self.api_key == DEMO_KEY
    }

    /// `generateContent` payload: JSON output constrained to the result schema.
    pub fn request_body(request: &GenerationRequest) -> serde_json::Value {
        json!({
            "contents": [{
                "parts": [{ "text": request.prompt() }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "className": { "type": "STRING" },
                        "tsCode": { "type": "STRING" },
                        "jsonCode": { "type": "STRING" },
                        "layoutStrategy": { "type": "STRING" },
                        "properties": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "name": { "type": "STRING" },
                                    "type": { "type": "STRING" },
                                    "isArray": { "type": "BOOLEAN" },
                                    "isNullable": { "type": "BOOLEAN" },
                                    "comment": { "type": "STRING" }
                                }
                            }
                        },
                        "reactComponentCode": { "type": "STRING" },
                        "designRationale": { "type": "STRING" }
                    },
                    "required": [
                        "className", "tsCode", "jsonCode", "layoutStrategy",
                        "properties", "reactComponentCode", "designRationale"
                    ]
                }
            }
        })
    }

    async fn perform_api_call(&self, request: &GenerationRequest) -> Result<String, ServiceError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        info!("🔗 Making request to: {}", url.replace(&self.api_key, "***"));

        let body = Self::request_body(request);
        info!(
            "📤 Request body: {}",
            truncate_for_log(
                &serde_json::to_string_pretty(&body).unwrap_or_default(),
                LOG_PREVIEW_CHARS
            )
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response
            .text()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        if !status.is_success() {
            error!("❌ API Error response: {}", truncate_for_log(&response_text, LOG_PREVIEW_CHARS));
            return Err(ServiceError::Http(format!(
                "status={} body={}",
                status,
                truncate_for_log(&response_text, LOG_PREVIEW_CHARS)
            )));
        }

        info!("📥 Raw Gemini API response: {}", truncate_for_log(&response_text, LOG_PREVIEW_CHARS));

        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| ServiceError::Other(format!("parse error: {}", e)))?;
        extract_text(&parsed)
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ServiceError> {
        if self.is_demo() {
            info!("Using demo mode - synthesizing reply from the entity source");
            let reply = synth::synthesize_reply(&request.source, request.locale)?;
            info!("📦 Synthesized reply ({} chars)", reply.len());
            return Ok(reply);
        }

        info!("Generating bridge with Gemini API ({})...", self.model);
        let result = self.perform_api_call(request).await;
        match &result {
            Ok(text) => info!("✅ Received {} chars of generated text", text.len()),
            Err(e) => error!("❌ Generation failed: {}", e),
        }
        result
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Debug, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Other(serde::de::IgnoredAny),
}

/// Concatenated text parts of the first candidate.
fn extract_text(resp: &GeminiResponse) -> Result<String, ServiceError> {
    let Some(candidate) = resp.candidates.first() else {
        warn!("⚠️ No candidates in API response");
        return Err(ServiceError::Empty);
    };
    let text: String = candidate
        .content
        .parts
        .iter()
        .filter_map(|p| match p {
            Part::Text { text } => Some(text.as_str()),
            Part::Other(_) => None,
        })
        .collect();
    if text.trim().is_empty() {
        return Err(ServiceError::Empty);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::DEFAULT_SOURCE;
    use crate::models::Locale;
    use crate::sanitize::sanitize;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_body_requires_all_result_fields() {
        let body = GeminiClient::request_body(&GenerationRequest::new("class A {}", Locale::En));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        let required = body["generationConfig"]["responseSchema"]["required"]
            .as_array()
            .unwrap();
        assert_eq!(required.len(), 7);
        assert!(body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .ends_with("class A {}"));
    }

    #[test]
    fn text_parts_are_joined() {
        let resp: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"thought":true},{"text":"1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(&resp).unwrap(), "{\"a\":1}");

        let empty: GeminiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(extract_text(&empty).unwrap_err(), ServiceError::Empty);
    }

    #[test]
    fn log_truncation_respects_char_boundaries() {
        assert_eq!(truncate_for_log("héllo", 2), "hé...[truncated 3 chars]");
        assert_eq!(truncate_for_log("short", 10), "short");
    }

    #[tokio::test]
    async fn demo_key_synthesizes_a_sanitizable_reply() {
        let client = GeminiClient::new(DEMO_KEY.to_string());
        let reply = client
            .generate(&GenerationRequest::new(DEFAULT_SOURCE, Locale::Zh))
            .await
            .unwrap();
        let assets = sanitize(&reply).unwrap();
        assert_eq!(assets.result.class_name, "GameInfo");
        assert_eq!(assets.mock_data.len(), 5);
        assert!(assets.result.design_rationale.contains("圖庫"));
    }
}

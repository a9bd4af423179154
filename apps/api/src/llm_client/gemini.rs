//! Gemini `generateContent` transport.
//!
//! Model: gemini-2.0-flash-exp (hardcoded, not configurable)

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{BackendError, GenerativeBackend};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// The model used for all AI calls.
pub const MODEL: &str = "gemini-2.0-flash-exp";
const TEMPERATURE: f32 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 8192;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

fn error_message(body: String) -> String {
    serde_json::from_str::<GeminiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Maps a non-success HTTP status to the attempt failure it represents.
fn classify_status(status: StatusCode, body: String) -> BackendError {
    let message = error_message(body);
    if status == StatusCode::TOO_MANY_REQUESTS {
        BackendError::RateLimited(message)
    } else if status.is_server_error() {
        BackendError::Unavailable(format!("status {}: {}", status.as_u16(), message))
    } else {
        BackendError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

fn parse_reply(body: &str) -> Result<String, BackendError> {
    let reply: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Malformed(e.to_string()))?;

    if let Some(usage) = &reply.usage_metadata {
        debug!(
            "Gemini usage: prompt_tokens={:?}, candidate_tokens={:?}",
            usage.prompt_token_count, usage.candidates_token_count
        );
    }

    reply
        .text()
        .map(str::to_owned)
        .ok_or_else(|| BackendError::Malformed("reply has no candidate text".to_string()))
}

/// HTTP client for the Gemini API.
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, MODEL)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let request_body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            warn!("Gemini API returned {}", status);
            return Err(classify_status(status, body));
        }

        parse_reply(&body)
    }

    fn model(&self) -> &str {
        MODEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_gemini_field_names() {
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 8192);
        assert!(value["generationConfig"]["temperature"].as_f64().unwrap() > 0.69);
    }

    #[test]
    fn test_parse_reply_extracts_first_candidate_text() {
        let body = r#"{
            "candidates": [{"content": {"parts": [{"text": "rewritten"}], "role": "model"}}],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3}
        }"#;
        assert_eq!(parse_reply(body).unwrap(), "rewritten");
    }

    #[test]
    fn test_parse_reply_without_text_is_malformed() {
        let body = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        assert!(matches!(parse_reply(body), Err(BackendError::Malformed(_))));
        assert!(matches!(parse_reply("{}"), Err(BackendError::Malformed(_))));
        assert!(matches!(
            parse_reply("<html>"),
            Err(BackendError::Malformed(_))
        ));
    }

    #[test]
    fn test_classify_status() {
        let body = r#"{"error": {"code": 429, "message": "Resource exhausted"}}"#.to_string();
        match classify_status(StatusCode::TOO_MANY_REQUESTS, body) {
            BackendError::RateLimited(msg) => assert_eq!(msg, "Resource exhausted"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, String::new()).is_transient());
        match classify_status(StatusCode::BAD_REQUEST, "bad key".to_string()) {
            BackendError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad key");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

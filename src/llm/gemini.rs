use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CompletionClient, CompletionError};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            api_key,
            model,
            base_url,
            client,
        })
    }

    fn endpoint(&self) -> Result<Url, CompletionError> {
        generate_endpoint(&self.base_url, &self.model)
    }
}

fn generate_endpoint(base_url: &str, model: &str) -> Result<Url, CompletionError> {
    let model = model.trim();
    if model.is_empty() {
        return Err(CompletionError::Init("model name is empty".to_string()));
    }
    let raw = format!(
        "{}/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    );
    Url::parse(&raw).map_err(|e| CompletionError::Init(format!("invalid endpoint {raw}: {e}")))
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

fn build_request(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![Part { text: prompt }],
        }],
    }
}

/// Joins the text parts of the first candidate. An empty string is a valid
/// result here; deciding whether that is acceptable is the caller's job.
fn extract_reply(body: &str) -> Result<String, CompletionError> {
    let resp: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::UnexpectedResponse(format!("invalid response body: {e}")))?;

    let Some(candidate) = resp.candidates.into_iter().next() else {
        let reason = resp
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(CompletionError::NoText(format!(
            "response contains no text ({reason})"
        )));
    };

    Ok(candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default())
}

fn describe_status(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!("{status}: {}", envelope.error.message),
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => format!("{status}: {}", body.trim()),
    }
}

impl CompletionClient for GeminiClient {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let endpoint = self.endpoint()?;
        debug!(model = %self.model, prompt_len = prompt.len(), "calling generateContent");

        let resp = self
            .client
            .post(endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(prompt))
            .send()
            .map_err(|e| CompletionError::Generation(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| CompletionError::Generation(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(CompletionError::Generation(describe_status(status, &body)));
        }

        extract_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_endpoint() {
        let url = generate_endpoint(DEFAULT_BASE_URL, DEFAULT_MODEL).unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_generate_endpoint_trailing_slash() {
        let url = generate_endpoint("http://localhost:8080/v1beta/", "m").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v1beta/models/m:generateContent");
    }

    #[test]
    fn test_generate_endpoint_empty_model_is_init_fault() {
        let err = generate_endpoint(DEFAULT_BASE_URL, "  ").unwrap_err();
        assert!(matches!(err, CompletionError::Init(_)));
    }

    #[test]
    fn test_generate_endpoint_bad_base_url_is_init_fault() {
        let err = generate_endpoint("not a url", DEFAULT_MODEL).unwrap_err();
        assert!(matches!(err, CompletionError::Init(_)));
    }

    #[test]
    fn test_build_request_shape() {
        let value = serde_json::to_value(build_request("user: hi\n")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "user: hi\n"}]}]
            })
        );
    }

    #[test]
    fn test_extract_reply_joins_parts() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hi "}, {"text": "there"}]},
                "finishReason": "STOP"
            }]
        }"#;
        assert_eq!(extract_reply(body).unwrap(), "Hi there");
    }

    #[test]
    fn test_extract_reply_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        match extract_reply(body) {
            Err(CompletionError::NoText(msg)) => assert!(msg.contains("SAFETY")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_extract_reply_candidate_without_content() {
        let body = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        assert_eq!(extract_reply(body).unwrap(), "");
    }

    #[test]
    fn test_extract_reply_invalid_json() {
        assert!(matches!(
            extract_reply("<html>"),
            Err(CompletionError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_describe_status_uses_api_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        let msg = describe_status(reqwest::StatusCode::BAD_REQUEST, body);
        assert_eq!(msg, "400 Bad Request: API key not valid.");
    }
}

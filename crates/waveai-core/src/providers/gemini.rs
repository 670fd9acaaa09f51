//! Google Gemini generateContent wire format

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::transport::OutboundRequest;
use super::types::{FailureCause, ProviderProfile};

/// The key goes in a header rather than the query string so it never shows up in URL logs.
pub fn build_request(
    profile: &ProviderProfile,
    message: &str,
    instructions: &str,
    api_key: &str,
    timeout: Duration,
) -> OutboundRequest {
    let url = format!(
        "{}/models/{}:generateContent",
        profile.base_url, profile.model
    );
    let body = GeminiRequest {
        system_instruction: GeminiContent {
            role: None,
            parts: vec![GeminiPart { text: instructions }],
        },
        contents: vec![GeminiContent {
            role: Some("user"),
            parts: vec![GeminiPart { text: message }],
        }],
        generation_config: GeminiGenerationConfig {
            max_output_tokens: profile.max_tokens,
            temperature: profile.temperature,
        },
    };

    OutboundRequest::post(url, serde_json::json!(body), timeout)
        .header("x-goog-api-key", api_key.trim())
}

pub fn extract_text(body: &str) -> Result<String, FailureCause> {
    let resp: GeminiApiResponse = serde_json::from_str(body)
        .map_err(|e| FailureCause::MalformedResponse(e.to_string()))?;
    let candidate = resp.candidates.into_iter().next().ok_or_else(|| {
        FailureCause::MalformedResponse("response had no candidates".to_string())
    })?;
    let parts: Vec<String> = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    Ok(parts.join(""))
}

// ── Gemini wire types ──

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiApiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

//! Anthropic messages API wire format

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::transport::OutboundRequest;
use super::types::{FailureCause, ProviderProfile};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The persona instructions travel inside the single user turn, ahead of the question.
pub fn build_request(
    profile: &ProviderProfile,
    message: &str,
    instructions: &str,
    api_key: &str,
    timeout: Duration,
) -> OutboundRequest {
    let url = format!("{}/v1/messages", profile.base_url);
    let prompt = format!("{}\n\nQuestion: {}", instructions, message);
    let body = AnthropicRequest {
        model: &profile.model,
        max_tokens: profile.max_tokens,
        temperature: profile.temperature,
        messages: vec![AnthropicMessage {
            role: "user",
            content: prompt,
        }],
    };

    OutboundRequest::post(url, serde_json::json!(body), timeout)
        .header("x-api-key", api_key.trim())
        .header("anthropic-version", ANTHROPIC_VERSION)
}

/// Concatenate the text blocks of the response
pub fn extract_text(body: &str) -> Result<String, FailureCause> {
    let resp: AnthropicApiResponse = serde_json::from_str(body)
        .map_err(|e| FailureCause::MalformedResponse(e.to_string()))?;
    if resp.content.is_empty() {
        return Err(FailureCause::MalformedResponse(
            "response had no content blocks".to_string(),
        ));
    }
    let text: Vec<String> = resp
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    Ok(text.join("\n"))
}

// ── Anthropic wire types ──

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicApiResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_headers_and_prompt() {
        let profile = ProviderProfile::anthropic();
        let req = build_request(
            &profile,
            "Quel temps ?",
            "Tu es Sofia.",
            "sk-ant-xyz",
            Duration::from_secs(20),
        );
        assert_eq!(req.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(req.header_value("x-api-key"), Some("sk-ant-xyz"));
        assert_eq!(req.header_value("anthropic-version"), Some("2023-06-01"));
        assert!(req.header_value("authorization").is_none());

        let body = req.body.unwrap();
        assert_eq!(body["model"], "claude-3-haiku-20240307");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(
            body["messages"][0]["content"],
            "Tu es Sofia.\n\nQuestion: Quel temps ?"
        );
    }

    #[test]
    fn test_extract_text() {
        let body = concat!(
            r#"{"id":"msg_1","content":[{"type":"text","text":"Bonjour"}],"#,
            r#""stop_reason":"end_turn"}"#
        );
        assert_eq!(extract_text(body).unwrap(), "Bonjour");
    }

    #[test]
    fn test_extract_text_skips_non_text_blocks() {
        let body =
            r#"{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"ok"}]}"#;
        assert_eq!(extract_text(body).unwrap(), "ok");
    }

    #[test]
    fn test_extract_text_no_blocks() {
        assert!(matches!(
            extract_text(r#"{"content":[]}"#),
            Err(FailureCause::MalformedResponse(_))
        ));
    }
}

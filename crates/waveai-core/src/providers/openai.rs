//! OpenAI chat completions wire format
//!
//! Also used for every OpenAI-compatible endpoint (Groq, Together, LM Studio...),
//! which only differ by base URL and model.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::transport::OutboundRequest;
use super::types::{FailureCause, ProviderProfile};

pub fn build_request(
    profile: &ProviderProfile,
    message: &str,
    instructions: &str,
    api_key: &str,
    timeout: Duration,
) -> OutboundRequest {
    let url = format!("{}/v1/chat/completions", profile.base_url);
    let body = OpenAiRequest {
        model: &profile.model,
        messages: vec![
            OpenAiMessage {
                role: "system",
                content: instructions,
            },
            OpenAiMessage {
                role: "user",
                content: message,
            },
        ],
        max_tokens: profile.max_tokens,
        temperature: profile.temperature,
    };

    OutboundRequest::post(url, serde_json::json!(body), timeout).bearer(api_key.trim())
}

/// Pull `choices[0].message.content` out of a response body
pub fn extract_text(body: &str) -> Result<String, FailureCause> {
    let resp: OpenAiApiResponse = serde_json::from_str(body)
        .map_err(|e| FailureCause::MalformedResponse(e.to_string()))?;
    resp.choices
        .into_iter()
        .next()
        .ok_or_else(|| FailureCause::MalformedResponse("response had no choices".to_string()))
        .map(|choice| choice.message.content.unwrap_or_default())
}

// ── OpenAI wire types ──

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiApiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::transport::HttpMethod;

    #[test]
    fn test_build_request_embeds_persona_as_system() {
        let profile = ProviderProfile::openai();
        let req = build_request(
            &profile,
            "Bonjour",
            "Tu es Kai.",
            " sk-test ",
            Duration::from_secs(20),
        );
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(req.header_value("Authorization"), Some("Bearer sk-test"));
        assert_eq!(req.timeout, Duration::from_secs(20));

        let body = req.body.unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Tu es Kai.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Bonjour");
    }

    #[test]
    fn test_compatible_profile_uses_its_base_url() {
        let profile =
            ProviderProfile::compatible("groq", "https://api.groq.com/openai", "llama3-70b");
        let req = build_request(&profile, "hi", "sys", "gsk_x", Duration::from_secs(10));
        assert_eq!(req.url, "https://api.groq.com/openai/v1/chat/completions");
        assert_eq!(req.body.unwrap()["model"], "llama3-70b");
    }

    #[test]
    fn test_extract_text() {
        let body = concat!(
            r#"{"choices":[{"message":{"role":"assistant","content":"Salut !"},"#,
            r#""finish_reason":"stop"}]}"#
        );
        assert_eq!(extract_text(body).unwrap(), "Salut !");
    }

    #[test]
    fn test_extract_text_null_content_is_empty() {
        let body = r#"{"choices":[{"message":{"content":null}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "");
    }

    #[test]
    fn test_extract_text_malformed() {
        assert!(matches!(
            extract_text(r#"{"choices":[]}"#),
            Err(FailureCause::MalformedResponse(_))
        ));
        assert!(matches!(
            extract_text("<html>oops</html>"),
            Err(FailureCause::MalformedResponse(_))
        ));
    }
}

//! Ollama native chat API, the local last-resort runtime

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::transport::OutboundRequest;
use super::types::{FailureCause, ProviderProfile};

pub fn build_request(
    profile: &ProviderProfile,
    message: &str,
    instructions: &str,
    timeout: Duration,
) -> OutboundRequest {
    let url = format!("{}/api/chat", profile.base_url);
    let body = OllamaRequest {
        model: &profile.model,
        messages: vec![
            OllamaMessage {
                role: "system",
                content: instructions,
            },
            OllamaMessage {
                role: "user",
                content: message,
            },
        ],
        stream: false,
        options: OllamaOptions {
            temperature: profile.temperature,
            num_predict: profile.max_tokens,
        },
    };
    OutboundRequest::post(url, serde_json::json!(body), timeout)
}

pub fn extract_text(body: &str) -> Result<String, FailureCause> {
    let resp: OllamaResponse = serde_json::from_str(body)
        .map_err(|e| FailureCause::MalformedResponse(e.to_string()))?;
    Ok(resp.message.content)
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

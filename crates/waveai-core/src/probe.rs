//! Key probes for the key-checking endpoint
//!
//! Unlike the resolver's shape check, an OpenAI probe makes a real request.
//! Anthropic has no cheap read-only endpoint, so its keys are judged by prefix.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::providers::{HttpTransport, OutboundRequest};

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const INVALID_FORMAT: &str = "Format invalide";

/// Result of checking one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCheck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl KeyCheck {
    fn passed() -> Self {
        Self { ok: true, error: None }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

/// Probe an OpenAI key by listing models
pub async fn check_openai_key(
    transport: &dyn HttpTransport,
    base_url: &str,
    key: &str,
) -> KeyCheck {
    let key = key.trim();
    if !key.starts_with("sk-") {
        return KeyCheck::failed(INVALID_FORMAT);
    }

    let url = format!("{}/v1/models", base_url.trim_end_matches('/'));
    let request = OutboundRequest::get(url, PROBE_TIMEOUT).bearer(key);
    match transport.send(request).await {
        Ok(response) if response.status == 200 => KeyCheck::passed(),
        Ok(response) => {
            debug!("OpenAI key probe returned {}", response.status);
            KeyCheck::failed(format!("Code {}", response.status))
        }
        Err(err) => KeyCheck::failed(err.to_string()),
    }
}

/// Check an Anthropic key by prefix only
pub fn check_anthropic_key(key: &str) -> KeyCheck {
    if key.trim().starts_with("sk-ant-") {
        KeyCheck::passed()
    } else {
        KeyCheck::failed(INVALID_FORMAT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{HttpResponse, TransportError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StatusTransport {
        result: Result<u16, TransportError>,
        seen: Mutex<Vec<OutboundRequest>>,
    }

    impl StatusTransport {
        fn new(result: Result<u16, TransportError>) -> Self {
            Self {
                result,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for StatusTransport {
        async fn send(&self, request: OutboundRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.result.clone().map(|status| HttpResponse {
                status,
                body: "{}".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_openai_probe_success() {
        let transport = StatusTransport::new(Ok(200));
        let check = check_openai_key(&transport, "https://api.openai.com/", " sk-abc ").await;
        assert_eq!(check, KeyCheck::passed());

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].url, "https://api.openai.com/v1/models");
        assert_eq!(seen[0].timeout, PROBE_TIMEOUT);
        assert_eq!(seen[0].header_value("authorization"), Some("Bearer sk-abc"));
    }

    #[tokio::test]
    async fn test_openai_probe_reports_status() {
        let transport = StatusTransport::new(Ok(401));
        let check = check_openai_key(&transport, "https://api.openai.com", "sk-abc").await;
        assert!(!check.ok);
        assert_eq!(check.error.as_deref(), Some("Code 401"));
    }

    #[tokio::test]
    async fn test_openai_probe_network_error() {
        let transport = StatusTransport::new(Err(TransportError::Timeout));
        let check = check_openai_key(&transport, "https://api.openai.com", "sk-abc").await;
        assert_eq!(check.error.as_deref(), Some("request timed out"));
    }

    #[tokio::test]
    async fn test_openai_bad_prefix_skips_network() {
        let transport = StatusTransport::new(Ok(200));
        let check = check_openai_key(&transport, "https://api.openai.com", "pk-abc").await;
        assert_eq!(check.error.as_deref(), Some("Format invalide"));
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_anthropic_prefix_check() {
        assert!(check_anthropic_key("sk-ant-whatever").ok);
        let bad = check_anthropic_key("sk-whatever");
        assert!(!bad.ok);
        assert_eq!(bad.error.as_deref(), Some("Format invalide"));
    }
}

//! HTTP-backed provider adapter
//!
//! Dispatches on [`ProviderKind`] to the matching wire format, sends the
//! request through an [`HttpTransport`] and turns every way a call can go
//! wrong into a [`ProviderError`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::credentials::Credential;

use super::transport::{HttpTransport, OutboundRequest};
use super::types::{FailureCause, ProviderAdapter, ProviderError, ProviderKind, ProviderProfile};
use super::{anthropic, gemini, ollama, openai};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const MIN_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_TIMEOUT: Duration = Duration::from_secs(25);

/// Adapter that talks to real provider endpoints
pub struct HttpAdapter {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl HttpAdapter {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-call timeout, clamped to the 10–25 s window
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.clamp(MIN_TIMEOUT, MAX_TIMEOUT);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build_request(
        &self,
        profile: &ProviderProfile,
        message: &str,
        instructions: &str,
        credential: &Credential,
    ) -> OutboundRequest {
        let key = credential.secret();
        match &profile.kind {
            ProviderKind::OpenAi | ProviderKind::Compatible(_) => {
                openai::build_request(profile, message, instructions, key, self.timeout)
            }
            ProviderKind::Anthropic => {
                anthropic::build_request(profile, message, instructions, key, self.timeout)
            }
            ProviderKind::Gemini => {
                gemini::build_request(profile, message, instructions, key, self.timeout)
            }
            ProviderKind::Ollama => {
                ollama::build_request(profile, message, instructions, self.timeout)
            }
        }
    }
}

/// Extract the answer text from a successful response body
fn extract_text(kind: &ProviderKind, body: &str) -> Result<String, FailureCause> {
    match kind {
        ProviderKind::OpenAi | ProviderKind::Compatible(_) => openai::extract_text(body),
        ProviderKind::Anthropic => anthropic::extract_text(body),
        ProviderKind::Gemini => gemini::extract_text(body),
        ProviderKind::Ollama => ollama::extract_text(body),
    }
}

#[async_trait]
impl ProviderAdapter for HttpAdapter {
    async fn call(
        &self,
        profile: &ProviderProfile,
        message: &str,
        instructions: &str,
        credential: &Credential,
    ) -> Result<String, ProviderError> {
        let kind = &profile.kind;
        let fail = |cause: FailureCause| ProviderError::new(kind.clone(), cause);

        let request = self.build_request(profile, message, instructions, credential);
        debug!(
            "{} request: model={}, key={:?}",
            kind, profile.model, credential
        );

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| fail(e.into()))?;

        if !response.is_success() {
            debug!(
                "{} answered status {}: {}",
                kind,
                response.status,
                truncate(&response.body, 200)
            );
            return Err(fail(FailureCause::from_status(response.status)));
        }

        let text = extract_text(kind, &response.body).map_err(fail)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(fail(FailureCause::EmptyResponse));
        }
        Ok(text.to_string())
    }
}

/// Truncate on a char boundary, appending an ellipsis when cut
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::transport::{HttpResponse, TransportError};
    use std::sync::Mutex;

    /// Transport that replays a canned result and remembers the request
    struct CannedTransport {
        result: Result<HttpResponse, TransportError>,
        seen: Mutex<Vec<OutboundRequest>>,
    }

    impl CannedTransport {
        fn respond(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(HttpResponse {
                    status,
                    body: body.to_string(),
                }),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn fail(err: TransportError) -> Arc<Self> {
            Arc::new(Self {
                result: Err(err),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for CannedTransport {
        async fn send(&self, request: OutboundRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.result.clone()
        }
    }

    fn openai_cred() -> Credential {
        Credential::user(ProviderKind::OpenAi, "openai_key", format!("sk-{}", "a".repeat(40)))
    }

    async fn call_openai(transport: Arc<CannedTransport>) -> Result<String, ProviderError> {
        let adapter = HttpAdapter::new(transport);
        adapter
            .call(&ProviderProfile::openai(), "hello", "Tu es Kai.", &openai_cred())
            .await
    }

    #[tokio::test]
    async fn test_success_extracts_trimmed_text() {
        let transport = CannedTransport::respond(
            200,
            r#"{"choices":[{"message":{"content":"  Bonjour !\n"}}]}"#,
        );
        let text = call_openai(transport.clone()).await.unwrap();
        assert_eq!(text, "Bonjour !");

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].timeout, DEFAULT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_whitespace_answer_is_failure() {
        let transport =
            CannedTransport::respond(200, r#"{"choices":[{"message":{"content":"   "}}]}"#);
        let err = call_openai(transport).await.unwrap_err();
        assert_eq!(err.kind, ProviderKind::OpenAi);
        assert_eq!(err.cause, FailureCause::EmptyResponse);
    }

    #[tokio::test]
    async fn test_status_codes_map_to_causes() {
        for (status, cause) in [
            (401, FailureCause::Unauthorized),
            (429, FailureCause::RateLimited),
            (400, FailureCause::BadRequest),
            (502, FailureCause::ServerError(502)),
            (404, FailureCause::UnexpectedStatus(404)),
        ] {
            let transport = CannedTransport::respond(status, r#"{"error":{"message":"nope"}}"#);
            let err = call_openai(transport).await.unwrap_err();
            assert_eq!(err.cause, cause, "status {}", status);
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let transport = CannedTransport::respond(200, "not json");
        let err = call_openai(transport).await.unwrap_err();
        assert!(matches!(err.cause, FailureCause::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_transport_failures() {
        let err = call_openai(CannedTransport::fail(TransportError::Timeout))
            .await
            .unwrap_err();
        assert_eq!(err.cause, FailureCause::Timeout);

        let err = call_openai(CannedTransport::fail(TransportError::Network(
            "connection refused".into(),
        )))
        .await
        .unwrap_err();
        assert!(matches!(err.cause, FailureCause::Network(_)));
    }

    #[tokio::test]
    async fn test_dispatches_anthropic_format() {
        let transport =
            CannedTransport::respond(200, r#"{"content":[{"type":"text","text":"Oui"}]}"#);
        let adapter = HttpAdapter::new(transport.clone());
        let cred = Credential::user(
            ProviderKind::Anthropic,
            "anthropic_key",
            format!("sk-ant-{}", "b".repeat(40)),
        );
        let text = adapter
            .call(&ProviderProfile::anthropic(), "q", "sys", &cred)
            .await
            .unwrap();
        assert_eq!(text, "Oui");
        let seen = transport.seen.lock().unwrap();
        assert!(seen[0].url.ends_with("/v1/messages"));
    }

    #[test]
    fn test_timeout_is_clamped() {
        let transport = CannedTransport::respond(200, "{}");
        let adapter = HttpAdapter::new(transport.clone()).with_timeout(Duration::from_secs(120));
        assert_eq!(adapter.timeout(), MAX_TIMEOUT);
        let adapter = HttpAdapter::new(transport).with_timeout(Duration::from_secs(1));
        assert_eq!(adapter.timeout(), MIN_TIMEOUT);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc…");
        assert_eq!(truncate("éééé", 2), "éé…");
    }
}

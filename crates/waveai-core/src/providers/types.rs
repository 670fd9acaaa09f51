//! Provider kinds, their fixed request profiles, and the adapter seam

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::credentials::Credential;

/// The closed set of provider kinds, declared in fallback priority order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Primary chat provider
    OpenAi,
    /// Secondary chat provider
    Anthropic,
    Gemini,
    /// Any endpoint speaking the OpenAI wire format, identified by name
    Compatible(String),
    /// Local runtime, tried last
    Ollama,
}

/// Expected shape of a provider credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialShape {
    pub prefix: &'static str,
    pub min_len: usize,
    /// Prefix that belongs to another provider and must be refused here
    pub foreign_prefix: Option<&'static str>,
}

impl ProviderKind {
    /// Machine name used in logs, config and API responses
    pub fn name(&self) -> &str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Compatible(name) => name,
            Self::Ollama => "ollama",
        }
    }

    /// Short tag shown in front of provider-backed answers
    pub fn label(&self) -> &str {
        match self {
            Self::OpenAi => "GPT",
            Self::Anthropic => "Claude",
            Self::Gemini => "Gemini",
            Self::Compatible(name) => name,
            Self::Ollama => "Ollama",
        }
    }

    /// Position in the fallback chain (lower goes first)
    pub fn rank(&self) -> u8 {
        match self {
            Self::OpenAi => 0,
            Self::Anthropic => 1,
            Self::Gemini => 2,
            Self::Compatible(_) => 3,
            Self::Ollama => 4,
        }
    }

    /// Credential shape, or `None` for keyless providers
    pub fn credential_shape(&self) -> Option<CredentialShape> {
        match self {
            Self::OpenAi => Some(CredentialShape {
                prefix: "sk-",
                min_len: 31,
                foreign_prefix: Some("sk-ant-"),
            }),
            Self::Anthropic => Some(CredentialShape {
                prefix: "sk-ant-",
                min_len: 31,
                foreign_prefix: None,
            }),
            Self::Gemini => Some(CredentialShape {
                prefix: "AIza",
                min_len: 39,
                foreign_prefix: None,
            }),
            Self::Compatible(_) => Some(CredentialShape {
                prefix: "",
                min_len: 20,
                foreign_prefix: None,
            }),
            Self::Ollama => None,
        }
    }

    pub fn requires_key(&self) -> bool {
        self.credential_shape().is_some()
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ProviderKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

const DEFAULT_MAX_TOKENS: u32 = 500;
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Fixed request parameters for one provider kind
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    pub kind: ProviderKind,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ProviderProfile {
    pub fn new(kind: ProviderKind, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn openai() -> Self {
        Self::new(ProviderKind::OpenAi, OPENAI_BASE_URL, "gpt-3.5-turbo")
    }

    pub fn anthropic() -> Self {
        Self::new(
            ProviderKind::Anthropic,
            ANTHROPIC_BASE_URL,
            "claude-3-haiku-20240307",
        )
    }

    pub fn gemini() -> Self {
        Self::new(ProviderKind::Gemini, GEMINI_BASE_URL, "gemini-1.5-flash")
    }

    pub fn compatible(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::new(ProviderKind::Compatible(name.into()), base_url, model)
    }

    pub fn ollama(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(ProviderKind::Ollama, base_url, model)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Why a single provider attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureCause {
    #[error("credential rejected")]
    Unauthorized,
    #[error("rate limited or quota exceeded")]
    RateLimited,
    #[error("request rejected as invalid")]
    BadRequest,
    #[error("server error (status {0})")]
    ServerError(u16),
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("empty response")]
    EmptyResponse,
}

impl FailureCause {
    /// Map a non-success HTTP status to a failure cause
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            429 => Self::RateLimited,
            400 => Self::BadRequest,
            500..=599 => Self::ServerError(status),
            other => Self::UnexpectedStatus(other),
        }
    }
}

/// A failed attempt against one provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} request failed: {cause}")]
pub struct ProviderError {
    pub kind: ProviderKind,
    pub cause: FailureCause,
}

impl ProviderError {
    pub fn new(kind: ProviderKind, cause: FailureCause) -> Self {
        Self { kind, cause }
    }
}

/// Sends one chat request to one provider and returns its plain text answer
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn call(
        &self,
        profile: &ProviderProfile,
        message: &str,
        instructions: &str,
        credential: &Credential,
    ) -> Result<String, ProviderError>;
}

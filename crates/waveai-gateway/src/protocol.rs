//! Gateway HTTP protocol — JSON bodies exchanged with web clients

use serde::Serialize;
use serde_json::{Map, Value};
use waveai_core::{
    CandidateCredentials, Persona, ProviderKind, ProviderUsed, Resolution, mask_secret,
};

// ── Error messages ──

pub const ERR_MISSING_FIELDS: &str = "Message et agent requis";
pub const ERR_INVALID_AGENT: &str = "Agent invalide";

/// Why a chat request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    MissingFields,
    InvalidAgent,
}

impl RequestError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingFields => ERR_MISSING_FIELDS,
            Self::InvalidAgent => ERR_INVALID_AGENT,
        }
    }
}

/// Client → Gateway chat request
///
/// Besides `message` and `agent`, every string field of the body is a
/// candidate credential keyed by its field name, kept in body order.
#[derive(Clone)]
pub struct ChatRequest {
    pub message: String,
    pub agent: Persona,
    pub credentials: CandidateCredentials,
}

impl std::fmt::Debug for ChatRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let credentials: Vec<(&str, String)> = self
            .credentials
            .iter()
            .map(|(alias, secret)| (alias.as_str(), mask_secret(secret)))
            .collect();
        f.debug_struct("ChatRequest")
            .field("message", &self.message)
            .field("agent", &self.agent)
            .field("credentials", &credentials)
            .finish()
    }
}

impl ChatRequest {
    pub fn from_body(body: &[u8]) -> Result<Self, RequestError> {
        let fields = parse_object(body).ok_or(RequestError::MissingFields)?;

        let (Some(Value::String(message)), Some(Value::String(agent))) =
            (fields.get("message"), fields.get("agent"))
        else {
            return Err(RequestError::MissingFields);
        };
        let agent = Persona::parse(agent).ok_or(RequestError::InvalidAgent)?;

        let credentials = fields
            .iter()
            .filter(|(name, _)| name.as_str() != "message" && name.as_str() != "agent")
            .filter_map(|(name, value)| match value {
                Value::String(secret) => Some((name.clone(), secret.clone())),
                _ => None,
            })
            .collect();

        Ok(Self {
            message: message.clone(),
            agent,
            credentials,
        })
    }
}

/// Client → Gateway key check request
#[derive(Clone, Default)]
pub struct KeyTestRequest {
    pub openai_key: Option<String>,
    pub anthropic_key: Option<String>,
}

impl std::fmt::Debug for KeyTestRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyTestRequest")
            .field("openai_key", &self.openai_key.as_deref().map(mask_secret))
            .field("anthropic_key", &self.anthropic_key.as_deref().map(mask_secret))
            .finish()
    }
}

impl KeyTestRequest {
    /// Empty or non-string keys count as absent
    pub fn from_body(body: &[u8]) -> Self {
        let fields = parse_object(body).unwrap_or_default();
        let key = |name: &str| match fields.get(name) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };
        Self {
            openai_key: key("openai_key"),
            anthropic_key: key("anthropic_key"),
        }
    }
}

fn parse_object(body: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Gateway → Client chat answer
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// Answer text with its provider label or offline prefix
    pub response: String,
    pub agent: Persona,
    pub provider_used: ProviderUsed,
    pub attempted: Vec<ProviderKind>,
    pub fallback: bool,
    pub timestamp: String,
}

impl ChatResponse {
    pub fn new(resolution: Resolution, timestamp: String) -> Self {
        Self {
            response: resolution.labelled_text(),
            fallback: resolution.is_fallback(),
            agent: resolution.persona,
            provider_used: resolution.provider_used,
            attempted: resolution.attempted,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub role: &'static str,
}

impl From<Persona> for AgentInfo {
    fn from(persona: Persona) -> Self {
        Self {
            id: persona.id(),
            name: persona.display_name(),
            role: persona.role(),
        }
    }
}

//! waveai-core - Provider fallback for the WaveAI persona assistants
//!
//! This crate provides:
//! - Credential shape validation for each provider kind
//! - Provider adapters for OpenAI, Anthropic, Gemini, OpenAI-compatible endpoints and Ollama
//! - The persona registry (alex, lina, marco, sofia, kai)
//! - A fallback resolver that tries providers in priority order and never fails
//! - An offline responder with canned per-persona answers
//! - Key probes used by the key-checking endpoint

pub mod credentials;
pub mod diagnostics;
pub mod offline;
pub mod personas;
pub mod probe;
pub mod providers;
pub mod resolver;

// Re-export main types for convenience
pub use credentials::{Credential, CredentialSource, mask_secret};
pub use diagnostics::{AttemptRecord, AttemptSink, TracingSink};
pub use offline::{FixedPicker, OfflineResponder, RandomPicker, VariantPicker};
pub use personas::Persona;
pub use probe::{KeyCheck, check_anthropic_key, check_openai_key};
pub use providers::{
    FailureCause, HttpAdapter, HttpTransport, ProviderAdapter, ProviderError, ProviderKind,
    ProviderProfile, ReqwestTransport,
};
pub use resolver::{CandidateCredentials, FallbackResolver, ProviderUsed, Resolution};

//! Provider adapters
//!
//! Each supported backend has a small wire-format module that knows how to
//! build its request and read its answer. [`HttpAdapter`] ties them to an
//! [`HttpTransport`]; the resolver only ever sees the [`ProviderAdapter`] trait.

pub mod adapter;
pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod transport;
pub mod types;

pub use adapter::HttpAdapter;
pub use transport::{
    HttpMethod, HttpResponse, HttpTransport, OutboundRequest, ReqwestTransport, TransportError,
};
pub use types::{
    CredentialShape, FailureCause, ProviderAdapter, ProviderError, ProviderKind, ProviderProfile,
};

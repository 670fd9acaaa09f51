//! Attempt records and the sink they are written to
//!
//! Records are advisory: sinks cannot fail and nothing reads them back
//! during a resolution.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::credentials::CredentialSource;
use crate::providers::adapter::truncate;
use crate::providers::{ProviderError, ProviderKind};

/// Longest error text kept in a record
pub const MAX_ERROR_CHARS: usize = 200;

/// Outcome of one provider attempt
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub provider: ProviderKind,
    pub source: CredentialSource,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl AttemptRecord {
    pub fn success(provider: ProviderKind, source: CredentialSource, elapsed: Duration) -> Self {
        Self {
            provider,
            source,
            success: true,
            error: None,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn failure(error: &ProviderError, source: CredentialSource, elapsed: Duration) -> Self {
        Self {
            provider: error.kind.clone(),
            source,
            success: false,
            error: Some(truncate(&error.cause.to_string(), MAX_ERROR_CHARS)),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Receives a record for every provider call the resolver makes
pub trait AttemptSink: Send + Sync {
    fn record(&self, record: &AttemptRecord);
}

/// Default sink, writes records as tracing events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AttemptSink for TracingSink {
    fn record(&self, record: &AttemptRecord) {
        match &record.error {
            None => info!(
                provider = %record.provider,
                source = %record.source,
                elapsed_ms = record.elapsed_ms,
                "Provider attempt succeeded"
            ),
            Some(error) => warn!(
                provider = %record.provider,
                source = %record.source,
                elapsed_ms = record.elapsed_ms,
                "Provider attempt failed: {}",
                error
            ),
        }
    }
}

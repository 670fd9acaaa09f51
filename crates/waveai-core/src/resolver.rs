//! Fallback resolver — tries providers in priority order, then answers offline
//!
//! Candidates are ordered by provider rank; within a provider, credentials the
//! caller supplied come first (in the order given) and the process default
//! comes last. Malformed credentials are skipped without a network call. The
//! first successful call ends the resolution, and if none succeeds the
//! [`OfflineResponder`] answers. [`FallbackResolver::resolve`] never fails.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::credentials::{self, Credential};
use crate::diagnostics::{AttemptRecord, AttemptSink, TracingSink};
use crate::offline::OfflineResponder;
use crate::personas::Persona;
use crate::providers::{ProviderAdapter, ProviderError, ProviderKind, ProviderProfile};

/// Caller-supplied credentials, alias → secret, in the order given
pub type CandidateCredentials = IndexMap<String, String>;

/// Which backend produced the answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderUsed {
    Provider(ProviderKind),
    Offline,
}

impl ProviderUsed {
    pub fn name(&self) -> &str {
        match self {
            Self::Provider(kind) => kind.name(),
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for ProviderUsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ProviderUsed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Result of trying the provider chain, before the offline step
#[derive(Debug)]
enum Outcome {
    Success { text: String, kind: ProviderKind },
    Exhausted,
}

/// What the caller gets back from a resolution
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub text: String,
    pub persona: Persona,
    pub provider_used: ProviderUsed,
    /// Providers actually called, in call order
    pub attempted: Vec<ProviderKind>,
    #[serde(skip)]
    pub failures: Vec<ProviderError>,
}

impl Resolution {
    pub fn is_fallback(&self) -> bool {
        self.provider_used == ProviderUsed::Offline
    }

    /// Answer with a provider tag (`[GPT] ...`); offline answers carry their own prefix
    pub fn labelled_text(&self) -> String {
        match &self.provider_used {
            ProviderUsed::Provider(kind) => format!("[{}] {}", kind.label(), self.text),
            ProviderUsed::Offline => self.text.clone(),
        }
    }
}

/// The provider-selection service; immutable once built and safe to share across tasks
pub struct FallbackResolver {
    /// Enabled providers, sorted by rank
    profiles: Vec<ProviderProfile>,
    server_credentials: Vec<Credential>,
    adapter: Arc<dyn ProviderAdapter>,
    offline: OfflineResponder,
    sink: Arc<dyn AttemptSink>,
}

impl std::fmt::Debug for FallbackResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackResolver")
            .field("profiles", &self.profiles)
            .field("server_credentials", &self.server_credentials)
            .finish_non_exhaustive()
    }
}

impl FallbackResolver {
    /// Resolver with the built-in OpenAI, Anthropic and Gemini profiles and no default keys
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            profiles: vec![
                ProviderProfile::openai(),
                ProviderProfile::anthropic(),
                ProviderProfile::gemini(),
            ],
            server_credentials: Vec::new(),
            adapter,
            offline: OfflineResponder::new(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Add or replace the profile for a provider kind.
    ///
    /// Keyless providers (Ollama) become candidates as soon as their profile is present.
    /// Replacing a profile drops the default keys registered for the old one.
    pub fn with_profile(mut self, profile: ProviderProfile) -> Self {
        let kind = profile.kind.clone();
        match self.profiles.iter_mut().find(|p| p.kind == kind) {
            Some(existing) => {
                *existing = profile;
                self.server_credentials
                    .retain(|c| c.kind != kind || !c.kind.requires_key());
            }
            None => self.profiles.push(profile),
        }
        // stable: compatible providers keep their registration order
        self.profiles.sort_by_key(|p| p.kind.rank());

        if !kind.requires_key() && !self.server_credentials.iter().any(|c| c.kind == kind) {
            self.server_credentials
                .push(Credential::configured(kind, String::new()));
        }
        self
    }

    /// Register a process-level default key; empty values are ignored
    pub fn with_server_credential(
        mut self,
        kind: ProviderKind,
        secret: impl Into<String>,
    ) -> Self {
        let credential = Credential::configured(kind, secret);
        if credential.secret().is_empty() && credential.kind.requires_key() {
            return self;
        }
        self.server_credentials.push(credential);
        self
    }

    pub fn with_offline_responder(mut self, offline: OfflineResponder) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn AttemptSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Enabled providers in fallback order
    pub fn providers(&self) -> impl Iterator<Item = &ProviderKind> {
        self.profiles.iter().map(|p| &p.kind)
    }

    /// Whether a default key is configured for `kind`
    pub fn has_server_credential(&self, kind: &ProviderKind) -> bool {
        self.server_credentials.iter().any(|c| &c.kind == kind)
    }

    fn alias_kind(&self, alias: &str) -> Option<ProviderKind> {
        if let Some(kind) = credentials::builtin_alias_kind(alias) {
            return Some(kind);
        }
        let alias = alias.trim().to_ascii_lowercase();
        let name = alias.strip_suffix("_key").unwrap_or(&alias);
        self.profiles.iter().find_map(|p| match &p.kind {
            ProviderKind::Compatible(n) if n.eq_ignore_ascii_case(name) => Some(p.kind.clone()),
            _ => None,
        })
    }

    /// Full ordered candidate list for one request
    fn candidates(&self, supplied: &CandidateCredentials) -> Vec<Credential> {
        let user: Vec<Credential> = supplied
            .iter()
            .filter(|(_, secret)| !secret.trim().is_empty())
            .filter_map(|(alias, secret)| match self.alias_kind(alias) {
                Some(kind) => Some(Credential::user(kind, alias.as_str(), secret.as_str())),
                None => {
                    debug!("Ignoring credential under unknown alias '{}'", alias);
                    None
                }
            })
            .collect();

        let mut ordered = Vec::new();
        for profile in &self.profiles {
            let mut seen: HashSet<&str> = HashSet::new();
            let for_kind = user
                .iter()
                .chain(self.server_credentials.iter())
                .filter(|c| c.kind == profile.kind);
            for credential in for_kind {
                if seen.insert(credential.secret()) {
                    ordered.push(credential.clone());
                }
            }
        }
        ordered
    }

    async fn try_providers(
        &self,
        message: &str,
        instructions: &str,
        supplied: &CandidateCredentials,
        attempted: &mut Vec<ProviderKind>,
        failures: &mut Vec<ProviderError>,
    ) -> Outcome {
        for credential in self.candidates(supplied) {
            if !credential.is_valid() {
                debug!(
                    "Skipping {} credential '{}': invalid shape",
                    credential.kind, credential.alias
                );
                continue;
            }
            let Some(profile) = self.profiles.iter().find(|p| p.kind == credential.kind) else {
                continue;
            };

            debug!("Trying {} ({})", profile.kind, credential.source);
            attempted.push(profile.kind.clone());
            let started = Instant::now();

            match self
                .adapter
                .call(profile, message, instructions, &credential)
                .await
            {
                Ok(text) => {
                    self.sink.record(&AttemptRecord::success(
                        profile.kind.clone(),
                        credential.source,
                        started.elapsed(),
                    ));
                    return Outcome::Success {
                        text,
                        kind: profile.kind.clone(),
                    };
                }
                Err(err) => {
                    self.sink.record(&AttemptRecord::failure(
                        &err,
                        credential.source,
                        started.elapsed(),
                    ));
                    failures.push(err);
                }
            }
        }
        Outcome::Exhausted
    }

    /// Answer `message` as `persona_id`, using the first provider that works.
    ///
    /// Unknown personas resolve to the default persona. Provider failures are
    /// recorded in the returned [`Resolution`], never returned as errors.
    pub async fn resolve(
        &self,
        message: &str,
        persona_id: &str,
        supplied: &CandidateCredentials,
    ) -> Resolution {
        let persona = Persona::from_id(persona_id);
        let instructions = persona.instructions();
        let mut attempted = Vec::new();
        let mut failures = Vec::new();

        let outcome = self
            .try_providers(message, instructions, supplied, &mut attempted, &mut failures)
            .await;

        match outcome {
            Outcome::Success { text, kind } => {
                if attempted.len() > 1 {
                    info!(
                        "Answered by failover provider {} after {} attempts",
                        kind,
                        attempted.len()
                    );
                }
                Resolution {
                    text,
                    persona,
                    provider_used: ProviderUsed::Provider(kind),
                    attempted,
                    failures,
                }
            }
            Outcome::Exhausted => {
                info!(
                    "No provider answered for {} ({} attempted), using offline responder",
                    persona,
                    attempted.len()
                );
                Resolution {
                    text: self.offline.respond(persona, message),
                    persona,
                    provider_used: ProviderUsed::Offline,
                    attempted,
                    failures,
                }
            }
        }
    }
}

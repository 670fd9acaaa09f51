use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use waveai_core::providers::adapter::{MAX_TIMEOUT, MIN_TIMEOUT};
use waveai_core::providers::types::{OLLAMA_BASE_URL, OPENAI_BASE_URL};
use waveai_core::{
    FallbackResolver, HttpAdapter, HttpTransport, ProviderKind, ProviderProfile, mask_secret,
};

/// Lookup used for `${VAR}` expansion and the environment fallback
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaveConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub openai: Option<ProviderConfig>,
    #[serde(default)]
    pub anthropic: Option<ProviderConfig>,
    #[serde(default)]
    pub gemini: Option<ProviderConfig>,
    #[serde(default)]
    pub compatible: Vec<CompatibleConfig>,
    #[serde(default)]
    pub ollama: Option<OllamaConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            openai: None,
            anthropic: None,
            gemini: None,
            compatible: Vec::new(),
            ollama: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    20
}

/// Overrides for one of the built-in providers
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl ProviderConfig {
    fn with_key(api_key: String) -> Self {
        Self {
            api_key,
            ..Self::default()
        }
    }

    fn apply(&self, mut profile: ProviderProfile) -> ProviderProfile {
        if let Some(base_url) = &self.base_url {
            profile.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(model) = &self.model {
            profile.model = model.clone();
        }
        apply_sampling(profile, self.max_tokens, self.temperature)
    }
}

/// An OpenAI-compatible endpoint (Groq, Together, a local proxy...)
#[derive(Clone, Serialize, Deserialize)]
pub struct CompatibleConfig {
    pub name: String,
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl std::fmt::Debug for CompatibleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompatibleConfig")
            .field("name", &self.name)
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

fn default_ollama_base_url() -> String {
    OLLAMA_BASE_URL.to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn apply_sampling(
    mut profile: ProviderProfile,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
) -> ProviderProfile {
    if let Some(max_tokens) = max_tokens {
        profile = profile.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = temperature {
        profile = profile.with_temperature(temperature);
    }
    profile
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".waveai")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl WaveConfig {
    /// Load from `custom_path`, or the default location, or the environment
    /// when no default config file exists.
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let lookup = |name: &str| std::env::var(name).ok();
        match custom_path {
            Some(path) => Self::load_file(path, &lookup),
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::load_file(&path, &lookup)
                } else {
                    info!(
                        "No config at {}, reading provider keys from the environment",
                        path.display()
                    );
                    Ok(Self::from_env(&lookup))
                }
            }
        }
    }

    pub fn load_file(path: &Path, lookup: EnvLookup<'_>) -> Result<Self> {
        // Refuse configs readable by group or other, they may contain keys
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(path) {
                let mode = metadata.permissions().mode();
                if mode & 0o077 != 0 {
                    bail!(
                        "Config file {:?} has overly permissive permissions ({:o}). \
                         It may contain secrets. Fix with: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path
                    );
                }
            }
        }

        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `waveai init` first.",
                path.display()
            )
        })?;

        for key in hardcoded_keys(&content) {
            warn!(
                "API key for [{}] is hardcoded in config file. For security, reference an \
                 environment variable instead, e.g. api_key = \"${{OPENAI_API_KEY}}\"",
                key
            );
        }

        let expanded = expand_env_vars(&content, lookup);
        let mut config: Self = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        config.providers.clamp_timeout();
        Ok(config)
    }

    /// Configuration built from `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`,
    /// `GEMINI_API_KEY` and `PORT`
    pub fn from_env(lookup: EnvLookup<'_>) -> Self {
        let key = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(ProviderConfig::with_key)
        };

        let mut config = Self::default();
        config.providers.openai = key("OPENAI_API_KEY");
        config.providers.anthropic = key("ANTHROPIC_API_KEY");
        config.providers.gemini = key("GEMINI_API_KEY");

        if let Some(port) = lookup("PORT") {
            match port.trim().parse() {
                Ok(port) => config.server.port = port,
                Err(_) => warn!("Ignoring invalid PORT value '{}'", port),
            }
        }
        config
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.bind, self.server.port);
        addr.parse()
            .with_context(|| format!("Invalid server address {}", addr))
    }

    /// Base URL the key probe should hit for OpenAI
    pub fn openai_base_url(&self) -> String {
        self.providers
            .openai
            .as_ref()
            .and_then(|c| c.base_url.clone())
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string())
    }

    /// Build the resolver described by this configuration
    pub fn build_resolver(&self, transport: Arc<dyn HttpTransport>) -> FallbackResolver {
        let providers = &self.providers;
        let adapter = HttpAdapter::new(transport).with_timeout(providers.timeout());
        let mut resolver = FallbackResolver::new(Arc::new(adapter));

        let builtins = [
            (&providers.openai, ProviderProfile::openai()),
            (&providers.anthropic, ProviderProfile::anthropic()),
            (&providers.gemini, ProviderProfile::gemini()),
        ];
        for (config, profile) in builtins {
            let Some(config) = config else {
                continue;
            };
            let kind = profile.kind.clone();
            resolver = resolver
                .with_profile(config.apply(profile))
                .with_server_credential(kind, config.api_key.clone());
        }

        let mut seen: HashSet<String> = HashSet::new();
        for compat in &providers.compatible {
            let name = compat.name.trim().to_ascii_lowercase();
            if is_reserved_name(&name) {
                warn!(
                    "Skipping compatible provider with reserved or empty name '{}'",
                    compat.name
                );
                continue;
            }
            if !seen.insert(name.clone()) {
                warn!(
                    "Skipping duplicate compatible provider '{}', only the first entry is used",
                    compat.name
                );
                continue;
            }
            let profile = apply_sampling(
                ProviderProfile::compatible(
                    name.clone(),
                    compat.base_url.as_str(),
                    compat.model.as_str(),
                ),
                compat.max_tokens,
                compat.temperature,
            );
            resolver = resolver
                .with_profile(profile)
                .with_server_credential(ProviderKind::Compatible(name), compat.api_key.clone());
        }

        if let Some(ollama) = &providers.ollama {
            let profile = apply_sampling(
                ProviderProfile::ollama(ollama.base_url.as_str(), ollama.model.as_str()),
                ollama.max_tokens,
                ollama.temperature,
            );
            resolver = resolver.with_profile(profile);
        }

        resolver
    }

    /// Copy with every API key masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let providers = &mut copy.providers;
        for config in [
            &mut providers.openai,
            &mut providers.anthropic,
            &mut providers.gemini,
        ]
        .into_iter()
        .flatten()
        {
            config.api_key = mask_secret(&config.api_key);
        }
        for compat in &mut providers.compatible {
            compat.api_key = mask_secret(&compat.api_key);
        }
        copy
    }
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn clamp_timeout(&mut self) {
        let clamped = self
            .timeout_secs
            .clamp(MIN_TIMEOUT.as_secs(), MAX_TIMEOUT.as_secs());
        if clamped != self.timeout_secs {
            warn!(
                "providers.timeout_secs = {} is out of range, using {}",
                self.timeout_secs, clamped
            );
            self.timeout_secs = clamped;
        }
    }
}

/// Names a compatible provider cannot take: built-in aliases and the
/// names already used in `provider_used`
fn is_reserved_name(name: &str) -> bool {
    name.is_empty()
        || waveai_core::credentials::builtin_alias_kind(name).is_some()
        || name == ProviderKind::Ollama.name()
        || name == "offline"
}

/// Sections whose `api_key` holds a literal value instead of a `${VAR}` reference
fn hardcoded_keys(content: &str) -> Vec<String> {
    let mut section = String::from("root");
    let mut found = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            section = line.trim_matches(|c| c == '[' || c == ']').to_string();
            continue;
        }
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        if name.trim() != "api_key" {
            continue;
        }
        let value = value.trim().trim_matches('"');
        if !value.is_empty() && !value.contains("${") {
            found.push(section.clone());
        }
    }
    found
}

/// Allowlist of environment variable names that may be expanded in config files.
/// This prevents an attacker who can modify the config from reading arbitrary env vars.
const ALLOWED_ENV_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "GEMINI_API_KEY",
    "CUSTOM_LLM_API_KEY",
    "WAVEAI_PORT",
    "HOME",
    "USER",
];

fn expand_env_vars(s: &str, lookup: EnvLookup<'_>) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while let Some(start) = result[pos..].find("${") {
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = &result[abs_start + 2..abs_start + end];

        if !ALLOWED_ENV_VARS.contains(&var_name) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            pos = abs_start + end + 1;
            continue;
        }

        let value = lookup(var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value.len();
    }
    result
}

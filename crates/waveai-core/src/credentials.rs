//! Credentials and the shape validator
//!
//! A credential is only ever sent to a provider after [`is_valid`] accepts it,
//! so obviously broken keys never cost a network round-trip.

use crate::providers::ProviderKind;

/// Keys shorter than this are rejected before any provider-specific check
pub const MIN_CREDENTIAL_LEN: usize = 20;

/// Where a credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// Supplied by the caller for this request only
    User,
    /// Process default loaded at startup
    Configured,
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Configured => write!(f, "configured"),
        }
    }
}

/// A secret bound to a provider kind
#[derive(Clone)]
pub struct Credential {
    pub kind: ProviderKind,
    pub source: CredentialSource,
    /// Name the caller used for this key (e.g. `openai_key`)
    pub alias: String,
    secret: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("alias", &self.alias)
            .field("secret", &mask_secret(&self.secret))
            .finish()
    }
}

impl Credential {
    pub fn user(kind: ProviderKind, alias: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            kind,
            source: CredentialSource::User,
            alias: alias.into(),
            secret: secret.into().trim().to_string(),
        }
    }

    pub fn configured(kind: ProviderKind, secret: impl Into<String>) -> Self {
        let alias = format!("{}:config", kind.name());
        Self {
            kind,
            source: CredentialSource::Configured,
            alias,
            secret: secret.into().trim().to_string(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Whether the secret has the right shape for its provider
    pub fn is_valid(&self) -> bool {
        is_valid(&self.kind, Some(&self.secret))
    }
}

/// Check a raw credential against the expected shape for `kind`.
///
/// Keyless providers accept anything, including a missing value.
pub fn is_valid(kind: &ProviderKind, raw: Option<&str>) -> bool {
    let Some(shape) = kind.credential_shape() else {
        return true;
    };
    let Some(raw) = raw else {
        return false;
    };
    let key = raw.trim();
    let len = key.chars().count();
    if len < MIN_CREDENTIAL_LEN || len < shape.min_len {
        return false;
    }
    if let Some(foreign) = shape.foreign_prefix {
        if key.starts_with(foreign) {
            return false;
        }
    }
    key.starts_with(shape.prefix)
}

/// Map a caller-supplied alias to a built-in provider kind
pub fn builtin_alias_kind(alias: &str) -> Option<ProviderKind> {
    match alias.trim().to_ascii_lowercase().as_str() {
        "openai" | "openai_key" | "openai_api_key" | "gpt" | "gpt_key" => {
            Some(ProviderKind::OpenAi)
        }
        "anthropic" | "anthropic_key" | "anthropic_api_key" | "claude" | "claude_key" => {
            Some(ProviderKind::Anthropic)
        }
        "gemini" | "gemini_key" | "google" | "google_key" | "google_api_key" => {
            Some(ProviderKind::Gemini)
        }
        _ => None,
    }
}

/// Mask a secret for safe display in Debug output and logs.
/// Shows the first 3 and last 4 chars for keys longer than 7 chars, otherwise "***".
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai_key() -> String {
        format!("sk-{}", "a".repeat(40))
    }

    fn anthropic_key() -> String {
        format!("sk-ant-{}", "b".repeat(40))
    }

    #[test]
    fn test_rejects_missing_and_empty() {
        assert!(!is_valid(&ProviderKind::OpenAi, None));
        assert!(!is_valid(&ProviderKind::OpenAi, Some("")));
        assert!(!is_valid(&ProviderKind::OpenAi, Some("   ")));
    }

    #[test]
    fn test_rejects_short_keys() {
        assert!(!is_valid(&ProviderKind::OpenAi, Some("sk-short")));
        // long enough for the global floor but not for OpenAI
        assert!(!is_valid(&ProviderKind::OpenAi, Some("sk-aaaaaaaaaaaaaaaaaaaaa")));
        assert!(!is_valid(
            &ProviderKind::Compatible("groq".into()),
            Some("gsk_123456789")
        ));
    }

    #[test]
    fn test_openai_shape() {
        assert!(is_valid(&ProviderKind::OpenAi, Some(&openai_key())));
        assert!(is_valid(
            &ProviderKind::OpenAi,
            Some(&format!("  {}  ", openai_key()))
        ));
        assert!(!is_valid(
            &ProviderKind::OpenAi,
            Some(&format!("pk-{}", "a".repeat(40)))
        ));
        // an Anthropic key is not an OpenAI key even though it starts with sk-
        assert!(!is_valid(&ProviderKind::OpenAi, Some(&anthropic_key())));
    }

    #[test]
    fn test_anthropic_shape() {
        assert!(is_valid(&ProviderKind::Anthropic, Some(&anthropic_key())));
        assert!(!is_valid(&ProviderKind::Anthropic, Some(&openai_key())));
    }

    #[test]
    fn test_gemini_shape() {
        let key = format!("AIza{}", "c".repeat(35));
        assert!(is_valid(&ProviderKind::Gemini, Some(&key)));
        assert!(!is_valid(&ProviderKind::Gemini, Some(&key[..30])));
    }

    #[test]
    fn test_compatible_has_no_prefix() {
        let kind = ProviderKind::Compatible("together".into());
        assert!(is_valid(&kind, Some("tg_0123456789abcdefghij")));
    }

    #[test]
    fn test_keyless_accepts_anything() {
        assert!(is_valid(&ProviderKind::Ollama, None));
        assert!(is_valid(&ProviderKind::Ollama, Some("")));
    }

    #[test]
    fn test_builtin_aliases() {
        assert_eq!(builtin_alias_kind("openai_key"), Some(ProviderKind::OpenAi));
        assert_eq!(builtin_alias_kind("GPT"), Some(ProviderKind::OpenAi));
        assert_eq!(
            builtin_alias_kind("claude_key"),
            Some(ProviderKind::Anthropic)
        );
        assert_eq!(builtin_alias_kind("google_api_key"), Some(ProviderKind::Gemini));
        assert_eq!(builtin_alias_kind("message"), None);
    }

    #[test]
    fn test_credential_trims_and_masks() {
        let padded = format!(" {} ", openai_key());
        let cred = Credential::user(ProviderKind::OpenAi, "openai_key", padded);
        assert_eq!(cred.secret(), openai_key());
        assert!(cred.is_valid());
        let debug = format!("{:?}", cred);
        assert!(!debug.contains(&openai_key()));
        assert!(debug.contains("sk-...aaaa"));
    }

    #[test]
    fn test_configured_alias() {
        let cred = Credential::configured(ProviderKind::Anthropic, anthropic_key());
        assert_eq!(cred.source, CredentialSource::Configured);
        assert_eq!(cred.alias, "anthropic:config");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("sk-1234567890"), "sk-...7890");
    }
}

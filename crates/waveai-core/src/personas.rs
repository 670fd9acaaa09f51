//! Persona registry — the fixed set of chat agents and their instructions
//!
//! Every provider call is conditioned by the persona's instruction text, no
//! matter which backend ends up answering. Identifiers coming from the outside
//! world are converted here; anything unrecognised becomes [`Persona::Kai`].

use serde::{Deserialize, Serialize};

/// A named chat agent with fixed instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    Alex,
    Lina,
    Marco,
    Sofia,
    #[default]
    Kai,
}

impl Persona {
    /// All personas in display order
    pub const ALL: [Persona; 5] = [
        Persona::Alex,
        Persona::Lina,
        Persona::Marco,
        Persona::Sofia,
        Persona::Kai,
    ];

    /// Strict lookup, `None` when the identifier is not a known persona
    pub fn parse(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL
            .into_iter()
            .find(|persona| persona.id().eq_ignore_ascii_case(id))
    }

    /// Lenient lookup used by the resolver: unknown identifiers map to the default persona
    pub fn from_id(id: &str) -> Self {
        Self::parse(id).unwrap_or_default()
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Alex => "alex",
            Self::Lina => "lina",
            Self::Marco => "marco",
            Self::Sofia => "sofia",
            Self::Kai => "kai",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Alex => "Alex",
            Self::Lina => "Lina",
            Self::Marco => "Marco",
            Self::Sofia => "Sofia",
            Self::Kai => "Kai",
        }
    }

    /// Short role shown next to the name in agent listings
    pub fn role(&self) -> &'static str {
        match self {
            Self::Alex => "Assistant productivité",
            Self::Lina => "Experte LinkedIn",
            Self::Marco => "Expert réseaux sociaux",
            Self::Sofia => "Assistante organisation",
            Self::Kai => "Assistant conversationnel",
        }
    }

    /// System instructions sent with every provider request for this persona
    pub fn instructions(&self) -> &'static str {
        match self {
            Self::Alex => {
                "Tu es Alex, assistant productivité. Tu aides avec Gmail, emails et tâches professionnelles. Réponds en français, sois professionnel mais amical."
            }
            Self::Lina => {
                "Tu es Lina, experte LinkedIn. Tu aides avec le networking, posts LinkedIn et stratégie professionnelle. Réponds en français, sois inspirant."
            }
            Self::Marco => {
                "Tu es Marco, expert réseaux sociaux. Tu crées du contenu viral et optimises la présence sociale. Réponds en français, sois créatif."
            }
            Self::Sofia => {
                "Tu es Sofia, assistante organisation. Tu gères calendriers, plannings et rappels. Réponds en français, sois précise et organisée."
            }
            Self::Kai => {
                "Tu es Kai, assistant conversationnel. Tu discutes de tout avec intelligence et humour. Réponds en français, sois naturel et engageant."
            }
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Instructions for a raw persona identifier, falling back to the default persona
pub fn instructions_for(persona_id: &str) -> &'static str {
    Persona::from_id(persona_id).instructions()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_ids() {
        assert_eq!(Persona::parse("sofia"), Some(Persona::Sofia));
        assert_eq!(Persona::parse(" Marco "), Some(Persona::Marco));
        assert_eq!(Persona::parse("KAI"), Some(Persona::Kai));
        assert_eq!(Persona::parse("bob"), None);
        assert_eq!(Persona::parse(""), None);
    }

    #[test]
    fn test_unknown_id_maps_to_kai() {
        assert_eq!(Persona::from_id("unknown-agent-xyz"), Persona::Kai);
        assert_eq!(
            instructions_for("unknown-agent-xyz"),
            instructions_for("kai")
        );
        // repeatable
        assert_eq!(
            instructions_for("unknown-agent-xyz"),
            instructions_for("another-unknown")
        );
    }

    #[test]
    fn test_instructions_are_distinct() {
        for a in Persona::ALL {
            assert!(a.instructions().contains(a.display_name()));
            for b in Persona::ALL {
                if a != b {
                    assert_ne!(a.instructions(), b.instructions());
                }
            }
        }
    }

    #[test]
    fn test_serde_roundtrip_lowercase() {
        let json = serde_json::to_string(&Persona::Lina).unwrap();
        assert_eq!(json, "\"lina\"");
        let back: Persona = serde_json::from_str("\"alex\"").unwrap();
        assert_eq!(back, Persona::Alex);
    }

    #[test]
    fn test_display_matches_id() {
        assert_eq!(Persona::Sofia.to_string(), "sofia");
    }
}

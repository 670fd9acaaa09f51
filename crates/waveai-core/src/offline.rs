//! Offline responder — canned answers when every provider failed
//!
//! Each persona owns an ordered list of keyword groups. The first group with a
//! keyword contained in the (lowercased) message wins; otherwise the persona's
//! default replies are used. Which variant of a group is returned is left to a
//! [`VariantPicker`], random in production.

use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use crate::personas::Persona;

/// Marks every canned answer so callers can tell it from a provider answer
pub const FALLBACK_PREFIX: &str = "[Mode Fallback] ";

const API_HINT: &str = " 💡 Ajoutez votre clé API dans Configuration pour activer GPT/Claude !";
const API_HINT_WORDS: &[&str] = &["api", "gpt", "openai"];
const LAST_RESORT: &str =
    "Je suis momentanément en mode hors ligne, mais je reste à votre écoute !";

/// Chooses one of `count` variants
pub trait VariantPicker: Send + Sync {
    /// Must return an index below `count` (`count` is never zero)
    fn pick(&self, count: usize) -> usize;
}

/// Uniform random choice
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPicker;

impl VariantPicker for RandomPicker {
    fn pick(&self, count: usize) -> usize {
        rand::thread_rng().gen_range(0..count.max(1))
    }
}

/// Always the same index (wrapped), for deterministic output
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPicker(pub usize);

impl VariantPicker for FixedPicker {
    fn pick(&self, count: usize) -> usize {
        if count == 0 { 0 } else { self.0 % count }
    }
}

struct KeywordGroup {
    keywords: &'static [&'static str],
    variants: &'static [&'static str],
}

struct PersonaReplies {
    groups: &'static [KeywordGroup],
    defaults: &'static [&'static str],
}

static ALEX: PersonaReplies = PersonaReplies {
    groups: &[
        KeywordGroup {
            keywords: &["mail", "inbox", "boîte de réception"],
            variants: &[
                "Pour organiser vos emails, je recommande de créer des dossiers par projet et d'utiliser des règles de tri automatiques.",
                "Une bonne pratique est de traiter vos emails en blocs de temps dédiés, plutôt qu'en continu.",
                "Visez l'inbox zéro : archivez, déléguez ou répondez à chaque message dès la première lecture.",
            ],
        },
        KeywordGroup {
            keywords: &["réunion", "meeting"],
            variants: &[
                "Une réunion efficace commence par un ordre du jour envoyé à l'avance et se termine par une liste d'actions.",
                "Limitez vos réunions à 30 minutes par défaut : la plupart des sujets n'ont pas besoin de plus.",
            ],
        },
        KeywordGroup {
            keywords: &["tâche", "todo", "priorit"],
            variants: &[
                "Classez vos tâches avec la matrice d'Eisenhower : faites l'urgent-important, planifiez l'important, déléguez le reste.",
                "Commencez la journée par la tâche la plus importante, avant d'ouvrir votre messagerie.",
            ],
        },
    ],
    defaults: &[
        "Je vous aiderai avec vos emails dès que les services IA premium seront configurés. En attendant, voici quelques conseils généraux pour la productivité...",
        "Une bonne pratique est de traiter vos emails en blocs de temps dédiés, plutôt qu'en continu.",
    ],
};

static LINA: PersonaReplies = PersonaReplies {
    groups: &[
        KeywordGroup {
            keywords: &["profil", "profile", "titre"],
            variants: &[
                "Un profil LinkedIn optimisé doit avoir une photo professionnelle, un titre accrocheur et un résumé qui met en valeur vos compétences.",
                "Demandez des recommandations à d'anciens collègues : elles renforcent la crédibilité de votre profil.",
            ],
        },
        KeywordGroup {
            keywords: &["post", "publication", "contenu"],
            variants: &[
                "Pour améliorer votre visibilité, postez régulièrement du contenu de qualité dans votre domaine.",
                "Les posts qui racontent une expérience vécue et se terminent par une question génèrent plus d'engagement.",
            ],
        },
        KeywordGroup {
            keywords: &["réseau", "network", "connexion", "contact"],
            variants: &[
                "N'hésitez pas à commenter les posts d'autres professionnels de votre secteur pour créer des connexions authentiques.",
                "Personnalisez toujours vos demandes de connexion avec une phrase expliquant pourquoi vous souhaitez échanger.",
            ],
        },
    ],
    defaults: &[
        "LinkedIn est un outil puissant ! Pour améliorer votre visibilité, postez régulièrement du contenu de qualité dans votre domaine.",
        "N'hésitez pas à commenter les posts d'autres professionnels de votre secteur pour créer des connexions authentiques.",
        "Un profil LinkedIn optimisé doit avoir une photo professionnelle, un titre accrocheur et un résumé qui met en valeur vos compétences.",
    ],
};

static MARCO: PersonaReplies = PersonaReplies {
    groups: &[
        KeywordGroup {
            keywords: &["instagram", "tiktok", "vidéo", "video", "story", "reel"],
            variants: &[
                "Le contenu visuel performe toujours mieux sur les réseaux sociaux ! Pensez images, vidéos courtes et stories.",
                "Sur les formats courts, accrochez en moins de 3 secondes : la première image décide si l'on reste.",
            ],
        },
        KeywordGroup {
            keywords: &["viral", "engagement", "abonné", "followers"],
            variants: &[
                "Interagissez avec votre audience ! Répondez aux commentaires et posez des questions dans vos posts.",
                "Le contenu qui devient viral suscite une émotion forte : surprise, humour ou utilité immédiate.",
            ],
        },
        KeywordGroup {
            keywords: &["fréquence", "régulier", "régularité", "combien de fois"],
            variants: &[
                "La régularité est clé sur les réseaux sociaux. Mieux vaut poster 3 fois par semaine que 10 fois puis rien pendant un mois.",
            ],
        },
    ],
    defaults: &[
        "Le contenu visuel performe toujours mieux sur les réseaux sociaux ! Pensez images, vidéos courtes et stories.",
        "La régularité est clé sur les réseaux sociaux. Mieux vaut poster 3 fois par semaine que 10 fois puis rien pendant un mois.",
        "Interagissez avec votre audience ! Répondez aux commentaires et posez des questions dans vos posts.",
    ],
};

static SOFIA: PersonaReplies = PersonaReplies {
    groups: &[
        KeywordGroup {
            keywords: &["calendrier", "agenda", "rendez-vous", "rdv"],
            variants: &[
                "Utilisez un calendrier unique pour tous vos rendez-vous et bloquez du temps pour vos tâches importantes.",
                "Laissez 10 minutes de marge entre deux rendez-vous dans votre calendrier pour absorber les imprévus.",
                "Revoyez votre calendrier chaque dimanche soir pour préparer la semaine à venir.",
            ],
        },
        KeywordGroup {
            keywords: &["rappel", "oubli", "reminder"],
            variants: &[
                "Programmez vos rappels au moment où vous pourrez agir, pas seulement à l'heure de l'échéance.",
                "Un rappel la veille et un autre une heure avant suffisent pour ne plus rien oublier.",
            ],
        },
        KeywordGroup {
            keywords: &["procrastin", "motivation", "concentr", "focus"],
            variants: &[
                "La règle des 2 minutes : si une tâche prend moins de 2 minutes, faites-la immédiatement !",
                "Essayez la technique Pomodoro : 25 minutes de concentration, 5 minutes de pause.",
            ],
        },
    ],
    defaults: &[
        "Pour une organisation optimale, je recommande la méthode GTD (Getting Things Done) : capturer, clarifier, organiser, réfléchir, agir.",
        "Utilisez un calendrier unique pour tous vos rendez-vous et bloquez du temps pour vos tâches importantes.",
        "La règle des 2 minutes : si une tâche prend moins de 2 minutes, faites-la immédiatement !",
    ],
};

static KAI: PersonaReplies = PersonaReplies {
    groups: &[
        KeywordGroup {
            keywords: &["bonjour", "salut", "hello", "coucou"],
            variants: &[
                "Salut ! Je suis là pour discuter de tout et n'importe quoi. Qu'est-ce qui vous intéresse aujourd'hui ?",
                "Bonjour ! Ravi de vous lire. De quoi voulez-vous parler ?",
            ],
        },
        KeywordGroup {
            keywords: &["blague", "drôle", "humour"],
            variants: &[
                "Pourquoi les plongeurs plongent-ils toujours en arrière ? Parce que sinon ils tombent dans le bateau !",
                "Mon humour fonctionne mieux avec une vraie IA derrière... mais je fais de mon mieux en mode fallback !",
            ],
        },
        KeywordGroup {
            keywords: &["merci"],
            variants: &["Avec plaisir ! N'hésitez pas si vous avez d'autres questions."],
        },
    ],
    defaults: &[
        "C'est une question intéressante ! Pour une réponse plus personnalisée, ajoutez vos clés API dans la configuration.",
        "Je suis là pour discuter de tout et n'importe quoi ! Qu'est-ce qui vous intéresse aujourd'hui ?",
        "En mode fallback, je donne des conseils généraux. Configurez une API pour des réponses sur mesure !",
    ],
};

fn replies_for(persona: Persona) -> &'static PersonaReplies {
    match persona {
        Persona::Alex => &ALEX,
        Persona::Lina => &LINA,
        Persona::Marco => &MARCO,
        Persona::Sofia => &SOFIA,
        Persona::Kai => &KAI,
    }
}

/// Deterministic last-resort answer generator, no network involved
#[derive(Clone)]
pub struct OfflineResponder {
    picker: Arc<dyn VariantPicker>,
}

impl Default for OfflineResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OfflineResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineResponder").finish_non_exhaustive()
    }
}

impl OfflineResponder {
    /// Responder with random variant selection
    pub fn new() -> Self {
        Self::with_picker(RandomPicker)
    }

    pub fn with_picker(picker: impl VariantPicker + 'static) -> Self {
        Self {
            picker: Arc::new(picker),
        }
    }

    /// Keyword that selects the reply group for this message, if any
    pub fn matched_keyword(persona: Persona, message: &str) -> Option<&'static str> {
        matching_group(replies_for(persona), &message.to_lowercase())
            .map(|(_, keyword)| keyword)
    }

    /// Canned answer for `persona`, always non-empty and prefixed with [`FALLBACK_PREFIX`]
    pub fn respond(&self, persona: Persona, message: &str) -> String {
        let replies = replies_for(persona);
        let lower = message.to_lowercase();

        let variants = match matching_group(replies, &lower) {
            Some((group, keyword)) => {
                debug!("Offline reply for {} matched '{}'", persona, keyword);
                group.variants
            }
            None => replies.defaults,
        };

        let index = self.picker.pick(variants.len());
        let reply = variants
            .get(index)
            .or_else(|| variants.first())
            .copied()
            .unwrap_or(LAST_RESORT);

        let mut text = format!("{}{}", FALLBACK_PREFIX, reply);
        if mentions_api(&lower) {
            text.push_str(API_HINT);
        }
        text
    }
}

/// First group, in registration order, with a keyword found in `lower`
fn matching_group(
    replies: &'static PersonaReplies,
    lower: &str,
) -> Option<(&'static KeywordGroup, &'static str)> {
    replies.groups.iter().find_map(|group| {
        group
            .keywords
            .iter()
            .find(|keyword| lower.contains(*keyword))
            .map(|keyword| (group, *keyword))
    })
}

/// Whole-word check so that e.g. "rapide" does not count as "api"
fn mentions_api(lower: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| API_HINT_WORDS.contains(&word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_complete() {
        for persona in Persona::ALL {
            let replies = replies_for(persona);
            assert!(!replies.defaults.is_empty(), "{} has no defaults", persona);
            for group in replies.groups {
                assert!(!group.variants.is_empty());
                for keyword in group.keywords {
                    assert_eq!(*keyword, keyword.to_lowercase(), "keywords are stored lowercase");
                }
            }
        }
    }

    #[test]
    fn test_calendar_keyword_for_sofia() {
        let responder = OfflineResponder::with_picker(FixedPicker(0));
        let text = responder.respond(Persona::Sofia, "Comment organiser mon calendrier ?");
        assert_eq!(
            OfflineResponder::matched_keyword(Persona::Sofia, "Comment organiser mon calendrier ?"),
            Some("calendrier")
        );
        assert_eq!(
            text,
            "[Mode Fallback] Utilisez un calendrier unique pour tous vos rendez-vous et bloquez du temps pour vos tâches importantes."
        );
        assert!(!text.contains("GTD"));
    }

    #[test]
    fn test_every_calendar_variant_comes_from_the_group() {
        for i in 0..3 {
            let text = OfflineResponder::with_picker(FixedPicker(i))
                .respond(Persona::Sofia, "mon CALENDRIER déborde");
            assert!(
                SOFIA.groups[0]
                    .variants
                    .iter()
                    .any(|v| text == format!("{}{}", FALLBACK_PREFIX, v))
            );
        }
    }

    #[test]
    fn test_no_match_uses_persona_default() {
        let responder = OfflineResponder::with_picker(FixedPicker(0));
        let text = responder.respond(Persona::Sofia, "xyz");
        assert_eq!(text, format!("{}{}", FALLBACK_PREFIX, SOFIA.defaults[0]));
    }

    #[test]
    fn test_first_registered_group_wins() {
        // "mail" (first group) and "réunion" (second group) both present
        assert_eq!(
            OfflineResponder::matched_keyword(Persona::Alex, "Un mail pour la réunion"),
            Some("mail")
        );
    }

    #[test]
    fn test_answer_comes_from_the_matched_group() {
        let message = "Un mail pour la réunion";
        let keyword = OfflineResponder::matched_keyword(Persona::Alex, message).unwrap();
        let group = ALEX
            .groups
            .iter()
            .find(|g| g.keywords.contains(&keyword))
            .unwrap();
        let text = OfflineResponder::with_picker(FixedPicker(1)).respond(Persona::Alex, message);
        let expected = group.variants[1 % group.variants.len()];
        assert_eq!(text, format!("{}{}", FALLBACK_PREFIX, expected));
    }

    #[test]
    fn test_match_is_case_insensitive() {
        assert_eq!(
            OfflineResponder::matched_keyword(Persona::Marco, "Mes stats TIKTOK"),
            Some("tiktok")
        );
        assert_eq!(
            OfflineResponder::matched_keyword(Persona::Alex, "RÉUNION demain"),
            Some("réunion")
        );
    }

    #[test]
    fn test_api_hint_on_whole_words() {
        let responder = OfflineResponder::with_picker(FixedPicker(0));
        let text = responder.respond(Persona::Kai, "Comment configurer l'API OpenAI ?");
        assert!(text.ends_with(API_HINT));
        let text = responder.respond(Persona::Kai, "une réponse rapide svp");
        assert!(!text.contains("💡"));
    }

    #[test]
    fn test_always_prefixed_and_non_empty() {
        let responder = OfflineResponder::new();
        for persona in Persona::ALL {
            for message in ["", "hello", "calendrier", "???"] {
                let text = responder.respond(persona, message);
                assert!(text.starts_with(FALLBACK_PREFIX));
                assert!(text.len() > FALLBACK_PREFIX.len());
            }
        }
    }

    #[test]
    fn test_pickers_stay_in_range() {
        for count in 1..6 {
            assert!(RandomPicker.pick(count) < count);
            assert!(FixedPicker(7).pick(count) < count);
        }
        assert_eq!(FixedPicker(3).pick(0), 0);
    }
}

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

use crate::speech::select_voice;

/// What kind of chat target a profile describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Deity,
    Temple,
    Epic,
    Guide,
}

/// Static metadata for one chat target
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityProfile {
    pub key: String,
    pub display_name: String,
    pub kind: EntityKind,
    pub voice_id: &'static str,
    pub welcome_text: String,
    pub persona: String,
}

/// Trim, lowercase and collapse inner whitespace
pub fn normalize_key(entity_key: &str) -> String {
    entity_key
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stable document id for an entity key: `Lord  Hanuman!` -> `lord-hanuman`
pub fn entity_slug(entity_key: &str) -> String {
    let mut slug = String::with_capacity(entity_key.len());
    for c in entity_key.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

struct ProfileSeed {
    key: &'static str,
    display_name: &'static str,
    kind: EntityKind,
    aliases: &'static [&'static str],
    welcome: &'static str,
}

const SEEDS: &[ProfileSeed] = &[
    ProfileSeed {
        key: "hanuman",
        display_name: "Hanuman",
        kind: EntityKind::Deity,
        aliases: &["lord hanuman", "hanuman ji", "bajrangbali", "anjaneya"],
        welcome: "Hello, I am Hanuman, the devoted servant of Lord Rama. \
                  Ask me about my leap across the ocean, the burning of Lanka, \
                  or the strength that comes from devotion.",
    },
    ProfileSeed {
        key: "rama",
        display_name: "Rama",
        kind: EntityKind::Deity,
        aliases: &["lord rama", "shri ram", "sri rama", "ram"],
        welcome: "Hello, I am Rama, prince of Ayodhya. \
                  I am here to speak with you about dharma, duty and the journey of the Ramayana.",
    },
    ProfileSeed {
        key: "krishna",
        display_name: "Krishna",
        kind: EntityKind::Deity,
        aliases: &["lord krishna", "shri krishna", "sri krishna", "govinda"],
        welcome: "Hello, I am Krishna. \
                  Come, sit with me and ask about the Gita, the flute of Vrindavan, or any question on your heart.",
    },
    ProfileSeed {
        key: "shiva",
        display_name: "Shiva",
        kind: EntityKind::Deity,
        aliases: &["lord shiva", "mahadev", "mahadeva", "bholenath"],
        welcome: "Hello, I am Shiva, the auspicious one. \
                  Ask me about meditation, the cosmic dance, or the stillness beyond all change.",
    },
    ProfileSeed {
        key: "ganesha",
        display_name: "Ganesha",
        kind: EntityKind::Deity,
        aliases: &["lord ganesha", "ganesh", "ganapati", "vinayaka"],
        welcome: "Hello, I am Ganesha, remover of obstacles. \
                  Every good beginning starts with a question. What would you like to know?",
    },
    ProfileSeed {
        key: "durga",
        display_name: "Durga",
        kind: EntityKind::Deity,
        aliases: &["goddess durga", "maa durga", "durga maa"],
        welcome: "Hello, I am Durga, the invincible mother. \
                  Ask me about courage, protection and the victory of good over evil.",
    },
    ProfileSeed {
        key: "lakshmi",
        display_name: "Lakshmi",
        kind: EntityKind::Deity,
        aliases: &["goddess lakshmi", "maa lakshmi", "laxmi"],
        welcome: "Hello, I am Lakshmi, goddess of prosperity and grace. \
                  Ask me about abundance, generosity, or the festival of lights.",
    },
    ProfileSeed {
        key: "saraswati",
        display_name: "Saraswati",
        kind: EntityKind::Deity,
        aliases: &["goddess saraswati", "maa saraswati"],
        welcome: "Hello, I am Saraswati, goddess of knowledge, music and learning. \
                  What would you like to learn today?",
    },
    ProfileSeed {
        key: "tirupati balaji",
        display_name: "Tirupati Balaji Temple",
        kind: EntityKind::Temple,
        aliases: &["tirupati", "tirumala", "venkateswara temple", "tirumala venkateswara temple"],
        welcome: "Namaste and welcome to Tirumala, the abode of Lord Venkateswara. \
                  Ask me about the seven hills, the temple's history, or its traditions.",
    },
    ProfileSeed {
        key: "kashi vishwanath",
        display_name: "Kashi Vishwanath Temple",
        kind: EntityKind::Temple,
        aliases: &["kashi vishwanath temple", "vishwanath temple", "kashi"],
        welcome: "Namaste and welcome to Kashi Vishwanath on the banks of the Ganga. \
                  Ask me about the jyotirlinga, the ghats of Varanasi, or the temple's long history.",
    },
    ProfileSeed {
        key: "meenakshi amman",
        display_name: "Meenakshi Amman Temple",
        kind: EntityKind::Temple,
        aliases: &["meenakshi temple", "meenakshi amman temple", "madurai meenakshi"],
        welcome: "Vanakkam and welcome to the Meenakshi Amman Temple of Madurai. \
                  Ask me about its towering gopurams, the divine wedding, or its thousand pillars.",
    },
    ProfileSeed {
        key: "jagannath puri",
        display_name: "Jagannath Temple, Puri",
        kind: EntityKind::Temple,
        aliases: &["jagannath temple", "puri jagannath", "jagannath"],
        welcome: "Namaste and welcome to the Jagannath Temple in Puri. \
                  Ask me about the Rath Yatra, the Mahaprasad, or the lord of the universe.",
    },
    ProfileSeed {
        key: "ramayana",
        display_name: "Ramayana",
        kind: EntityKind::Epic,
        aliases: &["the ramayana", "valmiki ramayana"],
        welcome: "Welcome to the Ramayana, the journey of Rama as told by sage Valmiki. \
                  Ask me about any kanda, any character, or any lesson of the epic.",
    },
    ProfileSeed {
        key: "mahabharata",
        display_name: "Mahabharata",
        kind: EntityKind::Epic,
        aliases: &["the mahabharata", "mahabharat"],
        welcome: "Welcome to the Mahabharata, the great epic of the Bharata dynasty. \
                  Ask me about the Pandavas, the Kauravas, or the war at Kurukshetra.",
    },
    ProfileSeed {
        key: "bhagavad gita",
        display_name: "Bhagavad Gita",
        kind: EntityKind::Epic,
        aliases: &["gita", "the gita", "bhagwad gita", "bhagavad geeta"],
        welcome: "Welcome to the Bhagavad Gita, the song of the divine. \
                  Ask me about any chapter or verse, or about karma, bhakti and jnana.",
    },
];

const DEFAULT_WELCOME: &str = "Namaste! I am your spiritual guide. \
    Ask me anything about the deities, temples and epics of India.";

fn persona_for(display_name: &str, kind: EntityKind) -> String {
    let voice = match kind {
        EntityKind::Deity => format!(
            "You are {name}. Speak in the first person as {name}, warmly and with compassion, \
             drawing on the scriptures and stories associated with you.",
            name = display_name
        ),
        EntityKind::Temple => format!(
            "You are a knowledgeable guide to {name}. Describe its history, architecture, \
             deities, festivals and visiting traditions accurately.",
            name = display_name
        ),
        EntityKind::Epic => format!(
            "You are a storyteller and scholar of the {name}. Retell its episodes faithfully \
             and explain their meaning.",
            name = display_name
        ),
        EntityKind::Guide => "You are a friendly guide to Hindu deities, temples and epics. \
             Answer questions accurately and respectfully."
            .to_string(),
    };
    format!(
        "{} Keep answers concise and conversational, suitable for being read aloud. \
         Politely decline topics unrelated to spirituality, mythology or culture.",
        voice
    )
}

/// Lookup table from normalized entity keys (and aliases) to profiles
pub struct ProfileRegistry {
    profiles: Vec<EntityProfile>,
    index: HashMap<String, usize>,
}

impl ProfileRegistry {
    fn from_seeds(seeds: &[ProfileSeed]) -> Self {
        let mut profiles = Vec::with_capacity(seeds.len());
        let mut index = HashMap::new();

        for (position, seed) in seeds.iter().enumerate() {
            profiles.push(EntityProfile {
                key: seed.key.to_string(),
                display_name: seed.display_name.to_string(),
                kind: seed.kind,
                voice_id: select_voice(seed.key),
                welcome_text: seed.welcome.to_string(),
                persona: persona_for(seed.display_name, seed.kind),
            });
            index.insert(normalize_key(seed.key), position);
            for alias in seed.aliases {
                index.insert(normalize_key(alias), position);
            }
        }

        Self { profiles, index }
    }

    /// The built-in table, built once per process
    pub fn builtin() -> &'static ProfileRegistry {
        static REGISTRY: Lazy<ProfileRegistry> = Lazy::new(|| ProfileRegistry::from_seeds(SEEDS));
        &REGISTRY
    }

    /// Exact case-insensitive match, `None` for unknown keys
    pub fn find(&self, entity_key: &str) -> Option<&EntityProfile> {
        self.index
            .get(&normalize_key(entity_key))
            .map(|&position| &self.profiles[position])
    }

    /// Matching profile, or the generic guide for unknown keys
    pub fn resolve(&self, entity_key: &str) -> EntityProfile {
        match self.find(entity_key) {
            Some(profile) => profile.clone(),
            None => Self::fallback(entity_key),
        }
    }

    pub fn profiles(&self) -> &[EntityProfile] {
        &self.profiles
    }

    fn fallback(entity_key: &str) -> EntityProfile {
        let normalized = normalize_key(entity_key);
        EntityProfile {
            key: normalized.clone(),
            display_name: title_case(&normalized),
            kind: EntityKind::Guide,
            voice_id: select_voice(&normalized),
            welcome_text: DEFAULT_WELCOME.to_string(),
            persona: persona_for("", EntityKind::Guide),
        }
    }
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Welcome text used for keys that are not in the table
pub fn default_welcome_text() -> &'static str {
    DEFAULT_WELCOME
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{FEMININE_VOICE, MASCULINE_VOICE};

    #[test]
    fn test_normalize_and_slug() {
        assert_eq!(normalize_key("  Lord   HANUMAN "), "lord hanuman");
        assert_eq!(entity_slug("Lord  Hanuman!"), "lord-hanuman");
        assert_eq!(entity_slug("  Jagannath Temple, Puri "), "jagannath-temple-puri");
        assert_eq!(entity_slug("***"), "");
    }

    #[test]
    fn test_alias_lookup_is_case_insensitive() {
        let registry = ProfileRegistry::builtin();
        let profile = registry.resolve("LORD Hanuman");
        assert_eq!(profile.display_name, "Hanuman");
        assert!(profile.welcome_text.starts_with("Hello, I am Hanuman"));
        assert_eq!(profile.voice_id, MASCULINE_VOICE);
        assert_eq!(registry.find("hanuman"), registry.find("bajrangbali"));
    }

    #[test]
    fn test_lookup_is_exact_not_fuzzy() {
        let registry = ProfileRegistry::builtin();
        assert!(registry.find("hanuman temple in delhi").is_none());
    }

    #[test]
    fn test_unknown_key_falls_back() {
        let profile = ProfileRegistry::builtin().resolve("goddess kamakshi");
        assert_eq!(profile.kind, EntityKind::Guide);
        assert_eq!(profile.welcome_text, default_welcome_text());
        assert_eq!(profile.display_name, "Goddess Kamakshi");
        assert_eq!(profile.voice_id, FEMININE_VOICE);
    }

    #[test]
    fn test_feminine_profiles_get_feminine_voice() {
        let registry = ProfileRegistry::builtin();
        assert_eq!(registry.resolve("maa durga").voice_id, FEMININE_VOICE);
        assert_eq!(registry.resolve("meenakshi temple").voice_id, FEMININE_VOICE);
        assert_eq!(registry.resolve("ramayana").voice_id, MASCULINE_VOICE);
    }

    #[test]
    fn test_personas_are_distinct_per_kind() {
        let registry = ProfileRegistry::builtin();
        let deity = registry.resolve("krishna");
        let temple = registry.resolve("tirupati");
        assert!(deity.persona.starts_with("You are Krishna."));
        assert!(temple.persona.contains("guide to Tirupati Balaji Temple"));
    }
}

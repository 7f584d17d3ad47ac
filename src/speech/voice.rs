use crate::constants::{FEMININE_VOICE, MASCULINE_VOICE};

/// Names that get the feminine voice
const FEMININE_NAMES: &[&str] = &[
    "durga",
    "lakshmi",
    "laxmi",
    "saraswati",
    "parvati",
    "sita",
    "radha",
    "kali",
    "meenakshi",
    "ganga",
    "annapurna",
    "kamakshi",
    "vaishno",
    "amba",
    "ambaji",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCategory {
    Feminine,
    Masculine,
}

impl VoiceCategory {
    /// Feminine when any word of the key is a listed name, masculine otherwise
    pub fn for_entity(entity_key: &str) -> Self {
        let key = entity_key.to_lowercase();
        let feminine = key
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| FEMININE_NAMES.contains(&word));
        if feminine {
            VoiceCategory::Feminine
        } else {
            VoiceCategory::Masculine
        }
    }

    pub fn voice_id(self) -> &'static str {
        match self {
            VoiceCategory::Feminine => FEMININE_VOICE,
            VoiceCategory::Masculine => MASCULINE_VOICE,
        }
    }
}

/// Voice used to speak as the given entity
pub fn select_voice(entity_key: &str) -> &'static str {
    VoiceCategory::for_entity(entity_key).voice_id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feminine_names() {
        assert_eq!(select_voice("Goddess Durga"), FEMININE_VOICE);
        assert_eq!(select_voice("meenakshi amman temple"), FEMININE_VOICE);
        assert_eq!(select_voice("SITA"), FEMININE_VOICE);
    }

    #[test]
    fn test_default_voice() {
        assert_eq!(select_voice("lord hanuman"), MASCULINE_VOICE);
        assert_eq!(select_voice("ramayana"), MASCULINE_VOICE);
        assert_eq!(select_voice(""), MASCULINE_VOICE);
        // Substrings do not count as names
        assert_eq!(select_voice("kalinga"), MASCULINE_VOICE);
    }

    #[test]
    fn test_selection_is_deterministic() {
        for key in ["lord hanuman", "lakshmi", "tirupati balaji", "unknown"] {
            assert_eq!(select_voice(key), select_voice(key));
        }
    }
}

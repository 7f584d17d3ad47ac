use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::completion::Turn;

/// Persisted conversation for one (owner, entity) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub owner_id: String,
    pub entity_key: String,
    pub turns: Vec<Turn>,
    /// Incremented on every write
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A freshly bootstrapped session: empty user turn, then the welcome
    pub fn bootstrap(owner_id: &str, entity_key: &str, welcome: &str, audio_url: String) -> Self {
        let now = Utc::now();
        Self {
            owner_id: owner_id.to_string(),
            entity_key: entity_key.to_string(),
            turns: vec![Turn::user(""), Turn::model(welcome, Some(audio_url))],
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append new turns and bump the version
    pub fn record(&mut self, new_turns: &[Turn]) {
        self.turns.extend_from_slice(new_turns);
        self.version += 1;
        self.updated_at = Utc::now();
    }

    pub fn state(&self) -> SessionState {
        if self.turns.len() <= 2 {
            SessionState::Bootstrapped
        } else {
            SessionState::Active
        }
    }
}

/// Lifecycle of a session: `New -> Bootstrapped -> Active`, Active loops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    New,
    Bootstrapped,
    Active,
}

/// What the caller gets back for one turn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReply {
    #[serde(rename = "message")]
    pub reply_text: String,
    pub audio_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Speaker;

    #[test]
    fn test_bootstrap_shape() {
        let session = Session::bootstrap("u1", "lord hanuman", "Hello", "https://a".into());
        assert_eq!(session.turns.len(), 2);
        assert_eq!(session.turns[0], Turn::user(""));
        assert_eq!(session.turns[1].role, Speaker::Model);
        assert_eq!(session.version, 1);
        assert_eq!(session.state(), SessionState::Bootstrapped);
    }

    #[test]
    fn test_record_moves_to_active() {
        let mut session = Session::bootstrap("u1", "rama", "Hello", "https://a".into());
        session.record(&[Turn::user("hi"), Turn::model("namaste", None)]);
        assert_eq!(session.version, 2);
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn test_document_round_trip_uses_camel_case() {
        let session = Session::bootstrap("u1", "rama", "Hello", "https://a".into());
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["ownerId"], "u1");
        assert_eq!(value["turns"][1]["audioUrl"], "https://a");
        let back: Session = serde_json::from_value(value).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_reply_serializes_as_message() {
        let reply = TurnReply {
            reply_text: "Jai".into(),
            audio_url: "https://a".into(),
        };
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value, serde_json::json!({ "message": "Jai", "audioUrl": "https://a" }));
    }
}

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_K, DEFAULT_TOP_P,
};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Model,
}

/// One entry of a conversation, replayed verbatim as context on later calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub role: Speaker,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Speaker::User,
            text: text.into(),
            audio_url: None,
        }
    }

    pub fn model(text: impl Into<String>, audio_url: Option<String>) -> Self {
        Self {
            role: Speaker::Model,
            text: text.into(),
            audio_url,
        }
    }
}

/// Shape of the text the completion service should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// Sampling parameters for a single completion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            top_k: DEFAULT_TOP_K,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            response_format: ResponseFormat::Text,
        }
    }
}

impl GenerationOptions {
    /// Same sampling, JSON output
    pub fn json(&self) -> Self {
        Self {
            response_format: ResponseFormat::Json,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_document_shape() {
        let turn = Turn::model("Jai Shri Ram", Some("https://cdn/a.mp3".into()));
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(value["role"], "model");
        assert_eq!(value["audioUrl"], "https://cdn/a.mp3");

        let user = serde_json::to_value(Turn::user("")).unwrap();
        assert_eq!(user["role"], "user");
        assert!(user.get("audioUrl").is_none());
    }
}

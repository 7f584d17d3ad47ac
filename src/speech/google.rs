use anyhow::{Context as _, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::traits::SpeechSynthesizer;
use crate::constants::HTTP_REQUEST_TIMEOUT_SECS;

/// Speech backend for Google Cloud Text-to-Speech `text:synthesize`
pub struct GoogleSpeech {
    client: Client,
    base_url: String,
    api_key: String,
    audio_encoding: String,
    speaking_rate: f32,
}

impl GoogleSpeech {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        audio_encoding: impl Into<String>,
        speaking_rate: f32,
    ) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
                .build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            audio_encoding: audio_encoding.into(),
            speaking_rate,
        })
    }
}

/// `en-IN-Neural2-A` -> `en-IN`
pub(crate) fn language_code(voice_id: &str) -> Option<String> {
    let mut parts = voice_id.splitn(3, '-');
    let language = parts.next().filter(|p| p.len() >= 2 && p.chars().all(|c| c.is_ascii_lowercase()))?;
    let region = parts.next().filter(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric()))?;
    parts.next()?;
    Some(format!("{}-{}", language, region))
}

#[async_trait]
impl SpeechSynthesizer for GoogleSpeech {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            anyhow::bail!("Cannot synthesize empty text");
        }
        let language_code = language_code(voice_id)
            .with_context(|| format!("Unsupported voice id: {}", voice_id))?;

        let body = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code,
                name: voice_id,
            },
            audio_config: AudioConfig {
                audio_encoding: &self.audio_encoding,
                speaking_rate: self.speaking_rate,
            },
        };

        let url = format!("{}/text:synthesize", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("Failed to reach Text-to-Speech API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Text-to-Speech API error ({}): {}", status, error_text);
        }

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .context("Failed to parse Text-to-Speech response")?;

        BASE64_STANDARD
            .decode(parsed.audio_content.as_bytes())
            .context("Text-to-Speech returned invalid base64 audio")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig<'a>,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: String,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig<'a> {
    audio_encoding: &'a str,
    speaking_rate: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_code_from_voice() {
        assert_eq!(language_code("en-IN-Neural2-A").as_deref(), Some("en-IN"));
        assert_eq!(language_code("hi-IN-Wavenet-D").as_deref(), Some("hi-IN"));
        assert_eq!(language_code("cmn-CN-Standard-A").as_deref(), Some("cmn-CN"));
        assert_eq!(language_code("Neural2"), None);
        assert_eq!(language_code("en-IN"), None);
        assert_eq!(language_code(""), None);
    }

    #[tokio::test]
    async fn test_rejects_blank_text_without_calling_api() {
        let speech = GoogleSpeech::new("http://127.0.0.1:9", "key", "MP3", 1.0).unwrap();
        let err = speech.synthesize("   ", "en-IN-Neural2-A").await.unwrap_err();
        assert!(err.to_string().contains("empty text"));
    }

    #[tokio::test]
    async fn test_rejects_unsupported_voice() {
        let speech = GoogleSpeech::new("http://127.0.0.1:9", "key", "MP3", 1.0).unwrap();
        let err = speech.synthesize("Namaste", "robot").await.unwrap_err();
        assert!(err.to_string().contains("Unsupported voice"));
    }
}

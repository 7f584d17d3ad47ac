use anyhow::Result;
use async_trait::async_trait;

/// Text-to-speech backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` with the given voice and return encoded audio bytes
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>>;
}

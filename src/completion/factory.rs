use std::sync::Arc;

use anyhow::{Context, Result};

use super::gemini::GeminiCompletion;
use super::openai_compatible::OpenAiCompatibleCompletion;
use super::traits::CompletionService;
use crate::app::{CompletionConfig, CompletionProvider};

/// Factory for creating completion backends from configuration
pub struct CompletionFactory;

impl CompletionFactory {
    /// Build the configured backend. API keys are read from the environment
    /// variable the config names, never from the config itself.
    pub fn create(config: &CompletionConfig) -> Result<Arc<dyn CompletionService>> {
        let api_key = std::env::var(&config.api_key_env).ok();

        match config.provider {
            CompletionProvider::Gemini => {
                let api_key = api_key.with_context(|| {
                    format!("Gemini API key not set (expected in ${})", config.api_key_env)
                })?;
                let backend = GeminiCompletion::new(config.endpoint(), &config.model, api_key)?;
                Ok(Arc::new(backend))
            }
            CompletionProvider::Litellm => {
                let backend =
                    OpenAiCompatibleCompletion::new(config.endpoint(), &config.model, api_key)?;
                Ok(Arc::new(backend))
            }
        }
    }
}

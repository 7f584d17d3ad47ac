use anyhow::Result;
use async_trait::async_trait;

use super::types::{GenerationOptions, Turn};

/// Core trait that all generative-text backends must implement
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Continue `history` with `new_message` as the latest user turn and
    /// return the model's reply text
    async fn complete(
        &self,
        system_instruction: &str,
        history: &[Turn],
        new_message: &str,
        options: &GenerationOptions,
    ) -> Result<String>;

    /// Get the name of the backing model
    fn name(&self) -> &str;
}

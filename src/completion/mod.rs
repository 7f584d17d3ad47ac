// Gateway module for completion backends - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod factory;
mod gemini;
mod openai_compatible;
mod structured;
mod traits;
mod types;

// Public re-exports - the ONLY way to access completion functionality
pub use factory::CompletionFactory;
pub use gemini::GeminiCompletion;
pub use openai_compatible::OpenAiCompatibleCompletion;
pub use structured::parse_structured;
pub use traits::CompletionService;
#[cfg(test)]
pub use traits::MockCompletionService;
pub use types::{GenerationOptions, ResponseFormat, Speaker, Turn};

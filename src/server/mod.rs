// Gateway module for the HTTP server - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod error;
mod handlers;
mod router;

// Public re-exports - the ONLY way to access server functionality
pub use error::ApiError;
pub use handlers::{
    ChatRequest, DeityChatRequest, EpicChatRequest, GradeRequest, QuizRequest, TempleChatRequest,
};
pub use router::{app_router, serve, with_audio_dir};

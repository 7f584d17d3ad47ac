// Gateway module for app - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod config;
mod services;

// Public re-exports - the ONLY way to access app functionality
pub use config::{
    get_config_dir, global_config_path, init_config, load_config, load_config_from, save_config,
    BlobBackend, BlobConfig, CompletionConfig, CompletionProvider, Config, DocumentBackend,
    DocumentsConfig, QuizConfig, ServerConfig, SessionConfig, SpeechConfig,
};
pub use services::{build_services, Services};

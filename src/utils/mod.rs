// Gateway module for utils - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod errors;
mod logger;
mod retry;

// Public re-exports - the ONLY way to access utils functionality
pub use errors::ChatError;
pub use logger::init_logger;
pub use retry::first_success;

// Gateway module for quiz - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod generator;

// Public re-exports - the ONLY way to access quiz functionality
pub use generator::{Quiz, QuizGenerator, QuizQuestion, QuizSettings, Score};

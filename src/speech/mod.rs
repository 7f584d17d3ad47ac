// Gateway module for speech synthesis - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod cleanup;
mod google;
mod traits;
mod voice;

// Public re-exports - the ONLY way to access speech functionality
pub use cleanup::clean_for_speech;
pub use google::GoogleSpeech;
pub use traits::SpeechSynthesizer;
#[cfg(test)]
pub use traits::MockSpeechSynthesizer;
pub use voice::{select_voice, VoiceCategory};

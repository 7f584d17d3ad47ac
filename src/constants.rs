/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_LITELLM_PROXY_URL: &str = "http://localhost:4000";
pub const DEFAULT_TTS_BASE_URL: &str = "https://texttospeech.googleapis.com/v1";
pub const DEFAULT_STORAGE_UPLOAD_URL: &str = "https://storage.googleapis.com";
pub const DEFAULT_FIREBASE_DOWNLOAD_URL: &str = "https://firebasestorage.googleapis.com";
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 60;

// Default Model Configuration
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_TOP_K: u32 = 64;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

// Voices
pub const MASCULINE_VOICE: &str = "en-IN-Neural2-B";
pub const FEMININE_VOICE: &str = "en-IN-Neural2-A";
pub const DEFAULT_AUDIO_ENCODING: &str = "MP3";
pub const DEFAULT_SPEAKING_RATE: f32 = 1.0;

// Persistence layout
pub const DEFAULT_ROOT_COLLECTION: &str = "users";
pub const DEFAULT_SESSIONS_COLLECTION: &str = "chats";
pub const DEFAULT_MAX_CONFLICT_RETRIES: usize = 3;
pub const AUDIO_KEY_PREFIX: &str = "audio";
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

// Quiz
pub const DEFAULT_QUIZ_QUESTIONS: usize = 5;
pub const DEFAULT_QUIZ_FALLBACK_TOPICS: &[&str] = &[
    "Ramayana",
    "Mahabharata",
    "Bhagavad Gita",
    "Famous temples of India",
    "Hindu festivals",
];
pub const MAX_QUIZ_SCORE: u8 = 10;

// Caller-facing text for anything that is not an argument problem
pub const GENERIC_FAILURE_MESSAGE: &str = "internal processing error";

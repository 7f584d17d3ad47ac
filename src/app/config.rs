use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::completion::GenerationOptions;
use crate::constants::{
    DEFAULT_AUDIO_ENCODING, DEFAULT_FIRESTORE_BASE_URL, DEFAULT_GEMINI_BASE_URL,
    DEFAULT_GEMINI_MODEL, DEFAULT_LITELLM_PROXY_URL, DEFAULT_MAX_CONFLICT_RETRIES,
    DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_QUIZ_FALLBACK_TOPICS, DEFAULT_QUIZ_QUESTIONS,
    DEFAULT_ROOT_COLLECTION, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, DEFAULT_SESSIONS_COLLECTION,
    DEFAULT_SPEAKING_RATE, DEFAULT_STORAGE_UPLOAD_URL, DEFAULT_TEMPERATURE, DEFAULT_TOP_K,
    DEFAULT_TOP_P, DEFAULT_TTS_BASE_URL,
};
use crate::session::ConcurrencyMode;

const APP_NAME: &str = "temple-voice";
const LOCAL_CONFIG: &str = ".temple-voice/config.toml";
const ENV_PREFIX: &str = "TEMPLE_VOICE_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Completion backend configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Text-to-speech configuration
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Audio blob storage configuration
    #[serde(default)]
    pub blob: BlobConfig,

    /// Session document storage configuration
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Conversation behaviour
    #[serde(default)]
    pub session: SessionConfig,

    /// Quiz generation
    #[serde(default)]
    pub quiz: QuizConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
        }
    }
}

/// Which completion backend answers chat turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionProvider {
    #[default]
    Gemini,
    /// Any OpenAI-compatible endpoint, typically a LiteLLM proxy
    Litellm,
}

/// Completion backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub provider: CompletionProvider,
    /// Model name
    pub model: String,
    /// Endpoint override; unset uses the provider's default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Environment variable containing API key
    pub api_key_env: String,
    /// Temperature for generation
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    /// Maximum tokens to generate
    pub max_output_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: CompletionProvider::Gemini,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            top_k: DEFAULT_TOP_K,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

impl CompletionConfig {
    pub fn endpoint(&self) -> &str {
        match (&self.base_url, self.provider) {
            (Some(url), _) => url,
            (None, CompletionProvider::Gemini) => DEFAULT_GEMINI_BASE_URL,
            (None, CompletionProvider::Litellm) => DEFAULT_LITELLM_PROXY_URL,
        }
    }

    /// Sampling parameters for plain-text replies
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            max_output_tokens: self.max_output_tokens,
            ..GenerationOptions::default()
        }
    }
}

/// Text-to-speech configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub base_url: String,
    /// Environment variable containing API key
    pub api_key_env: String,
    pub audio_encoding: String,
    pub speaking_rate: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TTS_BASE_URL.to_string(),
            api_key_env: "GOOGLE_TTS_API_KEY".to_string(),
            audio_encoding: DEFAULT_AUDIO_ENCODING.to_string(),
            speaking_rate: DEFAULT_SPEAKING_RATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    Firebase,
    #[default]
    Local,
}

/// Audio blob storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    pub backend: BlobBackend,
    pub upload_base_url: String,
    /// Cloud Storage bucket (firebase backend)
    pub bucket: String,
    /// Environment variable containing an OAuth access token
    pub access_token_env: String,
    /// Directory audio is written to (local backend)
    pub local_dir: PathBuf,
    /// Prefix of URLs handed back for locally stored audio
    pub public_base_url: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::Local,
            upload_base_url: DEFAULT_STORAGE_UPLOAD_URL.to_string(),
            bucket: String::new(),
            access_token_env: "GOOGLE_ACCESS_TOKEN".to_string(),
            local_dir: PathBuf::from(".temple-voice/audio"),
            public_base_url: format!("http://localhost:{}/audio", DEFAULT_SERVER_PORT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentBackend {
    Firestore,
    #[default]
    File,
    Memory,
}

/// Session document storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    pub backend: DocumentBackend,
    pub base_url: String,
    pub project_id: String,
    pub database_id: String,
    /// Environment variable containing an OAuth access token
    pub access_token_env: String,
    /// Directory documents are written to (file backend)
    pub data_dir: PathBuf,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            backend: DocumentBackend::File,
            base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
            project_id: String::new(),
            database_id: "(default)".to_string(),
            access_token_env: "GOOGLE_ACCESS_TOKEN".to_string(),
            data_dir: PathBuf::from(".temple-voice/data"),
        }
    }
}

/// Conversation behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub root_collection: String,
    pub sessions_collection: String,
    /// Most recent turns sent as context; unset sends the whole history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_window: Option<usize>,
    pub concurrency: ConcurrencyMode,
    pub max_conflict_retries: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            root_collection: DEFAULT_ROOT_COLLECTION.to_string(),
            sessions_collection: DEFAULT_SESSIONS_COLLECTION.to_string(),
            history_window: None,
            concurrency: ConcurrencyMode::LastWriteWins,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

/// Quiz generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    pub question_count: usize,
    /// Topics tried when the requested one yields nothing usable
    pub fallback_topics: Vec<String>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            question_count: DEFAULT_QUIZ_QUESTIONS,
            fallback_topics: DEFAULT_QUIZ_FALLBACK_TOPICS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

/// Load configuration from multiple sources
pub fn load_config() -> Result<Config> {
    let global_config = global_config_path()?;
    let local_config = PathBuf::from(LOCAL_CONFIG);

    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if global_config.exists() {
        figment = figment.merge(Toml::file(&global_config));
    }

    if local_config.exists() {
        figment = figment.merge(Toml::file(&local_config));
    }

    extract(figment)
}

/// Load configuration from one explicit file, still honouring the environment
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }
    let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(path));
    extract(figment)
}

fn extract(figment: Figment) -> Result<Config> {
    // TEMPLE_VOICE_SESSION__HISTORY_WINDOW=12 -> session.history_window
    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("Failed to load configuration")
}

/// Platform config directory for temple-voice, created on first use
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = match ProjectDirs::from("", "", APP_NAME) {
        Some(dirs) => dirs.config_dir().to_path_buf(),
        None => home_config_dir()?,
    };
    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;
    Ok(config_dir)
}

// Platforms without a known config location fall back to ~/.config
fn home_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join(APP_NAME))
}

/// Location of the global `config.toml`
pub fn global_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

/// Write `config` as TOML to `path`, or to the global config file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = path.map_or_else(global_config_path, Ok)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, toml::to_string_pretty(config)?)
        .with_context(|| format!("Failed to write config to {}", path.display()))
}

/// Create a default configuration file if it doesn't exist.
///
/// Returns the paths that were written.
pub fn init_config() -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let config_file = global_config_path()?;

    if !config_file.exists() {
        save_config(&Config::default(), Some(config_file.clone()))?;
        written.push(config_file);
    }

    let local_example = PathBuf::from(format!("{}.example", LOCAL_CONFIG));
    if !local_example.exists() {
        if let Some(parent) = local_example.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let example_config = r#"# Temple Voice project configuration
# This file overrides global settings when renamed to config.toml

[completion]
provider = "gemini"
model = "gemini-1.5-flash"
api_key_env = "GEMINI_API_KEY"

[documents]
backend = "firestore"
project_id = "my-project"

[blob]
backend = "firebase"
bucket = "my-project.appspot.com"

[session]
history_window = 20
concurrency = "compare_and_swap"
"#;
        std::fs::write(&local_example, example_config)?;
        written.push(local_example);
    }

    Ok(written)
}

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use super::config::{BlobBackend, Config, DocumentBackend};
use crate::completion::{CompletionFactory, CompletionService};
use crate::quiz::{QuizGenerator, QuizSettings};
use crate::session::{SessionDependencies, SessionManager, SessionSettings};
use crate::speech::{GoogleSpeech, SpeechSynthesizer};
use crate::storage::{
    BlobStore, DocumentStore, FileDocumentStore, FirebaseBlobStore, FirestoreDocumentStore,
    LocalBlobStore, MemoryDocumentStore,
};

/// Fully wired application services, shared by the server and the CLI
#[derive(Clone)]
pub struct Services {
    pub sessions: Arc<SessionManager>,
    pub quiz: Arc<QuizGenerator>,
}

impl Services {
    /// Assemble services from already constructed capabilities
    pub fn from_dependencies(config: &Config, deps: SessionDependencies) -> Self {
        let generation = config.completion.generation_options();
        let quiz = QuizGenerator::new(
            deps.completion.clone(),
            deps.documents.clone(),
            QuizSettings {
                question_count: config.quiz.question_count,
                fallback_topics: config.quiz.fallback_topics.clone(),
                root_collection: config.session.root_collection.clone(),
                generation: generation.clone(),
            },
        );
        let sessions = SessionManager::new(
            deps,
            SessionSettings {
                root_collection: config.session.root_collection.clone(),
                sessions_collection: config.session.sessions_collection.clone(),
                generation,
                history_window: config.session.history_window,
                concurrency: config.session.concurrency,
                max_conflict_retries: config.session.max_conflict_retries,
            },
        );
        Self {
            sessions: Arc::new(sessions),
            quiz: Arc::new(quiz),
        }
    }
}

/// Build every capability the configuration selects
pub fn build_services(config: &Config) -> Result<Services> {
    let deps = SessionDependencies {
        completion: build_completion(config)?,
        speech: build_speech(config)?,
        blobs: build_blobs(config)?,
        documents: build_documents(config)?,
    };
    info!(
        completion = deps.completion.name(),
        blob_backend = ?config.blob.backend,
        document_backend = ?config.documents.backend,
        concurrency = ?config.session.concurrency,
        "services configured"
    );
    Ok(Services::from_dependencies(config, deps))
}

fn build_completion(config: &Config) -> Result<Arc<dyn CompletionService>> {
    CompletionFactory::create(&config.completion)
}

fn build_speech(config: &Config) -> Result<Arc<dyn SpeechSynthesizer>> {
    let speech = &config.speech;
    let api_key = std::env::var(&speech.api_key_env).with_context(|| {
        format!("Text-to-Speech API key not set (expected in ${})", speech.api_key_env)
    })?;
    Ok(Arc::new(GoogleSpeech::new(
        &speech.base_url,
        api_key,
        &speech.audio_encoding,
        speech.speaking_rate,
    )?))
}

fn build_blobs(config: &Config) -> Result<Arc<dyn BlobStore>> {
    let blob = &config.blob;
    match blob.backend {
        BlobBackend::Firebase => {
            if blob.bucket.is_empty() {
                anyhow::bail!("blob.bucket must be set for the firebase backend");
            }
            let token = std::env::var(&blob.access_token_env).ok();
            Ok(Arc::new(FirebaseBlobStore::new(
                &blob.upload_base_url,
                &blob.bucket,
                token,
            )?))
        }
        BlobBackend::Local => Ok(Arc::new(LocalBlobStore::new(
            &blob.local_dir,
            &blob.public_base_url,
        )?)),
    }
}

fn build_documents(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    let documents = &config.documents;
    match documents.backend {
        DocumentBackend::Firestore => {
            if documents.project_id.is_empty() {
                anyhow::bail!("documents.project_id must be set for the firestore backend");
            }
            let token = std::env::var(&documents.access_token_env).ok();
            Ok(Arc::new(FirestoreDocumentStore::new(
                &documents.base_url,
                &documents.project_id,
                &documents.database_id,
                token,
            )?))
        }
        DocumentBackend::File => Ok(Arc::new(FileDocumentStore::new(&documents.data_dir)?)),
        DocumentBackend::Memory => Ok(Arc::new(MemoryDocumentStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_backends() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.blob.local_dir = dir.path().join("audio");
        config.documents.data_dir = dir.path().join("data");

        assert!(build_blobs(&config).is_ok());
        assert!(build_documents(&config).is_ok());
        assert!(dir.path().join("audio").is_dir());
        assert!(dir.path().join("data").is_dir());
    }

    #[test]
    fn test_cloud_backends_require_identifiers() {
        let mut config = Config::default();
        config.blob.backend = BlobBackend::Firebase;
        config.documents.backend = DocumentBackend::Firestore;

        assert!(build_blobs(&config).is_err());
        assert!(build_documents(&config).is_err());

        config.blob.bucket = "temples.appspot.com".into();
        config.documents.project_id = "temples".into();
        assert!(build_blobs(&config).is_ok());
        assert!(build_documents(&config).is_ok());
    }

    #[test]
    fn test_missing_speech_key_is_reported() {
        let mut config = Config::default();
        config.speech.api_key_env = "TEMPLE_VOICE_TEST_UNSET_TTS_KEY".into();
        let err = build_speech(&config).err().unwrap();
        assert!(err.to_string().contains("TEMPLE_VOICE_TEST_UNSET_TTS_KEY"));
    }
}

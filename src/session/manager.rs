use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::profile::{entity_slug, EntityProfile, ProfileRegistry};
use super::types::{Session, SessionState, TurnReply};
use crate::completion::{CompletionService, GenerationOptions, Turn};
use crate::constants::{
    DEFAULT_MAX_CONFLICT_RETRIES, DEFAULT_ROOT_COLLECTION, DEFAULT_SESSIONS_COLLECTION,
};
use crate::speech::{clean_for_speech, SpeechSynthesizer};
use crate::storage::{audio_object_key, BlobStore, DocumentStore};
use crate::utils::ChatError;

/// How a turn's read-modify-write reaches the document store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// Overwrite the stored session; concurrent turns can be lost
    #[default]
    LastWriteWins,
    /// Write only if the stored version is unchanged, rebasing on conflict
    CompareAndSwap,
}

/// Tunables for the session manager
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub root_collection: String,
    pub sessions_collection: String,
    pub generation: GenerationOptions,
    /// Number of most recent turns sent as context; `None` sends everything
    pub history_window: Option<usize>,
    pub concurrency: ConcurrencyMode,
    pub max_conflict_retries: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            root_collection: DEFAULT_ROOT_COLLECTION.to_string(),
            sessions_collection: DEFAULT_SESSIONS_COLLECTION.to_string(),
            generation: GenerationOptions::default(),
            history_window: None,
            concurrency: ConcurrencyMode::default(),
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

/// External capabilities the manager drives
#[derive(Clone)]
pub struct SessionDependencies {
    pub completion: Arc<dyn CompletionService>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub blobs: Arc<dyn BlobStore>,
    pub documents: Arc<dyn DocumentStore>,
}

/// Per-(owner, entity) conversation manager.
///
/// First contact bootstraps the session with the entity's static welcome;
/// every later turn replays the stored history to the completion service,
/// speaks the reply and persists both new turns in one write.
pub struct SessionManager {
    completion: Arc<dyn CompletionService>,
    speech: Arc<dyn SpeechSynthesizer>,
    blobs: Arc<dyn BlobStore>,
    documents: Arc<dyn DocumentStore>,
    profiles: &'static ProfileRegistry,
    settings: SessionSettings,
}

impl SessionManager {
    pub fn new(deps: SessionDependencies, settings: SessionSettings) -> Self {
        Self {
            completion: deps.completion,
            speech: deps.speech,
            blobs: deps.blobs,
            documents: deps.documents,
            profiles: ProfileRegistry::builtin(),
            settings,
        }
    }

    pub fn profiles(&self) -> &'static ProfileRegistry {
        self.profiles
    }

    /// Document path of the session for an owner and entity
    pub fn document_path(&self, owner_id: &str, entity_key: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.settings.root_collection,
            owner_id.trim(),
            self.settings.sessions_collection,
            entity_slug(entity_key)
        )
    }

    /// Stored session, if any
    pub async fn session(&self, owner_id: &str, entity_key: &str) -> Result<Option<Session>, ChatError> {
        let (owner_id, entity_key) = validate_ids(owner_id, entity_key)?;
        self.load(&self.document_path(owner_id, entity_key)).await
    }

    pub async fn state(&self, owner_id: &str, entity_key: &str) -> Result<SessionState, ChatError> {
        Ok(self
            .session(owner_id, entity_key)
            .await?
            .map(|s| s.state())
            .unwrap_or(SessionState::New))
    }

    /// Handle one incoming message for a session.
    ///
    /// A missing session is bootstrapped and `message` is ignored; otherwise
    /// `message` must be non-empty.
    pub async fn handle_turn(
        &self,
        owner_id: &str,
        entity_key: &str,
        message: &str,
    ) -> Result<TurnReply, ChatError> {
        let (owner_id, entity_key) = validate_ids(owner_id, entity_key)?;
        let path = self.document_path(owner_id, entity_key);
        let profile = self.profiles.resolve(entity_key);

        match self.load(&path).await? {
            None => self.bootstrap(owner_id, entity_key, &profile, &path).await,
            Some(session) => {
                if message.trim().is_empty() {
                    return Err(ChatError::InvalidArgument(
                        "message must not be empty".to_string(),
                    ));
                }
                self.continue_session(session, &profile, message, &path).await
            }
        }
    }

    async fn bootstrap(
        &self,
        owner_id: &str,
        entity_key: &str,
        profile: &EntityProfile,
        path: &str,
    ) -> Result<TurnReply, ChatError> {
        let audio_url = self
            .speak(owner_id, entity_key, &profile.welcome_text, profile.voice_id)
            .await?;

        let session = Session::bootstrap(owner_id, entity_key, &profile.welcome_text, audio_url.clone());
        let document = to_document(&session)?;

        match self.settings.concurrency {
            ConcurrencyMode::LastWriteWins => {
                self.documents
                    .set(path, document)
                    .await
                    .map_err(|e| self.upstream_failure("documents", path, e))?;
            }
            ConcurrencyMode::CompareAndSwap => {
                let created = self
                    .documents
                    .compare_and_set(path, None, document)
                    .await
                    .map_err(|e| self.upstream_failure("documents", path, e))?;
                if !created {
                    debug!(%path, "session bootstrapped concurrently, keeping stored history");
                }
            }
        }

        info!(owner = %owner_id, entity = %entity_key, "bootstrapped session");
        Ok(TurnReply {
            reply_text: profile.welcome_text.clone(),
            audio_url,
        })
    }

    async fn continue_session(
        &self,
        session: Session,
        profile: &EntityProfile,
        message: &str,
        path: &str,
    ) -> Result<TurnReply, ChatError> {
        let context = self.history_window(&session.turns);
        let reply = self
            .completion
            .complete(&profile.persona, context, message, &self.settings.generation)
            .await
            .map_err(|e| self.upstream_failure("completion", path, e))?;

        let audio_url = self
            .speak(&session.owner_id, &session.entity_key, &reply, profile.voice_id)
            .await?;

        let new_turns = [Turn::user(message), Turn::model(reply.clone(), Some(audio_url.clone()))];
        let version = self.persist(path, session, &new_turns).await?;

        debug!(%path, version, model = self.completion.name(), "recorded turn");
        Ok(TurnReply {
            reply_text: reply,
            audio_url,
        })
    }

    /// Write the session with `new_turns` appended and return the stored version
    async fn persist(&self, path: &str, session: Session, new_turns: &[Turn]) -> Result<u64, ChatError> {
        match self.settings.concurrency {
            ConcurrencyMode::LastWriteWins => {
                let mut session = session;
                session.record(new_turns);
                self.documents
                    .set(path, to_document(&session)?)
                    .await
                    .map_err(|e| self.upstream_failure("documents", path, e))?;
                Ok(session.version)
            }
            ConcurrencyMode::CompareAndSwap => {
                let mut base = session;
                for attempt in 0..=self.settings.max_conflict_retries {
                    let expected = base.version;
                    let mut updated = base.clone();
                    updated.record(new_turns);

                    let written = self
                        .documents
                        .compare_and_set(path, Some(expected), to_document(&updated)?)
                        .await
                        .map_err(|e| self.upstream_failure("documents", path, e))?;
                    if written {
                        return Ok(updated.version);
                    }

                    warn!(%path, attempt, expected, "session changed underneath, rebasing turn");
                    base = self.load(path).await?.ok_or_else(|| {
                        ChatError::Internal(format!("session {} vanished during write", path))
                    })?;
                }
                Err(ChatError::Conflict(path.to_string()))
            }
        }
    }

    /// Synthesize and upload; returns the public audio URL
    async fn speak(
        &self,
        owner_id: &str,
        entity_key: &str,
        text: &str,
        voice_id: &str,
    ) -> Result<String, ChatError> {
        let spoken = clean_for_speech(text);
        let audio = self
            .speech
            .synthesize(&spoken, voice_id)
            .await
            .map_err(|e| self.upstream_failure("speech", owner_id, e))?;

        let key = audio_object_key(owner_id, &entity_slug(entity_key));
        self.blobs
            .upload(audio, &key)
            .await
            .map_err(|e| self.upstream_failure("blob storage", &key, e))
    }

    async fn load(&self, path: &str) -> Result<Option<Session>, ChatError> {
        let Some(document) = self
            .documents
            .get(path)
            .await
            .map_err(|e| self.upstream_failure("documents", path, e))?
        else {
            return Ok(None);
        };

        serde_json::from_value(document).map(Some).map_err(|e| {
            error!(%path, "corrupt session document: {}", e);
            ChatError::Internal(format!("corrupt session document at {}: {}", path, e))
        })
    }

    /// Most recent turns to send as context, starting on a user turn
    fn history_window<'a>(&self, turns: &'a [Turn]) -> &'a [Turn] {
        match self.settings.history_window {
            Some(window) if turns.len() > window => {
                let even = window - window % 2;
                &turns[turns.len() - even..]
            }
            _ => turns,
        }
    }

    fn upstream_failure(&self, service: &'static str, resource: &str, err: anyhow::Error) -> ChatError {
        error!(service, resource, "upstream call failed: {:#}", err);
        ChatError::upstream(service, err)
    }
}

/// Owner ids become a path segment, so they must be a single plain segment
pub(crate) fn validate_owner_id(owner_id: &str) -> Result<&str, ChatError> {
    let owner_id = owner_id.trim();
    if owner_id.is_empty() {
        return Err(ChatError::InvalidArgument("ownerId must not be empty".to_string()));
    }
    if owner_id.contains('/') {
        return Err(ChatError::InvalidArgument("ownerId must not contain '/'".to_string()));
    }
    if owner_id == "." || owner_id == ".." {
        return Err(ChatError::InvalidArgument(format!("ownerId must not be '{}'", owner_id)));
    }
    Ok(owner_id)
}

fn validate_ids<'a>(owner_id: &'a str, entity_key: &'a str) -> Result<(&'a str, &'a str), ChatError> {
    let owner_id = validate_owner_id(owner_id)?;
    let entity_key = entity_key.trim();
    if entity_slug(entity_key).is_empty() {
        return Err(ChatError::InvalidArgument("entity name must not be empty".to_string()));
    }
    Ok((owner_id, entity_key))
}

fn to_document(session: &Session) -> Result<serde_json::Value, ChatError> {
    serde_json::to_value(session)
        .map_err(|e| ChatError::Internal(format!("failed to serialize session: {}", e)))
}

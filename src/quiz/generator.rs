use std::sync::Arc;

use chrono::Utc;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::completion::{parse_structured, CompletionService, GenerationOptions};
use crate::constants::MAX_QUIZ_SCORE;
use crate::session::validate_owner_id;
use crate::storage::DocumentStore;
use crate::utils::{first_success, ChatError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(default)]
    pub topic: String,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(deserialize_with = "clamped_score")]
    pub score: u8,
    #[serde(default)]
    pub feedback: String,
}

/// Graders answer with any JSON number; round and clamp it into range
fn clamped_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() {
        return Err(D::Error::custom("score must be a finite number"));
    }
    Ok(raw.round().clamp(0.0, f64::from(MAX_QUIZ_SCORE)) as u8)
}

#[derive(Debug, Clone)]
pub struct QuizSettings {
    pub question_count: usize,
    pub fallback_topics: Vec<String>,
    pub root_collection: String,
    pub generation: GenerationOptions,
}

/// Structured-output flows: quiz generation and answer grading
pub struct QuizGenerator {
    completion: Arc<dyn CompletionService>,
    documents: Arc<dyn DocumentStore>,
    settings: QuizSettings,
}

const QUIZ_INSTRUCTION: &str = "You write multiple-choice quizzes about Hindu mythology, \
    deities, temples and epics. Reply with JSON only, shaped as \
    {\"questions\": [{\"question\": string, \"options\": [string], \"answerIndex\": number}]}.";

const GRADER_INSTRUCTION: &str = "You grade answers to questions about Hindu mythology, \
    deities, temples and epics. Reply with JSON only, shaped as \
    {\"score\": integer from 0 to 10, \"feedback\": string}.";

impl QuizGenerator {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        documents: Arc<dyn DocumentStore>,
        settings: QuizSettings,
    ) -> Self {
        Self {
            completion,
            documents,
            settings,
        }
    }

    /// Generate a quiz on `topic`, falling back to the configured topic set.
    ///
    /// Never fails: if every attempt errors or returns malformed output the
    /// result is an empty quiz.
    pub async fn generate(&self, topic: &str) -> Quiz {
        let mut candidates = Vec::with_capacity(2);
        if !topic.trim().is_empty() {
            candidates.push(topic.trim().to_string());
        }
        if !self.settings.fallback_topics.is_empty() {
            candidates.push(self.settings.fallback_topics.join(", "));
        }

        let attempt = |candidate: String| async move { self.request_quiz(&candidate).await };
        match first_success(&candidates, attempt).await {
            Some(Ok(quiz)) => quiz,
            Some(Err(err)) => {
                warn!(topic, kind = err.kind(), "quiz generation failed, returning empty quiz: {}", err);
                Quiz::default()
            }
            None => Quiz::default(),
        }
    }

    async fn request_quiz(&self, topic: &str) -> Result<Quiz, ChatError> {
        let prompt = format!(
            "Create {} questions on the topic: {}",
            self.settings.question_count, topic
        );
        let raw = self
            .completion
            .complete(QUIZ_INSTRUCTION, &[], &prompt, &self.settings.generation.json())
            .await
            .map_err(|e| ChatError::upstream("completion", e))?;

        let mut quiz: Quiz = parse_structured(&raw)?;
        quiz.questions
            .retain(|q| !q.question.trim().is_empty() && q.answer_index < q.options.len());
        if quiz.questions.is_empty() {
            return Err(ChatError::MalformedUpstreamOutput(
                "quiz contained no usable questions".to_string(),
            ));
        }
        quiz.topic = topic.to_string();
        Ok(quiz)
    }

    /// Grade a free-text answer and record the score on the owner's document.
    ///
    /// Malformed grader output scores 0.
    pub async fn grade(&self, owner_id: &str, question: &str, answer: &str) -> Result<Score, ChatError> {
        let owner_id = validate_owner_id(owner_id)?;
        if question.trim().is_empty() {
            return Err(ChatError::InvalidArgument("question must not be empty".to_string()));
        }

        let prompt = format!("Question: {}\nAnswer: {}", question, answer);
        let raw = self
            .completion
            .complete(GRADER_INSTRUCTION, &[], &prompt, &self.settings.generation.json())
            .await
            .map_err(|e| ChatError::upstream("completion", e))?;

        let score = match parse_structured::<Score>(&raw) {
            Ok(score) => score,
            Err(err) => {
                warn!(owner = %owner_id, "grader output unusable, scoring 0: {}", err);
                Score::default()
            }
        };

        let path = format!("{}/{}", self.settings.root_collection, owner_id);
        self.documents
            .update(
                &path,
                json!({
                    "lastQuizScore": score.score,
                    "lastQuizAt": Utc::now().to_rfc3339(),
                }),
            )
            .await
            .map_err(|e| ChatError::upstream("documents", e))?;

        info!(owner = %owner_id, score = score.score, "graded quiz answer");
        Ok(score)
    }
}

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::error::ApiError;
use crate::app::Services;
use crate::quiz::{Quiz, Score};
use crate::session::TurnReply;

// Every field defaults so a missing one surfaces as a 400 from validation
// instead of an extractor rejection.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatRequest {
    pub owner_id: String,
    pub entity_key: String,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeityChatRequest {
    pub user_id: String,
    pub deity_name: String,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TempleChatRequest {
    pub user_id: String,
    pub temple_name: String,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EpicChatRequest {
    pub user_id: String,
    pub epic_name: String,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuizRequest {
    pub topic: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GradeRequest {
    pub owner_id: String,
    pub question: String,
    pub answer: String,
}

async fn turn(
    services: &Services,
    owner_id: &str,
    entity_key: &str,
    message: &str,
) -> Result<Json<TurnReply>, ApiError> {
    info!(owner = %owner_id, entity = %entity_key, "chat turn");
    let reply = services.sessions.handle_turn(owner_id, entity_key, message).await?;
    Ok(Json(reply))
}

pub async fn chat(
    State(services): State<Services>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<TurnReply>, ApiError> {
    turn(&services, &request.owner_id, &request.entity_key, &request.message).await
}

pub async fn chat_with_deity(
    State(services): State<Services>,
    Json(request): Json<DeityChatRequest>,
) -> Result<Json<TurnReply>, ApiError> {
    turn(&services, &request.user_id, &request.deity_name, &request.message).await
}

pub async fn chat_with_temple(
    State(services): State<Services>,
    Json(request): Json<TempleChatRequest>,
) -> Result<Json<TurnReply>, ApiError> {
    turn(&services, &request.user_id, &request.temple_name, &request.message).await
}

pub async fn chat_with_epic(
    State(services): State<Services>,
    Json(request): Json<EpicChatRequest>,
) -> Result<Json<TurnReply>, ApiError> {
    turn(&services, &request.user_id, &request.epic_name, &request.message).await
}

pub async fn generate_quiz(
    State(services): State<Services>,
    Json(request): Json<QuizRequest>,
) -> Json<Quiz> {
    Json(services.quiz.generate(&request.topic).await)
}

pub async fn grade_answer(
    State(services): State<Services>,
    Json(request): Json<GradeRequest>,
) -> Result<Json<Score>, ApiError> {
    let score = services
        .quiz
        .grade(&request.owner_id, &request.question, &request.answer)
        .await?;
    Ok(Json(score))
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") })),
    )
}

use std::path::Path;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

use super::handlers::{
    chat, chat_with_deity, chat_with_epic, chat_with_temple, generate_quiz, grade_answer, health,
};
use crate::app::{BlobBackend, Config, Services};

pub fn app_router(services: Services) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/chat/deity", post(chat_with_deity))
        .route("/api/chat/temple", post(chat_with_temple))
        .route("/api/chat/epic", post(chat_with_epic))
        .route("/api/quiz", post(generate_quiz))
        .route("/api/quiz/grade", post(grade_answer))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(services)
}

/// Expose locally stored audio under `/audio`
pub fn with_audio_dir(router: Router, audio_dir: &Path) -> Router {
    router.nest_service("/audio", ServeDir::new(audio_dir))
}

/// Bind and run the HTTP server until the process is stopped
pub async fn serve(config: &Config, services: Services) -> Result<()> {
    let mut router = app_router(services);
    if config.blob.backend == BlobBackend::Local {
        router = with_audio_dir(router, &config.blob.local_dir);
    }

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("listening on {}", address);

    axum::serve(listener, router).await.context("Server error")
}

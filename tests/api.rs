use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use temple_voice::{
    app::{Config, Services},
    completion::GeminiCompletion,
    server::app_router,
    session::SessionDependencies,
    speech::GoogleSpeech,
    storage::{DocumentStore, LocalBlobStore, MemoryDocumentStore},
};

const MODEL: &str = "gemini-1.5-flash";

fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

async fn stub_speech(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/text:synthesize"))
        .and(query_param("key", "tts-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "audioContent": "bXAz" })))
        .mount(server)
        .await;
}

struct Harness {
    router: Router,
    documents: Arc<MemoryDocumentStore>,
    audio_dir: TempDir,
}

fn harness(gemini: &MockServer, tts: &MockServer) -> Harness {
    let audio_dir = TempDir::new().unwrap();
    let documents = Arc::new(MemoryDocumentStore::new());
    let deps = SessionDependencies {
        completion: Arc::new(GeminiCompletion::new(gemini.uri(), MODEL, "gemini-key").unwrap()),
        speech: Arc::new(GoogleSpeech::new(tts.uri(), "tts-key", "MP3", 1.0).unwrap()),
        blobs: Arc::new(LocalBlobStore::new(audio_dir.path(), "http://localhost:8080/audio").unwrap()),
        documents: documents.clone(),
    };
    let services = Services::from_dependencies(&Config::default(), deps);
    Harness {
        router: app_router(services),
        documents,
        audio_dir,
    }
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_conversation_round_trip() {
    let gemini = MockServer::start().await;
    let tts = MockServer::start().await;
    stub_speech(&tts).await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{}:generateContent", MODEL)))
        .and(query_param("key", "gemini-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(
            "**Jai Shri Ram!** Lord Rama is my master 🙏",
        )))
        .expect(1)
        .mount(&gemini)
        .await;

    let h = harness(&gemini, &tts);

    // First contact is answered with the static welcome; no completion call
    let (status, body) = post_json(
        &h.router,
        "/api/chat/deity",
        json!({ "userId": "devotee-1", "deityName": "Hanuman", "message": "ignored" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().starts_with("Hello, I am Hanuman"));
    let welcome_audio = body["audioUrl"].as_str().unwrap().to_string();
    assert!(welcome_audio.starts_with("http://localhost:8080/audio/audio/devotee-1/hanuman/"));

    let (status, body) = post_json(
        &h.router,
        "/api/chat/deity",
        json!({ "userId": "devotee-1", "deityName": "Hanuman", "message": "Who is your master?" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Caller gets the raw reply; only the spoken text is cleaned
    assert_eq!(body["message"], "**Jai Shri Ram!** Lord Rama is my master 🙏");

    // The completion call replays the bootstrap turns before the new message
    let requests = gemini.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let contents = sent["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[0]["parts"][0]["text"], "");
    assert_eq!(contents[2]["parts"][0]["text"], "Who is your master?");
    assert!(sent["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Hanuman"));

    // Spoken text has markup and emoji stripped
    let spoken: Vec<Value> = tts
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(spoken.len(), 2);
    assert_eq!(spoken[1]["input"]["text"], "Jai Shri Ram! Lord Rama is my master");
    assert_eq!(spoken[1]["voice"]["languageCode"], "en-IN");

    // One document holds the four turns; audio landed on disk
    let stored = h
        .documents
        .get("users/devotee-1/chats/hanuman")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["turns"].as_array().unwrap().len(), 4);
    assert_eq!(stored["turns"][1]["audioUrl"], welcome_audio.as_str());
    let key = welcome_audio.trim_start_matches("http://localhost:8080/audio/");
    assert_eq!(std::fs::read(h.audio_dir.path().join(key)).unwrap(), b"mp3");
}

#[tokio::test]
async fn test_upstream_error_is_not_leaked() {
    let gemini = MockServer::start().await;
    let tts = MockServer::start().await;
    stub_speech(&tts).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded for key gemini-key"))
        .mount(&gemini)
        .await;

    let h = harness(&gemini, &tts);
    post_json(&h.router, "/api/chat/epic", json!({ "userId": "u2", "epicName": "Ramayana" })).await;

    let (status, body) = post_json(
        &h.router,
        "/api/chat/epic",
        json!({ "userId": "u2", "epicName": "Ramayana", "message": "Tell me about Sita" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["kind"], "upstream_unavailable");
    assert_eq!(body["error"]["message"], "internal processing error");
    assert!(!body.to_string().contains("quota"));

    // The failed turn left the bootstrapped history untouched
    let stored = h.documents.get("users/u2/chats/ramayana").await.unwrap().unwrap();
    assert_eq!(stored["turns"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_message_on_existing_session() {
    let gemini = MockServer::start().await;
    let tts = MockServer::start().await;
    stub_speech(&tts).await;

    let h = harness(&gemini, &tts);
    let request = json!({ "ownerId": "u3", "entityKey": "Meenakshi Amman" });
    let (status, _) = post_json(&h.router, "/api/chat", request.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(&h.router, "/api/chat", request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_argument");
}

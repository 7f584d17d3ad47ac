use anyhow::{Context as _, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Number, Value};

use super::document::{stored_version, DocumentStore};
use crate::constants::HTTP_REQUEST_TIMEOUT_SECS;

/// Document store backed by the Firestore REST API
pub struct FirestoreDocumentStore {
    client: Client,
    documents_url: String,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirestoreDocument {
    #[serde(default)]
    fields: Map<String, Value>,
    update_time: Option<String>,
}

impl FirestoreDocumentStore {
    pub fn new(
        base_url: &str,
        project_id: &str,
        database_id: &str,
        access_token: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
                .build()?,
            documents_url: format!(
                "{}/projects/{}/databases/{}/documents",
                base_url.trim_end_matches('/'),
                project_id,
                database_id
            ),
            access_token,
        })
    }

    fn url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.documents_url, encoded.join("/"))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn fetch(&self, path: &str) -> Result<Option<FirestoreDocument>> {
        let response = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await
            .with_context(|| format!("Failed to reach Firestore for {}", path))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Firestore get error ({}): {}", status, error_text);
        }
        let document = response
            .json()
            .await
            .context("Failed to parse Firestore document")?;
        Ok(Some(document))
    }

    async fn patch(
        &self,
        path: &str,
        document: &Value,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        if !document.is_object() {
            anyhow::bail!("Firestore documents must be JSON objects");
        }
        let fields = match encode_value(document) {
            Value::Object(mut wrapped) => match wrapped.remove("mapValue") {
                Some(Value::Object(mut map)) => map.remove("fields").unwrap_or_else(|| json!({})),
                _ => json!({}),
            },
            _ => json!({}),
        };

        self.authorize(self.client.patch(self.url(path)))
            .query(query)
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .with_context(|| format!("Failed to write Firestore document {}", path))
    }
}

async fn ensure_success(response: reqwest::Response, action: &str) -> Result<()> {
    if response.status().is_success() {
        return Ok(());
    }
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    anyhow::bail!("Firestore {} error ({}): {}", action, status, error_text)
}

#[async_trait]
impl DocumentStore for FirestoreDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        Ok(self
            .fetch(path)
            .await?
            .map(|doc| decode_fields(&doc.fields)))
    }

    async fn set(&self, path: &str, document: Value) -> Result<()> {
        let response = self.patch(path, &document, &[]).await?;
        ensure_success(response, "set").await
    }

    async fn update(&self, path: &str, fields: Value) -> Result<()> {
        let mask: Vec<(&str, String)> = fields
            .as_object()
            .context("Firestore updates must be JSON objects")?
            .keys()
            .map(|key| ("updateMask.fieldPaths", field_path(key)))
            .collect();
        let response = self.patch(path, &fields, &mask).await?;
        ensure_success(response, "update").await
    }

    async fn compare_and_set(
        &self,
        path: &str,
        expected_version: Option<u64>,
        document: Value,
    ) -> Result<bool> {
        let precondition = match (self.fetch(path).await?, expected_version) {
            (None, None) => ("currentDocument.exists", "false".to_string()),
            (Some(current), Some(expected)) => {
                let decoded = decode_fields(&current.fields);
                if stored_version(&decoded) != expected {
                    return Ok(false);
                }
                let update_time = current
                    .update_time
                    .context("Firestore document missing updateTime")?;
                ("currentDocument.updateTime", update_time)
            }
            _ => return Ok(false),
        };

        let response = self.patch(path, &document, &[precondition]).await?;
        match response.status() {
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => Ok(false),
            StatusCode::BAD_REQUEST => {
                let error_text = response.text().await.unwrap_or_default();
                if error_text.contains("FAILED_PRECONDITION") {
                    Ok(false)
                } else {
                    anyhow::bail!("Firestore compare-and-set error (400): {}", error_text)
                }
            }
            _ => ensure_success(response, "compare-and-set").await.map(|_| true),
        }
    }
}

/// Backtick-quote field names that are not simple identifiers
fn field_path(key: &str) -> String {
    let simple = key
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        key.to_string()
    } else {
        format!("`{}`", key.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// JSON value -> Firestore typed value
pub(crate) fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Firestore typed value -> JSON value
pub(crate) fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|m| m.iter().next()) else {
        return Value::Null;
    };
    match kind.as_str() {
        "booleanValue" => inner.clone(),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(|i| Value::Number(i.into()))
            .unwrap_or(Value::Null),
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => inner
            .get("fields")
            .and_then(Value::as_object)
            .map(decode_fields)
            .unwrap_or_else(|| Value::Object(Map::new())),
        _ => Value::Null,
    }
}

fn decode_fields(fields: &Map<String, Value>) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), decode_value(v)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_doc() -> Value {
        json!({
            "ownerId": "u1",
            "version": 3,
            "rating": 4.5,
            "archived": false,
            "note": null,
            "turns": [
                { "role": "user", "text": "" },
                { "role": "model", "text": "Hello", "audioUrl": "https://a" }
            ],
            "empty": []
        })
    }

    #[test]
    fn test_encoding_shapes() {
        let encoded = encode_value(&session_doc());
        let fields = &encoded["mapValue"]["fields"];
        assert_eq!(fields["version"], json!({ "integerValue": "3" }));
        assert_eq!(fields["rating"], json!({ "doubleValue": 4.5 }));
        assert_eq!(fields["note"], json!({ "nullValue": null }));
        assert_eq!(
            fields["turns"]["arrayValue"]["values"][1]["mapValue"]["fields"]["text"],
            json!({ "stringValue": "Hello" })
        );
    }

    #[test]
    fn test_decode_inverts_encode() {
        let doc = session_doc();
        assert_eq!(decode_value(&encode_value(&doc)), doc);
        // Firestore omits `values` for empty arrays
        assert_eq!(decode_value(&json!({ "arrayValue": {} })), json!([]));
        assert_eq!(
            decode_value(&json!({ "timestampValue": "2024-01-01T00:00:00Z" })),
            json!("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_field_path_quoting() {
        assert_eq!(field_path("lastQuizScore"), "lastQuizScore");
        assert_eq!(field_path("audio-url"), "`audio-url`");
        assert_eq!(field_path("1st"), "`1st`");
    }

    #[tokio::test]
    async fn test_get_missing_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/p/databases/(default)/documents/users/u1/chats/rama"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = FirestoreDocumentStore::new(&server.uri(), "p", "(default)", None).unwrap();
        assert_eq!(store.get("users/u1/chats/rama").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_compare_and_set_uses_update_time_precondition() {
        let server = MockServer::start().await;
        let doc_path = "/projects/p/databases/(default)/documents/users/u1/chats/rama";
        Mock::given(method("GET"))
            .and(path(doc_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p/databases/(default)/documents/users/u1/chats/rama",
                "fields": { "version": { "integerValue": "2" } },
                "updateTime": "2024-05-01T10:00:00.123456Z"
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(doc_path))
            .and(query_param("currentDocument.updateTime", "2024-05-01T10:00:00.123456Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let store = FirestoreDocumentStore::new(&server.uri(), "p", "(default)", None).unwrap();
        // Stale version never reaches the PATCH
        assert!(!store
            .compare_and_set("users/u1/chats/rama", Some(1), json!({ "version": 2 }))
            .await
            .unwrap());
        assert!(store
            .compare_and_set("users/u1/chats/rama", Some(2), json!({ "version": 3 }))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_compare_and_set_reports_precondition_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(query_param("currentDocument.exists", "false"))
            .respond_with(ResponseTemplate::new(409).set_body_string("ALREADY_EXISTS"))
            .mount(&server)
            .await;

        let store = FirestoreDocumentStore::new(&server.uri(), "p", "(default)", None).unwrap();
        assert!(!store
            .compare_and_set("users/u1/chats/sita", None, json!({ "version": 1 }))
            .await
            .unwrap());
    }
}

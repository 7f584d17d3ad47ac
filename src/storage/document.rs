use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Field every versioned document carries for compare-and-set
pub const VERSION_FIELD: &str = "version";

/// Document database holding one JSON object per slash-separated path
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` when missing
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Replace the whole document
    async fn set(&self, path: &str, document: Value) -> Result<()>;

    /// Merge top-level fields into the document, creating it when missing
    async fn update(&self, path: &str, fields: Value) -> Result<()>;

    /// Replace the document only if its stored `version` field equals
    /// `expected_version` (`None`: only if the document does not exist).
    /// Returns `false` when the precondition fails.
    async fn compare_and_set(
        &self,
        path: &str,
        expected_version: Option<u64>,
        document: Value,
    ) -> Result<bool>;
}

/// Stored version; documents written before versioning count as 0
pub(crate) fn stored_version(document: &Value) -> u64 {
    document
        .get(VERSION_FIELD)
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

fn version_matches(current: Option<&Value>, expected: Option<u64>) -> bool {
    match (current, expected) {
        (None, None) => true,
        (Some(doc), Some(v)) => stored_version(doc) == v,
        _ => false,
    }
}

fn as_object(value: Value, what: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("{} must be a JSON object, got {}", what, other),
    }
}

fn merge(existing: Option<Value>, fields: Value) -> Result<Value> {
    let mut base = match existing {
        Some(doc) => as_object(doc, "stored document")?,
        None => Map::new(),
    };
    base.extend(as_object(fields, "update")?);
    Ok(Value::Object(base))
}

/// In-process store; used for tests and throwaway local runs
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        Ok(self.documents.lock().get(path).cloned())
    }

    async fn set(&self, path: &str, document: Value) -> Result<()> {
        self.documents.lock().insert(path.to_string(), document);
        Ok(())
    }

    async fn update(&self, path: &str, fields: Value) -> Result<()> {
        let mut documents = self.documents.lock();
        let merged = merge(documents.remove(path), fields)?;
        documents.insert(path.to_string(), merged);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        path: &str,
        expected_version: Option<u64>,
        document: Value,
    ) -> Result<bool> {
        let mut documents = self.documents.lock();
        if !version_matches(documents.get(path), expected_version) {
            return Ok(false);
        }
        documents.insert(path.to_string(), document);
        Ok(true)
    }
}

/// One pretty-printed JSON file per document under a data directory
pub struct FileDocumentStore {
    root: PathBuf,
    // Serializes read-modify-write within this process
    write_lock: tokio::sync::Mutex<()>,
}

impl FileDocumentStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create data directory {}", root.display()))?;
        Ok(Self {
            root,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn file_for(&self, path: &str) -> Result<PathBuf> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments
            .iter()
            .any(|s| s.is_empty() || *s == "." || *s == "..")
        {
            anyhow::bail!("Invalid document path: {}", path);
        }
        let mut file = self.root.clone();
        if let Some((last, parents)) = segments.split_last() {
            for segment in parents {
                file.push(segment);
            }
            file.push(format!("{}.json", last));
        }
        Ok(file)
    }

    async fn read(&self, path: &str) -> Result<Option<Value>> {
        let file = self.file_for(path)?;
        match tokio::fs::read_to_string(&file).await {
            Ok(json) => {
                let value = serde_json::from_str(&json)
                    .with_context(|| format!("Corrupt document at {}", file.display()))?;
                Ok(Some(value))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("Failed to read {}", file.display())),
        }
    }

    async fn write(&self, path: &str, document: &Value) -> Result<()> {
        let file = self.file_for(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(document)?;

        // Readers never take the lock, so replace the file in one rename
        let staging = file.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        if let Err(err) = tokio::fs::write(&staging, json).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(err).with_context(|| format!("Failed to write {}", staging.display()));
        }
        tokio::fs::rename(&staging, &file)
            .await
            .with_context(|| format!("Failed to replace {}", file.display()))
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        self.read(path).await
    }

    async fn set(&self, path: &str, document: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(path, &document).await
    }

    async fn update(&self, path: &str, fields: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let merged = merge(self.read(path).await?, fields)?;
        self.write(path, &merged).await
    }

    async fn compare_and_set(
        &self,
        path: &str,
        expected_version: Option<u64>,
        document: Value,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let current = self.read(path).await?;
        if !version_matches(current.as_ref(), expected_version) {
            return Ok(false);
        }
        self.write(path, &document).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    async fn exercise_store(store: &dyn DocumentStore) {
        let path = "users/u1/chats/lord-hanuman";
        assert_eq!(store.get(path).await.unwrap(), None);

        // Creation precondition
        assert!(store
            .compare_and_set(path, None, json!({ "version": 1, "turns": [] }))
            .await
            .unwrap());
        assert!(!store
            .compare_and_set(path, None, json!({ "version": 1 }))
            .await
            .unwrap());

        // Version precondition
        assert!(!store
            .compare_and_set(path, Some(7), json!({ "version": 8 }))
            .await
            .unwrap());
        assert!(store
            .compare_and_set(path, Some(1), json!({ "version": 2, "turns": ["a"] }))
            .await
            .unwrap());

        store.update(path, json!({ "lastQuizScore": 4 })).await.unwrap();
        assert_eq!(
            store.get(path).await.unwrap(),
            Some(json!({ "version": 2, "turns": ["a"], "lastQuizScore": 4 }))
        );

        store.set(path, json!({ "version": 9 })).await.unwrap();
        assert_eq!(store.get(path).await.unwrap(), Some(json!({ "version": 9 })));

        // Update creates missing documents
        store.update("users/u2", json!({ "a": 1 })).await.unwrap();
        assert_eq!(store.get("users/u2").await.unwrap(), Some(json!({ "a": 1 })));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryDocumentStore::new();
        exercise_store(&store).await;
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_file_store() {
        let dir = TempDir::new().unwrap();
        let store = FileDocumentStore::new(dir.path()).unwrap();
        exercise_store(&store).await;
        assert!(dir.path().join("users/u1/chats/lord-hanuman.json").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_file_store_reads_never_see_partial_writes() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(FileDocumentStore::new(dir.path()).unwrap());
        let path = "users/u1/chats/rama";
        let turns: Vec<Value> = (0..20_000)
            .map(|i| json!({ "role": "model", "text": format!("turn {}", i) }))
            .collect();
        store.set(path, json!({ "version": 0, "turns": turns })).await.unwrap();

        let writer = {
            let store = store.clone();
            let turns = turns.clone();
            tokio::spawn(async move {
                for version in 1..=100u64 {
                    store
                        .set(path, json!({ "version": version, "turns": turns }))
                        .await
                        .unwrap();
                }
            })
        };

        let mut reads = 0;
        while !writer.is_finished() {
            let document = store.get(path).await.unwrap().unwrap();
            assert_eq!(document["turns"].as_array().unwrap().len(), 20_000);
            reads += 1;
        }
        writer.await.unwrap();
        assert!(reads > 0);

        // No staging files left behind
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("users/u1/chats"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_file_store_rejects_bad_paths() {
        let dir = TempDir::new().unwrap();
        let store = FileDocumentStore::new(dir.path()).unwrap();
        assert!(store.get("users/../secrets").await.is_err());
        assert!(store.set("users//x", json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_update_rejects_non_objects() {
        let store = MemoryDocumentStore::new();
        assert!(store.update("users/u1", json!([1, 2])).await.is_err());
    }
}

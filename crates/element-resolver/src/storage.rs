//! Storage port for the selector memory document
//!
//! The memory keeps every mapping in process and hands the complete set to a
//! [`MappingStore`] after each change. Stores only need to load and save the
//! whole document, which keeps swapping in another backend cheap.

use crate::errors::{ResolverError, Result};
use crate::mapping::ElementMapping;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Read every stored mapping. A store that has never been written loads as empty.
    async fn load(&self) -> Result<Vec<ElementMapping>>;

    /// Replace the stored document with `mappings`.
    async fn save(&self, mappings: &[ElementMapping]) -> Result<()>;
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Keeps the memory as a pretty-printed JSON array in one file.
///
/// Saves write a sibling temp file and rename it over the document, so a
/// reader never sees a half-written file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "selector_memory.json".to_string());
        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.path
            .with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
    }
}

#[async_trait]
impl MappingStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<ElementMapping>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "[selector_memory] No memory document at {}",
                    self.path.display()
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    async fn save(&self, mappings: &[ElementMapping]) -> Result<()> {
        let json = serde_json::to_string_pretty(mappings)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Keeps the serialized document in process; nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    document: Mutex<Option<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a raw document, valid or not.
    pub fn with_document(text: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(text.into())),
        }
    }

    /// The last saved document, if any.
    pub fn document(&self) -> Option<String> {
        self.document.lock().ok().and_then(|doc| doc.clone())
    }
}

#[async_trait]
impl MappingStore for InMemoryStore {
    async fn load(&self) -> Result<Vec<ElementMapping>> {
        match self.document() {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, mappings: &[ElementMapping]) -> Result<()> {
        let json = serde_json::to_string(mappings)?;
        let mut doc = self
            .document
            .lock()
            .map_err(|_| ResolverError::Storage("in-memory document lock poisoned".into()))?;
        *doc = Some(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{Selector, SelectorKind};

    fn sample() -> Vec<ElementMapping> {
        let mut mapping = ElementMapping::new("com.social", "post_button");
        mapping.apply_success(Selector::new(SelectorKind::Text, "Share", 0.6), None);
        vec![mapping]
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/deeper/memory.json"));
        store.save(&sample()).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].element_key, "post_button");
        assert_eq!(loaded[0].success_count, 1);
        assert_eq!(loaded[0].selectors[0].value, "Share");
        assert_eq!(loaded[0].selectors[0].confidence, 0.6);
    }

    #[tokio::test]
    async fn test_file_store_save_replaces_document_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "{ stale").unwrap();
        let store = JsonFileStore::new(&path);

        store.save(&sample()).await.unwrap();
        store.save(&[]).await.unwrap();

        assert!(store.load().await.unwrap().is_empty());
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, ["memory.json"]);
    }

    #[tokio::test]
    async fn test_file_store_corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "{ this is not json").unwrap();
        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, ResolverError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_in_memory_store_keeps_last_save() {
        let store = InMemoryStore::new();
        assert!(store.load().await.unwrap().is_empty());
        store.save(&sample()).await.unwrap();
        assert!(store.document().unwrap().contains("\"Share\""));
        assert_eq!(store.load().await.unwrap().len(), 1);
    }
}

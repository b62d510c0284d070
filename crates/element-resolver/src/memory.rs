//! Selector Memory
//!
//! Remembers, per app and element, which selectors have located the element
//! before and how reliably. Confidence moves by fixed steps: +0.1 on success
//! (capped at 1), -0.3 on failure (floored at 0).
//!
//! All mappings live in process behind a lock that is never held across an
//! `.await`. After every change the full set is handed to the
//! [`MappingStore`]; save failures are logged and otherwise ignored. Saves go
//! one at a time and each snapshots the map only once it holds the save lock,
//! so the document written last always reflects every change made before it.

use crate::mapping::ElementMapping;
use crate::selector::{Selector, SelectorKind};
use crate::storage::{InMemoryStore, MappingStore};
use crate::utils::normalize_key;
use element_vision::Coordinates;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// (app id, normalized element key)
type MappingKey = (String, String);

/// Aggregate health of the memory
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryStats {
    pub total_mappings: usize,
    pub total_apps: usize,
    /// Mean confidence over every stored selector; 0 when there are none
    pub avg_confidence: f64,
}

pub struct SelectorMemory {
    store: Arc<dyn MappingStore>,
    mappings: RwLock<BTreeMap<MappingKey, ElementMapping>>,
    save_lock: Mutex<()>,
}

impl SelectorMemory {
    /// Load the memory from `store`.
    ///
    /// A missing or unreadable document yields an empty memory.
    pub async fn open(store: Arc<dyn MappingStore>) -> Self {
        let loaded = match store.load().await {
            Ok(mappings) => {
                info!(
                    "[selector_memory] Loaded {} element mappings",
                    mappings.len()
                );
                mappings
            }
            Err(e) => {
                warn!(
                    "[selector_memory] Memory document unreadable, starting empty: {}",
                    e
                );
                Vec::new()
            }
        };

        let mappings = loaded
            .into_iter()
            .map(|mut mapping| {
                mapping.element_key = normalize_key(&mapping.element_key);
                ((mapping.app_id.clone(), mapping.element_key.clone()), mapping)
            })
            .collect();

        Self {
            store,
            mappings: RwLock::new(mappings),
            save_lock: Mutex::new(()),
        }
    }

    /// An empty memory that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            mappings: RwLock::new(BTreeMap::new()),
            save_lock: Mutex::new(()),
        }
    }

    pub fn find_element(&self, app_id: &str, element_key: &str) -> Option<ElementMapping> {
        self.read().get(&mapping_key(app_id, element_key)).cloned()
    }

    /// Known selectors for the element, highest confidence first.
    pub fn get_selectors(&self, app_id: &str, element_key: &str) -> Vec<Selector> {
        self.read()
            .get(&mapping_key(app_id, element_key))
            .map(ElementMapping::ranked_selectors)
            .unwrap_or_default()
    }

    /// Record that `selector` located the element, creating the mapping if needed.
    pub async fn record_success(
        &self,
        app_id: &str,
        element_key: &str,
        selector: Selector,
        coordinates: Option<Coordinates>,
    ) {
        let key = mapping_key(app_id, element_key);
        debug!(
            "[selector_memory] success {}/{} via {}",
            key.0, key.1, selector
        );
        self.write()
            .entry(key.clone())
            .or_insert_with(|| ElementMapping::new(key.0, key.1))
            .apply_success(selector, coordinates);
        self.persist().await;
    }

    /// Record that a selector failed to locate the element.
    ///
    /// Does nothing for an element that has never been recorded.
    pub async fn record_failure(
        &self,
        app_id: &str,
        element_key: &str,
        kind: SelectorKind,
        value: &str,
    ) {
        let key = mapping_key(app_id, element_key);
        {
            let mut mappings = self.write();
            let Some(mapping) = mappings.get_mut(&key) else {
                debug!(
                    "[selector_memory] failure for unknown element {}/{} ignored",
                    key.0, key.1
                );
                return;
            };
            mapping.apply_failure(kind, value);
            debug!(
                "[selector_memory] failure {}/{} via {}:{}",
                key.0, key.1, kind, value
            );
        }
        self.persist().await;
    }

    /// Attach a description of how the element looks, creating the mapping if needed.
    pub async fn set_visual_description(&self, app_id: &str, element_key: &str, text: &str) {
        let key = mapping_key(app_id, element_key);
        {
            let mut mappings = self.write();
            let mapping = mappings
                .entry(key.clone())
                .or_insert_with(|| ElementMapping::new(key.0, key.1));
            mapping.visual_description = Some(text.to_string());
            mapping.last_updated = chrono::Utc::now();
        }
        self.persist().await;
    }

    pub fn get_app_mappings(&self, app_id: &str) -> Vec<ElementMapping> {
        self.read()
            .values()
            .filter(|m| m.app_id == app_id)
            .cloned()
            .collect()
    }

    pub fn get_stats(&self) -> MemoryStats {
        let mappings = self.read();
        let apps: BTreeSet<&str> = mappings.values().map(|m| m.app_id.as_str()).collect();
        let (sum, count) = mappings
            .values()
            .flat_map(|m| m.selectors.iter())
            .fold((0.0, 0usize), |(sum, count), s| (sum + s.confidence, count + 1));

        MemoryStats {
            total_mappings: mappings.len(),
            total_apps: apps.len(),
            avg_confidence: if count == 0 { 0.0 } else { sum / count as f64 },
        }
    }

    async fn persist(&self) {
        let _guard = self.save_lock.lock().await;
        let snapshot: Vec<ElementMapping> = self.read().values().cloned().collect();
        if let Err(e) = self.store.save(&snapshot).await {
            warn!("[selector_memory] Failed to save memory document: {}", e);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<MappingKey, ElementMapping>> {
        self.mappings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<MappingKey, ElementMapping>> {
        self.mappings.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn mapping_key(app_id: &str, element_key: &str) -> MappingKey {
    (app_id.to_string(), normalize_key(element_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ResolverError, Result};
    use crate::storage::JsonFileStore;
    use async_trait::async_trait;

    const APP: &str = "com.social";

    struct ReadOnlyStore;

    #[async_trait]
    impl MappingStore for ReadOnlyStore {
        async fn load(&self) -> Result<Vec<ElementMapping>> {
            Ok(Vec::new())
        }

        async fn save(&self, _mappings: &[ElementMapping]) -> Result<()> {
            Err(ResolverError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only file system",
            )))
        }
    }

    #[tokio::test]
    async fn test_key_normalization_shares_mapping() {
        let memory = SelectorMemory::in_memory();
        memory
            .record_success(
                APP,
                "Settings Button",
                Selector::native(SelectorKind::ResourceId, "settings"),
                None,
            )
            .await;

        let mapping = memory.find_element(APP, "settings   button").unwrap();
        assert_eq!(mapping.element_key, "settings_button");
        assert_eq!(memory.get_selectors(APP, "SETTINGS BUTTON").len(), 1);
    }

    #[tokio::test]
    async fn test_record_success_creates_and_reinforces() {
        let memory = SelectorMemory::in_memory();
        let share = Selector::new(SelectorKind::Text, "Share", 0.6);
        memory
            .record_success(APP, "post button", share.clone(), Some(Coordinates::new(900, 2200)))
            .await;
        memory.record_success(APP, "post button", share, None).await;

        let mapping = memory.find_element(APP, "post button").unwrap();
        assert_eq!(mapping.success_count, 2);
        assert_eq!(mapping.selectors.len(), 1);
        assert!((mapping.selectors[0].confidence - 0.7).abs() < 1e-9);
        assert_eq!(mapping.last_known_coordinates, Some(Coordinates::new(900, 2200)));
    }

    #[tokio::test]
    async fn test_failure_against_unknown_element_is_noop() {
        let memory = SelectorMemory::in_memory();
        memory
            .record_failure(APP, "post button", SelectorKind::ResourceId, "btn_post")
            .await;
        assert!(memory.find_element(APP, "post button").is_none());
        assert_eq!(memory.get_stats().total_mappings, 0);
    }

    #[tokio::test]
    async fn test_failure_decays_matching_selector() {
        let memory = SelectorMemory::in_memory();
        memory
            .record_success(APP, "post", Selector::new(SelectorKind::Text, "Share", 0.5), None)
            .await;
        memory
            .record_failure(APP, "post", SelectorKind::Text, "Share")
            .await;
        memory
            .record_failure(APP, "post", SelectorKind::Text, "Share")
            .await;

        let mapping = memory.find_element(APP, "post").unwrap();
        assert_eq!(mapping.failure_count, 2);
        assert_eq!(mapping.selectors[0].confidence, 0.0);
    }

    #[tokio::test]
    async fn test_get_selectors_ranked_and_empty_when_unknown() {
        let memory = SelectorMemory::in_memory();
        for (value, confidence) in [("low", 0.2), ("high", 0.9), ("mid", 0.5)] {
            memory
                .record_success(APP, "search", Selector::new(SelectorKind::Text, value, confidence), None)
                .await;
        }
        let ranked: Vec<_> = memory
            .get_selectors(APP, "search")
            .into_iter()
            .map(|s| s.value)
            .collect();
        assert_eq!(ranked, ["high", "mid", "low"]);
        assert!(memory.get_selectors(APP, "missing").is_empty());
    }

    #[tokio::test]
    async fn test_visual_description_creates_mapping() {
        let memory = SelectorMemory::in_memory();
        memory
            .set_visual_description(APP, "Compose", "round blue button with a pencil")
            .await;
        let mapping = memory.find_element(APP, "compose").unwrap();
        assert_eq!(
            mapping.visual_description.as_deref(),
            Some("round blue button with a pencil")
        );
        assert!(mapping.selectors.is_empty());
        assert_eq!(mapping.success_count, 0);
    }

    #[tokio::test]
    async fn test_stats_and_app_mappings() {
        let memory = SelectorMemory::in_memory();
        assert_eq!(memory.get_stats().avg_confidence, 0.0);

        memory
            .record_success(APP, "post", Selector::new(SelectorKind::Text, "Share", 0.6), None)
            .await;
        memory
            .record_success(APP, "search", Selector::new(SelectorKind::Text, "Search", 0.2), None)
            .await;
        memory
            .record_success("com.mail", "send", Selector::new(SelectorKind::Text, "Send", 1.0), None)
            .await;

        let stats = memory.get_stats();
        assert_eq!(stats.total_mappings, 3);
        assert_eq!(stats.total_apps, 2);
        assert!((stats.avg_confidence - 0.6).abs() < 1e-9);
        assert_eq!(memory.get_app_mappings(APP).len(), 2);
        assert!(memory.get_app_mappings("com.unknown").is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_document_loads_empty() {
        let store = Arc::new(InMemoryStore::with_document("[{\"app_id\": 42,"));
        let memory = SelectorMemory::open(store).await;
        assert_eq!(memory.get_stats().total_mappings, 0);
    }

    #[tokio::test]
    async fn test_every_mutation_is_persisted_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selector_memory.json");

        let memory = SelectorMemory::open(Arc::new(JsonFileStore::new(&path))).await;
        memory
            .record_success(APP, "post", Selector::new(SelectorKind::Text, "Share", 0.6), None)
            .await;
        memory
            .set_visual_description(APP, "post", "paper plane icon")
            .await;
        drop(memory);

        let reopened = SelectorMemory::open(Arc::new(JsonFileStore::new(&path))).await;
        let mapping = reopened.find_element(APP, "post").unwrap();
        assert_eq!(mapping.selectors[0].value, "Share");
        assert_eq!(mapping.visual_description.as_deref(), Some("paper plane icon"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_on_distinct_keys_all_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selector_memory.json");
        let memory = Arc::new(SelectorMemory::open(Arc::new(JsonFileStore::new(&path))).await);

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let memory = Arc::clone(&memory);
                tokio::spawn(async move {
                    let selector = Selector::new(SelectorKind::Text, format!("Item {i}"), 0.5);
                    memory
                        .record_success(APP, &format!("key {i}"), selector, None)
                        .await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        drop(memory);

        let reopened = SelectorMemory::open(Arc::new(JsonFileStore::new(&path))).await;
        assert_eq!(reopened.get_stats().total_mappings, 64);
        for i in 0..64 {
            let mapping = reopened.find_element(APP, &format!("key {i}")).unwrap();
            assert_eq!(mapping.selectors[0].value, format!("Item {i}"));
        }
    }

    #[tokio::test]
    async fn test_save_failure_is_swallowed() {
        let memory = SelectorMemory::open(Arc::new(ReadOnlyStore)).await;
        memory
            .record_success(APP, "post", Selector::native(SelectorKind::ResourceId, "btn_post"), None)
            .await;
        assert_eq!(memory.get_selectors(APP, "post").len(), 1);
    }
}

//! Tiered element resolution
//!
//! [`ElementResolver::find_element`] escalates through three strategies,
//! cheapest and most certain first:
//!
//! 1. **exact**: the caller's primary selector against the standard finder
//! 2. **memory**: selectors that located this element before, best first
//! 3. **vision**: ask the vision model to find the element in a screenshot
//!
//! A tier only runs when the previous one missed. Every attempt, hit or miss,
//! is written back to the [`SelectorMemory`], so repeated runs against the same
//! app version resolve more often in the cheap tiers.

use crate::finder::{find_with_selector, StandardFinder};
use crate::mapping::ElementMapping;
use crate::memory::{MemoryStats, SelectorMemory};
use crate::selector::{Selector, SelectorKind};
use crate::utils::normalize_key;
use element_vision::{Coordinates, VisionLocator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Which tier produced a [`FindResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindMethod {
    Exact,
    Memory,
    Vision,
    #[serde(rename = "none")]
    NotFound,
}

/// Outcome of a single resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindResult {
    pub found: bool,
    pub method: FindMethod,
    pub coordinates: Option<Coordinates>,
    /// The selector that located the element
    pub selector: Option<Selector>,
    pub confidence: f64,
    pub description: String,
}

impl FindResult {
    fn not_found(description: String) -> Self {
        Self {
            found: false,
            method: FindMethod::NotFound,
            coordinates: None,
            selector: None,
            confidence: 0.0,
            description,
        }
    }
}

pub struct ElementResolver {
    finder: Arc<dyn StandardFinder>,
    memory: Arc<SelectorMemory>,
    vision: Option<Arc<VisionLocator>>,
}

impl ElementResolver {
    /// Resolver without a vision tier; call [`with_vision`](Self::with_vision) to add one.
    pub fn new(finder: Arc<dyn StandardFinder>, memory: Arc<SelectorMemory>) -> Self {
        Self {
            finder,
            memory,
            vision: None,
        }
    }

    pub fn with_vision(mut self, vision: Arc<VisionLocator>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn memory(&self) -> &Arc<SelectorMemory> {
        &self.memory
    }

    /// Resolve `element_key` in `app_id`, starting from `primary`.
    ///
    /// Never fails: an element no tier can find comes back with
    /// `found == false`, method `none` and confidence 0.
    #[instrument(skip(self, primary), fields(primary = %primary))]
    pub async fn find_element(
        &self,
        app_id: &str,
        element_key: &str,
        primary: &Selector,
    ) -> FindResult {
        if let Some(result) = self.try_exact(app_id, element_key, primary).await {
            return result;
        }
        if let Some(result) = self.try_memory(app_id, element_key, primary).await {
            return result;
        }
        if let Some(result) = self.try_vision(app_id, element_key).await {
            return result;
        }

        info!(
            "[resolver] '{}' in {} not found by any strategy",
            element_key, app_id
        );
        FindResult::not_found(format!("Element '{element_key}' not found"))
    }

    pub fn get_app_mappings(&self, app_id: &str) -> Vec<ElementMapping> {
        self.memory.get_app_mappings(app_id)
    }

    pub fn get_stats(&self) -> MemoryStats {
        self.memory.get_stats()
    }

    async fn try_exact(
        &self,
        app_id: &str,
        element_key: &str,
        primary: &Selector,
    ) -> Option<FindResult> {
        let selector = Selector::native(primary.kind, primary.value.clone());
        if !selector.kind.is_queryable() {
            debug!("[resolver] primary selector {} cannot be queried", selector);
            return None;
        }

        let Some(coordinates) = find_with_selector(self.finder.as_ref(), &selector).await else {
            debug!("[resolver] primary selector {} missed", selector);
            self.memory
                .record_failure(app_id, element_key, selector.kind, &selector.value)
                .await;
            return None;
        };

        info!(
            "[resolver] '{}' found by primary selector {} at {}",
            element_key, selector, coordinates
        );
        self.memory
            .record_success(app_id, element_key, selector.clone(), Some(coordinates))
            .await;

        Some(FindResult {
            found: true,
            method: FindMethod::Exact,
            coordinates: Some(coordinates),
            description: format!("Found by {selector}"),
            selector: Some(selector),
            confidence: 1.0,
        })
    }

    async fn try_memory(
        &self,
        app_id: &str,
        element_key: &str,
        primary: &Selector,
    ) -> Option<FindResult> {
        let candidates = self
            .memory
            .get_selectors(app_id, element_key)
            .into_iter()
            .filter(|s| s.kind.is_queryable() && !s.same_target(primary));

        for selector in candidates {
            debug!(
                "[resolver] trying remembered selector {} ({:.2})",
                selector, selector.confidence
            );
            match find_with_selector(self.finder.as_ref(), &selector).await {
                Some(coordinates) => {
                    info!(
                        "[resolver] '{}' found by remembered selector {} at {}",
                        element_key, selector, coordinates
                    );
                    let confidence = selector.confidence;
                    self.memory
                        .record_success(app_id, element_key, selector.clone(), Some(coordinates))
                        .await;
                    return Some(FindResult {
                        found: true,
                        method: FindMethod::Memory,
                        coordinates: Some(coordinates),
                        description: format!("Found by remembered {selector}"),
                        selector: Some(selector),
                        confidence,
                    });
                }
                None => {
                    self.memory
                        .record_failure(app_id, element_key, selector.kind, &selector.value)
                        .await;
                }
            }
        }
        None
    }

    async fn try_vision(&self, app_id: &str, element_key: &str) -> Option<FindResult> {
        let vision = self.vision.as_ref()?;
        let Some(screenshot) = self.finder.get_screenshot().await else {
            debug!("[resolver] no screenshot available, skipping vision");
            return None;
        };
        let screen = self.finder.get_screen_size().await;
        let hint = self
            .memory
            .find_element(app_id, element_key)
            .and_then(|m| m.visual_description);

        let result = vision
            .find_element_with_hint(
                &screenshot,
                element_key,
                hint.as_deref(),
                screen.width,
                screen.height,
            )
            .await;

        let visual_value = normalize_key(element_key);
        let coordinates = match (result.found, result.coordinates) {
            (true, Some(coordinates)) => coordinates,
            _ => {
                self.memory
                    .record_failure(app_id, element_key, SelectorKind::Visual, &visual_value)
                    .await;
                return None;
            }
        };

        info!(
            "[resolver] '{}' found by vision at {} ({:.2})",
            element_key, coordinates, result.confidence
        );
        let selector = Selector::new(SelectorKind::Visual, visual_value, result.confidence);
        self.memory
            .record_success(app_id, element_key, selector.clone(), Some(coordinates))
            .await;
        if !result.description.trim().is_empty() {
            self.memory
                .set_visual_description(app_id, element_key, &result.description)
                .await;
        }

        Some(FindResult {
            found: true,
            method: FindMethod::Vision,
            coordinates: Some(coordinates),
            selector: Some(selector),
            confidence: result.confidence,
            description: result.description,
        })
    }
}

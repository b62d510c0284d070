use crate::selector::{Selector, SelectorKind};
use chrono::{DateTime, Utc};
use element_vision::Coordinates;
use serde::{Deserialize, Serialize};

/// Everything remembered about one named element of one app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementMapping {
    pub app_id: String,
    /// Normalized element key, see [`crate::utils::normalize_key`]
    pub element_key: String,
    /// Candidate selectors; at most one per (kind, value)
    #[serde(default)]
    pub selectors: Vec<Selector>,
    /// What the element looks like, as last reported by the vision model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_coordinates: Option<Coordinates>,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    pub last_updated: DateTime<Utc>,
}

impl ElementMapping {
    pub fn new(app_id: impl Into<String>, element_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            element_key: element_key.into(),
            selectors: Vec::new(),
            visual_description: None,
            last_known_coordinates: None,
            success_count: 0,
            failure_count: 0,
            last_updated: Utc::now(),
        }
    }

    pub fn selector(&self, kind: SelectorKind, value: &str) -> Option<&Selector> {
        self.selectors.iter().find(|s| s.matches(kind, value))
    }

    /// Selectors ordered by confidence, highest first. Ties keep insertion order.
    pub fn ranked_selectors(&self) -> Vec<Selector> {
        let mut ranked = self.selectors.clone();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranked
    }

    /// Reinforce `selector` if already known, otherwise add it as given.
    ///
    /// A known visual selector ends at no less than the incoming confidence,
    /// which for a vision hit is what the model just reported.
    pub fn apply_success(&mut self, selector: Selector, coordinates: Option<Coordinates>) {
        match self
            .selectors
            .iter_mut()
            .find(|s| s.same_target(&selector))
        {
            Some(existing) => {
                existing.reinforce();
                if selector.kind == SelectorKind::Visual {
                    existing.confidence = existing.confidence.max(selector.confidence);
                }
            }
            None => self.selectors.push(selector),
        }
        self.success_count += 1;
        if coordinates.is_some() {
            self.last_known_coordinates = coordinates;
        }
        self.last_updated = Utc::now();
    }

    /// Count a failed attempt and decay the matching selector, if any.
    pub fn apply_failure(&mut self, kind: SelectorKind, value: &str) {
        if let Some(existing) = self.selectors.iter_mut().find(|s| s.matches(kind, value)) {
            existing.penalize();
        }
        self.failure_count += 1;
        self.last_updated = Utc::now();
    }
}

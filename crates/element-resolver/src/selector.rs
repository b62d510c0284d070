use crate::errors::{ResolverError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Confidence gained each time a selector resolves its element.
pub const SUCCESS_BOOST: f64 = 0.1;
/// Confidence lost each time a selector fails to resolve its element.
pub const FAILURE_PENALTY: f64 = 0.3;

/// Ways to locate a UI element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    /// Native resource identifier, e.g. `com.app:id/btn_post`
    ResourceId,
    /// Visible text
    Text,
    /// Accessibility content description
    ContentDesc,
    /// Structural path through the view hierarchy
    Xpath,
    /// Fixed screen position, value is `x,y`
    Coordinates,
    /// Located by the vision model, value is the element name
    Visual,
}

impl SelectorKind {
    pub fn prefix(self) -> &'static str {
        match self {
            SelectorKind::ResourceId => "id",
            SelectorKind::Text => "text",
            SelectorKind::ContentDesc => "desc",
            SelectorKind::Xpath => "xpath",
            SelectorKind::Coordinates => "coords",
            SelectorKind::Visual => "visual",
        }
    }

    /// Kinds the standard finder can run. XPath, coordinate and visual
    /// selectors are stored but never replayed against the device.
    pub fn is_queryable(self) -> bool {
        matches!(
            self,
            SelectorKind::ResourceId | SelectorKind::Text | SelectorKind::ContentDesc
        )
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_lowercase().as_str() {
            "id" | "resource_id" | "resource-id" => Some(SelectorKind::ResourceId),
            "text" => Some(SelectorKind::Text),
            "desc" | "content_desc" | "content-desc" => Some(SelectorKind::ContentDesc),
            "xpath" | "path" => Some(SelectorKind::Xpath),
            "coords" | "coordinates" => Some(SelectorKind::Coordinates),
            "visual" => Some(SelectorKind::Visual),
            _ => None,
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A candidate way of locating an element, with how well it has worked so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    pub kind: SelectorKind,
    pub value: String,
    /// Always within [0, 1]
    pub confidence: f64,
    pub last_used: DateTime<Utc>,
}

impl Selector {
    pub fn new(kind: SelectorKind, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            kind,
            value: value.into(),
            confidence: clamp_confidence(confidence),
            last_used: Utc::now(),
        }
    }

    /// A selector supplied directly by the caller, trusted fully.
    pub fn native(kind: SelectorKind, value: impl Into<String>) -> Self {
        Self::new(kind, value, 1.0)
    }

    pub fn matches(&self, kind: SelectorKind, value: &str) -> bool {
        self.kind == kind && self.value == value
    }

    pub fn same_target(&self, other: &Selector) -> bool {
        self.matches(other.kind, &other.value)
    }

    /// Apply a success: `min(1, c + 0.1)` and refresh `last_used`.
    pub fn reinforce(&mut self) {
        self.confidence = clamp_confidence(self.confidence + SUCCESS_BOOST);
        self.last_used = Utc::now();
    }

    /// Apply a failure: `max(0, c - 0.3)`.
    pub fn penalize(&mut self) {
        self.confidence = clamp_confidence(self.confidence - FAILURE_PENALTY);
    }

    /// Parse the `kind:value` form, e.g. `id:btn_post` or `text:Share`.
    ///
    /// `#name` is shorthand for a resource id and a leading `/` for a path.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(id) = s.strip_prefix('#') {
            return non_empty(SelectorKind::ResourceId, id, s);
        }
        if s.starts_with('/') {
            return non_empty(SelectorKind::Xpath, s, s);
        }
        match s.split_once(':') {
            Some((prefix, value)) => match SelectorKind::from_prefix(prefix.trim()) {
                Some(SelectorKind::Coordinates) => {
                    value
                        .parse::<element_vision::Coordinates>()
                        .map_err(ResolverError::InvalidSelector)?;
                    non_empty(SelectorKind::Coordinates, value, s)
                }
                Some(kind) => non_empty(kind, value, s),
                None => Err(unknown_format(s)),
            },
            None => Err(unknown_format(s)),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

impl FromStr for Selector {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self> {
        Selector::parse(s)
    }
}

fn clamp_confidence(c: f64) -> f64 {
    if c.is_nan() {
        0.0
    } else {
        c.clamp(0.0, 1.0)
    }
}

fn non_empty(kind: SelectorKind, value: &str, original: &str) -> Result<Selector> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ResolverError::InvalidSelector(format!(
            "Selector \"{original}\" has an empty value"
        )));
    }
    Ok(Selector::native(kind, value))
}

fn unknown_format(s: &str) -> ResolverError {
    ResolverError::InvalidSelector(format!(
        "Unknown selector format: \"{s}\". Use prefixes like 'id:', 'text:', 'desc:', 'xpath:', 'coords:' or 'visual:' to specify the selector type."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_confidence_growth_is_capped() {
        let mut s = Selector::new(SelectorKind::Text, "Share", 0.6);
        s.reinforce();
        assert!(approx(s.confidence, 0.7));
        for _ in 0..20 {
            s.reinforce();
            assert!(s.confidence <= 1.0);
        }
        assert_eq!(s.confidence, 1.0);
    }

    #[test]
    fn test_confidence_decay_is_floored() {
        let mut s = Selector::new(SelectorKind::ResourceId, "btn_post", 1.0);
        s.penalize();
        assert!(approx(s.confidence, 0.7));
        for _ in 0..10 {
            s.penalize();
            assert!(s.confidence >= 0.0);
        }
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn test_new_clamps_confidence() {
        assert_eq!(Selector::new(SelectorKind::Visual, "x", 1.7).confidence, 1.0);
        assert_eq!(Selector::new(SelectorKind::Visual, "x", -0.2).confidence, 0.0);
        assert_eq!(Selector::new(SelectorKind::Visual, "x", f64::NAN).confidence, 0.0);
    }

    #[test]
    fn test_parse_prefixed_selectors() {
        let s = Selector::parse("id:btn_post").unwrap();
        assert_eq!((s.kind, s.value.as_str()), (SelectorKind::ResourceId, "btn_post"));
        assert_eq!(s.confidence, 1.0);

        let s = Selector::parse("text: Share ").unwrap();
        assert_eq!((s.kind, s.value.as_str()), (SelectorKind::Text, "Share"));

        let s = Selector::parse("desc:Navigate up").unwrap();
        assert_eq!(s.kind, SelectorKind::ContentDesc);

        let s = Selector::parse("coords:540,240").unwrap();
        assert_eq!(s.kind, SelectorKind::Coordinates);
    }

    #[test]
    fn test_parse_shorthands() {
        assert_eq!(Selector::parse("#search").unwrap().kind, SelectorKind::ResourceId);
        let s = Selector::parse("//android.widget.Button[2]").unwrap();
        assert_eq!(s.kind, SelectorKind::Xpath);
        assert_eq!(s.value, "//android.widget.Button[2]");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Selector::parse("Share").is_err());
        assert!(Selector::parse("role:button").is_err());
        assert!(Selector::parse("text:").is_err());
        assert!(Selector::parse("coords:left").is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let s = Selector::new(SelectorKind::ContentDesc, "More options", 0.4);
        assert_eq!(s.to_string(), "desc:More options");
        assert!(Selector::parse(&s.to_string()).unwrap().same_target(&s));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&SelectorKind::ContentDesc).unwrap();
        assert_eq!(json, "\"content_desc\"");
    }
}

//! Vision Locator
//!
//! Last-resort element location: asks a vision model where an element is and
//! turns its reply into pixel coordinates. Every failure mode (encoding,
//! transport, malformed reply) ends in a negative result rather than an error.

use crate::backend::{truncate, ChatMessage, ImageAttachment, VisionChat};
use crate::prompt::{build_locate_prompt, get_describe_instructions, get_locate_instructions};
use crate::screenshot::ScreenshotResult;
use crate::types::{percent_to_pixels, Coordinates, ScreenSize};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a vision lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisionFindResult {
    pub found: bool,
    /// Absolute pixel position of the element's visual center
    pub coordinates: Option<Coordinates>,
    /// Model-reported confidence in [0, 1]; 0 when not found
    pub confidence: f64,
    pub description: String,
}

impl VisionFindResult {
    fn not_found(description: impl Into<String>) -> Self {
        Self {
            found: false,
            coordinates: None,
            confidence: 0.0,
            description: description.into(),
        }
    }
}

/// Reply shape requested from the model
#[derive(Debug, Deserialize)]
struct LocateReply {
    #[serde(default)]
    found: bool,
    x: Option<f64>,
    y: Option<f64>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    description: Option<String>,
}

pub struct VisionLocator {
    chat: Arc<dyn VisionChat>,
}

impl VisionLocator {
    pub fn new(chat: Arc<dyn VisionChat>) -> Self {
        Self { chat }
    }

    /// Locate `description` in `screenshot`.
    pub async fn find_element(
        &self,
        screenshot: &ScreenshotResult,
        description: &str,
        screen_width: u32,
        screen_height: u32,
    ) -> VisionFindResult {
        self.find_element_with_hint(screenshot, description, None, screen_width, screen_height)
            .await
    }

    /// Locate `description`, telling the model what the element looked like last time.
    pub async fn find_element_with_hint(
        &self,
        screenshot: &ScreenshotResult,
        description: &str,
        hint: Option<&str>,
        screen_width: u32,
        screen_height: u32,
    ) -> VisionFindResult {
        let image = match screenshot.to_base64_png() {
            Ok(b64) => ImageAttachment::png(b64),
            Err(e) => {
                warn!("[vision] Failed to encode screenshot: {}", e);
                return VisionFindResult::not_found(format!("Screenshot encoding failed: {e}"));
            }
        };

        let messages = [ChatMessage::user_with_image(
            build_locate_prompt(description, hint),
            image,
        )];

        let reply = match self.chat.chat(get_locate_instructions(), &messages).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("[vision] Locate request for '{}' failed: {}", description, e);
                return VisionFindResult::not_found(format!("Vision request failed: {e}"));
            }
        };
        debug!("[vision] Locate reply: {}", truncate(&reply, 500));

        let result = parse_locate_reply(&reply, ScreenSize::new(screen_width, screen_height));
        info!(
            "[vision] '{}' found={} at {:?} (confidence {:.2})",
            description, result.found, result.coordinates, result.confidence
        );
        result
    }

    /// Describe what app and screen the screenshot shows.
    ///
    /// Failures are reported inside the returned text.
    pub async fn describe_screen(&self, screenshot: &ScreenshotResult) -> String {
        let image = match screenshot.to_base64_png() {
            Ok(b64) => ImageAttachment::png(b64),
            Err(e) => {
                warn!("[vision] Failed to encode screenshot: {}", e);
                return format!("Error describing screen: screenshot encoding failed: {e}");
            }
        };

        let messages = [ChatMessage::user_with_image(
            "Describe the current screen.",
            image,
        )];

        match self.chat.chat(get_describe_instructions(), &messages).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("[vision] Describe request failed: {}", e);
                format!("Error describing screen: {e}")
            }
        }
    }
}

/// Interpret a model reply; anything unusable becomes not-found.
pub fn parse_locate_reply(reply: &str, screen: ScreenSize) -> VisionFindResult {
    let Some(block) = extract_json_block(reply) else {
        return VisionFindResult::not_found("No JSON object in vision response");
    };

    let parsed: LocateReply = match serde_json::from_str(block) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("[vision] Reply JSON has unexpected shape: {}", e);
            return VisionFindResult::not_found(format!("Malformed vision response: {e}"));
        }
    };

    let description = parsed.description.unwrap_or_default();
    match (parsed.found, parsed.x, parsed.y) {
        (true, Some(x), Some(y)) => VisionFindResult {
            found: true,
            coordinates: Some(percent_to_pixels(x, y, screen)),
            confidence: parsed.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
            description,
        },
        (true, _, _) => VisionFindResult::not_found("Vision response is missing x/y"),
        (false, _, _) if description.is_empty() => VisionFindResult::not_found("Element not found"),
        (false, _, _) => VisionFindResult::not_found(description),
    }
}

/// Return the first balanced `{...}` span in `text` that parses as a JSON object.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut start = 0;
    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        if let Some(close) = matching_brace(bytes, open) {
            let candidate = &text[open..=close];
            if matches!(
                serde_json::from_str::<serde_json::Value>(candidate),
                Ok(serde_json::Value::Object(_))
            ) {
                return Some(candidate);
            }
        }
        start = open + 1;
    }
    None
}

fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

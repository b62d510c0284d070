//! Vision chat backends
//!
//! The locator talks to a vision-capable model through the [`VisionChat`]
//! trait. [`HttpVisionChat`] is the default implementation: it posts the
//! conversation as JSON to a backend that fronts the actual model.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_BACKEND_URL: &str = "http://localhost:8080/v1/vision/chat";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Image attached to a chat message
#[derive(Debug, Clone, Serialize)]
pub struct ImageAttachment {
    /// MIME type, e.g. "image/png"
    pub mime_type: String,
    /// Base64 encoded image bytes
    pub data: String,
}

impl ImageAttachment {
    pub fn png(base64_data: String) -> Self {
        Self {
            mime_type: "image/png".to_string(),
            data: base64_data,
        }
    }
}

/// A single message sent to the vision model
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAttachment>,
}

impl ChatMessage {
    /// User message with a screenshot attached.
    pub fn user_with_image(text: impl Into<String>, image: ImageAttachment) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            image: Some(image),
        }
    }
}

/// A vision-capable chat model.
///
/// Implementations return the model's raw reply text. Errors are transport or
/// backend failures; the locator absorbs them.
#[async_trait]
pub trait VisionChat: Send + Sync {
    async fn chat(&self, system: &str, messages: &[ChatMessage]) -> Result<String>;
}

/// Settings for [`HttpVisionChat`]
#[derive(Debug, Clone)]
pub struct VisionBackendConfig {
    pub url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for VisionBackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl VisionBackendConfig {
    /// Read `ELEMENT_VISION_BACKEND_URL`, `ELEMENT_VISION_MODEL` and
    /// `ELEMENT_VISION_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let timeout = env::var("ELEMENT_VISION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        Self {
            url: env::var("ELEMENT_VISION_BACKEND_URL").unwrap_or(defaults.url),
            model: env::var("ELEMENT_VISION_MODEL").unwrap_or(defaults.model),
            timeout,
        }
    }
}

/// Backend response structure
#[derive(Debug, Deserialize)]
struct ChatBackendResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    duration_ms: Option<u64>,
    #[serde(default)]
    model_used: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// [`VisionChat`] over HTTP/JSON.
pub struct HttpVisionChat {
    client: reqwest::Client,
    config: VisionBackendConfig,
}

impl HttpVisionChat {
    pub fn new(config: VisionBackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(VisionBackendConfig::from_env())
    }
}

#[async_trait]
impl VisionChat for HttpVisionChat {
    async fn chat(&self, system: &str, messages: &[ChatMessage]) -> Result<String> {
        info!(
            "[vision] Calling backend at {} (model: {}, messages: {})",
            self.config.url,
            self.config.model,
            messages.len()
        );

        let payload = serde_json::json!({
            "model": self.config.model,
            "system": system,
            "messages": messages,
        });

        let resp = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        interpret_backend_response(status, &body)
    }
}

/// Turn a backend HTTP response into the model's reply text.
///
/// A non-2xx status, an undecodable body, an `error` field or a missing
/// `text` field are all errors.
pub(crate) fn interpret_backend_response(status: StatusCode, body: &str) -> Result<String> {
    if !status.is_success() {
        warn!("[vision] Backend error: {} - {}", status, truncate(body, 500));
        return Err(anyhow!("Vision backend error ({}): {}", status, body));
    }

    debug!("[vision] Backend response: {}", truncate(body, 500));

    let response: ChatBackendResponse = serde_json::from_str(body)
        .map_err(|e| anyhow!("Failed to parse backend response: {}", e))?;

    if let Some(error) = response.error {
        return Err(anyhow!("Vision model error: {}", error));
    }

    let text = response
        .text
        .ok_or_else(|| anyhow!("Vision backend returned no text"))?;
    info!(
        "[vision] Backend replied in {} ms (model: {})",
        response
            .duration_ms
            .map_or_else(|| "?".to_string(), |ms| ms.to_string()),
        response.model_used.as_deref().unwrap_or("unknown")
    );
    Ok(text)
}

/// Cut `s` to at most `max` bytes without splitting a character.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

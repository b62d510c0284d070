//! Vision-model element location
//!
//! This crate asks a vision-capable language model where a UI element is in a
//! screenshot and converts the answer into absolute screen coordinates. It
//! only implements the protocol for talking to a model; the model itself sits
//! behind [`VisionChat`].
//!
//! The resolver in `element-resolver` re-exports the types it needs from here.

pub mod backend;
pub mod locator;
pub mod prompt;
pub mod screenshot;
pub mod types;

pub use backend::{
    ChatMessage, ChatRole, HttpVisionChat, ImageAttachment, VisionBackendConfig, VisionChat,
};
pub use locator::{extract_json_block, parse_locate_reply, VisionFindResult, VisionLocator};
pub use screenshot::{ScreenshotResult, DEFAULT_MAX_DIMENSION};
pub use types::{percent_to_pixels, Coordinates, ScreenSize};

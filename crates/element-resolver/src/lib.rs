//! Self-improving UI element resolution
//!
//! Resolves a named control ("post button", "search field") to tap
//! coordinates on an app whose identifiers, text and layout drift between
//! releases. Resolution falls back from the caller's exact selector, to
//! selectors remembered from earlier runs, to a vision model, and every
//! outcome adjusts the confidence of the selectors involved.
//!
//! ```ignore
//! let memory = Arc::new(SelectorMemory::open(Arc::new(JsonFileStore::new(path))).await);
//! let vision = Arc::new(VisionLocator::new(Arc::new(HttpVisionChat::from_env()?)));
//! let resolver = ElementResolver::new(finder, memory).with_vision(vision);
//!
//! let result = resolver
//!     .find_element("com.social", "post button", &Selector::parse("id:btn_post")?)
//!     .await;
//! ```

pub mod config;
pub mod errors;
pub mod finder;
pub mod mapping;
pub mod memory;
pub mod resolver;
pub mod selector;
pub mod storage;
pub mod utils;

pub use config::ResolverConfig;
pub use errors::{ResolverError, Result};
pub use finder::{find_with_selector, StandardFinder};
pub use mapping::ElementMapping;
pub use memory::{MemoryStats, SelectorMemory};
pub use resolver::{ElementResolver, FindMethod, FindResult};
pub use selector::{Selector, SelectorKind, FAILURE_PENALTY, SUCCESS_BOOST};
pub use storage::{InMemoryStore, JsonFileStore, MappingStore};
pub use utils::normalize_key;

// Re-export types from element-vision crate
pub use element_vision::{
    Coordinates, HttpVisionChat, ScreenSize, ScreenshotResult, VisionChat, VisionFindResult,
    VisionLocator,
};

use crate::selector::{Selector, SelectorKind};
use async_trait::async_trait;
use element_vision::{Coordinates, ScreenSize, ScreenshotResult};
use tracing::debug;

/// Device access supplied by the caller.
///
/// The resolver never talks to a device itself. Implementations wrap whatever
/// queries the live UI hierarchy and captures the screen; each method is
/// awaited as-is, so any timeout belongs in the implementation.
#[async_trait]
pub trait StandardFinder: Send + Sync {
    async fn find_by_resource_id(&self, id: &str) -> Option<Coordinates>;

    async fn find_by_text(&self, text: &str) -> Option<Coordinates>;

    async fn find_by_content_desc(&self, desc: &str) -> Option<Coordinates>;

    /// Current screen contents, if a capture is possible right now.
    async fn get_screenshot(&self) -> Option<ScreenshotResult>;

    async fn get_screen_size(&self) -> ScreenSize;
}

/// Run `selector` against the finder.
///
/// Only [queryable](SelectorKind::is_queryable) kinds reach the finder; the
/// resolver filters the rest out before calling this, and they miss here.
pub async fn find_with_selector(
    finder: &dyn StandardFinder,
    selector: &Selector,
) -> Option<Coordinates> {
    match selector.kind {
        SelectorKind::ResourceId => finder.find_by_resource_id(&selector.value).await,
        SelectorKind::Text => finder.find_by_text(&selector.value).await,
        SelectorKind::ContentDesc => finder.find_by_content_desc(&selector.value).await,
        SelectorKind::Xpath | SelectorKind::Coordinates | SelectorKind::Visual => {
            debug!("[resolver] {} selectors cannot be queried directly", selector.kind);
            None
        }
    }
}

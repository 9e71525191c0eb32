use crate::{AutomationError, Selector, UIElement};

/// The common trait that every surface backend must implement
///
/// A surface is a live view whose contents change after each action. Nothing
/// returned from it should be cached across an action boundary.
#[async_trait::async_trait]
pub trait Surface: Send + Sync {
    /// Find all elements currently matching a selector, in document order.
    /// An empty result is not an error.
    async fn find_all(&self, selector: &Selector) -> Result<Vec<UIElement>, AutomationError>;

    /// Walk up from `element` (starting at its parent) at most `max_depth`
    /// levels and return the nearest ancestor that carries `attribute`.
    async fn find_nearest_ancestor_with_attribute(
        &self,
        element: &UIElement,
        attribute: &str,
        max_depth: usize,
    ) -> Result<Option<UIElement>, AutomationError>;

    /// Send the dismiss key (Escape) to whatever currently has focus
    async fn send_cancel_key(&self) -> Result<(), AutomationError>;
}

#[cfg(feature = "chrome")]
pub mod chrome;

/// Wrap a Chrome page as a surface
#[cfg(feature = "chrome")]
pub fn create_surface(page: chromiumoxide::Page) -> std::sync::Arc<dyn Surface> {
    std::sync::Arc::new(chrome::ChromeSurface::new(page))
}

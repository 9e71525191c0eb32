use crate::errors::AutomationError;
use std::fmt::Debug;
use tracing::{debug, instrument};

/// Interface for surface-specific element implementations
///
/// A handle is only meaningful for the render it was resolved from. Once the
/// surface re-renders, `is_attached` starts returning `false` and every other
/// call may fail with `ElementDetached`.
#[async_trait::async_trait]
pub trait UIElementImpl: Send + Sync + Debug {
    async fn is_visible(&self) -> Result<bool, AutomationError>;
    async fn is_enabled(&self) -> Result<bool, AutomationError>;
    /// Whether the element is still part of the current render
    async fn is_attached(&self) -> Result<bool, AutomationError>;
    async fn scroll_into_view(&self) -> Result<(), AutomationError>;
    async fn click(&self) -> Result<(), AutomationError>;
    /// Dispatches a click from inside the page, bypassing hit-testing
    async fn click_synthetic(&self) -> Result<(), AutomationError>;
    async fn attribute(&self, name: &str) -> Result<Option<String>, AutomationError>;
    async fn value(&self) -> Result<String, AutomationError>;
    async fn set_value(&self, value: &str) -> Result<(), AutomationError>;
    /// Emits input and change events so reactive bindings observe a new value
    async fn dispatch_change_notifications(&self) -> Result<(), AutomationError>;

    fn as_any(&self) -> &dyn std::any::Any;

    // Add a method to clone the box
    fn clone_box(&self) -> Box<dyn UIElementImpl>;
}

/// Represents one element on the surface
#[derive(Debug)]
pub struct UIElement {
    inner: Box<dyn UIElementImpl>,
}

impl UIElement {
    /// Create a new UI element from a surface-specific implementation
    pub fn new(impl_: Box<dyn UIElementImpl>) -> Self {
        Self { inner: impl_ }
    }

    /// Check if element is visible
    pub async fn is_visible(&self) -> Result<bool, AutomationError> {
        self.inner.is_visible().await
    }

    /// Check if element is enabled
    pub async fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.inner.is_enabled().await
    }

    /// Visible and enabled. Probe failures count as "no".
    pub async fn is_actionable(&self) -> bool {
        matches!(self.is_visible().await, Ok(true)) && matches!(self.is_enabled().await, Ok(true))
    }

    /// Check if element is still part of the current render.
    /// A failing probe means the handle is gone.
    pub async fn is_attached(&self) -> bool {
        self.inner.is_attached().await.unwrap_or(false)
    }

    pub async fn scroll_into_view(&self) -> Result<(), AutomationError> {
        self.inner.scroll_into_view().await
    }

    /// Click on this element
    #[instrument(level = "debug", skip(self))]
    pub async fn click(&self) -> Result<(), AutomationError> {
        self.inner.click().await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn click_synthetic(&self) -> Result<(), AutomationError> {
        self.inner.click_synthetic().await
    }

    /// Scroll into view and click; if the native click fails (for example
    /// because an overlay intercepts it) fall back to a synthetic click.
    #[instrument(level = "debug", skip(self))]
    pub async fn click_with_fallback(&self) -> Result<(), AutomationError> {
        self.scroll_into_view().await?;
        if let Err(e) = self.click().await {
            debug!("native click failed ({e}), falling back to synthetic click");
            self.click_synthetic().await?;
        }
        Ok(())
    }

    pub async fn attribute(&self, name: &str) -> Result<Option<String>, AutomationError> {
        self.inner.attribute(name).await
    }

    /// Get the displayed value of this element
    pub async fn value(&self) -> Result<String, AutomationError> {
        self.inner.value().await
    }

    /// Set value of this element
    pub async fn set_value(&self, value: &str) -> Result<(), AutomationError> {
        self.inner.set_value(value).await
    }

    pub async fn dispatch_change_notifications(&self) -> Result<(), AutomationError> {
        self.inner.dispatch_change_notifications().await
    }

    /// Get the underlying implementation as a specific type
    pub(crate) fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }
}

impl Clone for UIElement {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}

use tracing::{debug, instrument};

use crate::element::UIElement;
use crate::errors::AutomationError;
use crate::platforms::Surface;
use crate::selector::Selector;
use crate::wait::WaitPolicy;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

/// A high-level API for finding and waiting on surface elements
///
/// A locator never holds on to an element: every call re-queries the surface,
/// so it stays valid across re-renders.
#[derive(Clone)]
pub struct Locator {
    surface: Arc<dyn Surface>,
    selector: Selector,
    wait: WaitPolicy, // Default timeout and poll interval for this locator instance
}

impl Locator {
    /// Create a new locator with the given selector
    pub fn new(surface: Arc<dyn Surface>, selector: impl Into<Selector>) -> Self {
        Self {
            surface,
            selector: selector.into(),
            wait: WaitPolicy::default(),
        }
    }

    pub fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// All elements currently matching this locator, without waiting.
    pub async fn all(&self) -> Result<Vec<UIElement>, AutomationError> {
        self.surface.find_all(&self.selector).await
    }

    /// Elements currently matching this locator that are visible and enabled.
    pub async fn actionable(&self) -> Result<Vec<UIElement>, AutomationError> {
        let mut actionable = Vec::new();
        for element in self.all().await? {
            if element.is_actionable().await {
                actionable.push(element);
            }
        }
        Ok(actionable)
    }

    /// The first element currently matching this locator, without waiting.
    pub async fn first(&self) -> Result<UIElement, AutomationError> {
        self.all().await?.into_iter().next().ok_or_else(|| {
            AutomationError::ElementNotFound(format!("No element matches {}", self.selector))
        })
    }

    /// Wait for a visible element matching the locator, up to the specified timeout.
    /// If no timeout is provided, uses the locator's default timeout.
    #[instrument(level = "debug", skip(self, timeout))]
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<UIElement, AutomationError> {
        self.wait_for(timeout, false).await
    }

    /// Wait for an element that is both visible and enabled.
    #[instrument(level = "debug", skip(self, timeout))]
    pub async fn wait_actionable(
        &self,
        timeout: Option<Duration>,
    ) -> Result<UIElement, AutomationError> {
        self.wait_for(timeout, true).await
    }

    /// On timeout the error says how far the best candidate got: nothing
    /// matched (`Timeout`), only hidden matches (`ElementNotVisible`), or
    /// visible but disabled matches (`ElementNotEnabled`).
    async fn wait_for(
        &self,
        timeout: Option<Duration>,
        require_enabled: bool,
    ) -> Result<UIElement, AutomationError> {
        debug!("Waiting for element matching selector: {}", self.selector);
        let policy = self.policy(timeout);
        let slot: OnceLock<UIElement> = OnceLock::new();
        let blocker = Mutex::new(Blocker::NoMatch);
        let slot_ref = &slot;
        let blocker_ref = &blocker;
        let surface = &self.surface;
        let selector = &self.selector;

        let found = policy
            .until(|| async move {
                // Query failures are transient while the surface re-renders
                let Ok(candidates) = surface.find_all(selector).await else {
                    return false;
                };
                let mut seen = Blocker::NoMatch;
                for candidate in candidates {
                    if !matches!(candidate.is_visible().await, Ok(true)) {
                        seen = seen.max(Blocker::Hidden);
                        continue;
                    }
                    if require_enabled && !matches!(candidate.is_enabled().await, Ok(true)) {
                        seen = Blocker::Disabled;
                        continue;
                    }
                    let _ = slot_ref.set(candidate);
                    return true;
                }
                if let Ok(mut blocker) = blocker_ref.lock() {
                    *blocker = seen;
                }
                false
            })
            .await;

        if let Some(element) = slot.into_inner().filter(|_| found) {
            return Ok(element);
        }
        let blocker = blocker.into_inner().unwrap_or(Blocker::NoMatch);
        let message = format!(
            "Timed out after {:?} waiting for element {}",
            policy.timeout, self.selector
        );
        Err(match blocker {
            Blocker::NoMatch => AutomationError::Timeout(message),
            Blocker::Hidden => AutomationError::ElementNotVisible(message),
            Blocker::Disabled => AutomationError::ElementNotEnabled(message),
        })
    }

    fn policy(&self, timeout: Option<Duration>) -> WaitPolicy {
        WaitPolicy {
            timeout: timeout.unwrap_or(self.wait.timeout),
            poll_interval: self.wait.poll_interval,
        }
    }
}

/// Why the last poll of a wait found nothing usable, in increasing order of progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Blocker {
    NoMatch,
    Hidden,
    Disabled,
}

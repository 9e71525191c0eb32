//! Puts the listing into a known order before processing.
//!
//! Sorting is advisory: nothing here returns an error. If the header cannot be
//! found, exposes no direction attribute, or never reaches the requested
//! direction, the processor simply works in whatever order the surface shows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::element::UIElement;
use crate::locator::Locator;
use crate::platforms::Surface;
use crate::selector::Selector;
use crate::wait::WaitPolicy;

/// Reported sort direction of a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortState {
    /// No direction attribute present
    Unknown,
    Ascending,
    Descending,
    /// Any other attribute value, e.g. `none`
    Other(String),
}

impl SortState {
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => SortState::Unknown,
            Some(v) if v.eq_ignore_ascii_case("ascending") => SortState::Ascending,
            Some(v) if v.eq_ignore_ascii_case("descending") => SortState::Descending,
            Some(v) => SortState::Other(v.to_string()),
        }
    }
}

impl fmt::Display for SortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortState::Unknown => write!(f, "unknown"),
            SortState::Ascending => write!(f, "ascending"),
            SortState::Descending => write!(f, "descending"),
            SortState::Other(v) => write!(f, "{v}"),
        }
    }
}

/// Direction the normalizer should reach
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn matches(&self, state: &SortState) -> bool {
        matches!(
            (self, state),
            (SortDirection::Ascending, SortState::Ascending)
                | (SortDirection::Descending, SortState::Descending)
        )
    }
}

#[derive(Debug, Clone)]
pub struct SortConfig {
    /// The visible column title
    pub header_selector: Selector,
    /// Attribute carrying the direction, looked up on the header's ancestors
    pub attribute: String,
    pub direction: SortDirection,
    pub max_toggles: usize,
    pub max_ancestor_depth: usize,
    /// Toggles to issue when no direction attribute is exposed
    pub blind_toggles: usize,
    pub toggle_settle: Duration,
    pub blind_settle: Duration,
    pub wait: WaitPolicy,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            header_selector: Selector::from(
                "//span[contains(@class,'th-title-content') and normalize-space()='Available quantity']",
            ),
            attribute: "aria-sort".to_string(),
            direction: SortDirection::Ascending,
            max_toggles: 4,
            max_ancestor_depth: 6,
            blind_toggles: 2,
            toggle_settle: Duration::from_millis(600),
            blind_settle: Duration::from_millis(800),
            wait: WaitPolicy::default(),
        }
    }
}

/// What the normalizer ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    AlreadySorted,
    Reached { toggles: usize },
    /// Toggle budget spent; `state` is what the column reports now
    Exhausted { toggles: usize, state: SortState },
    /// No direction attribute; header clicked without feedback
    BlindToggled { toggles: usize },
    HeaderMissing,
}

pub struct SortNormalizer {
    surface: Arc<dyn Surface>,
    config: SortConfig,
}

impl SortNormalizer {
    pub fn new(surface: Arc<dyn Surface>, config: SortConfig) -> Self {
        Self { surface, config }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn normalize(&self) -> SortOutcome {
        let header = Locator::new(self.surface.clone(), self.config.header_selector.clone())
            .with_wait_policy(self.config.wait);

        if let Err(e) = header.wait(None).await {
            warn!("Sort header not found ({e}); keeping surface order");
            return SortOutcome::HeaderMissing;
        }

        let Some(mut container) = self.find_sort_container(&header).await else {
            info!(
                "No {} found on sort header; using fallback clicks",
                self.config.attribute
            );
            return self.blind_toggle(&header).await;
        };

        let attribute = self.config.attribute.as_str();
        let mut toggles = 0;

        for attempt in 1..=self.config.max_toggles {
            let before = read_attribute(&container, attribute).await;
            let state = SortState::from_attribute(before.as_deref());
            if self.config.direction.matches(&state) {
                info!(%state, "Column already sorted as requested");
                return if toggles == 0 {
                    SortOutcome::AlreadySorted
                } else {
                    SortOutcome::Reached { toggles }
                };
            }

            info!(attempt, current = %state, "Clicking sort header");
            if let Err(e) = container.click_with_fallback().await {
                warn!(attempt, "Sort header click failed: {e}");
            }
            toggles += 1;
            sleep(self.config.toggle_settle).await;

            let header_ref = &header;
            let container_ref = &container;
            let before_ref = &before;
            let changed = self
                .config
                .wait
                .until(|| async move {
                    let current = self.find_sort_container(header_ref).await;
                    let current = current.as_ref().unwrap_or(container_ref);
                    read_attribute(current, attribute).await != *before_ref
                })
                .await;
            if !changed {
                debug!(attempt, "Sort direction did not change within timeout");
            }

            // The header cell is often re-rendered by the sort itself
            if let Some(fresh) = self.find_sort_container(&header).await {
                container = fresh;
            }
        }

        let last = read_attribute(&container, attribute).await;
        let state = SortState::from_attribute(last.as_deref());
        if self.config.direction.matches(&state) {
            SortOutcome::Reached { toggles }
        } else {
            warn!(
                %state,
                "Reached max clicks; proceeding with whatever sort direction is currently set"
            );
            SortOutcome::Exhausted { toggles, state }
        }
    }

    async fn find_sort_container(&self, header: &Locator) -> Option<UIElement> {
        let header = header.first().await.ok()?;
        self.surface
            .find_nearest_ancestor_with_attribute(
                &header,
                &self.config.attribute,
                self.config.max_ancestor_depth,
            )
            .await
            .ok()
            .flatten()
    }

    async fn blind_toggle(&self, header: &Locator) -> SortOutcome {
        let mut toggles = 0;
        for attempt in 1..=self.config.blind_toggles {
            match header.wait_actionable(None).await {
                Ok(element) => {
                    if let Err(e) = element.click_with_fallback().await {
                        warn!(attempt, "Sort header click failed: {e}");
                    }
                    toggles += 1;
                }
                Err(e) => {
                    warn!(attempt, "Sort header not clickable: {e}");
                    break;
                }
            }
            sleep(self.config.blind_settle).await;
        }
        SortOutcome::BlindToggled { toggles }
    }
}

async fn read_attribute(element: &UIElement, attribute: &str) -> Option<String> {
    element.attribute(attribute).await.ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aria_sort_values() {
        assert_eq!(SortState::from_attribute(None), SortState::Unknown);
        assert_eq!(SortState::from_attribute(Some("")), SortState::Unknown);
        assert_eq!(SortState::from_attribute(Some("ascending")), SortState::Ascending);
        assert_eq!(SortState::from_attribute(Some("Descending")), SortState::Descending);
        assert_eq!(
            SortState::from_attribute(Some("none")),
            SortState::Other("none".to_string())
        );
    }

    #[test]
    fn direction_only_matches_its_own_state() {
        assert!(SortDirection::Ascending.matches(&SortState::Ascending));
        assert!(!SortDirection::Ascending.matches(&SortState::Descending));
        assert!(!SortDirection::Ascending.matches(&SortState::Unknown));
        assert!(SortDirection::Descending.matches(&SortState::Descending));
        assert!(!SortDirection::Descending.matches(&SortState::Other("other".to_string())));
    }
}

//! Sentinel restock sweep over a live, re-rendering web surface
//!
//! The crate normalizes the sort order of a listing, then repeatedly
//! discovers the first actionable row, opens its detail view, and sets a
//! field to a target value only if it currently holds the sentinel value.
//! Each row is handled in isolation; the run ends when nothing actionable is
//! left or the attempt budget is spent, and always yields a [`RunReport`].

use std::sync::Arc;
use tracing::{info, instrument};

pub mod config;
pub mod element;
pub mod errors;
pub mod locator;
pub mod platforms;
pub mod processor;
pub mod report;
pub mod selector;
pub mod sort;
#[cfg(test)]
mod tests;
pub mod wait;

pub use config::RunProfile;
pub use element::{UIElement, UIElementImpl};
pub use errors::AutomationError;
pub use locator::Locator;
pub use platforms::Surface;
pub use processor::{ActionProcessor, FieldState, ProcessorConfig};
pub use report::{ItemOutcome, RunReport};
pub use selector::Selector;
pub use sort::{SortConfig, SortDirection, SortNormalizer, SortOutcome, SortState};
pub use wait::{await_condition, WaitPolicy};

/// The main entry point: one surface, one sort pass, one processing run
pub struct Restocker {
    surface: Arc<dyn Surface>,
    sort: SortConfig,
    processor: ProcessorConfig,
}

impl Restocker {
    /// Build from a run profile, validating its selectors.
    pub fn new(surface: Arc<dyn Surface>, profile: &RunProfile) -> Result<Self, AutomationError> {
        Ok(Self::with_configs(
            surface,
            profile.sort_config()?,
            profile.processor_config()?,
        ))
    }

    pub fn with_configs(
        surface: Arc<dyn Surface>,
        sort: SortConfig,
        processor: ProcessorConfig,
    ) -> Self {
        Self {
            surface,
            sort,
            processor,
        }
    }

    /// Try to bring the listing into the configured order. Never fails.
    pub async fn normalize_sort(&self) -> SortOutcome {
        SortNormalizer::new(self.surface.clone(), self.sort.clone())
            .normalize()
            .await
    }

    pub async fn process(&self, max_items: usize, dry_run: bool) -> RunReport {
        ActionProcessor::new(self.surface.clone(), self.processor.clone())
            .process(max_items, dry_run)
            .await
    }

    /// Sort, then process.
    #[instrument(skip(self))]
    pub async fn run(&self, max_items: usize, dry_run: bool) -> RunReport {
        let sort = self.normalize_sort().await;
        info!(?sort, "Sort normalization finished");
        self.process(max_items, dry_run).await
    }
}

//! The discover → open → verify → mutate → confirm loop.
//!
//! Each pass re-queries the surface for trigger controls and always works on
//! the first one, because handling an item removes or re-renders its row.
//! Every pass produces exactly one [`ItemOutcome`]; errors and panics inside a
//! pass are turned into [`ItemOutcome::Failed`] and never end the run.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::element::UIElement;
use crate::errors::AutomationError;
use crate::locator::Locator;
use crate::platforms::Surface;
use crate::report::{ItemOutcome, RunReport};
use crate::selector::Selector;
use crate::wait::WaitPolicy;

/// The value of the target field when it was read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldState {
    /// Nothing rendered yet, treated like the sentinel
    Empty,
    Sentinel,
    NonSentinel(String),
}

impl FieldState {
    pub fn classify(raw: &str, sentinel: &str) -> Self {
        let value = raw.trim();
        if value.is_empty() {
            FieldState::Empty
        } else if value == sentinel {
            FieldState::Sentinel
        } else {
            FieldState::NonSentinel(value.to_string())
        }
    }

    pub fn authorizes_mutation(&self) -> bool {
        matches!(self, FieldState::Empty | FieldState::Sentinel)
    }
}

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Per-row trigger that opens the detail view
    pub action_selector: Selector,
    /// Editable field inside the detail view
    pub field_selector: Selector,
    /// Confirm control inside the detail view
    pub submit_selector: Selector,
    pub sentinel: String,
    pub target_value: String,
    pub wait: WaitPolicy,
    pub skip_settle: Duration,
    pub update_settle: Duration,
    pub failure_settle: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            action_selector: Selector::from(
                "//button[normalize-space()='Restock' and contains(@class,'primary-action__button')]",
            ),
            field_selector: Selector::from("input[name='members[0][availableQuantity]']"),
            submit_selector: Selector::from(
                "//button[@type='submit' and contains(@class,'btn--primary') and normalize-space()='Submit']",
            ),
            sentinel: "0".to_string(),
            target_value: "1".to_string(),
            wait: WaitPolicy::default(),
            skip_settle: Duration::from_millis(400),
            update_settle: Duration::from_millis(800),
            failure_settle: Duration::from_millis(600),
        }
    }
}

pub struct ActionProcessor {
    surface: Arc<dyn Surface>,
    config: ProcessorConfig,
}

impl ActionProcessor {
    pub fn new(surface: Arc<dyn Surface>, config: ProcessorConfig) -> Self {
        Self { surface, config }
    }

    /// Run the loop until no actionable item is left or `max_items` items
    /// have been attempted.
    #[instrument(level = "debug", skip(self))]
    pub async fn process(&self, max_items: usize, dry_run: bool) -> RunReport {
        let mut report = RunReport::new();

        while report.attempted() < max_items {
            let Some(item) = self.discover().await.into_iter().next() else {
                info!("No more actionable items found. Stopping.");
                break;
            };

            let attempt = report.attempted() + 1;
            info!(attempt, "Opening item");

            let outcome = match AssertUnwindSafe(self.process_item(attempt, item, dry_run))
                .catch_unwind()
                .await
            {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    warn!(attempt, error = %e, "Item failed");
                    self.recover().await;
                    ItemOutcome::Failed
                }
                Err(_) => {
                    warn!(attempt, "Item handling panicked");
                    self.recover().await;
                    ItemOutcome::Failed
                }
            };
            report.record(outcome);
        }

        debug!(?report, "Run finished");
        report
    }

    /// Visible and enabled trigger controls, in surface order. A failing
    /// query means the surface is mid-render and is read as "nothing found".
    async fn discover(&self) -> Vec<UIElement> {
        match self.locator(&self.config.action_selector).actionable().await {
            Ok(items) => items,
            Err(e) => {
                debug!("Discovery failed, treating as empty: {e}");
                Vec::new()
            }
        }
    }

    async fn process_item(
        &self,
        attempt: usize,
        item: UIElement,
        dry_run: bool,
    ) -> Result<ItemOutcome, AutomationError> {
        item.click_with_fallback().await?;

        let field_locator = self.locator(&self.config.field_selector);
        let field = field_locator.wait(None).await?;
        let raw = field.value().await?;
        let state = FieldState::classify(&raw, &self.config.sentinel);
        debug!(attempt, value = %raw.trim(), ?state, "Read field value");

        if !state.authorizes_mutation() {
            info!(attempt, "Field is not at the sentinel value; skipping");
            self.dismiss(self.config.skip_settle).await;
            return Ok(ItemOutcome::SkippedNonSentinel);
        }

        if dry_run {
            info!(
                attempt,
                target = %self.config.target_value,
                "Dry run: would set field and submit"
            );
            self.dismiss(self.config.skip_settle).await;
            return Ok(ItemOutcome::Previewed);
        }

        // The detail view may have re-rendered the field since it was read
        let field = field_locator.first().await?;
        field.set_value(&self.config.target_value).await?;
        field.dispatch_change_notifications().await?;

        let submit = self
            .locator(&self.config.submit_selector)
            .wait_actionable(None)
            .await?;
        info!(attempt, "Submitting");
        submit.click_with_fallback().await?;

        let submit_ref = &submit;
        let field_locator_ref = &field_locator;
        let closed = self
            .config
            .wait
            .until(|| async move {
                !submit_ref.is_attached().await
                    || matches!(field_locator_ref.all().await, Ok(found) if found.is_empty())
            })
            .await;
        if !closed {
            warn!(attempt, "Detail view did not close after submit; counting as updated");
        }

        info!(attempt, target = %self.config.target_value, "Updated");
        sleep(self.config.update_settle).await;
        Ok(ItemOutcome::Updated)
    }

    /// Close the detail view and let the surface settle.
    async fn dismiss(&self, settle: Duration) {
        if let Err(e) = self.surface.send_cancel_key().await {
            warn!("Failed to send cancel key: {e}");
        }
        sleep(settle).await;
    }

    /// Best-effort return to a clean surface after a failed item.
    async fn recover(&self) {
        if let Err(e) = self.surface.send_cancel_key().await {
            debug!("Cancel during recovery failed: {e}");
        }
        sleep(self.config.failure_settle).await;
    }

    fn locator(&self, selector: &Selector) -> Locator {
        Locator::new(self.surface.clone(), selector.clone()).with_wait_policy(self.config.wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_blank_authorize_mutation() {
        assert_eq!(FieldState::classify("0", "0"), FieldState::Sentinel);
        assert_eq!(FieldState::classify("  0 \n", "0"), FieldState::Sentinel);
        assert_eq!(FieldState::classify("", "0"), FieldState::Empty);
        assert_eq!(FieldState::classify("   ", "0"), FieldState::Empty);
        assert!(FieldState::Empty.authorizes_mutation());
        assert!(FieldState::Sentinel.authorizes_mutation());
    }

    #[test]
    fn anything_else_forbids_mutation() {
        let state = FieldState::classify(" 5 ", "0");
        assert_eq!(state, FieldState::NonSentinel("5".to_string()));
        assert!(!state.authorizes_mutation());
        assert!(!FieldState::classify("00", "0").authorizes_mutation());
    }

    #[test]
    fn default_config_targets_restock_dialog() {
        let config = ProcessorConfig::default();
        assert!(matches!(config.action_selector, Selector::XPath(_)));
        assert!(matches!(config.field_selector, Selector::Css(_)));
        assert_eq!(config.sentinel, "0");
        assert_eq!(config.target_value, "1");
        assert_eq!(config.wait.timeout, Duration::from_secs(30));
    }
}

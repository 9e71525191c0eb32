//! Run profiles: where to go, what to click, and how long to wait.
//!
//! A profile is plain data that can be written as YAML or JSON. Every field
//! has a default, so a profile file only needs to list what it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::AutomationError;
use crate::processor::ProcessorConfig;
use crate::selector::Selector;
use crate::sort::{SortConfig, SortDirection};
use crate::wait::WaitPolicy;

pub const DEFAULT_URL: &str = "https://www.ebay.com/sh/lst/active";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunProfile {
    /// Page listing the items to process
    pub url: String,
    /// Substrings of the current URL that indicate a sign-in redirect
    pub login_markers: Vec<String>,
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub items: ItemProfile,
    pub sort: SortProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemProfile {
    pub action_selector: String,
    pub field_selector: String,
    pub submit_selector: String,
    pub sentinel: String,
    pub target_value: String,
    pub skip_settle_ms: u64,
    pub update_settle_ms: u64,
    pub failure_settle_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortProfile {
    pub header_selector: String,
    pub attribute: String,
    pub direction: SortDirection,
    pub max_toggles: usize,
    pub max_ancestor_depth: usize,
    pub blind_toggles: usize,
    pub toggle_settle_ms: u64,
    pub blind_settle_ms: u64,
}

impl Default for RunProfile {
    fn default() -> Self {
        let wait = WaitPolicy::default();
        Self {
            url: DEFAULT_URL.to_string(),
            login_markers: vec!["signin".to_string(), "login".to_string()],
            timeout_ms: millis(wait.timeout),
            poll_interval_ms: millis(wait.poll_interval),
            items: ItemProfile::default(),
            sort: SortProfile::default(),
        }
    }
}

impl Default for ItemProfile {
    fn default() -> Self {
        let config = ProcessorConfig::default();
        Self {
            action_selector: config.action_selector.into(),
            field_selector: config.field_selector.into(),
            submit_selector: config.submit_selector.into(),
            sentinel: config.sentinel,
            target_value: config.target_value,
            skip_settle_ms: millis(config.skip_settle),
            update_settle_ms: millis(config.update_settle),
            failure_settle_ms: millis(config.failure_settle),
        }
    }
}

impl Default for SortProfile {
    fn default() -> Self {
        let config = SortConfig::default();
        Self {
            header_selector: config.header_selector.into(),
            attribute: config.attribute,
            direction: config.direction,
            max_toggles: config.max_toggles,
            max_ancestor_depth: config.max_ancestor_depth,
            blind_toggles: config.blind_toggles,
            toggle_settle_ms: millis(config.toggle_settle),
            blind_settle_ms: millis(config.blind_settle),
        }
    }
}

impl RunProfile {
    /// Load a profile from a `.yaml`/`.yml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AutomationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AutomationError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);
        match extension.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
                AutomationError::Config(format!("Invalid YAML in {}: {e}", path.display()))
            }),
            Some("json") => serde_json::from_str(&content).map_err(|e| {
                AutomationError::Config(format!("Invalid JSON in {}: {e}", path.display()))
            }),
            _ => Err(AutomationError::Config(format!(
                "Unsupported profile format: {} (expected .yaml, .yml or .json)",
                path.display()
            ))),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = millis(timeout);
        self
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::new(Duration::from_millis(self.timeout_ms))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
    }

    /// Whether `url` looks like a sign-in redirect
    pub fn is_login_url(&self, url: &str) -> bool {
        let url = url.to_lowercase();
        self.login_markers
            .iter()
            .any(|marker| !marker.is_empty() && url.contains(&marker.to_lowercase()))
    }

    pub fn processor_config(&self) -> Result<ProcessorConfig, AutomationError> {
        let items = &self.items;
        if items.sentinel.trim() == items.target_value.trim() {
            return Err(AutomationError::Config(format!(
                "Sentinel and target value are both {:?}",
                items.sentinel
            )));
        }
        Ok(ProcessorConfig {
            action_selector: parse_selector(&items.action_selector)?,
            field_selector: parse_selector(&items.field_selector)?,
            submit_selector: parse_selector(&items.submit_selector)?,
            sentinel: items.sentinel.trim().to_string(),
            target_value: items.target_value.clone(),
            wait: self.wait_policy(),
            skip_settle: Duration::from_millis(items.skip_settle_ms),
            update_settle: Duration::from_millis(items.update_settle_ms),
            failure_settle: Duration::from_millis(items.failure_settle_ms),
        })
    }

    pub fn sort_config(&self) -> Result<SortConfig, AutomationError> {
        let sort = &self.sort;
        if sort.attribute.trim().is_empty() {
            return Err(AutomationError::Config(
                "Sort attribute must not be empty".to_string(),
            ));
        }
        Ok(SortConfig {
            header_selector: parse_selector(&sort.header_selector)?,
            attribute: sort.attribute.trim().to_string(),
            direction: sort.direction,
            max_toggles: sort.max_toggles,
            max_ancestor_depth: sort.max_ancestor_depth,
            blind_toggles: sort.blind_toggles,
            toggle_settle: Duration::from_millis(sort.toggle_settle_ms),
            blind_settle: Duration::from_millis(sort.blind_settle_ms),
            wait: self.wait_policy(),
        })
    }
}

fn parse_selector(raw: &str) -> Result<Selector, AutomationError> {
    Selector::from(raw).validate()
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

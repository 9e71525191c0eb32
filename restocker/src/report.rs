//! Outcome tally for one processing run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to one discovered item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    /// The field held the sentinel (or was empty) and the target value was submitted
    Updated,
    /// The field held some other value and was left untouched
    SkippedNonSentinel,
    /// Dry run: the item would have been updated
    Previewed,
    /// Something went wrong while handling the item
    Failed,
}

/// Counts of item outcomes for a run
///
/// Every attempt is recorded together with its outcome, so
/// `attempted == updated + skipped_non_sentinel + previewed + failed` holds
/// whenever the report can be observed. `previewed` is only ever non-zero
/// for dry runs.
///
/// A dry-run report does not satisfy the three-way sum
/// `attempted == updated + skipped_non_sentinel + failed`: previewed items
/// are attempted but belong to none of those buckets. Use
/// [`RunReport::is_consistent`], which includes `previewed`, for any report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    attempted: usize,
    updated: usize,
    skipped_non_sentinel: usize,
    previewed: usize,
    failed: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, outcome: ItemOutcome) {
        self.attempted += 1;
        match outcome {
            ItemOutcome::Updated => self.updated += 1,
            ItemOutcome::SkippedNonSentinel => self.skipped_non_sentinel += 1,
            ItemOutcome::Previewed => self.previewed += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn updated(&self) -> usize {
        self.updated
    }

    pub fn skipped_non_sentinel(&self) -> usize {
        self.skipped_non_sentinel
    }

    pub fn previewed(&self) -> usize {
        self.previewed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn is_consistent(&self) -> bool {
        self.attempted == self.updated + self.skipped_non_sentinel + self.previewed + self.failed
    }
}

impl FromIterator<ItemOutcome> for RunReport {
    fn from_iter<I: IntoIterator<Item = ItemOutcome>>(iter: I) -> Self {
        let mut report = RunReport::new();
        for outcome in iter {
            report.record(outcome);
        }
        report
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary of restocking:")?;
        writeln!(f, "  Attempted:              {}", self.attempted)?;
        writeln!(f, "  Updated:                {}", self.updated)?;
        writeln!(f, "  Skipped (not sentinel): {}", self.skipped_non_sentinel)?;
        if self.previewed > 0 {
            writeln!(f, "  Previewed (dry run):    {}", self.previewed)?;
        }
        write!(f, "  Failed:                 {}", self.failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_record_counts_one_attempt() {
        let report: RunReport = [
            ItemOutcome::Updated,
            ItemOutcome::SkippedNonSentinel,
            ItemOutcome::Failed,
            ItemOutcome::Updated,
        ]
        .into_iter()
        .collect();

        assert_eq!(report.attempted(), 4);
        assert_eq!(report.updated(), 2);
        assert_eq!(report.skipped_non_sentinel(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.previewed(), 0);
        assert!(report.is_consistent());
    }

    #[test]
    fn previews_only_balance_with_the_previewed_count() {
        let report: RunReport = [
            ItemOutcome::Previewed,
            ItemOutcome::SkippedNonSentinel,
            ItemOutcome::Previewed,
        ]
        .into_iter()
        .collect();

        let three_way = report.updated() + report.skipped_non_sentinel() + report.failed();
        assert_eq!(report.attempted(), 3);
        assert_eq!(three_way, 1);
        assert_eq!(three_way + report.previewed(), report.attempted());
        assert!(report.is_consistent());
    }

    #[test]
    fn empty_report_is_consistent() {
        let report = RunReport::new();
        assert_eq!(report.attempted(), 0);
        assert!(report.is_consistent());
    }

    #[test]
    fn summary_lists_every_count() {
        let report: RunReport = [ItemOutcome::Updated, ItemOutcome::Failed]
            .into_iter()
            .collect();
        let text = report.to_string();
        assert!(text.contains("Attempted:              2"));
        assert!(text.contains("Updated:                1"));
        assert!(text.contains("Skipped (not sentinel): 0"));
        assert!(text.contains("Failed:                 1"));
        assert!(!text.contains("Previewed"));
    }

    #[test]
    fn summary_mentions_previews_only_for_dry_runs() {
        let report: RunReport = [ItemOutcome::Previewed].into_iter().collect();
        assert!(report.to_string().contains("Previewed (dry run):    1"));
    }

    #[test]
    fn serializes_as_flat_counts() {
        let report: RunReport = [ItemOutcome::SkippedNonSentinel].into_iter().collect();
        let value = serde_json::to_value(report).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "attempted": 1,
                "updated": 0,
                "skipped_non_sentinel": 1,
                "previewed": 0,
                "failed": 0
            })
        );
    }
}

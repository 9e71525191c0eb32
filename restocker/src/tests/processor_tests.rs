use super::init_tracing;
use super::mock_surface::{processor_config, sort_config, Commit, MockSurface, Removal};
use crate::{ActionProcessor, ProcessorConfig, Restocker, RunReport, Selector, SortOutcome};

async fn run(mock: &MockSurface, max_items: usize, dry_run: bool) -> RunReport {
    init_tracing();
    let report = ActionProcessor::new(mock.surface(), processor_config())
        .process(max_items, dry_run)
        .await;
    assert!(report.is_consistent(), "counts do not add up: {report:?}");
    report
}

#[tokio::test(start_paused = true)]
async fn mixed_rows_update_sentinels_and_skip_the_rest() {
    let mock = MockSurface::with_rows(&["0", "5", ""]).removal(Removal::OnOpen);

    let report = run(&mock, 10, false).await;

    assert_eq!(report.attempted(), 3);
    assert_eq!(report.updated(), 2);
    assert_eq!(report.skipped_non_sentinel(), 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(
        mock.commits(),
        vec![
            Commit {
                row: 0,
                value: "1".to_string(),
                notified: true
            },
            Commit {
                row: 2,
                value: "1".to_string(),
                notified: true
            },
        ]
    );
    assert_eq!(mock.counters().cancels, 1);
}

#[tokio::test(start_paused = true)]
async fn dialog_that_never_closes_still_counts_as_updated() {
    let mock = MockSurface::with_rows(&["0"]).dialog_stays_open();

    let report = run(&mock, 10, false).await;

    assert_eq!(report.attempted(), 1);
    assert_eq!(report.updated(), 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(mock.counters().submits, 1);
}

#[tokio::test(start_paused = true)]
async fn mutation_fault_fails_the_item_and_dismisses() {
    let mock = MockSurface::with_rows(&["0"]).failing_set_value();

    let report = run(&mock, 1, false).await;

    assert_eq!(report.attempted(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.updated(), 0);
    assert_eq!(mock.counters().cancels, 1);
    assert_eq!(mock.counters().submits, 0);
    assert_eq!(mock.row_values(), vec!["0".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn repeated_failures_stop_at_the_attempt_bound() {
    let mock = MockSurface::with_rows(&["0"]).failing_set_value();

    let report = run(&mock, 5, false).await;

    assert_eq!(report.attempted(), 5);
    assert_eq!(report.failed(), 5);
    assert_eq!(mock.counters().cancels, 5);
}

#[tokio::test(start_paused = true)]
async fn empty_surface_ends_immediately() {
    let mock = MockSurface::with_rows(&[]);

    let report = run(&mock, 200, false).await;

    assert_eq!(report, RunReport::new());
    assert_eq!(mock.counters().clicks, 0);
}

#[tokio::test(start_paused = true)]
async fn failing_discovery_reads_as_nothing_left() {
    let mock = MockSurface::with_rows(&["0", "0"]).failing_discovery();

    let report = run(&mock, 200, false).await;

    assert_eq!(report.attempted(), 0);
    assert_eq!(mock.counters().clicks, 0);
}

#[tokio::test(start_paused = true)]
async fn non_sentinel_rows_are_never_written() {
    // The row stays in the listing, so every pass opens it again
    let mock = MockSurface::with_rows(&["7"]);

    let report = run(&mock, 4, false).await;

    assert_eq!(report.attempted(), 4);
    assert_eq!(report.skipped_non_sentinel(), 4);
    assert_eq!(mock.counters().set_value_calls, 0);
    assert_eq!(mock.counters().submits, 0);
    assert_eq!(mock.row_values(), vec!["7".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn dry_run_previews_without_mutating() {
    let mock = MockSurface::with_rows(&["0", "", "4", "0"]).removal(Removal::OnOpen);

    let report = run(&mock, 10, true).await;

    assert_eq!(report.attempted(), 4);
    assert_eq!(report.updated(), 0);
    assert_eq!(report.previewed(), 3);
    // Previewed items close the tally; the three-way sum alone does not
    assert_ne!(
        report.updated() + report.skipped_non_sentinel() + report.failed(),
        report.attempted()
    );
    assert_eq!(report.skipped_non_sentinel(), 1);
    assert_eq!(mock.counters().set_value_calls, 0);
    assert!(mock.commits().is_empty());
    assert_eq!(mock.counters().cancels, 4);
}

#[tokio::test(start_paused = true)]
async fn panicking_item_is_isolated() {
    let mock = MockSurface::with_rows(&["0"]).panicking_opens(1);

    let report = run(&mock, 5, false).await;

    assert_eq!(report.attempted(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.updated(), 1);
    assert_eq!(mock.commits().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn intercepted_click_falls_back_to_synthetic() {
    let mock = MockSurface::with_rows(&["0"]).obscured_buttons();

    let report = run(&mock, 10, false).await;

    assert_eq!(report.updated(), 1);
    assert_eq!(mock.counters().synthetic_clicks, 1);
}

#[tokio::test(start_paused = true)]
async fn restocker_sorts_then_processes() {
    init_tracing();
    let mock = MockSurface::with_rows(&["0", "3"])
        .removal(Removal::OnOpen)
        .with_sort(Some(2), &["descending", "ascending"]);

    let restocker = Restocker::with_configs(mock.surface(), sort_config(), processor_config());
    let report = restocker.run(10, false).await;

    assert_eq!(mock.counters().header_clicks, 1);
    assert_eq!(mock.sort_value().as_deref(), Some("ascending"));
    assert_eq!(report.updated(), 1);
    assert_eq!(report.skipped_non_sentinel(), 1);
    assert!(report.is_consistent());
}

#[tokio::test(start_paused = true)]
async fn missing_header_does_not_block_processing() {
    init_tracing();
    let mock = MockSurface::with_rows(&["0"]).without_header();

    let restocker = Restocker::with_configs(mock.surface(), sort_config(), processor_config());
    assert_eq!(restocker.normalize_sort().await, SortOutcome::HeaderMissing);

    let report = restocker.process(10, false).await;
    assert_eq!(report.updated(), 1);
}

#[tokio::test(start_paused = true)]
async fn field_that_never_appears_fails_the_item() {
    init_tracing();
    let mock = MockSurface::with_rows(&["0"]);
    let config = ProcessorConfig {
        field_selector: Selector::Css("input.missing".to_string()),
        ..processor_config()
    };

    let report = ActionProcessor::new(mock.surface(), config)
        .process(1, false)
        .await;

    assert_eq!(report.attempted(), 1);
    assert_eq!(report.failed(), 1);
    assert!(report.is_consistent());
    assert_eq!(mock.counters().cancels, 1);
    assert_eq!(mock.counters().set_value_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn field_is_looked_up_again_before_writing() {
    // The handle used for reading goes stale as soon as the value is read
    let mock = MockSurface::with_rows(&["0"]).regenerating_field();

    let report = run(&mock, 10, false).await;

    assert_eq!(report.updated(), 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(mock.counters().set_value_calls, 1);
    assert_eq!(
        mock.commits(),
        vec![Commit {
            row: 0,
            value: "1".to_string(),
            notified: true
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn disabled_submit_fails_the_item() {
    let mock = MockSurface::with_rows(&["0"]).disabled_submit();

    let report = run(&mock, 1, false).await;

    assert_eq!(report.failed(), 1);
    assert_eq!(mock.counters().submits, 0);
    assert_eq!(mock.counters().cancels, 1);
    assert!(mock.commits().is_empty());
}

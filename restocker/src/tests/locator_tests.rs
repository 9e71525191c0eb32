use super::init_tracing;
use super::mock_surface::{wait_policy, MockSurface, ACTION, SUBMIT};
use crate::{AutomationError, Locator, Selector};

fn locator(mock: &MockSurface, css: &str) -> Locator {
    Locator::new(mock.surface(), Selector::Css(css.to_string())).with_wait_policy(wait_policy())
}

#[tokio::test(start_paused = true)]
async fn nothing_matching_is_a_timeout() {
    init_tracing();
    let mock = MockSurface::with_rows(&[]);

    let err = locator(&mock, ACTION).wait(None).await.unwrap_err();
    assert!(matches!(err, AutomationError::Timeout(_)), "{err:?}");
}

#[tokio::test(start_paused = true)]
async fn disabled_match_is_reported_as_not_enabled() {
    init_tracing();
    let mock = MockSurface::with_rows(&["0"]).disabled_submit();
    locator(&mock, ACTION).first().await.unwrap().click().await.unwrap();

    let submit = locator(&mock, SUBMIT);
    assert!(submit.wait(None).await.is_ok());
    let err = submit.wait_actionable(None).await.unwrap_err();
    assert!(matches!(err, AutomationError::ElementNotEnabled(_)), "{err:?}");
}

#[tokio::test(start_paused = true)]
async fn first_does_not_wait() {
    init_tracing();
    let mock = MockSurface::with_rows(&["0"]);

    let err = locator(&mock, SUBMIT).first().await.unwrap_err();
    assert!(matches!(err, AutomationError::ElementNotFound(_)), "{err:?}");
}

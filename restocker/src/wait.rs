//! Bounded polling on the surface.
//!
//! Every "wait until X or give up" in the crate goes through
//! [`await_condition`]. A timeout is reported as `false`, never as an error;
//! the caller decides whether that is fatal.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Timeout and poll interval for one kind of wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WaitPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub async fn until<F, Fut>(&self, predicate: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        await_condition(self.timeout, self.poll_interval, predicate).await
    }
}

/// Polls `predicate` until it yields `true` or `timeout` elapses.
///
/// The predicate is evaluated at least once, even with a zero timeout.
pub async fn await_condition<F, Fut>(
    timeout: Duration,
    poll_interval: Duration,
    mut predicate: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if predicate().await {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep(poll_interval.min(deadline - now)).await;
    }
}

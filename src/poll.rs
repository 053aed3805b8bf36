//! Fixed-interval background polling.
//!
//! A [`PollHandle`] owns one spawned ticker. The first tick fires
//! immediately; missed ticks are skipped rather than bursted. Dropping or
//! stopping the handle aborts the task, including a tick in flight.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

pub struct PollHandle {
    name: &'static str,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Spawn a ticker calling `tick` every `period`.
    pub fn start<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        debug!(name, period_ms = period.as_millis(), "poller started");
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                tick().await;
            }
        });
        Self { name, task }
    }

    /// Abort the ticker.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
        debug!(name = self.name, "poller stopped");
    }
}

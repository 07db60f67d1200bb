//! Cancellable background tasks driven by timers.
//!
//! Every timer the terminal runs (the status poll, the countdown, the wake-up
//! at the start of voting) is a [`ScheduledTask`]. A task stops when it is
//! cancelled or dropped, so a view that owns its tasks cannot leak timers
//! past its own lifetime.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::{
    sync::Notify,
    task::JoinHandle,
    time::MissedTickBehavior,
};

/// Wakes a repeating task early.
#[derive(Debug, Clone, Default)]
pub(crate) struct Trigger(Arc<Notify>);

impl Trigger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run the task as soon as possible. Fires coalesce: several calls before
    /// the task gets to run result in a single extra run.
    pub(crate) fn fire(&self) {
        self.0.notify_one();
    }

    async fn fired(&self) {
        self.0.notified().await;
    }
}

#[derive(Debug)]
pub(crate) struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Run `task` immediately and then once every `period` until it returns
    /// [`ControlFlow::Break`] or the task is cancelled.
    pub(crate) fn repeating<F, Fut>(period: Duration, task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        Self::repeating_with_trigger(period, Trigger::new(), task)
    }

    /// Like [`ScheduledTask::repeating`], but woken early whenever `trigger`
    /// fires. An early run restarts the period.
    pub(crate) fn repeating_with_trigger<F, Fut>(period: Duration, trigger: Trigger, mut task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    () = trigger.fired() => {
                        interval.reset();
                    }
                }

                if task().await.is_break() {
                    break;
                }
            }
        });

        Self { handle }
    }

    /// Run `task` once at `run_at`. If `run_at` is not after `now`, it runs
    /// immediately.
    pub(crate) fn once_at<Fut>(run_at: OffsetDateTime, now: OffsetDateTime, task: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let sleep_duration = duration_until(run_at, now);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(sleep_duration).await;
            task.await;
        });

        Self { handle }
    }

    /// Stop the task. A run already in progress is aborted at its next await
    /// point.
    pub(crate) fn cancel(&self) {
        self.handle.abort();
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Time from `now` until `run_at`. An instant in the past gives zero.
fn duration_until(run_at: OffsetDateTime, now: OffsetDateTime) -> Duration {
    Duration::try_from(run_at - now).unwrap_or(Duration::ZERO)
}

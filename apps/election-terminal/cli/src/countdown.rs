//! Live countdown to a target instant.
//!
//! The time remaining is recomputed from the absolute target on every tick,
//! never by decrementing a counter, so a long countdown cannot drift from the
//! wall clock.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard};

use election_types::display::TimeRemaining;
use time::OffsetDateTime;

use crate::clock::SharedClock;
use crate::config::COUNTDOWN_TICK;
use crate::scheduled_task::ScheduledTask;

type OnTick = Box<dyn FnMut(TimeRemaining) + Send>;
type OnExpire = Box<dyn FnOnce() + Send>;

struct Callbacks {
    on_tick: OnTick,
    on_expire: OnExpire,
}

/// Callbacks are dropped once the countdown expires or is cancelled; every
/// invocation happens under this lock, which is what makes cancellation
/// final.
type SharedCallbacks = Arc<Mutex<Option<Callbacks>>>;

/// A running countdown. Dropping it cancels it.
pub(crate) struct Countdown {
    target: OffsetDateTime,
    callbacks: SharedCallbacks,
    task: ScheduledTask,
}

impl std::fmt::Debug for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Countdown")
            .field("target", &self.target)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Starts counting down to `target`.
///
/// `on_tick` receives the time remaining immediately and then once a second.
/// On the first tick at or past `target` it receives an ended
/// [`TimeRemaining`], `on_expire` runs, and the countdown stops for good.
///
/// The callbacks must not cancel or drop their own countdown.
pub(crate) fn start_countdown(
    target: OffsetDateTime,
    clock: SharedClock,
    on_tick: impl FnMut(TimeRemaining) + Send + 'static,
    on_expire: impl FnOnce() + Send + 'static,
) -> Countdown {
    let callbacks: SharedCallbacks = Arc::new(Mutex::new(Some(Callbacks {
        on_tick: Box::new(on_tick),
        on_expire: Box::new(on_expire),
    })));

    let task = ScheduledTask::repeating(COUNTDOWN_TICK, {
        let callbacks = Arc::clone(&callbacks);
        move || {
            let remaining = TimeRemaining::until(target, clock.now());
            std::future::ready(tick(&callbacks, remaining))
        }
    });

    Countdown {
        target,
        callbacks,
        task,
    }
}

fn lock(callbacks: &Mutex<Option<Callbacks>>) -> MutexGuard<'_, Option<Callbacks>> {
    // a panicking callback must not wedge cancellation
    callbacks
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn tick(callbacks: &Mutex<Option<Callbacks>>, remaining: TimeRemaining) -> ControlFlow<()> {
    let mut guard = lock(callbacks);
    let Some(current) = guard.as_mut() else {
        return ControlFlow::Break(());
    };

    let ended = remaining.ended;
    (current.on_tick)(remaining);
    if !ended {
        return ControlFlow::Continue(());
    }

    if let Some(Callbacks { on_expire, .. }) = guard.take() {
        on_expire();
    }
    ControlFlow::Break(())
}

impl Countdown {
    pub(crate) fn target(&self) -> OffsetDateTime {
        self.target
    }

    /// Whether callbacks may still fire.
    pub(crate) fn is_running(&self) -> bool {
        lock(&self.callbacks).is_some()
    }

    /// Stops the countdown. Once this returns no callback will fire again,
    /// even if a tick was running concurrently on another thread.
    pub(crate) fn cancel(&self) {
        let callbacks = lock(&self.callbacks).take();
        self.task.cancel();
        drop(callbacks);
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::TokioClock;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use time::macros::datetime;

    const ORIGIN: OffsetDateTime = datetime!(2025-03-01 05:00:00 UTC);

    #[derive(Default)]
    struct Recorder {
        ticks: Mutex<Vec<TimeRemaining>>,
        expirations: AtomicUsize,
        expired_at: Mutex<Option<OffsetDateTime>>,
    }

    impl Recorder {
        fn start(self: &Arc<Self>, target: OffsetDateTime, clock: SharedClock) -> Countdown {
            let ticks = Arc::clone(self);
            let expirations = Arc::clone(self);
            let expiry_clock = Arc::clone(&clock);
            start_countdown(
                target,
                clock,
                move |remaining| ticks.ticks.lock().unwrap().push(remaining),
                move || {
                    expirations.expirations.fetch_add(1, Ordering::SeqCst);
                    *expirations.expired_at.lock().unwrap() = Some(expiry_clock.now());
                },
            )
        }

        fn tick_seconds(&self) -> Vec<(bool, u64)> {
            self.ticks
                .lock()
                .unwrap()
                .iter()
                .map(|r| (r.ended, r.total_seconds))
                .collect()
        }

        fn expirations(&self) -> usize {
            self.expirations.load(Ordering::SeqCst)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_exactly_once() {
        let clock = TokioClock::starting_at(ORIGIN);
        let recorder = Arc::new(Recorder::default());
        let countdown = recorder.start(ORIGIN + time::Duration::seconds(2), clock);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(recorder.tick_seconds(), vec![(false, 2), (false, 1), (true, 0)]);
        assert_eq!(recorder.expirations(), 1);
        assert!(!countdown.is_running());

        // no further ticks after expiry
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(recorder.tick_seconds().len(), 3);
        assert_eq!(recorder.expirations(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_within_a_second_of_target() {
        let clock = TokioClock::starting_at(ORIGIN);
        let recorder = Arc::new(Recorder::default());
        let end_at = ORIGIN + time::Duration::milliseconds(2500);
        let _countdown = recorder.start(end_at, clock);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(recorder.expirations(), 1);
        let expired_at = recorder.expired_at.lock().unwrap().unwrap();
        assert!(expired_at >= end_at);
        assert!(expired_at - end_at <= time::Duration::SECOND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_in_the_past() {
        let clock = TokioClock::starting_at(ORIGIN);
        let recorder = Arc::new(Recorder::default());
        let _countdown = recorder.start(ORIGIN - time::Duration::minutes(5), clock);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(recorder.tick_seconds(), vec![(true, 0)]);
        assert_eq!(recorder.expirations(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_callbacks() {
        let clock = TokioClock::starting_at(ORIGIN);
        let recorder = Arc::new(Recorder::default());
        let countdown = recorder.start(ORIGIN + time::Duration::seconds(10), clock);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        countdown.cancel();
        assert!(!countdown.is_running());
        assert_eq!(recorder.tick_seconds().len(), 3);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(recorder.tick_seconds().len(), 3);
        assert_eq!(recorder.expirations(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let clock = TokioClock::starting_at(ORIGIN);
        let recorder = Arc::new(Recorder::default());
        let countdown = recorder.start(ORIGIN + time::Duration::seconds(3), clock);

        tokio::time::sleep(Duration::from_millis(500)).await;
        drop(countdown);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(recorder.tick_seconds().len(), 1);
        assert_eq!(recorder.expirations(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_is_final_under_contention() {
        let recorder = Arc::new(Recorder::default());
        let clock: SharedClock = Arc::new(crate::clock::SystemClock);
        let countdown = recorder.start(OffsetDateTime::now_utc() + time::Duration::hours(1), clock);

        tokio::time::sleep(Duration::from_millis(50)).await;
        countdown.cancel();
        let ticks = recorder.tick_seconds().len();
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(recorder.tick_seconds().len(), ticks);
    }

    #[test]
    fn test_tick_after_take_breaks() {
        let callbacks: Mutex<Option<Callbacks>> = Mutex::new(None);
        assert_eq!(
            tick(&callbacks, TimeRemaining::ended()),
            ControlFlow::Break(())
        );
    }
}

//! Live view of the election: polls the status, keeps the resolved phase and
//! the countdown current, and notifies subscribers of changes.
//!
//! The watcher owns every timer it starts. Dropping it (or calling
//! [`ElectionWatcher::shutdown`]) stops the poll, the countdown and any
//! pending wake-up.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use election_types::display::TimeRemaining;
use election_types::status::{ElectionId, ElectionStatus};
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::Instrument;

use crate::api::DynElectionApi;
use crate::cache::ResultCache;
use crate::clock::SharedClock;
use crate::countdown::{start_countdown, Countdown};
use crate::error::{Error, Result};
use crate::phase::{resolve, ResolvedPhase};
use crate::results::{validated_results, ValidatedResults};
use crate::scheduled_task::{ScheduledTask, Trigger};

/// What subscribers see after each applied status fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PhaseSnapshot {
    /// `None` until the first status has been fetched.
    pub(crate) phase: Option<ResolvedPhase>,
    pub(crate) status: Option<ElectionStatus>,
    /// Set when the most recent fetch failed, in which case the phase is the
    /// last one known, or when the service sent a status this client cannot
    /// interpret, in which case the phase is the no-election fallback.
    pub(crate) error: Option<String>,
}

#[derive(Debug)]
pub(crate) struct ElectionWatcher {
    inner: Arc<Inner>,
    poll: ScheduledTask,
}

struct Inner {
    api: DynElectionApi,
    cache: ResultCache,
    clock: SharedClock,
    phase_tx: watch::Sender<PhaseSnapshot>,
    remaining_tx: Arc<watch::Sender<Option<TimeRemaining>>>,
    /// Wakes the poll loop ahead of schedule.
    refresh: Trigger,
    /// Sequence number of the most recently issued status fetch.
    issued: AtomicU64,
    state: Mutex<State>,
}

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inner")
            .field("issued", &self.issued)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct State {
    /// Sequence number of the newest fetch applied so far. Responses to older
    /// fetches are discarded.
    applied: u64,
    /// Set by `shutdown`. A fetch that completes afterwards is dropped rather
    /// than starting new timers.
    stopped: bool,
    countdown: Option<Countdown>,
    start_timer: Option<(OffsetDateTime, ScheduledTask)>,
}

impl ElectionWatcher {
    /// Starts watching. The first status fetch happens immediately, then
    /// every `poll_interval`.
    pub(crate) fn start(
        api: DynElectionApi,
        cache: ResultCache,
        clock: SharedClock,
        poll_interval: Duration,
    ) -> Self {
        let (phase_tx, _) = watch::channel(PhaseSnapshot::default());
        let (remaining_tx, _) = watch::channel(None);
        let refresh = Trigger::new();

        let inner = Arc::new(Inner {
            api,
            cache,
            clock,
            phase_tx,
            remaining_tx: Arc::new(remaining_tx),
            refresh: refresh.clone(),
            issued: AtomicU64::new(0),
            state: Mutex::new(State::default()),
        });

        let poll = ScheduledTask::repeating_with_trigger(poll_interval, refresh, {
            let inner = Arc::clone(&inner);
            move || {
                let inner = Arc::clone(&inner);
                async move {
                    // failures are recorded in the snapshot; the next poll retries
                    let _ = inner.refresh().await;
                    ControlFlow::Continue(())
                }
                .instrument(tracing::debug_span!("status_poll"))
            }
        });

        Self { inner, poll }
    }

    pub(crate) fn subscribe_phase(&self) -> watch::Receiver<PhaseSnapshot> {
        self.inner.phase_tx.subscribe()
    }

    /// Time left until voting closes, updated every second while an election
    /// is active. `None` when there is nothing to count down to.
    pub(crate) fn subscribe_remaining(&self) -> watch::Receiver<Option<TimeRemaining>> {
        self.inner.remaining_tx.subscribe()
    }

    pub(crate) fn current_phase(&self) -> Option<ResolvedPhase> {
        self.inner.phase_tx.borrow().phase.clone()
    }

    /// Results for the election currently being watched.
    pub(crate) async fn get_validated_results(&self) -> ValidatedResults {
        let observed: Option<ElectionId> = self
            .current_phase()
            .and_then(|phase| phase.election_id().cloned());
        validated_results(
            self.inner.api.as_ref(),
            &self.inner.cache,
            observed.as_ref(),
            self.inner.clock.now(),
        )
        .await
    }

    /// Stops polling and all timers.
    pub(crate) fn shutdown(&self) {
        self.poll.cancel();
        let mut state = self.inner.lock_state();
        state.stopped = true;
        state.countdown = None;
        state.start_timer = None;
    }
}

impl Drop for ElectionWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Fetches the status and applies it. Returns `Ok(None)` when the
    /// response was discarded: a newer fetch finished first, or the watcher
    /// was shut down while it was in flight.
    async fn refresh(&self) -> Result<Option<ResolvedPhase>> {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let fetched = self.api.fetch_status().await;
        let now = self.clock.now();

        let mut state = self.lock_state();
        if state.stopped {
            tracing::debug!("discarding status response #{sequence}; watcher stopped");
            return Ok(None);
        }
        if sequence <= state.applied {
            tracing::debug!(
                "discarding status response #{sequence}; #{} already applied",
                state.applied
            );
            return Ok(None);
        }
        state.applied = sequence;

        match fetched {
            Ok(status) => Ok(Some(self.apply(&mut state, status, now))),
            Err(e) => {
                let error = Error::from(e);
                tracing::warn!("failed to fetch election status: {error}");
                let message = error.user_message().to_owned();
                self.phase_tx.send_if_modified(|snapshot| {
                    let changed = snapshot.error.as_deref() != Some(message.as_str());
                    snapshot.error = Some(message);
                    changed
                });
                Err(error)
            }
        }
    }

    fn apply(&self, state: &mut State, status: ElectionStatus, now: OffsetDateTime) -> ResolvedPhase {
        let resolved = resolve(&status, now);
        let error = match &resolved {
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("{e}; showing no election");
                Some(Error::from(e.clone()).user_message().to_owned())
            }
        };
        let phase = ResolvedPhase::or_no_election(resolved, &status);

        if phase.is_stale() {
            tracing::warn!(
                "election still reported active after its end time {:?}",
                phase.countdown_target()
            );
        }

        if let Some(election_id) = phase.election_id() {
            match self.cache.observe(election_id) {
                Ok(true) => tracing::info!("cleared results cached for a previous election"),
                Ok(false) => {}
                Err(e) => tracing::warn!("failed to record election {election_id}: {e}"),
            }
        }

        self.update_countdown(state, phase.countdown_target());
        self.update_start_timer(state, phase.opens_at(), now);

        let previous = self.phase_tx.borrow().phase.as_ref().map(ResolvedPhase::kind);
        if previous != Some(phase.kind()) {
            tracing::info!("election phase is now {}", phase.kind());
        }

        let snapshot = PhaseSnapshot {
            phase: Some(phase.clone()),
            status: Some(status),
            error,
        };
        self.phase_tx.send_if_modified(|current| {
            let changed = current.phase != snapshot.phase
                || current.status != snapshot.status
                || current.error != snapshot.error;
            *current = snapshot;
            changed
        });

        phase
    }

    /// Restarts the countdown only when the close of voting moves.
    fn update_countdown(&self, state: &mut State, target: Option<OffsetDateTime>) {
        if state.countdown.as_ref().map(Countdown::target) == target {
            return;
        }

        state.countdown = None;
        let Some(target) = target else {
            self.remaining_tx.send_replace(None);
            return;
        };

        tracing::debug!("counting down to {target}");
        let remaining_tx = Arc::clone(&self.remaining_tx);
        let refresh = self.refresh.clone();
        state.countdown = Some(start_countdown(
            target,
            Arc::clone(&self.clock),
            move |remaining| {
                remaining_tx.send_replace(Some(remaining));
            },
            move || {
                tracing::debug!("voting closed; refreshing status");
                refresh.fire();
            },
        ));
    }

    /// Wakes the poll when a pending election is due to open.
    fn update_start_timer(&self, state: &mut State, opens_at: Option<OffsetDateTime>, now: OffsetDateTime) {
        if state.start_timer.as_ref().map(|(at, _)| *at) == opens_at {
            return;
        }

        state.start_timer = opens_at.map(|opens_at| {
            let refresh = self.refresh.clone();
            let timer = ScheduledTask::once_at(opens_at, now, async move {
                tracing::debug!("voting due to open; refreshing status");
                refresh.fire();
            });
            (opens_at, timer)
        });
    }
}

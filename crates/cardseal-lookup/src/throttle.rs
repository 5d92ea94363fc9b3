//! Throttler for actions triggered on every keystroke.
//!
//! Runs the most recently submitted action at most once per `delay`. The
//! first action after a quiet period runs immediately if at least `delay`
//! has passed since the last run; otherwise it waits on a timer task until
//! that much time has passed. Actions superseded while waiting are dropped
//! without running.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

type Action = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct ThrottleState {
    /// Latest submitted action not yet run.
    pending: Option<Action>,
    /// When the previous action ran.
    last_fired: Option<Instant>,
    /// Timer task that will run `pending`.
    timer: Option<JoinHandle<()>>,
}

fn lock(state: &Mutex<ThrottleState>) -> MutexGuard<'_, ThrottleState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Rate-limits a stream of actions to one per `delay`.
///
/// Intended for a single logical caller (one input field). Dropping the
/// throttler cancels any pending action.
pub struct Throttler {
    delay: Duration,
    state: Arc<Mutex<ThrottleState>>,
}

impl std::fmt::Debug for Throttler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("Throttler")
            .field("delay", &self.delay)
            .field("pending", &state.pending.is_some())
            .finish_non_exhaustive()
    }
}

impl Throttler {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Arc::new(Mutex::new(ThrottleState::default())),
        }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Submit `action`, replacing any action still waiting.
    ///
    /// Runs `action` on the caller's stack when the throttler is idle and
    /// `delay` has elapsed since the last run.
    ///
    /// # Panics
    ///
    /// Panics if a timer is needed and no Tokio runtime is running.
    pub fn throttle<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let now = Instant::now();
        let mut state = lock(&self.state);

        if state.timer.is_some() {
            // Supersede; the armed timer runs whichever action is latest.
            state.pending = Some(Box::new(action));
            return;
        }

        let due = state
            .last_fired
            .and_then(|last| last.checked_add(self.delay))
            .filter(|due| *due > now);

        let Some(due) = due else {
            state.last_fired = Some(now);
            drop(state);
            action();
            return;
        };

        state.pending = Some(Box::new(action));
        let shared = Arc::clone(&self.state);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(due).await;
            let action = {
                let mut state = lock(&shared);
                state.timer = None;
                state.last_fired = Some(Instant::now());
                state.pending.take()
            };
            if let Some(action) = action {
                action();
            }
        }));
    }

    /// Drop the pending action, if any, and stop its timer.
    pub fn cancel(&self) {
        let mut state = lock(&self.state);
        state.pending = None;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }

    /// `true` while an action is waiting for its turn.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        lock(&self.state).pending.is_some()
    }
}

impl Drop for Throttler {
    fn drop(&mut self) {
        self.cancel();
    }
}

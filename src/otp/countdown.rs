//! Resend cooldown.
//!
//! [`Countdown`] holds the rules, [`CountdownTimer`] is the periodic task that
//! applies them once per second. The task is aborted when the timer is
//! dropped, so a torn down flow never receives another tick.

use std::sync::{Arc, Mutex};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Duration, Instant, MissedTickBehavior},
};
use tracing::debug;

/// Seconds before the first resend is allowed.
pub const INITIAL_COOLDOWN_SECS: u32 = 180;
/// Seconds before another resend is allowed after a successful one.
pub const RESEND_COOLDOWN_SECS: u32 = 60;

const TICK: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    resend_disabled: bool,
}

impl Countdown {
    #[must_use]
    pub fn new(secs: u32) -> Self {
        Self {
            remaining: secs,
            resend_disabled: secs > 0,
        }
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn resend_disabled(&self) -> bool {
        self.resend_disabled
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.remaining > 0
    }

    /// One second elapsed. Returns `true` while more ticks are needed.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }

        self.remaining -= 1;
        if self.remaining == 0 {
            self.resend_disabled = false;
        }

        self.remaining > 0
    }

    /// Start a new cooldown window.
    pub fn reset(&mut self, secs: u32) {
        *self = Self::new(secs);
    }
}

/// Anything the timer task can tick. The flow implements this for its shared
/// state so the countdown lives next to the rest of the UI state.
pub trait Tickable: Send + Sync + 'static {
    /// Apply one tick, returning `true` while the countdown is still running.
    fn tick(&self) -> bool;
}

impl Tickable for Mutex<Countdown> {
    fn tick(&self) -> bool {
        match self.lock() {
            Ok(mut countdown) => countdown.tick(),
            Err(poisoned) => poisoned.into_inner().tick(),
        }
    }
}

/// Handle to the periodic task. Dropping it stops the task.
#[derive(Debug)]
pub struct CountdownTimer {
    handle: JoinHandle<()>,
}

impl CountdownTimer {
    /// Spawn a task ticking `target` every second until it reports done.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<T: Tickable + ?Sized>(target: Arc<T>) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if !target.tick() {
                    debug!("countdown finished");
                    break;
                }
            }
        });

        Self { handle }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

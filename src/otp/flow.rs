//! The verification flow state machine.
//!
//! An [`OtpFlow`] is created when the verification screen mounts and torn down
//! when the caller dismisses it. It is a cheap handle: clones share the same
//! state, so a renderer can read snapshots while another task awaits a
//! request.
//!
//! Two orthogonal machines live here:
//!
//! - resend gating: cooldown running → resend enabled → resending →
//!   (cooldown running again | resend enabled with an error);
//! - verification: idle → verifying → (success callback | idle with an error).
//!
//! Closing the flow aborts the countdown and cancels whatever request is in
//! flight; late completions neither set messages nor fire callbacks.

use super::{
    channel::{Channel, FlowMode, OtpChannel, RESEND_FALLBACK, VERIFY_FALLBACK},
    config::FlowConfig,
    countdown::{Countdown, CountdownTimer, Tickable},
    errors::{FlowError, FlowResult},
    passcode::{PasscodeEntry, PASSCODE_LENGTH},
};
use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const RESEND_SUCCESS: &str = "OTP resent successfully";

pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Read-only view of the flow for rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowSnapshot {
    pub mode: FlowMode,
    pub digits: [String; PASSCODE_LENGTH],
    pub focus: usize,
    pub remaining_secs: u32,
    pub resend_disabled: bool,
    pub verifying: bool,
    pub resending: bool,
    pub error: Option<String>,
    pub success: Option<String>,
    pub closed: bool,
}

impl FlowSnapshot {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(|digit| !digit.is_empty())
    }
}

#[derive(Debug)]
struct FlowState {
    passcode: PasscodeEntry,
    countdown: Countdown,
    verifying: bool,
    resending: bool,
    error: Option<String>,
    success: Option<String>,
    closed: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<FlowState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Tickable for Shared {
    fn tick(&self) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.countdown.tick()
    }
}

#[derive(Clone, Copy)]
enum Flag {
    Verifying,
    Resending,
}

/// Clears an in-flight flag when the request ends, however it ends.
struct FlagGuard<'a> {
    shared: &'a Shared,
    flag: Flag,
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        match self.flag {
            Flag::Verifying => state.verifying = false,
            Flag::Resending => state.resending = false,
        }
    }
}

struct Inner<C> {
    shared: Arc<Shared>,
    channel: C,
    mode: FlowMode,
    resend_cooldown_secs: u32,
    notify_success: bool,
    on_success: Option<Callback>,
    on_close: Option<Callback>,
    timer: Mutex<Option<CountdownTimer>>,
    closed_tx: watch::Sender<bool>,
}

pub struct OtpFlow<C = Channel> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for OtpFlow<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> fmt::Debug for OtpFlow<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpFlow")
            .field("mode", &self.inner.mode)
            .field("state", &*self.inner.shared.lock())
            .finish_non_exhaustive()
    }
}

/// Construction-time parameters of a flow.
pub struct OtpFlowBuilder {
    mode: FlowMode,
    email: String,
    config: FlowConfig,
    on_success: Option<Callback>,
    on_close: Option<Callback>,
}

impl OtpFlowBuilder {
    #[must_use]
    pub fn new(mode: FlowMode) -> Self {
        Self {
            mode,
            email: String::new(),
            config: FlowConfig::default(),
            on_success: None,
            on_close: None,
        }
    }

    /// Address the code was sent to; required in job seeker mode.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    #[must_use]
    pub fn config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn on_success(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_close(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(callback));
        self
    }

    /// Build the flow against the configured backends and start the
    /// cooldown. Must be called within a tokio runtime.
    ///
    /// # Errors
    /// Returns `FlowError::Config` for an invalid configuration, or a
    /// missing email in job seeker mode.
    pub fn build(self) -> FlowResult<OtpFlow<Channel>> {
        let channel = Channel::new(self.mode, &self.email, &self.config)?;
        Ok(self.build_with(channel))
    }

    /// Build the flow on a caller supplied channel and start the cooldown.
    /// Must be called within a tokio runtime.
    pub fn build_with<C>(self, channel: C) -> OtpFlow<C>
    where
        C: OtpChannel + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(FlowState {
                passcode: PasscodeEntry::new(),
                countdown: Countdown::new(self.config.initial_cooldown_secs),
                verifying: false,
                resending: false,
                error: None,
                success: None,
                closed: false,
            }),
        });

        let timer = (self.config.initial_cooldown_secs > 0)
            .then(|| CountdownTimer::start(Arc::clone(&shared)));

        let (closed_tx, _) = watch::channel(false);

        debug!(
            "{} verification flow started, resend in {} seconds",
            self.mode, self.config.initial_cooldown_secs
        );

        OtpFlow {
            inner: Arc::new(Inner {
                shared,
                channel,
                mode: self.mode,
                resend_cooldown_secs: self.config.resend_cooldown_secs,
                notify_success: !self.mode.is_employer()
                    || self.config.notify_employer_success,
                on_success: self.on_success,
                on_close: self.on_close,
                timer: Mutex::new(timer),
                closed_tx,
            }),
        }
    }
}

impl OtpFlow<Channel> {
    #[must_use]
    pub fn builder(mode: FlowMode) -> OtpFlowBuilder {
        OtpFlowBuilder::new(mode)
    }
}

impl<C> OtpFlow<C>
where
    C: OtpChannel + Send + Sync + 'static,
{
    fn state(&self) -> MutexGuard<'_, FlowState> {
        self.inner.shared.lock()
    }

    #[must_use]
    pub fn mode(&self) -> FlowMode {
        self.inner.mode
    }

    #[must_use]
    pub fn snapshot(&self) -> FlowSnapshot {
        let state = self.state();
        FlowSnapshot {
            mode: self.inner.mode,
            digits: state.passcode.digits(),
            focus: state.passcode.focus(),
            remaining_secs: state.countdown.remaining(),
            resend_disabled: state.countdown.resend_disabled(),
            verifying: state.verifying,
            resending: state.resending,
            error: state.error.clone(),
            success: state.success.clone(),
            closed: state.closed,
        }
    }

    /// Resend is offered once the cooldown is over and no resend is running.
    #[must_use]
    pub fn can_resend(&self) -> bool {
        let state = self.state();
        !state.closed && !state.countdown.resend_disabled() && !state.resending
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Keystroke into slot `index`. Rejected keystrokes return `false` and
    /// change nothing.
    pub fn set_digit(&self, index: usize, raw: &str) -> bool {
        self.state().passcode.set_digit(index, raw)
    }

    /// Backspace on the slot at `index` after the input itself was cleared.
    pub fn handle_backspace(&self, index: usize) {
        self.state().passcode.handle_backspace(index);
    }

    /// Type or paste `text` from the focused slot onwards.
    pub fn fill(&self, text: &str) -> usize {
        self.state().passcode.fill(text)
    }

    /// Clear every slot and type `text` from the first one.
    pub fn replace(&self, text: &str) -> usize {
        self.state().passcode.replace(text)
    }

    /// Terminal style backspace at the focused slot.
    pub fn backspace(&self) {
        self.state().passcode.backspace();
    }

    /// Race `request` against the flow being closed.
    async fn cancellable<T>(&self, request: impl Future<Output = FlowResult<T>>) -> FlowResult<T> {
        let mut closed = self.inner.closed_tx.subscribe();

        tokio::select! {
            result = request => result,
            _ = closed.wait_for(|closed| *closed) => Err(FlowError::Cancelled),
        }
    }

    /// Submit the assembled code to the mode's verification endpoint.
    ///
    /// The slots are never cleared, whatever the outcome. On success the
    /// `on_success` callback fires in job seeker mode (and in employer mode
    /// when `notify_employer_success` is set).
    ///
    /// # Errors
    /// Returns the channel error after recording its message, `InFlight` when
    /// a verification is already running and `Cancelled` once closed.
    pub async fn submit(&self) -> FlowResult<()> {
        let code = {
            let mut state = self.state();
            if state.closed {
                return Err(FlowError::Cancelled);
            }
            if state.verifying {
                return Err(FlowError::InFlight);
            }
            state.verifying = true;
            state.error = None;
            state.passcode.slots()
        };
        let _verifying = FlagGuard {
            shared: &self.inner.shared,
            flag: Flag::Verifying,
        };

        let result = self.cancellable(self.inner.channel.verify(&code)).await;

        match result {
            Ok(()) => {
                if self.is_closed() {
                    return Err(FlowError::Cancelled);
                }

                info!("{} verification succeeded", self.inner.mode);

                if self.inner.notify_success {
                    if let Some(on_success) = &self.inner.on_success {
                        on_success();
                    }
                }

                Ok(())
            }
            Err(FlowError::Cancelled) => {
                debug!("verification cancelled");
                Err(FlowError::Cancelled)
            }
            Err(err) => {
                warn!("{} verification failed: {}", self.inner.mode, err);

                let mut state = self.state();
                if state.closed {
                    return Err(FlowError::Cancelled);
                }
                state.error = Some(err.user_message(VERIFY_FALLBACK));

                Err(err)
            }
        }
    }

    /// Request a new code and restart the cooldown on success.
    ///
    /// Eligibility is the caller's concern (see [`OtpFlow::can_resend`]).
    ///
    /// # Errors
    /// Returns the channel error after recording its message, `InFlight` when
    /// a resend is already running and `Cancelled` once closed.
    pub async fn resend(&self) -> FlowResult<()> {
        {
            let mut state = self.state();
            if state.closed {
                return Err(FlowError::Cancelled);
            }
            if state.resending {
                return Err(FlowError::InFlight);
            }
            state.resending = true;
            state.error = None;
            state.success = None;
        }
        let _resending = FlagGuard {
            shared: &self.inner.shared,
            flag: Flag::Resending,
        };

        let result = self.cancellable(self.inner.channel.resend()).await;

        match result {
            Ok(()) => {
                {
                    let mut state = self.state();
                    if state.closed {
                        return Err(FlowError::Cancelled);
                    }
                    state.countdown.reset(self.inner.resend_cooldown_secs);
                    state.success = Some(RESEND_SUCCESS.to_string());
                }
                self.restart_timer();

                info!(
                    "{} code resent, next resend in {} seconds",
                    self.inner.mode, self.inner.resend_cooldown_secs
                );

                Ok(())
            }
            Err(FlowError::Cancelled) => {
                debug!("resend cancelled");
                Err(FlowError::Cancelled)
            }
            Err(err) => {
                warn!("{} resend failed: {}", self.inner.mode, err);

                let mut state = self.state();
                if state.closed {
                    return Err(FlowError::Cancelled);
                }
                state.error = Some(err.user_message(RESEND_FALLBACK));

                Err(err)
            }
        }
    }

    fn restart_timer(&self) {
        let mut timer = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // replacing the guard aborts the previous task
        *timer = (self.inner.resend_cooldown_secs > 0)
            .then(|| CountdownTimer::start(Arc::clone(&self.inner.shared)));
    }

    /// Dismiss the flow: stop the countdown, cancel in-flight requests and
    /// notify `on_close`. Only the first call has an effect.
    pub fn close(&self) {
        {
            let mut state = self.state();
            if state.closed {
                return;
            }
            state.closed = true;
        }

        self.inner.closed_tx.send_replace(true);

        if let Some(timer) = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            timer.stop();
        }

        debug!("{} verification flow closed", self.inner.mode);

        if let Some(on_close) = &self.inner.on_close {
            on_close();
        }
    }
}

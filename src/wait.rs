//! Bounded polling against the eventually consistent control plane.

use std::{thread, time};

use log::debug;

use crate::Error;

pub const POLLING_INTERVAL: time::Duration = time::Duration::from_secs(2);
pub const RUNNING_TIMEOUT: time::Duration = time::Duration::from_secs(600);
pub const FINISHED_TIMEOUT: time::Duration = time::Duration::from_secs(3600);
pub const ADMITTED_TIMEOUT: time::Duration = time::Duration::from_secs(300);
pub const CLEANUP_TIMEOUT: time::Duration = time::Duration::from_secs(120);

pub struct Deadline(time::Instant);

impl Deadline {
    /// Create a new deadline that times out after the provided duration.
    pub fn after(timeout: time::Duration) -> Self {
        Self(time::Instant::now() + timeout)
    }

    pub fn has_passed(&self) -> bool {
        time::Instant::now() >= self.0
    }

    /// Sleeps for `duration` or until the deadline, whichever comes first. Returns Err if the deadline has already
    /// passed.
    pub fn sleep(&self, duration: time::Duration) -> Result<(), ()> {
        let remaining = self.0.saturating_duration_since(time::Instant::now());
        if remaining.is_zero() {
            return Err(());
        }
        thread::sleep(duration.min(remaining));
        Ok(())
    }
}

/// What to do when a poll fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Treat the failure as "not yet" and keep polling until the deadline.
    #[default]
    Retry,
    /// Stop polling and report the failure.
    Abort,
}

#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub timeout: time::Duration,
    pub poll_interval: time::Duration,
    pub on_error: ErrorPolicy,
}

impl WaitOptions {
    pub fn with_timeout(timeout: time::Duration) -> Self {
        Self {
            timeout,
            poll_interval: POLLING_INTERVAL,
            on_error: ErrorPolicy::default(),
        }
    }

    pub fn poll_interval(self, poll_interval: time::Duration) -> Self {
        Self {
            poll_interval,
            ..self
        }
    }

    pub fn on_error(self, on_error: ErrorPolicy) -> Self {
        Self { on_error, ..self }
    }
}

#[derive(Debug)]
pub enum WaitOutcome<T> {
    /// The condition held. Carries the observation that satisfied it.
    Satisfied(T),
    /// The deadline passed first. Carries the most recent poll failure, if the last poll failed.
    TimedOut { last_error: Option<Error> },
    /// A poll failed under [`ErrorPolicy::Abort`].
    Aborted(Error),
}

impl<T> WaitOutcome<T> {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied(_))
    }

    pub fn satisfied(self) -> Option<T> {
        match self {
            WaitOutcome::Satisfied(value) => Some(value),
            _ => None,
        }
    }
}

/// Calls `probe` every `options.poll_interval` until it returns `Ok(Some(_))` or `options.timeout` elapses. The
/// probe is always called at least once.
pub fn poll_until<T>(
    options: &WaitOptions,
    mut probe: impl FnMut() -> Result<Option<T>, Error>,
) -> WaitOutcome<T> {
    let deadline = Deadline::after(options.timeout);
    loop {
        let last_error = match probe() {
            Ok(Some(value)) => return WaitOutcome::Satisfied(value),
            Ok(None) => None,
            Err(error) => match options.on_error {
                ErrorPolicy::Abort => return WaitOutcome::Aborted(error),
                ErrorPolicy::Retry => {
                    debug!("Poll failed, retrying: {error}");
                    Some(error)
                }
            },
        };

        if deadline.has_passed() || deadline.sleep(options.poll_interval).is_err() {
            return WaitOutcome::TimedOut { last_error };
        }
    }
}

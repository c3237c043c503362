//! One-shot run state of the pipeline and interrupt handling.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::watcher::StopToken;

use super::PipelineError;

/// Pipeline run state. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Init = 0,
    Running = 1,
    Stopping = 2,
    Terminated = 3,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunState::Init,
            1 => RunState::Running,
            2 => RunState::Stopping,
            _ => RunState::Terminated,
        }
    }
}

/// What an interrupt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// A running watch was asked to stop.
    Stopping,
    /// The watch was already stopping or finished.
    AlreadyStopping,
    /// No watch has started yet; the caller should exit.
    NoActiveWatch,
}

/// Shared run state plus the stop token handed to the backend.
///
/// The signal handler holds an `Arc<Lifecycle>`; it can only stop the
/// backend, never reach into it.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: AtomicU8,
    token: StopToken,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Token for the backend. Stopping it is how the run loop is halted.
    pub fn token(&self) -> StopToken {
        self.token.clone()
    }

    /// INIT -> RUNNING. Fails if the pipeline already ran.
    pub fn begin(&self) -> Result<(), PipelineError> {
        self.transition(RunState::Init, RunState::Running)
            .map_err(|_| PipelineError::AlreadyStarted)
    }

    /// RUNNING -> STOPPING, stopping the backend.
    ///
    /// Returns false if the pipeline was not running.
    pub fn stop(&self) -> bool {
        if self.transition(RunState::Running, RunState::Stopping).is_ok() {
            self.token.stop();
            true
        } else {
            false
        }
    }

    /// Handle an external interrupt signal.
    pub fn interrupt(&self) -> Interrupt {
        if self.stop() {
            return Interrupt::Stopping;
        }

        match self.state() {
            RunState::Init => Interrupt::NoActiveWatch,
            _ => Interrupt::AlreadyStopping,
        }
    }

    /// Any state -> TERMINATED. Called once the backend loop returned.
    pub fn finish(&self) {
        self.state.store(RunState::Terminated as u8, Ordering::SeqCst);
    }

    fn transition(&self, from: RunState, to: RunState) -> Result<(), RunState> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(RunState::from_u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_happy_path() {
        let lifecycle = Lifecycle::new();
        let token = lifecycle.token();
        assert_eq!(lifecycle.state(), RunState::Init);

        lifecycle.begin().unwrap();
        assert_eq!(lifecycle.state(), RunState::Running);

        assert_eq!(lifecycle.interrupt(), Interrupt::Stopping);
        assert_eq!(lifecycle.state(), RunState::Stopping);
        assert!(token.is_stopped());

        lifecycle.finish();
        assert_eq!(lifecycle.state(), RunState::Terminated);
    }

    #[test]
    fn test_interrupt_before_start() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.interrupt(), Interrupt::NoActiveWatch);
        assert!(!lifecycle.token().is_stopped());
        assert_eq!(lifecycle.state(), RunState::Init);
    }

    #[test]
    fn test_repeated_interrupts() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin().unwrap();

        assert_eq!(lifecycle.interrupt(), Interrupt::Stopping);
        assert_eq!(lifecycle.interrupt(), Interrupt::AlreadyStopping);
        assert!(!lifecycle.stop());

        lifecycle.finish();
        assert_eq!(lifecycle.interrupt(), Interrupt::AlreadyStopping);
    }

    #[test]
    fn test_no_restart() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin().unwrap();
        lifecycle.finish();

        assert!(matches!(lifecycle.begin(), Err(PipelineError::AlreadyStarted)));
        assert_eq!(lifecycle.state(), RunState::Terminated);
    }
}

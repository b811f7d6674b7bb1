//! How a supervised run ended

use std::sync::{Mutex, PoisonError};

use crate::error::{Result, SupervisorError};

/// Final result of the run loop
#[derive(Debug)]
pub enum RunOutcome {
    /// The host asked for shutdown
    Cancelled,
    /// The child exited with status 0
    ChildExitedCleanly,
    /// The child exited with an error
    ChildCrashed(SupervisorError),
    /// The supervisor itself could not keep the child running
    Failed(SupervisorError),
}

impl RunOutcome {
    /// Convert into the result reported to the host
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Cancelled | Self::ChildExitedCleanly => Ok(()),
            Self::ChildCrashed(err) | Self::Failed(err) => Err(err),
        }
    }
}

/// Write-once slot for the run outcome
///
/// Kept apart from the state lock so recording the outcome never has to
/// order itself against it.
#[derive(Debug, Default)]
pub struct OutcomeSlot {
    outcome: Mutex<Option<RunOutcome>>,
}

impl OutcomeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `outcome` unless one was already recorded
    pub fn set(&self, outcome: RunOutcome) -> bool {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        true
    }

    /// Take the recorded outcome
    pub fn take(&self) -> Option<RunOutcome> {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

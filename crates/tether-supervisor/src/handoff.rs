//! Single-shot notifications between the run loop and an update check
//!
//! An update check arms the slot on the running child's handle before it
//! sends the restart signal, then waits on the receiver. The run loop fires
//! the slot exactly once when it observes that child's exit. A slot that is
//! not armed swallows the notice, so a child restarting on its own never
//! leaks a stale notice into the next handoff.

use std::sync::{Mutex, PoisonError};
use tokio::sync::oneshot;

/// How the run loop saw the signalled child go away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffNotice {
    /// The child exited because of the restart signal and will be relaunched
    RestartAcknowledged,
    /// The child exited for some other reason
    Terminated,
}

/// One-shot notification slot bound to a single child process
#[derive(Debug, Default)]
pub struct HandoffSlot {
    sender: Mutex<Option<oneshot::Sender<HandoffNotice>>>,
}

impl HandoffSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot, replacing any earlier receiver
    pub fn arm(&self) -> oneshot::Receiver<HandoffNotice> {
        let (tx, rx) = oneshot::channel();
        *self.sender.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        rx
    }

    /// Deliver `notice` if the slot is armed; returns whether anyone was waiting
    pub fn notify(&self, notice: HandoffNotice) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            Some(tx) => tx.send(notice).is_ok(),
            None => false,
        }
    }

    /// Whether a receiver is currently waiting
    pub fn is_armed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}

//! State shared by the run loop and update checks

use std::sync::Arc;
use tether_update::InstalledBinary;

use crate::process::ProcessHandle;

/// The installed binary and the child launched from it
///
/// Both live behind one lock so a swap can never separate the path from the
/// process that was started from it.
#[derive(Debug, Default)]
pub struct SupervisorState {
    /// Binary the next launch will use
    pub installed: Option<InstalledBinary>,
    /// The running child, present only while it is alive
    pub process: Option<Arc<ProcessHandle>>,
}

impl SupervisorState {
    /// Forget `handle` if it is still the current process
    pub fn clear_process(&mut self, handle: &Arc<ProcessHandle>) {
        if self
            .process
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, handle))
        {
            self.process = None;
        }
    }
}

//! Target-action invocation.
//!
//! The coordinator hands the payload of an executed proposal to an
//! [`ActionExecutor`] without interpreting it. An `Err` aborts the execution
//! as a whole.

use std::sync::Arc;
use parking_lot::Mutex;
use crate::proposal::ProposalAction;

/// Collaborator that performs proposal actions.
pub trait ActionExecutor: Send + Sync {
    /// Perform `action` for `proposal_id`. Must be all-or-nothing.
    fn invoke(&mut self, proposal_id: u64, action: &ProposalAction) -> Result<(), String>;
}

/// Accepts every action and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExecutor;

impl ActionExecutor for NoopExecutor {
    fn invoke(&mut self, _proposal_id: u64, _action: &ProposalAction) -> Result<(), String> {
        Ok(())
    }
}

/// Records every invocation; can be told to reject calls.
///
/// Clones share their state, so a handle kept outside the coordinator sees
/// the calls made through the one inside it.
#[derive(Debug, Default, Clone)]
pub struct RecordingExecutor {
    calls: Arc<Mutex<Vec<(u64, ProposalAction)>>>,
    fail_with: Arc<Mutex<Option<String>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor that rejects every call with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        let exec = Self::default();
        exec.set_failure(Some(reason.into()));
        exec
    }

    /// Reject later calls with `reason`, or accept them again with `None`.
    pub fn set_failure(&self, reason: Option<String>) {
        *self.fail_with.lock() = reason;
    }

    /// Successful invocations so far.
    pub fn calls(&self) -> Vec<(u64, ProposalAction)> {
        self.calls.lock().clone()
    }
}

impl ActionExecutor for RecordingExecutor {
    fn invoke(&mut self, proposal_id: u64, action: &ProposalAction) -> Result<(), String> {
        if let Some(reason) = self.fail_with.lock().as_ref() {
            return Err(reason.clone());
        }
        self.calls.lock().push((proposal_id, action.clone()));
        Ok(())
    }
}

//! Timelock entries for passed proposals.
//!
//! An entry is created once per proposal when it is queued and is kept after
//! execution for audit. Entries are never reused.

use std::collections::BTreeMap;
use agora_types::Timestamp;
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;

/// Scheduled execution of one proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockEntry {
    pub proposal_id: u64,
    pub queued_at: Timestamp,
    /// Earliest execution time
    pub eta: Timestamp,
    pub executed: bool,
    pub executed_at: Option<Timestamp>,
}

impl TimelockEntry {
    /// Check if the delay has elapsed at `now`.
    pub fn is_ready(&self, now: Timestamp) -> bool {
        now >= self.eta
    }
}

/// Timelock enforcing a minimum delay before execution.
#[derive(Debug, Clone)]
pub struct Timelock {
    entries: BTreeMap<u64, TimelockEntry>,
    /// Minimum delay between queueing and execution (seconds)
    min_delay: u64,
}

impl Timelock {
    /// Create a timelock. A zero delay is allowed for development setups.
    pub fn new(min_delay: u64) -> Self {
        Self {
            entries: BTreeMap::new(),
            min_delay,
        }
    }

    /// Execution time a proposal queued at `now` would get.
    pub fn eta_for(&self, now: Timestamp) -> Result<Timestamp, GovernanceError> {
        now.checked_add(self.min_delay).ok_or(GovernanceError::Overflow)
    }

    /// Fail if `proposal_id` already has an entry.
    pub fn ensure_not_queued(&self, proposal_id: u64) -> Result<(), GovernanceError> {
        if self.entries.contains_key(&proposal_id) {
            return Err(GovernanceError::AlreadyQueued(proposal_id));
        }
        Ok(())
    }

    /// Create the entry for `proposal_id`.
    pub fn schedule(&mut self, proposal_id: u64, now: Timestamp) -> Result<TimelockEntry, GovernanceError> {
        self.ensure_not_queued(proposal_id)?;

        let entry = TimelockEntry {
            proposal_id,
            queued_at: now,
            eta: self.eta_for(now)?,
            executed: false,
            executed_at: None,
        };
        self.entries.insert(proposal_id, entry);
        Ok(entry)
    }

    /// Check the entry exists, is due and has not run.
    pub fn ensure_ready(&self, proposal_id: u64, now: Timestamp) -> Result<&TimelockEntry, GovernanceError> {
        let entry = self
            .entries
            .get(&proposal_id)
            .ok_or(GovernanceError::NotQueued(proposal_id))?;

        if now < entry.eta {
            return Err(GovernanceError::TooEarly {
                proposal_id,
                eta: entry.eta,
            });
        }

        if entry.executed {
            return Err(GovernanceError::AlreadyExecuted(proposal_id));
        }

        Ok(entry)
    }

    /// Set the executed flag. Only call after the action succeeded.
    pub fn mark_executed(&mut self, proposal_id: u64, now: Timestamp) -> Result<(), GovernanceError> {
        self.ensure_ready(proposal_id, now)?;
        if let Some(entry) = self.entries.get_mut(&proposal_id) {
            entry.executed = true;
            entry.executed_at = Some(now);
        }
        Ok(())
    }

    /// Entry for `proposal_id`, if queued.
    pub fn entry(&self, proposal_id: u64) -> Option<&TimelockEntry> {
        self.entries.get(&proposal_id)
    }
}

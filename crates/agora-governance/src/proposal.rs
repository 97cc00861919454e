//! Proposal lifecycle.
//!
//! Proposals go through states: Pending -> Active -> Succeeded/Defeated ->
//! Queued -> Executed, with Canceled and Expired as side exits. Only the
//! events that cannot be derived from the clock (queue, execute, cancel) are
//! stored; everything else is evaluated from `now` on each call.

use std::collections::HashMap;
use agora_types::{Address, Timestamp, U256};
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;

/// Proposal state in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    /// Created, waiting for voting to start
    Pending,
    /// Voting is open
    Active,
    /// Voting ended, proposal passed
    Succeeded,
    /// Voting ended, proposal failed
    Defeated,
    /// Passed but not executed within the grace window
    Expired,
    /// Waiting in the timelock
    Queued,
    /// Action was executed
    Executed,
    /// Withdrawn by the proposer or a canceller
    Canceled,
}

impl ProposalState {
    /// Check if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalState::Defeated
                | ProposalState::Expired
                | ProposalState::Executed
                | ProposalState::Canceled
        )
    }

    /// Check if the proposal may still be canceled.
    pub fn is_cancelable(&self) -> bool {
        matches!(
            self,
            ProposalState::Pending
                | ProposalState::Active
                | ProposalState::Succeeded
                | ProposalState::Queued
        )
    }
}

/// Vote direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteDirection {
    /// Vote in favor
    For,
    /// Vote against
    Against,
    /// Abstain (counts toward quorum only)
    Abstain,
}

/// Recorded vote of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub direction: VoteDirection,
    /// Weight locked at cast time
    pub weight: U256,
    pub cast_at: Timestamp,
}

/// Action performed by the timelock when the proposal executes.
/// The payload is opaque to governance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalAction {
    /// Collaborator that receives the call
    pub target: Address,
    /// Call data
    pub payload: Vec<u8>,
}

impl ProposalAction {
    pub fn new(target: Address, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            target,
            payload: payload.into(),
        }
    }
}

/// Vote totals and outcome after voting closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub for_votes: U256,
    pub against_votes: U256,
    pub abstain_votes: U256,
    /// Votes needed, computed against the creation-time snapshot
    pub quorum_required: U256,
    pub quorum_reached: bool,
    /// Either `Succeeded` or `Defeated`
    pub outcome: ProposalState,
}

/// Governance proposal.
#[derive(Debug, Clone)]
pub struct Proposal {
    /// Unique proposal ID
    pub id: u64,
    pub proposer: Address,
    pub action: ProposalAction,
    pub description: String,
    pub created_at: Timestamp,
    /// First instant votes are accepted
    pub voting_start: Timestamp,
    /// First instant votes are rejected again
    pub voting_end: Timestamp,
    /// Total staked weight at creation (quorum denominator)
    pub quorum_snapshot: U256,
    /// Quorum percentage in force at creation
    pub quorum_percentage: u8,
    pub for_votes: U256,
    pub against_votes: U256,
    pub abstain_votes: U256,
    receipts: HashMap<Address, VoteReceipt>,
    /// Scheduled execution time once queued
    pub eta: Option<Timestamp>,
    pub executed_at: Option<Timestamp>,
    pub canceled_at: Option<Timestamp>,
}

impl Proposal {
    /// Create a new proposal. Fails with `Overflow` if the voting window
    /// does not fit in a timestamp.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        proposer: Address,
        action: ProposalAction,
        description: String,
        created_at: Timestamp,
        voting_delay: u64,
        voting_period: u64,
        quorum_snapshot: U256,
        quorum_percentage: u8,
    ) -> Result<Self, GovernanceError> {
        let voting_start = created_at
            .checked_add(voting_delay)
            .ok_or(GovernanceError::Overflow)?;
        let voting_end = voting_start
            .checked_add(voting_period)
            .ok_or(GovernanceError::Overflow)?;

        Ok(Self {
            id,
            proposer,
            action,
            description,
            created_at,
            voting_start,
            voting_end,
            quorum_snapshot,
            quorum_percentage,
            for_votes: U256::ZERO,
            against_votes: U256::ZERO,
            abstain_votes: U256::ZERO,
            receipts: HashMap::new(),
            eta: None,
            executed_at: None,
            canceled_at: None,
        })
    }

    /// State at `now`. `grace_period` bounds how long a passed proposal
    /// stays executable; `None` means forever.
    pub fn state(&self, now: Timestamp, grace_period: Option<u64>) -> ProposalState {
        if self.executed_at.is_some() {
            return ProposalState::Executed;
        }
        if self.canceled_at.is_some() {
            return ProposalState::Canceled;
        }
        if now < self.voting_start {
            return ProposalState::Pending;
        }
        if now < self.voting_end {
            return ProposalState::Active;
        }
        if self.outcome().outcome == ProposalState::Defeated {
            return ProposalState::Defeated;
        }

        let deadline_base = self.eta.unwrap_or(self.voting_end);
        if let Some(grace) = grace_period {
            if now >= deadline_base.saturating_add(grace) {
                return ProposalState::Expired;
            }
        }

        if self.eta.is_some() {
            ProposalState::Queued
        } else {
            ProposalState::Succeeded
        }
    }

    /// Check if `now` falls inside `[voting_start, voting_end)`.
    pub fn is_voting_open(&self, now: Timestamp) -> bool {
        self.canceled_at.is_none() && self.voting_start <= now && now < self.voting_end
    }

    /// Record a vote with the weight the voter holds right now.
    pub fn cast_vote(
        &mut self,
        voter: Address,
        direction: VoteDirection,
        weight: U256,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        if !self.is_voting_open(now) {
            return Err(GovernanceError::NotActive(self.id));
        }

        if self.receipts.contains_key(&voter) {
            return Err(GovernanceError::AlreadyVoted(self.id));
        }

        if weight.is_zero() {
            return Err(GovernanceError::NoVotingPower);
        }

        let bucket = match direction {
            VoteDirection::For => &mut self.for_votes,
            VoteDirection::Against => &mut self.against_votes,
            VoteDirection::Abstain => &mut self.abstain_votes,
        };
        *bucket = bucket.checked_add(&weight).ok_or(GovernanceError::Overflow)?;

        self.receipts.insert(
            voter,
            VoteReceipt {
                direction,
                weight,
                cast_at: now,
            },
        );
        Ok(())
    }

    /// Vote of `voter`, if any.
    pub fn receipt(&self, voter: &Address) -> Option<&VoteReceipt> {
        self.receipts.get(voter)
    }

    /// Check if voter has voted.
    pub fn has_voted(&self, voter: &Address) -> bool {
        self.receipts.contains_key(voter)
    }

    /// Number of distinct voters.
    pub fn voter_count(&self) -> usize {
        self.receipts.len()
    }

    /// Sum of all three tallies, or `None` if it does not fit.
    pub fn total_votes(&self) -> Option<U256> {
        self.for_votes
            .checked_add(&self.against_votes)?
            .checked_add(&self.abstain_votes)
    }

    /// Votes needed for quorum: `floor(quorum_percentage * snapshot / 100)`.
    pub fn quorum_required(&self) -> U256 {
        self.quorum_snapshot
            .mul_div_floor(self.quorum_percentage as u64, 100)
            .unwrap_or(U256::MAX)
    }

    /// Tally once voting has closed.
    pub fn tally(&self, now: Timestamp) -> Result<Tally, GovernanceError> {
        if now < self.voting_end {
            return Err(GovernanceError::VotingInProgress {
                proposal_id: self.id,
                voting_end: self.voting_end,
            });
        }
        Ok(self.outcome())
    }

    /// Outcome of the current tallies, regardless of the clock.
    ///
    /// Passing requires strictly more For than Against, so a tie is a defeat.
    pub fn outcome(&self) -> Tally {
        let quorum_required = self.quorum_required();
        let quorum_reached = match self.total_votes() {
            Some(total) if total.is_zero() && self.quorum_percentage > 0 => false,
            Some(total) => total >= quorum_required,
            // Tallies are bounded by the staked supply, which fits in U256.
            None => true,
        };

        let outcome = if quorum_reached && self.for_votes > self.against_votes {
            ProposalState::Succeeded
        } else {
            ProposalState::Defeated
        };

        Tally {
            for_votes: self.for_votes,
            against_votes: self.against_votes,
            abstain_votes: self.abstain_votes,
            quorum_required,
            quorum_reached,
            outcome,
        }
    }
}

//! Audit log of accepted DAO mutations.

use agora_types::{Address, Timestamp, U256};
use serde::Serialize;
use crate::proposal::{ProposalState, VoteDirection};

/// One accepted mutation, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DaoEvent {
    TokensClaimed {
        account: Address,
        amount: U256,
        at: Timestamp,
    },
    Staked {
        account: Address,
        amount: U256,
        total: U256,
        at: Timestamp,
    },
    Unstaked {
        account: Address,
        amount: U256,
        remaining: U256,
        at: Timestamp,
    },
    ProposalCreated {
        proposal_id: u64,
        proposer: Address,
        fee: U256,
        voting_start: Timestamp,
        voting_end: Timestamp,
        quorum_snapshot: U256,
    },
    VoteCast {
        proposal_id: u64,
        voter: Address,
        direction: VoteDirection,
        weight: U256,
        at: Timestamp,
    },
    ProposalCanceled {
        proposal_id: u64,
        by: Address,
        previous: ProposalState,
        at: Timestamp,
    },
    ProposalQueued {
        proposal_id: u64,
        eta: Timestamp,
    },
    ProposalExecuted {
        proposal_id: u64,
        at: Timestamp,
    },
    /// Conservation check failed; no further mutations are accepted
    Halted {
        reason: String,
        at: Timestamp,
    },
}

impl DaoEvent {
    /// Proposal the event refers to, if any.
    pub fn proposal_id(&self) -> Option<u64> {
        match self {
            DaoEvent::ProposalCreated { proposal_id, .. }
            | DaoEvent::VoteCast { proposal_id, .. }
            | DaoEvent::ProposalCanceled { proposal_id, .. }
            | DaoEvent::ProposalQueued { proposal_id, .. }
            | DaoEvent::ProposalExecuted { proposal_id, .. } => Some(*proposal_id),
            _ => None,
        }
    }
}

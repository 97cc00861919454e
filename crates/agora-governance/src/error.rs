use agora_types::{Timestamp, U256};
use thiserror::Error;

/// Errors that can occur in governance operations.
///
/// Every variant is a request rejection: the operation that returned it left
/// all state unchanged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("Insufficient stake: required {required}, staked {staked}")]
    InsufficientStake { required: U256, staked: U256 },

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("No voting power")]
    NoVotingPower,

    #[error("Proposal {0} is not active")]
    NotActive(u64),

    #[error("Already voted on proposal {0}")]
    AlreadyVoted(u64),

    #[error("Voting on proposal {proposal_id} is open until {voting_end}")]
    VotingInProgress { proposal_id: u64, voting_end: Timestamp },

    #[error("Proposal {0} has not succeeded")]
    NotSucceeded(u64),

    #[error("Proposal {0} already queued")]
    AlreadyQueued(u64),

    #[error("Proposal {0} is not queued")]
    NotQueued(u64),

    #[error("Proposal {proposal_id} not executable before {eta}")]
    TooEarly { proposal_id: u64, eta: Timestamp },

    #[error("Proposal {0} already executed")]
    AlreadyExecuted(u64),

    #[error("Proposal {0} expired")]
    Expired(u64),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Proposal {0} is in a terminal state")]
    TerminalState(u64),

    #[error("Proposal not found: {0}")]
    ProposalNotFound(u64),

    #[error("Tokens already claimed")]
    AlreadyClaimed,

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl GovernanceError {
    /// True for conditions the caller must escalate rather than retry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GovernanceError::InvariantViolation(_))
    }
}

//! Agora Governance - Token-weighted DAO engine.
//!
//! This crate provides:
//! - Balance ledger with a one-time faucet claim
//! - Staking for voting power
//! - Proposal lifecycle with snapshot quorum
//! - Timelocked execution through a pluggable executor
//! - A coordinator (`Dao`) and its thread-safe handle (`SharedDao`)

pub mod ledger;
pub mod staking;
pub mod proposal;
pub mod governance;
pub mod timelock;
pub mod config;
pub mod clock;
pub mod executor;
pub mod events;
pub mod dao;
pub mod shared;
pub mod error;

pub use ledger::BalanceLedger;
pub use staking::{Stake, StakingModule};
pub use proposal::{Proposal, ProposalAction, ProposalState, Tally, VoteDirection, VoteReceipt};
pub use governance::{Governance, VotingParams};
pub use timelock::{Timelock, TimelockEntry};
pub use config::{is_development, DaoConfig};
pub use clock::{Clock, ManualClock, SystemClock};
pub use executor::{ActionExecutor, NoopExecutor, RecordingExecutor};
pub use events::DaoEvent;
pub use dao::Dao;
pub use shared::SharedDao;
pub use error::GovernanceError;

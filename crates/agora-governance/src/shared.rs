//! Thread-safe handle to a [`Dao`].
//!
//! Mutations hold the write lock for their whole duration, so they are
//! serialized; queries share the read lock and see a consistent snapshot.

use std::sync::Arc;
use parking_lot::RwLock;
use agora_types::{Address, U256};
use crate::dao::Dao;
use crate::error::GovernanceError;
use crate::events::DaoEvent;
use crate::proposal::{Proposal, ProposalAction, ProposalState, Tally, VoteDirection, VoteReceipt};
use crate::timelock::TimelockEntry;

/// Cloneable, lock-protected DAO.
#[derive(Debug, Clone)]
pub struct SharedDao {
    inner: Arc<RwLock<Dao>>,
}

impl SharedDao {
    pub fn new(dao: Dao) -> Self {
        Self {
            inner: Arc::new(RwLock::new(dao)),
        }
    }

    /// Run `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Dao) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` under the write lock as a single step.
    pub fn write<R>(&self, f: impl FnOnce(&mut Dao) -> R) -> R {
        f(&mut self.inner.write())
    }

    pub fn claim_tokens(&self, account: Address) -> Result<U256, GovernanceError> {
        self.inner.write().claim_tokens(account)
    }

    pub fn stake(&self, account: Address, amount: U256) -> Result<U256, GovernanceError> {
        self.inner.write().stake(account, amount)
    }

    pub fn unstake(&self, account: Address, amount: U256) -> Result<U256, GovernanceError> {
        self.inner.write().unstake(account, amount)
    }

    pub fn propose(
        &self,
        proposer: Address,
        action: ProposalAction,
        description: impl Into<String>,
    ) -> Result<u64, GovernanceError> {
        self.inner.write().propose(proposer, action, description)
    }

    pub fn cast_vote(
        &self,
        proposal_id: u64,
        voter: Address,
        direction: VoteDirection,
    ) -> Result<U256, GovernanceError> {
        self.inner.write().cast_vote(proposal_id, voter, direction)
    }

    pub fn cancel(&self, proposal_id: u64, caller: Address) -> Result<ProposalState, GovernanceError> {
        self.inner.write().cancel(proposal_id, caller)
    }

    pub fn queue(&self, proposal_id: u64) -> Result<TimelockEntry, GovernanceError> {
        self.inner.write().queue(proposal_id)
    }

    pub fn execute(&self, proposal_id: u64) -> Result<(), GovernanceError> {
        self.inner.write().execute(proposal_id)
    }

    pub fn audit(&self) -> Result<(), GovernanceError> {
        self.inner.write().audit()
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.inner.read().balance_of(account)
    }

    pub fn voting_power_of(&self, account: &Address) -> U256 {
        self.inner.read().voting_power_of(account)
    }

    pub fn total_staked(&self) -> U256 {
        self.inner.read().total_staked()
    }

    pub fn state(&self, proposal_id: u64) -> Result<ProposalState, GovernanceError> {
        self.inner.read().state(proposal_id)
    }

    pub fn tally(&self, proposal_id: u64) -> Result<Tally, GovernanceError> {
        self.inner.read().tally(proposal_id)
    }

    /// Copy of a proposal.
    pub fn proposal(&self, proposal_id: u64) -> Result<Proposal, GovernanceError> {
        self.inner.read().proposal(proposal_id).cloned()
    }

    pub fn receipt(&self, proposal_id: u64, voter: &Address) -> Result<Option<VoteReceipt>, GovernanceError> {
        self.inner.read().receipt(proposal_id, voter)
    }

    pub fn events(&self) -> Vec<DaoEvent> {
        self.inner.read().events().to_vec()
    }

    pub fn is_halted(&self) -> bool {
        self.inner.read().is_halted()
    }
}

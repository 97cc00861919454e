//! DAO coordinator.
//!
//! Owns the ledger, staking, governance and timelock components and applies
//! every mutation as one indivisible step: either every component is updated
//! or none is. Time comes from the injected [`Clock`]; proposal actions are
//! performed by the injected [`ActionExecutor`].

use std::sync::Arc;
use agora_types::{Address, Timestamp, U256};
use crate::clock::Clock;
use crate::config::DaoConfig;
use crate::error::GovernanceError;
use crate::events::DaoEvent;
use crate::executor::ActionExecutor;
use crate::governance::Governance;
use crate::ledger::BalanceLedger;
use crate::proposal::{Proposal, ProposalAction, ProposalState, Tally, VoteDirection, VoteReceipt};
use crate::staking::{Stake, StakingModule};
use crate::timelock::{Timelock, TimelockEntry};

/// Token-weighted DAO.
pub struct Dao {
    config: DaoConfig,
    ledger: BalanceLedger,
    staking: StakingModule,
    governance: Governance,
    timelock: Timelock,
    executor: Box<dyn ActionExecutor>,
    clock: Arc<dyn Clock>,
    events: Vec<DaoEvent>,
    /// Reason of the conservation failure that stopped the DAO
    halted: Option<String>,
}

impl std::fmt::Debug for Dao {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dao")
            .field("config", &self.config)
            .field("total_staked", &self.staking.total_staked())
            .field("proposals", &self.governance.proposal_count())
            .field("halted", &self.halted)
            .finish()
    }
}

/// Log a rejected request and hand the error back.
fn rejected(op: &str, err: GovernanceError) -> GovernanceError {
    if err.is_fatal() {
        tracing::error!("{} failed: {}", op, err);
    } else {
        tracing::warn!("{} rejected: {}", op, err);
    }
    err
}

impl Dao {
    /// Create a DAO with the initial supply credited to the distributor.
    pub fn new(
        config: DaoConfig,
        executor: Box<dyn ActionExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GovernanceError> {
        config.validate()?;

        let ledger = BalanceLedger::genesis(config.distributor, config.initial_supply);
        let governance = Governance::new(config.voting_params(), config.cancellers.iter().copied());
        let timelock = Timelock::new(config.min_delay);

        tracing::info!(
            "DAO created: supply={}, quorum={}%, voting_delay={}s, voting_period={}s, min_delay={}s",
            config.initial_supply.format_tokens(),
            config.quorum_percentage,
            config.voting_delay,
            config.voting_period,
            config.min_delay
        );

        Ok(Self {
            config,
            ledger,
            staking: StakingModule::new(),
            governance,
            timelock,
            executor,
            clock,
            events: Vec::new(),
            halted: None,
        })
    }

    fn ensure_running(&self) -> Result<(), GovernanceError> {
        match &self.halted {
            Some(reason) => Err(GovernanceError::InvariantViolation(format!("DAO halted: {}", reason))),
            None => Ok(()),
        }
    }

    /// Reserve accounts (distributor and treasury) may not stake, propose or vote.
    fn ensure_not_reserve(&self, account: &Address) -> Result<(), GovernanceError> {
        if *account == self.config.distributor || *account == self.config.treasury {
            return Err(GovernanceError::Unauthorized(format!("{} is a reserve account", account)));
        }
        Ok(())
    }

    /// Take the one-time token allotment from the distributor.
    pub fn claim_tokens(&mut self, account: Address) -> Result<U256, GovernanceError> {
        self.ensure_running()?;
        let now = self.clock.now();
        let amount = self.config.claim_amount;

        self.ledger
            .claim(account, amount)
            .map_err(|e| rejected("claim", e))?;

        tracing::info!("{} claimed {} tokens", account, amount.format_tokens());
        self.events.push(DaoEvent::TokensClaimed { account, amount, at: now });
        Ok(amount)
    }

    /// Lock claimable balance as stake. Returns the new stake.
    pub fn stake(&mut self, account: Address, amount: U256) -> Result<U256, GovernanceError> {
        self.ensure_running()?;
        let now = self.clock.now();
        self.ensure_not_reserve(&account).map_err(|e| rejected("stake", e))?;

        let total = self
            .staking
            .stake(&mut self.ledger, account, amount, now)
            .map_err(|e| rejected("stake", e))?;

        tracing::info!("{} staked {} (total {})", account, amount.format_tokens(), total.format_tokens());
        self.events.push(DaoEvent::Staked { account, amount, total, at: now });
        Ok(total)
    }

    /// Unlock stake back into claimable balance. Returns the remaining stake.
    pub fn unstake(&mut self, account: Address, amount: U256) -> Result<U256, GovernanceError> {
        self.ensure_running()?;
        let now = self.clock.now();

        let remaining = self
            .staking
            .unstake(&mut self.ledger, account, amount)
            .map_err(|e| rejected("unstake", e))?;

        tracing::info!(
            "{} unstaked {} (remaining {})",
            account,
            amount.format_tokens(),
            remaining.format_tokens()
        );
        self.events.push(DaoEvent::Unstaked { account, amount, remaining, at: now });
        Ok(remaining)
    }

    /// Submit a proposal, paying the entrance fee into the treasury.
    pub fn propose(
        &mut self,
        proposer: Address,
        action: ProposalAction,
        description: impl Into<String>,
    ) -> Result<u64, GovernanceError> {
        self.ensure_running()?;
        let now = self.clock.now();
        let fee = self.config.entrance_fee;
        let treasury = self.config.treasury;

        self.ensure_not_reserve(&proposer).map_err(|e| rejected("propose", e))?;
        self.governance
            .ensure_can_propose(&proposer, &self.staking)
            .map_err(|e| rejected("propose", e))?;

        self.ledger
            .transfer(proposer, treasury, fee)
            .map_err(|e| rejected("propose", e))?;

        let id = match self.governance.propose(proposer, action, description.into(), &self.staking, now) {
            Ok(id) => id,
            Err(e) => {
                // Give the fee back; the treasury was just credited with it.
                if let Err(refund) = self.ledger.transfer(treasury, proposer, fee) {
                    tracing::error!("entrance fee refund to {} failed: {}", proposer, refund);
                }
                return Err(rejected("propose", e));
            }
        };

        let proposal = self.governance.get(id)?;
        tracing::info!(
            "Proposal #{} created by {}: voting [{}, {}), quorum snapshot {}",
            id,
            proposer,
            proposal.voting_start,
            proposal.voting_end,
            proposal.quorum_snapshot.format_tokens()
        );
        self.events.push(DaoEvent::ProposalCreated {
            proposal_id: id,
            proposer,
            fee,
            voting_start: proposal.voting_start,
            voting_end: proposal.voting_end,
            quorum_snapshot: proposal.quorum_snapshot,
        });
        Ok(id)
    }

    /// Vote with the caller's current stake. Returns the recorded weight.
    pub fn cast_vote(
        &mut self,
        proposal_id: u64,
        voter: Address,
        direction: VoteDirection,
    ) -> Result<U256, GovernanceError> {
        self.ensure_running()?;
        let now = self.clock.now();
        self.ensure_not_reserve(&voter).map_err(|e| rejected("vote", e))?;

        let weight = self
            .governance
            .cast_vote(proposal_id, voter, direction, &self.staking, now)
            .map_err(|e| rejected("vote", e))?;

        tracing::info!("{} voted {:?} on #{} with weight {}", voter, direction, proposal_id, weight.format_tokens());
        self.events.push(DaoEvent::VoteCast {
            proposal_id,
            voter,
            direction,
            weight,
            at: now,
        });
        Ok(weight)
    }

    /// Withdraw a proposal that has not finished.
    pub fn cancel(&mut self, proposal_id: u64, caller: Address) -> Result<ProposalState, GovernanceError> {
        self.ensure_running()?;
        let now = self.clock.now();

        let previous = self
            .governance
            .cancel(proposal_id, caller, now)
            .map_err(|e| rejected("cancel", e))?;

        tracing::info!("Proposal #{} canceled by {} (was {:?})", proposal_id, caller, previous);
        self.events.push(DaoEvent::ProposalCanceled {
            proposal_id,
            by: caller,
            previous,
            at: now,
        });
        Ok(previous)
    }

    /// Place a succeeded proposal in the timelock.
    pub fn queue(&mut self, proposal_id: u64) -> Result<TimelockEntry, GovernanceError> {
        self.ensure_running()?;
        let now = self.clock.now();

        let state = self
            .governance
            .state(proposal_id, now)
            .map_err(|e| rejected("queue", e))?;
        if state != ProposalState::Succeeded {
            let err = if self.timelock.entry(proposal_id).is_some() {
                GovernanceError::AlreadyQueued(proposal_id)
            } else {
                GovernanceError::NotSucceeded(proposal_id)
            };
            return Err(rejected("queue", err));
        }
        self.timelock
            .ensure_not_queued(proposal_id)
            .map_err(|e| rejected("queue", e))?;

        let eta = self.timelock.eta_for(now).map_err(|e| rejected("queue", e))?;
        self.governance
            .mark_queued(proposal_id, eta, now)
            .map_err(|e| rejected("queue", e))?;
        let entry = self
            .timelock
            .schedule(proposal_id, now)
            .map_err(|e| rejected("queue", e))?;

        tracing::info!("Proposal #{} queued, executable at {}", proposal_id, entry.eta);
        self.events.push(DaoEvent::ProposalQueued { proposal_id, eta: entry.eta });
        Ok(entry)
    }

    /// Run the action of a queued proposal once its delay has passed.
    pub fn execute(&mut self, proposal_id: u64) -> Result<(), GovernanceError> {
        self.ensure_running()?;
        let now = self.clock.now();

        self.timelock
            .ensure_ready(proposal_id, now)
            .map_err(|e| rejected("execute", e))?;
        self.governance
            .ensure_executable(proposal_id, now)
            .map_err(|e| rejected("execute", e))?;

        let action = self.governance.get(proposal_id)?.action.clone();
        tracing::debug!("Invoking action of #{} on {}", proposal_id, action.target);
        self.executor
            .invoke(proposal_id, &action)
            .map_err(|reason| rejected("execute", GovernanceError::ExecutionFailed(reason)))?;

        self.timelock.mark_executed(proposal_id, now)?;
        self.governance.mark_executed(proposal_id, now)?;

        tracing::info!("Proposal #{} executed", proposal_id);
        self.events.push(DaoEvent::ProposalExecuted { proposal_id, at: now });
        Ok(())
    }

    /// Check supply and stake conservation. A failure halts the DAO.
    pub fn audit(&mut self) -> Result<(), GovernanceError> {
        if let Err(e) = self.check_conservation() {
            let reason = e.to_string();
            if self.halted.is_none() {
                tracing::error!("Conservation check failed, halting: {}", reason);
                self.events.push(DaoEvent::Halted {
                    reason: reason.clone(),
                    at: self.clock.now(),
                });
                self.halted = Some(reason);
            }
            return Err(e);
        }
        Ok(())
    }

    fn check_conservation(&self) -> Result<(), GovernanceError> {
        self.staking.verify_conservation()?;

        let claimable = self.ledger.sum_of_balances().ok_or_else(|| {
            GovernanceError::InvariantViolation("sum of balances overflows".into())
        })?;
        let accounted = claimable
            .checked_add(&self.staking.total_staked())
            .ok_or_else(|| GovernanceError::InvariantViolation("supply accounting overflows".into()))?;

        if accounted != self.ledger.total_supply() {
            return Err(GovernanceError::InvariantViolation(format!(
                "claimable {} + staked {} != supply {}",
                claimable,
                self.staking.total_staked(),
                self.ledger.total_supply()
            )));
        }
        Ok(())
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn config(&self) -> &DaoConfig {
        &self.config
    }

    /// Claimable balance of `account`.
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.ledger.balance_of(account)
    }

    pub fn has_claimed(&self, account: &Address) -> bool {
        self.ledger.has_claimed(account)
    }

    pub fn voting_power_of(&self, account: &Address) -> U256 {
        self.staking.voting_power_of(account)
    }

    pub fn stake_of(&self, account: &Address) -> Option<Stake> {
        self.staking.stake_of(account).copied()
    }

    pub fn total_staked(&self) -> U256 {
        self.staking.total_staked()
    }

    pub fn total_supply(&self) -> U256 {
        self.ledger.total_supply()
    }

    pub fn proposal(&self, proposal_id: u64) -> Result<&Proposal, GovernanceError> {
        self.governance.get(proposal_id)
    }

    /// State of a proposal at the current time.
    pub fn state(&self, proposal_id: u64) -> Result<ProposalState, GovernanceError> {
        let state = self.governance.state(proposal_id, self.clock.now())?;
        tracing::debug!("Proposal #{} is {:?}", proposal_id, state);
        Ok(state)
    }

    /// Outcome of a proposal whose voting window has closed.
    pub fn tally(&self, proposal_id: u64) -> Result<Tally, GovernanceError> {
        self.governance.tally(proposal_id, self.clock.now())
    }

    pub fn receipt(&self, proposal_id: u64, voter: &Address) -> Result<Option<VoteReceipt>, GovernanceError> {
        self.governance.receipt(proposal_id, voter)
    }

    /// All proposals in id order.
    pub fn proposals(&self) -> Vec<&Proposal> {
        self.governance.proposals().collect()
    }

    pub fn timelock_entry(&self, proposal_id: u64) -> Option<TimelockEntry> {
        self.timelock.entry(proposal_id).copied()
    }

    /// Every accepted mutation since creation, oldest first. The log is
    /// never truncated and grows for the life of the DAO.
    pub fn events(&self) -> &[DaoEvent] {
        &self.events
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::executor::{NoopExecutor, RecordingExecutor};

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    fn tokens(n: u64) -> U256 {
        U256::tokens(n).unwrap()
    }

    fn dev_dao(exec: Box<dyn ActionExecutor>) -> (Dao, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let dao = Dao::new(DaoConfig::development(), exec, clock.clone()).unwrap();
        (dao, clock)
    }

    fn store(n: u64) -> ProposalAction {
        ProposalAction::new(Address::from_label("box"), format!("store:{}", n).into_bytes())
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = DaoConfig::development();
        config.voting_period = 0;
        let clock = Arc::new(ManualClock::new(0));
        assert!(matches!(
            Dao::new(config, Box::new(NoopExecutor), clock),
            Err(GovernanceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_claim_once() {
        let (mut dao, _clock) = dev_dao(Box::new(NoopExecutor));
        assert_eq!(dao.claim_tokens(alice()).unwrap(), tokens(1_000));
        assert_eq!(dao.balance_of(&alice()), tokens(1_000));
        assert_eq!(dao.claim_tokens(alice()), Err(GovernanceError::AlreadyClaimed));
        assert!(dao.has_claimed(&alice()));
        assert!(dao.audit().is_ok());
    }

    #[test]
    fn test_propose_charges_fee() {
        let (mut dao, _clock) = dev_dao(Box::new(NoopExecutor));
        dao.claim_tokens(alice()).unwrap();
        dao.stake(alice(), tokens(500)).unwrap();

        let fee = dao.config().entrance_fee;
        let treasury = dao.config().treasury;
        let before = dao.balance_of(&alice());

        dao.propose(alice(), store(77), "Store 77").unwrap();
        assert_eq!(dao.balance_of(&alice()), before.checked_sub(&fee).unwrap());
        assert_eq!(dao.balance_of(&treasury), fee);
        assert!(dao.audit().is_ok());
    }

    #[test]
    fn test_propose_without_fee_has_no_side_effects() {
        let (mut dao, _clock) = dev_dao(Box::new(NoopExecutor));
        dao.claim_tokens(alice()).unwrap();
        dao.stake(alice(), tokens(1_000)).unwrap();

        let result = dao.propose(alice(), store(1), "broke");
        assert!(matches!(result, Err(GovernanceError::InsufficientBalance { .. })));
        assert!(dao.proposals().is_empty());
        assert!(dao.balance_of(&dao.config().treasury).is_zero());
    }

    #[test]
    fn test_propose_requires_stake() {
        let (mut dao, _clock) = dev_dao(Box::new(NoopExecutor));
        dao.claim_tokens(bob()).unwrap();
        assert_eq!(dao.propose(bob(), store(1), "no stake"), Err(GovernanceError::NoVotingPower));
        assert_eq!(dao.balance_of(&bob()), tokens(1_000));
    }

    #[test]
    fn test_reserve_accounts_cannot_participate() {
        let (mut dao, _clock) = dev_dao(Box::new(NoopExecutor));
        let distributor = dao.config().distributor;
        let treasury = dao.config().treasury;

        assert!(matches!(dao.stake(distributor, tokens(1)), Err(GovernanceError::Unauthorized(_))));
        assert!(matches!(dao.stake(treasury, tokens(1)), Err(GovernanceError::Unauthorized(_))));
        assert!(dao.total_staked().is_zero());

        dao.claim_tokens(alice()).unwrap();
        dao.stake(alice(), tokens(100)).unwrap();
        let id = dao.propose(alice(), store(1), "d").unwrap();

        assert!(matches!(
            dao.propose(distributor, store(2), "reserve"),
            Err(GovernanceError::Unauthorized(_))
        ));
        assert!(matches!(
            dao.cast_vote(id, treasury, VoteDirection::For),
            Err(GovernanceError::Unauthorized(_))
        ));
        assert_eq!(dao.proposals().len(), 1);
        assert!(dao.proposal(id).unwrap().for_votes.is_zero());
        assert!(dao.audit().is_ok());
    }

    #[test]
    fn test_full_lifecycle() {
        let exec = RecordingExecutor::new();
        let (mut dao, clock) = dev_dao(Box::new(exec.clone()));
        dao.claim_tokens(alice()).unwrap();
        dao.stake(alice(), tokens(100)).unwrap();

        let id = dao.propose(alice(), store(77), "Store 77").unwrap();
        assert_eq!(dao.state(id).unwrap(), ProposalState::Active);
        dao.cast_vote(id, alice(), VoteDirection::For).unwrap();

        clock.advance(50);
        assert_eq!(dao.state(id).unwrap(), ProposalState::Succeeded);

        let entry = dao.queue(id).unwrap();
        assert_eq!(entry.eta, clock.now());
        assert_eq!(dao.queue(id), Err(GovernanceError::AlreadyQueued(id)));

        dao.execute(id).unwrap();
        assert_eq!(dao.state(id).unwrap(), ProposalState::Executed);
        assert_eq!(exec.calls(), vec![(id, store(77))]);
        assert_eq!(dao.execute(id), Err(GovernanceError::AlreadyExecuted(id)));
        assert!(dao.timelock_entry(id).unwrap().executed);
        assert_eq!(dao.events().last().and_then(|e| e.proposal_id()), Some(id));
    }

    #[test]
    fn test_queue_before_success() {
        let (mut dao, _clock) = dev_dao(Box::new(NoopExecutor));
        dao.claim_tokens(alice()).unwrap();
        dao.stake(alice(), tokens(100)).unwrap();
        let id = dao.propose(alice(), store(1), "d").unwrap();
        assert_eq!(dao.queue(id), Err(GovernanceError::NotSucceeded(id)));
        assert_eq!(dao.execute(id), Err(GovernanceError::NotQueued(id)));
    }

    #[test]
    fn test_execute_canceled_while_queued() {
        let (mut dao, clock) = dev_dao(Box::new(NoopExecutor));
        dao.claim_tokens(alice()).unwrap();
        dao.stake(alice(), tokens(100)).unwrap();
        let id = dao.propose(alice(), store(1), "d").unwrap();
        dao.cast_vote(id, alice(), VoteDirection::For).unwrap();
        clock.advance(50);
        dao.queue(id).unwrap();

        assert_eq!(dao.cancel(id, alice()).unwrap(), ProposalState::Queued);
        assert_eq!(dao.execute(id), Err(GovernanceError::TerminalState(id)));
        assert_eq!(dao.queue(id), Err(GovernanceError::AlreadyQueued(id)));
    }

    #[test]
    fn test_audit_halts_on_violation() {
        let (mut dao, _clock) = dev_dao(Box::new(NoopExecutor));
        dao.claim_tokens(alice()).unwrap();

        // Mint out of thin air
        dao.ledger.credit(bob(), U256::ONE).unwrap();

        assert!(matches!(dao.audit(), Err(GovernanceError::InvariantViolation(_))));
        assert!(dao.is_halted());
        assert!(matches!(
            dao.stake(alice(), tokens(1)),
            Err(GovernanceError::InvariantViolation(_))
        ));
        assert!(matches!(
            dao.claim_tokens(bob()),
            Err(GovernanceError::InvariantViolation(_))
        ));

        // Queries still answer
        assert_eq!(dao.balance_of(&alice()), tokens(1_000));
        assert!(matches!(dao.events().last(), Some(DaoEvent::Halted { .. })));
    }
}

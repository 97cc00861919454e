//! Proposal registry: creation, voting, tallying and state transitions.

use std::collections::{BTreeMap, HashSet};
use agora_types::{Address, Timestamp, U256};
use crate::error::GovernanceError;
use crate::proposal::{Proposal, ProposalAction, ProposalState, Tally, VoteDirection, VoteReceipt};
use crate::staking::StakingModule;

/// Voting parameters applied to new proposals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingParams {
    /// Delay between creation and the start of voting (seconds)
    pub voting_delay: u64,
    /// Length of the voting window (seconds)
    pub voting_period: u64,
    /// Share of the staked supply that must vote (0-100)
    pub quorum_percentage: u8,
    /// How long a passed proposal stays executable
    pub grace_period: Option<u64>,
}

/// Governance module owning every proposal.
#[derive(Debug)]
pub struct Governance {
    proposals: BTreeMap<u64, Proposal>,
    next_id: u64,
    params: VotingParams,
    /// Accounts allowed to cancel any proposal
    cancellers: HashSet<Address>,
}

impl Governance {
    /// Create a new registry.
    pub fn new(params: VotingParams, cancellers: impl IntoIterator<Item = Address>) -> Self {
        Self {
            proposals: BTreeMap::new(),
            next_id: 1,
            params,
            cancellers: cancellers.into_iter().collect(),
        }
    }

    /// Voting parameters for new proposals.
    pub fn params(&self) -> &VotingParams {
        &self.params
    }

    /// Check that `proposer` may submit a proposal.
    pub fn ensure_can_propose(
        &self,
        proposer: &Address,
        staking: &StakingModule,
    ) -> Result<(), GovernanceError> {
        if staking.voting_power_of(proposer).is_zero() {
            return Err(GovernanceError::NoVotingPower);
        }
        Ok(())
    }

    /// Create a proposal. The quorum denominator is frozen here.
    pub fn propose(
        &mut self,
        proposer: Address,
        action: ProposalAction,
        description: String,
        staking: &StakingModule,
        now: Timestamp,
    ) -> Result<u64, GovernanceError> {
        self.ensure_can_propose(&proposer, staking)?;

        let id = self.next_id;
        let next_id = id.checked_add(1).ok_or(GovernanceError::Overflow)?;

        let proposal = Proposal::new(
            id,
            proposer,
            action,
            description,
            now,
            self.params.voting_delay,
            self.params.voting_period,
            staking.total_staked(),
            self.params.quorum_percentage,
        )?;

        self.proposals.insert(id, proposal);
        self.next_id = next_id;
        Ok(id)
    }

    /// Cast a vote with the voter's current stake as weight.
    pub fn cast_vote(
        &mut self,
        proposal_id: u64,
        voter: Address,
        direction: VoteDirection,
        staking: &StakingModule,
        now: Timestamp,
    ) -> Result<U256, GovernanceError> {
        let weight = staking.voting_power_of(&voter);
        let proposal = self.get_mut(proposal_id)?;
        proposal.cast_vote(voter, direction, weight, now)?;
        Ok(weight)
    }

    /// Tally a proposal whose voting window has closed.
    pub fn tally(&self, proposal_id: u64, now: Timestamp) -> Result<Tally, GovernanceError> {
        self.get(proposal_id)?.tally(now)
    }

    /// State of a proposal at `now`.
    pub fn state(&self, proposal_id: u64, now: Timestamp) -> Result<ProposalState, GovernanceError> {
        Ok(self.get(proposal_id)?.state(now, self.params.grace_period))
    }

    /// Cancel a proposal. Allowed for the proposer and for cancellers.
    pub fn cancel(
        &mut self,
        proposal_id: u64,
        caller: Address,
        now: Timestamp,
    ) -> Result<ProposalState, GovernanceError> {
        let grace = self.params.grace_period;
        let is_canceller = self.cancellers.contains(&caller);
        let proposal = self.get_mut(proposal_id)?;

        if caller != proposal.proposer && !is_canceller {
            return Err(GovernanceError::Unauthorized(format!(
                "{} may not cancel proposal {}",
                caller, proposal_id
            )));
        }

        let previous = proposal.state(now, grace);
        if !previous.is_cancelable() {
            return Err(GovernanceError::TerminalState(proposal_id));
        }

        proposal.canceled_at = Some(now);
        Ok(previous)
    }

    /// Record that a succeeded proposal entered the timelock.
    pub fn mark_queued(
        &mut self,
        proposal_id: u64,
        eta: Timestamp,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        let grace = self.params.grace_period;
        let proposal = self.get_mut(proposal_id)?;

        match proposal.state(now, grace) {
            ProposalState::Succeeded => {
                proposal.eta = Some(eta);
                Ok(())
            }
            ProposalState::Queued => Err(GovernanceError::AlreadyQueued(proposal_id)),
            _ => Err(GovernanceError::NotSucceeded(proposal_id)),
        }
    }

    /// Check that a queued proposal may be executed at `now`.
    pub fn ensure_executable(&self, proposal_id: u64, now: Timestamp) -> Result<(), GovernanceError> {
        match self.state(proposal_id, now)? {
            ProposalState::Queued => Ok(()),
            ProposalState::Executed => Err(GovernanceError::AlreadyExecuted(proposal_id)),
            ProposalState::Expired => Err(GovernanceError::Expired(proposal_id)),
            ProposalState::Canceled => Err(GovernanceError::TerminalState(proposal_id)),
            _ => Err(GovernanceError::NotQueued(proposal_id)),
        }
    }

    /// Record a completed execution.
    pub fn mark_executed(&mut self, proposal_id: u64, now: Timestamp) -> Result<(), GovernanceError> {
        self.ensure_executable(proposal_id, now)?;
        let proposal = self.get_mut(proposal_id)?;
        proposal.executed_at = Some(now);
        Ok(())
    }

    /// Get a proposal.
    pub fn get(&self, proposal_id: u64) -> Result<&Proposal, GovernanceError> {
        self.proposals
            .get(&proposal_id)
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))
    }

    fn get_mut(&mut self, proposal_id: u64) -> Result<&mut Proposal, GovernanceError> {
        self.proposals
            .get_mut(&proposal_id)
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))
    }

    /// Vote of `voter` on a proposal.
    pub fn receipt(&self, proposal_id: u64, voter: &Address) -> Result<Option<VoteReceipt>, GovernanceError> {
        Ok(self.get(proposal_id)?.receipt(voter).copied())
    }

    /// All proposals in id order.
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    /// Proposals in `state` at `now`.
    pub fn by_state(&self, state: ProposalState, now: Timestamp) -> Vec<&Proposal> {
        let grace = self.params.grace_period;
        self.proposals
            .values()
            .filter(|p| p.state(now, grace) == state)
            .collect()
    }

    /// Number of proposals ever created.
    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::BalanceLedger;

    const NO_CANCELLERS: [Address; 0] = [];

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn params(quorum: u8) -> VotingParams {
        VotingParams {
            voting_delay: 10,
            voting_period: 50,
            quorum_percentage: quorum,
            grace_period: None,
        }
    }

    /// Ledger + staking with accounts 1..=n staking `amounts[i]`.
    fn staked(amounts: &[u64]) -> (BalanceLedger, StakingModule) {
        let mut ledger = BalanceLedger::genesis(addr(0), U256::from(1_000_000u64));
        let mut staking = StakingModule::new();
        for (i, amount) in amounts.iter().enumerate() {
            let account = addr(i as u8 + 1);
            ledger.transfer(addr(0), account, U256::from(*amount)).unwrap();
            staking.stake(&mut ledger, account, U256::from(*amount), 0).unwrap();
        }
        (ledger, staking)
    }

    fn action() -> ProposalAction {
        ProposalAction::new(addr(0xee), b"store:77".to_vec())
    }

    #[test]
    fn test_propose_requires_voting_power() {
        let (_ledger, staking) = staked(&[100]);
        let mut gov = Governance::new(params(4), NO_CANCELLERS);

        assert_eq!(
            gov.propose(addr(9), action(), "nope".into(), &staking, 0),
            Err(GovernanceError::NoVotingPower)
        );
        assert_eq!(gov.proposal_count(), 0);

        let id = gov.propose(addr(1), action(), "Store 77".into(), &staking, 0).unwrap();
        assert_eq!(id, 1);
        assert_eq!(gov.get(id).unwrap().quorum_snapshot, U256::from(100u64));
        assert_eq!(gov.state(id, 0).unwrap(), ProposalState::Pending);
        assert_eq!(gov.state(id, 10).unwrap(), ProposalState::Active);

        let id2 = gov.propose(addr(1), action(), "again".into(), &staking, 0).unwrap();
        assert_eq!(id2, 2);
    }

    #[test]
    fn test_propose_window_overflow() {
        let (_ledger, staking) = staked(&[100]);
        let mut gov = Governance::new(
            VotingParams {
                voting_delay: u64::MAX,
                ..params(4)
            },
            NO_CANCELLERS,
        );

        assert_eq!(
            gov.propose(addr(1), action(), "late".into(), &staking, 1),
            Err(GovernanceError::Overflow)
        );
        assert_eq!(gov.proposal_count(), 0);
    }

    #[test]
    fn test_weight_captured_at_cast_time() {
        let (mut ledger, mut staking) = staked(&[100, 100]);
        let mut gov = Governance::new(params(0), NO_CANCELLERS);
        let id = gov.propose(addr(1), action(), "d".into(), &staking, 0).unwrap();

        let weight = gov.cast_vote(id, addr(1), VoteDirection::For, &staking, 10).unwrap();
        assert_eq!(weight, U256::from(100u64));

        // Staking more after voting does not change the recorded vote
        ledger.transfer(addr(0), addr(1), U256::from(500u64)).unwrap();
        staking.stake(&mut ledger, addr(1), U256::from(500u64), 11).unwrap();
        assert_eq!(
            gov.cast_vote(id, addr(1), VoteDirection::For, &staking, 12),
            Err(GovernanceError::AlreadyVoted(id))
        );
        assert_eq!(gov.get(id).unwrap().for_votes, U256::from(100u64));
    }

    #[test]
    fn test_quorum_snapshot_is_frozen() {
        // 25% of 400 = 100
        let (mut ledger, mut staking) = staked(&[300, 100]);
        let mut gov = Governance::new(params(25), NO_CANCELLERS);
        let id = gov.propose(addr(1), action(), "d".into(), &staking, 0).unwrap();

        gov.cast_vote(id, addr(2), VoteDirection::For, &staking, 10).unwrap();

        // Live supply grows tenfold after creation
        ledger.transfer(addr(0), addr(3), U256::from(4_000u64)).unwrap();
        staking.stake(&mut ledger, addr(3), U256::from(4_000u64), 20).unwrap();

        let tally = gov.tally(id, 60).unwrap();
        assert_eq!(tally.quorum_required, U256::from(100u64));
        assert!(tally.quorum_reached);
        assert_eq!(gov.state(id, 60).unwrap(), ProposalState::Succeeded);
    }

    #[test]
    fn test_cancel_rules() {
        let (_ledger, staking) = staked(&[100, 100]);
        let guardian = addr(0x77);
        let mut gov = Governance::new(params(0), [guardian]);
        let id = gov.propose(addr(1), action(), "d".into(), &staking, 0).unwrap();

        assert!(matches!(gov.cancel(id, addr(2), 5), Err(GovernanceError::Unauthorized(_))));
        assert_eq!(gov.cancel(id, guardian, 5).unwrap(), ProposalState::Pending);
        assert_eq!(gov.state(id, 5).unwrap(), ProposalState::Canceled);
        assert_eq!(gov.cancel(id, addr(1), 6), Err(GovernanceError::TerminalState(id)));

        // Canceled proposals accept no votes
        assert_eq!(
            gov.cast_vote(id, addr(1), VoteDirection::For, &staking, 10),
            Err(GovernanceError::NotActive(id))
        );
    }

    #[test]
    fn test_cancel_defeated_is_terminal() {
        let (_ledger, staking) = staked(&[100]);
        let mut gov = Governance::new(params(50), NO_CANCELLERS);
        let id = gov.propose(addr(1), action(), "d".into(), &staking, 0).unwrap();
        assert_eq!(gov.state(id, 60).unwrap(), ProposalState::Defeated);
        assert_eq!(gov.cancel(id, addr(1), 60), Err(GovernanceError::TerminalState(id)));
    }

    #[test]
    fn test_mark_queued_requires_success() {
        let (_ledger, staking) = staked(&[100]);
        let mut gov = Governance::new(params(0), NO_CANCELLERS);
        let id = gov.propose(addr(1), action(), "d".into(), &staking, 0).unwrap();

        assert_eq!(gov.mark_queued(id, 100, 30), Err(GovernanceError::NotSucceeded(id)));
        gov.cast_vote(id, addr(1), VoteDirection::For, &staking, 30).unwrap();
        gov.mark_queued(id, 100, 60).unwrap();
        assert_eq!(gov.state(id, 60).unwrap(), ProposalState::Queued);
        assert_eq!(gov.mark_queued(id, 100, 61), Err(GovernanceError::AlreadyQueued(id)));
        assert_eq!(gov.by_state(ProposalState::Queued, 61).len(), 1);
    }

    #[test]
    fn test_unknown_proposal() {
        let (_ledger, staking) = staked(&[100]);
        let mut gov = Governance::new(params(0), NO_CANCELLERS);
        assert_eq!(gov.state(42, 0), Err(GovernanceError::ProposalNotFound(42)));
        assert_eq!(
            gov.cast_vote(42, addr(1), VoteDirection::For, &staking, 0),
            Err(GovernanceError::ProposalNotFound(42))
        );
    }
}

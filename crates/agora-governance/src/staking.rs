//! Staking: locks ledger balance to obtain voting power.
//!
//! Voting power is the live staked balance. Snapshotting is the caller's job;
//! the governance module captures weights at proposal creation and at vote
//! time.

use std::collections::{HashMap, HashSet};
use agora_types::{Address, Timestamp, U256};
use crate::error::GovernanceError;
use crate::ledger::BalanceLedger;

/// Stake record for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stake {
    /// Amount of tokens staked
    pub amount: U256,
    /// When the account went from zero to non-zero stake
    pub since: Timestamp,
}

/// Owner of all stake records.
#[derive(Debug, Clone, Default)]
pub struct StakingModule {
    stakes: HashMap<Address, Stake>,
    /// Running total of every stake
    total_staked: U256,
    /// Accounts whose stake failed an internal consistency check
    frozen: HashSet<Address>,
}

impl StakingModule {
    /// Create an empty staking module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `amount` from the account's claimable balance into its stake.
    pub fn stake(
        &mut self,
        ledger: &mut BalanceLedger,
        account: Address,
        amount: U256,
        now: Timestamp,
    ) -> Result<U256, GovernanceError> {
        if amount.is_zero() {
            return Err(GovernanceError::ZeroAmount);
        }
        self.ensure_not_frozen(&account)?;

        let current = self.voting_power_of(&account);
        let new_amount = current.checked_add(&amount).ok_or(GovernanceError::Overflow)?;
        let new_total = self
            .total_staked
            .checked_add(&amount)
            .ok_or(GovernanceError::Overflow)?;

        ledger.debit(account, amount)?;

        let since = self.stakes.get(&account).map(|s| s.since).unwrap_or(now);
        self.stakes.insert(account, Stake { amount: new_amount, since });
        self.total_staked = new_total;

        Ok(new_amount)
    }

    /// Return `amount` of the account's stake to its claimable balance.
    pub fn unstake(
        &mut self,
        ledger: &mut BalanceLedger,
        account: Address,
        amount: U256,
    ) -> Result<U256, GovernanceError> {
        if amount.is_zero() {
            return Err(GovernanceError::ZeroAmount);
        }
        self.ensure_not_frozen(&account)?;

        let staked = self.voting_power_of(&account);
        if amount > staked {
            return Err(GovernanceError::InsufficientStake {
                required: amount,
                staked,
            });
        }

        let remaining = staked.checked_sub(&amount).ok_or(GovernanceError::Underflow)?;
        let new_total = match self.total_staked.checked_sub(&amount) {
            Some(total) => total,
            None => {
                // The running total is smaller than one account's stake.
                self.frozen.insert(account);
                return Err(GovernanceError::InvariantViolation(format!(
                    "total staked {} below stake of {}",
                    self.total_staked, account
                )));
            }
        };

        ledger.credit(account, amount)?;

        if remaining.is_zero() {
            self.stakes.remove(&account);
        } else if let Some(stake) = self.stakes.get_mut(&account) {
            stake.amount = remaining;
        }
        self.total_staked = new_total;

        Ok(remaining)
    }

    /// Current (live) voting power of `account`.
    pub fn voting_power_of(&self, account: &Address) -> U256 {
        self.stakes.get(account).map(|s| s.amount).unwrap_or(U256::ZERO)
    }

    /// Stake record of `account`, if it has one.
    pub fn stake_of(&self, account: &Address) -> Option<&Stake> {
        self.stakes.get(account)
    }

    /// Sum of all stakes.
    pub fn total_staked(&self) -> U256 {
        self.total_staked
    }

    /// Number of accounts with a non-zero stake.
    pub fn staker_count(&self) -> usize {
        self.stakes.len()
    }

    /// Check if `account` has been frozen by a failed consistency check.
    pub fn is_frozen(&self, account: &Address) -> bool {
        self.frozen.contains(account)
    }

    /// Recompute the sum of all stakes and compare with the running total.
    pub fn verify_conservation(&self) -> Result<(), GovernanceError> {
        let sum = self
            .stakes
            .values()
            .try_fold(U256::ZERO, |acc, s| acc.checked_add(&s.amount))
            .ok_or_else(|| GovernanceError::InvariantViolation("stake sum overflows".into()))?;

        if sum != self.total_staked {
            return Err(GovernanceError::InvariantViolation(format!(
                "sum of stakes {} != total staked {}",
                sum, self.total_staked
            )));
        }
        Ok(())
    }

    fn ensure_not_frozen(&self, account: &Address) -> Result<(), GovernanceError> {
        if self.frozen.contains(account) {
            return Err(GovernanceError::InvariantViolation(format!(
                "stake of {} is frozen",
                account
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (BalanceLedger, StakingModule, Address) {
        let alice = Address::from_bytes([1u8; 20]);
        let ledger = BalanceLedger::genesis(alice, U256::from(1_000u64));
        (ledger, StakingModule::new(), alice)
    }

    #[test]
    fn test_stake_moves_balance() {
        let (mut ledger, mut staking, alice) = setup();

        staking.stake(&mut ledger, alice, U256::from(400u64), 10).unwrap();
        assert_eq!(ledger.balance_of(&alice), U256::from(600u64));
        assert_eq!(staking.voting_power_of(&alice), U256::from(400u64));
        assert_eq!(staking.total_staked(), U256::from(400u64));
        assert_eq!(staking.stake_of(&alice).unwrap().since, 10);

        // Topping up keeps the original timestamp
        staking.stake(&mut ledger, alice, U256::from(100u64), 20).unwrap();
        assert_eq!(staking.stake_of(&alice).unwrap().since, 10);
        assert_eq!(staking.voting_power_of(&alice), U256::from(500u64));
    }

    #[test]
    fn test_stake_zero_fails() {
        let (mut ledger, mut staking, alice) = setup();
        assert_eq!(
            staking.stake(&mut ledger, alice, U256::ZERO, 0),
            Err(GovernanceError::ZeroAmount)
        );
    }

    #[test]
    fn test_stake_insufficient_balance() {
        let (mut ledger, mut staking, alice) = setup();
        let result = staking.stake(&mut ledger, alice, U256::from(1_001u64), 0);
        assert!(matches!(result, Err(GovernanceError::InsufficientBalance { .. })));
        assert_eq!(staking.total_staked(), U256::ZERO);
        assert_eq!(ledger.balance_of(&alice), U256::from(1_000u64));
    }

    #[test]
    fn test_unstake() {
        let (mut ledger, mut staking, alice) = setup();
        staking.stake(&mut ledger, alice, U256::from(400u64), 0).unwrap();

        let result = staking.unstake(&mut ledger, alice, U256::from(401u64));
        assert!(matches!(result, Err(GovernanceError::InsufficientStake { .. })));

        assert_eq!(staking.unstake(&mut ledger, alice, U256::from(150u64)).unwrap(), U256::from(250u64));
        assert_eq!(ledger.balance_of(&alice), U256::from(750u64));

        // Full unstake removes the record
        staking.unstake(&mut ledger, alice, U256::from(250u64)).unwrap();
        assert!(staking.stake_of(&alice).is_none());
        assert_eq!(staking.staker_count(), 0);
        assert_eq!(ledger.balance_of(&alice), U256::from(1_000u64));
    }

    #[test]
    fn test_round_trip_restores_split() {
        let (mut ledger, mut staking, alice) = setup();
        staking.stake(&mut ledger, alice, U256::from(300u64), 0).unwrap();
        let before = (ledger.balance_of(&alice), staking.voting_power_of(&alice));

        staking.stake(&mut ledger, alice, U256::from(200u64), 5).unwrap();
        staking.unstake(&mut ledger, alice, U256::from(200u64)).unwrap();

        assert_eq!(before, (ledger.balance_of(&alice), staking.voting_power_of(&alice)));
        assert!(staking.verify_conservation().is_ok());
    }

    #[test]
    fn test_corrupted_total_freezes_account() {
        let (mut ledger, mut staking, alice) = setup();
        staking.stake(&mut ledger, alice, U256::from(300u64), 0).unwrap();
        staking.total_staked = U256::from(100u64);

        assert!(staking.verify_conservation().is_err());
        let err = staking.unstake(&mut ledger, alice, U256::from(200u64)).unwrap_err();
        assert!(err.is_fatal());
        assert!(staking.is_frozen(&alice));

        // Nothing moved, and further mutation is refused
        assert_eq!(ledger.balance_of(&alice), U256::from(700u64));
        assert!(staking.stake(&mut ledger, alice, U256::from(1u64), 0).unwrap_err().is_fatal());
    }
}

//! Balance ledger for the governance token.
//!
//! Tracks claimable balances per account. Staked tokens leave the ledger
//! through `debit` and are held by the staking module until unstaked.

use std::collections::{HashMap, HashSet};
use agora_types::{Address, U256};
use crate::error::GovernanceError;

/// Claimable balances for one fungible unit of account.
#[derive(Debug, Clone)]
pub struct BalanceLedger {
    balances: HashMap<Address, U256>,
    /// Accounts that already took their distribution allotment
    claimed: HashSet<Address>,
    /// Account holding the undistributed supply
    distributor: Address,
    total_supply: U256,
}

impl BalanceLedger {
    /// Create a ledger with `initial_supply` credited to `distributor`.
    pub fn genesis(distributor: Address, initial_supply: U256) -> Self {
        let mut balances = HashMap::new();
        if !initial_supply.is_zero() {
            balances.insert(distributor, initial_supply);
        }

        Self {
            balances,
            claimed: HashSet::new(),
            distributor,
            total_supply: initial_supply,
        }
    }

    /// Claimable balance of `account`.
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or(U256::ZERO)
    }

    /// Add `amount` to `account`.
    pub fn credit(&mut self, account: Address, amount: U256) -> Result<U256, GovernanceError> {
        let updated = self
            .balance_of(&account)
            .checked_add(&amount)
            .ok_or(GovernanceError::Overflow)?;
        self.write(account, updated);
        Ok(updated)
    }

    /// Remove `amount` from `account`.
    pub fn debit(&mut self, account: Address, amount: U256) -> Result<U256, GovernanceError> {
        let available = self.balance_of(&account);
        if amount > available {
            return Err(GovernanceError::InsufficientBalance {
                required: amount,
                available,
            });
        }

        let updated = available
            .checked_sub(&amount)
            .ok_or(GovernanceError::Underflow)?;
        self.write(account, updated);
        Ok(updated)
    }

    /// Move `amount` between two accounts. Both sides are validated before
    /// either is written.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), GovernanceError> {
        let available = self.balance_of(&from);
        if amount > available {
            return Err(GovernanceError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if from == to || amount.is_zero() {
            return Ok(());
        }

        let from_balance = available
            .checked_sub(&amount)
            .ok_or(GovernanceError::Underflow)?;
        let to_balance = self
            .balance_of(&to)
            .checked_add(&amount)
            .ok_or(GovernanceError::Overflow)?;

        self.write(from, from_balance);
        self.write(to, to_balance);
        Ok(())
    }

    /// One-time distribution of `amount` from the distributor to `account`.
    pub fn claim(&mut self, account: Address, amount: U256) -> Result<(), GovernanceError> {
        if self.claimed.contains(&account) {
            return Err(GovernanceError::AlreadyClaimed);
        }

        self.transfer(self.distributor, account, amount)?;
        self.claimed.insert(account);
        Ok(())
    }

    /// Check if `account` already claimed.
    pub fn has_claimed(&self, account: &Address) -> bool {
        self.claimed.contains(account)
    }

    /// Account holding the undistributed supply.
    pub fn distributor(&self) -> Address {
        self.distributor
    }

    /// Supply created at genesis.
    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    /// Sum of every claimable balance, or `None` if it does not fit.
    pub fn sum_of_balances(&self) -> Option<U256> {
        self.balances
            .values()
            .try_fold(U256::ZERO, |acc, b| acc.checked_add(b))
    }

    fn write(&mut self, account: Address, balance: U256) {
        if balance.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }
}

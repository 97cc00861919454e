//! Property tests for stake accounting.

use std::sync::Arc;
use agora_governance::{Dao, DaoConfig, ManualClock, NoopExecutor};
use agora_types::{Address, U256};
use proptest::prelude::*;

const ACCOUNTS: usize = 4;

fn new_dao() -> (Dao, Vec<Address>) {
    let mut config = DaoConfig::development();
    config.claim_amount = U256::from(10_000u64);
    let clock = Arc::new(ManualClock::new(0));
    let mut dao = Dao::new(config, Box::new(NoopExecutor), clock).unwrap();

    let accounts: Vec<Address> = (0..ACCOUNTS)
        .map(|i| Address::from_label(&format!("holder-{}", i)))
        .collect();
    for account in &accounts {
        dao.claim_tokens(*account).unwrap();
    }
    (dao, accounts)
}

#[derive(Debug, Clone)]
enum Op {
    Stake(usize, u64),
    Unstake(usize, u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..ACCOUNTS, 0u64..4_000).prop_map(|(i, a)| Op::Stake(i, a)),
        (0..ACCOUNTS, 0u64..4_000).prop_map(|(i, a)| Op::Unstake(i, a)),
    ]
}

proptest! {
    #[test]
    fn test_stake_unstake_roundtrip(idx in 0..ACCOUNTS, amount in 1u64..=10_000) {
        let (mut dao, accounts) = new_dao();
        let account = accounts[idx];
        let before = dao.balance_of(&account);

        dao.stake(account, U256::from(amount)).unwrap();
        prop_assert_eq!(dao.voting_power_of(&account), U256::from(amount));
        dao.unstake(account, U256::from(amount)).unwrap();

        prop_assert_eq!(dao.balance_of(&account), before);
        prop_assert!(dao.voting_power_of(&account).is_zero());
        prop_assert!(dao.total_staked().is_zero());
    }

    #[test]
    fn test_conservation_under_random_ops(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let (mut dao, accounts) = new_dao();

        for op in ops {
            // Rejections are fine; they must leave state consistent
            let _ = match op {
                Op::Stake(i, a) => dao.stake(accounts[i], U256::from(a)),
                Op::Unstake(i, a) => dao.unstake(accounts[i], U256::from(a)),
            };

            let sum = accounts
                .iter()
                .map(|a| dao.voting_power_of(a))
                .try_fold(U256::ZERO, |acc, p| acc.checked_add(&p))
                .unwrap();
            prop_assert_eq!(sum, dao.total_staked());
            prop_assert!(dao.audit().is_ok());
        }

        for account in &accounts {
            let claimable = dao.balance_of(account);
            let staked = dao.voting_power_of(account);
            prop_assert_eq!(claimable.checked_add(&staked).unwrap(), U256::from(10_000u64));
        }
    }
}

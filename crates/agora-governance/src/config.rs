//! DAO parameters and network presets.

use agora_types::{Address, U256};
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;
use crate::governance::VotingParams;

/// One hour in seconds.
pub const HOUR: u64 = 3_600;
/// One day in seconds.
pub const DAY: u64 = 24 * HOUR;
/// One week in seconds.
pub const WEEK: u64 = 7 * DAY;

/// Networks that run with instant, zero-delay parameters.
pub const DEVELOPMENT_NETWORKS: &[&str] = &["hardhat", "localhost", "dev", "development"];

/// 0.01 tokens
const CENT: U256 = U256::from_u64(10_000_000_000_000_000);

/// Whole tokens as base units.
const fn tokens(whole: u128) -> U256 {
    U256::from_u128(whole * 1_000_000_000_000_000_000)
}

/// Configuration of one DAO instance.
/// These can be loaded from TOML; amounts are decimal strings of base units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoConfig {
    /// Fee charged to a proposer, paid into the treasury
    pub entrance_fee: U256,
    /// Share of the staked supply that must vote (0-100)
    pub quorum_percentage: u8,
    pub voting_delay: u64,             // seconds from creation to voting start
    pub voting_period: u64,            // seconds of open voting
    pub min_delay: u64,                // timelock delay in seconds
    pub initial_supply: U256,
    /// Allotment handed out by the faucet claim
    pub claim_amount: U256,
    /// How long a passed proposal stays executable; unset means forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period: Option<u64>,
    /// Holder of the undistributed supply
    pub distributor: Address,
    /// Receiver of entrance fees
    pub treasury: Address,
    /// Accounts allowed to cancel any proposal
    #[serde(default)]
    pub cancellers: Vec<Address>,
}

impl Default for DaoConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl DaoConfig {
    /// Local development: no delays, no quorum, short voting window.
    pub fn development() -> Self {
        Self {
            entrance_fee: CENT,
            quorum_percentage: 0,
            voting_delay: 0,
            voting_period: 50,
            min_delay: 0,
            initial_supply: tokens(1_000_000),
            claim_amount: tokens(1_000),
            grace_period: None,
            distributor: Address::from_label("distributor"),
            treasury: Address::from_label("treasury"),
            cancellers: Vec::new(),
        }
    }

    /// Public test network parameters
    pub fn testnet() -> Self {
        let mut config = Self::development();
        config.quorum_percentage = 50;
        config.voting_delay = HOUR;
        config.voting_period = WEEK;
        config.min_delay = 2 * DAY;
        config.grace_period = Some(14 * DAY);
        config
    }

    /// Resolve a preset by network name.
    pub fn for_network(name: &str) -> Result<Self, GovernanceError> {
        if is_development(name) {
            return Ok(Self::development());
        }
        match name {
            "goerli" | "testnet" => Ok(Self::testnet()),
            other => Err(GovernanceError::InvalidConfig(format!("unknown network: {}", other))),
        }
    }

    /// Reject parameter combinations the DAO cannot run with.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.quorum_percentage > 100 {
            return Err(GovernanceError::InvalidConfig(format!(
                "quorum_percentage must be at most 100, got {}",
                self.quorum_percentage
            )));
        }

        if self.voting_period == 0 {
            return Err(GovernanceError::InvalidConfig("voting_period must be positive".into()));
        }

        if self.claim_amount > self.initial_supply {
            return Err(GovernanceError::InvalidConfig(format!(
                "claim_amount {} exceeds initial_supply {}",
                self.claim_amount, self.initial_supply
            )));
        }

        if self.treasury == self.distributor {
            return Err(GovernanceError::InvalidConfig(
                "treasury and distributor must differ".into(),
            ));
        }

        Ok(())
    }

    /// Parameters handed to the governance module.
    pub fn voting_params(&self) -> VotingParams {
        VotingParams {
            voting_delay: self.voting_delay,
            voting_period: self.voting_period,
            quorum_percentage: self.quorum_percentage,
            grace_period: self.grace_period,
        }
    }
}

/// Check if `network` runs with development parameters.
pub fn is_development(network: &str) -> bool {
    DEVELOPMENT_NETWORKS.contains(&network)
}

//! Scripted DAO simulations.
//!
//! A script is a TOML list of `[[step]]` tables run in order against a fresh
//! DAO driven by a manual clock. Participants are named; each name maps to a
//! deterministic address. Amounts are token strings such as `"100"` or
//! `"0.5"`.

use std::path::Path;
use std::sync::Arc;
use agora_governance::{
    Clock, Dao, DaoConfig, DaoEvent, ManualClock, ProposalAction, SharedDao, VoteDirection,
};
use agora_types::{Address, Timestamp, U256};
use serde::{Deserialize, Serialize};
use crate::executor::ValueStore;

/// Simulation script.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Clock value before the first step
    #[serde(default)]
    pub start_time: Timestamp,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read script '{}': {}", path.display(), e))?;
        Self::parse(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse script '{}': {}", path.display(), e))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// One script step.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,
    /// Abort the run if this step is rejected
    #[serde(default)]
    pub expect_ok: bool,
}

/// Vote direction as written in scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    For,
    Against,
    Abstain,
}

impl From<Direction> for VoteDirection {
    fn from(d: Direction) -> Self {
        match d {
            Direction::For => VoteDirection::For,
            Direction::Against => VoteDirection::Against,
            Direction::Abstain => VoteDirection::Abstain,
        }
    }
}

/// Operation performed by a step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Claim { account: String },
    Stake { account: String, amount: String },
    Unstake { account: String, amount: String },
    Propose {
        proposer: String,
        #[serde(default = "default_target")]
        target: String,
        payload: String,
        #[serde(default)]
        description: String,
    },
    Vote { proposal: u64, voter: String, direction: Direction },
    Advance { seconds: u64 },
    Queue { proposal: u64 },
    Execute { proposal: u64 },
    Cancel { proposal: u64, caller: String },
    Tally { proposal: u64 },
}

fn default_target() -> String {
    "box".to_string()
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Claim { .. } => "claim",
            Action::Stake { .. } => "stake",
            Action::Unstake { .. } => "unstake",
            Action::Propose { .. } => "propose",
            Action::Vote { .. } => "vote",
            Action::Advance { .. } => "advance",
            Action::Queue { .. } => "queue",
            Action::Execute { .. } => "execute",
            Action::Cancel { .. } => "cancel",
            Action::Tally { .. } => "tally",
        }
    }
}

/// Result of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub action: &'static str,
    pub time: Timestamp,
    pub ok: bool,
    pub detail: String,
}

/// Result of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub steps: Vec<StepOutcome>,
    /// Value in the governed box at the end
    pub stored_value: Option<u64>,
    pub final_time: Timestamp,
    pub total_staked: U256,
    pub events: Vec<DaoEvent>,
}

/// `0x`-prefixed hex is taken literally; anything else is a participant name.
pub fn resolve_account(name: &str) -> anyhow::Result<Address> {
    if name.starts_with("0x") {
        Ok(name.parse()?)
    } else {
        Ok(Address::from_label(name))
    }
}

/// Run `script` against a fresh DAO built from `config`.
pub fn run(script: &Script, config: DaoConfig) -> anyhow::Result<SimulationReport> {
    let clock = Arc::new(ManualClock::new(script.start_time));
    let store = ValueStore::new();
    let dao = SharedDao::new(Dao::new(config, Box::new(store.clone()), clock.clone())?);

    let mut steps = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        let result = apply(&dao, &clock, &step.action);
        let outcome = StepOutcome {
            index,
            action: step.action.name(),
            time: clock.now(),
            ok: result.is_ok(),
            detail: match &result {
                Ok(detail) => detail.clone(),
                Err(e) => e.to_string(),
            },
        };

        if let Err(e) = result {
            tracing::debug!("Step {} ({}) rejected: {}", index, outcome.action, e);
            if step.expect_ok {
                anyhow::bail!("Step {} ({}) was expected to succeed: {}", index, outcome.action, e);
            }
        }
        steps.push(outcome);
    }

    dao.audit()?;

    Ok(SimulationReport {
        steps,
        stored_value: store.retrieve(),
        final_time: clock.now(),
        total_staked: dao.total_staked(),
        events: dao.events(),
    })
}

fn apply(dao: &SharedDao, clock: &ManualClock, action: &Action) -> anyhow::Result<String> {
    let detail = match action {
        Action::Claim { account } => {
            let amount = dao.claim_tokens(resolve_account(account)?)?;
            format!("{} claimed {}", account, amount.format_tokens())
        }
        Action::Stake { account, amount } => {
            let total = dao.stake(resolve_account(account)?, U256::parse_tokens(amount)?)?;
            format!("{} staked {} (now {})", account, amount, total.format_tokens())
        }
        Action::Unstake { account, amount } => {
            let remaining = dao.unstake(resolve_account(account)?, U256::parse_tokens(amount)?)?;
            format!("{} unstaked {} (now {})", account, amount, remaining.format_tokens())
        }
        Action::Propose { proposer, target, payload, description } => {
            let action = ProposalAction::new(resolve_account(target)?, payload.as_bytes().to_vec());
            let id = dao.propose(resolve_account(proposer)?, action, description.clone())?;
            let proposal = dao.proposal(id)?;
            format!(
                "proposal #{} voting [{}, {})",
                id, proposal.voting_start, proposal.voting_end
            )
        }
        Action::Vote { proposal, voter, direction } => {
            let weight = dao.cast_vote(*proposal, resolve_account(voter)?, (*direction).into())?;
            format!("{} voted {:?} on #{} with {}", voter, direction, proposal, weight.format_tokens())
        }
        Action::Advance { seconds } => {
            let now = clock.advance(*seconds);
            format!("time is {}", now)
        }
        Action::Queue { proposal } => {
            let entry = dao.queue(*proposal)?;
            format!("#{} executable at {}", proposal, entry.eta)
        }
        Action::Execute { proposal } => {
            dao.execute(*proposal)?;
            format!("#{} executed", proposal)
        }
        Action::Cancel { proposal, caller } => {
            let previous = dao.cancel(*proposal, resolve_account(caller)?)?;
            format!("#{} canceled (was {:?})", proposal, previous)
        }
        Action::Tally { proposal } => {
            let tally = dao.tally(*proposal)?;
            format!(
                "#{} {:?}: for {}, against {}, abstain {}, quorum {} ({})",
                proposal,
                tally.outcome,
                tally.for_votes.format_tokens(),
                tally.against_votes.format_tokens(),
                tally.abstain_votes.format_tokens(),
                tally.quorum_required.format_tokens(),
                if tally.quorum_reached { "reached" } else { "missed" }
            )
        }
    };
    Ok(detail)
}

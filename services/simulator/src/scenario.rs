//! Scenario scripts
//!
//! A scenario is a JSON document listing the steps to replay against a
//! freshly deployed derivative. Amounts are decimal strings in collateral
//! units (`"12.5"`), accounts are hex addresses.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use types::Address;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub collateral: CollateralSpec,

    /// Unix time the simulated clock starts at
    #[serde(default = "default_start_time")]
    pub start_time: u64,

    /// Reference value read at initialization
    #[serde(default = "default_reference")]
    pub opening_value: String,

    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CollateralSpec {
    pub name: String,
    pub symbol: String,
}

impl Default for CollateralSpec {
    fn default() -> Self {
        Self {
            name: "Simulated Collateral".to_string(),
            symbol: "SIM".to_string(),
        }
    }
}

fn default_start_time() -> u64 {
    1_700_000_000
}

fn default_reference() -> String {
    "1".to_string()
}

fn zero() -> String {
    "0".to_string()
}

/// One scripted action; slippage bounds default to zero (no bound) for
/// minimums
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Mint collateral to `account` and approve the derivative for all of it
    Fund { account: Address, amount: String },
    Advance { secs: u64 },
    SetReference { value: String },
    Init { caller: Address },
    Mint { caller: Address, amount: String },
    MintA {
        caller: Address,
        amount: String,
        #[serde(default = "zero")]
        min_out: String,
    },
    MintB {
        caller: Address,
        amount: String,
        #[serde(default = "zero")]
        min_out: String,
    },
    MintExactA {
        caller: Address,
        desired: String,
        max_in: String,
    },
    MintExactB {
        caller: Address,
        desired: String,
        max_in: String,
    },
    MintLp {
        caller: Address,
        amount: String,
        #[serde(default = "zero")]
        min_lp: String,
    },
    Burn { caller: Address, amount: String },
    BurnA {
        caller: Address,
        amount: String,
        #[serde(default = "zero")]
        min_out: String,
    },
    BurnB {
        caller: Address,
        amount: String,
        #[serde(default = "zero")]
        min_out: String,
    },
    BurnExactA {
        caller: Address,
        desired: String,
        max_burn: String,
    },
    BurnExactB {
        caller: Address,
        desired: String,
        max_burn: String,
    },
    BurnLp {
        caller: Address,
        lp: String,
        #[serde(default = "zero")]
        min_out: String,
    },
    SwapAToB {
        caller: Address,
        amount: String,
        #[serde(default = "zero")]
        min_out: String,
    },
    SwapBToA {
        caller: Address,
        amount: String,
        #[serde(default = "zero")]
        min_out: String,
    },
    DepositLp {
        caller: Address,
        a_in: String,
        b_in: String,
        #[serde(default = "zero")]
        min_lp: String,
    },
    WithdrawLp {
        caller: Address,
        a_out: String,
        b_out: String,
        max_lp: String,
    },
    Close { caller: Address },
    Claim { caller: Address },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Fund { .. } => "fund",
            Step::Advance { .. } => "advance",
            Step::SetReference { .. } => "set_reference",
            Step::Init { .. } => "init",
            Step::Mint { .. } => "mint",
            Step::MintA { .. } => "mint_a",
            Step::MintB { .. } => "mint_b",
            Step::MintExactA { .. } => "mint_exact_a",
            Step::MintExactB { .. } => "mint_exact_b",
            Step::MintLp { .. } => "mint_lp",
            Step::Burn { .. } => "burn",
            Step::BurnA { .. } => "burn_a",
            Step::BurnB { .. } => "burn_b",
            Step::BurnExactA { .. } => "burn_exact_a",
            Step::BurnExactB { .. } => "burn_exact_b",
            Step::BurnLp { .. } => "burn_lp",
            Step::SwapAToB { .. } => "swap_a_to_b",
            Step::SwapBToA { .. } => "swap_b_to_a",
            Step::DepositLp { .. } => "deposit_lp",
            Step::WithdrawLp { .. } => "withdraw_lp",
            Step::Close { .. } => "close",
            Step::Claim { .. } => "claim",
        }
    }

    /// Account the step acts for, if any
    pub fn actor(&self) -> Option<Address> {
        match self {
            Step::Advance { .. } | Step::SetReference { .. } => None,
            Step::Fund { account, .. } => Some(*account),
            Step::Init { caller }
            | Step::Mint { caller, .. }
            | Step::MintA { caller, .. }
            | Step::MintB { caller, .. }
            | Step::MintExactA { caller, .. }
            | Step::MintExactB { caller, .. }
            | Step::MintLp { caller, .. }
            | Step::Burn { caller, .. }
            | Step::BurnA { caller, .. }
            | Step::BurnB { caller, .. }
            | Step::BurnExactA { caller, .. }
            | Step::BurnExactB { caller, .. }
            | Step::BurnLp { caller, .. }
            | Step::SwapAToB { caller, .. }
            | Step::SwapBToA { caller, .. }
            | Step::DepositLp { caller, .. }
            | Step::WithdrawLp { caller, .. }
            | Step::Close { caller }
            | Step::Claim { caller } => Some(*caller),
        }
    }
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid scenario {}", path.display()))
}

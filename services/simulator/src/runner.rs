//! Scenario runner
//!
//! Deploys one derivative through a registry, backs it with an in-memory
//! collateral ledger and replays scenario steps in order. A failed step is
//! logged and recorded; the run continues with the next one. Ledger events
//! committed by a step are drained into its outcome.

use crate::scenario::{Scenario, Step};
use anyhow::{Context, Result};
use config::DerivativeSettings;
use derivative::{
    Clock, DerivativeParams, DerivativeRegistry, DerivativeSnapshot, InitArgs, ManualClock,
    ManualReference, SharedCollateral, SharedDerivative, TokenEvent, TokenKind,
};
use ledger::{derive_address, TokenLedger};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};
use types::{Address, WadMath, U256};

type Instance = SharedDerivative<SharedCollateral, ManualReference, ManualClock>;

/// Deploys the simulated derivative and its collateral
const DEPLOYER: Address = Address::from_low_u8(0xde);

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<TokenEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    pub account: Address,
    pub collateral: String,
    pub a: String,
    pub b: String,
    pub lp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub scenario: String,
    pub steps: usize,
    pub failed: usize,
    pub outcomes: Vec<StepOutcome>,
    pub derivative: DerivativeSnapshot,
    pub accounts: Vec<AccountReport>,
}

pub struct Simulation {
    derivative: Instance,
    collateral: SharedCollateral,
    reference: ManualReference,
    clock: ManualClock,
    minter: Address,
    decimals: u8,
    init_args: InitArgs,
    accounts: BTreeSet<Address>,
}

impl Simulation {
    pub fn new(settings: &DerivativeSettings, scenario: &Scenario) -> Result<Self> {
        let decimals = settings.decimals;
        let minter = derive_address(&DEPLOYER, u64::MAX);

        let mut ledger = TokenLedger::new(derive_address(&DEPLOYER, u64::MAX - 1));
        ledger
            .init(
                minter,
                scenario.collateral.name.as_str(),
                scenario.collateral.symbol.as_str(),
                decimals,
            )
            .context("Failed to initialize collateral ledger")?;
        let collateral = SharedCollateral::new(ledger);

        let opening = WadMath::from_decimal_str(&scenario.opening_value, decimals)
            .context("Invalid opening_value")?;
        let reference = ManualReference::new(opening);
        let clock = ManualClock::new(scenario.start_time);

        let registry = DerivativeRegistry::new(DEPLOYER);
        let derivative = registry.deploy(
            DerivativeParams::from(settings),
            collateral.clone(),
            reference.clone(),
            clock.clone(),
        );

        Ok(Self {
            derivative,
            collateral,
            reference,
            clock,
            minter,
            decimals,
            init_args: InitArgs::from(settings),
            accounts: BTreeSet::from([settings.treasury]),
        })
    }

    fn amount(&self, raw: &str) -> Result<U256> {
        WadMath::from_decimal_str(raw, self.decimals)
            .with_context(|| format!("Invalid amount '{}'", raw))
    }

    fn display(&self, value: U256) -> String {
        WadMath::to_decimal(value, self.decimals)
            .map(|d| d.normalize().to_string())
            .unwrap_or_else(|| value.to_string())
    }

    fn fund(&mut self, account: Address, amount: U256) -> Result<Value> {
        let spender = self.derivative.lock().address();
        let mut ledger = self.collateral.lock();
        ledger.mint(&self.minter, account, amount)?;
        ledger.approve(&account, spender, U256::MAX)?;
        Ok(json!({ "balance": self.display(ledger.balance_of(&account)) }))
    }

    /// Apply one step; `Err` means the step was rejected
    pub fn apply(&mut self, step: &Step) -> Result<Value> {
        if let Some(actor) = step.actor() {
            self.accounts.insert(actor);
        }

        let value = match step {
            Step::Fund { account, amount } => {
                let amount = self.amount(amount)?;
                return self.fund(*account, amount);
            }
            Step::Advance { secs } => json!({ "now": self.clock.advance(*secs) }),
            Step::SetReference { value } => {
                self.reference.set(self.amount(value)?);
                json!({ "reference": value })
            }
            Step::Init { caller } => {
                let receipt = self.derivative.lock().init(*caller, &self.init_args)?;
                json!({
                    "collateral_in": self.display(receipt.collateral_in),
                    "lp_out": self.display(receipt.lp_out),
                    "a_out": self.display(receipt.a_out),
                    "b_out": self.display(receipt.b_out),
                })
            }
            Step::Mint { caller, amount } => {
                let amount = self.amount(amount)?;
                self.derivative.lock().mint(*caller, amount)?;
                json!({ "a_out": self.display(amount), "b_out": self.display(amount) })
            }
            Step::MintA { caller, amount, min_out } => {
                let (amount, min_out) = (self.amount(amount)?, self.amount(min_out)?);
                let out = self.derivative.lock().mint_a(*caller, amount, min_out)?;
                json!({ "a_out": self.display(out) })
            }
            Step::MintB { caller, amount, min_out } => {
                let (amount, min_out) = (self.amount(amount)?, self.amount(min_out)?);
                let out = self.derivative.lock().mint_b(*caller, amount, min_out)?;
                json!({ "b_out": self.display(out) })
            }
            Step::MintExactA { caller, desired, max_in } => {
                let (desired, max_in) = (self.amount(desired)?, self.amount(max_in)?);
                let paid = self.derivative.lock().mint_exact_a(*caller, desired, max_in)?;
                json!({ "paid": self.display(paid) })
            }
            Step::MintExactB { caller, desired, max_in } => {
                let (desired, max_in) = (self.amount(desired)?, self.amount(max_in)?);
                let paid = self.derivative.lock().mint_exact_b(*caller, desired, max_in)?;
                json!({ "paid": self.display(paid) })
            }
            Step::MintLp { caller, amount, min_lp } => {
                let (amount, min_lp) = (self.amount(amount)?, self.amount(min_lp)?);
                let lp = self.derivative.lock().mint_lp(*caller, amount, min_lp)?;
                json!({ "lp_out": self.display(lp) })
            }
            Step::Burn { caller, amount } => {
                let amount = self.amount(amount)?;
                let payout = self.derivative.lock().burn(*caller, amount)?;
                json!({ "payout": self.display(payout) })
            }
            Step::BurnA { caller, amount, min_out } => {
                let (amount, min_out) = (self.amount(amount)?, self.amount(min_out)?);
                let payout = self.derivative.lock().burn_a(*caller, amount, min_out)?;
                json!({ "payout": self.display(payout) })
            }
            Step::BurnB { caller, amount, min_out } => {
                let (amount, min_out) = (self.amount(amount)?, self.amount(min_out)?);
                let payout = self.derivative.lock().burn_b(*caller, amount, min_out)?;
                json!({ "payout": self.display(payout) })
            }
            Step::BurnExactA { caller, desired, max_burn } => {
                let (desired, max_burn) = (self.amount(desired)?, self.amount(max_burn)?);
                let burned = self.derivative.lock().burn_exact_a(*caller, desired, max_burn)?;
                json!({ "burned": self.display(burned) })
            }
            Step::BurnExactB { caller, desired, max_burn } => {
                let (desired, max_burn) = (self.amount(desired)?, self.amount(max_burn)?);
                let burned = self.derivative.lock().burn_exact_b(*caller, desired, max_burn)?;
                json!({ "burned": self.display(burned) })
            }
            Step::BurnLp { caller, lp, min_out } => {
                let (lp, min_out) = (self.amount(lp)?, self.amount(min_out)?);
                let payout = self.derivative.lock().burn_lp(*caller, lp, min_out)?;
                json!({ "payout": self.display(payout) })
            }
            Step::SwapAToB { caller, amount, min_out } => {
                let (amount, min_out) = (self.amount(amount)?, self.amount(min_out)?);
                let out = self.derivative.lock().swap_a_to_b(*caller, amount, min_out)?;
                json!({ "b_out": self.display(out) })
            }
            Step::SwapBToA { caller, amount, min_out } => {
                let (amount, min_out) = (self.amount(amount)?, self.amount(min_out)?);
                let out = self.derivative.lock().swap_b_to_a(*caller, amount, min_out)?;
                json!({ "a_out": self.display(out) })
            }
            Step::DepositLp { caller, a_in, b_in, min_lp } => {
                let (a_in, b_in) = (self.amount(a_in)?, self.amount(b_in)?);
                let min_lp = self.amount(min_lp)?;
                let lp = self.derivative.lock().deposit_lp(*caller, a_in, b_in, min_lp)?;
                json!({ "lp_out": self.display(lp) })
            }
            Step::WithdrawLp { caller, a_out, b_out, max_lp } => {
                let (a_out, b_out) = (self.amount(a_out)?, self.amount(b_out)?);
                let max_lp = self.amount(max_lp)?;
                let lp = self.derivative.lock().withdraw_lp(*caller, a_out, b_out, max_lp)?;
                json!({ "lp_burned": self.display(lp) })
            }
            Step::Close { caller } => {
                let record = self.derivative.lock().close(*caller)?;
                json!({
                    "b_price": self.display(record.b_price),
                    "closing_value": self.display(record.closing_value),
                })
            }
            Step::Claim { caller } => {
                let quote = self.derivative.lock().claim(*caller)?;
                json!({
                    "gross": self.display(quote.gross),
                    "fee": self.display(quote.fee),
                    "payout": self.display(quote.payout),
                })
            }
        };
        Ok(value)
    }

    /// Replay every step and summarize the final state
    pub fn run(mut self, scenario: &Scenario) -> RunSummary {
        let mut outcomes = Vec::with_capacity(scenario.steps.len());

        for (index, step) in scenario.steps.iter().enumerate() {
            let op = step.name();
            let time = self.clock.now();
            let applied = self.apply(step);
            let events = self.derivative.lock().take_events();
            match applied {
                Ok(result) => {
                    debug!(index, op, %result, events = events.len(), "step applied");
                    outcomes.push(StepOutcome {
                        index,
                        op,
                        time,
                        result: Some(result),
                        error: None,
                        events,
                    });
                }
                Err(err) => {
                    warn!(index, op, error = %format!("{:#}", err), "step failed");
                    outcomes.push(StepOutcome {
                        index,
                        op,
                        time,
                        result: None,
                        error: Some(format!("{:#}", err)),
                        events,
                    });
                }
            }
        }

        let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
        info!(steps = outcomes.len(), failed, "scenario finished");

        RunSummary {
            scenario: scenario.name.clone(),
            steps: outcomes.len(),
            failed,
            outcomes,
            derivative: self.derivative.lock().snapshot(),
            accounts: self.account_reports(),
        }
    }

    fn account_reports(&self) -> Vec<AccountReport> {
        let derivative = self.derivative.lock();
        let collateral = self.collateral.lock();
        self.accounts
            .iter()
            .map(|account| AccountReport {
                account: *account,
                collateral: self.display(collateral.balance_of(account)),
                a: self.display(derivative.balance_of(TokenKind::A, account)),
                b: self.display(derivative.balance_of(TokenKind::B, account)),
                lp: self.display(derivative.balance_of(TokenKind::Lp, account)),
            })
            .collect()
    }
}

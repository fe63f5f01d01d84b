//! Derivative instance: the composition root
//!
//! Owns the tranche pool, the A/B/LP ledgers, the lifecycle and the
//! settlement record, and exposes the full operation surface. Every
//! operation runs inside [`Derivative::transact`]: the internal state is
//! snapshotted before the call and restored if anything fails. Collateral
//! moves last, so a rejected transfer leaves both sides untouched.
//!
//! Ledger events are moved out of the A/B/LP ledgers when an operation
//! commits and queue on the derivative until [`Derivative::take_events`]
//! drains them. Rolled-back operations leave no events behind.

use crate::collaborators::{Clock, CollateralToken, ReferenceSource};
use crate::error::{DerivativeError, Result};
use crate::lifecycle::LifecycleState;
use crate::params::{DerivativeParams, InitArgs};
use crate::settlement::{ClaimQuote, SettlementEngine, SettlementRecord};
use amm::{FeeWindow, Side, TranchePool};
use config::protocol::naming;
use ledger::{derive_address, LedgerEvent, TokenFactory, TokenLedger};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};
use types::{Address, WadMath, U256};

/// Ledgers exposed by a derivative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    A,
    B,
    Lp,
}

impl From<Side> for TokenKind {
    fn from(side: Side) -> Self {
        match side {
            Side::A => TokenKind::A,
            Side::B => TokenKind::B,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::A => write!(f, "A"),
            TokenKind::B => write!(f, "B"),
            TokenKind::Lp => write!(f, "LP"),
        }
    }
}

#[derive(Debug, Clone)]
struct Tranches {
    a: TokenLedger,
    b: TokenLedger,
    lp: TokenLedger,
}

impl Tranches {
    fn get(&self, kind: TokenKind) -> &TokenLedger {
        match kind {
            TokenKind::A => &self.a,
            TokenKind::B => &self.b,
            TokenKind::Lp => &self.lp,
        }
    }

    fn get_mut(&mut self, kind: TokenKind) -> &mut TokenLedger {
        match kind {
            TokenKind::A => &mut self.a,
            TokenKind::B => &mut self.b,
            TokenKind::Lp => &mut self.lp,
        }
    }

    fn drain_events(&mut self, out: &mut Vec<TokenEvent>) {
        for kind in [TokenKind::A, TokenKind::B, TokenKind::Lp] {
            out.extend(
                self.get_mut(kind)
                    .drain_events()
                    .into_iter()
                    .map(|event| TokenEvent { token: kind, event }),
            );
        }
    }

    fn all_drained(&self) -> bool {
        self.a.total_supply().is_zero()
            && self.b.total_supply().is_zero()
            && self.lp.total_supply().is_zero()
    }
}

/// Everything rolled back when an operation fails
#[derive(Debug, Clone)]
struct DerivativeState {
    lifecycle: LifecycleState,
    batch_name: String,
    window: Option<FeeWindow>,
    opening_value: U256,
    pool: TranchePool,
    tokens: Option<Tranches>,
    settlement: Option<SettlementRecord>,
    protocol_fee_paid: U256,
    factory: TokenFactory,
}

/// Ledger event tagged with the derivative token that emitted it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenEvent {
    pub token: TokenKind,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// Amounts moved by `init`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InitReceipt {
    pub collateral_in: U256,
    pub lp_out: U256,
    pub a_out: U256,
    pub b_out: U256,
}

/// Serializable view of a derivative for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivativeSnapshot {
    pub address: Address,
    pub batch_name: String,
    pub lifecycle: LifecycleState,
    pub pool_a: U256,
    pub pool_b: U256,
    pub supply_a: U256,
    pub supply_b: U256,
    pub supply_lp: U256,
    pub open_time: Option<u64>,
    pub close_time: Option<u64>,
    pub opening_value: U256,
    pub settlement: Option<SettlementRecord>,
    pub protocol_fee_paid: U256,
    pub collateral_held: U256,
}

pub struct Derivative<C, R, K> {
    address: Address,
    params: DerivativeParams,
    state: DerivativeState,
    events: Vec<TokenEvent>,
    collateral: C,
    reference: R,
    clock: K,
}

impl<C, R, K> Derivative<C, R, K>
where
    C: CollateralToken,
    R: ReferenceSource,
    K: Clock,
{
    pub fn new(
        address: Address,
        params: DerivativeParams,
        collateral: C,
        reference: R,
        clock: K,
    ) -> Self {
        Self {
            address,
            params,
            state: DerivativeState {
                lifecycle: LifecycleState::Uninitialized,
                batch_name: String::new(),
                window: None,
                opening_value: U256::zero(),
                pool: TranchePool::default(),
                tokens: None,
                settlement: None,
                protocol_fee_paid: U256::zero(),
                factory: TokenFactory::new(derive_address(&address, u64::MAX)),
            },
            events: Vec::new(),
            collateral,
            reference,
            clock,
        }
    }

    /// Run `body` against a snapshot of the state, restoring it on error
    ///
    /// The ledgers hold no events between operations, so the snapshot
    /// stays independent of history.
    fn transact<T>(
        &mut self,
        op: &'static str,
        caller: &Address,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let snapshot = self.state.clone();
        match body(self) {
            Ok(out) => {
                if let Some(tokens) = self.state.tokens.as_mut() {
                    tokens.drain_events(&mut self.events);
                }
                Ok(out)
            }
            Err(err) => {
                self.state = snapshot;
                warn!(derivative = %self.address, op, %caller, error = %err, "operation rejected, state rolled back");
                Err(err)
            }
        }
    }

    fn tokens(&self) -> Result<&Tranches> {
        self.state.tokens.as_ref().ok_or(DerivativeError::NotYetOpen)
    }

    fn tokens_mut(&mut self) -> Result<&mut Tranches> {
        self.state.tokens.as_mut().ok_or(DerivativeError::NotYetOpen)
    }

    fn close_time_or_max(&self) -> u64 {
        self.state.window.map(|w| w.close_time).unwrap_or(u64::MAX)
    }

    /// Fee multiplier for a trade now, after the lifecycle gate
    fn trading_multiplier(&self) -> Result<U256> {
        let now = self.clock.now();
        self.state
            .lifecycle
            .ensure_tradable(now, self.close_time_or_max())?;
        let window = self.state.window.ok_or(DerivativeError::NotYetOpen)?;
        Ok(window.multiplier_at(now)?)
    }

    fn pull_collateral(&mut self, from: Address, amount: U256) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let this = self.address;
        self.collateral
            .transfer_from(&this, from, this, amount)
            .map_err(DerivativeError::Collateral)
    }

    fn push_collateral(&mut self, to: Address, amount: U256) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let this = self.address;
        self.collateral
            .transfer(&this, to, amount)
            .map_err(DerivativeError::Collateral)
    }

    /// Send `fee` to the treasury and add it to the paid total
    fn pay_protocol_fee(&mut self, fee: U256) -> Result<()> {
        self.state.protocol_fee_paid = WadMath::checked_add(self.state.protocol_fee_paid, fee)?;
        let treasury = self.params.treasury;
        self.push_collateral(treasury, fee)
    }

    fn mint_token(&mut self, kind: TokenKind, to: Address, amount: U256) -> Result<()> {
        let this = self.address;
        self.tokens_mut()?.get_mut(kind).mint(&this, to, amount)?;
        Ok(())
    }

    fn burn_token(&mut self, kind: TokenKind, from: Address, amount: U256) -> Result<()> {
        let this = self.address;
        self.tokens_mut()?.get_mut(kind).burn(&this, from, amount)?;
        Ok(())
    }

    // ----- lifecycle -----

    /// One-time initialization
    ///
    /// Opens the trading window at the current time, snapshots the opening
    /// reference value, deploys the A/B/LP ledgers and seeds the pool with
    /// `initial_a`/`initial_b`. The caller pays `max(initial_a, initial_b)`
    /// collateral and receives `sqrtFloor(initial_a * initial_b)` LP plus
    /// the tranche tokens not placed in the pool.
    pub fn init(&mut self, caller: Address, args: &InitArgs) -> Result<InitReceipt> {
        self.transact("init", &caller, |d| {
            d.state.lifecycle.ensure_uninitialized()?;
            if args.initial_a.is_zero() || args.initial_b.is_zero() {
                return Err(DerivativeError::InvalidParameter(
                    "initial reserves must be positive".to_string(),
                ));
            }
            if d.params.treasury == Address::ZERO {
                return Err(DerivativeError::InvalidParameter(
                    "treasury must not be the zero address".to_string(),
                ));
            }
            if d.params.min_fee > d.params.max_fee {
                return Err(DerivativeError::InvalidParameter(
                    "min_fee exceeds max_fee".to_string(),
                ));
            }

            let now = d.clock.now();
            let window = FeeWindow::new(
                now,
                args.duration_secs,
                d.params.min_fee,
                d.params.max_fee,
                d.params.fee_schedule,
            )?;
            let opening_value = d.reference.opening_value()?;
            let decimals = d.collateral.decimals();
            let this = d.address;
            let batch = args.batch_name.as_str();

            let a = d.state.factory.new_token(
                this,
                &naming::a_name(batch),
                &naming::a_symbol(batch),
                decimals,
            )?;
            let b = d.state.factory.new_token(
                this,
                &naming::b_name(batch),
                &naming::b_symbol(batch),
                decimals,
            )?;
            let mut lp = TokenLedger::new(this);
            lp.init(this, naming::lp_name(batch), naming::lp_symbol(batch), decimals)?;

            d.state.tokens = Some(Tranches { a, b, lp });
            d.state.pool = TranchePool::new(args.initial_a, args.initial_b);
            d.state.window = Some(window);
            d.state.opening_value = opening_value;
            d.state.batch_name = args.batch_name.clone();
            d.state.lifecycle = LifecycleState::Open;

            let collateral_in = args.initial_a.max(args.initial_b);
            let receipt = InitReceipt {
                collateral_in,
                lp_out: WadMath::sqrt_floor_wide(args.initial_a.full_mul(args.initial_b)),
                a_out: collateral_in - args.initial_a,
                b_out: collateral_in - args.initial_b,
            };
            d.mint_token(TokenKind::Lp, caller, receipt.lp_out)?;
            if !receipt.a_out.is_zero() {
                d.mint_token(TokenKind::A, caller, receipt.a_out)?;
            }
            if !receipt.b_out.is_zero() {
                d.mint_token(TokenKind::B, caller, receipt.b_out)?;
            }
            d.pull_collateral(caller, collateral_in)?;

            info!(
                derivative = %this,
                batch,
                open_time = window.open_time,
                close_time = window.close_time,
                %opening_value,
                "derivative initialized"
            );
            Ok(receipt)
        })
    }

    /// Fix the settlement record once the close time has passed
    pub fn close(&mut self, caller: Address) -> Result<SettlementRecord> {
        self.transact("close", &caller, |d| {
            let now = d.clock.now();
            d.state
                .lifecycle
                .ensure_closable(now, d.close_time_or_max())?;

            let closing_value = d.reference.closing_value()?;
            let record = SettlementEngine::settle(
                &d.params.payoff,
                d.state.opening_value,
                closing_value,
                d.params.protocol_fee,
                now,
            )?;
            d.state.settlement = Some(record);
            d.state.lifecycle = LifecycleState::Closed;

            info!(derivative = %d.address, b_price = %record.b_price, "derivative closed");
            Ok(record)
        })
    }

    /// Redeem every A, B and LP unit the caller holds for collateral
    ///
    /// Repeatable: each call settles whatever the caller holds at that
    /// moment. Once all three supplies reach zero the derivative is drained.
    pub fn claim(&mut self, caller: Address) -> Result<ClaimQuote> {
        self.transact("claim", &caller, |d| {
            d.state.lifecycle.ensure_claimable()?;
            let record = d.state.settlement.ok_or(DerivativeError::NotYetClosable)?;

            let (a, b, lp, lp_supply) = {
                let tokens = d.tokens()?;
                (
                    tokens.a.balance_of(&caller),
                    tokens.b.balance_of(&caller),
                    tokens.lp.balance_of(&caller),
                    tokens.lp.total_supply(),
                )
            };
            let quote = SettlementEngine::quote_claim(&record, a, b, lp, &d.state.pool, lp_supply)?;
            d.state.pool.remove_share(lp, lp_supply)?;

            for (kind, amount) in [(TokenKind::A, a), (TokenKind::B, b), (TokenKind::Lp, lp)] {
                if !amount.is_zero() {
                    d.burn_token(kind, caller, amount)?;
                }
            }

            if d.state.lifecycle == LifecycleState::Closed && d.tokens()?.all_drained() {
                d.state.lifecycle = LifecycleState::Drained;
                info!(derivative = %d.address, "derivative drained");
            }
            d.push_collateral(caller, quote.payout)?;
            d.pay_protocol_fee(quote.fee)?;

            debug!(derivative = %d.address, %caller, %a, %b, %lp, payout = %quote.payout, "claim");
            Ok(quote)
        })
    }

    /// Committed ledger events, oldest first; empties the queue
    pub fn take_events(&mut self) -> Vec<TokenEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of committed events not yet taken
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    // ----- minting -----

    /// Mint `amount` of both A and B for `amount` collateral; no fee
    pub fn mint(&mut self, caller: Address, amount: U256) -> Result<()> {
        self.transact("mint", &caller, |d| {
            d.trading_multiplier()?;
            d.mint_token(TokenKind::A, caller, amount)?;
            d.mint_token(TokenKind::B, caller, amount)?;
            d.pull_collateral(caller, amount)?;
            debug!(derivative = %d.address, %caller, %amount, "mint");
            Ok(())
        })
    }

    fn mint_single(&mut self, side: Side, caller: Address, amount: U256, min_out: U256) -> Result<U256> {
        self.transact("mint_single", &caller, |d| {
            let f = d.trading_multiplier()?;
            let minted = d.state.pool.mint_single(side, amount, min_out, f)?;
            d.mint_token(side.into(), caller, minted.amount_out)?;
            d.pull_collateral(caller, amount)?;
            debug!(derivative = %d.address, %caller, %side, %amount, out = %minted.amount_out, "mint single-sided");
            Ok(minted.amount_out)
        })
    }

    /// Pay `amount` collateral for at least `min_a` A
    pub fn mint_a(&mut self, caller: Address, amount: U256, min_a: U256) -> Result<U256> {
        self.mint_single(Side::A, caller, amount, min_a)
    }

    /// Pay `amount` collateral for at least `min_b` B
    pub fn mint_b(&mut self, caller: Address, amount: U256, min_b: U256) -> Result<U256> {
        self.mint_single(Side::B, caller, amount, min_b)
    }

    fn mint_exact(&mut self, side: Side, caller: Address, desired: U256, max_in: U256) -> Result<U256> {
        self.transact("mint_exact", &caller, |d| {
            let f = d.trading_multiplier()?;
            let minted = d.state.pool.mint_exact(side, desired, max_in, f)?;
            d.mint_token(side.into(), caller, desired)?;
            d.pull_collateral(caller, minted.amount_in)?;
            debug!(derivative = %d.address, %caller, %side, %desired, paid = %minted.amount_in, "mint exact");
            Ok(minted.amount_in)
        })
    }

    /// Receive exactly `desired` A for at most `max_in` collateral
    pub fn mint_exact_a(&mut self, caller: Address, desired: U256, max_in: U256) -> Result<U256> {
        self.mint_exact(Side::A, caller, desired, max_in)
    }

    /// Receive exactly `desired` B for at most `max_in` collateral
    pub fn mint_exact_b(&mut self, caller: Address, desired: U256, max_in: U256) -> Result<U256> {
        self.mint_exact(Side::B, caller, desired, max_in)
    }

    /// Deposit `amount` collateral on both sides of the pool for LP shares
    pub fn mint_lp(&mut self, caller: Address, amount: U256, min_lp: U256) -> Result<U256> {
        self.transact("mint_lp", &caller, |d| {
            let f = d.trading_multiplier()?;
            let supply = d.tokens()?.lp.total_supply();
            let lp = d.state.pool.deposit(amount, amount, min_lp, supply, f)?;
            d.mint_token(TokenKind::Lp, caller, lp)?;
            d.pull_collateral(caller, amount)?;
            debug!(derivative = %d.address, %caller, %amount, %lp, "mint lp");
            Ok(lp)
        })
    }

    // ----- burning -----

    /// Burn `amount` of both A and B
    ///
    /// The caller receives `amount` less the protocol fee and the fee goes
    /// to the treasury, so the full `amount` leaves the derivative.
    pub fn burn(&mut self, caller: Address, amount: U256) -> Result<U256> {
        self.transact("burn", &caller, |d| {
            d.trading_multiplier()?;
            d.burn_token(TokenKind::A, caller, amount)?;
            d.burn_token(TokenKind::B, caller, amount)?;

            let fee = WadMath::mul_wad(amount, d.params.protocol_fee)?;
            let payout = WadMath::checked_sub(amount, fee)?;
            d.push_collateral(caller, payout)?;
            d.pay_protocol_fee(fee)?;
            debug!(derivative = %d.address, %caller, %amount, %payout, "burn");
            Ok(payout)
        })
    }

    fn burn_single(&mut self, side: Side, caller: Address, burned: U256, min_out: U256) -> Result<U256> {
        self.transact("burn_single", &caller, |d| {
            let f = d.trading_multiplier()?;
            d.burn_token(side.into(), caller, burned)?;
            let burn = d.state.pool.burn_single(side, burned, min_out, f)?;
            d.push_collateral(caller, burn.amount_out)?;
            debug!(derivative = %d.address, %caller, %side, %burned, out = %burn.amount_out, "burn single-sided");
            Ok(burn.amount_out)
        })
    }

    /// Burn `amount` A for at least `min_out` collateral
    pub fn burn_a(&mut self, caller: Address, amount: U256, min_out: U256) -> Result<U256> {
        self.burn_single(Side::A, caller, amount, min_out)
    }

    /// Burn `amount` B for at least `min_out` collateral
    pub fn burn_b(&mut self, caller: Address, amount: U256, min_out: U256) -> Result<U256> {
        self.burn_single(Side::B, caller, amount, min_out)
    }

    fn burn_exact(&mut self, side: Side, caller: Address, desired: U256, max_burn: U256) -> Result<U256> {
        self.transact("burn_exact", &caller, |d| {
            let f = d.trading_multiplier()?;
            let burn = d.state.pool.burn_exact(side, desired, max_burn, f)?;
            d.burn_token(side.into(), caller, burn.burned)?;
            d.push_collateral(caller, desired)?;
            debug!(derivative = %d.address, %caller, %side, %desired, burned = %burn.burned, "burn exact");
            Ok(burn.burned)
        })
    }

    /// Receive exactly `desired` collateral, burning at most `max_burn` A
    pub fn burn_exact_a(&mut self, caller: Address, desired: U256, max_burn: U256) -> Result<U256> {
        self.burn_exact(Side::A, caller, desired, max_burn)
    }

    /// Receive exactly `desired` collateral, burning at most `max_burn` B
    pub fn burn_exact_b(&mut self, caller: Address, desired: U256, max_burn: U256) -> Result<U256> {
        self.burn_exact(Side::B, caller, desired, max_burn)
    }

    /// Burn `lp` shares straight to collateral
    pub fn burn_lp(&mut self, caller: Address, lp: U256, min_out: U256) -> Result<U256> {
        self.transact("burn_lp", &caller, |d| {
            let f = d.trading_multiplier()?;
            let supply = d.tokens()?.lp.total_supply();
            d.burn_token(TokenKind::Lp, caller, lp)?;
            let amount = d.state.pool.burn_lp(lp, min_out, supply, f)?;
            d.push_collateral(caller, amount)?;
            debug!(derivative = %d.address, %caller, %lp, %amount, "burn lp");
            Ok(amount)
        })
    }

    // ----- swaps -----

    fn swap(&mut self, from: Side, caller: Address, amount_in: U256, min_out: U256) -> Result<U256> {
        self.transact("swap", &caller, |d| {
            let f = d.trading_multiplier()?;
            d.burn_token(from.into(), caller, amount_in)?;
            let out = d.state.pool.swap(from, amount_in, min_out, f)?;
            d.mint_token(from.other().into(), caller, out)?;
            debug!(derivative = %d.address, %caller, %from, %amount_in, %out, "swap");
            Ok(out)
        })
    }

    pub fn swap_a_to_b(&mut self, caller: Address, amount_a: U256, min_b: U256) -> Result<U256> {
        self.swap(Side::A, caller, amount_a, min_b)
    }

    pub fn swap_b_to_a(&mut self, caller: Address, amount_b: U256, min_a: U256) -> Result<U256> {
        self.swap(Side::B, caller, amount_b, min_a)
    }

    // ----- liquidity -----

    /// Move A and B from the caller into the pool for LP shares
    pub fn deposit_lp(&mut self, caller: Address, a_in: U256, b_in: U256, min_lp: U256) -> Result<U256> {
        self.transact("deposit_lp", &caller, |d| {
            let f = d.trading_multiplier()?;
            let supply = d.tokens()?.lp.total_supply();
            d.burn_token(TokenKind::A, caller, a_in)?;
            d.burn_token(TokenKind::B, caller, b_in)?;
            let lp = d.state.pool.deposit(a_in, b_in, min_lp, supply, f)?;
            d.mint_token(TokenKind::Lp, caller, lp)?;
            debug!(derivative = %d.address, %caller, %a_in, %b_in, %lp, "deposit lp");
            Ok(lp)
        })
    }

    /// Take exactly `a_out` A and `b_out` B out of the pool, burning at most `max_lp`
    pub fn withdraw_lp(&mut self, caller: Address, a_out: U256, b_out: U256, max_lp: U256) -> Result<U256> {
        self.transact("withdraw_lp", &caller, |d| {
            let f = d.trading_multiplier()?;
            let supply = d.tokens()?.lp.total_supply();
            let lp = d.state.pool.withdraw(a_out, b_out, max_lp, supply, f)?;
            d.burn_token(TokenKind::Lp, caller, lp)?;
            d.mint_token(TokenKind::A, caller, a_out)?;
            d.mint_token(TokenKind::B, caller, b_out)?;
            debug!(derivative = %d.address, %caller, %a_out, %b_out, %lp, "withdraw lp");
            Ok(lp)
        })
    }

    // ----- token surface -----

    pub fn transfer(&mut self, kind: TokenKind, caller: Address, to: Address, amount: U256) -> Result<()> {
        self.transact("transfer", &caller, |d| {
            d.tokens_mut()?.get_mut(kind).transfer(&caller, to, amount)?;
            Ok(())
        })
    }

    pub fn approve(&mut self, kind: TokenKind, caller: Address, spender: Address, amount: U256) -> Result<()> {
        self.transact("approve", &caller, |d| {
            d.tokens_mut()?.get_mut(kind).approve(&caller, spender, amount)?;
            Ok(())
        })
    }

    pub fn transfer_from(
        &mut self,
        kind: TokenKind,
        caller: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<()> {
        self.transact("transfer_from", &caller, |d| {
            d.tokens_mut()?
                .get_mut(kind)
                .transfer_from(&caller, from, to, amount)?;
            Ok(())
        })
    }

    pub fn balance_of(&self, kind: TokenKind, holder: &Address) -> U256 {
        self.token(kind)
            .map(|t| t.balance_of(holder))
            .unwrap_or_default()
    }

    pub fn allowance(&self, kind: TokenKind, owner: &Address, spender: &Address) -> U256 {
        self.token(kind)
            .map(|t| t.allowance(owner, spender))
            .unwrap_or_default()
    }

    pub fn total_supply(&self, kind: TokenKind) -> U256 {
        self.token(kind)
            .map(TokenLedger::total_supply)
            .unwrap_or_default()
    }

    /// Ledger behind `kind`, once initialized
    pub fn token(&self, kind: TokenKind) -> Option<&TokenLedger> {
        self.state.tokens.as_ref().map(|t| t.get(kind))
    }

    // ----- accessors -----

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn params(&self) -> &DerivativeParams {
        &self.params
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.state.lifecycle
    }

    pub fn batch_name(&self) -> &str {
        &self.state.batch_name
    }

    pub fn pool(&self) -> TranchePool {
        self.state.pool
    }

    pub fn pool_a(&self) -> U256 {
        self.state.pool.pool_a
    }

    pub fn pool_b(&self) -> U256 {
        self.state.pool.pool_b
    }

    /// Fee multiplier a trade would use right now
    pub fn fee(&self) -> Result<U256> {
        let window = self.state.window.ok_or(DerivativeError::NotYetOpen)?;
        Ok(window.multiplier_at(self.clock.now())?)
    }

    pub fn fee_window(&self) -> Option<FeeWindow> {
        self.state.window
    }

    pub fn open_time(&self) -> Option<u64> {
        self.state.window.map(|w| w.open_time)
    }

    pub fn close_time(&self) -> Option<u64> {
        self.state.window.map(|w| w.close_time)
    }

    pub fn min_fee(&self) -> U256 {
        self.params.min_fee
    }

    pub fn max_fee(&self) -> U256 {
        self.params.max_fee
    }

    pub fn protocol_fee(&self) -> U256 {
        self.params.protocol_fee
    }

    pub fn leverage(&self) -> U256 {
        self.params.payoff.leverage
    }

    pub fn treasury(&self) -> Address {
        self.params.treasury
    }

    pub fn opening_value(&self) -> U256 {
        self.state.opening_value
    }

    /// Zero until the derivative has closed
    pub fn b_price(&self) -> U256 {
        self.state
            .settlement
            .map(|s| s.b_price)
            .unwrap_or_default()
    }

    pub fn settlement(&self) -> Option<SettlementRecord> {
        self.state.settlement
    }

    /// Protocol fees sent to the treasury so far
    pub fn protocol_fee_paid(&self) -> U256 {
        self.state.protocol_fee_paid
    }

    pub fn collateral(&self) -> &C {
        &self.collateral
    }

    pub fn reference(&self) -> &R {
        &self.reference
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn snapshot(&self) -> DerivativeSnapshot {
        DerivativeSnapshot {
            address: self.address,
            batch_name: self.state.batch_name.clone(),
            lifecycle: self.state.lifecycle,
            pool_a: self.state.pool.pool_a,
            pool_b: self.state.pool.pool_b,
            supply_a: self.total_supply(TokenKind::A),
            supply_b: self.total_supply(TokenKind::B),
            supply_lp: self.total_supply(TokenKind::Lp),
            open_time: self.open_time(),
            close_time: self.close_time(),
            opening_value: self.state.opening_value,
            settlement: self.state.settlement,
            protocol_fee_paid: self.state.protocol_fee_paid,
            collateral_held: self.collateral.balance_of(&self.address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{ManualClock, ManualReference};
    use amm::{FeeSchedule, Payoff, PayoffKind};
    use types::UNIT;

    const DERIVATIVE: Address = Address::from_low_u8(0xd0);
    const TREASURY: Address = Address::from_low_u8(0x7e);
    const ALICE: Address = Address::from_low_u8(0xa1);

    fn params() -> DerivativeParams {
        DerivativeParams {
            payoff: Payoff::new(PayoffKind::InterestRateSpread, UNIT * 5u64),
            fee_schedule: FeeSchedule::Decreasing,
            min_fee: UNIT / 1000u64,
            max_fee: UNIT / 100u64,
            protocol_fee: UNIT * 3u64 / 1000u64,
            treasury: TREASURY,
        }
    }

    fn collateral() -> TokenLedger {
        let minter = Address::from_low_u8(0xee);
        let mut ledger = TokenLedger::new(Address::from_low_u8(0xc0));
        ledger.init(minter, "Collateral", "COL", 18).unwrap();
        ledger.mint(&minter, ALICE, UNIT * 1_000u64).unwrap();
        ledger.approve(&ALICE, DERIVATIVE, U256::MAX).unwrap();
        ledger
    }

    fn derivative() -> Derivative<TokenLedger, ManualReference, ManualClock> {
        Derivative::new(
            DERIVATIVE,
            params(),
            collateral(),
            ManualReference::new(UNIT),
            ManualClock::new(1_000),
        )
    }

    fn init_args() -> InitArgs {
        InitArgs {
            batch_name: "test".to_string(),
            duration_secs: 3_600,
            initial_a: UNIT * 100u64,
            initial_b: UNIT * 60u64,
        }
    }

    #[test]
    fn test_init_seeds_pool_and_pays_excess() {
        let mut d = derivative();
        let receipt = d.init(ALICE, &init_args()).unwrap();

        assert_eq!(receipt.collateral_in, UNIT * 100u64);
        assert_eq!(receipt.a_out, U256::zero());
        assert_eq!(receipt.b_out, UNIT * 40u64);
        assert_eq!(receipt.lp_out, WadMath::sqrt_floor(UNIT * UNIT * 6_000u64));
        assert_eq!(d.lifecycle(), LifecycleState::Open);
        assert_eq!(d.open_time(), Some(1_000));
        assert_eq!(d.close_time(), Some(4_600));
        assert_eq!(d.token(TokenKind::A).unwrap().symbol(), "iG-A test");
        assert_eq!(d.token(TokenKind::Lp).unwrap().name(), "iGain LP token test");
        assert_eq!(d.collateral().balance_of(&DERIVATIVE), UNIT * 100u64);
    }

    #[test]
    fn test_failed_collateral_pull_rolls_back_init() {
        let mut d = derivative();
        let broke = Address::from_low_u8(0xb0);
        let err = d.init(broke, &init_args()).unwrap_err();

        assert!(matches!(err, DerivativeError::Collateral(_)));
        assert_eq!(d.lifecycle(), LifecycleState::Uninitialized);
        assert!(d.token(TokenKind::A).is_none());
        assert_eq!(d.pool(), TranchePool::default());
    }

    #[test]
    fn test_failed_trade_leaves_state_untouched() {
        let mut d = derivative();
        d.init(ALICE, &init_args()).unwrap();
        let pool_before = d.pool();
        let b_before = d.balance_of(TokenKind::B, &ALICE);

        let err = d
            .swap_b_to_a(ALICE, UNIT * 10u64, UNIT * 1_000u64)
            .unwrap_err();
        assert!(matches!(err, DerivativeError::Slippage { .. }));
        assert_eq!(d.pool(), pool_before);
        assert_eq!(d.balance_of(TokenKind::B, &ALICE), b_before);
    }

    #[test]
    fn test_zero_initial_reserve_rejected() {
        let mut d = derivative();
        let args = InitArgs {
            initial_a: U256::zero(),
            ..init_args()
        };
        assert!(matches!(
            d.init(ALICE, &args),
            Err(DerivativeError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_zero_treasury_rejected() {
        let mut d = Derivative::new(
            DERIVATIVE,
            DerivativeParams {
                treasury: Address::ZERO,
                ..params()
            },
            collateral(),
            ManualReference::new(UNIT),
            ManualClock::new(1_000),
        );
        assert!(matches!(
            d.init(ALICE, &init_args()),
            Err(DerivativeError::InvalidParameter(_))
        ));
        assert_eq!(d.lifecycle(), LifecycleState::Uninitialized);
    }

    #[test]
    fn test_burn_fee_goes_to_treasury() {
        let mut d = derivative();
        d.init(ALICE, &init_args()).unwrap();
        d.mint(ALICE, UNIT).unwrap();
        let held = d.collateral().balance_of(&DERIVATIVE);

        let fee = UNIT * 3u64 / 1000u64;
        assert_eq!(d.burn(ALICE, UNIT).unwrap(), UNIT - fee);
        assert_eq!(d.collateral().balance_of(&DERIVATIVE), held - UNIT);
        assert_eq!(d.collateral().balance_of(&TREASURY), fee);
        assert_eq!(d.protocol_fee_paid(), fee);
    }

    #[test]
    fn test_event_queue_stays_bounded() {
        let mut d = derivative();
        d.init(ALICE, &init_args()).unwrap();
        // LP and B minted to the initializer
        assert_eq!(d.take_events().len(), 2);

        for _ in 0..500 {
            d.mint(ALICE, UNIT).unwrap();
            d.burn(ALICE, UNIT / 2u64).unwrap();
            assert_eq!(d.take_events().len(), 4);
            assert!(d.token(TokenKind::A).unwrap().events().is_empty());
            assert!(d.token(TokenKind::B).unwrap().events().is_empty());
        }
        assert_eq!(d.pending_events(), 0);
    }

    #[test]
    fn test_rejected_operation_emits_no_events() {
        let mut d = derivative();
        d.init(ALICE, &init_args()).unwrap();
        d.take_events();

        let broke = Address::from_low_u8(0xb0);
        assert!(d.mint(broke, UNIT).is_err());
        assert_eq!(d.pending_events(), 0);

        d.transfer(TokenKind::B, ALICE, broke, UNIT).unwrap();
        assert_eq!(
            d.take_events(),
            vec![TokenEvent {
                token: TokenKind::B,
                event: LedgerEvent::Transfer {
                    from: ALICE,
                    to: broke,
                    value: UNIT,
                },
            }]
        );
    }
}

//! Constant-product pool over the A and B tranche reserves
//!
//! Every value-moving formula takes the fee multiplier `f` (see
//! [`crate::fee_curve`]) and floors every division. The `quote_*` functions
//! are pure; the mutating counterparts check the caller's bound, apply the
//! reserve changes and return the realized amount. Bounds are strict in the
//! caller's favour only: meeting a bound exactly succeeds.
//!
//! The pool knows nothing about balances or collateral. Minting, burning
//! and moving tranche tokens is the derivative's job.

use serde::{Deserialize, Serialize};
use std::fmt;
use types::{MathError, TradeError, WadMath, U256, U512, UNIT};

/// One of the two tranches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// Reserve changes and user amount produced by a single-sided mint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleSidedMint {
    /// Collateral paid by the caller
    pub amount_in: U256,
    /// Tranche tokens received by the caller
    pub amount_out: U256,
}

/// Reserve changes and user amount produced by a single-sided burn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleSidedBurn {
    /// Tranche tokens burned by the caller
    pub burned: U256,
    /// Part of `burned` sold into the pool for the opposite tranche
    pub sold: U256,
    /// Collateral returned to the caller
    pub amount_out: U256,
}

/// Tranche reserves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TranchePool {
    pub pool_a: U256,
    pub pool_b: U256,
}

fn check_min(realized: U256, bound: U256) -> Result<(), TradeError> {
    if realized < bound {
        return Err(TradeError::Slippage { realized, bound });
    }
    Ok(())
}

fn check_max(realized: U256, bound: U256) -> Result<(), TradeError> {
    if realized > bound {
        return Err(TradeError::Slippage { realized, bound });
    }
    Ok(())
}

fn take(reserve: U256, requested: U256) -> Result<U256, TradeError> {
    reserve
        .checked_sub(requested)
        .ok_or(TradeError::InsufficientReserve {
            requested,
            available: reserve,
        })
}

/// `(sqrtFloor(x² + r) - x) * UNIT / 2 / f`, the root of the fee-adjusted
/// quadratic shared by exact mints and single-sided burns
fn solve_quadratic(x: U256, r: U256, f: U256) -> Result<U256, MathError> {
    let radicand = x
        .full_mul(x)
        .checked_add(U512::from(r))
        .ok_or(MathError::Overflow)?;
    let root = WadMath::sqrt_floor_wide(radicand);
    let scaled = WadMath::mul_div(WadMath::checked_sub(root, x)?, UNIT, U256::from(2u8))?;
    WadMath::checked_div(scaled, f)
}

impl TranchePool {
    pub fn new(pool_a: U256, pool_b: U256) -> Self {
        Self { pool_a, pool_b }
    }

    pub fn reserve(&self, side: Side) -> U256 {
        match side {
            Side::A => self.pool_a,
            Side::B => self.pool_b,
        }
    }

    fn reserve_mut(&mut self, side: Side) -> &mut U256 {
        match side {
            Side::A => &mut self.pool_a,
            Side::B => &mut self.pool_b,
        }
    }

    /// `poolA * poolB` without truncation
    pub fn invariant(&self) -> U512 {
        self.pool_a.full_mul(self.pool_b)
    }

    /// `sqrtFloor(poolA * poolB)`
    pub fn sqrt_k(&self) -> U256 {
        WadMath::sqrt_floor_wide(self.invariant())
    }

    /// Price of one unit of `side` expressed in the opposite tranche, scaled by [`UNIT`]
    pub fn spot_price(&self, side: Side) -> Result<U256, MathError> {
        WadMath::div_wad(self.reserve(side.other()), self.reserve(side))
    }

    fn ensure_liquid(&self) -> Result<(), TradeError> {
        if self.pool_a.is_zero() || self.pool_b.is_zero() {
            return Err(TradeError::EmptyPool);
        }
        Ok(())
    }

    // ----- swap -----

    /// Output of selling `amount_in` of `from` for the opposite tranche
    ///
    /// `out = in*f*poolTo / (poolFrom*UNIT + in*f)`
    pub fn quote_swap(&self, from: Side, amount_in: U256, f: U256) -> Result<U256, TradeError> {
        self.ensure_liquid()?;
        let weighted_in = WadMath::checked_mul(amount_in, f)?;
        let denominator = WadMath::checked_add(
            WadMath::checked_mul(self.reserve(from), UNIT)?,
            weighted_in,
        )?;
        Ok(WadMath::mul_div(weighted_in, self.reserve(from.other()), denominator)?)
    }

    pub fn swap(
        &mut self,
        from: Side,
        amount_in: U256,
        min_out: U256,
        f: U256,
    ) -> Result<U256, TradeError> {
        let out = self.quote_swap(from, amount_in, f)?;
        check_min(out, min_out)?;

        let to_reserve = take(self.reserve(from.other()), out)?;
        let from_reserve = WadMath::checked_add(self.reserve(from), amount_in)?;
        *self.reserve_mut(from) = from_reserve;
        *self.reserve_mut(from.other()) = to_reserve;
        Ok(out)
    }

    // ----- single-sided mint -----

    /// Mint `amount` of both tranches and swap the unwanted side into `side`
    pub fn quote_mint_single(
        &self,
        side: Side,
        amount: U256,
        f: U256,
    ) -> Result<SingleSidedMint, TradeError> {
        let swapped = self.quote_swap(side.other(), amount, f)?;
        Ok(SingleSidedMint {
            amount_in: amount,
            amount_out: WadMath::checked_add(amount, swapped)?,
        })
    }

    /// Pay `amount` collateral, receive at least `min_out` of `side`
    pub fn mint_single(
        &mut self,
        side: Side,
        amount: U256,
        min_out: U256,
        f: U256,
    ) -> Result<SingleSidedMint, TradeError> {
        let quote = self.quote_mint_single(side, amount, f)?;
        check_min(quote.amount_out, min_out)?;

        let swapped = quote.amount_out - amount;
        let side_reserve = take(self.reserve(side), swapped)?;
        let other_reserve = WadMath::checked_add(self.reserve(side.other()), amount)?;
        *self.reserve_mut(side) = side_reserve;
        *self.reserve_mut(side.other()) = other_reserve;
        Ok(quote)
    }

    /// Collateral needed to receive exactly `desired` of `side`
    ///
    /// `x = (poolSide - desired)*f/UNIT + poolOther`,
    /// `r = desired*4*poolOther*f/UNIT`,
    /// `amount = (sqrtFloor(x² + r) - x)*UNIT/2/f`
    pub fn quote_mint_exact(
        &self,
        side: Side,
        desired: U256,
        f: U256,
    ) -> Result<SingleSidedMint, TradeError> {
        self.ensure_liquid()?;
        let pool_side = self.reserve(side);
        let pool_other = self.reserve(side.other());

        let remaining = take(pool_side, desired)?;
        let x = WadMath::checked_add(WadMath::mul_div(remaining, f, UNIT)?, pool_other)?;
        let r = WadMath::mul_div(
            WadMath::checked_mul(WadMath::checked_mul(desired, U256::from(4u8))?, pool_other)?,
            f,
            UNIT,
        )?;
        let amount_in = solve_quadratic(x, r, f)?;

        Ok(SingleSidedMint {
            amount_in,
            amount_out: desired,
        })
    }

    /// Receive exactly `desired` of `side`, paying at most `max_in` collateral
    pub fn mint_exact(
        &mut self,
        side: Side,
        desired: U256,
        max_in: U256,
        f: U256,
    ) -> Result<SingleSidedMint, TradeError> {
        let quote = self.quote_mint_exact(side, desired, f)?;
        check_max(quote.amount_in, max_in)?;

        let side_reserve = take(
            WadMath::checked_add(self.reserve(side), quote.amount_in)?,
            desired,
        )?;
        let other_reserve = WadMath::checked_add(self.reserve(side.other()), quote.amount_in)?;
        *self.reserve_mut(side) = side_reserve;
        *self.reserve_mut(side.other()) = other_reserve;
        Ok(quote)
    }

    // ----- single-sided burn -----

    /// Sell part of `burned` into the pool so the rest pairs up for redemption
    ///
    /// `x = (poolOther - burned)*f/UNIT + poolSide`,
    /// `r = burned*4*poolSide*f/UNIT`,
    /// `sold = (sqrtFloor(x² + r) - x)*UNIT/2/f`, `out = burned - sold`
    pub fn quote_burn_single(
        &self,
        side: Side,
        burned: U256,
        f: U256,
    ) -> Result<SingleSidedBurn, TradeError> {
        self.ensure_liquid()?;
        let pool_side = self.reserve(side);
        let pool_other = self.reserve(side.other());

        let remaining = take(pool_other, burned)?;
        let x = WadMath::checked_add(WadMath::mul_div(remaining, f, UNIT)?, pool_side)?;
        let r = WadMath::mul_div(
            WadMath::checked_mul(WadMath::checked_mul(burned, U256::from(4u8))?, pool_side)?,
            f,
            UNIT,
        )?;
        let sold = solve_quadratic(x, r, f)?;

        Ok(SingleSidedBurn {
            burned,
            sold,
            amount_out: WadMath::checked_sub(burned, sold)?,
        })
    }

    /// Burn `burned` of `side`, receive at least `min_out` collateral
    pub fn burn_single(
        &mut self,
        side: Side,
        burned: U256,
        min_out: U256,
        f: U256,
    ) -> Result<SingleSidedBurn, TradeError> {
        let quote = self.quote_burn_single(side, burned, f)?;
        check_min(quote.amount_out, min_out)?;

        let other_reserve = take(self.reserve(side.other()), quote.amount_out)?;
        let side_reserve = WadMath::checked_add(self.reserve(side), quote.sold)?;
        *self.reserve_mut(side) = side_reserve;
        *self.reserve_mut(side.other()) = other_reserve;
        Ok(quote)
    }

    /// Tokens of `side` to burn for exactly `desired` collateral
    ///
    /// `sold = desired*UNIT*poolSide / ((poolOther - desired)*f) + 1`,
    /// `burned = desired + sold`. Rounds against the caller.
    pub fn quote_burn_exact(
        &self,
        side: Side,
        desired: U256,
        f: U256,
    ) -> Result<SingleSidedBurn, TradeError> {
        self.ensure_liquid()?;
        let pool_side = self.reserve(side);
        let pool_other = self.reserve(side.other());

        let remaining = take(pool_other, desired)?;
        if remaining.is_zero() {
            return Err(TradeError::InsufficientReserve {
                requested: desired,
                available: pool_other,
            });
        }
        let sold = WadMath::checked_add(
            WadMath::mul_div(
                WadMath::checked_mul(desired, UNIT)?,
                pool_side,
                WadMath::checked_mul(remaining, f)?,
            )?,
            U256::one(),
        )?;

        Ok(SingleSidedBurn {
            burned: WadMath::checked_add(desired, sold)?,
            sold,
            amount_out: desired,
        })
    }

    /// Receive exactly `desired` collateral, burning at most `max_burn` of `side`
    pub fn burn_exact(
        &mut self,
        side: Side,
        desired: U256,
        max_burn: U256,
        f: U256,
    ) -> Result<SingleSidedBurn, TradeError> {
        let quote = self.quote_burn_exact(side, desired, f)?;
        check_max(quote.burned, max_burn)?;

        let other_reserve = take(self.reserve(side.other()), desired)?;
        let side_reserve = WadMath::checked_add(self.reserve(side), quote.sold)?;
        *self.reserve_mut(side) = side_reserve;
        *self.reserve_mut(side.other()) = other_reserve;
        Ok(quote)
    }

    // ----- liquidity -----

    /// LP minted for adding `a_in`/`b_in` to the reserves
    ///
    /// `lp = ((k'*UNIT/k - UNIT) * supply/UNIT) * f/UNIT`
    pub fn quote_deposit(
        &self,
        a_in: U256,
        b_in: U256,
        supply: U256,
        f: U256,
    ) -> Result<U256, TradeError> {
        self.ensure_liquid()?;
        let k = self.sqrt_k();
        let grown = TranchePool::new(
            WadMath::checked_add(self.pool_a, a_in)?,
            WadMath::checked_add(self.pool_b, b_in)?,
        );
        let growth = WadMath::checked_sub(WadMath::mul_div(grown.sqrt_k(), UNIT, k)?, UNIT)?;
        let lp = WadMath::mul_div(WadMath::mul_div(growth, supply, UNIT)?, f, UNIT)?;
        Ok(lp)
    }

    pub fn deposit(
        &mut self,
        a_in: U256,
        b_in: U256,
        min_lp: U256,
        supply: U256,
        f: U256,
    ) -> Result<U256, TradeError> {
        let lp = self.quote_deposit(a_in, b_in, supply, f)?;
        check_min(lp, min_lp)?;
        self.pool_a = WadMath::checked_add(self.pool_a, a_in)?;
        self.pool_b = WadMath::checked_add(self.pool_b, b_in)?;
        Ok(lp)
    }

    /// LP burned for removing `a_out`/`b_out` from the reserves
    ///
    /// `lp = ((UNIT - k'*UNIT/k) * supply/UNIT) * UNIT/f`
    pub fn quote_withdraw(
        &self,
        a_out: U256,
        b_out: U256,
        supply: U256,
        f: U256,
    ) -> Result<U256, TradeError> {
        self.ensure_liquid()?;
        let k = self.sqrt_k();
        let shrunk = TranchePool::new(take(self.pool_a, a_out)?, take(self.pool_b, b_out)?);
        let loss = WadMath::complement(WadMath::mul_div(shrunk.sqrt_k(), UNIT, k)?)?;
        let lp = WadMath::mul_div(WadMath::mul_div(loss, supply, UNIT)?, UNIT, f)?;
        Ok(lp)
    }

    pub fn withdraw(
        &mut self,
        a_out: U256,
        b_out: U256,
        max_lp: U256,
        supply: U256,
        f: U256,
    ) -> Result<U256, TradeError> {
        let lp = self.quote_withdraw(a_out, b_out, supply, f)?;
        check_max(lp, max_lp)?;
        self.pool_a = take(self.pool_a, a_out)?;
        self.pool_b = take(self.pool_b, b_out)?;
        Ok(lp)
    }

    /// Collateral returned for burning `lp` shares straight out of both reserves
    ///
    /// `g = f*lp/supply`, `s = poolA + poolB`,
    /// `amount = (s - sqrtFloor(s² - (poolA*poolB*4*g/UNIT)*(2*UNIT - g)/UNIT)) / 2`
    pub fn quote_burn_lp(&self, lp: U256, supply: U256, f: U256) -> Result<U256, TradeError> {
        self.ensure_liquid()?;
        let g = WadMath::mul_div(f, lp, supply)?;
        let unit_wide = U512::from(UNIT);

        let sum = WadMath::checked_add(self.pool_a, self.pool_b)?;
        let product = self
            .invariant()
            .checked_mul(U512::from(4u8))
            .and_then(|p| p.checked_mul(U512::from(g)))
            .ok_or(MathError::Overflow)?
            / unit_wide;
        let two_units_less_g = WadMath::checked_sub(
            WadMath::checked_mul(UNIT, U256::from(2u8))?,
            g,
        )?;
        let discount = product
            .checked_mul(U512::from(two_units_less_g))
            .ok_or(MathError::Overflow)?
            / unit_wide;

        let radicand = sum
            .full_mul(sum)
            .checked_sub(discount)
            .ok_or(MathError::Underflow)?;
        let root = WadMath::sqrt_floor_wide(radicand);
        Ok(WadMath::checked_sub(sum, root)? / U256::from(2u8))
    }

    pub fn burn_lp(
        &mut self,
        lp: U256,
        min_out: U256,
        supply: U256,
        f: U256,
    ) -> Result<U256, TradeError> {
        let amount = self.quote_burn_lp(lp, supply, f)?;
        check_min(amount, min_out)?;
        self.pool_a = take(self.pool_a, amount)?;
        self.pool_b = take(self.pool_b, amount)?;
        Ok(amount)
    }

    /// Remove the reserves backing `lp` of `supply` shares
    ///
    /// Used at settlement: `(poolA*lp/supply, poolB*lp/supply)`, no fee.
    pub fn remove_share(&mut self, lp: U256, supply: U256) -> Result<(U256, U256), TradeError> {
        if lp.is_zero() {
            return Ok((U256::zero(), U256::zero()));
        }
        let da = WadMath::mul_div(self.pool_a, lp, supply)?;
        let db = WadMath::mul_div(self.pool_b, lp, supply)?;
        self.pool_a = take(self.pool_a, da)?;
        self.pool_b = take(self.pool_b, db)?;
        Ok((da, db))
    }
}

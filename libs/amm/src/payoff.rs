//! Settlement payoff formulas
//!
//! Each derivative variant turns its opening and closing reference values
//! into `bPrice`, the share of settlement value carried by one B token. A
//! token then redeems for `UNIT - bPrice`. Every result is clamped into
//! `[0, UNIT]`.

use serde::{Deserialize, Serialize};
use std::fmt;
use types::{MathError, WadMath, U256, U512, UNIT};

/// Payoff family of a derivative instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoffKind {
    /// Leveraged price-delta between open and close
    Delta,
    /// Impermanent loss of a 50/50 constant-product position
    ImpermanentLoss,
    /// Growth of an interest-bearing exchange rate
    InterestRateSpread,
}

impl fmt::Display for PayoffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayoffKind::Delta => write!(f, "delta"),
            PayoffKind::ImpermanentLoss => write!(f, "impermanent_loss"),
            PayoffKind::InterestRateSpread => write!(f, "interest_rate_spread"),
        }
    }
}

/// Payoff family plus its leverage (scaled by [`UNIT`])
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payoff {
    pub kind: PayoffKind,
    pub leverage: U256,
}

impl Payoff {
    pub fn new(kind: PayoffKind, leverage: U256) -> Self {
        Self { kind, leverage }
    }

    /// `bPrice` for the given opening and closing reference values
    pub fn b_price(&self, open: U256, close: U256) -> Result<U256, MathError> {
        match self.kind {
            PayoffKind::Delta => PayoffMath::calc_delta(self.leverage, open, close),
            PayoffKind::ImpermanentLoss => {
                let ratio = WadMath::div_wad(close, open)?;
                let il = PayoffMath::calc_il(ratio)?;
                Ok(WadMath::mul_wad(il, self.leverage)?.min(UNIT))
            }
            PayoffKind::InterestRateSpread => {
                let rate = WadMath::div_wad(close, open)?;
                PayoffMath::calc_spread(self.leverage, rate)
            }
        }
    }
}

/// Payoff math functions
pub struct PayoffMath;

impl PayoffMath {
    /// Leveraged delta curve centred on one half
    ///
    /// `n = |x - a| * l / UNIT`, `d = sqrtFloor(a² + n²) * 2`,
    /// `UNIT/2 ± n * UNIT / d` with `+` when `x >= a`. The curve is
    /// bounded by `(0, UNIT)` so no clamp is needed.
    pub fn calc_delta(leverage: U256, open: U256, close: U256) -> Result<U256, MathError> {
        let half = UNIT / U256::from(2u8);
        let up = close >= open;
        let moved = if up { close - open } else { open - close };
        let n = WadMath::mul_wad(moved, leverage)?;
        if n.is_zero() {
            return Ok(half);
        }

        let radicand = open
            .full_mul(open)
            .checked_add(n.full_mul(n))
            .ok_or(MathError::Overflow)?;
        let d = WadMath::checked_mul(WadMath::sqrt_floor_wide(radicand), U256::from(2u8))?;
        let offset = WadMath::mul_div(n, UNIT, d)?;

        if up {
            WadMath::checked_add(half, offset)
        } else {
            WadMath::checked_sub(half, offset)
        }
    }

    /// Impermanent loss for a price ratio scaled by [`UNIT`]
    ///
    /// `UNIT - sqrtFloor(ratio * UNIT) * 2UNIT / (ratio + UNIT)`
    pub fn calc_il(ratio: U256) -> Result<U256, MathError> {
        let root = WadMath::sqrt_floor_wide(ratio.full_mul(UNIT));
        let hold = WadMath::mul_div(
            root,
            WadMath::checked_mul(UNIT, U256::from(2u8))?,
            WadMath::checked_add(ratio, UNIT)?,
        )?;
        // 2√r/(1+r) <= 1, floor keeps it there
        Ok(UNIT.saturating_sub(hold))
    }

    /// Leveraged growth of a rate above one, clamped into `[0, UNIT]`
    pub fn calc_spread(leverage: U256, rate: U256) -> Result<U256, MathError> {
        let growth = rate.saturating_sub(UNIT);
        let scaled = U512::from(growth) * U512::from(leverage) / U512::from(UNIT);
        Ok(U256::try_from(scaled).unwrap_or(UNIT).min(UNIT))
    }
}

//! Settlement engine
//!
//! Fixes the settlement record when the derivative closes and prices each
//! claim against it. A holder's A, B and LP balances collapse into one
//! collateral amount weighted by `bPrice`, less the protocol fee.

use crate::error::Result;
use amm::{Payoff, TranchePool};
use serde::Serialize;
use tracing::info;
use types::{MathError, WadMath, U256, U512, UNIT};

/// Values frozen at close and read by every claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettlementRecord {
    /// Redemption value of one B token, in `[0, UNIT]`
    pub b_price: U256,
    pub protocol_fee: U256,
    pub opening_value: U256,
    pub closing_value: U256,
    pub closed_at: u64,
}

/// Breakdown of a single claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClaimQuote {
    /// Share of `poolA` backing the claimed LP
    pub da: U256,
    /// Share of `poolB` backing the claimed LP
    pub db: U256,
    pub gross: U256,
    pub fee: U256,
    pub payout: U256,
}

pub struct SettlementEngine;

impl SettlementEngine {
    pub fn settle(
        payoff: &Payoff,
        opening_value: U256,
        closing_value: U256,
        protocol_fee: U256,
        closed_at: u64,
    ) -> Result<SettlementRecord> {
        let b_price = payoff.b_price(opening_value, closing_value)?.min(UNIT);
        info!(
            kind = %payoff.kind,
            %opening_value,
            %closing_value,
            %b_price,
            "settlement fixed"
        );
        Ok(SettlementRecord {
            b_price,
            protocol_fee,
            opening_value,
            closing_value,
            closed_at,
        })
    }

    /// Price a claim on `a`, `b` and `lp` against the current reserves
    ///
    /// `amount = ((a + da)*(UNIT - bPrice) + (b + db)*bPrice) / UNIT`,
    /// `fee = amount*protocolFee/UNIT`, `payout = amount - fee`
    pub fn quote_claim(
        record: &SettlementRecord,
        a: U256,
        b: U256,
        lp: U256,
        pool: &TranchePool,
        lp_supply: U256,
    ) -> Result<ClaimQuote> {
        let (da, db) = if lp.is_zero() {
            (U256::zero(), U256::zero())
        } else {
            (
                WadMath::mul_div(pool.pool_a, lp, lp_supply)?,
                WadMath::mul_div(pool.pool_b, lp, lp_supply)?,
            )
        };

        let a_total = WadMath::checked_add(a, da)?;
        let b_total = WadMath::checked_add(b, db)?;
        let a_weight = WadMath::complement(record.b_price)?;

        let weighted = a_total
            .full_mul(a_weight)
            .checked_add(b_total.full_mul(record.b_price))
            .ok_or(MathError::Overflow)?;
        let gross = U256::try_from(weighted / U512::from(UNIT)).map_err(|_| MathError::Overflow)?;

        let fee = WadMath::mul_wad(gross, record.protocol_fee)?;
        let payout = WadMath::checked_sub(gross, fee)?;
        Ok(ClaimQuote {
            da,
            db,
            gross,
            fee,
            payout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amm::PayoffKind;

    fn record(b_price: U256, protocol_fee: U256) -> SettlementRecord {
        SettlementRecord {
            b_price,
            protocol_fee,
            opening_value: UNIT,
            closing_value: UNIT,
            closed_at: 0,
        }
    }

    #[test]
    fn test_claim_without_lp() {
        let x = UNIT * 7u64;
        let y = UNIT * 3u64;
        let p = UNIT / 4u64;
        let f = UNIT * 3u64 / 1000u64;
        let quote =
            SettlementEngine::quote_claim(&record(p, f), x, y, U256::zero(), &TranchePool::default(), U256::zero())
                .unwrap();

        let gross = (x * (UNIT - p) + y * p) / UNIT;
        assert_eq!(quote.gross, gross);
        assert_eq!(quote.fee, gross * f / UNIT);
        assert_eq!(quote.payout, gross - gross * f / UNIT);
        assert_eq!(quote.da, U256::zero());
    }

    #[test]
    fn test_claim_includes_lp_share() {
        let pool = TranchePool::new(UNIT * 100u64, UNIT * 300u64);
        let quote = SettlementEngine::quote_claim(
            &record(UNIT / 2u64, U256::zero()),
            U256::zero(),
            U256::zero(),
            U256::from(1u8),
            &pool,
            U256::from(10u8),
        )
        .unwrap();
        assert_eq!(quote.da, UNIT * 10u64);
        assert_eq!(quote.db, UNIT * 30u64);
        assert_eq!(quote.payout, UNIT * 20u64);
    }

    #[test]
    fn test_settle_clamps_and_records() {
        let payoff = Payoff::new(PayoffKind::InterestRateSpread, UNIT * 100u64);
        let record = SettlementEngine::settle(&payoff, UNIT, UNIT * 2u64, U256::zero(), 42).unwrap();
        assert_eq!(record.b_price, UNIT);
        assert_eq!(record.closed_at, 42);
    }
}

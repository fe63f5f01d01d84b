//! Time-weighted fee curve
//!
//! The trading fee moves linearly between `min_fee` and `max_fee` across
//! the trading window. Callers never see the raw fee: every function here
//! returns the *multiplier* `UNIT - fee` that trade amounts are scaled by.

use serde::{Deserialize, Serialize};
use tracing::trace;
use types::{MathError, WadMath, U256, UNIT};

/// Direction the fee travels over the trading window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeSchedule {
    /// Starts at `max_fee`, ends at `min_fee`
    Decreasing,
    /// Starts at `min_fee`, ends at `max_fee`
    Increasing,
}

impl FeeSchedule {
    /// Multiplier for an already elapsed (or zero-length) window
    pub fn terminal_multiplier(self, min_fee: U256, max_fee: U256) -> Result<U256, MathError> {
        match self {
            FeeSchedule::Decreasing => WadMath::complement(min_fee),
            FeeSchedule::Increasing => WadMath::complement(max_fee),
        }
    }
}

/// Fee multiplier at `tx_time`
///
/// # Arguments
/// * `open_time` / `close_time` - trading window in unix seconds
/// * `tx_time` - time of the transaction, expected inside the window
/// * `min_fee` / `max_fee` - fee bounds as fractions of [`UNIT`]
///
/// # Returns
/// `UNIT - fee`. A window with `close_time <= open_time` yields the terminal
/// value. No clamping happens otherwise: a `tx_time` before `open_time`, or
/// one far enough past `close_time` to push the fee below zero or above one,
/// is an arithmetic error.
pub fn fee_multiplier(
    schedule: FeeSchedule,
    open_time: u64,
    close_time: u64,
    tx_time: u64,
    min_fee: U256,
    max_fee: U256,
) -> Result<U256, MathError> {
    if close_time <= open_time {
        return schedule.terminal_multiplier(min_fee, max_fee);
    }

    let elapsed = tx_time.checked_sub(open_time).ok_or(MathError::Underflow)?;
    let span = WadMath::checked_sub(max_fee, min_fee)?;
    let step = WadMath::mul_div(span, U256::from(elapsed), U256::from(close_time - open_time))?;

    let fee = match schedule {
        FeeSchedule::Decreasing => WadMath::checked_sub(max_fee, step)?,
        FeeSchedule::Increasing => WadMath::checked_add(min_fee, step)?,
    };

    trace!(?schedule, elapsed, %fee, "fee curve evaluated");
    WadMath::complement(fee)
}

/// Trading window and fee bounds fixed at initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeWindow {
    pub open_time: u64,
    pub close_time: u64,
    pub min_fee: U256,
    pub max_fee: U256,
    pub schedule: FeeSchedule,
}

impl FeeWindow {
    pub fn new(
        open_time: u64,
        duration_secs: u64,
        min_fee: U256,
        max_fee: U256,
        schedule: FeeSchedule,
    ) -> Result<Self, MathError> {
        let close_time = open_time
            .checked_add(duration_secs)
            .ok_or(MathError::Overflow)?;
        Ok(Self {
            open_time,
            close_time,
            min_fee,
            max_fee,
            schedule,
        })
    }

    /// Multiplier observed by a transaction at `now`
    ///
    /// Once the window has elapsed the multiplier stays at its terminal
    /// value, so reads between the close time and the actual close call
    /// report the final fee instead of extrapolating the line.
    pub fn multiplier_at(&self, now: u64) -> Result<U256, MathError> {
        if now >= self.close_time {
            return self.schedule.terminal_multiplier(self.min_fee, self.max_fee);
        }
        fee_multiplier(
            self.schedule,
            self.open_time,
            self.close_time,
            now.max(self.open_time),
            self.min_fee,
            self.max_fee,
        )
    }

    /// Raw fee fraction at `now`
    pub fn fee_at(&self, now: u64) -> Result<U256, MathError> {
        WadMath::checked_sub(UNIT, self.multiplier_at(now)?)
    }

    pub fn is_elapsed(&self, now: u64) -> bool {
        now >= self.close_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pct(n: u64) -> U256 {
        UNIT * n / 100u64
    }

    #[test]
    fn test_decreasing_fee_interpolates() {
        // 10% -> 1% over 100 seconds, a quarter of the way in
        let multiplier =
            fee_multiplier(FeeSchedule::Decreasing, 1_000, 1_100, 1_025, pct(1), pct(10)).unwrap();
        let expected_fee = pct(10) - (pct(10) - pct(1)) * 25u64 / 100u64;
        assert_eq!(multiplier, UNIT - expected_fee);
    }

    #[test]
    fn test_increasing_fee_interpolates() {
        let multiplier =
            fee_multiplier(FeeSchedule::Increasing, 0, 200, 50, pct(1), pct(5)).unwrap();
        let expected_fee = pct(1) + (pct(5) - pct(1)) * 50u64 / 200u64;
        assert_eq!(multiplier, UNIT - expected_fee);
    }

    #[test]
    fn test_window_endpoints() {
        let start = fee_multiplier(FeeSchedule::Decreasing, 0, 100, 0, pct(1), pct(10)).unwrap();
        let end = fee_multiplier(FeeSchedule::Decreasing, 0, 100, 100, pct(1), pct(10)).unwrap();
        assert_eq!(start, UNIT - pct(10));
        assert_eq!(end, UNIT - pct(1));
    }

    #[test]
    fn test_degenerate_window_returns_terminal_value() {
        assert_eq!(
            fee_multiplier(FeeSchedule::Decreasing, 50, 50, 50, pct(1), pct(10)).unwrap(),
            UNIT - pct(1)
        );
        assert_eq!(
            fee_multiplier(FeeSchedule::Increasing, 60, 50, 70, pct(1), pct(10)).unwrap(),
            UNIT - pct(10)
        );
    }

    #[test]
    fn test_tx_before_open_is_an_error() {
        assert_eq!(
            fee_multiplier(FeeSchedule::Decreasing, 100, 200, 99, pct(1), pct(10)),
            Err(MathError::Underflow)
        );
    }

    #[test]
    fn test_pure_function_does_not_clamp_past_close() {
        // Decreasing fee keeps falling past min and eventually below zero
        let past = fee_multiplier(FeeSchedule::Decreasing, 0, 100, 105, pct(1), pct(10)).unwrap();
        assert!(past > UNIT - pct(1));
        assert!(fee_multiplier(FeeSchedule::Decreasing, 0, 100, 1_000, pct(1), pct(10)).is_err());
    }

    #[test]
    fn test_window_saturates_after_close() {
        let window = FeeWindow::new(1_000, 86_400, pct(1), pct(10), FeeSchedule::Decreasing).unwrap();
        assert_eq!(window.close_time, 87_400);
        assert_eq!(window.multiplier_at(87_400).unwrap(), UNIT - pct(1));
        assert_eq!(window.multiplier_at(1_000_000).unwrap(), UNIT - pct(1));
        assert_eq!(window.fee_at(1_000_000).unwrap(), pct(1));

        let rising = FeeWindow { schedule: FeeSchedule::Increasing, ..window };
        assert_eq!(rising.fee_at(90_000).unwrap(), pct(10));
        assert!(rising.is_elapsed(87_400));
        assert!(!rising.is_elapsed(87_399));
    }

    proptest! {
        #[test]
        fn prop_decreasing_fee_is_monotonic(
            t1 in 0u64..=10_000,
            t2 in 0u64..=10_000,
            min_bps in 0u64..=500,
            extra_bps in 0u64..=500,
        ) {
            let (early, late) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
            let min_fee = UNIT * min_bps / 10_000u64;
            let max_fee = UNIT * (min_bps + extra_bps) / 10_000u64;
            let early_fee = UNIT - fee_multiplier(FeeSchedule::Decreasing, 0, 10_000, early, min_fee, max_fee).unwrap();
            let late_fee = UNIT - fee_multiplier(FeeSchedule::Decreasing, 0, 10_000, late, min_fee, max_fee).unwrap();
            prop_assert!(early_fee >= late_fee);
            prop_assert!(late_fee >= min_fee && early_fee <= max_fee);
        }

        #[test]
        fn prop_increasing_fee_is_monotonic(t1 in 0u64..=10_000, t2 in 0u64..=10_000) {
            let (early, late) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
            let early_m = fee_multiplier(FeeSchedule::Increasing, 0, 10_000, early, pct(1), pct(3)).unwrap();
            let late_m = fee_multiplier(FeeSchedule::Increasing, 0, 10_000, late, pct(1), pct(3)).unwrap();
            prop_assert!(early_m >= late_m);
        }
    }
}

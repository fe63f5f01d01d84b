//! Fixed-point arithmetic over 18-decimal integers
//!
//! Ratios, fees and prices are `U256` values with an implicit scale of
//! [`UNIT`] (10^18); token quantities are plain `U256` integers. Every
//! division floors, which biases rounding against the caller and in favour
//! of the pool. The rounding order of each formula is part of its contract:
//! `a * b / c / d` and `a * (b / c) / d` are different numbers here.
//!
//! ## Design Principles
//!
//! - **No Precision Loss**: all values stored as scaled integers, no floats
//! - **Overflow Protection**: checked arithmetic returning [`MathError`]
//! - **Wide Intermediates**: products go through `U512` before dividing
//! - **Exact Roots**: integer Newton iteration for `sqrt_floor`
//! - **Clear Boundaries**: decimal strings only at config/CLI/log edges

use crate::common::errors::{FixedPointError, MathError};
use primitive_types::{U256, U512};
use rust_decimal::Decimal;
use std::str::FromStr;

/// 10^18, the fixed-point one
pub const UNIT: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// Number of decimals carried by [`UNIT`]
pub const UNIT_DECIMALS: u8 = 18;

/// Fixed-point math functions with floor rounding
pub struct WadMath;

impl WadMath {
    /// `floor(x * y / z)` with a 512-bit intermediate product
    pub fn mul_div(x: U256, y: U256, z: U256) -> Result<U256, MathError> {
        if z.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let quotient = x.full_mul(y) / U512::from(z);
        U256::try_from(quotient).map_err(|_| MathError::Overflow)
    }

    /// `floor(x * y / UNIT)`
    pub fn mul_wad(x: U256, y: U256) -> Result<U256, MathError> {
        Self::mul_div(x, y, UNIT)
    }

    /// `floor(x * UNIT / y)`
    pub fn div_wad(x: U256, y: U256) -> Result<U256, MathError> {
        Self::mul_div(x, UNIT, y)
    }

    /// `UNIT - x`, failing when `x` exceeds one
    pub fn complement(x: U256) -> Result<U256, MathError> {
        Self::checked_sub(UNIT, x)
    }

    pub fn checked_add(x: U256, y: U256) -> Result<U256, MathError> {
        x.checked_add(y).ok_or(MathError::Overflow)
    }

    pub fn checked_sub(x: U256, y: U256) -> Result<U256, MathError> {
        x.checked_sub(y).ok_or(MathError::Underflow)
    }

    pub fn checked_mul(x: U256, y: U256) -> Result<U256, MathError> {
        x.checked_mul(y).ok_or(MathError::Overflow)
    }

    pub fn checked_div(x: U256, y: U256) -> Result<U256, MathError> {
        x.checked_div(y).ok_or(MathError::DivisionByZero)
    }

    /// Largest `s` with `s * s <= x`
    pub fn sqrt_floor(x: U256) -> U256 {
        if x.is_zero() {
            return U256::zero();
        }

        // 2^ceil(bits/2) is always at or above the root, so the iteration
        // decreases monotonically until it reaches the floor
        let mut z = U256::from(2u8).pow(U256::from(((x.bits() + 1) / 2) as u64));
        loop {
            let next = (z + x / z) / U256::from(2u8);
            if next >= z {
                return z;
            }
            z = next;
        }
    }

    /// Largest `s` with `s * s <= x` for a 512-bit radicand
    ///
    /// The root of any 512-bit value fits in 256 bits, so products such as
    /// `poolA * poolB` can be rooted without intermediate truncation.
    pub fn sqrt_floor_wide(x: U512) -> U256 {
        if x.is_zero() {
            return U256::zero();
        }

        let mut z = U512::from(2u8).pow(U512::from(((x.bits() + 1) / 2) as u64));
        loop {
            let next = (z + x / z) / U512::from(2u8);
            if next >= z {
                break;
            }
            z = next;
        }

        // z <= 2^256 - 1 whenever x < 2^512
        U256::try_from(z).unwrap_or_else(|_| U256::MAX)
    }

    /// Parse a decimal string into an integer scaled by `10^decimals`
    ///
    /// This is the PRIMARY way to turn human input (config files, CLI
    /// arguments, scenario scripts) into on-ledger amounts. Values with more
    /// fractional digits than `decimals` are rejected rather than rounded.
    ///
    /// # Examples
    /// ```
    /// use types::{WadMath, UNIT};
    ///
    /// let fee = WadMath::from_decimal_str("0.01", 18).unwrap();
    /// assert_eq!(fee, UNIT / 100u64);
    /// ```
    pub fn from_decimal_str(s: &str, decimals: u8) -> Result<U256, FixedPointError> {
        let decimal = Decimal::from_str(s.trim()).map_err(|_| FixedPointError::InvalidDecimal {
            input: s.to_string(),
        })?;
        Self::from_decimal(decimal, decimals).map_err(|err| match err {
            FixedPointError::InvalidDecimal { .. } => FixedPointError::InvalidDecimal {
                input: s.to_string(),
            },
            other => other,
        })
    }

    /// Scale a [`Decimal`] into an integer with `decimals` fractional digits
    pub fn from_decimal(value: Decimal, decimals: u8) -> Result<U256, FixedPointError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(FixedPointError::Negative {
                input: value.to_string(),
            });
        }

        let normalized = value.normalize();
        let scale = normalized.scale();
        if scale > u32::from(decimals) {
            return Err(FixedPointError::PrecisionLoss {
                input: value.to_string(),
                decimals,
            });
        }

        let mantissa = U256::from(normalized.mantissa().unsigned_abs());
        let factor = U256::exp10((u32::from(decimals) - scale) as usize);
        mantissa
            .checked_mul(factor)
            .ok_or_else(|| FixedPointError::Overflow {
                input: value.to_string(),
            })
    }

    /// Render a scaled integer as a [`Decimal`] for display or logging
    ///
    /// # Warning
    /// Only use for display, logging, or reporting. Returns `None` when the
    /// value exceeds the 96-bit mantissa `Decimal` can hold.
    pub fn to_decimal(value: U256, decimals: u8) -> Option<Decimal> {
        if value.bits() > 127 {
            return None;
        }
        Decimal::try_from_i128_with_scale(value.low_u128() as i128, u32::from(decimals)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_unit_constant() {
        assert_eq!(UNIT, U256::exp10(18));
    }

    #[test]
    fn test_mul_div_floors() {
        let result = WadMath::mul_div(U256::from(7u8), U256::from(3u8), U256::from(2u8)).unwrap();
        assert_eq!(result, U256::from(10u8));
    }

    #[test]
    fn test_mul_div_uses_wide_intermediate() {
        // MAX * MAX would overflow 256 bits, the quotient does not
        let result = WadMath::mul_div(U256::MAX, U256::MAX, U256::MAX).unwrap();
        assert_eq!(result, U256::MAX);
    }

    #[test]
    fn test_mul_div_errors() {
        assert_eq!(
            WadMath::mul_div(U256::one(), U256::one(), U256::zero()),
            Err(MathError::DivisionByZero)
        );
        assert_eq!(
            WadMath::mul_div(U256::MAX, U256::from(2u8), U256::one()),
            Err(MathError::Overflow)
        );
    }

    #[test]
    fn test_checked_helpers() {
        assert_eq!(
            WadMath::checked_sub(U256::zero(), U256::one()),
            Err(MathError::Underflow)
        );
        assert_eq!(
            WadMath::checked_add(U256::MAX, U256::one()),
            Err(MathError::Overflow)
        );
        assert_eq!(
            WadMath::checked_div(U256::one(), U256::zero()),
            Err(MathError::DivisionByZero)
        );
        assert_eq!(WadMath::complement(UNIT / 4u64).unwrap(), UNIT * 3u64 / 4u64);
        assert!(WadMath::complement(UNIT + U256::one()).is_err());
    }

    #[test]
    fn test_sqrt_floor_exact_values() {
        assert_eq!(WadMath::sqrt_floor(U256::zero()), U256::zero());
        assert_eq!(WadMath::sqrt_floor(U256::one()), U256::one());
        assert_eq!(WadMath::sqrt_floor(U256::from(3u8)), U256::one());
        assert_eq!(WadMath::sqrt_floor(U256::from(4u8)), U256::from(2u8));
        assert_eq!(WadMath::sqrt_floor(U256::from(99u8)), U256::from(9u8));
        assert_eq!(WadMath::sqrt_floor(UNIT * UNIT), UNIT);
        assert_eq!(WadMath::sqrt_floor(U256::MAX), U256::from(u128::MAX));
    }

    #[test]
    fn test_sqrt_floor_wide_matches_narrow() {
        let x = UNIT * 1_000_000u64;
        assert_eq!(
            WadMath::sqrt_floor_wide(U512::from(x)),
            WadMath::sqrt_floor(x)
        );
        let product = U256::MAX.full_mul(U256::MAX);
        assert_eq!(WadMath::sqrt_floor_wide(product), U256::MAX);
    }

    #[test]
    fn test_from_decimal_str() {
        assert_eq!(WadMath::from_decimal_str("1", 18).unwrap(), UNIT);
        assert_eq!(WadMath::from_decimal_str("0.5", 18).unwrap(), UNIT / 2u64);
        assert_eq!(
            WadMath::from_decimal_str("10000", 6).unwrap(),
            U256::from(10_000_000_000u64)
        );
        assert_eq!(WadMath::from_decimal_str("1.2500", 2).unwrap(), U256::from(125u8));
    }

    #[test]
    fn test_from_decimal_str_rejects() {
        assert!(matches!(
            WadMath::from_decimal_str("abc", 18),
            Err(FixedPointError::InvalidDecimal { .. })
        ));
        assert!(matches!(
            WadMath::from_decimal_str("-1", 18),
            Err(FixedPointError::Negative { .. })
        ));
        assert!(matches!(
            WadMath::from_decimal_str("0.001", 2),
            Err(FixedPointError::PrecisionLoss { decimals: 2, .. })
        ));
    }

    #[test]
    fn test_to_decimal() {
        assert_eq!(WadMath::to_decimal(UNIT / 4u64, 18), Some(dec!(0.25)));
        assert_eq!(WadMath::to_decimal(U256::MAX, 18), None);
    }

    proptest! {
        #[test]
        fn prop_sqrt_floor_is_floor(x in any::<u128>()) {
            let value = U256::from(x);
            let root = WadMath::sqrt_floor(value);
            prop_assert!(root * root <= value);
            let next = root + U256::one();
            prop_assert!(next * next > value);
        }

        #[test]
        fn prop_mul_div_matches_u128(x in any::<u64>(), y in any::<u64>(), z in 1u64..) {
            let expected = (x as u128) * (y as u128) / (z as u128);
            let result = WadMath::mul_div(U256::from(x), U256::from(y), U256::from(z)).unwrap();
            prop_assert_eq!(result, U256::from(expected));
        }
    }
}

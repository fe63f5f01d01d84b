//! # iGain Shared Types Library
//!
//! Amounts, addresses, fixed-point arithmetic and error types shared by the
//! pool, ledger and derivative crates.
//!
//! ## Design Philosophy
//!
//! - **No Precision Loss**: every amount is a `U256` integer, ratios carry an
//!   implicit 10^18 scale
//! - **Floor Rounding**: all divisions round down, in favour of the pool
//! - **Typed Failures**: arithmetic, trade and ledger errors are distinct
//!   enums so callers can match on the exact abort reason
//! - **Clear Boundaries**: decimal strings are parsed once at config and CLI
//!   edges, never inside the math
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{Address, WadMath, UNIT, U256};
//!
//! // 0.3% expressed in 18-decimal fixed point
//! let fee = WadMath::from_decimal_str("0.003", 18).unwrap();
//! let multiplier = WadMath::complement(fee).unwrap();
//! let out = WadMath::mul_wad(U256::from(1_000u64), multiplier).unwrap();
//! assert_eq!(out, U256::from(997u64));
//!
//! let holder = Address::from_low_u8(1);
//! assert!(!holder.is_zero());
//! assert!(UNIT > fee);
//! ```
//!
//! ## Integration Points
//!
//! - **amm**: fee curve, tranche pool and payoff formulas
//! - **ledger**: balance ledgers keyed by [`Address`]
//! - **derivative**: lifecycle and settlement, composes every error here

pub mod common;

pub use common::errors::{FixedPointError, LedgerError, MathError, TradeError};
pub use common::fixed_point::{WadMath, UNIT, UNIT_DECIMALS};
pub use common::identifiers::{Address, AddressParseError};

pub use primitive_types::{U256, U512};

/// Token quantity in the smallest unit of its ledger
pub type Amount = U256;

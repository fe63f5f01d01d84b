//! Error types for fixed-point arithmetic, pool trades and token ledgers
//!
//! Every failure is a whole-operation abort: callers receive the error and
//! no partial state is left behind. The variants below are the building
//! blocks the derivative composes into its own error taxonomy.

use crate::common::identifiers::Address;
use primitive_types::U256;
use thiserror::Error;

/// Errors that can occur during fixed-point arithmetic
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    /// Result exceeds the 256-bit range
    #[error("Arithmetic overflow")]
    Overflow,

    /// Subtraction would go below zero
    #[error("Arithmetic underflow")]
    Underflow,

    /// Division or modulo by zero
    #[error("Division by zero in fixed-point arithmetic")]
    DivisionByZero,
}

/// Errors that can occur while parsing or rendering decimal amounts
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FixedPointError {
    /// Invalid decimal string format
    #[error("Invalid decimal string: '{input}' - expected numeric format")]
    InvalidDecimal { input: String },

    /// Negative amounts are not representable
    #[error("Negative amount not allowed: '{input}'")]
    Negative { input: String },

    /// More fractional digits than the target scale can hold
    #[error("Precision loss: '{input}' has more than {decimals} fractional digits")]
    PrecisionLoss { input: String, decimals: u8 },

    /// Scaled value does not fit in 256 bits
    #[error("Overflow: '{input}' exceeds maximum representable value")]
    Overflow { input: String },
}

/// Errors raised by constant-product pool operations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TradeError {
    /// Realized amount is worse than the caller's declared bound
    #[error("SLIPPAGE_DETECTED: realized {realized}, bound {bound}")]
    Slippage { realized: U256, bound: U256 },

    /// Pool would be drained to zero or below on one side
    #[error("Insufficient reserve: requested {requested}, available {available}")]
    InsufficientReserve { requested: U256, available: U256 },

    /// Pool operation requires positive reserves or supply
    #[error("Pool is empty")]
    EmptyPool,

    #[error(transparent)]
    Math(#[from] MathError),
}

/// Errors raised by fungible balance ledgers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ledger already initialized")]
    AlreadyInitialized,

    #[error("Ledger not initialized")]
    NotInitialized,

    /// Only the ledger owner may mint or burn
    #[error("Caller {caller} is not the ledger owner")]
    Unauthorized { caller: Address },

    #[error("Insufficient balance for {holder}: required {required}, available {available}")]
    InsufficientBalance {
        holder: Address,
        required: U256,
        available: U256,
    },

    #[error("Insufficient allowance for {spender}: required {required}, available {available}")]
    InsufficientAllowance {
        spender: Address,
        required: U256,
        available: U256,
    },

    /// Transfers and approvals may not use the zero address as a party
    #[error("Zero address is not a valid {role}")]
    ZeroAddress { role: &'static str },

    #[error(transparent)]
    Math(#[from] MathError),
}

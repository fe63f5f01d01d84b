//! Derivative error taxonomy
//!
//! Every variant aborts the whole operation; the derivative restores its
//! pre-call state before returning any of them.

use thiserror::Error;
use types::{Address, LedgerError, MathError, TradeError, U256};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DerivativeError {
    #[error("Already initialized")]
    AlreadyInitialized,

    /// Trading attempted before initialization
    #[error("cannot buy")]
    NotYetOpen,

    /// Close before the close time, or claim before close
    #[error("Not yet")]
    NotYetClosable,

    #[error("Closed")]
    AlreadyClosed,

    /// Still open, but the close time has passed
    #[error("Trading window elapsed at {close_time}")]
    TradingWindowElapsed { close_time: u64 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

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

    #[error("SLIPPAGE_DETECTED: realized {realized}, bound {bound}")]
    Slippage { realized: U256, bound: U256 },

    #[error("Insufficient pool reserve: requested {requested}, available {available}")]
    InsufficientReserve { requested: U256, available: U256 },

    #[error("Pool is empty")]
    EmptyPool,

    #[error("Arithmetic error: {0}")]
    Arithmetic(#[from] MathError),

    /// Tranche or LP ledger rejected the operation for a reason not listed above
    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    /// Collateral token rejected a transfer
    #[error("Collateral transfer failed: {0}")]
    Collateral(#[source] LedgerError),

    #[error("Reference value unavailable: {0}")]
    Reference(String),
}

impl From<TradeError> for DerivativeError {
    fn from(err: TradeError) -> Self {
        match err {
            TradeError::Slippage { realized, bound } => Self::Slippage { realized, bound },
            TradeError::InsufficientReserve {
                requested,
                available,
            } => Self::InsufficientReserve {
                requested,
                available,
            },
            TradeError::EmptyPool => Self::EmptyPool,
            TradeError::Math(math) => Self::Arithmetic(math),
        }
    }
}

impl From<LedgerError> for DerivativeError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance {
                holder,
                required,
                available,
            } => Self::InsufficientBalance {
                holder,
                required,
                available,
            },
            LedgerError::InsufficientAllowance {
                spender,
                required,
                available,
            } => Self::InsufficientAllowance {
                spender,
                required,
                available,
            },
            LedgerError::Math(math) => Self::Arithmetic(math),
            other => Self::Ledger(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, DerivativeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_reasons() {
        assert_eq!(DerivativeError::NotYetOpen.to_string(), "cannot buy");
        assert_eq!(DerivativeError::NotYetClosable.to_string(), "Not yet");
        assert_eq!(DerivativeError::AlreadyClosed.to_string(), "Closed");
        assert!(DerivativeError::from(TradeError::Slippage {
            realized: U256::one(),
            bound: U256::from(2u8),
        })
        .to_string()
        .starts_with("SLIPPAGE_DETECTED"));
    }

    #[test]
    fn test_ledger_errors_map_onto_taxonomy() {
        let holder = Address::from_low_u8(4);
        let err: DerivativeError = LedgerError::InsufficientBalance {
            holder,
            required: U256::from(2u8),
            available: U256::one(),
        }
        .into();
        assert!(matches!(err, DerivativeError::InsufficientBalance { .. }));

        let err: DerivativeError = LedgerError::NotInitialized.into();
        assert_eq!(err, DerivativeError::Ledger(LedgerError::NotInitialized));

        let err: DerivativeError = TradeError::Math(MathError::DivisionByZero).into();
        assert_eq!(err, DerivativeError::Arithmetic(MathError::DivisionByZero));
    }
}

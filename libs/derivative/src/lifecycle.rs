//! Lifecycle state machine
//!
//! `Uninitialized -> Open -> Closed -> Drained`. Each transition happens
//! exactly once; the guards below decide which operations a state admits.

use crate::error::{DerivativeError, Result};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    /// Trading window running (or elapsed, awaiting close)
    Open,
    /// Settlement fixed, awaiting claims
    Closed,
    /// Every A, B and LP unit has been claimed
    Drained,
}

impl LifecycleState {
    pub fn ensure_uninitialized(self) -> Result<()> {
        match self {
            LifecycleState::Uninitialized => Ok(()),
            _ => Err(DerivativeError::AlreadyInitialized),
        }
    }

    pub fn ensure_initialized(self) -> Result<()> {
        match self {
            LifecycleState::Uninitialized => Err(DerivativeError::NotYetOpen),
            _ => Ok(()),
        }
    }

    /// Mint, burn, swap and liquidity operations
    pub fn ensure_tradable(self, now: u64, close_time: u64) -> Result<()> {
        match self {
            LifecycleState::Uninitialized => Err(DerivativeError::NotYetOpen),
            LifecycleState::Closed | LifecycleState::Drained => Err(DerivativeError::AlreadyClosed),
            LifecycleState::Open if now >= close_time => {
                Err(DerivativeError::TradingWindowElapsed { close_time })
            }
            LifecycleState::Open => Ok(()),
        }
    }

    pub fn ensure_closable(self, now: u64, close_time: u64) -> Result<()> {
        match self {
            LifecycleState::Uninitialized => Err(DerivativeError::NotYetOpen),
            LifecycleState::Closed | LifecycleState::Drained => Err(DerivativeError::AlreadyClosed),
            LifecycleState::Open if now < close_time => Err(DerivativeError::NotYetClosable),
            LifecycleState::Open => Ok(()),
        }
    }

    pub fn ensure_claimable(self) -> Result<()> {
        match self {
            LifecycleState::Closed | LifecycleState::Drained => Ok(()),
            _ => Err(DerivativeError::NotYetClosable),
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Open => "open",
            LifecycleState::Closed => "closed",
            LifecycleState::Drained => "drained",
        };
        write!(f, "{}", name)
    }
}

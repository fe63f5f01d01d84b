//! External collaborators injected into every derivative
//!
//! The collateral token, the reference-value source and the clock are
//! capabilities handed to the derivative at construction so tests and the
//! simulator can drive them deterministically.

use crate::error::{DerivativeError, Result};
use chrono::Utc;
use ledger::TokenLedger;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use types::{Address, LedgerError, U256};

/// Fungible collateral the derivative takes in and pays out
pub trait CollateralToken {
    fn balance_of(&self, holder: &Address) -> U256;

    fn decimals(&self) -> u8;

    /// Move `amount` from `caller` to `to`
    fn transfer(
        &mut self,
        caller: &Address,
        to: Address,
        amount: U256,
    ) -> std::result::Result<(), LedgerError>;

    /// Move `amount` from `from` to `to` against the allowance `from` granted `spender`
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> std::result::Result<(), LedgerError>;
}

impl CollateralToken for TokenLedger {
    fn balance_of(&self, holder: &Address) -> U256 {
        TokenLedger::balance_of(self, holder)
    }

    fn decimals(&self) -> u8 {
        TokenLedger::decimals(self)
    }

    fn transfer(
        &mut self,
        caller: &Address,
        to: Address,
        amount: U256,
    ) -> std::result::Result<(), LedgerError> {
        TokenLedger::transfer(self, caller, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> std::result::Result<(), LedgerError> {
        TokenLedger::transfer_from(self, spender, from, to, amount)
    }
}

/// In-memory collateral ledger shared between a derivative and its users
#[derive(Debug, Clone)]
pub struct SharedCollateral(Arc<Mutex<TokenLedger>>);

impl SharedCollateral {
    pub fn new(ledger: TokenLedger) -> Self {
        Self(Arc::new(Mutex::new(ledger)))
    }

    pub fn lock(&self) -> MutexGuard<'_, TokenLedger> {
        self.0.lock()
    }
}

impl CollateralToken for SharedCollateral {
    fn balance_of(&self, holder: &Address) -> U256 {
        self.0.lock().balance_of(holder)
    }

    fn decimals(&self) -> u8 {
        self.0.lock().decimals()
    }

    fn transfer(
        &mut self,
        caller: &Address,
        to: Address,
        amount: U256,
    ) -> std::result::Result<(), LedgerError> {
        self.0.lock().transfer(caller, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> std::result::Result<(), LedgerError> {
        self.0.lock().transfer_from(spender, from, to, amount)
    }
}

/// Oracle, lending pool or vault adapter supplying the settlement inputs
pub trait ReferenceSource {
    /// Read once at initialization and snapshotted
    fn opening_value(&self) -> Result<U256>;

    /// Read once when the derivative closes
    fn closing_value(&self) -> Result<U256>;
}

/// Reference value set by hand
#[derive(Debug, Clone, Default)]
pub struct ManualReference(Arc<RwLock<U256>>);

impl ManualReference {
    pub fn new(value: U256) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    pub fn set(&self, value: U256) {
        *self.0.write() = value;
    }

    pub fn get(&self) -> U256 {
        *self.0.read()
    }

    fn read_positive(&self) -> Result<U256> {
        let value = self.get();
        if value.is_zero() {
            return Err(DerivativeError::Reference(
                "reference value has not been set".to_string(),
            ));
        }
        Ok(value)
    }
}

impl ReferenceSource for ManualReference {
    fn opening_value(&self) -> Result<U256> {
        self.read_positive()
    }

    fn closing_value(&self) -> Result<U256> {
        self.read_positive()
    }
}

/// Source of the current time in unix seconds
pub trait Clock {
    fn now(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

/// Clock advanced by hand; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self(Arc::new(AtomicU64::new(now)))
    }

    pub fn set(&self, now: u64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) -> u64 {
        self.0.fetch_add(secs, Ordering::SeqCst) + secs
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

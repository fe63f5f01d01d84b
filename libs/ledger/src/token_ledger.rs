//! Fungible balance ledger
//!
//! One instance per token: tranche A, tranche B, LP shares, and in tests
//! and simulations the collateral itself. Mint and burn are reserved for
//! the ledger owner; everything else follows ERC20 behaviour, including
//! the event log.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, trace};
use types::{Address, LedgerError, WadMath, U256};

/// Notification recorded by every balance or allowance change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// `from` is the zero address for mints, `to` for burns
    Transfer {
        from: Address,
        to: Address,
        value: U256,
    },
    Approval {
        owner: Address,
        spender: Address,
        value: U256,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone)]
pub struct TokenLedger {
    address: Address,
    owner: Option<Address>,
    metadata: Option<TokenMetadata>,
    total_supply: U256,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    events: Vec<LedgerEvent>,
}

impl TokenLedger {
    /// Uninitialized ledger deployed at `address`
    pub fn new(address: Address) -> Self {
        Self {
            address,
            owner: None,
            metadata: None,
            total_supply: U256::zero(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// One-time initialization
    pub fn init(
        &mut self,
        owner: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
    ) -> Result<(), LedgerError> {
        if self.is_initialized() {
            return Err(LedgerError::AlreadyInitialized);
        }
        let metadata = TokenMetadata {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
        };
        debug!(token = %self.address, %owner, symbol = %metadata.symbol, "ledger initialized");
        self.owner = Some(owner);
        self.metadata = Some(metadata);
        Ok(())
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Option<Address> {
        self.owner
    }

    pub fn is_initialized(&self) -> bool {
        self.owner.is_some()
    }

    pub fn metadata(&self) -> Option<&TokenMetadata> {
        self.metadata.as_ref()
    }

    pub fn name(&self) -> &str {
        self.metadata.as_ref().map(|m| m.name.as_str()).unwrap_or("")
    }

    pub fn symbol(&self) -> &str {
        self.metadata.as_ref().map(|m| m.symbol.as_str()).unwrap_or("")
    }

    pub fn decimals(&self) -> u8 {
        self.metadata.as_ref().map(|m| m.decimals).unwrap_or(0)
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn balance_of(&self, holder: &Address) -> U256 {
        self.balances.get(holder).copied().unwrap_or_default()
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> U256 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    /// Non-zero balances
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &U256)> {
        self.balances.iter()
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    fn ensure_owner(&self, caller: &Address) -> Result<(), LedgerError> {
        match self.owner {
            None => Err(LedgerError::NotInitialized),
            Some(owner) if owner == *caller => Ok(()),
            Some(_) => Err(LedgerError::Unauthorized { caller: *caller }),
        }
    }

    fn ensure_initialized(&self) -> Result<(), LedgerError> {
        if !self.is_initialized() {
            return Err(LedgerError::NotInitialized);
        }
        Ok(())
    }

    fn credit(&mut self, holder: Address, amount: U256) -> Result<(), LedgerError> {
        let balance = WadMath::checked_add(self.balance_of(&holder), amount)?;
        if !balance.is_zero() {
            self.balances.insert(holder, balance);
        }
        Ok(())
    }

    fn debit(&mut self, holder: Address, amount: U256) -> Result<(), LedgerError> {
        let available = self.balance_of(&holder);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or(LedgerError::InsufficientBalance {
                    holder,
                    required: amount,
                    available,
                })?;
        if remaining.is_zero() {
            self.balances.remove(&holder);
        } else {
            self.balances.insert(holder, remaining);
        }
        Ok(())
    }

    /// Create `amount` new units for `to`; owner only
    pub fn mint(&mut self, caller: &Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress { role: "recipient" });
        }
        self.total_supply = WadMath::checked_add(self.total_supply, amount)?;
        self.credit(to, amount)?;
        self.events.push(LedgerEvent::Transfer {
            from: Address::ZERO,
            to,
            value: amount,
        });
        trace!(token = %self.symbol(), %to, %amount, "mint");
        Ok(())
    }

    /// Destroy `amount` units held by `from`; owner only
    pub fn burn(&mut self, caller: &Address, from: Address, amount: U256) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        self.debit(from, amount)?;
        self.total_supply = WadMath::checked_sub(self.total_supply, amount)?;
        self.events.push(LedgerEvent::Transfer {
            from,
            to: Address::ZERO,
            value: amount,
        });
        trace!(token = %self.symbol(), %from, %amount, "burn");
        Ok(())
    }

    pub fn transfer(&mut self, caller: &Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        self.ensure_initialized()?;
        self.move_balance(*caller, to, amount)
    }

    /// Set the allowance of `spender` over the caller's balance to exactly `amount`
    pub fn approve(&mut self, caller: &Address, spender: Address, amount: U256) -> Result<(), LedgerError> {
        self.ensure_initialized()?;
        if spender.is_zero() {
            return Err(LedgerError::ZeroAddress { role: "spender" });
        }
        self.allowances.insert((*caller, spender), amount);
        self.events.push(LedgerEvent::Approval {
            owner: *caller,
            spender,
            value: amount,
        });
        Ok(())
    }

    /// Move `amount` from `from` to `to` on the strength of the caller's allowance
    ///
    /// Records `Transfer` then `Approval` with the remaining allowance.
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.ensure_initialized()?;
        let available = self.allowance(&from, caller);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or(LedgerError::InsufficientAllowance {
                    spender: *caller,
                    required: amount,
                    available,
                })?;

        self.move_balance(from, to, amount)?;
        self.allowances.insert((from, *caller), remaining);
        self.events.push(LedgerEvent::Approval {
            owner: from,
            spender: *caller,
            value: remaining,
        });
        Ok(())
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress { role: "recipient" });
        }
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        self.events.push(LedgerEvent::Transfer {
            from,
            to,
            value: amount,
        });
        Ok(())
    }
}

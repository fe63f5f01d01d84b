//! Token factory
//!
//! Deploys initialized [`TokenLedger`]s at deterministic addresses derived
//! from the factory's own address and a monotonically increasing nonce.

use crate::token_ledger::TokenLedger;
use serde::Serialize;
use sha3::{Digest, Keccak256};
use tracing::info;
use types::{Address, LedgerError};

/// Last 20 bytes of `keccak256(deployer ++ nonce_be)`
pub fn derive_address(deployer: &Address, nonce: u64) -> Address {
    let mut hasher = Keccak256::new();
    hasher.update(deployer.as_bytes());
    hasher.update(nonce.to_be_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    Address::new(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewTokenCreated {
    pub owner: Address,
    pub token: Address,
}

#[derive(Debug, Clone)]
pub struct TokenFactory {
    address: Address,
    nonce: u64,
    events: Vec<NewTokenCreated>,
}

impl TokenFactory {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            nonce: 0,
            events: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Address the next [`TokenFactory::new_token`] call will deploy at
    pub fn predict_address(&self) -> Address {
        derive_address(&self.address, self.nonce)
    }

    /// Deploy and initialize a ledger owned by `owner`
    pub fn new_token(
        &mut self,
        owner: Address,
        name: &str,
        symbol: &str,
        decimals: u8,
    ) -> Result<TokenLedger, LedgerError> {
        let token = self.predict_address();
        let mut ledger = TokenLedger::new(token);
        ledger.init(owner, name, symbol, decimals)?;

        self.nonce += 1;
        self.events.push(NewTokenCreated { owner, token });
        info!(%owner, %token, symbol, decimals, "new token created");
        Ok(ledger)
    }

    pub fn events(&self) -> &[NewTokenCreated] {
        &self.events
    }
}

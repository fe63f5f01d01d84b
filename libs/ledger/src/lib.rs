//! # iGain Position Ledgers
//!
//! ERC20-equivalent balance ledgers for the A, B and LP tokens of each
//! derivative, plus the factory that deploys them at deterministic
//! addresses.
//!
//! ```rust
//! use ledger::TokenFactory;
//! use types::{Address, U256};
//!
//! let derivative = Address::from_low_u8(1);
//! let holder = Address::from_low_u8(2);
//!
//! let mut factory = TokenFactory::new(Address::from_low_u8(0xfa));
//! let mut a = factory.new_token(derivative, "iGain A token demo", "iG-A demo", 18).unwrap();
//! a.mint(&derivative, holder, U256::from(100u64)).unwrap();
//! assert_eq!(a.balance_of(&holder), U256::from(100u64));
//! ```

pub mod factory;
pub mod token_ledger;

pub use factory::{derive_address, NewTokenCreated, TokenFactory};
pub use token_ledger::{LedgerEvent, TokenLedger, TokenMetadata};

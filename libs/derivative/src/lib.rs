//! # iGain Derivative
//!
//! A derivative instance splits collateral into a pair of complementary
//! tranche tokens, A and B, whose redemption prices always sum to one unit
//! of collateral. Holders trade between tranches and collateral through an
//! embedded constant-product pool while the trading window is open; once
//! the window elapses anyone may close the derivative, which fixes `bPrice`
//! from the payoff and the reference source, and holders claim.
//!
//! ## Structure
//!
//! - [`contract`]: the [`Derivative`] composition root and its operations
//! - [`settlement`]: settlement record and claim pricing
//! - [`lifecycle`]: `Uninitialized -> Open -> Closed -> Drained` gating
//! - [`collaborators`]: collateral, reference source and clock seams
//! - [`registry`]: deterministic deployment of many instances
//!
//! ## Example
//!
//! ```rust
//! use amm::{FeeSchedule, Payoff, PayoffKind};
//! use derivative::{
//!     Derivative, DerivativeParams, InitArgs, LifecycleState, ManualClock, ManualReference,
//! };
//! use ledger::TokenLedger;
//! use types::{Address, U256, UNIT};
//!
//! let me = Address::from_low_u8(1);
//! let here = Address::from_low_u8(2);
//!
//! let mut collateral = TokenLedger::new(Address::from_low_u8(3));
//! collateral.init(me, "Collateral", "COL", 18).unwrap();
//! collateral.mint(&me, me, UNIT * 10u64).unwrap();
//! collateral.approve(&me, here, U256::MAX).unwrap();
//!
//! let params = DerivativeParams {
//!     payoff: Payoff::new(PayoffKind::InterestRateSpread, UNIT),
//!     fee_schedule: FeeSchedule::Decreasing,
//!     min_fee: UNIT / 1000u64,
//!     max_fee: UNIT / 100u64,
//!     protocol_fee: U256::zero(),
//!     treasury: me,
//! };
//! let clock = ManualClock::new(0);
//! let mut d = Derivative::new(here, params, collateral, ManualReference::new(UNIT), clock.clone());
//!
//! d.init(me, &InitArgs {
//!     batch_name: "demo".into(),
//!     duration_secs: 100,
//!     initial_a: UNIT,
//!     initial_b: UNIT,
//! }).unwrap();
//! d.mint(me, UNIT).unwrap();
//!
//! clock.advance(100);
//! d.close(me).unwrap();
//! d.claim(me).unwrap();
//! assert_eq!(d.lifecycle(), LifecycleState::Drained);
//! ```

pub mod collaborators;
pub mod contract;
pub mod error;
pub mod lifecycle;
pub mod params;
pub mod registry;
pub mod settlement;

pub use collaborators::{
    Clock, CollateralToken, ManualClock, ManualReference, ReferenceSource, SharedCollateral,
    SystemClock,
};
pub use contract::{Derivative, DerivativeSnapshot, InitReceipt, TokenEvent, TokenKind};
pub use error::{DerivativeError, Result};
pub use lifecycle::LifecycleState;
pub use params::{DerivativeParams, InitArgs};
pub use registry::{DerivativeRegistry, SharedDerivative};
pub use settlement::{ClaimQuote, SettlementEngine, SettlementRecord};

//! # iGain AMM Library - Tranche Pricing Mathematics
//!
//! ## Purpose
//!
//! Exact integer mathematics for the tranche derivative: the time-weighted
//! fee curve, the constant-product pool over the A and B tranche reserves,
//! and the settlement payoff formulas that fix the final A/B split. All
//! values are `U256` integers with floor rounding so results reproduce
//! recorded vectors bit for bit.
//!
//! ## Integration Points
//!
//! - **Input Sources**: fee window and reserves held by the derivative,
//!   reference values supplied by an oracle adapter at settlement
//! - **Output Destinations**: the derivative's mint/burn/swap/LP operations
//!   and its settlement record
//! - **Precision**: 18-decimal fixed point for fees, prices and ratios;
//!   token quantities in their ledger's smallest unit
//! - **Validation**: every bound is checked before the reserves move, so a
//!   failed call leaves the pool untouched
//!
//! ## Architecture Role
//!
//! This crate holds no balances and performs no transfers. It is the pure
//! pricing core that `derivative` wraps with ledgers, collateral movement
//! and lifecycle gating.
//!
//! See [`architecture_diagram()`] for visual representation of the data flow.

pub mod fee_curve;
pub mod payoff;
pub mod tranche_pool;

pub use fee_curve::{fee_multiplier, FeeSchedule, FeeWindow};
pub use payoff::{Payoff, PayoffKind, PayoffMath};
pub use tranche_pool::{Side, SingleSidedBurn, SingleSidedMint, TranchePool};

/// Architecture diagram showing AMM library data flow and component relationships
#[cfg_attr(doc, aquamarine::aquamarine)]
/// ```mermaid
/// graph LR
///     subgraph Input["📊 Inputs"]
///         TW[Trading Window]
///         FB[Fee Bounds]
///         RS[Reserves A/B]
///         RV[Reference Values]
///     end
///
///     subgraph Math["🧮 Pricing Core"]
///         FC[Fee Curve]
///         CP[Constant Product]
///         QS[Quadratic Solver]
///         PO[Payoff Formulas]
///     end
///
///     subgraph Output["🎯 Derivative"]
///         TR[Mint / Burn / Swap]
///         LP[Liquidity Shares]
///         ST[Settlement bPrice]
///     end
///
///     TW --> FC
///     FB --> FC
///     FC --> CP
///     RS --> CP
///     CP --> QS
///     RV --> PO
///
///     CP --> TR
///     QS --> TR
///     CP --> LP
///     PO --> ST
///
///     style Input fill:#e1f5fe
///     style Math fill:#fff3e0
///     style Output fill:#e8f5e9
/// ```
pub fn architecture_diagram() {
    // This function exists solely for documentation purposes
    // The diagram is rendered by aquamarine in rustdoc
}

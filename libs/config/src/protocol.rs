//! Protocol constants
//!
//! Token naming, default fee bounds and the limits configuration is
//! validated against.

/// Decimals of the fixed-point unit used for fees, prices and leverage
pub const UNIT_DECIMALS: u8 = 18;

/// Token naming for the ledgers created at initialization
///
/// Each prefix is followed by the batch name, e.g. `"iGain A token 2024Q1"`.
pub mod naming {
    pub const A_NAME_PREFIX: &str = "iGain A token ";
    pub const A_SYMBOL_PREFIX: &str = "iG-A ";
    pub const B_NAME_PREFIX: &str = "iGain B token ";
    pub const B_SYMBOL_PREFIX: &str = "iG-B ";
    pub const LP_NAME_PREFIX: &str = "iGain LP token ";
    pub const LP_SYMBOL_PREFIX: &str = "iG-LP ";

    pub fn a_name(batch: &str) -> String {
        format!("{A_NAME_PREFIX}{batch}")
    }

    pub fn a_symbol(batch: &str) -> String {
        format!("{A_SYMBOL_PREFIX}{batch}")
    }

    pub fn b_name(batch: &str) -> String {
        format!("{B_NAME_PREFIX}{batch}")
    }

    pub fn b_symbol(batch: &str) -> String {
        format!("{B_SYMBOL_PREFIX}{batch}")
    }

    pub fn lp_name(batch: &str) -> String {
        format!("{LP_NAME_PREFIX}{batch}")
    }

    pub fn lp_symbol(batch: &str) -> String {
        format!("{LP_SYMBOL_PREFIX}{batch}")
    }
}

/// Default fee bounds, as decimal fractions of one
pub mod fees {
    /// Lower bound of the trading fee (0.1%)
    pub const DEFAULT_MIN_FEE: &str = "0.001";

    /// Upper bound of the trading fee (1%)
    pub const DEFAULT_MAX_FEE: &str = "0.01";

    /// Fee on dual-sided burns and claims (0.3%)
    pub const DEFAULT_PROTOCOL_FEE: &str = "0.003";
}

/// Defaults for the rest of a derivative batch
pub mod defaults {
    /// One day
    pub const DURATION_SECS: u64 = 86_400;

    pub const LEVERAGE: &str = "1";

    pub const COLLATERAL_DECIMALS: u8 = 18;

    /// Environment variable prefix for configuration overrides
    pub const ENV_PREFIX: &str = "IGAIN";

    /// Separator between prefix and key, e.g. `IGAIN__MIN_FEE`
    pub const ENV_SEPARATOR: &str = "__";
}

//! Construction-time parameters of a derivative instance

use amm::{FeeSchedule, Payoff};
use config::DerivativeSettings;
use serde::Serialize;
use types::{Address, U256};

/// Everything fixed before `init`: payoff family, fee bounds and treasury
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivativeParams {
    pub payoff: Payoff,
    pub fee_schedule: FeeSchedule,
    pub min_fee: U256,
    pub max_fee: U256,
    pub protocol_fee: U256,
    /// Receives the protocol fee of every dual burn and claim
    pub treasury: Address,
}

/// Arguments of the one-time `init` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitArgs {
    pub batch_name: String,
    pub duration_secs: u64,
    pub initial_a: U256,
    pub initial_b: U256,
}

impl From<&DerivativeSettings> for DerivativeParams {
    fn from(settings: &DerivativeSettings) -> Self {
        Self {
            payoff: settings.payoff,
            fee_schedule: settings.fee_schedule,
            min_fee: settings.min_fee,
            max_fee: settings.max_fee,
            protocol_fee: settings.protocol_fee,
            treasury: settings.treasury,
        }
    }
}

impl From<&DerivativeSettings> for InitArgs {
    fn from(settings: &DerivativeSettings) -> Self {
        Self {
            batch_name: settings.batch_name.clone(),
            duration_secs: settings.duration_secs,
            initial_a: settings.initial_a,
            initial_b: settings.initial_b,
        }
    }
}

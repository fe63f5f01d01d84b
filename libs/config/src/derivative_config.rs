//! Derivative Configuration Module
//!
//! Loads the parameters of one derivative batch from a TOML file, an
//! optional environment overlay and `IGAIN__*` environment variables, then
//! resolves the decimal strings into fixed-point integers.

use crate::protocol::{defaults, fees};
use amm::{FeeSchedule, Payoff, PayoffKind};
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use types::{Address, WadMath, U256, UNIT, UNIT_DECIMALS};

/// Derivative batch configuration as written in the config file
///
/// Fees and leverage are decimal fractions (`"0.003"` = 0.3%, `"5"` = 5x).
/// Initial reserves are token amounts in whole collateral units.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DerivativeConfig {
    pub batch_name: String,
    pub variant: PayoffKind,

    #[serde(default = "default_leverage")]
    pub leverage: String,

    #[serde(default = "default_fee_schedule")]
    pub fee_schedule: FeeSchedule,

    #[serde(default = "default_min_fee")]
    pub min_fee: String,

    #[serde(default = "default_max_fee")]
    pub max_fee: String,

    #[serde(default = "default_protocol_fee")]
    pub protocol_fee: String,

    pub treasury: Address,

    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    pub initial_a: String,
    pub initial_b: String,

    /// Decimals of the collateral token
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_leverage() -> String {
    defaults::LEVERAGE.to_string()
}

fn default_fee_schedule() -> FeeSchedule {
    FeeSchedule::Decreasing
}

fn default_min_fee() -> String {
    fees::DEFAULT_MIN_FEE.to_string()
}

fn default_max_fee() -> String {
    fees::DEFAULT_MAX_FEE.to_string()
}

fn default_protocol_fee() -> String {
    fees::DEFAULT_PROTOCOL_FEE.to_string()
}

fn default_duration() -> u64 {
    defaults::DURATION_SECS
}

fn default_decimals() -> u8 {
    defaults::COLLATERAL_DECIMALS
}

/// Validated parameters with every amount scaled to an integer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivativeSettings {
    pub batch_name: String,
    pub payoff: Payoff,
    pub fee_schedule: FeeSchedule,
    pub min_fee: U256,
    pub max_fee: U256,
    pub protocol_fee: U256,
    pub treasury: Address,
    pub duration_secs: u64,
    pub initial_a: U256,
    pub initial_b: U256,
    pub decimals: u8,
}

impl DerivativeConfig {
    /// Load configuration from files with environment overrides
    ///
    /// The overlay for `environment` is read from
    /// `<base dir>/environments/<environment>.toml` when present.
    pub fn load(base_path: &Path, environment: Option<&str>) -> Result<Self> {
        Self::load_with_prefix(base_path, environment, defaults::ENV_PREFIX)
    }

    pub(crate) fn load_with_prefix(
        base_path: &Path,
        environment: Option<&str>,
        env_prefix: &str,
    ) -> Result<Self> {
        let mut builder = Config::builder().add_source(File::from(base_path).required(true));

        if let Some(env) = environment {
            let env_file = base_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .separator(defaults::ENV_SEPARATOR)
                .try_parsing(true),
        );

        let config = builder
            .build()
            .with_context(|| format!("Failed to build configuration from {:?}", base_path))?;

        let loaded: Self = config
            .try_deserialize()
            .context("Failed to deserialize derivative configuration")?;
        debug!(batch = %loaded.batch_name, variant = %loaded.variant, "configuration loaded");
        Ok(loaded)
    }

    /// Parse and validate every field
    pub fn resolve(&self) -> Result<DerivativeSettings> {
        if self.batch_name.trim().is_empty() {
            bail!("batch_name must not be empty");
        }

        let leverage = parse_fraction("leverage", &self.leverage)?;
        let min_fee = parse_fraction("min_fee", &self.min_fee)?;
        let max_fee = parse_fraction("max_fee", &self.max_fee)?;
        let protocol_fee = parse_fraction("protocol_fee", &self.protocol_fee)?;

        if leverage.is_zero() {
            bail!("leverage must be positive");
        }
        if min_fee > max_fee {
            bail!(
                "min_fee ({}) must not exceed max_fee ({})",
                self.min_fee,
                self.max_fee
            );
        }
        if max_fee >= UNIT {
            bail!("max_fee ({}) must be below 1", self.max_fee);
        }
        if protocol_fee >= UNIT {
            bail!("protocol_fee ({}) must be below 1", self.protocol_fee);
        }
        if self.treasury == Address::ZERO {
            bail!("treasury must not be the zero address");
        }
        if self.duration_secs == 0 {
            warn!("duration_secs is zero; the trading window closes immediately");
        }

        let initial_a = WadMath::from_decimal_str(&self.initial_a, self.decimals)
            .with_context(|| format!("Invalid initial_a '{}'", self.initial_a))?;
        let initial_b = WadMath::from_decimal_str(&self.initial_b, self.decimals)
            .with_context(|| format!("Invalid initial_b '{}'", self.initial_b))?;
        if initial_a.is_zero() || initial_b.is_zero() {
            bail!("initial_a and initial_b must both be positive");
        }

        Ok(DerivativeSettings {
            batch_name: self.batch_name.clone(),
            payoff: Payoff::new(self.variant, leverage),
            fee_schedule: self.fee_schedule,
            min_fee,
            max_fee,
            protocol_fee,
            treasury: self.treasury,
            duration_secs: self.duration_secs,
            initial_a,
            initial_b,
            decimals: self.decimals,
        })
    }
}

fn parse_fraction(field: &str, raw: &str) -> Result<U256> {
    WadMath::from_decimal_str(raw, UNIT_DECIMALS)
        .with_context(|| format!("Invalid {} '{}'", field, raw))
}

/// Convenience function: load and resolve in one step
pub fn load_settings(base_path: &Path, environment: Option<&str>) -> Result<DerivativeSettings> {
    DerivativeConfig::load(base_path, environment)?.resolve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const BASE: &str = r#"
batch_name = "2024Q1"
variant = "interest_rate_spread"
leverage = "5"
fee_schedule = "increasing"
min_fee = "0.001"
max_fee = "0.02"
protocol_fee = "0.003"
treasury = "0x83d0d842e6db3b020f384a2af11bd14787bec8e7"
duration_secs = 86400
initial_a = "10000"
initial_b = "10000"
decimals = 6
"#;

    #[test]
    fn test_load_base_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("derivative.toml");
        fs::write(&config_path, BASE).unwrap();

        let config =
            DerivativeConfig::load_with_prefix(&config_path, None, "IGAIN_TEST_BASE").unwrap();
        assert_eq!(config.batch_name, "2024Q1");
        assert_eq!(config.variant, PayoffKind::InterestRateSpread);
        assert_eq!(config.fee_schedule, FeeSchedule::Increasing);
        assert_eq!(config.decimals, 6);

        let settings = config.resolve().unwrap();
        assert_eq!(settings.payoff.leverage, UNIT * 5u64);
        assert_eq!(settings.max_fee, UNIT / 50u64);
        assert_eq!(settings.initial_a, U256::from(10_000_000_000u64));
        assert_eq!(settings.treasury.to_string(), "0x83d0d842e6db3b020f384a2af11bd14787bec8e7");
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("derivative.toml");
        fs::write(
            &config_path,
            r#"
batch_name = "minimal"
variant = "delta"
treasury = "0x0000000000000000000000000000000000000001"
initial_a = "1"
initial_b = "1"
"#,
        )
        .unwrap();

        let config =
            DerivativeConfig::load_with_prefix(&config_path, None, "IGAIN_TEST_DEFAULTS").unwrap();
        assert_eq!(config.fee_schedule, FeeSchedule::Decreasing);
        assert_eq!(config.duration_secs, defaults::DURATION_SECS);
        assert_eq!(config.decimals, 18);

        let settings = config.resolve().unwrap();
        assert_eq!(settings.protocol_fee, UNIT * 3u64 / 1000u64);
        assert_eq!(settings.initial_a, UNIT);
    }

    #[test]
    fn test_environment_overlay_and_variables() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("derivative.toml");
        fs::write(&config_path, BASE).unwrap();
        fs::create_dir(dir.path().join("environments")).unwrap();
        fs::write(
            dir.path().join("environments").join("staging.toml"),
            "batch_name = \"staging\"\nduration_secs = 60\n",
        )
        .unwrap();

        std::env::set_var("IGAIN_TEST_ENV__PROTOCOL_FEE", "0.005");
        let config =
            DerivativeConfig::load_with_prefix(&config_path, Some("staging"), "IGAIN_TEST_ENV")
                .unwrap();
        std::env::remove_var("IGAIN_TEST_ENV__PROTOCOL_FEE");

        assert_eq!(config.batch_name, "staging");
        assert_eq!(config.duration_secs, 60);
        assert_eq!(config.resolve().unwrap().protocol_fee, UNIT / 200u64);
    }

    #[test]
    fn test_missing_environment_overlay_is_tolerated() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("derivative.toml");
        fs::write(&config_path, BASE).unwrap();

        let config =
            DerivativeConfig::load_with_prefix(&config_path, Some("prod"), "IGAIN_TEST_MISSING")
                .unwrap();
        assert_eq!(config.batch_name, "2024Q1");
    }

    #[test]
    fn test_missing_base_file_fails() {
        let dir = tempdir().unwrap();
        let result = DerivativeConfig::load(&dir.path().join("absent.toml"), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("derivative.toml");
        fs::write(&config_path, BASE).unwrap();
        let base =
            DerivativeConfig::load_with_prefix(&config_path, None, "IGAIN_TEST_INVALID").unwrap();

        let inverted = DerivativeConfig {
            min_fee: "0.05".to_string(),
            ..base.clone()
        };
        assert!(inverted.resolve().is_err());

        let full_fee = DerivativeConfig {
            protocol_fee: "1".to_string(),
            ..base.clone()
        };
        assert!(full_fee.resolve().is_err());

        let no_leverage = DerivativeConfig {
            leverage: "0".to_string(),
            ..base.clone()
        };
        assert!(no_leverage.resolve().is_err());

        let no_treasury = DerivativeConfig {
            treasury: Address::ZERO,
            ..base.clone()
        };
        assert!(no_treasury.resolve().is_err());

        let empty_pool = DerivativeConfig {
            initial_b: "0".to_string(),
            ..base.clone()
        };
        assert!(empty_pool.resolve().is_err());

        let too_precise = DerivativeConfig {
            initial_a: "0.0000001".to_string(),
            ..base
        };
        let err = too_precise.resolve().unwrap_err();
        assert!(err.to_string().contains("initial_a"));
    }
}

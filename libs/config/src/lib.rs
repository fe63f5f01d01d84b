//! # iGain Configuration
//!
//! Protocol constants and layered configuration for derivative batches.
//!
//! ## Features
//!
//! - **Protocol Constants**: token naming, default fee bounds, env prefix
//! - **Layered Loading**: base TOML, optional environment overlay, then
//!   `IGAIN__*` environment variables
//! - **Validation**: decimal strings resolved into fixed-point integers with
//!   range checks before anything is deployed
//!
//! ## Usage
//!
//! ```rust,no_run
//! use config::{load_settings, protocol};
//! use std::path::Path;
//!
//! let settings = load_settings(Path::new("config/derivative.toml"), Some("staging"))?;
//! let a_symbol = protocol::naming::a_symbol(&settings.batch_name);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod derivative_config;
pub mod protocol;

// Re-export commonly used types
pub use derivative_config::{load_settings, DerivativeConfig, DerivativeSettings};
pub use protocol::*;

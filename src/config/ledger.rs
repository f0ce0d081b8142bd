//! Ledger configuration loading from config.toml
//!
//! Fee rate, the seed balance of new bank accounts and the optional balance
//! ceilings are external configuration; nothing in `core` hardcodes them.
//!
//! ```toml
//! fee_percentage = "0.5"
//! initial_bank_account_balance = "500.00"
//! wallet_ceiling = "10000.00"
//! ```

use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Environment variable overriding the config file location
pub const CONFIG_PATH_VAR: &str = "LEDGER_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Settings consumed by the transfer engine and the bank account registry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Transaction fee as a percentage of the amount (0.5 means 0.5%)
    pub fee_percentage: Decimal,
    /// Balance a bank account starts with when registered
    pub initial_bank_account_balance: Decimal,
    /// Highest balance a wallet may reach through a credit, if any
    pub wallet_ceiling: Option<Decimal>,
    /// Highest balance a bank account may reach through a credit, if any
    pub bank_account_ceiling: Option<Decimal>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            fee_percentage: Decimal::new(5, 1),
            initial_bank_account_balance: Decimal::new(50_000, 2),
            wallet_ceiling: None,
            bank_account_ceiling: None,
        }
    }
}

impl LedgerConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    /// Returns a `Config` error for invalid TOML or out-of-range values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse ledger configuration: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.fee_percentage < Decimal::ZERO || self.fee_percentage > Decimal::ONE_HUNDRED {
            return Err(Error::Config {
                message: format!("fee_percentage must be within 0..=100, got {}", self.fee_percentage),
            });
        }

        let amounts = [
            ("initial_bank_account_balance", Some(self.initial_bank_account_balance)),
            ("wallet_ceiling", self.wallet_ceiling),
            ("bank_account_ceiling", self.bank_account_ceiling),
        ];
        for (name, value) in amounts {
            let Some(value) = value else { continue };
            if value < Decimal::ZERO || value.normalize().scale() > crate::core::balance::SCALE {
                return Err(Error::Config {
                    message: format!("{name} must be a non-negative amount with at most 2 decimals, got {value}"),
                });
            }
        }
        Ok(())
    }
}

/// Loads ledger configuration from a TOML file.
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value is out of range
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<LedgerConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.as_ref().display()),
    })?;
    LedgerConfig::from_toml(&contents)
}

/// Loads the configuration from `$LEDGER_CONFIG` or `./config.toml`.
///
/// A missing file is not an error: the defaults apply.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_default_config() -> Result<LedgerConfig> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if !Path::new(&path).exists() {
        info!(%path, "No ledger configuration file, using defaults");
        return Ok(LedgerConfig::default());
    }
    load_config(&path)
}

/// Database configuration and connection management
pub mod database;

/// Ledger settings (fees, seed balances, ceilings) loaded from config.toml
pub mod ledger;

pub use ledger::LedgerConfig;

use dotenvy::dotenv;
use paymybuddy_ledger::{
    config::{self, database},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();

    // 3. Load the ledger configuration
    let ledger_config = config::ledger::load_default_config()
        .inspect_err(|e| error!("Failed to load ledger configuration: {}", e))?;
    info!(
        fee_percentage = %ledger_config.fee_percentage,
        initial_bank_account_balance = %ledger_config.initial_bank_account_balance,
        "Ledger configuration loaded"
    );

    // 4. Connect and create the schema
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database schema ready"))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    Ok(())
}

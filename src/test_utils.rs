//! Shared test utilities for the ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::LedgerConfig,
    core::{
        bank_account::{self, NewBankAccount},
        connection,
        user::{self, NewUser},
    },
    entities::{Role, User, bank_account as bank_account_entity, user as user_entity},
    errors::{Error, Resource, Result},
};
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, DatabaseConnection, prelude::*, sea_query::Expr};
use std::path::{Path, PathBuf};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database served by a pool of several connections.
///
/// Use this when tasks must really run side by side; `sqlite::memory:` is
/// limited to one connection. Pair with [`remove_file_test_db`].
pub async fn setup_file_test_db(name: &str) -> Result<(DatabaseConnection, PathBuf)> {
    let path = std::env::temp_dir().join(format!("ledger-{name}-{}.sqlite", std::process::id()));
    remove_file_test_db(&path);

    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options.max_connections(4).min_connections(4).sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((db, path))
}

/// Deletes a database created by [`setup_file_test_db`], journal files included.
pub fn remove_file_test_db(path: &Path) {
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        std::fs::remove_file(file).ok();
    }
}

/// Default ledger settings: 0.5% fee, 500.00 seed balance, no ceilings.
pub fn test_config() -> LedgerConfig {
    LedgerConfig::default()
}

/// Registers a test user with sensible defaults.
///
/// # Defaults
/// * `firstname`: `name`
/// * `lastname`: "Tester"
/// * `email`: "{name}@example.com"
/// * `password`: "encoded-password"
/// * `role`: `Role::User`
pub async fn create_test_user(db: &DatabaseConnection, name: &str) -> Result<user_entity::Model> {
    user::register_user(
        db,
        NewUser {
            firstname: name.to_string(),
            lastname: "Tester".to_string(),
            email: format!("{name}@example.com"),
            password: "encoded-password".to_string(),
            role: Role::User,
        },
    )
    .await
}

/// Overwrites a wallet balance directly, bypassing the transfer engine.
pub async fn fund_wallet(db: &DatabaseConnection, user_id: i64, amount: Decimal) -> Result<()> {
    let cents = crate::core::balance::to_cents(amount)?;
    User::update_many()
        .col_expr(user_entity::Column::WalletCents, Expr::value(cents))
        .filter(user_entity::Column::Id.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Registers a bank account titled "Test account" for `user_id` and returns it.
///
/// Seeded with the `test_config` balance of 500.00.
pub async fn create_test_bank_account(
    db: &DatabaseConnection,
    user_id: i64,
    iban: &str,
) -> Result<bank_account_entity::Model> {
    let accounts = bank_account::add_bank_account(
        db,
        &test_config(),
        user_id,
        NewBankAccount {
            title: "Test account".to_string(),
            iban: iban.to_string(),
            bic: "TESTFRPP".to_string(),
        },
    )
    .await?;

    accounts
        .into_iter()
        .find(|account| account.iban == iban)
        .ok_or_else(|| Error::not_found(Resource::BankAccount, iban))
}

/// Connects two existing users.
pub async fn connect_users(
    db: &DatabaseConnection,
    a: &user_entity::Model,
    b: &user_entity::Model,
) -> Result<()> {
    connection::add_connection(db, a.id, &b.email).await?;
    Ok(())
}

/// Creates "alice" and "bob" and connects them.
pub async fn setup_connected_pair(
    db: &DatabaseConnection,
) -> Result<(user_entity::Model, user_entity::Model)> {
    let alice = create_test_user(db, "alice").await?;
    let bob = create_test_user(db, "bob").await?;
    connect_users(db, &alice, &bob).await?;
    Ok((alice, bob))
}

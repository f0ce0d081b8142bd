//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs, foreign keys included.

use crate::entities::{BankAccount, BankTransfer, Connection, Transaction, User, bank_account};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, sea_query::Index,
};
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/paymybuddy.sqlite?mode=rwc";

const BANK_ACCOUNT_IBAN_INDEX: &str = "idx_bank_accounts_user_iban";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    ensure_sqlite_directory(&database_url)?;
    info!(%database_url, "Connecting to database");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates the parent directory of a file-backed `SQLite` URL.
fn ensure_sqlite_directory(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or_default();
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    debug!(table = entity.table_name(), "Table ready");
    Ok(())
}

/// A user registers a given IBAN at most once.
async fn create_bank_account_iban_index(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let index = Index::create()
        .name(BANK_ACCOUNT_IBAN_INDEX)
        .table(BankAccount)
        .col(bank_account::Column::UserId)
        .col(bank_account::Column::Iban)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&index)).await?;
    debug!(index = BANK_ACCOUNT_IBAN_INDEX, "Index ready");
    Ok(())
}

/// Creates all tables that do not exist yet.
///
/// Referenced tables are created before the tables holding foreign keys to them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, User).await?;
    create_table(db, &schema, BankAccount).await?;
    create_bank_account_iban_index(db).await?;
    create_table(db, &schema, Connection).await?;
    create_table(db, &schema, Transaction).await?;
    create_table(db, &schema, BankTransfer).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        bank_account::Model as BankAccountModel, bank_transfer::Model as BankTransferModel,
        connection::Model as ConnectionModel, transaction::Model as TransactionModel,
        user::Model as UserModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<BankAccountModel> = BankAccount::find().limit(1).all(&db).await?;
        let _: Vec<ConnectionModel> = Connection::find().limit(1).all(&db).await?;
        let _: Vec<TransactionModel> = Transaction::find().limit(1).all(&db).await?;
        let _: Vec<BankTransferModel> = BankTransfer::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_iban_is_unique_per_owner_in_schema() -> Result<()> {
        use crate::core::user::{NewUser, register_user};
        use crate::entities::Role;
        use crate::errors::{Error, Resource};
        use sea_orm::{ActiveModelTrait, Set};

        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        let owner = register_user(
            &db,
            NewUser {
                firstname: "Iris".to_string(),
                lastname: "Owner".to_string(),
                email: "iris@example.com".to_string(),
                password: "encoded".to_string(),
                role: Role::User,
            },
        )
        .await?;

        let row = || bank_account::ActiveModel {
            title: Set("Main".to_string()),
            iban: Set("FR7630006000011234567890189".to_string()),
            bic: Set("AGRIFRPP".to_string()),
            balance_cents: Set(0),
            user_id: Set(owner.id),
            ..Default::default()
        };
        row().insert(&db).await?;

        // Bypasses the registry check, the index still refuses it
        let duplicate = row().insert(&db).await;
        assert!(matches!(
            duplicate.map_err(|e| Error::from_unique_violation(e, Resource::BankAccount, "dup")),
            Err(Error::ResourceAlreadyExists {
                resource: Resource::BankAccount,
                ..
            })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[test]
    fn test_ensure_sqlite_directory() -> Result<()> {
        ensure_sqlite_directory("sqlite::memory:")?;
        ensure_sqlite_directory("sqlite://ledger.sqlite?mode=rwc")?;

        let dir = std::env::temp_dir().join(format!("ledger-db-{}", std::process::id()));
        let url = format!("sqlite://{}/nested/ledger.sqlite?mode=rwc", dir.display());
        ensure_sqlite_directory(&url)?;
        assert!(dir.join("nested").is_dir());
        std::fs::remove_dir_all(&dir)?;

        Ok(())
    }
}

//! Bank account registry - the set of bank accounts each user owns.
//!
//! A user can't register the same IBAN twice. Removing an account from its owner
//! deletes it and anonymizes the transfers that referenced it.

use crate::{
    config::LedgerConfig,
    core::{
        balance::{self, BalanceAccount},
        cascade::{self, CascadeReport},
        page::{self, Page, PageRequest},
        user::load_user,
    },
    entities::{BankAccount, bank_account},
    errors::{Error, Resource, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, warn};

/// Fields supplied when registering a bank account
#[derive(Debug, Clone)]
pub struct NewBankAccount {
    /// Label shown to the owner and kept on transfers
    pub title: String,
    /// International bank account number
    pub iban: String,
    /// Bank identifier code
    pub bic: String,
}

/// Loads a bank account only if `user_id` owns it.
pub(crate) async fn load_owned_account<C>(
    db: &C,
    user_id: i64,
    account_id: i64,
) -> Result<bank_account::Model>
where
    C: ConnectionTrait,
{
    let account = BankAccount::find_by_id(account_id)
        .filter(bank_account::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(Resource::BankAccount, account_id))?;
    account.ensure_non_negative()?;
    Ok(account)
}

async fn owned_accounts<C>(db: &C, user_id: i64) -> Result<Vec<bank_account::Model>>
where
    C: ConnectionTrait,
{
    BankAccount::find()
        .filter(bank_account::Column::UserId.eq(user_id))
        .order_by_asc(bank_account::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the bank accounts of a user, one page at a time.
///
/// # Errors
/// Returns `ResourceNotFound` for an unknown user.
pub async fn get_bank_accounts(
    db: &DatabaseConnection,
    user_id: i64,
    request: PageRequest,
) -> Result<Page<bank_account::Model>> {
    load_user(db, user_id).await?;
    let accounts = owned_accounts(db, user_id).await?;
    Ok(page::paginate(&accounts, request))
}

/// Retrieves one bank account of a user.
///
/// # Errors
/// Returns `ResourceNotFound` if the account does not exist or belongs to someone else.
pub async fn get_bank_account(
    db: &DatabaseConnection,
    user_id: i64,
    account_id: i64,
) -> Result<bank_account::Model> {
    load_owned_account(db, user_id, account_id).await
}

/// Registers a bank account for a user, seeded with the configured balance.
///
/// Returns the updated list of the user's accounts.
///
/// # Errors
/// Returns `ResourceNotFound` for an unknown user, `ResourceAlreadyExists` if the
/// user already registered this IBAN.
pub async fn add_bank_account(
    db: &DatabaseConnection,
    config: &LedgerConfig,
    user_id: i64,
    account: NewBankAccount,
) -> Result<Vec<bank_account::Model>> {
    let seed_cents = balance::to_cents(config.initial_bank_account_balance)?;

    let txn = db.begin().await?;
    load_user(&txn, user_id).await?;

    let duplicate = BankAccount::find()
        .filter(bank_account::Column::UserId.eq(user_id))
        .filter(bank_account::Column::Iban.eq(account.iban.as_str()))
        .one(&txn)
        .await?;
    if duplicate.is_some() {
        warn!(user_id, "This bank account already exists for user");
        return Err(Error::already_exists(Resource::BankAccount, account.iban));
    }

    let iban = account.iban.clone();
    let created = bank_account::ActiveModel {
        title: Set(account.title),
        iban: Set(account.iban),
        bic: Set(account.bic),
        balance_cents: Set(seed_cents),
        user_id: Set(user_id),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| Error::from_unique_violation(e, Resource::BankAccount, iban))?;

    let accounts = owned_accounts(&txn, user_id).await?;
    txn.commit().await?;
    info!(user_id, bank_account_id = created.id, "Bank account registered");
    Ok(accounts)
}

/// Removes a bank account from its owner, anonymizing its transfer history.
///
/// Returns the updated list of the user's accounts.
///
/// # Errors
/// Returns `ResourceNotFound` for an unknown user or an account the user does not own.
pub async fn remove_bank_account(
    db: &DatabaseConnection,
    user_id: i64,
    account_id: i64,
) -> Result<Vec<bank_account::Model>> {
    let txn = db.begin().await?;
    load_user(&txn, user_id).await?;
    let account = load_owned_account(&txn, user_id, account_id).await?;

    cascade::cascade_bank_account_deletion(&txn, &account).await?;

    let accounts = owned_accounts(&txn, user_id).await?;
    txn.commit().await?;
    info!(user_id, bank_account_id = account_id, "Bank account removed");
    Ok(accounts)
}

/// Deletes a bank account by id regardless of owner (administrative path).
///
/// # Errors
/// Returns `ResourceNotFound` for an unknown account, or the failing cleanup step's error.
pub async fn delete_bank_account(
    db: &DatabaseConnection,
    account_id: i64,
) -> Result<CascadeReport> {
    let txn = db.begin().await?;
    let account = BankAccount::find_by_id(account_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(Resource::BankAccount, account_id))?;

    let report = cascade::cascade_bank_account_deletion(&txn, &account).await?;

    txn.commit().await?;
    info!(bank_account_id = account_id, "Bank account deleted");
    Ok(report)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_add_bank_account_seeds_balance() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "alice").await?;

        let accounts = add_bank_account(
            &db,
            &test_config(),
            user.id,
            NewBankAccount {
                title: "Main".to_string(),
                iban: "FR7630006000011234567890189".to_string(),
                bic: "AGRIFRPP".to_string(),
            },
        )
        .await?;

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].user_id, user.id);
        assert_eq!(accounts[0].title, "Main");
        assert_eq!(accounts[0].balance(), Decimal::new(500, 0));

        Ok(())
    }

    #[tokio::test]
    async fn test_add_bank_account_duplicate_iban() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "alice").await?;
        create_test_bank_account(&db, user.id, "FR7630006000011234567890189").await?;

        let result = create_test_bank_account(&db, user.id, "FR7630006000011234567890189").await;
        assert!(matches!(
            result,
            Err(Error::ResourceAlreadyExists {
                resource: Resource::BankAccount,
                ..
            })
        ));

        // Same IBAN under another owner is allowed
        let other = create_test_user(&db, "bob").await?;
        create_test_bank_account(&db, other.id, "FR7630006000011234567890189").await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_racing_adds_register_iban_once() -> Result<()> {
        let (db, path) = setup_file_test_db("racing-iban").await?;
        let db = Arc::new(db);
        let user_id = create_test_user(&db, "alice").await?.id;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let db = Arc::clone(&db);
            handles.push(tokio::spawn(async move {
                create_test_bank_account(&db, user_id, "FR7630006000011234567890189").await
            }));
        }

        let mut registered = 0;
        for handle in handles {
            let outcome = handle.await.unwrap();
            assert!(
                matches!(
                    outcome,
                    Ok(_) | Err(Error::ResourceAlreadyExists { .. } | Error::Database(_))
                ),
                "unexpected failure: {outcome:?}"
            );
            if outcome.is_ok() {
                registered += 1;
            }
        }

        assert_eq!(registered, 1);
        let stored = BankAccount::find()
            .filter(bank_account::Column::UserId.eq(user_id))
            .count(db.as_ref())
            .await?;
        assert_eq!(stored, 1);

        remove_file_test_db(&path);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_bank_account_unknown_user() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_test_bank_account(&db, 12, "DE89370400440532013000").await;
        assert!(matches!(
            result,
            Err(Error::ResourceNotFound {
                resource: Resource::User,
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_bank_account() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "alice").await?;
        let first = create_test_bank_account(&db, user.id, "FR7630006000011234567890189").await?;
        let second = create_test_bank_account(&db, user.id, "DE89370400440532013000").await?;

        let remaining = remove_bank_account(&db, user.id, first.id).await?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second.id);
        assert!(BankAccount::find_by_id(first.id).one(&db).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_bank_account_of_someone_else() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;
        let bobs = create_test_bank_account(&db, bob.id, "DE89370400440532013000").await?;

        let result = remove_bank_account(&db, alice.id, bobs.id).await;
        assert!(matches!(
            result,
            Err(Error::ResourceNotFound {
                resource: Resource::BankAccount,
                ..
            })
        ));
        assert!(BankAccount::find_by_id(bobs.id).one(&db).await?.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_get_bank_accounts_paged() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "alice").await?;
        for iban in [
            "FR7630006000011234567890189",
            "DE89370400440532013000",
            "GB29NWBK60161331926819",
        ] {
            create_test_bank_account(&db, user.id, iban).await?;
        }

        let page = get_bank_accounts(&db, user.id, PageRequest::of(1, 2)).await?;
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].iban, "GB29NWBK60161331926819");
        assert_eq!(page.total_pages, 2);

        let beyond = get_bank_accounts(&db, user.id, PageRequest::of(5, 2)).await?;
        assert!(beyond.is_empty());
        assert_eq!(beyond.total_items, 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_bank_account_by_id() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "alice").await?;
        let account = create_test_bank_account(&db, user.id, "DE89370400440532013000").await?;

        delete_bank_account(&db, account.id).await?;
        assert!(matches!(
            get_bank_account(&db, user.id, account.id).await,
            Err(Error::ResourceNotFound { .. })
        ));

        let missing = delete_bank_account(&db, account.id).await;
        assert!(matches!(missing, Err(Error::ResourceNotFound { .. })));

        Ok(())
    }
}

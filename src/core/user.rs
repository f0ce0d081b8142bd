//! User business logic - registration, profile updates, lookups and deletion.
//!
//! Email addresses are unique across users; the check runs on registration and
//! whenever an update changes the address. Deleting a user goes through the
//! cascade in [`super::cascade`] inside a single database transaction.

use crate::{
    core::{
        balance::BalanceAccount,
        cascade::{self, CascadeReport},
        page::{self, Page, PageRequest},
    },
    entities::{Role, User, user},
    errors::{Error, Resource, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, warn};

/// Fields needed to register a user
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Given name
    pub firstname: String,
    /// Family name
    pub lastname: String,
    /// Login email
    pub email: String,
    /// Credential already encoded by the authentication layer
    pub password: String,
    /// Authorization role
    pub role: Role,
}

/// Profile changes; `password` is only replaced when present and not blank
#[derive(Debug, Clone)]
pub struct UserUpdate {
    /// Given name
    pub firstname: String,
    /// Family name
    pub lastname: String,
    /// Login email
    pub email: String,
    /// New encoded credential, ignored when blank
    pub password: Option<String>,
}

/// Loads a user, failing with `ResourceNotFound` when absent.
///
/// Also refuses to hand out a user whose persisted wallet is negative.
pub(crate) async fn load_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(Resource::User, user_id))?;
    user.ensure_non_negative()?;
    Ok(user)
}

async fn ensure_email_available<C>(db: &C, email: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let taken = User::find()
        .filter(user::Column::Email.eq(email))
        .count(db)
        .await?
        > 0;
    if taken {
        warn!(%email, "Email already in use");
        return Err(Error::already_exists(Resource::Email, email));
    }
    Ok(())
}

/// Registers a new user with an empty wallet.
///
/// # Errors
/// Returns `ResourceAlreadyExists` if the email is taken, or a database error.
pub async fn register_user(db: &DatabaseConnection, new_user: NewUser) -> Result<user::Model> {
    let txn = db.begin().await?;
    ensure_email_available(&txn, &new_user.email).await?;

    let email = new_user.email.clone();
    let user = user::ActiveModel {
        firstname: Set(new_user.firstname),
        lastname: Set(new_user.lastname),
        email: Set(new_user.email),
        password: Set(new_user.password),
        wallet_cents: Set(0),
        role: Set(new_user.role),
        registered_at: Set(chrono::Utc::now()),
        enabled: Set(true),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| Error::from_unique_violation(e, Resource::Email, email))?;

    txn.commit().await?;
    info!(user_id = user.id, email = %user.email, "User registered");
    Ok(user)
}

/// Updates names, email and optionally the password credential of a user.
///
/// # Errors
/// Returns `ResourceNotFound` for an unknown user, `ResourceAlreadyExists` if the
/// new email belongs to someone else, or a database error.
pub async fn update_user(
    db: &DatabaseConnection,
    user_id: i64,
    update: UserUpdate,
) -> Result<user::Model> {
    let txn = db.begin().await?;
    let current = load_user(&txn, user_id).await?;

    let mut user: user::ActiveModel = current.clone().into();
    let email = update.email.clone();
    if update.email != current.email {
        ensure_email_available(&txn, &update.email).await?;
        user.email = Set(update.email);
    }
    if let Some(password) = update.password.filter(|p| !p.trim().is_empty()) {
        user.password = Set(password);
    }
    user.firstname = Set(update.firstname);
    user.lastname = Set(update.lastname);

    let updated = user
        .update(&txn)
        .await
        .map_err(|e| Error::from_unique_violation(e, Resource::Email, email))?;
    txn.commit().await?;
    info!(user_id, "User updated");
    Ok(updated)
}

/// Retrieves a user by id.
///
/// # Errors
/// Returns `ResourceNotFound` when no user has this id.
pub async fn get_user(db: &DatabaseConnection, user_id: i64) -> Result<user::Model> {
    load_user(db, user_id).await
}

/// Finds a user by email, `None` if nobody uses it.
pub async fn find_user_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists users ordered by id, one page at a time.
pub async fn get_users(db: &DatabaseConnection, request: PageRequest) -> Result<Page<user::Model>> {
    let select = User::find().order_by_asc(user::Column::Id);
    page::fetch_page(db, select, request).await
}

/// Deletes a user after cascading the cleanup to connections, bank accounts and history.
///
/// All cleanup steps and the final delete commit together or not at all. A
/// non-zero wallet is discarded with the user.
///
/// # Errors
/// Returns `ResourceNotFound` for an unknown user, or the first failing step's error.
pub async fn delete_user(db: &DatabaseConnection, user_id: i64) -> Result<CascadeReport> {
    let txn = db.begin().await?;
    let user = load_user(&txn, user_id).await?;

    let report = cascade::cascade_user_deletion(&txn, &user).await?;

    txn.commit().await?;
    info!(
        user_id,
        discarded_wallet = %user.balance(),
        "User deleted"
    );
    Ok(report)
}

//! Deletion cascade - cleanup that must run before a user or bank account row is removed.
//!
//! The steps are an explicit ordered list rather than registered listeners. Every
//! step runs on the caller's database transaction; the first failure aborts the
//! whole deletion and the caller's transaction rolls back, so a deletion is never
//! half applied.
//!
//! Historical records are anonymized, never dropped: the reference to the deleted
//! entity becomes `NULL` and the rest of the row stays queryable.

use crate::{
    core::connection,
    entities::{
        BankAccount, BankTransfer, Transaction, User, bank_account, bank_transfer, transaction,
        user,
    },
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*, sea_query::Expr};
use tracing::{debug, error};

/// Cleanup performed when a user is deleted, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCleanupStep {
    /// Remove every connection edge touching the user, on both sides
    DetachConnections,
    /// Delete each owned bank account through [`BankAccountCleanupStep`]
    RemoveBankAccounts,
    /// Clear the emitter/receiver side held by the user on transactions
    AnonymizeTransactions,
    /// Clear the wallet owner on bank transfers
    AnonymizeBankTransfers,
}

/// Cleanup performed when a bank account is deleted, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankAccountCleanupStep {
    /// Clear the account reference on its bank transfers
    AnonymizeBankTransfers,
}

/// Steps run by [`cascade_user_deletion`]
pub const USER_DELETION_STEPS: [UserCleanupStep; 4] = [
    UserCleanupStep::DetachConnections,
    UserCleanupStep::RemoveBankAccounts,
    UserCleanupStep::AnonymizeTransactions,
    UserCleanupStep::AnonymizeBankTransfers,
];

/// Steps run by [`cascade_bank_account_deletion`]
pub const BANK_ACCOUNT_DELETION_STEPS: [BankAccountCleanupStep; 1] =
    [BankAccountCleanupStep::AnonymizeBankTransfers];

/// Rows touched by each step of a completed cascade
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Step name and row count, in execution order
    pub steps: Vec<(&'static str, u64)>,
}

impl CascadeReport {
    fn record(&mut self, step: &'static str, rows: u64) {
        self.steps.push((step, rows));
    }

    /// Rows touched by the named step, if it ran.
    #[must_use]
    pub fn rows_for(&self, step: &str) -> Option<u64> {
        self.steps
            .iter()
            .find(|(name, _)| *name == step)
            .map(|(_, rows)| *rows)
    }
}

impl UserCleanupStep {
    /// Stable name used in logs and reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DetachConnections => "detach_connections",
            Self::RemoveBankAccounts => "remove_bank_accounts",
            Self::AnonymizeTransactions => "anonymize_transactions",
            Self::AnonymizeBankTransfers => "anonymize_bank_transfers",
        }
    }

    async fn run<C>(self, db: &C, user: &user::Model) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        match self {
            Self::DetachConnections => connection::detach_all(db, user.id).await,
            Self::RemoveBankAccounts => {
                let accounts = BankAccount::find()
                    .filter(bank_account::Column::UserId.eq(user.id))
                    .order_by_asc(bank_account::Column::Id)
                    .all(db)
                    .await?;
                let removed = accounts.len() as u64;
                for account in &accounts {
                    cascade_bank_account_deletion(db, account).await?;
                }
                Ok(removed)
            }
            Self::AnonymizeTransactions => {
                let emitted = Transaction::update_many()
                    .col_expr(transaction::Column::EmitterId, Expr::value(None::<i64>))
                    .filter(transaction::Column::EmitterId.eq(user.id))
                    .exec(db)
                    .await?;
                let received = Transaction::update_many()
                    .col_expr(transaction::Column::ReceiverId, Expr::value(None::<i64>))
                    .filter(transaction::Column::ReceiverId.eq(user.id))
                    .exec(db)
                    .await?;
                Ok(emitted.rows_affected + received.rows_affected)
            }
            Self::AnonymizeBankTransfers => {
                let result = BankTransfer::update_many()
                    .col_expr(bank_transfer::Column::UserId, Expr::value(None::<i64>))
                    .filter(bank_transfer::Column::UserId.eq(user.id))
                    .exec(db)
                    .await?;
                Ok(result.rows_affected)
            }
        }
    }
}

impl BankAccountCleanupStep {
    /// Stable name used in logs and reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AnonymizeBankTransfers => "anonymize_account_transfers",
        }
    }

    async fn run<C>(self, db: &C, account: &bank_account::Model) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        match self {
            Self::AnonymizeBankTransfers => {
                let result = BankTransfer::update_many()
                    .col_expr(
                        bank_transfer::Column::BankAccountId,
                        Expr::value(None::<i64>),
                    )
                    .filter(bank_transfer::Column::BankAccountId.eq(account.id))
                    .exec(db)
                    .await?;
                Ok(result.rows_affected)
            }
        }
    }
}

/// Runs every user cleanup step, then deletes the user row.
///
/// `db` must be a transaction owned by the caller; nothing is committed here.
pub(crate) async fn cascade_user_deletion<C>(db: &C, user: &user::Model) -> Result<CascadeReport>
where
    C: ConnectionTrait,
{
    let mut report = CascadeReport::default();
    for step in USER_DELETION_STEPS {
        let rows = step.run(db, user).await.inspect_err(|e| {
            error!(user_id = user.id, step = step.name(), "User deletion step failed: {e}");
        })?;
        debug!(user_id = user.id, step = step.name(), rows, "User deletion step done");
        report.record(step.name(), rows);
    }

    User::delete_by_id(user.id).exec(db).await?;
    Ok(report)
}

/// Runs every bank account cleanup step, then deletes the account row.
///
/// `db` must be a transaction owned by the caller; nothing is committed here.
pub(crate) async fn cascade_bank_account_deletion<C>(
    db: &C,
    account: &bank_account::Model,
) -> Result<CascadeReport>
where
    C: ConnectionTrait,
{
    let mut report = CascadeReport::default();
    for step in BANK_ACCOUNT_DELETION_STEPS {
        let rows = step.run(db, account).await.inspect_err(|e| {
            error!(
                bank_account_id = account.id,
                step = step.name(),
                "Bank account deletion step failed: {e}"
            );
        })?;
        debug!(
            bank_account_id = account.id,
            step = step.name(),
            rows,
            "Bank account deletion step done"
        );
        report.record(step.name(), rows);
    }

    BankAccount::delete_by_id(account.id).exec(db).await?;
    Ok(report)
}

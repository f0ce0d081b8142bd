//! Balance primitives shared by user wallets and bank accounts.
//!
//! Amounts are exact decimals with two fractional digits. They are persisted as
//! integer cents, so the conversion here is the only place where a `Decimal`
//! meets the storage representation.
//!
//! Writes go through a compare-and-save: the `UPDATE` only matches when the row
//! still holds the balance that was loaded, which serializes concurrent
//! read-modify-write cycles on the same account.

use crate::{
    entities::{BankAccount, User, bank_account, user},
    errors::{Error, Resource, Result},
};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use sea_orm::{prelude::*, sea_query::Expr};
use tracing::{error, warn};

/// Number of fractional digits carried by every amount.
pub const SCALE: u32 = 2;

/// Converts an amount to integer cents.
///
/// # Errors
/// Returns `InvalidAmount` if the amount has more than two fractional digits
/// or does not fit in the storage range.
pub fn to_cents(amount: Decimal) -> Result<i64> {
    if amount.normalize().scale() > SCALE {
        return Err(Error::InvalidAmount { amount });
    }

    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or(Error::InvalidAmount { amount })
}

/// Converts integer cents back to a two-digit decimal.
#[must_use]
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, SCALE)
}

/// Validates a requested transfer amount: strictly positive, at most two decimals.
///
/// # Errors
/// Returns `InvalidAmount` otherwise.
pub fn validate_amount(amount: Decimal) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }
    to_cents(amount)
}

/// A non-negative monetary balance with credit/debit operations.
///
/// Both operations are all-or-nothing: on error the balance is untouched.
/// Persisting the owning entity is the caller's job.
pub trait BalanceAccount {
    /// Which entity this balance belongs to, for error reporting.
    fn identity(&self) -> (Resource, i64);

    /// Raw balance in cents.
    fn balance_cents(&self) -> i64;

    /// Overwrites the raw balance.
    fn set_balance_cents(&mut self, cents: i64);

    /// Current balance as a decimal.
    fn balance(&self) -> Decimal {
        from_cents(self.balance_cents())
    }

    /// Adds `amount` to the balance.
    ///
    /// # Errors
    /// Returns `InvalidAmount` for a negative amount or one with more than two decimals.
    fn credit(&mut self, amount: Decimal) -> Result<()> {
        if amount < Decimal::ZERO {
            return Err(Error::InvalidAmount { amount });
        }
        let cents = to_cents(amount)?;
        let updated = self
            .balance_cents()
            .checked_add(cents)
            .ok_or(Error::InvalidAmount { amount })?;
        self.set_balance_cents(updated);
        Ok(())
    }

    /// Removes `amount` from the balance.
    ///
    /// # Errors
    /// Returns `InvalidAmount` for a negative amount, `InsufficientProvision` when
    /// the balance would become negative.
    fn debit(&mut self, amount: Decimal) -> Result<()> {
        if amount < Decimal::ZERO {
            return Err(Error::InvalidAmount { amount });
        }
        let cents = to_cents(amount)?;
        let updated = self
            .balance_cents()
            .checked_sub(cents)
            .filter(|remaining| *remaining >= 0)
            .ok_or_else(|| Error::InsufficientProvision {
                balance: self.balance(),
                required: amount,
            })?;
        self.set_balance_cents(updated);
        Ok(())
    }

    /// Fails loudly if a persisted balance is already negative.
    ///
    /// # Errors
    /// Returns `InvariantViolation`; the balance is never repaired here.
    fn ensure_non_negative(&self) -> Result<()> {
        if self.balance_cents() < 0 {
            let (resource, id) = self.identity();
            error!(%resource, id, balance = %self.balance(), "Persisted balance is negative");
            return Err(Error::InvariantViolation {
                message: format!("{resource} {id} has a negative balance {}", self.balance()),
            });
        }
        Ok(())
    }
}

impl BalanceAccount for user::Model {
    fn identity(&self) -> (Resource, i64) {
        (Resource::User, self.id)
    }

    fn balance_cents(&self) -> i64 {
        self.wallet_cents
    }

    fn set_balance_cents(&mut self, cents: i64) {
        self.wallet_cents = cents;
    }
}

impl BalanceAccount for bank_account::Model {
    fn identity(&self) -> (Resource, i64) {
        (Resource::BankAccount, self.id)
    }

    fn balance_cents(&self) -> i64 {
        self.balance_cents
    }

    fn set_balance_cents(&mut self, cents: i64) {
        self.balance_cents = cents;
    }
}

/// Caller policy applied before a credit: refuse to raise the balance above `ceiling`.
///
/// # Errors
/// Returns `ExceedingBalanceCeiling` when the credited balance would exceed the ceiling.
pub fn ensure_within_ceiling(
    account: &impl BalanceAccount,
    amount: Decimal,
    ceiling: Option<Decimal>,
) -> Result<()> {
    let Some(ceiling) = ceiling else {
        return Ok(());
    };
    let balance = account.balance();
    if balance + amount > ceiling {
        return Err(Error::ExceedingBalanceCeiling {
            balance,
            amount,
            ceiling,
        });
    }
    Ok(())
}

/// Persists a user's wallet if it still holds `expected_cents`.
///
/// # Errors
/// Returns `ConcurrentModification` when another unit of work changed the wallet first.
pub async fn save_wallet<C>(db: &C, user: &user::Model, expected_cents: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = User::update_many()
        .col_expr(user::Column::WalletCents, Expr::value(user.wallet_cents))
        .filter(user::Column::Id.eq(user.id))
        .filter(user::Column::WalletCents.eq(expected_cents))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        warn!(user_id = user.id, "Wallet changed since it was loaded");
        return Err(Error::ConcurrentModification {
            resource: Resource::User,
            id: user.id,
        });
    }
    Ok(())
}

/// Persists a bank account balance if it still holds `expected_cents`.
///
/// # Errors
/// Returns `ConcurrentModification` when another unit of work changed the balance first.
pub async fn save_bank_balance<C>(
    db: &C,
    account: &bank_account::Model,
    expected_cents: i64,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = BankAccount::update_many()
        .col_expr(
            bank_account::Column::BalanceCents,
            Expr::value(account.balance_cents),
        )
        .filter(bank_account::Column::Id.eq(account.id))
        .filter(bank_account::Column::BalanceCents.eq(expected_cents))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        warn!(bank_account_id = account.id, "Bank balance changed since it was loaded");
        return Err(Error::ConcurrentModification {
            resource: Resource::BankAccount,
            id: account.id,
        });
    }
    Ok(())
}

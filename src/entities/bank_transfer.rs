//! Bank transfer entity - A movement between a user's wallet and one of their bank accounts.
//!
//! `is_income` is true for bank -> wallet and false for wallet -> bank. Deleting the
//! bank account (or its owner) clears the references instead of dropping the row.
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Bank transfer database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bank_transfers")]
pub struct Model {
    /// Unique identifier for the bank transfer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Bank account involved, `None` once the account is deleted
    pub bank_account_id: Option<i64>,
    /// Wallet owner at transfer time, `None` once the user is deleted
    pub user_id: Option<i64>,
    /// Title of the bank account at transfer time
    pub account_title: String,
    /// Transferred amount in cents
    pub amount_cents: i64,
    /// `true` for bank -> wallet, `false` for wallet -> bank
    pub is_income: bool,
    /// When the transfer was committed
    pub date: DateTimeUtc,
}

impl Model {
    /// Transferred amount
    #[must_use]
    pub fn amount(&self) -> Decimal {
        crate::core::balance::from_cents(self.amount_cents)
    }
}

/// Defines relationships between BankTransfer and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Account the money moved through
    #[sea_orm(
        belongs_to = "super::bank_account::Entity",
        from = "Column::BankAccountId",
        to = "super::bank_account::Column::Id"
    )]
    BankAccount,
    /// Wallet owner
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}

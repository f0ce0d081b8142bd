//! Bank account entity - An external account registered by exactly one user.
//!
//! The pair (`user_id`, `iban`) is unique. `core::bank_account` checks it before
//! inserting and the schema backs it with a unique index.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Bank account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bank_accounts")]
pub struct Model {
    /// Unique identifier for the bank account
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable label (e.g., "Main checking")
    pub title: String,
    /// International bank account number
    pub iban: String,
    /// Bank identifier code
    pub bic: String,
    /// Balance in cents, never negative
    pub balance_cents: i64,
    /// Owning user
    pub user_id: i64,
}

/// Defines relationships between BankAccount and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each bank account belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

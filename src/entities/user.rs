//! User entity - A registered member holding a wallet balance.
//!
//! Owns its bank accounts (see [`super::bank_account`]). Connections to other users
//! live in the separate [`super::connection`] edge table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Authorization role of a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum Role {
    /// Regular member
    #[sea_orm(string_value = "USER")]
    User,
    /// Administrator with access to every record
    #[sea_orm(string_value = "ADMIN")]
    Admin,
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Given name
    pub firstname: String,
    /// Family name
    pub lastname: String,
    /// Login email, unique across all users
    #[sea_orm(unique)]
    pub email: String,
    /// Already-encoded password credential
    #[serde(skip_serializing)]
    pub password: String,
    /// Wallet balance in cents, never negative
    pub wallet_cents: i64,
    /// Authorization role
    pub role: Role,
    /// When the user registered
    pub registered_at: DateTimeUtc,
    /// Whether the account may log in
    pub enabled: bool,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user owns many bank accounts
    #[sea_orm(has_many = "super::bank_account::Entity")]
    BankAccounts,
}

impl Related<super::bank_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Transaction entity - A user-to-user money movement.
//!
//! Rows are never deleted. When a participant is deleted the matching `emitter_id`
//! or `receiver_id` is set to `None`; the names captured at creation keep the
//! record readable.
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Sending user, `None` once that user is deleted
    pub emitter_id: Option<i64>,
    /// Receiving user, `None` once that user is deleted
    pub receiver_id: Option<i64>,
    /// `"firstname lastname"` of the emitter at creation time
    pub emitter_name: String,
    /// `"firstname lastname"` of the receiver at creation time
    pub receiver_name: String,
    /// Free text entered by the emitter
    pub description: String,
    /// Amount credited to the receiver, in cents
    pub amount_cents: i64,
    /// Fee retained on top of the amount, in cents
    pub fee_cents: i64,
    /// When the transaction was committed
    pub date: DateTimeUtc,
}

impl Model {
    /// Amount credited to the receiver
    #[must_use]
    pub fn amount(&self) -> Decimal {
        crate::core::balance::from_cents(self.amount_cents)
    }

    /// Fee paid by the emitter on top of the amount
    #[must_use]
    pub fn fee(&self) -> Decimal {
        crate::core::balance::from_cents(self.fee_cents)
    }
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Sending user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::EmitterId",
        to = "super::user::Column::Id"
    )]
    Emitter,
    /// Receiving user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReceiverId",
        to = "super::user::Column::Id"
    )]
    Receiver,
}

impl ActiveModelBehavior for ActiveModel {}

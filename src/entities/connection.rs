//! Connection entity - One row per symmetric "can send money to" edge.
//!
//! The pair is stored in canonical order (`first_user_id < second_user_id`), so
//! A-B and B-A are the same row and the relation cannot become one-sided.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Connection database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "connections")]
pub struct Model {
    /// Lower user id of the pair
    #[sea_orm(primary_key, auto_increment = false)]
    pub first_user_id: i64,
    /// Higher user id of the pair
    #[sea_orm(primary_key, auto_increment = false)]
    pub second_user_id: i64,
    /// When the two users got connected
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Returns the other endpoint of the edge as seen from `user_id`.
    #[must_use]
    pub const fn counterpart_of(&self, user_id: i64) -> i64 {
        if self.first_user_id == user_id {
            self.second_user_id
        } else {
            self.first_user_id
        }
    }
}

/// Both endpoints reference the users table
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Lower endpoint
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::FirstUserId",
        to = "super::user::Column::Id"
    )]
    FirstUser,
    /// Higher endpoint
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SecondUserId",
        to = "super::user::Column::Id"
    )]
    SecondUser,
}

impl ActiveModelBehavior for ActiveModel {}

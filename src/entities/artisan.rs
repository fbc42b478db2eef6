//! Artisan entity - Seller profile owned by one user.
//!
//! The artisan's status gates marketplace visibility of every product they own.

use super::product::ListingStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Artisan profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "artisans")]
pub struct Model {
    /// Unique identifier for the artisan
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user account
    #[sea_orm(unique)]
    pub user_id: i64,
    /// Display name shown next to products
    pub name: String,
    /// Contact email, unique among artisans
    pub email: String,
    /// Contact phone number
    pub phone: String,
    /// Whether the artisan's products are visible
    pub status: ListingStatus,
    /// When the artisan joined the marketplace
    pub join_date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Product entity - Items listed for sale by an artisan.
//!
//! Invariants kept by the `core` layer: `price_cents > 0` and `stock >= 0`.
//! Stock is only ever changed with single-statement `stock = stock ± n` updates.
//! Deleted products are soft-deleted so historical order lines keep their reference.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Visibility of a product or of an artisan's whole storefront.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

impl ListingStatus {
    /// Returns the opposite status, used by the storefront on/off switch.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Artisan who owns the listing
    pub artisan_id: i64,
    /// Category the product is listed under
    pub category_id: i64,
    /// Name of the product (e.g., "Hand-thrown Vase")
    pub name: String,
    /// Free-text description, searched by the catalog
    pub description: String,
    /// Current unit price in minor currency units
    pub price_cents: i64,
    /// Units available for sale
    pub stock: i32,
    /// Whether the artisan has the listing switched on
    pub status: ListingStatus,
    /// Opaque reference into the file-storage service
    pub image_ref: Option<String>,
    /// Soft delete flag - if true, product is hidden but order history is preserved
    pub is_deleted: bool,
    /// When the product was listed
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product belongs to one artisan
    #[sea_orm(
        belongs_to = "super::artisan::Entity",
        from = "Column::ArtisanId",
        to = "super::artisan::Column::Id"
    )]
    Artisan,
    /// Each product belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
    #[sea_orm(has_many = "super::order_detail::Entity")]
    OrderDetails,
}

impl Related<super::artisan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Artisan.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<super::order_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderDetails.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True when customers may buy this product, given its artisan's status.
    #[must_use]
    pub fn is_purchasable(&self, artisan_status: ListingStatus) -> bool {
        !self.is_deleted
            && self.status == ListingStatus::Active
            && artisan_status == ListingStatus::Active
    }
}

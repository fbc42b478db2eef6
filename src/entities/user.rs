//! User entity - Login accounts for every role.
//!
//! The role is fixed at registration. Role-specific data lives in the
//! `artisans` and `customers` profile tables.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of marketplace roles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Marketplace administrator
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Seller who owns products
    #[sea_orm(string_value = "artisan")]
    Artisan,
    /// Buyer who owns a cart and orders
    #[sea_orm(string_value = "customer")]
    Customer,
}

impl Role {
    /// Returns the role name as stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Artisan => "artisan",
            Self::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, unique across all roles
    #[sea_orm(unique)]
    pub username: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Role chosen at registration
    pub role: Role,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A user may own one artisan profile
    #[sea_orm(has_one = "super::artisan::Entity")]
    Artisan,
    /// A user may own one customer profile
    #[sea_orm(has_one = "super::customer::Entity")]
    Customer,
}

impl Related<super::artisan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Artisan.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

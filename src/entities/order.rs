//! Order entity and the order status state machine.
//!
//! ```text
//! Pending ──► Processing ──► Shipped ──► Delivered
//!    │             │            │
//!    └─────────────┴────────────┴──► Cancelled
//! ```
//!
//! Delivered and Cancelled are terminal. Customers may only cancel while Pending;
//! artisans may move a non-terminal order to any other state unless strict
//! transitions are configured, in which case only the arrows above are accepted.

use crate::errors::Error;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The state of an order in its lifecycle.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum OrderStatus {
    /// Placed by the customer, not yet confirmed by an artisan.
    #[default]
    #[sea_orm(string_value = "Pending")]
    Pending,
    /// Confirmed and being prepared.
    #[sea_orm(string_value = "Processing")]
    Processing,
    /// Handed to the carrier.
    #[sea_orm(string_value = "Shipped")]
    Shipped,
    /// Received by the customer (terminal).
    #[sea_orm(string_value = "Delivered")]
    Delivered,
    /// Cancelled and stock returned (terminal).
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Returns true if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Returns true while the order still blocks deletion of its products.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Returns true if the customer may still cancel the order.
    #[must_use]
    pub const fn customer_can_cancel(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// The next state on the happy path, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Processing),
            Self::Processing => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Whether an artisan may move an order from `self` to `to`.
    ///
    /// Terminal states are never left and a status is never "changed" to itself.
    /// With `strict` unset any other move is accepted.
    #[must_use]
    pub fn artisan_can_move_to(self, to: Self, strict: bool) -> bool {
        if self.is_terminal() || self == to {
            return false;
        }
        if !strict {
            return true;
        }
        to == Self::Cancelled || self.next() == Some(to)
    }

    /// Returns the status name as stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid_input(format!("Unknown order status '{s}'")))
    }
}

/// Order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Customer who placed the order
    pub customer_id: i64,
    /// When the order was placed
    pub order_date: DateTimeUtc,
    /// Current lifecycle state
    pub status: OrderStatus,
    /// Sum of line subtotals plus shipping, in minor units
    pub total_amount_cents: i64,
    /// Shipping charge included in the total
    pub shipping_cents: i64,
    /// Address captured at checkout
    pub shipping_address: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one customer
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    /// One order has many lines
    #[sea_orm(has_many = "super::order_detail::Entity")]
    OrderDetails,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::order_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderDetails.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Unified error type for the marketplace.
//!
//! Business rule violations are detected before any mutation and carry a message
//! that can be shown to the end user as-is. Datastore failures are wrapped in
//! [`Error::Database`]; their detail is logged, not surfaced.

use crate::entities::OrderStatus;
use std::fmt;
use thiserror::Error;

/// One product that could not be supplied in the requested quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockShortage {
    /// Product ID
    pub product_id: i64,
    /// Product name at the time of the check
    pub product_name: String,
    /// Quantity the customer asked for
    pub requested: i32,
    /// Quantity currently in stock
    pub available: i32,
}

impl fmt::Display for StockShortage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (requested {}, only {} available)",
            self.product_name, self.requested, self.available
        )
    }
}

fn join_shortages(shortages: &[StockShortage]) -> String {
    shortages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Access denied: {message}")]
    Unauthorized { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("{product} is no longer available")]
    Unavailable { product: String },

    #[error("Insufficient stock for: {}", join_shortages(.shortages))]
    InsufficientStock { shortages: Vec<StockShortage> },

    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Cannot delete {product}: it is part of pending or processing orders")]
    ProductInActiveOrders { product: String },

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Password hashing failed")]
    PasswordHash,

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Integer conversion error: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Returns true for failures of the datastore rather than of a business rule.
    #[must_use]
    pub const fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Io(_) | Self::IntConversion(_))
    }

    /// Text suitable for showing to the person who submitted the request.
    ///
    /// Persistence failures are reduced to a generic message; the caller is
    /// expected to have logged the underlying error.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.is_persistence_failure() {
            "Something went wrong while saving your request. Please try again.".to_string()
        } else {
            self.to_string()
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_names_every_product() {
        let err = Error::InsufficientStock {
            shortages: vec![
                StockShortage {
                    product_id: 1,
                    product_name: "Clay Vase".to_string(),
                    requested: 4,
                    available: 3,
                },
                StockShortage {
                    product_id: 2,
                    product_name: "Wool Scarf".to_string(),
                    requested: 2,
                    available: 0,
                },
            ],
        };

        assert_eq!(
            err.to_string(),
            "Insufficient stock for: Clay Vase (requested 4, only 3 available), \
             Wool Scarf (requested 2, only 0 available)"
        );
    }

    #[test]
    fn test_user_message_hides_database_detail() {
        let err = Error::Database(sea_orm::DbErr::Custom("disk I/O error".to_string()));
        assert!(err.is_persistence_failure());
        assert!(!err.user_message().contains("disk"));

        let err = Error::invalid_input("Your cart is empty");
        assert!(!err.is_persistence_failure());
        assert_eq!(err.user_message(), "Invalid input: Your cart is empty");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = Error::InvalidTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "Cannot change order status from Shipped to Cancelled"
        );
    }
}

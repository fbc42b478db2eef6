/// Registration, login and password hashing
pub mod account;

/// Customer carts
pub mod cart;

/// Product search and artisan product management
pub mod catalog;

/// Authenticated principal passed into every operation
pub mod context;

/// Checkout, cancellation and order status workflow
pub mod order;

/// Shipping surcharge and money formatting
pub mod pricing;

/// Artisan and customer dashboards
pub mod report;

/// Database connection, schema creation and seed data
pub mod database;

/// Application settings loaded from config.toml
pub mod settings;

pub use settings::{AppConfig, CategoryConfig, Currency, OrderSettings};

//! Database configuration module for `ArtMart`.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the database schema always matches the Rust structs. Tables are created in
//! foreign-key order and only when missing, so startup is idempotent.

use crate::config::settings::CategoryConfig;
use crate::entities::{
    Artisan, CartItem, Category, Customer, Order, OrderDetail, Product, User, cart_item, category,
};
use crate::errors::Result;
use sea_orm::{
    Database, Schema, Set,
    prelude::*,
    sea_query::{Index, TableCreateStatement},
};
use std::path::Path;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/artmart.sqlite?mode=rwc";

/// Gets the database URL from the environment or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Directory that must exist before `SQLite` can create the database file.
fn sqlite_parent_dir(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    if let Some(dir) = sqlite_parent_dir(&database_url) {
        std::fs::create_dir_all(dir)?;
    }
    tracing::debug!("Connecting to {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

fn if_not_exists(mut statement: TableCreateStatement) -> TableCreateStatement {
    statement.if_not_exists();
    statement
}

/// Creates all tables, parents before children, plus the cart uniqueness index.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables = [
        if_not_exists(schema.create_table_from_entity(User)),
        if_not_exists(schema.create_table_from_entity(Artisan)),
        if_not_exists(schema.create_table_from_entity(Customer)),
        if_not_exists(schema.create_table_from_entity(Category)),
        if_not_exists(schema.create_table_from_entity(Product)),
        if_not_exists(schema.create_table_from_entity(CartItem)),
        if_not_exists(schema.create_table_from_entity(Order)),
        if_not_exists(schema.create_table_from_entity(OrderDetail)),
    ];

    for table in &tables {
        db.execute(builder.build(table)).await?;
    }

    // One cart row per (customer, product); add_item merges quantities into it
    let cart_index = Index::create()
        .if_not_exists()
        .name("idx_cart_items_customer_product")
        .table(CartItem)
        .col(cart_item::Column::CustomerId)
        .col(cart_item::Column::ProductId)
        .unique()
        .to_owned();
    db.execute(builder.build(&cart_index)).await?;

    Ok(())
}

/// Inserts every configured category that does not exist yet.
///
/// Returns the number of categories created.
pub async fn seed_categories(db: &DatabaseConnection, categories: &[CategoryConfig]) -> Result<usize> {
    let mut created = 0;

    for config in categories {
        let name = config.name.trim();
        if name.is_empty() {
            tracing::warn!("Skipping category with empty name in config");
            continue;
        }

        let exists = Category::find()
            .filter(category::Column::Name.eq(name))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }

        category::ActiveModel {
            name: Set(name.to_string()),
            description: Set(config.description.trim().to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        created += 1;
    }

    if created > 0 {
        tracing::info!("Seeded {created} categories");
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        ArtisanModel, CartItemModel, CategoryModel, CustomerModel, OrderDetailModel, OrderModel,
        ProductModel, UserModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<ArtisanModel> = Artisan::find().limit(1).all(&db).await?;
        let _: Vec<CustomerModel> = Customer::find().limit(1).all(&db).await?;
        let _: Vec<CategoryModel> = Category::find().limit(1).all(&db).await?;
        let _: Vec<ProductModel> = Product::find().limit(1).all(&db).await?;
        let _: Vec<CartItemModel> = CartItem::find().limit(1).all(&db).await?;
        let _: Vec<OrderModel> = Order::find().limit(1).all(&db).await?;
        let _: Vec<OrderDetailModel> = OrderDetail::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[test]
    fn test_sqlite_parent_dir() {
        assert_eq!(
            sqlite_parent_dir("sqlite://data/artmart.sqlite?mode=rwc"),
            Some(Path::new("data"))
        );
        assert_eq!(sqlite_parent_dir("sqlite://artmart.sqlite"), None);
        assert_eq!(sqlite_parent_dir("sqlite::memory:"), None);
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_categories_skips_existing() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let categories = vec![
            CategoryConfig {
                name: "Pottery".to_string(),
                description: "Ceramics".to_string(),
            },
            CategoryConfig {
                name: "  ".to_string(),
                description: String::new(),
            },
        ];

        assert_eq!(seed_categories(&db, &categories).await?, 1);
        assert_eq!(seed_categories(&db, &categories).await?, 0);
        assert_eq!(Category::find().all(&db).await?.len(), 1);

        Ok(())
    }
}

//! Shared test utilities for `ArtMart`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test accounts, products and carts with sensible defaults.

use crate::{
    core::{
        cart,
        catalog::{self, ProductForm},
        context::RequestContext,
    },
    entities::{ListingStatus, Role, artisan, category, customer, product, user},
    errors::Result,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Placeholder hash for fixture accounts that never log in.
const FIXTURE_PASSWORD_HASH: &str = "fixture-account-without-password";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

async fn create_test_user(db: &DatabaseConnection, username: &str, role: Role) -> Result<user::Model> {
    user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(FIXTURE_PASSWORD_HASH.to_string()),
        role: Set(role),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a customer account and returns its request context and profile.
///
/// # Defaults
/// * `email`: `"{username}@example.com"`
/// * `address`: `"1 Test Street"`
pub async fn create_test_customer(
    db: &DatabaseConnection,
    username: &str,
) -> Result<(RequestContext, customer::Model)> {
    let user = create_test_user(db, username, Role::Customer).await?;
    let profile = customer::ActiveModel {
        user_id: Set(user.id),
        name: Set(format!("Customer {username}")),
        email: Set(format!("{username}@example.com")),
        phone: Set("555-0100".to_string()),
        address: Set("1 Test Street".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok((RequestContext::for_user(&user), profile))
}

/// Creates an active artisan account and returns its request context and profile.
pub async fn create_test_artisan(
    db: &DatabaseConnection,
    username: &str,
) -> Result<(RequestContext, artisan::Model)> {
    let user = create_test_user(db, username, Role::Artisan).await?;
    let profile = artisan::ActiveModel {
        user_id: Set(user.id),
        name: Set(format!("Artisan {username}")),
        email: Set(format!("{username}@example.com")),
        phone: Set("555-0200".to_string()),
        status: Set(ListingStatus::Active),
        join_date: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok((RequestContext::for_user(&user), profile))
}

/// Creates an administrator account and returns its request context.
pub async fn create_test_admin(db: &DatabaseConnection, username: &str) -> Result<RequestContext> {
    let user = create_test_user(db, username, Role::Admin).await?;
    Ok(RequestContext::for_user(&user))
}

/// Creates a category with an empty description.
pub async fn create_test_category(db: &DatabaseConnection, name: &str) -> Result<category::Model> {
    category::ActiveModel {
        name: Set(name.to_string()),
        description: Set(String::new()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// A valid product form in the given category.
#[must_use]
pub fn product_form(category_id: i64, name: &str, price_cents: i64, stock: i32) -> ProductForm {
    ProductForm {
        category_id,
        name: name.to_string(),
        description: format!("Handmade {name}"),
        price_cents,
        stock,
        image_ref: None,
    }
}

/// Creates a product through the catalog, in a fresh category named after it.
pub async fn create_test_product(
    db: &DatabaseConnection,
    artisan_ctx: &RequestContext,
    name: &str,
    price_cents: i64,
    stock: i32,
) -> Result<product::Model> {
    let category = create_test_category(db, &format!("{name} category")).await?;
    catalog::create_product(db, artisan_ctx, product_form(category.id, name, price_cents, stock))
        .await
}

/// A marketplace with one artisan, one customer and one product.
pub struct TestMarket {
    pub db: DatabaseConnection,
    pub artisan_ctx: RequestContext,
    pub artisan: artisan::Model,
    pub customer_ctx: RequestContext,
    pub customer: customer::Model,
    pub product: product::Model,
}

/// Sets up a complete test environment with an artisan, a customer and one product.
pub async fn setup_market(price_cents: i64, stock: i32) -> Result<TestMarket> {
    let db = setup_test_db().await?;
    let (artisan_ctx, artisan) = create_test_artisan(&db, "maker").await?;
    let (customer_ctx, customer) = create_test_customer(&db, "buyer").await?;
    let product = create_test_product(&db, &artisan_ctx, "Clay Vase", price_cents, stock).await?;
    Ok(TestMarket {
        db,
        artisan_ctx,
        artisan,
        customer_ctx,
        customer,
        product,
    })
}

/// Puts `quantity` of a product into the customer's cart.
pub async fn fill_cart(
    db: &DatabaseConnection,
    customer_ctx: &RequestContext,
    product_id: i64,
    quantity: i32,
) -> Result<()> {
    cart::add_item(db, customer_ctx, product_id, quantity).await?;
    Ok(())
}

/// Reads the current stock of a product.
pub async fn stock_of(db: &DatabaseConnection, product_id: i64) -> Result<i32> {
    use sea_orm::EntityTrait;

    let product = crate::entities::Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| crate::errors::Error::not_found("Product", product_id))?;
    Ok(product.stock)
}

//! Catalog business logic - product browsing and artisan product management.
//!
//! Customers only ever see products that are active, not deleted, in stock and
//! owned by an active artisan. Artisans manage their own listings; every write is
//! scoped to the owning artisan. Products are soft-deleted so order history keeps
//! pointing at them, and deletion is refused while open orders contain the product.

use crate::{
    core::{context::RequestContext, order},
    entities::{
        Artisan, CartItem, Category, ListingStatus, Product, artisan, cart_item, category, product,
    },
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::HashMap;

/// Search and filter options for the storefront.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Matched against name and description
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
}

/// A visible product with the names the storefront shows next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub product: product::Model,
    pub artisan_name: String,
    pub category_name: String,
}

/// Largest stock an artisan may list for one product.
pub const MAX_STOCK: i32 = 1_000_000;

/// Fields an artisan supplies when listing or editing a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductForm {
    pub category_id: i64,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub stock: i32,
    pub image_ref: Option<String>,
}

impl ProductForm {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_input("Product name is required"));
        }
        if self.description.trim().is_empty() {
            return Err(Error::invalid_input("Product description is required"));
        }
        if self.price_cents <= 0 {
            return Err(Error::invalid_input("Price must be greater than 0"));
        }
        if self.stock < 0 {
            return Err(Error::invalid_input("Stock cannot be negative"));
        }
        if self.stock > MAX_STOCK {
            return Err(Error::invalid_input(format!(
                "Stock cannot exceed {MAX_STOCK} units"
            )));
        }
        if self.category_id <= 0 {
            return Err(Error::invalid_input("Please select a valid category"));
        }
        Ok(())
    }

    fn image_ref(&self) -> Option<String> {
        self.image_ref
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    }
}

/// Retrieves all categories ordered alphabetically by name.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>> {
    Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a category. Administrators only.
pub async fn create_category(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    name: &str,
    description: &str,
) -> Result<category::Model> {
    ctx.require_admin(db).await?;

    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid_input("Category name cannot be empty"));
    }

    let exists = Category::find()
        .filter(category::Column::Name.eq(name))
        .one(db)
        .await?
        .is_some();
    if exists {
        return Err(Error::invalid_input(format!("Category '{name}' already exists")));
    }

    category::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description.trim().to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Lists the products customers can currently buy, newest first.
pub async fn search_products(
    db: &DatabaseConnection,
    filter: &ProductFilter,
) -> Result<Vec<CatalogEntry>> {
    let mut query = Product::find()
        .find_also_related(Artisan)
        .filter(product::Column::Status.eq(ListingStatus::Active))
        .filter(product::Column::IsDeleted.eq(false))
        .filter(product::Column::Stock.gt(0))
        .filter(artisan::Column::Status.eq(ListingStatus::Active));

    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(product::Column::Name.contains(term))
                .add(product::Column::Description.contains(term)),
        );
    }
    if let Some(category_id) = filter.category_id {
        query = query.filter(product::Column::CategoryId.eq(category_id));
    }
    if let Some(min) = filter.min_price_cents {
        query = query.filter(product::Column::PriceCents.gte(min));
    }
    if let Some(max) = filter.max_price_cents {
        query = query.filter(product::Column::PriceCents.lte(max));
    }

    let rows = query
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .all(db)
        .await?;

    let category_names: HashMap<i64, String> = Category::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    tracing::debug!("Catalog search returned {} products", rows.len());

    Ok(rows
        .into_iter()
        .filter_map(|(product, artisan)| {
            let artisan = artisan?;
            let category_name = category_names
                .get(&product.category_id)
                .cloned()
                .unwrap_or_default();
            Some(CatalogEntry {
                product,
                artisan_name: artisan.name,
                category_name,
            })
        })
        .collect())
}

/// Retrieves a specific product by its unique ID, including deleted ones.
pub async fn get_product_by_id(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists every non-deleted product of the calling artisan, newest first.
pub async fn list_artisan_products(
    db: &DatabaseConnection,
    ctx: &RequestContext,
) -> Result<Vec<product::Model>> {
    let artisan = ctx.require_artisan(db).await?;
    Product::find()
        .filter(product::Column::ArtisanId.eq(artisan.id))
        .filter(product::Column::IsDeleted.eq(false))
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn ensure_category_exists<C>(db: &C, category_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    Category::find_by_id(category_id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| Error::invalid_input("Please select a valid category"))
}

/// Loads a product owned by the artisan. Other artisans' products look missing.
async fn find_owned_product<C>(db: &C, artisan_id: i64, product_id: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .filter(product::Column::ArtisanId.eq(artisan_id))
        .filter(product::Column::IsDeleted.eq(false))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))
}

/// Lists a new product for the calling artisan. New products start active.
///
/// # Errors
/// Returns an error if:
/// - The caller is not an artisan
/// - Name or description is empty, price is not positive, stock is negative
/// - The category does not exist
pub async fn create_product(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    form: ProductForm,
) -> Result<product::Model> {
    form.validate()?;
    let artisan = ctx.require_artisan(db).await?;
    ensure_category_exists(db, form.category_id).await?;

    let now = chrono::Utc::now();
    let image_ref = form.image_ref();
    let product = product::ActiveModel {
        artisan_id: Set(artisan.id),
        category_id: Set(form.category_id),
        name: Set(form.name.trim().to_string()),
        description: Set(form.description.trim().to_string()),
        price_cents: Set(form.price_cents),
        stock: Set(form.stock),
        status: Set(ListingStatus::Active),
        image_ref: Set(image_ref),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(product_id = product.id, artisan_id = artisan.id, "Product listed");
    Ok(product)
}

/// Replaces the editable fields of one of the caller's products.
///
/// Historical order lines keep the price they were sold at.
pub async fn update_product(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    product_id: i64,
    form: ProductForm,
) -> Result<product::Model> {
    form.validate()?;
    let artisan = ctx.require_artisan(db).await?;
    ensure_category_exists(db, form.category_id).await?;

    let image_ref = form.image_ref();
    let mut product: product::ActiveModel =
        find_owned_product(db, artisan.id, product_id).await?.into();
    product.category_id = Set(form.category_id);
    product.name = Set(form.name.trim().to_string());
    product.description = Set(form.description.trim().to_string());
    product.price_cents = Set(form.price_cents);
    product.stock = Set(form.stock);
    product.image_ref = Set(image_ref);
    product.updated_at = Set(chrono::Utc::now());

    product.update(db).await.map_err(Into::into)
}

/// Switches one of the caller's products between active and inactive.
pub async fn toggle_product_status(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    product_id: i64,
) -> Result<product::Model> {
    let artisan = ctx.require_artisan(db).await?;
    let current = find_owned_product(db, artisan.id, product_id).await?;
    let new_status = current.status.toggled();

    let mut product: product::ActiveModel = current.into();
    product.status = Set(new_status);
    product.updated_at = Set(chrono::Utc::now());
    let product = product.update(db).await?;

    tracing::info!(product_id, status = %new_status, "Product status updated");
    Ok(product)
}

/// Deletes one of the caller's products.
///
/// The product is removed from every cart and soft-deleted, so past order lines
/// still resolve to it.
///
/// # Errors
/// Returns `ProductInActiveOrders` while any Pending or Processing order contains
/// the product; nothing is changed in that case.
pub async fn delete_product(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    product_id: i64,
) -> Result<product::Model> {
    let artisan = ctx.require_artisan(db).await?;

    let txn = db.begin().await?;
    let current = find_owned_product(&txn, artisan.id, product_id).await?;

    if order::has_active_orders(&txn, product_id).await? {
        tracing::warn!(product_id, "Refused to delete product with open orders");
        return Err(Error::ProductInActiveOrders {
            product: current.name,
        });
    }

    let removed = CartItem::delete_many()
        .filter(cart_item::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?
        .rows_affected;

    let mut product: product::ActiveModel = current.into();
    product.is_deleted = Set(true);
    product.status = Set(ListingStatus::Inactive);
    product.updated_at = Set(chrono::Utc::now());
    let product = product.update(&txn).await?;

    txn.commit().await?;
    tracing::info!(product_id, removed_from_carts = removed, "Product deleted");
    Ok(product)
}

/// Activates or deactivates an artisan's storefront. Administrators only.
pub async fn set_artisan_status(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    artisan_id: i64,
    status: ListingStatus,
) -> Result<artisan::Model> {
    ctx.require_admin(db).await?;

    let mut artisan: artisan::ActiveModel = Artisan::find_by_id(artisan_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Artisan", artisan_id))?
        .into();
    artisan.status = Set(status);
    let artisan = artisan.update(db).await?;

    tracing::info!(artisan_id, %status, "Artisan status updated");
    Ok(artisan)
}

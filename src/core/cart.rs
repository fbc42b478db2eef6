//! Cart business logic - add, remove and clear cart lines.
//!
//! A customer holds at most one row per product; adding the same product again
//! merges into the existing row. The cart never touches `products.stock`: stock is
//! only reserved at checkout, which re-validates every line.

use crate::{
    core::{context::RequestContext, pricing::{self, Quote, ShippingPolicy}},
    entities::{Artisan, CartItem, ListingStatus, Product, artisan, cart_item, product},
    errors::{Error, Result, StockShortage},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use std::collections::HashMap;

/// One cart row joined with the live product it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub cart_item_id: i64,
    pub quantity: i32,
    pub product: product::Model,
    pub artisan_name: String,
    pub artisan_status: ListingStatus,
}

impl CartLine {
    /// Whether the product can still be bought (listing and storefront active).
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.product.is_purchasable(self.artisan_status)
    }

    /// Line amount at the current product price.
    pub fn subtotal_cents(&self) -> Result<i64> {
        pricing::line_subtotal(self.product.price_cents, self.quantity)
    }
}

/// The cart page: purchasable lines plus the amounts checkout would charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    /// Lines whose product was deleted or switched off since it was added
    pub unavailable: Vec<CartLine>,
    pub quote: Quote,
}

impl CartView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.unavailable.is_empty()
    }
}

/// Loads every cart row of a customer with its product and artisan, oldest first.
pub(crate) async fn load_cart_lines<C>(conn: &C, customer_id: i64) -> Result<Vec<CartLine>>
where
    C: ConnectionTrait,
{
    let rows = CartItem::find()
        .find_also_related(Product)
        .filter(cart_item::Column::CustomerId.eq(customer_id))
        .order_by_asc(cart_item::Column::Id)
        .all(conn)
        .await?;

    let artisan_ids: Vec<i64> = rows
        .iter()
        .filter_map(|(_, product)| product.as_ref().map(|p| p.artisan_id))
        .collect();
    let artisans: HashMap<i64, artisan::Model> = Artisan::find()
        .filter(artisan::Column::Id.is_in(artisan_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    rows.into_iter()
        .map(|(item, product)| {
            let product = product.ok_or_else(|| Error::not_found("Product", item.product_id))?;
            let artisan = artisans
                .get(&product.artisan_id)
                .ok_or_else(|| Error::not_found("Artisan", product.artisan_id))?;
            Ok(CartLine {
                cart_item_id: item.id,
                quantity: item.quantity,
                artisan_name: artisan.name.clone(),
                artisan_status: artisan.status,
                product,
            })
        })
        .collect()
}

/// Adds `quantity` units of a product to the caller's cart.
///
/// If the product is already in the cart the quantities are merged, and the merged
/// quantity must not exceed current stock.
///
/// # Errors
/// Returns an error if:
/// - `quantity` is not positive (`InvalidInput`)
/// - The caller is not a customer
/// - The product does not exist or was deleted (`NotFound`)
/// - The product or its artisan is inactive (`Unavailable`)
/// - The merged quantity exceeds stock (`InsufficientStock`)
pub async fn add_item(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    product_id: i64,
    quantity: i32,
) -> Result<cart_item::Model> {
    if quantity <= 0 {
        return Err(Error::invalid_input("Quantity must be at least 1"));
    }
    let customer = ctx.require_customer(db).await?;

    let txn = db.begin().await?;

    let product = Product::find_by_id(product_id)
        .filter(product::Column::IsDeleted.eq(false))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?;
    let artisan = Artisan::find_by_id(product.artisan_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Artisan", product.artisan_id))?;
    if !product.is_purchasable(artisan.status) {
        return Err(Error::Unavailable {
            product: product.name,
        });
    }

    let existing = CartItem::find()
        .filter(cart_item::Column::CustomerId.eq(customer.id))
        .filter(cart_item::Column::ProductId.eq(product_id))
        .one(&txn)
        .await?;

    let in_cart = existing.as_ref().map_or(0, |item| item.quantity);
    let merged = in_cart
        .checked_add(quantity)
        .ok_or_else(|| Error::invalid_input("Quantity is too large"))?;
    if merged > product.stock {
        return Err(Error::InsufficientStock {
            shortages: vec![StockShortage {
                product_id,
                product_name: product.name,
                requested: merged,
                available: product.stock,
            }],
        });
    }

    let cart_item_id = if let Some(item) = existing {
        CartItem::update_many()
            .col_expr(
                cart_item::Column::Quantity,
                Expr::col(cart_item::Column::Quantity).add(quantity),
            )
            .filter(cart_item::Column::Id.eq(item.id))
            .exec(&txn)
            .await?;
        item.id
    } else {
        cart_item::ActiveModel {
            customer_id: Set(customer.id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            added_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?
        .id
    };

    let item = CartItem::find_by_id(cart_item_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Cart item", cart_item_id))?;

    txn.commit().await?;
    tracing::debug!(customer_id = customer.id, product_id, quantity = item.quantity, "Cart updated");
    Ok(item)
}

/// Removes one line from the caller's cart. Lines of other customers look missing.
pub async fn remove_item(db: &DatabaseConnection, ctx: &RequestContext, cart_item_id: i64) -> Result<()> {
    let customer = ctx.require_customer(db).await?;

    let removed = CartItem::delete_many()
        .filter(cart_item::Column::Id.eq(cart_item_id))
        .filter(cart_item::Column::CustomerId.eq(customer.id))
        .exec(db)
        .await?
        .rows_affected;

    if removed == 0 {
        return Err(Error::not_found("Cart item", cart_item_id));
    }
    Ok(())
}

/// Empties the caller's cart and returns how many lines were removed.
pub async fn clear(db: &DatabaseConnection, ctx: &RequestContext) -> Result<u64> {
    let customer = ctx.require_customer(db).await?;

    let removed = CartItem::delete_many()
        .filter(cart_item::Column::CustomerId.eq(customer.id))
        .exec(db)
        .await?
        .rows_affected;

    tracing::debug!(customer_id = customer.id, removed, "Cart cleared");
    Ok(removed)
}

/// Builds the cart page for the caller, priced with the same policy as checkout.
pub async fn list_cart(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    shipping: &ShippingPolicy,
) -> Result<CartView> {
    let customer = ctx.require_customer(db).await?;
    let (lines, unavailable): (Vec<_>, Vec<_>) = load_cart_lines(db, customer.id)
        .await?
        .into_iter()
        .partition(CartLine::is_available);

    let subtotals = lines
        .iter()
        .map(CartLine::subtotal_cents)
        .collect::<Result<Vec<_>>>()?;
    let quote = if lines.is_empty() {
        Quote::default()
    } else {
        shipping.quote(subtotals)?
    };

    Ok(CartView {
        lines,
        unavailable,
        quote,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{core::catalog, test_utils::*};
    use sea_orm::{DatabaseBackend, MockDatabase, PaginatorTrait};

    #[tokio::test]
    async fn test_add_item_rejects_non_positive_quantity() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let ctx = RequestContext::new(crate::core::context::Principal {
            user_id: 1,
            username: "buyer".to_string(),
            role: crate::entities::Role::Customer,
        });

        for quantity in [0, -3] {
            let result = add_item(&db, &ctx, 1, quantity).await;
            assert!(matches!(result, Err(Error::InvalidInput { .. })));
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_add_item_merges_quantities() -> Result<()> {
        let TestMarket {
            db,
            customer_ctx,
            product,
            ..
        } = setup_market(25_00, 5).await?;

        let first = add_item(&db, &customer_ctx, product.id, 2).await?;
        let second = add_item(&db, &customer_ctx, product.id, 3).await?;

        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 5);
        assert_eq!(CartItem::find().count(&db).await?, 1);
        // Adding to the cart never reserves stock
        assert_eq!(stock_of(&db, product.id).await?, 5);

        Ok(())
    }

    #[tokio::test]
    async fn test_add_item_merged_quantity_checked_against_stock() -> Result<()> {
        let TestMarket {
            db,
            customer_ctx,
            product,
            ..
        } = setup_market(25_00, 3).await?;

        add_item(&db, &customer_ctx, product.id, 2).await?;
        let result = add_item(&db, &customer_ctx, product.id, 2).await;

        let Err(Error::InsufficientStock { shortages }) = result else {
            unreachable!("expected InsufficientStock, got {result:?}");
        };
        assert_eq!(shortages[0].requested, 4);
        assert_eq!(shortages[0].available, 3);

        let items = CartItem::find().all(&db).await?;
        assert_eq!(items[0].quantity, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_add_item_unavailable_products() -> Result<()> {
        let TestMarket {
            db,
            artisan_ctx,
            artisan,
            customer_ctx,
            product,
            ..
        } = setup_market(25_00, 3).await?;

        let result = add_item(&db, &customer_ctx, 999, 1).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        catalog::toggle_product_status(&db, &artisan_ctx, product.id).await?;
        let result = add_item(&db, &customer_ctx, product.id, 1).await;
        assert!(matches!(result, Err(Error::Unavailable { .. })));
        catalog::toggle_product_status(&db, &artisan_ctx, product.id).await?;

        let admin = create_test_admin(&db, "admin").await?;
        catalog::set_artisan_status(&db, &admin, artisan.id, ListingStatus::Inactive).await?;
        let result = add_item(&db, &customer_ctx, product.id, 1).await;
        assert!(matches!(result, Err(Error::Unavailable { .. })));

        // Artisans cannot shop
        let result = add_item(&db, &artisan_ctx, product.id, 1).await;
        assert!(matches!(result, Err(Error::Unauthorized { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_item_scoped_to_owner() -> Result<()> {
        let TestMarket {
            db,
            customer_ctx,
            product,
            ..
        } = setup_market(25_00, 3).await?;
        let (other_ctx, _) = create_test_customer(&db, "other").await?;

        let item = add_item(&db, &customer_ctx, product.id, 1).await?;

        let result = remove_item(&db, &other_ctx, item.id).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert_eq!(CartItem::find().count(&db).await?, 1);

        remove_item(&db, &customer_ctx, item.id).await?;
        assert_eq!(CartItem::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_clear_only_touches_own_cart() -> Result<()> {
        let TestMarket {
            db,
            customer_ctx,
            product,
            ..
        } = setup_market(25_00, 10).await?;
        let (other_ctx, _) = create_test_customer(&db, "other").await?;

        add_item(&db, &customer_ctx, product.id, 1).await?;
        add_item(&db, &other_ctx, product.id, 1).await?;

        assert_eq!(clear(&db, &customer_ctx).await?, 1);
        assert_eq!(clear(&db, &customer_ctx).await?, 0);
        assert_eq!(CartItem::find().count(&db).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_cart_quote_matches_checkout_pricing() -> Result<()> {
        let TestMarket {
            db,
            artisan_ctx,
            customer_ctx,
            product: vase,
            ..
        } = setup_market(25_00, 5).await?;
        let bowl = create_test_product(&db, &artisan_ctx, "Bowl", 7_50, 5).await?;
        let mug = create_test_product(&db, &artisan_ctx, "Mug", 4_00, 5).await?;

        add_item(&db, &customer_ctx, vase.id, 1).await?;
        add_item(&db, &customer_ctx, bowl.id, 2).await?;
        add_item(&db, &customer_ctx, mug.id, 1).await?;
        catalog::toggle_product_status(&db, &artisan_ctx, mug.id).await?;

        let view = list_cart(&db, &customer_ctx, &ShippingPolicy::default()).await?;
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.unavailable.len(), 1);
        assert_eq!(view.unavailable[0].product.id, mug.id);
        assert_eq!(
            view.quote,
            Quote {
                subtotal_cents: 40_00,
                shipping_cents: 5_99,
                total_cents: 45_99,
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_list_empty_cart() -> Result<()> {
        let TestMarket { db, customer_ctx, .. } = setup_market(25_00, 5).await?;

        let view = list_cart(&db, &customer_ctx, &ShippingPolicy::default()).await?;
        assert!(view.is_empty());
        assert_eq!(view.quote, Quote::default());

        Ok(())
    }
}

//! Order lifecycle engine - checkout, cancellation and status updates.
//!
//! Every mutation here runs in one database transaction and is all-or-nothing:
//! a failed checkout leaves no order, no order lines, no stock change and the
//! cart untouched; a failed cancellation leaves both the status and stock as they were.
//!
//! `products.stock` has exactly two writers. Checkout decrements it with a
//! conditional `stock = stock - n WHERE stock >= n` update, so concurrent checkouts
//! can never drive it negative. Cancellation adds every line's quantity back.

use crate::{
    core::{
        cart::{self, CartLine},
        context::RequestContext,
        pricing::{self, ShippingPolicy},
    },
    entities::{
        Artisan, CartItem, Customer, Order, OrderDetail, OrderStatus, Product, artisan, cart_item,
        customer, order, order_detail, product,
    },
    errors::{Error, Result, StockShortage},
};
use chrono::{NaiveDate, NaiveTime};
use sea_orm::{
    PaginatorTrait, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use std::collections::{BTreeSet, HashMap};

/// Orders shown per page of a customer's order history.
pub const ORDERS_PER_PAGE: u64 = 10;

/// One line of a placed order, with the names shown on the confirmation page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLine {
    pub product_id: i64,
    pub product_name: String,
    pub artisan_id: i64,
    pub artisan_name: String,
    pub quantity: i32,
    /// Price paid per unit
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

/// A placed order and its itemized lines.
///
/// Returned by [`checkout`] for the confirmation page, and by
/// [`get_customer_order`] for the order detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order: order::Model,
    pub lines: Vec<ReceiptLine>,
    pub subtotal_cents: i64,
}

/// The lines of one receipt sold by one artisan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtisanGroup<'a> {
    pub artisan_id: i64,
    pub artisan_name: &'a str,
    pub lines: Vec<&'a ReceiptLine>,
    pub subtotal_cents: i64,
}

impl OrderReceipt {
    #[must_use]
    pub const fn shipping_cents(&self) -> i64 {
        self.order.shipping_cents
    }

    #[must_use]
    pub const fn total_cents(&self) -> i64 {
        self.order.total_amount_cents
    }

    /// Groups lines by artisan, in order of first appearance.
    #[must_use]
    pub fn by_artisan(&self) -> Vec<ArtisanGroup<'_>> {
        let mut groups: Vec<ArtisanGroup<'_>> = Vec::new();
        for line in &self.lines {
            match groups.iter_mut().find(|g| g.artisan_id == line.artisan_id) {
                Some(group) => {
                    group.lines.push(line);
                    group.subtotal_cents += line.subtotal_cents;
                }
                None => groups.push(ArtisanGroup {
                    artisan_id: line.artisan_id,
                    artisan_name: &line.artisan_name,
                    lines: vec![line],
                    subtotal_cents: line.subtotal_cents,
                }),
            }
        }
        groups
    }
}

/// A row of the customer's order history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub order: order::Model,
    /// Total units across all lines
    pub item_count: i64,
    pub product_names: Vec<String>,
}

/// One page of results. `page` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub total_pages: u64,
}

/// Filters for an artisan's order list. Both dates are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtisanOrderFilter {
    pub status: Option<OrderStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// One of the artisan's products within a customer's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtisanOrderLine {
    pub order_id: i64,
    pub order_date: DateTimeUtc,
    pub status: OrderStatus,
    pub customer_name: String,
    pub shipping_address: String,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub subtotal_cents: i64,
}

/// Checks every cart line against live product data and collects the line subtotals.
fn validate_cart_lines(lines: &[CartLine]) -> Result<Vec<i64>> {
    if lines.is_empty() {
        return Err(Error::invalid_input("Your cart is empty"));
    }

    if let Some(line) = lines.iter().find(|line| !line.is_available()) {
        return Err(Error::Unavailable {
            product: line.product.name.clone(),
        });
    }

    let shortages: Vec<StockShortage> = lines
        .iter()
        .filter(|line| line.quantity > line.product.stock)
        .map(|line| StockShortage {
            product_id: line.product.id,
            product_name: line.product.name.clone(),
            requested: line.quantity,
            available: line.product.stock,
        })
        .collect();
    if !shortages.is_empty() {
        return Err(Error::InsufficientStock { shortages });
    }

    lines.iter().map(CartLine::subtotal_cents).collect()
}

/// Removes `quantity` units from stock, only if that many are still there.
pub(crate) async fn take_stock<C>(conn: &C, product_id: i64, quantity: i32) -> Result<()>
where
    C: ConnectionTrait,
{
    let updated = Product::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).sub(quantity),
        )
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::Stock.gte(quantity))
        .exec(conn)
        .await?
        .rows_affected;

    if updated == 1 {
        return Ok(());
    }

    let product = Product::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?;
    Err(Error::InsufficientStock {
        shortages: vec![StockShortage {
            product_id,
            product_name: product.name,
            requested: quantity,
            available: product.stock,
        }],
    })
}

/// Adds every line of an order back to its product's stock. Returns the units restored.
pub(crate) async fn restore_stock<C>(conn: &C, order_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let details = OrderDetail::find()
        .filter(order_detail::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;

    let mut restored = 0;
    for detail in details {
        let updated = Product::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).add(detail.quantity),
            )
            .filter(product::Column::Id.eq(detail.product_id))
            .filter(product::Column::Stock.lte(i32::MAX - detail.quantity))
            .exec(conn)
            .await?
            .rows_affected;
        if updated != 1 {
            return Err(Error::invalid_input(format!(
                "Cannot restock product {}: stock would exceed the limit",
                detail.product_id
            )));
        }
        restored += i64::from(detail.quantity);
    }
    Ok(restored)
}

/// Builds the receipt of a stored order.
async fn load_receipt<C>(conn: &C, order: order::Model) -> Result<OrderReceipt>
where
    C: ConnectionTrait,
{
    let rows = OrderDetail::find()
        .find_also_related(Product)
        .filter(order_detail::Column::OrderId.eq(order.id))
        .order_by_asc(order_detail::Column::Id)
        .all(conn)
        .await?;

    let artisan_ids: BTreeSet<i64> = rows
        .iter()
        .filter_map(|(_, product)| product.as_ref().map(|p| p.artisan_id))
        .collect();
    let artisan_names: HashMap<i64, String> = Artisan::find()
        .filter(artisan::Column::Id.is_in(artisan_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();

    let lines = rows
        .into_iter()
        .map(|(detail, product)| {
            let product =
                product.ok_or_else(|| Error::not_found("Product", detail.product_id))?;
            Ok(ReceiptLine {
                product_id: product.id,
                artisan_id: product.artisan_id,
                artisan_name: artisan_names
                    .get(&product.artisan_id)
                    .cloned()
                    .unwrap_or_default(),
                product_name: product.name,
                quantity: detail.quantity,
                unit_price_cents: detail.unit_price_cents,
                subtotal_cents: detail.subtotal_cents,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let subtotal_cents = pricing::checked_sum(lines.iter().map(|line| line.subtotal_cents))?;
    Ok(OrderReceipt {
        order,
        lines,
        subtotal_cents,
    })
}

/// Converts the caller's cart into a Pending order.
///
/// Cart lines are re-read and re-validated inside the transaction; earlier
/// add-to-cart checks are not trusted. Line prices are snapshotted onto the order.
///
/// # Errors
/// Returns an error if:
/// - The shipping address is blank or the cart is empty (`InvalidInput`)
/// - The caller is not a customer
/// - A product was deleted or switched off, or its artisan is inactive (`Unavailable`)
/// - Any line asks for more than is in stock (`InsufficientStock`, naming every such product)
/// - The order total does not fit in an `i64` (`InvalidInput`)
///
/// Nothing is written when any of these occur.
pub async fn checkout(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    shipping_address: &str,
    shipping: &ShippingPolicy,
) -> Result<OrderReceipt> {
    let shipping_address = shipping_address.trim();
    if shipping_address.is_empty() {
        return Err(Error::invalid_input("Shipping address is required"));
    }
    let customer = ctx.require_customer(db).await?;

    let txn = db.begin().await?;

    let lines = cart::load_cart_lines(&txn, customer.id).await?;
    let subtotals = validate_cart_lines(&lines).inspect_err(|e| {
        tracing::warn!(customer_id = customer.id, "Checkout rejected: {e}");
    })?;
    let quote = shipping.quote(subtotals.iter().copied())?;

    let order = order::ActiveModel {
        customer_id: Set(customer.id),
        order_date: Set(chrono::Utc::now()),
        status: Set(OrderStatus::Pending),
        total_amount_cents: Set(quote.total_cents),
        shipping_cents: Set(quote.shipping_cents),
        shipping_address: Set(shipping_address.to_string()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for (line, subtotal_cents) in lines.iter().zip(subtotals) {
        order_detail::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(line.product.id),
            quantity: Set(line.quantity),
            unit_price_cents: Set(line.product.price_cents),
            subtotal_cents: Set(subtotal_cents),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        take_stock(&txn, line.product.id, line.quantity).await?;
    }

    CartItem::delete_many()
        .filter(cart_item::Column::CustomerId.eq(customer.id))
        .exec(&txn)
        .await?;

    let receipt = load_receipt(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = receipt.order.id,
        customer_id = customer.id,
        lines = receipt.lines.len(),
        total_cents = receipt.total_cents(),
        "Order placed"
    );
    Ok(receipt)
}

/// Cancels one of the caller's orders and returns its stock.
///
/// # Errors
/// `NotFound` if the order does not belong to the caller, `InvalidTransition`
/// unless the order is still Pending.
pub async fn cancel_order(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    order_id: i64,
) -> Result<order::Model> {
    let customer = ctx.require_customer(db).await?;

    let txn = db.begin().await?;

    let order = Order::find_by_id(order_id)
        .filter(order::Column::CustomerId.eq(customer.id))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))?;

    let invalid = Error::InvalidTransition {
        from: order.status,
        to: OrderStatus::Cancelled,
    };
    if !order.status.customer_can_cancel() {
        tracing::warn!(order_id, status = %order.status, "Customer cancellation refused");
        return Err(invalid);
    }

    // Qualified by status so two concurrent cancels restock only once
    let updated = Order::update_many()
        .col_expr(order::Column::Status, Expr::val(OrderStatus::Cancelled).into())
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::CustomerId.eq(customer.id))
        .filter(order::Column::Status.eq(OrderStatus::Pending))
        .exec(&txn)
        .await?
        .rows_affected;
    if updated == 0 {
        return Err(invalid);
    }

    let restored = restore_stock(&txn, order_id).await?;
    txn.commit().await?;

    tracing::info!(order_id, restored, "Order cancelled by customer");
    Ok(order::Model {
        status: OrderStatus::Cancelled,
        ..order
    })
}

/// Returns true if the artisan sells at least one line of the order.
async fn artisan_has_line_in<C>(conn: &C, artisan_id: i64, order_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let lines = OrderDetail::find()
        .inner_join(Product)
        .filter(order_detail::Column::OrderId.eq(order_id))
        .filter(product::Column::ArtisanId.eq(artisan_id))
        .count(conn)
        .await?;
    Ok(lines > 0)
}

/// Loads an order the artisan has a line in.
async fn find_artisan_order<C>(conn: &C, artisan_id: i64, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let order = Order::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))?;

    if !artisan_has_line_in(conn, artisan_id, order_id).await? {
        tracing::warn!(artisan_id, order_id, "Artisan tried to manage a foreign order");
        return Err(Error::unauthorized(
            "You can only manage orders that contain your products",
        ));
    }
    Ok(order)
}

/// Sets the status of `order` to `to` if it is still `order.status`.
async fn compare_and_set_status<C>(conn: &C, order: &order::Model, to: OrderStatus) -> Result<()>
where
    C: ConnectionTrait,
{
    let updated = Order::update_many()
        .col_expr(order::Column::Status, Expr::val(to).into())
        .filter(order::Column::Id.eq(order.id))
        .filter(order::Column::Status.eq(order.status))
        .exec(conn)
        .await?
        .rows_affected;

    if updated == 0 {
        return Err(Error::InvalidTransition {
            from: order.status,
            to,
        });
    }
    Ok(())
}

/// Moves a Pending order that contains the caller's products to Processing.
pub async fn confirm_order(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    order_id: i64,
) -> Result<order::Model> {
    let artisan = ctx.require_artisan(db).await?;

    let txn = db.begin().await?;
    let order = find_artisan_order(&txn, artisan.id, order_id).await?;

    if order.status != OrderStatus::Pending {
        return Err(Error::InvalidTransition {
            from: order.status,
            to: OrderStatus::Processing,
        });
    }
    compare_and_set_status(&txn, &order, OrderStatus::Processing).await?;
    txn.commit().await?;

    tracing::info!(order_id, artisan_id = artisan.id, "Order confirmed");
    Ok(order::Model {
        status: OrderStatus::Processing,
        ..order
    })
}

/// Changes the status of an order that contains the caller's products.
///
/// Delivered and Cancelled orders are final. With `strict` unset any other move is
/// accepted, including skipping steps; with `strict` set only the next step on the
/// happy path or Cancelled is. Moving to Cancelled returns the order's stock.
///
/// # Errors
/// `NotFound` for an unknown order, `Unauthorized` if none of its lines are the
/// caller's, `InvalidTransition` for a refused move.
pub async fn update_order_status(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    order_id: i64,
    new_status: OrderStatus,
    strict: bool,
) -> Result<order::Model> {
    let artisan = ctx.require_artisan(db).await?;

    let txn = db.begin().await?;
    let order = find_artisan_order(&txn, artisan.id, order_id).await?;

    if !order.status.artisan_can_move_to(new_status, strict) {
        tracing::warn!(order_id, from = %order.status, to = %new_status, strict, "Status change refused");
        return Err(Error::InvalidTransition {
            from: order.status,
            to: new_status,
        });
    }

    compare_and_set_status(&txn, &order, new_status).await?;
    if new_status == OrderStatus::Cancelled {
        restore_stock(&txn, order_id).await?;
    }
    txn.commit().await?;

    tracing::info!(order_id, from = %order.status, to = %new_status, "Order status updated");
    Ok(order::Model {
        status: new_status,
        ..order
    })
}

/// Returns true while any Pending or Processing order contains the product.
pub async fn has_active_orders<C>(conn: &C, product_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let open: Vec<OrderStatus> = OrderStatus::ALL
        .into_iter()
        .filter(|status| status.is_open())
        .collect();

    let lines = OrderDetail::find()
        .inner_join(Order)
        .filter(order_detail::Column::ProductId.eq(product_id))
        .filter(order::Column::Status.is_in(open))
        .count(conn)
        .await?;
    Ok(lines > 0)
}

/// Whether the product may be deleted by its artisan right now.
pub async fn can_delete_product(db: &DatabaseConnection, product_id: i64) -> Result<bool> {
    Ok(!has_active_orders(db, product_id).await?)
}

/// The caller's orders, newest first, [`ORDERS_PER_PAGE`] at a time.
pub async fn list_customer_orders(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    page: u64,
) -> Result<Page<OrderSummary>> {
    let customer = ctx.require_customer(db).await?;

    let paginator = Order::find()
        .filter(order::Column::CustomerId.eq(customer.id))
        .order_by_desc(order::Column::OrderDate)
        .order_by_desc(order::Column::Id)
        .paginate(db, ORDERS_PER_PAGE);
    let total_pages = paginator.num_pages().await?;
    let orders = paginator.fetch_page(page).await?;

    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let rows = OrderDetail::find()
        .find_also_related(Product)
        .filter(order_detail::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_detail::Column::Id)
        .all(db)
        .await?;

    let mut by_order: HashMap<i64, (i64, Vec<String>)> = HashMap::new();
    for (detail, product) in rows {
        let entry = by_order.entry(detail.order_id).or_default();
        entry.0 += i64::from(detail.quantity);
        if let Some(product) = product {
            entry.1.push(product.name);
        }
    }

    let items = orders
        .into_iter()
        .map(|order| {
            let (item_count, product_names) = by_order.remove(&order.id).unwrap_or_default();
            OrderSummary {
                order,
                item_count,
                product_names,
            }
        })
        .collect();

    Ok(Page {
        items,
        page,
        total_pages,
    })
}

/// One of the caller's orders with its lines.
pub async fn get_customer_order(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    order_id: i64,
) -> Result<OrderReceipt> {
    let customer = ctx.require_customer(db).await?;
    let order = Order::find_by_id(order_id)
        .filter(order::Column::CustomerId.eq(customer.id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))?;
    load_receipt(db, order).await
}

fn start_of_day(date: NaiveDate) -> DateTimeUtc {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// The caller's products in customer orders, newest order first.
pub async fn list_artisan_orders(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    filter: &ArtisanOrderFilter,
) -> Result<Vec<ArtisanOrderLine>> {
    let artisan = ctx.require_artisan(db).await?;

    let mut orders = Order::find()
        .inner_join(OrderDetail)
        .join(
            sea_orm::JoinType::InnerJoin,
            order_detail::Relation::Product.def(),
        )
        .filter(product::Column::ArtisanId.eq(artisan.id))
        .distinct();
    if let Some(status) = filter.status {
        orders = orders.filter(order::Column::Status.eq(status));
    }
    if let Some(from) = filter.date_from {
        orders = orders.filter(order::Column::OrderDate.gte(start_of_day(from)));
    }
    if let Some(to) = filter.date_to {
        let end = to
            .succ_opt()
            .ok_or_else(|| Error::invalid_input("End date is out of range"))?;
        orders = orders.filter(order::Column::OrderDate.lt(start_of_day(end)));
    }
    let orders = orders
        .order_by_desc(order::Column::OrderDate)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;

    let customer_ids: BTreeSet<i64> = orders.iter().map(|o| o.customer_id).collect();
    let customer_names: HashMap<i64, String> = Customer::find()
        .filter(customer::Column::Id.is_in(customer_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let details = OrderDetail::find()
        .find_also_related(Product)
        .filter(order_detail::Column::OrderId.is_in(order_ids))
        .filter(product::Column::ArtisanId.eq(artisan.id))
        .order_by_asc(order_detail::Column::Id)
        .all(db)
        .await?;
    let mut lines_by_order: HashMap<i64, Vec<(order_detail::Model, product::Model)>> =
        HashMap::new();
    for (detail, product) in details {
        if let Some(product) = product {
            lines_by_order
                .entry(detail.order_id)
                .or_default()
                .push((detail, product));
        }
    }

    let mut lines = Vec::new();
    for order in orders {
        let customer_name = customer_names
            .get(&order.customer_id)
            .cloned()
            .unwrap_or_default();
        for (detail, product) in lines_by_order.remove(&order.id).unwrap_or_default() {
            lines.push(ArtisanOrderLine {
                order_id: order.id,
                order_date: order.order_date,
                status: order.status,
                customer_name: customer_name.clone(),
                shipping_address: order.shipping_address.clone(),
                product_id: product.id,
                product_name: product.name,
                quantity: detail.quantity,
                subtotal_cents: detail.subtotal_cents,
            });
        }
    }
    Ok(lines)
}

/// Pending orders waiting for the caller's confirmation, oldest first.
pub async fn pending_orders_for_artisan(
    db: &DatabaseConnection,
    ctx: &RequestContext,
) -> Result<Vec<ArtisanOrderLine>> {
    let filter = ArtisanOrderFilter {
        status: Some(OrderStatus::Pending),
        ..Default::default()
    };
    let mut lines = list_artisan_orders(db, ctx, &filter).await?;
    lines.reverse();
    Ok(lines)
}

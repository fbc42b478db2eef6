//! Dashboard statistics for artisans and customers.
//!
//! All amounts are minor units; use [`format_amount`] to render them.

use crate::{
    core::{
        context::RequestContext,
        order::{self as orders, ArtisanOrderFilter},
        pricing::checked_sum,
    },
    entities::{ListingStatus, Order, OrderStatus, Product, order, product},
    errors::Result,
};
use sea_orm::{PaginatorTrait, QueryOrder, QuerySelect, prelude::*};
use std::collections::BTreeSet;

pub use crate::core::pricing::format_amount;

/// Number of orders shown on the customer dashboard.
pub const RECENT_ORDERS: u64 = 5;

/// Figures on the artisan dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtisanDashboard {
    /// Listed products, active or not
    pub total_products: u64,
    pub active_products: u64,
    /// Units in stock across all listed products
    pub total_stock: i64,
    /// Mean listed price, rounded down
    pub average_price_cents: i64,
    /// Sum of the artisan's order lines, excluding cancelled orders
    pub total_revenue_cents: i64,
    pub pending_orders: u64,
    pub delivered_orders: u64,
}

/// Figures on the customer dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDashboard {
    pub order_count: u64,
    /// Sum of order totals, excluding cancelled orders
    pub total_spent_cents: i64,
    /// Newest first
    pub recent_orders: Vec<order::Model>,
}

/// Builds the dashboard of the calling artisan.
pub async fn artisan_dashboard(
    db: &DatabaseConnection,
    ctx: &RequestContext,
) -> Result<ArtisanDashboard> {
    let artisan = ctx.require_artisan(db).await?;

    let products = Product::find()
        .filter(product::Column::ArtisanId.eq(artisan.id))
        .filter(product::Column::IsDeleted.eq(false))
        .all(db)
        .await?;

    let total_products = u64::try_from(products.len())?;
    let active_products = u64::try_from(
        products
            .iter()
            .filter(|p| p.status == ListingStatus::Active)
            .count(),
    )?;
    let total_stock: i64 = products.iter().map(|p| i64::from(p.stock)).sum();
    let price_sum = checked_sum(products.iter().map(|p| p.price_cents))?;
    let average_price_cents = if products.is_empty() {
        0
    } else {
        price_sum / i64::try_from(products.len())?
    };

    let lines = orders::list_artisan_orders(db, ctx, &ArtisanOrderFilter::default()).await?;
    let total_revenue_cents = checked_sum(
        lines
            .iter()
            .filter(|line| line.status != OrderStatus::Cancelled)
            .map(|line| line.subtotal_cents),
    )?;
    let count_orders = |status: OrderStatus| -> Result<u64> {
        let ids: BTreeSet<i64> = lines
            .iter()
            .filter(|line| line.status == status)
            .map(|line| line.order_id)
            .collect();
        Ok(u64::try_from(ids.len())?)
    };

    Ok(ArtisanDashboard {
        total_products,
        active_products,
        total_stock,
        average_price_cents,
        total_revenue_cents,
        pending_orders: count_orders(OrderStatus::Pending)?,
        delivered_orders: count_orders(OrderStatus::Delivered)?,
    })
}

/// Builds the dashboard of the calling customer.
pub async fn customer_dashboard(
    db: &DatabaseConnection,
    ctx: &RequestContext,
) -> Result<CustomerDashboard> {
    let customer = ctx.require_customer(db).await?;
    let placed = Order::find().filter(order::Column::CustomerId.eq(customer.id));

    let order_count = placed.clone().count(db).await?;
    let spent = placed
        .clone()
        .filter(order::Column::Status.ne(OrderStatus::Cancelled))
        .all(db)
        .await?;
    let total_spent_cents = checked_sum(spent.iter().map(|o| o.total_amount_cents))?;
    let recent_orders = placed
        .order_by_desc(order::Column::OrderDate)
        .order_by_desc(order::Column::Id)
        .limit(RECENT_ORDERS)
        .all(db)
        .await?;

    Ok(CustomerDashboard {
        order_count,
        total_spent_cents,
        recent_orders,
    })
}

//! Order repository.
//!
//! Orders are read with a join on `users` so every order carries a contact
//! email. Addresses are `JSONB` and pass through `Address::from_json`, which
//! accepts both objects and legacy JSON-encoded strings.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use pawfect_core::orders::{LineItem, OrderTotals};
use pawfect_core::{Address, Email, OrderId, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::{NewOrder, Order};

const ORDER_SELECT: &str = r"
    SELECT o.id, o.order_number, o.user_id, o.guest_email,
           COALESCE(u.email, o.guest_email) AS email,
           o.subtotal, o.tax, o.shipping_cost, o.total, o.status,
           o.shipping_address, o.billing_address, o.payment_session_id,
           o.created_at, o.updated_at
    FROM orders o
    LEFT JOIN users u ON u.id = o.user_id
";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    user_id: Option<UserId>,
    guest_email: Option<String>,
    email: Option<String>,
    subtotal: Decimal,
    tax: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
    status: OrderStatus,
    shipping_address: Json<serde_json::Value>,
    billing_address: Option<Json<serde_json::Value>>,
    payment_session_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    order_id: OrderId,
    product_id: ProductId,
    name: String,
    price: Decimal,
    quantity: i32,
}

fn parse_email(order: OrderId, raw: &str) -> Result<Email, RepositoryError> {
    Email::parse(raw).map_err(|e| {
        RepositoryError::DataCorruption(format!("order {order} has an invalid email: {e}"))
    })
}

fn parse_address(order: OrderId, raw: serde_json::Value) -> Result<Address, RepositoryError> {
    Address::from_json(raw).map_err(|e| {
        RepositoryError::DataCorruption(format!("order {order} has an unreadable address: {e}"))
    })
}

impl OrderRow {
    fn into_order(self, items: Vec<LineItem>) -> Result<Order, RepositoryError> {
        let id = self.id;
        let email = self
            .email
            .as_deref()
            .ok_or_else(|| RepositoryError::DataCorruption(format!("order {id} has no email")))
            .and_then(|raw| parse_email(id, raw))?;

        Ok(Order {
            id,
            order_number: self.order_number,
            user_id: self.user_id,
            guest_email: self
                .guest_email
                .as_deref()
                .map(|raw| parse_email(id, raw))
                .transpose()?,
            email,
            items,
            totals: OrderTotals {
                subtotal: self.subtotal,
                tax: self.tax,
                shipping_cost: self.shipping_cost,
                total: self.total,
            },
            status: self.status,
            shipping_address: parse_address(id, self.shipping_address.0)?,
            billing_address: self
                .billing_address
                .map(|json| parse_address(id, json.0))
                .transpose()?,
            payment_session_id: self.payment_session_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for orders and their line items.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and its line items, taking the ordered units out of
    /// stock, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number is taken, a
    /// product no longer exists, or a product doesn't have enough stock left.
    /// Nothing is written in that case.
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: OrderId = sqlx::query_scalar(
            r"
            INSERT INTO orders (order_number, user_id, guest_email, subtotal, tax,
                                shipping_cost, total, shipping_address, billing_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            ",
        )
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(order.guest_email.as_ref())
        .bind(order.totals.subtotal)
        .bind(order.totals.tax)
        .bind(order.totals.shipping_cost)
        .bind(order.totals.total)
        .bind(Json(&order.shipping_address))
        .bind(order.billing_address.as_ref().map(Json))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "order number already exists"))?;

        reserve_stock(&mut tx, &order.items).await?;
        insert_items(&mut tx, id, &order.items).await?;
        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// All orders, newest first, optionally narrowed to one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{ORDER_SELECT} WHERE ($1::order_status IS NULL OR o.status = $1) \
             ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{ORDER_SELECT} WHERE o.user_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// The most recent orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{ORDER_SELECT} ORDER BY o.created_at DESC, o.id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// `(status, total)` for every order, for revenue and status breakdowns.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_totals(&self) -> Result<Vec<(OrderStatus, Decimal)>, RepositoryError> {
        let rows: Vec<(OrderStatus, Decimal)> = sqlx::query_as("SELECT status, total FROM orders")
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Set an order's status. Any status may be set from any other.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let result =
            sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Remember the payment provider's checkout session for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_payment_session(
        &self,
        id: OrderId,
        session_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET payment_session_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(session_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Load line items for `rows` with one query and assemble orders,
    /// preserving row order.
    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|row| row.id.as_i64()).collect();
        let item_rows: Vec<ItemRow> = sqlx::query_as(
            r"
            SELECT order_id, product_id, name, price, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        let mut items: HashMap<OrderId, Vec<LineItem>> = HashMap::new();
        for item in item_rows {
            items.entry(item.order_id).or_default().push(LineItem {
                product_id: item.product_id,
                name: item.name,
                price: item.price,
                quantity: item.quantity,
            });
        }

        rows.into_iter()
            .map(|row| {
                let line_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(line_items)
            })
            .collect()
    }
}

/// Decrement stock for each line. A product that sells its last unit is
/// flagged out of stock.
async fn reserve_stock(
    tx: &mut Transaction<'_, Postgres>,
    items: &[LineItem],
) -> Result<(), RepositoryError> {
    for item in items {
        let result = sqlx::query(
            r"
            UPDATE products
            SET stock = stock - $2,
                in_stock = stock - $2 > 0,
                updated_at = NOW()
            WHERE id = $1 AND in_stock AND stock >= $2
            ",
        )
        .bind(item.product_id)
        .bind(item.quantity)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "{} doesn't have enough stock left",
                item.name
            )));
        }
    }
    Ok(())
}

async fn insert_items(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
    items: &[LineItem],
) -> Result<(), RepositoryError> {
    let product_ids: Vec<i64> = items.iter().map(|i| i.product_id.as_i64()).collect();
    let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
    let prices: Vec<Decimal> = items.iter().map(|i| i.price).collect();
    let quantities: Vec<i32> = items.iter().map(|i| i.quantity).collect();

    sqlx::query(
        r"
        INSERT INTO order_items (order_id, product_id, name, price, quantity)
        SELECT $1, * FROM UNNEST($2::bigint[], $3::text[], $4::numeric[], $5::int[])
        ",
    )
    .bind(order_id)
    .bind(product_ids)
    .bind(names)
    .bind(prices)
    .bind(quantities)
    .execute(&mut **tx)
    .await
    .map_err(|e| RepositoryError::from_constraint(e, "product no longer exists"))?;

    Ok(())
}

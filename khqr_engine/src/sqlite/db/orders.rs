use chrono::Utc;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, NewOrderItem, Order, OrderItem},
    traits::{AdoptionCandidateQuery, OrderManagementError},
};

fn map_reference_violation(e: sqlx::Error, reference: Option<&str>) -> OrderManagementError {
    match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            OrderManagementError::DuplicatePaymentReference(reference.unwrap_or_default().to_string())
        },
        _ => OrderManagementError::from(e),
    }
}

/// Inserts a new order (without its line items) using the given connection. This is not atomic. You can embed this
/// call inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderManagementError> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                customer_id,
                total_price,
                currency,
                payment_method,
                payment_reference,
                is_paid,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, 0, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(order.customer_id)
    .bind(order.total_price)
    .bind(order.currency)
    .bind(&order.payment_method)
    .bind(&order.payment_reference)
    .bind(order.created_at)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
    .map_err(|e| map_reference_violation(e, order.payment_reference.as_deref()))?;
    debug!("📝️ Order #{} inserted for customer #{}", order.id, order.customer_id);
    Ok(order)
}

pub async fn insert_order_items(
    order_id: i64,
    items: &[NewOrderItem],
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    let mut result = Vec::with_capacity(items.len());
    for item in items {
        let item: OrderItem = sqlx::query_as(
            r#"
                INSERT INTO order_items (order_id, description, quantity, unit_price) VALUES ($1, $2, $3, $4)
                RETURNING *;
            "#,
        )
        .bind(order_id)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price)
        .fetch_one(&mut *conn)
        .await?;
        result.push(item);
    }
    trace!("📝️ {} line items added to order #{order_id}", result.len());
    Ok(result)
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_order_by_payment_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE payment_reference = $1").bind(reference).fetch_optional(conn).await
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}

/// Unpaid, unreferenced orders matching the query, oldest first.
pub async fn fetch_adoption_candidates(
    query: &AdoptionCandidateQuery,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE is_paid = 0
              AND payment_reference IS NULL
              AND total_price = $1
              AND currency = $2
              AND payment_method = $3
              AND created_at >= $4
              AND created_at <= $5
            ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(query.amount)
    .bind(query.currency)
    .bind(&query.payment_method)
    .bind(query.created_after)
    .bind(query.created_before)
    .fetch_all(conn)
    .await
}

/// Attaches `reference` to the order and marks it paid, only if it is still unpaid and unreferenced.
///
/// Returns `None` when the condition fails (another writer adopted or paid the order first).
pub async fn adopt_order(
    order_id: i64,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderManagementError> {
    sqlx::query_as(
        r#"
            UPDATE orders
            SET payment_reference = $2, is_paid = 1, updated_at = $3
            WHERE id = $1 AND payment_reference IS NULL AND is_paid = 0
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(reference)
    .bind(Utc::now())
    .fetch_optional(conn)
    .await
    .map_err(|e| map_reference_violation(e, Some(reference)))
}

pub async fn mark_order_paid(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("UPDATE orders SET is_paid = 1, updated_at = $2 WHERE id = $1 RETURNING *;")
        .bind(order_id)
        .bind(Utc::now())
        .fetch_optional(conn)
        .await
}

use chrono::Utc;
use kpg_common::Amount;
use sqlx::SqliteConnection;

use crate::db_types::Invoice;

/// Inserts an invoice for `order_id`, taking the currency from the order. Returns `None` if the order does not exist.
pub async fn insert_invoice(
    order_id: i64,
    amount: Amount,
    paid: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Invoice>, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as(
        r#"
            INSERT INTO invoices (order_id, amount, currency, is_paid, created_at, updated_at)
            SELECT id, $2, currency, $3, $4, $5 FROM orders WHERE id = $1
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(amount)
    .bind(paid)
    .bind(now)
    .bind(now)
    .fetch_optional(conn)
    .await
}

pub async fn mark_invoices_paid(order_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE invoices SET is_paid = 1, updated_at = $2 WHERE order_id = $1 AND is_paid = 0")
        .bind(order_id)
        .bind(Utc::now())
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_invoices_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Invoice>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM invoices WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}

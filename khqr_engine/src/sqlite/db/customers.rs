use chrono::{DateTime, Utc};
use kpg_common::{Amount, Currency};
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::Customer;

const GUEST_NAME: &str = "Guest";

pub async fn fetch_customer_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Customer>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM customers WHERE user_id = $1").bind(user_id).fetch_optional(conn).await
}

/// Returns the customer record for `user_id`, creating it if it does not exist yet. Safe to call concurrently.
pub async fn fetch_or_create_customer_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Customer, sqlx::Error> {
    let result = sqlx::query(
        r#"
            INSERT INTO customers (user_id, name, is_guest, created_at) VALUES ($1, $2, 0, $3)
            ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(format!("User {user_id}"))
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 1 {
        debug!("🗃️ Created customer record for user #{user_id}");
    }
    fetch_customer_for_user(user_id, conn).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Returns the single guest customer, creating it on first use.
pub async fn fetch_guest_customer(conn: &mut SqliteConnection) -> Result<Customer, sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO customers (user_id, name, is_guest, created_at) VALUES (NULL, $1, 1, $2)")
        .bind(GUEST_NAME)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    sqlx::query_as("SELECT * FROM customers WHERE is_guest = 1 LIMIT 1").fetch_one(conn).await
}

/// The customer that placed the most recent order for `amount` in `currency` since `since`.
pub async fn fetch_recent_customer(
    amount: Amount,
    currency: Currency,
    since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Customer>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT customers.* FROM customers
            JOIN orders ON orders.customer_id = customers.id
            WHERE orders.total_price = $1 AND orders.currency = $2 AND orders.created_at >= $3
            ORDER BY orders.created_at DESC, orders.id DESC
            LIMIT 1
        "#,
    )
    .bind(amount)
    .bind(currency)
    .bind(since)
    .fetch_optional(conn)
    .await
}

use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPaymentRequest, PaymentRequest},
    traits::PaymentStoreError,
};

/// Inserts a new payment request. The status is always `Pending`.
///
/// Unique violations are mapped onto the column that caused them, so callers can tell a repeated bill reference apart
/// from a repeated payload.
pub async fn insert_payment_request(
    request: NewPaymentRequest,
    conn: &mut SqliteConnection,
) -> Result<PaymentRequest, PaymentStoreError> {
    let now = Utc::now();
    let result: PaymentRequest = sqlx::query_as(
        r#"
            INSERT INTO payment_requests (
                correlation_hash,
                bill_reference,
                payload,
                rendered_code_ref,
                amount,
                currency,
                status,
                requester_user_id,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, 'Pending', $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(&request.correlation_hash)
    .bind(&request.bill_reference)
    .bind(&request.payload)
    .bind(&request.rendered_code_ref)
    .bind(request.amount)
    .bind(request.currency)
    .bind(request.requester_user_id)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            if err.message().contains("bill_reference") {
                PaymentStoreError::DuplicateBillReference(request.bill_reference.clone())
            } else {
                PaymentStoreError::DuplicateCorrelationHash(request.correlation_hash.clone())
            }
        },
        _ => PaymentStoreError::from(e),
    })?;
    debug!("🗃️ Payment request [{}] saved with id {}", result.bill_reference, result.id);
    Ok(result)
}

pub async fn fetch_by_hash(hash: &str, conn: &mut SqliteConnection) -> Result<Option<PaymentRequest>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_requests WHERE correlation_hash = $1").bind(hash).fetch_optional(conn).await
}

pub async fn fetch_by_bill_reference(
    bill_reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRequest>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_requests WHERE bill_reference = $1")
        .bind(bill_reference)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<PaymentRequest>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_requests WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// Conditionally flips a request from `Pending` to `Paid`. Returns `true` only for the caller that made the change.
pub async fn mark_paid(
    id: i64,
    external_txn_id: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE payment_requests
            SET status = 'Paid',
                external_transaction_id = COALESCE($2, external_transaction_id),
                updated_at = $3
            WHERE id = $1 AND status = 'Pending'
        "#,
    )
    .bind(id)
    .bind(external_txn_id)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    let changed = result.rows_affected() == 1;
    trace!("🗃️ mark_paid for payment request #{id}: {changed}");
    Ok(changed)
}

pub async fn set_rendered_code_ref(id: i64, code_ref: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE payment_requests SET rendered_code_ref = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(code_ref)
        .bind(Utc::now())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Conditionally sets `linked_order_id`. Returns `true` only for the caller that made the change.
pub async fn link_order(id: i64, order_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE payment_requests
            SET linked_order_id = $2,
                updated_at = $3
            WHERE id = $1 AND linked_order_id IS NULL
        "#,
    )
    .bind(id)
    .bind(order_id)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    let changed = result.rows_affected() == 1;
    trace!("🗃️ link_order for payment request #{id} -> order #{order_id}: {changed}");
    Ok(changed)
}

/// Deletes pending requests created before `older_than` and returns them.
pub async fn purge_stale(
    older_than: DateTime<Utc>,
    only_unlinked: bool,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentRequest>, sqlx::Error> {
    let q = if only_unlinked {
        r#"
            DELETE FROM payment_requests
            WHERE status = 'Pending' AND created_at < $1 AND linked_order_id IS NULL
            RETURNING *;
        "#
    } else {
        r#"
            DELETE FROM payment_requests
            WHERE status = 'Pending' AND created_at < $1
            RETURNING *;
        "#
    };
    let purged: Vec<PaymentRequest> = sqlx::query_as(q).bind(older_than).fetch_all(conn).await?;
    debug!("🗃️ Purged {} stale payment requests created before {older_than}", purged.len());
    Ok(purged)
}

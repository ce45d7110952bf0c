//! Billing payment records

use sqlx::SqliteExecutor;
use uuid::Uuid;

use clipscore_common::{time, uuid_utils, Result};

/// A payment reported by the billing provider
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub provider: String,
    pub product: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub external_id: Option<String>,
}

/// Record a payment
///
/// Returns false when a payment with the same `external_id` already exists.
pub async fn record_payment<'e, E>(executor: E, payment: &NewPayment) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO billing_payments
            (id, user_id, provider, product, amount, currency, status, external_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(uuid_utils::generate().to_string())
    .bind(payment.user_id.to_string())
    .bind(&payment.provider)
    .bind(&payment.product)
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(&payment.status)
    .bind(&payment.external_id)
    .bind(time::to_db(time::now()))
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Number of payments recorded for a user
pub async fn count_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM billing_payments WHERE user_id = ?")
        .bind(user_id.to_string())
        .fetch_one(executor)
        .await?;

    Ok(count)
}

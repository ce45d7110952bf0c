//! Plan transitions driven by billing provider events

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use clipscore_common::{time, Error, Result};

use crate::db;
use crate::db::payments::NewPayment;
use crate::models::PlanTier;

pub const EVENT_PAYMENT_SUCCEEDED: &str = "payment.succeeded";
pub const EVENT_SUBSCRIPTION_CANCELED: &str = "subscription.canceled";

/// Webhook payload from the billing provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub event: String,
    pub user_id: Uuid,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PlanChange {
    Activated {
        plan_tier: PlanTier,
        plan_renews_at: DateTime<Utc>,
    },
    /// Payment with this external id was already processed
    AlreadyProcessed,
    Canceled,
}

/// Tier and renewal time bought by a product
pub fn product_plan(product: &str, now: DateTime<Utc>) -> Result<(PlanTier, DateTime<Utc>)> {
    let (tier, months) = match product {
        "pro_month" => (PlanTier::Pro, 1),
        "pro_plus_year" => (PlanTier::ProPlus, 12),
        other => return Err(Error::InvalidInput(format!("Unknown product: {}", other))),
    };
    let renews_at = now
        .checked_add_months(Months::new(months))
        .ok_or_else(|| Error::Internal("Renewal date out of range".to_string()))?;
    Ok((tier, renews_at))
}

pub async fn apply_payment_event(pool: &SqlitePool, event: &PaymentEvent) -> Result<PlanChange> {
    db::users::require_user(pool, event.user_id).await?;

    match event.event.as_str() {
        EVENT_PAYMENT_SUCCEEDED => payment_succeeded(pool, event).await,
        EVENT_SUBSCRIPTION_CANCELED => {
            db::users::cancel_plan(pool, event.user_id).await?;
            info!(user_id = %event.user_id, "Subscription canceled");
            Ok(PlanChange::Canceled)
        }
        other => Err(Error::InvalidInput(format!("Unknown payment event: {}", other))),
    }
}

async fn payment_succeeded(pool: &SqlitePool, event: &PaymentEvent) -> Result<PlanChange> {
    let product = event
        .product
        .as_deref()
        .ok_or_else(|| Error::InvalidInput("payment.succeeded requires product".to_string()))?;
    let now = time::now();
    let (tier, renews_at) = product_plan(product, now)?;

    let payment = NewPayment {
        user_id: event.user_id,
        provider: event.provider.clone().unwrap_or_else(|| "unknown".to_string()),
        product: product.to_string(),
        amount: event.amount.unwrap_or(0),
        currency: event.currency.clone().unwrap_or_else(|| "USD".to_string()),
        status: "succeeded".to_string(),
        external_id: event.external_id.clone(),
    };

    let mut tx = pool.begin().await?;
    if !db::payments::record_payment(&mut *tx, &payment).await? {
        tx.rollback().await?;
        info!(user_id = %event.user_id, external_id = ?event.external_id, "Duplicate payment event ignored");
        return Ok(PlanChange::AlreadyProcessed);
    }
    db::users::activate_plan(&mut *tx, event.user_id, tier, renews_at, now).await?;
    tx.commit().await?;

    info!(user_id = %event.user_id, plan_tier = tier.as_str(), "Plan activated");
    Ok(PlanChange::Activated {
        plan_tier: tier,
        plan_renews_at: renews_at,
    })
}

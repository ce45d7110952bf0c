//! Quota reset sweep and plan transition tests

mod helpers;

use chrono::Duration;

use clipscore_common::{time, Error};
use clipscore_ev::db;
use clipscore_ev::models::{PlanStatus, PlanTier};
use clipscore_ev::services::plans::apply_payment_event;
use clipscore_ev::services::{run_sweep, PaymentEvent, PlanChange, SweepReport};

use helpers::*;

async fn set_counters(pool: &sqlx::SqlitePool, user: uuid::Uuid, daily: i64, weekly: i64) {
    sqlx::query("UPDATE users SET daily_quota_used = ?, weekly_quota_used = ? WHERE id = ?")
        .bind(daily)
        .bind(weekly)
        .bind(user.to_string())
        .execute(pool)
        .await
        .unwrap();
}

fn payment(user_id: uuid::Uuid, product: &str, external_id: &str) -> PaymentEvent {
    PaymentEvent {
        event: "payment.succeeded".to_string(),
        user_id,
        product: Some(product.to_string()),
        provider: Some("stripe".to_string()),
        amount: Some(1999),
        currency: Some("USD".to_string()),
        external_id: Some(external_id.to_string()),
    }
}

#[tokio::test]
async fn test_sweep_resets_only_due_counters() {
    let tdb = test_db().await;
    let user = create_user(&tdb.pool, "counted").await;
    set_counters(&tdb.pool, user, 4, 9).await;

    // Nothing is due yet
    let report = run_sweep(&tdb.pool, time::now()).await.unwrap();
    assert_eq!(report, SweepReport::default());

    // Round-trip through storage format to drop sub-millisecond precision
    let after_a_day =
        time::from_db(&time::to_db(time::now() + Duration::days(1) + Duration::minutes(1))).unwrap();
    let report = run_sweep(&tdb.pool, after_a_day).await.unwrap();
    assert_eq!(report, SweepReport { daily_resets: 1, weekly_resets: 0 });

    let account = db::users::require_user(&tdb.pool, user).await.unwrap();
    assert_eq!(account.daily_quota_used, 0);
    assert_eq!(account.weekly_quota_used, 9);
    assert_eq!(account.quota_reset_daily_at, Some(after_a_day + Duration::days(1)));
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let tdb = test_db().await;
    let user = create_user(&tdb.pool, "counted").await;
    set_counters(&tdb.pool, user, 3, 3).await;

    let later = time::now() + Duration::days(8);
    let first = run_sweep(&tdb.pool, later).await.unwrap();
    assert_eq!(first, SweepReport { daily_resets: 1, weekly_resets: 1 });

    let second = run_sweep(&tdb.pool, later).await.unwrap();
    assert_eq!(second, SweepReport::default());
}

#[tokio::test]
async fn test_payment_activates_plan_and_resets_counters() {
    let tdb = test_db().await;
    let user = create_user(&tdb.pool, "subscriber").await;
    set_counters(&tdb.pool, user, 10, 12).await;

    let change = apply_payment_event(&tdb.pool, &payment(user, "pro_month", "evt_1"))
        .await
        .unwrap();
    assert!(matches!(change, PlanChange::Activated { plan_tier: PlanTier::Pro, .. }));

    let account = db::users::require_user(&tdb.pool, user).await.unwrap();
    assert_eq!(account.plan_tier, PlanTier::Pro);
    assert_eq!(account.plan_status, PlanStatus::Active);
    assert!(account.ia_upgrade);
    assert!(account.ia_upgrade_at.is_some());
    assert!(account.plan_renews_at.is_some());
    assert_eq!(account.daily_quota_used, 0);
    assert_eq!(account.weekly_quota_used, 0);
    assert_eq!(account.effective_tier(), PlanTier::Pro);
}

#[tokio::test]
async fn test_replayed_payment_is_ignored() {
    let tdb = test_db().await;
    let user = create_user(&tdb.pool, "subscriber").await;

    apply_payment_event(&tdb.pool, &payment(user, "pro_plus_year", "evt_9"))
        .await
        .unwrap();
    set_counters(&tdb.pool, user, 5, 5).await;

    let replay = apply_payment_event(&tdb.pool, &payment(user, "pro_plus_year", "evt_9"))
        .await
        .unwrap();
    assert_eq!(replay, PlanChange::AlreadyProcessed);

    let account = db::users::require_user(&tdb.pool, user).await.unwrap();
    assert_eq!(account.daily_quota_used, 5, "replay must not zero counters again");
    assert_eq!(db::payments::count_for_user(&tdb.pool, user).await.unwrap(), 1);
}

#[tokio::test]
async fn test_cancellation_reverts_to_free() {
    let tdb = test_db().await;
    let user = create_user(&tdb.pool, "leaver").await;
    apply_payment_event(&tdb.pool, &payment(user, "pro_month", "evt_2"))
        .await
        .unwrap();

    let cancel = PaymentEvent {
        event: "subscription.canceled".to_string(),
        user_id: user,
        product: None,
        provider: None,
        amount: None,
        currency: None,
        external_id: None,
    };
    assert_eq!(apply_payment_event(&tdb.pool, &cancel).await.unwrap(), PlanChange::Canceled);

    let account = db::users::require_user(&tdb.pool, user).await.unwrap();
    assert_eq!(account.plan_tier, PlanTier::Free);
    assert_eq!(account.plan_status, PlanStatus::Canceled);
    assert!(!account.ia_upgrade);
}

#[tokio::test]
async fn test_unknown_event_or_product_is_invalid() {
    let tdb = test_db().await;
    let user = create_user(&tdb.pool, "confused").await;

    let mut event = payment(user, "pro_month", "evt_3");
    event.event = "payment.refunded".to_string();
    assert!(matches!(apply_payment_event(&tdb.pool, &event).await, Err(Error::InvalidInput(_))));

    let bad_product = payment(user, "lifetime", "evt_4");
    assert!(matches!(
        apply_payment_event(&tdb.pool, &bad_product).await,
        Err(Error::InvalidInput(_))
    ));
}

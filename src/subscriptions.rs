use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::config;

/// key: subscriptions-model -> one row per user
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subscription {
    pub user_id: i64,
    pub plan: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub auto_pay_method_id: Option<String>,
    pub granted_by_admin: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// What the bot shows the user. Computed from the stored row, never written
/// back on the read path.
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub plan: &'static str,
    pub expires_at: Option<DateTime<Utc>>,
    pub days_left: Option<i64>,
    pub is_grace_period: bool,
    pub auto_pay: bool,
}

impl PlanSummary {
    fn free() -> Self {
        Self {
            plan: "free",
            expires_at: None,
            days_left: None,
            is_grace_period: false,
            auto_pay: false,
        }
    }
}

/// Classifies a stored subscription row: paid and current, paid but inside
/// the grace window, or free. Expired rows read as free without being
/// rewritten here.
pub fn classify(
    subscription: Option<&Subscription>,
    now: DateTime<Utc>,
    grace_days: i64,
) -> PlanSummary {
    let Some(row) = subscription else {
        return PlanSummary::free();
    };
    if row.plan != "pro" {
        return PlanSummary::free();
    }
    let Some(expires_at) = row.expires_at else {
        return PlanSummary::free();
    };

    if expires_at > now {
        return PlanSummary {
            plan: "pro",
            expires_at: Some(expires_at),
            days_left: Some((expires_at - now).num_days()),
            is_grace_period: false,
            auto_pay: row.auto_pay_method_id.is_some(),
        };
    }

    if now < expires_at + Duration::days(grace_days) {
        return PlanSummary {
            plan: "pro",
            expires_at: Some(expires_at),
            days_left: Some(0),
            is_grace_period: true,
            auto_pay: row.auto_pay_method_id.is_some(),
        };
    }

    PlanSummary::free()
}

pub async fn fetch(pool: &PgPool, user_id: i64) -> Result<Option<Subscription>> {
    let row = sqlx::query_as::<_, Subscription>(
        r#"
        SELECT user_id, plan, expires_at, auto_pay_method_id, granted_by_admin, updated_at
        FROM subscriptions
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn plan_summary(pool: &PgPool, user_id: i64, now: DateTime<Utc>) -> Result<PlanSummary> {
    let row = fetch(pool, user_id).await?;
    Ok(classify(row.as_ref(), now, *config::SUBSCRIPTION_GRACE_DAYS))
}

/// Grants `days` of paid plan. An unexpired subscription extends from its
/// current expiry, anything else starts from `now`. A saved auto-pay method
/// is only overwritten when a new one is supplied.
pub async fn activate(
    pool: &PgPool,
    user_id: i64,
    days: i64,
    payment_method_id: Option<&str>,
    granted_by: Option<i64>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let existing = fetch(pool, user_id).await?;
    let expires_at = match existing {
        Some(ref row) if row.plan == "pro" && row.expires_at.map_or(false, |at| at > now) => {
            row.expires_at.unwrap_or(now) + Duration::days(days)
        }
        _ => now + Duration::days(days),
    };

    sqlx::query(
        r#"
        INSERT INTO subscriptions (user_id, plan, expires_at, auto_pay_method_id, granted_by_admin, updated_at)
        VALUES ($1, 'pro', $2, $3, $4, NOW())
        ON CONFLICT (user_id)
        DO UPDATE SET
            plan = 'pro',
            expires_at = EXCLUDED.expires_at,
            auto_pay_method_id = COALESCE(EXCLUDED.auto_pay_method_id, subscriptions.auto_pay_method_id),
            granted_by_admin = EXCLUDED.granted_by_admin,
            updated_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(expires_at)
    .bind(payment_method_id)
    .bind(granted_by)
    .execute(pool)
    .await?;

    info!(user_id, %expires_at, granted_by = ?granted_by, "paid plan activated");
    Ok(expires_at)
}

pub async fn disable_auto_pay(pool: &PgPool, user_id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE subscriptions SET auto_pay_method_id = NULL, updated_at = NOW() WHERE user_id = $1",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    info!(user_id, "auto-pay disabled");
    Ok(())
}

/// key: subscriptions -> auto-payment scan query
#[derive(Debug, FromRow)]
pub struct ExpiringSubscription {
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub auto_pay_method_id: Option<String>,
}

/// Paid subscriptions expiring within the lookahead window that carry a
/// saved payment method. Admin-granted rows are never charged.
pub async fn expiring_within(
    pool: &PgPool,
    now: DateTime<Utc>,
    lookahead_days: i64,
) -> Result<Vec<ExpiringSubscription>> {
    let target = now + Duration::days(lookahead_days);
    let rows = sqlx::query_as::<_, ExpiringSubscription>(
        r#"
        SELECT user_id, expires_at, auto_pay_method_id
        FROM subscriptions
        WHERE plan = 'pro'
          AND auto_pay_method_id IS NOT NULL
          AND expires_at BETWEEN $1 AND $2
          AND granted_by_admin IS NULL
        ORDER BY expires_at
        "#,
    )
    .bind(now)
    .bind(target)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

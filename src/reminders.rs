use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::info;

/// key: reminders -> watering reminder regeneration
///
/// Deactivates the plant's active watering reminders and schedules a fresh
/// one at `now + interval_days`. Called whenever the interval changes so the
/// next nudge matches the new cadence.
pub async fn reschedule_watering(
    pool: &PgPool,
    plant_id: i32,
    user_id: i64,
    interval_days: i32,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE reminders
        SET is_active = FALSE
        WHERE user_id = $1
          AND plant_id = $2
          AND reminder_type = 'watering'
          AND is_active
        "#,
    )
    .bind(user_id)
    .bind(plant_id)
    .execute(pool)
    .await?;

    let next_date = now + Duration::days(i64::from(interval_days));
    sqlx::query(
        r#"
        INSERT INTO reminders (user_id, plant_id, reminder_type, next_date, is_active)
        VALUES ($1, $2, 'watering', $3, TRUE)
        "#,
    )
    .bind(user_id)
    .bind(plant_id)
    .bind(next_date)
    .execute(pool)
    .await?;

    info!(plant_id, user_id, interval_days, "rescheduled watering reminder");
    Ok(())
}

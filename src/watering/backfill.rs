use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};

use crate::plants::DEFAULT_INTERVAL_DAYS;

use super::seasons::{Season, SeasonInfo};

/// Base intervals describe summer watering; anything outside this band is an
/// estimation artifact, not a plausible baseline.
pub const MIN_BASE_DAYS: i32 = 3;
pub const MAX_BASE_DAYS: i32 = 14;

/// key: base-interval-backfill -> summer baseline recovery
///
/// Runs once at startup, after schema migrations. Only rows with no recorded
/// base interval are touched, so a second run matches nothing. Returns the
/// number of rows backfilled.
pub async fn run(pool: &PgPool, now: DateTime<Utc>) -> Result<u64> {
    let candidates = sqlx::query_as::<_, BackfillRow>(
        "SELECT id, watering_interval FROM plants WHERE base_watering_interval IS NULL ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    if candidates.is_empty() {
        debug!("all plants already carry a base watering interval");
        return Ok(0);
    }

    let season = SeasonInfo::at(now).season;
    let mut updated = 0u64;
    for row in candidates {
        let current = row.watering_interval.unwrap_or(DEFAULT_INTERVAL_DAYS);
        let base = base_from_current(current, season);
        sqlx::query("UPDATE plants SET base_watering_interval = $1 WHERE id = $2")
            .bind(base)
            .bind(row.id)
            .execute(pool)
            .await?;
        debug!(plant_id = row.id, current, base, "backfilled base interval");
        updated += 1;
    }

    info!(
        updated,
        season = season.as_str(),
        "base watering intervals backfilled"
    );
    Ok(updated)
}

#[derive(Debug, FromRow)]
struct BackfillRow {
    id: i32,
    watering_interval: Option<i32>,
}

/// Estimates what the interval would be in summer from one observed in
/// `season`, by applying the inverse of that season's multiplier.
pub fn base_from_current(current_days: i32, season: Season) -> i32 {
    let scaled = (f64::from(current_days) * season.reverse_multiplier()).round() as i32;
    scaled.clamp(MIN_BASE_DAYS, MAX_BASE_DAYS)
}

use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::time::{self, Duration as TokioDuration};
use tracing::{debug, info, warn};

use crate::config;
use crate::plants::{self, Plant};
use crate::reminders;

use super::estimator::IntervalEstimator;
use super::seasons::{moscow_time, SeasonInfo};

/// key: seasonal-adjustment -> monthly recalibration driver
///
/// The ticker fires daily; the batch itself only runs on the 1st of the
/// month, so restarts mid-month stay quiet until the next boundary.
pub fn spawn(pool: PgPool, estimator: IntervalEstimator) {
    let interval = TokioDuration::from_secs(*config::SEASONAL_SCAN_INTERVAL_SECS);

    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            let now = Utc::now();
            if !is_adjustment_day(now) {
                debug!("seasonal adjustment idle until the 1st of the month");
                continue;
            }
            if let Err(err) = process_tick(&pool, &estimator, now).await {
                warn!(?err, "seasonal adjustment tick failed");
            }
        }
    });
}

/// Users plan their watering around Moscow wall clock, so the month boundary
/// does too.
pub fn is_adjustment_day(now: DateTime<Utc>) -> bool {
    moscow_time(now).day() == 1
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AdjustmentOutcome {
    pub processed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// key: seasonal-adjustment -> tick handler
///
/// Re-estimates the watering interval of every eligible plant, one at a time.
/// A failure on one plant never aborts the batch; the outcome carries the
/// aggregate counts that also land in the final log line.
pub async fn process_tick(
    pool: &PgPool,
    estimator: &IntervalEstimator,
    now: DateTime<Utc>,
) -> Result<AdjustmentOutcome> {
    let season = SeasonInfo::at(now);
    let eligible = plants::fetch_for_seasonal_update(pool).await?;
    info!(
        plants = eligible.len(),
        season = season.season.as_str(),
        month = season.month_name_ru,
        "seasonal watering adjustment started"
    );

    let mut outcome = AdjustmentOutcome::default();
    for plant in eligible {
        outcome.processed += 1;

        // Species names come from photo identification; without one there is
        // nothing to ask the model about.
        let Some(species) = plant.species_name() else {
            debug!(
                plant_id = plant.id,
                user_id = plant.user_id,
                name = %plant.display_name(),
                "no species name, skipping"
            );
            outcome.skipped += 1;
            continue;
        };

        let current = plant.current_interval();
        let recommended = estimator
            .estimate(species, plant.base_interval(), &season)
            .await;
        if recommended == current {
            debug!(plant_id = plant.id, days = current, "interval unchanged");
            continue;
        }

        match apply_interval(pool, &plant, recommended, now).await {
            Ok(()) => {
                info!(
                    plant_id = plant.id,
                    user_id = plant.user_id,
                    old = current,
                    new = recommended,
                    "watering interval adjusted"
                );
                outcome.updated += 1;
            }
            Err(err) => {
                warn!(?err, plant_id = plant.id, "failed to apply adjusted interval");
                outcome.errors += 1;
            }
        }
    }

    info!(
        processed = outcome.processed,
        updated = outcome.updated,
        skipped = outcome.skipped,
        errors = outcome.errors,
        "seasonal watering adjustment finished"
    );
    Ok(outcome)
}

/// Persists the new interval and lines the next reminder up with it.
async fn apply_interval(
    pool: &PgPool,
    plant: &Plant,
    interval_days: i32,
    now: DateTime<Utc>,
) -> Result<()> {
    plants::set_watering_interval(pool, plant.id, interval_days).await?;
    reminders::reschedule_watering(pool, plant.id, plant.user_id, interval_days, now).await?;
    Ok(())
}

/// What the manual refresh endpoint reports back.
#[derive(Debug, Serialize)]
pub struct RefreshOutcome {
    pub plant_id: i32,
    pub plant_name: String,
    pub old_interval: i32,
    pub new_interval: i32,
    pub season: &'static str,
    pub changed: bool,
}

/// Single-plant re-estimation. The caller has already made sure the plant
/// exists and `species` is its non-empty species name.
pub async fn refresh_plant(
    pool: &PgPool,
    estimator: &IntervalEstimator,
    plant: &Plant,
    species: &str,
    now: DateTime<Utc>,
) -> Result<RefreshOutcome> {
    let season = SeasonInfo::at(now);
    let current = plant.current_interval();
    let recommended = estimator
        .estimate(species, plant.base_interval(), &season)
        .await;
    let changed = recommended != current;
    if changed {
        apply_interval(pool, plant, recommended, now).await?;
    }

    Ok(RefreshOutcome {
        plant_id: plant.id,
        plant_name: species.to_string(),
        old_interval: current,
        new_interval: recommended,
        season: season.season.as_str(),
        changed,
    })
}

pub mod adjustment;
pub mod backfill;
pub mod estimator;
pub mod seasons;

pub use adjustment::{
    process_tick as run_seasonal_adjustment_tick, spawn as spawn_seasonal_adjustment,
    AdjustmentOutcome,
};
pub use backfill::run as backfill_base_intervals;
pub use estimator::{interval_by_formula, IntervalEstimator};
pub use seasons::{moscow_time, Season, SeasonInfo};

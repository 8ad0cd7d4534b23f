use axum::{
    extract::{Extension, Path},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::notifier::Notifier;
use crate::payments::PaymentService;
use crate::plants;
use crate::subscriptions::{self, PlanSummary};
use crate::watering::adjustment::{self, RefreshOutcome};
use crate::watering::estimator::IntervalEstimator;
use crate::webhooks;

/// key: routes -> bot-facing rest surface
pub fn api_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks/payment", post(webhooks::payment_webhook))
        .route("/api/subscriptions/:user_id", get(subscription_summary))
        .route(
            "/api/subscriptions/:user_id/auto-pay/disable",
            post(disable_auto_pay),
        )
        .route(
            "/api/plants/:id/watering/refresh",
            post(refresh_plant_interval),
        )
}

async fn health(
    Extension(estimator): Extension<IntervalEstimator>,
    Extension(payments): Extension<PaymentService>,
    Extension(notifier): Extension<Notifier>,
) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "features": {
            "interval_estimator": estimator.is_enabled(),
            "payment_gateway": payments.has_gateway(),
            "notifications": notifier.is_enabled(),
        }
    }))
}

async fn subscription_summary(
    Extension(pool): Extension<PgPool>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<PlanSummary>> {
    let summary = subscriptions::plan_summary(&pool, user_id, Utc::now()).await?;
    Ok(Json(summary))
}

async fn disable_auto_pay(
    Extension(pool): Extension<PgPool>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<PlanSummary>> {
    subscriptions::disable_auto_pay(&pool, user_id).await?;
    let summary = subscriptions::plan_summary(&pool, user_id, Utc::now()).await?;
    Ok(Json(summary))
}

async fn refresh_plant_interval(
    Extension(pool): Extension<PgPool>,
    Extension(estimator): Extension<IntervalEstimator>,
    Path(plant_id): Path<i32>,
) -> AppResult<Json<RefreshOutcome>> {
    let plant = plants::fetch_by_id(&pool, plant_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let Some(species) = plant.species_name() else {
        return Err(AppError::BadRequest(
            "plant has no species name to estimate from".to_string(),
        ));
    };

    let outcome = adjustment::refresh_plant(&pool, &estimator, &plant, species, Utc::now()).await?;
    Ok(Json(outcome))
}

use axum::{extract::Extension, http::StatusCode, Json};
use chrono::Utc;
use sqlx::PgPool;

use crate::notifier::Notifier;
use crate::payments::{webhook, GatewayEvent, PaymentService};

/// key: webhooks-payment -> gateway entrypoint
///
/// 200 acknowledges the delivery; 400 makes the gateway schedule a retry.
pub async fn payment_webhook(
    Extension(pool): Extension<PgPool>,
    Extension(payments): Extension<PaymentService>,
    Extension(notifier): Extension<Notifier>,
    Json(event): Json<GatewayEvent>,
) -> StatusCode {
    if webhook::process_event(&pool, &payments, &notifier, &event, Utc::now()).await {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

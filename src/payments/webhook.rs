use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, error, info, warn};

use crate::config;
use crate::notifier::Notifier;
use crate::subscriptions;

use super::models::{status, GatewayEvent, Payment};
use super::service::PaymentService;

/// key: payments-webhook -> gateway callback processing
///
/// Returns whether the delivery was accepted; `false` tells the HTTP layer to
/// reject it so the gateway retries. The gateway delivers at least once, so a
/// payment already stored in a terminal state is acknowledged with no side
/// effects: the same succeeded event can never activate or notify twice.
pub async fn process_event(
    pool: &PgPool,
    payments: &PaymentService,
    notifier: &Notifier,
    event: &GatewayEvent,
    now: DateTime<Utc>,
) -> bool {
    let Some(payment_id) = event.object.id.as_deref().filter(|id| !id.is_empty()) else {
        warn!(event = %event.event, "webhook rejected: no payment id");
        return false;
    };
    let Some(user_id) = parsed_user_id(event) else {
        warn!(event = %event.event, payment_id, "webhook rejected: missing or invalid user id");
        return false;
    };
    let Some(new_status) = event.object.status.as_deref().filter(|value| !value.is_empty()) else {
        warn!(event = %event.event, payment_id, "webhook rejected: no payment status");
        return false;
    };

    let stored = match payments.fetch_payment(payment_id).await {
        Ok(row) => row,
        Err(err) => {
            error!(?err, payment_id, "failed to load payment for webhook");
            return false;
        }
    };

    // The stored row is the dedupe witness. A re-delivered terminal status was
    // already fully processed; a conflicting one can never be applied because
    // terminal states are forward-only.
    if let Some(prior) = stored.as_ref().map(|payment| payment.status.as_str()) {
        if status::is_terminal(prior) {
            if prior == new_status {
                info!(payment_id, status = new_status, "duplicate webhook delivery acknowledged");
            } else {
                warn!(
                    payment_id,
                    stored = prior,
                    delivered = new_status,
                    "webhook for settled payment ignored"
                );
            }
            return true;
        }
    }

    match event.event.as_str() {
        "payment.succeeded" => {
            let method_id = saved_method_id(event);
            if let Some(method_id) = method_id {
                if let Err(err) = payments.save_payment_method(payment_id, method_id).await {
                    warn!(?err, payment_id, "failed to persist saved payment method");
                }
            }

            let expires_at = match subscriptions::activate(
                pool,
                user_id,
                *config::SUBSCRIPTION_DURATION_DAYS,
                method_id,
                None,
                now,
            )
            .await
            {
                Ok(expires_at) => expires_at,
                Err(err) => {
                    error!(?err, user_id, payment_id, "failed to activate subscription");
                    return false;
                }
            };
            info!(user_id, payment_id, %expires_at, "subscription activated by payment");

            if let Err(err) = notifier
                .notify_subscription_activated(user_id, expires_at)
                .await
            {
                warn!(?err, user_id, "failed to send activation notification");
            }
        }
        "payment.canceled" => {
            let reason = cancellation_reason(event);
            info!(payment_id, user_id, reason, "payment canceled");
            // Canceled one-off payments need no message: the user simply never
            // finished checkout. A broken renewal is worth telling them about.
            if is_recurring(event, stored.as_ref()) {
                if let Err(err) = notifier.notify_payment_failed(user_id, reason).await {
                    warn!(?err, user_id, "failed to send cancellation notification");
                }
            }
        }
        other => {
            debug!(event = other, payment_id, "webhook event acknowledged without action");
        }
    }

    // The status write comes last: only a fully processed delivery is recorded
    // as terminal, so a rejected one is retried end to end.
    match payments.advance_status(payment_id, new_status).await {
        Ok(true) => info!(payment_id, status = new_status, "payment status updated"),
        Ok(false) => debug!(payment_id, "no stored payment row to update"),
        Err(err) => {
            error!(?err, payment_id, "failed to advance payment status");
            return false;
        }
    }

    true
}

fn parsed_user_id(event: &GatewayEvent) -> Option<i64> {
    event
        .object
        .metadata
        .user_id
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok())
}

/// Method id to keep for future renewals; only methods the gateway actually
/// saved count.
fn saved_method_id(event: &GatewayEvent) -> Option<&str> {
    event
        .object
        .payment_method
        .as_ref()
        .filter(|method| method.saved)
        .and_then(|method| method.id.as_deref())
}

fn cancellation_reason(event: &GatewayEvent) -> &str {
    event
        .object
        .cancellation_details
        .as_ref()
        .and_then(|details| details.reason.as_deref())
        .unwrap_or("unknown")
}

/// The stored row knows best; a payment the service never saw falls back to
/// the metadata the gateway echoes.
fn is_recurring(event: &GatewayEvent, stored: Option<&Payment>) -> bool {
    match stored {
        Some(payment) => payment.is_recurring,
        None => event.object.metadata.kind.as_deref() == Some("auto_renewal"),
    }
}

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::time::{self, Duration as TokioDuration};
use tracing::{debug, info, warn};

use crate::config;
use crate::notifier::Notifier;
use crate::subscriptions;

use super::service::PaymentService;

/// Failure reason forwarded to the user when a renewal charge cannot even be
/// created at the gateway.
pub const AUTO_PAYMENT_FAILED_REASON: &str = "auto_payment_creation_failed";

/// key: auto-payment-scheduler -> unattended renewals
pub fn spawn(pool: PgPool, payments: PaymentService, notifier: Notifier) {
    let interval = TokioDuration::from_secs(*config::AUTOPAY_SCAN_INTERVAL_SECS);

    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(err) = process_tick(&pool, &payments, &notifier, Utc::now()).await {
                warn!(?err, "auto-payment tick failed");
            }
        }
    });
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AutoPayOutcome {
    pub scanned: usize,
    pub charged: usize,
    pub failed: usize,
}

/// key: auto-payment-scheduler -> tick handler
///
/// Charges every paid subscription expiring inside the lookahead window that
/// carries a saved payment method. A failed charge notifies the user with the
/// manual-payment button; nothing in here aborts the scan.
pub async fn process_tick(
    pool: &PgPool,
    payments: &PaymentService,
    notifier: &Notifier,
    now: DateTime<Utc>,
) -> Result<AutoPayOutcome> {
    let due = subscriptions::expiring_within(pool, now, *config::AUTOPAY_LOOKAHEAD_DAYS).await?;
    let mut outcome = AutoPayOutcome {
        scanned: due.len(),
        ..AutoPayOutcome::default()
    };
    if due.is_empty() {
        debug!("no subscriptions due for renewal");
        return Ok(outcome);
    }
    info!(due = due.len(), "auto-payment scan started");

    for subscription in due {
        // Nothing to charge without a saved method, and nothing to tell the
        // user either.
        let Some(method_id) = subscription.auto_pay_method_id.as_deref() else {
            debug!(user_id = subscription.user_id, "no saved payment method, skipping");
            continue;
        };

        match payments
            .create_recurring_payment(subscription.user_id, method_id)
            .await
        {
            Some(payment) => {
                info!(
                    user_id = subscription.user_id,
                    payment_id = %payment.payment_id,
                    status = %payment.status,
                    "renewal charge created"
                );
                outcome.charged += 1;
            }
            None => {
                warn!(user_id = subscription.user_id, "renewal charge failed");
                if let Err(err) = notifier
                    .notify_payment_failed(subscription.user_id, AUTO_PAYMENT_FAILED_REASON)
                    .await
                {
                    warn!(
                        ?err,
                        user_id = subscription.user_id,
                        "failed to send renewal failure notification"
                    );
                }
                outcome.failed += 1;
            }
        }
    }

    info!(
        scanned = outcome.scanned,
        charged = outcome.charged,
        failed = outcome.failed,
        "auto-payment scan finished"
    );
    Ok(outcome)
}

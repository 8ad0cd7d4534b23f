use anyhow::Result;
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::config;

use super::gateway::{GatewayClient, GatewayPayment};
use super::models::{CreatedPayment, Payment};

const CURRENCY: &str = "RUB";

/// key: payments-service -> charge orchestration and stored history
///
/// Pairs the gateway client with the payments table. The two creation entry
/// points never error outward: anything short of a persisted, accepted
/// payment collapses to `None` so the caller can tell the user to retry.
#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
    gateway: Option<GatewayClient>,
}

impl PaymentService {
    pub fn new(pool: PgPool, gateway: Option<GatewayClient>) -> Self {
        Self { pool, gateway }
    }

    pub fn has_gateway(&self) -> bool {
        self.gateway.is_some()
    }

    /// One-off subscription payment at the configured price. Returns the
    /// confirmation URL the user must visit.
    pub async fn create_payment(&self, user_id: i64, save_method: bool) -> Option<CreatedPayment> {
        let Some(gateway) = &self.gateway else {
            warn!(user_id, "payment gateway not configured, cannot create payment");
            return None;
        };

        let amount = config::SUBSCRIPTION_PRICE_RUB.clone();
        let description = format!("Подписка на {} дней", *config::SUBSCRIPTION_DURATION_DAYS);
        let payment = match gateway
            .create_redirect_payment(
                user_id,
                &amount,
                CURRENCY,
                &description,
                &config::PAYMENT_RETURN_URL,
                save_method,
            )
            .await
        {
            Ok(payment) => payment,
            Err(err) => {
                warn!(?err, user_id, "payment creation failed");
                return None;
            }
        };

        self.finish_created(payment, user_id, &amount, &description, false)
            .await
    }

    /// Unattended renewal charge against a saved payment method.
    pub async fn create_recurring_payment(
        &self,
        user_id: i64,
        payment_method_id: &str,
    ) -> Option<CreatedPayment> {
        let Some(gateway) = &self.gateway else {
            warn!(user_id, "payment gateway not configured, cannot create recurring payment");
            return None;
        };

        let amount = config::SUBSCRIPTION_PRICE_RUB.clone();
        let description = format!(
            "Автопродление подписки на {} дней",
            *config::SUBSCRIPTION_DURATION_DAYS
        );
        let payment = match gateway
            .create_recurring_payment(user_id, &amount, CURRENCY, &description, payment_method_id)
            .await
        {
            Ok(payment) => payment,
            Err(err) => {
                warn!(?err, user_id, "recurring payment creation failed");
                return None;
            }
        };

        self.finish_created(payment, user_id, &amount, &description, true)
            .await
    }

    async fn finish_created(
        &self,
        payment: GatewayPayment,
        user_id: i64,
        amount: &str,
        description: &str,
        is_recurring: bool,
    ) -> Option<CreatedPayment> {
        if let Err(err) = self
            .record_created(&payment, user_id, amount, description, is_recurring)
            .await
        {
            error!(?err, user_id, payment_id = %payment.id, "failed to persist created payment");
            return None;
        }

        info!(
            user_id,
            payment_id = %payment.id,
            status = %payment.status,
            is_recurring,
            "payment created"
        );
        Some(CreatedPayment {
            payment_id: payment.id,
            confirmation_url: payment
                .confirmation
                .and_then(|confirmation| confirmation.confirmation_url),
            status: payment.status,
        })
    }

    async fn record_created(
        &self,
        payment: &GatewayPayment,
        user_id: i64,
        amount: &str,
        description: &str,
        is_recurring: bool,
    ) -> Result<()> {
        let method_id = payment
            .payment_method
            .as_ref()
            .filter(|method| method.saved)
            .and_then(|method| method.id.as_deref());
        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, user_id, amount, currency, status,
                description, is_recurring, payment_method_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (payment_id) DO NOTHING
            "#,
        )
        .bind(&payment.id)
        .bind(user_id)
        .bind(amount)
        .bind(CURRENCY)
        .bind(&payment.status)
        .bind(description)
        .bind(is_recurring)
        .bind(method_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fetch_payment(&self, payment_id: &str) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, user_id, amount, currency, status,
                   description, is_recurring, payment_method_id,
                   created_at, updated_at
            FROM payments
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Forward-only status write: a row already in a terminal state is left
    /// untouched. Returns whether anything changed.
    pub async fn advance_status(&self, payment_id: &str, new_status: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, updated_at = NOW()
            WHERE payment_id = $1
              AND status NOT IN ('succeeded', 'canceled')
            "#,
        )
        .bind(payment_id)
        .bind(new_status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn save_payment_method(&self, payment_id: &str, method_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE payments SET payment_method_id = $2, updated_at = NOW() WHERE payment_id = $1",
        )
        .bind(payment_id)
        .bind(method_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

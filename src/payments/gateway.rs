use anyhow::{bail, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::error;
use uuid::Uuid;

use crate::config;

use super::models::GatewayPaymentMethod;

const DEFAULT_API_BASE: &str = "https://api.yookassa.ru/v3";

/// key: payments-gateway -> provider HTTP client
///
/// Speaks the provider's payments API with shop-id Basic auth. Every call
/// carries a fresh `Idempotence-Key`, so a transport retry can never double
/// a charge.
#[derive(Clone)]
pub struct GatewayClient {
    base: String,
    shop_id: String,
    secret_key: String,
    client: Client,
}

/// Payment object as the gateway returns it from `POST /payments`.
#[derive(Debug, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub confirmation: Option<GatewayConfirmation>,
    #[serde(default)]
    pub payment_method: Option<GatewayPaymentMethod>,
}

#[derive(Debug, Deserialize)]
pub struct GatewayConfirmation {
    #[serde(default)]
    pub confirmation_url: Option<String>,
}

impl GatewayClient {
    /// `None` when `YOOKASSA_SHOP_ID`/`YOOKASSA_SECRET_KEY` are unset; the
    /// service degrades to its failure sentinel in that case.
    pub fn from_env() -> Option<Self> {
        let shop_id = config::read_optional_env("YOOKASSA_SHOP_ID")?;
        let secret_key = config::read_optional_env("YOOKASSA_SECRET_KEY")?;
        let base = config::read_optional_env("YOOKASSA_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Some(Self::new(base, shop_id, secret_key))
    }

    pub fn new(
        base: impl Into<String>,
        shop_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            shop_id: shop_id.into(),
            secret_key: secret_key.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("client build"),
        }
    }

    /// One-off payment confirmed by the user through a redirect page.
    pub async fn create_redirect_payment(
        &self,
        user_id: i64,
        amount: &str,
        currency: &str,
        description: &str,
        return_url: &str,
        save_method: bool,
    ) -> Result<GatewayPayment> {
        let body = json!({
            "amount": {"value": amount, "currency": currency},
            "capture": true,
            "confirmation": {"type": "redirect", "return_url": return_url},
            "description": description,
            "metadata": {"user_id": user_id.to_string(), "type": "subscription"},
            "save_payment_method": save_method,
        });
        self.post_payment(body).await
    }

    /// Unattended charge against a previously saved payment method.
    pub async fn create_recurring_payment(
        &self,
        user_id: i64,
        amount: &str,
        currency: &str,
        description: &str,
        payment_method_id: &str,
    ) -> Result<GatewayPayment> {
        let body = json!({
            "amount": {"value": amount, "currency": currency},
            "capture": true,
            "payment_method_id": payment_method_id,
            "description": description,
            "metadata": {"user_id": user_id.to_string(), "type": "auto_renewal"},
        });
        self.post_payment(body).await
    }

    async fn post_payment(&self, body: Value) -> Result<GatewayPayment> {
        let idempotence_key = Uuid::new_v4().to_string();
        let response = self
            .client
            .post(format!("{}/payments", self.base))
            .basic_auth(&self.shop_id, Some(&self.secret_key))
            .header("Idempotence-Key", &idempotence_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(%status, body = %text, "payment creation rejected by gateway");
            bail!("gateway returned {status}");
        }

        Ok(response.json().await?)
    }
}

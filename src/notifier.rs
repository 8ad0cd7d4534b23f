use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::watering::seasons::moscow_time;

/// key: notifier -> bot chat surface
///
/// Thin Telegram Bot API client used for billing notifications. Without a
/// `BOT_TOKEN` every send becomes a logged no-op, so jobs and webhook
/// processing run unchanged in environments without the bot.
#[derive(Clone)]
pub struct Notifier {
    base: String,
    token: Option<String>,
    client: Client,
}

impl Notifier {
    pub fn from_env() -> Self {
        Self::new("https://api.telegram.org", std::env::var("BOT_TOKEN").ok())
    }

    pub fn new(base: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            token: token.filter(|value| !value.trim().is_empty()),
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("client build"),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    pub async fn notify_subscription_activated(
        &self,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), reqwest::Error> {
        self.send_message(user_id, &subscription_activated_message(expires_at), None)
            .await
    }

    pub async fn notify_payment_failed(
        &self,
        user_id: i64,
        reason: &str,
    ) -> Result<(), reqwest::Error> {
        self.send_message(
            user_id,
            &payment_failed_message(reason),
            Some(pay_manually_markup()),
        )
        .await
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<Value>,
    ) -> Result<(), reqwest::Error> {
        let Some(token) = &self.token else {
            debug!(chat_id, "notifier disabled, dropping message");
            return Ok(());
        };

        let url = format!("{}/bot{}/sendMessage", self.base, token);
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = markup;
        }

        self.client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn subscription_activated_message(expires_at: DateTime<Utc>) -> String {
    let expires = moscow_time(expires_at).format("%d.%m.%Y");
    format!(
        "✅ <b>Подписка активирована!</b>\n\n\
         📅 Активна до: <b>{expires}</b>\n\n\
         🌱 Без ограничений на растения, анализы и вопросы"
    )
}

fn payment_failed_message(reason: &str) -> String {
    format!(
        "❌ <b>Не удалось продлить подписку</b>\n\n\
         Причина: {reason}\n\n\
         Вы можете оплатить вручную — подписка активируется сразу после оплаты."
    )
}

fn pay_manually_markup() -> Value {
    json!({
        "inline_keyboard": [[
            {"text": "💳 Оплатить вручную", "callback_data": "subscribe_pro"}
        ]]
    })
}

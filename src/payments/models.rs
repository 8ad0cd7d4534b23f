use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Payment status vocabulary shared with the gateway. Terminal states are
/// never overwritten.
pub mod status {
    pub const PENDING: &str = "pending";
    pub const SUCCEEDED: &str = "succeeded";
    pub const CANCELED: &str = "canceled";

    pub fn is_terminal(status: &str) -> bool {
        matches!(status, SUCCEEDED | CANCELED)
    }
}

/// key: payments-models -> append-only charge history
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub payment_id: String,
    pub user_id: i64,
    pub amount: String,
    pub currency: String,
    pub status: String,
    pub description: Option<String>,
    pub is_recurring: bool,
    pub payment_method_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Successful payment-creation outcome handed back to the bot. Recurring
/// charges have no confirmation step, so no URL.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedPayment {
    pub payment_id: String,
    pub confirmation_url: Option<String>,
    pub status: String,
}

/// key: payments-models -> asynchronous gateway callback
///
/// Every field below `event` is optional on the wire; validation happens in
/// the webhook processor, not the deserializer.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEvent {
    pub event: String,
    #[serde(default)]
    pub object: GatewayPaymentObject,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayPaymentObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: GatewayMetadata,
    #[serde(default)]
    pub payment_method: Option<GatewayPaymentMethod>,
    #[serde(default)]
    pub cancellation_details: Option<CancellationDetails>,
}

/// Metadata travels as strings; the user id is parsed back out on receipt.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayMetadata {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPaymentMethod {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub saved: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancellationDetails {
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(status::is_terminal(status::SUCCEEDED));
        assert!(status::is_terminal(status::CANCELED));
        assert!(!status::is_terminal(status::PENDING));
        assert!(!status::is_terminal("waiting_for_capture"));
    }

    #[test]
    fn gateway_event_deserializes_from_wire_shape() {
        let event: GatewayEvent = serde_json::from_value(serde_json::json!({
            "type": "notification",
            "event": "payment.succeeded",
            "object": {
                "id": "2d9f1a-000f-5000-8000-1c3a",
                "status": "succeeded",
                "amount": {"value": "199.00", "currency": "RUB"},
                "metadata": {"user_id": "42", "type": "subscription"},
                "payment_method": {"type": "bank_card", "id": "pm-77", "saved": true}
            }
        }))
        .unwrap();

        assert_eq!(event.event, "payment.succeeded");
        assert_eq!(event.object.metadata.user_id.as_deref(), Some("42"));
        assert!(event.object.payment_method.as_ref().unwrap().saved);
    }

    #[test]
    fn gateway_event_tolerates_sparse_objects() {
        let event: GatewayEvent =
            serde_json::from_value(serde_json::json!({"event": "refund.succeeded"})).unwrap();
        assert!(event.object.id.is_none());
        assert!(event.object.metadata.user_id.is_none());
    }
}

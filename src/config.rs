use once_cell::sync::Lazy;

/// Address the HTTP server should bind to. Defaults to `0.0.0.0`.
pub static BIND_ADDRESS: Lazy<String> =
    Lazy::new(|| std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()));

/// Port the HTTP server should listen on. Defaults to `3000`.
pub static BIND_PORT: Lazy<u16> = Lazy::new(|| {
    std::env::var("BIND_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000)
});

/// When set to a truthy value, allows the application to continue running even if database
/// migrations fail. Defaults to `false`.
pub static ALLOW_MIGRATION_FAILURE: Lazy<bool> = Lazy::new(|| {
    std::env::var("ALLOW_MIGRATION_FAILURE")
        .ok()
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes")
        })
        .unwrap_or(false)
});

/// key: seasonal-config -> model used for watering-interval estimation
pub static SEASONAL_MODEL: Lazy<String> =
    Lazy::new(|| std::env::var("SEASONAL_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()));

/// key: seasonal-config -> adjustment scan cadence; the run itself is gated
/// on the Moscow day-of-month, so a daily tick is enough
pub static SEASONAL_SCAN_INTERVAL_SECS: Lazy<u64> = Lazy::new(|| {
    std::env::var("SEASONAL_SCAN_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(86_400)
});

/// key: payments-config -> auto-payment scan cadence
pub static AUTOPAY_SCAN_INTERVAL_SECS: Lazy<u64> = Lazy::new(|| {
    std::env::var("AUTOPAY_SCAN_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(86_400)
});

/// key: payments-config -> how far ahead expiring subscriptions are charged
pub static AUTOPAY_LOOKAHEAD_DAYS: Lazy<i64> = Lazy::new(|| {
    std::env::var("AUTOPAY_LOOKAHEAD_DAYS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(1)
});

/// key: payments-config -> monthly subscription price, decimal string as the
/// gateway expects it
pub static SUBSCRIPTION_PRICE_RUB: Lazy<String> = Lazy::new(|| {
    std::env::var("SUBSCRIPTION_PRICE_RUB")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "199.00".to_string())
});

/// key: payments-config -> days granted per successful charge
pub static SUBSCRIPTION_DURATION_DAYS: Lazy<i64> = Lazy::new(|| {
    std::env::var("SUBSCRIPTION_DURATION_DAYS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(30)
});

/// key: payments-config -> grace window after expiry before a plan reads as free
pub static SUBSCRIPTION_GRACE_DAYS: Lazy<i64> = Lazy::new(|| {
    std::env::var("SUBSCRIPTION_GRACE_DAYS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value >= 0)
        .unwrap_or(3)
});

/// Where the gateway sends the user back after a redirect-confirmed payment.
pub static PAYMENT_RETURN_URL: Lazy<String> = Lazy::new(|| {
    std::env::var("PAYMENT_RETURN_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "https://t.me/bloom_care_bot".to_string())
});

pub fn read_optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub mod config;
pub mod error;
pub mod notifier;
pub mod payments;
pub mod plants;
pub mod reminders;
pub mod routes;
pub mod subscriptions;
pub mod watering;
pub mod webhooks;

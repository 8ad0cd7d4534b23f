pub mod gateway;
pub mod models;
pub mod scheduler;
pub mod service;
pub mod webhook;

pub use gateway::GatewayClient;
pub use models::{CreatedPayment, GatewayEvent, Payment};
pub use scheduler::{
    process_tick as run_auto_payment_tick, spawn as spawn_auto_payment_scheduler, AutoPayOutcome,
};
pub use service::PaymentService;
pub use webhook::process_event;

pub mod app;
pub mod config;
pub mod engine;
pub mod gateway;
pub mod payment_handlers;
pub mod repo;

pub use app::{build_router, AppState};
pub use config::{GatewayMode, PaymentConfig};
pub use engine::{PaymentAttempt, PaymentAuditEngine, PaymentError, PaymentReceipt};
pub use gateway::{ChargeError, ChargeStatus, GatewayCharge, HttpPaymentGateway, PaymentGateway};
pub use repo::PgAuditStore;

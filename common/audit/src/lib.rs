pub mod model;
pub mod store;

pub use model::{AuditActor, AuditError, AuditResult, PaymentAuditEntry, PaymentAuditStatus};
pub use store::{AuditStore, InMemoryAuditStore};

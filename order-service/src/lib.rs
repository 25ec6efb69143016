pub mod app;
pub mod control;
pub mod model;
pub mod order_handlers;
pub mod repo;
pub mod store;

pub use app::{build_router, AppState};
pub use control::{CreateOrderError, OrderConcurrencyControl, TransitionError};
pub use model::{Order, OrderStatus};
pub use repo::PgOrderStore;
pub use store::{InMemoryOrderStore, OrderStore, OrderStoreError};

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use common_auth::{KeySet, TokenCodec, TokenConfig};
use common_observability::PlatformMetrics;
use common_security::{AccessControl, PgMembershipStore, ScopeRegistry};
use order_service::{build_router, AppState, OrderConcurrencyControl, PgOrderStore};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .context("connecting to DATABASE_URL")?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let codec = Arc::new(TokenCodec::new(TokenConfig::from_env()?, Arc::new(KeySet::from_env()?)));
    let metrics = Arc::new(PlatformMetrics::new("order-service")?);
    let access = Arc::new(AccessControl::new(
        codec,
        Arc::new(PgMembershipStore::new(pool.clone())),
        Arc::new(ScopeRegistry::from_env()?),
        metrics.clone(),
    ));
    let orders = Arc::new(OrderConcurrencyControl::new(
        Arc::new(PgOrderStore::new(pool)),
        metrics.clone(),
    ));

    let app = build_router(AppState { access, orders, metrics });

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8084);
    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!(%addr, "starting order-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

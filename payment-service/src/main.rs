use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use common_auth::{KeySet, TokenCodec, TokenConfig};
use common_observability::PlatformMetrics;
use common_security::{AccessControl, PgMembershipStore, ScopeRegistry};
use payment_service::{
    build_router, AppState, GatewayMode, HttpPaymentGateway, PaymentAuditEngine, PaymentConfig, PaymentGateway,
    PgAuditStore,
};
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

    let config = PaymentConfig::from_env()?;
    let gateway: Option<Arc<dyn PaymentGateway>> = match &config.gateway {
        GatewayMode::Bypass => None,
        GatewayMode::Live { base_url, api_key } => {
            info!(%base_url, timeout_ms = config.timeout.as_millis() as u64, "payment gateway configured");
            Some(Arc::new(HttpPaymentGateway::new(reqwest::Client::new(), base_url.clone(), api_key.clone())))
        }
    };

    let codec = Arc::new(TokenCodec::new(TokenConfig::from_env()?, Arc::new(KeySet::from_env()?)));
    let metrics = Arc::new(PlatformMetrics::new("payment-service")?);
    let access = Arc::new(AccessControl::new(
        codec,
        Arc::new(PgMembershipStore::new(pool.clone())),
        Arc::new(ScopeRegistry::from_env()?),
        metrics.clone(),
    ));
    let engine = Arc::new(PaymentAuditEngine::new(
        Arc::new(PgAuditStore::new(pool)),
        gateway,
        config.timeout,
        metrics.clone(),
    ));

    let app = build_router(AppState { access, engine, metrics });

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8086".to_string())
        .parse()?;
    let addr = SocketAddr::new(host.parse()?, port);
    info!(%addr, "starting payment-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

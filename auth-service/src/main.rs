use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use auth_service::{build_router, load_auth_config, AppState, PgCredentialVerifier};
use common_auth::{KeySet, TokenCodec, TokenConfig};
use common_observability::PlatformMetrics;
use common_security::{AccessControl, PgMembershipStore, ScopeRegistry};
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

    let keys = Arc::new(KeySet::from_env()?);
    if keys.signing_kid().is_none() {
        anyhow::bail!("auth-service needs a signing key; set TOKEN_SIGNING_SECRET or TOKEN_PRIVATE_KEY_PEM");
    }
    let codec = Arc::new(TokenCodec::new(TokenConfig::from_env()?, keys));
    let metrics = Arc::new(PlatformMetrics::new("auth-service")?);
    let memberships = Arc::new(PgMembershipStore::new(pool.clone()));
    let access = Arc::new(AccessControl::new(
        codec,
        memberships.clone(),
        Arc::new(ScopeRegistry::from_env()?),
        metrics.clone(),
    ));
    let config = load_auth_config();
    info!(guest_sessions_enabled = config.guest_sessions_enabled, "auth config loaded");

    let app = build_router(AppState {
        access,
        credentials: Arc::new(PgCredentialVerifier::new(pool)),
        memberships,
        config: Arc::new(config),
        metrics,
    });

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8085);
    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!(%addr, "starting auth-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

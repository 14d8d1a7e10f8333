use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower::make::Shared;
use tracing_subscriber::EnvFilter;

use faculty_reporting::auth::jwt::JwtService;
use faculty_reporting::config::AppConfig;
use faculty_reporting::db;
use faculty_reporting::mailer::LogMailer;
use faculty_reporting::routes;
use faculty_reporting::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "api",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        server_host = %config.server_host,
        server_port = config.server_port,
        cors_restricted = config.cors_allowed_origin.is_some(),
        "loaded configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    let applied = db::run_migrations(&pool)?;
    if applied > 0 {
        tracing::info!(applied, "applied pending migrations");
    }

    let jwt = JwtService::from_config(&config)?;
    let state = AppState::new(pool, config, jwt, Arc::new(LogMailer));

    let listen_addr: SocketAddr =
        format!("{}:{}", state.config.server_host, state.config.server_port).parse()?;
    let router = routes::create_router(state);

    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!("listening on {}", listen_addr);

    axum::serve(listener, Shared::new(router)).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

//! Authorizer Service
//!
//! Entry point. Loads configuration, fetches the issuer's signing keys and
//! serves the authorizer over HTTP.

use anyhow::Context;
use authorizer_service::auth::{Authorizer, JwksKeyProvider, PermissionRules};
use authorizer_service::config::Config;
use authorizer_service::observability::init_metrics_recorder;
use authorizer_service::routes::{self, AppState};
use authorizer_service::services::{Auth0RoleManager, CounterStore, RedisCounterStore, RoleManager};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting authorizer service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        issuer = %config.issuer_url(),
        bind_address = %config.bind_address,
        jwks_fetch_timeout_seconds = config.jwks_fetch_timeout.as_secs(),
        jwks_refresh_cooldown_seconds = config.jwks_refresh_cooldown.as_secs(),
        role_manager_enabled = config.role_manager.is_some(),
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder()
        .map_err(anyhow::Error::msg)
        .context("Failed to initialize metrics")?;

    // No request can be authorized without keys, so a failed initial fetch is fatal
    let key_provider = Arc::new(JwksKeyProvider::new(
        config.jwks_url(),
        config.jwks_fetch_timeout,
        config.jwks_refresh_cooldown,
    ));
    let key_count = key_provider.warm_up().await.map_err(|e| {
        error!(error = %e, "Failed to load signing keys");
        e
    })?;
    info!(key_count, "Signing keys loaded");

    let authorizer = Arc::new(Authorizer::new(
        key_provider,
        config.oidc_client_id.clone(),
        PermissionRules::default(),
    ));

    let counter_store: Arc<dyn CounterStore> = Arc::new(RedisCounterStore::new(
        &config.redis_url,
        config.counter_key_name.clone(),
    )?);

    let role_manager = config.role_manager.as_ref().map(|role_config| {
        Arc::new(Auth0RoleManager::new(&config.issuer_url(), role_config)) as Arc<dyn RoleManager>
    });

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let state = Arc::new(AppState {
        config,
        authorizer,
        counter_store,
        role_manager,
    });

    let app = routes::build_routes(state, metrics_handle);

    info!("Authorizer service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Authorizer service shutdown complete");

    Ok(())
}

/// Text output by default; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "authorizer_service=info,authorizer=info,tower_http=info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

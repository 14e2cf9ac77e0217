mod api;
mod middleware;

use std::sync::Arc;

use anyhow::Context;
use sourcing_core::Environment;
use sourcing_gateway::{CredentialSource, FileCredentialSource, GatewayClient};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::ProxyAuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = sourcing_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let auth = ProxyAuthState::new(
        config.proxy_key.as_deref(),
        matches!(config.env, Environment::Development),
    )?;

    let client =
        GatewayClient::with_base_url(&config.marketplace_base_url, config.gateway_timeout_secs)
            .context("failed to build marketplace client")?
            .with_rate_limit_retries(
                config.gateway_max_429_retries,
                config.gateway_backoff_base_ms,
            );
    let credentials: Arc<dyn CredentialSource> =
        Arc::new(FileCredentialSource::new(&config.credentials_path));

    let app = build_app(
        AppState {
            client,
            credentials,
        },
        auth,
    );

    tracing::info!(
        bind_addr = %config.proxy_bind_addr,
        marketplace = %config.marketplace_base_url,
        credentials = %config.credentials_path.display(),
        "starting marketplace proxy"
    );

    let listener = tokio::net::TcpListener::bind(config.proxy_bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.proxy_bind_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}

//! Debug access to the marketplace gateway.

use std::sync::Arc;

use clap::Subcommand;
use sourcing_core::AppConfig;
use sourcing_gateway::{
    ChainedCredentialSource, CredentialSource, EnvCredentialSource, FileCredentialSource,
    GatewayRequest, MarketplaceGateway, Method,
};

#[derive(Debug, Subcommand)]
pub enum GatewayCommands {
    /// Send one signed request and print the answer
    Call {
        /// HTTP method (GET, POST, PUT, DELETE, ...)
        method: String,
        /// Marketplace path, e.g. /v2/providers/...
        path: String,
        /// Raw query string without the leading '?'
        #[arg(long)]
        query: Option<String>,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
        /// User whose credentials are used
        #[arg(long, env = "SOURCING_USER_ID")]
        user: String,
        /// Skip the proxy even when one is configured
        #[arg(long)]
        direct: bool,
    },
}

/// Credentials file first, then the `COUPANG_*` environment variables.
pub(crate) fn credential_source(config: &AppConfig) -> Arc<dyn CredentialSource> {
    Arc::new(ChainedCredentialSource::new(vec![
        Box::new(FileCredentialSource::new(&config.credentials_path)),
        Box::new(EnvCredentialSource::from_env()),
    ]))
}

/// # Errors
///
/// Returns an error if the HTTP clients cannot be constructed.
pub(crate) fn build_gateway(config: &AppConfig) -> anyhow::Result<MarketplaceGateway> {
    let gateway = MarketplaceGateway::from_config(config, credential_source(config))
        .map_err(|e| anyhow::anyhow!("failed to build marketplace gateway: {e}"))?;
    tracing::debug!(mode = %gateway.mode(), "marketplace gateway ready");
    Ok(gateway)
}

pub(crate) fn parse_request(
    method: &str,
    path: &str,
    query: Option<&str>,
    body: Option<&str>,
) -> anyhow::Result<GatewayRequest> {
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid HTTP method '{method}': {e}"))?;
    if !path.starts_with('/') {
        anyhow::bail!("path must start with '/': {path}");
    }

    let mut request = GatewayRequest::new(method, path);
    if let Some(q) = query {
        request = request.with_query(q);
    }
    if let Some(raw) = body {
        let json = serde_json::from_str(raw)
            .map_err(|e| anyhow::anyhow!("--body is not valid JSON: {e}"))?;
        request = request.with_body(json);
    }
    Ok(request)
}

pub(crate) async fn run_gateway(
    config: &AppConfig,
    command: GatewayCommands,
) -> anyhow::Result<()> {
    match command {
        GatewayCommands::Call {
            method,
            path,
            query,
            body,
            user,
            direct,
        } => {
            let request = parse_request(&method, &path, query.as_deref(), body.as_deref())?;
            let gateway = build_gateway(config)?;

            let response = if direct {
                gateway.call_direct(&user, &request).await?
            } else {
                gateway.call(&user, &request).await?
            };

            println!("{} {} -> {}", request.method, request.path_and_query(), response.status);
            println!("{}", serde_json::to_string_pretty(&response.body)?);
            Ok(())
        }
    }
}

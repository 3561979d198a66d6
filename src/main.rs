//! `oauth2-token-bridge` server binary.
//!
//! Usage: `oauth2-token-bridge [CONFIG_FILE]`. Without an argument the configuration is read from
//! `BRIDGE_CONFIG` or `bridge.toml`, then overridden by `BRIDGE__*` environment variables.

// std
use std::{path::PathBuf, sync::Arc};
// crates.io
use color_eyre::Result;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
// self
use oauth2_token_bridge::{
	broker::{IdentityBroker, ReqwestKeycloakBroker},
	config::AppConfig,
	http::ReqwestHttpClient,
	issuer::TokenIssuer,
	oauth::ReqwestTransportErrorMapper,
	server::{self, AppState},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let path = std::env::args_os().nth(1).map(PathBuf::from);
	let config = AppConfig::load(path.as_deref())?;
	let keycloak = &config.keycloak;
	let http = ReqwestHttpClient::for_provider(keycloak.timeout())?;
	let mut broker = ReqwestKeycloakBroker::with_http_client(
		keycloak.descriptor()?,
		keycloak.client_id.as_str(),
		http,
		ReqwestTransportErrorMapper,
	);

	if let Some(secret) = &keycloak.client_secret {
		broker = broker.with_client_secret(secret.expose());
	}
	if let Some(redirect_uri) = &keycloak.redirect_uri {
		broker = broker.with_redirect_uri(redirect_uri.clone());
	}

	let broker: Arc<dyn IdentityBroker> = Arc::new(broker);
	let issuer = Arc::new(TokenIssuer::new(config.jwt.issuer_settings())?);
	let router = server::build_router(AppState::new(broker, issuer), &config.server)?;
	let listener = TcpListener::bind(config.server.bind_addr()?).await?;

	tracing::info!(
		addr = %listener.local_addr()?,
		realm = %keycloak.realm,
		"Token bridge listening."
	);

	server::serve(listener, router).await?;

	Ok(())
}

//! Declarative bridge configuration.
//!
//! Values come from an optional TOML file (`bridge.toml`, or the path in `BRIDGE_CONFIG`) and
//! are overridden by `BRIDGE__`-prefixed environment variables, e.g. `BRIDGE__JWT__SECRET` or
//! `BRIDGE__SERVER__CORS_ORIGINS=http://a,http://b`.

// std
use std::{
	net::SocketAddr,
	path::{Path, PathBuf},
};
// crates.io
use ::config::{Config, Environment, File, Source};
use axum::http::HeaderValue;
// self
use crate::{
	_prelude::*,
	auth::{ProviderId, TokenSecret},
	error::ConfigError,
	issuer::IssuerSettings,
	provider::{ClientAuthMethod, ProviderDescriptor},
};

/// File read when no explicit path is configured.
pub const DEFAULT_CONFIG_FILE: &str = "bridge.toml";
/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "BRIDGE_CONFIG";
/// Prefix of overriding environment variables.
pub const ENV_PREFIX: &str = "BRIDGE";

const DEFAULT_BIND: &str = "127.0.0.1:5000";
const DEFAULT_CORS_ORIGIN: &str = "http://127.0.0.1:5173";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Root configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
	/// Session token settings.
	pub jwt: JwtConfig,
	/// Keycloak realm and client settings.
	pub keycloak: KeycloakConfig,
	/// HTTP listener settings.
	#[serde(default)]
	pub server: ServerConfig,
}
impl AppConfig {
	/// Loads configuration from `path` (or the default locations) plus the environment, then
	/// validates it.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let explicit = path
			.map(Path::to_path_buf)
			.or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
		let file = match explicit {
			Some(path) => File::from(path).required(true),
			None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
		};

		Self::from_sources(file, environment())
	}

	/// Layers `env` over `file`, deserializes, and validates.
	pub fn from_sources<S>(file: S, env: Environment) -> Result<Self>
	where
		S: 'static + Source + Send + Sync,
	{
		let config: Self = Config::builder()
			.add_source(file)
			.add_source(env)
			.build()
			.and_then(Config::try_deserialize)
			.map_err(ConfigError::from)?;

		config.validate()?;

		Ok(config)
	}

	/// Rejects blank secrets, unusable realm settings, and malformed listener settings.
	pub fn validate(&self) -> Result<()> {
		require("jwt.issuer", &self.jwt.issuer)?;
		require("jwt.secret", self.jwt.secret.expose())?;
		require("keycloak.client_id", &self.keycloak.client_id)?;

		self.keycloak.descriptor()?;
		self.server.bind_addr()?;
		self.server.allowed_origins()?;

		Ok(())
	}
}

/// Session token settings.
#[derive(Clone, Debug, Deserialize)]
pub struct JwtConfig {
	/// `iss` claim of issued tokens.
	pub issuer: String,
	/// HMAC secret.
	pub secret: TokenSecret,
}
impl JwtConfig {
	/// Issuer settings for [`TokenIssuer`](crate::issuer::TokenIssuer).
	pub fn issuer_settings(&self) -> IssuerSettings {
		IssuerSettings { issuer: self.issuer.clone(), secret: self.secret.clone() }
	}
}

/// Keycloak realm and confidential client settings.
#[derive(Clone, Debug, Deserialize)]
pub struct KeycloakConfig {
	/// Keycloak root URL, e.g. `https://sso.example.com`.
	pub base_url: Url,
	/// Realm name.
	pub realm: String,
	/// Client identifier registered in the realm.
	pub client_id: String,
	/// Client secret; omitted for public clients.
	#[serde(default)]
	pub client_secret: Option<TokenSecret>,
	/// Redirect URI used by the frontend when requesting codes.
	#[serde(default)]
	pub redirect_uri: Option<Url>,
	/// Token endpoint client authentication.
	#[serde(default)]
	pub client_auth_method: ClientAuthMethod,
	/// Per-request timeout for realm calls, in seconds.
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
}
impl KeycloakConfig {
	/// Realm descriptor derived from `base_url` and `realm`.
	pub fn descriptor(&self) -> Result<ProviderDescriptor> {
		let id = ProviderId::new("keycloak").map_err(ConfigError::from)?;
		let mut descriptor = ProviderDescriptor::keycloak(id, &self.base_url, &self.realm)
			.map_err(ConfigError::from)?;

		descriptor.preferred_client_auth_method = self.client_auth_method;

		Ok(descriptor)
	}

	/// Per-request timeout for realm calls.
	pub fn timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.timeout_secs)
	}
}

/// HTTP listener settings.
#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
	/// Socket address to bind.
	#[serde(default = "default_bind")]
	pub bind: String,
	/// Origins allowed to call the bridge with credentials.
	#[serde(default = "default_cors_origins")]
	pub cors_origins: Vec<String>,
}
impl ServerConfig {
	/// Parsed bind address.
	pub fn bind_addr(&self) -> Result<SocketAddr> {
		self.bind
			.parse()
			.map_err(|_| ConfigError::InvalidBind { value: self.bind.clone() }.into())
	}

	/// CORS origins as header values.
	pub fn allowed_origins(&self) -> Result<Vec<HeaderValue>> {
		self.cors_origins
			.iter()
			.map(|origin| {
				let invalid = || Error::from(ConfigError::InvalidOrigin { origin: origin.clone() });

				Url::parse(origin)
					.ok()
					.filter(|url| url.has_host())
					.and_then(|_| HeaderValue::from_str(origin.trim_end_matches('/')).ok())
					.ok_or_else(invalid)
			})
			.collect()
	}
}
impl Default for ServerConfig {
	fn default() -> Self {
		Self { bind: default_bind(), cors_origins: default_cors_origins() }
	}
}

/// Environment source used by [`AppConfig::load`].
pub fn environment() -> Environment {
	Environment::with_prefix(ENV_PREFIX)
		.separator("__")
		.try_parsing(true)
		.list_separator(",")
		.with_list_parse_key("server.cors_origins")
}

fn require(key: &'static str, value: &str) -> Result<()> {
	if value.trim().is_empty() {
		Err(ConfigError::MissingSetting { key }.into())
	} else {
		Ok(())
	}
}

fn default_bind() -> String {
	DEFAULT_BIND.into()
}

fn default_cors_origins() -> Vec<String> {
	vec![DEFAULT_CORS_ORIGIN.into()]
}

fn default_timeout_secs() -> u64 {
	DEFAULT_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
	// crates.io
	use ::config::{FileFormat, Map};
	// self
	use super::*;

	const MINIMAL: &str = r#"
[jwt]
issuer = "https://bridge.test"
secret = "file-secret"

[keycloak]
base_url = "https://sso.example.com"
realm = "demo"
client_id = "frontend"
client_secret = "client-secret"
redirect_uri = "http://127.0.0.1:5173/callback"
"#;

	fn load(toml: &str, env: &[(&str, &str)]) -> Result<AppConfig> {
		let vars = env
			.iter()
			.map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
			.collect::<Map<_, _>>();

		AppConfig::from_sources(
			File::from_str(toml, FileFormat::Toml),
			environment().source(Some(vars)),
		)
	}

	#[test]
	fn defaults_fill_the_server_section() {
		let config = load(MINIMAL, &[]).expect("Minimal configuration should load.");

		assert_eq!(config.server.bind_addr().expect("Default bind should parse.").port(), 5000);
		assert_eq!(config.server.cors_origins, vec![DEFAULT_CORS_ORIGIN.to_owned()]);
		assert_eq!(config.keycloak.timeout(), std::time::Duration::from_secs(10));
		assert_eq!(config.keycloak.client_auth_method, ClientAuthMethod::ClientSecretBasic);
		assert_eq!(
			config.keycloak.descriptor().expect("Descriptor should build.").endpoints.token.as_str(),
			"https://sso.example.com/realms/demo/protocol/openid-connect/token"
		);
	}

	#[test]
	fn environment_overrides_the_file() {
		let config = load(
			MINIMAL,
			&[
				("BRIDGE__JWT__SECRET", "env-secret"),
				("BRIDGE__SERVER__BIND", "0.0.0.0:8080"),
				("BRIDGE__SERVER__CORS_ORIGINS", "http://a.test,https://b.test"),
			],
		)
		.expect("Overridden configuration should load.");

		assert_eq!(config.jwt.secret.expose(), "env-secret");
		assert_eq!(config.server.bind, "0.0.0.0:8080");
		assert_eq!(config.server.allowed_origins().expect("Origins should parse.").len(), 2);
	}

	#[test]
	fn blank_secrets_and_bad_origins_are_rejected() {
		assert!(matches!(
			load(MINIMAL, &[("BRIDGE__JWT__SECRET", " ")]),
			Err(Error::Config(ConfigError::MissingSetting { key: "jwt.secret" }))
		));
		assert!(matches!(
			load(MINIMAL, &[("BRIDGE__SERVER__CORS_ORIGINS", "not an origin")]),
			Err(Error::Config(ConfigError::InvalidOrigin { .. }))
		));
		assert!(matches!(
			load(MINIMAL, &[("BRIDGE__SERVER__BIND", "localhost")]),
			Err(Error::Config(ConfigError::InvalidBind { .. }))
		));
	}

	#[test]
	fn remote_plain_http_realms_are_rejected() {
		let toml = MINIMAL.replace("https://sso.example.com", "http://sso.example.com");

		assert!(matches!(load(&toml, &[]), Err(Error::Config(ConfigError::Descriptor(_)))));
	}

	#[test]
	fn dot_segment_realms_are_rejected() {
		let toml = MINIMAL.replace("realm = \"demo\"", "realm = \"..\"");

		assert!(matches!(load(&toml, &[]), Err(Error::Config(ConfigError::Descriptor(_)))));
	}

	#[test]
	fn missing_sections_fail_to_load() {
		assert!(matches!(load("", &[]), Err(Error::Config(ConfigError::Load(_)))));
	}
}

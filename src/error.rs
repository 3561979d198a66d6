//! Bridge-level error types shared across the broker client, token issuer, and configuration.

// self
use crate::_prelude::*;

/// Bridge-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical bridge error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Session token could not be signed or verified.
	#[error("Session token signing failed.")]
	Signing(#[from] jsonwebtoken::errors::Error),

	/// Provider rejected the authorization code.
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or bridge-supplied reason string.
		reason: String,
		/// HTTP status code reported by the provider, when available.
		status: Option<u16>,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider- or bridge-supplied reason string.
		reason: String,
		/// HTTP status code reported by the provider, when available.
		status: Option<u16>,
	},
	/// Userinfo endpoint refused the freshly issued access token.
	#[error("Userinfo endpoint responded with HTTP {status}.")]
	Userinfo {
		/// HTTP status code returned by the userinfo endpoint.
		status: u16,
	},
}
impl Error {
	/// HTTP status reported by the upstream provider for this failure, if any.
	pub fn http_status(&self) -> Option<u16> {
		match self {
			Error::InvalidGrant { status, .. } | Error::InvalidClient { status, .. } => *status,
			Error::Userinfo { status } => Some(*status),
			Error::Transient(TransientError::Endpoint { status, .. })
			| Error::Transient(TransientError::PayloadParse { status, .. }) => *status,
			Error::Config(_) | Error::Transport(_) | Error::Signing(_) => None,
		}
	}
}

/// Configuration and validation failures raised by the bridge.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration sources could not be loaded or deserialized.
	#[error("Configuration could not be loaded.")]
	Load(#[from] ::config::ConfigError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Provider identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// A required string setting is empty.
	#[error("Setting `{key}` must not be empty.")]
	MissingSetting {
		/// Dotted configuration key.
		key: &'static str,
	},
	/// CORS origin is not a valid header value.
	#[error("CORS origin `{origin}` is not a valid header value.")]
	InvalidOrigin {
		/// Offending origin string.
		origin: String,
	},
	/// Bind address cannot be parsed.
	#[error("Bind address `{value}` is invalid.")]
	InvalidBind {
		/// Offending bind string.
		value: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("{endpoint} endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Endpoint label (`token`, `userinfo`).
		endpoint: &'static str,
		/// Provider- or bridge-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Provider responded with malformed JSON that could not be parsed.
	#[error("{endpoint} endpoint returned malformed JSON.")]
	PayloadParse {
		/// Endpoint label (`token`, `userinfo`).
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the identity provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the identity provider.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn http_status_reports_upstream_codes_only() {
		let grant = Error::InvalidGrant { reason: "code already used".into(), status: Some(400) };
		let userinfo = Error::Userinfo { status: 401 };
		let transient = Error::from(TransientError::Endpoint {
			endpoint: "token",
			message: "timeout".into(),
			status: None,
		});
		let config = Error::from(ConfigError::MissingSetting { key: "jwt.secret" });

		assert_eq!(grant.http_status(), Some(400));
		assert_eq!(userinfo.http_status(), Some(401));
		assert_eq!(transient.http_status(), None);
		assert_eq!(config.http_status(), None);
	}
}

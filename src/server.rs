//! HTTP surface: the `GET /oauth` authorization callback.
//!
//! The handler validates the `code` query parameter, delegates to the [`IdentityBroker`], maps the
//! brokered identity onto the session claims, and answers with a freshly signed session token.

// crates.io
use axum::{
	Json, Router,
	extract::{RawQuery, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::get,
};
use tokio::net::TcpListener;
use tower_http::{
	cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
	trace::TraceLayer,
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{AuthorizationCode, ClaimSet},
	broker::IdentityBroker,
	config::ServerConfig,
	issuer::TokenIssuer,
};

/// Shared, immutable handler state.
#[derive(Clone)]
pub struct AppState {
	/// Identity broker redeeming authorization codes.
	pub broker: Arc<dyn IdentityBroker>,
	/// Session token issuer.
	pub issuer: Arc<TokenIssuer>,
}
impl AppState {
	/// Bundles a broker and an issuer.
	pub fn new(broker: Arc<dyn IdentityBroker>, issuer: Arc<TokenIssuer>) -> Self {
		Self { broker, issuer }
	}
}
impl Debug for AppState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppState").field("issuer", &self.issuer).finish_non_exhaustive()
	}
}

/// Successful `/oauth` response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
	/// Compact HS256 session token.
	pub token: String,
}

/// Rejections produced by the `/oauth` handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum ApiError {
	/// No `code` query key at all.
	#[error("No code could be found")]
	MissingCode,
	/// The `code` key is repeated or blank.
	#[error("No valid code could be found")]
	InvalidCode,
	/// The provider accepted the code but the identity lacked required fields.
	#[error("Unauthorized")]
	Unauthorized,
	/// The provider rejected the exchange; carries its HTTP status when known.
	#[error("Upstream provider rejected the code")]
	Upstream(Option<u16>),
	/// The session token could not be signed.
	#[error("Session token could not be issued")]
	Signing,
}
impl ApiError {
	/// Status code sent to the client.
	pub fn status(&self) -> StatusCode {
		match self {
			ApiError::MissingCode | ApiError::InvalidCode => StatusCode::BAD_REQUEST,
			ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
			ApiError::Upstream(status) => status
				.and_then(|status| StatusCode::from_u16(status).ok())
				.unwrap_or(StatusCode::BAD_REQUEST),
			ApiError::Signing => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		match self {
			ApiError::MissingCode | ApiError::InvalidCode =>
				(self.status(), self.to_string()).into_response(),
			_ => self.status().into_response(),
		}
	}
}

/// Builds the router with CORS for the configured origins and HTTP tracing.
pub fn build_router(state: AppState, server: &ServerConfig) -> Result<Router> {
	let cors = CorsLayer::new()
		.allow_origin(AllowOrigin::list(server.allowed_origins()?))
		.allow_methods(AllowMethods::mirror_request())
		.allow_headers(AllowHeaders::mirror_request())
		.allow_credentials(true);

	Ok(Router::new()
		.route("/oauth", get(oauth_callback))
		.layer(cors)
		.layer(TraceLayer::new_for_http())
		.with_state(state))
}

/// Serves `router` on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
	axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await
}

/// `GET /oauth?code=...`
pub async fn oauth_callback(
	State(state): State<AppState>,
	RawQuery(query): RawQuery,
) -> Result<Json<TokenResponse>, ApiError> {
	let code = extract_code(query.as_deref())?;
	let brokered = state.broker.brokered_code_login(&code).await;

	if !brokered.success {
		return Err(ApiError::Upstream(brokered.http_error_code));
	}

	let claims = ClaimSet::from_identity(brokered.result.as_ref());

	if claims.is_empty() {
		return Err(ApiError::Unauthorized);
	}

	let token = state.issuer.issue(&claims).map_err(|err| {
		tracing::error!(error = %err, "Failed to sign the session token.");

		ApiError::Signing
	})?;

	Ok(Json(TokenResponse { token: token.into_string() }))
}

// Keys match case-insensitively; exactly one non-blank value is accepted.
fn extract_code(query: Option<&str>) -> Result<AuthorizationCode, ApiError> {
	let values = form_urlencoded::parse(query.unwrap_or_default().as_bytes())
		.filter(|(key, _)| key.eq_ignore_ascii_case("code"))
		.map(|(_, value)| value.into_owned())
		.collect::<Vec<_>>();

	match values.as_slice() {
		[] => Err(ApiError::MissingCode),
		[value] => AuthorizationCode::new(value.as_str()).map_err(|_| ApiError::InvalidCode),
		_ => Err(ApiError::InvalidCode),
	}
}

async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %err, "Failed to listen for the shutdown signal.");
	}

	tracing::info!("Shutting down.");
}

#[cfg(test)]
mod tests {
	// crates.io
	use axum::{
		body::{self, Body},
		http::{Method, Request, header},
	};
	use tower::ServiceExt;
	// self
	use super::*;
	use crate::{
		_preludet::{fake_state, sample_identity, test_token_issuer},
		auth::{BrokeredIdentity, ClaimKind},
	};

	async fn call(identity: BrokeredIdentity, uri: &str) -> (StatusCode, String, Vec<String>) {
		let (state, broker) = fake_state(identity);
		let router = build_router(state, &ServerConfig::default()).expect("Router should build.");
		let response = router
			.oneshot(Request::get(uri).body(Body::empty()).expect("Request should build."))
			.await
			.expect("Router should answer.");
		let status = response.status();
		let bytes =
			body::to_bytes(response.into_body(), usize::MAX).await.expect("Body should buffer.");

		(status, String::from_utf8_lossy(&bytes).into_owned(), broker.received_codes())
	}

	fn success() -> BrokeredIdentity {
		BrokeredIdentity::succeeded(Some(sample_identity()))
	}

	#[test]
	fn code_extraction_rules() {
		assert_eq!(extract_code(None), Err(ApiError::MissingCode));
		assert_eq!(extract_code(Some("state=1")), Err(ApiError::MissingCode));
		assert_eq!(extract_code(Some("code")), Err(ApiError::InvalidCode));
		assert_eq!(extract_code(Some("code=%20%20")), Err(ApiError::InvalidCode));
		assert_eq!(extract_code(Some("code=a&CODE=b")), Err(ApiError::InvalidCode));
		assert_eq!(
			extract_code(Some("state=1&Code=abc%2Bdef")).map(|code| code.as_str().to_owned()),
			Ok("abc+def".to_owned())
		);
	}

	#[tokio::test]
	async fn malformed_queries_never_reach_the_broker() {
		let (status, body, codes) = call(success(), "/oauth").await;

		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body, "No code could be found");
		assert!(codes.is_empty());

		let (status, body, codes) = call(success(), "/oauth?code=a&code=b").await;

		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body, "No valid code could be found");
		assert!(codes.is_empty());

		let (status, _, codes) = call(success(), "/oauth?code=%20").await;

		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert!(codes.is_empty());
	}

	#[tokio::test]
	async fn successful_exchange_returns_a_verifiable_token() {
		let (status, body, codes) = call(success(), "/oauth?CoDe=xyz").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(codes, vec!["xyz".to_owned()]);

		let response: TokenResponse = serde_json::from_str(&body).expect("Body should be JSON.");
		let claims = test_token_issuer().verify(&response.token).expect("Token should verify.");

		assert_eq!(claims.exp - claims.nbf, 600);
		assert_eq!(claims.claims.len(), 4);
		assert_eq!(claims.claims.get(ClaimKind::Upn), Some("user-123"));
		assert_eq!(claims.claims.get(ClaimKind::RefreshToken), Some("refresh-xyz"));
	}

	#[tokio::test]
	async fn empty_payload_is_unauthorized() {
		let (status, body, codes) =
			call(BrokeredIdentity::succeeded(None), "/oauth?code=abc").await;

		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert!(body.is_empty());
		assert_eq!(codes.len(), 1);
	}

	#[tokio::test]
	async fn broker_failures_pass_the_status_through() {
		let (status, body, _) = call(BrokeredIdentity::failed(Some(401)), "/oauth?code=abc").await;

		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert!(body.is_empty());

		let (status, _, _) = call(BrokeredIdentity::failed(None), "/oauth?code=abc").await;

		assert_eq!(status, StatusCode::BAD_REQUEST);
	}

	#[tokio::test]
	async fn cors_allows_configured_origins_with_credentials() {
		let (state, _) = fake_state(success());
		let router = build_router(state, &ServerConfig::default()).expect("Router should build.");
		let preflight = |origin: &'static str| {
			Request::builder()
				.method(Method::OPTIONS)
				.uri("/oauth")
				.header(header::ORIGIN, origin)
				.header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
				.header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
				.body(Body::empty())
				.expect("Request should build.")
		};
		let allowed = router
			.clone()
			.oneshot(preflight("http://127.0.0.1:5173"))
			.await
			.expect("Router should answer.");
		let denied =
			router.oneshot(preflight("http://evil.test")).await.expect("Router should answer.");

		assert_eq!(
			allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
			Some(&header::HeaderValue::from_static("http://127.0.0.1:5173"))
		);
		assert_eq!(
			allowed.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
			Some(&header::HeaderValue::from_static("true"))
		);
		assert!(denied.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
	}
}

#![cfg(feature = "reqwest")]

mod common;

// std
use std::sync::Arc;
// crates.io
use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use httpmock::prelude::*;
use tower::ServiceExt;
// self
use common::*;
use oauth2_token_bridge::{
	auth::ClaimKind,
	config::ServerConfig,
	issuer::{IssuerSettings, TokenIssuer},
	server::{self, AppState, TokenResponse},
	session::SessionStore,
};

const ISSUER: &str = "https://bridge.it";
const SECRET: &str = "integration-secret-long-enough-for-hs256";

fn issuer() -> TokenIssuer {
	TokenIssuer::new(IssuerSettings::new(ISSUER, SECRET)).expect("Token issuer should build.")
}

fn router(server: &MockServer) -> Router {
	let state = AppState::new(Arc::new(realm_broker(server)), Arc::new(issuer()));

	server::build_router(state, &ServerConfig::default()).expect("Router should build.")
}

async fn get(router: Router, uri: &str) -> (StatusCode, Vec<u8>) {
	let response = router
		.oneshot(Request::get(uri).body(Body::empty()).expect("Request should build."))
		.await
		.expect("Router should answer.");
	let status = response.status();
	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("Body should buffer.");

	(status, bytes.to_vec())
}

#[tokio::test]
async fn callback_mints_a_session_token_for_the_realm_user() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("access-e2e", Some("refresh-e2e")));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO_PATH).header("authorization", "Bearer access-e2e");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"sub\":\"user-e2e\",\"email\":\"e2e@example.com\"}");
		})
		.await;

	let (status, body) = get(router(&server), "/oauth?code=fresh-code&session_state=s").await;

	assert_eq!(status, StatusCode::OK);

	let response: TokenResponse = serde_json::from_slice(&body).expect("Body should be JSON.");
	let claims = issuer().verify(&response.token).expect("Token should verify.");

	assert_eq!(claims.iss, ISSUER);
	assert_eq!(claims.exp - claims.nbf, 600);
	assert_eq!(claims.claims.get(ClaimKind::NameIdentifier), Some("user-e2e"));
	assert_eq!(claims.claims.get(ClaimKind::Upn), Some("user-e2e"));
	assert_eq!(claims.claims.get(ClaimKind::Email), Some("e2e@example.com"));
	assert_eq!(claims.claims.get(ClaimKind::RefreshToken), Some("refresh-e2e"));

	let mut session = SessionStore::new();

	session.login(response.token.clone()).expect("Fresh session should accept the token.");

	assert!(session.is_logged_in());
	assert_eq!(session.jwt_token(), response.token);
}

#[tokio::test]
async fn callback_passes_realm_rejections_through() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\"}");
		})
		.await;

	let (status, body) = get(router(&server), "/oauth?code=any").await;

	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert!(body.is_empty());
}

#[tokio::test]
async fn callback_rejects_incomplete_profiles() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("access-e2e", None));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"sub\":\"user-e2e\",\"email\":\"e2e@example.com\"}");
		})
		.await;

	let (status, _) = get(router(&server), "/oauth?code=any").await;

	assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn callback_without_a_code_never_calls_the_realm() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(500);
		})
		.await;
	let (status, body) = get(router(&server), "/oauth?state=only").await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, b"No code could be found");
	assert_eq!(token.calls_async().await, 0);
}

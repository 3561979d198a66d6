//! Mock Keycloak realm shared by the integration tests.

#![allow(dead_code)]

// crates.io
use httpmock::prelude::*;
use url::Url;
// self
use oauth2_token_bridge::{
	auth::ProviderId,
	broker::ReqwestKeycloakBroker,
	provider::ProviderDescriptor,
};

pub const REALM: &str = "demo";
pub const CLIENT_ID: &str = "frontend";
pub const CLIENT_SECRET: &str = "client-secret";
pub const TOKEN_PATH: &str = "/realms/demo/protocol/openid-connect/token";
pub const USERINFO_PATH: &str = "/realms/demo/protocol/openid-connect/userinfo";

/// Realm descriptor rooted at the mock server.
pub fn realm_descriptor(server: &MockServer) -> ProviderDescriptor {
	let base_url = Url::parse(&server.base_url()).expect("Mock base URL should parse.");
	let id = ProviderId::new("keycloak").expect("Provider identifier should be valid.");

	ProviderDescriptor::keycloak(id, &base_url, REALM).expect("Realm descriptor should build.")
}

/// Confidential reqwest broker pointed at the mock realm.
pub fn realm_broker(server: &MockServer) -> ReqwestKeycloakBroker {
	ReqwestKeycloakBroker::new(realm_descriptor(server), CLIENT_ID)
		.with_client_secret(CLIENT_SECRET)
		.with_redirect_uri(
			Url::parse("http://127.0.0.1:5173/callback").expect("Redirect URI should parse."),
		)
}

/// JSON body of a token endpoint success.
pub fn token_body(access_token: &str, refresh_token: Option<&str>) -> String {
	let mut body = serde_json::json!({
		"access_token": access_token,
		"token_type": "Bearer",
		"expires_in": 300,
	});

	if let Some(refresh_token) = refresh_token {
		body["refresh_token"] = refresh_token.into();
	}

	body.to_string()
}

//! Provider descriptor data structures.
//!
//! A descriptor is normally derived from a Keycloak base URL and realm name via
//! [`ProviderDescriptor::keycloak`]; the builder remains available for providers that publish
//! their endpoints elsewhere.

/// Builder API for assembling provider descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, RealmId},
};

/// Preferred client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the frontend sends users to.
	pub authorization: Url,
	/// Token endpoint used for the code exchange.
	pub token: Url,
	/// OIDC userinfo endpoint used to resolve the user profile.
	pub userinfo: Url,
}

/// Immutable provider descriptor consumed by the broker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier.
	pub id: ProviderId,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Preferred client authentication mechanism.
	pub preferred_client_auth_method: ClientAuthMethod,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Derives the OpenID Connect endpoints of a Keycloak realm.
	///
	/// `base` is the Keycloak root (for example `https://sso.example.com` or
	/// `https://sso.example.com/auth` on legacy deployments).
	pub fn keycloak(
		id: ProviderId,
		base: &Url,
		realm: &str,
	) -> Result<Self, ProviderDescriptorError> {
		let realm = RealmId::new(realm)?;
		let endpoint = |name: &str| realm_endpoint(base, &realm, name);

		Self::builder(id)
			.authorization_endpoint(endpoint("auth")?)
			.token_endpoint(endpoint("token")?)
			.userinfo_endpoint(endpoint("userinfo")?)
			.build()
	}
}

fn realm_endpoint(base: &Url, realm: &RealmId, name: &str) -> Result<Url, ProviderDescriptorError> {
	let mut url = base.clone();

	url.path_segments_mut()
		.map_err(|_| ProviderDescriptorError::OpaqueBaseUrl { url: base.to_string() })?
		.pop_if_empty()
		.extend(["realms", realm.as_ref(), "protocol", "openid-connect", name]);

	Ok(url)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn provider_id() -> ProviderId {
		ProviderId::new("keycloak").expect("Provider identifier fixture should be valid.")
	}

	#[test]
	fn keycloak_endpoints_follow_realm_layout() {
		let base = Url::parse("https://sso.example.com/auth/").expect("Base URL should parse.");
		let descriptor = ProviderDescriptor::keycloak(provider_id(), &base, "demo")
			.expect("Keycloak descriptor should build.");

		assert_eq!(
			descriptor.endpoints.token.as_str(),
			"https://sso.example.com/auth/realms/demo/protocol/openid-connect/token"
		);
		assert_eq!(
			descriptor.endpoints.userinfo.as_str(),
			"https://sso.example.com/auth/realms/demo/protocol/openid-connect/userinfo"
		);
		assert_eq!(
			descriptor.endpoints.authorization.as_str(),
			"https://sso.example.com/auth/realms/demo/protocol/openid-connect/auth"
		);
		assert_eq!(descriptor.preferred_client_auth_method, ClientAuthMethod::ClientSecretBasic);
	}

	#[test]
	fn keycloak_rejects_bad_realms_and_plain_http_hosts() {
		let base = Url::parse("https://sso.example.com").expect("Base URL should parse.");

		assert!(matches!(
			ProviderDescriptor::keycloak(provider_id(), &base, "a/b"),
			Err(ProviderDescriptorError::InvalidRealm(_))
		));
		assert!(matches!(
			ProviderDescriptor::keycloak(provider_id(), &base, ".."),
			Err(ProviderDescriptorError::InvalidRealm(_))
		));

		let insecure = Url::parse("http://sso.example.com").expect("Base URL should parse.");

		assert!(matches!(
			ProviderDescriptor::keycloak(provider_id(), &insecure, "demo"),
			Err(ProviderDescriptorError::InsecureEndpoint { endpoint: "authorization", .. })
		));

		let loopback = Url::parse("http://127.0.0.1:8080").expect("Base URL should parse.");

		assert!(ProviderDescriptor::keycloak(provider_id(), &loopback, "demo").is_ok());
	}
}

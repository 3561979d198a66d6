//! Result of a brokered authorization-code login.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Profile fields resolved for the authenticated user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokeredUser {
	/// Provider-side user identifier (the OIDC `sub`).
	pub id: String,
	/// Primary e-mail address.
	pub email: String,
}

/// Tokens minted by the provider during the exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokeredTokens {
	/// Provider access token; only used to resolve the user profile.
	pub access_token: TokenSecret,
	/// Provider refresh token, embedded into the session token.
	pub refresh_token: TokenSecret,
	/// Access-token lifetime reported by the provider.
	pub expires_in: Option<Duration>,
}

/// Fully populated identity payload returned by a successful exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenizedIdentity {
	/// Resolved user profile.
	pub user: BrokeredUser,
	/// Tokens minted by the provider.
	pub token: BrokeredTokens,
}
impl TokenizedIdentity {
	/// Assembles an identity from its raw parts.
	pub fn new(
		user_id: impl Into<String>,
		email: impl Into<String>,
		access_token: impl Into<String>,
		refresh_token: impl Into<String>,
	) -> Self {
		Self {
			user: BrokeredUser { id: user_id.into(), email: email.into() },
			token: BrokeredTokens {
				access_token: TokenSecret::new(access_token),
				refresh_token: TokenSecret::new(refresh_token),
				expires_in: None,
			},
		}
	}
}

/// Outcome of [`IdentityBroker::brokered_code_login`](crate::broker::IdentityBroker).
///
/// A success may still carry no payload when the provider omitted a required field; callers
/// treat that as an authorization failure rather than a broker failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokeredIdentity {
	/// Whether the provider accepted the code.
	pub success: bool,
	/// HTTP status reported by the provider on failure.
	pub http_error_code: Option<u16>,
	/// Identity payload on success.
	pub result: Option<TokenizedIdentity>,
}
impl BrokeredIdentity {
	/// Successful exchange, with or without a usable payload.
	pub fn succeeded(result: Option<TokenizedIdentity>) -> Self {
		Self { success: true, http_error_code: None, result }
	}

	/// Failed exchange carrying the provider's HTTP status, if one was observed.
	pub fn failed(http_error_code: Option<u16>) -> Self {
		Self { success: false, http_error_code, result: None }
	}

	/// Converts a bridge error into a failure, keeping only upstream error statuses (>= 400).
	pub fn from_error(err: &Error) -> Self {
		Self::failed(err.http_status().filter(|status| *status >= 400))
	}
}

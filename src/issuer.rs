//! HS256 session tokens minted from a [`ClaimSet`].
//!
//! Tokens carry `iss`, `nbf`, and `exp` next to the four session claims and never an audience.
//! They are valid for ten minutes from the moment of issuance.

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
// self
use crate::{
	_prelude::*,
	auth::{ClaimSet, TokenSecret},
	error::ConfigError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Fixed validity window of every session token.
pub const SESSION_TOKEN_LIFETIME: Duration = Duration::minutes(10);

/// Issuer name and signing key.
#[derive(Clone, Debug)]
pub struct IssuerSettings {
	/// Value written to the `iss` claim and required on verification.
	pub issuer: String,
	/// Shared HMAC secret.
	pub secret: TokenSecret,
}
impl IssuerSettings {
	/// Pairs an issuer name with its signing secret.
	pub fn new(issuer: impl Into<String>, secret: impl Into<String>) -> Self {
		Self { issuer: issuer.into(), secret: TokenSecret::new(secret) }
	}
}

/// Decoded payload of a session token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
	/// Token issuer.
	pub iss: String,
	/// Not-before, in seconds since the Unix epoch.
	pub nbf: i64,
	/// Expiry, in seconds since the Unix epoch.
	pub exp: i64,
	/// Session claims.
	#[serde(flatten)]
	pub claims: ClaimSet,
}

/// Signed compact JWT plus its validity window.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
	token: String,
	/// Start of validity.
	pub not_before: OffsetDateTime,
	/// End of validity.
	pub expires_at: OffsetDateTime,
}
impl SessionToken {
	/// Compact serialization.
	pub fn as_str(&self) -> &str {
		&self.token
	}

	/// Consumes the token, returning the compact serialization.
	pub fn into_string(self) -> String {
		self.token
	}
}
impl Debug for SessionToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionToken")
			.field("token", &"<redacted>")
			.field("not_before", &self.not_before)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Signs and verifies session tokens with a shared secret.
pub struct TokenIssuer {
	issuer: String,
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
}
impl TokenIssuer {
	/// Builds an issuer, rejecting blank issuer names and secrets.
	pub fn new(settings: IssuerSettings) -> Result<Self> {
		if settings.issuer.trim().is_empty() {
			return Err(ConfigError::MissingSetting { key: "jwt.issuer" }.into());
		}
		if settings.secret.is_blank() {
			return Err(ConfigError::MissingSetting { key: "jwt.secret" }.into());
		}

		let secret = settings.secret.expose().as_bytes();

		Ok(Self {
			issuer: settings.issuer,
			encoding_key: EncodingKey::from_secret(secret),
			decoding_key: DecodingKey::from_secret(secret),
		})
	}

	/// Issuer name written into every token.
	pub fn issuer(&self) -> &str {
		&self.issuer
	}

	/// Signs `claims` into a token valid from now for [`SESSION_TOKEN_LIFETIME`].
	pub fn issue(&self, claims: &ClaimSet) -> Result<SessionToken> {
		self.issue_at(claims, OffsetDateTime::now_utc())
	}

	/// Signs `claims` into a token valid from `now`.
	pub fn issue_at(&self, claims: &ClaimSet, now: OffsetDateTime) -> Result<SessionToken> {
		const KIND: FlowKind = FlowKind::SessionToken;

		let _guard = FlowSpan::new(KIND, "issue").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let expires_at = now + SESSION_TOKEN_LIFETIME;
		let payload = SessionClaims {
			iss: self.issuer.clone(),
			nbf: now.unix_timestamp(),
			exp: expires_at.unix_timestamp(),
			claims: claims.clone(),
		};
		let signed =
			jsonwebtoken::encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key);

		obs::record_flow_outcome(KIND, FlowOutcome::from_success(signed.is_ok()));

		Ok(SessionToken { token: signed?, not_before: now, expires_at })
	}

	/// Verifies signature, issuer, `nbf`, and `exp`, returning the decoded payload.
	///
	/// Audiences are not checked; tokens never carry one.
	pub fn verify(&self, token: &str) -> Result<SessionClaims> {
		let mut validation = Validation::new(Algorithm::HS256);

		validation.set_issuer(&[self.issuer.as_str()]);
		validation.set_required_spec_claims(&["exp", "nbf", "iss"]);
		validation.validate_nbf = true;
		validation.validate_aud = false;

		Ok(jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)?.claims)
	}
}
impl Debug for TokenIssuer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenIssuer").field("issuer", &self.issuer).finish_non_exhaustive()
	}
}

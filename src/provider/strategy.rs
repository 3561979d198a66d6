//! Provider strategy hooks that customize the code exchange.
//!
//! Implementations decorate the outgoing token request and normalize error mapping without tying
//! the broker to any particular HTTP client.

// self
use crate::_prelude::*;

/// Strategy hook that allows providers to decorate requests and classify errors.
///
/// Hooks use crate-owned data only so implementations never depend on reqwest structures.
/// `augment_code_exchange` defaults to a no-op.
pub trait ProviderStrategy: Send + Sync {
	/// Maps a failed token endpoint response onto the bridge error taxonomy.
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;

	/// Adds provider-specific form parameters (audience, resource) to the code exchange.
	fn augment_code_exchange(&self, _form: &mut BTreeMap<String, String>) {}
}

/// Canonical provider error categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// Provider rejected the authorization code (expired, reused, wrong redirect).
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Failure is temporary; the caller may try a new login.
	Transient,
}

/// Primitive view of a failed token endpoint response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// Provider-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Provider-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth `error` code returned by the provider.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a truncated body preview.
	pub fn with_body_preview(mut self, body: impl AsRef<str>) -> Self {
		let body = body.as_ref();
		let mut preview = body.chars().take(Self::BODY_PREVIEW_LIMIT).collect::<String>();

		if preview.len() < body.len() {
			preview.push('…');
		}

		self.body_preview = Some(preview);

		self
	}

	/// Best human-readable reason available, falling back to `fallback`.
	pub fn reason(&self, fallback: &str) -> String {
		self.error_description
			.as_deref()
			.or(self.oauth_error.as_deref())
			.or(self.body_preview.as_deref())
			.unwrap_or(fallback)
			.to_owned()
	}
}

/// Default strategy that applies RFC 6749 heuristics.
///
/// Structured OAuth fields win over body text, which wins over the HTTP status. Keycloak reports a bad secret as `unauthorized_client` with HTTP 401 and
/// a used or expired code as `invalid_grant` with HTTP 400, both of which land here.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		ctx.oauth_error
			.as_deref()
			.and_then(classify_error_code)
			.or_else(|| ctx.error_description.as_deref().and_then(classify_text))
			.or_else(|| ctx.body_preview.as_deref().and_then(classify_text))
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

fn classify_error_code(code: &str) -> Option<ProviderErrorKind> {
	const INVALID_GRANT: [&str; 3] = ["invalid_grant", "access_denied", "invalid_request"];
	const INVALID_CLIENT: [&str; 2] = ["invalid_client", "unauthorized_client"];
	const TRANSIENT: [&str; 2] = ["temporarily_unavailable", "server_error"];

	let matches = |set: &[&str]| set.iter().any(|known| code.eq_ignore_ascii_case(known));

	if matches(&INVALID_GRANT) {
		Some(ProviderErrorKind::InvalidGrant)
	} else if matches(&INVALID_CLIENT) {
		Some(ProviderErrorKind::InvalidClient)
	} else if matches(&TRANSIENT) {
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_text(text: &str) -> Option<ProviderErrorKind> {
	let lowered = text.to_ascii_lowercase();

	if lowered.contains("invalid_grant") || lowered.contains("code not valid") {
		Some(ProviderErrorKind::InvalidGrant)
	} else if lowered.contains("invalid_client") || lowered.contains("client secret") {
		Some(ProviderErrorKind::InvalidClient)
	} else if lowered.contains("temporarily_unavailable") {
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401 | 403) => ProviderErrorKind::InvalidClient,
		_ => ProviderErrorKind::Transient,
	}
}

//! Authorization code received on the OAuth callback.

// self
use crate::_prelude::*;

/// Validation failures for an inbound authorization code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum CodeError {
	/// The code was empty or whitespace only.
	#[error("Authorization code cannot be blank.")]
	Blank,
}

/// Opaque, single-use authorization code issued by the identity provider.
///
/// The value is forwarded untouched; only blank codes are rejected. Whether a code was already
/// redeemed is for the provider to decide.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationCode(String);
impl AuthorizationCode {
	/// Validates and wraps a raw code.
	pub fn new(value: impl Into<String>) -> Result<Self, CodeError> {
		let value = value.into();

		if value.trim().is_empty() {
			return Err(CodeError::Blank);
		}

		Ok(Self(value))
	}

	/// Raw code as received.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl FromStr for AuthorizationCode {
	type Err = CodeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Display for AuthorizationCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl Debug for AuthorizationCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AuthorizationCode").field(&"<redacted>").finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn blank_codes_are_rejected() {
		assert_eq!(AuthorizationCode::new(""), Err(CodeError::Blank));
		assert_eq!(AuthorizationCode::new("  \n\t"), Err(CodeError::Blank));
	}

	#[test]
	fn codes_are_forwarded_verbatim() {
		let code = AuthorizationCode::new(" abc.def ").expect("Padded code should be accepted.");

		assert_eq!(code.as_str(), " abc.def ");
		assert_eq!(format!("{code:?}"), "AuthorizationCode(\"<redacted>\")");
	}
}

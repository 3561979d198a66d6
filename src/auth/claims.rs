//! Fixed claim set embedded into issued session tokens.

// std
use std::slice::Iter;
// crates.io
use serde::ser::SerializeMap;
use serde_json::Value;
// self
use crate::{_prelude::*, auth::TokenizedIdentity};

/// Claim type of the provider refresh token carried inside the session token.
pub const REFRESH_TOKEN_CLAIM: &str = "urn:oauth2-token-bridge:claims:refresh_token";

/// Claim kinds carried by a session token, in emission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClaimKind {
	/// Central unique identifier of the subject.
	NameIdentifier,
	/// User principal name; holds the provider user id.
	Upn,
	/// E-mail address.
	Email,
	/// Provider refresh token.
	RefreshToken,
}
impl ClaimKind {
	/// Every kind, in emission order.
	pub const ALL: [ClaimKind; 4] =
		[ClaimKind::NameIdentifier, ClaimKind::Upn, ClaimKind::Email, ClaimKind::RefreshToken];

	/// JWT payload key for the claim.
	pub const fn as_str(self) -> &'static str {
		match self {
			ClaimKind::NameIdentifier => "nameid",
			ClaimKind::Upn => "upn",
			ClaimKind::Email => "email",
			ClaimKind::RefreshToken => REFRESH_TOKEN_CLAIM,
		}
	}
}
impl Display for ClaimKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Single named attribute of a session token.
#[derive(Clone, PartialEq, Eq)]
pub struct Claim {
	/// Claim type.
	pub kind: ClaimKind,
	/// Claim value.
	pub value: String,
}
impl Claim {
	/// Pairs a kind with its value.
	pub fn new(kind: ClaimKind, value: impl Into<String>) -> Self {
		Self { kind, value: value.into() }
	}
}
impl Debug for Claim {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let value = match self.kind {
			ClaimKind::RefreshToken => "<redacted>",
			_ => self.value.as_str(),
		};

		f.debug_struct("Claim").field("kind", &self.kind).field("value", &value).finish()
	}
}

/// Ordered claim collection built once per successful exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, Value>")]
pub struct ClaimSet {
	claims: Vec<Claim>,
}
impl ClaimSet {
	/// Maps a brokered identity onto the four session claims.
	///
	/// A missing identity yields an empty set, which callers must reject.
	pub fn from_identity(identity: Option<&TokenizedIdentity>) -> Self {
		let Some(identity) = identity else {
			return Self::default();
		};

		Self {
			claims: vec![
				Claim::new(ClaimKind::NameIdentifier, &identity.user.id),
				Claim::new(ClaimKind::Upn, &identity.user.id),
				Claim::new(ClaimKind::Email, &identity.user.email),
				Claim::new(ClaimKind::RefreshToken, identity.token.refresh_token.expose()),
			],
		}
	}

	/// True when no claims were mapped.
	pub fn is_empty(&self) -> bool {
		self.claims.is_empty()
	}

	/// Number of claims.
	pub fn len(&self) -> usize {
		self.claims.len()
	}

	/// Iterates claims in emission order.
	pub fn iter(&self) -> Iter<'_, Claim> {
		self.claims.iter()
	}

	/// Looks up the value for a claim kind.
	pub fn get(&self, kind: ClaimKind) -> Option<&str> {
		self.claims.iter().find(|claim| claim.kind == kind).map(|claim| claim.value.as_str())
	}
}
impl<'a> IntoIterator for &'a ClaimSet {
	type IntoIter = Iter<'a, Claim>;
	type Item = &'a Claim;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}
impl Serialize for ClaimSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		let mut map = serializer.serialize_map(Some(self.claims.len()))?;

		for claim in &self.claims {
			map.serialize_entry(claim.kind.as_str(), &claim.value)?;
		}

		map.end()
	}
}
impl TryFrom<BTreeMap<String, Value>> for ClaimSet {
	type Error = ClaimSetError;

	// Keys outside the four session claims (registered JWT claims, foreign claims) are ignored.
	fn try_from(raw: BTreeMap<String, Value>) -> Result<Self, Self::Error> {
		let mut claims = Vec::with_capacity(ClaimKind::ALL.len());

		for kind in ClaimKind::ALL {
			match raw.get(kind.as_str()) {
				Some(Value::String(value)) => claims.push(Claim::new(kind, value.as_str())),
				Some(_) => return Err(ClaimSetError::NotAString { claim: kind.as_str() }),
				None => {},
			}
		}

		Ok(Self { claims })
	}
}

/// Errors raised while decoding a claim set from a token payload.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClaimSetError {
	/// A known claim carried a non-string value.
	#[error("Claim `{claim}` must be a string.")]
	NotAString {
		/// Offending claim key.
		claim: &'static str,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn identity() -> TokenizedIdentity {
		TokenizedIdentity::new("f3a1-user", "ada@example.com", "access", "refresh-1")
	}

	#[test]
	fn identity_maps_to_four_ordered_claims() {
		let claims = ClaimSet::from_identity(Some(&identity()));
		let kinds = claims.iter().map(|claim| claim.kind).collect::<Vec<_>>();

		assert_eq!(kinds, ClaimKind::ALL);
		assert_eq!(claims.get(ClaimKind::NameIdentifier), Some("f3a1-user"));
		assert_eq!(claims.get(ClaimKind::Upn), Some("f3a1-user"));
		assert_eq!(claims.get(ClaimKind::Email), Some("ada@example.com"));
		assert_eq!(claims.get(ClaimKind::RefreshToken), Some("refresh-1"));
	}

	#[test]
	fn missing_identity_maps_to_empty_set() {
		let claims = ClaimSet::from_identity(None);

		assert!(claims.is_empty());
		assert_eq!(claims.len(), 0);
	}

	#[test]
	fn serializes_as_flat_object_and_reads_back_ignoring_foreign_keys() {
		let claims = ClaimSet::from_identity(Some(&identity()));
		let mut value = serde_json::to_value(&claims).expect("Claims should serialize.");

		assert_eq!(value["nameid"], "f3a1-user");
		assert_eq!(value[REFRESH_TOKEN_CLAIM], "refresh-1");

		value["iss"] = Value::from("https://issuer.test");
		value["exp"] = Value::from(1_700_000_000_i64);

		let decoded: ClaimSet = serde_json::from_value(value).expect("Claims should deserialize.");

		assert_eq!(decoded, claims);
	}

	#[test]
	fn non_string_claim_values_are_rejected() {
		let payload = serde_json::json!({ "upn": 42 });

		assert!(serde_json::from_value::<ClaimSet>(payload).is_err());
	}

	#[test]
	fn debug_redacts_refresh_token() {
		let claims = ClaimSet::from_identity(Some(&identity()));

		assert!(!format!("{claims:?}").contains("refresh-1"));
	}
}

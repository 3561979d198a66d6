//! Strongly typed identifiers for provider descriptors and Keycloak realms.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (provider, realm).
		kind: &'static str,
	},
	/// The identifier cannot stand as a URL path segment (whitespace, separators, dot segments).
	#[error("{kind} identifier contains whitespace, a path separator, or is a dot segment.")]
	InvalidCharacter {
		/// Kind of identifier (provider, realm).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (provider, realm).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { ProviderId, "Identifier for an identity provider descriptor.", "Provider" }
def_id! { RealmId, "Keycloak realm name, used as a path segment of every realm endpoint.", "Realm" }

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if matches!(view, "." | "..")
		|| view.chars().any(|ch| ch.is_whitespace() || ch == '/' || ch == '?' || ch == '#')
	{
		return Err(IdentifierError::InvalidCharacter { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn realm_names_reject_path_breaking_characters() {
		assert!(RealmId::new("master").is_ok());
		assert!(RealmId::new("").is_err());
		assert!(RealmId::new("demo realm").is_err());
		assert!(RealmId::new("demo/../admin").is_err());
		assert!(RealmId::new("demo?x=1").is_err());
		assert!(RealmId::new(".").is_err());
		assert!(RealmId::new("..").is_err());
		assert!(RealmId::new("demo.v2").is_ok());
		assert!(ProviderId::new("a".repeat(IDENTIFIER_MAX_LEN + 1)).is_err());
	}

	#[test]
	fn serde_enforces_validation() {
		let realm: RealmId =
			serde_json::from_str("\"demo\"").expect("Realm should deserialize successfully.");

		assert_eq!(realm.as_ref(), "demo");
		assert!(serde_json::from_str::<RealmId>("\"with space\"").is_err());
	}
}

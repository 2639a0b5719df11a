//! Strongly typed identifiers enforced across the credential domain.

// std
use std::{borrow::Borrow, num::NonZeroU64, ops::Deref};
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

macro_rules! def_row_id {
	($name:ident, $doc:literal) => {
		#[doc = $doc]
		#[derive(
			Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
		)]
		#[serde(transparent)]
		pub struct $name(pub u64);
		impl $name {
			/// Returns the raw row identifier.
			pub const fn get(self) -> u64 {
				self.0
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				Display::fmt(&self.0, f)
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
		/// Kind of identifier (consumer key, token).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (consumer key, token).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (consumer key, token).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// User identifiers must be positive.
	#[error("User identifier must be positive.")]
	NonPositiveUser,
}

def_id! { ConsumerKey, "Public key identifying a registered consumer application.", "ConsumerKey" }
def_id! { TokenValue, "Public value of a request or access token.", "Token" }

def_row_id! { ConsumerId, "Numeric row identifier of a consumer." }
def_row_id! { TokenId, "Numeric row identifier of a request or access token." }

/// Resolved identifier of an authenticated user; always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(NonZeroU64);
impl UserId {
	/// Creates a user identifier, rejecting zero.
	pub fn new(value: u64) -> Result<Self, IdentifierError> {
		NonZeroU64::new(value).map(Self).ok_or(IdentifierError::NonPositiveUser)
	}

	/// Returns the raw identifier.
	pub const fn get(self) -> u64 {
		self.0.get()
	}
}
impl Display for UserId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		Display::fmt(&self.0, f)
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
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
	fn identifiers_reject_whitespace_and_empty_values() {
		assert!(ConsumerKey::new(" c1").is_err(), "Leading whitespace must be rejected.");
		assert!(ConsumerKey::new("c1 ").is_err(), "Trailing whitespace must be rejected.");
		assert!(TokenValue::new("").is_err());

		let key = ConsumerKey::new("c1").expect("Consumer key fixture should be valid.");

		assert_eq!(key.as_ref(), "c1");
		assert_eq!(format!("{key:?}"), "ConsumerKey(c1)");
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let key: ConsumerKey =
			serde_json::from_str("\"key-42\"").expect("Consumer key should deserialize.");

		assert_eq!(key.as_ref(), "key-42");
		assert!(serde_json::from_str::<TokenValue>("\"with space\"").is_err());
	}

	#[test]
	fn length_limit_is_inclusive() {
		TokenValue::new("a".repeat(IDENTIFIER_MAX_LEN)).expect("Exact length should succeed.");

		assert!(TokenValue::new("a".repeat(IDENTIFIER_MAX_LEN + 1)).is_err());
	}

	#[test]
	fn user_ids_must_be_positive() {
		assert_eq!(UserId::new(0), Err(IdentifierError::NonPositiveUser));
		assert_eq!(UserId::new(7).expect("Positive user id should be valid.").get(), 7);
		assert!(serde_json::from_str::<UserId>("0").is_err());
	}

	#[test]
	fn borrow_supports_str_lookup() {
		let map: HashMap<ConsumerKey, u8> = HashMap::from_iter([(
			ConsumerKey::new("c1").expect("Consumer key used for lookup should be valid."),
			3_u8,
		)]);

		assert_eq!(map.get("c1"), Some(&3));
	}
}

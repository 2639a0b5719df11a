//! Replay-prevention markers scoped to exactly one token.

// self
use crate::{
	_prelude::*,
	auth::{ConsumerId, TokenId},
};

/// Identifies one request or access token; scopes nonce records and token-level store operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum TokenScope {
	/// Request token row.
	RequestToken(TokenId),
	/// Access token row.
	AccessToken(TokenId),
}

/// Unique `(consumer, scope, nonce)` tuple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonceRecord {
	/// Consumer that submitted the nonce.
	pub consumer_id: ConsumerId,
	/// Owning token.
	pub scope: TokenScope,
	/// Submitted nonce value, stored verbatim.
	pub nonce: String,
}
impl NonceRecord {
	/// Builds a record for the provided tuple.
	pub fn new(consumer_id: ConsumerId, scope: TokenScope, nonce: impl Into<String>) -> Self {
		Self { consumer_id, scope, nonce: nonce.into() }
	}
}

/// Result of an insert-if-absent nonce write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonceInsert {
	/// The tuple was unseen and is now recorded.
	Recorded,
	/// The tuple already existed; the call is a replay.
	Replayed,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn scopes_distinguish_token_kinds() {
		let request = NonceRecord::new(ConsumerId(1), TokenScope::RequestToken(TokenId(5)), "n");
		let access = NonceRecord::new(ConsumerId(1), TokenScope::AccessToken(TokenId(5)), "n");

		assert_ne!(request, access);
		assert_eq!(
			serde_json::to_string(&request.scope).expect("Token scope should serialize."),
			r#"{"kind":"request_token","id":5}"#
		);
	}
}

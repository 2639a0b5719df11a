//! Short-lived request tokens used during the authorization handshake.

// self
use crate::{
	_prelude::*,
	auth::{ConsumerKey, Secret, TokenId, TokenValue, UserId, token},
};

/// Lifecycle position of a request token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestTokenStatus {
	/// Issued, no user has authenticated against it yet.
	Pending,
	/// A user is bound but no verification code has been issued.
	Authenticated,
	/// User bound and verification code issued; may be exchanged for an access token.
	ReadyForExchange,
}

/// Persisted request token row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestToken {
	/// Row identifier; scopes nonce records.
	pub id: TokenId,
	/// Key of the consumer that owns the token.
	pub consumer_key: ConsumerKey,
	/// Public token value.
	pub token: TokenValue,
	/// Token secret shared with the consumer.
	pub secret: Secret,
	/// Issue instant; expiry is measured from here.
	pub created_at: OffsetDateTime,
	/// User bound by a successful authentication.
	pub user_id: Option<UserId>,
	/// Single active verification code.
	pub verifier: Option<Secret>,
}
impl RequestToken {
	/// Computes the handshake position of the token.
	pub fn status(&self) -> RequestTokenStatus {
		match (self.user_id, self.verifier.as_ref()) {
			(Some(_), Some(_)) => RequestTokenStatus::ReadyForExchange,
			(Some(_), None) => RequestTokenStatus::Authenticated,
			(None, _) => RequestTokenStatus::Pending,
		}
	}

	/// Returns `true` when both a user and a verification code are bound.
	pub fn is_ready_for_exchange(&self) -> bool {
		matches!(self.status(), RequestTokenStatus::ReadyForExchange)
	}

	/// Returns `true` if more than `timeout` has passed since issuance.
	pub fn is_stale_at(&self, now: OffsetDateTime, timeout: Duration) -> bool {
		token::elapsed_beyond(self.created_at, now, timeout)
	}
}

/// Insertion payload for a request token; the store assigns the row id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequestToken {
	/// Key of the owning consumer.
	pub consumer_key: ConsumerKey,
	/// Public token value.
	pub token: TokenValue,
	/// Token secret.
	pub secret: Secret,
	/// Issue instant.
	pub created_at: OffsetDateTime,
}
impl NewRequestToken {
	/// Materializes the row once the store has assigned an id.
	pub fn into_row(self, id: TokenId) -> RequestToken {
		RequestToken {
			id,
			consumer_key: self.consumer_key,
			token: self.token,
			secret: self.secret,
			created_at: self.created_at,
			user_id: None,
			verifier: None,
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn fixture() -> RequestToken {
		NewRequestToken {
			consumer_key: ConsumerKey::new("c1").expect("Consumer key fixture should be valid."),
			token: TokenValue::new("rt1").expect("Token fixture should be valid."),
			secret: Secret::new("rts1"),
			created_at: macros::datetime!(2025-01-01 00:00 UTC),
		}
		.into_row(TokenId(1))
	}

	#[test]
	fn status_follows_user_then_verifier() {
		let mut token = fixture();

		assert_eq!(token.status(), RequestTokenStatus::Pending);

		token.verifier = Some(Secret::new("orphan"));

		assert_eq!(token.status(), RequestTokenStatus::Pending);

		token.verifier = None;
		token.user_id = Some(UserId::new(9).expect("User fixture should be valid."));

		assert_eq!(token.status(), RequestTokenStatus::Authenticated);
		assert!(!token.is_ready_for_exchange());

		token.verifier = Some(Secret::new("v1"));

		assert!(token.is_ready_for_exchange());
	}

	#[test]
	fn staleness_is_strictly_greater_than_timeout() {
		let token = fixture();
		let timeout = Duration::seconds(86_400);

		assert!(!token.is_stale_at(macros::datetime!(2025-01-02 00:00 UTC), timeout));
		assert!(token.is_stale_at(macros::datetime!(2025-01-02 00:00:01 UTC), timeout));
	}
}

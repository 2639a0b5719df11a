//! Long-lived access tokens with sliding expiry.

// self
use crate::{
	_prelude::*,
	auth::{ConsumerKey, Secret, TokenId, TokenValue, UserId, token},
};

/// Persisted access token row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	/// Row identifier; scopes nonce records.
	pub id: TokenId,
	/// Key of the consumer that owns the token.
	pub consumer_key: ConsumerKey,
	/// Public token value.
	pub token: TokenValue,
	/// Token secret shared with the consumer.
	pub secret: Secret,
	/// User on whose behalf the token grants access.
	pub user_id: UserId,
	/// Creation instant, refreshed on every validated use.
	pub last_used_at: OffsetDateTime,
}
impl AccessToken {
	/// Returns `true` if the token went unused for longer than `timeout`.
	pub fn is_stale_at(&self, now: OffsetDateTime, timeout: Duration) -> bool {
		token::elapsed_beyond(self.last_used_at, now, timeout)
	}
}

/// Insertion payload for an access token; the store assigns the row id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccessToken {
	/// Key of the owning consumer.
	pub consumer_key: ConsumerKey,
	/// Public token value.
	pub token: TokenValue,
	/// Token secret.
	pub secret: Secret,
	/// Bound user.
	pub user_id: UserId,
	/// Issue instant.
	pub created_at: OffsetDateTime,
}
impl NewAccessToken {
	/// Materializes the row once the store has assigned an id.
	pub fn into_row(self, id: TokenId) -> AccessToken {
		AccessToken {
			id,
			consumer_key: self.consumer_key,
			token: self.token,
			secret: self.secret,
			user_id: self.user_id,
			last_used_at: self.created_at,
		}
	}
}

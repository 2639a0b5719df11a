//! In-process relational tables shared by [`MemoryStore`](crate::store::MemoryStore) and
//! [`FileStore`](crate::store::FileStore).
//!
//! Callers hold a single write lock around each mutation, which is what makes every
//! operation here atomic with respect to concurrent store calls.

// self
use crate::{
	_prelude::*,
	auth::{
		AccessToken, Consumer, ConsumerId, ConsumerKey, NewAccessToken, NewRequestToken,
		NonceInsert, NonceRecord, RequestToken, Secret, TokenId, TokenScope, UserId,
		VerificationMode,
	},
	store::{ExchangeOutcome, StoreError},
};

/// Consumers, request tokens, access tokens, and nonce records.
#[derive(Clone, Debug, Default)]
pub struct CredentialTables {
	consumers: HashMap<ConsumerKey, Consumer>,
	request_tokens: BTreeMap<TokenId, RequestToken>,
	access_tokens: BTreeMap<TokenId, AccessToken>,
	nonces: HashSet<NonceRecord>,
	last_consumer_id: u64,
	last_token_id: u64,
}
impl CredentialTables {
	/// Registers a consumer, assigning the next consumer id.
	pub fn register_consumer(
		&mut self,
		key: ConsumerKey,
		secret: impl Into<String>,
		verification_mode: VerificationMode,
	) -> Result<Consumer, StoreError> {
		if self.consumers.contains_key(&key) {
			return Err(StoreError::Conflict { message: format!("consumer key {key} exists") });
		}

		self.last_consumer_id += 1;

		let consumer =
			Consumer::new(ConsumerId(self.last_consumer_id), key.clone(), secret, verification_mode);

		self.consumers.insert(key, consumer.clone());

		Ok(consumer)
	}

	/// Inserts or replaces a consumer with a caller-chosen id.
	pub fn put_consumer(&mut self, consumer: Consumer) {
		self.last_consumer_id = self.last_consumer_id.max(consumer.id.get());
		self.consumers.insert(consumer.key.clone(), consumer);
	}

	pub(crate) fn consumer(&self, key: &str) -> Option<Consumer> {
		self.consumers.get(key).cloned()
	}

	pub(crate) fn request_token(&self, consumer_key: &str, token: &str) -> Option<RequestToken> {
		self.request_tokens
			.values()
			.find(|row| row.consumer_key.as_ref() == consumer_key && row.token.as_ref() == token)
			.cloned()
	}

	pub(crate) fn request_token_by_verifier(
		&self,
		consumer_key: &str,
		token: &str,
		verifier: &str,
	) -> Option<RequestToken> {
		self.request_token(consumer_key, token)
			.filter(|row| row.verifier.as_ref().is_some_and(|code| code.matches(verifier)))
	}

	pub(crate) fn access_token(&self, consumer_key: &str, token: &str) -> Option<AccessToken> {
		self.access_tokens
			.values()
			.find(|row| row.consumer_key.as_ref() == consumer_key && row.token.as_ref() == token)
			.cloned()
	}

	pub(crate) fn insert_request_token(
		&mut self,
		token: NewRequestToken,
	) -> Result<TokenId, StoreError> {
		if self.request_token(&token.consumer_key, &token.token).is_some() {
			return Err(StoreError::Conflict {
				message: format!("request token {} exists for {}", token.token, token.consumer_key),
			});
		}

		let id = self.next_token_id();

		self.request_tokens.insert(id, token.into_row(id));

		Ok(id)
	}

	pub(crate) fn insert_access_token(
		&mut self,
		token: NewAccessToken,
	) -> Result<TokenId, StoreError> {
		if self.access_token(&token.consumer_key, &token.token).is_some() {
			return Err(StoreError::Conflict {
				message: format!("access token {} exists for {}", token.token, token.consumer_key),
			});
		}

		let id = self.next_token_id();

		self.access_tokens.insert(id, token.into_row(id));

		Ok(id)
	}

	pub(crate) fn bind_user(&mut self, request_token: TokenId, user_id: UserId) -> bool {
		match self.request_tokens.get_mut(&request_token) {
			Some(row) => {
				row.user_id = Some(user_id);

				true
			},
			None => false,
		}
	}

	pub(crate) fn set_verification_code(
		&mut self,
		request_token: TokenId,
		user_id: UserId,
		code: Secret,
	) -> bool {
		match self.request_tokens.get_mut(&request_token) {
			Some(row) => {
				row.user_id = Some(user_id);
				row.verifier = Some(code);

				true
			},
			None => false,
		}
	}

	pub(crate) fn exchange_request_token(
		&mut self,
		request_token: TokenId,
		verifier: &str,
		replacement: NewAccessToken,
	) -> Result<ExchangeOutcome, StoreError> {
		let Some(row) = self.request_tokens.get(&request_token) else {
			return Ok(ExchangeOutcome::Missing);
		};
		let verified = row.user_id == Some(replacement.user_id)
			&& row.verifier.as_ref().is_some_and(|code| code.matches(verifier));

		if !verified {
			return Ok(ExchangeOutcome::VerifierMismatch);
		}

		let id = self.insert_access_token(replacement)?;

		self.remove_token(TokenScope::RequestToken(request_token));

		Ok(ExchangeOutcome::Exchanged(id))
	}

	pub(crate) fn touch_access_token(&mut self, id: TokenId, instant: OffsetDateTime) -> bool {
		match self.access_tokens.get_mut(&id) {
			Some(row) => {
				if instant > row.last_used_at {
					row.last_used_at = instant;
				}

				true
			},
			None => false,
		}
	}

	pub(crate) fn delete_request_token(&mut self, id: TokenId) -> bool {
		self.remove_token(TokenScope::RequestToken(id))
	}

	pub(crate) fn delete_access_token(&mut self, consumer_key: &str, token: &str) -> bool {
		match self.access_token(consumer_key, token) {
			Some(row) => self.remove_token(TokenScope::AccessToken(row.id)),
			None => false,
		}
	}

	pub(crate) fn expire_token(&mut self, scope: TokenScope, cutoff: OffsetDateTime) -> bool {
		let reference = match scope {
			TokenScope::RequestToken(id) => self.request_tokens.get(&id).map(|row| row.created_at),
			TokenScope::AccessToken(id) => self.access_tokens.get(&id).map(|row| row.last_used_at),
		};

		match reference {
			Some(instant) if instant < cutoff => self.remove_token(scope),
			_ => false,
		}
	}

	pub(crate) fn insert_nonce(&mut self, record: NonceRecord) -> NonceInsert {
		if self.nonces.insert(record) { NonceInsert::Recorded } else { NonceInsert::Replayed }
	}

	pub(crate) fn nonce_exists(&self, record: &NonceRecord) -> bool {
		self.nonces.contains(record)
	}

	pub(crate) fn delete_nonces(&mut self, scope: TokenScope) -> usize {
		let before = self.nonces.len();

		self.nonces.retain(|record| record.scope != scope);

		before - self.nonces.len()
	}

	fn remove_token(&mut self, scope: TokenScope) -> bool {
		let removed = match scope {
			TokenScope::RequestToken(id) => self.request_tokens.remove(&id).is_some(),
			TokenScope::AccessToken(id) => self.access_tokens.remove(&id).is_some(),
		};

		self.delete_nonces(scope);

		removed
	}

	fn next_token_id(&mut self) -> TokenId {
		self.last_token_id += 1;

		TokenId(self.last_token_id)
	}

	pub(crate) fn to_snapshot(&self) -> TablesSnapshot {
		TablesSnapshot {
			consumers: self.consumers.values().cloned().collect(),
			request_tokens: self.request_tokens.values().cloned().collect(),
			access_tokens: self.access_tokens.values().cloned().collect(),
			nonces: self.nonces.iter().cloned().collect(),
			last_consumer_id: self.last_consumer_id,
			last_token_id: self.last_token_id,
		}
	}

	pub(crate) fn from_snapshot(snapshot: TablesSnapshot) -> Self {
		Self {
			consumers: snapshot
				.consumers
				.into_iter()
				.map(|consumer| (consumer.key.clone(), consumer))
				.collect(),
			request_tokens: snapshot.request_tokens.into_iter().map(|row| (row.id, row)).collect(),
			access_tokens: snapshot.access_tokens.into_iter().map(|row| (row.id, row)).collect(),
			nonces: snapshot.nonces.into_iter().collect(),
			last_consumer_id: snapshot.last_consumer_id,
			last_token_id: snapshot.last_token_id,
		}
	}
}

/// Serializable form of [`CredentialTables`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct TablesSnapshot {
	consumers: Vec<Consumer>,
	request_tokens: Vec<RequestToken>,
	access_tokens: Vec<AccessToken>,
	nonces: Vec<NonceRecord>,
	last_consumer_id: u64,
	last_token_id: u64,
}

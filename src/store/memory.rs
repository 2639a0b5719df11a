//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{
		AccessToken, Consumer, ConsumerKey, NewAccessToken, NewRequestToken, NonceInsert,
		NonceRecord, RequestToken, Secret, TokenId, TokenScope, UserId, VerificationMode,
	},
	store::{CredentialStore, CredentialTables, ExchangeOutcome, StoreError, StoreFuture},
};

type TablesLock = Arc<RwLock<CredentialTables>>;

/// Storage backend that keeps every relation in-process behind one lock.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(TablesLock);
impl MemoryStore {
	/// Registers a consumer out of band, assigning the next consumer id.
	pub fn register_consumer(
		&self,
		key: ConsumerKey,
		secret: impl Into<String>,
		verification_mode: VerificationMode,
	) -> Result<Consumer, StoreError> {
		self.0.write().register_consumer(key, secret, verification_mode)
	}

	/// Inserts or replaces a consumer as-is.
	pub fn put_consumer(&self, consumer: Consumer) {
		self.0.write().put_consumer(consumer);
	}

	fn read<T>(map: TablesLock, f: impl FnOnce(&CredentialTables) -> T) -> T {
		let guard = map.read();

		f(&*guard)
	}

	fn write<T>(map: TablesLock, f: impl FnOnce(&mut CredentialTables) -> T) -> T {
		let mut guard = map.write();

		f(&mut *guard)
	}
}
impl CredentialStore for MemoryStore {
	fn find_consumer<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Consumer>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::read(map, |tables| tables.consumer(key))) })
	}

	fn find_request_token<'a>(
		&'a self,
		consumer_key: &'a str,
		token: &'a str,
	) -> StoreFuture<'a, Option<RequestToken>> {
		let map = self.0.clone();

		Box::pin(async move {
			Ok(Self::read(map, |tables| tables.request_token(consumer_key, token)))
		})
	}

	fn find_request_token_by_verifier<'a>(
		&'a self,
		consumer_key: &'a str,
		token: &'a str,
		verifier: &'a str,
	) -> StoreFuture<'a, Option<RequestToken>> {
		let map = self.0.clone();

		Box::pin(async move {
			Ok(Self::read(map, |tables| {
				tables.request_token_by_verifier(consumer_key, token, verifier)
			}))
		})
	}

	fn find_access_token<'a>(
		&'a self,
		consumer_key: &'a str,
		token: &'a str,
	) -> StoreFuture<'a, Option<AccessToken>> {
		let map = self.0.clone();

		Box::pin(async move {
			Ok(Self::read(map, |tables| tables.access_token(consumer_key, token)))
		})
	}

	fn insert_request_token(&self, token: NewRequestToken) -> StoreFuture<'_, TokenId> {
		let map = self.0.clone();

		Box::pin(async move { Self::write(map, |tables| tables.insert_request_token(token)) })
	}

	fn insert_access_token(&self, token: NewAccessToken) -> StoreFuture<'_, TokenId> {
		let map = self.0.clone();

		Box::pin(async move { Self::write(map, |tables| tables.insert_access_token(token)) })
	}

	fn bind_user(&self, request_token: TokenId, user_id: UserId) -> StoreFuture<'_, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::write(map, |tables| tables.bind_user(request_token, user_id))) })
	}

	fn set_verification_code(
		&self,
		request_token: TokenId,
		user_id: UserId,
		code: Secret,
	) -> StoreFuture<'_, bool> {
		let map = self.0.clone();

		Box::pin(async move {
			Ok(Self::write(map, |tables| tables.set_verification_code(request_token, user_id, code)))
		})
	}

	fn exchange_request_token<'a>(
		&'a self,
		request_token: TokenId,
		verifier: &'a str,
		replacement: NewAccessToken,
	) -> StoreFuture<'a, ExchangeOutcome> {
		let map = self.0.clone();

		Box::pin(async move {
			Self::write(map, |tables| {
				tables.exchange_request_token(request_token, verifier, replacement)
			})
		})
	}

	fn touch_access_token(&self, id: TokenId, instant: OffsetDateTime) -> StoreFuture<'_, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::write(map, |tables| tables.touch_access_token(id, instant))) })
	}

	fn delete_request_token(&self, id: TokenId) -> StoreFuture<'_, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::write(map, |tables| tables.delete_request_token(id))) })
	}

	fn delete_access_token<'a>(
		&'a self,
		consumer_key: &'a str,
		token: &'a str,
	) -> StoreFuture<'a, bool> {
		let map = self.0.clone();

		Box::pin(async move {
			Ok(Self::write(map, |tables| tables.delete_access_token(consumer_key, token)))
		})
	}

	fn expire_token(&self, scope: TokenScope, cutoff: OffsetDateTime) -> StoreFuture<'_, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::write(map, |tables| tables.expire_token(scope, cutoff))) })
	}

	fn insert_nonce(&self, record: NonceRecord) -> StoreFuture<'_, NonceInsert> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::write(map, |tables| tables.insert_nonce(record))) })
	}

	fn nonce_exists<'a>(&'a self, record: &'a NonceRecord) -> StoreFuture<'a, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::read(map, |tables| tables.nonce_exists(record))) })
	}

	fn delete_nonces(&self, scope: TokenScope) -> StoreFuture<'_, usize> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::write(map, |tables| tables.delete_nonces(scope))) })
	}
}

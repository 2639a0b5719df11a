//! Simple file-backed [`CredentialStore`] for lightweight single-node deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{
		AccessToken, Consumer, ConsumerKey, NewAccessToken, NewRequestToken, NonceInsert,
		NonceRecord, RequestToken, Secret, TokenId, TokenScope, UserId, VerificationMode,
	},
	store::{
		CredentialStore, CredentialTables, ExchangeOutcome, StoreError, StoreFuture,
		tables::TablesSnapshot,
	},
};

/// Persists every relation to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<CredentialTables>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let tables = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(tables)) })
	}

	/// Registers a consumer out of band and persists it.
	pub fn register_consumer(
		&self,
		key: ConsumerKey,
		secret: impl Into<String>,
		verification_mode: VerificationMode,
	) -> Result<Consumer, StoreError> {
		self.mutate(|tables| tables.register_consumer(key, secret, verification_mode))
	}

	/// Inserts or replaces a consumer as-is and persists it.
	pub fn put_consumer(&self, consumer: Consumer) -> Result<(), StoreError> {
		self.mutate(|tables| {
			tables.put_consumer(consumer);

			Ok(())
		})
	}

	fn load_snapshot(path: &Path) -> Result<CredentialTables, StoreError> {
		if !path.exists() {
			return Ok(CredentialTables::default());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(CredentialTables::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let mut de = serde_json::Deserializer::from_slice(&bytes);
		let snapshot: TablesSnapshot =
			serde_path_to_error::deserialize(&mut de).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {} at `{}`: {}", path.display(), e.path(), e.inner()),
			})?;

		Ok(CredentialTables::from_snapshot(snapshot))
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, tables: &CredentialTables) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized = serde_json::to_vec_pretty(&tables.to_snapshot()).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to serialize store snapshot: {e}") }
		})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn read<T>(&self, f: impl FnOnce(&CredentialTables) -> T) -> T {
		let guard = self.inner.read();

		f(&*guard)
	}

	/// Applies `f` and persists the tables while still holding the write lock.
	fn mutate<T>(
		&self,
		f: impl FnOnce(&mut CredentialTables) -> Result<T, StoreError>,
	) -> Result<T, StoreError> {
		self.transact(f, |_| true)
	}

	/// Like [`FileStore::mutate`], but skips the disk write when `changed` reports no change.
	fn mutate_if<T>(
		&self,
		f: impl FnOnce(&mut CredentialTables) -> T,
		changed: impl FnOnce(&T) -> bool,
	) -> Result<T, StoreError> {
		self.transact(|tables| Ok(f(tables)), changed)
	}

	/// Runs `f` under the write lock and persists the result when `changed` reports a change.
	///
	/// The in-memory tables only keep the change once it has reached disk; a failed `f` or a
	/// failed write restores the previous state before the lock is released.
	fn transact<T>(
		&self,
		f: impl FnOnce(&mut CredentialTables) -> Result<T, StoreError>,
		changed: impl FnOnce(&T) -> bool,
	) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let before = guard.clone();
		let outcome = f(&mut *guard).and_then(|value| {
			if changed(&value) {
				self.persist_locked(&guard)?;
			}

			Ok(value)
		});

		if outcome.is_err() {
			*guard = before;
		}

		outcome
	}
}
impl CredentialStore for FileStore {
	fn find_consumer<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Consumer>> {
		Box::pin(async move { Ok(self.read(|tables| tables.consumer(key))) })
	}

	fn find_request_token<'a>(
		&'a self,
		consumer_key: &'a str,
		token: &'a str,
	) -> StoreFuture<'a, Option<RequestToken>> {
		Box::pin(async move { Ok(self.read(|tables| tables.request_token(consumer_key, token))) })
	}

	fn find_request_token_by_verifier<'a>(
		&'a self,
		consumer_key: &'a str,
		token: &'a str,
		verifier: &'a str,
	) -> StoreFuture<'a, Option<RequestToken>> {
		Box::pin(async move {
			Ok(self.read(|tables| tables.request_token_by_verifier(consumer_key, token, verifier)))
		})
	}

	fn find_access_token<'a>(
		&'a self,
		consumer_key: &'a str,
		token: &'a str,
	) -> StoreFuture<'a, Option<AccessToken>> {
		Box::pin(async move { Ok(self.read(|tables| tables.access_token(consumer_key, token))) })
	}

	fn insert_request_token(&self, token: NewRequestToken) -> StoreFuture<'_, TokenId> {
		Box::pin(async move { self.mutate(|tables| tables.insert_request_token(token)) })
	}

	fn insert_access_token(&self, token: NewAccessToken) -> StoreFuture<'_, TokenId> {
		Box::pin(async move { self.mutate(|tables| tables.insert_access_token(token)) })
	}

	fn bind_user(&self, request_token: TokenId, user_id: UserId) -> StoreFuture<'_, bool> {
		Box::pin(async move {
			self.mutate_if(|tables| tables.bind_user(request_token, user_id), |bound| *bound)
		})
	}

	fn set_verification_code(
		&self,
		request_token: TokenId,
		user_id: UserId,
		code: Secret,
	) -> StoreFuture<'_, bool> {
		Box::pin(async move {
			self.mutate_if(
				|tables| tables.set_verification_code(request_token, user_id, code),
				|updated| *updated,
			)
		})
	}

	fn exchange_request_token<'a>(
		&'a self,
		request_token: TokenId,
		verifier: &'a str,
		replacement: NewAccessToken,
	) -> StoreFuture<'a, ExchangeOutcome> {
		Box::pin(async move {
			self.transact(
				|tables| tables.exchange_request_token(request_token, verifier, replacement),
				|outcome| matches!(outcome, ExchangeOutcome::Exchanged(_)),
			)
		})
	}

	fn touch_access_token(&self, id: TokenId, instant: OffsetDateTime) -> StoreFuture<'_, bool> {
		Box::pin(async move {
			self.mutate_if(|tables| tables.touch_access_token(id, instant), |touched| *touched)
		})
	}

	fn delete_request_token(&self, id: TokenId) -> StoreFuture<'_, bool> {
		Box::pin(async move {
			self.mutate_if(|tables| tables.delete_request_token(id), |deleted| *deleted)
		})
	}

	fn delete_access_token<'a>(
		&'a self,
		consumer_key: &'a str,
		token: &'a str,
	) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			self.mutate_if(
				|tables| tables.delete_access_token(consumer_key, token),
				|deleted| *deleted,
			)
		})
	}

	fn expire_token(&self, scope: TokenScope, cutoff: OffsetDateTime) -> StoreFuture<'_, bool> {
		Box::pin(async move {
			self.mutate_if(|tables| tables.expire_token(scope, cutoff), |expired| *expired)
		})
	}

	fn insert_nonce(&self, record: NonceRecord) -> StoreFuture<'_, NonceInsert> {
		Box::pin(async move {
			self.mutate_if(
				|tables| tables.insert_nonce(record),
				|outcome| matches!(outcome, NonceInsert::Recorded),
			)
		})
	}

	fn nonce_exists<'a>(&'a self, record: &'a NonceRecord) -> StoreFuture<'a, bool> {
		Box::pin(async move { Ok(self.read(|tables| tables.nonce_exists(record))) })
	}

	fn delete_nonces(&self, scope: TokenScope) -> StoreFuture<'_, usize> {
		Box::pin(async move {
			self.mutate_if(|tables| tables.delete_nonces(scope), |removed| *removed > 0)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::auth::{ConsumerId, TokenValue};

	fn temp_path() -> PathBuf {
		let unique = format!(
			"oauth1_provider_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let consumer = store
			.register_consumer(
				ConsumerKey::new("c1").expect("Consumer key fixture should be valid."),
				"s1",
				VerificationMode::Auto,
			)
			.expect("Failed to register consumer fixture.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");
		let id = rt
			.block_on(store.insert_request_token(NewRequestToken {
				consumer_key: consumer.key.clone(),
				token: TokenValue::new("rt1").expect("Token fixture should be valid."),
				secret: Secret::new("rts1"),
				created_at: OffsetDateTime::now_utc(),
			}))
			.expect("Failed to save request token into file store.");
		let nonce = NonceRecord::new(consumer.id, TokenScope::RequestToken(id), "n1");

		assert_eq!(
			rt.block_on(store.insert_nonce(nonce.clone()))
				.expect("Failed to record nonce in file store."),
			NonceInsert::Recorded
		);

		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.find_request_token("c1", "rt1"))
			.expect("Failed to fetch request token from file store.")
			.expect("File store lost request token after reopen.");

		assert_eq!(fetched.id, id);
		assert_eq!(fetched.secret.expose(), "rts1");
		assert_eq!(
			rt.block_on(reopened.insert_nonce(nonce)).expect("Nonce write should not fault."),
			NonceInsert::Replayed
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_snapshot_reports_field_path() {
		let path = temp_path();

		fs::write(&path, br#"{"consumers":[{"id":"one"}]}"#)
			.expect("Failed to write corrupt snapshot fixture.");

		let err = FileStore::open(&path).expect_err("Corrupt snapshots must not load.");

		match err {
			StoreError::Serialization { message } => assert!(message.contains("consumers[0]")),
			other => panic!("Unexpected store error: {other:?}"),
		}

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	fn block_snapshot_writes(path: &Path) -> PathBuf {
		let blocker = path.with_extension("tmp");

		fs::create_dir_all(&blocker).expect("Failed to create the blocking directory.");

		blocker
	}

	#[tokio::test]
	async fn failed_writes_leave_the_tables_untouched() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let consumer = store
			.register_consumer(
				ConsumerKey::new("c1").expect("Consumer key fixture should be valid."),
				"s1",
				VerificationMode::UserAuthorized,
			)
			.expect("Failed to register consumer fixture.");
		let user = UserId::new(9).expect("User id fixture should be valid.");
		let id = store
			.insert_request_token(NewRequestToken {
				consumer_key: consumer.key.clone(),
				token: TokenValue::new("rt1").expect("Token fixture should be valid."),
				secret: Secret::new("rts1"),
				created_at: OffsetDateTime::now_utc(),
			})
			.await
			.expect("Failed to save request token into file store.");

		assert!(
			store
				.set_verification_code(id, user, Secret::new("v1"))
				.await
				.expect("Failed to store verification code.")
		);

		let blocker = block_snapshot_writes(&path);
		let nonce = NonceRecord::new(consumer.id, TokenScope::RequestToken(id), "n1");

		assert!(matches!(
			store.insert_nonce(nonce.clone()).await,
			Err(StoreError::Backend { .. })
		));
		assert!(!store.nonce_exists(&nonce).await.expect("Nonce lookup should not fault."));
		assert!(store.insert_nonce(nonce.clone()).await.is_err());

		let replacement = NewAccessToken {
			consumer_key: consumer.key.clone(),
			token: TokenValue::new("at1").expect("Token fixture should be valid."),
			secret: Secret::new("ats1"),
			user_id: user,
			created_at: OffsetDateTime::now_utc(),
		};

		assert!(store.exchange_request_token(id, "v1", replacement).await.is_err());
		assert!(
			store
				.find_request_token("c1", "rt1")
				.await
				.expect("Lookup should not fault.")
				.is_some(),
			"A failed exchange must keep the request token."
		);
		assert!(
			store.find_access_token("c1", "at1").await.expect("Lookup should not fault.").is_none()
		);

		fs::remove_dir(&blocker).expect("Failed to remove the blocking directory.");

		assert_eq!(
			store.insert_nonce(nonce.clone()).await.expect("Nonce write should succeed now."),
			NonceInsert::Recorded
		);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		assert!(reopened.nonce_exists(&nonce).await.expect("Nonce lookup should not fault."));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_nonce_inserts_allow_single_winner() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let record = NonceRecord::new(ConsumerId(1), TokenScope::AccessToken(TokenId(1)), "same");
		let tasks = (0..8)
			.map(|_| {
				let store = store.clone();
				let record = record.clone();

				tokio::spawn(async move {
					store.insert_nonce(record).await.expect("Nonce insert should not fault.")
				})
			})
			.collect::<Vec<_>>();
		let mut recorded = 0;

		for task in tasks {
			if task.await.expect("Nonce task should not panic.") == NonceInsert::Recorded {
				recorded += 1;
			}
		}

		assert_eq!(recorded, 1);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		assert!(reopened.nonce_exists(&record).await.expect("Nonce lookup should not fault."));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}

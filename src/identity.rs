//! User-authentication collaborator: stored password hashes and the request-token proof.
//!
//! The proof a user agent submits when authenticating against a request token is
//! `hex(SHA-256(request_token_secret || consumer_secret || password_hash))`. Inputs are
//! concatenated byte-for-byte; nothing is trimmed or normalized.

// crates.io
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
// self
use crate::{
	_prelude::*,
	auth::{Secret, UserId},
	store::StoreError,
};

/// Boxed future returned by [`UserDirectory`] lookups.
pub type DirectoryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Stored authentication material for one user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserCredentials {
	/// Resolved user id.
	pub user_id: UserId,
	/// Stored password hash, opaque to this crate.
	pub password_hash: Secret,
}

/// Looks up users by email for the authorization step.
pub trait UserDirectory
where
	Self: Send + Sync,
{
	/// Finds the credentials registered under `email`, matched exactly.
	fn find_by_email<'a>(&'a self, email: &'a str) -> DirectoryFuture<'a, Option<UserCredentials>>;
}

/// In-process [`UserDirectory`] for tests and local development.
#[derive(Clone, Debug, Default)]
pub struct MemoryUserDirectory(Arc<RwLock<HashMap<String, UserCredentials>>>);
impl MemoryUserDirectory {
	/// Registers or replaces a user.
	pub fn insert(&self, email: impl Into<String>, user_id: UserId, password_hash: impl Into<String>) {
		let credentials = UserCredentials { user_id, password_hash: Secret::new(password_hash) };

		self.0.write().insert(email.into(), credentials);
	}

	/// Removes a user, returning whether one was registered.
	pub fn remove(&self, email: &str) -> bool {
		self.0.write().remove(email).is_some()
	}
}
impl UserDirectory for MemoryUserDirectory {
	fn find_by_email<'a>(&'a self, email: &'a str) -> DirectoryFuture<'a, Option<UserCredentials>> {
		let users = self.0.clone();

		Box::pin(async move { Ok(users.read().get(email).cloned()) })
	}
}

/// Computes the proof expected from a user authenticating against a request token.
pub fn expected_proof(
	request_token_secret: &str,
	consumer_secret: &str,
	password_hash: &str,
) -> String {
	let digest = Sha256::new()
		.chain_update(request_token_secret.as_bytes())
		.chain_update(consumer_secret.as_bytes())
		.chain_update(password_hash.as_bytes())
		.finalize();

	hex::encode(digest)
}

/// Constant-time comparison of an expected and a submitted proof.
pub fn proof_matches(expected: &str, submitted: &str) -> bool {
	expected.as_bytes().ct_eq(submitted.as_bytes()).into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn proof_is_hex_sha256_of_the_concatenation() {
		let proof = expected_proof("", "", "");

		assert_eq!(proof, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
		assert_eq!(expected_proof("ab", "c", "d"), expected_proof("a", "bc", "d"));
		assert_ne!(expected_proof("rts", "cs", "hash"), expected_proof("rts", "cs", "hash "));
	}

	#[test]
	fn proof_comparison_is_exact() {
		let proof = expected_proof("rts", "cs", "hash");

		assert!(proof_matches(&proof, &proof));
		assert!(!proof_matches(&proof, &format!(" {proof}")));
		assert!(!proof_matches(&proof, &proof.to_uppercase()));
	}

	#[tokio::test]
	async fn directory_lookups_are_verbatim() {
		let directory = MemoryUserDirectory::default();
		let alice = UserId::new(7).expect("User id fixture should be valid.");

		directory.insert("alice@example.com", alice, "hash");

		let found = directory
			.find_by_email("alice@example.com")
			.await
			.expect("Lookup should not fault.")
			.expect("Alice should be registered.");

		assert_eq!(found.user_id, alice);
		assert!(
			directory
				.find_by_email(" alice@example.com")
				.await
				.expect("Lookup should not fault.")
				.is_none()
		);
		assert!(directory.remove("alice@example.com"));
	}
}

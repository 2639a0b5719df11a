#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use time::{OffsetDateTime, macros};
use url::Url;
// self
use oauth1_provider::{
	auth::{
		Consumer, ConsumerKey, NewAccessToken, NewRequestToken, Secret, TokenId, TokenValue,
		UserId, VerificationMode,
	},
	config::ProviderConfig,
	identity::{self, MemoryUserDirectory},
	provider::Provider,
	request::{OAuthParams, SignedRequest},
	signature::{SignatureMethod, SigningSecrets},
	store::{CredentialStore, MemoryStore},
};

pub const NOW: OffsetDateTime = macros::datetime!(2025-05-01 12:00 UTC);
pub const TIMEOUT_SECS: u32 = 3_600;
pub const ALICE_EMAIL: &str = "alice@example.com";
pub const ALICE_HASH: &str = "$argon2id$v=19$alice";

pub struct Harness {
	pub provider: Provider,
	pub store: MemoryStore,
	pub directory: MemoryUserDirectory,
	pub consumer: Consumer,
	pub alice: UserId,
}

pub fn harness(mode: VerificationMode) -> Harness {
	let store = MemoryStore::default();
	let directory = MemoryUserDirectory::default();
	let consumer = store
		.register_consumer(
			ConsumerKey::new("C1").expect("Consumer key fixture should be valid."),
			"S1",
			mode,
		)
		.expect("Registering consumer C1 should succeed.");
	let alice = UserId::new(1001).expect("Alice's user id should be valid.");

	directory.insert(ALICE_EMAIL, alice, ALICE_HASH);

	let config = ProviderConfig::builder()
		.timeout_secs(TIMEOUT_SECS)
		.build()
		.expect("Test configuration should validate.");
	let provider = Provider::new(Arc::new(store.clone()), Arc::new(directory.clone()), config)
		.expect("Provider should build from a valid configuration.");

	Harness { provider, store, directory, consumer, alice }
}

pub fn url() -> Url {
	Url::parse("https://api.example.com/oauth/endpoint?format=json")
		.expect("Endpoint URL fixture should parse.")
}

/// Builds protocol parameters stamped with `at`.
pub fn params(consumer_key: &str, nonce: &str, at: OffsetDateTime) -> OAuthParams {
	OAuthParams::new(consumer_key, nonce, at.unix_timestamp(), SignatureMethod::HmacSha1.as_str())
}

/// Signs `oauth` with HMAC-SHA1 the way a well-behaved client would.
pub fn sign(oauth: OAuthParams, consumer_secret: &str, token_secret: Option<&str>) -> SignedRequest {
	let mut request = SignedRequest::new("POST", url(), oauth);
	let secrets = match token_secret {
		Some(token_secret) => SigningSecrets::with_token(consumer_secret, token_secret),
		None => SigningSecrets::consumer_only(consumer_secret),
	};

	request.oauth.signature = SignatureMethod::HmacSha1.sign(&request, &secrets);

	request
}

pub fn alice_proof(request_token_secret: &str) -> String {
	identity::expected_proof(request_token_secret, "S1", ALICE_HASH)
}

/// Stores an access token for alice directly, bypassing the handshake.
pub async fn seed_access_token(
	harness: &Harness,
	token: &str,
	secret: &str,
	at: OffsetDateTime,
) -> TokenId {
	let draft = NewAccessToken {
		consumer_key: harness.consumer.key.clone(),
		token: TokenValue::new(token).expect("Access token fixture should be valid."),
		secret: Secret::new(secret),
		user_id: harness.alice,
		created_at: at,
	};

	harness.store.insert_access_token(draft).await.expect("Seeding an access token should succeed.")
}

/// Stores a pending request token directly.
pub async fn seed_request_token(
	harness: &Harness,
	token: &str,
	secret: &str,
	at: OffsetDateTime,
) -> TokenId {
	let draft = NewRequestToken {
		consumer_key: harness.consumer.key.clone(),
		token: TokenValue::new(token).expect("Request token fixture should be valid."),
		secret: Secret::new(secret),
		created_at: at,
	};

	harness.store.insert_request_token(draft).await.expect("Seeding a request token should succeed.")
}

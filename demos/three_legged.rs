//! Walks a consumer through the full three-legged handshake against an in-memory provider.
//!
//! 1. The consumer obtains a request token (`request` mode).
//! 2. The user authenticates against it (`authorize` mode + [`Provider::authenticate_user`]).
//! 3. The user approves and a verification code is issued.
//! 4. The consumer exchanges the request token for an access token (`access` mode).
//! 5. The consumer calls a protected resource (`use` mode), then replays the same call.

// std
use std::sync::Arc;
// crates.io
use color_eyre::{Result, eyre::eyre};
use time::OffsetDateTime;
use url::Url;
// self
use oauth1_provider::{
	auth::{ConsumerKey, UserId, VerificationMode},
	config::ProviderConfig,
	identity::{self, MemoryUserDirectory},
	provider::Provider,
	request::{OAuthParams, SignedRequest},
	session::{Session, ValidationMode},
	signature::{SignatureMethod, SigningSecrets},
	store::MemoryStore,
};

const CONSUMER_SECRET: &str = "demo-consumer-secret";
const PASSWORD_HASH: &str = "$argon2id$v=19$demo";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store = MemoryStore::default();
	let directory = MemoryUserDirectory::default();

	store.register_consumer(
		ConsumerKey::new("demo-app")?,
		CONSUMER_SECRET,
		VerificationMode::UserAuthorized,
	)?;
	directory.insert("alice@example.com", UserId::new(1)?, PASSWORD_HASH);

	let provider = Provider::new(
		Arc::new(store),
		Arc::new(directory),
		ProviderConfig::builder().timeout_secs(600).build()?,
	)?;
	let endpoint = Url::parse("https://api.example.com/photos?size=original")?;
	let request_session = provider
		.validate(ValidationMode::Request, &client_call(&endpoint, "n-1", None, None))
		.await?;
	let (request_token, request_secret) = pair(&request_session)?;

	println!("Request token issued: {request_token} ({}).", request_session.state());

	let request_credentials = Some((request_token.as_str(), request_secret.as_str()));
	let mut authorizing = provider
		.validate(
			ValidationMode::Authorize,
			&client_call(&endpoint, "n-2", request_credentials, None),
		)
		.await?;
	let proof = identity::expected_proof(&request_secret, CONSUMER_SECRET, PASSWORD_HASH);

	provider.authenticate_user(&mut authorizing, "alice@example.com", &proof).await?;

	println!("User bound to request token: {}.", authorizing.request_verified());

	let code = provider
		.issue_verification_code(&mut authorizing)
		.await?
		.ok_or_else(|| eyre!("verification code was not issued"))?;
	let access_session = provider
		.validate(
			ValidationMode::Access,
			&client_call(&endpoint, "n-3", request_credentials, Some(code.expose())),
		)
		.await?;
	let (access_token, access_secret) = pair(&access_session)?;

	println!("Access token issued: {access_token} ({}).", access_session.state());

	let resource_call =
		client_call(&endpoint, "n-4", Some((access_token.as_str(), access_secret.as_str())), None);
	let first = provider.validate(ValidationMode::Use, &resource_call).await?;
	let replay = provider.validate(ValidationMode::Use, &resource_call).await?;

	println!("Resource call: {}; replayed call: {}.", first.state(), replay.state());
	println!(
		"Validation passes: {} accepted, {} rejected.",
		provider.validation_metrics.accepted(),
		provider.validation_metrics.rejected()
	);

	Ok(())
}

fn client_call(
	endpoint: &Url,
	nonce: &str,
	token: Option<(&str, &str)>,
	verifier: Option<&str>,
) -> SignedRequest {
	let mut oauth = OAuthParams::new(
		"demo-app",
		nonce,
		OffsetDateTime::now_utc().unix_timestamp(),
		SignatureMethod::HmacSha256.as_str(),
	);

	if let Some((token, _)) = token {
		oauth = oauth.with_token(token);
	}
	if let Some(verifier) = verifier {
		oauth = oauth.with_verifier(verifier);
	}

	let mut request = SignedRequest::new("GET", endpoint.clone(), oauth);
	let secrets = match token {
		Some((_, secret)) => SigningSecrets::with_token(CONSUMER_SECRET, secret),
		None => SigningSecrets::consumer_only(CONSUMER_SECRET),
	};

	request.oauth.signature = SignatureMethod::HmacSha256.sign(&request, &secrets);

	request
}

fn pair(session: &Session) -> Result<(String, String)> {
	let (token, secret) =
		session.token_pair().ok_or_else(|| eyre!("{} carried no token pair", session.state()))?;

	Ok((token.to_owned(), secret.expose().to_owned()))
}

//! Built-in signature methods and the [`StandardVerifier`].

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;
// self
use crate::{
	_prelude::*,
	request::SignedRequest,
	signature::{SignatureVerifier, SigningSecrets, signature_base_string, signing_key},
};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Symmetric signature methods understood by [`StandardVerifier`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignatureMethod {
	/// `HMAC-SHA1`.
	HmacSha1,
	/// `HMAC-SHA256`.
	HmacSha256,
	/// `PLAINTEXT`; only safe over TLS.
	Plaintext,
}
impl SignatureMethod {
	/// Wire name used in `oauth_signature_method`.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::HmacSha1 => "HMAC-SHA1",
			Self::HmacSha256 => "HMAC-SHA256",
			Self::Plaintext => "PLAINTEXT",
		}
	}

	/// Resolves a wire name; method names are case-sensitive.
	pub fn from_name(name: &str) -> Option<Self> {
		match name {
			"HMAC-SHA1" => Some(Self::HmacSha1),
			"HMAC-SHA256" => Some(Self::HmacSha256),
			"PLAINTEXT" => Some(Self::Plaintext),
			_ => None,
		}
	}

	/// Computes the `oauth_signature` value a client would send for `request`.
	pub fn sign(self, request: &SignedRequest, secrets: &SigningSecrets<'_>) -> String {
		let key = signing_key(secrets);

		match self {
			Self::HmacSha1 => mac::<HmacSha1>(&key, &signature_base_string(request))
				.map(|mac| STANDARD.encode(mac.finalize().into_bytes()))
				.unwrap_or_default(),
			Self::HmacSha256 => mac::<HmacSha256>(&key, &signature_base_string(request))
				.map(|mac| STANDARD.encode(mac.finalize().into_bytes()))
				.unwrap_or_default(),
			Self::Plaintext => key,
		}
	}

	/// Checks `submitted` against the expected signature in constant time.
	pub fn verify(
		self,
		request: &SignedRequest,
		secrets: &SigningSecrets<'_>,
		submitted: &str,
	) -> bool {
		let key = signing_key(secrets);

		match self {
			Self::HmacSha1 => verify_mac::<HmacSha1>(&key, request, submitted),
			Self::HmacSha256 => verify_mac::<HmacSha256>(&key, request, submitted),
			Self::Plaintext => key.as_bytes().ct_eq(submitted.as_bytes()).into(),
		}
	}
}
impl Display for SignatureMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for SignatureMethod {
	type Err = UnsupportedSignatureMethod;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_name(s).ok_or_else(|| UnsupportedSignatureMethod { method: s.to_owned() })
	}
}

/// Raised when a signature method name is not built in.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unsupported signature method `{method}`.")]
pub struct UnsupportedSignatureMethod {
	/// Submitted method name.
	pub method: String,
}

/// [`SignatureVerifier`] for `HMAC-SHA1`, `HMAC-SHA256`, and `PLAINTEXT`.
///
/// Requests naming any other method fail verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StandardVerifier {
	allowed: Vec<SignatureMethod>,
}
impl StandardVerifier {
	/// Accepts only the listed methods.
	pub fn with_methods(allowed: impl IntoIterator<Item = SignatureMethod>) -> Self {
		Self { allowed: allowed.into_iter().collect() }
	}

	/// Whether `method` is accepted by this verifier.
	pub fn allows(&self, method: SignatureMethod) -> bool {
		self.allowed.contains(&method)
	}
}
impl Default for StandardVerifier {
	fn default() -> Self {
		Self::with_methods([
			SignatureMethod::HmacSha1,
			SignatureMethod::HmacSha256,
			SignatureMethod::Plaintext,
		])
	}
}
impl SignatureVerifier for StandardVerifier {
	fn verify(&self, request: &SignedRequest, secrets: &SigningSecrets<'_>) -> bool {
		match SignatureMethod::from_name(&request.oauth.signature_method) {
			Some(method) if self.allows(method) =>
				method.verify(request, secrets, &request.oauth.signature),
			_ => false,
		}
	}
}

fn mac<M>(key: &str, base: &str) -> Option<M>
where
	M: Mac + hmac::digest::KeyInit,
{
	let mut mac = <M as hmac::digest::KeyInit>::new_from_slice(key.as_bytes()).ok()?;

	mac.update(base.as_bytes());

	Some(mac)
}

fn verify_mac<M>(key: &str, request: &SignedRequest, submitted: &str) -> bool
where
	M: Mac + hmac::digest::KeyInit,
{
	let Ok(signature) = STANDARD.decode(submitted) else {
		return false;
	};

	mac::<M>(key, &signature_base_string(request))
		.is_some_and(|mac| mac.verify_slice(&signature).is_ok())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::request::OAuthParams;

	const CONSUMER_SECRET: &str = "kd94hf93k423kf44";
	const TOKEN_SECRET: &str = "pfkkdhi9sl3r4s00";

	fn photos_request(method: SignatureMethod) -> SignedRequest {
		let url = Url::parse("http://photos.example.net/photos?file=vacation.jpg&size=original")
			.expect("URL fixture should parse.");
		let mut oauth =
			OAuthParams::new("dpf43f3p2l4k3l03", "kllo9940pd9333jh", 1_191_242_096, method.as_str())
				.with_token("nnch734d00sl2jdk");

		oauth.version = Some("1.0".into());

		SignedRequest::new("GET", url, oauth)
	}

	fn secrets() -> SigningSecrets<'static> {
		SigningSecrets::with_token(CONSUMER_SECRET, TOKEN_SECRET)
	}

	#[test]
	fn hmac_sha1_matches_published_vector() {
		let mut request = photos_request(SignatureMethod::HmacSha1);
		let signature = SignatureMethod::HmacSha1.sign(&request, &secrets());

		assert_eq!(signature, "tR3+Ty81lMeYAr/Fid0kMTYa/WM=");

		request.oauth.signature = signature;

		assert!(StandardVerifier::default().verify(&request, &secrets()));
	}

	#[test]
	fn hmac_sha256_round_trips_and_rejects_tampering() {
		let mut request = photos_request(SignatureMethod::HmacSha256);

		request.oauth.signature = SignatureMethod::HmacSha256.sign(&request, &secrets());

		let verifier = StandardVerifier::default();

		assert!(verifier.verify(&request, &secrets()));
		assert!(!verifier.verify(&request, &SigningSecrets::with_token(CONSUMER_SECRET, "other")));

		request.oauth.nonce = "different".into();

		assert!(!verifier.verify(&request, &secrets()));
	}

	#[test]
	fn plaintext_signature_is_the_signing_key() {
		let mut request = photos_request(SignatureMethod::Plaintext);

		assert_eq!(
			SignatureMethod::Plaintext.sign(&request, &secrets()),
			"kd94hf93k423kf44&pfkkdhi9sl3r4s00"
		);

		request.oauth.signature = "kd94hf93k423kf44&pfkkdhi9sl3r4s00".into();

		assert!(StandardVerifier::default().verify(&request, &secrets()));
		assert!(
			!StandardVerifier::with_methods([SignatureMethod::HmacSha1])
				.verify(&request, &secrets())
		);
	}

	#[test]
	fn unknown_methods_and_garbage_signatures_fail() {
		let mut request = photos_request(SignatureMethod::HmacSha1);

		request.oauth.signature = "not base64!".into();

		assert!(!StandardVerifier::default().verify(&request, &secrets()));

		request.oauth.signature_method = "RSA-SHA1".into();

		assert!(!StandardVerifier::default().verify(&request, &secrets()));
		assert_eq!(
			"RSA-SHA1".parse::<SignatureMethod>(),
			Err(UnsupportedSignatureMethod { method: "RSA-SHA1".into() })
		);
	}
}

//! Signature base string construction (RFC 5849 section 3.4.1).

// crates.io
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
// self
use crate::{_prelude::*, request::SignedRequest, signature::SigningSecrets};

/// Everything except the RFC 3986 unreserved set.
const OAUTH_ENCODE_SET: &AsciiSet =
	&NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Percent-encodes a value the way OAuth 1.0a requires: uppercase hex, unreserved set kept.
pub fn percent_encode(value: &str) -> String {
	utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Base string URI: lowercase scheme and host, non-default port, path, no query or fragment.
pub fn base_string_uri(url: &Url) -> String {
	let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
	let port = url.port().map(|port| format!(":{port}")).unwrap_or_default();

	format!("{}://{host}{port}{}", url.scheme(), url.path())
}

/// Encodes, sorts, and joins parameter pairs.
pub fn normalize_parameters(pairs: &[(String, String)]) -> String {
	let mut encoded = pairs
		.iter()
		.map(|(name, value)| (percent_encode(name), percent_encode(value)))
		.collect::<Vec<_>>();

	encoded.sort();

	encoded.iter().map(|(name, value)| format!("{name}={value}")).collect::<Vec<_>>().join("&")
}

/// `METHOD&encoded-uri&encoded-parameters` for the given request.
pub fn signature_base_string(request: &SignedRequest) -> String {
	format!(
		"{}&{}&{}",
		request.method.to_ascii_uppercase(),
		percent_encode(&base_string_uri(&request.url)),
		percent_encode(&normalize_parameters(&request.signed_pairs())),
	)
}

/// `encoded-consumer-secret&encoded-token-secret`; the token half is empty when absent.
pub fn signing_key(secrets: &SigningSecrets<'_>) -> String {
	format!(
		"{}&{}",
		percent_encode(secrets.consumer_secret),
		percent_encode(secrets.token_secret.unwrap_or_default()),
	)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::request::OAuthParams;

	#[test]
	fn encoding_keeps_only_unreserved_characters() {
		assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
		assert_eq!(percent_encode("a-b.c_d~e"), "a-b.c_d~e");
		assert_eq!(percent_encode("☃"), "%E2%98%83");
	}

	#[test]
	fn base_string_uri_drops_default_ports_and_query() {
		let url = Url::parse("HTTP://Example.COM:80/r%20v/X?id=123#frag")
			.expect("URL fixture should parse.");
		let custom = Url::parse("https://www.example.net:8080/?q=1").expect("URL fixture should parse.");

		assert_eq!(base_string_uri(&url), "http://example.com/r%20v/X");
		assert_eq!(base_string_uri(&custom), "https://www.example.net:8080/");
	}

	#[test]
	fn base_string_matches_published_example() {
		let url = Url::parse("http://example.com/request?b5=%3D%253D&a3=a&c%40=&a2=r%20b")
			.expect("URL fixture should parse.");
		let oauth = OAuthParams::new("9djdj82h48djs9d2", "7d8f3e4a", 137_131_201, "HMAC-SHA1")
			.with_token("kkk9d7dh3k39sjv7");
		let request = SignedRequest::new("post", url, oauth)
			.with_parameter("c2", "")
			.with_parameter("a3", "2 q");

		assert_eq!(
			signature_base_string(&request),
			"POST&http%3A%2F%2Fexample.com%2Frequest&a2%3Dr%2520b%26a3%3D2%2520q%26a3%3Da%26b5%3D%253D%25253D%26c%2540%3D%26c2%3D%26oauth_consumer_key%3D9djdj82h48djs9d2%26oauth_nonce%3D7d8f3e4a%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D137131201%26oauth_token%3Dkkk9d7dh3k39sjv7"
		);
	}

	#[test]
	fn signing_key_leaves_missing_token_secret_empty() {
		assert_eq!(signing_key(&SigningSecrets::consumer_only("c s")), "c%20s&");
		assert_eq!(signing_key(&SigningSecrets::with_token("cs", "t&s")), "cs&t%26s");
	}
}

//! Inbound signed-request material: protocol parameters, signed payload parameters, and
//! `Authorization: OAuth ...` header parsing.
//!
//! Protocol parameters may arrive in the `Authorization` header, the query string, or a
//! form-encoded body. They are merged and partitioned here so later stages see one
//! [`OAuthParams`] value plus the remaining parameters that take part in the signature.

// crates.io
use percent_encoding::percent_decode_str;
// self
use crate::_prelude::*;

const OAUTH_PREFIX: &str = "oauth_";
const SUPPORTED_VERSION: &str = "1.0";

/// Errors raised while extracting protocol parameters from a request.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RequestError {
	/// The `Authorization` header does not use the `OAuth` scheme.
	#[error("Authorization header does not use the OAuth scheme.")]
	UnsupportedScheme,
	/// A header fragment is not of the form `name="value"`.
	#[error("Malformed authorization parameter `{fragment}`.")]
	MalformedParameter {
		/// Offending fragment, verbatim.
		fragment: String,
	},
	/// A value is not valid percent-encoded UTF-8.
	#[error("Parameter `{name}` is not valid percent-encoded UTF-8.")]
	InvalidEncoding {
		/// Parameter name.
		name: String,
	},
	/// A required protocol parameter is absent.
	#[error("Missing required parameter `{name}`.")]
	MissingParameter {
		/// Parameter name.
		name: &'static str,
	},
	/// A protocol parameter was supplied more than once.
	#[error("Parameter `{name}` was supplied more than once.")]
	DuplicateParameter {
		/// Parameter name.
		name: String,
	},
	/// `oauth_timestamp` is not a non-negative integer.
	#[error("Timestamp `{value}` is not a non-negative integer.")]
	InvalidTimestamp {
		/// Submitted value.
		value: String,
	},
	/// `oauth_version` is present and not `1.0`.
	#[error("Unsupported protocol version `{value}`.")]
	UnsupportedVersion {
		/// Submitted value.
		value: String,
	},
}

/// Protocol parameters of one signed call.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthParams {
	/// `oauth_consumer_key`.
	pub consumer_key: String,
	/// `oauth_token`, absent when only the consumer signs.
	pub token: Option<String>,
	/// `oauth_nonce`.
	pub nonce: String,
	/// `oauth_timestamp`, seconds since the Unix epoch.
	pub timestamp: i64,
	/// `oauth_signature_method`.
	pub signature_method: String,
	/// `oauth_signature`, already percent-decoded.
	pub signature: String,
	/// `oauth_verifier`, present on access-token exchanges.
	pub verifier: Option<String>,
	/// `oauth_callback`.
	pub callback: Option<String>,
	/// `oauth_version`.
	pub version: Option<String>,
	/// Any other `oauth_*` parameters (e.g. `oauth_session_handle`), sorted by name.
	pub extensions: Vec<(String, String)>,
}
impl OAuthParams {
	/// Creates parameters for a consumer-only call.
	pub fn new(
		consumer_key: impl Into<String>,
		nonce: impl Into<String>,
		timestamp: i64,
		signature_method: impl Into<String>,
	) -> Self {
		Self {
			consumer_key: consumer_key.into(),
			token: None,
			nonce: nonce.into(),
			timestamp,
			signature_method: signature_method.into(),
			signature: String::new(),
			verifier: None,
			callback: None,
			version: None,
			extensions: Vec::new(),
		}
	}

	/// Sets `oauth_token`.
	pub fn with_token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());

		self
	}

	/// Sets `oauth_verifier`.
	pub fn with_verifier(mut self, verifier: impl Into<String>) -> Self {
		self.verifier = Some(verifier.into());

		self
	}

	/// Sets `oauth_callback`.
	pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
		self.callback = Some(callback.into());

		self
	}

	/// Adds an extension protocol parameter such as `oauth_session_handle`.
	pub fn with_extension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.extensions.push((name.into(), value.into()));

		self
	}

	/// Lists every protocol parameter that takes part in the signature (all but
	/// `oauth_signature`).
	pub fn signed_pairs(&self) -> Vec<(String, String)> {
		let mut pairs = vec![
			("oauth_consumer_key".to_owned(), self.consumer_key.clone()),
			("oauth_nonce".to_owned(), self.nonce.clone()),
			("oauth_signature_method".to_owned(), self.signature_method.clone()),
			("oauth_timestamp".to_owned(), self.timestamp.to_string()),
		];
		let optional = [
			("oauth_token", &self.token),
			("oauth_verifier", &self.verifier),
			("oauth_callback", &self.callback),
			("oauth_version", &self.version),
		];

		for (name, value) in optional {
			if let Some(value) = value {
				pairs.push((name.to_owned(), value.clone()));
			}
		}

		pairs.extend(self.extensions.iter().cloned());

		pairs
	}

	fn from_pairs(mut pairs: HashMap<String, String>) -> Result<Self, RequestError> {
		let mut required = |name: &'static str| {
			pairs.remove(name).ok_or(RequestError::MissingParameter { name })
		};
		let consumer_key = required("oauth_consumer_key")?;
		let nonce = required("oauth_nonce")?;
		let raw_timestamp = required("oauth_timestamp")?;
		let signature_method = required("oauth_signature_method")?;
		let signature = required("oauth_signature")?;
		let timestamp = raw_timestamp
			.parse::<i64>()
			.ok()
			.filter(|value| *value >= 0)
			.ok_or(RequestError::InvalidTimestamp { value: raw_timestamp })?;
		let version = pairs.remove("oauth_version");

		if let Some(value) = version.as_deref().filter(|value| *value != SUPPORTED_VERSION) {
			return Err(RequestError::UnsupportedVersion { value: value.to_owned() });
		}

		let token = pairs.remove("oauth_token");
		let verifier = pairs.remove("oauth_verifier");
		let callback = pairs.remove("oauth_callback");
		let mut extensions = pairs.into_iter().collect::<Vec<_>>();

		extensions.sort();

		Ok(Self {
			consumer_key,
			token,
			nonce,
			timestamp,
			signature_method,
			signature,
			verifier,
			callback,
			version,
			extensions,
		})
	}
}
impl Debug for OAuthParams {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthParams")
			.field("consumer_key", &self.consumer_key)
			.field("token", &self.token)
			.field("nonce", &self.nonce)
			.field("timestamp", &self.timestamp)
			.field("signature_method", &self.signature_method)
			.field("signature", &"<redacted>")
			.field("verifier", &self.verifier.as_ref().map(|_| "<redacted>"))
			.field("callback", &self.callback)
			.field("version", &self.version)
			.field("extensions", &self.extensions)
			.finish()
	}
}

/// A signed inbound call as seen by the validation pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedRequest {
	/// HTTP method.
	pub method: String,
	/// Request URL; its query string contributes signed parameters.
	pub url: Url,
	/// Protocol parameters.
	pub oauth: OAuthParams,
	/// Non-protocol parameters from the form body that take part in the signature.
	pub parameters: Vec<(String, String)>,
}
impl SignedRequest {
	/// Creates a request from already-extracted protocol parameters.
	pub fn new(method: impl Into<String>, url: Url, oauth: OAuthParams) -> Self {
		Self { method: method.into(), url, oauth, parameters: Vec::new() }
	}

	/// Adds a signed form-body parameter.
	pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.parameters.push((name.into(), value.into()));

		self
	}

	/// Builds a request from an `Authorization: OAuth ...` header plus form-body parameters.
	pub fn from_authorization_header(
		method: impl Into<String>,
		url: Url,
		header: &str,
		body: &[(String, String)],
	) -> Result<Self, RequestError> {
		let header_pairs = parse_authorization_header(header)?;

		Self::assemble(method.into(), url, header_pairs, body)
	}

	/// Builds a request whose protocol parameters travel in the query string or form body.
	pub fn from_parameters(
		method: impl Into<String>,
		url: Url,
		body: &[(String, String)],
	) -> Result<Self, RequestError> {
		Self::assemble(method.into(), url, Vec::new(), body)
	}

	/// Every parameter covered by the signature: query, body, and protocol parameters.
	pub fn signed_pairs(&self) -> Vec<(String, String)> {
		let mut pairs: Vec<(String, String)> = self
			.url
			.query_pairs()
			.filter(|(name, _)| !name.starts_with(OAUTH_PREFIX))
			.map(|(name, value)| (name.into_owned(), value.into_owned()))
			.collect();

		pairs.extend(self.parameters.iter().cloned());
		pairs.extend(self.oauth.signed_pairs());

		pairs
	}

	fn assemble(
		method: String,
		url: Url,
		header_pairs: Vec<(String, String)>,
		body: &[(String, String)],
	) -> Result<Self, RequestError> {
		let query_pairs = url
			.query_pairs()
			.filter(|(name, _)| name.starts_with(OAUTH_PREFIX))
			.map(|(name, value)| (name.into_owned(), value.into_owned()))
			.collect::<Vec<_>>();
		let mut protocol = HashMap::new();
		let mut parameters = Vec::new();

		for (name, value) in header_pairs.into_iter().chain(query_pairs).chain(body.iter().cloned())
		{
			if !name.starts_with(OAUTH_PREFIX) {
				parameters.push((name, value));

				continue;
			}
			if protocol.contains_key(&name) {
				return Err(RequestError::DuplicateParameter { name });
			}

			protocol.insert(name, value);
		}

		let oauth = OAuthParams::from_pairs(protocol)?;

		Ok(Self { method, url, oauth, parameters })
	}
}

/// Parses `OAuth name="value", ...` into percent-decoded pairs, dropping `realm`.
pub fn parse_authorization_header(header: &str) -> Result<Vec<(String, String)>, RequestError> {
	let header = header.trim();
	let (scheme, rest) = header.split_once(char::is_whitespace).unwrap_or((header, ""));

	if !scheme.eq_ignore_ascii_case("OAuth") {
		return Err(RequestError::UnsupportedScheme);
	}

	let mut pairs = Vec::new();

	for fragment in rest.split(',').map(str::trim).filter(|fragment| !fragment.is_empty()) {
		let malformed = || RequestError::MalformedParameter { fragment: fragment.to_owned() };
		let (name, quoted) = fragment.split_once('=').ok_or_else(malformed)?;
		let value = quoted
			.trim()
			.strip_prefix('"')
			.and_then(|value| value.strip_suffix('"'))
			.ok_or_else(malformed)?;
		let name = decode(name.trim(), name.trim())?;

		if name == "realm" {
			continue;
		}

		let value = decode(&name, value)?;

		pairs.push((name, value));
	}

	Ok(pairs)
}

fn decode(name: &str, raw: &str) -> Result<String, RequestError> {
	percent_decode_str(raw)
		.decode_utf8()
		.map(|value| value.into_owned())
		.map_err(|_| RequestError::InvalidEncoding { name: name.to_owned() })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::signature::{SignatureMethod, SigningSecrets};

	const HEADER: &str = r#"OAuth realm="Example", oauth_consumer_key="c1", oauth_token="rt1", oauth_signature_method="HMAC-SHA1", oauth_timestamp="1700000000", oauth_nonce="n%201", oauth_signature="abc%3D", oauth_version="1.0""#;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("URL fixture should parse.")
	}

	#[test]
	fn header_parameters_are_decoded_and_realm_dropped() {
		let pairs =
			parse_authorization_header(HEADER).expect("Well-formed header should parse.");

		assert!(pairs.iter().all(|(name, _)| name != "realm"));
		assert!(pairs.contains(&("oauth_nonce".into(), "n 1".into())));
		assert!(pairs.contains(&("oauth_signature".into(), "abc=".into())));
	}

	#[test]
	fn request_partitions_protocol_and_signed_parameters() {
		let request = SignedRequest::from_authorization_header(
			"POST",
			url("https://api.example.com/photos?size=original"),
			HEADER,
			&[("file".into(), "vacation.jpg".into())],
		)
		.expect("Request should assemble from a well-formed header.");

		assert_eq!(request.oauth.consumer_key, "c1");
		assert_eq!(request.oauth.token.as_deref(), Some("rt1"));
		assert_eq!(request.oauth.timestamp, 1_700_000_000);
		assert_eq!(request.parameters, vec![("file".to_owned(), "vacation.jpg".to_owned())]);

		let signed = request.signed_pairs();

		assert!(signed.contains(&("size".into(), "original".into())));
		assert!(signed.iter().all(|(name, _)| name != "oauth_signature"));
	}

	#[test]
	fn malformed_headers_are_rejected() {
		assert_eq!(
			parse_authorization_header(r#"Bearer abc"#),
			Err(RequestError::UnsupportedScheme)
		);
		assert!(matches!(
			parse_authorization_header(r#"OAuth oauth_nonce=unquoted"#),
			Err(RequestError::MalformedParameter { .. })
		));
	}

	#[test]
	fn missing_duplicate_and_invalid_parameters_are_rejected() {
		let base = url("https://api.example.com/r");
		let missing = SignedRequest::from_authorization_header(
			"GET",
			base.clone(),
			r#"OAuth oauth_consumer_key="c1""#,
			&[],
		);

		assert_eq!(missing, Err(RequestError::MissingParameter { name: "oauth_nonce" }));

		let duplicate = SignedRequest::from_authorization_header(
			"GET",
			url("https://api.example.com/r?oauth_nonce=again"),
			HEADER,
			&[],
		);

		assert!(matches!(duplicate, Err(RequestError::DuplicateParameter { .. })));

		let bad_time = HEADER.replace("1700000000", "-5");

		assert!(matches!(
			SignedRequest::from_authorization_header("GET", base.clone(), &bad_time, &[]),
			Err(RequestError::InvalidTimestamp { .. })
		));

		let bad_version = HEADER.replace(r#"oauth_version="1.0""#, r#"oauth_version="2.0""#);

		assert!(matches!(
			SignedRequest::from_authorization_header("GET", base, &bad_version, &[]),
			Err(RequestError::UnsupportedVersion { .. })
		));
	}

	#[test]
	fn form_parameters_keep_extension_protocol_parameters_signed() {
		let endpoint = url("https://api.example.com/oauth/refresh?format=json");
		let secrets = SigningSecrets::with_token("s1", "ats1");
		let mut client = SignedRequest::new(
			"POST",
			endpoint.clone(),
			OAuthParams::new("c1", "n1", 1_700_000_000, "HMAC-SHA1")
				.with_token("at1")
				.with_extension("oauth_session_handle", "h1"),
		)
		.with_parameter("scope", "photos");

		client.oauth.signature = SignatureMethod::HmacSha1.sign(&client, &secrets);

		let mut body = client.oauth.signed_pairs();

		body.push(("oauth_signature".into(), client.oauth.signature.clone()));
		body.push(("scope".into(), "photos".into()));

		let request = SignedRequest::from_parameters("POST", endpoint, &body)
			.expect("Form-encoded protocol parameters should assemble.");

		assert_eq!(
			request.oauth.extensions,
			vec![("oauth_session_handle".to_owned(), "h1".to_owned())]
		);
		assert_eq!(request.parameters, vec![("scope".to_owned(), "photos".to_owned())]);

		let mut names =
			request.signed_pairs().into_iter().map(|(name, _)| name).collect::<Vec<_>>();

		names.sort();

		assert_eq!(
			names,
			[
				"format",
				"oauth_consumer_key",
				"oauth_nonce",
				"oauth_session_handle",
				"oauth_signature_method",
				"oauth_timestamp",
				"oauth_token",
				"scope",
			]
		);
		assert!(SignatureMethod::HmacSha1.verify(&request, &secrets, &request.oauth.signature));

		let stripped = SignedRequest::new("POST", request.url.clone(), OAuthParams {
			extensions: Vec::new(),
			..request.oauth.clone()
		})
		.with_parameter("scope", "photos");

		assert!(!SignatureMethod::HmacSha1.verify(&stripped, &secrets, &request.oauth.signature));
	}

	#[test]
	fn query_string_protocol_parameters_are_parsed() {
		let request = SignedRequest::from_parameters(
			"GET",
			url(
				"https://api.example.com/r?oauth_consumer_key=c1&oauth_nonce=n1&oauth_timestamp=5&oauth_signature_method=PLAINTEXT&oauth_signature=s1%26&page=2",
			),
			&[],
		)
		.expect("Query-string protocol parameters should assemble.");

		assert_eq!(request.oauth.consumer_key, "c1");
		assert_eq!(request.oauth.signature, "s1&");
		assert!(request.oauth.extensions.is_empty());
		let signed = request.signed_pairs();

		assert_eq!(signed.iter().filter(|(name, _)| name == "oauth_nonce").count(), 1);
		assert!(signed.contains(&("page".into(), "2".into())));
		assert_eq!(
			SignedRequest::from_parameters("GET", url("https://api.example.com/r?page=2"), &[]),
			Err(RequestError::MissingParameter { name: "oauth_consumer_key" })
		);
	}

	#[test]
	fn debug_output_redacts_signature_and_verifier() {
		let params = OAuthParams::new("c1", "n1", 1, "PLAINTEXT").with_verifier("v1");
		let rendered = format!("{params:?}");

		assert!(!rendered.contains("v1\""));
		assert!(rendered.contains("<redacted>"));
	}
}

//! Adapter-level error types shared across flows, provider hooks, and transports.

// self
use crate::{_prelude::*, provider::StrategyConfigError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical adapter error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Structured error reported by Mail.ru (authorization, token, or data endpoint).
	#[error(transparent)]
	Provider(#[from] ProviderError),
	/// RFC 6749 error returned by the token endpoint.
	#[error(transparent)]
	OAuth(#[from] OAuthError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure or unexpected response without a structured error body.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Malformed payload returned by an otherwise successful call.
	#[error(transparent)]
	Parse(#[from] ParseError),
	/// The host verify callback reported an error.
	#[error("Verify callback failed.")]
	Verify {
		/// Error returned by the host application.
		#[source]
		source: BoxError,
	},
}
impl Error {
	/// Wraps an error raised by the host verify callback.
	pub fn verify(src: impl Into<BoxError>) -> Self {
		Self::Verify { source: src.into() }
	}

	/// Returns the provider error when Mail.ru reported a structured failure.
	pub fn as_provider(&self) -> Option<&ProviderError> {
		match self {
			Self::Provider(err) => Some(err),
			_ => None,
		}
	}
}

/// Mail.ru endpoint families contacted by the adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
	/// OAuth 2.0 token endpoint.
	Token,
	/// REST profile endpoint (`users.getInfo`).
	Profile,
}
impl Endpoint {
	/// Returns a stable label for the endpoint.
	pub const fn as_str(self) -> &'static str {
		match self {
			Endpoint::Token => "token",
			Endpoint::Profile => "profile",
		}
	}

	const fn failure_message(self) -> &'static str {
		match self {
			Endpoint::Token => "Failed to obtain access token.",
			Endpoint::Profile => "Failed to fetch user profile.",
		}
	}
}
impl Display for Endpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Which Mail.ru surface produced a [`ProviderError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
	/// The user or provider refused the authorization request.
	Authorization,
	/// The token endpoint returned a structured error object.
	Token,
	/// The profile endpoint returned a structured error object.
	Data,
}
impl ProviderErrorKind {
	/// Discriminant name reported for the error kind.
	pub const fn name(self) -> &'static str {
		match self {
			ProviderErrorKind::Authorization => "MailruAuthorizationError",
			ProviderErrorKind::Token => "MailruTokenError",
			ProviderErrorKind::Data => "MailruAPIError",
		}
	}
}
impl Display for ProviderErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.name())
	}
}

/// Structured Mail.ru error carrying the provider's diagnostic fields.
///
/// Values are built from the `error` object of a provider response and are never rejected:
/// every field is optional except the kind. The HTTP-style status is always 500.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("{}", provider_message(.message, .kind))]
pub struct ProviderError {
	/// Surface that produced the error.
	pub kind: ProviderErrorKind,
	/// Human-readable message.
	pub message: Option<String>,
	/// Provider error type.
	#[serde(rename = "type")]
	pub error_type: Option<String>,
	/// Numeric provider error code.
	pub code: Option<i64>,
	/// Numeric provider error subcode.
	pub subcode: Option<i64>,
	/// Provider trace identifier.
	pub trace_id: Option<String>,
	/// Link to the provider's error documentation.
	pub uri: Option<String>,
}
impl ProviderError {
	/// Fixed HTTP-style status attached to every provider error.
	pub const STATUS: u16 = 500;

	/// Creates an empty error of the provided kind.
	pub fn new(kind: ProviderErrorKind) -> Self {
		Self {
			kind,
			message: None,
			error_type: None,
			code: None,
			subcode: None,
			trace_id: None,
			uri: None,
		}
	}

	/// Builds an authorization error from the redirect's `error_description`/`error_code`.
	pub fn authorization(message: Option<String>, code: Option<i64>) -> Self {
		Self { message, code, ..Self::new(ProviderErrorKind::Authorization) }
	}

	/// Builds an error from a provider `error` object.
	///
	/// Reads `message`, `type`, `code`, `error_subcode`, and `fbtrace_id`; Mail.ru's REST
	/// spelling (`error_msg`, `error_code`) is accepted when the former are absent.
	pub fn from_error_object(kind: ProviderErrorKind, object: &JsonMap<String, JsonValue>) -> Self {
		let text = |key: &str| object.get(key).and_then(json_text);
		let number = |key: &str| object.get(key).and_then(json_number);

		Self {
			kind,
			message: text("message").or_else(|| text("error_msg")),
			error_type: text("type"),
			code: number("code").or_else(|| number("error_code")),
			subcode: number("error_subcode"),
			trace_id: text("fbtrace_id"),
			uri: None,
		}
	}

	/// Discriminant name of the error.
	pub fn name(&self) -> &'static str {
		self.kind.name()
	}

	/// HTTP-style status (always 500).
	pub fn status(&self) -> u16 {
		Self::STATUS
	}
}

/// Standard OAuth 2.0 error (`error`, `error_description`, `error_uri`) from the token
/// endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("{}", oauth_message(.description, .code))]
pub struct OAuthError {
	/// RFC 6749 error code.
	pub code: String,
	/// Optional `error_description`.
	pub description: Option<String>,
	/// Optional `error_uri`.
	pub uri: Option<String>,
}
impl OAuthError {
	/// Fixed HTTP-style status attached to token errors.
	pub const STATUS: u16 = 500;

	/// HTTP-style status (always 500).
	pub fn status(&self) -> u16 {
		Self::STATUS
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Strategy configuration failed validation.
	#[error(transparent)]
	Strategy(#[from] StrategyConfigError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A configured endpoint cannot be handed to the OAuth client.
	#[error("Configuration contains an invalid URL.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Signed profile requests need the client secret.
	#[error("A client secret is required to sign profile requests.")]
	MissingClientSecret,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures and responses that carried no structured error.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint being called.
		endpoint: Endpoint,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the {endpoint} endpoint.")]
	Io {
		/// Endpoint being called.
		endpoint: Endpoint,
		/// IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The endpoint answered with a failure that could not be classified.
	#[error("{}", endpoint_failure(.endpoint))]
	UnexpectedResponse {
		/// Endpoint being called.
		endpoint: Endpoint,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Response body (lossy UTF-8), when available.
		body: Option<String>,
		/// Extra detail reported by the OAuth client.
		detail: Option<String>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(endpoint: Endpoint, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}

	/// Builds an unexpected-response error from a status/body pair.
	pub fn unexpected(endpoint: Endpoint, status: Option<u16>, body: Option<&[u8]>) -> Self {
		Self::UnexpectedResponse {
			endpoint,
			status,
			body: body.map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
			detail: None,
		}
	}

	/// Endpoint tied to the failure.
	pub fn endpoint(&self) -> Endpoint {
		match self {
			Self::Network { endpoint, .. }
			| Self::Io { endpoint, .. }
			| Self::UnexpectedResponse { endpoint, .. } => *endpoint,
		}
	}
}

/// Malformed JSON returned by an otherwise successful call.
#[derive(Debug, ThisError)]
pub enum ParseError {
	/// Profile body is not valid JSON.
	#[error("Failed to parse user profile.")]
	ProfileJson {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Profile body is JSON but not a list holding a profile object.
	#[error("Failed to parse user profile: {reason}.")]
	ProfileShape {
		/// What was wrong with the payload.
		reason: &'static str,
	},
	/// Token endpoint responded with a body that is not a token response.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

fn provider_message<'a>(message: &'a Option<String>, kind: &ProviderErrorKind) -> &'a str {
	message.as_deref().unwrap_or(kind.name())
}

fn oauth_message<'a>(description: &'a Option<String>, code: &'a str) -> &'a str {
	description.as_deref().unwrap_or(code)
}

fn endpoint_failure(endpoint: &Endpoint) -> &'static str {
	endpoint.failure_message()
}

fn json_text(value: &JsonValue) -> Option<String> {
	match value {
		JsonValue::String(text) => Some(text.clone()),
		JsonValue::Number(number) => Some(number.to_string()),
		_ => None,
	}
}

fn json_number(value: &JsonValue) -> Option<i64> {
	match value {
		JsonValue::Number(number) => number.as_i64(),
		JsonValue::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

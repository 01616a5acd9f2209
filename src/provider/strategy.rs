//! Provider strategy hooks called by the generic OAuth 2.0 core.
//!
//! The core owns redirects, code exchanges, and transports; a [`ProviderStrategy`]
//! contributes only what differs per provider: extra authorization parameters, the
//! profile fetch, and token error parsing. The hooks work on crate-owned data types so
//! implementations never depend on a particular HTTP client.

// self
use crate::{
	_prelude::*,
	auth::{Profile, ScopeSet, TokenSecret},
	error::OAuthError,
};

/// Boxed future returned by [`ProviderStrategy::user_profile`].
pub type ProfileFuture<'a> = Pin<Box<dyn Future<Output = Result<Profile>> + 'a + Send>>;
/// Boxed future returned by [`ResourceClient::get`].
pub type ResourceFuture<'a> = Pin<Box<dyn Future<Output = Result<ResourceResponse>> + 'a + Send>>;

/// Per-request options for the authorization redirect.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizeOptions {
	/// Consent screen rendering mode (`page`, `popup`, `touch`), passed through verbatim.
	pub display: Option<String>,
	/// Scopes overriding the configured defaults.
	pub scope: Option<ScopeSet>,
	/// Redirect URI overriding the configured callback URL.
	pub callback_url: Option<Url>,
}
impl AuthorizeOptions {
	/// Sets the display mode.
	pub fn with_display(mut self, display: impl Into<String>) -> Self {
		self.display = Some(display.into());

		self
	}

	/// Overrides the requested scopes.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = Some(scope);

		self
	}

	/// Overrides the redirect URI.
	pub fn with_callback_url(mut self, url: Url) -> Self {
		self.callback_url = Some(url);

		self
	}
}

/// Status and body of a protected-resource response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ResourceResponse {
	/// Returns true for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Protected-resource GET capability lent to strategies by the core.
///
/// Transport failures are already mapped into [`Error`]; any HTTP status is returned as a
/// [`ResourceResponse`] so strategies can inspect provider error bodies.
pub trait ResourceClient: Send + Sync {
	/// Issues a GET request to `url`.
	fn get(&self, url: Url) -> ResourceFuture<'_>;
}

/// Provider hooks consumed by [`OAuth2Strategy`](crate::flows::OAuth2Strategy).
///
/// Only [`name`](Self::name) and [`user_profile`](Self::user_profile) are mandatory; the
/// other hooks default to plain OAuth 2.0 behavior.
pub trait ProviderStrategy: Send + Sync {
	/// Stable provider name reported by the strategy.
	fn name(&self) -> &'static str;

	/// Extra query parameters merged into the authorization redirect.
	fn authorization_params(&self, _options: &AuthorizeOptions) -> BTreeMap<String, String> {
		BTreeMap::new()
	}

	/// Fetches and normalizes the user profile for an access token.
	fn user_profile<'a>(
		&'a self,
		access_token: &'a TokenSecret,
		client: &'a dyn ResourceClient,
	) -> ProfileFuture<'a>;

	/// Turns a token endpoint error body into an [`Error`].
	///
	/// Returning `None` makes the core report a generic "Failed to obtain access token"
	/// transport error instead.
	fn parse_error_response(&self, body: &[u8], status: u16) -> Option<Error> {
		parse_oauth_error_response(body, status)
	}
}

/// Default RFC 6749 error parsing: `{"error": "...", "error_description": ..., "error_uri": ...}`.
pub fn parse_oauth_error_response(body: &[u8], _status: u16) -> Option<Error> {
	#[derive(Deserialize)]
	struct RawOAuthError {
		error: String,
		error_description: Option<String>,
		error_uri: Option<String>,
	}

	let raw = serde_json::from_slice::<RawOAuthError>(body).ok()?;

	Some(
		OAuthError { code: raw.error, description: raw.error_description, uri: raw.error_uri }
			.into(),
	)
}

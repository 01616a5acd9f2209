//! Strategy configuration with Mail.ru's default endpoints and validation.

// self
use crate::{
	_prelude::*,
	auth::{ProfileField, ScopeSet},
};

/// Default Mail.ru authorization endpoint.
pub const DEFAULT_AUTHORIZATION_URL: &str = "https://connect.mail.ru/oauth/authorize";
/// Default Mail.ru token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://connect.mail.ru/oauth/token";
/// Default Mail.ru profile endpoint (`users.getInfo` REST method).
pub const DEFAULT_PROFILE_URL: &str = "http://www.appsmail.ru/platform/api?method=users.getInfo";
/// Default scope separator.
pub const DEFAULT_SCOPE_SEPARATOR: char = ',';

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	#[default]
	/// Form POST body parameters for `client_id`/`client_secret` (what Mail.ru expects).
	ClientSecretPost,
	/// Public clients that prove possession via PKCE.
	NoneWithPkce,
}

/// Errors raised while constructing or validating a [`StrategyConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StrategyConfigError {
	/// The client identifier is required.
	#[error("Missing client identifier.")]
	MissingClientId,
	/// The client identifier contains whitespace.
	#[error("Client identifier contains whitespace.")]
	InvalidClientId,
	/// An endpoint could not be parsed.
	#[error("The {endpoint} endpoint is not a valid URL: {url}.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint value that failed validation.
		url: String,
	},
	/// OAuth endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Reject scope separators that are control characters.
	#[error("Scope separator must be a printable character.")]
	InvalidScopeSeparator {
		/// Invalid separator that was supplied.
		separator: char,
	},
	/// A scope entry would be split apart by the separator once joined.
	#[error("Scope `{scope}` contains the scope separator `{separator}`.")]
	ScopeContainsSeparator {
		/// Offending scope entry.
		scope: String,
		/// Configured separator.
		separator: char,
	},
	/// PKCE binds the verifier to a tracked authorization request.
	#[error("The `pkce` option requires enabling `state`.")]
	PkceRequiresState,
}

/// Immutable strategy configuration.
///
/// Build it with [`StrategyConfig::builder`] or deserialize it; both paths run the same
/// validation and fill in Mail.ru's default endpoints.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StrategyConfigBuilder")]
pub struct StrategyConfig {
	/// Mail.ru application ID.
	pub client_id: String,
	/// Mail.ru application secret (signs profile requests).
	#[serde(skip_serializing)]
	pub client_secret: Option<String>,
	/// Redirect URI registered with Mail.ru.
	pub callback_url: Option<Url>,
	/// Authorization endpoint.
	pub authorization_url: Url,
	/// Token endpoint.
	pub token_url: Url,
	/// Profile endpoint.
	pub profile_url: Url,
	/// Profile fields copied by the normalizer; `None` selects [`ProfileField::DEFAULT`].
	pub profile_fields: Option<Vec<ProfileField>>,
	/// Scopes requested when the caller does not pass any.
	pub scope: ScopeSet,
	/// Character used to join scopes.
	pub scope_separator: char,
	/// Token endpoint client authentication.
	pub client_auth_method: ClientAuthMethod,
	/// Generate and verify an opaque `state` value.
	pub state: bool,
	/// Attach an S256 PKCE challenge to authorization requests.
	pub pkce: bool,
	/// Skip the profile fetch after the code exchange.
	pub skip_user_profile: bool,
}
impl StrategyConfig {
	/// Creates a new builder for the provided client identifier.
	pub fn builder(client_id: impl Into<String>) -> StrategyConfigBuilder {
		StrategyConfigBuilder::new(client_id)
	}

	/// Profile fields the normalizer should copy.
	pub fn profile_fields(&self) -> &[ProfileField] {
		self.profile_fields.as_deref().unwrap_or(&ProfileField::DEFAULT)
	}

	/// Validates invariants for the configuration.
	pub fn validate(&self) -> Result<(), StrategyConfigError> {
		if self.client_id.is_empty() {
			return Err(StrategyConfigError::MissingClientId);
		}
		if self.client_id.chars().any(char::is_whitespace) {
			return Err(StrategyConfigError::InvalidClientId);
		}
		if self.pkce && !self.state {
			return Err(StrategyConfigError::PkceRequiresState);
		}

		require_https("authorization", &self.authorization_url)?;
		require_https("token", &self.token_url)?;
		require_http("profile", &self.profile_url)?;

		if self.scope_separator.is_control() {
			return Err(StrategyConfigError::InvalidScopeSeparator {
				separator: self.scope_separator,
			});
		}
		if let Some(scope) = self.scope.iter().find(|scope| scope.contains(self.scope_separator)) {
			return Err(StrategyConfigError::ScopeContainsSeparator {
				scope: scope.to_owned(),
				separator: self.scope_separator,
			});
		}

		Ok(())
	}
}
impl Debug for StrategyConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StrategyConfig")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("callback_url", &self.callback_url)
			.field("authorization_url", &self.authorization_url)
			.field("token_url", &self.token_url)
			.field("profile_url", &self.profile_url)
			.field("profile_fields", &self.profile_fields)
			.field("scope", &self.scope)
			.field("scope_separator", &self.scope_separator)
			.field("client_auth_method", &self.client_auth_method)
			.field("state", &self.state)
			.field("pkce", &self.pkce)
			.field("skip_user_profile", &self.skip_user_profile)
			.finish()
	}
}
impl TryFrom<StrategyConfigBuilder> for StrategyConfig {
	type Error = StrategyConfigError;

	fn try_from(builder: StrategyConfigBuilder) -> Result<Self, Self::Error> {
		builder.build()
	}
}

/// Builder for [`StrategyConfig`] values; also the serde representation of the config.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct StrategyConfigBuilder {
	/// Mail.ru application ID.
	pub client_id: String,
	/// Mail.ru application secret.
	pub client_secret: Option<String>,
	/// Redirect URI registered with Mail.ru.
	pub callback_url: Option<Url>,
	/// Authorization endpoint override.
	pub authorization_url: Option<Url>,
	/// Token endpoint override.
	pub token_url: Option<Url>,
	/// Profile endpoint override.
	pub profile_url: Option<Url>,
	/// Profile field override.
	pub profile_fields: Option<Vec<ProfileField>>,
	/// Default scopes.
	pub scope: ScopeSet,
	/// Scope separator override.
	pub scope_separator: Option<char>,
	/// Token endpoint client authentication.
	pub client_auth_method: ClientAuthMethod,
	/// Generate and verify an opaque `state` value.
	pub state: bool,
	/// Attach an S256 PKCE challenge.
	pub pkce: bool,
	/// Skip the profile fetch after the code exchange.
	pub skip_user_profile: bool,
}
impl StrategyConfigBuilder {
	/// Creates a new builder seeded with the provided client identifier.
	pub fn new(client_id: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), ..Default::default() }
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Sets the redirect URI.
	pub fn callback_url(mut self, url: Url) -> Self {
		self.callback_url = Some(url);

		self
	}

	/// Overrides the authorization endpoint.
	pub fn authorization_url(mut self, url: Url) -> Self {
		self.authorization_url = Some(url);

		self
	}

	/// Overrides the token endpoint.
	pub fn token_url(mut self, url: Url) -> Self {
		self.token_url = Some(url);

		self
	}

	/// Overrides the profile endpoint.
	pub fn profile_url(mut self, url: Url) -> Self {
		self.profile_url = Some(url);

		self
	}

	/// Limits the profile fields copied by the normalizer.
	pub fn profile_fields<I>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = ProfileField>,
	{
		self.profile_fields = Some(fields.into_iter().collect());

		self
	}

	/// Sets the default scopes.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Overrides the scope separator.
	pub fn scope_separator(mut self, separator: char) -> Self {
		self.scope_separator = Some(separator);

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Enables or disables `state` generation.
	pub fn state(mut self, enabled: bool) -> Self {
		self.state = enabled;

		self
	}

	/// Enables or disables PKCE.
	pub fn pkce(mut self, enabled: bool) -> Self {
		self.pkce = enabled;

		self
	}

	/// Enables or disables the post-exchange profile fetch.
	pub fn skip_user_profile(mut self, skip: bool) -> Self {
		self.skip_user_profile = skip;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<StrategyConfig, StrategyConfigError> {
		let config = StrategyConfig {
			client_id: self.client_id,
			client_secret: self.client_secret,
			callback_url: self.callback_url,
			authorization_url: endpoint_or_default(
				"authorization",
				self.authorization_url,
				DEFAULT_AUTHORIZATION_URL,
			)?,
			token_url: endpoint_or_default("token", self.token_url, DEFAULT_TOKEN_URL)?,
			profile_url: endpoint_or_default("profile", self.profile_url, DEFAULT_PROFILE_URL)?,
			profile_fields: self.profile_fields,
			scope: self.scope,
			scope_separator: self.scope_separator.unwrap_or(DEFAULT_SCOPE_SEPARATOR),
			client_auth_method: self.client_auth_method,
			state: self.state,
			pkce: self.pkce,
			skip_user_profile: self.skip_user_profile,
		};

		config.validate()?;

		Ok(config)
	}
}
impl Debug for StrategyConfigBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StrategyConfigBuilder")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.finish_non_exhaustive()
	}
}

fn endpoint_or_default(
	name: &'static str,
	url: Option<Url>,
	default: &'static str,
) -> Result<Url, StrategyConfigError> {
	match url {
		Some(url) => Ok(url),
		None => Url::parse(default).map_err(|_| StrategyConfigError::InvalidEndpoint {
			endpoint: name,
			url: default.to_owned(),
		}),
	}
}

fn require_https(name: &'static str, url: &Url) -> Result<(), StrategyConfigError> {
	if url.scheme() != "https" {
		Err(StrategyConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

fn require_http(name: &'static str, url: &Url) -> Result<(), StrategyConfigError> {
	if matches!(url.scheme(), "http" | "https") {
		Ok(())
	} else {
		Err(StrategyConfigError::InvalidEndpoint { endpoint: name, url: url.to_string() })
	}
}

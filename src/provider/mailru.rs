//! Mail.ru implementation of the provider hooks.
//!
//! Mail.ru's profile lives behind its REST platform API rather than an OAuth userinfo
//! endpoint: requests carry the access token as `session_key` and are signed with an MD5
//! digest of the sorted query parameters followed by the application secret.

// crates.io
use md5::{Digest, Md5};
// self
use crate::{
	_prelude::*,
	auth::{Profile, ProfileField, TokenSecret, profile},
	error::{ConfigError, Endpoint, ParseError, ProviderError, ProviderErrorKind, TransportError},
	provider::{
		AuthorizeOptions, ProfileFuture, ProviderStrategy, ResourceClient, StrategyConfig,
		parse_oauth_error_response,
	},
};

/// Provider name reported by [`MailruStrategy`] and stamped on every profile.
pub const PROVIDER_NAME: &str = "mailru";

/// Mail.ru provider hooks.
#[derive(Clone)]
pub struct MailruStrategy {
	client_id: String,
	client_secret: Option<TokenSecret>,
	profile_url: Url,
	profile_fields: Vec<ProfileField>,
}
impl MailruStrategy {
	/// Builds the hooks from a validated configuration.
	pub fn new(config: &StrategyConfig) -> Self {
		Self {
			client_id: config.client_id.clone(),
			client_secret: config.client_secret.as_deref().map(TokenSecret::new),
			profile_url: config.profile_url.clone(),
			profile_fields: config.profile_fields().to_vec(),
		}
	}

	/// Builds the signed `users.getInfo` URL for an access token.
	pub fn signed_profile_url(&self, access_token: &str) -> Result<Url> {
		let secret = self.client_secret.as_ref().ok_or(ConfigError::MissingClientSecret)?;
		let mut url = self.profile_url.clone();

		url.query_pairs_mut()
			.append_pair("app_id", &self.client_id)
			.append_pair("session_key", access_token)
			.append_pair("secure", "1");

		let sig = sign_query(&url, secret.expose());

		url.query_pairs_mut().append_pair("sig", &sig);

		Ok(url)
	}

	/// Parses a successful `users.getInfo` body into a normalized profile.
	///
	/// `id` and `display_name` are filled whatever the configured field list says.
	pub fn parse_profile(&self, body: &[u8]) -> Result<Profile> {
		let payload = parse_json(body)?;

		if let Some(error) = structured_error(&payload) {
			return Err(ProviderError::from_error_object(ProviderErrorKind::Data, error).into());
		}

		let entry = match payload {
			JsonValue::Array(mut entries) if !entries.is_empty() => entries.swap_remove(0),
			_ => return Err(ParseError::ProfileShape { reason: "expected a non-empty profile list" }.into()),
		};
		let JsonValue::Object(json) = entry else {
			return Err(ParseError::ProfileShape { reason: "profile entry is not an object" }.into());
		};
		let id = profile::text(&json, "uid")
			.ok_or(ParseError::ProfileShape { reason: "profile has no uid" })?;
		let first_name = profile::text(&json, "first_name");
		let last_name = profile::text(&json, "last_name");
		let mut normalized = Profile::normalize(PROVIDER_NAME, &json, &self.profile_fields);

		normalized.display_name = profile::join_name(first_name.as_deref(), last_name.as_deref());
		normalized.id = id;
		normalized.raw = String::from_utf8_lossy(body).into_owned();
		normalized.json = json;

		Ok(normalized)
	}
}
impl Debug for MailruStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MailruStrategy")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("profile_url", &self.profile_url)
			.field("profile_fields", &self.profile_fields)
			.finish()
	}
}
impl ProviderStrategy for MailruStrategy {
	fn name(&self) -> &'static str {
		PROVIDER_NAME
	}

	fn authorization_params(&self, options: &AuthorizeOptions) -> BTreeMap<String, String> {
		let mut params = BTreeMap::new();

		if let Some(display) = &options.display {
			params.insert("display".into(), display.clone());
		}

		params
	}

	fn user_profile<'a>(
		&'a self,
		access_token: &'a TokenSecret,
		client: &'a dyn ResourceClient,
	) -> ProfileFuture<'a> {
		Box::pin(async move {
			let url = self.signed_profile_url(access_token.expose())?;
			let response = client.get(url).await?;

			if response.is_success() {
				return self.parse_profile(&response.body);
			}

			let structured = serde_json::from_slice::<JsonValue>(&response.body)
				.ok()
				.and_then(|payload| {
					structured_error(&payload).map(|error| {
						ProviderError::from_error_object(ProviderErrorKind::Data, error)
					})
				});

			match structured {
				Some(err) => Err(err.into()),
				None => Err(TransportError::unexpected(
					Endpoint::Profile,
					Some(response.status),
					Some(response.body.as_slice()),
				)
				.into()),
			}
		})
	}

	fn parse_error_response(&self, body: &[u8], status: u16) -> Option<Error> {
		let payload = serde_json::from_slice::<JsonValue>(body).ok()?;

		if let Some(error) = structured_error(&payload) {
			return Some(ProviderError::from_error_object(ProviderErrorKind::Token, error).into());
		}

		parse_oauth_error_response(body, status)
	}
}

/// Computes the Mail.ru request signature for every query parameter of `url`.
///
/// Parameters are sorted by name, rendered as `name=value`, concatenated without separators,
/// and suffixed with the application secret; the result is the lowercase hex MD5 digest.
pub fn sign_query(url: &Url, secret: &str) -> String {
	let mut pairs = url.query_pairs().collect::<Vec<_>>();

	pairs.sort_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));

	let mut payload = String::new();

	for (key, value) in pairs {
		payload.push_str(&key);
		payload.push('=');
		payload.push_str(&value);
	}

	payload.push_str(secret);

	format!("{:x}", Md5::digest(payload.as_bytes()))
}

fn parse_json(body: &[u8]) -> Result<JsonValue> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| ParseError::ProfileJson { source }.into())
}

fn structured_error(payload: &JsonValue) -> Option<&JsonMap<String, JsonValue>> {
	payload.as_object()?.get("error")?.as_object()
}

//! Internal OAuth client facade over the `oauth2` crate.
//!
//! The facade owns the configured `oauth2` [`Client`], performs the authorization code exchange,
//! and lends strategies a [`ResourceClient`] for protected-resource calls. Every failure is
//! classified here so callers only ever see crate [`Error`] values.

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret,
	EndpointNotSet, EndpointSet, ExtraTokenFields, HttpClientError, HttpRequest,
	PkceCodeVerifier, RedirectUrl, RequestTokenError, StandardRevocableToken,
	StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
	http::{Method, Request, header::ACCEPT},
};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenGrant},
	error::{ConfigError, Endpoint, OAuthError, ParseError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{
		ClientAuthMethod, ProviderStrategy, ResourceClient, ResourceFuture, ResourceResponse,
		StrategyConfig,
	},
};

type ProviderTokenResponse = StandardTokenResponse<ProviderTokenFields, BasicTokenType>;
type ConfiguredClient = Client<
	BasicErrorResponse,
	ProviderTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted while calling `endpoint` into a crate error.
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(endpoint, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(source) => TransportError::Io { endpoint, source }.into(),
			HttpClientError::Other(message) => TransportError::UnexpectedResponse {
				endpoint,
				status: meta_status(meta),
				body: None,
				detail: Some(message),
			}
			.into(),
			_ => TransportError::unexpected(endpoint, meta_status(meta), None).into(),
		}
	}
}

/// Token response members outside RFC 6749 (`x_mailru_vid`, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ProviderTokenFields {
	#[serde(flatten)]
	fields: JsonMap<String, JsonValue>,
}
impl ExtraTokenFields for ProviderTokenFields {}

pub(crate) struct BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_config(
		config: &StrategyConfig,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let auth_url = AuthUrl::new(config.authorization_url.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let token_url = TokenUrl::new(config.token_url.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let mut oauth_client: ConfiguredClient =
			Client::new(ClientId::new(config.client_id.clone()))
				.set_auth_uri(auth_url)
				.set_token_uri(token_url);

		if !matches!(config.client_auth_method, ClientAuthMethod::NoneWithPkce)
			&& let Some(secret) = &config.client_secret
		{
			oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.clone()));
		}
		if matches!(config.client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self { oauth_client, http_client, error_mapper })
	}

	/// Exchanges an authorization code at the token endpoint.
	pub(crate) fn exchange_authorization_code<'a>(
		&'a self,
		hooks: &'a dyn ProviderStrategy,
		code: &'a str,
		pkce_verifier: Option<&'a str>,
		redirect_uri: Option<&'a Url>,
		requested_scope: &'a ScopeSet,
	) -> FacadeFuture<'a, TokenGrant> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let mut request =
				self.oauth_client.exchange_code(AuthorizationCode::new(code.to_owned()));

			if let Some(verifier) = pkce_verifier {
				request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier.to_owned()));
			}
			if let Some(redirect) = redirect_uri {
				let redirect_url = RedirectUrl::new(redirect.to_string())
					.map_err(|source| ConfigError::InvalidRedirect { source })?;

				request = request.set_redirect_uri(Cow::Owned(redirect_url));
			}

			let response = request.request_async(&instrumented).await.map_err(|err| {
				map_request_error(hooks, meta.take(), err, self.error_mapper.as_ref())
			})?;

			Ok(map_token_response(requested_scope, response))
		})
	}

	/// Borrows the transport as a [`ResourceClient`] for provider hooks.
	pub(crate) fn resource_client(&self) -> FacadeResourceClient<'_, C, M> {
		FacadeResourceClient {
			http_client: self.http_client.as_ref(),
			error_mapper: self.error_mapper.as_ref(),
		}
	}
}

/// [`ResourceClient`] backed by the facade's transport and error mapper.
pub(crate) struct FacadeResourceClient<'f, C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: &'f C,
	error_mapper: &'f M,
}
impl<C, M> ResourceClient for FacadeResourceClient<'_, C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn get(&self, url: Url) -> ResourceFuture<'_> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let request: HttpRequest = Request::builder()
				.method(Method::GET)
				.uri(url.as_str())
				.header(ACCEPT, "application/json")
				.body(Vec::new())
				.map_err(ConfigError::from)?;
			let instrumented = self.http_client.with_metadata(meta.clone());
			let response = instrumented.call(request).await.map_err(|err| {
				self.error_mapper.map_transport_error(Endpoint::Profile, meta.take().as_ref(), err)
			})?;

			Ok(ResourceResponse { status: response.status().as_u16(), body: response.into_body() })
		})
	}
}

fn map_token_response(
	requested_scope: &ScopeSet,
	response: ProviderTokenResponse,
) -> TokenGrant {
	let granted_scope = response
		.scopes()
		.and_then(|scopes| ScopeSet::new(scopes.iter().map(|scope| scope.as_str())).ok())
		.filter(|scope| !scope.is_empty())
		.unwrap_or_else(|| requested_scope.clone());
	let token_type: &str = response.token_type().as_ref();
	let mut grant = TokenGrant::new(response.access_token().secret().to_owned())
		.with_token_type(token_type)
		.with_scope(granted_scope)
		.with_extra(response.extra_fields().fields.clone());

	if let Some(refresh) = response.refresh_token() {
		grant = grant.with_refresh_token(refresh.secret().to_owned());
	}
	if let Some(expires_in) = response.expires_in()
		&& let Ok(secs) = i64::try_from(expires_in.as_secs())
	{
		grant = grant.with_expires_in(Duration::seconds(secs));
	}

	grant
}

fn map_request_error<E, M>(
	hooks: &dyn ProviderStrategy,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let status = meta_status(meta.as_ref());

	match err {
		RequestTokenError::ServerResponse(response) => meta
			.as_ref()
			.and_then(|meta| meta.error_body.as_deref())
			.and_then(|body| hooks.parse_error_response(body, status.unwrap_or_default()))
			.unwrap_or_else(|| map_server_response(response)),
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(Endpoint::Token, meta.as_ref(), error),
		RequestTokenError::Parse(source, body) => {
			if let Some(err) = hooks.parse_error_response(&body, status.unwrap_or_default()) {
				return err;
			}

			match status {
				Some(code) if (200..300).contains(&code) =>
					ParseError::TokenResponse { source, status }.into(),
				_ =>
					TransportError::unexpected(Endpoint::Token, status, Some(body.as_slice())).into(),
			}
		},
		RequestTokenError::Other(message) => TransportError::UnexpectedResponse {
			endpoint: Endpoint::Token,
			status,
			body: meta
				.and_then(|meta| meta.error_body)
				.map(|body| String::from_utf8_lossy(&body).into_owned()),
			detail: Some(message),
		}
		.into(),
	}
}

fn map_server_response(response: BasicErrorResponse) -> Error {
	OAuthError {
		code: response.error().as_ref().to_owned(),
		description: response.error_description().cloned(),
		uri: response.error_uri().cloned(),
	}
	.into()
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(endpoint: Endpoint, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	TransportError::network(endpoint, err).into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

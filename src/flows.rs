//! Generic OAuth 2.0 login orchestration driven by provider hooks.
//!
//! [`OAuth2Strategy`] owns the configuration, the provider hooks, and the transport so the
//! individual steps (redirect construction, callback handling, code exchange, profile fetch)
//! only deal with their own logic.

pub mod authorize;
pub mod callback;
pub mod exchange;
pub mod verify;

pub use authorize::*;
pub use callback::*;
pub use verify::*;

// self
use crate::{
	_prelude::*,
	http::TokenHttpClient,
	oauth::{BasicFacade, TransportErrorMapper},
	provider::{ProviderStrategy, StrategyConfig},
};
#[cfg(feature = "reqwest")]
use crate::{
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	provider::MailruStrategy,
};

/// Strategy specialized for the crate's default reqwest transport stack.
#[cfg(feature = "reqwest")]
pub type ReqwestStrategy = OAuth2Strategy<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// OAuth 2.0 login strategy for a single provider.
///
/// The strategy is immutable after construction and can be shared across concurrent
/// requests; per-login state travels in [`AuthorizationSession`] values owned by the host.
#[derive(Clone)]
pub struct OAuth2Strategy<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Validated configuration.
	pub config: StrategyConfig,
	/// Provider hooks (authorization params, profile fetch, token error parsing).
	pub hooks: Arc<dyn ProviderStrategy>,
	/// HTTP client used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
}
impl<C, M> OAuth2Strategy<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a strategy that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: StrategyConfig,
		hooks: Arc<dyn ProviderStrategy>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self { config, hooks, http_client: http_client.into(), transport_mapper: mapper.into() }
	}

	/// Provider name reported by the hooks.
	pub fn name(&self) -> &'static str {
		self.hooks.name()
	}

	fn facade(&self) -> Result<BasicFacade<C, M>> {
		BasicFacade::from_config(
			&self.config,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)
	}
}
#[cfg(feature = "reqwest")]
impl OAuth2Strategy<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a strategy backed by a reqwest client with redirects disabled.
	pub fn new(config: StrategyConfig, hooks: Arc<dyn ProviderStrategy>) -> Result<Self> {
		Ok(Self::with_http_client(
			config,
			hooks,
			ReqwestHttpClient::without_redirects()?,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}

	/// Creates the Mail.ru strategy for `config`.
	pub fn mailru(config: StrategyConfig) -> Result<Self> {
		let hooks = Arc::new(MailruStrategy::new(&config));

		Self::new(config, hooks)
	}
}
impl<C, M> Debug for OAuth2Strategy<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Strategy")
			.field("name", &self.hooks.name())
			.field("config", &self.config)
			.finish()
	}
}

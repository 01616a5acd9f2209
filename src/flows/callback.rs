//! Callback handling: provider errors, state checks, code exchange, profile, verify.

// self
use crate::{
	_prelude::*,
	error::ProviderError,
	flows::{AuthInfo, AuthorizationRequest, AuthorizationSession, OAuth2Strategy, Verified, Verify},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::AuthorizeOptions,
};

/// Message reported when the callback `state` does not match the stored one.
pub const INVALID_STATE_MESSAGE: &str = "Invalid authorization request state.";
/// Message reported when no stored state is available to compare against.
pub const MISSING_SESSION_MESSAGE: &str = "Unable to verify authorization request state.";
/// Status attached to state failures.
pub const STATE_FAILURE_STATUS: u16 = 403;

/// Query parameters the provider appends to the redirect URI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackParams {
	/// Authorization code.
	pub code: Option<String>,
	/// Echoed `state`.
	pub state: Option<String>,
	/// RFC 6749 error code (`access_denied`, ...).
	pub error: Option<String>,
	/// Numeric provider error code.
	pub error_code: Option<String>,
	/// Human-readable error description.
	pub error_description: Option<String>,
	/// Link to error documentation.
	pub error_uri: Option<String>,
}
impl CallbackParams {
	/// Parses a raw query string (without the leading `?`); empty values count as absent.
	pub fn from_query(query: &str) -> Self {
		let mut params = Self::default();

		for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
			if value.is_empty() {
				continue;
			}

			let slot = match &*key {
				"code" => &mut params.code,
				"state" => &mut params.state,
				"error" => &mut params.error,
				"error_code" => &mut params.error_code,
				"error_description" => &mut params.error_description,
				"error_uri" => &mut params.error_uri,
				_ => continue,
			};

			*slot = Some(value.into_owned());
		}

		params
	}

	/// Parses the query component of a full callback URL.
	pub fn from_url(url: &Url) -> Self {
		Self::from_query(url.query().unwrap_or_default())
	}
}

/// Everything [`OAuth2Strategy::authenticate`] needs about the incoming request.
#[derive(Clone, Debug, Default)]
pub struct AuthenticateRequest {
	/// Callback query parameters; all empty for the initial login request.
	pub callback: CallbackParams,
	/// Options for the redirect issued when no callback parameters are present.
	pub options: AuthorizeOptions,
	/// Session stored when the redirect was issued.
	pub session: Option<AuthorizationSession>,
}
impl AuthenticateRequest {
	/// Creates a request for the callback parameters.
	pub fn new(callback: CallbackParams) -> Self {
		Self { callback, ..Default::default() }
	}

	/// Sets the authorization options.
	pub fn with_options(mut self, options: AuthorizeOptions) -> Self {
		self.options = options;

		self
	}

	/// Attaches the stored session.
	pub fn with_session(mut self, session: AuthorizationSession) -> Self {
		self.session = Some(session);

		self
	}
}

/// Result of a single [`OAuth2Strategy::authenticate`] call.
#[derive(Clone, Debug)]
pub enum AuthOutcome<U> {
	/// Send the user agent to the provider; store the session until the callback.
	Redirect(AuthorizationRequest),
	/// The login succeeded.
	Success {
		/// Host user returned by the verify callback.
		user: U,
		/// Optional info returned by the verify callback.
		info: Option<AuthInfo>,
	},
	/// The login was refused without an error.
	Fail {
		/// Reason, when one is known.
		info: Option<AuthInfo>,
		/// Suggested HTTP status.
		status: Option<u16>,
	},
}
impl<U> AuthOutcome<U> {
	fn fail(message: Option<String>, status: Option<u16>) -> Self {
		Self::Fail { info: Some(AuthInfo { message }), status }
	}
}

impl<C, M> OAuth2Strategy<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Drives one step of the login.
	///
	/// - `error=access_denied` fails with the provider's description.
	/// - Any other `error` raises an authorization [`ProviderError`].
	/// - A `code` is checked against the stored state, exchanged, optionally enriched with the
	///   profile, and handed to `verify`.
	/// - Otherwise a redirect is returned.
	pub async fn authenticate<U, V>(
		&self,
		request: AuthenticateRequest,
		verify: &V,
	) -> Result<AuthOutcome<U>>
	where
		V: ?Sized + Verify<U>,
	{
		const KIND: FlowKind = FlowKind::Authenticate;

		let span = FlowSpan::new(KIND, "authenticate");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.authenticate_inner(request, verify)).await;

		match &result {
			Ok(AuthOutcome::Fail { .. }) => obs::record_flow_outcome(KIND, FlowOutcome::Rejected),
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn authenticate_inner<U, V>(
		&self,
		request: AuthenticateRequest,
		verify: &V,
	) -> Result<AuthOutcome<U>>
	where
		V: ?Sized + Verify<U>,
	{
		let AuthenticateRequest { callback, options, session } = request;

		if let Some(error) = callback.error {
			if error == "access_denied" {
				return Ok(AuthOutcome::fail(callback.error_description, None));
			}

			let message = callback.error_description.unwrap_or_else(|| error.clone());
			let code = callback.error_code.as_deref().and_then(|code| code.trim().parse().ok());

			return Err(ProviderError {
				error_type: Some(error),
				uri: callback.error_uri,
				..ProviderError::authorization(Some(message), code)
			}
			.into());
		}

		let Some(code) = callback.code else {
			return Ok(AuthOutcome::Redirect(self.authorize(&options)));
		};
		let session = session.unwrap_or_default();

		if self.config.state {
			match (&session.state, &callback.state) {
				(None, _) =>
					return Ok(AuthOutcome::fail(
						Some(MISSING_SESSION_MESSAGE.into()),
						Some(STATE_FAILURE_STATUS),
					)),
				(Some(expected), Some(returned)) if expected == returned => (),
				_ =>
					return Ok(AuthOutcome::fail(
						Some(INVALID_STATE_MESSAGE.into()),
						Some(STATE_FAILURE_STATUS),
					)),
			}
		}

		let redirect_uri = session
			.redirect_uri
			.or(options.callback_url)
			.or_else(|| self.config.callback_url.clone());
		let scope = options.scope.unwrap_or_else(|| self.config.scope.clone());
		let grant = self
			.exchange(&code, redirect_uri.as_ref(), session.pkce_verifier.as_ref(), &scope)
			.await?;
		let profile = if self.config.skip_user_profile {
			None
		} else {
			Some(self.user_profile(&grant.access_token).await?)
		};

		match verify.verify(grant, profile).await? {
			Verified::User { user, info } => Ok(AuthOutcome::Success { user, info }),
			Verified::Rejected { info } => Ok(AuthOutcome::Fail { info, status: None }),
		}
	}
}

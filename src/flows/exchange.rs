//! Code exchange and profile fetch steps, callable on their own or via `authenticate`.

// self
use crate::{
	_prelude::*,
	auth::{Profile, ScopeSet, TokenGrant, TokenSecret},
	flows::OAuth2Strategy,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl<C, M> OAuth2Strategy<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges an authorization code for tokens.
	///
	/// Error bodies from the token endpoint go through the provider's error parser first; any
	/// response it cannot classify surfaces as "Failed to obtain access token".
	pub async fn exchange_code(
		&self,
		code: &str,
		redirect_uri: Option<&Url>,
		pkce_verifier: Option<&TokenSecret>,
	) -> Result<TokenGrant> {
		self.exchange(code, redirect_uri, pkce_verifier, &self.config.scope).await
	}

	/// Fetches and normalizes the user profile for `access_token`.
	pub async fn user_profile(&self, access_token: &TokenSecret) -> Result<Profile> {
		const KIND: FlowKind = FlowKind::UserProfile;

		let span = FlowSpan::new(KIND, "user_profile");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let facade = self.facade()?;
				let client = facade.resource_client();

				self.hooks.user_profile(access_token, &client).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	pub(crate) async fn exchange(
		&self,
		code: &str,
		redirect_uri: Option<&Url>,
		pkce_verifier: Option<&TokenSecret>,
		requested_scope: &ScopeSet,
	) -> Result<TokenGrant> {
		const KIND: FlowKind = FlowKind::ExchangeCode;

		let span = FlowSpan::new(KIND, "exchange_code");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let facade = self.facade()?;

				facade
					.exchange_authorization_code(
						self.hooks.as_ref(),
						code,
						pkce_verifier.map(TokenSecret::expose),
						redirect_uri,
						requested_scope,
					)
					.await
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}

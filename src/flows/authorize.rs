//! Authorization redirect construction with optional `state` and PKCE.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	flows::OAuth2Strategy,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::AuthorizeOptions,
};

const STATE_LEN: usize = 24;
const PKCE_VERIFIER_LEN: usize = 64;

/// PKCE challenge method attached to authorization requests.
pub const PKCE_CHALLENGE_METHOD: &str = "S256";

/// Redirect produced by [`OAuth2Strategy::authorize`].
#[derive(Clone, Debug)]
pub struct AuthorizationRequest {
	/// Fully-formed authorization URL to send the user agent to.
	pub url: Url,
	/// Per-login values the host must keep until the callback arrives.
	pub session: AuthorizationSession,
}

/// Per-login state the host persists between the redirect and the callback.
///
/// Serializable so it can live in whatever session store the host uses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationSession {
	/// Opaque `state` value that must round-trip through the provider.
	pub state: Option<String>,
	/// PKCE verifier matching the challenge sent in the redirect.
	pub pkce_verifier: Option<TokenSecret>,
	/// Redirect URI sent in the authorization request; repeated at the token endpoint.
	pub redirect_uri: Option<Url>,
}

impl<C, M> OAuth2Strategy<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds the authorization redirect.
	///
	/// Parameters are emitted as `response_type`, `redirect_uri`, `scope`, `state`,
	/// `code_challenge` + `code_challenge_method`, then the provider's extra parameters, with
	/// `client_id` last. Absent values are omitted.
	pub fn authorize(&self, options: &AuthorizeOptions) -> AuthorizationRequest {
		const KIND: FlowKind = FlowKind::Authorize;

		let _guard = FlowSpan::new(KIND, "authorize").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let redirect_uri =
			options.callback_url.clone().or_else(|| self.config.callback_url.clone());
		let scope = options.scope.as_ref().unwrap_or(&self.config.scope);
		let state = self.config.state.then(|| random_string(STATE_LEN));
		let pkce_verifier = self.config.pkce.then(|| random_string(PKCE_VERIFIER_LEN));
		let mut url = self.config.authorization_url.clone();
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("response_type", "code");

		if let Some(redirect) = &redirect_uri {
			pairs.append_pair("redirect_uri", redirect.as_str());
		}
		if let Some(scope_value) = scope.join(self.config.scope_separator) {
			pairs.append_pair("scope", &scope_value);
		}
		if let Some(state) = &state {
			pairs.append_pair("state", state);
		}
		if let Some(verifier) = &pkce_verifier {
			pairs.append_pair("code_challenge", &compute_pkce_challenge(verifier));
			pairs.append_pair("code_challenge_method", PKCE_CHALLENGE_METHOD);
		}

		for (key, value) in self.hooks.authorization_params(options) {
			pairs.append_pair(&key, &value);
		}

		pairs.append_pair("client_id", &self.config.client_id);

		drop(pairs);

		obs::record_flow_outcome(KIND, FlowOutcome::Success);

		AuthorizationRequest {
			url,
			session: AuthorizationSession {
				state,
				pkce_verifier: pkce_verifier.map(TokenSecret::new),
				redirect_uri,
			},
		}
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let digest = Sha256::digest(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(digest)
}

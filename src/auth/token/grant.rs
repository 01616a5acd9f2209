//! Tokens issued by the Mail.ru token endpoint for a single login.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
};

/// Tokens handed to the host verify callback after a successful code exchange.
///
/// The adapter never persists grants; ownership moves to the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
	/// Access token (Mail.ru's `session_key`).
	pub access_token: TokenSecret,
	/// Refresh token, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Token type reported by the provider (normally `bearer`).
	pub token_type: String,
	/// Scopes granted by the provider, or the requested scopes when it echoed none.
	pub scope: ScopeSet,
	/// Instant the response was received.
	#[serde(with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
	/// Expiry derived from `expires_in`, when present.
	#[serde(with = "time::serde::rfc3339::option")]
	pub expires_at: Option<OffsetDateTime>,
	/// Provider-specific response members such as `x_mailru_vid`.
	#[serde(default, skip_serializing_if = "JsonMap::is_empty")]
	pub extra: JsonMap<String, JsonValue>,
}
impl TokenGrant {
	/// Creates a bearer grant issued now without expiry or refresh token.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: None,
			token_type: "bearer".into(),
			scope: ScopeSet::default(),
			issued_at: OffsetDateTime::now_utc(),
			expires_at: None,
			extra: JsonMap::new(),
		}
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(refresh_token));

		self
	}

	/// Overrides the token type.
	pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = token_type.into();

		self
	}

	/// Overrides the granted scopes.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Replaces the provider-specific response members.
	pub fn with_extra(mut self, extra: JsonMap<String, JsonValue>) -> Self {
		self.extra = extra;

		self
	}

	/// Sets the expiry relative to `issued_at`; non-positive lifetimes are ignored.
	pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
		self.expires_at = if expires_in.is_positive() {
			self.issued_at.checked_add(expires_in)
		} else {
			None
		};

		self
	}

	/// Returns true once the expiry instant has passed.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}
}

//! Host verify callback contract.

// self
use crate::{
	_prelude::*,
	auth::{Profile, TokenGrant},
};

/// Boxed future returned by [`Verify::verify`].
pub type VerifyFuture<'a, U> = Pin<Box<dyn Future<Output = Result<Verified<U>>> + 'a + Send>>;

/// Informational payload attached to successes and failures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
	/// Human-readable message.
	pub message: Option<String>,
}
impl AuthInfo {
	/// Creates info carrying `message`.
	pub fn message(message: impl Into<String>) -> Self {
		Self { message: Some(message.into()) }
	}
}

/// Decision returned by the host verify callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verified<U> {
	/// The login maps to `user`.
	User {
		/// Host-defined user value.
		user: U,
		/// Optional info forwarded to the outcome.
		info: Option<AuthInfo>,
	},
	/// The host refuses the login.
	Rejected {
		/// Optional reason forwarded to the outcome.
		info: Option<AuthInfo>,
	},
}

/// Turns the exchanged tokens and profile into a host user.
///
/// Implemented for any `Fn(TokenGrant, Option<Profile>) -> impl Future<Output =
/// Result<Verified<U>, E>>` where `E` converts into a boxed error; failures surface as
/// [`Error::Verify`].
pub trait Verify<U>: Send + Sync {
	/// Resolves the login; `profile` is `None` when profile fetching is skipped.
	fn verify(&self, grant: TokenGrant, profile: Option<Profile>) -> VerifyFuture<'_, U>;
}
impl<U, E, F, Fut> Verify<U> for F
where
	U: 'static + Send,
	E: 'static + Into<Box<dyn StdError + Send + Sync>>,
	F: Send + Sync + Fn(TokenGrant, Option<Profile>) -> Fut,
	Fut: 'static + Send + Future<Output = std::result::Result<Verified<U>, E>>,
{
	fn verify(&self, grant: TokenGrant, profile: Option<Profile>) -> VerifyFuture<'_, U> {
		let fut = self(grant, profile);

		Box::pin(async move { fut.await.map_err(Error::verify) })
	}
}

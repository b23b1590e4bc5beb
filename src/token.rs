//! Bearer tokens and the provider contract that mints them.

pub mod provider;
pub mod secret;

pub use provider::ClientCredentialsProvider;
pub use secret::TokenSecret;

// self
use crate::{_prelude::*, config::Environment};

/// Boxed future returned by [`TokenProvider::provide`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken>> + 'a + Send>>;

/// Acquires fresh bearer tokens from the identity endpoint.
///
/// Implementations perform exactly one acquisition attempt per call; retry policy belongs to
/// the caller.
pub trait TokenProvider
where
	Self: Send + Sync,
{
	/// Requests a new token for `environment`.
	fn provide(&self, environment: Environment) -> TokenFuture<'_>;
}

/// Bearer token plus the instant it stops being usable.
///
/// Tokens minted by a [`TokenProvider`] record the environment whose auth endpoint issued
/// them; preview and production tokens are not interchangeable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
	/// Bearer value sent in the `Authorization` header.
	pub value: TokenSecret,
	/// Absolute expiry instant.
	pub expires_at: OffsetDateTime,
	/// Issuing environment; `None` for tokens supplied by the caller.
	pub environment: Option<Environment>,
}
impl AccessToken {
	/// Creates a token that expires at `expires_at`, valid for any environment.
	pub fn new(value: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { value: TokenSecret::new(value), expires_at, environment: None }
	}

	/// Binds the token to the environment that issued it.
	pub fn issued_for(mut self, environment: Environment) -> Self {
		self.environment = Some(environment);

		self
	}

	/// Returns `true` unless the token was issued for a different environment.
	pub fn is_usable_in(&self, environment: Environment) -> bool {
		self.environment.is_none_or(|issued| issued == environment)
	}

	/// Returns the bearer value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		self.value.expose()
	}

	/// Returns `true` once `instant` reaches the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` if the token is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Remaining lifetime at `instant`; zero or negative once expired.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		self.expires_at - instant
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn expiry_is_inclusive() {
		let expires = macros::datetime!(2025-01-01 01:00 UTC);
		let token = AccessToken::new("abc", expires);

		assert!(!token.is_expired_at(macros::datetime!(2025-01-01 00:59:59 UTC)));
		assert!(token.is_expired_at(expires));
		assert_eq!(
			token.remaining_at(macros::datetime!(2025-01-01 00:30 UTC)),
			Duration::minutes(30)
		);
	}

	#[test]
	fn issuing_environment_limits_reuse() {
		let expires = macros::datetime!(2025-01-01 01:00 UTC);
		let preview = AccessToken::new("abc", expires).issued_for(Environment::Preview);
		let unbound = AccessToken::new("abc", expires);

		assert!(preview.is_usable_in(Environment::Preview));
		assert!(!preview.is_usable_in(Environment::Production));
		assert!(unbound.is_usable_in(Environment::Production));
	}

	#[test]
	fn debug_output_redacts_value() {
		let token = AccessToken::new("super-secret", OffsetDateTime::now_utc());

		assert!(!format!("{token:?}").contains("super-secret"));
	}
}

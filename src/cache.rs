//! Token cache contract and built-in cacher implementations.
//!
//! A [`TokenCacher`] holds at most one [`AccessToken`] per client. Misses are signalled with
//! [`CacheError::TokenNotExist`] (never set) or [`CacheError::TokenExpired`] (expiry reached);
//! the request pipeline treats both as a cue to refresh and never surfaces them to callers.

pub mod distributed;
pub mod file;
pub mod memory;

pub use distributed::{DistributedCacher, MemoryTtlStore, TtlStore};
pub use file::FileCacher;
pub use memory::MemoryCacher;

// self
use crate::{_prelude::*, config::Environment, token::AccessToken};

/// Boxed future returned by cache backends.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Storage backend contract implemented by token cachers.
pub trait TokenCacher
where
	Self: Send + Sync,
{
	/// Returns the cached token, or a miss signal when it is absent or expired.
	fn get(&self) -> CacheFuture<'_, AccessToken>;

	/// Replaces the cached token.
	fn set(&self, token: AccessToken) -> CacheFuture<'_, ()>;
}

/// Error type produced by [`TokenCacher`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CacheError {
	/// No token has been stored yet.
	#[error("No access token has been cached.")]
	TokenNotExist,
	/// The cached token reached its expiry instant.
	#[error("Cached access token has expired.")]
	TokenExpired,
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
impl CacheError {
	/// Returns `true` for the signals that should trigger a token refresh.
	pub fn is_miss(&self) -> bool {
		matches!(self, Self::TokenNotExist | Self::TokenExpired)
	}
}

/// JSON document persisted by the file and distributed cachers.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenDocument {
	token: String,
	#[serde(with = "time::serde::rfc3339")]
	expires_at: OffsetDateTime,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	environment: Option<Environment>,
}
impl TokenDocument {
	pub(crate) fn encode(token: &AccessToken) -> Result<Vec<u8>, CacheError> {
		let document = Self {
			token: token.expose().to_owned(),
			expires_at: token.expires_at,
			environment: token.environment,
		};

		serde_json::to_vec(&document).map_err(|e| CacheError::Serialization {
			message: format!("Failed to serialize cached token: {e}"),
		})
	}

	pub(crate) fn decode(bytes: &[u8]) -> Result<AccessToken, CacheError> {
		let document: Self = serde_json::from_slice(bytes).map_err(|e| {
			CacheError::Serialization { message: format!("Failed to parse cached token: {e}") }
		})?;

		let token = AccessToken::new(document.token, document.expires_at);

		Ok(match document.environment {
			Some(environment) => token.issued_for(environment),
			None => token,
		})
	}
}

/// Applies the expiry rule shared by cachers that check expiry themselves.
pub(crate) fn ensure_fresh(
	token: AccessToken,
	now: OffsetDateTime,
) -> Result<AccessToken, CacheError> {
	if token.is_expired_at(now) { Err(CacheError::TokenExpired) } else { Ok(token) }
}

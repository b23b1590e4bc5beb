//! Shared-cache [`TokenCacher`] that relies on backend TTLs for expiry.
//!
//! [`TtlStore`] is the seam for Redis/memcached style backends: string values with a
//! per-key time-to-live. [`DistributedCacher`] writes the token document with a TTL equal to
//! the token's remaining lifetime, so an expired token simply disappears from the backend.

// self
use crate::{
	_prelude::*,
	cache::{CacheError, CacheFuture, TokenCacher, TokenDocument},
	token::AccessToken,
};

/// Key/value backend with per-key expiry.
pub trait TtlStore
where
	Self: Send + Sync,
{
	/// Returns the live value stored under `key`.
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>>;

	/// Stores `value` under `key` for `ttl`.
	fn set_with_ttl<'a>(&'a self, key: &'a str, value: String, ttl: Duration)
	-> CacheFuture<'a, ()>;
}

/// [`TokenCacher`] sharing one token across processes through a [`TtlStore`].
#[derive(Clone)]
pub struct DistributedCacher {
	store: Arc<dyn TtlStore>,
	key: String,
}
impl DistributedCacher {
	/// Key used when none is configured.
	pub const DEFAULT_KEY: &'static str = "athena_client:access_token";

	/// Creates a cacher over `store` using [`Self::DEFAULT_KEY`].
	pub fn new(store: Arc<dyn TtlStore>) -> Self {
		Self { store, key: Self::DEFAULT_KEY.into() }
	}

	/// Overrides the backend key, e.g. to separate practices or environments.
	pub fn with_key(mut self, key: impl Into<String>) -> Self {
		self.key = key.into();

		self
	}

	/// Returns the backend key.
	pub fn key(&self) -> &str {
		&self.key
	}
}
impl TokenCacher for DistributedCacher {
	fn get(&self) -> CacheFuture<'_, AccessToken> {
		Box::pin(async move {
			let raw = self.store.get(&self.key).await?.ok_or(CacheError::TokenNotExist)?;

			TokenDocument::decode(raw.as_bytes())
		})
	}

	fn set(&self, token: AccessToken) -> CacheFuture<'_, ()> {
		Box::pin(async move {
			let ttl = token.remaining_at(OffsetDateTime::now_utc());

			if !ttl.is_positive() {
				tracing::debug!(key = %self.key, "skipping cache write for an already expired token");

				return Ok(());
			}

			let value = String::from_utf8(TokenDocument::encode(&token)?).map_err(|e| {
				CacheError::Serialization { message: format!("Token document is not UTF-8: {e}") }
			})?;

			self.store.set_with_ttl(&self.key, value, ttl).await
		})
	}
}
impl Debug for DistributedCacher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DistributedCacher").field("key", &self.key).finish()
	}
}

type TtlMap = Arc<Mutex<HashMap<String, (String, OffsetDateTime)>>>;

/// In-process [`TtlStore`] for tests and single-process deployments.
#[derive(Clone, Debug, Default)]
pub struct MemoryTtlStore(TtlMap);
impl MemoryTtlStore {
	fn get_now(map: &TtlMap, key: &str, now: OffsetDateTime) -> Option<String> {
		let mut guard = map.lock();

		match guard.get(key) {
			Some((value, expires_at)) if now < *expires_at => Some(value.clone()),
			Some(_) => {
				guard.remove(key);

				None
			},
			None => None,
		}
	}
}
impl TtlStore for MemoryTtlStore {
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(&map, key, OffsetDateTime::now_utc())) })
	}

	fn set_with_ttl<'a>(
		&'a self,
		key: &'a str,
		value: String,
		ttl: Duration,
	) -> CacheFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			let expires_at = OffsetDateTime::now_utc().saturating_add(ttl);

			map.lock().insert(key.to_owned(), (value, expires_at));

			Ok(())
		})
	}
}

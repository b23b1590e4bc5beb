//! Thread-safe in-memory [`TokenCacher`] implementation, the client's default.

// self
use crate::{
	_prelude::*,
	cache::{self, CacheError, CacheFuture, TokenCacher},
	token::AccessToken,
};

type Slot = Arc<Mutex<Option<AccessToken>>>;

/// Single mutex-guarded token slot kept in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryCacher(Slot);
impl MemoryCacher {
	/// Creates a cacher that already holds `token`.
	pub fn with_token(token: AccessToken) -> Self {
		Self(Arc::new(Mutex::new(Some(token))))
	}

	/// Returns whatever is stored, expired or not, without applying the expiry rule.
	pub fn peek(&self) -> Option<AccessToken> {
		self.0.lock().clone()
	}

	fn get_now(slot: &Slot, now: OffsetDateTime) -> Result<AccessToken, CacheError> {
		let token = slot.lock().clone().ok_or(CacheError::TokenNotExist)?;

		cache::ensure_fresh(token, now)
	}
}
impl TokenCacher for MemoryCacher {
	fn get(&self) -> CacheFuture<'_, AccessToken> {
		let slot = self.0.clone();

		Box::pin(async move { Self::get_now(&slot, OffsetDateTime::now_utc()) })
	}

	fn set(&self, token: AccessToken) -> CacheFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.lock() = Some(token);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn get_reports_missing_then_stored_token() {
		let cacher = MemoryCacher::default();

		assert_eq!(cacher.get().await, Err(CacheError::TokenNotExist));

		let token = AccessToken::new("abc", OffsetDateTime::now_utc() + Duration::hours(1));

		cacher.set(token.clone()).await.expect("Memory cacher set should succeed.");

		assert_eq!(cacher.get().await, Ok(token));
	}

	#[tokio::test]
	async fn get_reports_expired_token() {
		let token = AccessToken::new("old", OffsetDateTime::now_utc() - Duration::seconds(1));
		let cacher = MemoryCacher::with_token(token.clone());

		assert_eq!(cacher.get().await, Err(CacheError::TokenExpired));
		assert_eq!(cacher.peek(), Some(token));
	}

	#[tokio::test]
	async fn set_overwrites_previous_token() {
		let cacher = MemoryCacher::default();
		let later = OffsetDateTime::now_utc() + Duration::hours(1);

		cacher.set(AccessToken::new("first", later)).await.expect("First set should succeed.");
		cacher.set(AccessToken::new("second", later)).await.expect("Second set should succeed.");

		assert_eq!(cacher.get().await.map(|token| token.expose().to_owned()), Ok("second".into()));
	}
}

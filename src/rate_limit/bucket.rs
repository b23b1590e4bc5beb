//! Token-bucket [`RateLimiter`] with per-environment budgets.
//!
//! Buckets are tracked with the generic cell rate algorithm: each key stores one theoretical
//! arrival time (TAT), so a [`BucketStore`] only needs an atomic read-modify-write of a single
//! timestamp. That keeps shared backends (Redis scripts, SQL rows) trivial to implement.

// self
use crate::{
	_prelude::*,
	config::Environment,
	rate_limit::{
		LimiterError, RateLimitContext, RateLimitDecision, RateLimitFuture, RateLimiter,
		RetryDirective,
	},
};

/// Boxed future returned by [`BucketStore::acquire`].
pub type BucketFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Option<Duration>, LimiterError>> + 'a + Send>>;

/// Sustained rate and burst size for one bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quota {
	per_second: u32,
	burst: u32,
}
impl Quota {
	/// Creates a quota; both values are clamped to at least one.
	pub fn new(per_second: u32, burst: u32) -> Self {
		Self { per_second: per_second.max(1), burst: burst.max(1) }
	}

	/// Requests admitted per second once the burst is spent.
	pub fn per_second(&self) -> u32 {
		self.per_second
	}

	/// Requests admitted back to back from an idle bucket.
	pub fn burst(&self) -> u32 {
		self.burst
	}

	fn emission_interval(&self) -> Duration {
		Duration::nanoseconds(1_000_000_000 / i64::from(self.per_second))
	}
}

/// Storage for bucket state shared by every limiter pointed at the same backend.
pub trait BucketStore
where
	Self: Send + Sync,
{
	/// Takes one cell from the bucket under `key`.
	///
	/// Returns `None` when the request is admitted, or the wait until it would be.
	fn acquire<'a>(&'a self, key: &'a str, quota: Quota, now: OffsetDateTime) -> BucketFuture<'a>;
}

/// In-process [`BucketStore`].
#[derive(Clone, Debug, Default)]
pub struct MemoryBucketStore(Arc<Mutex<HashMap<String, OffsetDateTime>>>);
impl MemoryBucketStore {
	fn acquire_now(&self, key: &str, quota: Quota, now: OffsetDateTime) -> Option<Duration> {
		let interval = quota.emission_interval();
		let mut buckets = self.0.lock();
		let tat = buckets.get(key).copied().map_or(now, |tat| tat.max(now));
		let new_tat = tat + interval;
		let allow_at = new_tat - interval * quota.burst;

		if now < allow_at {
			return Some(allow_at - now);
		}

		buckets.insert(key.to_owned(), new_tat);

		None
	}
}
impl BucketStore for MemoryBucketStore {
	fn acquire<'a>(&'a self, key: &'a str, quota: Quota, now: OffsetDateTime) -> BucketFuture<'a> {
		Box::pin(async move { Ok(self.acquire_now(key, quota, now)) })
	}
}

/// [`RateLimiter`] keeping one bucket per environment in a [`BucketStore`].
#[derive(Clone)]
pub struct TokenBucketLimiter {
	store: Arc<dyn BucketStore>,
	prefix: String,
	preview: Quota,
	production: Quota,
}
impl TokenBucketLimiter {
	/// Key prefix used when none is configured.
	pub const DEFAULT_PREFIX: &'static str = "athena_client:rate_limit";

	/// Creates a limiter over `store` with the default quotas.
	///
	/// Preview allows 5 requests per second, production 100, each with an equal burst.
	pub fn new(store: Arc<dyn BucketStore>) -> Self {
		Self {
			store,
			prefix: Self::DEFAULT_PREFIX.into(),
			preview: Quota::new(5, 5),
			production: Quota::new(100, 100),
		}
	}

	/// Creates a limiter backed by a fresh [`MemoryBucketStore`].
	pub fn in_memory() -> Self {
		Self::new(Arc::new(MemoryBucketStore::default()))
	}

	/// Overrides the key prefix, e.g. to share one backend across several practices.
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();

		self
	}

	/// Overrides the quota for one environment.
	pub fn with_quota(mut self, environment: Environment, quota: Quota) -> Self {
		match environment {
			Environment::Preview => self.preview = quota,
			Environment::Production => self.production = quota,
		}

		self
	}

	/// Returns the quota applied to `environment`.
	pub fn quota(&self, environment: Environment) -> Quota {
		match environment {
			Environment::Preview => self.preview,
			Environment::Production => self.production,
		}
	}

	fn key(&self, environment: Environment) -> String {
		format!("{}:{}", self.prefix, environment.as_str())
	}
}
impl RateLimiter for TokenBucketLimiter {
	fn evaluate(&self, context: &RateLimitContext) -> RateLimitFuture<'_> {
		let key = self.key(context.environment);
		let quota = self.quota(context.environment);
		let now = context.observed_at;

		Box::pin(async move {
			match self.store.acquire(&key, quota, now).await? {
				None => Ok(RateLimitDecision::Allow),
				Some(wait) => {
					tracing::debug!(%key, %wait, "request budget exhausted");

					Ok(RateLimitDecision::Delay(
						RetryDirective::new(now + wait, wait).with_reason(format!(
							"{} budget of {} requests per second is exhausted",
							key, quota.per_second
						)),
					))
				},
			}
		})
	}
}
impl Debug for TokenBucketLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenBucketLimiter")
			.field("prefix", &self.prefix)
			.field("preview", &self.preview)
			.field("production", &self.production)
			.finish()
	}
}

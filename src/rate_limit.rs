//! Rate limit contracts consulted by the request pipeline before every outbound API call.
//!
//! A [`RateLimiter`] never sleeps on the caller's behalf: a [`RateLimitDecision::Delay`] with a
//! positive backoff makes the pipeline return [`Error::RateLimited`] without sending anything,
//! leaving retry policy to the caller.

pub mod bucket;

pub use bucket::{BucketStore, MemoryBucketStore, Quota, TokenBucketLimiter};

// self
use crate::{_prelude::*, config::Environment};

/// Boxed future returned by [`RateLimiter::evaluate`].
pub type RateLimitFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RateLimitDecision, LimiterError>> + 'a + Send>>;

/// Strategy that inspects request budgets before the pipeline hits the API.
pub trait RateLimiter
where
	Self: Send + Sync,
{
	/// Evaluates whether the next call should be delayed.
	fn evaluate(&self, context: &RateLimitContext) -> RateLimitFuture<'_>;
}

/// Context shared with a [`RateLimiter`] before an outbound call is made.
#[derive(Clone, Debug)]
pub struct RateLimitContext {
	/// Environment the request targets; limiters usually budget each one separately.
	pub environment: Environment,
	/// Logical operation being attempted, formatted as `METHOD path`.
	pub operation: String,
	/// Timestamp the client observed before invoking the limiter.
	pub observed_at: OffsetDateTime,
}
impl RateLimitContext {
	/// Creates a new context for the given environment/operation pair.
	pub fn new(environment: Environment, operation: impl Into<String>) -> Self {
		Self { environment, operation: operation.into(), observed_at: OffsetDateTime::now_utc() }
	}

	/// Overrides the timestamp associated with the observation.
	pub fn with_observed_at(mut self, instant: OffsetDateTime) -> Self {
		self.observed_at = instant;

		self
	}

	/// Returns `true` when the request targets the preview environment.
	pub fn is_preview(&self) -> bool {
		self.environment.is_preview()
	}
}

/// Result emitted by a [`RateLimiter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed immediately.
	Allow,
	/// The request should be delayed.
	Delay(RetryDirective),
}
impl RateLimitDecision {
	/// Returns the backoff when the decision asks for a positive delay.
	///
	/// A `Delay` carrying a zero or negative backoff counts as permission to proceed.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Allow => None,
			Self::Delay(directive) =>
				Some(directive.recommended_backoff).filter(|backoff| backoff.is_positive()),
		}
	}
}

/// Advises callers when to retry after a [`RateLimitDecision::Delay`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when it is safe to retry.
	pub earliest_retry_at: OffsetDateTime,
	/// Suggested backoff duration.
	pub recommended_backoff: Duration,
	/// Optional descriptive string.
	pub reason: Option<String>,
}
impl RetryDirective {
	/// Creates a new directive with the provided timing metadata.
	pub fn new(earliest_retry_at: OffsetDateTime, recommended_backoff: Duration) -> Self {
		Self { earliest_retry_at, recommended_backoff, reason: None }
	}

	/// Adds a human-readable reason.
	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());

		self
	}
}

/// Limiter that always allows; the client's default.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRateLimiter;
impl RateLimiter for NoopRateLimiter {
	fn evaluate(&self, _: &RateLimitContext) -> RateLimitFuture<'_> {
		Box::pin(async { Ok(RateLimitDecision::Allow) })
	}
}

/// Failure reported by a limiter backend.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum LimiterError {
	/// The bucket store could not be consulted.
	#[error("Rate limiter backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn non_positive_backoff_is_not_a_delay() {
		let now = OffsetDateTime::now_utc();

		assert_eq!(RateLimitDecision::Allow.retry_after(), None);
		assert_eq!(
			RateLimitDecision::Delay(RetryDirective::new(now, Duration::ZERO)).retry_after(),
			None
		);
		assert_eq!(
			RateLimitDecision::Delay(RetryDirective::new(now, Duration::milliseconds(250)))
				.retry_after(),
			Some(Duration::milliseconds(250))
		);
	}

	#[tokio::test]
	async fn noop_limiter_allows_everything() {
		let context = RateLimitContext::new(Environment::Production, "GET /patients/1");

		assert!(!context.is_preview());
		assert_eq!(NoopRateLimiter.evaluate(&context).await, Ok(RateLimitDecision::Allow));
	}
}

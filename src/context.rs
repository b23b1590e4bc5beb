//! Caller-supplied deadlines and cancellation signals for outbound calls.

// std
use std::{
	future,
	time::{Duration as StdDuration, Instant},
};
// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::_prelude::*;

/// Deadline plus cancellation signal carried by every request.
///
/// Each external call made on behalf of a request (token cache I/O, token acquisition, rate
/// limiting, the API call, and the body read) is raced against this context. An expired
/// deadline surfaces as [`Error::DeadlineExceeded`], a triggered token as [`Error::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CallContext {
	deadline: Option<Instant>,
	cancel: Option<CancellationToken>,
}
impl CallContext {
	/// Creates a context without deadline or cancellation.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets an absolute deadline.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(deadline);

		self
	}

	/// Sets a deadline relative to now.
	///
	/// A timeout too large to represent as an [`Instant`] leaves the call unbounded.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.deadline = deadline_after(timeout);

		self
	}

	/// Attaches a cancellation token.
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancel = Some(token);

		self
	}

	/// Returns the configured deadline, if any.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Returns `true` once the attached token has been cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
	}

	/// Applies `timeout` as the deadline when the caller did not set one.
	pub(crate) fn or_timeout(mut self, timeout: Option<StdDuration>) -> Self {
		if self.deadline.is_none() {
			self.deadline = timeout.and_then(deadline_after);
		}

		self
	}

	/// Drives `fut` until it resolves, the deadline passes, or the token is cancelled.
	pub async fn run<F, T>(&self, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		if self.is_cancelled() {
			return Err(Error::Cancelled);
		}

		let cancelled = async {
			match &self.cancel {
				Some(token) => token.cancelled().await,
				None => future::pending::<()>().await,
			}
		};
		let expired = async {
			match self.deadline {
				Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
				None => future::pending::<()>().await,
			}
		};

		tokio::select! {
			biased;

			_ = cancelled => Err(Error::Cancelled),
			_ = expired => Err(Error::DeadlineExceeded),
			result = fut => result,
		}
	}
}

fn deadline_after(timeout: StdDuration) -> Option<Instant> {
	Instant::now().checked_add(timeout)
}

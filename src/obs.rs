//! Observability hooks invoked around every API request.
//!
//! The client calls [`Stats`] and [`Tracer`] before dispatch and again once the request has
//! finished, whatever the outcome. Both default to no-ops. The pipeline hands them the raw
//! request path; bounding label cardinality (see [`normalize_path`]) is the collaborator's job.
//!
//! # Feature Flags
//!
//! - Enable `metrics` for [`MetricsStats`], which increments `athena_client_requests_total`
//!   (labeled by `method`, normalized `path`, and `outcome`) and records
//!   `athena_client_request_duration_seconds`.

#[cfg(feature = "metrics")] mod metrics;
mod span;

#[cfg(feature = "metrics")] pub use metrics::*;
pub use span::*;

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, error::AuthError};

/// Outcome labels recorded for each request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
	/// 2xx response, decoded when a shape was requested.
	Success,
	/// The API answered with a non-2xx status.
	ApiError,
	/// The rate limiter declined the request.
	RateLimited,
	/// Cancelled by the caller or stopped by its deadline.
	Cancelled,
	/// Any other failure (auth, transport, decode, cache, configuration).
	Failure,
}
impl OutcomeKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OutcomeKind::Success => "success",
			OutcomeKind::ApiError => "api_error",
			OutcomeKind::RateLimited => "rate_limited",
			OutcomeKind::Cancelled => "cancelled",
			OutcomeKind::Failure => "failure",
		}
	}
}
impl Display for OutcomeKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Summary of a finished request handed to [`Stats::finished`] and [`Tracer::finish`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOutcome {
	/// Outcome label.
	pub kind: OutcomeKind,
	/// HTTP status, when a response (API or token endpoint) was received.
	pub status: Option<StatusCode>,
	/// Wall-clock time since the request started.
	pub elapsed: StdDuration,
}
impl RequestOutcome {
	/// Outcome for a 2xx response.
	pub fn success(status: StatusCode, elapsed: StdDuration) -> Self {
		Self { kind: OutcomeKind::Success, status: Some(status), elapsed }
	}

	/// Classifies a pipeline failure.
	pub fn from_error(error: &Error, elapsed: StdDuration) -> Self {
		let (kind, status) = match error {
			Error::Api(err) => (OutcomeKind::ApiError, Some(err.status)),
			Error::RateLimited { .. } => (OutcomeKind::RateLimited, None),
			Error::Cancelled | Error::DeadlineExceeded => (OutcomeKind::Cancelled, None),
			Error::Auth(AuthError::Rejected { status, .. }) =>
				(OutcomeKind::Failure, StatusCode::from_u16(*status).ok()),
			Error::Decode(err) => (OutcomeKind::Failure, err.status()),
			_ => (OutcomeKind::Failure, None),
		};

		Self { kind, status, elapsed }
	}

	/// Returns `true` for [`OutcomeKind::Success`].
	pub fn is_success(&self) -> bool {
		self.kind == OutcomeKind::Success
	}
}

/// Request counters and timings.
pub trait Stats
where
	Self: Send + Sync,
{
	/// Called before the token is resolved for a request.
	fn started(&self, method: &Method, path: &str);

	/// Called once the request has produced its final result.
	fn finished(&self, method: &Method, path: &str, outcome: &RequestOutcome);
}

/// [`Stats`] that records nothing; the client's default.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopStats;
impl Stats for NoopStats {
	fn started(&self, _: &Method, _: &str) {}

	fn finished(&self, _: &Method, _: &str, _: &RequestOutcome) {}
}

/// Span factory for per-request tracing.
pub trait Tracer
where
	Self: Send + Sync,
{
	/// Opens the span covering one request.
	fn start(&self, method: &Method, path: &str) -> RequestSpan;

	/// Closes out `span` with the request's outcome.
	fn finish(&self, span: &RequestSpan, outcome: &RequestOutcome);
}

/// [`Tracer`] producing disabled spans; the client's default.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTracer;
impl Tracer for NoopTracer {
	fn start(&self, _: &Method, _: &str) -> RequestSpan {
		RequestSpan::disabled()
	}

	fn finish(&self, _: &RequestSpan, _: &RequestOutcome) {}
}

/// Replaces purely numeric path segments with `{id}`.
///
/// `/patients/123/documents/9` becomes `/patients/{id}/documents/{id}`; the query string, if
/// any, is dropped.
pub fn normalize_path(path: &str) -> String {
	let path = path.split(['?', '#']).next().unwrap_or_default();

	path.split('/')
		.map(|segment| {
			if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
				"{id}"
			} else {
				segment
			}
		})
		.collect::<Vec<_>>()
		.join("/")
}

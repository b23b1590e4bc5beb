// crates.io
use tracing::{Instrument, field::Empty, instrument::Instrumented};
// self
use crate::{
	_prelude::*,
	obs::{RequestOutcome, Tracer},
};

/// Span covering one API request; disabled spans cost nothing.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	span: tracing::Span,
}
impl RequestSpan {
	/// Opens an `athena_client.request` span with `method` and `path` fields.
	pub fn new(method: &Method, path: &str) -> Self {
		let span = tracing::info_span!(
			"athena_client.request",
			method = %method,
			path,
			status = Empty,
			outcome = Empty
		);

		Self { span }
	}

	/// Returns a span that records nothing.
	pub fn disabled() -> Self {
		Self { span: tracing::Span::none() }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}

	/// Fills in the `status` and `outcome` fields.
	pub fn record_outcome(&self, outcome: &RequestOutcome) {
		if let Some(status) = outcome.status {
			self.span.record("status", status.as_u16());
		}

		self.span.record("outcome", outcome.kind.as_str());
	}

	/// Returns the underlying [`tracing::Span`].
	pub fn inner(&self) -> &tracing::Span {
		&self.span
	}
}

/// [`Tracer`] emitting `tracing` spans for every request.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingTracer;
impl Tracer for TracingTracer {
	fn start(&self, method: &Method, path: &str) -> RequestSpan {
		RequestSpan::new(method, path)
	}

	fn finish(&self, span: &RequestSpan, outcome: &RequestOutcome) {
		span.record_outcome(outcome);

		if !outcome.is_success() {
			span.inner().in_scope(|| {
				tracing::debug!(outcome = outcome.kind.as_str(), "athenahealth request failed")
			});
		}
	}
}

// self
use crate::{
	_prelude::*,
	obs::{self, RequestOutcome, Stats},
};

/// [`Stats`] backed by the global `metrics` recorder.
///
/// Paths are passed through [`obs::normalize_path`] before they become labels. Starts are not
/// recorded; every finished request increments `athena_client_requests_total` and records its
/// latency in `athena_client_request_duration_seconds`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsStats;
impl Stats for MetricsStats {
	fn started(&self, _: &Method, _: &str) {}

	fn finished(&self, method: &Method, path: &str, outcome: &RequestOutcome) {
		let method = method.as_str().to_owned();
		let path = obs::normalize_path(path);

		metrics::counter!(
			"athena_client_requests_total",
			"method" => method.clone(),
			"path" => path.clone(),
			"outcome" => outcome.kind.as_str()
		)
		.increment(1);
		metrics::histogram!(
			"athena_client_request_duration_seconds",
			"method" => method,
			"path" => path
		)
		.record(outcome.elapsed.as_secs_f64());
	}
}

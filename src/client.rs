//! Authenticated athenahealth client and its request pipeline.
//!
//! A [`Client`] owns its credentials, environment, and token slot; cloning it shares that
//! state. Every call goes through the same sequence: resolve a fresh token under the
//! per-client guard, consult the rate limiter, send the request, then classify the response.
//! Stats and tracing hooks observe each call whatever the outcome.

pub mod builder;
pub mod request;
pub mod response;

mod pipeline;

pub use builder::ClientBuilder;
pub use request::{RequestBody, RequestSpec};
pub use response::ApiResponse;

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	cache::TokenCacher,
	config::{Credentials, Endpoints, Environment, EnvironmentEndpoints, PracticeId},
	http::HttpClient,
	obs::{Stats, Tracer},
	rate_limit::RateLimiter,
	token::TokenProvider,
};

/// athenahealth API client bound to one practice.
#[derive(Clone)]
pub struct Client {
	inner: Arc<ClientInner>,
}
impl Client {
	/// Starts building a client for `credentials`.
	pub fn builder(credentials: Credentials) -> ClientBuilder {
		ClientBuilder::new(credentials)
	}

	/// Returns the environment subsequent requests will target.
	pub fn environment(&self) -> Environment {
		*self.inner.environment.read()
	}

	/// Switches the environment for subsequent requests.
	///
	/// Requests already in flight keep the environment they started with. The next request
	/// replaces a cached token that was issued for the previous environment.
	pub fn set_environment(&self, environment: Environment) {
		let mut current = self.inner.environment.write();

		if *current != environment {
			tracing::debug!(from = %*current, to = %environment, "switching athenahealth environment");

			*current = environment;
		}
	}

	/// Flips between preview and production and returns the new environment.
	pub fn toggle_environment(&self) -> Environment {
		let mut current = self.inner.environment.write();

		*current = current.toggled();

		*current
	}

	/// Returns the practice every request is scoped to.
	pub fn practice_id(&self) -> &PracticeId {
		&self.inner.practice_id
	}

	/// Returns the endpoints of the current environment.
	pub fn endpoints(&self) -> &Endpoints {
		self.inner.endpoints.get(self.environment())
	}
}
impl Debug for Client {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("practice_id", &self.inner.practice_id)
			.field("environment", &self.environment())
			.field("endpoints", &self.inner.endpoints)
			.field("default_timeout", &self.inner.default_timeout)
			.finish_non_exhaustive()
	}
}

struct ClientInner {
	http_client: HttpClient,
	practice_id: PracticeId,
	endpoints: EnvironmentEndpoints,
	environment: RwLock<Environment>,
	provider: Arc<dyn TokenProvider>,
	cacher: Arc<dyn TokenCacher>,
	rate_limiter: Arc<dyn RateLimiter>,
	stats: Arc<dyn Stats>,
	tracer: Arc<dyn Tracer>,
	token_guard: AsyncMutex<()>,
	default_timeout: Option<StdDuration>,
}

//! Client construction with pluggable collaborators.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	cache::{MemoryCacher, TokenCacher},
	client::{Client, ClientInner},
	config::{Credentials, Endpoints, Environment, EnvironmentEndpoints},
	error::ConfigError,
	http::HttpClient,
	obs::{NoopStats, NoopTracer, Stats, Tracer},
	rate_limit::{NoopRateLimiter, RateLimiter},
	token::{ClientCredentialsProvider, TokenProvider},
};

/// Builder for [`Client`] values.
///
/// Every collaborator is optional: tokens default to the client-credentials grant cached in
/// memory, rate limiting and observability default to no-ops, and endpoints default to the
/// public athenahealth hosts.
pub struct ClientBuilder {
	credentials: Credentials,
	environment: Environment,
	preview_endpoints: Option<Endpoints>,
	production_endpoints: Option<Endpoints>,
	http_client: Option<HttpClient>,
	token_provider: Option<Arc<dyn TokenProvider>>,
	token_cacher: Option<Arc<dyn TokenCacher>>,
	rate_limiter: Option<Arc<dyn RateLimiter>>,
	stats: Option<Arc<dyn Stats>>,
	tracer: Option<Arc<dyn Tracer>>,
	timeout: Option<StdDuration>,
}
impl ClientBuilder {
	/// Creates a builder for `credentials` targeting [`Environment::Preview`].
	pub fn new(credentials: Credentials) -> Self {
		Self {
			credentials,
			environment: Environment::default(),
			preview_endpoints: None,
			production_endpoints: None,
			http_client: None,
			token_provider: None,
			token_cacher: None,
			rate_limiter: None,
			stats: None,
			tracer: None,
			timeout: None,
		}
	}

	/// Sets the initial environment.
	pub fn environment(mut self, environment: Environment) -> Self {
		self.environment = environment;

		self
	}

	/// Overrides the preview endpoints.
	pub fn preview_endpoints(mut self, endpoints: Endpoints) -> Self {
		self.preview_endpoints = Some(endpoints);

		self
	}

	/// Overrides the production endpoints.
	pub fn production_endpoints(mut self, endpoints: Endpoints) -> Self {
		self.production_endpoints = Some(endpoints);

		self
	}

	/// Reuses an existing HTTP client for token and API calls.
	pub fn http_client(mut self, client: HttpClient) -> Self {
		self.http_client = Some(client);

		self
	}

	/// Replaces the client-credentials provider.
	pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
		self.token_provider = Some(provider);

		self
	}

	/// Replaces the in-memory token cacher.
	pub fn token_cacher(mut self, cacher: Arc<dyn TokenCacher>) -> Self {
		self.token_cacher = Some(cacher);

		self
	}

	/// Installs a rate limiter consulted before every API call.
	pub fn rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
		self.rate_limiter = Some(limiter);

		self
	}

	/// Installs a stats collaborator.
	pub fn stats(mut self, stats: Arc<dyn Stats>) -> Self {
		self.stats = Some(stats);

		self
	}

	/// Installs a tracer.
	pub fn tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
		self.tracer = Some(tracer);

		self
	}

	/// Applies `timeout` to every request whose [`CallContext`](crate::context::CallContext)
	/// carries no deadline.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Consumes the builder and assembles the client.
	pub fn build(self) -> Result<Client> {
		let endpoints = EnvironmentEndpoints {
			preview: resolve_endpoints(self.preview_endpoints, Environment::Preview)?,
			production: resolve_endpoints(self.production_endpoints, Environment::Production)?,
		};
		let http_client = match self.http_client {
			Some(client) => client,
			None => HttpClient::new()?,
		};
		let provider = self.token_provider.unwrap_or_else(|| {
			Arc::new(ClientCredentialsProvider::new(
				&self.credentials,
				endpoints.clone(),
				http_client.clone(),
			))
		});
		let inner = ClientInner {
			http_client,
			practice_id: self.credentials.practice_id,
			endpoints,
			environment: RwLock::new(self.environment),
			provider,
			cacher: self.token_cacher.unwrap_or_else(|| Arc::new(MemoryCacher::default())),
			rate_limiter: self.rate_limiter.unwrap_or_else(|| Arc::new(NoopRateLimiter)),
			stats: self.stats.unwrap_or_else(|| Arc::new(NoopStats)),
			tracer: self.tracer.unwrap_or_else(|| Arc::new(NoopTracer)),
			token_guard: AsyncMutex::new(()),
			default_timeout: self.timeout,
		};

		Ok(Client { inner: Arc::new(inner) })
	}
}
impl Debug for ClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientBuilder")
			.field("client_id", &self.credentials.client_id)
			.field("practice_id", &self.credentials.practice_id)
			.field("environment", &self.environment)
			.field("timeout", &self.timeout)
			.finish_non_exhaustive()
	}
}

fn resolve_endpoints(
	endpoints: Option<Endpoints>,
	environment: Environment,
) -> Result<Endpoints, ConfigError> {
	match endpoints {
		Some(endpoints) => Ok(endpoints),
		None => Endpoints::defaults(environment),
	}
}

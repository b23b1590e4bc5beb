//! Request pipeline: token resolution, rate limiting, dispatch, and classification.

// std
use std::{
	io,
	task::{Context, Poll},
	time::Instant,
};
// crates.io
use futures::Stream;
use reqwest::{
	Body,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue},
};
use tokio::{sync::mpsc, task};
// self
use crate::{
	_prelude::*,
	client::{
		Client, RequestBody, RequestSpec,
		response::{self, ApiResponse},
	},
	codec::{FormChunks, FormEncoder},
	config::Environment,
	context::CallContext,
	error::{DecodeError, TransportError},
	obs::RequestOutcome,
	rate_limit::RateLimitContext,
	token::AccessToken,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";
/// Encoded chunks buffered between the blocking reader and the request body.
const STREAM_BUFFER: usize = 16;

impl Client {
	/// Sends `spec` and decodes a 2xx JSON body into `T`.
	///
	/// Non-2xx answers become [`Error::Api`] carrying the raw response; bodies that do not
	/// match `T` become [`Error::Decode`].
	pub async fn request<T>(&self, spec: RequestSpec) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.observe(spec, |response| response.json().map_err(Error::from)).await
	}

	/// Sends `spec` and returns the raw 2xx response without decoding it.
	pub async fn execute(&self, spec: RequestSpec) -> Result<ApiResponse> {
		self.observe(spec, Ok).await
	}

	/// Returns a valid token for the current environment, refreshing it when needed.
	///
	/// Callers that need the bearer value outside the pipeline (for example to hand it to
	/// another HTTP stack) share the cached token with regular requests.
	pub async fn access_token(&self, context: &CallContext) -> Result<AccessToken> {
		let context = context.clone().or_timeout(self.inner.default_timeout);

		self.resolve_token(self.environment(), &context).await
	}

	async fn observe<T, F>(&self, spec: RequestSpec, decode: F) -> Result<T>
	where
		F: FnOnce(ApiResponse) -> Result<T>,
	{
		let method = spec.method.clone();
		let path = spec.path.clone();
		let span = self.inner.tracer.start(&method, &path);

		self.inner.stats.started(&method, &path);

		let started = Instant::now();
		let result = span
			.instrument(async {
				let response = self.dispatch(spec).await?;
				let status = response.status;

				decode(response).map(|value| (value, status))
			})
			.await;
		let elapsed = started.elapsed();
		let outcome = match &result {
			Ok((_, status)) => RequestOutcome::success(*status, elapsed),
			Err(e) => RequestOutcome::from_error(e, elapsed),
		};

		self.inner.stats.finished(&method, &path, &outcome);
		self.inner.tracer.finish(&span, &outcome);

		result.map(|(value, _)| value)
	}

	async fn dispatch(&self, spec: RequestSpec) -> Result<ApiResponse> {
		let RequestSpec { method, path, query, mut headers, body, context } = spec;
		let context = context.or_timeout(self.inner.default_timeout);
		// Pinned for the whole call so a concurrent toggle cannot split token and URL.
		let environment = self.environment();
		let token = self.resolve_token(environment, &context).await?;
		let decision = context
			.run(async {
				let limit_context =
					RateLimitContext::new(environment, format!("{method} {path}"));

				self.inner.rate_limiter.evaluate(&limit_context).await.map_err(Error::from)
			})
			.await?;

		if let Some(retry_after) = decision.retry_after() {
			tracing::debug!(
				%method,
				path = %path,
				%retry_after,
				"request rejected by rate limiter"
			);

			return Err(Error::RateLimited { retry_after });
		}

		let endpoints = self.inner.endpoints.get(environment);
		let url = endpoints.api_url(&self.inner.practice_id, &path, &query)?;

		headers.remove(AUTHORIZATION);
		headers.entry(ACCEPT).or_insert(HeaderValue::from_static(JSON_CONTENT_TYPE));

		let mut builder = self
			.inner
			.http_client
			.request(method.clone(), url)
			.headers(headers)
			.bearer_auth(token.expose());

		builder = match body {
			RequestBody::Empty => builder,
			RequestBody::Form(pairs) => builder
				.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
				.body(encode_small_form(pairs).map_err(TransportError::from)?),
			RequestBody::Raw { content_type, bytes } =>
				builder.header(CONTENT_TYPE, content_type).body(bytes),
			RequestBody::Streamed(form) => builder
				.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
				.body(Body::wrap_stream(ChunkStream::spawn(form.into_chunks()))),
		};

		tracing::debug!(
			%method,
			path = %path,
			environment = environment.as_str(),
			"dispatching athenahealth request"
		);

		let response = context
			.run(async {
				builder.send().await.map_err(|e| Error::from(TransportError::from(e)))
			})
			.await?;
		let status = response.status();
		let headers = response.headers().clone();
		let bytes = context
			.run(async {
				response.bytes().await.map_err(|e| Error::from(DecodeError::body(status, e)))
			})
			.await?;

		response::classify(ApiResponse::new(status, headers, bytes.to_vec()))
	}

	async fn resolve_token(
		&self,
		environment: Environment,
		context: &CallContext,
	) -> Result<AccessToken> {
		let _guard =
			context.run(async { Ok::<_, Error>(self.inner.token_guard.lock().await) }).await?;
		let cached =
			context.run(async { Ok::<_, Error>(self.inner.cacher.get().await) }).await?;

		match cached {
			Ok(token) if !token.is_usable_in(environment) => tracing::debug!(
				environment = environment.as_str(),
				"cached access token was issued for another environment"
			),
			Ok(token) if !token.is_expired() => return Ok(token),
			Ok(_) => tracing::debug!("cached access token reached its expiry"),
			Err(e) if e.is_miss() => {
				tracing::debug!(reason = %e, "no usable cached access token")
			},
			Err(e) => return Err(e.into()),
		}

		let token = context.run(self.inner.provider.provide(environment)).await?;

		context
			.run(async { self.inner.cacher.set(token.clone()).await.map_err(Error::from) })
			.await?;

		tracing::debug!(expires_at = %token.expires_at, "cached refreshed access token");

		Ok(token)
	}
}

/// Body stream fed by a blocking task that drives [`FormChunks`].
///
/// Streamed form values are plain [`std::io::Read`] sources (files, base64 bridges), so
/// they are read on tokio's blocking pool instead of the worker polling the request body.
struct ChunkStream(mpsc::Receiver<io::Result<Vec<u8>>>);
impl ChunkStream {
	fn spawn(chunks: FormChunks) -> Self {
		let (tx, rx) = mpsc::channel(STREAM_BUFFER);

		task::spawn_blocking(move || {
			for chunk in chunks {
				// Receiver gone: the request was dropped or failed.
				if tx.blocking_send(chunk).is_err() {
					break;
				}
			}
		});

		Self(rx)
	}
}
impl Stream for ChunkStream {
	type Item = io::Result<Vec<u8>>;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.get_mut().0.poll_recv(cx)
	}
}

fn encode_small_form(pairs: Vec<(String, String)>) -> io::Result<Vec<u8>> {
	let mut form = FormEncoder::new();
	let mut body = Vec::new();

	for (key, value) in pairs {
		form.add(key, value);
	}

	form.encode(&mut body)?;

	Ok(body)
}

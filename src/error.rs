//! Client-level error types shared by the token pipeline, caches, and response classification.

// self
use crate::{
	_prelude::*, cache::CacheError, client::ApiResponse, config::IdentifierError,
	rate_limit::LimiterError,
};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;
type JsonPathError = serde_path_to_error::Error<serde_json::Error>;

/// Canonical client error exposed by public APIs.
///
/// Cache misses ([`CacheError::TokenNotExist`] and [`CacheError::TokenExpired`]) are
/// recovered inside the request pipeline and never surface through this type.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token acquisition failed.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// The rate limiter declined the request; nothing was sent.
	#[error("Request was rate limited; retry after {retry_after}.")]
	RateLimited {
		/// Advisory delay before the caller should try again.
		retry_after: Duration,
	},
	/// The API answered with a non-2xx status.
	#[error(transparent)]
	Api(Box<ApiError>),
	/// The API answered but the body could not be read or decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// The request never produced a response.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The caller cancelled the request.
	#[error("Request was cancelled by the caller.")]
	Cancelled,
	/// The caller-supplied deadline elapsed before the request finished.
	#[error("Request deadline exceeded.")]
	DeadlineExceeded,
	/// Token cache backend failure.
	#[error("{0}")]
	Cache(
		#[from]
		#[source]
		CacheError,
	),
	/// Rate limiter backend failure.
	#[error("{0}")]
	RateLimiter(
		#[from]
		#[source]
		LimiterError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Returns `true` when retrying the same request later may succeed.
	///
	/// Transport failures, rate-limit rejections, and `429`/`5xx` API responses qualify.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Transport(_) | Self::RateLimited { .. } => true,
			Self::Api(err) =>
				err.status == StatusCode::TOO_MANY_REQUESTS || err.status.is_server_error(),
			_ => false,
		}
	}

	/// Returns the API error when the server answered with a non-2xx status.
	pub fn as_api_error(&self) -> Option<&ApiError> {
		match self {
			Self::Api(err) => Some(err.as_ref()),
			_ => None,
		}
	}
}
impl From<ApiError> for Error {
	fn from(e: ApiError) -> Self {
		Self::Api(Box::new(e))
	}
}

/// Configuration and validation failures raised while building clients or requests.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed inside the OAuth exchange.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// An endpoint URL could not be parsed.
	#[error("Endpoint URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Query or form parameters could not be serialized.
	#[error("Request parameters could not be form-encoded.")]
	ParamEncoding(#[from] serde_urlencoded::ser::Error),
	/// A credential identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] IdentifierError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	pub(crate) fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
		Self::InvalidUrl { url: url.into(), source }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token acquisition failures raised by [`TokenProvider`](crate::token::TokenProvider)
/// implementations.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// The token endpoint answered with a non-200 status.
	#[error("Token endpoint rejected the client credentials with `{status_line}`: {message}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// HTTP status line such as `401 Unauthorized`.
		status_line: String,
		/// OAuth error description or a preview of the response body.
		message: String,
	},
	/// The token endpoint answered 200 with a body that is not a token response.
	#[error("Token endpoint returned malformed JSON.")]
	Malformed {
		/// Structured parsing failure.
		#[source]
		source: JsonPathError,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// The token response carried a missing, non-positive, or oversized `expires_in`.
	#[error("Token endpoint returned an unusable expires_in value.")]
	InvalidExpiry,
	/// The token endpoint could not be reached.
	#[error("Network error occurred while calling the token endpoint.")]
	Transport {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Any other unexpected response from the token endpoint.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	Unexpected {
		/// Client-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl AuthError {
	/// Builds a [`AuthError::Rejected`] for the provided status code.
	pub fn rejected(status: u16, message: impl Into<String>) -> Self {
		Self::Rejected { status, status_line: status_line(status), message: message.into() }
	}

	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Transport { source: Box::new(src) }
	}
}

/// Failures that happen after the API produced a response.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// The response body could not be read to completion.
	#[error("Failed to read the response body for status {status}.")]
	Body {
		/// HTTP status code of the response.
		status: u16,
		/// Underlying read failure.
		#[source]
		source: BoxError,
	},
	/// The response body did not match the expected JSON shape.
	#[error("Response body for status {status} does not match the expected JSON shape.")]
	Json {
		/// HTTP status code of the response.
		status: u16,
		/// Structured parsing failure, including the JSON path.
		#[source]
		source: JsonPathError,
	},
}
impl DecodeError {
	/// Returns the HTTP status of the response that failed to decode.
	pub fn status(&self) -> Option<StatusCode> {
		let status = match self {
			Self::Body { status, .. } | Self::Json { status, .. } => *status,
		};

		StatusCode::from_u16(status).ok()
	}

	pub(crate) fn body(status: StatusCode, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Body { status: status.as_u16(), source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO) that prevented a response.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the athenahealth API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the athenahealth API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Non-2xx answer from the athenahealth API.
///
/// The raw [`ApiResponse`] is kept so callers can inspect headers or the untouched body.
#[derive(Debug, ThisError)]
#[error("API request failed with status {status}: {}.", summarize(.code, .message))]
pub struct ApiError {
	/// The `error` field of the response body; empty when the body was not a JSON object.
	pub code: String,
	/// The `detailedmessage` field of the response body, or the body itself when it was a JSON
	/// string.
	pub message: String,
	/// HTTP status of the response.
	pub status: StatusCode,
	/// Retry-After hint, if the server supplied one.
	pub retry_after: Option<Duration>,
	/// Raw response for caller inspection.
	pub response: ApiResponse,
}

fn summarize(code: &str, message: &str) -> String {
	match (code.is_empty(), message.is_empty()) {
		(true, true) => "no error details".into(),
		(false, true) => code.into(),
		(true, false) => message.into(),
		(false, false) => format!("{code} ({message})"),
	}
}

fn status_line(status: u16) -> String {
	match StatusCode::from_u16(status).ok().and_then(|code| code.canonical_reason()) {
		Some(reason) => format!("{status} {reason}"),
		None => status.to_string(),
	}
}

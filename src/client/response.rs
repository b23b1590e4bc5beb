//! Raw API responses and status classification.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	error::{ApiError, DecodeError},
	http,
};

/// Fully read HTTP response, kept for caller inspection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Bundles a status, headers, and body.
	pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
		Self { status, headers, body }
	}

	/// Returns the body as text, replacing invalid UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body as JSON into `T`, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T, DecodeError>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| DecodeError::Json { status: self.status.as_u16(), source })
	}
}

/// Passes 2xx responses through and turns everything else into an [`ApiError`].
pub(crate) fn classify(response: ApiResponse) -> Result<ApiResponse> {
	if response.status.is_success() {
		return Ok(response);
	}

	let error = api_error(response);

	tracing::warn!(
		status = error.status.as_u16(),
		code = %error.code,
		"athenahealth API returned an error status"
	);

	Err(error.into())
}

fn api_error(response: ApiResponse) -> ApiError {
	let (code, message) = match serde_json::from_slice::<Value>(&response.body) {
		Ok(Value::Object(fields)) => {
			let field = |name: &str| {
				fields.get(name).and_then(Value::as_str).unwrap_or_default().to_owned()
			};

			(field("error"), field("detailedmessage"))
		},
		Ok(Value::String(text)) => (String::new(), text),
		_ => (String::new(), http::body_preview(&response.body)),
	};

	ApiError {
		code,
		message,
		status: response.status,
		retry_after: http::parse_retry_after(&response.headers),
		response,
	}
}

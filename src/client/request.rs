//! Per-call request descriptions.

// crates.io
use reqwest::header::{HeaderName, HeaderValue};
// self
use crate::{_prelude::*, codec::FormEncoder, context::CallContext, error::ConfigError};

/// Body attached to a [`RequestSpec`].
#[derive(Debug, Default)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// Small form sent as `application/x-www-form-urlencoded`.
	Form(Vec<(String, String)>),
	/// Caller-encoded payload.
	Raw {
		/// Value of the `Content-Type` header.
		content_type: String,
		/// Payload bytes.
		bytes: Vec<u8>,
	},
	/// Form whose values may be streams, sent as a chunked body.
	Streamed(FormEncoder),
}

/// One API call: method, practice-relative path, parameters, body, and call context.
///
/// ```
/// use athena_client::client::RequestSpec;
///
/// let spec = RequestSpec::get("/patients").query("firstname", "Jane").query("limit", 10);
///
/// assert_eq!(spec.path(), "/patients");
/// ```
#[derive(Debug)]
pub struct RequestSpec {
	pub(crate) method: Method,
	pub(crate) path: String,
	pub(crate) query: Vec<(String, String)>,
	pub(crate) headers: HeaderMap,
	pub(crate) body: RequestBody,
	pub(crate) context: CallContext,
}
impl RequestSpec {
	/// Creates a request for `method` on `path` (relative to `{api}/{practice_id}`).
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: HeaderMap::new(),
			body: RequestBody::Empty,
			context: CallContext::default(),
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Returns the HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Returns the practice-relative path.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Appends one query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query.push((key.into(), value.to_string()));

		self
	}

	/// Appends every field of `params` as query parameters.
	///
	/// `params` must serialize as a flat map or a sequence of pairs; `None` fields are skipped.
	pub fn query_params<T>(mut self, params: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.query.extend(encode_pairs(params)?);

		Ok(self)
	}

	/// Adds a header; the pipeline always sets its own `Authorization`.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.append(name, value);

		self
	}

	/// Appends one form field, switching the body to [`RequestBody::Form`].
	pub fn form(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		let pair = (key.into(), value.to_string());

		match &mut self.body {
			RequestBody::Form(pairs) => pairs.push(pair),
			body => *body = RequestBody::Form(vec![pair]),
		}

		self
	}

	/// Appends every field of `params` as form fields.
	pub fn form_params<T>(mut self, params: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		for (key, value) in encode_pairs(params)? {
			self = self.form(key, value);
		}

		Ok(self)
	}

	/// Sends `bytes` verbatim with the provided content type.
	pub fn raw_body(mut self, content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
		self.body = RequestBody::Raw { content_type: content_type.into(), bytes: bytes.into() };

		self
	}

	/// Streams `form` as the request body.
	pub fn streamed_form(mut self, form: FormEncoder) -> Self {
		self.body = RequestBody::Streamed(form);

		self
	}

	/// Runs the call under `context`.
	pub fn context(mut self, context: CallContext) -> Self {
		self.context = context;

		self
	}
}

fn encode_pairs<T>(params: &T) -> Result<Vec<(String, String)>, ConfigError>
where
	T: ?Sized + Serialize,
{
	let encoded = serde_urlencoded::to_string(params)?;

	Ok(url::form_urlencoded::parse(encoded.as_bytes()).into_owned().collect())
}

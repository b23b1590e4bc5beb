//! Credentials, environments, and endpoint layout for athenahealth deployments.
//!
//! Every API path is resolved against `{api}/{practice_id}` of the active [`Environment`]'s
//! [`Endpoints`], and the client-credentials grant posts to `{auth}/token`.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::{_prelude::*, error::ConfigError, token::TokenSecret};

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when practice identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("Practice identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("Practice identifier contains whitespace.")]
	ContainsWhitespace,
	/// The identifier contains a path separator or query delimiter.
	#[error("Practice identifier contains a reserved URL character.")]
	ReservedCharacter,
	/// The identifier exceeded the allowed character count.
	#[error("Practice identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Tenant identifier scoping every API call to one athenahealth practice.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PracticeId(String);
impl PracticeId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for PracticeId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for PracticeId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for PracticeId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<PracticeId> for String {
	fn from(value: PracticeId) -> Self {
		value.0
	}
}
impl TryFrom<String> for PracticeId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Debug for PracticeId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Practice({})", self.0)
	}
}
impl Display for PracticeId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for PracticeId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

/// Immutable client credentials supplied at construction.
///
/// The secret is wrapped in [`TokenSecret`] so `Debug` output stays redacted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Practice the client operates on.
	pub practice_id: PracticeId,
}
impl Credentials {
	/// Bundles the client key, secret, and practice identifier.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		practice_id: PracticeId,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			practice_id,
		}
	}
}

/// athenahealth deployment targeted by a client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
	/// Sandbox deployment (`preview1`).
	#[default]
	Preview,
	/// Live deployment (`v1`).
	Production,
}
impl Environment {
	/// Returns a stable label suitable for span, metric, or cache-key fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Environment::Preview => "preview",
			Environment::Production => "production",
		}
	}

	/// Returns `true` for [`Environment::Preview`].
	pub const fn is_preview(self) -> bool {
		matches!(self, Environment::Preview)
	}

	/// Returns the other environment.
	pub const fn toggled(self) -> Self {
		match self {
			Environment::Preview => Environment::Production,
			Environment::Production => Environment::Preview,
		}
	}

	/// Default OAuth base; the token endpoint lives at `{auth}/token`.
	pub const fn default_auth_base(self) -> &'static str {
		match self {
			Environment::Preview => "https://api.preview.platform.athenahealth.com/oauth2/v1",
			Environment::Production => "https://api.platform.athenahealth.com/oauth2/v1",
		}
	}

	/// Default API root; practice-scoped paths live below `{api}/{practice_id}`.
	pub const fn default_api_base(self) -> &'static str {
		match self {
			Environment::Preview => "https://api.athenahealth.com/preview1",
			Environment::Production => "https://api.athenahealth.com/v1",
		}
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Auth and API base URLs for a single environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
	/// OAuth base URL.
	pub auth: Url,
	/// API root URL, without the practice segment.
	pub api: Url,
}
impl Endpoints {
	/// Creates endpoints from explicit URLs.
	pub fn new(auth: Url, api: Url) -> Self {
		Self { auth, api }
	}

	/// Parses the built-in URLs for `environment`.
	pub fn defaults(environment: Environment) -> Result<Self, ConfigError> {
		Ok(Self {
			auth: parse_url(environment.default_auth_base())?,
			api: parse_url(environment.default_api_base())?,
		})
	}

	/// Returns the client-credentials token endpoint.
	pub fn token_url(&self) -> Result<Url, ConfigError> {
		parse_url(&format!("{}/token", self.auth.as_str().trim_end_matches('/')))
	}

	/// Resolves a practice-scoped API path plus query pairs into an absolute URL.
	pub fn api_url(
		&self,
		practice_id: &PracticeId,
		path: &str,
		query: &[(String, String)],
	) -> Result<Url, ConfigError> {
		let separator = if path.starts_with('/') || path.is_empty() { "" } else { "/" };
		let mut url = parse_url(&format!(
			"{}/{practice_id}{separator}{path}",
			self.api.as_str().trim_end_matches('/')
		))?;

		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}

		Ok(url)
	}
}

/// Endpoint pair for both environments, resolved once at client construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentEndpoints {
	/// Endpoints used while the client targets preview.
	pub preview: Endpoints,
	/// Endpoints used while the client targets production.
	pub production: Endpoints,
}
impl EnvironmentEndpoints {
	/// Returns the endpoints for `environment`.
	pub fn get(&self, environment: Environment) -> &Endpoints {
		match environment {
			Environment::Preview => &self.preview,
			Environment::Production => &self.production,
		}
	}
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::invalid_url(raw, source))
}

fn validate_view(view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace);
	}
	if view.contains(['/', '?', '#']) {
		return Err(IdentifierError::ReservedCharacter);
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

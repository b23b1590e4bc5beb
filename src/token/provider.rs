//! Client-credentials token provider backed by the `oauth2` crate.
//!
//! The provider posts `grant_type=client_credentials` to `{auth}/token` with HTTP Basic
//! client authentication and turns the response into an [`AccessToken`]. Failures are mapped
//! into [`AuthError`]; any non-200 answer becomes [`AuthError::Rejected`] carrying the HTTP
//! status line captured by the instrumented transport.

// crates.io
use oauth2::{
	ClientId, ClientSecret, HttpClientError, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	config::{Credentials, Environment, EnvironmentEndpoints},
	error::{AuthError, ConfigError},
	http::{self, HttpClient, ResponseMetadata, ResponseMetadataSlot},
	token::{AccessToken, TokenFuture, TokenProvider, TokenSecret},
};

/// [`TokenProvider`] performing the OAuth 2.0 client-credentials grant.
#[derive(Clone)]
pub struct ClientCredentialsProvider {
	client_id: String,
	client_secret: TokenSecret,
	endpoints: EnvironmentEndpoints,
	http_client: HttpClient,
}
impl ClientCredentialsProvider {
	/// Creates a provider for the supplied credentials and per-environment endpoints.
	pub fn new(
		credentials: &Credentials,
		endpoints: EnvironmentEndpoints,
		http_client: HttpClient,
	) -> Self {
		Self {
			client_id: credentials.client_id.clone(),
			client_secret: credentials.client_secret.clone(),
			endpoints,
			http_client,
		}
	}

	async fn exchange(&self, environment: Environment) -> Result<AccessToken> {
		let token_url = self.endpoints.get(environment).token_url()?;
		let oauth_client = BasicClient::new(ClientId::new(self.client_id.clone()))
			.set_client_secret(ClientSecret::new(self.client_secret.expose().to_owned()))
			.set_token_uri(TokenUrl::from_url(token_url));
		let slot = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(slot.clone());

		tracing::debug!(environment = environment.as_str(), "requesting athenahealth access token");

		let response = oauth_client
			.exchange_client_credentials()
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(slot.take(), err))?;
		let expires_in = response.expires_in().ok_or(AuthError::InvalidExpiry)?.as_secs();
		let expires_in = i64::try_from(expires_in).map_err(|_| AuthError::InvalidExpiry)?;

		if expires_in <= 0 {
			return Err(AuthError::InvalidExpiry.into());
		}

		let expires_at = OffsetDateTime::now_utc()
			.checked_add(Duration::seconds(expires_in))
			.ok_or(AuthError::InvalidExpiry)?;

		Ok(AccessToken::new(response.access_token().secret().to_owned(), expires_at)
			.issued_for(environment))
	}
}
impl TokenProvider for ClientCredentialsProvider {
	fn provide(&self, environment: Environment) -> TokenFuture<'_> {
		Box::pin(self.exchange(environment))
	}
}
impl Debug for ClientCredentialsProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsProvider")
			.field("client_id", &self.client_id)
			.field("endpoints", &self.endpoints)
			.finish()
	}
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let status = meta.and_then(|value| value.status);
	let rejected_status = status.filter(|code| *code != StatusCode::OK.as_u16());

	match err {
		RequestTokenError::ServerResponse(response) => {
			let message = match response.error_description() {
				Some(description) => description.clone(),
				None => response.error().as_ref().to_owned(),
			};

			AuthError::rejected(rejected_status.unwrap_or(StatusCode::BAD_REQUEST.as_u16()), message)
				.into()
		},
		RequestTokenError::Parse(source, body) => match rejected_status {
			Some(code) => AuthError::rejected(code, http::body_preview(&body)).into(),
			None => AuthError::Malformed { source, status }.into(),
		},
		RequestTokenError::Request(error) => map_transport_error(status, error),
		RequestTokenError::Other(message) => match rejected_status {
			Some(code) => AuthError::rejected(code, message).into(),
			None => AuthError::Unexpected { message, status }.into(),
		},
	}
}

fn map_transport_error(status: Option<u16>, err: HttpClientError<ReqwestError>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => AuthError::transport(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => AuthError::transport(inner).into(),
		HttpClientError::Other(message) => AuthError::Unexpected { message, status }.into(),
		_ => AuthError::Unexpected {
			message: "HTTP client error occurred while calling the token endpoint".into(),
			status,
		}
		.into(),
	}
}

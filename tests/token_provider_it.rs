// crates.io
use httpmock::prelude::*;
// self
use athena_client::{
	_preludet::*,
	client::RequestSpec,
	config::{Environment, EnvironmentEndpoints},
	error::AuthError,
	http::HttpClient,
	token::{ClientCredentialsProvider, TokenProvider},
};

const BASIC_AUTH: &str = "Basic dGVzdC1jbGllbnQ6dGVzdC1zZWNyZXQ=";

fn provider(server: &MockServer) -> ClientCredentialsProvider {
	let base_url = server.base_url();
	let endpoints = EnvironmentEndpoints {
		preview: mock_endpoints(&base_url, Environment::Preview),
		production: mock_endpoints(&base_url, Environment::Production),
	};
	let http_client = HttpClient::new().expect("Default HTTP client should build.");

	ClientCredentialsProvider::new(&test_credentials(), endpoints, http_client)
}

async fn token_endpoint<'a>(
	server: &'a MockServer,
	status: u16,
	content_type: &str,
	body: &str,
) -> httpmock::Mock<'a> {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/token");
			then.status(status).header("content-type", content_type).body(body);
		})
		.await
}

#[tokio::test]
async fn client_credentials_grant_uses_basic_auth() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/v1/token")
				.header("authorization", BASIC_AUTH)
				.header("content-type", "application/x-www-form-urlencoded")
				.body("grant_type=client_credentials");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"abc\",\"token_type\":\"bearer\",\"expires_in\":3600}");
		})
		.await;
	let before = OffsetDateTime::now_utc();
	let token = provider(&server)
		.provide(Environment::Preview)
		.await
		.expect("A well-formed grant response should produce a token.");

	mock.assert_calls_async(1).await;

	assert_eq!(token.expose(), "abc");
	assert!(token.expires_at >= before + Duration::seconds(3600));
	assert!(token.expires_at <= OffsetDateTime::now_utc() + Duration::seconds(3600));
}

#[tokio::test]
async fn unauthorized_json_is_rejected_with_status_line() {
	let server = MockServer::start_async().await;
	let _mock = token_endpoint(
		&server,
		401,
		"application/json",
		"{\"error\":\"invalid_client\",\"error_description\":\"unknown client\"}",
	)
	.await;
	let err = provider(&server)
		.provide(Environment::Preview)
		.await
		.expect_err("A 401 should be rejected.");

	match err {
		Error::Auth(AuthError::Rejected { status, status_line, message }) => {
			assert_eq!(status, 401);
			assert_eq!(status_line, "401 Unauthorized");
			assert_eq!(message, "unknown client");
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn unauthorized_text_keeps_body_preview() {
	let server = MockServer::start_async().await;
	let _mock = token_endpoint(&server, 401, "text/plain", "access denied").await;
	let err = provider(&server)
		.provide(Environment::Preview)
		.await
		.expect_err("A 401 should be rejected.");

	match err {
		Error::Auth(AuthError::Rejected { status, status_line, .. }) => {
			assert_eq!(status, 401);
			assert_eq!(status_line, "401 Unauthorized");
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn missing_expiry_is_invalid() {
	let server = MockServer::start_async().await;
	let _mock = token_endpoint(
		&server,
		200,
		"application/json",
		"{\"access_token\":\"abc\",\"token_type\":\"bearer\"}",
	)
	.await;
	let err = provider(&server)
		.provide(Environment::Preview)
		.await
		.expect_err("A token without expires_in should be refused.");

	assert!(matches!(err, Error::Auth(AuthError::InvalidExpiry)));
}

#[tokio::test]
async fn garbage_success_body_is_malformed() {
	let server = MockServer::start_async().await;
	let _mock = token_endpoint(&server, 200, "application/json", "{not json").await;
	let err = provider(&server)
		.provide(Environment::Preview)
		.await
		.expect_err("Garbage should not parse as a token.");

	assert!(matches!(err, Error::Auth(AuthError::Malformed { status: Some(200), .. })));
}

#[tokio::test]
async fn production_uses_its_own_auth_base() {
	let server = MockServer::start_async().await;
	let base_url = server.base_url();
	let endpoints = EnvironmentEndpoints {
		preview: mock_endpoints(&base_url, Environment::Preview),
		production: athena_client::config::Endpoints::new(
			Url::parse(&format!("{base_url}/prod-oauth2"))
				.expect("Production auth base should parse."),
			Url::parse(&format!("{base_url}/v1")).expect("Production API base should parse."),
		),
	};
	let provider = ClientCredentialsProvider::new(
		&test_credentials(),
		endpoints,
		HttpClient::new().expect("Default HTTP client should build."),
	);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/prod-oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"prod\",\"token_type\":\"bearer\",\"expires_in\":60}");
		})
		.await;
	let token = provider
		.provide(Environment::Production)
		.await
		.expect("Production grant should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(token.expose(), "prod");
}

#[tokio::test]
async fn rejected_grant_aborts_the_api_call() {
	let server = MockServer::start_async().await;
	let (client, _) = build_test_client(&server.base_url());
	let token_mock =
		token_endpoint(&server, 401, "application/json", "{\"error\":\"invalid_client\"}").await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/preview1/195900/patients");
			then.status(200).body("[]");
		})
		.await;
	let err = client
		.execute(RequestSpec::get("/patients"))
		.await
		.expect_err("A rejected grant should fail the request.");

	assert!(matches!(err, Error::Auth(AuthError::Rejected { status: 401, .. })));
	assert!(!err.is_retryable());

	token_mock.assert_calls_async(1).await;
	api_mock.assert_calls_async(0).await;
}

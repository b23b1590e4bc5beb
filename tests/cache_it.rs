// std
use std::{env, fs, path::PathBuf, process, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
// self
use athena_client::{
	_preludet::*,
	cache::{CacheError, DistributedCacher, FileCacher, MemoryTtlStore, TokenCacher, TtlStore},
	client::RequestSpec,
	context::CallContext,
	token::AccessToken,
};

fn temp_path(label: &str) -> PathBuf {
	env::temp_dir().join(format!(
		"athena_client_cache_it_{label}_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	))
}

#[tokio::test]
async fn distributed_token_vanishes_with_its_ttl() {
	let store = Arc::new(MemoryTtlStore::default());
	let shared: Arc<dyn TtlStore> = store.clone();
	let cacher = DistributedCacher::new(shared.clone()).with_key("practice:195900");
	let token = AccessToken::new("short-lived", OffsetDateTime::now_utc() + Duration::seconds(1));

	cacher.set(token.clone()).await.expect("Storing a live token should succeed.");

	assert_eq!(cacher.get().await, Ok(token));

	let raw = shared
		.get("practice:195900")
		.await
		.expect("The in-memory store should not fail.")
		.expect("The token document should be stored under the configured key.");

	assert!(raw.contains("\"token\":\"short-lived\""));
	assert!(raw.contains("\"expiresAt\""));

	tokio::time::sleep(StdDuration::from_millis(1_200)).await;

	assert_eq!(cacher.get().await, Err(CacheError::TokenNotExist));
}

#[tokio::test]
async fn distributed_cacher_ignores_expired_tokens() {
	let cacher = DistributedCacher::new(Arc::new(MemoryTtlStore::default()));

	cacher.set(expired_token("dead")).await.expect("Expired tokens are skipped, not refused.");

	assert_eq!(cacher.key(), DistributedCacher::DEFAULT_KEY);
	assert_eq!(cacher.get().await, Err(CacheError::TokenNotExist));
}

#[tokio::test]
async fn file_cacher_is_shared_between_clients() {
	let server = MockServer::start_async().await;
	let path = temp_path("shared");
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"disk-token\",\"token_type\":\"bearer\",\"expires_in\":3600}");
		})
		.await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/preview1/195900/departments")
				.header("authorization", "Bearer disk-token");
			then.status(200).body("[]");
		})
		.await;

	for _ in 0..2 {
		let cacher = FileCacher::open(&path).expect("Failed to open file cacher.");
		let client = test_client_builder(&server.base_url())
			.token_cacher(Arc::new(cacher))
			.build()
			.expect("Client backed by a file cacher should build.");

		client
			.execute(RequestSpec::get("/departments"))
			.await
			.expect("Request with a file-cached token should succeed.");
	}

	token_mock.assert_calls_async(1).await;
	api_mock.assert_calls_async(2).await;

	let persisted = fs::read_to_string(&path).expect("Cache file should be readable.");

	assert!(persisted.contains("disk-token"));

	fs::remove_file(&path).unwrap_or_else(|e| {
		panic!("Failed to remove temporary cache file {}: {e}", path.display())
	});
}

#[tokio::test]
async fn distributed_cacher_refreshes_after_expiry() {
	let server = MockServer::start_async().await;
	let store = Arc::new(MemoryTtlStore::default());
	let cacher = Arc::new(DistributedCacher::new(store));

	cacher
		.set(AccessToken::new("stale", OffsetDateTime::now_utc() + Duration::milliseconds(300)))
		.await
		.expect("Storing a live token should succeed.");

	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"renewed\",\"token_type\":\"bearer\",\"expires_in\":3600}");
		})
		.await;
	let client = test_client_builder(&server.base_url())
		.token_cacher(cacher)
		.build()
		.expect("Client backed by a distributed cacher should build.");
	let context = CallContext::new();
	let first = client.access_token(&context).await.expect("Cached token should be served.");

	assert_eq!(first.expose(), "stale");

	token_mock.assert_calls_async(0).await;
	tokio::time::sleep(StdDuration::from_millis(500)).await;

	let second = client.access_token(&context).await.expect("Expired token should be refreshed.");

	assert_eq!(second.expose(), "renewed");

	token_mock.assert_calls_async(1).await;
}

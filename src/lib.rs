//! Typed athenahealth API client core: cached client-credentials tokens, pluggable rate limiting,
//! request observability hooks, and streaming form bodies for attachment uploads.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod client;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod obs;
pub mod rate_limit;
pub mod token;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		cache::{MemoryCacher, TokenCacher},
		client::{Client, ClientBuilder},
		config::{Credentials, Endpoints, Environment, PracticeId},
		token::AccessToken,
	};

	/// Client identifier used by test credentials.
	pub const TEST_CLIENT_ID: &str = "test-client";
	/// Client secret used by test credentials.
	pub const TEST_CLIENT_SECRET: &str = "test-secret";
	/// Practice identifier used by test credentials.
	pub const TEST_PRACTICE_ID: &str = "195900";

	/// Builds the credentials shared by integration tests.
	pub fn test_credentials() -> Credentials {
		let practice_id =
			PracticeId::new(TEST_PRACTICE_ID).expect("Test practice identifier should be valid.");

		Credentials::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET, practice_id)
	}

	/// Points both environments at a mock server rooted at `base_url`.
	///
	/// Preview uses `/preview1` and production uses `/v1` for API calls; both share the
	/// `/oauth2/v1` auth base so the token endpoint is `/oauth2/v1/token`.
	pub fn mock_endpoints(base_url: &str, environment: Environment) -> Endpoints {
		let api_root = match environment {
			Environment::Preview => "preview1",
			Environment::Production => "v1",
		};

		Endpoints::new(
			Url::parse(&format!("{base_url}/oauth2/v1")).expect("Mock auth base should parse."),
			Url::parse(&format!("{base_url}/{api_root}")).expect("Mock API base should parse."),
		)
	}

	/// Returns a builder wired to the mock server for both environments.
	pub fn test_client_builder(base_url: &str) -> ClientBuilder {
		Client::builder(test_credentials())
			.environment(Environment::Preview)
			.preview_endpoints(mock_endpoints(base_url, Environment::Preview))
			.production_endpoints(mock_endpoints(base_url, Environment::Production))
	}

	/// Builds a client backed by a shared in-memory cacher so tests can seed or inspect tokens.
	pub fn build_test_client(base_url: &str) -> (Client, Arc<MemoryCacher>) {
		let cacher = Arc::new(MemoryCacher::default());
		let shared: Arc<dyn TokenCacher> = cacher.clone();
		let client = test_client_builder(base_url)
			.token_cacher(shared)
			.build()
			.expect("Test client should build against the mock server.");

		(client, cacher)
	}

	/// Returns a token that stays valid for the next hour.
	pub fn valid_token(value: &str) -> AccessToken {
		AccessToken::new(value, OffsetDateTime::now_utc() + Duration::hours(1))
	}

	/// Returns a token that expired a minute ago.
	pub fn expired_token(value: &str) -> AccessToken {
		AccessToken::new(value, OffsetDateTime::now_utc() - Duration::minutes(1))
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{
		Client as ReqwestClient, Error as ReqwestError, Method, StatusCode, header::HeaderMap,
	};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

//! Demonstrates the client-credentials token cache: two API calls against a mock athenahealth
//! deployment share one token exchange, and toggling the environment switches the API root.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
use url::Url;
// self
use athena_client::{
	cache::MemoryCacher,
	client::{Client, RequestSpec},
	config::{Credentials, Endpoints, Environment, PracticeId},
	obs::TracingTracer,
};

#[derive(Debug, Deserialize)]
struct Department {
	departmentid: String,
	name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let preview_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/preview1/195900/departments")
				.header("authorization", "Bearer demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"departmentid\":\"1\",\"name\":\"Cardiology\"}]");
		})
		.await;
	let production_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/195900/departments");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let auth = Url::parse(&server.url("/oauth2/v1"))?;
	let credentials = Credentials::new("demo-client", "super-secret", PracticeId::new("195900")?);
	let client = Client::builder(credentials)
		.environment(Environment::Preview)
		.preview_endpoints(Endpoints::new(auth.clone(), Url::parse(&server.url("/preview1"))?))
		.production_endpoints(Endpoints::new(auth, Url::parse(&server.url("/v1"))?))
		.token_cacher(Arc::new(MemoryCacher::default()))
		.tracer(Arc::new(TracingTracer))
		.build()?;
	let departments =
		client.request::<Vec<Department>>(RequestSpec::get("/departments")).await?;

	for department in &departments {
		println!("Preview department {}: {}.", department.departmentid, department.name);
	}

	client.toggle_environment();

	let departments =
		client.request::<Vec<Department>>(RequestSpec::get("/departments")).await?;

	println!("Production departments: {}.", departments.len());

	token_mock.assert_calls_async(1).await;
	preview_mock.assert_async().await;
	production_mock.assert_async().await;

	Ok(())
}

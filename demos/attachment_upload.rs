//! Demonstrates streaming a document upload: the attachment is base64-encoded and
//! form-escaped chunk by chunk while the request body is sent.

// std
use std::{io::Cursor, sync::Arc};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use athena_client::{
	cache::MemoryCacher,
	client::{Client, RequestSpec},
	codec::FormEncoder,
	config::{Credentials, Endpoints, PracticeId},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let _token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let upload_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/preview1/195900/patients/1/documents")
				.header("content-type", "application/x-www-form-urlencoded")
				.header("authorization", "Bearer demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"documentid\":\"4242\"}");
		})
		.await;
	let endpoints = Endpoints::new(
		Url::parse(&server.url("/oauth2/v1"))?,
		Url::parse(&server.url("/preview1"))?,
	);
	let credentials = Credentials::new("demo-client", "super-secret", PracticeId::new("195900")?);
	let client = Client::builder(credentials)
		.preview_endpoints(endpoints)
		.token_cacher(Arc::new(MemoryCacher::default()))
		.build()?;
	// Stand-in for a file handle; any `Read + Send` source works.
	let attachment = Cursor::new(vec![0x25_u8; 64 * 1024]);
	let mut form = FormEncoder::new();

	form.add("departmentid", 1)
		.add("documentsubclass", "CLINICALDOCUMENT_ADMISSIONDISCHARGE")
		.add("autoclose", "true")
		.add_base64("attachmentcontents", attachment);

	let created = client
		.request::<serde_json::Value>(
			RequestSpec::post("/patients/1/documents").streamed_form(form),
		)
		.await?;

	println!("Created document {}.", created["documentid"]);

	upload_mock.assert_async().await;

	Ok(())
}

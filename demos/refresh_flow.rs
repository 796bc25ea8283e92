//! Walks through an expired-credential round trip against a local mock backend.
//!
//! 1. Seed a [`MemoryStore`] with an access token the backend no longer accepts.
//! 2. Describe the refresh endpoint with [`RefreshEndpoint`] and wrap the store in an
//!    [`EndpointCredentialSource`].
//! 3. Bind an [`Interceptor`] in front of [`ReqwestTransport`] and fire two requests at once.
//! 4. Both requests hit `401`, share one refresh call, and are resent with the new token.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use auth_interceptor::{
	credential::{EndpointCredentialSource, RefreshEndpoint},
	http::{ReqwestTransport, Request},
	interceptor::Interceptor,
	reqwest::Client,
	store::{MemoryStore, StoredTokens},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/data").header("authorization", "Bearer stale");
			then.status(401).body("[]");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/data").header("authorization", "Bearer fresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"id\":1,\"name\":\"Pepsi\"},{\"id\":2,\"name\":\"Coca-Cola\"}]");
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"accessToken\":\"fresh\",\"refreshToken\":\"rotated\"}")
				.delay(Duration::from_millis(300));
		})
		.await;
	let store = MemoryStore::with_tokens(StoredTokens::new("stale", Some("refresh".into())));
	let endpoint = RefreshEndpoint::builder(Url::parse(&server.url("/refresh"))?).build()?;
	// The mock backend serves a self-signed certificate.
	let transport = ReqwestTransport::from_builder(
		Client::builder().danger_accept_invalid_certs(true).danger_accept_invalid_hostnames(true),
	)?;
	let source =
		EndpointCredentialSource::with_client(Arc::new(store.clone()), endpoint, transport.0.clone());
	let interceptor = Interceptor::new(Arc::new(source));
	let client = interceptor.bind(transport);
	let data = Url::parse(&server.url("/data"))?;
	let (first, second) =
		tokio::join!(client.send(Request::get(data.clone())), client.send(Request::get(data)));

	println!("first:  {}", first?.text());
	println!("second: {}", second?.text());
	println!("refresh metrics: {:?}", interceptor.metrics());
	println!("stored tokens: {:?}", store.snapshot());

	refresh.assert_calls_async(1).await;

	Ok(())
}

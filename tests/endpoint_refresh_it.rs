#![cfg(feature = "reqwest")]

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
// self
use auth_interceptor::{
	credential::{EndpointCredentialSource, RefreshEndpoint},
	error::InterceptError,
	http::{HttpFailure, ReqwestTransport, Request},
	interceptor::{AuthorizedClient, Interceptor},
	reqwest::Client,
	store::{MemoryStore, StoredTokens},
	url::Url,
};

#[derive(Debug, Deserialize, PartialEq, Eq)]
struct Drink {
	id: u32,
	name: String,
}

const DRINKS: &str = "[{\"id\":1,\"name\":\"Pepsi\"},{\"id\":2,\"name\":\"Coca-Cola\"}]";
const REFRESH_REQUEST: &str = "{\"refreshToken\":\"refresh-0\"}";
const REFRESH_RESPONSE: &str = "{\"accessToken\":\"access-1\",\"refreshToken\":\"refresh-1\"}";

// The mock server speaks TLS with a self-signed certificate.
fn insecure_transport() -> Result<ReqwestTransport> {
	Ok(ReqwestTransport::from_builder(
		Client::builder().danger_accept_invalid_certs(true).danger_accept_invalid_hostnames(true),
	)?)
}

fn client(server: &MockServer) -> Result<(AuthorizedClient<ReqwestTransport>, MemoryStore)> {
	let store = MemoryStore::with_tokens(StoredTokens::new("access-0", Some("refresh-0".into())));
	let endpoint = RefreshEndpoint::builder(Url::parse(&server.url("/refresh"))?)
		.skip_url(Url::parse(&server.url("/login"))?)
		.build()?;
	let transport = insecure_transport()?;
	let source =
		EndpointCredentialSource::with_client(Arc::new(store.clone()), endpoint, transport.0.clone());
	let client = Interceptor::new(Arc::new(source)).bind(transport);

	Ok((client, store))
}

async fn mock_data(server: &MockServer) {
	server
		.mock_async(|when, then| {
			when.method(GET).path("/data").header("authorization", "Bearer access-0");
			then.status(401).body("[]");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/data").header("authorization", "Bearer access-1");
			then.status(200).header("content-type", "application/json").body(DRINKS);
		})
		.await;
}

#[tokio::test]
async fn expired_credential_is_refreshed_once_and_request_resent() -> Result<()> {
	let server = MockServer::start_async().await;
	let (client, store) = client(&server)?;

	mock_data(&server).await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/refresh").body(REFRESH_REQUEST);
			then.status(200).header("content-type", "application/json").body(REFRESH_RESPONSE);
		})
		.await;
	let response = client.send(Request::get(Url::parse(&server.url("/data"))?)).await?;
	let drinks: Vec<Drink> = response.json()?;
	let tokens = store.snapshot().expect("Refreshed tokens should be stored.");

	assert_eq!(drinks[0], Drink { id: 1, name: "Pepsi".into() });
	assert_eq!(tokens.access_token.expose(), "access-1");
	assert_eq!(tokens.refresh_token.as_ref().map(|token| token.expose()), Some("refresh-1"));
	assert_eq!(client.interceptor().metrics().successes(), 1);

	refresh.assert_calls_async(1).await;

	Ok(())
}

#[tokio::test]
async fn concurrent_expired_requests_share_one_refresh() -> Result<()> {
	let server = MockServer::start_async().await;
	let (client, _) = client(&server)?;

	mock_data(&server).await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/refresh").body(REFRESH_REQUEST);
			then.status(200)
				.header("content-type", "application/json")
				.body(REFRESH_RESPONSE)
				.delay(Duration::from_millis(300));
		})
		.await;
	let url = Url::parse(&server.url("/data"))?;
	let (first, second) =
		tokio::join!(client.send(Request::get(url.clone())), client.send(Request::get(url)));

	assert_eq!(first?.json::<Vec<Drink>>()?.len(), 2);
	assert_eq!(second?.json::<Vec<Drink>>()?.len(), 2);

	refresh.assert_calls_async(1).await;

	Ok(())
}

#[tokio::test]
async fn rejected_refresh_signs_out_and_surfaces_original_failure() -> Result<()> {
	let server = MockServer::start_async().await;
	let (client, store) = client(&server)?;

	mock_data(&server).await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/refresh");
			then.status(400).body("{\"error\":\"expired\"}");
		})
		.await;
	let err = client
		.send(Request::get(Url::parse(&server.url("/data"))?))
		.await
		.expect_err("A rejected refresh should fail the request.");

	assert!(matches!(
		&err,
		InterceptError::Transport(HttpFailure::Status { response }) if response.status == 401
	));
	assert!(store.snapshot().is_none());
	assert_eq!(client.interceptor().metrics().failures(), 1);

	refresh.assert_calls_async(1).await;

	Ok(())
}

#[tokio::test]
async fn skip_urls_bypass_refresh_handling() -> Result<()> {
	let server = MockServer::start_async().await;
	let (client, store) = client(&server)?;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/login");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/refresh");
			then.status(200).header("content-type", "application/json").body(REFRESH_RESPONSE);
		})
		.await;
	let err = client
		.send(Request::post(Url::parse(&server.url("/login"))?))
		.await
		.expect_err("Skipped requests should surface their own failure.");

	assert_eq!(
		err.transport().and_then(|failure| failure.response()).map(|r| r.status.as_u16()),
		Some(401)
	);
	assert!(store.snapshot().is_some());

	login.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	Ok(())
}

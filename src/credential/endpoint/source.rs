// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	credential::{AccessToken, CredentialFuture, CredentialSource, RefreshEndpoint},
	error::{ConfigError, RefreshError},
	http::Request,
	obs,
	store::{StoredTokens, TokenStore},
};

/// Credential source backed by a [`TokenStore`] and a JSON refresh endpoint.
///
/// Refreshing POSTs `{"<request_refresh>": "<refresh token>"}` to the endpoint and saves the
/// returned pair. Any refresh failure clears the store, so the user is signed out rather than
/// left with a credential that can no longer be renewed. Refresh calls use the source's own
/// reqwest client and never pass through an interceptor.
pub struct EndpointCredentialSource {
	store: Arc<dyn TokenStore>,
	client: ReqwestClient,
	endpoint: RefreshEndpoint,
	interrupted_url: Mutex<Option<String>>,
}
impl EndpointCredentialSource {
	/// Creates a source using a default reqwest client.
	pub fn new(store: Arc<dyn TokenStore>, endpoint: RefreshEndpoint) -> Self {
		Self::with_client(store, endpoint, ReqwestClient::new())
	}

	/// Creates a source using the provided reqwest client for refresh calls.
	pub fn with_client(
		store: Arc<dyn TokenStore>,
		endpoint: RefreshEndpoint,
		client: ReqwestClient,
	) -> Self {
		Self { store, client, endpoint, interrupted_url: Mutex::new(None) }
	}

	/// Descriptor this source refreshes against.
	pub fn endpoint(&self) -> &RefreshEndpoint {
		&self.endpoint
	}

	/// Takes the location a guard last interrupted, if any.
	pub fn take_interrupted_url(&self) -> Option<String> {
		self.interrupted_url.lock().take()
	}

	async fn refresh_now(&self) -> Result<(), RefreshError> {
		let refresh_token = self
			.store
			.fetch()
			.await?
			.and_then(|tokens| tokens.refresh_token)
			.ok_or(RefreshError::MissingRefreshToken)?;
		let mut payload = Map::with_capacity(1);

		payload.insert(
			self.endpoint.fields.request_refresh.clone(),
			Value::String(refresh_token.expose().to_owned()),
		);

		let response = self
			.client
			.post(self.endpoint.refresh_url.clone())
			.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
			.body(Value::Object(payload).to_string())
			.send()
			.await?;
		let status = response.status();
		let body = response.bytes().await?;

		if !status.is_success() {
			return Err(RefreshError::Rejected {
				status: Some(status.as_u16()),
				reason: status.canonical_reason().unwrap_or("unexpected status").to_owned(),
			});
		}

		let mut de = serde_json::Deserializer::from_slice(&body);
		let mut fields: Map<String, Value> = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| RefreshError::TokenResponseParse {
				source,
				status: Some(status.as_u16()),
			})?;
		let access_token = take_string(&mut fields, &self.endpoint.fields.response_access)?;
		// Endpoints that do not rotate refresh tokens keep the current one.
		let rotated = if fields.contains_key(&self.endpoint.fields.response_refresh) {
			take_string(&mut fields, &self.endpoint.fields.response_refresh)?
		} else {
			refresh_token.expose().to_owned()
		};

		self.store.save(StoredTokens::new(access_token, Some(rotated))).await?;

		Ok(())
	}
}
impl CredentialSource for EndpointCredentialSource {
	fn access_token(&self) -> CredentialFuture<'_, Option<AccessToken>> {
		Box::pin(async move {
			match self.store.fetch().await {
				Ok(tokens) => tokens.map(|tokens| tokens.access_token),
				Err(e) => {
					obs::store_unavailable(&e);

					None
				},
			}
		})
	}

	fn refresh(&self) -> CredentialFuture<'_, Result<(), RefreshError>> {
		Box::pin(async move {
			let result = self.refresh_now().await;

			if result.is_err() {
				let cleared = self.store.clear().await;

				if let Err(e) = cleared {
					obs::store_unavailable(&e);
				}
			}

			result
		})
	}

	fn skip_request(&self, request: &Request) -> bool {
		self.endpoint.is_skipped(&request.url)
	}

	fn auth_headers(&self, token: &AccessToken) -> Result<HeaderMap, ConfigError> {
		self.endpoint.header_scheme.headers(token)
	}

	fn set_interrupted_url(&self, url: &str) {
		*self.interrupted_url.lock() = Some(url.to_owned());
	}
}
impl Debug for EndpointCredentialSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EndpointCredentialSource")
			.field("endpoint", &self.endpoint)
			.field("interrupted_url", &self.interrupted_url)
			.finish_non_exhaustive()
	}
}

fn take_string(fields: &mut Map<String, Value>, field: &str) -> Result<String, RefreshError> {
	match fields.remove(field) {
		Some(Value::String(value)) if !value.is_empty() => Ok(value),
		_ => Err(RefreshError::MissingResponseField { field: field.to_owned() }),
	}
}

#[cfg(test)]
mod tests {
	// self
	use httpmock::prelude::*;
	// self
	use super::*;
	use crate::{
		_preludet::{get, test_reqwest_transport},
		store::MemoryStore,
	};

	fn source(store: MemoryStore) -> EndpointCredentialSource {
		let endpoint = RefreshEndpoint::builder(
			Url::parse("https://api.example.com/refresh").expect("Fixture URL should parse."),
		)
		.skip_url(Url::parse("https://api.example.com/login").expect("Fixture URL should parse."))
		.build()
		.expect("Descriptor fixture should be valid.");

		EndpointCredentialSource::new(Arc::new(store), endpoint)
	}

	#[tokio::test]
	async fn reads_access_token_from_store() {
		let store = MemoryStore::with_tokens(StoredTokens::new("access-1", None));
		let source = source(store.clone());

		assert_eq!(source.access_token().await, Some(AccessToken::new("access-1")));
		assert!(source.is_authenticated().await);

		store.clear().await.expect("Clear should succeed.");

		assert!(!source.is_authenticated().await);
	}

	#[tokio::test]
	async fn refresh_without_refresh_token_signs_out() {
		let store = MemoryStore::with_tokens(StoredTokens::new("access-1", None));
		let source = source(store.clone());
		let err = source.refresh().await.expect_err("Refreshing requires a refresh token.");

		assert!(matches!(err, RefreshError::MissingRefreshToken));
		assert!(store.snapshot().is_none());
	}

	#[test]
	fn skips_refresh_and_configured_urls_only() {
		let source = source(MemoryStore::default());

		assert!(source.skip_request(&get("https://api.example.com/refresh")));
		assert!(source.skip_request(&get("https://api.example.com/login?next=/home")));
		assert!(!source.skip_request(&get("https://api.example.com/data")));
	}

	#[test]
	fn interrupted_url_is_taken_once() {
		let source = source(MemoryStore::default());

		source.set_interrupted_url("/orders/7");

		assert_eq!(source.take_interrupted_url().as_deref(), Some("/orders/7"));
		assert_eq!(source.take_interrupted_url(), None);
	}

	fn http_source(server: &MockServer, store: MemoryStore) -> EndpointCredentialSource {
		let endpoint = RefreshEndpoint::builder(
			Url::parse(&server.url("/refresh")).expect("Mock server URL should parse."),
		)
		.build()
		.expect("Loopback descriptor should be valid.");

		EndpointCredentialSource::with_client(
			Arc::new(store),
			endpoint,
			test_reqwest_transport().0.clone(),
		)
	}

	#[tokio::test]
	async fn non_rotating_endpoint_keeps_current_refresh_token() {
		let server = MockServer::start_async().await;
		let refresh = server
			.mock_async(|when, then| {
				when.method(POST)
					.path("/refresh")
					.header("content-type", "application/json")
					.body("{\"refreshToken\":\"refresh-0\"}");
				then.status(200)
					.header("content-type", "application/json")
					.body("{\"accessToken\":\"access-1\"}");
			})
			.await;
		let store = MemoryStore::with_tokens(StoredTokens::new("access-0", Some("refresh-0".into())));
		let source = http_source(&server, store.clone());

		source.refresh().await.expect("Refresh should succeed.");

		let tokens = store.snapshot().expect("Refreshed tokens should be stored.");

		assert_eq!(tokens.access_token.expose(), "access-1");
		assert_eq!(tokens.refresh_token.as_ref().map(|token| token.expose()), Some("refresh-0"));

		refresh.assert_calls_async(1).await;
	}

	#[tokio::test]
	async fn malformed_refresh_response_signs_out() {
		let server = MockServer::start_async().await;

		server
			.mock_async(|when, then| {
				when.method(POST).path("/refresh");
				then.status(200).header("content-type", "application/json").body("{\"accessToken\":");
			})
			.await;

		let store = MemoryStore::with_tokens(StoredTokens::new("access-0", Some("refresh-0".into())));
		let source = http_source(&server, store.clone());
		let err = source.refresh().await.expect_err("Truncated JSON should fail the refresh.");

		assert!(matches!(err, RefreshError::TokenResponseParse { status: Some(200), .. }));
		assert!(store.snapshot().is_none());
	}

	#[test]
	fn missing_or_empty_response_fields_are_reported() {
		let mut fields = Map::new();

		fields.insert("accessToken".into(), Value::String(String::new()));

		for field in ["accessToken", "refreshToken"] {
			let err = take_string(&mut fields, field).expect_err("Field should be rejected.");

			assert!(matches!(err, RefreshError::MissingResponseField { field: f } if f == field));
		}
	}
}

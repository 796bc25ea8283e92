//! Request/response model and the transport seam the interceptor sends through.
//!
//! The interceptor never talks to a concrete HTTP stack. It hands [`Request`] values to a
//! [`Transport`] (the remainder of the pipeline) and classifies failures through
//! [`TransportFailure`], which only needs to expose an optional HTTP status. With the `reqwest`
//! feature enabled, [`ReqwestTransport`] provides a ready-made transport that reports non-2xx
//! responses as [`HttpFailure::Status`], so authorization errors such as `401` flow through the
//! same error channel as network failures.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{BoxError, ConfigError},
};

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a, E> = Pin<Box<dyn Future<Output = Result<Response, E>> + 'a + Send>>;

/// Remainder of the request pipeline behind the interceptor.
///
/// Implementations must be `Send + Sync` so a single transport can be shared by every in-flight
/// request, and the returned future must be `Send` so interceptor futures can hop executors.
pub trait Transport
where
	Self: Send + Sync,
{
	/// Failure emitted when a request cannot produce a successful response.
	type Error: TransportFailure;

	/// Sends `request` and resolves with its response or failure.
	fn send(&self, request: Request) -> TransportFuture<'_, Self::Error>;
}
impl<T> Transport for Arc<T>
where
	T: ?Sized + Transport,
{
	type Error = T::Error;

	fn send(&self, request: Request) -> TransportFuture<'_, Self::Error> {
		self.as_ref().send(request)
	}
}

/// Failure view consumed by refresh predicates.
///
/// The trait keeps predicates decoupled from any HTTP client; the only thing the default
/// predicate needs is the HTTP status of the failed exchange.
pub trait TransportFailure
where
	Self: 'static + Send + Sync + StdError,
{
	/// HTTP status of the failed exchange, when the server answered at all.
	fn status(&self) -> Option<StatusCode>;
}

/// Outgoing call description.
///
/// The interceptor only ever works on clones, so the caller's original stays untouched and a
/// resend always picks up the credential that is current at resend time.
#[derive(Clone, Debug)]
pub struct Request {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// Request headers.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl Request {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Shorthand for a `POST` request.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Appends a header value.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.append(name, value);

		self
	}

	/// Replaces the body with raw bytes.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `payload` as the JSON body and sets `content-type: application/json`.
	pub fn with_json<T>(mut self, payload: &T) -> Result<Self, serde_json::Error>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(payload)?);
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Returns a copy with every name in `overrides` replaced by the override's values.
	///
	/// Names absent from `overrides` keep their original values; multi-valued overrides keep all
	/// of their values.
	pub fn with_headers_overridden(&self, overrides: &HeaderMap) -> Self {
		let mut copy = self.clone();

		for name in overrides.keys() {
			copy.headers.remove(name);

			for value in overrides.get_all(name) {
				copy.headers.append(name.clone(), value.clone());
			}
		}

		copy
	}
}

/// Response returned by a [`Transport`].
#[derive(Clone, Debug)]
pub struct Response {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl Response {
	/// Creates a response without headers.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Deserializes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
	}

	/// Returns the body as UTF-8 text, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Failure type used by the built-in transports.
#[derive(Debug, ThisError)]
pub enum HttpFailure {
	/// The server answered with a non-success status.
	#[error("Server responded with HTTP {}.", .response.status)]
	Status {
		/// Full response, so callers can still inspect headers and body.
		response: Response,
	},
	/// The request never produced a response (DNS, TCP, TLS, body read).
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl HttpFailure {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Returns the failed response, if the server answered.
	pub fn response(&self) -> Option<&Response> {
		match self {
			Self::Status { response } => Some(response),
			Self::Network { .. } => None,
		}
	}
}
impl TransportFailure for HttpFailure {
	fn status(&self) -> Option<StatusCode> {
		self.response().map(|response| response.status)
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for HttpFailure {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Thin wrapper around [`ReqwestClient`] implementing [`Transport`].
///
/// Non-2xx responses are reported as [`HttpFailure::Status`] so the interceptor sees
/// authorization failures on its error path.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds the wrapped client from a configured [`reqwest::ClientBuilder`].
	pub fn from_builder(builder: reqwest::ClientBuilder) -> Result<Self, ConfigError> {
		Ok(Self(builder.build()?))
	}

	async fn execute(&self, request: Request) -> Result<Response, HttpFailure> {
		let mut builder = self.0.request(request.method, request.url).headers(request.headers);

		if let Some(body) = request.body {
			builder = builder.body(body);
		}

		let response = builder.send().await?;
		let status = response.status();
		let headers = response.headers().to_owned();
		let body = response.bytes().await?.to_vec();
		let response = Response { status, headers, body };

		if status.is_success() { Ok(response) } else { Err(HttpFailure::Status { response }) }
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	type Error = HttpFailure;

	fn send(&self, request: Request) -> TransportFuture<'_, Self::Error> {
		Box::pin(self.execute(request))
	}
}

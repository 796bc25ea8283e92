//! Bearer-credential request interceptor with single-flight token refresh. Concurrent requests
//! that hit an expired credential wait on one shared refresh and are resent afterwards, without
//! refresh errors ever leaking to callers.
//!
//! The crate is organized around one orchestrator, [`Interceptor`](interceptor::Interceptor),
//! which sits in front of any [`Transport`](http::Transport) and consults a
//! [`CredentialSource`](credential::CredentialSource) for tokens, refresh operations, and
//! per-request policy. All refresh bookkeeping lives in a
//! [`RefreshCoordinator`](refresh::RefreshCoordinator) owned by the interceptor instance.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod credential;
pub mod error;
pub mod guard;
pub mod http;
pub mod interceptor;
pub mod obs;
pub mod refresh;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// self
	use crate::{
		credential::{AccessToken, CredentialFuture, CredentialSource},
		error::RefreshError,
		http::{HttpFailure, Request, Response, Transport, TransportFuture},
	};

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_transport() -> crate::http::ReqwestTransport {
		crate::http::ReqwestTransport::from_builder(
			ReqwestClient::builder()
				.danger_accept_invalid_certs(true)
				.danger_accept_invalid_hostnames(true),
		)
		.expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Builds a `GET` request for the provided absolute URL.
	pub fn get(url: &str) -> Request {
		Request::get(Url::parse(url).expect("Test request URL should parse successfully."))
	}

	/// Builds a response with the provided status and body.
	pub fn response(status: u16, body: &str) -> Response {
		Response::new(
			StatusCode::from_u16(status).expect("Test response status should be valid."),
			body.as_bytes().to_vec(),
		)
	}

	/// Request observed by a [`ScriptedTransport`].
	#[derive(Clone, Debug)]
	pub struct SentRequest {
		/// Path component of the request URL.
		pub path: String,
		/// `Authorization` header value, if present.
		pub authorization: Option<String>,
		/// Full request as it reached the transport.
		pub request: Request,
	}

	/// Transport that replays queued status codes per path and records every request.
	///
	/// Requests carrying an expired bearer token answer `401`. Otherwise paths without a queued
	/// status answer `200` with the body `{"path":"<path>"}`. Non-2xx statuses surface as
	/// [`HttpFailure::Status`], mirroring the reqwest transport.
	#[derive(Clone, Debug, Default)]
	pub struct ScriptedTransport {
		script: Arc<Mutex<HashMap<String, VecDeque<(u16, String)>>>>,
		expired: Arc<Mutex<Vec<String>>>,
		sent: Arc<Mutex<Vec<SentRequest>>>,
	}
	impl ScriptedTransport {
		/// Answers `401` to every request authorized with `Bearer <token>`.
		pub fn expire(&self, token: &str) -> &Self {
			self.expired.lock().push(format!("Bearer {token}"));

			self
		}

		/// Queues a reply for the next request hitting `path`.
		pub fn reply(&self, path: &str, status: u16, body: &str) -> &Self {
			self.script
				.lock()
				.entry(path.to_owned())
				.or_default()
				.push_back((status, body.to_owned()));

			self
		}

		/// Returns every request sent so far.
		pub fn sent(&self) -> Vec<SentRequest> {
			self.sent.lock().clone()
		}

		/// Returns the requests sent to `path`.
		pub fn sent_to(&self, path: &str) -> Vec<SentRequest> {
			self.sent.lock().iter().filter(|sent| sent.path == path).cloned().collect()
		}
	}
	impl Transport for ScriptedTransport {
		type Error = HttpFailure;

		fn send(&self, request: Request) -> TransportFuture<'_, Self::Error> {
			Box::pin(async move {
				let path = request.url.path().to_owned();
				let authorization = request
					.headers
					.get(AUTHORIZATION)
					.and_then(|value| value.to_str().ok())
					.map(ToOwned::to_owned);
				let expired =
					authorization.as_ref().is_some_and(|value| self.expired.lock().contains(value));
				let reply = if expired {
					Some((401, String::new()))
				} else {
					self.script.lock().get_mut(&path).and_then(VecDeque::pop_front)
				};

				self.sent.lock().push(SentRequest { path: path.clone(), authorization, request });

				let (status, body) =
					reply.unwrap_or_else(|| (200, format!("{{\"path\":\"{path}\"}}")));
				let response = response(status, &body);

				if response.status.is_success() {
					Ok(response)
				} else {
					Err(HttpFailure::Status { response })
				}
			})
		}
	}

	/// Credential source whose refresh blocks until the test releases it.
	///
	/// Each successful refresh rotates the access token to `token-<n>` where `n` counts the
	/// refresh calls. Requests whose path equals [`StubSource::SKIP_PATH`] are skipped.
	#[derive(Debug)]
	pub struct StubSource {
		token: Mutex<Option<String>>,
		refresh_calls: AtomicUsize,
		gate: Option<tokio::sync::Semaphore>,
		fail_refresh: Mutex<bool>,
	}
	impl StubSource {
		/// Path the stub marks as skippable.
		pub const SKIP_PATH: &'static str = "/refresh";

		/// Creates a stub seeded with `token` whose refreshes complete immediately.
		pub fn new(token: Option<&str>) -> Self {
			Self {
				token: Mutex::new(token.map(ToOwned::to_owned)),
				refresh_calls: AtomicUsize::new(0),
				gate: None,
				fail_refresh: Mutex::new(false),
			}
		}

		/// Creates a stub whose refreshes wait for [`StubSource::release`].
		pub fn gated(token: Option<&str>) -> Self {
			Self { gate: Some(tokio::sync::Semaphore::new(0)), ..Self::new(token) }
		}

		/// Makes every subsequent refresh fail.
		pub fn fail_refreshes(&self) {
			*self.fail_refresh.lock() = true;
		}

		/// Lets one pending (or future) refresh settle.
		pub fn release(&self) {
			if let Some(gate) = &self.gate {
				gate.add_permits(1);
			}
		}

		/// Returns how many times [`CredentialSource::refresh`] ran.
		pub fn refresh_calls(&self) -> usize {
			self.refresh_calls.load(Ordering::SeqCst)
		}
	}
	impl CredentialSource for StubSource {
		fn access_token(&self) -> CredentialFuture<'_, Option<AccessToken>> {
			let token = self.token.lock().clone().map(AccessToken::new);

			Box::pin(std::future::ready(token))
		}

		fn refresh(&self) -> CredentialFuture<'_, Result<(), RefreshError>> {
			Box::pin(async move {
				let calls = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;

				if let Some(gate) = &self.gate {
					gate.acquire().await.map_err(|_| RefreshError::Rejected {
						status: None,
						reason: "Refresh gate closed.".into(),
					})?
					.forget();
				}

				if *self.fail_refresh.lock() {
					*self.token.lock() = None;

					return Err(RefreshError::Rejected {
						status: Some(400),
						reason: "Refresh token expired.".into(),
					});
				}

				*self.token.lock() = Some(format!("token-{calls}"));

				Ok(())
			})
		}

		fn skip_request(&self, request: &Request) -> bool {
			request.url.path() == Self::SKIP_PATH
		}
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use ::http::{
		HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
		header::{AUTHORIZATION, CONTENT_TYPE},
	};
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

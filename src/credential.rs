//! Credential source contract, access-token wrapper, and request augmentation.
//!
//! [`CredentialSource`] is a capability interface: the two operations every source must supply
//! (reading the current token and refreshing it) are required, everything else ships with a
//! default the interceptor relies on when a source does not care to customize it.

pub mod augment;
pub mod endpoint;

pub use augment::*;
pub use endpoint::*;

// self
use crate::{
	_prelude::*,
	error::{ConfigError, RefreshError},
	http::{Request, TransportFailure},
};

/// Boxed future returned by [`CredentialSource`] operations.
///
/// Synchronous sources return `Box::pin(std::future::ready(value))`; asynchronous ones box their
/// async block. Either way the interceptor awaits without blocking the executor.
pub type CredentialFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a + Send>>;

/// Redacted access token wrapper keeping credentials out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken(String);
impl AccessToken {
	/// Wraps a new token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` for the empty token, which is treated like an absent one.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl AsRef<str> for AccessToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AccessToken").field(&"<redacted>").finish()
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Supplies credentials and per-request policy to the interceptor.
///
/// Implementors are required to be `Send + Sync`; one source is shared by every request an
/// interceptor handles. Override only what you need:
///
/// | Hook | Default |
/// | --- | --- |
/// | [`is_authenticated`](Self::is_authenticated) | a non-empty access token exists |
/// | [`should_refresh`](Self::should_refresh) | the failure carries HTTP `401` |
/// | [`skip_request`](Self::skip_request) | never skip |
/// | [`auth_headers`](Self::auth_headers) | `Authorization: Bearer <token>` |
/// | [`set_interrupted_url`](Self::set_interrupted_url) | ignore |
pub trait CredentialSource
where
	Self: Send + Sync,
{
	/// Returns the current access token, if any.
	fn access_token(&self) -> CredentialFuture<'_, Option<AccessToken>>;

	/// Performs the refresh operation, updating whatever the next
	/// [`access_token`](Self::access_token) call returns.
	///
	/// The interceptor guarantees at most one outstanding call per interceptor instance.
	fn refresh(&self) -> CredentialFuture<'_, Result<(), RefreshError>>;

	/// Reports whether a user is currently authenticated. Consulted by route guards only.
	fn is_authenticated(&self) -> CredentialFuture<'_, bool> {
		Box::pin(async move { self.access_token().await.is_some_and(|token| !token.is_empty()) })
	}

	/// Decides whether `failure` of `request` should start or join a refresh cycle.
	fn should_refresh(&self, failure: &dyn TransportFailure, _request: &Request) -> bool {
		failure.status() == Some(StatusCode::UNAUTHORIZED)
	}

	/// Exempts `request` from augmentation and refresh handling (e.g. the refresh endpoint).
	fn skip_request(&self, _request: &Request) -> bool {
		false
	}

	/// Builds the headers that carry `token`.
	///
	/// Every returned header name overrides the same name on the outgoing request; multi-valued
	/// entries are sent as-is.
	fn auth_headers(&self, token: &AccessToken) -> Result<HeaderMap, ConfigError> {
		bearer_headers(token)
	}

	/// Remembers the location a guard interrupted so sign-in can return there.
	fn set_interrupted_url(&self, _url: &str) {}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{StubSource, get, response},
		http::HttpFailure,
	};

	#[test]
	fn access_token_formatters_redact() {
		let token = AccessToken::new("super-secret");

		assert_eq!(format!("{token:?}"), "AccessToken(\"<redacted>\")");
		assert_eq!(format!("{token}"), "<redacted>");
	}

	#[test]
	fn default_predicate_only_matches_unauthorized() {
		let source = StubSource::new(Some("token-0"));
		let request = get("https://api.example.com/data");
		let unauthorized = HttpFailure::Status { response: response(401, "") };
		let forbidden = HttpFailure::Status { response: response(403, "") };
		let network = HttpFailure::network(std::io::Error::other("reset"));

		assert!(source.should_refresh(&unauthorized, &request));
		assert!(!source.should_refresh(&forbidden, &request));
		assert!(!source.should_refresh(&network, &request));
	}

	#[tokio::test]
	async fn default_authentication_check_ignores_empty_tokens() {
		assert!(StubSource::new(Some("token-0")).is_authenticated().await);
		assert!(!StubSource::new(Some("")).is_authenticated().await);
		assert!(!StubSource::new(None).is_authenticated().await);
	}
}

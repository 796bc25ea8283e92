//! Refresh-endpoint descriptor shared by endpoint-backed credential sources.
//!
//! The descriptor is validated metadata: where refresh calls go, which URLs bypass the
//! interceptor, how the credential travels on requests, and which JSON fields carry the tokens.

/// Builder API for assembling refresh-endpoint descriptors.
pub mod builder;
/// Credential source that refreshes against a [`RefreshEndpoint`].
#[cfg(feature = "reqwest")] pub mod source;

pub use builder::*;
#[cfg(feature = "reqwest")] pub use source::*;

// self
use crate::{_prelude::*, credential::AccessToken, error::ConfigError};

/// How the access token is attached to outgoing requests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HeaderScheme {
	/// `Authorization: Bearer <token>`.
	#[default]
	Bearer,
	/// The raw token under a custom header name.
	Custom(HeaderName),
}
impl HeaderScheme {
	/// Parses `name` into a [`HeaderScheme::Custom`] scheme.
	pub fn custom(name: &str) -> Result<Self, ConfigError> {
		Ok(Self::Custom(HeaderName::try_from(name)?))
	}

	/// Builds the header set carrying `token`.
	pub fn headers(&self, token: &AccessToken) -> Result<HeaderMap, ConfigError> {
		match self {
			Self::Bearer => super::bearer_headers(token),
			Self::Custom(name) => {
				let mut headers = HeaderMap::with_capacity(1);

				headers.insert(name.clone(), HeaderValue::from_str(token.expose())?);

				Ok(headers)
			},
		}
	}
}

/// JSON field names used by the refresh exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFields {
	/// Request field carrying the refresh token.
	pub request_refresh: String,
	/// Response field carrying the new access token.
	pub response_access: String,
	/// Response field carrying the rotated refresh token.
	pub response_refresh: String,
}
impl Default for TokenFields {
	fn default() -> Self {
		Self {
			request_refresh: "refreshToken".into(),
			response_access: "accessToken".into(),
			response_refresh: "refreshToken".into(),
		}
	}
}

/// Immutable refresh-endpoint descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshEndpoint {
	/// Endpoint receiving refresh calls; never augmented or refreshed itself.
	pub refresh_url: Url,
	/// Additional URLs the interceptor must leave alone (e.g. sign-in).
	pub skip_urls: Vec<Url>,
	/// Header scheme for the access token.
	pub header_scheme: HeaderScheme,
	/// JSON field names of the refresh exchange.
	pub fields: TokenFields,
}
impl RefreshEndpoint {
	/// Creates a new builder for the provided refresh URL.
	pub fn builder(refresh_url: Url) -> RefreshEndpointBuilder {
		RefreshEndpointBuilder::new().refresh_url(refresh_url)
	}

	/// Returns `true` when `url` targets the refresh endpoint or a configured skip URL.
	///
	/// Query strings and fragments are ignored.
	pub fn is_skipped(&self, url: &Url) -> bool {
		same_resource(&self.refresh_url, url)
			|| self.skip_urls.iter().any(|skip| same_resource(skip, url))
	}
}

fn same_resource(a: &Url, b: &Url) -> bool {
	a.scheme() == b.scheme()
		&& a.host() == b.host()
		&& a.port_or_known_default() == b.port_or_known_default()
		&& a.path() == b.path()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Test URL should parse.")
	}

	#[test]
	fn skip_matching_ignores_query_and_default_port() {
		let endpoint = RefreshEndpoint::builder(url("https://api.example.com/refresh"))
			.skip_url(url("https://api.example.com/login"))
			.build()
			.expect("Descriptor fixture should be valid.");

		assert!(endpoint.is_skipped(&url("https://api.example.com:443/refresh?x=1")));
		assert!(endpoint.is_skipped(&url("https://api.example.com/login#top")));
		assert!(!endpoint.is_skipped(&url("https://api.example.com/refresh/extra")));
		assert!(!endpoint.is_skipped(&url("https://other.example.com/refresh")));
	}

	#[test]
	fn custom_scheme_sends_raw_token() {
		let scheme = HeaderScheme::custom("X-Auth-Token").expect("Header name should parse.");
		let headers =
			scheme.headers(&AccessToken::new("abc")).expect("Custom header should be valid.");

		assert_eq!(headers["x-auth-token"], "abc");
		assert!(headers.get(AUTHORIZATION).is_none());
		assert_eq!(
			HeaderScheme::Bearer
				.headers(&AccessToken::new("abc"))
				.expect("Bearer header should be valid.")[AUTHORIZATION],
			"Bearer abc"
		);
	}

	#[test]
	fn custom_scheme_rejects_invalid_header_name() {
		let err = HeaderScheme::custom("x auth token").expect_err("Spaces are not allowed.");

		assert!(matches!(err, ConfigError::InvalidHeaderName(_)));
		assert_eq!(err.to_string(), "Configured header name is invalid.");
	}
}

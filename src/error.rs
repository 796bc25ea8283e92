//! Error types shared by the interceptor, credential sources, and stores.

// self
use crate::{_prelude::*, http::Request};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure surfaced to callers of
/// [`Interceptor::intercept`](crate::interceptor::Interceptor::intercept).
///
/// `F` is the error type of the wrapped transport. Recoverable failures whose refresh failed are
/// reported as [`InterceptError::Transport`] carrying the original failure, so callers only ever
/// branch on what their own request produced.
#[derive(Debug, ThisError)]
pub enum InterceptError<F> {
	/// The transport failed (either the first attempt or the resend after a refresh).
	#[error(transparent)]
	Transport(F),
	/// The request was held while a refresh was in progress and that refresh failed; it was never
	/// sent.
	#[error("Request to {} was not sent because the credential refresh failed.", .request.url)]
	Denied {
		/// The pending request, exactly as the caller issued it.
		request: Box<Request>,
	},
	/// Authorization headers could not be built.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl<F> InterceptError<F> {
	/// Returns the transport failure, if the request reached the transport.
	pub fn transport(&self) -> Option<&F> {
		match self {
			Self::Transport(failure) => Some(failure),
			_ => None,
		}
	}

	/// Returns `true` when the request never reached the transport because a refresh failed.
	pub fn is_denied(&self) -> bool {
		matches!(self, Self::Denied { .. })
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A credential produced a header value that HTTP cannot carry.
	#[error("Credential cannot be encoded as an HTTP header value.")]
	InvalidHeaderValue(#[from] ::http::header::InvalidHeaderValue),
	/// A configured header name is not a valid HTTP header name.
	#[error("Configured header name is invalid.")]
	InvalidHeaderName(#[from] ::http::header::InvalidHeaderName),
	/// Refresh endpoint descriptor failed validation.
	#[error(transparent)]
	Endpoint(#[from] crate::credential::RefreshEndpointError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures raised by [`CredentialSource::refresh`](crate::credential::CredentialSource::refresh).
///
/// The interceptor never hands these to intercepted callers; they are logged, counted, and turned
/// into a failed refresh outcome.
#[derive(Debug, ThisError)]
pub enum RefreshError {
	/// The refresh endpoint rejected the refresh credential.
	#[error("Refresh endpoint rejected the credential: {reason}.")]
	Rejected {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Endpoint- or source-supplied reason string.
		reason: String,
	},
	/// No refresh credential is stored.
	#[error("No refresh token is stored.")]
	MissingRefreshToken,
	/// Network failure while calling the refresh endpoint.
	#[error("Network error occurred while calling the refresh endpoint.")]
	Transport {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Refresh endpoint answered without a required string field.
	#[error("Refresh response is missing the `{field}` field.")]
	MissingResponseField {
		/// Configured JSON field name.
		field: String,
	},
	/// Refresh endpoint responded with malformed JSON.
	#[error("Refresh endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Refreshed tokens could not be persisted.
	#[error(transparent)]
	Storage(#[from] crate::store::StoreError),
}
impl RefreshError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Transport { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for RefreshError {
	fn from(e: ReqwestError) -> Self {
		Self::transport(e)
	}
}

//! Attaches the current credential to outgoing requests.

// self
use crate::{
	_prelude::*,
	credential::{AccessToken, CredentialSource},
	error::ConfigError,
	http::Request,
};

/// Builds the default `Authorization: Bearer <token>` header set.
pub fn bearer_headers(token: &AccessToken) -> Result<HeaderMap, ConfigError> {
	let mut headers = HeaderMap::with_capacity(1);

	headers.insert(AUTHORIZATION, HeaderValue::try_from(format!("Bearer {}", token.expose()))?);

	Ok(headers)
}

/// Returns a copy of `request` carrying the source's current credential.
///
/// Absent or empty credentials leave the copy untouched, so anonymous calls never gain
/// fabricated headers. Header values are marked sensitive to keep them out of `Debug` output.
pub async fn augment<S>(source: &S, request: &Request) -> Result<Request, ConfigError>
where
	S: ?Sized + CredentialSource,
{
	let Some(token) = source.access_token().await.filter(|token| !token.is_empty()) else {
		return Ok(request.clone());
	};
	let mut headers = source.auth_headers(&token)?;

	headers.values_mut().for_each(|value| value.set_sensitive(true));

	Ok(request.with_headers_overridden(&headers))
}

// std
use std::net::IpAddr;
// crates.io
use url::Host;
// self
use crate::{
	_prelude::*,
	credential::{HeaderScheme, RefreshEndpoint, TokenFields},
};

/// Errors raised while constructing or validating refresh-endpoint descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum RefreshEndpointError {
	/// Refresh URL is mandatory.
	#[error("Missing refresh endpoint URL.")]
	MissingRefreshUrl,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// JSON field names cannot be empty.
	#[error("The {field} field name cannot be empty.")]
	EmptyFieldName {
		/// Which field failed validation.
		field: &'static str,
	},
}

/// Builder for [`RefreshEndpoint`] values.
#[derive(Debug, Default)]
pub struct RefreshEndpointBuilder {
	/// Endpoint receiving refresh calls.
	pub refresh_url: Option<Url>,
	/// Additional URLs exempt from interception.
	pub skip_urls: Vec<Url>,
	/// Header scheme for the access token.
	pub header_scheme: HeaderScheme,
	/// JSON field names of the refresh exchange.
	pub fields: TokenFields,
}
impl RefreshEndpointBuilder {
	/// Creates an empty builder with default field names and the bearer scheme.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the refresh URL.
	pub fn refresh_url(mut self, url: Url) -> Self {
		self.refresh_url = Some(url);

		self
	}

	/// Adds a URL the interceptor must leave alone.
	pub fn skip_url(mut self, url: Url) -> Self {
		self.skip_urls.push(url);

		self
	}

	/// Adds multiple URLs the interceptor must leave alone.
	pub fn skip_urls<I>(mut self, urls: I) -> Self
	where
		I: IntoIterator<Item = Url>,
	{
		self.skip_urls.extend(urls);

		self
	}

	/// Overrides the header scheme.
	pub fn header_scheme(mut self, scheme: HeaderScheme) -> Self {
		self.header_scheme = scheme;

		self
	}

	/// Overrides the JSON field names.
	pub fn fields(mut self, fields: TokenFields) -> Self {
		self.fields = fields;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<RefreshEndpoint, RefreshEndpointError> {
		let refresh_url = self.refresh_url.ok_or(RefreshEndpointError::MissingRefreshUrl)?;
		let endpoint = RefreshEndpoint {
			refresh_url,
			skip_urls: self.skip_urls,
			header_scheme: self.header_scheme,
			fields: self.fields,
		};

		endpoint.validate()?;

		Ok(endpoint)
	}
}

impl RefreshEndpoint {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), RefreshEndpointError> {
		validate_endpoint("refresh", &self.refresh_url)?;

		for skip in &self.skip_urls {
			validate_endpoint("skip", skip)?;
		}

		validate_field("request refresh token", &self.fields.request_refresh)?;
		validate_field("response access token", &self.fields.response_access)?;
		validate_field("response refresh token", &self.fields.response_refresh)?;

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), RefreshEndpointError> {
	if url.scheme() == "https" || (url.scheme() == "http" && is_loopback(url)) {
		Ok(())
	} else {
		Err(RefreshEndpointError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}

fn validate_field(name: &'static str, value: &str) -> Result<(), RefreshEndpointError> {
	if value.trim().is_empty() {
		Err(RefreshEndpointError::EmptyFieldName { field: name })
	} else {
		Ok(())
	}
}

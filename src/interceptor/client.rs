// self
use crate::{
	_prelude::*,
	http::{Request, Transport},
	interceptor::{InterceptResult, Interceptor},
};

/// Transport with an [`Interceptor`] registered in front of it.
///
/// Every request sent through the client is intercepted; clones share both the interceptor's
/// refresh state and the transport.
#[derive(Debug)]
pub struct AuthorizedClient<T> {
	interceptor: Interceptor,
	transport: Arc<T>,
}
impl<T> Clone for AuthorizedClient<T> {
	fn clone(&self) -> Self {
		Self { interceptor: self.interceptor.clone(), transport: Arc::clone(&self.transport) }
	}
}
impl<T> AuthorizedClient<T>
where
	T: Transport,
{
	/// Registers `interceptor` in front of `transport`.
	pub fn new(interceptor: Interceptor, transport: T) -> Self {
		Self { interceptor, transport: Arc::new(transport) }
	}

	/// Sends `request` through the interceptor.
	///
	/// See [`Interceptor::intercept`] for the error contract.
	pub async fn send(&self, request: Request) -> InterceptResult<T::Error> {
		self.interceptor.intercept(request, self.transport.as_ref()).await
	}

	/// Interceptor applied to every request.
	pub fn interceptor(&self) -> &Interceptor {
		&self.interceptor
	}

	/// Underlying transport, bypassing the interceptor.
	pub fn transport(&self) -> &T {
		&self.transport
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::{ScriptedTransport, StubSource, get};

	#[tokio::test]
	async fn bound_client_intercepts_every_request() {
		let source = Arc::new(StubSource::new(Some("token-0")));
		let transport = ScriptedTransport::default();
		let client = Interceptor::new(source.clone()).bind(transport.clone());

		transport.reply("/data", 401, "");

		let response = client.send(get("https://api.example.com/data")).await.expect("Resend ok.");

		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(source.refresh_calls(), 1);
		assert_eq!(client.transport().sent_to("/data").len(), 2);
	}
}

//! Authenticated-request interceptor.
//!
//! [`Interceptor::intercept`] decides, per request, whether to skip it, augment and send it right
//! away, or hold it until an in-progress refresh settles. When the transport reports a failure the
//! credential source classifies as recoverable, the request starts or joins a refresh cycle and,
//! once the cycle succeeds, is re-augmented from the caller's original and resent directly through
//! the transport. If the cycle fails, the caller receives its own original failure.

/// Builder API for configuring interceptors.
pub mod builder;
/// Transport wrapper applying an interceptor to every request.
pub mod client;

pub use builder::*;
pub use client::*;

// std
use std::num::NonZeroU32;
// self
use crate::{
	_prelude::*,
	credential::{self, CredentialSource},
	error::InterceptError,
	http::{Request, Response, Transport},
	obs::{self, Phase, PhaseSpan, RequestPath},
	refresh::{RefreshCoordinator, RefreshMetrics, RefreshOutcome},
};

/// Interceptor result type for a transport whose failures are `F`.
pub type InterceptResult<F> = Result<Response, InterceptError<F>>;

/// Attaches credentials to requests and recovers from credential expiry.
///
/// Clones share the same credential source and refresh state, so hand clones to every place that
/// issues requests; separate instances built from the same source keep independent refresh
/// state.
#[derive(Clone)]
pub struct Interceptor {
	source: Arc<dyn CredentialSource>,
	coordinator: Arc<RefreshCoordinator>,
	recovery_limit: Option<NonZeroU32>,
}
impl Interceptor {
	/// Creates an interceptor with default settings.
	pub fn new(source: Arc<dyn CredentialSource>) -> Self {
		Self::builder(source).build()
	}

	/// Starts building an interceptor around `source`.
	pub fn builder(source: Arc<dyn CredentialSource>) -> InterceptorBuilder {
		InterceptorBuilder::new(source)
	}

	/// Credential source consulted for every request.
	pub fn source(&self) -> &Arc<dyn CredentialSource> {
		&self.source
	}

	/// Refresh state shared by this interceptor and its clones.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	/// Refresh counters shared by this interceptor and its clones.
	pub fn metrics(&self) -> &Arc<RefreshMetrics> {
		self.coordinator.metrics()
	}

	/// Registers the interceptor in front of `transport`.
	pub fn bind<T>(&self, transport: T) -> AuthorizedClient<T>
	where
		T: Transport,
	{
		AuthorizedClient::new(self.clone(), transport)
	}

	/// Sends `request` through `proceed`, attaching credentials and recovering from expiry.
	///
	/// # Errors
	///
	/// - [`InterceptError::Transport`] with the request's own failure when it is not recoverable,
	///   when the refresh it waited on failed, or when the resend failed.
	/// - [`InterceptError::Denied`] when the request was held behind a refresh that failed; such a
	///   request never reached the transport.
	/// - [`InterceptError::Config`] when the credential cannot be encoded as headers.
	///
	/// Refreshes run on the current Tokio runtime. Outside one, a recoverable failure counts as a
	/// failed refresh and the original failure is returned.
	pub async fn intercept<T>(&self, request: Request, proceed: &T) -> InterceptResult<T::Error>
	where
		T: ?Sized + Transport,
	{
		let span = PhaseSpan::new(Phase::Intercept, "intercept");

		span.instrument(async move {
			if self.source.skip_request(&request) {
				obs::record_request_path(RequestPath::Skipped);

				return proceed.send(request).await.map_err(InterceptError::Transport);
			}

			let outgoing = self.prepare::<T::Error>(&request).await?;

			match proceed.send(outgoing).await {
				Ok(response) => Ok(response),
				Err(failure) => self.recover(request, failure, proceed).await,
			}
		})
		.await
	}

	/// Produces the first outgoing copy, waiting behind an in-progress refresh if there is one.
	async fn prepare<F>(&self, request: &Request) -> Result<Request, InterceptError<F>> {
		let Some(cycle) = self.coordinator.pending() else {
			obs::record_request_path(RequestPath::Direct);

			return Ok(credential::augment(self.source.as_ref(), request).await?);
		};

		self.metrics().record_delayed();

		match cycle.outcome().await {
			RefreshOutcome::Succeeded => {
				obs::record_request_path(RequestPath::Delayed);

				Ok(credential::augment(self.source.as_ref(), request).await?)
			},
			RefreshOutcome::Failed => {
				obs::record_request_path(RequestPath::Denied);

				Err(InterceptError::Denied { request: Box::new(request.clone()) })
			},
		}
	}

	/// Runs refresh-and-resend rounds until the request succeeds or a round cannot recover.
	///
	/// A recoverable failure from a resend is a new failure occurrence and starts or joins its own
	/// cycle; the loop ends when the refresh fails, the failure is not recoverable, or the
	/// configured recovery limit is reached.
	async fn recover<T>(
		&self,
		original: Request,
		mut failure: T::Error,
		proceed: &T,
	) -> InterceptResult<T::Error>
	where
		T: ?Sized + Transport,
	{
		let mut rounds = 0_u32;

		loop {
			if !self.source.should_refresh(&failure, &original) {
				return Err(InterceptError::Transport(failure));
			}
			if self.recovery_limit.is_some_and(|limit| rounds >= limit.get()) {
				return Err(InterceptError::Transport(failure));
			}

			rounds += 1;

			let cycle = self.coordinator.start_or_join(&self.source);

			if !cycle.outcome().await.is_success() {
				return Err(InterceptError::Transport(failure));
			}

			let retry = credential::augment(self.source.as_ref(), &original).await?;

			obs::record_request_path(RequestPath::Resent);

			match proceed.send(retry).await {
				Ok(response) => return Ok(response),
				Err(next) => failure = next,
			}
		}
	}
}
impl Debug for Interceptor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Interceptor")
			.field("coordinator", &self.coordinator)
			.field("recovery_limit", &self.recovery_limit)
			.finish()
	}
}

// std
use std::num::NonZeroU32;
// self
use crate::{
	_prelude::*,
	credential::CredentialSource,
	interceptor::Interceptor,
	refresh::{RefreshCoordinator, RefreshMetrics},
};

/// Builder for [`Interceptor`] values.
pub struct InterceptorBuilder {
	/// Credential source consulted for every request.
	pub source: Arc<dyn CredentialSource>,
	/// Maximum refresh rounds per request; `None` retries while resends keep failing
	/// recoverably and refreshes keep succeeding.
	pub recovery_limit: Option<NonZeroU32>,
	/// Counters shared with other components, if any.
	pub metrics: Option<Arc<RefreshMetrics>>,
}
impl InterceptorBuilder {
	/// Creates a builder around `source` with no recovery limit.
	pub fn new(source: Arc<dyn CredentialSource>) -> Self {
		Self { source, recovery_limit: None, metrics: None }
	}

	/// Caps how many refresh rounds a single request may go through.
	pub fn recovery_limit(mut self, limit: NonZeroU32) -> Self {
		self.recovery_limit = Some(limit);

		self
	}

	/// Reports refresh counters into `metrics` instead of a private instance.
	pub fn metrics(mut self, metrics: Arc<RefreshMetrics>) -> Self {
		self.metrics = Some(metrics);

		self
	}

	/// Consumes the builder, returning an idle interceptor.
	pub fn build(self) -> Interceptor {
		let metrics = self.metrics.unwrap_or_default();

		Interceptor {
			source: self.source,
			coordinator: Arc::new(RefreshCoordinator::new(metrics)),
			recovery_limit: self.recovery_limit,
		}
	}
}
impl Debug for InterceptorBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InterceptorBuilder")
			.field("recovery_limit", &self.recovery_limit)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}

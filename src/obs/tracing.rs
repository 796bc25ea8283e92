// self
use crate::{_prelude::*, error::RefreshError, obs::Phase, store::StoreError};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedPhase<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedPhase<F> = F;

/// A span builder used by interceptor phases.
#[derive(Clone, Debug)]
pub struct PhaseSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl PhaseSpan {
	/// Creates a new span tagged with the provided phase + stage.
	pub fn new(phase: Phase, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = match phase {
				Phase::Intercept => tracing::info_span!("auth_interceptor.intercept", stage),
				Phase::Refresh => tracing::info_span!("auth_interceptor.refresh", stage),
			};

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (phase, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedPhase<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn refresh_started(generation: u64) {
	#[cfg(feature = "tracing")]
	tracing::debug!(generation, "credential refresh started");
	#[cfg(not(feature = "tracing"))]
	let _ = generation;
}

pub(crate) fn refresh_failed(generation: u64, error: &RefreshError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(generation, error = %error, "credential refresh failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (generation, error);
}

pub(crate) fn refresh_abandoned(generation: u64) {
	#[cfg(feature = "tracing")]
	tracing::error!(generation, "credential refresh task ended without settling");
	#[cfg(not(feature = "tracing"))]
	let _ = generation;
}

pub(crate) fn refresh_settled(generation: u64, succeeded: bool) {
	#[cfg(feature = "tracing")]
	tracing::debug!(generation, succeeded, "credential refresh settled");
	#[cfg(not(feature = "tracing"))]
	let _ = (generation, succeeded);
}

pub(crate) fn refresh_settled_twice(generation: u64, rejected_success: bool) {
	#[cfg(feature = "tracing")]
	tracing::error!(generation, rejected_success, "refresh cycle settled more than once");
	#[cfg(not(feature = "tracing"))]
	let _ = (generation, rejected_success);
}

pub(crate) fn refresh_without_runtime(generation: u64, error: &tokio::runtime::TryCurrentError) {
	#[cfg(feature = "tracing")]
	tracing::error!(generation, error = %error, "no Tokio runtime to run the credential refresh");
	#[cfg(not(feature = "tracing"))]
	let _ = (generation, error);
}

pub(crate) fn store_unavailable(error: &StoreError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(error = %error, "token store unavailable; treating credential as absent");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

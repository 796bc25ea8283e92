//! Optional observability helpers for interceptor phases.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `auth_interceptor.intercept` and
//!   `auth_interceptor.refresh` with a `stage` field, plus events when refresh cycles start and
//!   settle.
//! - Enable `metrics` to increment `auth_interceptor_refresh_total` (labeled by `outcome`) for
//!   every refresh attempt/success/failure and `auth_interceptor_request_total` (labeled by
//!   `path`) for every intercepted request.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Interceptor phases that own a span.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
	/// Handling of a single intercepted request.
	Intercept,
	/// One refresh cycle.
	Refresh,
}
impl Phase {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Phase::Intercept => "intercept",
			Phase::Refresh => "refresh",
		}
	}
}
impl Display for Phase {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each refresh cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// A refresh cycle started.
	Attempt,
	/// The refresh operation succeeded.
	Success,
	/// The refresh operation failed or was torn down.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How an intercepted request travelled through the interceptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestPath {
	/// The source exempted the request; it was sent untouched.
	Skipped,
	/// Augmented and sent without waiting.
	Direct,
	/// Held until an in-progress refresh settled, then sent.
	Delayed,
	/// Held until an in-progress refresh failed; never sent.
	Denied,
	/// Resent after a refresh triggered by its own failure.
	Resent,
}
impl RequestPath {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestPath::Skipped => "skipped",
			RequestPath::Direct => "direct",
			RequestPath::Delayed => "delayed",
			RequestPath::Denied => "denied",
			RequestPath::Resent => "resent",
		}
	}
}
impl Display for RequestPath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

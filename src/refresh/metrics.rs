// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for refresh cycles and the requests that waited on them.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	joins: AtomicU64,
	delayed: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of refresh cycles started.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles whose refresh succeeded.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles whose refresh failed or never settled.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns how many failed requests joined a cycle another request had started.
	pub fn joins(&self) -> u64 {
		self.joins.load(Ordering::Relaxed)
	}

	/// Returns how many requests were held before sending because a refresh was running.
	pub fn delayed(&self) -> u64 {
		self.delayed.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_join(&self) {
		self.joins.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_delayed(&self) {
		self.delayed.fetch_add(1, Ordering::Relaxed);
	}
}

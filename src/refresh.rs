//! Single-flight refresh coordination.
//!
//! A [`RefreshCoordinator`] is either idle or refreshing. The first recoverable failure flips it to
//! refreshing and spawns the credential source's refresh on the Tokio runtime, detached from the
//! request that triggered it. Every request that arrives or fails while the refresh runs waits on
//! the same [`Cycle`], a one-shot broadcast target that receives exactly one [`RefreshOutcome`].
//! Settling a cycle arms a brand-new one for the next round, so an outcome can never leak into a
//! later cycle.
//!
//! The check-and-set of the in-progress flag happens inside one non-suspending critical section,
//! which keeps the coordinator race-free on multi-threaded runtimes as well as single-threaded
//! ones.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use async_lock::OnceCell;
// self
use crate::{
	_prelude::*,
	credential::CredentialSource,
	obs::{self, FlowOutcome, Phase, PhaseSpan},
};

/// Result broadcast to every waiter of a refresh cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshOutcome {
	/// The refresh operation succeeded; the source now holds a fresh credential.
	Succeeded,
	/// The refresh operation failed or never settled.
	Failed,
}
impl RefreshOutcome {
	/// Returns `true` for [`RefreshOutcome::Succeeded`].
	pub const fn is_success(self) -> bool {
		matches!(self, Self::Succeeded)
	}
}

/// One refresh round and its one-shot outcome.
#[derive(Debug)]
pub struct Cycle {
	generation: u64,
	outcome: OnceCell<RefreshOutcome>,
}
impl Cycle {
	fn new(generation: u64) -> Self {
		Self { generation, outcome: OnceCell::new() }
	}

	/// Monotonic cycle number, starting at zero for the first armed cycle.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns the outcome if the cycle already settled.
	pub fn settled(&self) -> Option<RefreshOutcome> {
		self.outcome.get().copied()
	}

	/// Waits for this cycle's outcome.
	pub async fn outcome(&self) -> RefreshOutcome {
		*self.outcome.wait().await
	}

	fn publish(&self, outcome: RefreshOutcome) {
		// Settlement is the only writer, so the cell is never contended.
		if let Err(rejected) = self.outcome.set_blocking(outcome) {
			obs::refresh_settled_twice(self.generation, rejected.is_success());
		}
	}
}

#[derive(Debug)]
struct RefreshState {
	in_progress: bool,
	cycle: Arc<Cycle>,
}

/// Owns the in-progress flag and the currently armed [`Cycle`].
#[derive(Debug)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator reporting into `metrics`.
	pub fn new(metrics: Arc<RefreshMetrics>) -> Self {
		Self {
			state: Mutex::new(RefreshState { in_progress: false, cycle: Arc::new(Cycle::new(0)) }),
			metrics,
		}
	}

	/// Shared counters for this coordinator.
	pub fn metrics(&self) -> &Arc<RefreshMetrics> {
		&self.metrics
	}

	/// Returns `true` while a refresh operation is outstanding.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().in_progress
	}

	/// Returns the in-progress cycle, or `None` when idle.
	pub fn pending(&self) -> Option<Arc<Cycle>> {
		let state = self.state.lock();

		state.in_progress.then(|| Arc::clone(&state.cycle))
	}

	/// Starts a refresh cycle when idle, otherwise joins the running one.
	///
	/// Either way the caller receives the cycle it must wait on. Starting spawns
	/// [`CredentialSource::refresh`] onto the current Tokio runtime; the spawned task settles the
	/// cycle even if every waiter has gone away. If the task is torn down before the refresh
	/// completes (panic, runtime shutdown) the cycle settles as [`RefreshOutcome::Failed`].
	/// Called outside a Tokio runtime, the refresh never runs and the cycle settles as
	/// [`RefreshOutcome::Failed`] immediately.
	pub fn start_or_join<S>(self: &Arc<Self>, source: &Arc<S>) -> Arc<Cycle>
	where
		S: 'static + ?Sized + CredentialSource,
	{
		let (cycle, started) = {
			let mut state = self.state.lock();
			let started = !state.in_progress;

			state.in_progress = true;

			(Arc::clone(&state.cycle), started)
		};

		if !started {
			self.metrics.record_join();

			return cycle;
		}

		self.metrics.record_attempt();
		obs::record_refresh_outcome(FlowOutcome::Attempt);
		obs::refresh_started(cycle.generation);

		let settlement = Settlement::new(Arc::clone(self), Arc::clone(&cycle));
		let source = Arc::clone(source);
		let span = PhaseSpan::new(Phase::Refresh, "start_or_join");

		let task = span.instrument(async move {
			let outcome = match source.refresh().await {
				Ok(()) => RefreshOutcome::Succeeded,
				Err(e) => {
					obs::refresh_failed(settlement.generation(), &e);

					RefreshOutcome::Failed
				},
			};

			settlement.settle(outcome);
		});

		match tokio::runtime::Handle::try_current() {
			Ok(runtime) => {
				runtime.spawn(task);
			},
			Err(e) => {
				obs::refresh_without_runtime(cycle.generation, &e);
				// Dropping the unpolled task drops its settlement, which fails the cycle.
				drop(task);
			},
		}

		cycle
	}

	fn finish(&self, cycle: &Arc<Cycle>, outcome: RefreshOutcome) {
		{
			let mut state = self.state.lock();

			if Arc::ptr_eq(&state.cycle, cycle) {
				state.in_progress = false;
				state.cycle = Arc::new(Cycle::new(cycle.generation + 1));
			}
		}

		if outcome.is_success() {
			self.metrics.record_success();
			obs::record_refresh_outcome(FlowOutcome::Success);
		} else {
			self.metrics.record_failure();
			obs::record_refresh_outcome(FlowOutcome::Failure);
		}

		obs::refresh_settled(cycle.generation, outcome.is_success());
		cycle.publish(outcome);
	}
}
impl Default for RefreshCoordinator {
	fn default() -> Self {
		Self::new(Default::default())
	}
}

/// Settles a cycle exactly once, falling back to a failed outcome on drop.
struct Settlement(Option<(Arc<RefreshCoordinator>, Arc<Cycle>)>);
impl Settlement {
	fn new(coordinator: Arc<RefreshCoordinator>, cycle: Arc<Cycle>) -> Self {
		Self(Some((coordinator, cycle)))
	}

	fn generation(&self) -> u64 {
		self.0.as_ref().map_or(0, |(_, cycle)| cycle.generation)
	}

	fn settle(mut self, outcome: RefreshOutcome) {
		if let Some((coordinator, cycle)) = self.0.take() {
			coordinator.finish(&cycle, outcome);
		}
	}
}
impl Drop for Settlement {
	fn drop(&mut self) {
		if let Some((coordinator, cycle)) = self.0.take() {
			obs::refresh_abandoned(cycle.generation);
			coordinator.finish(&cycle, RefreshOutcome::Failed);
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::time::Duration;
	// self
	use super::*;
	use crate::{
		_preludet::StubSource,
		credential::{AccessToken, CredentialFuture},
		error::RefreshError,
	};

	struct PanickingSource;
	impl CredentialSource for PanickingSource {
		fn access_token(&self) -> CredentialFuture<'_, Option<AccessToken>> {
			Box::pin(async { None })
		}

		fn refresh(&self) -> CredentialFuture<'_, Result<(), RefreshError>> {
			Box::pin(async { explode() })
		}
	}

	fn explode() -> Result<(), RefreshError> {
		panic!("refresh exploded")
	}

	#[tokio::test]
	async fn concurrent_starts_share_one_cycle() {
		let coordinator = Arc::new(RefreshCoordinator::default());
		let source = Arc::new(StubSource::gated(Some("token-0")));
		let first = coordinator.start_or_join(&source);
		let second = coordinator.start_or_join(&source);

		assert!(Arc::ptr_eq(&first, &second));
		assert!(coordinator.is_refreshing());
		assert_eq!(coordinator.metrics().attempts(), 1);
		assert_eq!(coordinator.metrics().joins(), 1);

		source.release();

		assert_eq!(first.outcome().await, RefreshOutcome::Succeeded);
		assert_eq!(second.outcome().await, RefreshOutcome::Succeeded);
		assert_eq!(source.refresh_calls(), 1);
		assert!(!coordinator.is_refreshing());
		assert!(coordinator.pending().is_none());
	}

	#[tokio::test]
	async fn settled_cycle_is_never_reused() {
		let coordinator = Arc::new(RefreshCoordinator::default());
		let source = Arc::new(StubSource::new(Some("token-0")));

		source.fail_refreshes();

		let first = coordinator.start_or_join(&source);

		assert_eq!(first.outcome().await, RefreshOutcome::Failed);

		let second = coordinator.start_or_join(&source);

		assert!(!Arc::ptr_eq(&first, &second));
		assert_eq!(second.generation(), first.generation() + 1);
		assert_eq!(second.outcome().await, RefreshOutcome::Failed);
		assert_eq!(source.refresh_calls(), 2);
		assert_eq!(coordinator.metrics().failures(), 2);
	}

	#[tokio::test]
	async fn pending_reports_only_the_running_cycle() {
		let coordinator = Arc::new(RefreshCoordinator::default());
		let source = Arc::new(StubSource::gated(Some("token-0")));

		assert!(coordinator.pending().is_none());

		let cycle = coordinator.start_or_join(&source);
		let pending = coordinator.pending().expect("A running refresh should be pending.");

		assert!(Arc::ptr_eq(&cycle, &pending));

		source.release();
		cycle.outcome().await;

		assert!(coordinator.pending().is_none());
	}

	#[test]
	fn start_outside_runtime_settles_as_failed() {
		let coordinator = Arc::new(RefreshCoordinator::default());
		let source = Arc::new(StubSource::new(Some("token-0")));
		let cycle = coordinator.start_or_join(&source);

		assert_eq!(cycle.settled(), Some(RefreshOutcome::Failed));
		assert!(!coordinator.is_refreshing());
		assert_eq!(source.refresh_calls(), 0);
		assert_eq!(coordinator.metrics().failures(), 1);

		let next = coordinator.start_or_join(&source);

		assert_eq!(next.generation(), cycle.generation() + 1);
	}

	#[test]
	fn second_publish_keeps_first_outcome() {
		let cycle = Cycle::new(3);

		cycle.publish(RefreshOutcome::Succeeded);
		cycle.publish(RefreshOutcome::Failed);

		assert_eq!(cycle.settled(), Some(RefreshOutcome::Succeeded));
	}

	#[tokio::test]
	async fn panicking_refresh_settles_as_failed() {
		let coordinator = Arc::new(RefreshCoordinator::default());
		let source = Arc::new(PanickingSource);
		let cycle = coordinator.start_or_join(&source);
		let outcome = tokio::time::timeout(Duration::from_secs(5), cycle.outcome())
			.await
			.expect("Waiters must be released when the refresh task panics.");

		assert_eq!(outcome, RefreshOutcome::Failed);
		assert!(!coordinator.is_refreshing());
	}
}

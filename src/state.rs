//! Coordinator state and the transition helpers that mutate it.
//!
//! Every method here is a single state transition meant to run entirely
//! under the coordinator's mutex, never across an `.await` into user code.

// self
use crate::{_prelude::*, waiter::Waiter};

/// All mutable state owned by a [`crate::Coordinator`].
#[derive(Debug)]
pub struct CoordinatorState<D, E> {
	dependency: Option<D>,
	version: u64,
	is_refreshing: bool,
	refresh_attempt: u32,
	waiters: VecDeque<Waiter<E>>,
}
impl<D, E> CoordinatorState<D, E>
where
	D: Clone,
{
	/// Build a fresh state, optionally pre-seeded with a dependency.
	pub fn new(initial: Option<D>) -> Self {
		Self { dependency: initial, version: 0, is_refreshing: false, refresh_attempt: 0, waiters: VecDeque::new() }
	}

	/// Current refresh-in-flight flag.
	pub fn is_refreshing(&self) -> bool {
		self.is_refreshing
	}

	/// Current monotonic version.
	pub fn version(&self) -> u64 {
		self.version
	}

	/// Snapshot the dependency together with the version it was read at.
	pub fn snapshot(&self) -> Option<(D, u64)> {
		self.dependency.clone().map(|dependency| (dependency, self.version))
	}

	/// Replace the stored dependency without running a refresh or touching
	/// `version`.
	pub fn set_dependency(&mut self, dependency: Option<D>) {
		self.dependency = dependency;
	}

	/// Append a waiter to the back of the queue.
	pub fn push_waiter(&mut self, waiter: Waiter<E>) {
		self.waiters.push_back(waiter);
	}

	/// Begin a refresh triggering, bumping `refresh_attempt` and returning
	/// the attempt number to embed in the [`crate::RefreshContext`].
	///
	/// Callers must have already verified `!is_refreshing`.
	pub fn begin_refresh(&mut self) -> u32 {
		debug_assert!(!self.is_refreshing, "begin_refresh called while a refresh is already in flight");

		self.is_refreshing = true;
		self.refresh_attempt += 1;
		self.refresh_attempt
	}

	/// Commit a successful refresh: store the new dependency, bump
	/// `version`, clear refresh bookkeeping, and hand back the waiters to
	/// drain (in arrival order).
	pub fn complete_refresh_success(&mut self, dependency: D) -> VecDeque<Waiter<E>> {
		self.dependency = Some(dependency);
		self.version += 1;
		self.refresh_attempt = 0;
		self.is_refreshing = false;

		mem::take(&mut self.waiters)
	}

	/// Reset `refresh_attempt` to 0, as happens on every terminal outcome of
	/// a per-call task attempt (success, failure, or cancellation).
	pub fn reset_refresh_attempt(&mut self) {
		self.refresh_attempt = 0;
	}

	/// Commit a terminal (failure or cancellation) refresh outcome: clear
	/// refresh bookkeeping without touching `dependency`/`version`, and hand
	/// back the waiters to drain.
	pub fn complete_refresh_terminal(&mut self) -> VecDeque<Waiter<E>> {
		self.refresh_attempt = 0;
		self.is_refreshing = false;

		mem::take(&mut self.waiters)
	}
}

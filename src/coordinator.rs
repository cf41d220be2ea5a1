//! The coordinator itself: the per-call and global refresh state machines.

// self
use crate::{
	_prelude::*,
	outcome::{FinalOutcome, RefreshContext, RefreshOutcome, RefreshReason, TaskOutcome},
	state::CoordinatorState,
	waiter::{Waiter, WaiterResume},
};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Boxed refresh callable stored inside the coordinator.
type RefreshFn<D, E> = Box<dyn Fn(RefreshContext<D>) -> BoxFuture<'static, RefreshOutcome<D, E>> + Send + Sync>;

/// A dependency-gated task coordinator.
///
/// Runs arbitrary asynchronous tasks that need a shared, refreshable
/// dependency `D`, guaranteeing at most one refresh in flight at a time and
/// transparent retry for tasks that observe a stale dependency.
///
/// Cheap to clone: internally an `Arc` over the shared state and refresh
/// callable, mirroring how manager-style coordinators elsewhere in this
/// crate family are handed out to concurrent callers.
pub struct Coordinator<D, E> {
	inner: Arc<Inner<D, E>>,
}
impl<D, E> Clone for Coordinator<D, E> {
	fn clone(&self) -> Self {
		Self { inner: self.inner.clone() }
	}
}
impl<D, E> fmt::Debug for Coordinator<D, E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Coordinator").finish_non_exhaustive()
	}
}
impl<D, E> Coordinator<D, E>
where
	D: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	/// Build a coordinator with an optional initial dependency and the
	/// refresh callable responsible for producing new ones.
	///
	/// No background work is started; refresh only ever runs inline with a
	/// caller's `run` invocation.
	pub fn new<F, Fut>(initial: Option<D>, refresh: F) -> Self
	where
		F: Fn(RefreshContext<D>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = RefreshOutcome<D, E>> + Send + 'static,
	{
		let refresh: RefreshFn<D, E> = Box::new(move |ctx| Box::pin(refresh(ctx)));

		Self { inner: Arc::new(Inner { state: Mutex::new(CoordinatorState::new(initial)), refresh }) }
	}

	/// Replace the stored dependency without running a refresh.
	///
	/// Does not advance `version`; callers that derive intent from version
	/// skew should treat an externally injected dependency as equivalent to
	/// a refresh.
	pub async fn set_dependency(&self, dependency: Option<D>) {
		let mut state = self.inner.state.lock().await;

		state.set_dependency(dependency);
	}

	/// Submit one task, returning the final verdict after up to one refresh
	/// retry.
	///
	/// `cancel` is checked at every suspension point: before entering the
	/// critical section, after being resumed from a parked wait, and
	/// immediately after a driven refresh completes.
	#[tracing::instrument(skip_all)]
	pub async fn run<S, F, Fut>(&self, task: F, cancel: &CancellationToken) -> FinalOutcome<S, E>
	where
		F: Fn(D) -> Fut,
		Fut: Future<Output = TaskOutcome<S, E>>,
	{
		loop {
			if cancel.is_cancelled() {
				return FinalOutcome::Cancelled { origin: true };
			}

			match self.dispatch().await {
				Dispatch::Parked(rx) => {
					let resume = rx.await.unwrap_or(WaiterResume::Cancelled);

					if cancel.is_cancelled() {
						return FinalOutcome::Cancelled { origin: true };
					}

					match resume {
						WaiterResume::Retry => continue,
						WaiterResume::Failure(err) => return FinalOutcome::Failure { err, origin: false },
						WaiterResume::Cancelled => return FinalOutcome::Cancelled { origin: false },
					}
				},
				Dispatch::TriggerRefresh(ctx) => match self.resume_after_refresh(ctx, cancel).await {
					ControlFlow::Continue(()) => continue,
					ControlFlow::Break(outcome) => return outcome,
				},
				Dispatch::Attempt(dependency, version) => {
					let outcome = task(dependency.clone()).await;

					match outcome {
						TaskOutcome::Success(s) => {
							self.reset_refresh_attempt().await;

							return if cancel.is_cancelled() {
								FinalOutcome::Cancelled { origin: true }
							} else {
								FinalOutcome::Success(s)
							};
						},
						TaskOutcome::Failure(err) => {
							self.reset_refresh_attempt().await;

							return FinalOutcome::Failure { err, origin: true };
						},
						TaskOutcome::Cancelled => {
							self.reset_refresh_attempt().await;

							return FinalOutcome::Cancelled { origin: true };
						},
						TaskOutcome::RefreshDependency =>
							match self.claim_refresh_for_stale(version, dependency).await {
								None => continue,
								Some(ctx) => match self.resume_after_refresh(ctx, cancel).await {
									ControlFlow::Continue(()) => continue,
									ControlFlow::Break(outcome) => return outcome,
								},
							},
					}
				},
			}
		}
	}

	/// Decide what the current call should do next, under the lock for the
	/// duration of a single, atomic read-modify-write.
	async fn dispatch(&self) -> Dispatch<D, E> {
		let mut state = self.inner.state.lock().await;

		if state.is_refreshing() {
			let (waiter, rx) = Waiter::new_pair();

			state.push_waiter(waiter);

			tracing::debug!("parking behind an in-flight refresh");

			Dispatch::Parked(rx)
		} else if let Some((dependency, version)) = state.snapshot() {
			Dispatch::Attempt(dependency, version)
		} else {
			let attempt = state.begin_refresh();

			Dispatch::TriggerRefresh(RefreshContext { attempt, reason: RefreshReason::MissingDependency })
		}
	}

	/// A task declared its dependency stale. Decide, under the lock, whether
	/// this call should start a refresh itself (returns `Some(ctx)`) or
	/// simply loop back to dispatch because a refresh is already running or
	/// has already advanced the version past this call's snapshot (returns
	/// `None`).
	async fn claim_refresh_for_stale(&self, snapshot_version: u64, dependency: D) -> Option<RefreshContext<D>> {
		let mut state = self.inner.state.lock().await;

		if state.is_refreshing() || snapshot_version < state.version() {
			return None;
		}

		let attempt = state.begin_refresh();

		Some(RefreshContext { attempt, reason: RefreshReason::TaskRequiredUpdate(dependency) })
	}

	async fn reset_refresh_attempt(&self) {
		let mut state = self.inner.state.lock().await;

		state.reset_refresh_attempt();
	}

	/// Drive a refresh to completion and decide what the originator should
	/// do next: continue looping (refresh succeeded, retry the task) or
	/// return a terminal outcome.
	///
	/// The originator's own cancellation is honored only here, at the point
	/// it attempts to resume after the refresh — not while the refresh
	/// itself was running.
	#[tracing::instrument(skip_all, fields(attempt = ctx.attempt))]
	async fn resume_after_refresh<S>(
		&self,
		ctx: RefreshContext<D>,
		cancel: &CancellationToken,
	) -> ControlFlow<FinalOutcome<S, E>, ()> {
		let outcome = (self.inner.refresh)(ctx).await;
		let mut state = self.inner.state.lock().await;

		let (waiters, resumed) = match outcome {
			RefreshOutcome::Success(dependency) => {
				let waiters = state.complete_refresh_success(dependency);

				(waiters, WaiterResume::Retry)
			},
			RefreshOutcome::Failure(err) => {
				tracing::warn!("refresh failed");

				let waiters = state.complete_refresh_terminal();

				(waiters, WaiterResume::Failure(err))
			},
			RefreshOutcome::Cancelled => {
				let waiters = state.complete_refresh_terminal();

				(waiters, WaiterResume::Cancelled)
			},
		};

		drop(state);

		let waiter_count = waiters.len();

		for waiter in waiters {
			waiter.resume(clone_resume(&resumed));
		}

		tracing::debug!(waiter_count, "fanned out refresh outcome to waiters");

		if cancel.is_cancelled() {
			return ControlFlow::Break(FinalOutcome::Cancelled { origin: true });
		}

		match resumed {
			WaiterResume::Retry => ControlFlow::Continue(()),
			WaiterResume::Failure(err) => ControlFlow::Break(FinalOutcome::Failure { err, origin: true }),
			WaiterResume::Cancelled => ControlFlow::Break(FinalOutcome::Cancelled { origin: true }),
		}
	}
}

fn clone_resume<E: Clone>(resume: &WaiterResume<E>) -> WaiterResume<E> {
	match resume {
		WaiterResume::Retry => WaiterResume::Retry,
		WaiterResume::Failure(err) => WaiterResume::Failure(err.clone()),
		WaiterResume::Cancelled => WaiterResume::Cancelled,
	}
}

struct Inner<D, E> {
	state: Mutex<CoordinatorState<D, E>>,
	refresh: RefreshFn<D, E>,
}

enum Dispatch<D, E> {
	Parked(oneshot::Receiver<WaiterResume<E>>),
	TriggerRefresh(RefreshContext<D>),
	Attempt(D, u64),
}

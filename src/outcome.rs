//! Outcome and context types exchanged between the coordinator and its
//! user-supplied task and refresh callables.

/// Result of a single user task invocation.
///
/// `Cancelled` carries no origin flag: the task closure has no way to know
/// in advance whether its result will be attributed to the originator or
/// fanned out to a waiter. The coordinator synthesizes that distinction
/// when it translates this into a [`FinalOutcome`].
#[derive(Clone, Debug)]
pub enum TaskOutcome<S, E> {
	/// The task completed successfully.
	Success(S),
	/// The task failed for reasons unrelated to dependency staleness.
	Failure(E),
	/// The task observed cancellation while running.
	Cancelled,
	/// The task determined that the dependency it was given is stale and
	/// should be refreshed before being retried.
	RefreshDependency,
}

/// Result of a single refresh callable invocation.
#[derive(Clone, Debug)]
pub enum RefreshOutcome<D, E> {
	/// The refresh produced a new dependency value.
	Success(D),
	/// The refresh failed.
	Failure(E),
	/// The refresh observed cancellation while running.
	Cancelled,
}

/// Final, externally visible verdict for a `run` invocation.
///
/// Unlike [`TaskOutcome`] and [`RefreshOutcome`], every non-success variant
/// here carries `origin`: `true` means the result arose on the caller's own
/// code path, `false` means the caller inherited the result from a shared
/// refresh it was queued behind.
#[derive(Clone, Debug)]
pub enum FinalOutcome<S, E> {
	/// The task completed successfully.
	Success(S),
	/// The task or an inherited refresh failed.
	Failure {
		/// The underlying error.
		err: E,
		/// Whether this result was produced on the caller's own path.
		origin: bool,
	},
	/// The call was cancelled, either directly or via an inherited refresh.
	Cancelled {
		/// Whether this result was produced on the caller's own path.
		origin: bool,
	},
}

/// Why a refresh is being triggered.
#[derive(Clone, Debug)]
pub enum RefreshReason<D> {
	/// No dependency has ever been established.
	MissingDependency,
	/// A task observed the current dependency and declared it stale.
	TaskRequiredUpdate(D),
}

/// Context handed to the user-supplied refresh callable.
#[derive(Clone, Debug)]
pub struct RefreshContext<D> {
	/// Number of refresh attempts made within the current triggering,
	/// starting at 1.
	pub attempt: u32,
	/// Why this refresh was triggered.
	pub reason: RefreshReason<D>,
}

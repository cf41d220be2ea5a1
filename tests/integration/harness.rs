//! Shared fixtures for building gated refresh and task closures.
//!
//! These are new, purpose-built test collaborators for this suite — they do
//! not port any particular external harness — built the way the rest of
//! this crate family builds its own test fixtures: small, focused, and
//! reused across several test files.

// std
use std::{
	future::Future,
	pin::Pin,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
	time::Duration,
};
// crates.io
use depcoord::{RefreshContext, RefreshOutcome, TaskOutcome};
use uuid::Uuid;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Tracks how many refresh invocations are concurrently in flight.
///
/// Used to assert the single-flight invariant: `max_observed()` must never
/// exceed 1 across a test run.
#[derive(Clone, Default)]
pub struct ConcurrencyGauge {
	current: Arc<AtomicUsize>,
	max: Arc<AtomicUsize>,
}
impl ConcurrencyGauge {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn enter(&self) -> ConcurrencyGuard {
		let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;

		self.max.fetch_max(current, Ordering::SeqCst);

		ConcurrencyGuard { current: self.current.clone() }
	}

	pub fn max_observed(&self) -> usize {
		self.max.load(Ordering::SeqCst)
	}
}

/// RAII guard released when a refresh invocation completes.
pub struct ConcurrencyGuard {
	current: Arc<AtomicUsize>,
}
impl Drop for ConcurrencyGuard {
	fn drop(&mut self) {
		self.current.fetch_sub(1, Ordering::SeqCst);
	}
}

/// A refresh closure that always succeeds with a fresh UUID after an
/// optional delay, recording concurrent entries on `gauge` and the total
/// invocation count on `calls`.
pub fn success_refresh(
	gauge: ConcurrencyGauge,
	calls: Arc<AtomicUsize>,
	delay: Duration,
) -> impl Fn(RefreshContext<Uuid>) -> BoxFuture<RefreshOutcome<Uuid, String>> + Send + Sync + 'static {
	move |_ctx| {
		let gauge = gauge.clone();
		let calls = calls.clone();

		Box::pin(async move {
			let _guard = gauge.enter();

			calls.fetch_add(1, Ordering::SeqCst);

			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}

			RefreshOutcome::Success(Uuid::new_v4())
		})
	}
}

/// A refresh closure that always fails with `message`, recording concurrent
/// entries and invocation counts the same way [`success_refresh`] does.
pub fn failing_refresh(
	gauge: ConcurrencyGauge,
	calls: Arc<AtomicUsize>,
	message: &'static str,
) -> impl Fn(RefreshContext<Uuid>) -> BoxFuture<RefreshOutcome<Uuid, String>> + Send + Sync + 'static {
	move |_ctx| {
		let gauge = gauge.clone();
		let calls = calls.clone();

		Box::pin(async move {
			let _guard = gauge.enter();

			calls.fetch_add(1, Ordering::SeqCst);

			RefreshOutcome::Failure(message.to_string())
		})
	}
}

/// A refresh closure that always reports cancellation.
pub fn cancelled_refresh(
	gauge: ConcurrencyGauge,
	calls: Arc<AtomicUsize>,
) -> impl Fn(RefreshContext<Uuid>) -> BoxFuture<RefreshOutcome<Uuid, String>> + Send + Sync + 'static {
	move |_ctx| {
		let gauge = gauge.clone();
		let calls = calls.clone();

		Box::pin(async move {
			let _guard = gauge.enter();

			calls.fetch_add(1, Ordering::SeqCst);

			RefreshOutcome::Cancelled
		})
	}
}

/// A task closure that always succeeds with `value`, ignoring the
/// dependency it was handed.
pub fn success_task(value: impl Into<String>) -> impl Fn(Uuid) -> BoxFuture<TaskOutcome<String, String>> + Send + Sync + 'static {
	let value = value.into();

	move |_dependency| {
		let value = value.clone();

		Box::pin(async move { TaskOutcome::Success(value) })
	}
}

/// A task closure that unconditionally signals a stale dependency.
pub fn stale_task() -> impl Fn(Uuid) -> BoxFuture<TaskOutcome<String, String>> + Send + Sync + 'static {
	|_dependency| Box::pin(async move { TaskOutcome::RefreshDependency })
}

/// A task closure that reports `RefreshDependency` until the dependency it
/// is handed equals `expected`, then succeeds with `value`.
pub fn retry_until_task(
	expected: Uuid,
	value: impl Into<String>,
) -> impl Fn(Uuid) -> BoxFuture<TaskOutcome<String, String>> + Send + Sync + 'static {
	let value = value.into();

	move |dependency| {
		let value = value.clone();

		Box::pin(async move {
			if dependency == expected {
				TaskOutcome::Success(value)
			} else {
				TaskOutcome::RefreshDependency
			}
		})
	}
}

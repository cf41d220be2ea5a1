//! Dependency-gated async task coordinator with single-flight refresh,
//! waiter queueing, and cooperative cancellation — built for any workload
//! that needs a shared, refreshable value (the canonical example is an
//! OAuth access token) guarded behind concurrent callers.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod coordinator;
pub mod outcome;
pub mod state;
pub mod waiter;

mod _prelude {
	pub use std::{
		collections::VecDeque,
		fmt,
		future::Future,
		mem,
		ops::ControlFlow,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use tokio::sync::{Mutex, oneshot};
	pub use tokio_util::sync::CancellationToken;
}

pub use crate::{
	coordinator::Coordinator,
	outcome::{FinalOutcome, RefreshContext, RefreshOutcome, RefreshReason, TaskOutcome},
	waiter::WaiterResume,
};

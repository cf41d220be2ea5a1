//! One-shot resumption handles for calls parked during a refresh.

// self
use crate::_prelude::*;

/// Value a parked waiter is resumed with once the in-flight refresh
/// terminates.
#[derive(Debug)]
pub enum WaiterResume<E> {
	/// The refresh succeeded; the waiter should retry its task from the top.
	Retry,
	/// The refresh failed; the waiter inherits the same error.
	Failure(E),
	/// The refresh was cancelled.
	Cancelled,
}

/// A single parked `run` invocation awaiting the outcome of an in-flight
/// refresh.
///
/// Holds a one-shot sender so the resumption handle is resolvable exactly
/// once: sending consumes it by value.
#[derive(Debug)]
pub struct Waiter<E> {
	resume: oneshot::Sender<WaiterResume<E>>,
}
impl<E> Waiter<E> {
	/// Pair a new waiter with the receiver the parked call awaits on.
	pub fn new_pair() -> (Self, oneshot::Receiver<WaiterResume<E>>) {
		let (tx, rx) = oneshot::channel();

		(Self { resume: tx }, rx)
	}

	/// Resume this waiter. A failure to send means the parked call was
	/// already dropped (e.g. its future was abandoned); this is silently
	/// ignored, matching the fire-and-forget fan-out the global refresh
	/// machine performs.
	pub fn resume(self, value: WaiterResume<E>) {
		let _ = self.resume.send(value);
	}
}

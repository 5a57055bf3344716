use crate::element_table::ElementKey;
use gloo_timers::callback::Timeout;
use hashbrown::HashMap;
use std::{cell::RefCell, rc::Rc};
use tracing::trace;

/// Coalesces bursts of calls per (element, scope) pair into one.
///
/// Cloning yields a handle to the same pending set.
/// Dropping the last handle (or calling [`Debouncer::cancel_all`]) cancels every pending call.
#[derive(Clone, Default)]
pub struct Debouncer {
	pending: Rc<RefCell<HashMap<(ElementKey, &'static str), Timeout>>>,
}

impl core::fmt::Debug for Debouncer {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Debouncer").field("pending", &self.pending.try_borrow().map(|pending| pending.len()).ok()).finish()
	}
}

impl Debouncer {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Cancels whatever is pending for `owner`/`scope`, then runs `callback` after `delay_ms`.
	///
	/// A zero delay invokes `callback` synchronously before returning.
	pub fn schedule(&self, owner: ElementKey, scope: &'static str, delay_ms: u32, callback: impl 'static + FnOnce()) {
		let previous = self.pending.borrow_mut().remove(&(owner, scope));
		if let Some(previous) = previous {
			trace!(?owner, scope, "Cancelled pending debounced call.");
			drop(previous);
		}

		if delay_ms == 0 {
			return callback();
		}

		let pending = Rc::downgrade(&self.pending);
		let timeout = Timeout::new(delay_ms, move || {
			// Release the bookkeeping before running `callback`, which may schedule again.
			if let Some(pending) = pending.upgrade() {
				let fired = pending.borrow_mut().remove(&(owner, scope));
				drop(fired);
			}
			callback()
		});
		self.pending.borrow_mut().insert((owner, scope), timeout);
	}

	#[must_use]
	pub fn is_pending(&self, owner: ElementKey, scope: &'static str) -> bool {
		self.pending.borrow().contains_key(&(owner, scope))
	}

	pub fn cancel_all(&self) {
		let drained: Vec<_> = self.pending.borrow_mut().drain().collect();
		if !drained.is_empty() {
			trace!("Cancelled {} pending debounced call(s).", drained.len());
		}
	}
}

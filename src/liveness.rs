//! Consumer liveness tracking.
//!
//! A consumer creates a [`LivenessHandle`]/[`LivenessGuard`] pair when it is
//! mounted and tears the handle down (or drops it) when it goes away. The core
//! only ever reads the guard.

use std::cell::Cell;
use std::rc::Rc;

/// Constructor namespace for a handle/guard pair.
pub struct Liveness;

impl Liveness {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (LivenessHandle, LivenessGuard) {
        let live = Rc::new(Cell::new(true));
        (
            LivenessHandle { live: live.clone() },
            LivenessGuard { live },
        )
    }
}

/// Owned by the consumer. Invalidates every guard on teardown or drop.
#[derive(Debug)]
pub struct LivenessHandle {
    live: Rc<Cell<bool>>,
}

impl LivenessHandle {
    /// Mark the consumer as gone. Calling it again is a no-op.
    pub fn teardown(&self) {
        self.live.set(false);
    }

    pub fn guard(&self) -> LivenessGuard {
        LivenessGuard {
            live: self.live.clone(),
        }
    }
}

impl Drop for LivenessHandle {
    fn drop(&mut self) {
        self.live.set(false);
    }
}

/// Read-only view of a consumer's liveness.
#[derive(Debug, Clone)]
pub struct LivenessGuard {
    live: Rc<Cell<bool>>,
}

impl LivenessGuard {
    pub fn is_live(&self) -> bool {
        self.live.get()
    }

    /// A guard that is live forever, for consumers without a teardown phase.
    pub fn always() -> Self {
        Self {
            live: Rc::new(Cell::new(true)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teardown_is_visible_through_every_guard() {
        let (handle, guard) = Liveness::new();
        let second = handle.guard();
        assert!(guard.is_live() && second.is_live());

        handle.teardown();
        assert!(!guard.is_live());
        assert!(!second.is_live());

        handle.teardown();
        assert!(!guard.is_live());
    }

    #[test]
    fn dropping_the_handle_tears_down() {
        let (handle, guard) = Liveness::new();
        drop(handle);
        assert!(!guard.is_live());
    }
}

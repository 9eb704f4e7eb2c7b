//! Shared, replace-only holder for the current [`MutationState`].
//!
//! Writes swap the whole snapshot and bump a version. Subscribers are held
//! weakly and run after the internal borrow is released, so a subscriber may
//! read the cell or start another invocation.

use crate::model::MutationState;
use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Listener<T> = dyn Fn(&MutationState<T>);

struct StateInner<T> {
    current: MutationState<T>,
    version: u64,
    listeners: Vec<Weak<Listener<T>>>,
}

pub(crate) struct StateCell<T> {
    inner: Rc<RefCell<StateInner<T>>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> StateCell<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(StateInner {
                current: MutationState::idle(),
                version: 0,
                listeners: Vec::new(),
            })),
        }
    }

    pub(crate) fn snapshot(&self) -> MutationState<T> {
        self.inner.borrow().current.clone()
    }

    pub(crate) fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    pub(crate) fn replace(&self, next: MutationState<T>) {
        let (snapshot, listeners) = {
            let mut inner = self.inner.borrow_mut();
            inner.current = next;
            inner.version += 1;
            inner.listeners.retain(|l| l.strong_count() > 0);
            let listeners: Vec<Rc<Listener<T>>> =
                inner.listeners.iter().filter_map(Weak::upgrade).collect();
            (inner.current.clone(), listeners)
        };
        for listener in listeners {
            listener(&snapshot);
        }
    }

    pub(crate) fn subscribe(&self, f: impl Fn(&MutationState<T>) + 'static) -> Subscription {
        let listener: Rc<Listener<T>> = Rc::new(f);
        self.inner
            .borrow_mut()
            .listeners
            .push(Rc::downgrade(&listener));
        Subscription {
            _listener: Box::new(listener),
        }
    }
}

/// Keeps a state listener registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _listener: Box<dyn Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Subscription")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MutationStatus;
    use std::cell::Cell;

    #[test]
    fn replace_bumps_version_and_notifies() {
        let cell = StateCell::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        let _sub = cell.subscribe(move |s| seen2.borrow_mut().push(s.status()));

        cell.replace(MutationState::in_flight());
        cell.replace(MutationState::completed(3));

        assert_eq!(cell.version(), 2);
        assert_eq!(
            *seen.borrow(),
            vec![MutationStatus::Loading, MutationStatus::Completed]
        );
        assert_eq!(cell.snapshot().data, Some(3));
    }

    #[test]
    fn dropped_subscription_stops_notifications() {
        let cell = StateCell::<u32>::new();
        let hits = Rc::new(Cell::new(0));
        let hits2 = hits.clone();
        let sub = cell.subscribe(move |_| hits2.set(hits2.get() + 1));
        cell.replace(MutationState::in_flight());
        drop(sub);
        cell.replace(MutationState::completed(1));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn listener_may_read_and_write_the_cell() {
        let cell = StateCell::<u32>::new();
        let inner = cell.clone();
        let _sub = cell.subscribe(move |s| {
            if s.loading {
                assert!(inner.snapshot().loading);
                inner.replace(MutationState::completed(9));
            }
        });
        cell.replace(MutationState::in_flight());
        assert_eq!(cell.snapshot().data, Some(9));
        assert_eq!(cell.version(), 2);
    }
}

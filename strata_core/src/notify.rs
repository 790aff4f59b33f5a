// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deduplicated multicast callbacks.
//!
//! Every mutable entity (datasets, scales, plots) owns a [`Notifier`] and announces changes
//! through it. Callbacks are compared by allocation identity, so registering the same
//! [`Callback`] twice is a no-op while two separately created closures are always distinct.

extern crate alloc;

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use smallvec::SmallVec;

/// A shared callback handle.
///
/// Keep a clone of the handle around if you intend to [`Notifier::unregister`] it later.
pub type Callback<T> = Rc<dyn Fn(&T)>;

/// Wraps a closure into a [`Callback`].
pub fn callback<T>(f: impl Fn(&T) + 'static) -> Callback<T> {
    Rc::new(f)
}

/// An ordered set of callbacks that can all be invoked at once.
pub struct Notifier<T: ?Sized> {
    handles: RefCell<SmallVec<[Rc<dyn Fn(&T)>; 4]>>,
}

impl<T: ?Sized> Default for Notifier<T> {
    fn default() -> Self {
        Self {
            handles: RefCell::new(SmallVec::new()),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Notifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("handles", &self.handles.borrow().len())
            .finish()
    }
}

fn same_handle<T: ?Sized>(a: &Rc<dyn Fn(&T)>, b: &Rc<dyn Fn(&T)>) -> bool {
    // Compare data pointers only; vtable pointers are not guaranteed unique.
    core::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

impl<T: ?Sized> Notifier<T> {
    /// Creates an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `handle` unless it is already registered.
    ///
    /// Returns `true` if the handle was added.
    pub fn register(&self, handle: &Rc<dyn Fn(&T)>) -> bool {
        let mut handles = self.handles.borrow_mut();
        if handles.iter().any(|h| same_handle(h, handle)) {
            return false;
        }
        handles.push(Rc::clone(handle));
        true
    }

    /// Removes `handle` if present.
    ///
    /// Returns `true` if the handle was registered.
    pub fn unregister(&self, handle: &Rc<dyn Fn(&T)>) -> bool {
        let mut handles = self.handles.borrow_mut();
        let Some(pos) = handles.iter().position(|h| same_handle(h, handle)) else {
            return false;
        };
        handles.remove(pos);
        true
    }

    /// Returns `true` if `handle` is registered.
    pub fn contains(&self, handle: &Rc<dyn Fn(&T)>) -> bool {
        self.handles.borrow().iter().any(|h| same_handle(h, handle))
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.handles.borrow().len()
    }

    /// Returns `true` if no handles are registered.
    pub fn is_empty(&self) -> bool {
        self.handles.borrow().is_empty()
    }

    /// Drops every registered handle.
    pub fn clear(&self) {
        self.handles.borrow_mut().clear();
    }

    /// Invokes every registered handle once, in registration order.
    ///
    /// The handle list is snapshotted first, so handles may register or unregister other
    /// handles (or themselves) while the notifier is firing; such changes apply to the next
    /// call.
    ///
    /// With the `std` feature, a panicking handle is logged and the remaining handles still
    /// run. Without it (the default for this crate) there is no unwinding support to catch the
    /// panic, so it propagates out of `fire` and later handles are skipped. Enable `std` where
    /// callbacks may panic.
    pub fn fire(&self, arg: &T) {
        let snapshot: SmallVec<[Rc<dyn Fn(&T)>; 4]> = self.handles.borrow().clone();
        for handle in &snapshot {
            invoke(handle, arg);
        }
    }
}

#[cfg(feature = "std")]
fn invoke<T: ?Sized>(handle: &Rc<dyn Fn(&T)>, arg: &T) {
    extern crate std;

    use std::panic::{AssertUnwindSafe, catch_unwind};

    if catch_unwind(AssertUnwindSafe(|| handle(arg))).is_err() {
        tracing::error!("update callback panicked; continuing with remaining callbacks");
    }
}

#[cfg(not(feature = "std"))]
fn invoke<T: ?Sized>(handle: &Rc<dyn Fn(&T)>, arg: &T) {
    handle(arg);
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec::Vec;
    use core::cell::Cell;

    use super::*;

    #[test]
    fn registering_the_same_handle_twice_is_a_no_op() {
        let hits = Rc::new(Cell::new(0));
        let h = {
            let hits = Rc::clone(&hits);
            callback(move |_: &u32| hits.set(hits.get() + 1))
        };
        let n = Notifier::new();
        assert!(n.register(&h), "first registration adds");
        assert!(!n.register(&h), "second registration is ignored");
        n.fire(&1);
        assert_eq!(hits.get(), 1, "handle runs once per fire");
    }

    #[test]
    fn distinct_closures_are_distinct_handles() {
        let n = Notifier::<u32>::new();
        n.register(&callback(|_| {}));
        n.register(&callback(|_| {}));
        assert_eq!(n.len(), 2, "two allocations, two handles");
    }

    #[test]
    fn fires_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let n = Notifier::new();
        for i in 0..3 {
            let log = Rc::clone(&log);
            n.register(&callback(move |v: &u32| log.borrow_mut().push((i, *v))));
        }
        n.fire(&7);
        assert_eq!(*log.borrow(), [(0, 7), (1, 7), (2, 7)], "order follows registration");
    }

    #[test]
    fn unregister_unknown_handle_is_a_no_op() {
        let n = Notifier::<u32>::new();
        let h = callback(|_| {});
        assert!(!n.unregister(&h), "nothing to remove");
        n.register(&h);
        assert!(n.unregister(&h), "registered handle is removed");
        assert!(n.is_empty(), "notifier is empty again");
    }

    #[test]
    fn handles_may_mutate_the_registry_while_firing() {
        let n = Rc::new(Notifier::<u32>::new());
        let late_hits = Rc::new(Cell::new(0));
        let late = {
            let late_hits = Rc::clone(&late_hits);
            callback(move |_: &u32| late_hits.set(late_hits.get() + 1))
        };
        let adder = {
            let n = Rc::downgrade(&n);
            let late = Rc::clone(&late);
            callback(move |_: &u32| {
                if let Some(n) = n.upgrade() {
                    n.register(&late);
                }
            })
        };
        n.register(&adder);
        n.fire(&0);
        assert_eq!(late_hits.get(), 0, "handles added mid-fire wait for the next fire");
        n.fire(&0);
        assert_eq!(late_hits.get(), 1, "added handle runs on the next fire");
    }

    #[cfg(feature = "std")]
    #[test]
    fn a_panicking_handle_does_not_stop_the_others() {
        let hits = Rc::new(Cell::new(0));
        let n = Notifier::<u32>::new();
        n.register(&callback(|_| panic!("boom")));
        {
            let hits = Rc::clone(&hits);
            n.register(&callback(move |_: &u32| hits.set(hits.get() + 1)));
        }
        n.fire(&0);
        assert_eq!(hits.get(), 1, "second handle still ran");
    }
}

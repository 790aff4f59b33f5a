// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mutable, shareable record collections.

extern crate alloc;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::datum::{Datum, Record};
use crate::notify::{Callback, Notifier};

/// Stable identity of a [`Dataset`], assigned at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetId(pub u64);

impl DatasetId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

struct DatasetInner {
    id: DatasetId,
    records: RefCell<Rc<[Record]>>,
    metadata: RefCell<Datum>,
    on_update: Notifier<Dataset>,
}

/// An ordered collection of records plus free-form metadata.
///
/// `Dataset` is a cheap handle: clones share the same records, metadata and identity, which is
/// how one dataset is attached to several plots. Two datasets built from equal records are
/// still distinct. Every mutation fires the update notifier with the dataset itself.
#[derive(Clone)]
pub struct Dataset {
    inner: Rc<DatasetInner>,
}

impl Dataset {
    /// Creates a dataset holding `records`.
    pub fn new(records: impl Into<Vec<Record>>) -> Self {
        Self {
            inner: Rc::new(DatasetInner {
                id: DatasetId::next(),
                records: RefCell::new(Rc::from(records.into())),
                metadata: RefCell::new(Datum::Null),
                on_update: Notifier::new(),
            }),
        }
    }

    /// Creates a dataset without records.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Sets the initial metadata without notifying.
    pub fn with_metadata(self, metadata: impl Into<Datum>) -> Self {
        *self.inner.metadata.borrow_mut() = metadata.into();
        self
    }

    /// Returns the dataset identity.
    pub fn id(&self) -> DatasetId {
        self.inner.id
    }

    /// Returns a snapshot of the records.
    ///
    /// The snapshot stays valid (and unchanged) if the dataset is mutated afterwards.
    pub fn records(&self) -> Rc<[Record]> {
        Rc::clone(&self.inner.records.borrow())
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner.records.borrow().len()
    }

    /// Returns `true` if there are no records.
    pub fn is_empty(&self) -> bool {
        self.inner.records.borrow().is_empty()
    }

    /// Replaces the records and notifies listeners.
    pub fn set_records(&self, records: impl Into<Vec<Record>>) {
        *self.inner.records.borrow_mut() = Rc::from(records.into());
        tracing::debug!(dataset = self.inner.id.0, "dataset records replaced");
        self.inner.on_update.fire(self);
    }

    /// Returns the metadata value.
    pub fn metadata(&self) -> Datum {
        self.inner.metadata.borrow().clone()
    }

    /// Replaces the metadata and notifies listeners.
    pub fn set_metadata(&self, metadata: impl Into<Datum>) {
        *self.inner.metadata.borrow_mut() = metadata.into();
        self.inner.on_update.fire(self);
    }

    /// Registers an update callback.
    pub fn on_update(&self, callback: &Callback<Self>) {
        self.inner.on_update.register(callback);
    }

    /// Unregisters an update callback.
    pub fn off_update(&self, callback: &Callback<Self>) {
        self.inner.on_update.unregister(callback);
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Dataset {}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("id", &self.inner.id)
            .field("records", &self.len())
            .field("metadata", &self.inner.metadata.borrow())
            .field("listeners", &self.inner.on_update.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;
    use core::cell::Cell;

    use super::*;
    use crate::notify::callback;

    #[test]
    fn identity_is_by_reference_not_content() {
        let a = Dataset::new(vec![Record::from([("x", 1.0)])]);
        let b = Dataset::new(vec![Record::from([("x", 1.0)])]);
        assert_ne!(a, b, "equal contents, different datasets");
        assert_eq!(a, a.clone(), "clones share identity");
    }

    #[test]
    fn mutations_fire_the_notifier() {
        let ds = Dataset::empty();
        let hits = Rc::new(Cell::new(0));
        let cb = {
            let hits = Rc::clone(&hits);
            callback(move |d: &Dataset| hits.set(hits.get() + d.len()))
        };
        ds.on_update(&cb);
        ds.set_records(vec![Record::new(), Record::new()]);
        assert_eq!(hits.get(), 2, "listener saw the new records");
        ds.set_metadata("series a");
        assert_eq!(hits.get(), 4, "metadata changes notify too");
        assert_eq!(ds.metadata(), Datum::from("series a"), "metadata stored");

        ds.off_update(&cb);
        ds.set_records(Vec::new());
        assert_eq!(hits.get(), 4, "unregistered listener is silent");
    }

    #[test]
    fn record_snapshots_survive_mutation() {
        let ds = Dataset::new(vec![Record::from([("x", 1.0)])]);
        let before = ds.records();
        ds.set_records(Vec::new());
        assert_eq!(before.len(), 1, "old snapshot unchanged");
        assert!(ds.is_empty(), "dataset now empty");
    }
}

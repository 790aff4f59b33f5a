// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data plumbing for Strata charts.
//!
//! This crate holds the pieces every chart layer builds on:
//! - **Records and datasets**: loosely typed [`Record`]s grouped into shareable, mutable
//!   [`Dataset`]s with reference identity.
//! - **Accessors**: closures that read a [`Datum`] out of a record, plus typed coercion that
//!   turns bad values into [`DataCoercionWarning`]s instead of errors.
//! - **Notifiers**: deduplicated multicast callbacks used to announce mutation.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`) and synchronous: a mutation runs every
//! listener before it returns.

#![no_std]

extern crate alloc;

mod accessor;
mod dataset;
mod datum;
mod notify;

pub use accessor::{Accessor, DataCoercionWarning};
pub use dataset::{Dataset, DatasetId};
pub use datum::{Datum, Record, ValueKind};
pub use notify::{Callback, Notifier, callback};

/// Insertion-ordered hash map used wherever iteration order is observable.
pub type OrderedMap<K, V> = indexmap::IndexMap<K, V, hashbrown::DefaultHashBuilder>;

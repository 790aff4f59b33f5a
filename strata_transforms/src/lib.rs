// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout transforms over Strata datasets.
//!
//! This crate currently provides the stack layout used by stacked bar and area plots:
//! - per-dataset, per-category offsets kept in a side table (records are never mutated), and
//! - the stacked extent, optionally restricted to the records a caller considers visible.
//!
//! Layouts are recomputed in full; datasets are processed in the order given.

#![no_std]

extern crate alloc;

mod stack;

pub use stack::{Orientation, StackLayout, StackOffsets, StackedPoint};

// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scales, property bindings and plots for Strata.
//!
//! This crate sits between `strata_core` datasets and a renderer:
//! - **Scales** map data values into range coordinates. Their domains follow the extents that
//!   plots contribute, unless set by hand.
//! - **Plots** bind properties (`x`, `y`, ...) to accessors and scales, publish the extent of
//!   their attached datasets, and optionally stack values through `strata_transforms`.
//!
//! Everything is synchronous: a dataset mutation has updated every dependent scale and plot
//! by the time it returns. Drawing is out of scope; renderers read [`Scale::scale`] and
//! [`Plot::stack_offsets`] when a plot's render notifier fires.

#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod binding;
mod error;
#[cfg(not(feature = "std"))]
mod float;
mod mapping;
mod plot;
mod scale;
#[cfg(test)]
mod stacked_tests;

pub use binding::PropertyBinding;
pub use error::ConfigurationError;
pub use mapping::{BandMap, LinearMap, LogMap};
pub use plot::{Autorange, Plot, XyPlotSpec};
pub use scale::{ContributorId, Domain, ExtentKey, Scale, ScaleId, ScaleKind};

pub use strata_transforms::{Orientation, StackLayout, StackOffsets, StackedPoint};

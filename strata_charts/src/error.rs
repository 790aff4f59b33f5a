// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration errors.

extern crate alloc;

use alloc::string::String;

use crate::scale::ScaleKind;

/// Invalid construction or configuration arguments.
///
/// These are always returned to the caller that caused them; data problems inside otherwise
/// valid datasets are reported as [`strata_core::DataCoercionWarning`]s instead.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    /// A plot type that needs a scale for `property` was configured without one.
    #[error("`{property}` requires a scale")]
    MissingScale {
        /// The property missing its scale.
        property: &'static str,
    },
    /// `autorange` was given something other than `"x"`, `"y"` or `"none"`.
    #[error("invalid scale name '{0}', must be 'x', 'y' or 'none'")]
    InvalidAutorange(String),
    /// A continuous domain was given to a category scale, or the other way around.
    #[error("a {kind:?} scale cannot take a {given} domain")]
    DomainKindMismatch {
        /// The scale's kind.
        kind: ScaleKind,
        /// The kind of domain that was supplied.
        given: &'static str,
    },
    /// The domain bounds are unusable for the scale (non-finite, or not positive on a log scale).
    #[error("invalid domain [{low}, {high}] for a {kind:?} scale")]
    InvalidDomain {
        /// The scale's kind.
        kind: ScaleKind,
        /// Requested lower bound.
        low: f64,
        /// Requested upper bound.
        high: f64,
    },
}

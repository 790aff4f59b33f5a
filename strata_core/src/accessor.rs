// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Record accessors and typed value extraction.

extern crate alloc;

use alloc::rc::Rc;
use alloc::string::String;
use core::fmt;

use crate::dataset::{Dataset, DatasetId};
use crate::datum::{Datum, Record, ValueKind};

/// Reads a value from a record.
///
/// The closure receives the record, its index inside the dataset, and the dataset itself.
#[derive(Clone)]
pub struct Accessor {
    f: Rc<dyn Fn(&Record, usize, &Dataset) -> Datum>,
}

impl Accessor {
    /// Wraps an arbitrary accessor closure.
    pub fn new(f: impl Fn(&Record, usize, &Dataset) -> Datum + 'static) -> Self {
        Self { f: Rc::new(f) }
    }

    /// Reads the named field; missing fields read as [`Datum::Null`].
    pub fn field(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |record, _, _| record.get(&name).cloned().unwrap_or_default())
    }

    /// Returns the same value for every record.
    pub fn constant(value: impl Into<Datum>) -> Self {
        let value = value.into();
        Self::new(move |_, _, _| value.clone())
    }

    /// Applies the accessor.
    pub fn get(&self, record: &Record, index: usize, dataset: &Dataset) -> Datum {
        (self.f)(record, index, dataset)
    }

    /// Applies the accessor and coerces the result to `kind`.
    ///
    /// On failure the returned warning names `property` so the caller can log and skip the
    /// record.
    pub fn get_as(
        &self,
        kind: ValueKind,
        property: &str,
        record: &Record,
        index: usize,
        dataset: &Dataset,
    ) -> Result<Datum, DataCoercionWarning> {
        let raw = self.get(record, index, dataset);
        match raw.coerce(kind) {
            Some(v) => Ok(v),
            None => Err(DataCoercionWarning::new(dataset, index, property, raw, kind)),
        }
    }

    /// Applies the accessor and coerces the result to a finite number.
    pub fn get_f64(
        &self,
        property: &str,
        record: &Record,
        index: usize,
        dataset: &Dataset,
    ) -> Result<f64, DataCoercionWarning> {
        let raw = self.get(record, index, dataset);
        match raw.to_f64() {
            Some(v) => Ok(v),
            None => Err(DataCoercionWarning::new(
                dataset,
                index,
                property,
                raw,
                ValueKind::Numeric,
            )),
        }
    }

    /// Applies the accessor and stringifies the result as a category key.
    pub fn get_key(
        &self,
        property: &str,
        record: &Record,
        index: usize,
        dataset: &Dataset,
    ) -> Result<String, DataCoercionWarning> {
        let raw = self.get(record, index, dataset);
        match raw.to_key() {
            Some(k) => Ok(k),
            None => Err(DataCoercionWarning::new(
                dataset,
                index,
                property,
                raw,
                ValueKind::Categorical,
            )),
        }
    }
}

impl From<Datum> for Accessor {
    fn from(value: Datum) -> Self {
        Self::constant(value)
    }
}

impl From<f64> for Accessor {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Accessor(<fn>)")
    }
}

/// A record value that could not be coerced to the type its consumer expects.
///
/// The record is excluded from extent computation and stacking; use [`Self::emit`] to report it.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error(
    "dataset {} record {index}: `{property}` value {value} is not {expected:?}; record skipped",
    .dataset.0
)]
pub struct DataCoercionWarning {
    /// Dataset holding the record.
    pub dataset: DatasetId,
    /// Index of the record inside the dataset.
    pub index: usize,
    /// Property (or stacking role) the value was read for.
    pub property: String,
    /// The raw value returned by the accessor.
    pub value: Datum,
    /// The value kind that was expected.
    pub expected: ValueKind,
}

impl DataCoercionWarning {
    fn new(
        dataset: &Dataset,
        index: usize,
        property: &str,
        value: Datum,
        expected: ValueKind,
    ) -> Self {
        Self {
            dataset: dataset.id(),
            index,
            property: String::from(property),
            value,
            expected,
        }
    }

    /// Logs the warning through `tracing`.
    pub fn emit(&self) {
        tracing::warn!(
            dataset = self.dataset.0,
            index = self.index,
            property = %self.property,
            "{}",
            self
        );
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use super::*;

    #[test]
    fn field_accessor_reads_and_coerces() {
        let ds = Dataset::new(vec![Record::from([("y", "3")]), Record::from([("y", "n/a")])]);
        let records = ds.records();
        let y = Accessor::field("y");
        assert_eq!(
            y.get_as(ValueKind::Numeric, "y", &records[0], 0, &ds),
            Ok(Datum::Number(3.0)),
            "numeric string coerces"
        );
        let err = y
            .get_as(ValueKind::Numeric, "y", &records[1], 1, &ds)
            .unwrap_err();
        assert_eq!(err.index, 1, "warning carries the record index");
        assert_eq!(err.dataset, ds.id(), "warning carries the dataset");
        assert_eq!(err.value, Datum::from("n/a"), "warning carries the raw value");
    }

    #[test]
    fn constants_ignore_the_record() {
        let ds = Dataset::empty();
        let c = Accessor::from(4.0);
        assert_eq!(c.get(&Record::new(), 9, &ds), Datum::Number(4.0), "constant value");
    }

    #[test]
    fn missing_fields_read_as_null() {
        let ds = Dataset::empty();
        let a = Accessor::field("nope");
        assert!(a.get(&Record::new(), 0, &ds).is_null(), "missing field is null");
    }
}

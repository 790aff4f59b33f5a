// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property bindings: an accessor paired with the scale that consumes its values.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashSet;
use strata_core::{Accessor, Dataset, Datum, Record};

use crate::scale::{Domain, Scale, ScaleKind};

/// What a plot property reads and where its values go.
///
/// Either half may be missing: a property bound without a scale is read by renderers but
/// contributes no extent.
#[derive(Clone, Debug, Default)]
pub struct PropertyBinding {
    accessor: Option<Accessor>,
    scale: Option<Scale>,
}

impl PropertyBinding {
    /// Creates a binding.
    pub fn new(accessor: Option<Accessor>, scale: Option<Scale>) -> Self {
        Self { accessor, scale }
    }

    /// The bound accessor.
    pub fn accessor(&self) -> Option<&Accessor> {
        self.accessor.as_ref()
    }

    /// The bound scale.
    pub fn scale(&self) -> Option<&Scale> {
        self.scale.as_ref()
    }

    /// Returns `true` if neither an accessor nor a scale is bound.
    pub fn is_empty(&self) -> bool {
        self.accessor.is_none() && self.scale.is_none()
    }

    /// Reads the bound value of one record, coerced for the bound scale.
    ///
    /// Without a scale the raw accessor value is returned.
    pub fn value(&self, record: &Record, index: usize, dataset: &Dataset) -> Option<Datum> {
        let accessor = self.accessor.as_ref()?;
        match &self.scale {
            Some(scale) => accessor
                .get(record, index, dataset)
                .coerce(scale.value_kind()),
            None => Some(accessor.get(record, index, dataset)),
        }
    }

    /// Extent of the bound values over `datasets`, in order, for the records `filter` accepts.
    ///
    /// Values the scale cannot take are reported as coercion warnings and skipped. Returns
    /// `None` when the binding lacks an accessor or scale, or when no value survives.
    pub fn extent(
        &self,
        property: &str,
        datasets: &[Dataset],
        filter: impl Fn(&Record, usize, &Dataset) -> bool,
    ) -> Option<Domain> {
        let accessor = self.accessor.as_ref()?;
        let scale = self.scale.as_ref()?;
        let kind = scale.kind();

        if kind == ScaleKind::Category {
            let mut seen = HashSet::new();
            let mut keys: Vec<String> = Vec::new();
            for dataset in datasets {
                for (index, record) in dataset.records().iter().enumerate() {
                    if !filter(record, index, dataset) {
                        continue;
                    }
                    match accessor.get_key(property, record, index, dataset) {
                        Ok(key) => {
                            if seen.insert(key.clone()) {
                                keys.push(key);
                            }
                        }
                        Err(warning) => warning.emit(),
                    }
                }
            }
            return (!keys.is_empty()).then_some(Domain::Discrete(keys));
        }

        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for dataset in datasets {
            for (index, record) in dataset.records().iter().enumerate() {
                if !filter(record, index, dataset) {
                    continue;
                }
                let value = accessor
                    .get_as(kind.value_kind(), property, record, index, dataset)
                    .map(|v| v.to_f64());
                match value {
                    Ok(Some(v)) if kind.accepts(v) => {
                        lo = lo.min(v);
                        hi = hi.max(v);
                    }
                    Ok(_) => tracing::debug!(
                        dataset = dataset.id().0,
                        index,
                        property,
                        "value outside the {:?} scale's input domain; skipped",
                        kind
                    ),
                    Err(warning) => warning.emit(),
                }
            }
        }
        (lo <= hi).then_some(Domain::Continuous(lo, hi))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use super::*;

    fn all(_: &Record, _: usize, _: &Dataset) -> bool {
        true
    }

    #[test]
    fn continuous_extent_skips_bad_values() {
        let ds = Dataset::new(vec![
            Record::from([("y", Datum::from("4"))]),
            Record::from([("y", Datum::from("n/a"))]),
            Record::from([("y", Datum::from(-1.5))]),
            Record::new(),
        ]);
        let b = PropertyBinding::new(Some(Accessor::field("y")), Some(Scale::linear()));
        assert_eq!(
            b.extent("y", &[ds], all),
            Some(Domain::Continuous(-1.5, 4.0)),
            "numeric strings count, junk and nulls do not"
        );
    }

    #[test]
    fn log_extent_drops_non_positive_values() {
        let ds = Dataset::new(vec![
            Record::from([("y", 0.0)]),
            Record::from([("y", 10.0)]),
            Record::from([("y", 1000.0)]),
        ]);
        let b = PropertyBinding::new(Some(Accessor::field("y")), Some(Scale::log(10.0)));
        assert_eq!(
            b.extent("y", &[ds], all),
            Some(Domain::Continuous(10.0, 1000.0)),
            "zero cannot sit on a log scale"
        );
    }

    #[test]
    fn category_extent_is_ordered_and_unique() {
        let a = Dataset::new(vec![Record::from([("x", "b")]), Record::from([("x", "a")])]);
        let b = Dataset::new(vec![Record::from([("x", "a")]), Record::from([("x", 3.0)])]);
        let binding = PropertyBinding::new(Some(Accessor::field("x")), Some(Scale::category()));
        assert_eq!(
            binding.extent("x", &[a, b], all),
            Some(Domain::from(["b", "a", "3"])),
            "first-seen order across datasets"
        );
    }

    #[test]
    fn incomplete_bindings_have_no_extent() {
        let ds = Dataset::new(vec![Record::from([("y", 1.0)])]);
        let no_scale = PropertyBinding::new(Some(Accessor::field("y")), None);
        assert_eq!(no_scale.extent("y", &[ds.clone()], all), None, "no scale");
        let filtered = PropertyBinding::new(Some(Accessor::field("y")), Some(Scale::linear()));
        assert_eq!(
            filtered.extent("y", &[ds], |_, _, _| false),
            None,
            "nothing visible"
        );
        assert!(PropertyBinding::default().is_empty(), "default binding is empty");
    }
}

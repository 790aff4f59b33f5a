// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! "Zero" stack layout across ordered datasets.
//!
//! Each dataset is one layer of the stack; records are grouped into stacks by their category
//! key. Positive values grow upward from the sum of positive values in earlier layers,
//! negative values grow downward from the sum of negative values in earlier layers.

extern crate alloc;

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use strata_core::{Accessor, Dataset, DatasetId, OrderedMap, Record};

/// Which axis carries the categories and which one is stacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Categories along `x`, values stacked along `y` (stacked columns / areas).
    #[default]
    Vertical,
    /// Categories along `y`, values stacked along `x`.
    Horizontal,
}

impl Orientation {
    /// Property name of the category (key) axis.
    pub fn key_property(self) -> &'static str {
        match self {
            Self::Vertical => "x",
            Self::Horizontal => "y",
        }
    }

    /// Property name of the stacked (value) axis.
    pub fn value_property(self) -> &'static str {
        match self {
            Self::Vertical => "y",
            Self::Horizontal => "x",
        }
    }
}

/// Stack offsets keyed by dataset identity, then by category key.
///
/// Keys are the stringified category values (see [`strata_core::Datum::to_key`]), so a
/// category authored as `1` reads back as `"1"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackOffsets {
    tables: OrderedMap<DatasetId, OrderedMap<String, f64>>,
}

impl StackOffsets {
    /// Offset of `key` within `dataset`.
    pub fn get(&self, dataset: DatasetId, key: &str) -> Option<f64> {
        self.tables.get(&dataset)?.get(key).copied()
    }

    /// All offsets of one dataset, in first-seen key order.
    pub fn dataset(&self, dataset: DatasetId) -> Option<&OrderedMap<String, f64>> {
        self.tables.get(&dataset)
    }

    /// Iterates datasets in stacking order.
    pub fn iter(&self) -> impl Iterator<Item = (DatasetId, &OrderedMap<String, f64>)> {
        self.tables.iter().map(|(id, t)| (*id, t))
    }

    /// Number of stacked datasets.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if nothing was stacked.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// A single stacked record.
#[derive(Debug, Clone, PartialEq)]
pub struct StackedPoint {
    /// Dataset the record belongs to.
    pub dataset: DatasetId,
    /// Record index inside the dataset.
    pub index: usize,
    /// Category key.
    pub key: String,
    /// Coerced value.
    pub value: f64,
    /// Baseline the value is drawn from (Vega's `y0`).
    pub offset: f64,
    source: usize,
}

impl StackedPoint {
    /// Far end of the stacked span (Vega's `y1`).
    pub fn end(&self) -> f64 {
        self.offset + self.value
    }
}

/// Result of stacking an ordered list of datasets.
#[derive(Debug, Clone, Default)]
pub struct StackLayout {
    offsets: StackOffsets,
    points: Vec<StackedPoint>,
    sources: Vec<(Dataset, Rc<[Record]>)>,
}

struct Row {
    index: usize,
    key: String,
    value: f64,
}

impl StackLayout {
    /// Stacks `datasets` in the given order.
    ///
    /// `key` selects the category of each record and `value` the amount to stack. Values are
    /// coerced to numbers first, so numeric strings stack like numbers. Records whose key or
    /// value cannot be coerced are logged and left out.
    ///
    /// A value of exactly zero sits on the positive stack, unless no dataset has a positive
    /// value at that key; then it sits on the negative stack, so a zero between negative
    /// layers does not reset to the baseline.
    pub fn compute(datasets: &[Dataset], key: &Accessor, value: &Accessor) -> Self {
        let mut sources = Vec::with_capacity(datasets.len());
        let mut layers: Vec<Vec<Row>> = Vec::with_capacity(datasets.len());

        for dataset in datasets {
            let records = dataset.records();
            let mut rows = Vec::with_capacity(records.len());
            for (index, record) in records.iter().enumerate() {
                let k = match key.get_key("stack key", record, index, dataset) {
                    Ok(k) => k,
                    Err(warning) => {
                        warning.emit();
                        continue;
                    }
                };
                let v = match value.get_f64("stack value", record, index, dataset) {
                    Ok(v) => v,
                    Err(warning) => {
                        warning.emit();
                        continue;
                    }
                };
                rows.push(Row {
                    index,
                    key: k,
                    value: v,
                });
            }
            sources.push((dataset.clone(), records));
            layers.push(rows);
        }

        let has_positive: HashSet<&str> = layers
            .iter()
            .flatten()
            .filter(|r| r.value > 0.0)
            .map(|r| r.key.as_str())
            .collect();

        let mut positive: HashMap<&str, f64> = HashMap::new();
        let mut negative: HashMap<&str, f64> = HashMap::new();
        let mut tables = OrderedMap::default();
        let mut points = Vec::new();

        for (source, rows) in layers.iter().enumerate() {
            let dataset = sources[source].0.id();
            let mut table = OrderedMap::default();
            for row in rows {
                let upward = row.value > 0.0
                    || (row.value == 0.0 && has_positive.contains(row.key.as_str()));
                let sums = if upward { &positive } else { &negative };
                let offset = sums.get(row.key.as_str()).copied().unwrap_or(0.0);
                table.insert(row.key.clone(), offset);
                points.push(StackedPoint {
                    dataset,
                    index: row.index,
                    key: row.key.clone(),
                    value: row.value,
                    offset,
                    source,
                });
            }
            // Accumulate after the whole layer so records sharing a key within one dataset
            // start from the same baseline.
            for row in rows {
                if row.value > 0.0 {
                    *positive.entry(row.key.as_str()).or_insert(0.0) += row.value;
                } else if row.value < 0.0 {
                    *negative.entry(row.key.as_str()).or_insert(0.0) += row.value;
                }
            }
            tables.insert(dataset, table);
        }

        tracing::debug!(
            datasets = sources.len(),
            points = points.len(),
            "stack layout computed"
        );

        Self {
            offsets: StackOffsets { tables },
            points,
            sources,
        }
    }

    /// Per-dataset, per-key offsets.
    pub fn offsets(&self) -> &StackOffsets {
        &self.offsets
    }

    /// Every stacked record, in dataset order then record order.
    pub fn points(&self) -> &[StackedPoint] {
        &self.points
    }

    /// Stacked extent over every record, always including the zero baseline.
    pub fn extent(&self) -> (f64, f64) {
        self.extent_where(|_, _, _| true)
    }

    /// Stacked extent over the records accepted by `filter`.
    ///
    /// The result always includes `0`; with no accepted records it is `(0.0, 0.0)`.
    pub fn extent_where(&self, filter: impl Fn(&Record, usize, &Dataset) -> bool) -> (f64, f64) {
        let mut lo = 0.0_f64;
        let mut hi = 0.0_f64;
        for p in &self.points {
            let (dataset, records) = &self.sources[p.source];
            if !filter(&records[p.index], p.index, dataset) {
                continue;
            }
            let end = p.end();
            lo = lo.min(end);
            hi = hi.max(end);
        }
        (lo, hi)
    }
}

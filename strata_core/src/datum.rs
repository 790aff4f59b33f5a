// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Loosely typed record values and their coercions.

extern crate alloc;

use alloc::string::{String, ToString};
use core::fmt;

use hashbrown::HashMap;

/// The value type a binding expects from its accessor.
///
/// Scales declare the kind they consume; coercion of raw [`Datum`]s is chosen from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Finite `f64` values.
    Numeric,
    /// Timestamps in seconds (also accepts plain numbers).
    Temporal,
    /// Discrete categories keyed by their string form.
    Categorical,
}

/// A single field value inside a [`Record`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Datum {
    /// Missing value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(f64),
    /// String.
    Text(String),
    /// Timestamp in seconds since the Unix epoch.
    Timestamp(f64),
}

impl Datum {
    /// Returns `true` for [`Datum::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Coerces the value to a finite number.
    ///
    /// Numeric strings are parsed after trimming whitespace, so `"-2"` and `-2.0` behave the
    /// same. Booleans map to `0`/`1`. Null, empty or unparsable strings and non-finite values
    /// yield `None`.
    pub fn to_f64(&self) -> Option<f64> {
        let v = match self {
            Self::Null => return None,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(v) | Self::Timestamp(v) => *v,
            Self::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                s.parse::<f64>().ok()?
            }
        };
        v.is_finite().then_some(v)
    }

    /// Returns the stringified category key for this value.
    ///
    /// Integral numbers print without a fractional part (`1.0` keys as `"1"`), so a category
    /// authored as a number and one authored as the matching string share a key. Null and
    /// NaN values have no key.
    pub fn to_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(v) | Self::Timestamp(v) => {
                if v.is_nan() {
                    None
                } else if *v == 0.0 {
                    // Avoid "-0".
                    Some(String::from("0"))
                } else {
                    Some(v.to_string())
                }
            }
            Self::Text(s) => Some(s.clone()),
        }
    }

    /// Coerces the value for the given kind.
    ///
    /// Returns a [`Datum::Number`] for numeric kinds, [`Datum::Text`] for categorical ones.
    pub fn coerce(&self, kind: ValueKind) -> Option<Self> {
        match kind {
            ValueKind::Numeric | ValueKind::Temporal => self.to_f64().map(Self::Number),
            ValueKind::Categorical => self.to_key().map(Self::Text),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Timestamp(v) => write!(f, "t={v}s"),
        }
    }
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Datum {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for Datum {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Self::Text(String::from(value))
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Datum {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A single data record: field name to value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: HashMap<String, Datum>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Datum>) -> Self {
        self.insert(field, value);
        self
    }

    /// Inserts or replaces a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Datum>) -> Option<Datum> {
        self.fields.insert(field.into(), value.into())
    }

    /// Returns a field value, if present.
    pub fn get(&self, field: &str) -> Option<&Datum> {
        self.fields.get(field)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Datum>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Datum>, const N: usize> From<[(K, V); N]> for Record {
    fn from(value: [(K, V); N]) -> Self {
        value.into_iter().collect()
    }
}

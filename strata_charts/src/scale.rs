// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared, self-updating scales.
//!
//! A [`Scale`] owns a domain and a range and maps data values into range coordinates. Unless
//! its domain was set by hand, the domain is derived from *extent contributions*: every plot
//! bound to the scale publishes the extent of its data under its own [`ContributorId`], and
//! the scale unions them.
//!
//! Listeners registered with [`Scale::on_update`] only hear about real changes: a recomputed
//! domain that is value-equal to the current one is dropped silently. Plots whose extents
//! depend on each other's scales rely on this to settle instead of bouncing updates forever.

extern crate alloc;

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashSet;
use strata_core::{Callback, Datum, Notifier, OrderedMap, ValueKind};

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

use crate::error::ConfigurationError;
use crate::mapping::{
    BandMap, LinearMap, LogMap, nice_domain, nice_log_domain, nice_ticks, sanitize_base,
};

/// Tick count used when snapping domains to nice values.
const NICE_TICK_COUNT: usize = 10;

/// Half-width used to widen a single-value time domain (one day, in seconds).
const TIME_SINGLE_VALUE_PAD: f64 = 86_400.0;

/// Identity of an extent contributor, usually a plot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContributorId(pub u64);

impl ContributorId {
    /// Allocates a fresh, process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity of a [`Scale`], stable across clones of the handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScaleId(pub u64);

/// Names one contribution within a contributor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExtentKey {
    /// The unstacked extent of a bound property (`"x"`, `"y"`, ...).
    Property(String),
    /// The stacked extent of a stacking plot's value axis.
    Stacked,
}

impl ExtentKey {
    /// Key for a property's extent.
    pub fn property(name: &str) -> Self {
        Self::Property(String::from(name))
    }
}

/// The flavor of a [`Scale`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScaleKind {
    /// Continuous linear scale.
    Linear,
    /// Continuous log scale.
    Log {
        /// Log base.
        base: f64,
    },
    /// Continuous time scale over timestamps in seconds.
    Time,
    /// Discrete band scale over category keys.
    Category,
}

impl ScaleKind {
    /// The value kind accessors bound to this scale must produce.
    pub fn value_kind(self) -> ValueKind {
        match self {
            Self::Linear | Self::Log { .. } => ValueKind::Numeric,
            Self::Time => ValueKind::Temporal,
            Self::Category => ValueKind::Categorical,
        }
    }

    /// Returns `true` for every kind except [`ScaleKind::Category`].
    pub fn is_continuous(self) -> bool {
        !matches!(self, Self::Category)
    }

    /// Returns `true` if the scale accepts `v` as an input value.
    pub fn accepts(self, v: f64) -> bool {
        match self {
            Self::Log { .. } => v > 0.0,
            _ => v.is_finite(),
        }
    }

    fn default_domain(self) -> Domain {
        match self {
            Self::Linear => Domain::Continuous(0.0, 1.0),
            Self::Log { base } => Domain::Continuous(1.0, base),
            Self::Time => Domain::Continuous(0.0, TIME_SINGLE_VALUE_PAD),
            Self::Category => Domain::Discrete(Vec::new()),
        }
    }

    /// Widens a degenerate `[v, v]` extent so it maps to a non-empty range span.
    fn expand_single_value(self, v: f64) -> (f64, f64) {
        match self {
            Self::Log { base } => (v / base, v * base),
            Self::Time => (v - TIME_SINGLE_VALUE_PAD, v + TIME_SINGLE_VALUE_PAD),
            Self::Linear | Self::Category => (v - 1.0, v + 1.0),
        }
    }
}

/// A scale domain.
#[derive(Clone, Debug, PartialEq)]
pub enum Domain {
    /// `[low, high]` for continuous scales; `low > high` reverses the scale.
    Continuous(f64, f64),
    /// Ordered category keys for category scales.
    Discrete(Vec<String>),
}

impl Domain {
    /// The bounds of a continuous domain.
    pub fn as_continuous(&self) -> Option<(f64, f64)> {
        match self {
            Self::Continuous(lo, hi) => Some((*lo, *hi)),
            Self::Discrete(_) => None,
        }
    }

    /// The keys of a discrete domain.
    pub fn as_discrete(&self) -> Option<&[String]> {
        match self {
            Self::Continuous(..) => None,
            Self::Discrete(keys) => Some(keys),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Continuous(..) => "continuous",
            Self::Discrete(_) => "discrete",
        }
    }
}

impl From<(f64, f64)> for Domain {
    fn from((lo, hi): (f64, f64)) -> Self {
        Self::Continuous(lo, hi)
    }
}

impl From<[f64; 2]> for Domain {
    fn from([lo, hi]: [f64; 2]) -> Self {
        Self::Continuous(lo, hi)
    }
}

impl From<Vec<String>> for Domain {
    fn from(keys: Vec<String>) -> Self {
        Self::Discrete(keys)
    }
}

impl From<&[&str]> for Domain {
    fn from(keys: &[&str]) -> Self {
        Self::Discrete(keys.iter().map(|k| String::from(*k)).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Domain {
    fn from(keys: [&str; N]) -> Self {
        Self::from(&keys[..])
    }
}

type ExtentSlot = (ContributorId, ExtentKey);

#[derive(Debug)]
struct ScaleState {
    kind: ScaleKind,
    domain: Domain,
    range: (f64, f64),
    manual: bool,
    extents: OrderedMap<ExtentSlot, Domain>,
    padding: f64,
    padding_exceptions: OrderedMap<ExtentSlot, f64>,
    nice: bool,
    band_padding: (f64, f64),
}

impl ScaleState {
    fn auto_domain(&self) -> Domain {
        if self.kind == ScaleKind::Category {
            let mut seen = HashSet::new();
            let mut keys = Vec::new();
            for extent in self.extents.values() {
                let Domain::Discrete(values) = extent else {
                    continue;
                };
                for v in values {
                    if seen.insert(v.as_str()) {
                        keys.push(v.clone());
                    }
                }
            }
            return Domain::Discrete(keys);
        }

        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for extent in self.extents.values() {
            if let Domain::Continuous(a, b) = *extent {
                lo = lo.min(a.min(b));
                hi = hi.max(a.max(b));
            }
        }
        if !lo.is_finite() || !hi.is_finite() {
            return self.kind.default_domain();
        }
        let (lo, hi) = if lo == hi {
            self.kind.expand_single_value(lo)
        } else {
            (lo, hi)
        };
        let (lo, hi) = self.pad(lo, hi);
        let (lo, hi) = if self.nice { self.nice(lo, hi) } else { (lo, hi) };
        Domain::Continuous(lo, hi)
    }

    fn pad(&self, lo: f64, hi: f64) -> (f64, f64) {
        if self.padding <= 0.0 {
            return (lo, hi);
        }
        let (padded_lo, padded_hi) = match self.kind {
            ScaleKind::Log { base } => {
                let ln_base = base.ln();
                let (l0, l1) = (lo.ln() / ln_base, hi.ln() / ln_base);
                let d = (l1 - l0) * self.padding / 2.0;
                (base.powf(l0 - d), base.powf(l1 + d))
            }
            _ => {
                let d = (hi - lo) * self.padding / 2.0;
                (lo - d, hi + d)
            }
        };
        let pinned = |v: f64| self.padding_exceptions.values().any(|&e| e == v);
        (
            if pinned(lo) { lo } else { padded_lo },
            if pinned(hi) { hi } else { padded_hi },
        )
    }

    fn nice(&self, lo: f64, hi: f64) -> (f64, f64) {
        match self.kind {
            ScaleKind::Log { base } => nice_log_domain(base, lo, hi),
            _ => nice_domain(lo, hi, NICE_TICK_COUNT),
        }
    }

    fn validate(&self, domain: Domain) -> Result<Domain, ConfigurationError> {
        match (self.kind, domain) {
            (ScaleKind::Category, d @ Domain::Discrete(_)) => Ok(d),
            (ScaleKind::Category, d) | (_, d @ Domain::Discrete(_)) => {
                Err(ConfigurationError::DomainKindMismatch {
                    kind: self.kind,
                    given: d.describe(),
                })
            }
            (kind, Domain::Continuous(lo, hi)) => {
                let valid = lo.is_finite()
                    && hi.is_finite()
                    && (!matches!(kind, ScaleKind::Log { .. }) || (lo > 0.0 && hi > 0.0));
                if !valid {
                    return Err(ConfigurationError::InvalidDomain {
                        kind,
                        low: lo,
                        high: hi,
                    });
                }
                if lo == hi {
                    let (lo, hi) = kind.expand_single_value(lo);
                    Ok(Domain::Continuous(lo, hi))
                } else {
                    Ok(Domain::Continuous(lo, hi))
                }
            }
        }
    }

    fn band(&self) -> Option<(BandMap, &[String])> {
        let Domain::Discrete(keys) = &self.domain else {
            return None;
        };
        let (inner, outer) = self.band_padding;
        Some((
            BandMap::new(self.range, keys.len(), inner, outer),
            keys,
        ))
    }
}

struct ScaleInner {
    id: ScaleId,
    state: RefCell<ScaleState>,
    on_update: Notifier<Scale>,
}

/// A shared scale handle.
///
/// Clones refer to the same scale; equality is identity. Several plots may bind the same scale,
/// each contributing its own extents.
#[derive(Clone)]
pub struct Scale {
    inner: Rc<ScaleInner>,
}

impl Scale {
    /// Creates a scale of the given kind with its default domain and range `[0, 1]`.
    pub fn new(kind: ScaleKind) -> Self {
        let kind = match kind {
            ScaleKind::Log { base } => ScaleKind::Log {
                base: sanitize_base(base),
            },
            k => k,
        };
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self {
            inner: Rc::new(ScaleInner {
                id: ScaleId(NEXT.fetch_add(1, Ordering::Relaxed)),
                state: RefCell::new(ScaleState {
                    kind,
                    domain: kind.default_domain(),
                    range: (0.0, 1.0),
                    manual: false,
                    extents: OrderedMap::default(),
                    padding: 0.0,
                    padding_exceptions: OrderedMap::default(),
                    nice: false,
                    band_padding: (0.1, 0.1),
                }),
                on_update: Notifier::new(),
            }),
        }
    }

    /// Creates a linear scale.
    pub fn linear() -> Self {
        Self::new(ScaleKind::Linear)
    }

    /// Creates a log scale with the given base.
    pub fn log(base: f64) -> Self {
        Self::new(ScaleKind::Log { base })
    }

    /// Creates a time scale over timestamps in seconds.
    pub fn time() -> Self {
        Self::new(ScaleKind::Time)
    }

    /// Creates a category (band) scale.
    pub fn category() -> Self {
        Self::new(ScaleKind::Category)
    }

    /// Pads continuous auto domains by `proportion / 2` of their span on each side.
    ///
    /// Domain ends that sit exactly on a padding exception are left in place.
    pub fn with_padding(self, proportion: f64) -> Self {
        self.inner.state.borrow_mut().padding = if proportion.is_finite() {
            proportion.max(0.0)
        } else {
            0.0
        };
        self.refresh();
        self
    }

    /// Snaps continuous auto domains outward to nice values.
    pub fn with_nice(self, nice: bool) -> Self {
        self.inner.state.borrow_mut().nice = nice;
        self.refresh();
        self
    }

    /// Sets inner and outer band padding (category scales), in band units.
    pub fn with_band_padding(self, inner: f64, outer: f64) -> Self {
        self.inner.state.borrow_mut().band_padding = (inner.max(0.0), outer.max(0.0));
        self
    }

    /// The scale's identity.
    pub fn id(&self) -> ScaleId {
        self.inner.id
    }

    /// The scale's kind.
    pub fn kind(&self) -> ScaleKind {
        self.inner.state.borrow().kind
    }

    /// The value kind accessors bound to this scale must produce.
    pub fn value_kind(&self) -> ValueKind {
        self.kind().value_kind()
    }

    /// The current domain.
    pub fn domain(&self) -> Domain {
        self.inner.state.borrow().domain.clone()
    }

    /// Sets the domain by hand.
    ///
    /// The scale stops following its extent contributions until [`Self::auto_domain`] is
    /// called. A single-value continuous domain is widened the same way an auto domain is.
    pub fn set_domain(&self, domain: impl Into<Domain>) -> Result<(), ConfigurationError> {
        let changed = {
            let mut st = self.inner.state.borrow_mut();
            let domain = st.validate(domain.into())?;
            st.manual = true;
            if st.domain == domain {
                false
            } else {
                st.domain = domain;
                true
            }
        };
        if changed {
            self.notify("manual domain");
        }
        Ok(())
    }

    /// Returns `true` while a hand-set domain overrides the extent contributions.
    pub fn is_manual(&self) -> bool {
        self.inner.state.borrow().manual
    }

    /// Returns to following the extent contributions, recomputing the domain now.
    pub fn auto_domain(&self) {
        self.inner.state.borrow_mut().manual = false;
        self.refresh();
    }

    /// The output range.
    pub fn range(&self) -> (f64, f64) {
        self.inner.state.borrow().range
    }

    /// Sets the output range; `low > high` inverts the mapping.
    pub fn set_range(&self, range: (f64, f64)) {
        let changed = {
            let mut st = self.inner.state.borrow_mut();
            if st.range == range {
                false
            } else {
                st.range = range;
                true
            }
        };
        if changed {
            self.notify("range");
        }
    }

    /// Maps a value into range space.
    ///
    /// Returns `None` if `value` cannot be coerced to the scale's input type, or if a category
    /// scale does not know the value. Continuous scales extrapolate outside their domain; log
    /// scales map non-positive values to the start of the range. Category scales return the
    /// center of the value's band.
    pub fn scale(&self, value: &Datum) -> Option<f64> {
        let st = self.inner.state.borrow();
        match (st.kind, &st.domain) {
            (ScaleKind::Category, _) => {
                let key = value.to_key()?;
                let (band, keys) = st.band()?;
                let index = keys.iter().position(|k| *k == key)?;
                Some(band.center(index))
            }
            (ScaleKind::Log { base }, Domain::Continuous(lo, hi)) => {
                let v = value.to_f64()?;
                Some(LogMap::new(base, (*lo, *hi), st.range).apply(v))
            }
            (_, Domain::Continuous(lo, hi)) => {
                let v = value.to_f64()?;
                Some(LinearMap::new((*lo, *hi), st.range).apply(v))
            }
            (_, Domain::Discrete(_)) => None,
        }
    }

    /// Maps a range value back into the domain (continuous scales only).
    pub fn invert(&self, y: f64) -> Option<f64> {
        let st = self.inner.state.borrow();
        match (st.kind, &st.domain) {
            (ScaleKind::Category, _) | (_, Domain::Discrete(_)) => None,
            (ScaleKind::Log { base }, Domain::Continuous(lo, hi)) => {
                Some(LogMap::new(base, (*lo, *hi), st.range).invert(y))
            }
            (_, Domain::Continuous(lo, hi)) => {
                Some(LinearMap::new((*lo, *hi), st.range).invert(y))
            }
        }
    }

    /// Tick values across the current domain (empty for category scales).
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let st = self.inner.state.borrow();
        match (st.kind, &st.domain) {
            (ScaleKind::Log { base }, Domain::Continuous(lo, hi)) => {
                LogMap::new(base, (*lo, *hi), st.range).ticks(count)
            }
            (ScaleKind::Linear | ScaleKind::Time, Domain::Continuous(lo, hi)) => {
                nice_ticks(*lo, *hi, count)
            }
            _ => Vec::new(),
        }
    }

    /// Width of one band (category scales only).
    pub fn band_width(&self) -> Option<f64> {
        let st = self.inner.state.borrow();
        st.band().map(|(band, _)| band.band_width())
    }

    /// Records (or replaces) the extent contributed under `(contributor, key)`.
    ///
    /// Extents of the wrong shape for this scale are ignored.
    pub fn update_extent(&self, contributor: ContributorId, key: ExtentKey, extent: Domain) {
        {
            let mut st = self.inner.state.borrow_mut();
            if st.kind.is_continuous() != matches!(extent, Domain::Continuous(..)) {
                tracing::warn!(
                    contributor = contributor.0,
                    ?key,
                    "ignoring {} extent on a {:?} scale",
                    extent.describe(),
                    st.kind
                );
                return;
            }
            if st.extents.get(&(contributor, key.clone())) == Some(&extent) {
                return;
            }
            st.extents.insert((contributor, key), extent);
        }
        self.refresh();
    }

    /// Withdraws the extent contributed under `(contributor, key)`, if any.
    pub fn remove_extent(&self, contributor: ContributorId, key: &ExtentKey) {
        let removed = self
            .inner
            .state
            .borrow_mut()
            .extents
            .shift_remove(&(contributor, key.clone()))
            .is_some();
        if removed {
            self.refresh();
        }
    }

    /// The extent currently contributed under `(contributor, key)`.
    pub fn extent(&self, contributor: ContributorId, key: &ExtentKey) -> Option<Domain> {
        self.inner
            .state
            .borrow()
            .extents
            .get(&(contributor, key.clone()))
            .cloned()
    }

    /// Number of extent contributions.
    pub fn extent_count(&self) -> usize {
        self.inner.state.borrow().extents.len()
    }

    /// Keeps padding from moving a domain end that equals `value`.
    pub fn add_padding_exception(&self, contributor: ContributorId, key: ExtentKey, value: f64) {
        let prev = self
            .inner
            .state
            .borrow_mut()
            .padding_exceptions
            .insert((contributor, key), value);
        if prev != Some(value) {
            self.refresh();
        }
    }

    /// Removes a padding exception added with [`Self::add_padding_exception`].
    pub fn remove_padding_exception(&self, contributor: ContributorId, key: &ExtentKey) {
        let removed = self
            .inner
            .state
            .borrow_mut()
            .padding_exceptions
            .shift_remove(&(contributor, key.clone()))
            .is_some();
        if removed {
            self.refresh();
        }
    }

    /// Registers an update callback.
    pub fn on_update(&self, callback: &Callback<Self>) {
        self.inner.on_update.register(callback);
    }

    /// Unregisters an update callback.
    pub fn off_update(&self, callback: &Callback<Self>) {
        self.inner.on_update.unregister(callback);
    }

    /// Recomputes the auto domain and notifies if it changed.
    fn refresh(&self) {
        let changed = {
            let mut st = self.inner.state.borrow_mut();
            if st.manual {
                return;
            }
            let next = st.auto_domain();
            if next == st.domain {
                false
            } else {
                st.domain = next;
                true
            }
        };
        if changed {
            self.notify("auto domain");
        }
    }

    fn notify(&self, cause: &'static str) {
        tracing::debug!(cause, domain = ?self.inner.state.borrow().domain, "scale updated");
        self.inner.on_update.fire(self);
    }
}

impl PartialEq for Scale {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Scale {}

impl fmt::Debug for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.inner.state.borrow();
        f.debug_struct("Scale")
            .field("id", &self.inner.id.0)
            .field("kind", &st.kind)
            .field("domain", &st.domain)
            .field("range", &st.range)
            .field("manual", &st.manual)
            .field("extents", &st.extents.len())
            .field("listeners", &self.inner.on_update.len())
            .finish_non_exhaustive()
    }
}

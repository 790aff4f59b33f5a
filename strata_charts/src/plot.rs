// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plots: datasets, property bindings and the extents they publish.
//!
//! A [`Plot`] owns an ordered set of attached datasets and a table of property bindings. Each
//! bound scale receives one extent contribution per property, keyed by the plot's
//! [`ContributorId`]; a stacking plot additionally publishes the stacked extent of its value
//! axis under [`ExtentKey::Stacked`].
//!
//! Recomputation runs in two phases. First every contribution is published with cross-axis
//! adjustment suppressed; then a single autorange pass recomputes the dependent axis from the
//! visible part of the data. Scale notifications that arrive during the adjustment pass are
//! remembered and trigger another pass, so plots sharing scales settle on a fixed point. A
//! pass triggered by the source axis, or by setting the autorange mode, also drops any
//! hand-set domain on the target axis.

extern crate alloc;

use alloc::borrow::ToOwned;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::str::FromStr;

use kurbo::Size;
use strata_core::{
    Accessor, Callback, Dataset, DatasetId, Notifier, OrderedMap, Record, callback,
};
use strata_transforms::{Orientation, StackLayout, StackOffsets};

use crate::binding::PropertyBinding;
use crate::error::ConfigurationError;
use crate::scale::{ContributorId, Domain, ExtentKey, Scale, ScaleKind};

/// Upper bound on back-to-back autorange passes triggered by one change.
const MAX_ADJUST_PASSES: usize = 16;

/// Which axis follows the visible part of the other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Autorange {
    /// Both axes show every record.
    #[default]
    None,
    /// The x domain covers the records whose y position is inside the y range.
    X,
    /// The y domain covers the records whose x position is inside the x range.
    Y,
}

impl Autorange {
    /// Property whose domain is adjusted.
    pub fn target(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::X => Some("x"),
            Self::Y => Some("y"),
        }
    }

    /// Property whose range decides which records are visible.
    pub fn source(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::X => Some("y"),
            Self::Y => Some("x"),
        }
    }
}

impl FromStr for Autorange {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            _ => Err(ConfigurationError::InvalidAutorange(s.to_owned())),
        }
    }
}

impl fmt::Display for Autorange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target().unwrap_or("none"))
    }
}

/// Builder for plots with required `x` and `y` scales.
///
/// Set [`Self::with_stacking`] to get a stacked bar/area plot.
#[derive(Clone, Debug, Default)]
pub struct XyPlotSpec {
    /// `x` binding.
    pub x: Option<PropertyBinding>,
    /// `y` binding.
    pub y: Option<PropertyBinding>,
    /// Other bindings, in binding order.
    pub properties: Vec<(String, PropertyBinding)>,
    /// Datasets, in attachment order.
    pub datasets: Vec<Dataset>,
    /// Cross-axis autorange mode.
    pub autorange: Autorange,
    /// Stacking orientation, if the plot stacks.
    pub stacking: Option<Orientation>,
}

impl XyPlotSpec {
    /// Creates an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `x`.
    pub fn with_x(mut self, accessor: impl Into<Accessor>, scale: &Scale) -> Self {
        self.x = Some(PropertyBinding::new(
            Some(accessor.into()),
            Some(scale.clone()),
        ));
        self
    }

    /// Binds `y`.
    pub fn with_y(mut self, accessor: impl Into<Accessor>, scale: &Scale) -> Self {
        self.y = Some(PropertyBinding::new(
            Some(accessor.into()),
            Some(scale.clone()),
        ));
        self
    }

    /// Binds any other property.
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        accessor: impl Into<Accessor>,
        scale: Option<&Scale>,
    ) -> Self {
        self.properties.push((
            name.into(),
            PropertyBinding::new(Some(accessor.into()), scale.cloned()),
        ));
        self
    }

    /// Attaches a dataset.
    pub fn with_dataset(mut self, dataset: &Dataset) -> Self {
        self.datasets.push(dataset.clone());
        self
    }

    /// Sets the autorange mode.
    pub fn with_autorange(mut self, autorange: Autorange) -> Self {
        self.autorange = autorange;
        self
    }

    /// Stacks values along the orientation's value axis.
    pub fn with_stacking(mut self, orientation: Orientation) -> Self {
        self.stacking = Some(orientation);
        self
    }

    /// Validates the spec and builds the plot, publishing its extents.
    pub fn build(self) -> Result<Plot, ConfigurationError> {
        let x = self
            .x
            .filter(|b| b.scale().is_some())
            .ok_or(ConfigurationError::MissingScale { property: "x" })?;
        let y = self
            .y
            .filter(|b| b.scale().is_some())
            .ok_or(ConfigurationError::MissingScale { property: "y" })?;

        let mut bindings = OrderedMap::default();
        bindings.insert(String::from("x"), x);
        bindings.insert(String::from("y"), y);
        for (name, binding) in self.properties {
            if (name == "x" || name == "y") && binding.scale().is_none() {
                return Err(ConfigurationError::MissingScale {
                    property: if name == "x" { "x" } else { "y" },
                });
            }
            bindings.insert(name, binding);
        }

        let mut datasets = OrderedMap::default();
        for ds in self.datasets {
            datasets.shift_remove(&ds.id());
            datasets.insert(ds.id(), ds);
        }

        Ok(Plot::assemble(PlotState {
            requires_xy: true,
            datasets,
            bindings,
            autorange: self.autorange,
            stacking: self.stacking,
            layout: StackLayout::default(),
            stacked_extent: (0.0, 0.0),
        }))
    }
}

struct PlotState {
    requires_xy: bool,
    datasets: OrderedMap<DatasetId, Dataset>,
    bindings: OrderedMap<String, PropertyBinding>,
    autorange: Autorange,
    stacking: Option<Orientation>,
    layout: StackLayout,
    stacked_extent: (f64, f64),
}

impl PlotState {
    fn binding(&self, property: &str) -> PropertyBinding {
        self.bindings.get(property).cloned().unwrap_or_default()
    }

    fn datasets(&self) -> Vec<Dataset> {
        self.datasets.values().cloned().collect()
    }

    fn is_stacked_value(&self, property: &str) -> bool {
        self.stacking
            .is_some_and(|o| o.value_property() == property)
    }

    fn uses_scale(&self, scale: &Scale) -> bool {
        self.bindings.values().any(|b| b.scale() == Some(scale))
    }

    /// Visibility filter for extents of `property`, if autorange targets it.
    fn visibility(&self, property: &str) -> Option<Visibility> {
        if self.autorange.target() != Some(property) {
            return None;
        }
        Visibility::new(self.binding(self.autorange.source()?))
    }
}

/// Accepts records whose position on the source axis lies inside that axis' range.
struct Visibility {
    binding: PropertyBinding,
    scale: Scale,
    low: f64,
    high: f64,
}

impl Visibility {
    fn new(binding: PropertyBinding) -> Option<Self> {
        let scale = binding.scale()?.clone();
        if binding.accessor().is_none() {
            return None;
        }
        let (r0, r1) = scale.range();
        Some(Self {
            binding,
            scale,
            low: r0.min(r1),
            high: r0.max(r1),
        })
    }

    fn accepts(&self, record: &Record, index: usize, dataset: &Dataset) -> bool {
        self.binding
            .value(record, index, dataset)
            .and_then(|v| self.scale.scale(&v))
            .is_some_and(|p| p >= self.low && p <= self.high)
    }
}

fn accepts(visibility: Option<&Visibility>, record: &Record, index: usize, ds: &Dataset) -> bool {
    visibility.is_none_or(|v| v.accepts(record, index, ds))
}

struct PlotInner {
    id: ContributorId,
    state: RefCell<PlotState>,
    adjusting: Cell<bool>,
    pending: Cell<bool>,
    dataset_changed: Callback<Dataset>,
    scale_changed: Callback<Scale>,
    on_render: Notifier<Plot>,
}

impl Drop for PlotInner {
    fn drop(&mut self) {
        let st = self.state.get_mut();
        for ds in st.datasets.values() {
            ds.off_update(&self.dataset_changed);
        }
        for (name, binding) in &st.bindings {
            let Some(scale) = binding.scale() else {
                continue;
            };
            scale.off_update(&self.scale_changed);
            scale.remove_extent(self.id, &ExtentKey::property(name));
            if st.stacking.is_some_and(|o| o.value_property() == name.as_str()) {
                scale.remove_padding_exception(self.id, &ExtentKey::Stacked);
                scale.remove_extent(self.id, &ExtentKey::Stacked);
            }
        }
        tracing::debug!(plot = self.id.0, "plot dropped; contributions withdrawn");
    }
}

/// A plot handle.
///
/// Clones share the plot. Dropping the last handle withdraws every extent the plot published
/// and detaches it from its datasets and scales.
#[derive(Clone)]
pub struct Plot {
    inner: Rc<PlotInner>,
}

impl Plot {
    /// Creates a plot with no required bindings.
    pub fn new() -> Self {
        Self::assemble(PlotState {
            requires_xy: false,
            datasets: OrderedMap::default(),
            bindings: OrderedMap::default(),
            autorange: Autorange::None,
            stacking: None,
            layout: StackLayout::default(),
            stacked_extent: (0.0, 0.0),
        })
    }

    fn assemble(state: PlotState) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<PlotInner>| {
            let w = weak.clone();
            let dataset_changed = callback(move |_: &Dataset| {
                if let Some(inner) = w.upgrade() {
                    Self { inner }.refresh();
                }
            });
            let w = weak.clone();
            let scale_changed = callback(move |scale: &Scale| {
                if let Some(inner) = w.upgrade() {
                    Self { inner }.scale_changed(scale);
                }
            });
            PlotInner {
                id: ContributorId::next(),
                state: RefCell::new(state),
                adjusting: Cell::new(false),
                pending: Cell::new(false),
                dataset_changed,
                scale_changed,
                on_render: Notifier::new(),
            }
        });
        let plot = Self { inner };
        {
            let st = plot.inner.state.borrow();
            for ds in st.datasets.values() {
                ds.on_update(&plot.inner.dataset_changed);
            }
            for scale in st.bindings.values().filter_map(PropertyBinding::scale) {
                scale.on_update(&plot.inner.scale_changed);
            }
        }
        plot.refresh();
        plot
    }

    /// The id this plot's extent contributions are filed under.
    pub fn id(&self) -> ContributorId {
        self.inner.id
    }

    /// Binds `property` to an accessor (or constant) and an optional scale.
    ///
    /// The previous binding's contribution is withdrawn and the new one published right away.
    /// Plots built from an [`XyPlotSpec`] refuse to bind `x` or `y` without a scale.
    pub fn bind(
        &self,
        property: &str,
        accessor: impl Into<Accessor>,
        scale: Option<&Scale>,
    ) -> Result<(), ConfigurationError> {
        let (old, stacked_value) = {
            let mut st = self.inner.state.borrow_mut();
            if st.requires_xy && scale.is_none() {
                match property {
                    "x" => return Err(ConfigurationError::MissingScale { property: "x" }),
                    "y" => return Err(ConfigurationError::MissingScale { property: "y" }),
                    _ => {}
                }
            }
            let binding = PropertyBinding::new(Some(accessor.into()), scale.cloned());
            let old = st.bindings.insert(property.to_owned(), binding);
            (old, st.is_stacked_value(property))
        };

        if let Some(old_scale) = old.as_ref().and_then(PropertyBinding::scale) {
            if Some(old_scale) != scale {
                old_scale.remove_extent(self.inner.id, &ExtentKey::property(property));
                if stacked_value {
                    old_scale.remove_padding_exception(self.inner.id, &ExtentKey::Stacked);
                    old_scale.remove_extent(self.inner.id, &ExtentKey::Stacked);
                }
                if !self.inner.state.borrow().uses_scale(old_scale) {
                    old_scale.off_update(&self.inner.scale_changed);
                }
            }
        }
        if let Some(scale) = scale {
            scale.on_update(&self.inner.scale_changed);
        }
        tracing::debug!(plot = self.inner.id.0, property, "property bound");
        self.refresh();
        Ok(())
    }

    /// The binding of `property`; empty if it was never bound.
    pub fn binding(&self, property: &str) -> PropertyBinding {
        self.inner.state.borrow().binding(property)
    }

    /// The `x` binding.
    pub fn x(&self) -> PropertyBinding {
        self.binding("x")
    }

    /// The `y` binding.
    pub fn y(&self) -> PropertyBinding {
        self.binding("y")
    }

    /// Attaches `dataset` at the end of the attachment order.
    ///
    /// Attaching a dataset that is already attached moves it to the end.
    pub fn add_dataset(&self, dataset: &Dataset) {
        {
            let mut st = self.inner.state.borrow_mut();
            st.datasets.shift_remove(&dataset.id());
            st.datasets.insert(dataset.id(), dataset.clone());
        }
        dataset.on_update(&self.inner.dataset_changed);
        self.refresh();
    }

    /// Detaches `dataset`; a no-op if it is not attached.
    pub fn remove_dataset(&self, dataset: &Dataset) {
        let removed = self
            .inner
            .state
            .borrow_mut()
            .datasets
            .shift_remove(&dataset.id())
            .is_some();
        if removed {
            dataset.off_update(&self.inner.dataset_changed);
            self.refresh();
        }
    }

    /// Attached datasets, in attachment order.
    pub fn datasets(&self) -> Vec<Dataset> {
        self.inner.state.borrow().datasets()
    }

    /// Recomputes and republishes the extent of one property.
    pub fn recompute_extent(&self, property: &str) {
        let was = self.inner.adjusting.replace(true);
        self.publish_property(property);
        if self.inner.state.borrow().is_stacked_value(property) {
            self.publish_stacked();
        }
        self.inner.adjusting.set(was);
        if !was {
            self.settle(false);
        }
    }

    /// The current autorange mode.
    pub fn autorange_mode(&self) -> Autorange {
        self.inner.state.borrow().autorange
    }

    /// Sets the autorange mode from `"x"`, `"y"` or `"none"`.
    pub fn autorange(&self, mode: &str) -> Result<(), ConfigurationError> {
        self.set_autorange(mode.parse()?);
        Ok(())
    }

    /// Sets the autorange mode and adjusts the target axis right away.
    pub fn set_autorange(&self, mode: Autorange) {
        let changed = {
            let mut st = self.inner.state.borrow_mut();
            core::mem::replace(&mut st.autorange, mode) != mode
        };
        if changed {
            self.republish(true);
        } else if !self.inner.adjusting.get() {
            self.settle(true);
            self.request_render();
        }
    }

    /// The stacking orientation, if this plot stacks.
    pub fn stacking(&self) -> Option<Orientation> {
        self.inner.state.borrow().stacking
    }

    /// Republishes every extent and returns both axis scales to their auto domains.
    pub fn show_all_data(&self) {
        self.refresh();
        let (x, y) = {
            let st = self.inner.state.borrow();
            (
                st.binding("x").scale().cloned(),
                st.binding("y").scale().cloned(),
            )
        };
        for scale in [x, y].into_iter().flatten() {
            scale.auto_domain();
        }
    }

    /// Sets axis ranges for a plot area of `size`.
    ///
    /// `x` spans `[0, width]`. `y` spans `[height, 0]` so larger values sit higher, except on
    /// category scales, which list categories top to bottom.
    pub fn compute_layout(&self, size: Size) {
        let (x, y) = {
            let st = self.inner.state.borrow();
            (
                st.binding("x").scale().cloned(),
                st.binding("y").scale().cloned(),
            )
        };
        if let Some(x) = x {
            x.set_range((0.0, size.width));
        }
        if let Some(y) = y {
            if y.kind() == ScaleKind::Category {
                y.set_range((0.0, size.height));
            } else {
                y.set_range((size.height, 0.0));
            }
        }
    }

    /// Stack offsets from the latest recomputation (empty for non-stacking plots).
    pub fn stack_offsets(&self) -> StackOffsets {
        self.inner.state.borrow().layout.offsets().clone()
    }

    /// The full stack layout from the latest recomputation.
    pub fn stack_layout(&self) -> StackLayout {
        self.inner.state.borrow().layout.clone()
    }

    /// The stacked extent last published on the value scale.
    ///
    /// Restricted to visible records when autorange targets the value axis.
    pub fn stacked_extent(&self) -> (f64, f64) {
        self.inner.state.borrow().stacked_extent
    }

    /// Registers a render-request callback.
    pub fn on_render(&self, callback: &Callback<Self>) {
        self.inner.on_render.register(callback);
    }

    /// Unregisters a render-request callback.
    pub fn off_render(&self, callback: &Callback<Self>) {
        self.inner.on_render.unregister(callback);
    }

    /// Republishes every contribution, then runs the autorange pass.
    fn refresh(&self) {
        self.republish(false);
    }

    /// Like [`Self::refresh`]; with `release`, the autorange target also drops a manual domain.
    fn republish(&self, release: bool) {
        let was = self.inner.adjusting.replace(true);
        let names: Vec<String> = self.inner.state.borrow().bindings.keys().cloned().collect();
        for name in &names {
            self.publish_property(name);
        }
        self.publish_stacked();
        self.inner.adjusting.set(was);
        if !was {
            self.settle(release);
            self.request_render();
        }
    }

    fn scale_changed(&self, scale: &Scale) {
        let is_source = {
            let st = self.inner.state.borrow();
            st.autorange
                .source()
                .is_some_and(|s| st.binding(s).scale() == Some(scale))
        };
        if self.inner.adjusting.get() {
            if is_source {
                self.inner.pending.set(true);
            }
            return;
        }
        if is_source {
            self.settle(true);
        }
        self.request_render();
    }

    /// Repeats the autorange pass until no source-axis change arrives during it.
    ///
    /// Passes caused by a source-axis change always return the target scale to its auto domain;
    /// `release` does the same for the first pass.
    fn settle(&self, release: bool) {
        let mut release = release;
        for _ in 0..MAX_ADJUST_PASSES {
            self.inner.pending.set(false);
            self.adjust(release);
            if !self.inner.pending.get() {
                return;
            }
            release = true;
        }
        tracing::warn!(
            plot = self.inner.id.0,
            passes = MAX_ADJUST_PASSES,
            "autorange did not settle"
        );
    }

    fn adjust(&self, release: bool) {
        let (target, stacked, scale) = {
            let st = self.inner.state.borrow();
            let Some(target) = st.autorange.target() else {
                return;
            };
            (
                target,
                st.is_stacked_value(target),
                st.binding(target).scale().cloned(),
            )
        };
        let was = self.inner.adjusting.replace(true);
        self.publish_property(target);
        if stacked {
            self.publish_stacked();
        }
        if release && let Some(scale) = scale {
            scale.auto_domain();
        }
        self.inner.adjusting.set(was);
    }

    fn publish_property(&self, property: &str) {
        let (binding, datasets, visibility, stacked_value) = {
            let st = self.inner.state.borrow();
            (
                st.binding(property),
                st.datasets(),
                st.visibility(property),
                st.is_stacked_value(property),
            )
        };
        let Some(scale) = binding.scale() else {
            return;
        };
        let key = ExtentKey::property(property);
        // The stacked extent covers the value axis of a stacking plot.
        if stacked_value {
            scale.remove_extent(self.inner.id, &key);
            return;
        }
        let extent = binding.extent(property, &datasets, |r, i, ds| {
            accepts(visibility.as_ref(), r, i, ds)
        });
        match extent {
            Some(extent) => scale.update_extent(self.inner.id, key, extent),
            None => scale.remove_extent(self.inner.id, &key),
        }
    }

    fn publish_stacked(&self) {
        let (orientation, datasets, key, value, visibility) = {
            let st = self.inner.state.borrow();
            let Some(orientation) = st.stacking else {
                return;
            };
            let key_property = orientation.key_property();
            let value_property = orientation.value_property();
            (
                orientation,
                st.datasets(),
                st.binding(key_property)
                    .accessor()
                    .cloned()
                    .unwrap_or_else(|| Accessor::field(key_property)),
                st.binding(value_property),
                st.visibility(value_property),
            )
        };
        let value_accessor = value
            .accessor()
            .cloned()
            .unwrap_or_else(|| Accessor::field(orientation.value_property()));
        let layout = StackLayout::compute(&datasets, &key, &value_accessor);
        let extent = layout.extent_where(|r, i, ds| accepts(visibility.as_ref(), r, i, ds));
        {
            let mut st = self.inner.state.borrow_mut();
            st.layout = layout;
            st.stacked_extent = extent;
        }

        let Some(scale) = value.scale() else {
            return;
        };
        scale.add_padding_exception(self.inner.id, ExtentKey::Stacked, 0.0);
        scale.update_extent(
            self.inner.id,
            ExtentKey::Stacked,
            Domain::Continuous(extent.0, extent.1),
        );
    }

    fn request_render(&self) {
        self.inner.on_render.fire(self);
    }
}

impl Default for Plot {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Plot {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Plot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.inner.state.borrow();
        f.debug_struct("Plot")
            .field("id", &self.inner.id.0)
            .field("datasets", &st.datasets.len())
            .field("bindings", &st.bindings.keys().collect::<Vec<_>>())
            .field("autorange", &st.autorange)
            .field("stacking", &st.stacking)
            .finish_non_exhaustive()
    }
}

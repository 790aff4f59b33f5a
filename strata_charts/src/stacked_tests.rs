// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

extern crate std;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;

use kurbo::Size;
use strata_core::{Accessor, Dataset, Datum, Record, callback};

use crate::{Autorange, Domain, ExtentKey, Orientation, Plot, Scale, XyPlotSpec};

fn column(points: &[(f64, Datum)]) -> Dataset {
    Dataset::new(
        points
            .iter()
            .map(|(x, y)| Record::from([("x", Datum::from(*x)), ("y", y.clone())]))
            .collect::<Vec<_>>(),
    )
}

fn numeric(points: &[(f64, f64)]) -> Dataset {
    column(
        &points
            .iter()
            .map(|&(x, y)| (x, Datum::from(y)))
            .collect::<Vec<_>>(),
    )
}

fn stacked_bar(x: &Scale, y: &Scale, datasets: &[Dataset]) -> Plot {
    let mut spec = XyPlotSpec::new()
        .with_x(Accessor::field("x"), x)
        .with_y(Accessor::field("y"), y)
        .with_stacking(Orientation::Vertical);
    for ds in datasets {
        spec = spec.with_dataset(ds);
    }
    spec.build().unwrap()
}

fn fire_counter(scale: &Scale) -> Rc<Cell<usize>> {
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    scale.on_update(&callback(move |_: &Scale| h.set(h.get() + 1)));
    hits
}

#[test]
fn zero_uses_the_positive_offset_next_to_positive_values() {
    let (x, y) = (Scale::category(), Scale::linear());
    let ds: Vec<Dataset> = [1.0, 0.0, -1.0, 1.0, 0.0]
        .iter()
        .map(|&v| numeric(&[(1.0, v), (3.0, 1.0)]))
        .collect();
    let plot = stacked_bar(&x, &y, &ds);
    let offsets = plot.stack_offsets();
    assert_eq!(offsets.get(ds[1].id(), "1"), Some(1.0), "positive offset was used");
    assert_eq!(offsets.get(ds[4].id(), "1"), Some(2.0), "positive offset was used");
    assert_eq!(offsets.get(ds[4].id(), "3"), Some(4.0), "plain positive stack");
    assert_eq!(x.domain(), Domain::from(["1", "3"]), "category keys on x");
}

#[test]
fn zero_uses_the_negative_offset_when_every_value_is_non_positive() {
    let (x, y) = (Scale::category(), Scale::linear());
    let ds: Vec<Dataset> = [-2.0, 0.0, -1.0, 0.0]
        .iter()
        .map(|&v| numeric(&[(1.0, v)]))
        .collect();
    let plot = stacked_bar(&x, &y, &ds);
    let offsets = plot.stack_offsets();
    assert_eq!(offsets.get(ds[1].id(), "1"), Some(-2.0), "negative offset was used");
    assert_eq!(offsets.get(ds[3].id(), "1"), Some(-3.0), "negative offset was used");
}

#[test]
fn numeric_strings_stack_like_numbers() {
    let (x, y) = (Scale::category(), Scale::linear());
    let ds: Vec<Dataset> = ["-2", "3", "-1", "5", "1", "-1"]
        .iter()
        .map(|&v| column(&[(1.0, Datum::from(v))]))
        .collect();
    let plot = stacked_bar(&x, &y, &ds);
    let offsets = plot.stack_offsets();
    assert_eq!(offsets.get(ds[2].id(), "1"), Some(-2.0), "below the first negative");
    assert_eq!(offsets.get(ds[3].id(), "1"), Some(3.0), "above the first positive");
    assert_eq!(offsets.get(ds[4].id(), "1"), Some(8.0), "above both positives");
    assert_eq!(offsets.get(ds[5].id(), "1"), Some(-3.0), "below both negatives");
    assert_eq!(plot.stacked_extent(), (-4.0, 9.0), "stacked extent is as normal");
    assert_eq!(y.domain(), Domain::Continuous(-4.0, 9.0), "published on y");
}

#[test]
fn removing_the_last_dataset_leaves_an_empty_stack() {
    let (x, y) = (Scale::category(), Scale::linear());
    let plot = stacked_bar(&x, &y, &[]);
    assert_eq!(plot.stacked_extent(), (0.0, 0.0), "no datasets");
    assert_eq!(
        y.extent(plot.id(), &ExtentKey::Stacked),
        Some(Domain::Continuous(0.0, 0.0)),
        "the baseline is published"
    );

    let ds = numeric(&[(1.0, -2.0)]);
    plot.add_dataset(&ds);
    assert_eq!(plot.stacked_extent(), (-2.0, 0.0), "one negative bar");
    plot.remove_dataset(&ds);
    assert!(plot.stack_offsets().is_empty(), "no tables left");
    assert_eq!(plot.stacked_extent(), (0.0, 0.0), "baseline only");
    assert_eq!(y.extent_count(), 1, "only the stacked extent on y");
    assert_eq!(
        y.extent(plot.id(), &ExtentKey::Stacked),
        Some(Domain::Continuous(0.0, 0.0)),
        "baseline contribution"
    );
    assert_eq!(y.domain(), Domain::Continuous(-1.0, 1.0), "single value widened");
}

#[test]
fn an_empty_dataset_contributes_the_baseline() {
    let (x, y) = (Scale::category(), Scale::linear());
    let plot = stacked_bar(&x, &y, &[Dataset::empty()]);
    assert_eq!(plot.stacked_extent(), (0.0, 0.0), "nothing to stack");
    assert_eq!(
        y.extent(plot.id(), &ExtentKey::Stacked),
        Some(Domain::Continuous(0.0, 0.0)),
        "zero extent still published"
    );
    assert_eq!(y.domain(), Domain::Continuous(-1.0, 1.0), "around the baseline");
    drop(plot);
    assert_eq!(y.extent_count(), 0, "withdrawn on drop");
    assert_eq!(y.domain(), Domain::Continuous(0.0, 1.0), "default again");
}

#[test]
fn recomputing_unchanged_input_is_bit_identical() {
    let (x, y) = (Scale::category(), Scale::linear());
    let ds = [
        numeric(&[(1.0, 0.1), (2.0, -0.7)]),
        numeric(&[(1.0, 0.2), (2.0, 0.3)]),
        numeric(&[(1.0, -0.3), (2.0, -0.1)]),
    ];
    let plot = stacked_bar(&x, &y, &ds);
    let bits = |p: &Plot| -> Vec<u64> {
        p.stack_offsets()
            .iter()
            .flat_map(|(_, t)| t.values().map(|v| v.to_bits()).collect::<Vec<_>>())
            .collect()
    };
    let before = bits(&plot);
    let hits = fire_counter(&y);
    plot.recompute_extent("y");
    assert_eq!(bits(&plot), before, "offsets unchanged");
    assert_eq!(hits.get(), 0, "unchanged extent does not notify");
}

#[test]
fn stacked_extent_tracks_dataset_mutation() {
    let (x, y) = (Scale::category(), Scale::linear());
    let ds = numeric(&[(1.0, 4.0), (2.0, -6.0)]);
    let plot = stacked_bar(&x, &y, &[ds.clone()]);
    assert_eq!(plot.stacked_extent(), (-6.0, 4.0), "initial extent");
    ds.set_records(Vec::from([
        Record::from([("x", 1.0), ("y", 2.0)]),
        Record::from([("x", 2.0), ("y", -4.0)]),
    ]));
    assert_eq!(plot.stacked_extent(), (-4.0, 2.0), "extent follows the data");
    assert_eq!(y.domain(), Domain::Continuous(-4.0, 2.0), "and so does y");
}

#[test]
fn autorange_y_uses_the_visible_stack() {
    let x = Scale::linear();
    x.set_domain((1.0, 2.0)).unwrap();
    let y = Scale::linear().with_padding(0.05).with_nice(true);
    let a = numeric(&[(1.0, 1.0), (2.0, 2.0), (3.0, 8.0)]);
    let b = numeric(&[(1.0, 2.0), (2.0, 2.0), (3.0, 3.0)]);
    let plot = stacked_bar(&x, &y, &[a, b]);
    plot.compute_layout(Size::new(600.0, 400.0));
    assert_eq!(y.domain(), Domain::Continuous(0.0, 12.0), "whole stack without autorange");

    plot.autorange("y").unwrap();
    assert_eq!(plot.stacked_extent(), (0.0, 4.0), "x = 3 is out of view");
    assert_eq!(
        y.domain(),
        Domain::Continuous(0.0, 4.5),
        "auto scales takes stacking into account"
    );
}

#[test]
fn horizontal_stacks_autorange_on_x() {
    let y = Scale::linear();
    y.set_domain((1.0, 2.0)).unwrap();
    let x = Scale::linear().with_padding(0.05).with_nice(true);
    let swap = |points: &[(f64, f64)]| {
        Dataset::new(
            points
                .iter()
                .map(|&(k, v)| Record::from([("y", k), ("x", v)]))
                .collect::<Vec<_>>(),
        )
    };
    let plot = XyPlotSpec::new()
        .with_x(Accessor::field("x"), &x)
        .with_y(Accessor::field("y"), &y)
        .with_stacking(Orientation::Horizontal)
        .with_autorange(Autorange::X)
        .with_dataset(&swap(&[(1.0, 1.0), (2.0, 2.0), (3.0, 8.0)]))
        .with_dataset(&swap(&[(1.0, 2.0), (2.0, 2.0), (3.0, 3.0)]))
        .build()
        .unwrap();
    plot.compute_layout(Size::new(600.0, 400.0));
    assert_eq!(x.domain(), Domain::Continuous(0.0, 4.5), "x follows the visible rows");
    assert_eq!(y.domain(), Domain::Continuous(1.0, 2.0), "manual y untouched");
}

#[test]
fn plots_sharing_a_scale_union_their_stacks() {
    let (x, y) = (Scale::category(), Scale::linear());
    let tall = stacked_bar(&x, &y, &[numeric(&[(1.0, 10.0)]), numeric(&[(1.0, -5.0)])]);
    assert_eq!(y.domain(), Domain::Continuous(-5.0, 10.0), "first plot alone");

    let hits = fire_counter(&y);
    let short = stacked_bar(&x, &y, &[numeric(&[(2.0, 3.0)])]);
    assert_eq!(y.domain(), Domain::Continuous(-5.0, 10.0), "interior stack");
    assert_eq!(hits.get(), 0, "no notification for an interior contribution");
    assert_eq!(
        y.extent(short.id(), &ExtentKey::Stacked),
        Some(Domain::Continuous(0.0, 3.0)),
        "filed under its own id"
    );

    drop(tall);
    assert_eq!(y.domain(), Domain::Continuous(0.0, 3.0), "only the short stack remains");
    assert_eq!(hits.get(), 1, "withdrawal notifies once");
}

#[test]
fn cross_axis_autorange_settles() {
    let (x, y) = (Scale::linear(), Scale::linear());
    let a = numeric(&[(0.0, 0.0), (10.0, 10.0)]);
    let b = numeric(&[(0.0, 0.0), (5.0, 5.0)]);
    let by_y = XyPlotSpec::new()
        .with_x(Accessor::field("x"), &x)
        .with_y(Accessor::field("y"), &y)
        .with_dataset(&a)
        .with_autorange(Autorange::Y)
        .build()
        .unwrap();
    let by_x = XyPlotSpec::new()
        .with_x(Accessor::field("x"), &x)
        .with_y(Accessor::field("y"), &y)
        .with_dataset(&b)
        .with_autorange(Autorange::X)
        .build()
        .unwrap();
    let (x_hits, y_hits) = (fire_counter(&x), fire_counter(&y));

    a.set_records(Vec::from([
        Record::from([("x", 0.0), ("y", 0.0)]),
        Record::from([("x", 20.0), ("y", 20.0)]),
    ]));
    assert_eq!(x.domain(), Domain::Continuous(0.0, 20.0), "x widened");
    assert_eq!(y.domain(), Domain::Continuous(0.0, 20.0), "y widened");
    assert!(x_hits.get() <= 2 && y_hits.get() <= 2, "bounded notifications");

    // by_x returns x to its auto domain as soon as y moves.
    x.set_domain((0.0, 5.0)).unwrap();
    assert!(!x.is_manual(), "x released by the other plot");
    assert_eq!(x.domain(), Domain::Continuous(0.0, 20.0), "x back on the data");
    assert_eq!(y.domain(), Domain::Continuous(0.0, 20.0), "y settles with it");

    let (xs, ys) = (x_hits.get(), y_hits.get());
    by_y.recompute_extent("y");
    by_x.recompute_extent("x");
    assert_eq!((x_hits.get(), y_hits.get()), (xs, ys), "already at a fixed point");
}

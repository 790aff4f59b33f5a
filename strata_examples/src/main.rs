// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Example binary: a stacked bar chart that follows its data.
//!
//! Run with `RUST_LOG=strata_charts=debug` to watch scales recompute.

use kurbo::Size;
use strata_charts::{ConfigurationError, Orientation, Plot, Scale, XyPlotSpec};
use strata_core::{Accessor, Dataset, Datum, Record, callback};
use tracing_subscriber::EnvFilter;

fn quarter(values: [(&str, f64); 3]) -> Dataset {
    Dataset::new(
        values
            .iter()
            .map(|&(region, sales)| {
                Record::from([("region", Datum::from(region)), ("sales", Datum::from(sales))])
            })
            .collect::<Vec<_>>(),
    )
}

fn print_stack(plot: &Plot, x: &Scale, y: &Scale) {
    for point in plot.stack_layout().points() {
        let center = x.scale(&Datum::from(point.key.as_str()));
        let top = y.scale(&Datum::from(point.end()));
        let base = y.scale(&Datum::from(point.offset));
        println!(
            "  {:>6} {:+6.1} from {:+6.1}  ->  x {:?}  y {:?}..{:?}",
            point.key, point.value, point.offset, center, base, top
        );
    }
}

fn main() -> Result<(), ConfigurationError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let q1 = quarter([("north", 4.0), ("south", 2.5), ("west", -1.0)]);
    let q2 = quarter([("north", 3.0), ("south", 3.0), ("west", -2.0)]);
    let q3 = Dataset::new(vec![
        Record::from([("region", "north"), ("sales", "1.5")]),
        Record::from([("region", "south"), ("sales", "oops")]),
    ]);

    let x = Scale::category();
    let y = Scale::linear().with_padding(0.1).with_nice(true);
    let plot = XyPlotSpec::new()
        .with_x(Accessor::field("region"), &x)
        .with_y(Accessor::field("sales"), &y)
        .with_stacking(Orientation::Vertical)
        .with_dataset(&q1)
        .with_dataset(&q2)
        .with_dataset(&q3)
        .build()?;
    plot.on_render(&callback(|p: &Plot| {
        tracing::info!(extent = ?p.stacked_extent(), "render requested");
    }));
    plot.compute_layout(Size::new(640.0, 480.0));

    println!("x domain: {:?}", x.domain());
    println!("y domain: {:?}", y.domain());
    print_stack(&plot, &x, &y);

    println!("q2 revised:");
    q2.set_records(vec![
        Record::from([("region", Datum::from("north")), ("sales", Datum::from(9.0))]),
        Record::from([("region", Datum::from("east")), ("sales", Datum::from(-4.0))]),
    ]);
    println!("x domain: {:?}", x.domain());
    println!("y domain: {:?}", y.domain());
    println!("y ticks: {:?}", y.ticks(5));
    print_stack(&plot, &x, &y);

    if let Err(err) = plot.autorange("sideways") {
        tracing::warn!("{err}");
    }
    plot.autorange("none")?;
    Ok(())
}

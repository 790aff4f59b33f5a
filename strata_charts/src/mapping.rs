// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pure domain-to-range mappings.
//!
//! These are plain `Copy` values built from a [`crate::Scale`]'s current domain and range on
//! every call. They carry no identity or listeners, so renderers can hold on to them freely.

extern crate alloc;

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

/// Straight-line interpolation from a continuous domain onto a range.
///
/// Values outside the domain extrapolate along the same line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearMap {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearMap {
    /// Maps `domain` onto `range`; either may be reversed.
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Domain to range.
    pub fn apply(&self, v: f64) -> f64 {
        lerp(self.range, unlerp(self.domain, v))
    }

    /// Range to domain.
    pub fn invert(&self, y: f64) -> f64 {
        lerp(self.domain, unlerp(self.range, y))
    }
}

/// Position of `v` along `(a, b)`, as a fraction; degenerate spans pin to `0`.
fn unlerp((a, b): (f64, f64), v: f64) -> f64 {
    let span = b - a;
    if span == 0.0 { 0.0 } else { (v - a) / span }
}

fn lerp((a, b): (f64, f64), t: f64) -> f64 {
    a + (b - a) * t
}

/// Logarithmic mapping: a [`LinearMap`] over the logarithms of a positive domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogMap {
    base: f64,
    domain: (f64, f64),
    linear: LinearMap,
}

impl LogMap {
    /// Maps the positive `domain` onto `range` in log space.
    ///
    /// Bases that are not finite, not positive, or equal to 1 fall back to 10.
    pub fn new(base: f64, domain: (f64, f64), range: (f64, f64)) -> Self {
        let base = sanitize_base(base);
        let log = |v: f64| log_base(base, v);
        Self {
            base,
            domain,
            linear: LinearMap::new((log(domain.0), log(domain.1)), range),
        }
    }

    /// Domain to range; non-positive values land on the start of the range.
    pub fn apply(&self, v: f64) -> f64 {
        if v <= 0.0 || !self.linear.domain.0.is_finite() || !self.linear.domain.1.is_finite() {
            return self.linear.range.0;
        }
        self.linear.apply(log_base(self.base, v))
    }

    /// Range to domain.
    pub fn invert(&self, y: f64) -> f64 {
        self.base.powf(self.linear.invert(y))
    }

    /// Whole powers of the base inside the domain, at most `count` of them (`0` for no cap).
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = ordered(self.domain);
        if lo <= 0.0 || !hi.is_finite() {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut exp = (log_base(self.base, lo) - LOG_EPSILON).ceil();
        let last = (log_base(self.base, hi) + LOG_EPSILON).floor();
        while exp <= last && (count == 0 || out.len() < count) {
            out.push(self.base.powf(exp));
            exp += 1.0;
        }
        out
    }
}

/// Slack for logarithms of exact powers, which can land a hair off the integer.
const LOG_EPSILON: f64 = 1e-9;

fn log_base(base: f64, v: f64) -> f64 {
    v.ln() / base.ln()
}

/// Widens a positive `(lo, hi)` to whole powers of `base`.
pub(crate) fn nice_log_domain(base: f64, lo: f64, hi: f64) -> (f64, f64) {
    let (a, b) = ordered((lo, hi));
    let a = base.powf((log_base(base, a) + LOG_EPSILON).floor());
    let b = base.powf((log_base(base, b) - LOG_EPSILON).ceil());
    if lo > hi { (b, a) } else { (a, b) }
}

pub(crate) fn sanitize_base(base: f64) -> f64 {
    if base.is_finite() && base > 0.0 && base != 1.0 {
        base
    } else {
        10.0
    }
}

/// Evenly spaced bands for categorical axes.
///
/// Padding follows d3's band scale: both values are fractions of the step between band starts,
/// inner padding between bands and outer padding before the first and after the last one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandMap {
    start: f64,
    step: f64,
    band_width: f64,
    outer: f64,
}

impl BandMap {
    /// Lays out `count` bands from `range.0` towards `range.1`.
    pub fn new(range: (f64, f64), count: usize, inner: f64, outer: f64) -> Self {
        let inner = inner.clamp(0.0, 1.0);
        let outer = outer.max(0.0);
        let n = count as f64;
        let slots = (n - inner + 2.0 * outer).max(1.0);
        let step = (range.1 - range.0) / slots;
        Self {
            start: range.0,
            step,
            band_width: step.abs() * (1.0 - inner),
            outer,
        }
    }

    /// Width of every band.
    pub fn band_width(&self) -> f64 {
        self.band_width
    }

    /// Distance between the starts of neighbouring bands (negative on inverted ranges).
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Center of the band at `index`.
    pub fn center(&self, index: usize) -> f64 {
        let leading = self.start + self.step * (self.outer + index as f64);
        let half = self.band_width / 2.0;
        if self.step < 0.0 { leading - half } else { leading + half }
    }
}

const SQRT_50: f64 = 7.071_067_811_865_475;
const SQRT_10: f64 = 3.162_277_660_168_379_5;

/// Step between nice ticks covering `(lo, hi)` with about `count` intervals.
///
/// Positive steps are whole multiples of a power of ten; negative ones stand for the step
/// `1 / -step`, which keeps fractional steps exact (d3's tick increment).
fn tick_increment(lo: f64, hi: f64, count: usize) -> f64 {
    let raw = (hi - lo) / count.max(1) as f64;
    if !raw.is_finite() || raw <= 0.0 {
        return 0.0;
    }
    let power = raw.log10().floor();
    let error = raw / 10_f64.powf(power);
    let factor = if error >= SQRT_50 {
        10.0
    } else if error >= SQRT_10 {
        5.0
    } else if error >= core::f64::consts::SQRT_2 {
        2.0
    } else {
        1.0
    };
    if power >= 0.0 {
        factor * 10_f64.powf(power)
    } else {
        -(10_f64.powf(-power)) / factor
    }
}

/// Snaps `(lo, hi)` outward to tick boundaries, keeping the direction of the input.
pub(crate) fn nice_domain(lo: f64, hi: f64, count: usize) -> (f64, f64) {
    let reversed = lo > hi;
    let (mut a, mut b) = ordered((lo, hi));
    let mut previous = 0.0;
    // The step can shrink once after widening; two passes settle it.
    for _ in 0..3 {
        let inc = tick_increment(a, b, count);
        if inc == 0.0 || inc == previous {
            break;
        }
        if inc > 0.0 {
            a = (a / inc).floor() * inc;
            b = (b / inc).ceil() * inc;
        } else {
            a = (a * -inc).floor() / -inc;
            b = (b * -inc).ceil() / -inc;
        }
        previous = inc;
    }
    if reversed { (b, a) } else { (a, b) }
}

/// Nice tick values inside `(lo, hi)`, ascending.
pub(crate) fn nice_ticks(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    let (lo, hi) = ordered((lo, hi));
    if count == 0 || !lo.is_finite() || !hi.is_finite() {
        return Vec::new();
    }
    if lo == hi {
        return alloc::vec![lo];
    }
    let inc = tick_increment(lo, hi, count);
    let mut out = Vec::new();
    if inc > 0.0 {
        let mut i = (lo / inc).ceil();
        let last = (hi / inc).floor();
        while i <= last {
            out.push(i * inc);
            i += 1.0;
        }
    } else if inc < 0.0 {
        let k = -inc;
        let mut i = (lo * k).ceil();
        let last = (hi * k).floor();
        while i <= last {
            out.push(i / k);
            i += 1.0;
        }
    }
    out
}

fn ordered((a, b): (f64, f64)) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn linear_extrapolates_and_inverts() {
        let m = LinearMap::new((0.0, 10.0), (100.0, 0.0));
        assert_eq!(m.apply(5.0), 50.0, "midpoint");
        assert_eq!(m.apply(20.0), -100.0, "beyond the high end");
        assert_eq!(m.invert(25.0), 7.5, "inverse");
        assert_eq!(LinearMap::new((3.0, 3.0), (0.0, 1.0)).apply(9.0), 0.0, "degenerate domain");
    }

    #[test]
    fn log_maps_decades_evenly() {
        let m = LogMap::new(10.0, (1.0, 100.0), (0.0, 10.0));
        assert!((m.apply(10.0) - 5.0).abs() < 1e-9, "one decade in");
        assert!((m.invert(5.0) - 10.0).abs() < 1e-9, "midpoint inverts to 10");
        assert_eq!(m.apply(-3.0), 0.0, "non-positive input");
        assert_eq!(m.ticks(0), [1.0, 10.0, 100.0], "powers of ten");
        assert_eq!(nice_log_domain(10.0, 3.0, 1000.0), (1.0, 1000.0), "whole decades");
    }

    #[test]
    fn bands_follow_the_range_direction() {
        let down = BandMap::new((100.0, 0.0), 2, 0.0, 0.0);
        assert_eq!((down.center(0), down.center(1)), (75.0, 25.0), "inverted range");
        let padded = BandMap::new((0.0, 100.0), 4, 0.2, 0.1);
        assert!(padded.band_width() < padded.step(), "inner padding leaves gaps");
        assert!(padded.center(0) > padded.band_width() / 2.0, "outer padding shifts the first band");
    }

    #[test]
    fn nice_domain_rounds_outward() {
        assert_eq!(nice_domain(0.0, 4.1, 10), (0.0, 4.5), "half steps");
        assert_eq!(nice_domain(-0.1, 4.1, 10), (-0.5, 4.5), "both ends");
        assert_eq!(nice_domain(0.3, 9.2, 10), (0.0, 10.0), "unit steps");
        assert_eq!(nice_domain(9.2, 0.3, 10), (10.0, 0.0), "reversed input stays reversed");
    }

    #[test]
    fn ticks_stay_inside_the_domain() {
        assert_eq!(nice_ticks(0.0, 1.0, 5), [0.0, 0.2, 0.4, 0.6, 0.8, 1.0], "fifths");
        assert_eq!(nice_ticks(-3.0, 12.0, 3), [0.0, 5.0, 10.0], "tens");
        assert!(nice_ticks(0.0, 1.0, 0).is_empty(), "no ticks requested");
    }
}

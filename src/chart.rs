//! Axis rounding for plotting acquired spectra.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
    pub major_tick: f64,
    /// Suggested minor subdivisions per major tick
    pub minor_ticks: u32,
}

/// Decimal exponent of the leading digit (`fexp(452.0) == 2`); zero maps to 0
fn fexp(value: f64) -> i32 {
    let magnitude = value.abs();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return 0;
    }
    let mut exponent = magnitude.log10().floor() as i32;
    // log10 can land a hair off at exact powers of ten
    if 10f64.powi(exponent) > magnitude {
        exponent -= 1;
    } else if 10f64.powi(exponent + 1) <= magnitude {
        exponent += 1;
    }
    exponent
}

/// Mantissa in [1, 10) (`fman(452.0) == 4.52`)
fn fman(value: f64) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    value / 10f64.powi(fexp(value))
}

/// IEEE remainder: `x - n*y` with `n` the integer nearest `x/y`
fn ieee_remainder(x: f64, y: f64) -> f64 {
    x - (x / y).round_ties_even() * y
}

/// Round `[min, max]` to chart-friendly bounds with roughly `n_ticks` major
/// ticks of 1, 2, 5 or 10 times a power of ten.
pub fn get_bounds_and_ticks(min: f64, max: f64, n_ticks: u32) -> AxisBounds {
    let step = (max - min) / n_ticks.max(1) as f64;
    let basic_tick = fman(step);
    let tick_power = 10f64.powi(fexp(step));

    let (major_tick, minor_ticks) = if basic_tick < 1.5 {
        (tick_power, 4)
    } else if basic_tick < 2.5 {
        (2.0 * tick_power, 4)
    } else if basic_tick < 7.5 {
        (5.0 * tick_power, 5)
    } else {
        (10.0 * tick_power, 4)
    };

    let mut good_min =
        fman(min - ieee_remainder(min, major_tick)).floor() * 10f64.powi(fexp(min));
    if good_min > 0.0 && good_min <= 0.1 {
        good_min = 0.0;
    }
    let good_max = fman(max + major_tick) * 10f64.powi(fexp(max));

    AxisBounds {
        min: good_min,
        max: good_max,
        major_tick,
        minor_ticks,
    }
}

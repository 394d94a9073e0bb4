//! Y-axis tick generation

/// Pick a "nice" tick interval (1, 2 or 5 × 10ⁿ) for roughly five steps and
/// snap the axis start and end to it.
pub fn calculate_y_axis_interval(min: f64, max: f64) -> (f64, f64, f64) {
    let range = max - min;
    if range <= 0.0 {
        return (1.0, min.floor(), min.ceil() + 1.0); // Default case for flat range
    }

    let target_intervals = 5.0;
    let raw_interval = range / target_intervals;

    let exponent = raw_interval.log10().floor();
    let base = 10f64.powf(exponent);
    let fraction = raw_interval / base;

    let nice_fraction = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };

    let interval = nice_fraction * base;

    let start = (min / interval).floor() * interval;
    let end = (max / interval).ceil() * interval;

    (interval, start, end)
}

/// Tick values that fall inside `[min, max]`
pub fn y_ticks(min: f64, max: f64) -> Vec<f64> {
    let (interval, start, end) = calculate_y_axis_interval(min, max);
    let eps = interval * 1e-9;
    let steps = ((end - start) / interval).round() as i64;
    let decimals = (-interval.log10()).ceil().max(0.0) as usize;

    (0..=steps)
        .map(|i| start + i as f64 * interval)
        // Snap away float noise such as 0.30000000000000004
        .map(|v| format!("{v:.decimals$}").parse::<f64>().unwrap_or(v))
        .filter(|v| *v >= min - eps && *v <= max + eps)
        .collect()
}

/// Short label for a tick value
pub fn format_tick(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{value:.4}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

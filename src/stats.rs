//! Rolling-window and summary statistics over aligned `f64` series.
//!
//! All rolling functions return a vector aligned with the input: `None`
//! until the minimum-periods threshold is met, `Some` afterwards. Windows
//! are trailing and end at the current index; nothing looks ahead.

/// Arithmetic mean. Returns `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (ddof = 1). Needs at least two observations.
pub fn stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>()
        / (values.len() as f64 - 1.0);
    Some(variance.sqrt())
}

/// Trailing rolling mean over a running sum, subtracting the value that
/// falls out of the window. A single observation is enough, so the result
/// is defined at every index.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        let count = (i + 1).min(window);
        out.push(sum / count as f64);
    }
    out
}

/// Trailing rolling sample stdev over an `Option` series. Only non-null
/// entries inside the window count toward `min_periods`; the result is null
/// until enough of them exist (and never defined from fewer than two).
pub fn rolling_std(
    values: &[Option<f64>],
    window: usize,
    min_periods: usize,
) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(window);
            let present: Vec<f64> = values[start..=i].iter().flatten().copied().collect();
            if present.len() >= min_periods.max(2) {
                stdev(&present)
            } else {
                None
            }
        })
        .collect()
}

/// First and third quartiles with linear interpolation between order
/// statistics, matching the usual dataframe `quantile` behavior.
pub fn quartiles(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some((quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75)))
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_stdev_known_values() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        // Sample stdev of this classic series is sqrt(32/7).
        let sd = stdev(&values).unwrap();
        assert!((sd - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn stdev_undefined_below_two_observations() {
        assert_eq!(stdev(&[]), None);
        assert_eq!(stdev(&[1.0]), None);
    }

    #[test]
    fn rolling_mean_is_defined_from_the_first_row() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let out = rolling_mean(&values, 3);
        assert_eq!(out, vec![1.0, 1.5, 2.0, 3.0]);
    }

    #[test]
    fn rolling_mean_window_wider_than_series() {
        let out = rolling_mean(&[10.0, 20.0], 5);
        assert_eq!(out, vec![10.0, 15.0]);
    }

    #[test]
    fn rolling_std_skips_nulls_in_window() {
        let values = [None, Some(1.0), Some(3.0), None, Some(5.0)];
        let out = rolling_std(&values, 5, 2);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        // Two observations {1, 3}: sample stdev sqrt(2).
        assert!((out[2].unwrap() - 2.0_f64.sqrt()).abs() < 1e-12);
        // Window still {1, 3} at the null slot.
        assert!((out[3].unwrap() - 2.0_f64.sqrt()).abs() < 1e-12);
        // {1, 3, 5}: sample stdev 2.
        assert!((out[4].unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn rolling_std_is_trailing_only() {
        let values: Vec<Option<f64>> = (0..6).map(|i| Some(i as f64)).collect();
        let out = rolling_std(&values, 3, 2);
        // At index 2 the window is {0, 1, 2}, stdev 1.0; later values must
        // not affect it.
        assert!((out[2].unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn quartiles_interpolate_linearly() {
        let (q1, q3) = quartiles(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((q1 - 1.75).abs() < 1e-12);
        assert!((q3 - 3.25).abs() < 1e-12);
    }
}

//! Standard deviation helper for band indicators.
//!
//! Population standard deviation (divides by N, not N-1):
//! sqrt(sum((x - mean)^2) / N)

/// Population mean and standard deviation of `window`.
///
/// Returns `(0.0, 0.0)` for an empty window.
pub fn mean_and_stddev(window: &[f64]) -> (f64, f64) {
    if window.is_empty() {
        return (0.0, 0.0);
    }
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|x| {
            let diff = x - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

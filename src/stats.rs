//! Numeric helpers for latency and throughput figures.

/// Arithmetic mean of a slice of samples.
///
/// Returns 0.0 for an empty slice.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Population standard deviation of a slice of samples.
///
/// Jitter is reported as the population standard deviation of the
/// latency samples (divisor n, not n-1). Returns 0.0 for an empty
/// slice.
pub fn std_deviation(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let mean = mean(samples);
    let variance = samples
        .iter()
        .map(|sample| {
            let diff = sample - mean;
            diff * diff
        })
        .sum::<f64>()
        / samples.len() as f64;

    variance.sqrt()
}

/// Aggregate transfer speed in megabits per second.
///
/// Decimal megabits (1,000,000 bits). Returns 0.0 when `elapsed_secs`
/// is not positive.
pub fn speed_mbps(bytes: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }

    (bytes as f64 * 8.0) / (elapsed_secs * 1e6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_mean_single_sample() {
        assert_eq!(mean(&[42.0]), 42.0);
    }

    #[test]
    fn test_mean_multiple_samples() {
        assert_eq!(mean(&[10.0, 20.0, 30.0, 40.0, 50.0]), 30.0);
    }

    #[test]
    fn test_std_deviation_empty() {
        assert_eq!(std_deviation(&[]), 0.0);
    }

    #[test]
    fn test_std_deviation_constant_samples() {
        assert_eq!(std_deviation(&[25.0, 25.0, 25.0, 25.0]), 0.0);
    }

    #[test]
    fn test_std_deviation_population_divisor() {
        // Population variance of [10, 20, 30, 40, 50] is 200, so the
        // deviation is sqrt(200). The sample (n-1) divisor would give
        // sqrt(250) ~ 15.81 instead.
        let samples = [10.0, 20.0, 30.0, 40.0, 50.0];
        let deviation = std_deviation(&samples);
        assert!((deviation - 14.142135623730951).abs() < 1e-12);
    }

    #[test]
    fn test_std_deviation_single_sample() {
        assert_eq!(std_deviation(&[18.5]), 0.0);
    }

    #[test]
    fn test_speed_mbps_reference_values() {
        // 1,000,000 bytes over 8 seconds is exactly 1 Mbps.
        assert_eq!(speed_mbps(1_000_000, 8.0), 1.0);
        assert_eq!(speed_mbps(2_500_000, 1.0), 20.0);
    }

    #[test]
    fn test_speed_mbps_zero_elapsed() {
        assert_eq!(speed_mbps(1_000_000, 0.0), 0.0);
    }
}

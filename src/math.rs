//! Small numeric helpers shared across the search pipeline.

/// First power of two >= `x`, or `None` on overflow.
pub fn next2_to_n(x: usize) -> Option<usize> {
    x.checked_next_power_of_two()
}

/// Compute the median of a slice (ignoring non-finite values).
pub fn median(xs: &[f64]) -> f64 {
    let mut finite: Vec<f64> = xs.iter().copied().filter(|x| x.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.sort_by(|x, y| x.total_cmp(y));
    finite[finite.len() / 2]
}

/// Convert an aliased Fourier frequency into the true frequency of a signal
/// (or back; the transformation is symmetric about the Nyquist frequency
/// `rny`, which for an FFT of real data is half the number of points).
pub fn alias(r: f64, rny: f64) -> f64 {
    2.0 * rny - r
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_next2_to_n() {
        assert_eq!(next2_to_n(1), Some(1));
        assert_eq!(next2_to_n(5), Some(8));
        assert_eq!(next2_to_n(1024), Some(1024));
        assert_eq!(next2_to_n(usize::MAX), None);
    }

    #[test]
    fn test_median() {
        let xs = vec![5., 1., f64::NAN, 4., 2., 3.];
        assert_eq!(median(&xs), 3.0);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_alias_round_trip() {
        let rny = 512.0;
        let r = 100.25;
        assert_eq!(alias(alias(r, rny), rny), r);
        assert_eq!(alias(r, rny), 923.75);
    }
}

//! Complex correlation of drift kernels against a spectrum window.
//!
//! The heavy path spreads a window of the spectrum onto an interpolated
//! grid, transforms it once, multiplies by the conjugate transform of the
//! kernel and inverse-transforms, yielding a whole row of interpolated
//! amplitudes per FFT pair. A direct tap-by-tap path (`rz_interp`) serves
//! single-point lookups such as peak refinement.

use std::sync::Arc;

use num_complex::{Complex, Complex64};
use num_traits::Float;
use rustfft::{Fft, FftNum, FftPlanner};

use crate::kernel::{gen_response, z_resp_halfwidth, Accuracy};
use crate::{SearchError, MAX_FFT_LEN};

pub(crate) fn from_c64<T: FftNum>(c: Complex64) -> Complex<T> {
    Complex::new(
        T::from_f64(c.re).unwrap_or_else(T::zero),
        T::from_f64(c.im).unwrap_or_else(T::zero),
    )
}

pub(crate) fn to_c64<T: FftNum + Float>(c: Complex<T>) -> Complex64 {
    Complex64::new(c.re.to_f64().unwrap_or(0.0), c.im.to_f64().unwrap_or(0.0))
}

/// Correlates drift kernels against a spectrum window with a fixed padded
/// transform length, producing interpolated amplitudes spaced
/// `1/numbetween` bins apart.
pub struct Correlator<T: FftNum> {
    fft_len: usize,
    numbetween: usize,
    half_width: usize,
    forward: Arc<dyn Fft<T>>,
    inverse: Arc<dyn Fft<T>>,
}

impl<T: FftNum + Float> Correlator<T> {
    /// Plans both transforms. `fft_len` must be a power of two strictly
    /// larger than the kernel support `2 * numbetween * half_width`.
    pub fn new(fft_len: usize, numbetween: usize, half_width: usize) -> Result<Self, SearchError> {
        if numbetween == 0 || half_width == 0 {
            return Err(SearchError::InvalidRequest(
                "numbetween and half_width must be positive".into(),
            ));
        }
        if !fft_len.is_power_of_two() || fft_len <= 2 * numbetween * half_width {
            return Err(SearchError::InvalidRequest(format!(
                "fft length {fft_len} must be a power of two exceeding the kernel support {}",
                2 * numbetween * half_width
            )));
        }
        if fft_len > MAX_FFT_LEN {
            return Err(SearchError::TransformTooLarge {
                required: fft_len,
                max: MAX_FFT_LEN,
            });
        }
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);
        Ok(Self {
            fft_len,
            numbetween,
            half_width,
            forward,
            inverse,
        })
    }

    /// Longest run of outputs untouched by circular wraparound.
    pub fn max_out_len(&self) -> usize {
        self.fft_len - 2 * self.numbetween * self.half_width
    }

    pub fn fft_len(&self) -> usize {
        self.fft_len
    }

    /// Interpolated amplitudes for one fixed `z`, sampled at `out_len`
    /// points spaced `1/numbetween` bins apart starting at `start_bin`.
    /// Bins outside the spectrum contribute zero.
    pub fn correlate(
        &self,
        spectrum: &[Complex<T>],
        start_bin: i64,
        z: f64,
        out_len: usize,
    ) -> Result<Vec<Complex<T>>, SearchError> {
        if spectrum.is_empty() {
            return Err(SearchError::InvalidRequest("empty spectrum".into()));
        }
        if out_len == 0 || out_len > self.max_out_len() {
            return Err(SearchError::InvalidRequest(format!(
                "out_len {out_len} outside the valid range 1..={}",
                self.max_out_len()
            )));
        }
        let nb = self.numbetween;
        let hw = self.half_width;

        // Spread the window onto the interpolated grid: data bin (lo + j)
        // lands at slot j * numbetween, zeros in between.
        let lo = start_bin - hw as i64;
        let mut data = vec![Complex::<T>::new(T::zero(), T::zero()); self.fft_len];
        let mut j = 0usize;
        while j * nb < self.fft_len {
            let bin = lo + j as i64;
            if bin >= 0 && (bin as usize) < spectrum.len() {
                data[j * nb] = spectrum[bin as usize];
            }
            j += 1;
        }

        // One kernel per z row; its support occupies slots 0..=2*nb*hw with
        // the center tap at slot nb*hw, which bakes the window offset into
        // the correlation so output m is already r = start_bin + m/nb.
        let taps = gen_response(nb, hw, z);
        let mut kern = vec![Complex::<T>::new(T::zero(), T::zero()); self.fft_len];
        for (slot, tap) in taps.into_iter().enumerate() {
            kern[slot] = from_c64(tap);
        }

        self.forward.process(&mut data);
        self.forward.process(&mut kern);
        let scale = T::from_f64(1.0 / self.fft_len as f64).unwrap_or_else(T::one);
        for (d, k) in data.iter_mut().zip(kern.iter()) {
            *d = *d * k.conj() * scale;
        }
        self.inverse.process(&mut data);

        data.truncate(out_len);
        Ok(data)
    }
}

/// Interpolated amplitude at a single (r, z) point by direct summation over
/// the kernel taps. Slower per point than [`Correlator::correlate`] but has
/// no setup cost, and accumulates in double precision.
pub fn rz_interp<T: FftNum + Float>(
    spectrum: &[Complex<T>],
    r: f64,
    z: f64,
    accuracy: Accuracy,
) -> Result<Complex<T>, SearchError> {
    if spectrum.is_empty() {
        return Err(SearchError::InvalidRequest("empty spectrum".into()));
    }
    if !r.is_finite() || !z.is_finite() {
        return Err(SearchError::InvalidRequest(
            "r and z must be finite".into(),
        ));
    }
    let hw = z_resp_halfwidth(z, accuracy) as f64;
    let lo = (r - hw).ceil() as i64;
    let hi = (r + hw).floor() as i64;
    let mut acc = Complex64::new(0.0, 0.0);
    for bin in lo..=hi {
        if bin < 0 || bin as usize >= spectrum.len() {
            continue;
        }
        let q = bin as f64 - r + 0.5 * z;
        let resp = crate::kernel::response_at(q, z);
        acc += to_c64(spectrum[bin as usize]) * resp.conj();
    }
    Ok(from_c64(acc))
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use rand::prelude::*;

    fn noise_spectrum(len: usize, seed: u64) -> Vec<Complex64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len)
            .map(|_| Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
            .collect()
    }

    #[test]
    fn test_zero_drift_identity_on_native_grid() {
        // numbetween = 1 and z = 0 makes the kernel a unit impulse, so the
        // correlation must hand back the untouched spectrum slice.
        let spec = noise_spectrum(256, 7);
        let corr = Correlator::<f64>::new(64, 1, 3).unwrap();
        let out = corr.correlate(&spec, 40, 0.0, 32).unwrap();
        assert_eq!(out.len(), 32);
        for (i, v) in out.iter().enumerate() {
            assert!(
                (v - spec[40 + i]).norm() < 1e-10,
                "bin {i} diverged: {v} vs {}",
                spec[40 + i]
            );
        }
    }

    #[test]
    fn test_fft_path_matches_direct_path() {
        let spec = noise_spectrum(512, 11);
        let nb = 4;
        let corr = Correlator::<f64>::new(256, nb, 3).unwrap();
        for z in [0.0, 2.5, -2.5] {
            let hw = z_resp_halfwidth(z, Accuracy::Low);
            assert_eq!(hw, 3);
            let out = corr.correlate(&spec, 100, z, 64).unwrap();
            for m in [0usize, 13, 63] {
                let r = 100.0 + m as f64 / nb as f64;
                let direct = rz_interp(&spec, r, z, Accuracy::Low).unwrap();
                assert!(
                    (out[m] - direct).norm() < 1e-9,
                    "z = {z}, m = {m}: {} vs {direct}",
                    out[m]
                );
            }
        }
    }

    #[test]
    fn test_window_edges_are_zero_padded() {
        let spec = noise_spectrum(16, 3);
        let corr = Correlator::<f64>::new(64, 1, 3).unwrap();
        // Asking past the end of the spectrum: must still succeed, with the
        // out-of-range bins treated as zero.
        let out = corr.correlate(&spec, 10, 0.0, 16).unwrap();
        for (i, v) in out.iter().enumerate().take(6) {
            assert!((v - spec[10 + i]).norm() < 1e-10);
        }
        for v in out.iter().skip(6) {
            assert!(v.norm() < 1e-10);
        }
    }

    #[test]
    fn test_out_len_guard() {
        let spec = noise_spectrum(64, 5);
        let corr = Correlator::<f64>::new(64, 2, 3).unwrap();
        assert_eq!(corr.max_out_len(), 64 - 12);
        assert!(matches!(
            corr.correlate(&spec, 8, 0.0, 53),
            Err(SearchError::InvalidRequest(_))
        ));
        assert!(corr.correlate(&spec, 8, 0.0, 52).is_ok());
    }

    #[test]
    fn test_rejects_empty_spectrum() {
        let corr = Correlator::<f64>::new(32, 1, 3).unwrap();
        assert!(matches!(
            corr.correlate(&[], 0, 0.0, 4),
            Err(SearchError::InvalidRequest(_))
        ));
        assert!(matches!(
            rz_interp::<f64>(&[], 10.0, 0.0, Accuracy::Low),
            Err(SearchError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_oversized_plan_rejected() {
        assert!(matches!(
            Correlator::<f32>::new(MAX_FFT_LEN * 2, 1, 3),
            Err(SearchError::TransformTooLarge { .. })
        ));
    }
}

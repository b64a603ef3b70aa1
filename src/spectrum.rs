//! Runtime-typed spectra: the boundary between callers (who may hold
//! single- or double-precision FFTs) and the generic search core.
//!
//! Convention: a spectrum holds the positive-frequency half of the FFT of a
//! real-valued time series, with the purely real Nyquist amplitude packed
//! into the imaginary part of bin 0. Searches should stay a kernel
//! half-width away from bin 0 so the packed value never enters a window.

use num_complex::Complex;
use realfft::RealFftPlanner;
use rustfft::FftNum;

use crate::kernel::Accuracy;
use crate::peak::{locate, maximize_r, maximize_rz, PeakResult};
use crate::plane::{ffdot_plane, PlaneRaster, PlaneRequest};
use crate::SearchError;

/// A complex spectrum in either precision. The two variants are never
/// silently coerced; combining them in one call is a precision mismatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Spectrum {
    Single(Vec<Complex<f32>>),
    Double(Vec<Complex<f64>>),
}

/// An F-Fdot raster in the precision of the spectrum it was built from.
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    Single(PlaneRaster<f32>),
    Double(PlaneRaster<f64>),
}

fn pack_real_fft<T: FftNum>(samples: &[T]) -> Result<Vec<Complex<T>>, SearchError> {
    if samples.len() < 4 || samples.len() % 2 != 0 {
        return Err(SearchError::InvalidRequest(
            "real input must have an even length of at least 4".into(),
        ));
    }
    let mut planner = RealFftPlanner::<T>::new();
    let r2c = planner.plan_fft_forward(samples.len());
    let mut input = samples.to_vec();
    let mut output = r2c.make_output_vec();
    r2c.process(&mut input, &mut output)
        .map_err(|e| SearchError::InvalidRequest(e.to_string()))?;
    // Nyquist is purely real; fold it into bin 0's unused imaginary part.
    let nyquist = output[samples.len() / 2].re;
    output.truncate(samples.len() / 2);
    output[0].im = nyquist;
    Ok(output)
}

impl Spectrum {
    /// Forward real FFT of a single-precision time series, Nyquist-packed.
    pub fn from_real_f32(samples: &[f32]) -> Result<Self, SearchError> {
        Ok(Spectrum::Single(pack_real_fft(samples)?))
    }

    /// Forward real FFT of a double-precision time series, Nyquist-packed.
    pub fn from_real_f64(samples: &[f64]) -> Result<Self, SearchError> {
        Ok(Spectrum::Double(pack_real_fft(samples)?))
    }

    pub fn len(&self) -> usize {
        match self {
            Spectrum::Single(bins) => bins.len(),
            Spectrum::Double(bins) => bins.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Power of every bin, computed in double precision on both paths so
    /// equivalent single and double spectra yield identical values.
    pub fn power(&self) -> Vec<f64> {
        match self {
            Spectrum::Single(bins) => bins
                .iter()
                .map(|c| {
                    let (re, im) = (c.re as f64, c.im as f64);
                    re * re + im * im
                })
                .collect(),
            Spectrum::Double(bins) => bins.iter().map(|c| c.re * c.re + c.im * c.im).collect(),
        }
    }

    /// Spectral phase in degrees of every bin.
    pub fn phase_deg(&self) -> Vec<f64> {
        match self {
            Spectrum::Single(bins) => bins
                .iter()
                .map(|c| (c.im as f64).atan2(c.re as f64).to_degrees())
                .collect(),
            Spectrum::Double(bins) => bins.iter().map(|c| c.im.atan2(c.re).to_degrees()).collect(),
        }
    }

    /// Build the interpolated F-Fdot plane for `request`, in this
    /// spectrum's precision.
    pub fn ffdot_plane(
        &self,
        request: &PlaneRequest,
        accuracy: Accuracy,
    ) -> Result<Raster, SearchError> {
        match self {
            Spectrum::Single(bins) => Ok(Raster::Single(ffdot_plane(bins, request, accuracy)?)),
            Spectrum::Double(bins) => Ok(Raster::Double(ffdot_plane(bins, request, accuracy)?)),
        }
    }

    /// Off-grid peak refinement; see [`crate::peak::maximize_rz`].
    pub fn maximize_rz(&self, r: f64, z: f64, norm: Option<f64>) -> Result<PeakResult, SearchError> {
        match self {
            Spectrum::Single(bins) => maximize_rz(bins, r, z, norm),
            Spectrum::Double(bins) => maximize_rz(bins, r, z, norm),
        }
    }

    /// Frequency-only peak refinement; see [`crate::peak::maximize_r`].
    pub fn maximize_r(&self, r: f64, norm: Option<f64>) -> Result<PeakResult, SearchError> {
        match self {
            Spectrum::Single(bins) => maximize_r(bins, r, norm),
            Spectrum::Double(bins) => maximize_r(bins, r, norm),
        }
    }
}

impl Raster {
    pub fn numr(&self) -> usize {
        match self {
            Raster::Single(raster) => raster.numr(),
            Raster::Double(raster) => raster.numr(),
        }
    }

    pub fn numz(&self) -> usize {
        match self {
            Raster::Single(raster) => raster.numz(),
            Raster::Double(raster) => raster.numz(),
        }
    }

    /// Row-major cell powers, double precision on both paths.
    pub fn power(&self) -> Vec<f64> {
        match self {
            Raster::Single(raster) => raster.power(),
            Raster::Double(raster) => raster.power(),
        }
    }

    /// Locate the peak against the spectrum the raster was built from.
    /// The raster and spectrum must be the same precision.
    pub fn locate(
        &self,
        spectrum: &Spectrum,
        norm: Option<f64>,
    ) -> Result<PeakResult, SearchError> {
        match (self, spectrum) {
            (Raster::Single(raster), Spectrum::Single(bins)) => locate(raster, bins, norm),
            (Raster::Double(raster), Spectrum::Double(bins)) => locate(raster, bins, norm),
            _ => Err(SearchError::PrecisionMismatch(
                "raster and spectrum precisions differ",
            )),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    fn tone_signal(n: usize, r0: f64) -> Vec<f64> {
        (0..n)
            .map(|t| (2.0 * std::f64::consts::PI * r0 * t as f64 / n as f64).cos())
            .collect()
    }

    #[test]
    fn test_nyquist_packed_into_bin_zero() {
        // Alternating signal is pure Nyquist: all power lands in bin 0's
        // imaginary part.
        let signal: Vec<f64> = (0..16).map(|t| if t % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let spec = Spectrum::from_real_f64(&signal).unwrap();
        assert_eq!(spec.len(), 8);
        match &spec {
            Spectrum::Double(bins) => {
                assert!((bins[0].re - 0.0).abs() < 1e-9);
                assert!((bins[0].im - 16.0).abs() < 1e-9);
            }
            Spectrum::Single(_) => unreachable!(),
        }
    }

    #[test]
    fn test_constant_signal_is_pure_dc() {
        let signal = vec![1.0f64; 32];
        let spec = Spectrum::from_real_f64(&signal).unwrap();
        match &spec {
            Spectrum::Double(bins) => {
                assert!((bins[0].re - 32.0).abs() < 1e-9);
                assert!((bins[0].im - 0.0).abs() < 1e-9);
                for bin in &bins[1..] {
                    assert!(bin.norm() < 1e-9);
                }
            }
            Spectrum::Single(_) => unreachable!(),
        }
    }

    #[test]
    fn test_odd_or_short_input_rejected() {
        assert!(matches!(
            Spectrum::from_real_f64(&[1.0, 2.0, 3.0]),
            Err(SearchError::InvalidRequest(_))
        ));
        assert!(matches!(
            Spectrum::from_real_f32(&[1.0, 2.0]),
            Err(SearchError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_precisions_agree_on_power_and_peak() {
        let signal = tone_signal(1024, 60.2);
        let signal32: Vec<f32> = signal.iter().map(|&x| x as f32).collect();
        let double = Spectrum::from_real_f64(&signal).unwrap();
        let single = Spectrum::from_real_f32(&signal32).unwrap();

        let pd = double.power();
        let ps = single.power();
        assert_eq!(pd.len(), ps.len());
        let peak_pow = pd.iter().cloned().fold(0.0f64, f64::max);
        for (a, b) in pd.iter().zip(ps.iter()) {
            assert!(
                (a - b).abs() < 1e-3 * peak_pow.max(1.0),
                "powers diverge: {a} vs {b}"
            );
        }

        let request = PlaneRequest {
            r: 60.0,
            dr: 0.125,
            numr: 16,
            z: 0.0,
            dz: 0.5,
            numz: 3,
        };
        let rd = double.ffdot_plane(&request, Accuracy::Low).unwrap();
        let rs = single.ffdot_plane(&request, Accuracy::Low).unwrap();
        let peak_d = rd.locate(&double, Some(1.0)).unwrap();
        let peak_s = rs.locate(&single, Some(1.0)).unwrap();
        assert_eq!(peak_d.r, peak_s.r);
        assert_eq!(peak_d.z, peak_s.z);
        assert!((peak_d.power - peak_s.power).abs() < 1e-3 * peak_d.power);
    }

    #[test]
    fn test_mixed_precision_rejected() {
        let signal = tone_signal(256, 30.1);
        let signal32: Vec<f32> = signal.iter().map(|&x| x as f32).collect();
        let double = Spectrum::from_real_f64(&signal).unwrap();
        let single = Spectrum::from_real_f32(&signal32).unwrap();
        let request = PlaneRequest {
            r: 30.0,
            dr: 0.25,
            numr: 8,
            z: 0.0,
            dz: 0.5,
            numz: 1,
        };
        let raster = single.ffdot_plane(&request, Accuracy::Low).unwrap();
        assert!(matches!(
            raster.locate(&double, None),
            Err(SearchError::PrecisionMismatch(_))
        ));
    }

    #[test]
    fn test_phase_in_degrees() {
        let spec = Spectrum::Double(vec![
            Complex::new(1.0, 0.0),
            Complex::new(0.0, 2.0),
            Complex::new(-3.0, 0.0),
        ]);
        let phases = spec.phase_deg();
        assert!((phases[0] - 0.0).abs() < 1e-12);
        assert!((phases[1] - 90.0).abs() < 1e-12);
        assert!((phases[2] - 180.0).abs() < 1e-12);
    }
}

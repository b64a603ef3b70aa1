//! Peak location and off-grid refinement over interpolated power surfaces.

use num_complex::Complex;
use num_traits::Float;
use rustfft::FftNum;

use crate::corr::{rz_interp, to_c64};
use crate::kernel::{z_resp_halfwidth, Accuracy};
use crate::math::median;
use crate::plane::PlaneRaster;
use crate::SearchError;

// Bins sampled on each side of the peak for the background estimate.
const LOCAL_POWER_BINS: i64 = 25;

// Refinement step floor in bins.
const REFINE_TOL: f64 = 1e-3;

/// A located power peak: normalized power and its exact (r, z) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakResult {
    pub power: f64,
    pub r: f64,
    pub z: f64,
}

/// Locate the maximum-power cell of `raster`, scanning row-major (z
/// ascending, then r ascending) so ties keep the first occurrence.
///
/// The peak power is divided by `norm` when given, otherwise by the local
/// background power of `spectrum` around the peak: the median bin power in
/// a window flanking the peak, with the kernel's own footprint excluded so
/// the signal cannot bias its own baseline.
pub fn locate<T: FftNum + Float>(
    raster: &PlaneRaster<T>,
    spectrum: &[Complex<T>],
    norm: Option<f64>,
) -> Result<PeakResult, SearchError> {
    if raster.cells().is_empty() {
        return Err(SearchError::InvalidRequest("empty raster".into()));
    }
    if spectrum.is_empty() {
        return Err(SearchError::InvalidRequest("empty spectrum".into()));
    }
    let powers = raster.power();
    let mut best = 0usize;
    let mut best_pow = powers[0];
    for (idx, &p) in powers.iter().enumerate().skip(1) {
        if p > best_pow {
            best = idx;
            best_pow = p;
        }
    }
    let r = raster.r_at(best % raster.numr());
    let z = raster.z_at(best / raster.numr());
    let norm = resolve_norm(norm, spectrum, r, raster.half_width())?;
    Ok(PeakResult {
        power: best_pow / norm,
        r,
        z,
    })
}

fn resolve_norm<T: FftNum + Float>(
    norm: Option<f64>,
    spectrum: &[Complex<T>],
    r: f64,
    half_width: usize,
) -> Result<f64, SearchError> {
    match norm {
        Some(n) if n.is_finite() && n > 0.0 => Ok(n),
        Some(n) => Err(SearchError::InvalidRequest(format!(
            "norm must be finite and positive, got {n}"
        ))),
        None => Ok(local_power(spectrum, r, half_width)),
    }
}

/// Median bin power in a window flanking `r`, excluding the central
/// `half_width + 1` bins on each side and bin 0 (which packs the Nyquist
/// amplitude). Falls back to the mean power of the whole spectrum when the
/// window falls entirely outside it, and to 1 when even that is zero, so
/// the normalized result stays finite.
pub fn local_power<T: FftNum + Float>(spectrum: &[Complex<T>], r: f64, half_width: usize) -> f64 {
    let center = r.round() as i64;
    let excl = half_width as i64 + 1;
    let len = spectrum.len() as i64;
    let mut powers = Vec::with_capacity(2 * LOCAL_POWER_BINS as usize);
    for off in 1..=LOCAL_POWER_BINS {
        for bin in [center - excl - off, center + excl + off] {
            if bin >= 1 && bin < len {
                powers.push(to_c64(spectrum[bin as usize]).norm_sqr());
            }
        }
    }
    let estimate = if powers.is_empty() {
        let sum: f64 = spectrum
            .iter()
            .skip(1)
            .map(|c| to_c64(*c).norm_sqr())
            .sum();
        sum / (spectrum.len().saturating_sub(1).max(1)) as f64
    } else {
        median(&powers)
    };
    if estimate.is_finite() && estimate > 0.0 {
        estimate
    } else {
        1.0
    }
}

fn power_at<T: FftNum + Float>(
    spectrum: &[Complex<T>],
    r: f64,
    z: f64,
) -> Result<f64, SearchError> {
    let amp = rz_interp(spectrum, r, z, Accuracy::High)?;
    Ok(to_c64(amp).norm_sqr())
}

// One three-point parabolic step along an axis. Falls back to the best of
// the three samples when the parabola is not concave.
fn parabolic_step(samples: [(f64, f64); 3]) -> f64 {
    let [(xm, pm), (x0, p0), (xp, pp)] = samples;
    let denom = pm - 2.0 * p0 + pp;
    if denom < 0.0 {
        let step = x0 - xm;
        let vertex = x0 + 0.5 * step * (pm - pp) / denom;
        vertex.clamp(xm, xp)
    } else if pm > p0 && pm >= pp {
        xm
    } else if pp > p0 {
        xp
    } else {
        x0
    }
}

/// Refine a peak off-grid by iterated parabolic interpolation of the
/// interpolated power in r and z, starting from `(r, z)` (typically a
/// raster peak). Returns the refined peak, normalized like [`locate`].
pub fn maximize_rz<T: FftNum + Float>(
    spectrum: &[Complex<T>],
    r: f64,
    z: f64,
    norm: Option<f64>,
) -> Result<PeakResult, SearchError> {
    refine(spectrum, r, z, norm, true)
}

/// Refine a peak in Fourier frequency only, holding the drift fixed.
pub fn maximize_r<T: FftNum + Float>(
    spectrum: &[Complex<T>],
    r: f64,
    norm: Option<f64>,
) -> Result<PeakResult, SearchError> {
    refine(spectrum, r, 0.0, norm, false)
}

fn refine<T: FftNum + Float>(
    spectrum: &[Complex<T>],
    mut r: f64,
    mut z: f64,
    norm: Option<f64>,
    vary_z: bool,
) -> Result<PeakResult, SearchError> {
    if spectrum.is_empty() {
        return Err(SearchError::InvalidRequest("empty spectrum".into()));
    }
    if !r.is_finite() || !z.is_finite() {
        return Err(SearchError::InvalidRequest(
            "r and z must be finite".into(),
        ));
    }
    let mut rstep = 0.25;
    let mut zstep = 1.0;
    while rstep > REFINE_TOL {
        r = parabolic_step([
            (r - rstep, power_at(spectrum, r - rstep, z)?),
            (r, power_at(spectrum, r, z)?),
            (r + rstep, power_at(spectrum, r + rstep, z)?),
        ]);
        if vary_z {
            z = parabolic_step([
                (z - zstep, power_at(spectrum, r, z - zstep)?),
                (z, power_at(spectrum, r, z)?),
                (z + zstep, power_at(spectrum, r, z + zstep)?),
            ]);
        }
        rstep *= 0.5;
        zstep *= 0.5;
    }
    let power = power_at(spectrum, r, z)?;
    let half_width = z_resp_halfwidth(z, Accuracy::High);
    let norm = resolve_norm(norm, spectrum, r, half_width)?;
    Ok(PeakResult {
        power: power / norm,
        r,
        z,
    })
}

//! F-Fdot plane construction: one correlated row per z value.

use log::debug;
use num_complex::Complex;
use num_traits::Float;
use rayon::prelude::*;
use rustfft::FftNum;

use crate::corr::Correlator;
use crate::kernel::{z_resp_halfwidth, Accuracy};
use crate::math::next2_to_n;
use crate::{SearchError, MAX_FFT_LEN};

// round(1/dr) must sit within this of 1/dr for dr to count as an integer
// reciprocal.
const NUMBETWEEN_TOL: f64 = 1e-6;

/// A numr x numz grid of (r, z) sample points centered on `(r, z)` with
/// spacings `dr` and `dz`. `r` is the *average* Fourier frequency of the
/// drifting signal and `dr` must be the reciprocal of an integer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneRequest {
    pub r: f64,
    pub dr: f64,
    pub numr: usize,
    pub z: f64,
    pub dz: f64,
    pub numz: usize,
}

/// Interpolated complex amplitudes over the requested grid, row-major with
/// z ascending, carrying the axis metadata needed to map cells back to
/// exact (r, z) coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneRaster<T> {
    cells: Vec<Complex<T>>,
    numr: usize,
    numz: usize,
    start_bin: i64,
    dr: f64,
    lo_z: f64,
    dz: f64,
    half_width: usize,
}

impl<T: FftNum + Float> PlaneRaster<T> {
    pub fn numr(&self) -> usize {
        self.numr
    }

    pub fn numz(&self) -> usize {
        self.numz
    }

    /// First column's Fourier frequency in bins.
    pub fn start_bin(&self) -> i64 {
        self.start_bin
    }

    pub fn dr(&self) -> f64 {
        self.dr
    }

    /// First row's drift value.
    pub fn lo_z(&self) -> f64 {
        self.lo_z
    }

    pub fn dz(&self) -> f64 {
        self.dz
    }

    /// Kernel half-width the rows were interpolated with.
    pub fn half_width(&self) -> usize {
        self.half_width
    }

    pub fn row(&self, iz: usize) -> &[Complex<T>] {
        &self.cells[iz * self.numr..(iz + 1) * self.numr]
    }

    pub fn cells(&self) -> &[Complex<T>] {
        &self.cells
    }

    /// Fourier frequency of column `ir`.
    pub fn r_at(&self, ir: usize) -> f64 {
        self.start_bin as f64 + ir as f64 * self.dr
    }

    /// Drift value of row `iz`.
    pub fn z_at(&self, iz: usize) -> f64 {
        self.lo_z + iz as f64 * self.dz
    }

    /// Power of every cell, row-major, computed in double precision so the
    /// single- and double-precision paths agree.
    pub fn power(&self) -> Vec<f64> {
        self.cells
            .iter()
            .map(|c| {
                let re = c.re.to_f64().unwrap_or(0.0);
                let im = c.im.to_f64().unwrap_or(0.0);
                re * re + im * im
            })
            .collect()
    }
}

struct Geometry {
    numbetween: usize,
    start_bin: i64,
    lo_z: f64,
    half_width: usize,
    fft_len: usize,
}

fn resolve(request: &PlaneRequest, accuracy: Accuracy) -> Result<Geometry, SearchError> {
    let &PlaneRequest {
        r,
        dr,
        numr,
        z,
        dz,
        numz,
    } = request;
    if numr == 0 || numz == 0 {
        return Err(SearchError::InvalidRequest(
            "numr and numz must be positive".into(),
        ));
    }
    if !(r.is_finite() && dr.is_finite() && z.is_finite() && dz.is_finite()) {
        return Err(SearchError::InvalidRequest(
            "request fields must be finite".into(),
        ));
    }
    if dr <= 0.0 {
        return Err(SearchError::InvalidRequest("dr must be positive".into()));
    }
    // A single row may collapse the z axis entirely; multiple rows need a
    // real spacing.
    if dz < 0.0 || (numz > 1 && dz == 0.0) {
        return Err(SearchError::InvalidRequest(
            "dz must be positive (or zero for a single row)".into(),
        ));
    }
    let recip = 1.0 / dr;
    let numbetween = recip.round();
    if numbetween < 1.0 || (recip - numbetween).abs() > NUMBETWEEN_TOL {
        return Err(SearchError::InvalidRequest(format!(
            "dr = {dr} is not the reciprocal of a positive integer"
        )));
    }
    let numbetween = numbetween as usize;

    let start_bin = (r - numr as f64 * dr / 2.0).round() as i64;
    let lo_z = z - numz as f64 * dz / 2.0;
    let hi_z = lo_z + (numz - 1) as f64 * dz;
    let max_abs_z = lo_z.abs().max(hi_z.abs());
    let half_width = z_resp_halfwidth(max_abs_z, accuracy);

    let support = half_width
        .checked_mul(2)
        .and_then(|h| h.checked_mul(numbetween))
        .and_then(|s| s.checked_add(numr));
    let fft_len = support.and_then(next2_to_n).ok_or(SearchError::TransformTooLarge {
        required: usize::MAX,
        max: MAX_FFT_LEN,
    })?;
    if fft_len > MAX_FFT_LEN {
        return Err(SearchError::TransformTooLarge {
            required: fft_len,
            max: MAX_FFT_LEN,
        });
    }
    Ok(Geometry {
        numbetween,
        start_bin,
        lo_z,
        half_width,
        fft_len,
    })
}

/// Build the interpolated F-Fdot plane for `request` over `spectrum`.
///
/// Rows are independent (each has its own drift kernel) and are computed in
/// parallel; assembly preserves z-ascending order regardless of completion
/// order, so identical inputs always produce bit-identical rasters.
pub fn ffdot_plane<T: FftNum + Float>(
    spectrum: &[Complex<T>],
    request: &PlaneRequest,
    accuracy: Accuracy,
) -> Result<PlaneRaster<T>, SearchError> {
    if spectrum.is_empty() {
        return Err(SearchError::InvalidRequest("empty spectrum".into()));
    }
    let geom = resolve(request, accuracy)?;
    debug!(
        "f-fdot plane: {}x{} cells, start_bin {}, half_width {}, fft_len {}",
        request.numz, request.numr, geom.start_bin, geom.half_width, geom.fft_len
    );

    let corr = Correlator::<T>::new(geom.fft_len, geom.numbetween, geom.half_width)?;
    let rows: Vec<Vec<Complex<T>>> = (0..request.numz)
        .into_par_iter()
        .map(|iz| {
            let z_row = geom.lo_z + iz as f64 * request.dz;
            corr.correlate(spectrum, geom.start_bin, z_row, request.numr)
        })
        .collect::<Result<_, _>>()?;

    let mut cells = Vec::with_capacity(request.numr * request.numz);
    for row in rows {
        cells.extend(row);
    }
    Ok(PlaneRaster {
        cells,
        numr: request.numr,
        numz: request.numz,
        start_bin: geom.start_bin,
        dr: request.dr,
        lo_z: geom.lo_z,
        dz: request.dz,
        half_width: geom.half_width,
    })
}

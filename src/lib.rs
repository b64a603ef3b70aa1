//! Interpolated F-Fdot plane searches over complex Fourier spectra.
//!
//! Given the FFT of an evenly sampled time series, this crate builds a 2-D
//! surface of interpolated complex amplitudes around a candidate Fourier
//! frequency `r` (bins) and frequency derivative `z` (bins drifted over the
//! observation), then reduces it to a normalized peak. Interpolation uses
//! band-limited response kernels correlated against the spectrum, so a
//! drifting tone that smears across bins is still recovered coherently.

use thiserror::Error;

pub mod corr;
pub mod kernel;
pub mod math;
pub mod peak;
pub mod plane;
pub mod special;
pub mod spectrum;

pub use corr::{rz_interp, Correlator};
pub use kernel::{z_resp_halfwidth, Accuracy};
pub use peak::{locate, maximize_r, maximize_rz, PeakResult};
pub use plane::{ffdot_plane, PlaneRaster, PlaneRequest};
pub use spectrum::{Raster, Spectrum};

/// Largest working transform length the plane builder will allocate.
/// Requests that would need more (a pathological |z| blowing up the kernel
/// width) fail with [`SearchError::TransformTooLarge`] instead.
pub const MAX_FFT_LEN: usize = 1 << 24;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Malformed request geometry or empty input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The padded correlation transform would exceed [`MAX_FFT_LEN`].
    #[error("working transform of {required} points exceeds the supported maximum of {max}")]
    TransformTooLarge { required: usize, max: usize },
    /// Single- and double-precision objects combined in one call.
    #[error("precision mismatch: {0}")]
    PrecisionMismatch(&'static str),
}

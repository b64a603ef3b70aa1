//! Band-limited interpolation kernels for the Fourier plane.
//!
//! A tone at fractional bin `r` with frequency drift `z` (bins over the
//! observation) leaves a characteristic complex response in the nearby
//! integer bins of the spectrum. Correlating the spectrum against that
//! response recovers the interpolated amplitude at any (r, z). The
//! zero-drift response is the familiar sinc leakage pattern; with drift the
//! response widens into a Fresnel-integral chirp.

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::special::fresnel;

// Minimum half-width in bins; also the HIGH-accuracy widening step.
const NUMFINTBINS: usize = 3;

// Below this |z| the drift response is indistinguishable from plain sinc
// interpolation and the Fresnel evaluation would lose precision.
const Z_EPS: f64 = 1e-4;

/// Kernel accuracy trade-off: `Low` is wide enough for survey work, `High`
/// widens the kernel for candidate confirmation and peak refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    Low,
    High,
}

/// Half-width in bins of the interpolation kernel needed to cover a drift
/// of `z` bins. Monotonic non-decreasing in |z|, and `High` accuracy is at
/// least as wide as `Low` everywhere.
pub fn z_resp_halfwidth(z: f64, accuracy: Accuracy) -> usize {
    let z = z.abs();
    let mut m = (z * (0.00089 * z + 0.3131) + NUMFINTBINS as f64) as usize;
    m = m.max(NUMFINTBINS);
    // Keep the quadratic fit from blowing up at large |z|.
    if z > 100.0 && m as f64 > 0.6 * z {
        m = (0.6 * z) as usize;
    }
    if accuracy == Accuracy::High {
        m = m.saturating_add(3 * NUMFINTBINS);
    }
    m
}

/// Complex response of a unit-amplitude drifting tone, evaluated at offset
/// `q` bins from the tone's starting frequency, for drift `z`.
///
/// Conventions match a forward FFT with `e^{-2 pi i j t / N}` sign: the
/// response is `int_0^1 exp(2 pi i (-q u + z u^2 / 2)) du`, which reduces to
/// `exp(-i pi q) sinc(pi q)` as z goes to zero.
pub fn response_at(q: f64, z: f64) -> Complex64 {
    if z.abs() < Z_EPS {
        return r_response(q);
    }
    // Negative drift is the conjugate-mirrored positive case.
    let (q, flip) = if z > 0.0 { (q, false) } else { (-q, true) };
    let az = z.abs();
    let zd = (2.0 / az).sqrt();
    let (s1, c1) = fresnel(-q * zd);
    let (s2, c2) = fresnel((az - q) * zd);
    let amp = Complex64::new(c2 - c1, s2 - s1);
    let resp = Complex64::from_polar(0.5 * zd, -PI * q * q / az) * amp;
    if flip {
        resp.conj()
    } else {
        resp
    }
}

fn r_response(q: f64) -> Complex64 {
    if q == 0.0 {
        return Complex64::new(1.0, 0.0);
    }
    let t = PI * q;
    Complex64::from_polar(t.sin() / t, -t)
}

/// Discrete kernel taps for one z row: `2 * numbetween * half_width + 1`
/// samples of the drift response spaced `1/numbetween` bins apart, centered
/// on the row's *average* frequency (the drifting tone starts `z/2` bins
/// below its average).
pub fn gen_response(numbetween: usize, half_width: usize, z: f64) -> Vec<Complex64> {
    let w = numbetween * half_width;
    let step = 1.0 / numbetween as f64;
    (0..=2 * w)
        .map(|i| {
            let x = (i as f64 - w as f64) * step;
            response_at(x + 0.5 * z, z)
        })
        .collect()
}

//! Fresnel integrals, needed for the frequency-drift response kernels.

use std::f64::consts::PI;

// Beyond this the cosine/sine of pi*x^2/2 carries no precision anyway and
// both integrals are 0.5 to machine accuracy.
const FRESNEL_LIMIT: f64 = 36974.0;

// Power series below, auxiliary-function asymptotics above.
const SERIES_CUTOVER: f64 = 3.2;

/// Fresnel integrals S(x) and C(x), returned as `(s, c)` where
/// `S(x) = int_0^x sin(pi t^2 / 2) dt` and `C(x)` the cosine analogue.
///
/// Both are odd in `x`. Accuracy is machine precision in the power-series
/// region (|x| <= 3.2) and better than 1e-7 absolute everywhere else, which
/// is far below the interpolation error of the kernels built from them.
pub fn fresnel(x: f64) -> (f64, f64) {
    let ax = x.abs();
    let (s, c) = if ax <= SERIES_CUTOVER {
        fresnel_series(ax)
    } else if ax >= FRESNEL_LIMIT {
        (0.5, 0.5)
    } else {
        fresnel_asymptotic(ax)
    };
    if x < 0.0 {
        (-s, -c)
    } else {
        (s, c)
    }
}

fn fresnel_series(x: f64) -> (f64, f64) {
    let h = 0.5 * PI * x * x;
    let mut s = 0.0;
    let mut c = 0.0;
    // factor = x * h^k / k!, feeding C for even k and S for odd k
    let mut factor = x;
    for k in 0..128usize {
        let term = factor / (2 * k + 1) as f64;
        let signed = if (k / 2) % 2 == 0 { term } else { -term };
        if k % 2 == 0 {
            c += signed;
        } else {
            s += signed;
        }
        if term < 1e-17 * (s.abs() + c.abs()) + f64::MIN_POSITIVE {
            break;
        }
        factor *= h / (k + 1) as f64;
    }
    (s, c)
}

fn fresnel_asymptotic(x: f64) -> (f64, f64) {
    let u = PI * x * x;
    let u2 = u * u;

    // f ~ (1/(pi x)) * sum (-1)^m (4m-1)!! / u^(2m)
    // g ~ (1/(pi x u)) * sum (-1)^m (4m+1)!! / u^(2m)
    // Both series are divergent; sum until the terms stop shrinking.
    let mut f = 0.0;
    let mut term = 1.0;
    for m in 0..24usize {
        f += if m % 2 == 0 { term } else { -term };
        let next = term * ((4 * m + 1) * (4 * m + 3)) as f64 / u2;
        if next >= term {
            break;
        }
        term = next;
    }
    let mut g = 0.0;
    term = 1.0;
    for m in 0..24usize {
        g += if m % 2 == 0 { term } else { -term };
        let next = term * ((4 * m + 3) * (4 * m + 5)) as f64 / u2;
        if next >= term {
            break;
        }
        term = next;
    }
    f /= PI * x;
    g /= PI * x * u;

    let (sin_t, cos_t) = (0.5 * u).sin_cos();
    let s = 0.5 - f * cos_t - g * sin_t;
    let c = 0.5 + f * sin_t - g * cos_t;
    (s, c)
}

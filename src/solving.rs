//! Bracketing root finder used for maximum-likelihood and maximum-a-posteriori theta.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::{CatError, Result};

/// Configuration for the Brent root finder that solves `d1LL(theta) = 0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootOptions {
    /// Lower end of the search bracket.
    pub lower: f64,
    /// Upper end of the search bracket.
    pub upper: f64,
    /// Absolute tolerance on the bracket width.
    pub absolute_tolerance: f64,
    /// Relative tolerance on the bracket width, scaled by the current root.
    pub relative_tolerance: f64,
    /// Maximum number of iterations allowed before aborting.
    pub max_iterations: usize,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            lower: -5.0,
            upper: 5.0,
            absolute_tolerance: 1e-12,
            relative_tolerance: 1e-7,
            max_iterations: 100,
        }
    }
}

/// Diagnostics returned alongside a located root.
#[derive(Clone, Debug)]
pub struct RootSummary {
    /// Number of iterations performed.
    pub iterations: usize,
    /// Width of the bracket that certified convergence.
    pub width: f64,
}

/// Finds a root of `f` inside `[options.lower, options.upper]` with Brent's method.
///
/// The bracket must contain a sign change. Evaluation errors from `f` propagate
/// unchanged so that numerical-domain failures surface to the caller.
pub fn brent<F>(f: F, options: &RootOptions) -> Result<(f64, RootSummary)>
where
    F: Fn(f64) -> Result<f64>,
{
    let (mut a, mut b) = (options.lower, options.upper);
    if a.is_nan() || b.is_nan() || a >= b {
        return Err(CatError::invalid("root bracket width", b - a));
    }
    let mut fa = finite(f(a)?)?;
    let mut fb = finite(f(b)?)?;

    if fa == 0.0 {
        return Ok((a, RootSummary { iterations: 0, width: 0.0 }));
    }
    if fb == 0.0 {
        return Ok((b, RootSummary { iterations: 0, width: 0.0 }));
    }
    if fa.signum() == fb.signum() {
        return Err(CatError::NoSignChange {
            lower: a,
            upper: b,
            f_lower: fa,
            f_upper: fb,
        });
    }

    let (mut c, mut fc) = (b, fb);
    let mut d = b - a;
    let mut e = d;

    for iteration in 1..=options.max_iterations {
        if (fb > 0.0 && fc > 0.0) || (fb < 0.0 && fc < 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs()
            + 0.5 * (options.absolute_tolerance + options.relative_tolerance * b.abs());
        let midpoint = 0.5 * (c - b);
        trace!("brent iteration {iteration}: root {b}, half-width {}", midpoint.abs());

        if midpoint.abs() <= tol || fb == 0.0 {
            return Ok((
                b,
                RootSummary {
                    iterations: iteration,
                    width: (c - b).abs(),
                },
            ));
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            // Inverse quadratic interpolation, or secant when only two points are distinct.
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (2.0 * midpoint * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * midpoint * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            } else {
                p = -p;
            }
            let bound = (3.0 * midpoint * q - (tol * q).abs()).min((e * q).abs());
            if 2.0 * p < bound {
                e = d;
                d = p / q;
            } else {
                d = midpoint;
                e = d;
            }
        } else {
            d = midpoint;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(midpoint) };
        fb = finite(f(b)?)?;
    }

    Err(CatError::RootDidNotConverge {
        iterations: options.max_iterations,
        width: (c - b).abs(),
    })
}

fn finite(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CatError::NumericalError {
            context: "root function evaluation",
        })
    }
}

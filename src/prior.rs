//! Prior distributions over theta.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{CatError, Result};

/// Distribution family of a [`Prior`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorFamily {
    /// Normal with mean `param0` and standard deviation `param1`.
    Normal,
    /// Cauchy with location `param0` and scale `param1`.
    Cauchy,
    /// Location-scale Student-t.
    StudentT { degrees_of_freedom: f64 },
}

/// Location/scale prior used for MAP and EAP estimation.
///
/// `param0` is the location and `param1` the scale. Derivative corrections in
/// the estimator treat the prior as normal with these moments whatever the family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prior {
    family: PriorFamily,
    param0: f64,
    param1: f64,
}

impl Prior {
    /// Builds a prior after validating its scale.
    pub fn new(family: PriorFamily, param0: f64, param1: f64) -> Result<Self> {
        if !param0.is_finite() {
            return Err(CatError::invalid("prior location", param0));
        }
        if !(param1.is_finite() && param1 > 0.0) {
            return Err(CatError::invalid("prior scale", param1));
        }
        if let PriorFamily::StudentT { degrees_of_freedom } = family {
            if !(degrees_of_freedom.is_finite() && degrees_of_freedom > 0.0) {
                return Err(CatError::invalid(
                    "student-t degrees of freedom",
                    degrees_of_freedom,
                ));
            }
        }
        Ok(Self {
            family,
            param0,
            param1,
        })
    }

    /// Normal prior with the given mean and standard deviation.
    pub fn normal(mean: f64, sd: f64) -> Result<Self> {
        Self::new(PriorFamily::Normal, mean, sd)
    }

    /// Cauchy prior with the given location and scale.
    pub fn cauchy(location: f64, scale: f64) -> Result<Self> {
        Self::new(PriorFamily::Cauchy, location, scale)
    }

    /// Location-scale Student-t prior.
    pub fn student_t(degrees_of_freedom: f64, location: f64, scale: f64) -> Result<Self> {
        Self::new(
            PriorFamily::StudentT { degrees_of_freedom },
            location,
            scale,
        )
    }

    /// Distribution family.
    pub fn family(&self) -> PriorFamily {
        self.family
    }

    /// Location parameter.
    pub fn param0(&self) -> f64 {
        self.param0
    }

    /// Scale parameter.
    pub fn param1(&self) -> f64 {
        self.param1
    }

    /// Evaluates the prior density at `theta`.
    pub fn density(&self, theta: f64) -> f64 {
        let z = (theta - self.param0) / self.param1;
        let standard = match self.family {
            PriorFamily::Normal => (-0.5 * z * z).exp() / (2.0 * PI).sqrt(),
            PriorFamily::Cauchy => 1.0 / (PI * (1.0 + z * z)),
            PriorFamily::StudentT { degrees_of_freedom: nu } => {
                let log_norm = ln_gamma(0.5 * (nu + 1.0))
                    - ln_gamma(0.5 * nu)
                    - 0.5 * (nu * PI).ln();
                (log_norm - 0.5 * (nu + 1.0) * (1.0 + z * z / nu).ln()).exp()
            }
        };
        standard / self.param1
    }
}

impl Default for Prior {
    fn default() -> Self {
        Self {
            family: PriorFamily::Normal,
            param0: 0.0,
            param1: 1.0,
        }
    }
}

/// Lanczos approximation (g = 7, n = 9) of `ln Γ(x)` for `x > 0`.
fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // Reflection formula.
        return (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut sum = COEFFICIENTS[0];
    for (offset, coefficient) in COEFFICIENTS.iter().enumerate().skip(1) {
        sum += coefficient / (x + offset as f64);
    }
    let t = x + 7.5;
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn normal_density_matches_closed_form() {
        let prior = Prior::normal(1.0, 2.0).unwrap();
        let expected = (-0.5 * 0.25_f64).exp() / (2.0 * (2.0 * PI).sqrt());
        assert_relative_eq!(prior.density(2.0), expected, epsilon = 1e-14);
    }

    #[test]
    fn student_t_with_one_degree_is_cauchy() {
        let t = Prior::student_t(1.0, 0.5, 1.5).unwrap();
        let cauchy = Prior::cauchy(0.5, 1.5).unwrap();
        for theta in [-3.0, -0.2, 0.5, 4.0] {
            assert_relative_eq!(t.density(theta), cauchy.density(theta), epsilon = 1e-10);
        }
    }

    #[test]
    fn ln_gamma_matches_factorials() {
        assert_relative_eq!(ln_gamma(5.0), 24.0_f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(ln_gamma(0.5), PI.sqrt().ln(), epsilon = 1e-12);
    }

    #[test]
    fn rejects_non_positive_scale() {
        assert!(matches!(
            Prior::normal(0.0, 0.0),
            Err(CatError::InvalidParameter { .. })
        ));
        assert!(Prior::student_t(-1.0, 0.0, 1.0).is_err());
    }
}

//! Composite Gauss-Legendre quadrature over a bounded theta interval.

use nalgebra::DVector;

use crate::error::{CatError, Result};

/// Positive abscissae of the 10-point Gauss-Legendre rule on `[-1, 1]`.
const NODES: [f64; 5] = [
    0.148_874_338_981_631_2,
    0.433_395_394_129_247_2,
    0.679_409_568_299_024_4,
    0.865_063_366_688_984_5,
    0.973_906_528_517_171_7,
];

/// Weights matching [`NODES`].
const WEIGHTS: [f64; 5] = [
    0.295_524_224_714_752_9,
    0.269_266_719_309_996_4,
    0.219_086_362_515_982_0,
    0.149_451_349_150_580_6,
    0.066_671_344_308_688_1,
];

/// Integrates scalar functions of theta with a fixed number of equal-width panels.
#[derive(Clone, Debug)]
pub struct Integrator {
    subintervals: usize,
}

impl Integrator {
    /// Builds an integrator using `subintervals` panels, each with a 10-point rule.
    pub fn new(subintervals: usize) -> Result<Self> {
        if subintervals == 0 {
            return Err(CatError::dimension_mismatch("integration subintervals", 1, 0));
        }
        Ok(Self { subintervals })
    }

    /// Number of panels the interval is split into.
    pub fn subintervals(&self) -> usize {
        self.subintervals
    }

    /// Quadrature nodes and weights spanning `[lower, upper]`.
    pub fn rule(&self, lower: f64, upper: f64) -> (DVector<f64>, DVector<f64>) {
        let count = self.subintervals * 2 * NODES.len();
        let width = (upper - lower) / self.subintervals as f64;
        let half = 0.5 * width;

        let mut nodes = Vec::with_capacity(count);
        let mut weights = Vec::with_capacity(count);
        for panel in 0..self.subintervals {
            let center = lower + half + panel as f64 * width;
            for (node, weight) in NODES.iter().zip(WEIGHTS.iter()) {
                nodes.push(center - half * node);
                weights.push(half * weight);
                nodes.push(center + half * node);
                weights.push(half * weight);
            }
        }
        (DVector::from_vec(nodes), DVector::from_vec(weights))
    }

    /// Approximates `∫ f(theta) dtheta` over `[lower, upper]`.
    ///
    /// Errors raised by `f` propagate; non-finite integrand values are rejected.
    pub fn integrate<F>(&self, f: F, lower: f64, upper: f64) -> Result<f64>
    where
        F: Fn(f64) -> Result<f64>,
    {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(CatError::NumericalError {
                context: "integration bounds",
            });
        }
        if upper < lower {
            return Err(CatError::invalid("integration interval width", upper - lower));
        }
        if upper == lower {
            return Ok(0.0);
        }

        let (nodes, weights) = self.rule(lower, upper);
        let mut total = 0.0;
        for (theta, weight) in nodes.iter().zip(weights.iter()) {
            let value = f(*theta)?;
            if !value.is_finite() {
                return Err(CatError::NumericalError {
                    context: "integrand evaluation",
                });
            }
            total += weight * value;
        }
        Ok(total)
    }
}

impl Default for Integrator {
    fn default() -> Self {
        Self { subintervals: 10 }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn rule_weights_sum_to_interval_width() {
        let integrator = Integrator::new(4).unwrap();
        let (nodes, weights) = integrator.rule(-5.0, 5.0);
        assert_eq!(nodes.len(), 40);
        assert_relative_eq!(weights.sum(), 10.0, epsilon = 1e-12);
        assert!(nodes.iter().all(|theta| (-5.0..=5.0).contains(theta)));
    }

    #[test]
    fn integrates_polynomials_exactly() {
        let integrator = Integrator::new(1).unwrap();
        let value = integrator.integrate(|x| Ok(x.powi(6) - x), -1.0, 2.0).unwrap();
        let expected = (2.0_f64.powi(7) + 1.0) / 7.0 - (4.0 - 1.0) / 2.0;
        assert_relative_eq!(value, expected, epsilon = 1e-10);
    }

    #[test]
    fn normal_density_integrates_to_one() {
        let integrator = Integrator::default();
        let density = |x: f64| Ok((-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt());
        let mass = integrator.integrate(density, -8.0, 8.0).unwrap();
        assert_relative_eq!(mass, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn rejects_zero_subintervals_and_nan_integrands() {
        assert!(Integrator::new(0).is_err());
        let result = Integrator::default().integrate(|_| Ok(f64::NAN), 0.0, 1.0);
        assert!(matches!(result, Err(CatError::NumericalError { .. })));
    }
}

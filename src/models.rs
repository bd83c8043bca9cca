//! Response-probability functions of the supported IRT models.
//!
//! Binary probabilities are clamped to `[eps, 1 - eps]` with `eps = (2^-52)^(1/3)`;
//! the likelihood and derivative formulas elsewhere assume this floor.

use nalgebra::DVector;

use crate::data::{Item, IrtModel};
use crate::error::{CatError, Result};

/// Floor applied to logistic probabilities, `(2^-52)^(1/3)`.
#[inline]
pub fn probability_floor() -> f64 {
    f64::EPSILON.powf(1.0 / 3.0)
}

#[inline]
fn clamp_probability(value: f64) -> f64 {
    let eps = probability_floor();
    value.clamp(eps, 1.0 - eps)
}

/// Model-specific response-probability representation of one item at one theta.
#[derive(Clone, Debug, PartialEq)]
pub enum Probabilities {
    /// Probability of a correct (`1`) response.
    Binary(f64),
    /// Graded cumulative curve `[0, P*_1, ..., P*_{k-1}, 1]`.
    Cumulative(DVector<f64>),
    /// Partial-credit category probabilities, one per category.
    Categorical(DVector<f64>),
}

impl Probabilities {
    /// Number of response categories represented.
    pub fn category_count(&self) -> usize {
        match self {
            Self::Binary(_) => 2,
            Self::Cumulative(cdf) => cdf.len() - 1,
            Self::Categorical(probs) => probs.len(),
        }
    }

    /// Probability of observing `answer`; the answer must already be validated.
    pub fn response(&self, answer: usize) -> f64 {
        match self {
            Self::Binary(p) => {
                if answer == 1 {
                    *p
                } else {
                    1.0 - p
                }
            }
            Self::Cumulative(cdf) => cdf[answer] - cdf[answer - 1],
            Self::Categorical(probs) => probs[answer - 1],
        }
    }

    /// Every `(answer, probability)` pair of the item, in category order.
    pub fn categories(&self) -> Vec<(usize, f64)> {
        match self {
            Self::Binary(p) => vec![(0, 1.0 - p), (1, *p)],
            Self::Cumulative(cdf) => (1..cdf.len())
                .map(|answer| (answer, cdf[answer] - cdf[answer - 1]))
                .collect(),
            Self::Categorical(probs) => probs
                .iter()
                .enumerate()
                .map(|(index, p)| (index + 1, *p))
                .collect(),
        }
    }
}

/// Dispatches to the probability function of `model`.
pub fn probabilities(model: IrtModel, theta: f64, item: &Item) -> Result<Probabilities> {
    match model {
        IrtModel::BinaryIrt => Ok(Probabilities::Binary(binary_probability(theta, item))),
        IrtModel::GradedResponse => graded_cumulative(theta, item).map(Probabilities::Cumulative),
        IrtModel::PartialCredit => {
            partial_credit_probabilities(theta, item).map(Probabilities::Categorical)
        }
    }
}

/// Three-parameter logistic probability of a correct response.
pub fn binary_probability(theta: f64, item: &Item) -> f64 {
    let exp_term = (item.difficulty[0] + item.discrimination * theta).exp();
    if exp_term.is_infinite() {
        return 1.0 - probability_floor();
    }
    let guess = item.guessing;
    clamp_probability(guess + (1.0 - guess) * (exp_term / (1.0 + exp_term)))
}

/// Graded-response cumulative probabilities bracketed by 0 and 1.
///
/// Fails when two adjacent entries coincide, which happens once the logistic
/// link saturates for an extreme theta.
pub fn graded_cumulative(theta: f64, item: &Item) -> Result<DVector<f64>> {
    let thresholds = &item.difficulty;
    let mut cdf = DVector::zeros(thresholds.len() + 2);
    for (index, threshold) in thresholds.iter().enumerate() {
        let exp_term = (threshold - item.discrimination * theta).exp();
        cdf[index + 1] = if exp_term.is_infinite() {
            1.0 - probability_floor()
        } else {
            clamp_probability(exp_term / (1.0 + exp_term))
        };
    }
    let last = cdf.len() - 1;
    cdf[last] = 1.0;

    if cdf.as_slice().windows(2).any(|pair| pair[0] == pair[1]) {
        return Err(CatError::too_extreme(theta, "graded response probabilities"));
    }
    Ok(cdf)
}

/// Un-normalized partial-credit terms `exp(a*theta + sum_j a*(theta - b_j))`
/// and their exponent slopes with respect to theta.
fn partial_credit_terms(theta: f64, item: &Item) -> (DVector<f64>, DVector<f64>) {
    let a = item.discrimination;
    let categories = item.difficulty.len() + 1;
    let mut terms = DVector::zeros(categories);
    let mut slopes = DVector::zeros(categories);

    let mut exponent = a * theta;
    terms[0] = exponent.exp();
    slopes[0] = a;
    for (index, threshold) in item.difficulty.iter().enumerate() {
        exponent += a * (theta - threshold);
        terms[index + 1] = exponent.exp();
        slopes[index + 1] = a * (index + 2) as f64;
    }
    (terms, slopes)
}

fn normalizer(theta: f64, terms: &DVector<f64>) -> Result<f64> {
    let total = terms.sum();
    if total == 0.0 || !total.is_finite() {
        return Err(CatError::too_extreme(theta, "partial credit normalization"));
    }
    Ok(total)
}

/// Generalized partial-credit category probabilities.
pub fn partial_credit_probabilities(theta: f64, item: &Item) -> Result<DVector<f64>> {
    let (terms, _) = partial_credit_terms(theta, item);
    let total = normalizer(theta, &terms)?;
    Ok(terms / total)
}

/// First and second theta-derivatives of the partial-credit category probabilities.
#[derive(Clone, Debug)]
pub struct PartialCreditDerivatives {
    /// First derivatives, one per category.
    pub first: DVector<f64>,
    /// Second derivatives, one per category.
    pub second: DVector<f64>,
}

/// Closed-form first derivatives by the quotient rule on `f_i / g`.
pub fn partial_credit_first_derivatives(theta: f64, item: &Item) -> Result<DVector<f64>> {
    let (f, x) = partial_credit_terms(theta, item);
    let g = normalizer(theta, &f)?;
    let f_prime = f.component_mul(&x);
    let g_prime = f_prime.sum();

    let first = (f_prime * g - f * g_prime) / (g * g);
    ensure_finite(theta, first)
}

/// Closed-form first and second derivatives by the quotient rule on `f_i / g`.
pub fn partial_credit_derivatives(theta: f64, item: &Item) -> Result<PartialCreditDerivatives> {
    let (f, x) = partial_credit_terms(theta, item);
    let g = normalizer(theta, &f)?;
    let f_prime = f.component_mul(&x);
    let f_second = f_prime.component_mul(&x);
    let g_prime = f_prime.sum();
    let g_second = f_second.sum();

    let b = g * g;
    let b_prime = 2.0 * g * g_prime;
    let numerator = &f_prime * g - &f * g_prime;
    let numerator_prime = &f_second * g - &f * g_second;

    let first = &numerator / b;
    let second = (numerator_prime * b - numerator * b_prime) / (b * b);
    Ok(PartialCreditDerivatives {
        first: ensure_finite(theta, first)?,
        second: ensure_finite(theta, second)?,
    })
}

fn ensure_finite(theta: f64, values: DVector<f64>) -> Result<DVector<f64>> {
    if values.iter().all(|value| value.is_finite()) {
        Ok(values)
    } else {
        Err(CatError::too_extreme(theta, "partial credit derivatives"))
    }
}

//! Likelihood, theta estimation, and information criteria for a question set.
//!
//! An [`Estimator`] borrows an immutable [`QuestionSet`] and [`Prior`]. Look-ahead
//! computations never write to the question set: [`Estimator::with_response`]
//! returns a second estimator that folds one hypothetical `(item, answer)` pair
//! into every likelihood, derivative, and estimate. Because nothing is mutated,
//! candidate items can be scored from several threads against the same session.

use log::debug;

use crate::data::{IrtModel, QuestionSet, Response};
use crate::error::{CatError, Result};
use crate::integration::Integrator;
use crate::models::{self, Probabilities};
use crate::options::{EstimatorOptions, ThetaMethod};
use crate::prior::Prior;
use crate::solving::brent;

/// Integration window centred on the current theta estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InformationWindow {
    /// Theta estimate the window is built around.
    pub theta: f64,
    /// Lower end, never below the theta bounds.
    pub lower: f64,
    /// Upper end, never above the theta bounds.
    pub upper: f64,
}

/// Probability, likelihood, and information engine over one question set.
#[derive(Clone, Debug)]
pub struct Estimator<'a> {
    questions: &'a QuestionSet,
    prior: &'a Prior,
    options: EstimatorOptions,
    integrator: Integrator,
    hypothetical: Option<Response>,
}

impl<'a> Estimator<'a> {
    /// Builds an estimator using the quadrature resolution of `questions`.
    pub fn new(
        questions: &'a QuestionSet,
        prior: &'a Prior,
        options: EstimatorOptions,
    ) -> Result<Self> {
        let integrator = Integrator::new(questions.subintervals())?;
        Ok(Self {
            questions,
            prior,
            options,
            integrator,
            hypothetical: None,
        })
    }

    /// Question set the estimator reads from.
    pub fn questions(&self) -> &'a QuestionSet {
        self.questions
    }

    /// Prior used by EAP, MAP, and the weighted criteria.
    pub fn prior(&self) -> &'a Prior {
        self.prior
    }

    /// Estimation settings.
    pub fn options(&self) -> &EstimatorOptions {
        &self.options
    }

    /// The hypothetical response carried by this estimator, if any.
    pub fn hypothetical(&self) -> Option<Response> {
        self.hypothetical
    }

    /// Returns an estimator that treats `item` as answered with `answer`.
    ///
    /// The item must be unanswered in the underlying question set, and at most
    /// one hypothetical response can be carried at a time.
    pub fn with_response(&self, item: usize, answer: usize) -> Result<Estimator<'a>> {
        self.questions.validate_answer(item, answer)?;
        if let Some(existing) = self.hypothetical {
            return Err(CatError::HypotheticalOccupied {
                item: existing.item,
            });
        }
        if self.questions.answer(item)?.is_some() {
            return Err(CatError::AlreadyAnswered { item });
        }
        Ok(Estimator {
            hypothetical: Some(Response { item, answer }),
            ..self.clone()
        })
    }

    /// Recorded responses followed by the hypothetical one.
    pub fn responses(&self) -> impl Iterator<Item = Response> + '_ {
        self.questions.responses().chain(self.hypothetical)
    }

    fn has_responses(&self) -> bool {
        self.hypothetical.is_some() || !self.questions.applicable_rows().is_empty()
    }

    fn answer_of(&self, item: usize) -> Result<usize> {
        if let Some(response) = self.hypothetical.filter(|response| response.item == item) {
            return Ok(response.answer);
        }
        self.questions.answer(item)?.ok_or(CatError::Unanswered { item })
    }

    /// Response-probability representation of `item` at `theta`.
    pub fn probability(&self, theta: f64, item: usize) -> Result<Probabilities> {
        let params = self.questions.item(item)?;
        models::probabilities(self.questions.model(), theta, params)
    }

    /// Sum of log response probabilities over the answered items.
    pub fn log_likelihood(&self, theta: f64) -> Result<f64> {
        let mut total = 0.0;
        for response in self.responses() {
            let probs = self.probability(theta, response.item)?;
            total += probs.response(response.answer).ln();
        }
        Ok(total)
    }

    /// Likelihood of the answered items at `theta`.
    pub fn likelihood(&self, theta: f64) -> Result<f64> {
        self.log_likelihood(theta).map(f64::exp)
    }

    /// First derivative of the log-likelihood, optionally penalized by the prior.
    ///
    /// With no answered items this is the prior term alone.
    pub fn d1_log_likelihood(&self, theta: f64, use_prior: bool) -> Result<f64> {
        let prior_shift = (theta - self.prior.param0()) / self.prior.param1().powi(2);
        if !self.has_responses() {
            return Ok(-prior_shift);
        }
        let mut total = 0.0;
        for response in self.responses() {
            total += self.item_score(theta, response)?;
        }
        Ok(if use_prior { total - prior_shift } else { total })
    }

    /// Second derivative of the log-likelihood, optionally penalized by the prior.
    pub fn d2_log_likelihood(&self, theta: f64, use_prior: bool) -> Result<f64> {
        let prior_shift = 1.0 / self.prior.param1().powi(2);
        if !self.has_responses() {
            return Ok(-prior_shift);
        }
        let mut total = 0.0;
        for response in self.responses() {
            total += self.item_curvature(theta, response)?;
        }
        Ok(if use_prior { total - prior_shift } else { total })
    }

    /// Derivative of one item's log response probability.
    fn item_score(&self, theta: f64, response: Response) -> Result<f64> {
        let item = self.questions.item(response.item)?;
        let a = item.discrimination;
        match self.questions.model() {
            IrtModel::BinaryIrt => {
                let p = models::binary_probability(theta, item);
                let guess = item.guessing;
                Ok(a * ((p - guess) / (p * (1.0 - guess))) * (response.answer as f64 - p))
            }
            IrtModel::GradedResponse => {
                let cdf = models::graded_cumulative(theta, item)?;
                let (upper, lower) = (cdf[response.answer], cdf[response.answer - 1]);
                let w = upper * (1.0 - upper) - lower * (1.0 - lower);
                Ok(-a * w / (upper - lower))
            }
            IrtModel::PartialCredit => {
                let probs = models::partial_credit_probabilities(theta, item)?;
                let first = models::partial_credit_first_derivatives(theta, item)?;
                let index = response.answer - 1;
                Ok(first[index] / probs[index])
            }
        }
    }

    /// Second derivative of one item's log response probability.
    fn item_curvature(&self, theta: f64, response: Response) -> Result<f64> {
        let item = self.questions.item(response.item)?;
        let a = item.discrimination;
        match self.questions.model() {
            IrtModel::BinaryIrt => {
                let p = models::binary_probability(theta, item);
                let guess = item.guessing;
                let lambda = (p - guess) / (1.0 - guess);
                Ok(-(a * lambda).powi(2) * (1.0 - p) / p)
            }
            IrtModel::GradedResponse => {
                let cdf = models::graded_cumulative(theta, item)?;
                let (upper, lower) = (cdf[response.answer], cdf[response.answer - 1]);
                let p = upper - lower;
                let w_upper = upper * (1.0 - upper);
                let w_lower = lower * (1.0 - lower);
                let first = (-w_lower * (1.0 - 2.0 * lower) + w_upper * (1.0 - 2.0 * upper)) / p;
                let second = ((w_upper - w_lower) / p).powi(2);
                Ok(a * a * (first - second))
            }
            IrtModel::PartialCredit => {
                let probs = models::partial_credit_probabilities(theta, item)?;
                let derivs = models::partial_credit_derivatives(theta, item)?;
                let index = response.answer - 1;
                let p = probs[index];
                Ok(derivs.second[index] / p - (derivs.first[index] / p).powi(2))
            }
        }
    }

    /// Integrates `f` over `[lower, upper]` at the question set's resolution.
    pub fn integrate<F>(&self, f: F, lower: f64, upper: f64) -> Result<f64>
    where
        F: Fn(f64) -> Result<f64>,
    {
        self.integrator.integrate(f, lower, upper)
    }

    /// Point estimate of theta under the configured method.
    pub fn estimate_theta(&self) -> Result<f64> {
        let theta = match self.options.method {
            ThetaMethod::Eap => self.posterior_moments()?.0,
            ThetaMethod::Map | ThetaMethod::Mle => self.score_root()?,
        };
        debug!(
            "{} theta estimate {theta} from {} responses",
            self.options.method,
            self.responses().count()
        );
        Ok(theta)
    }

    /// Standard error matching the configured method: posterior standard
    /// deviation for EAP, `sqrt(-1 / d2LL)` at the estimate for MAP and MLE.
    pub fn estimate_se(&self) -> Result<f64> {
        match self.options.method {
            ThetaMethod::Eap => Ok(self.posterior_moments()?.1.sqrt()),
            method @ (ThetaMethod::Map | ThetaMethod::Mle) => {
                let theta = self.score_root()?;
                let curvature = self.d2_log_likelihood(theta, method.uses_prior())?;
                if !(curvature.is_finite() && curvature < 0.0) {
                    return Err(CatError::NumericalError {
                        context: "standard error from non-negative curvature",
                    });
                }
                Ok((-1.0 / curvature).sqrt())
            }
        }
    }

    fn score_root(&self) -> Result<f64> {
        let use_prior = self.options.method.uses_prior();
        let (theta, summary) = brent(
            |theta| self.d1_log_likelihood(theta, use_prior),
            &self.options.root,
        )?;
        debug!(
            "score root {theta} after {} iterations (width {})",
            summary.iterations, summary.width
        );
        Ok(theta)
    }

    /// Posterior mean and variance of theta over the question set's bounds.
    fn posterior_moments(&self) -> Result<(f64, f64)> {
        let (lower, upper) = (self.questions.lower_bound(), self.questions.upper_bound());
        let density =
            |theta: f64| -> Result<f64> { Ok(self.likelihood(theta)? * self.prior.density(theta)) };

        let mass = self.integrate(density, lower, upper)?;
        if !(mass > 0.0) {
            return Err(CatError::NumericalError {
                context: "posterior normalization",
            });
        }
        let mean = self.integrate(|theta| Ok(theta * density(theta)?), lower, upper)? / mass;
        let variance = self.integrate(
            |theta| Ok((theta - mean).powi(2) * density(theta)?),
            lower,
            upper,
        )? / mass;
        Ok((mean, variance))
    }

    /// Observed information of `item` at `theta` using its recorded (or hypothetical) answer.
    pub fn observed_information(&self, theta: f64, item: usize) -> Result<f64> {
        let answer = self.answer_of(item)?;
        Ok(-self.item_curvature(theta, Response { item, answer })?)
    }

    /// Observed information of `item` at `theta` had it been answered with `answer`.
    pub fn observed_information_for(&self, theta: f64, item: usize, answer: usize) -> Result<f64> {
        self.questions.validate_answer(item, answer)?;
        Ok(-self.item_curvature(theta, Response { item, answer })?)
    }

    /// Fisher information of `item` at `theta`.
    pub fn fisher_information(&self, theta: f64, item: usize) -> Result<f64> {
        let params = self.questions.item(item)?;
        match self.questions.model() {
            IrtModel::BinaryIrt => self.observed_information_for(theta, item, 1),
            IrtModel::GradedResponse => {
                let cdf = models::graded_cumulative(theta, params)?;
                let mut total = 0.0;
                for k in 1..cdf.len() {
                    let w_upper = cdf[k] * (1.0 - cdf[k]);
                    let w_lower = cdf[k - 1] * (1.0 - cdf[k - 1]);
                    total += (w_upper - w_lower).powi(2) / (cdf[k] - cdf[k - 1]);
                }
                Ok(params.discrimination.powi(2) * total)
            }
            IrtModel::PartialCredit => {
                let probs = models::partial_credit_probabilities(theta, params)?;
                let derivs = models::partial_credit_derivatives(theta, params)?;
                Ok(probs
                    .iter()
                    .zip(derivs.first.iter().zip(derivs.second.iter()))
                    .map(|(p, (first, second))| first * first / p - second)
                    .sum())
            }
        }
    }

    /// Sum of Fisher information over the answered items at `theta`.
    pub fn test_information_at(&self, theta: f64) -> Result<f64> {
        let mut total = 0.0;
        for response in self.responses() {
            total += self.fisher_information(theta, response.item)?;
        }
        Ok(total)
    }

    /// Test information at the current theta estimate.
    pub fn fisher_test_information(&self) -> Result<f64> {
        let theta = self.estimate_theta()?;
        self.test_information_at(theta)
    }

    /// Posterior variance expected after administering `item`, weighting each
    /// possible answer by its probability at the current estimate.
    pub fn expected_posterior_variance(&self, item: usize) -> Result<f64> {
        let theta = self.estimate_theta()?;
        let probs = self.probability(theta, item)?;
        let mut total = 0.0;
        for (answer, p) in probs.categories() {
            let se = self.with_response(item, answer)?.estimate_se()?;
            total += p * se * se;
        }
        Ok(total)
    }

    /// Observed information expected from administering `item`, evaluated at
    /// the theta re-estimated under each possible answer.
    pub fn expected_observed_information(&self, item: usize) -> Result<f64> {
        let theta = self.estimate_theta()?;
        let probs = self.probability(theta, item)?;
        let mut total = 0.0;
        for (answer, p) in probs.categories() {
            let look_ahead = self.with_response(item, answer)?;
            let updated = look_ahead.estimate_theta()?;
            total += p * look_ahead.observed_information(updated, item)?;
        }
        Ok(total)
    }

    /// Kullback-Leibler divergence of the response distribution of `item`
    /// at `theta_not` from that at `theta_hat`.
    pub fn kl(&self, theta_not: f64, item: usize, theta_hat: f64) -> Result<f64> {
        let truth = self.probability(theta_not, item)?.categories();
        let estimate = self.probability(theta_hat, item)?.categories();
        Ok(truth
            .iter()
            .zip(estimate.iter())
            .map(|((_, p), (_, q))| p * (p.ln() - q.ln()))
            .sum())
    }

    /// Window `theta_hat ± z * sqrt(1 / test information)`, clipped to the theta bounds.
    ///
    /// Falls back to the full bounds while no information has accumulated.
    pub fn information_window(&self) -> Result<InformationWindow> {
        let (lower, upper) = (self.questions.lower_bound(), self.questions.upper_bound());
        let theta = self.estimate_theta()?;
        let information = self.test_information_at(theta)?;
        if !(information > 0.0) {
            debug!("no test information at theta {theta}; using full bounds");
            return Ok(InformationWindow {
                theta,
                lower,
                upper,
            });
        }
        let center = theta.clamp(lower, upper);
        let delta = self.questions.z()[0] * (1.0 / information).sqrt();
        Ok(InformationWindow {
            theta,
            lower: (center - delta).max(lower),
            upper: (center + delta).min(upper),
        })
    }

    /// Fisher information of `item` integrated over the information window.
    pub fn fii(&self, item: usize) -> Result<f64> {
        self.fii_in(item, &self.information_window()?)
    }

    /// Like [`Estimator::fii`] with a precomputed window.
    pub fn fii_in(&self, item: usize, window: &InformationWindow) -> Result<f64> {
        self.integrate(
            |theta| self.fisher_information(theta, item),
            window.lower,
            window.upper,
        )
    }

    /// Unweighted KL divergence of `item` integrated over the information window.
    pub fn expected_kl(&self, item: usize) -> Result<f64> {
        self.expected_kl_in(item, &self.information_window()?)
    }

    /// Like [`Estimator::expected_kl`] with a precomputed window.
    pub fn expected_kl_in(&self, item: usize, window: &InformationWindow) -> Result<f64> {
        self.integrate(
            |theta_not| self.kl(theta_not, item, window.theta),
            window.lower,
            window.upper,
        )
    }

    /// Likelihood-weighted KL divergence of `item` over the theta bounds.
    pub fn likelihood_kl(&self, item: usize) -> Result<f64> {
        self.likelihood_kl_at(item, self.estimate_theta()?)
    }

    /// Like [`Estimator::likelihood_kl`] with a precomputed theta estimate.
    pub fn likelihood_kl_at(&self, item: usize, theta_hat: f64) -> Result<f64> {
        self.integrate(
            |theta_not| Ok(self.likelihood(theta_not)? * self.kl(theta_not, item, theta_hat)?),
            self.questions.lower_bound(),
            self.questions.upper_bound(),
        )
    }

    /// Posterior-weighted KL divergence of `item` over the theta bounds.
    pub fn posterior_kl(&self, item: usize) -> Result<f64> {
        self.posterior_kl_at(item, self.estimate_theta()?)
    }

    /// Like [`Estimator::posterior_kl`] with a precomputed theta estimate.
    pub fn posterior_kl_at(&self, item: usize, theta_hat: f64) -> Result<f64> {
        self.integrate(
            |theta_not| {
                Ok(self.prior.density(theta_not)
                    * self.likelihood(theta_not)?
                    * self.kl(theta_not, item, theta_hat)?)
            },
            self.questions.lower_bound(),
            self.questions.upper_bound(),
        )
    }

    /// Likelihood-weighted Fisher information of `item`.
    pub fn lwi(&self, item: usize) -> Result<f64> {
        self.integrate(
            |theta| Ok(self.likelihood(theta)? * self.fisher_information(theta, item)?),
            self.questions.lower_bound(),
            self.questions.upper_bound(),
        )
    }

    /// Posterior-weighted Fisher information of `item`.
    pub fn pwi(&self, item: usize) -> Result<f64> {
        self.integrate(
            |theta| {
                Ok(self.likelihood(theta)?
                    * self.prior.density(theta)
                    * self.fisher_information(theta, item)?)
            },
            self.questions.lower_bound(),
            self.questions.upper_bound(),
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::data::Item;

    fn logistic(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    fn bank(model: IrtModel, items: Vec<Item>) -> QuestionSet {
        QuestionSet::builder(model, items).build().unwrap()
    }

    fn binary_pair() -> QuestionSet {
        bank(
            IrtModel::BinaryIrt,
            vec![Item::binary(1.0, 0.0, 0.0), Item::binary(1.5, -0.5, 0.2)],
        )
    }

    fn graded_pair() -> QuestionSet {
        bank(
            IrtModel::GradedResponse,
            vec![
                Item::polytomous(1.2, &[-1.0, 1.0]),
                Item::polytomous(0.8, &[0.5]),
            ],
        )
    }

    fn partial_credit_pair() -> QuestionSet {
        bank(
            IrtModel::PartialCredit,
            vec![
                Item::polytomous(1.0, &[-0.5, 0.5]),
                Item::polytomous(0.7, &[0.2]),
            ],
        )
    }

    #[test]
    fn binary_likelihood_matches_hand_computation() {
        let mut questions = binary_pair();
        questions.record_answer(0, 1).unwrap();
        questions.record_answer(1, 0).unwrap();
        let prior = Prior::default();
        let estimator = Estimator::new(&questions, &prior, EstimatorOptions::default()).unwrap();

        let theta = 0.3;
        let p1 = logistic(theta);
        let p2 = 0.2 + 0.8 * logistic(-0.5 + 1.5 * theta);
        assert_relative_eq!(
            estimator.likelihood(theta).unwrap(),
            p1 * (1.0 - p2),
            epsilon = 1e-14
        );
    }

    #[test]
    fn graded_likelihood_matches_hand_computation() {
        let mut questions = graded_pair();
        questions.record_answer(0, 2).unwrap();
        questions.record_answer(1, 1).unwrap();
        let prior = Prior::default();
        let estimator = Estimator::new(&questions, &prior, EstimatorOptions::default()).unwrap();

        let theta = -0.4;
        let first = logistic(1.0 - 1.2 * theta) - logistic(-1.0 - 1.2 * theta);
        let second = logistic(0.5 - 0.8 * theta);
        assert_relative_eq!(
            estimator.likelihood(theta).unwrap(),
            first * second,
            epsilon = 1e-14
        );
    }

    #[test]
    fn partial_credit_likelihood_matches_hand_computation() {
        let mut questions = partial_credit_pair();
        questions.record_answer(0, 3).unwrap();
        questions.record_answer(1, 1).unwrap();
        let prior = Prior::default();
        let estimator = Estimator::new(&questions, &prior, EstimatorOptions::default()).unwrap();

        let theta = 0.6_f64;
        let e0 = theta.exp();
        let e1 = (theta + (theta + 0.5)).exp();
        let e2 = (theta + (theta + 0.5) + (theta - 0.5)).exp();
        let first = e2 / (e0 + e1 + e2);
        let f0 = (0.7 * theta).exp();
        let f1 = (0.7 * theta + 0.7 * (theta - 0.2)).exp();
        let second = f0 / (f0 + f1);
        assert_relative_eq!(
            estimator.likelihood(theta).unwrap(),
            first * second,
            epsilon = 1e-14
        );
    }

    #[test]
    fn derivatives_match_finite_differences_for_every_model() {
        let prior = Prior::normal(0.2, 1.3).unwrap();
        let cases = [
            (binary_pair(), [1usize, 0usize]),
            (graded_pair(), [3, 2]),
            (partial_credit_pair(), [2, 2]),
        ];
        for (mut questions, answers) in cases {
            questions.record_answer(0, answers[0]).unwrap();
            questions.record_answer(1, answers[1]).unwrap();
            let estimator =
                Estimator::new(&questions, &prior, EstimatorOptions::default()).unwrap();

            let theta = 0.25;
            let h = 1e-5;
            let ll = |t: f64| estimator.log_likelihood(t).unwrap();
            let numeric_d1 = (ll(theta + h) - ll(theta - h)) / (2.0 * h);
            assert_relative_eq!(
                estimator.d1_log_likelihood(theta, false).unwrap(),
                numeric_d1,
                epsilon = 1e-6
            );

            if questions.model() != IrtModel::BinaryIrt {
                let numeric_d2 = (ll(theta + h) - 2.0 * ll(theta) + ll(theta - h)) / (h * h);
                assert_relative_eq!(
                    estimator.d2_log_likelihood(theta, false).unwrap(),
                    numeric_d2,
                    epsilon = 1e-3
                );
            }

            let penalized = estimator.d1_log_likelihood(theta, true).unwrap();
            let unpenalized = estimator.d1_log_likelihood(theta, false).unwrap();
            assert_relative_eq!(
                unpenalized - penalized,
                (theta - 0.2) / 1.69,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn derivatives_without_answers_reduce_to_prior() {
        let questions = binary_pair();
        let prior = Prior::normal(0.5, 2.0).unwrap();
        let estimator = Estimator::new(&questions, &prior, EstimatorOptions::default()).unwrap();
        assert_relative_eq!(
            estimator.d1_log_likelihood(1.5, true).unwrap(),
            -0.25,
            epsilon = 1e-15
        );
        assert_relative_eq!(
            estimator.d2_log_likelihood(1.5, false).unwrap(),
            -0.25,
            epsilon = 1e-15
        );
        assert_relative_eq!(estimator.likelihood(0.7).unwrap(), 1.0);
    }

    #[test]
    fn hypothetical_response_matches_recorded_response() {
        let mut questions = graded_pair();
        questions.record_answer(0, 1).unwrap();
        let prior = Prior::default();
        let options = EstimatorOptions::default().with_method(ThetaMethod::Map);
        let base = Estimator::new(&questions, &prior, options.clone()).unwrap();
        let look_ahead = base.with_response(1, 2).unwrap();

        let mut recorded = questions.clone();
        recorded.record_answer(1, 2).unwrap();
        let direct = Estimator::new(&recorded, &prior, options).unwrap();

        assert_relative_eq!(
            look_ahead.likelihood(0.1).unwrap(),
            direct.likelihood(0.1).unwrap(),
            epsilon = 1e-15
        );
        assert_relative_eq!(
            look_ahead.estimate_theta().unwrap(),
            direct.estimate_theta().unwrap(),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            look_ahead.estimate_se().unwrap(),
            direct.estimate_se().unwrap(),
            epsilon = 1e-9
        );
        assert_eq!(questions.applicable_rows(), &[0]);

        assert!(matches!(
            base.with_response(0, 2),
            Err(CatError::AlreadyAnswered { item: 0 })
        ));
        assert!(matches!(
            look_ahead.with_response(1, 1),
            Err(CatError::HypotheticalOccupied { item: 1 })
        ));
        assert!(matches!(
            base.with_response(1, 3),
            Err(CatError::InvalidAnswer { .. })
        ));
    }

    #[test]
    fn map_on_symmetric_pattern_returns_prior_mean() {
        let mut questions = bank(
            IrtModel::BinaryIrt,
            vec![Item::binary(1.0, 0.0, 0.0), Item::binary(1.0, 0.0, 0.0)],
        );
        questions.record_answer(0, 1).unwrap();
        questions.record_answer(1, 0).unwrap();
        let prior = Prior::default();
        let options = EstimatorOptions::default().with_method(ThetaMethod::Map);
        let estimator = Estimator::new(&questions, &prior, options).unwrap();
        assert!(estimator.estimate_theta().unwrap().abs() < 1e-6);

        // d2LL = -2 * 0.25 - 1 at theta = 0.
        assert_relative_eq!(
            estimator.estimate_se().unwrap(),
            (1.0_f64 / 1.5).sqrt(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn mle_without_sign_change_fails() {
        let mut questions = binary_pair();
        questions.record_answer(0, 1).unwrap();
        questions.record_answer(1, 1).unwrap();
        let prior = Prior::default();
        let options = EstimatorOptions::default().with_method(ThetaMethod::Mle);
        let estimator = Estimator::new(&questions, &prior, options).unwrap();
        let error = estimator.estimate_theta().unwrap_err();
        assert!(matches!(error, CatError::NoSignChange { .. }));
        assert!(error.is_numerical());
    }

    #[test]
    fn eap_without_answers_recovers_prior_moments() {
        let questions = binary_pair();
        let prior = Prior::default();
        let estimator = Estimator::new(&questions, &prior, EstimatorOptions::default()).unwrap();
        assert!(estimator.estimate_theta().unwrap().abs() < 1e-10);
        assert_relative_eq!(estimator.estimate_se().unwrap(), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn binary_fisher_equals_observed_information() {
        let mut questions = binary_pair();
        questions.record_answer(1, 0).unwrap();
        let prior = Prior::default();
        let estimator = Estimator::new(&questions, &prior, EstimatorOptions::default()).unwrap();
        let fisher = estimator.fisher_information(0.4, 1).unwrap();
        assert_relative_eq!(
            fisher,
            estimator.observed_information(0.4, 1).unwrap(),
            epsilon = 1e-15
        );
        let p = logistic(0.4);
        assert_relative_eq!(
            estimator.fisher_information(0.4, 0).unwrap(),
            p * (1.0 - p),
            epsilon = 1e-12
        );
        assert!(matches!(
            estimator.observed_information(0.4, 0),
            Err(CatError::Unanswered { item: 0 })
        ));
    }

    #[test]
    fn polytomous_fisher_is_expected_squared_score() {
        let prior = Prior::default();
        for questions in [graded_pair(), partial_credit_pair()] {
            let estimator =
                Estimator::new(&questions, &prior, EstimatorOptions::default()).unwrap();
            let theta = -0.3;
            let probs = estimator.probability(theta, 0).unwrap();
            let mut expected = 0.0;
            for (answer, p) in probs.categories() {
                let score = estimator
                    .with_response(0, answer)
                    .unwrap()
                    .d1_log_likelihood(theta, false)
                    .unwrap();
                expected += p * score * score;
            }
            assert_relative_eq!(
                estimator.fisher_information(theta, 0).unwrap(),
                expected,
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn look_ahead_criteria_leave_question_set_untouched() {
        let mut questions = partial_credit_pair();
        questions.record_answer(1, 2).unwrap();
        let snapshot = questions.clone();
        let prior = Prior::default();
        let estimator = Estimator::new(&questions, &prior, EstimatorOptions::default()).unwrap();

        let variance = estimator.expected_posterior_variance(0).unwrap();
        let information = estimator.expected_observed_information(0).unwrap();
        assert!(variance > 0.0 && variance < 1.0);
        assert!(information > 0.0);

        assert_eq!(questions.applicable_rows(), snapshot.applicable_rows());
        assert_eq!(questions.nonapplicable_rows(), snapshot.nonapplicable_rows());
        assert_eq!(questions.answer(0).unwrap(), None);
    }

    #[test]
    fn kl_vanishes_at_the_estimate_and_is_positive_elsewhere() {
        let prior = Prior::default();
        for questions in [binary_pair(), graded_pair(), partial_credit_pair()] {
            let estimator =
                Estimator::new(&questions, &prior, EstimatorOptions::default()).unwrap();
            assert_relative_eq!(estimator.kl(0.4, 0, 0.4).unwrap(), 0.0, epsilon = 1e-15);
            assert!(estimator.kl(1.2, 0, 0.4).unwrap() > 0.0);
        }
    }

    #[test]
    fn information_window_shrinks_with_information() {
        let mut questions = binary_pair();
        let prior = Prior::default();
        {
            let estimator =
                Estimator::new(&questions, &prior, EstimatorOptions::default()).unwrap();
            let window = estimator.information_window().unwrap();
            assert_eq!((window.lower, window.upper), (-5.0, 5.0));
        }

        questions.record_answer(0, 1).unwrap();
        questions.record_answer(1, 0).unwrap();
        let estimator = Estimator::new(&questions, &prior, EstimatorOptions::default()).unwrap();
        let window = estimator.information_window().unwrap();
        let information = estimator.test_information_at(window.theta).unwrap();
        assert_relative_eq!(
            window.upper - window.lower,
            2.0 * 0.9 / information.sqrt(),
            epsilon = 1e-10
        );
        assert!(estimator.fii_in(0, &window).unwrap() > 0.0);
        assert!(estimator.expected_kl_in(0, &window).unwrap() > 0.0);
    }

    #[test]
    fn weighted_information_criteria_are_positive() {
        let mut questions = graded_pair();
        questions.record_answer(0, 2).unwrap();
        let prior = Prior::default();
        let estimator = Estimator::new(&questions, &prior, EstimatorOptions::default()).unwrap();
        let lwi = estimator.lwi(1).unwrap();
        let pwi = estimator.pwi(1).unwrap();
        assert!(lwi > 0.0 && pwi > 0.0);
        assert!(estimator.likelihood_kl(1).unwrap() > 0.0);
        assert!(estimator.posterior_kl(1).unwrap() > 0.0);
        assert!(matches!(
            estimator.probability(0.0, 9),
            Err(CatError::ItemOutOfRange { item: 9, .. })
        ));
    }
}

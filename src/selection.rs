//! Item-selection strategies and the registry that looks them up by name.
//!
//! Every strategy scores the unanswered items of a question set through a
//! shared [`Estimator`]. Scores for different candidates are independent, so
//! the information criteria are evaluated on the rayon thread pool.

use std::collections::HashMap;
use std::fmt;

use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::{CatError, Result};
use crate::estimation::Estimator;

/// Direction in which a criterion prefers its scores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Objective {
    /// Larger scores are preferred.
    #[default]
    Maximize,
    /// Smaller scores are preferred.
    Minimize,
}

/// Scores candidate items under one criterion.
pub trait Selector: Send + Sync {
    /// Registry name of the criterion, e.g. `"MFI"`.
    fn name(&self) -> &str;

    /// Whether larger or smaller scores win.
    fn objective(&self) -> Objective {
        Objective::Maximize
    }

    /// One score per entry of `candidates`, in the same order.
    fn score_candidates(&self, estimator: &Estimator<'_>, candidates: &[usize])
        -> Result<Vec<f64>>;
}

impl fmt::Debug for dyn Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector").field("name", &self.name()).finish()
    }
}

/// Outcome of one selection round.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    /// Registry name of the criterion that produced this selection.
    pub criterion: String,
    /// Chosen item index.
    pub item: usize,
    /// Score of the chosen item.
    pub value: f64,
    /// Candidate item indices in the order they were scored.
    pub candidates: Vec<usize>,
    /// Score of each candidate.
    pub values: Vec<f64>,
    /// Display name of each candidate.
    pub names: Vec<String>,
}

impl Selection {
    /// Display name of the chosen item.
    pub fn name(&self) -> &str {
        self.candidates
            .iter()
            .position(|&candidate| candidate == self.item)
            .map(|index| self.names[index].as_str())
            .unwrap_or_default()
    }
}

/// Scores every unanswered item with `selector` and returns the best one.
///
/// Ties resolve to the lowest item index.
pub fn select_next_item(estimator: &Estimator<'_>, selector: &dyn Selector) -> Result<Selection> {
    let questions = estimator.questions();
    let pending = estimator.hypothetical().map(|response| response.item);
    let candidates: Vec<usize> = questions
        .nonapplicable_rows()
        .iter()
        .copied()
        .filter(|&item| Some(item) != pending)
        .collect();
    if candidates.is_empty() {
        return Err(CatError::NoCandidates);
    }

    let values = selector.score_candidates(estimator, &candidates)?;
    if values.len() != candidates.len() {
        return Err(CatError::dimension_mismatch(
            "candidate scores",
            candidates.len(),
            values.len(),
        ));
    }
    let best = best_index(&values, selector.objective())?;
    let names = candidates
        .iter()
        .map(|&item| questions.name(item).map(str::to_owned))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "{} selected item {} ({}) with score {} among {} candidates",
        selector.name(),
        candidates[best],
        names[best],
        values[best],
        candidates.len()
    );
    Ok(Selection {
        criterion: selector.name().to_owned(),
        item: candidates[best],
        value: values[best],
        candidates,
        values,
        names,
    })
}

/// Position of the preferred score; the first occurrence wins ties.
fn best_index(values: &[f64], objective: Objective) -> Result<usize> {
    if values.iter().any(|value| value.is_nan()) {
        return Err(CatError::NumericalError {
            context: "candidate scoring",
        });
    }
    let mut best = 0;
    for (index, value) in values.iter().enumerate().skip(1) {
        let better = match objective {
            Objective::Maximize => *value > values[best],
            Objective::Minimize => *value < values[best],
        };
        if better {
            best = index;
        }
    }
    Ok(best)
}

fn score_each<F>(candidates: &[usize], score: F) -> Result<Vec<f64>>
where
    F: Fn(usize) -> Result<f64> + Sync + Send,
{
    candidates.par_iter().map(|&item| score(item)).collect()
}

/// Fisher information at the current theta estimate.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaximumFisherInformation;

impl Selector for MaximumFisherInformation {
    fn name(&self) -> &str {
        "MFI"
    }

    fn score_candidates(
        &self,
        estimator: &Estimator<'_>,
        candidates: &[usize],
    ) -> Result<Vec<f64>> {
        let theta = estimator.estimate_theta()?;
        score_each(candidates, |item| estimator.fisher_information(theta, item))
    }
}

/// Expected observed information over the candidate's possible answers.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaximumExpectedInformation;

impl Selector for MaximumExpectedInformation {
    fn name(&self) -> &str {
        "MEI"
    }

    fn score_candidates(
        &self,
        estimator: &Estimator<'_>,
        candidates: &[usize],
    ) -> Result<Vec<f64>> {
        score_each(candidates, |item| {
            estimator.expected_observed_information(item)
        })
    }
}

/// Expected posterior variance after administering the candidate; smaller is better.
#[derive(Clone, Copy, Debug, Default)]
pub struct MinimumExpectedPosteriorVariance;

impl Selector for MinimumExpectedPosteriorVariance {
    fn name(&self) -> &str {
        "MEPV"
    }

    fn objective(&self) -> Objective {
        Objective::Minimize
    }

    fn score_candidates(
        &self,
        estimator: &Estimator<'_>,
        candidates: &[usize],
    ) -> Result<Vec<f64>> {
        score_each(candidates, |item| estimator.expected_posterior_variance(item))
    }
}

/// Fisher information integrated against the likelihood.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaximumLikelihoodWeightedInformation;

impl Selector for MaximumLikelihoodWeightedInformation {
    fn name(&self) -> &str {
        "MLWI"
    }

    fn score_candidates(
        &self,
        estimator: &Estimator<'_>,
        candidates: &[usize],
    ) -> Result<Vec<f64>> {
        score_each(candidates, |item| estimator.lwi(item))
    }
}

/// Fisher information integrated against the posterior.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaximumPosteriorWeightedInformation;

impl Selector for MaximumPosteriorWeightedInformation {
    fn name(&self) -> &str {
        "MPWI"
    }

    fn score_candidates(
        &self,
        estimator: &Estimator<'_>,
        candidates: &[usize],
    ) -> Result<Vec<f64>> {
        score_each(candidates, |item| estimator.pwi(item))
    }
}

/// Fisher information integrated over the information window.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaximumFisherInterval;

impl Selector for MaximumFisherInterval {
    fn name(&self) -> &str {
        "MFII"
    }

    fn score_candidates(
        &self,
        estimator: &Estimator<'_>,
        candidates: &[usize],
    ) -> Result<Vec<f64>> {
        let window = estimator.information_window()?;
        score_each(candidates, |item| estimator.fii_in(item, &window))
    }
}

/// KL divergence integrated over the information window.
#[derive(Clone, Copy, Debug, Default)]
pub struct KullbackLeibler;

impl Selector for KullbackLeibler {
    fn name(&self) -> &str {
        "KL"
    }

    fn score_candidates(
        &self,
        estimator: &Estimator<'_>,
        candidates: &[usize],
    ) -> Result<Vec<f64>> {
        let window = estimator.information_window()?;
        score_each(candidates, |item| estimator.expected_kl_in(item, &window))
    }
}

/// Likelihood-weighted KL divergence over the theta bounds.
#[derive(Clone, Copy, Debug, Default)]
pub struct LikelihoodKullbackLeibler;

impl Selector for LikelihoodKullbackLeibler {
    fn name(&self) -> &str {
        "LKL"
    }

    fn score_candidates(
        &self,
        estimator: &Estimator<'_>,
        candidates: &[usize],
    ) -> Result<Vec<f64>> {
        let theta = estimator.estimate_theta()?;
        score_each(candidates, |item| estimator.likelihood_kl_at(item, theta))
    }
}

/// Posterior-weighted KL divergence over the theta bounds.
#[derive(Clone, Copy, Debug, Default)]
pub struct PosteriorKullbackLeibler;

impl Selector for PosteriorKullbackLeibler {
    fn name(&self) -> &str {
        "PKL"
    }

    fn score_candidates(
        &self,
        estimator: &Estimator<'_>,
        candidates: &[usize],
    ) -> Result<Vec<f64>> {
        let theta = estimator.estimate_theta()?;
        score_each(candidates, |item| estimator.posterior_kl_at(item, theta))
    }
}

/// Uniform random scores, reproducible for a given seed and number of answers.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomSelector {
    /// Base seed combined with the number of answered items.
    pub seed: u64,
}

impl RandomSelector {
    /// Random selector with the given base seed.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl Selector for RandomSelector {
    fn name(&self) -> &str {
        "RANDOM"
    }

    fn score_candidates(
        &self,
        estimator: &Estimator<'_>,
        candidates: &[usize],
    ) -> Result<Vec<f64>> {
        let answered = estimator.responses().count() as u64;
        let mut rng = SmallRng::seed_from_u64(self.seed ^ answered);
        Ok(candidates.iter().map(|_| rng.gen::<f64>()).collect())
    }
}

/// Fisher information at the prior location, ignoring the answers.
#[derive(Clone, Copy, Debug, Default)]
pub struct PriorInformation;

impl Selector for PriorInformation {
    fn name(&self) -> &str {
        "PRIOR"
    }

    fn score_candidates(
        &self,
        estimator: &Estimator<'_>,
        candidates: &[usize],
    ) -> Result<Vec<f64>> {
        let theta = estimator.prior().param0();
        score_each(candidates, |item| estimator.fisher_information(theta, item))
    }
}

/// Selection strategies keyed by their upper-case criterion name.
#[derive(Debug)]
pub struct SelectorRegistry {
    selectors: HashMap<String, Box<dyn Selector>>,
}

impl SelectorRegistry {
    /// Registry without any strategies.
    pub fn empty() -> Self {
        Self {
            selectors: HashMap::new(),
        }
    }

    /// Adds `selector`, returning any strategy previously registered under its name.
    pub fn register(&mut self, selector: Box<dyn Selector>) -> Option<Box<dyn Selector>> {
        self.selectors
            .insert(selector.name().to_ascii_uppercase(), selector)
    }

    /// Looks up a strategy by name, ignoring case.
    pub fn get(&self, name: &str) -> Result<&dyn Selector> {
        self.selectors
            .get(&name.to_ascii_uppercase())
            .map(|selector| selector.as_ref())
            .ok_or_else(|| CatError::UnknownSelector(name.to_owned()))
    }

    /// Takes the strategy registered under `name` out of the registry.
    pub fn remove(&mut self, name: &str) -> Result<Box<dyn Selector>> {
        self.selectors
            .remove(&name.to_ascii_uppercase())
            .ok_or_else(|| CatError::UnknownSelector(name.to_owned()))
    }

    /// Registered names in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.selectors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Runs the strategy registered under `name`.
    pub fn select(&self, name: &str, estimator: &Estimator<'_>) -> Result<Selection> {
        select_next_item(estimator, self.get(name)?)
    }
}

impl Default for SelectorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(MaximumFisherInformation));
        registry.register(Box::new(MaximumExpectedInformation));
        registry.register(Box::new(MinimumExpectedPosteriorVariance));
        registry.register(Box::new(MaximumLikelihoodWeightedInformation));
        registry.register(Box::new(MaximumPosteriorWeightedInformation));
        registry.register(Box::new(MaximumFisherInterval));
        registry.register(Box::new(KullbackLeibler));
        registry.register(Box::new(LikelihoodKullbackLeibler));
        registry.register(Box::new(PosteriorKullbackLeibler));
        registry.register(Box::new(RandomSelector::default()));
        registry.register(Box::new(PriorInformation));
        registry
    }
}

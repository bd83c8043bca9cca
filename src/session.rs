//! Single-respondent adaptive testing loop.

use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Bernoulli, Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};

use crate::data::QuestionSet;
use crate::error::{CatError, Result};
use crate::estimation::Estimator;
use crate::models::Probabilities;
use crate::options::EstimatorOptions;
use crate::prior::Prior;
use crate::selection::{select_next_item, Selection, Selector, SelectorRegistry};

/// When an adaptive session ends.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopRules {
    /// Cap on answered items, counting answers recorded before [`AdaptiveSession::run`].
    pub max_items: usize,
    /// Answered items required before the precision rule may stop the session.
    pub min_items: usize,
    /// Stop once the standard error falls to this value.
    pub se_threshold: f64,
}

impl Default for StopRules {
    fn default() -> Self {
        Self {
            max_items: 20,
            min_items: 1,
            se_threshold: 0.3,
        }
    }
}

/// Result of running a session to completion.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    /// Final theta estimate.
    pub theta: f64,
    /// Standard error of the final estimate.
    pub standard_error: f64,
    /// Items administered by this run, in administration order.
    pub administered: Vec<usize>,
    /// Answer given to each administered item.
    pub answers: Vec<usize>,
}

/// Question set, prior, and selection strategy for one respondent.
#[derive(Debug)]
pub struct AdaptiveSession {
    questions: QuestionSet,
    prior: Prior,
    options: EstimatorOptions,
    selector: Box<dyn Selector>,
}

impl AdaptiveSession {
    /// Session over `questions` scored by `selector`.
    pub fn new(
        questions: QuestionSet,
        prior: Prior,
        options: EstimatorOptions,
        selector: Box<dyn Selector>,
    ) -> Self {
        Self {
            questions,
            prior,
            options,
            selector,
        }
    }

    /// Builds a session around a strategy from the default registry.
    pub fn with_criterion(
        questions: QuestionSet,
        prior: Prior,
        options: EstimatorOptions,
        criterion: &str,
    ) -> Result<Self> {
        let selector = SelectorRegistry::default().remove(criterion)?;
        Ok(Self::new(questions, prior, options, selector))
    }

    /// Item bank with the answers recorded so far.
    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    /// Prior used for estimation.
    pub fn prior(&self) -> &Prior {
        &self.prior
    }

    /// Name of the selection criterion.
    pub fn criterion(&self) -> &str {
        self.selector.name()
    }

    /// Estimator over the answers recorded so far.
    pub fn estimator(&self) -> Result<Estimator<'_>> {
        Estimator::new(&self.questions, &self.prior, self.options.clone())
    }

    /// Chooses the next item without recording anything.
    pub fn next_item(&self) -> Result<Selection> {
        select_next_item(&self.estimator()?, self.selector.as_ref())
    }

    /// Records `answer` for `item`.
    pub fn record(&mut self, item: usize, answer: usize) -> Result<()> {
        self.questions.record_answer(item, answer)?;
        debug!("recorded answer {answer} for item {item}");
        Ok(())
    }

    /// Removes the answer of `item`, returning it.
    pub fn clear(&mut self, item: usize) -> Result<Option<usize>> {
        self.questions.clear_answer(item)
    }

    /// Current theta estimate.
    pub fn theta(&self) -> Result<f64> {
        self.estimator()?.estimate_theta()
    }

    /// Standard error of the current theta estimate.
    pub fn standard_error(&self) -> Result<f64> {
        self.estimator()?.estimate_se()
    }

    /// Number of answered items.
    pub fn answered(&self) -> usize {
        self.questions.applicable_rows().len()
    }

    /// Whether `rules` end the session in its current state.
    pub fn should_stop(&self, rules: &StopRules) -> Result<bool> {
        let answered = self.answered();
        if answered >= rules.max_items || self.questions.nonapplicable_rows().is_empty() {
            return Ok(true);
        }
        if answered < rules.min_items || answered == 0 {
            return Ok(false);
        }
        Ok(self.standard_error()? <= rules.se_threshold)
    }

    /// Alternates selection and answering until `rules` stop the session.
    ///
    /// `respond` receives the question set and the selected item and returns
    /// the answer to record.
    pub fn run<F>(&mut self, rules: &StopRules, mut respond: F) -> Result<SessionSummary>
    where
        F: FnMut(&QuestionSet, usize) -> Result<usize>,
    {
        let start = self.answered();
        while !self.should_stop(rules)? {
            let selection = self.next_item()?;
            let answer = respond(&self.questions, selection.item)?;
            self.record(selection.item, answer)?;
        }

        let estimator = self.estimator()?;
        let theta = estimator.estimate_theta()?;
        let standard_error = estimator.estimate_se()?;
        let administered = self.questions.applicable_rows()[start..].to_vec();
        let answers = administered
            .iter()
            .map(|&item| {
                self.questions
                    .answer(item)?
                    .ok_or(CatError::Unanswered { item })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "{} session stopped after {} items: theta {theta}, se {standard_error}",
            self.criterion(),
            administered.len()
        );
        Ok(SessionSummary {
            theta,
            standard_error,
            administered,
            answers,
        })
    }
}

/// Draws an answer to `item` for a respondent located at `theta`.
pub fn simulate_response<R>(
    questions: &QuestionSet,
    item: usize,
    theta: f64,
    rng: &mut R,
) -> Result<usize>
where
    R: Rng + ?Sized,
{
    let params = questions.item(item)?;
    match crate::models::probabilities(questions.model(), theta, params)? {
        Probabilities::Binary(p) => {
            let draw = Bernoulli::new(p).map_err(|_| CatError::invalid("response probability", p))?;
            Ok(usize::from(draw.sample(rng)))
        }
        probs => {
            let categories = probs.categories();
            let weights = WeightedIndex::new(categories.iter().map(|(_, p)| *p)).map_err(|_| {
                CatError::NumericalError {
                    context: "category sampling weights",
                }
            })?;
            Ok(categories[weights.sample(rng)].0)
        }
    }
}

/// Respondent with a known theta, answering from the model probabilities.
#[derive(Clone, Debug)]
pub struct SimulatedRespondent {
    theta: f64,
    rng: SmallRng,
}

impl SimulatedRespondent {
    /// Respondent at `theta` drawing answers from a generator seeded with `seed`.
    pub fn new(theta: f64, seed: u64) -> Self {
        Self {
            theta,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// True theta of the respondent.
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Draws an answer to `item`.
    pub fn respond(&mut self, questions: &QuestionSet, item: usize) -> Result<usize> {
        simulate_response(questions, item, self.theta, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{IrtModel, Item};
    use crate::selection::MaximumFisherInformation;

    fn bank(size: usize) -> QuestionSet {
        let items = (0..size)
            .map(|index| Item::binary(1.0 + 0.1 * index as f64, -1.5 + 0.4 * index as f64, 0.0))
            .collect();
        QuestionSet::builder(IrtModel::BinaryIrt, items).build().unwrap()
    }

    #[test]
    fn recording_a_correct_answer_raises_theta() {
        let mut session = AdaptiveSession::new(
            bank(4),
            Prior::default(),
            EstimatorOptions::default(),
            Box::new(MaximumFisherInformation),
        );
        let before = session.theta().unwrap();
        let item = session.next_item().unwrap().item;
        session.record(item, 1).unwrap();
        assert!(session.theta().unwrap() > before);
        assert_eq!(session.answered(), 1);

        assert_eq!(session.clear(item).unwrap(), Some(1));
        assert_eq!(session.answered(), 0);
        assert!(matches!(session.record(item, 2), Err(CatError::InvalidAnswer { .. })));
    }

    #[test]
    fn run_respects_item_cap() {
        let mut session = AdaptiveSession::with_criterion(
            bank(8),
            Prior::default(),
            EstimatorOptions::default(),
            "mfi",
        )
        .unwrap();
        let rules = StopRules {
            max_items: 5,
            min_items: 5,
            se_threshold: 0.0,
        };
        let mut respondent = SimulatedRespondent::new(0.5, 11);
        let summary = session
            .run(&rules, |questions, item| respondent.respond(questions, item))
            .unwrap();

        assert_eq!(summary.administered.len(), 5);
        let mut unique = summary.administered.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 5);
        assert!(summary.answers.iter().all(|answer| *answer <= 1));
        assert_eq!(session.questions().nonapplicable_rows().len(), 3);
    }

    #[test]
    fn item_cap_counts_answers_recorded_before_run() {
        let mut session = AdaptiveSession::with_criterion(
            bank(8),
            Prior::default(),
            EstimatorOptions::default(),
            "MFI",
        )
        .unwrap();
        for item in [0, 3, 6] {
            session.record(item, 1).unwrap();
        }
        let rules = StopRules {
            max_items: 5,
            min_items: 5,
            se_threshold: 0.0,
        };
        let summary = session.run(&rules, |_, _| Ok(0)).unwrap();

        assert_eq!(summary.administered.len(), 2);
        assert!(summary.administered.iter().all(|item| ![0, 3, 6].contains(item)));
        assert_eq!(session.answered(), 5);
        assert!(session.should_stop(&rules).unwrap());
    }

    #[test]
    fn precision_rule_waits_for_minimum_items() {
        let mut session = AdaptiveSession::with_criterion(
            bank(6),
            Prior::default(),
            EstimatorOptions::default(),
            "PRIOR",
        )
        .unwrap();
        let rules = StopRules {
            max_items: 6,
            min_items: 2,
            se_threshold: 10.0,
        };
        let summary = session.run(&rules, |_, _| Ok(1)).unwrap();
        assert_eq!(summary.administered.len(), 2);
        assert!(summary.standard_error <= 10.0);
    }

    #[test]
    fn unknown_criterion_is_rejected() {
        assert!(matches!(
            AdaptiveSession::with_criterion(
                bank(2),
                Prior::default(),
                EstimatorOptions::default(),
                "BEST",
            ),
            Err(CatError::UnknownSelector(_))
        ));
    }

    #[test]
    fn simulated_answers_are_reproducible_and_valid() {
        let questions = QuestionSet::builder(
            IrtModel::GradedResponse,
            vec![Item::polytomous(1.4, &[-1.0, 0.0, 1.0])],
        )
        .build()
        .unwrap();
        let draw = |seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            (0..20)
                .map(|_| simulate_response(&questions, 0, 0.3, &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        let answers = draw(5);
        assert_eq!(answers, draw(5));
        assert!(answers.iter().all(|answer| (1..=4).contains(answer)));

        let binary = bank(1);
        let mut strong = SimulatedRespondent::new(40.0, 1);
        let correct = (0..50)
            .filter(|_| strong.respond(&binary, 0).unwrap() == 1)
            .count();
        assert!(correct >= 49);
    }
}

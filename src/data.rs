//! Calibrated item banks and the answered/unanswered partition of a test session.

use std::fmt;
use std::str::FromStr;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{CatError, Result};

/// IRT model family shared by every item of a [`QuestionSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrtModel {
    /// Three-parameter logistic model for dichotomous items (`tpm`, or `ltm` without guessing).
    BinaryIrt,
    /// Samejima's graded response model (`grm`).
    GradedResponse,
    /// Generalized partial credit model (`gpcm`).
    PartialCredit,
}

impl IrtModel {
    /// Whether items have more than two response categories.
    pub fn is_polytomous(self) -> bool {
        !matches!(self, Self::BinaryIrt)
    }
}

impl FromStr for IrtModel {
    type Err = CatError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag {
            "ltm" | "tpm" => Ok(Self::BinaryIrt),
            "grm" => Ok(Self::GradedResponse),
            "gpcm" => Ok(Self::PartialCredit),
            other => Err(CatError::UnknownModel(other.to_string())),
        }
    }
}

impl fmt::Display for IrtModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::BinaryIrt => "tpm",
            Self::GradedResponse => "grm",
            Self::PartialCredit => "gpcm",
        };
        f.write_str(tag)
    }
}

/// Calibrated parameters of a single item.
///
/// For the binary model `difficulty` holds one intercept; for polytomous models
/// it holds the `k - 1` category thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Slope of the response curve.
    pub discrimination: f64,
    /// Intercept for binary items, category thresholds otherwise.
    pub difficulty: DVector<f64>,
    /// Lower asymptote; zero for polytomous items.
    #[serde(default)]
    pub guessing: f64,
}

impl Item {
    /// Dichotomous item with a guessing floor.
    pub fn binary(discrimination: f64, difficulty: f64, guessing: f64) -> Self {
        Self {
            discrimination,
            difficulty: DVector::from_element(1, difficulty),
            guessing,
        }
    }

    /// Polytomous item with ordered category thresholds.
    pub fn polytomous(discrimination: f64, thresholds: &[f64]) -> Self {
        Self {
            discrimination,
            difficulty: DVector::from_column_slice(thresholds),
            guessing: 0.0,
        }
    }
}

/// A single recorded or hypothetical response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Response {
    /// Item index.
    pub item: usize,
    /// Recorded answer category.
    pub answer: usize,
}

/// Item bank plus the answers recorded during one test session.
#[derive(Clone, Debug)]
pub struct QuestionSet {
    model: IrtModel,
    items: Vec<Item>,
    names: Vec<String>,
    answers: Vec<Option<usize>>,
    applicable_rows: Vec<usize>,
    nonapplicable_rows: Vec<usize>,
    lower_bound: f64,
    upper_bound: f64,
    z: Vec<f64>,
    subintervals: usize,
}

impl QuestionSet {
    /// Starts a builder for a bank of `items` calibrated under `model`.
    pub fn builder(model: IrtModel, items: Vec<Item>) -> QuestionSetBuilder {
        QuestionSetBuilder::new(model, items)
    }

    /// Model the items were calibrated under.
    pub fn model(&self) -> IrtModel {
        self.model
    }

    /// Number of calibrated items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the parameters of `item`, failing on out-of-range indices.
    pub fn item(&self, item: usize) -> Result<&Item> {
        self.items.get(item).ok_or(CatError::ItemOutOfRange {
            item,
            count: self.items.len(),
        })
    }

    /// Parameters of every item in index order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Display name of `item`.
    pub fn name(&self, item: usize) -> Result<&str> {
        self.item(item)?;
        Ok(&self.names[item])
    }

    /// Recorded answer of `item`, if any.
    pub fn answer(&self, item: usize) -> Result<Option<usize>> {
        self.item(item)?;
        Ok(self.answers[item])
    }

    /// Answered items in the order their answers were recorded.
    pub fn applicable_rows(&self) -> &[usize] {
        &self.applicable_rows
    }

    /// Unanswered items in index order.
    pub fn nonapplicable_rows(&self) -> &[usize] {
        &self.nonapplicable_rows
    }

    /// Iterates over recorded responses in recording order.
    pub fn responses(&self) -> impl Iterator<Item = Response> + '_ {
        self.applicable_rows.iter().filter_map(move |&item| {
            self.answers[item].map(|answer| Response { item, answer })
        })
    }

    /// Lower end of the theta integration range.
    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    /// Upper end of the theta integration range.
    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    /// Critical values used to size information windows.
    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// Quadrature resolution shared by every integral over theta.
    pub fn subintervals(&self) -> usize {
        self.subintervals
    }

    /// Number of response categories of `item`.
    pub fn category_count(&self, item: usize) -> Result<usize> {
        let params = self.item(item)?;
        Ok(match self.model {
            IrtModel::BinaryIrt => 2,
            IrtModel::GradedResponse | IrtModel::PartialCredit => params.difficulty.len() + 1,
        })
    }

    /// Valid answers for `item`: `0..=1` for binary items, `1..=k` otherwise.
    pub fn answer_range(&self, item: usize) -> Result<std::ops::RangeInclusive<usize>> {
        let categories = self.category_count(item)?;
        Ok(match self.model {
            IrtModel::BinaryIrt => 0..=1,
            IrtModel::GradedResponse | IrtModel::PartialCredit => 1..=categories,
        })
    }

    /// Fails unless `answer` is a valid category of `item`.
    pub fn validate_answer(&self, item: usize, answer: usize) -> Result<()> {
        let range = self.answer_range(item)?;
        if range.contains(&answer) {
            Ok(())
        } else {
            Err(CatError::InvalidAnswer {
                item,
                answer,
                min: *range.start(),
                max: *range.end(),
            })
        }
    }

    /// Records `answer` for `item`, moving it into the answered partition.
    ///
    /// Re-recording an answered item overwrites its answer in place.
    pub fn record_answer(&mut self, item: usize, answer: usize) -> Result<()> {
        self.validate_answer(item, answer)?;
        if self.answers[item].replace(answer).is_none() {
            if let Ok(position) = self.nonapplicable_rows.binary_search(&item) {
                self.nonapplicable_rows.remove(position);
            }
            self.applicable_rows.push(item);
        }
        Ok(())
    }

    /// Removes the answer of `item`, returning it to the unanswered partition.
    pub fn clear_answer(&mut self, item: usize) -> Result<Option<usize>> {
        self.item(item)?;
        let previous = self.answers[item].take();
        if previous.is_some() {
            self.applicable_rows.retain(|&row| row != item);
            if let Err(position) = self.nonapplicable_rows.binary_search(&item) {
                self.nonapplicable_rows.insert(position, item);
            }
        }
        Ok(previous)
    }
}

/// Builder that validates item shapes and integration settings before constructing a [`QuestionSet`].
#[derive(Debug)]
pub struct QuestionSetBuilder {
    model: IrtModel,
    items: Vec<Item>,
    names: Option<Vec<String>>,
    lower_bound: f64,
    upper_bound: f64,
    z: Vec<f64>,
    subintervals: usize,
}

impl QuestionSetBuilder {
    /// Start building a question set for `model`.
    pub fn new(model: IrtModel, items: Vec<Item>) -> Self {
        Self {
            model,
            items,
            names: None,
            lower_bound: -5.0,
            upper_bound: 5.0,
            z: vec![0.9],
            subintervals: 10,
        }
    }

    /// Start from a model tag; `ltm` fixes every guessing parameter at zero.
    pub fn from_tag(tag: &str, mut items: Vec<Item>) -> Result<Self> {
        let model = tag.parse::<IrtModel>()?;
        if tag == "ltm" {
            for item in &mut items {
                item.guessing = 0.0;
            }
        }
        Ok(Self::new(model, items))
    }

    /// Sets item display names.
    pub fn names(mut self, names: Vec<String>) -> Self {
        self.names = Some(names);
        self
    }

    /// Sets the theta integration bounds.
    pub fn bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    /// Sets the critical values that size information windows.
    pub fn z(mut self, z: Vec<f64>) -> Self {
        self.z = z;
        self
    }

    /// Sets the quadrature resolution.
    pub fn subintervals(mut self, subintervals: usize) -> Self {
        self.subintervals = subintervals;
        self
    }

    /// Finalizes construction after validating item shapes and settings.
    pub fn build(self) -> Result<QuestionSet> {
        let n = self.items.len();
        if n == 0 {
            return Err(CatError::dimension_mismatch("item bank", 1, 0));
        }

        for item in &self.items {
            validate_item(self.model, item)?;
        }

        let names = match self.names {
            Some(names) if names.len() != n => {
                return Err(CatError::dimension_mismatch("item names", n, names.len()));
            }
            Some(names) => names,
            None => (1..=n).map(|index| format!("q{index}")).collect(),
        };

        if !(self.lower_bound.is_finite() && self.upper_bound.is_finite())
            || self.lower_bound >= self.upper_bound
        {
            return Err(CatError::invalid(
                "integration bounds width",
                self.upper_bound - self.lower_bound,
            ));
        }
        if self.z.is_empty() {
            return Err(CatError::dimension_mismatch("critical values", 1, 0));
        }
        if let Some(&z) = self.z.iter().find(|z| !(z.is_finite() && **z > 0.0)) {
            return Err(CatError::invalid("critical value", z));
        }
        if self.subintervals == 0 {
            return Err(CatError::dimension_mismatch("integration subintervals", 1, 0));
        }

        Ok(QuestionSet {
            model: self.model,
            items: self.items,
            names,
            answers: vec![None; n],
            applicable_rows: Vec::new(),
            nonapplicable_rows: (0..n).collect(),
            lower_bound: self.lower_bound,
            upper_bound: self.upper_bound,
            z: self.z,
            subintervals: self.subintervals,
        })
    }
}

fn validate_item(model: IrtModel, item: &Item) -> Result<()> {
    if !item.discrimination.is_finite() {
        return Err(CatError::invalid("discrimination", item.discrimination));
    }
    if let Some(&value) = item.difficulty.iter().find(|value| !value.is_finite()) {
        return Err(CatError::invalid("difficulty", value));
    }

    match model {
        IrtModel::BinaryIrt => {
            if item.difficulty.len() != 1 {
                return Err(CatError::dimension_mismatch(
                    "binary difficulty",
                    1,
                    item.difficulty.len(),
                ));
            }
            if !(0.0..1.0).contains(&item.guessing) {
                return Err(CatError::invalid("guessing", item.guessing));
            }
        }
        IrtModel::GradedResponse | IrtModel::PartialCredit => {
            if item.difficulty.is_empty() {
                return Err(CatError::dimension_mismatch("category thresholds", 1, 0));
            }
            if item.guessing != 0.0 {
                return Err(CatError::invalid("polytomous guessing", item.guessing));
            }
            if model == IrtModel::GradedResponse {
                let unordered = item
                    .difficulty
                    .as_slice()
                    .windows(2)
                    .find(|pair| pair[0] >= pair[1]);
                if let Some(pair) = unordered {
                    return Err(CatError::invalid("graded threshold ordering", pair[1]));
                }
            }
        }
    }
    Ok(())
}

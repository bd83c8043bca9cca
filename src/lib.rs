//! Theta estimation and item selection for computerized adaptive testing.
//!
//! The crate scores the unanswered items of a calibrated bank under item
//! response theory and picks the next item to administer. It offers tools to
//!
//! - describe the bank and the answers recorded so far (`data` module),
//! - evaluate binary (3PL), graded-response, and generalized partial-credit
//!   response probabilities (`models` module),
//! - estimate theta by EAP, MAP, or MLE and compute information and
//!   divergence criteria (`estimation` module),
//! - rank candidate items under a named criterion (`selection` module), and
//! - drive a full session for one respondent (`session` module).
//!
//! Look-ahead criteria never mutate the bank. An [`Estimator`] carries at most
//! one hypothetical response on top of the recorded answers, so candidate items
//! are scored in parallel against the same session.
//!
//! # Quick start
//!
//! ```no_run
//! use irtcat::data::{IrtModel, Item, QuestionSet};
//! use irtcat::estimation::Estimator;
//! use irtcat::options::EstimatorOptions;
//! use irtcat::prior::Prior;
//! use irtcat::selection::SelectorRegistry;
//!
//! let items = vec![
//!     Item::binary(1.2, 0.0, 0.0),
//!     Item::binary(0.8, -0.5, 0.2),
//!     Item::binary(1.5, 0.7, 0.1),
//! ];
//! let mut questions = QuestionSet::builder(IrtModel::BinaryIrt, items)
//!     .bounds(-4.0, 4.0)
//!     .build()
//!     .expect("valid item bank");
//! questions.record_answer(0, 1).expect("valid answer");
//!
//! let prior = Prior::default();
//! let estimator = Estimator::new(&questions, &prior, EstimatorOptions::default())
//!     .expect("valid quadrature settings");
//! let selection = SelectorRegistry::default()
//!     .select("MFI", &estimator)
//!     .expect("an unanswered item remains");
//! println!("theta {:?}, next item {}", estimator.estimate_theta(), selection.item);
//! ```

pub mod data;
pub mod error;
pub mod estimation;
pub mod integration;
pub mod models;
pub mod options;
pub mod prior;
pub mod selection;
pub mod session;
pub mod solving;

pub use data::{IrtModel, Item, QuestionSet, QuestionSetBuilder, Response};
pub use error::{CatError, Result};
pub use estimation::{Estimator, InformationWindow};
pub use options::{EstimatorOptions, ThetaMethod};
pub use prior::{Prior, PriorFamily};
pub use selection::{select_next_item, Objective, Selection, Selector, SelectorRegistry};
pub use session::{AdaptiveSession, SessionSummary, SimulatedRespondent, StopRules};
pub use solving::{RootOptions, RootSummary};

//! Configuration structures for theta estimation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatError;
use crate::solving::RootOptions;

/// Point-estimate family used for theta and its standard error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThetaMethod {
    /// Expected a posteriori: posterior mean by quadrature.
    #[default]
    Eap,
    /// Maximum a posteriori: root of the prior-penalized score.
    Map,
    /// Maximum likelihood: root of the unpenalized score.
    Mle,
}

impl ThetaMethod {
    /// Whether the score equation carries the prior correction.
    pub fn uses_prior(self) -> bool {
        !matches!(self, Self::Mle)
    }
}

impl FromStr for ThetaMethod {
    type Err = CatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "EAP" => Ok(Self::Eap),
            "MAP" => Ok(Self::Map),
            "MLE" => Ok(Self::Mle),
            _ => Err(CatError::UnknownMethod(value.to_string())),
        }
    }
}

impl fmt::Display for ThetaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Eap => "EAP",
            Self::Map => "MAP",
            Self::Mle => "MLE",
        };
        f.write_str(name)
    }
}

/// Aggregated estimator configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorOptions {
    /// Estimation family for theta and its standard error.
    pub method: ThetaMethod,
    /// Root-finder settings used by MAP and MLE.
    pub root: RootOptions,
}

impl EstimatorOptions {
    /// Override the estimation family while preserving other defaults.
    pub fn with_method(mut self, method: ThetaMethod) -> Self {
        self.method = method;
        self
    }

    /// Override the root-finder settings.
    pub fn with_root(mut self, root: RootOptions) -> Self {
        self.root = root;
        self
    }

    /// Narrow or widen the MAP/MLE search bracket.
    pub fn with_bracket(mut self, lower: f64, upper: f64) -> Self {
        self.root.lower = lower;
        self.root.upper = upper;
        self
    }
}

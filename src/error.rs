use thiserror::Error;

/// Unified error type for `irtcat` operations.
#[derive(Debug, Error)]
pub enum CatError {
    /// Raised when an item index falls outside the calibrated bank.
    #[error("item {item} is outside the question set of {count} items")]
    ItemOutOfRange {
        /// Offending item index.
        item: usize,
        /// Number of items in the bank.
        count: usize,
    },

    /// Raised when a response category is not valid for the item's model.
    #[error("answer {answer} for item {item} must lie in {min}..={max}")]
    InvalidAnswer {
        item: usize,
        answer: usize,
        min: usize,
        max: usize,
    },

    /// Raised when a computation needs the recorded answer of an unanswered item.
    #[error("item {item} has no recorded answer")]
    Unanswered { item: usize },

    /// Raised when a hypothetical response targets an item that is already answered.
    #[error("item {item} is already answered and cannot be used as a hypothetical response")]
    AlreadyAnswered { item: usize },

    /// Raised when a second hypothetical response is stacked on an estimator.
    #[error("estimator already carries a hypothetical response for item {item}")]
    HypotheticalOccupied { item: usize },

    /// Raised when theta saturates the link function of the active model.
    #[error("theta {theta} is too extreme for numerical routines in {context}")]
    ThetaTooExtreme {
        /// Theta value that triggered the failure.
        theta: f64,
        /// Human-readable context describing the operation.
        context: &'static str,
    },

    /// Raised when numerical routines produce NaN or infinite values.
    #[error("encountered a non-finite value during {context}")]
    NumericalError { context: &'static str },

    /// Raised when the root bracket does not straddle a sign change.
    #[error("no sign change in [{lower}, {upper}]: f(lower) = {f_lower}, f(upper) = {f_upper}")]
    NoSignChange {
        lower: f64,
        upper: f64,
        f_lower: f64,
        f_upper: f64,
    },

    /// Raised when the root finder exhausts its iteration budget.
    #[error("root finder did not converge after {iterations} iterations; bracket width {width}")]
    RootDidNotConverge {
        /// Number of iterations performed before termination.
        iterations: usize,
        /// Width of the final bracket.
        width: f64,
    },

    /// Raised when provided arrays have incompatible dimensions.
    #[error("dimension mismatch in {context}: expected {expected} but found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    /// Raised when a configuration or calibration value is out of its domain.
    #[error("invalid {context}: {value}")]
    InvalidParameter { context: &'static str, value: f64 },

    /// Raised when a model tag is not one of `ltm`, `tpm`, `grm`, `gpcm`.
    #[error("unknown IRT model `{0}`")]
    UnknownModel(String),

    /// Raised when a theta estimation method is not one of `EAP`, `MAP`, `MLE`.
    #[error("unknown theta estimation method `{0}`")]
    UnknownMethod(String),

    /// Raised when a selection criterion is not registered.
    #[error("unknown selection criterion `{0}`")]
    UnknownSelector(String),

    /// Raised when an item is requested but every item is answered.
    #[error("no unanswered items remain to select from")]
    NoCandidates,
}

impl CatError {
    /// Helper to format a [`DimensionMismatch`](CatError::DimensionMismatch) error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }

    /// Helper for reporting a saturated link function.
    pub fn too_extreme(theta: f64, context: &'static str) -> Self {
        Self::ThetaTooExtreme { theta, context }
    }

    /// Helper for out-of-domain configuration values.
    pub fn invalid(context: &'static str, value: f64) -> Self {
        Self::InvalidParameter { context, value }
    }

    /// Whether the error is a numerical-domain failure the caller may retry
    /// with a narrower interval.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Self::ThetaTooExtreme { .. }
                | Self::NumericalError { .. }
                | Self::NoSignChange { .. }
                | Self::RootDidNotConverge { .. }
        )
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, CatError>;

// src/error.rs
//
// Error type shared by the evaluation pipeline. Lower-level collaborators
// (sources, simulations, learners) construct these freely; the evaluation
// engine is the single place that decides suppress-vs-propagate.

use std::fmt;

/// Failure raised anywhere in the benchmark pipeline.
///
/// `Cancelled` is special: it bypasses failure suppression entirely and
/// always terminates the whole run.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A source could not be loaded.
    Source { detail: String },
    /// A simulation could not be constructed or failed during reward
    /// observation.
    Simulation { detail: String },
    /// A learner failed during init, predict, or learn.
    Learner { detail: String },
    /// A learner returned action probabilities that do not sum to 1.
    InvalidProbabilities { sum: f64 },
    /// A reward function returned a misaligned number of rewards.
    RewardCount { expected: usize, received: usize },
    /// A transaction could not be written to the result sink.
    Store { detail: String },
    /// The run was cancelled by the caller.
    Cancelled,
}

impl EvalError {
    pub fn source(detail: impl Into<String>) -> Self {
        EvalError::Source {
            detail: detail.into(),
        }
    }

    pub fn simulation(detail: impl Into<String>) -> Self {
        EvalError::Simulation {
            detail: detail.into(),
        }
    }

    pub fn learner(detail: impl Into<String>) -> Self {
        EvalError::Learner {
            detail: detail.into(),
        }
    }

    pub fn store(detail: impl Into<String>) -> Self {
        EvalError::Store {
            detail: detail.into(),
        }
    }

    /// True for user-initiated cancellation, which is never suppressed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EvalError::Cancelled)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Source { detail } => {
                write!(f, "Failed to load source: {}", detail)
            }
            EvalError::Simulation { detail } => {
                write!(f, "Simulation failure: {}", detail)
            }
            EvalError::Learner { detail } => {
                write!(f, "Learner failure: {}", detail)
            }
            EvalError::InvalidProbabilities { sum } => {
                write!(
                    f,
                    "The learner returned invalid probabilities for action choices (sum = {})",
                    sum
                )
            }
            EvalError::RewardCount { expected, received } => {
                write!(
                    f,
                    "The reward function returned {} rewards for {} choices",
                    received, expected
                )
            }
            EvalError::Store { detail } => {
                write!(f, "Failed to persist transaction: {}", detail)
            }
            EvalError::Cancelled => write!(f, "The run was cancelled"),
        }
    }
}

impl std::error::Error for EvalError {}

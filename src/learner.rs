// src/learner.rs
//
// Learner interface and the trivial reference learners used by tests and
// the benchmark runner binary. Real learning algorithms live outside this
// crate; the engine treats learners as opaque.

use serde_json::Value;

use crate::error::EvalError;
use crate::types::{Action, Context, Key};

/// An online decision policy.
///
/// `family`, `params`, and `init` have defaults so minimal learners only
/// implement `predict`, `learn`, and `clone_learner`. The defaults resolve
/// per concrete type at compile time, so a learner that never overrides
/// `init` costs a plain no-op call.
pub trait Learner {
    /// Display name. Falls back to the concrete type name.
    fn family(&self) -> String {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full).to_string()
    }

    /// Hyperparameters for reporting. Empty if the learner exposes none.
    fn params(&self) -> Vec<(String, Value)> {
        Vec::new()
    }

    /// Optional setup before the first interaction.
    fn init(&mut self) -> Result<(), EvalError> {
        Ok(())
    }

    /// One probability per action, summing to 1.
    fn predict(
        &mut self,
        key: Key,
        context: &Context,
        actions: &[Action],
    ) -> Result<Vec<f64>, EvalError>;

    /// Feedback for a previously chosen action.
    fn learn(
        &mut self,
        key: Key,
        context: &Context,
        action: &Action,
        reward: f64,
        probability: f64,
    ) -> Result<(), EvalError>;

    /// Independent deep copy. Every task owns its own learner instance so
    /// state mutated during one evaluation cannot leak into another.
    fn clone_learner(&self) -> Box<dyn Learner>;
}

/// Chooses uniformly at random among the offered actions.
#[derive(Debug, Clone, Default)]
pub struct RandomLearner;

impl RandomLearner {
    pub fn new() -> Self {
        Self
    }
}

impl Learner for RandomLearner {
    fn family(&self) -> String {
        "random".to_string()
    }

    fn predict(
        &mut self,
        _key: Key,
        _context: &Context,
        actions: &[Action],
    ) -> Result<Vec<f64>, EvalError> {
        if actions.is_empty() {
            return Err(EvalError::learner("no actions to predict over"));
        }
        Ok(vec![1.0 / actions.len() as f64; actions.len()])
    }

    fn learn(
        &mut self,
        _key: Key,
        _context: &Context,
        _action: &Action,
        _reward: f64,
        _probability: f64,
    ) -> Result<(), EvalError> {
        Ok(())
    }

    fn clone_learner(&self) -> Box<dyn Learner> {
        Box::new(self.clone())
    }
}

/// Always predicts the same probability vector, regardless of context.
///
/// Useful as a deterministic baseline and for exercising the probability
/// validation in the adapter (the vector is returned as configured, valid
/// or not).
#[derive(Debug, Clone)]
pub struct FixedLearner {
    probabilities: Vec<f64>,
}

impl FixedLearner {
    pub fn new(probabilities: Vec<f64>) -> Self {
        Self { probabilities }
    }
}

impl Learner for FixedLearner {
    fn params(&self) -> Vec<(String, Value)> {
        vec![(
            "probabilities".to_string(),
            Value::from(self.probabilities.clone()),
        )]
    }

    fn predict(
        &mut self,
        _key: Key,
        _context: &Context,
        actions: &[Action],
    ) -> Result<Vec<f64>, EvalError> {
        if self.probabilities.len() != actions.len() {
            return Err(EvalError::learner(format!(
                "configured for {} actions but offered {}",
                self.probabilities.len(),
                actions.len()
            )));
        }
        Ok(self.probabilities.clone())
    }

    fn learn(
        &mut self,
        _key: Key,
        _context: &Context,
        _action: &Action,
        _reward: f64,
        _probability: f64,
    ) -> Result<(), EvalError> {
        Ok(())
    }

    fn clone_learner(&self) -> Box<dyn Learner> {
        Box::new(self.clone())
    }
}

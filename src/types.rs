// src/types.rs
//
// Common shared types for the benchmark engine: decision keys, feature
// values, contexts, actions, and interactions.

use serde::{Deserialize, Serialize};

/// Per-decision identifier. Keys are opaque to the engine; simulations use
/// them to look up rewards for submitted choices.
pub type Key = u64;

/// A single feature value inside a context or action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Feature {
    Number(f64),
    Text(String),
}

impl From<f64> for Feature {
    fn from(value: f64) -> Self {
        Feature::Number(value)
    }
}

impl From<&str> for Feature {
    fn from(value: &str) -> Self {
        Feature::Text(value.to_string())
    }
}

/// Observed context for one interaction.
///
/// Sizing convention (used for per-batch statistics):
/// - `None` counts as 0
/// - `Vector` counts its elements
/// - `Scalar` counts as 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Context {
    #[default]
    None,
    Scalar(Feature),
    Vector(Vec<Feature>),
}

impl Context {
    /// Build a vector context from anything convertible to features.
    pub fn vector<F: Into<Feature>>(features: impl IntoIterator<Item = F>) -> Self {
        Context::Vector(features.into_iter().map(Into::into).collect())
    }

    pub fn scalar(feature: impl Into<Feature>) -> Self {
        Context::Scalar(feature.into())
    }

    /// Element count used by the context-size statistic.
    pub fn size(&self) -> usize {
        match self {
            Context::None => 0,
            Context::Scalar(_) => 1,
            Context::Vector(features) => features.len(),
        }
    }
}

/// One selectable action. Actions only need equality and cloning; the
/// engine never inspects their contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Number(f64),
    Text(String),
    Vector(Vec<Feature>),
}

impl From<f64> for Action {
    fn from(value: f64) -> Self {
        Action::Number(value)
    }
}

impl From<&str> for Action {
    fn from(value: &str) -> Self {
        Action::Text(value.to_string())
    }
}

/// A single labeled interaction: the context observed, the finite action
/// set offered, and the key under which rewards are later requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub key: Key,
    pub context: Context,
    pub actions: Vec<Action>,
}

impl Interaction {
    pub fn new(key: Key, context: Context, actions: Vec<Action>) -> Self {
        Self {
            key,
            context,
            actions,
        }
    }
}

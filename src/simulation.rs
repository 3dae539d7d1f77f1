// src/simulation.rs
//
// Simulation interface plus the in-memory implementations and the stock
// transforms (take, shuffle, batch) used to derive variants from a shared
// source.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EvalError;
use crate::pipes::SimulationFilter;
use crate::random::SeededRandom;
use crate::types::{Action, Context, Interaction, Key};

/// A stream of labeled interactions with a reward function.
///
/// Rewards are requested for a whole batch at once: the engine submits the
/// chosen (key, context, action) triples and receives rewards aligned
/// positionally to them. Some reward functions need the complete batch
/// before any reward can be computed, so the engine never interleaves
/// observation with choice.
pub trait Simulation {
    fn interactions(&self) -> &[Interaction];

    /// Pre-batched interactions, if the simulation defines its own
    /// batching. `None` makes the engine fall back to singleton batches.
    fn interaction_batches(&self) -> Option<&[Vec<Interaction>]> {
        None
    }

    /// Observe rewards for the submitted choices, positionally aligned.
    fn observe(&self, choices: &[(Key, Context, Action)]) -> Result<Vec<f64>, EvalError>;
}

/// Simulation held fully in memory with a per-interaction reward row
/// aligned to that interaction's action set.
pub struct MemorySimulation {
    interactions: Vec<Interaction>,
    index: HashMap<Key, usize>,
    rewards: Vec<Vec<f64>>,
}

impl MemorySimulation {
    /// Build from interactions and per-interaction reward rows. Row `i`
    /// must align with `interactions[i].actions`.
    pub fn from_rows(interactions: Vec<Interaction>, rewards: Vec<Vec<f64>>) -> Self {
        let index = interactions
            .iter()
            .enumerate()
            .map(|(i, interaction)| (interaction.key, i))
            .collect();
        Self {
            interactions,
            index,
            rewards,
        }
    }

    /// Build a classification simulation: every interaction offers the
    /// distinct labels (in first-seen order) as its action set, with
    /// reward 1.0 for the true label and 0.0 otherwise.
    pub fn classification(contexts: Vec<Context>, labels: Vec<Action>) -> Self {
        let mut action_set: Vec<Action> = Vec::new();
        for label in &labels {
            if !action_set.contains(label) {
                action_set.push(label.clone());
            }
        }

        let mut interactions = Vec::with_capacity(contexts.len());
        let mut rewards = Vec::with_capacity(contexts.len());

        for (i, (context, label)) in contexts.into_iter().zip(labels).enumerate() {
            let row = action_set
                .iter()
                .map(|action| if *action == label { 1.0 } else { 0.0 })
                .collect();
            interactions.push(Interaction::new(i as Key, context, action_set.clone()));
            rewards.push(row);
        }

        Self::from_rows(interactions, rewards)
    }
}

impl Simulation for MemorySimulation {
    fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    fn observe(&self, choices: &[(Key, Context, Action)]) -> Result<Vec<f64>, EvalError> {
        choices
            .iter()
            .map(|(key, _context, action)| {
                let index = *self
                    .index
                    .get(key)
                    .ok_or_else(|| EvalError::simulation(format!("unknown key {}", key)))?;
                let position = self.interactions[index]
                    .actions
                    .iter()
                    .position(|candidate| candidate == action)
                    .ok_or_else(|| {
                        EvalError::simulation(format!("unknown action for key {}", key))
                    })?;
                self.rewards[index]
                    .get(position)
                    .copied()
                    .ok_or_else(|| EvalError::simulation(format!("missing reward for key {}", key)))
            })
            .collect()
    }
}

/// A reordering or subset of another simulation's interactions, keeping
/// the inner reward function.
pub struct ProjectedSimulation {
    inner: Arc<dyn Simulation>,
    interactions: Vec<Interaction>,
}

impl ProjectedSimulation {
    pub fn new(inner: Arc<dyn Simulation>, interactions: Vec<Interaction>) -> Self {
        Self {
            inner,
            interactions,
        }
    }
}

impl Simulation for ProjectedSimulation {
    fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    fn observe(&self, choices: &[(Key, Context, Action)]) -> Result<Vec<f64>, EvalError> {
        self.inner.observe(choices)
    }
}

/// Another simulation's interactions re-grouped into explicit batches.
pub struct BatchedSimulation {
    inner: Arc<dyn Simulation>,
    batches: Vec<Vec<Interaction>>,
}

impl BatchedSimulation {
    pub fn new(inner: Arc<dyn Simulation>, batches: Vec<Vec<Interaction>>) -> Self {
        Self { inner, batches }
    }
}

impl Simulation for BatchedSimulation {
    fn interactions(&self) -> &[Interaction] {
        self.inner.interactions()
    }

    fn interaction_batches(&self) -> Option<&[Vec<Interaction>]> {
        Some(&self.batches)
    }

    fn observe(&self, choices: &[(Key, Context, Action)]) -> Result<Vec<f64>, EvalError> {
        self.inner.observe(choices)
    }
}

/// Keep the first `count` interactions. Taking more than the simulation
/// holds yields an empty simulation rather than a short one.
#[derive(Debug, Clone, Copy)]
pub struct TakeFilter {
    count: usize,
}

impl TakeFilter {
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl SimulationFilter for TakeFilter {
    fn filter(&self, simulation: Arc<dyn Simulation>) -> Result<Arc<dyn Simulation>, EvalError> {
        let interactions = simulation.interactions();
        let kept = if self.count > interactions.len() {
            Vec::new()
        } else {
            interactions[..self.count].to_vec()
        };
        Ok(Arc::new(ProjectedSimulation::new(simulation, kept)))
    }

    fn describe(&self) -> String {
        format!("Take({})", self.count)
    }
}

/// Deterministically shuffle interaction order.
#[derive(Debug, Clone, Copy)]
pub struct ShuffleFilter {
    seed: Option<u64>,
}

impl ShuffleFilter {
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }
}

impl SimulationFilter for ShuffleFilter {
    fn filter(&self, simulation: Arc<dyn Simulation>) -> Result<Arc<dyn Simulation>, EvalError> {
        let mut interactions = simulation.interactions().to_vec();
        SeededRandom::new(self.seed).shuffle(&mut interactions);
        Ok(Arc::new(ProjectedSimulation::new(simulation, interactions)))
    }

    fn describe(&self) -> String {
        match self.seed {
            Some(seed) => format!("Shuffle({})", seed),
            None => "Shuffle".to_string(),
        }
    }
}

/// Group interactions into fixed-size batches (the final batch may be
/// short).
#[derive(Debug, Clone, Copy)]
pub struct BatchFilter {
    size: usize,
}

impl BatchFilter {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl SimulationFilter for BatchFilter {
    fn filter(&self, simulation: Arc<dyn Simulation>) -> Result<Arc<dyn Simulation>, EvalError> {
        if self.size == 0 {
            return Err(EvalError::simulation("batch size must be >= 1"));
        }

        let batches = simulation
            .interactions()
            .chunks(self.size)
            .map(|chunk| chunk.to_vec())
            .collect();
        Ok(Arc::new(BatchedSimulation::new(simulation, batches)))
    }

    fn describe(&self) -> String {
        format!("Batch({})", self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(n: usize) -> MemorySimulation {
        let contexts = (0..n).map(|i| Context::vector([i as f64])).collect();
        let labels = (0..n)
            .map(|i| Action::from(if i % 2 == 0 { "even" } else { "odd" }))
            .collect();
        MemorySimulation::classification(contexts, labels)
    }

    #[test]
    fn test_classification_action_set_first_seen_order() {
        let simulation = labeled(4);
        let actions = &simulation.interactions()[0].actions;
        assert_eq!(actions, &vec![Action::from("even"), Action::from("odd")]);
    }

    #[test]
    fn test_classification_rewards_match_labels() {
        let simulation = labeled(4);

        let choices = vec![
            (0, Context::None, Action::from("even")),
            (1, Context::None, Action::from("even")),
            (1, Context::None, Action::from("odd")),
        ];
        assert_eq!(simulation.observe(&choices).unwrap(), vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_observe_unknown_key_fails() {
        let simulation = labeled(2);
        let choices = vec![(99, Context::None, Action::from("even"))];
        assert!(simulation.observe(&choices).is_err());
    }

    #[test]
    fn test_take_keeps_prefix() {
        let simulation: Arc<dyn Simulation> = Arc::new(labeled(5));
        let taken = TakeFilter::new(3).filter(simulation).unwrap();
        assert_eq!(taken.interactions().len(), 3);
        assert_eq!(taken.interactions()[0].key, 0);
    }

    #[test]
    fn test_take_larger_than_source_is_empty() {
        let simulation: Arc<dyn Simulation> = Arc::new(labeled(2));
        let taken = TakeFilter::new(10).filter(simulation).unwrap();
        assert!(taken.interactions().is_empty());
    }

    #[test]
    fn test_shuffle_permutes_deterministically() {
        let simulation: Arc<dyn Simulation> = Arc::new(labeled(8));

        let a = ShuffleFilter::new(Some(5))
            .filter(Arc::clone(&simulation))
            .unwrap();
        let b = ShuffleFilter::new(Some(5)).filter(simulation).unwrap();

        let keys_a: Vec<Key> = a.interactions().iter().map(|i| i.key).collect();
        let keys_b: Vec<Key> = b.interactions().iter().map(|i| i.key).collect();
        assert_eq!(keys_a, keys_b);

        let mut sorted = keys_a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..8).collect::<Vec<Key>>());
    }

    #[test]
    fn test_shuffled_simulation_keeps_rewards() {
        let simulation: Arc<dyn Simulation> = Arc::new(labeled(4));
        let shuffled = ShuffleFilter::new(Some(1)).filter(simulation).unwrap();

        let choices = vec![(2, Context::None, Action::from("even"))];
        assert_eq!(shuffled.observe(&choices).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_batch_filter_chunks() {
        let simulation: Arc<dyn Simulation> = Arc::new(labeled(5));
        let batched = BatchFilter::new(2).filter(simulation).unwrap();

        let batches = batched.interaction_batches().unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[2].len(), 1);
    }

    #[test]
    fn test_batch_filter_rejects_zero() {
        let simulation: Arc<dyn Simulation> = Arc::new(labeled(2));
        assert!(BatchFilter::new(0).filter(simulation).is_err());
    }
}

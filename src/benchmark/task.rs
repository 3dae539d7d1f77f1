// src/benchmark/task.rs
//
// The atomic unit of benchmark work: one (source, simulation, learner)
// triple with stable integer identities, plus the generator that produces
// the full cross product of simulations and learners.

use std::sync::Arc;

use serde_json::Value;

use crate::error::EvalError;
use crate::learner::Learner;
use crate::pipes::{SimulationFilter, SimulationSource, SourceFilters};
use crate::random::SeededRandom;
use crate::simulation::Simulation;
use crate::types::{Action, Context, Key};

/// Tolerance on the probability-sum precondition for `choose`.
const PROBABILITY_TOLERANCE: f64 = 0.0001;

/// Wraps a learner behind the engine's uniform capability set, pairing it
/// with a private weighted-random stream for action sampling.
///
/// Owned exclusively by the task that created it; nothing else touches the
/// wrapped learner or the random stream during evaluation.
pub struct TaskLearner {
    learner: Box<dyn Learner>,
    random: SeededRandom,
}

impl TaskLearner {
    pub fn new(learner: Box<dyn Learner>, seed: Option<u64>) -> Self {
        Self {
            learner,
            random: SeededRandom::new(seed),
        }
    }

    pub fn family(&self) -> String {
        self.learner.family()
    }

    pub fn params(&self) -> Vec<(String, Value)> {
        self.learner.params()
    }

    pub fn init(&mut self) -> Result<(), EvalError> {
        self.learner.init()
    }

    pub fn predict(
        &mut self,
        key: Key,
        context: &Context,
        actions: &[Action],
    ) -> Result<Vec<f64>, EvalError> {
        self.learner.predict(key, context, actions)
    }

    /// Predict, validate, then sample one action from the prediction.
    ///
    /// Returns the sampled action together with its predicted probability
    /// (not a re-derived value). Probabilities that do not sum to 1 within
    /// tolerance are a strict precondition violation on the wrapped
    /// learner and are never silently corrected.
    pub fn choose(
        &mut self,
        key: Key,
        context: &Context,
        actions: &[Action],
    ) -> Result<(Action, f64), EvalError> {
        let probabilities = self.predict(key, context, actions)?;

        if probabilities.len() != actions.len() {
            return Err(EvalError::learner(format!(
                "predict returned {} probabilities for {} actions",
                probabilities.len(),
                actions.len()
            )));
        }

        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() >= PROBABILITY_TOLERANCE {
            return Err(EvalError::InvalidProbabilities { sum });
        }

        let index = self.random.weighted_index(&probabilities);
        Ok((actions[index].clone(), probabilities[index]))
    }

    pub fn learn(
        &mut self,
        key: Key,
        context: &Context,
        action: &Action,
        reward: f64,
        probability: f64,
    ) -> Result<(), EvalError> {
        self.learner.learn(key, context, action, reward, probability)
    }
}

/// A lazily-loaded simulation source paired with an optional transform.
///
/// The underlying source stays exposed (unwrapped) so the scheduler can
/// recognize handles sharing one source; `None` transform is the identity.
#[derive(Clone)]
pub struct TaskSimulation {
    source: Arc<dyn SimulationSource>,
    transform: Option<Arc<dyn SimulationFilter>>,
}

impl TaskSimulation {
    pub fn new(
        source: Arc<dyn SimulationSource>,
        transform: Option<Arc<dyn SimulationFilter>>,
    ) -> Self {
        Self { source, transform }
    }

    pub fn from_source(source: Arc<dyn SimulationSource>) -> Self {
        Self::new(source, None)
    }

    /// Unwrap a composed pipe, recovering the exact original source.
    pub fn from_pipe(pipe: &SourceFilters) -> Self {
        Self::new(
            Arc::clone(pipe.source()),
            Some(Arc::clone(pipe.transform())),
        )
    }

    pub fn source(&self) -> &Arc<dyn SimulationSource> {
        &self.source
    }

    pub fn transform(&self) -> Option<&Arc<dyn SimulationFilter>> {
        self.transform.as_ref()
    }

    /// Stable identity key for the underlying source object.
    pub fn source_key(&self) -> usize {
        Arc::as_ptr(&self.source) as *const () as usize
    }

    /// Apply this handle's transform to an already-loaded source.
    pub fn apply(&self, loaded: Arc<dyn Simulation>) -> Result<Arc<dyn Simulation>, EvalError> {
        match &self.transform {
            Some(filter) => filter.filter(loaded),
            None => Ok(loaded),
        }
    }

    pub fn describe(&self) -> String {
        match &self.transform {
            Some(filter) => format!("{}|{}", self.source.describe(), filter.describe()),
            None => self.source.describe(),
        }
    }
}

impl SimulationSource for TaskSimulation {
    fn read(&self) -> Result<Arc<dyn Simulation>, EvalError> {
        self.apply(self.source.read()?)
    }

    fn describe(&self) -> String {
        TaskSimulation::describe(self)
    }
}

/// One (source, simulation, learner) triple. Created once by `Tasks`,
/// consumed exactly once by the evaluation engine.
pub struct Task {
    pub src_id: usize,
    pub sim_id: usize,
    pub lrn_id: usize,
    pub simulation: TaskSimulation,
    pub learner: TaskLearner,
}

/// Generates the cross product of simulations and learners as tasks.
///
/// Source ids are assigned by first-occurrence order over distinct
/// underlying source objects, so they are stable across runs only if the
/// caller supplies sources in the same order each time. Each task receives
/// an independent deep copy of its learner; all adapters share the one
/// seed value.
pub struct Tasks {
    simulations: Vec<TaskSimulation>,
    learners: Vec<Box<dyn Learner>>,
    seed: Option<u64>,
}

impl Tasks {
    pub fn new(
        simulations: Vec<TaskSimulation>,
        learners: Vec<Box<dyn Learner>>,
        seed: Option<u64>,
    ) -> Self {
        Self {
            simulations,
            learners,
            seed,
        }
    }

    /// Lazily enumerate tasks in (simulation, learner) nested order.
    pub fn read(&self) -> impl Iterator<Item = Task> + '_ {
        let mut source_keys: Vec<usize> = Vec::new();
        let mut sim_id = 0usize;
        let mut lrn_id = 0usize;

        std::iter::from_fn(move || {
            if sim_id >= self.simulations.len() || self.learners.is_empty() {
                return None;
            }

            let simulation = self.simulations[sim_id].clone();
            let key = simulation.source_key();
            let src_id = match source_keys.iter().position(|k| *k == key) {
                Some(existing) => existing,
                None => {
                    source_keys.push(key);
                    source_keys.len() - 1
                }
            };

            let task = Task {
                src_id,
                sim_id,
                lrn_id,
                simulation,
                learner: TaskLearner::new(self.learners[lrn_id].clone_learner(), self.seed),
            };

            lrn_id += 1;
            if lrn_id == self.learners.len() {
                lrn_id = 0;
                sim_id += 1;
            }

            Some(task)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::{FixedLearner, RandomLearner};
    use crate::pipes::MemorySource;
    use crate::simulation::{MemorySimulation, ShuffleFilter};

    fn two_action_set() -> Vec<Action> {
        vec![Action::from("a"), Action::from("b")]
    }

    fn source_of(n: usize) -> Arc<dyn SimulationSource> {
        let contexts = (0..n).map(|i| Context::vector([i as f64])).collect();
        let labels = (0..n).map(|_| Action::from("a")).collect();
        let simulation = Arc::new(MemorySimulation::classification(contexts, labels));
        Arc::new(MemorySource::new(simulation))
    }

    #[test]
    fn test_choose_rejects_unnormalized_probabilities() {
        let mut learner = TaskLearner::new(Box::new(FixedLearner::new(vec![0.5, 0.6])), Some(1));

        let result = learner.choose(0, &Context::None, &two_action_set());
        assert!(matches!(
            result,
            Err(EvalError::InvalidProbabilities { .. })
        ));
    }

    #[test]
    fn test_choose_accepts_within_tolerance() {
        let mut learner =
            TaskLearner::new(Box::new(FixedLearner::new(vec![0.50004, 0.5])), Some(1));
        assert!(learner.choose(0, &Context::None, &two_action_set()).is_ok());
    }

    #[test]
    fn test_choose_returns_predicted_probability() {
        let mut learner = TaskLearner::new(Box::new(FixedLearner::new(vec![0.0, 1.0])), Some(7));

        let (action, probability) = learner.choose(0, &Context::None, &two_action_set()).unwrap();
        assert_eq!(action, Action::from("b"));
        assert_eq!(probability, 1.0);
    }

    #[test]
    fn test_same_seed_gives_same_choice_stream() {
        let actions = two_action_set();
        let mut a = TaskLearner::new(Box::new(RandomLearner::new()), Some(42));
        let mut b = TaskLearner::new(Box::new(RandomLearner::new()), Some(42));

        for key in 0..20 {
            let choice_a = a.choose(key, &Context::None, &actions).unwrap();
            let choice_b = b.choose(key, &Context::None, &actions).unwrap();
            assert_eq!(choice_a, choice_b);
        }
    }

    #[test]
    fn test_family_and_params_pass_through() {
        let learner = TaskLearner::new(Box::new(RandomLearner::new()), None);
        assert_eq!(learner.family(), "random");
        assert!(learner.params().is_empty());
    }

    #[test]
    fn test_task_count_is_cross_product() {
        let simulations = vec![
            TaskSimulation::from_source(source_of(2)),
            TaskSimulation::from_source(source_of(2)),
            TaskSimulation::from_source(source_of(2)),
        ];
        let learners: Vec<Box<dyn Learner>> =
            vec![Box::new(RandomLearner::new()), Box::new(RandomLearner::new())];

        let tasks: Vec<Task> = Tasks::new(simulations, learners, None).read().collect();
        assert_eq!(tasks.len(), 6);

        let mut pairs: Vec<(usize, usize)> =
            tasks.iter().map(|t| (t.sim_id, t.lrn_id)).collect();
        pairs.sort_unstable();
        pairs.dedup();
        assert_eq!(pairs.len(), 6);
    }

    #[test]
    fn test_shared_source_shares_src_id() {
        let shared = source_of(3);
        let simulations = vec![
            TaskSimulation::from_source(Arc::clone(&shared)),
            TaskSimulation::new(
                Arc::clone(&shared),
                Some(Arc::new(ShuffleFilter::new(Some(1)))),
            ),
            TaskSimulation::from_source(source_of(3)),
        ];
        let learners: Vec<Box<dyn Learner>> = vec![Box::new(RandomLearner::new())];

        let tasks: Vec<Task> = Tasks::new(simulations, learners, None).read().collect();
        assert_eq!(tasks[0].src_id, 0);
        assert_eq!(tasks[1].src_id, 0);
        assert_eq!(tasks[2].src_id, 1);
    }

    #[test]
    fn test_pipe_unwraps_to_original_source() {
        let shared = source_of(3);
        let pipe = SourceFilters::new(Arc::clone(&shared), Arc::new(ShuffleFilter::new(Some(2))));

        let plain = TaskSimulation::from_source(Arc::clone(&shared));
        let piped = TaskSimulation::from_pipe(&pipe);
        assert_eq!(plain.source_key(), piped.source_key());
        assert!(piped.transform().is_some());
    }

    #[test]
    fn test_cross_product_enumeration_order() {
        let simulations = vec![
            TaskSimulation::from_source(source_of(1)),
            TaskSimulation::from_source(source_of(1)),
        ];
        let learners: Vec<Box<dyn Learner>> =
            vec![Box::new(RandomLearner::new()), Box::new(RandomLearner::new())];

        let ids: Vec<(usize, usize)> = Tasks::new(simulations, learners, None)
            .read()
            .map(|t| (t.sim_id, t.lrn_id))
            .collect();
        assert_eq!(ids, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_empty_learners_yield_no_tasks() {
        let simulations = vec![TaskSimulation::from_source(source_of(1))];
        let tasks: Vec<Task> = Tasks::new(simulations, Vec::new(), None).read().collect();
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_task_simulation_reads_through_transform() {
        let source = source_of(5);
        let handle = TaskSimulation::new(
            source,
            Some(Arc::new(crate::simulation::TakeFilter::new(2))),
        );

        let simulation = handle.read().unwrap();
        assert_eq!(simulation.interactions().len(), 2);
    }
}

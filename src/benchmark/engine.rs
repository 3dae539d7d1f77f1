// src/benchmark/engine.rs
//
// The evaluation engine: materializes each group's sources once, derives
// simulation variants, and runs every pending learner through the online
// train/evaluate loop, emitting result records as they are produced.
//
// The engine is single-threaded; groups, simulations within a group, and
// learners within a simulation run strictly sequentially. Failure
// suppression is decided here and only here, configured once at
// construction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::EvalError;
use crate::logging::{Logger, TimedScope};
use crate::simulation::Simulation;
use crate::types::{Action, Context, Interaction, Key};

use super::result::{EvaluationRecord, SimulationRecord, Transaction, TransactionSink};
use super::task::{Task, TaskLearner};

/// Cooperative cancellation signal.
///
/// Checked at every blocking boundary; once raised it propagates through
/// all nesting levels as `EvalError::Cancelled`, bypassing failure
/// suppression entirely.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn guard(&self) -> Result<(), EvalError> {
        if self.is_cancelled() {
            Err(EvalError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Runs task groups through the online evaluation loop.
pub struct EvaluationEngine<'a> {
    ignore_failures: bool,
    logger: &'a dyn Logger,
    cancel: CancelToken,
}

impl<'a> EvaluationEngine<'a> {
    pub fn new(ignore_failures: bool, logger: &'a dyn Logger) -> Self {
        Self {
            ignore_failures,
            logger,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Process groups in order, writing transactions to `sink` as they
    /// are produced.
    ///
    /// A failure inside one group abandons that group; whether it also
    /// aborts the run depends on the suppression configuration.
    /// Cancellation always aborts.
    pub fn process<I>(&self, groups: I, sink: &mut dyn TransactionSink) -> Result<(), EvalError>
    where
        I: IntoIterator<Item = Vec<Task>>,
    {
        for group in groups {
            self.cancel.guard()?;

            match self.process_group(group, sink) {
                Ok(()) => {}
                Err(error) if error.is_cancelled() => return Err(error),
                Err(error) => {
                    self.logger.log(&format!("Unhandled failure: {}", error));
                    if !self.ignore_failures {
                        return Err(error);
                    }
                }
            }
        }

        Ok(())
    }

    fn process_group(
        &self,
        mut group: Vec<Task>,
        sink: &mut dyn TransactionSink,
    ) -> Result<(), EvalError> {
        let _scope = TimedScope::new(self.logger, "Processing group...");

        // Distinct sources become contiguous runs; the sort is stable so
        // within-source task order survives.
        group.sort_by_key(|task| task.src_id);

        while !group.is_empty() {
            self.cancel.guard()?;

            let src_id = group[0].src_id;
            let split = group
                .iter()
                .position(|task| task.src_id != src_id)
                .unwrap_or(group.len());
            let by_source: Vec<Task> = group.drain(..split).collect();

            self.process_source(src_id, by_source, sink)?;
        }

        Ok(())
    }

    fn process_source(
        &self,
        src_id: usize,
        mut tasks: Vec<Task>,
        sink: &mut dyn TransactionSink,
    ) -> Result<(), EvalError> {
        // All tasks here share the same underlying source object; load it
        // exactly once and share it read-only across every variant.
        let loaded = {
            let _scope = TimedScope::new(
                self.logger,
                format!(
                    "Creating source {} from {}...",
                    src_id,
                    tasks[0].simulation.source().describe()
                ),
            );
            tasks[0].simulation.source().read()?
        };

        tasks.sort_by_key(|task| task.sim_id);

        while !tasks.is_empty() {
            self.cancel.guard()?;

            let sim_id = tasks[0].sim_id;
            let split = tasks
                .iter()
                .position(|task| task.sim_id != sim_id)
                .unwrap_or(tasks.len());
            let by_simulation: Vec<Task> = tasks.drain(..split).collect();

            self.process_simulation(src_id, sim_id, Arc::clone(&loaded), by_simulation, sink)?;
        }

        Ok(())
    }

    fn process_simulation(
        &self,
        src_id: usize,
        sim_id: usize,
        loaded: Arc<dyn Simulation>,
        tasks: Vec<Task>,
        sink: &mut dyn TransactionSink,
    ) -> Result<(), EvalError> {
        let (simulation, batches) = {
            let _scope = TimedScope::new(
                self.logger,
                format!("Creating simulation {} from source {}...", sim_id, src_id),
            );
            let simulation = tasks[0].simulation.apply(loaded)?;
            let batches = batchify(simulation.as_ref());
            (simulation, batches)
        };

        sink.write(Transaction::Simulation(SimulationRecord {
            simulation_id: sim_id,
            batch_count: batches.len(),
        }))?;

        if batches.is_empty() {
            self.logger.log(&format!(
                "Simulation {} has nothing to evaluate. (likely due to `Take` being larger than the source)",
                sim_id
            ));
            return Ok(());
        }

        let mut pending: Vec<(usize, TaskLearner)> = tasks
            .into_iter()
            .map(|task| (task.lrn_id, task.learner))
            .collect();

        // Reverse collection order with removal before the attempt, so a
        // failing learner is never retried.
        while let Some((lrn_id, mut learner)) = pending.pop() {
            self.cancel.guard()?;

            match self.evaluate_learner(sim_id, lrn_id, &mut learner, simulation.as_ref(), &batches)
            {
                Ok(record) => sink.write(Transaction::Evaluation(record))?,
                Err(error) if error.is_cancelled() => return Err(error),
                // Unsuppressed errors are logged once, at the group
                // boundary.
                Err(error) if !self.ignore_failures => return Err(error),
                Err(error) => {
                    self.logger.log(&format!("Unhandled failure: {}", error));
                }
            }
        }

        Ok(())
    }

    fn evaluate_learner(
        &self,
        sim_id: usize,
        lrn_id: usize,
        learner: &mut TaskLearner,
        simulation: &dyn Simulation,
        batches: &[Vec<Interaction>],
    ) -> Result<EvaluationRecord, EvalError> {
        learner.init()?;

        let _scope = TimedScope::new(
            self.logger,
            format!("Evaluating learner {} on simulation {}...", lrn_id, sim_id),
        );

        let mut context_sizes = Vec::with_capacity(batches.len());
        let mut action_counts = Vec::with_capacity(batches.len());
        let mut batch_sizes = Vec::with_capacity(batches.len());
        let mut mean_rewards = Vec::with_capacity(batches.len());

        for batch in batches {
            context_sizes.push(integer_median(
                batch.iter().map(|i| i.context.size()).collect(),
            ));
            action_counts.push(integer_median(if batch.is_empty() {
                vec![0]
            } else {
                batch.iter().map(|i| i.actions.len()).collect()
            }));
            batch_sizes.push(batch.len());
            mean_rewards.push(self.process_batch(batch, learner, simulation)?);
        }

        Ok(EvaluationRecord {
            simulation_id: sim_id,
            learner_id: lrn_id,
            context_sizes,
            action_counts,
            batch_sizes,
            mean_rewards,
        })
    }

    /// Two-phase online loop: choose for every interaction, observe
    /// rewards for the whole batch at once, then replay feedback in the
    /// original choice order. Some reward functions need the complete
    /// batch before any reward can be computed.
    fn process_batch(
        &self,
        batch: &[Interaction],
        learner: &mut TaskLearner,
        simulation: &dyn Simulation,
    ) -> Result<f64, EvalError> {
        let mut choices: Vec<(Key, Context, Action)> = Vec::with_capacity(batch.len());
        let mut probabilities: Vec<f64> = Vec::with_capacity(batch.len());

        for interaction in batch {
            self.cancel.guard()?;

            let (action, probability) =
                learner.choose(interaction.key, &interaction.context, &interaction.actions)?;
            choices.push((interaction.key, interaction.context.clone(), action));
            probabilities.push(probability);
        }

        let rewards = simulation.observe(&choices)?;
        if rewards.len() != choices.len() {
            return Err(EvalError::RewardCount {
                expected: choices.len(),
                received: rewards.len(),
            });
        }

        for (((key, context, action), reward), probability) in
            choices.iter().zip(&rewards).zip(&probabilities)
        {
            learner.learn(*key, context, action, *reward, *probability)?;
        }

        Ok(round5(mean(&rewards)))
    }
}

fn batchify(simulation: &dyn Simulation) -> Vec<Vec<Interaction>> {
    match simulation.interaction_batches() {
        Some(batches) => batches.to_vec(),
        None => simulation
            .interactions()
            .iter()
            .map(|interaction| vec![interaction.clone()])
            .collect(),
    }
}

/// Integer median: for an even count, the average of the two middle
/// values truncated toward zero (so the median of [3, 0] is 1). Empty
/// input counts as 0.
fn integer_median(mut values: Vec<usize>) -> usize {
    if values.is_empty() {
        return 0;
    }
    values.sort_unstable();

    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Round half away from zero at the 5th decimal digit.
fn round5(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_median_odd_count() {
        assert_eq!(integer_median(vec![5, 1, 3]), 3);
        assert_eq!(integer_median(vec![7]), 7);
    }

    #[test]
    fn test_integer_median_even_count_truncates() {
        // Median of [3, 0] is 1.5 truncated to 1.
        assert_eq!(integer_median(vec![3, 0]), 1);
        assert_eq!(integer_median(vec![2, 4]), 3);
        assert_eq!(integer_median(vec![1, 2, 3, 4]), 2);
    }

    #[test]
    fn test_integer_median_empty() {
        assert_eq!(integer_median(Vec::new()), 0);
    }

    #[test]
    fn test_round5_examples() {
        assert_eq!(round5(0.4), 0.4);
        assert_eq!(round5(1.0 / 3.0), 0.33333);
        assert_eq!(round5(0.123456789), 0.12346);
        assert_eq!(round5(-1.0 / 3.0), -0.33333);
    }

    #[test]
    fn test_mean_examples() {
        assert_eq!(round5(mean(&[0.2, 0.4, 0.6])), 0.4);
        assert_eq!(round5(mean(&[1.0 / 3.0; 3])), 0.33333);
    }

    #[test]
    fn test_cancel_token_signals() {
        let token = CancelToken::new();
        assert!(token.guard().is_ok());

        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.guard(), Err(EvalError::Cancelled));
    }
}

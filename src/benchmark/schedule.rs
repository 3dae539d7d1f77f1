// src/benchmark/schedule.rs
//
// Pre-engine scheduling stages: dropping already-completed work and
// grouping tasks so expensive sources are materialized once per group.

use std::collections::HashSet;

use super::result::BenchmarkResult;
use super::task::Task;

/// Drops tasks whose result already exists in a prior run.
///
/// A task is removed when its exact (simulation, learner) pair has a
/// recorded result, or when its simulation is known to have produced zero
/// batches (empty simulations are permanently skipped for every learner).
/// Re-submitting a generator's output against an updated store therefore
/// yields only the work still outstanding.
pub struct Unfinished {
    completed: HashSet<(usize, usize)>,
    zero_batch: HashSet<usize>,
}

impl Unfinished {
    pub fn new(restored: &BenchmarkResult) -> Self {
        Self {
            completed: restored.completed_pairs(),
            zero_batch: restored.zero_batch_simulations(),
        }
    }

    /// Lazily filter, preserving input order.
    pub fn filter<'a>(
        &self,
        tasks: impl Iterator<Item = Task> + 'a,
    ) -> impl Iterator<Item = Task> + 'a {
        let completed = self.completed.clone();
        let zero_batch = self.zero_batch.clone();

        tasks.filter(move |task| {
            !completed.contains(&(task.sim_id, task.lrn_id)) && !zero_batch.contains(&task.sim_id)
        })
    }
}

/// Partitions a task stream into the groups the engine processes.
///
/// Every input task must appear in exactly one emitted group.
pub trait GroupingStrategy {
    fn group<'a>(
        &self,
        tasks: Box<dyn Iterator<Item = Task> + 'a>,
    ) -> Box<dyn Iterator<Item = Vec<Task>> + 'a>;
}

/// Stable-sorts all tasks by source id and emits one contiguous group per
/// distinct source, enabling one-time source materialization. Requires
/// materializing the full task sequence.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupBySource;

impl GroupingStrategy for GroupBySource {
    fn group<'a>(
        &self,
        tasks: Box<dyn Iterator<Item = Task> + 'a>,
    ) -> Box<dyn Iterator<Item = Vec<Task>> + 'a> {
        let mut tasks: Vec<Task> = tasks.collect();
        tasks.sort_by_key(|task| task.src_id);

        let mut groups: Vec<Vec<Task>> = Vec::new();
        for task in tasks {
            match groups.last_mut() {
                Some(group) if group[0].src_id == task.src_id => group.push(task),
                _ => groups.push(vec![task]),
            }
        }

        Box::new(groups.into_iter())
    }
}

/// Emits each task as its own singleton group, preserving input order and
/// never materializing the stream. Used when source-sharing is undesired,
/// e.g. when whole groups are farmed out to independent workers.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupByNone;

impl GroupingStrategy for GroupByNone {
    fn group<'a>(
        &self,
        tasks: Box<dyn Iterator<Item = Task> + 'a>,
    ) -> Box<dyn Iterator<Item = Vec<Task>> + 'a> {
        Box::new(tasks.map(|task| vec![task]))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::benchmark::result::{
        EvaluationRecord, SimulationRecord, Transaction, TransactionSink,
    };
    use crate::benchmark::task::{TaskLearner, TaskSimulation};
    use crate::learner::RandomLearner;
    use crate::pipes::MemorySource;
    use crate::simulation::MemorySimulation;
    use crate::types::{Action, Context};

    fn stub_task(src_id: usize, sim_id: usize, lrn_id: usize) -> Task {
        let simulation = Arc::new(MemorySimulation::classification(
            vec![Context::None],
            vec![Action::from("a")],
        ));
        Task {
            src_id,
            sim_id,
            lrn_id,
            simulation: TaskSimulation::from_source(Arc::new(MemorySource::new(simulation))),
            learner: TaskLearner::new(Box::new(RandomLearner::new()), None),
        }
    }

    fn record_for(sim_id: usize, lrn_id: usize) -> Transaction {
        Transaction::Evaluation(EvaluationRecord {
            simulation_id: sim_id,
            learner_id: lrn_id,
            context_sizes: vec![1],
            action_counts: vec![1],
            batch_sizes: vec![1],
            mean_rewards: vec![1.0],
        })
    }

    #[test]
    fn test_unfinished_drops_completed_and_zero_batch() {
        let mut restored = BenchmarkResult::new();
        restored.write(record_for(2, 1)).unwrap();
        restored
            .write(Transaction::Simulation(SimulationRecord {
                simulation_id: 3,
                batch_count: 0,
            }))
            .unwrap();

        let tasks = [1, 2, 3]
            .into_iter()
            .flat_map(|sim| [0, 1].into_iter().map(move |lrn| stub_task(sim, sim, lrn)));

        let surviving: Vec<(usize, usize)> = Unfinished::new(&restored)
            .filter(tasks)
            .map(|t| (t.sim_id, t.lrn_id))
            .collect();

        assert_eq!(surviving, vec![(1, 0), (1, 1), (2, 0)]);
    }

    #[test]
    fn test_unfinished_passes_everything_when_store_is_empty() {
        let restored = BenchmarkResult::new();
        let tasks = (0..4).map(|i| stub_task(0, i, 0));
        assert_eq!(Unfinished::new(&restored).filter(tasks).count(), 4);
    }

    #[test]
    fn test_group_by_source_contiguous_and_complete() {
        let tasks: Vec<Task> = vec![
            stub_task(1, 0, 0),
            stub_task(0, 1, 0),
            stub_task(1, 2, 0),
            stub_task(0, 3, 0),
            stub_task(2, 4, 0),
        ];
        let mut expected: Vec<(usize, usize)> =
            tasks.iter().map(|t| (t.src_id, t.sim_id)).collect();
        expected.sort_unstable();

        let groups: Vec<Vec<Task>> = GroupBySource.group(Box::new(tasks.into_iter())).collect();

        assert_eq!(groups.len(), 3);
        for group in &groups {
            assert!(group.iter().all(|t| t.src_id == group[0].src_id));
        }

        let mut seen: Vec<(usize, usize)> = groups
            .iter()
            .flatten()
            .map(|t| (t.src_id, t.sim_id))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_group_by_source_sort_is_stable() {
        let tasks = vec![stub_task(0, 5, 0), stub_task(0, 2, 0), stub_task(0, 9, 0)];
        let groups: Vec<Vec<Task>> = GroupBySource.group(Box::new(tasks.into_iter())).collect();

        let sims: Vec<usize> = groups[0].iter().map(|t| t.sim_id).collect();
        assert_eq!(sims, vec![5, 2, 9]);
    }

    #[test]
    fn test_group_by_none_singletons_in_order() {
        let tasks = vec![stub_task(1, 0, 0), stub_task(0, 1, 0), stub_task(2, 2, 0)];
        let groups: Vec<Vec<Task>> = GroupByNone.group(Box::new(tasks.into_iter())).collect();

        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.len() == 1));
        let sims: Vec<usize> = groups.iter().map(|g| g[0].sim_id).collect();
        assert_eq!(sims, vec![0, 1, 2]);
    }
}

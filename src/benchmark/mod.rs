// src/benchmark/mod.rs
//
// The benchmark execution pipeline:
// - task:     the atomic unit of work plus its generator
// - schedule: completion filtering and task grouping
// - engine:   the online evaluation loop with failure isolation
// - result:   result records, the prior-result store, and sinks
//
// Control flow: Tasks -> Unfinished -> GroupingStrategy -> EvaluationEngine
// -> stream of Transactions consumed by a TransactionSink.

pub mod engine;
pub mod result;
pub mod schedule;
pub mod task;

pub use engine::{CancelToken, EvaluationEngine};
pub use result::{
    BenchmarkResult, EvaluationRecord, JsonLinesSink, SimulationRecord, TeeSink, Transaction,
    TransactionSink,
};
pub use schedule::{GroupByNone, GroupBySource, GroupingStrategy, Unfinished};
pub use task::{Task, TaskLearner, TaskSimulation, Tasks};

//! Gauntlet core library.
//!
//! A benchmark execution engine for evaluating sequential decision-making
//! policies ("learners") against streams of labeled interaction data
//! ("simulations"). Given a cross product of simulation sources and
//! learner configurations, the pipeline deduplicates work completed by a
//! prior interrupted run, groups tasks so expensive sources are
//! materialized once, runs each (simulation, learner) pair through an
//! online train/evaluate loop over interaction batches, and isolates
//! per-learner failures so one crash cannot abort the whole run.
//!
//! # Architecture
//!
//! - **Types** (`types`): keys, features, contexts, actions, interactions.
//! - **Seams** (`pipes`): `SimulationSource` and `SimulationFilter`, the
//!   traits data providers and transforms plug into.
//! - **Simulations** (`simulation`): the `Simulation` trait, in-memory
//!   implementations, and the stock take/shuffle/batch transforms.
//! - **Learners** (`learner`): the `Learner` trait plus trivial reference
//!   learners. Real algorithms live outside this crate.
//! - **Data** (`data`): CSV parsing and column encoding for building
//!   classification simulations from labeled text.
//! - **Benchmark** (`benchmark`): task generation, completion filtering,
//!   grouping, the evaluation engine, and result records.
//!
//! The engine is single-threaded by design; callers wanting parallelism
//! assign whole task groups to independent workers, since groups never
//! share source state.

pub mod benchmark;
pub mod data;
pub mod error;
pub mod learner;
pub mod logging;
pub mod pipes;
pub mod random;
pub mod simulation;
pub mod types;

// --- Re-exports for ergonomic external use ---------------------------------

pub use benchmark::{
    BenchmarkResult, CancelToken, EvaluationEngine, EvaluationRecord, GroupByNone, GroupBySource,
    GroupingStrategy, JsonLinesSink, SimulationRecord, Task, TaskLearner, TaskSimulation, Tasks,
    TeeSink, Transaction, TransactionSink, Unfinished,
};
pub use error::EvalError;
pub use learner::{FixedLearner, Learner, RandomLearner};
pub use logging::{ConsoleLogger, Logger, MemoryLogger, NoopLogger, TimedScope};
pub use pipes::{IdentityFilter, MemorySource, SimulationFilter, SimulationSource, SourceFilters};
pub use random::SeededRandom;
pub use simulation::{
    BatchFilter, BatchedSimulation, MemorySimulation, ProjectedSimulation, ShuffleFilter,
    Simulation, TakeFilter,
};
pub use types::{Action, Context, Feature, Interaction, Key};

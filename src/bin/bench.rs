// src/bin/bench.rs
//
// Benchmark runner: builds a synthetic classification benchmark (one
// shared source, several derived simulation variants, the reference
// learners), runs the full pipeline, and appends result records to a
// JSONL transaction log. Re-running against the same log only performs
// the work still outstanding.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};

use gauntlet::data::{ColumnRef, LabeledCsvReader};
use gauntlet::{
    BatchFilter, BenchmarkResult, ConsoleLogger, EvaluationEngine, FixedLearner, GroupByNone,
    GroupBySource, GroupingStrategy, JsonLinesSink, Learner, Logger, MemorySimulation,
    MemorySource, NoopLogger, RandomLearner, SeededRandom, ShuffleFilter, SimulationSource, Task,
    TakeFilter, TaskSimulation, Tasks, TeeSink, Unfinished,
};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum GroupByArg {
    /// Group tasks sharing a source so each source loads once.
    Source,
    /// One task per group, in generation order.
    None,
}

#[derive(Debug, Parser)]
#[command(
    name = "bench",
    about = "Online-evaluation benchmark runner for decision policies",
    version
)]
struct Args {
    /// JSONL transaction log (created if missing, resumed if present).
    #[arg(long, default_value = "transactions.jsonl")]
    log: PathBuf,

    /// Deterministic seed shared by every learner adapter and by the
    /// synthetic data generator.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Continue past per-learner failures instead of aborting the run.
    #[arg(long)]
    ignore_failures: bool,

    /// Task grouping strategy.
    #[arg(long, value_enum, default_value = "source")]
    group_by: GroupByArg,

    /// Interactions in the synthetic source.
    #[arg(long, default_value_t = 200)]
    interactions: usize,

    /// Print scoped timing logs while running.
    #[arg(short, long)]
    verbose: bool,
}

fn synthetic_csv(rows: usize, random: &mut SeededRandom) -> String {
    let mut text = String::from("f1,f2,f3,label\n");
    for _ in 0..rows {
        let a = random.next_f64();
        let b = random.next_f64();
        let c = random.next_f64();
        let label = if a + b > 1.0 { "high" } else { "low" };
        let _ = writeln!(text, "{:.4},{:.4},{:.4},{}", a, b, c, label);
    }
    text
}

fn main() -> Result<()> {
    let args = Args::parse();

    // One shared source; every variant below derives from the same
    // underlying object and therefore shares its source id.
    let mut random = SeededRandom::new(Some(args.seed));
    let csv = synthetic_csv(args.interactions, &mut random);
    let (contexts, labels) = LabeledCsvReader::new(ColumnRef::Header("label".to_string()))
        .read(&csv)
        .context("building the synthetic classification data")?;
    let simulation = Arc::new(MemorySimulation::classification(contexts, labels));
    let source: Arc<dyn SimulationSource> = Arc::new(MemorySource::new(simulation));

    let simulations = vec![
        TaskSimulation::from_source(Arc::clone(&source)),
        TaskSimulation::new(
            Arc::clone(&source),
            Some(Arc::new(ShuffleFilter::new(Some(args.seed)))),
        ),
        TaskSimulation::new(
            Arc::clone(&source),
            Some(Arc::new(TakeFilter::new(args.interactions / 2))),
        ),
        TaskSimulation::new(Arc::clone(&source), Some(Arc::new(BatchFilter::new(10)))),
    ];

    let learners: Vec<Box<dyn Learner>> = vec![
        Box::new(RandomLearner::new()),
        Box::new(FixedLearner::new(vec![0.75, 0.25])),
    ];
    let families: Vec<String> = learners.iter().map(|l| l.family()).collect();

    let restored = BenchmarkResult::from_log(&args.log)?;
    let already_done = restored.evaluations().len();

    let generator = Tasks::new(simulations, learners, Some(args.seed));
    let pending = Unfinished::new(&restored).filter(generator.read());
    let groups: Box<dyn Iterator<Item = Vec<Task>>> = match args.group_by {
        GroupByArg::Source => GroupBySource.group(Box::new(pending)),
        GroupByArg::None => GroupByNone.group(Box::new(pending)),
    };

    let console = ConsoleLogger::new();
    let noop = NoopLogger;
    let logger: &dyn Logger = if args.verbose { &console } else { &noop };

    let mut log_sink = JsonLinesSink::append(&args.log)?;
    let mut store = restored;
    {
        let mut sink = TeeSink::new(&mut log_sink, &mut store);
        let engine = EvaluationEngine::new(args.ignore_failures, logger);
        engine.process(groups, &mut sink)?;
    }

    println!(
        "completed {} evaluations ({} restored from {})",
        store.evaluations().len(),
        already_done,
        args.log.display()
    );
    for record in store.evaluations() {
        let total_interactions: usize = record.batch_sizes.iter().sum();
        let overall = if record.mean_rewards.is_empty() {
            0.0
        } else {
            record.mean_rewards.iter().sum::<f64>() / record.mean_rewards.len() as f64
        };
        let family = families
            .get(record.learner_id)
            .map(String::as_str)
            .unwrap_or("?");
        println!(
            "sim {} | learner {} ({}) | {} batches | {} interactions | mean reward {:.5}",
            record.simulation_id,
            record.learner_id,
            family,
            record.batch_sizes.len(),
            total_interactions,
            overall
        );
    }

    Ok(())
}

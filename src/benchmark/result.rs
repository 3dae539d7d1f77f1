// src/benchmark/result.rs
//
// Result records produced by the evaluation engine, the prior-result
// store queried for resumability, and the JSONL transaction log.

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// Per-simulation record: how many batches the materialized simulation
/// held. A count of zero marks the simulation as permanently skippable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub simulation_id: usize,
    pub batch_count: usize,
}

/// Per-(simulation, learner) record with positionally-aligned per-batch
/// statistic sequences. Mean rewards are rounded to 5 decimal digits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub simulation_id: usize,
    pub learner_id: usize,
    pub context_sizes: Vec<usize>,
    pub action_counts: Vec<usize>,
    pub batch_sizes: Vec<usize>,
    pub mean_rewards: Vec<f64>,
}

/// One output record of the engine, persisted as a JSON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transaction {
    Simulation(SimulationRecord),
    Evaluation(EvaluationRecord),
}

/// Consumer of the engine's transaction stream.
///
/// The engine writes records as they are produced, so everything emitted
/// before a failure survives for the next (resumed) run.
pub trait TransactionSink {
    fn write(&mut self, transaction: Transaction) -> Result<(), EvalError>;
}

/// In-memory result store.
///
/// Doubles as the prior-result store consulted by the completion filter
/// (completed pairs, zero-batch simulations) and as a sink collecting a
/// live run's records.
#[derive(Debug, Default)]
pub struct BenchmarkResult {
    evaluations: Vec<EvaluationRecord>,
    simulations: HashMap<usize, usize>,
}

impl BenchmarkResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from a JSONL transaction log. A missing file is an empty
    /// store, so first runs and resumed runs share one code path.
    pub fn from_log(path: &Path) -> Result<Self, EvalError> {
        let mut result = Self::new();

        let file = match File::open(path) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(result),
            Err(error) => {
                return Err(EvalError::store(format!(
                    "could not open {}: {}",
                    path.display(),
                    error
                )))
            }
        };

        for line in BufReader::new(file).lines() {
            let line =
                line.map_err(|error| EvalError::store(format!("could not read log: {}", error)))?;
            if line.trim().is_empty() {
                continue;
            }
            let transaction: Transaction = serde_json::from_str(&line)
                .map_err(|error| EvalError::store(format!("malformed log line: {}", error)))?;
            result.write(transaction)?;
        }

        Ok(result)
    }

    pub fn evaluations(&self) -> &[EvaluationRecord] {
        &self.evaluations
    }

    pub fn is_complete(&self, simulation_id: usize, learner_id: usize) -> bool {
        self.evaluations
            .iter()
            .any(|r| r.simulation_id == simulation_id && r.learner_id == learner_id)
    }

    pub fn completed_pairs(&self) -> HashSet<(usize, usize)> {
        self.evaluations
            .iter()
            .map(|r| (r.simulation_id, r.learner_id))
            .collect()
    }

    pub fn batch_count(&self, simulation_id: usize) -> Option<usize> {
        self.simulations.get(&simulation_id).copied()
    }

    pub fn zero_batch_simulations(&self) -> HashSet<usize> {
        self.simulations
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl TransactionSink for BenchmarkResult {
    fn write(&mut self, transaction: Transaction) -> Result<(), EvalError> {
        match transaction {
            Transaction::Simulation(record) => {
                self.simulations
                    .insert(record.simulation_id, record.batch_count);
            }
            Transaction::Evaluation(record) => self.evaluations.push(record),
        }
        Ok(())
    }
}

/// Sink writing one JSON object per line, flushed per record so an
/// interrupted run loses at most the record in flight.
pub struct JsonLinesSink {
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    /// Create or truncate the log at `path`.
    pub fn create(path: &Path) -> Result<Self, EvalError> {
        let file = File::create(path).map_err(|error| {
            EvalError::store(format!("could not create {}: {}", path.display(), error))
        })?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Open the log at `path` for appending, creating it if missing. This
    /// is the resumable-run entry point.
    pub fn append(path: &Path) -> Result<Self, EvalError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|error| {
                EvalError::store(format!("could not open {}: {}", path.display(), error))
            })?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl TransactionSink for JsonLinesSink {
    fn write(&mut self, transaction: Transaction) -> Result<(), EvalError> {
        let line = serde_json::to_string(&transaction)
            .map_err(|error| EvalError::store(format!("could not serialize record: {}", error)))?;
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush())
            .map_err(|error| EvalError::store(format!("could not write record: {}", error)))
    }
}

/// Fans one transaction stream out to a persistent log and an in-memory
/// store at the same time.
pub struct TeeSink<'a> {
    first: &'a mut dyn TransactionSink,
    second: &'a mut dyn TransactionSink,
}

impl<'a> TeeSink<'a> {
    pub fn new(first: &'a mut dyn TransactionSink, second: &'a mut dyn TransactionSink) -> Self {
        Self { first, second }
    }
}

impl TransactionSink for TeeSink<'_> {
    fn write(&mut self, transaction: Transaction) -> Result<(), EvalError> {
        self.first.write(transaction.clone())?;
        self.second.write(transaction)
    }
}

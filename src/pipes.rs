// src/pipes.rs
//
// Source and filter seams for simulation pipelines.
//
// A source lazily materializes a simulation; a filter transforms one
// simulation into another. `SourceFilters` composes the two so a pipeline
// can be passed anywhere a plain source is accepted, while still exposing
// the underlying source for grouping and deduplication.

use std::sync::Arc;

use crate::error::EvalError;
use crate::simulation::Simulation;

/// Lazily-loaded producer of a simulation.
///
/// Identity is `Arc` pointer identity, never content: clones of the same
/// `Arc<dyn SimulationSource>` are the same source to the scheduler.
pub trait SimulationSource {
    fn read(&self) -> Result<Arc<dyn Simulation>, EvalError>;

    /// Short display name used in log messages.
    fn describe(&self) -> String {
        short_type_name::<Self>()
    }
}

/// Transform from one simulation to another.
///
/// Filters receive the loaded simulation behind an `Arc` so the identity
/// transform is free and expensive sources are materialized once per group
/// no matter how many variants derive from them.
pub trait SimulationFilter {
    fn filter(&self, simulation: Arc<dyn Simulation>) -> Result<Arc<dyn Simulation>, EvalError>;

    fn describe(&self) -> String {
        short_type_name::<Self>()
    }
}

/// The identity transform.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityFilter;

impl SimulationFilter for IdentityFilter {
    fn filter(&self, simulation: Arc<dyn Simulation>) -> Result<Arc<dyn Simulation>, EvalError> {
        Ok(simulation)
    }
}

/// A source composed with a filter.
pub struct SourceFilters {
    source: Arc<dyn SimulationSource>,
    filter: Arc<dyn SimulationFilter>,
}

impl SourceFilters {
    pub fn new(source: Arc<dyn SimulationSource>, filter: Arc<dyn SimulationFilter>) -> Self {
        Self { source, filter }
    }

    /// The underlying source, unwrapped.
    pub fn source(&self) -> &Arc<dyn SimulationSource> {
        &self.source
    }

    pub fn transform(&self) -> &Arc<dyn SimulationFilter> {
        &self.filter
    }
}

impl SimulationSource for SourceFilters {
    fn read(&self) -> Result<Arc<dyn Simulation>, EvalError> {
        self.filter.filter(self.source.read()?)
    }

    fn describe(&self) -> String {
        format!("{}|{}", self.source.describe(), self.filter.describe())
    }
}

/// Source wrapping an already-materialized simulation.
pub struct MemorySource {
    simulation: Arc<dyn Simulation>,
}

impl MemorySource {
    pub fn new(simulation: Arc<dyn Simulation>) -> Self {
        Self { simulation }
    }
}

impl SimulationSource for MemorySource {
    fn read(&self) -> Result<Arc<dyn Simulation>, EvalError> {
        Ok(Arc::clone(&self.simulation))
    }
}

fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}

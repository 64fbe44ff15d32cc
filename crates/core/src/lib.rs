//! Core types for the Strand optimization engine.
//!
//! This crate defines the data model that the pipeline and its operators
//! share:
//!
//! - [`Element`] — a typed scalar (real, integer, ordinal or nominal)
//! - [`Mapping`] — a candidate solution and its evaluated outputs
//! - [`Set`] and [`Tag`] — ordered, tagged collections of mapping handles
//! - [`Population`] — arenas owning every mapping and set of a pipeline
//! - [`Problem`] — variables, objectives, constraints and function bindings
//! - [`DominanceRelation`] — pluggable pairwise comparison of candidates
//! - [`LogSink`] — receives evaluation and population records
//! - [`Observer`] — receives engine events and optionally returns actions

mod arena;
mod element;
mod mapping;
mod observer;
mod population;
mod set;

pub mod dominance;
pub mod lattice;
pub mod log;
pub mod problem;

pub use arena::{Arena, ArenaError, Handle};
pub use dominance::{
    ConstrainedDominance, Dominance, DominanceMode, DominanceRelation, Outcome, ParetoDominance,
    Preferability, PreferabilityConstraintHandling, non_dominated_sort,
};
pub use element::{Element, ElementError, ElementType};
pub use log::{LogSink, MemoryLog, TracingLog};
pub use mapping::{EvaluationError, Mapping, MappingId, ValidationStatus};
pub use observer::Observer;
pub use population::Population;
pub use problem::{Function, FunctionRegistry, OptimizationType, Problem, ProblemError};
pub use set::{Set, SetId, TAG_DELIMITER, Tag};

/// Tolerance used when comparing objective values for equality.
pub const EPSILON: f64 = 1e-6;

/// Weight of the sum term in the augmented Chebyshev function.
pub const AUGMENTED_CONSTANT: f64 = 0.05;

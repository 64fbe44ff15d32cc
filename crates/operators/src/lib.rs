//! Operators for the Strand optimization engine.
//!
//! Every operator implements [`strand_pipeline::Operator`] and is added to a
//! [`strand_pipeline::Pipeline`] as a node. The families are:
//! - [`init`] — create the first main set.
//! - [`Evaluator`] — runs the problem's functions on pending mappings.
//! - [`filtration`] — select, clone and merge sets.
//! - [`variation`] — crossover and mutation in place.
//! - [`fitness`] — ranking, crowding, scalarisation and sharing costs.
//! - [`Hypervolume`] and [`CorrelationObjectiveReduction`] — indicators
//!   published on the pipeline state.
//! - [`Termination`] — signals the end of a flow.
//! - [`Formulation`] — assembles a problem from registered functions.
//!
//! [`NsgaII`] chains several of them into one generation, and
//! [`builtin_registry`] makes all of them available by name.

mod convergence;
mod evaluator;
mod formulation;
mod nsga2;
mod reduction;
mod registry;
mod sampling;
mod termination;

pub mod filtration;
pub mod fitness;
pub mod init;
pub mod variation;

pub use convergence::{Hypervolume, hypervolume};
pub use evaluator::{ConfigError, Evaluator, EvaluatorConfig, InvalidMappings};
pub use formulation::Formulation;
pub use init::{LhsInit, RandomInit, UserDefinedInit, WeightVectorInit};
pub use nsga2::NsgaII;
pub use reduction::{CorrelationObjectiveReduction, correlation_matrix, symmetric_eigen};
pub use registry::{builtin_registry, engine};
pub use termination::Termination;

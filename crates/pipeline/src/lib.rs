//! The pipeline layer of the Strand optimization engine.
//!
//! A [`Pipeline`] is an arena of operator nodes sharing one
//! [`PipelineState`] (population, counters, reference vectors) and one
//! [`OptimizationContext`] (random stream, problem, log sink, functions).
//! Nodes read and write tagged sets through the cursor protocol of
//! [`NodeIo`].
//!
//! On top of the arena:
//! - [`Algorithm`] — a fixed operator chain representing one generation.
//! - [`OptimizationLinearFlow`] — the generation loop.
//! - [`Engine`] — several flows and an [`OperatorRegistry`].

mod algorithm;
mod context;
mod engine;
mod error;
mod io;
mod operator;
mod params;
mod pipeline;
mod registry;
mod state;

pub mod flow;

pub use algorithm::Algorithm;
pub use context::{DEFAULT_SEED, OptimizationContext};
pub use engine::Engine;
pub use error::{ErrorState, OperatorError, PipelineError};
pub use flow::{Error as FlowError, OptimizationLinearFlow};
pub use io::{Cursors, NodeIo, TagConfig};
pub use operator::{Operator, Start};
pub use params::{OperatorSpec, ParamError, ParamValue, Parameter};
pub use pipeline::{NodeId, Pipeline};
pub use registry::{AlgorithmBuilder, OperatorFactory, OperatorRegistry};
pub use state::{ArchiveUpdate, PipelineState, ReductionData};

use crate::{NodeId, PipelineError};

/// Errors returned by a flow.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("flow has no nodes")]
    Empty,

    /// A node of the flow is in error; nothing was run.
    #[error("node `{name}` is in error")]
    Halted { node: NodeId, name: String },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

use strand_core::{EvaluationError, ProblemError};
use thiserror::Error;

use crate::{NodeId, ParamError};

/// Health of a pipeline node.
///
/// Anything other than [`ErrorState::NoError`] makes every later evaluation
/// of the node, and of any chain passing through it, a no-op until the
/// state is reset with `define_error_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorState {
    #[default]
    NoError,
    UndefinedError,
    RangeError,
    DomainError,
}

impl ErrorState {
    #[must_use]
    pub fn is_error(self) -> bool {
        self != Self::NoError
    }
}

/// Errors raised by an operator's own transformation.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// A size or index mismatch.
    #[error("range error: {0}")]
    Range(String),

    /// A value outside its domain, such as a stale handle or a bad ratio.
    #[error("domain error: {0}")]
    Domain(String),

    /// The problem cannot be evaluated.
    #[error("problem error: {0}")]
    Problem(#[from] ProblemError),

    /// An evaluation function failed.
    #[error("function error: {0}")]
    Function(Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Param(#[from] ParamError),
}

impl OperatorError {
    pub fn range(message: impl Into<String>) -> Self {
        Self::Range(message.into())
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain(message.into())
    }
}

impl From<EvaluationError> for OperatorError {
    fn from(error: EvaluationError) -> Self {
        match error {
            EvaluationError::InputSize { .. }
            | EvaluationError::OutputSize { .. }
            | EvaluationError::MissingSlot { .. } => Self::Range(error.to_string()),
            EvaluationError::Function { .. } => Self::Function(Box::new(error)),
        }
    }
}

/// Errors returned when evaluating a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The node handle does not belong to this pipeline.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    /// An upstream reference points at a node that does not precede it.
    #[error("node {node:?} cannot use {upstream:?} as its upstream")]
    InvalidUpstream { node: NodeId, upstream: NodeId },

    /// An operator failed; the node and everything downstream are now in error.
    #[error("node `{name}` failed")]
    Node {
        node: NodeId,
        name: String,
        #[source]
        source: OperatorError,
    },
}

use crate::{NodeId, Operator, Pipeline, PipelineError};

/// A fixed chain of operators representing one generation.
///
/// Operators are appended to a pipeline in order, each wired below the
/// previous one, and the first below the algorithm's upstream node.
/// Evaluating the final node therefore evaluates the whole chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Algorithm {
    name: String,
    description: String,
    upstream: Option<NodeId>,
    nodes: Vec<NodeId>,
}

impl Algorithm {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, upstream: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            upstream,
            nodes: Vec::new(),
        }
    }

    /// Appends `operator` below the current final node.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] if the upstream node does not
    /// belong to `pipeline`.
    pub fn append_operator(
        &mut self,
        pipeline: &mut Pipeline,
        operator: impl Operator + 'static,
    ) -> Result<NodeId, PipelineError> {
        let node = pipeline.add_node(operator, self.final_node())?;
        self.nodes.push(node);
        Ok(node)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn upstream(&self) -> Option<NodeId> {
        self.upstream
    }

    /// The constituent nodes, in chain order.
    #[must_use]
    pub fn operators(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The last node of the chain, or the upstream node while empty.
    #[must_use]
    pub fn final_node(&self) -> Option<NodeId> {
        self.nodes.last().copied().or(self.upstream)
    }

    /// Evaluates the chain through its final node.
    ///
    /// # Errors
    ///
    /// Propagates the pipeline's evaluation error.
    pub fn evaluate(&self, pipeline: &mut Pipeline) -> Result<(), PipelineError> {
        match self.final_node() {
            Some(node) => pipeline.evaluate(node),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use strand_core::Problem;

    use super::*;
    use crate::{OptimizationContext, Start};

    #[test]
    fn operators_chain_below_the_upstream() {
        let mut pipeline = Pipeline::new(OptimizationContext::new(Problem::zdt1(2)));
        let root = pipeline.add_node(Start, None).unwrap();

        let mut algorithm = Algorithm::new("Pair", "Two no-op steps.", Some(root));
        assert_eq!(algorithm.final_node(), Some(root));

        let first = algorithm.append_operator(&mut pipeline, Start).unwrap();
        let second = algorithm.append_operator(&mut pipeline, Start).unwrap();

        assert_eq!(algorithm.operators(), &[first, second]);
        assert_eq!(algorithm.final_node(), Some(second));
        assert_eq!(pipeline.upstream_path(second).unwrap(), vec![root, first, second]);
        algorithm.evaluate(&mut pipeline).unwrap();
    }
}

//! The node arena and its evaluation protocol.


use petgraph::{
    algo::toposort,
    graph::{DiGraph, NodeIndex},
};
use tracing::{debug, warn};

use crate::{
    Cursors, ErrorState, NodeIo, Operator, OperatorError, OptimizationContext, ParamError,
    ParamValue, Parameter, PipelineError, PipelineState, TagConfig,
};

/// A node's position in its pipeline's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

struct Node {
    operator: Box<dyn Operator>,
    upstream: Option<NodeId>,
    tags: TagConfig,
    error: ErrorState,
    cursors: Cursors,
}

/// An arena of operator nodes sharing one state and one context.
///
/// Each node names at most one upstream node, which must already exist when
/// the node is added. Evaluating a node first evaluates its upstream path,
/// root first, so every chain is brought up to date before its tail runs.
pub struct Pipeline {
    nodes: Vec<Node>,
    state: PipelineState,
    context: OptimizationContext,
}

impl Pipeline {
    #[must_use]
    pub fn new(context: OptimizationContext) -> Self {
        Self {
            nodes: Vec::new(),
            state: PipelineState::new(),
            context,
        }
    }

    /// Adds a node running `operator` below `upstream`.
    ///
    /// The node starts with the operator's default tags, `NoError` and
    /// rewound cursors.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] if `upstream` is not in this
    /// pipeline.
    pub fn add_node(
        &mut self,
        operator: impl Operator + 'static,
        upstream: Option<NodeId>,
    ) -> Result<NodeId, PipelineError> {
        self.add_boxed(Box::new(operator), upstream)
    }

    /// Adds a node running a boxed operator; see [`Pipeline::add_node`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] if `upstream` is not in this
    /// pipeline.
    pub fn add_boxed(
        &mut self,
        operator: Box<dyn Operator>,
        upstream: Option<NodeId>,
    ) -> Result<NodeId, PipelineError> {
        if let Some(up) = upstream {
            self.check(up)?;
        }
        let id = NodeId(self.nodes.len());
        debug!(node = operator.name(), id = id.0, upstream = ?upstream, "node added");
        self.nodes.push(Node {
            tags: operator.default_tags(),
            operator,
            upstream,
            error: ErrorState::NoError,
            cursors: Cursors::default(),
        });
        Ok(id)
    }

    /// Points `node` at a new upstream node.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle and
    /// [`PipelineError::InvalidUpstream`] if the new link would close a cycle.
    pub fn set_upstream(&mut self, node: NodeId, upstream: Option<NodeId>) -> Result<(), PipelineError> {
        self.check(node)?;
        if let Some(up) = upstream {
            self.check(up)?;
        }
        let previous = std::mem::replace(&mut self.nodes[node.0].upstream, upstream);
        if self.evaluation_order().is_err() {
            self.nodes[node.0].upstream = previous;
            return Err(PipelineError::InvalidUpstream {
                node,
                upstream: upstream.unwrap_or(node),
            });
        }
        Ok(())
    }

    fn check(&self, node: NodeId) -> Result<(), PipelineError> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(PipelineError::UnknownNode(node))
        }
    }

    // ====================================================================
    // Topology
    // ====================================================================

    /// Returns the node's upstream node, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle.
    pub fn upstream(&self, node: NodeId) -> Result<Option<NodeId>, PipelineError> {
        self.check(node)?;
        Ok(self.nodes[node.0].upstream)
    }

    /// Returns the path from the root of `node`'s chain to `node`, inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle.
    pub fn upstream_path(&self, node: NodeId) -> Result<Vec<NodeId>, PipelineError> {
        self.check(node)?;
        let mut path = vec![node];
        let mut current = node;
        while let Some(up) = self.nodes[current.0].upstream {
            if path.contains(&up) {
                break;
            }
            path.push(up);
            current = up;
        }
        path.reverse();
        Ok(path)
    }

    /// Returns every node whose upstream path passes through `node`,
    /// excluding `node` itself.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle.
    pub fn downstream(&self, node: NodeId) -> Result<Vec<NodeId>, PipelineError> {
        self.check(node)?;
        let mut reached = vec![node];
        let mut frontier = vec![node];
        while let Some(current) = frontier.pop() {
            for (i, candidate) in self.nodes.iter().enumerate() {
                let id = NodeId(i);
                if candidate.upstream == Some(current) && !reached.contains(&id) {
                    reached.push(id);
                    frontier.push(id);
                }
            }
        }
        reached.retain(|&id| id != node);
        reached.sort_unstable();
        Ok(reached)
    }

    /// Builds a graph with an edge from every upstream node to its child.
    #[must_use]
    pub fn graph(&self) -> DiGraph<NodeId, ()> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.nodes.len());
        for i in 0..self.nodes.len() {
            graph.add_node(NodeId(i));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(up) = node.upstream {
                graph.add_edge(NodeIndex::new(up.0), NodeIndex::new(i), ());
            }
        }
        graph
    }

    /// Returns every node in an order where each follows its upstream node.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidUpstream`] naming a node on a cycle.
    pub fn evaluation_order(&self) -> Result<Vec<NodeId>, PipelineError> {
        let graph = self.graph();
        toposort(&graph, None)
            .map(|order| order.into_iter().map(|index| graph[index]).collect())
            .map_err(|cycle| {
                let node = graph[cycle.node_id()];
                PipelineError::InvalidUpstream {
                    node,
                    upstream: self.nodes[node.0].upstream.unwrap_or(node),
                }
            })
    }

    // ====================================================================
    // Evaluation
    // ====================================================================

    /// Brings `node`'s upstream chain up to date, then runs `node`.
    ///
    /// Does nothing if any node on the path is in error.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Node`] for the first operator that fails.
    /// The failing node and everything downstream of it are then marked
    /// [`ErrorState::UndefinedError`].
    pub fn evaluate(&mut self, node: NodeId) -> Result<(), PipelineError> {
        let path = self.upstream_path(node)?;
        if self.halted(&path) {
            debug!(node = self.nodes[node.0].operator.name(), "chain in error, skipped");
            return Ok(());
        }
        for id in path {
            self.run(id)?;
        }
        Ok(())
    }

    /// Runs `node` without evaluating its upstream chain.
    ///
    /// # Errors
    ///
    /// As for [`Pipeline::evaluate`].
    pub fn evaluate_only_this_node(&mut self, node: NodeId) -> Result<(), PipelineError> {
        let path = self.upstream_path(node)?;
        if self.halted(&path) {
            return Ok(());
        }
        self.run(node)
    }

    fn halted(&self, path: &[NodeId]) -> bool {
        path.iter().any(|id| self.nodes[id.0].error.is_error())
    }

    fn run(&mut self, id: NodeId) -> Result<(), PipelineError> {
        let result = {
            let Self {
                nodes,
                state,
                context,
            } = &mut *self;
            let node = &mut nodes[id.0];
            node.cursors.refresh(state.population_mut(), &node.tags);

            debug!(
                node = node.operator.name(),
                iteration = state.current_iteration(),
                used_budget = state.used_budget(),
                "evaluating node"
            );

            let mut io = NodeIo::new(state, context, &node.tags, &mut node.cursors);
            node.operator.evaluate_node(&mut io)
        };
        result.map_err(|source| self.fail(id, source))
    }

    fn fail(&mut self, id: NodeId, source: OperatorError) -> PipelineError {
        let name = self.nodes[id.0].operator.name().to_owned();
        warn!(node = %name, error = %source, "node failed");

        self.nodes[id.0].error = ErrorState::UndefinedError;
        if let Ok(downstream) = self.downstream(id) {
            for node in downstream {
                self.nodes[node.0].error = ErrorState::UndefinedError;
            }
        }
        PipelineError::Node {
            node: id,
            name,
            source,
        }
    }

    // ====================================================================
    // Node accessors
    // ====================================================================

    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle.
    pub fn error_state(&self, node: NodeId) -> Result<ErrorState, PipelineError> {
        self.check(node)?;
        Ok(self.nodes[node.0].error)
    }

    /// Sets a node's error state; `NoError` re-enables it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle.
    pub fn define_error_state(&mut self, node: NodeId, error: ErrorState) -> Result<(), PipelineError> {
        self.check(node)?;
        self.nodes[node.0].error = error;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle.
    pub fn operator(&self, node: NodeId) -> Result<&dyn Operator, PipelineError> {
        self.check(node)?;
        Ok(self.nodes[node.0].operator.as_ref())
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle.
    pub fn operator_mut(&mut self, node: NodeId) -> Result<&mut dyn Operator, PipelineError> {
        self.check(node)?;
        Ok(self.nodes[node.0].operator.as_mut())
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle.
    pub fn name(&self, node: NodeId) -> Result<&str, PipelineError> {
        self.operator(node).map(Operator::name)
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle.
    pub fn description(&self, node: NodeId) -> Result<&str, PipelineError> {
        self.operator(node).map(Operator::description)
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle.
    pub fn tags(&self, node: NodeId) -> Result<&TagConfig, PipelineError> {
        self.check(node)?;
        Ok(&self.nodes[node.0].tags)
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle.
    pub fn tags_mut(&mut self, node: NodeId) -> Result<&mut TagConfig, PipelineError> {
        self.check(node)?;
        Ok(&mut self.nodes[node.0].tags)
    }

    /// Returns the node's resolved input and output sets from its last run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle.
    pub fn cursors(&self, node: NodeId) -> Result<&Cursors, PipelineError> {
        self.check(node)?;
        Ok(&self.nodes[node.0].cursors)
    }

    /// Lists the node's tag parameters followed by its operator's parameters.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle.
    pub fn parameters(&self, node: NodeId) -> Result<Vec<Parameter>, PipelineError> {
        self.check(node)?;
        let entry = &self.nodes[node.0];
        let mut parameters = vec![
            Parameter::new(INPUT_TAGS, "Tags selecting the input sets.", &entry.tags.input[..]),
            Parameter::new(OUTPUT_TAGS, "Tags selecting the output sets.", &entry.tags.output[..]),
            Parameter::new(
                ADDITIONAL_OUTPUT_TAGS,
                "Tags added to every output set.",
                &entry.tags.additional_output[..],
            ),
        ];
        parameters.extend(entry.operator.parameters());
        Ok(parameters)
    }

    /// Sets a tag list or delegates to the operator.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] for a foreign handle, or a
    /// [`ParamError`] wrapped as a node failure.
    pub fn set_parameter(
        &mut self,
        node: NodeId,
        name: &str,
        value: &ParamValue,
    ) -> Result<(), PipelineError> {
        self.check(node)?;
        let entry = &mut self.nodes[node.0];
        let result: Result<(), ParamError> = match name {
            INPUT_TAGS => value.as_tags(name).map(|tags| entry.tags.input = tags),
            OUTPUT_TAGS => value.as_tags(name).map(|tags| entry.tags.output = tags),
            ADDITIONAL_OUTPUT_TAGS => value
                .as_tags(name)
                .map(|tags| entry.tags.additional_output = tags),
            _ => entry.operator.set_parameter(name, value),
        };
        result.map_err(|error| PipelineError::Node {
            node,
            name: entry.operator.name().to_owned(),
            source: error.into(),
        })
    }

    // ====================================================================
    // Shared state
    // ====================================================================

    #[must_use]
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut PipelineState {
        &mut self.state
    }

    #[must_use]
    pub fn context(&self) -> &OptimizationContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut OptimizationContext {
        &mut self.context
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(OptimizationContext::default())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "nodes",
                &self
                    .nodes
                    .iter()
                    .map(|node| node.operator.name())
                    .collect::<Vec<_>>(),
            )
            .field("state", &self.state)
            .field("context", &self.context)
            .finish()
    }
}

const INPUT_TAGS: &str = "InputTags";
const OUTPUT_TAGS: &str = "OutputTags";
const ADDITIONAL_OUTPUT_TAGS: &str = "AdditionalOutputTags";

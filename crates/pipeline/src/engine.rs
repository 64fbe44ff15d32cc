use tracing::warn;

use crate::{
    FlowError, NodeId, OperatorRegistry, OperatorSpec, OptimizationLinearFlow, PipelineError,
};

/// Holds several flows and the registry used to populate them.
#[derive(Debug, Default)]
pub struct Engine {
    flows: Vec<OptimizationLinearFlow>,
    current: usize,
    registry: OperatorRegistry,
}

impl Engine {
    #[must_use]
    pub fn new(registry: OperatorRegistry) -> Self {
        Self {
            flows: Vec::new(),
            current: 0,
            registry,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut OperatorRegistry {
        &mut self.registry
    }

    /// Adds a flow and makes it current. Returns its index.
    pub fn append_flow(&mut self, flow: OptimizationLinearFlow) -> usize {
        self.flows.push(flow);
        self.current = self.flows.len() - 1;
        self.current
    }

    #[must_use]
    pub fn flow(&self, index: usize) -> Option<&OptimizationLinearFlow> {
        self.flows.get(index)
    }

    pub fn flow_mut(&mut self, index: usize) -> Option<&mut OptimizationLinearFlow> {
        self.flows.get_mut(index)
    }

    #[must_use]
    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Moves the current index; returns `false` if it is out of range.
    pub fn set_current_index(&mut self, index: usize) -> bool {
        if index < self.flows.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn current_flow(&self) -> Option<&OptimizationLinearFlow> {
        self.flows.get(self.current)
    }

    pub fn current_flow_mut(&mut self) -> Option<&mut OptimizationLinearFlow> {
        self.flows.get_mut(self.current)
    }

    /// Evaluates flow `index` once.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Empty`] for a missing flow, otherwise the flow's
    /// own evaluation error.
    pub fn evaluate_flow(&mut self, index: usize) -> Result<(), FlowError> {
        self.flows.get_mut(index).ok_or(FlowError::Empty)?.evaluate()
    }

    /// Adds the named operator below `parent` in the current flow's pipeline.
    ///
    /// Algorithms are built in full, and the final node of the chain is
    /// returned. Returns `None` if there is no current flow, the name is not
    /// registered, or the node cannot be wired.
    pub fn create_operator(&mut self, name: &str, parent: Option<NodeId>) -> Option<NodeId> {
        let flow = self.flows.get_mut(self.current)?;
        let pipeline = flow.pipeline_mut();

        let result: Result<Option<NodeId>, PipelineError> =
            if let Some(operator) = self.registry.create(name) {
                pipeline.add_boxed(operator, parent).map(Some)
            } else {
                self.registry
                    .build_algorithm(name, pipeline, parent)?
                    .map(|algorithm| algorithm.final_node())
            };

        match result {
            Ok(node) => node,
            Err(error) => {
                warn!(operator = name, %error, "operator could not be created");
                None
            }
        }
    }

    /// Creates an operator from a spec and applies its parameters.
    ///
    /// Returns `None` if the operator cannot be created or a parameter is
    /// rejected.
    pub fn create_from_spec(&mut self, spec: &OperatorSpec, parent: Option<NodeId>) -> Option<NodeId> {
        let node = self.create_operator(&spec.name, parent)?;
        let pipeline = self.flows.get_mut(self.current)?.pipeline_mut();
        for (name, value) in &spec.parameters {
            if let Err(error) = pipeline.set_parameter(node, name, value) {
                warn!(operator = %spec.name, parameter = %name, %error, "parameter rejected");
                return None;
            }
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use strand_core::Problem;

    use super::*;
    use crate::{Algorithm, OptimizationContext, ParamValue, Pipeline, Start};

    fn engine() -> Engine {
        let mut registry = OperatorRegistry::new();
        registry.register_operator("Start", || Start);
        registry.register_algorithm("Twice", |pipeline, upstream| {
            let mut algorithm = Algorithm::new("Twice", "", upstream);
            algorithm.append_operator(pipeline, Start)?;
            algorithm.append_operator(pipeline, Start)?;
            Ok(algorithm)
        });

        let mut engine = Engine::new(registry);
        let pipeline = Pipeline::new(OptimizationContext::new(Problem::zdt1(2)));
        engine.append_flow(OptimizationLinearFlow::new(pipeline));
        engine
    }

    #[test]
    fn operators_and_algorithms_are_created_by_name() {
        let mut engine = engine();
        let root = engine.create_operator("Start", None).unwrap();
        let tail = engine.create_operator("Twice", Some(root)).unwrap();

        let flow = engine.current_flow_mut().unwrap();
        assert_eq!(flow.pipeline().len(), 3);
        assert_eq!(flow.pipeline().upstream_path(tail).unwrap().len(), 3);
        flow.append_node(tail).unwrap();

        engine.evaluate_flow(0).unwrap();
        assert!(matches!(engine.evaluate_flow(1), Err(FlowError::Empty)));
        assert!(engine.create_operator("Unknown", Some(root)).is_none());
    }

    #[test]
    fn specs_apply_their_parameters() {
        let mut engine = engine();
        let spec = OperatorSpec::new("Start").with("OutputTags", "FITNESS");
        let node = engine.create_from_spec(&spec, None).unwrap();

        let pipeline = engine.current_flow().unwrap().pipeline();
        assert_eq!(pipeline.tags(node).unwrap().output.len(), 1);

        let rejected = OperatorSpec::new("Start").with("Rate", ParamValue::Real(0.5));
        assert!(engine.create_from_spec(&rejected, None).is_none());
    }
}

use std::collections::BTreeMap;
use std::fmt;

use crate::{Algorithm, NodeId, Operator, Pipeline, PipelineError};

/// Builds a fresh operator.
pub type OperatorFactory = Box<dyn Fn() -> Box<dyn Operator> + Send + Sync>;

/// Appends an algorithm's operators to a pipeline below an upstream node.
pub type AlgorithmBuilder =
    Box<dyn Fn(&mut Pipeline, Option<NodeId>) -> Result<Algorithm, PipelineError> + Send + Sync>;

/// Operators and algorithms available by name.
#[derive(Default)]
pub struct OperatorRegistry {
    operators: BTreeMap<String, OperatorFactory>,
    algorithms: BTreeMap<String, AlgorithmBuilder>,
}

impl OperatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an operator constructor, replacing any previous one.
    pub fn register_operator<F, O>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> O + Send + Sync + 'static,
        O: Operator + 'static,
    {
        self.operators
            .insert(name.into(), Box::new(move || -> Box<dyn Operator> { Box::new(factory()) }));
    }

    /// Registers an algorithm builder, replacing any previous one.
    pub fn register_algorithm<F>(&mut self, name: impl Into<String>, builder: F)
    where
        F: Fn(&mut Pipeline, Option<NodeId>) -> Result<Algorithm, PipelineError> + Send + Sync + 'static,
    {
        self.algorithms.insert(name.into(), Box::new(builder));
    }

    /// Builds the named operator, or `None` if it is not registered.
    #[must_use]
    pub fn create(&self, name: &str) -> Option<Box<dyn Operator>> {
        self.operators.get(name).map(|factory| factory())
    }

    /// Builds the named algorithm into `pipeline`, or `None` if it is not
    /// registered.
    pub fn build_algorithm(
        &self,
        name: &str,
        pipeline: &mut Pipeline,
        upstream: Option<NodeId>,
    ) -> Option<Result<Algorithm, PipelineError>> {
        self.algorithms
            .get(name)
            .map(|builder| builder(pipeline, upstream))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name) || self.algorithms.contains_key(name)
    }

    pub fn operator_names(&self) -> impl Iterator<Item = &str> {
        self.operators.keys().map(String::as_str)
    }

    pub fn algorithm_names(&self) -> impl Iterator<Item = &str> {
        self.algorithms.keys().map(String::as_str)
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.operators.keys().collect::<Vec<_>>())
            .field("algorithms", &self.algorithms.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Start;

    #[test]
    fn unknown_names_yield_none() {
        let mut registry = OperatorRegistry::new();
        registry.register_operator("Start", || Start);
        registry.register_algorithm("Idle", |pipeline, upstream| {
            let mut algorithm = Algorithm::new("Idle", "", upstream);
            algorithm.append_operator(pipeline, Start)?;
            Ok(algorithm)
        });

        assert_eq!(registry.create("Start").map(|op| op.name().to_owned()), Some("Start".into()));
        assert!(registry.create("Missing").is_none());
        assert!(registry.contains("Idle"));

        let mut pipeline = Pipeline::default();
        let algorithm = registry.build_algorithm("Idle", &mut pipeline, None).unwrap().unwrap();
        assert_eq!(algorithm.operators().len(), 1);
        assert!(registry.build_algorithm("Missing", &mut pipeline, None).is_none());
        assert_eq!(registry.operator_names().collect::<Vec<_>>(), vec!["Start"]);
    }
}

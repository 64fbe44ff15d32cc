use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

use super::InitialSet;
use crate::sampling;

/// Samples every decision variable uniformly inside its bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RandomInit {
    initial: InitialSet,
}

impl RandomInit {
    #[must_use]
    pub fn new(set_size: i64) -> Self {
        Self {
            initial: InitialSet {
                set_size,
                seeds: Vec::new(),
            },
        }
    }

    /// Decision vectors placed first in the initial set.
    #[must_use]
    pub fn with_seeds(mut self, seeds: Vec<Vec<f64>>) -> Self {
        self.initial.seeds = seeds;
        self
    }

    #[must_use]
    pub fn set_size(&self) -> i64 {
        self.initial.set_size
    }
}

impl Operator for RandomInit {
    fn name(&self) -> &str {
        "RandomInit"
    }

    fn description(&self) -> &str {
        "Creates an initial set sampled uniformly inside the box bounds."
    }

    fn default_tags(&self) -> TagConfig {
        super::default_tags()
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        self.initial.build(io, |io, fresh| {
            let problem = io.problem();
            for &id in fresh {
                let (population, rng) = io.population_and_rng();
                if let Some(mapping) = population.mapping_mut(id) {
                    sampling::randomize(mapping, &problem, rng);
                }
            }
            Ok(())
        })
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.initial.parameters()
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        self.initial.set_parameter(name, value)
    }
}

#[cfg(test)]
mod tests {
    use strand_core::{Element, Problem, Tag};
    use strand_pipeline::{OptimizationContext, Pipeline};

    use super::*;

    #[test]
    fn creates_the_main_set_once() {
        let mut pipeline = Pipeline::new(OptimizationContext::new(Problem::zdt1(4)));
        let node = pipeline
            .add_node(RandomInit::new(6).with_seeds(vec![vec![0.5; 4]]), None)
            .unwrap();

        pipeline.evaluate(node).unwrap();
        let population = pipeline.state().population();
        let main = population.set_with_tag(&Tag::MainOptimizationSet, 0).unwrap();
        let members = population.members(main);
        assert_eq!(members.len(), 6);
        assert_eq!(
            population.mapping(members[0]).unwrap().decision(),
            &[Element::Real(0.5); 4]
        );
        for &id in &members[1..] {
            let values = population.mapping(id).unwrap().decision_values();
            assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        }

        pipeline.evaluate(node).unwrap();
        assert_eq!(pipeline.state().population().set_count(), 1);
        assert_eq!(pipeline.state().population().mapping_count(), 6);
    }
}

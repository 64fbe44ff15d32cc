use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

use super::InitialSet;
use crate::sampling;

/// Starts a run from user-supplied decision vectors.
///
/// The set size defaults to the number of seeds. A larger size is topped up
/// with uniformly sampled mappings; a smaller one drops the trailing seeds.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDefinedInit {
    initial: InitialSet,
}

impl UserDefinedInit {
    #[must_use]
    pub fn new(seeds: Vec<Vec<f64>>) -> Self {
        Self {
            initial: InitialSet {
                set_size: i64::try_from(seeds.len()).unwrap_or(i64::MAX),
                seeds,
            },
        }
    }

    /// Replaces the seeds, keeping the configured set size.
    pub fn seed_decisions(&mut self, seeds: Vec<Vec<f64>>) {
        self.initial.seeds = seeds;
    }

    #[must_use]
    pub fn with_set_size(mut self, set_size: i64) -> Self {
        self.initial.set_size = set_size;
        self
    }

    #[must_use]
    pub fn seeds(&self) -> &[Vec<f64>] {
        &self.initial.seeds
    }
}

impl Operator for UserDefinedInit {
    fn name(&self) -> &str {
        "UserDefinedInit"
    }

    fn description(&self) -> &str {
        "Creates an initial set from user-supplied decision vectors."
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
    use strand_core::{Problem, Tag};
    use strand_pipeline::{OptimizationContext, Pipeline};

    use super::*;

    fn main_decisions(init: UserDefinedInit) -> Result<Vec<Vec<f64>>, OperatorError> {
        let mut pipeline = Pipeline::new(OptimizationContext::new(Problem::zdt1(2)));
        let node = pipeline.add_node(init, None).unwrap();
        pipeline.evaluate(node).map_err(|error| match error {
            strand_pipeline::PipelineError::Node { source, .. } => source,
            other => panic!("unexpected {other:?}"),
        })?;

        let population = pipeline.state().population();
        let main = population.set_with_tag(&Tag::MainOptimizationSet, 0).unwrap();
        Ok(population
            .members(main)
            .iter()
            .map(|&id| population.mapping(id).unwrap().decision_values())
            .collect())
    }

    #[test]
    fn seeds_come_first_and_are_topped_up() {
        let seeds = vec![vec![0.1, 0.2], vec![0.3, 0.4]];
        let decisions = main_decisions(UserDefinedInit::new(seeds.clone()).with_set_size(5)).unwrap();
        assert_eq!(decisions.len(), 5);
        assert_eq!(&decisions[..2], &seeds[..]);

        let decisions = main_decisions(UserDefinedInit::new(seeds.clone()).with_set_size(1)).unwrap();
        assert_eq!(decisions, vec![seeds[0].clone()]);
    }

    #[test]
    fn mis_sized_seeds_are_range_errors() {
        let error = main_decisions(UserDefinedInit::new(vec![vec![0.5; 3]])).unwrap_err();
        assert!(matches!(error, OperatorError::Range(_)));
    }
}

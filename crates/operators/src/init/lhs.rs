use rand::Rng;
use strand_core::ElementType;
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

use super::InitialSet;
use crate::sampling;

/// Latin hypercube sampling.
///
/// Each variable's range is cut into one stratum per sampled mapping, and
/// every stratum is used exactly once. Real variables are placed uniformly
/// inside their stratum; discrete variables cycle through their values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LhsInit {
    initial: InitialSet,
}

impl LhsInit {
    #[must_use]
    pub fn new(set_size: i64) -> Self {
        Self {
            initial: InitialSet {
                set_size,
                seeds: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn with_seeds(mut self, seeds: Vec<Vec<f64>>) -> Self {
        self.initial.seeds = seeds;
        self
    }
}

impl Operator for LhsInit {
    fn name(&self) -> &str {
        "LhsInit"
    }

    fn description(&self) -> &str {
        "Creates an initial set by Latin hypercube sampling."
    }

    fn default_tags(&self) -> TagConfig {
        super::default_tags()
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        self.initial.build(io, |io, fresh| {
            let problem = io.problem();
            let n = fresh.len();
            if n == 0 {
                return Ok(());
            }

            for (var_index, var) in problem.variables().iter().enumerate() {
                let (population, rng) = io.population_and_rng();
                let strata = sampling::permutation(rng, n);

                for (&id, &stratum) in fresh.iter().zip(&strata) {
                    let value = match var.kind {
                        ElementType::Real => {
                            let segment = var.width() / n as f64;
                            var.lower + segment * (stratum as f64 + rng.gen_range(0.0..1.0))
                        }
                        _ => {
                            let count = (var.upper as i64 - var.lower as i64 + 1).max(1);
                            var.lower + (stratum as i64 % count) as f64
                        }
                    };
                    if let Some(mapping) = population.mapping_mut(id) {
                        mapping.set_decision_value(var_index, value);
                    }
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
    use strand_core::problem::Variable;
    use strand_core::{Problem, Tag};
    use strand_pipeline::{OptimizationContext, Pipeline};

    use super::*;

    #[test]
    fn every_stratum_is_used_once() {
        let problem = Problem::zdt1(2).with_variable(Variable::integer("k", 0, 4));
        let mut pipeline = Pipeline::new(OptimizationContext::new(problem).with_seed(5));
        let node = pipeline.add_node(LhsInit::new(10), None).unwrap();
        pipeline.evaluate(node).unwrap();

        let population = pipeline.state().population();
        let main = population.set_with_tag(&Tag::MainOptimizationSet, 0).unwrap();
        let decisions: Vec<Vec<f64>> = population
            .members(main)
            .iter()
            .map(|&id| population.mapping(id).unwrap().decision_values())
            .collect();
        assert_eq!(decisions.len(), 10);

        let mut strata: Vec<usize> = decisions
            .iter()
            .map(|d| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let s = (d[0] * 10.0).floor() as usize;
                s
            })
            .collect();
        strata.sort_unstable();
        assert_eq!(strata, (0..10).collect::<Vec<_>>());

        let mut counts = [0; 5];
        for d in &decisions {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let k = d[2] as usize;
            counts[k] += 1;
        }
        assert_eq!(counts, [2; 5]);
    }
}

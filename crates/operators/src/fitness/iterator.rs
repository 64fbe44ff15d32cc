use rand::seq::SliceRandom;
use strand_core::ProblemError;
use strand_core::lattice::{simplex_lattice, simplex_lattice_size};
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter};
use tracing::debug;

/// Steps the pipeline direction through a shuffled simplex lattice.
///
/// The lattice is the smallest one with at least `reference_size` vectors.
/// Each evaluation installs the next vector as the direction; after the last
/// one the lattice is reshuffled. Turns on the non-dominated archive so that
/// downstream normalisation sees a nadir.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexLatticeDirectionIterator {
    reference_size: usize,
    lattice: Vec<Vec<f64>>,
    index: Option<usize>,
}

impl Default for SimplexLatticeDirectionIterator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SimplexLatticeDirectionIterator {
    #[must_use]
    pub fn new(reference_size: usize) -> Self {
        Self {
            reference_size,
            lattice: Vec::new(),
            index: None,
        }
    }

    /// The lattice currently iterated over, in visiting order.
    #[must_use]
    pub fn lattice(&self) -> &[Vec<f64>] {
        &self.lattice
    }

    fn build(&mut self, io: &mut NodeIo<'_>, objective_count: usize) {
        let mut divisions = 1;
        while objective_count > 1 && simplex_lattice_size(divisions, objective_count) < self.reference_size {
            divisions += 1;
        }
        self.lattice = simplex_lattice(divisions, objective_count);
        self.lattice.shuffle(io.rng());
        self.index = None;
        debug!(divisions, size = self.lattice.len(), "simplex lattice built");
    }
}

impl Operator for SimplexLatticeDirectionIterator {
    fn name(&self) -> &str {
        "SimplexLatticeDirectionIterator"
    }

    fn description(&self) -> &str {
        "Cycles the pipeline direction through a simplex lattice."
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        let objective_count = io.problem().objective_len();
        if objective_count == 0 {
            return Err(ProblemError::NoObjectives.into());
        }
        io.state_mut().define_keep_archive(true);

        if self.lattice.first().is_none_or(|w| w.len() != objective_count) {
            self.build(io, objective_count);
        }
        let next = match self.index {
            Some(i) if i + 1 < self.lattice.len() => i + 1,
            Some(_) => {
                self.lattice.shuffle(io.rng());
                0
            }
            None => 0,
        };
        self.index = Some(next);
        io.state_mut().define_direction(self.lattice[next].clone());
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new(
            "ReferenceSetSize",
            "Minimum number of lattice directions to cycle through.",
            self.reference_size,
        )]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "ReferenceSetSize" => {
                let size = value.as_usize(name)?;
                if size == 0 {
                    return Err(ParamError::invalid(name, "must be at least 1"));
                }
                self.reference_size = size;
                self.lattice.clear();
            }
            _ => return Err(ParamError::Unknown(name.to_owned())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use strand_core::Problem;
    use strand_core::problem::Variable;
    use strand_pipeline::{ErrorState, OptimizationContext, Pipeline, PipelineError};

    use super::*;
    use crate::filtration::fixture::pipeline;

    #[test]
    fn each_call_consumes_one_direction() {
        let mut pipeline = pipeline(4);
        let node = pipeline
            .add_node(SimplexLatticeDirectionIterator::new(5), None)
            .unwrap();

        let mut seen: Vec<Vec<f64>> = Vec::new();
        for _ in 0..5 {
            pipeline.evaluate(node).unwrap();
            let direction = pipeline.state().direction().to_vec();
            assert_relative_eq!(direction.iter().sum::<f64>(), 1.0);
            assert!(!seen.contains(&direction));
            seen.push(direction);
        }
        assert!(pipeline.state().keep_archive());

        pipeline.evaluate(node).unwrap();
        assert!(seen.contains(&pipeline.state().direction().to_vec()));
    }

    #[test]
    fn problems_without_objectives_fail_the_node() {
        let problem = Problem::new().with_variables([Variable::real("x", 0.0, 1.0)]);
        let mut pipeline = Pipeline::new(OptimizationContext::new(problem));
        let node = pipeline
            .add_node(SimplexLatticeDirectionIterator::default(), None)
            .unwrap();

        assert!(matches!(
            pipeline.evaluate(node),
            Err(PipelineError::Node {
                source: OperatorError::Problem(ProblemError::NoObjectives),
                ..
            })
        ));
        assert_eq!(pipeline.error_state(node).unwrap(), ErrorState::UndefinedError);
        assert!(pipeline.state().direction().is_empty());
        assert!(!pipeline.state().keep_archive());
    }

    #[test]
    fn lattice_size_covers_the_request() {
        let mut pipeline = pipeline(1);
        let node = pipeline
            .add_node(SimplexLatticeDirectionIterator::new(4), None)
            .unwrap();
        pipeline.evaluate(node).unwrap();
        let direction = pipeline.state().direction();
        assert_eq!(direction.len(), 2);

        let mut iterator = SimplexLatticeDirectionIterator::default();
        assert!(iterator.set_parameter("ReferenceSetSize", &ParamValue::from(0_usize)).is_err());
        iterator.set_parameter("ReferenceSetSize", &ParamValue::from(6_usize)).unwrap();
        assert_eq!(iterator.parameters()[0].value, ParamValue::from(6_usize));
    }
}

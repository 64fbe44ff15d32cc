//! Initialisation operators.
//!
//! An initialisation node creates the first main set of a run and then
//! stays idle: once its output set exists, later evaluations change nothing.
//!
//! - [`RandomInit`] — uniform sampling inside the box bounds.
//! - [`LhsInit`] — Latin hypercube sampling.
//! - [`UserDefinedInit`] — user-supplied decision vectors.
//! - [`WeightVectorInit`] — resizes a set to a simplex lattice and gives
//!   every mapping a weight vector.

mod lhs;
mod random;
mod user_defined;
mod weight_vector;

pub use lhs::LhsInit;
pub use random::RandomInit;
pub use user_defined::UserDefinedInit;
pub use weight_vector::WeightVectorInit;

use strand_core::{MappingId, Tag};
use strand_pipeline::{NodeIo, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

/// Size of the initial set when none is configured.
pub const DEFAULT_SET_SIZE: i64 = 100;

fn default_tags() -> TagConfig {
    TagConfig::new().with_output([Tag::MainOptimizationSet, Tag::ForEvaluation])
}

/// Size and seeds shared by the sampling initialisations.
#[derive(Debug, Clone, PartialEq)]
struct InitialSet {
    set_size: i64,
    seeds: Vec<Vec<f64>>,
}

impl Default for InitialSet {
    fn default() -> Self {
        Self {
            set_size: DEFAULT_SET_SIZE,
            seeds: Vec::new(),
        }
    }
}

impl InitialSet {
    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new(
            "SetSize",
            "Number of mappings in the initial set.",
            self.set_size,
        )]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "SetSize" => self.set_size = value.as_i64(name)?,
            _ => return Err(ParamError::Unknown(name.to_owned())),
        }
        Ok(())
    }

    /// Appends the initial output set unless one already exists.
    ///
    /// The first `min(set_size, seeds)` mappings take the seed decision
    /// vectors; `sample` fills the decision vectors of the rest.
    fn build<F>(&self, io: &mut NodeIo<'_>, sample: F) -> Result<(), OperatorError>
    where
        F: FnOnce(&mut NodeIo<'_>, &[MappingId]) -> Result<(), OperatorError>,
    {
        if !io.output_sets().is_empty() {
            return Ok(());
        }
        let size = usize::try_from(self.set_size)
            .map_err(|_| OperatorError::domain(format!("set size {} is negative", self.set_size)))?;

        // Nothing is created unless every seed fits.
        let variables = io.problem().decision_len();
        if let Some(seed) = self.seeds.iter().take(size).find(|s| s.len() != variables) {
            return Err(OperatorError::range(format!(
                "seed has {} variables, the problem has {variables}",
                seed.len()
            )));
        }

        io.append_output_set();
        for decision in self.seeds.iter().take(size) {
            let id = io.create_mapping()?;
            let mapping = io.mapping_mut(id)?;
            for (i, &value) in decision.iter().enumerate() {
                mapping.set_decision_value(i, value);
            }
        }

        let seeded = self.seeds.len().min(size);
        let fresh = (seeded..size)
            .map(|_| io.create_mapping())
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(size, seeded, "initial set created");
        sample(io, &fresh)
    }
}

#[cfg(test)]
mod tests {
    use strand_core::Problem;
    use strand_pipeline::{Operator, OptimizationContext, Pipeline};

    use super::*;

    #[test]
    fn negative_sizes_are_domain_errors() {
        let mut pipeline = Pipeline::new(OptimizationContext::new(Problem::zdt1(3)));
        let mut init = RandomInit::new(5);
        init.set_parameter("SetSize", &ParamValue::Integer(-1)).unwrap();
        let node = pipeline.add_node(init, None).unwrap();

        let error = pipeline.evaluate(node).unwrap_err();
        assert!(matches!(
            error,
            strand_pipeline::PipelineError::Node {
                source: OperatorError::Domain(_),
                ..
            }
        ));
    }

    #[test]
    fn mismatched_seeds_leave_no_partial_set() {
        let mut pipeline = Pipeline::new(OptimizationContext::new(Problem::zdt1(4)).with_seed(2));
        let init = RandomInit::new(6).with_seeds(vec![vec![0.25; 4], vec![0.5; 2]]);
        let node = pipeline.add_node(init, None).unwrap();

        let error = pipeline.evaluate(node).unwrap_err();
        assert!(matches!(
            error,
            strand_pipeline::PipelineError::Node {
                source: OperatorError::Range(_),
                ..
            }
        ));
        let population = pipeline.state().population();
        assert!(population.set_with_tag(&Tag::MainOptimizationSet, 0).is_none());
        assert_eq!(population.mapping_count(), 0);

        // A node brought back into service still builds the whole set.
        pipeline
            .define_error_state(node, strand_pipeline::ErrorState::NoError)
            .unwrap();
        pipeline
            .set_parameter(node, "SetSize", &ParamValue::Integer(1))
            .unwrap();
        pipeline.evaluate(node).unwrap();
        let population = pipeline.state().population();
        let main = population.set_with_tag(&Tag::MainOptimizationSet, 0).unwrap();
        let members = population.members(main);
        assert_eq!(members.len(), 1);
        assert_eq!(population.mapping(members[0]).unwrap().decision_values(), vec![0.25; 4]);
    }
}

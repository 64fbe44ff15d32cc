//! The NSGA-II algorithm.

use strand_core::Tag;
use strand_pipeline::{Algorithm, NodeId, Pipeline, PipelineError};

use crate::filtration::{
    MergeForNextIteration, NsgaIIEliteSelection, SelectionMethod, TournamentFiltrationForDirection,
};
use crate::fitness::{NonDominanceRanking, NsgaIICrowding};
use crate::variation::{CategoricalPerturbation, PolynomialMutation, SbxCrossover};

/// Builds one NSGA-II generation.
///
/// The chain ranks the main set, adds crowding, keeps the better half as
/// the elite and breeds the same number of children from it by shuffled
/// binary tournaments, SBX crossover and mutation. Elite and children are
/// merged back into the main set, which therefore keeps its size. An
/// evaluator upstream of the chain evaluates the children on the next pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NsgaII;

impl NsgaII {
    pub const NAME: &'static str = "NSGAII";

    /// Appends the generation below `upstream`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownNode`] if `upstream` does not belong
    /// to `pipeline`.
    pub fn build(pipeline: &mut Pipeline, upstream: Option<NodeId>) -> Result<Algorithm, PipelineError> {
        let mut algorithm = Algorithm::new(
            Self::NAME,
            "Non-dominated sorting genetic algorithm with crowding.",
            upstream,
        );

        algorithm.append_operator(pipeline, NonDominanceRanking::default())?;
        algorithm.append_operator(pipeline, NsgaIICrowding)?;
        let elite = algorithm.append_operator(pipeline, NsgaIIEliteSelection::default())?;
        let children = algorithm.append_operator(
            pipeline,
            TournamentFiltrationForDirection::new(SelectionMethod::Shuffled).with_mappings_per_set(2),
        )?;
        algorithm.append_operator(pipeline, SbxCrossover::default())?;
        algorithm.append_operator(pipeline, PolynomialMutation::default())?;
        algorithm.append_operator(pipeline, CategoricalPerturbation::default())?;
        algorithm.append_operator(pipeline, MergeForNextIteration)?;

        // Children are drawn from the elite only.
        let tags = pipeline.tags_mut(elite)?;
        tags.add_output(Tag::ForSelection);
        tags.add_output(Tag::ForModification);

        let tags = pipeline.tags_mut(children)?;
        tags.add_input(Tag::ForModification);
        tags.add_output(Tag::ForNextIteration);
        tags.add_output(Tag::ForPerturbation);

        Ok(algorithm)
    }
}

#[cfg(test)]
mod tests {
    use strand_core::Problem;
    use strand_pipeline::{OptimizationContext, Start};

    use super::*;
    use crate::{Evaluator, RandomInit};

    #[test]
    fn generations_keep_the_main_set_size() {
        let mut pipeline = Pipeline::new(OptimizationContext::new(Problem::zdt1(5)).with_seed(11));
        let start = pipeline.add_node(Start, None).unwrap();
        let init = pipeline.add_node(RandomInit::new(20), Some(start)).unwrap();
        let evaluator = pipeline.add_node(Evaluator::default(), Some(init)).unwrap();
        let algorithm = NsgaII::build(&mut pipeline, Some(evaluator)).unwrap();
        assert_eq!(algorithm.operators().len(), 8);

        for _ in 0..4 {
            algorithm.evaluate(&mut pipeline).unwrap();
            pipeline.state_mut().increment_iteration();
        }

        let population = pipeline.state().population();
        let main = population.set_with_tag(&Tag::MainOptimizationSet, 0).unwrap();
        assert_eq!(population.members(main).len(), 20);

        let elite = pipeline.cursors(algorithm.operators()[2]).unwrap().outputs()[0];
        assert_eq!(population.members(elite).len(), 10);

        pipeline.evaluate(evaluator).unwrap();
        let population = pipeline.state().population();
        assert!(
            population
                .members(main)
                .iter()
                .all(|&id| population.mapping(id).unwrap().is_evaluated())
        );
    }
}

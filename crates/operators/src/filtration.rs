//! Filtration operators.
//!
//! Filtrations decide which mappings move on: they build new tagged sets
//! from their input sets, either by referencing the same mappings or by
//! cloning them for later modification.
//!
//! - [`TournamentFiltrationForDirection`] — binary tournaments, cloned into
//!   recombination sets.
//! - [`RandFiltrationForPerturbation`] — random clones for mutation.
//! - [`RouletteWheelSelection`] and [`StochasticUniversalSampling`] —
//!   fitness-proportionate mating pools.
//! - [`NsgaIIEliteSelection`], [`FitnessEliteSelection`] and
//!   [`TruncateSets`] — cost-ordered elites.
//! - [`RandSetReplacement`] — random swaps of whole sets.
//! - [`MergeForNextIteration`] — rebuilds the main set.

mod elite;
mod merge;
mod perturbation;
mod proportionate;
mod replacement;
mod tournament;

pub use elite::{FitnessEliteSelection, NsgaIIEliteSelection, TruncateSets};
pub use merge::MergeForNextIteration;
pub use perturbation::RandFiltrationForPerturbation;
pub use proportionate::{RouletteWheelSelection, StochasticUniversalSampling};
pub use replacement::RandSetReplacement;
pub use tournament::{SelectionMethod, TournamentFiltrationForDirection};

use strand_core::MappingId;
use strand_pipeline::{NodeIo, OperatorError};

/// Cost of a mapping for ordering purposes; mappings without a cost sort
/// last.
pub(crate) fn cost_of(io: &NodeIo<'_>, id: MappingId) -> Result<f64, OperatorError> {
    Ok(io.mapping(id)?.cost().unwrap_or(f64::INFINITY))
}

/// Indices of `costs` in ascending order; ties keep their original order.
pub(crate) fn ascending(costs: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..costs.len()).collect();
    order.sort_by(|&a, &b| costs[a].total_cmp(&costs[b]));
    order
}

#[cfg(test)]
pub(crate) mod fixture {
    //! Pipelines holding hand-made sets for filtration tests.

    use strand_core::{Mapping, Problem, SetId, Tag};
    use strand_pipeline::{NodeId, Operator, OptimizationContext, Pipeline};

    /// Adds a set whose mappings carry the given costs.
    pub fn costed_set(pipeline: &mut Pipeline, tags: &[Tag], costs: &[f64]) -> SetId {
        let problem = pipeline.context().problem().clone();
        let population = pipeline.state_mut().population_mut();
        let set = population.create_set(tags.iter().cloned());
        for (i, &cost) in costs.iter().enumerate() {
            let mut mapping = Mapping::new(&problem);
            #[allow(clippy::cast_precision_loss)]
            let x = i as f64 / 100.0;
            mapping.set_decision_value(0, x);
            mapping.define_cost(cost);
            let id = population.insert_mapping(mapping);
            population.append_to_set(set, id);
        }
        set
    }

    pub fn pipeline(seed: u64) -> Pipeline {
        Pipeline::new(OptimizationContext::new(Problem::zdt1(3)).with_seed(seed))
    }

    /// Adds `operator` as a root node and evaluates it.
    pub fn run(pipeline: &mut Pipeline, operator: impl Operator + 'static) -> NodeId {
        let node = pipeline.add_node(operator, None).unwrap();
        pipeline.evaluate(node).unwrap();
        node
    }

    /// Costs of the members of each output set of `node`.
    pub fn output_costs(pipeline: &Pipeline, node: NodeId) -> Vec<Vec<f64>> {
        let population = pipeline.state().population();
        pipeline
            .cursors(node)
            .unwrap()
            .outputs()
            .iter()
            .map(|&set| {
                population
                    .members(set)
                    .iter()
                    .map(|&id| population.mapping(id).unwrap().cost().unwrap())
                    .collect()
            })
            .collect()
    }
}

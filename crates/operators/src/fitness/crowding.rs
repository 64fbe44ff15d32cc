use strand_core::{EPSILON, Tag};
use strand_pipeline::{NodeIo, Operator, OperatorError, TagConfig};

use crate::filtration::ascending;

/// NSGA-II crowding of one front, scaled so that lower means less crowded.
///
/// For every objective the front is sorted; the two extremes get zero and
/// each interior point adds one minus the normalised gap between its
/// neighbours. The sum is averaged over the objectives, so every value lies
/// in `[0, 1)`. Objectives whose range is below [`EPSILON`] add nothing.
#[must_use]
pub fn crowding_distance(objectives: &[Vec<f64>], objective_count: usize) -> Vec<f64> {
    let n = objectives.len();
    let mut crowding = vec![0.0; n];
    if n == 0 || objective_count == 0 {
        return crowding;
    }

    for k in 0..objective_count {
        let column: Vec<f64> = objectives
            .iter()
            .map(|f| f.get(k).copied().unwrap_or(0.0))
            .collect();
        let order = ascending(&column);
        let (first, last) = (order[0], order[n - 1]);
        let range = column[last] - column[first];

        crowding[first] = 0.0;
        crowding[last] = 0.0;
        for i in 1..n.saturating_sub(1) {
            let gap = column[order[i + 1]] - column[order[i - 1]];
            crowding[order[i]] += if range < EPSILON { 0.0 } else { 1.0 - gap / range };
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let scale = 1.0 / objective_count as f64;
    crowding.iter_mut().for_each(|c| *c *= scale);
    crowding
}

/// Adds the crowding term of [`crowding_distance`] to the cost of every
/// member of each output set.
///
/// Run after [`NonDominanceRanking`](super::NonDominanceRanking), the cost
/// becomes `rank + crowding`, so fronts stay ordered and spread-out members
/// of a front sort first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NsgaIICrowding;

impl Operator for NsgaIICrowding {
    fn name(&self) -> &str {
        "NsgaIICrowding"
    }

    fn description(&self) -> &str {
        "Adds the NSGA-II crowding term to the cost of each front."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new().with_output([Tag::Fitness])
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        let objective_count = io.problem().objective_len();
        while let Some(set) = io.next_output_set() {
            let members = io.members(set);
            let objectives = members
                .iter()
                .map(|&id| io.mapping(id).map(|m| m.objectives().to_vec()))
                .collect::<Result<Vec<_>, _>>()?;

            for (id, crowding) in members.into_iter().zip(crowding_distance(&objectives, objective_count)) {
                let mapping = io.mapping_mut(id)?;
                let cost = mapping.cost().unwrap_or(0.0);
                mapping.define_cost(cost + crowding);
            }
        }
        Ok(())
    }
}

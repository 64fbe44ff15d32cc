use strand_core::{MappingId, Tag};
use strand_pipeline::{NodeIo, Operator, OperatorError, TagConfig};

/// Closes a generation: the main set becomes the union of the input sets.
///
/// Members keep the order of the input sets; a mapping present in several
/// inputs appears once. Mappings no longer referenced by any set are swept
/// from the population afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeForNextIteration;

impl Operator for MergeForNextIteration {
    fn name(&self) -> &str {
        "MergeForNextIteration"
    }

    fn description(&self) -> &str {
        "Replaces the main set with the mappings selected for the next iteration."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new()
            .with_input([Tag::ForNextIteration])
            .with_output([Tag::MainOptimizationSet])
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        let mut merged: Vec<MappingId> = Vec::new();
        for id in io.input_union() {
            if !merged.contains(&id) {
                merged.push(id);
            }
        }

        let main = match io.output_set(0) {
            Some(set) => set,
            None => io.append_output_set(),
        };
        if let Some(set) = io.population_mut().set_mut(main) {
            set.set_members(merged);
        }

        let removed = io.state_mut().sweep();
        tracing::trace!(removed, "swept unreferenced mappings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtration::fixture::{costed_set, output_costs, pipeline, run};

    #[test]
    fn main_set_becomes_the_union() {
        let mut pipeline = pipeline(1);
        let main = costed_set(&mut pipeline, &[Tag::MainOptimizationSet], &[9.0, 8.0]);
        let parents = costed_set(&mut pipeline, &[Tag::ForNextIteration], &[1.0, 2.0]);
        costed_set(&mut pipeline, &[Tag::ForNextIteration], &[3.0]);

        // The first parent is also referenced by a second selection set.
        let shared = pipeline.state().population().members(parents)[0];
        let again = pipeline
            .state_mut()
            .population_mut()
            .create_set([Tag::ForNextIteration]);
        pipeline.state_mut().population_mut().append_to_set(again, shared);

        let node = run(&mut pipeline, MergeForNextIteration);
        assert_eq!(pipeline.cursors(node).unwrap().outputs(), &[main]);
        assert_eq!(output_costs(&pipeline, node), vec![vec![1.0, 2.0, 3.0]]);
        assert_eq!(pipeline.state().population().mapping_count(), 3);
    }

    #[test]
    fn creates_the_main_set_when_missing() {
        let mut pipeline = pipeline(1);
        costed_set(&mut pipeline, &[Tag::ForNextIteration], &[1.0, 2.0]);
        let node = run(&mut pipeline, MergeForNextIteration);
        assert_eq!(output_costs(&pipeline, node), vec![vec![1.0, 2.0]]);
    }
}

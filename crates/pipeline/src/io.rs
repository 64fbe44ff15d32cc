//! The tagged-set I/O protocol operators use to read and write populations.

use std::sync::Arc;

use rand::rngs::StdRng;
use strand_core::{
    FunctionRegistry, LogSink, Mapping, MappingId, Population, Problem, SetId, Tag,
};

use crate::{OperatorError, OptimizationContext, PipelineState};

/// The tags a node reads and writes.
///
/// Before a node runs, its input sets are the sets carrying every input tag
/// and its output sets are the sets carrying every output tag. Each output
/// set then receives the additional output tags. An empty tag list leaves
/// the corresponding sets as the operator last left them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagConfig {
    pub input: Vec<Tag>,
    pub output: Vec<Tag>,
    pub additional_output: Vec<Tag>,
}

impl TagConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_input(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.input = tags.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_output(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.output = tags.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_additional_output(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.additional_output = tags.into_iter().collect();
        self
    }

    pub fn add_input(&mut self, tag: Tag) {
        if !self.input.contains(&tag) {
            self.input.push(tag);
        }
    }

    pub fn add_output(&mut self, tag: Tag) {
        if !self.output.contains(&tag) {
            self.output.push(tag);
        }
    }

    pub fn add_additional_output(&mut self, tag: Tag) {
        if !self.additional_output.contains(&tag) {
            self.additional_output.push(tag);
        }
    }

    /// Tags given to sets a node appends.
    fn appended(&self) -> Vec<Tag> {
        self.output
            .iter()
            .chain(&self.additional_output)
            .cloned()
            .collect()
    }
}

/// A node's resolved set lists and its position in each.
///
/// A cursor starts before the first set; `next_*` advances it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursors {
    inputs: Vec<SetId>,
    outputs: Vec<SetId>,
    input: Option<usize>,
    output: Option<usize>,
}

impl Cursors {
    #[must_use]
    pub fn inputs(&self) -> &[SetId] {
        &self.inputs
    }

    #[must_use]
    pub fn outputs(&self) -> &[SetId] {
        &self.outputs
    }

    pub fn reset(&mut self) {
        self.input = None;
        self.output = None;
    }

    /// Re-resolves the set lists against `population` and rewinds.
    pub(crate) fn refresh(&mut self, population: &mut Population, tags: &TagConfig) {
        if tags.output.is_empty() {
            self.outputs.retain(|&id| population.set(id).is_some());
        } else {
            self.outputs = population.sets_with_tags(&tags.output);
            for &id in &self.outputs {
                for tag in &tags.additional_output {
                    population.tag_set(id, tag.clone());
                }
            }
        }

        if tags.input.is_empty() {
            self.inputs.retain(|&id| population.set(id).is_some());
        } else {
            self.inputs = population.sets_with_tags(&tags.input);
        }

        self.reset();
    }
}

fn has_next(cursor: Option<usize>, len: usize) -> bool {
    cursor.map_or(0, |i| i + 1) < len
}

fn advance(cursor: &mut Option<usize>, sets: &[SetId]) -> Option<SetId> {
    let next = cursor.map_or(0, |i| i + 1);
    let id = sets.get(next).copied()?;
    *cursor = Some(next);
    Some(id)
}

/// A node's view of the pipeline while it runs.
///
/// Lends an operator the shared state, the context, its own tags and its
/// cursors.
pub struct NodeIo<'a> {
    state: &'a mut PipelineState,
    context: &'a mut OptimizationContext,
    tags: &'a TagConfig,
    cursors: &'a mut Cursors,
}

impl<'a> NodeIo<'a> {
    pub(crate) fn new(
        state: &'a mut PipelineState,
        context: &'a mut OptimizationContext,
        tags: &'a TagConfig,
        cursors: &'a mut Cursors,
    ) -> Self {
        Self {
            state,
            context,
            tags,
            cursors,
        }
    }

    // ====================================================================
    // Input sets
    // ====================================================================

    #[must_use]
    pub fn has_next_input_set(&self) -> bool {
        has_next(self.cursors.input, self.cursors.inputs.len())
    }

    pub fn next_input_set(&mut self) -> Option<SetId> {
        advance(&mut self.cursors.input, &self.cursors.inputs)
    }

    #[must_use]
    pub fn current_input_set(&self) -> Option<SetId> {
        self.cursors.input.and_then(|i| self.cursors.inputs.get(i).copied())
    }

    /// Moves the input cursor to set `index`.
    pub fn input_set(&mut self, index: usize) -> Option<SetId> {
        let id = self.cursors.inputs.get(index).copied()?;
        self.cursors.input = Some(index);
        Some(id)
    }

    #[must_use]
    pub fn input_sets(&self) -> &[SetId] {
        &self.cursors.inputs
    }

    // ====================================================================
    // Output sets
    // ====================================================================

    #[must_use]
    pub fn has_next_output_set(&self) -> bool {
        has_next(self.cursors.output, self.cursors.outputs.len())
    }

    pub fn next_output_set(&mut self) -> Option<SetId> {
        advance(&mut self.cursors.output, &self.cursors.outputs)
    }

    #[must_use]
    pub fn current_output_set(&self) -> Option<SetId> {
        self.cursors
            .output
            .and_then(|i| self.cursors.outputs.get(i).copied())
    }

    /// Moves the output cursor to set `index`.
    pub fn output_set(&mut self, index: usize) -> Option<SetId> {
        let id = self.cursors.outputs.get(index).copied()?;
        self.cursors.output = Some(index);
        Some(id)
    }

    #[must_use]
    pub fn output_sets(&self) -> &[SetId] {
        &self.cursors.outputs
    }

    /// Creates an empty output set carrying the node's output tags and makes
    /// it current.
    pub fn append_output_set(&mut self) -> SetId {
        let id = self.state.population_mut().create_set(self.tags.appended());
        self.push_output(id)
    }

    /// Creates an output set referencing the members of `source` and makes
    /// it current.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorError::Domain`] if `source` is stale.
    pub fn append_existing_output_set(&mut self, source: SetId) -> Result<SetId, OperatorError> {
        let id = self
            .state
            .population_mut()
            .clone_set(source, self.tags.appended())
            .ok_or_else(|| OperatorError::domain(format!("stale set handle {source:?}")))?;
        Ok(self.push_output(id))
    }

    fn push_output(&mut self, id: SetId) -> SetId {
        self.cursors.outputs.push(id);
        self.cursors.output = Some(self.cursors.outputs.len() - 1);
        id
    }

    /// Removes output set `index` from the node and the population.
    pub fn remove_output_set(&mut self, index: usize) -> Option<SetId> {
        if index >= self.cursors.outputs.len() {
            return None;
        }
        let id = self.cursors.outputs.remove(index);
        self.state.population_mut().remove_set(id);
        self.cursors.output = None;
        Some(id)
    }

    /// Removes every output set from the node and the population.
    pub fn clear_output_sets(&mut self) {
        for id in std::mem::take(&mut self.cursors.outputs) {
            self.state.population_mut().remove_set(id);
        }
        self.cursors.output = None;
    }

    pub fn reset_cursors(&mut self) {
        self.cursors.reset();
    }

    // ====================================================================
    // Mappings
    // ====================================================================

    /// Creates an unevaluated mapping in the current output set.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorError::Domain`] if there is no current output set
    /// and [`OperatorError::Range`] if the population is full.
    pub fn create_mapping(&mut self) -> Result<MappingId, OperatorError> {
        let set = self.require_output()?;
        let mapping = Mapping::new(self.context.problem());
        self.store(set, mapping)
    }

    /// Copies `source` into a new mapping in the current output set.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorError::Domain`] if there is no current output set or
    /// `source` is stale, and [`OperatorError::Range`] if the population is
    /// full.
    pub fn clone_mapping(&mut self, source: MappingId) -> Result<MappingId, OperatorError> {
        let set = self.require_output()?;
        let copy = self.mapping(source)?.clone();
        self.store(set, copy)
    }

    fn store(&mut self, set: SetId, mapping: Mapping) -> Result<MappingId, OperatorError> {
        let population = self.state.population_mut();
        let id = population
            .try_insert_mapping(mapping)
            .map_err(|error| OperatorError::range(error.to_string()))?;
        population.append_to_set(set, id);
        Ok(id)
    }

    fn require_output(&self) -> Result<SetId, OperatorError> {
        self.current_output_set()
            .ok_or_else(|| OperatorError::domain("no current output set"))
    }

    /// Reads a mapping.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorError::Domain`] for a stale handle.
    pub fn mapping(&self, id: MappingId) -> Result<&Mapping, OperatorError> {
        self.state
            .population()
            .mapping(id)
            .ok_or_else(|| OperatorError::domain(format!("stale mapping handle {id:?}")))
    }

    /// Mutates a mapping.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorError::Domain`] for a stale handle.
    pub fn mapping_mut(&mut self, id: MappingId) -> Result<&mut Mapping, OperatorError> {
        self.state
            .population_mut()
            .mapping_mut(id)
            .ok_or_else(|| OperatorError::domain(format!("stale mapping handle {id:?}")))
    }

    /// Returns the members of a set, or an empty list for a stale handle.
    #[must_use]
    pub fn members(&self, set: SetId) -> Vec<MappingId> {
        self.state.population().members(set)
    }

    /// Returns the members of every input set, in order.
    #[must_use]
    pub fn input_union(&self) -> Vec<MappingId> {
        self.cursors
            .inputs
            .iter()
            .flat_map(|&set| self.members(set))
            .collect()
    }

    // ====================================================================
    // Shared state and context
    // ====================================================================

    /// Returns a shared handle to the problem.
    #[must_use]
    pub fn problem(&self) -> Arc<Problem> {
        Arc::clone(self.context.problem())
    }

    pub fn rng(&mut self) -> &mut StdRng {
        self.context.rng()
    }

    pub fn log(&mut self) -> &mut dyn LogSink {
        self.context.log()
    }

    #[must_use]
    pub fn functions(&self) -> &FunctionRegistry {
        self.context.functions()
    }

    #[must_use]
    pub fn state(&self) -> &PipelineState {
        self.state
    }

    pub fn state_mut(&mut self) -> &mut PipelineState {
        self.state
    }

    pub fn context_mut(&mut self) -> &mut OptimizationContext {
        self.context
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        self.state.population()
    }

    pub fn population_mut(&mut self) -> &mut Population {
        self.state.population_mut()
    }

    /// Borrows the population and the random stream together.
    pub fn population_and_rng(&mut self) -> (&mut Population, &mut StdRng) {
        (self.state.population_mut(), self.context.rng())
    }

    #[must_use]
    pub fn tags(&self) -> &TagConfig {
        self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (PipelineState, OptimizationContext, TagConfig, Cursors) {
        let mut state = PipelineState::new();
        let population = state.population_mut();
        population.create_set([Tag::ForSelection]);
        population.create_set([Tag::ForSelection, Tag::Fitness]);
        population.create_set([Tag::ForDirection]);

        let tags = TagConfig::new()
            .with_input([Tag::ForSelection])
            .with_output([Tag::ForDirection])
            .with_additional_output([Tag::ForPerturbation]);
        (
            state,
            OptimizationContext::new(Problem::zdt1(3)),
            tags,
            Cursors::default(),
        )
    }

    #[test]
    fn refresh_resolves_tagged_sets() {
        let (mut state, _, tags, mut cursors) = fixture();
        cursors.refresh(state.population_mut(), &tags);

        assert_eq!(cursors.inputs().len(), 2);
        assert_eq!(cursors.outputs().len(), 1);
        let output = cursors.outputs()[0];
        assert!(
            state
                .population()
                .set(output)
                .unwrap()
                .has_tags(&[Tag::ForDirection, Tag::ForPerturbation])
        );
    }

    #[test]
    fn cursors_walk_every_set_once() {
        let (mut state, mut context, tags, mut cursors) = fixture();
        cursors.refresh(state.population_mut(), &tags);
        let mut io = NodeIo::new(&mut state, &mut context, &tags, &mut cursors);

        let mut seen = Vec::new();
        while io.has_next_input_set() {
            seen.push(io.next_input_set().unwrap());
        }
        assert_eq!(seen, io.input_sets().to_vec());
        assert!(io.next_input_set().is_none());

        io.input_set(0);
        assert_eq!(io.current_input_set(), Some(seen[0]));
    }

    #[test]
    fn appended_sets_become_current() {
        let (mut state, mut context, tags, mut cursors) = fixture();
        cursors.refresh(state.population_mut(), &tags);
        let mut io = NodeIo::new(&mut state, &mut context, &tags, &mut cursors);

        let set = io.append_output_set();
        assert_eq!(io.current_output_set(), Some(set));
        let a = io.create_mapping().unwrap();
        let b = io.clone_mapping(a).unwrap();
        assert_ne!(a, b);
        assert_eq!(io.members(set), vec![a, b]);

        let copy = io.append_existing_output_set(set).unwrap();
        assert_eq!(io.members(copy), vec![a, b]);
        assert_eq!(io.output_sets().len(), 3);

        io.clear_output_sets();
        assert!(io.output_sets().is_empty());
        assert!(io.population().set(set).is_none());
        assert!(io.create_mapping().is_err());
    }

    #[test]
    fn full_populations_are_range_errors() {
        let (mut state, mut context, tags, mut cursors) = fixture();
        *state.population_mut() = Population::with_mapping_limit(2);
        cursors.refresh(state.population_mut(), &tags);
        let mut io = NodeIo::new(&mut state, &mut context, &tags, &mut cursors);

        let set = io.append_output_set();
        let a = io.create_mapping().unwrap();
        io.clone_mapping(a).unwrap();
        assert!(matches!(io.create_mapping(), Err(OperatorError::Range(_))));
        assert!(matches!(io.clone_mapping(a), Err(OperatorError::Range(_))));
        assert_eq!(io.members(set).len(), 2);
    }
}

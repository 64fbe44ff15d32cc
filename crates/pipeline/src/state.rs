use std::collections::BTreeMap;

use strand_core::dominance::dominance;
use strand_core::{Dominance, DominanceMode, EPSILON, MappingId, Population, Tag};

/// Result of offering a mapping to the non-dominated archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveUpdate {
    /// The mapping is dominated by, or equal to, an archived mapping.
    Unchanged,

    /// The mapping joined the archive without displacing anyone.
    Added,

    /// The mapping joined the archive and displaced dominated members.
    Replaced,
}

/// Redundant-objective analysis published by an objective-reduction operator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReductionData {
    /// Indices of the objectives judged essential, in ascending order.
    pub essential: Vec<usize>,

    /// The objective correlation matrix the analysis was based on.
    pub correlation: Vec<Vec<f64>>,
}

/// State shared by every node of a pipeline.
///
/// Holds the population, the iteration and budget counters, the reference
/// vectors (ideal, nadir, anti-ideal) and the values operators publish for
/// each other. Budgets and iterations count from zero; a cap of zero means
/// "no cap".
#[derive(Debug, Default)]
pub struct PipelineState {
    population: Population,
    current_iteration: usize,
    max_iteration: usize,
    budget: usize,
    used_budget: usize,
    terminate_signalled: bool,
    ideal: Vec<f64>,
    nadir: Vec<f64>,
    anti_ideal: Vec<f64>,
    direction: Vec<f64>,
    keep_archive: bool,
    indicators: BTreeMap<String, f64>,
    reduction: Option<ReductionData>,
}

impl PipelineState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    // ====================================================================
    // Iterations and budget
    // ====================================================================

    #[must_use]
    pub fn current_iteration(&self) -> usize {
        self.current_iteration
    }

    /// Advances the iteration counter and clears any termination signal.
    pub fn increment_iteration(&mut self) {
        self.current_iteration += 1;
        self.terminate_signalled = false;
    }

    pub fn set_current_iteration(&mut self, iteration: usize) {
        self.current_iteration = iteration;
    }

    #[must_use]
    pub fn max_iteration(&self) -> usize {
        self.max_iteration
    }

    pub fn define_max_iteration(&mut self, max_iteration: usize) {
        self.max_iteration = max_iteration;
    }

    /// Iterations left before the cap; zero when uncapped or exhausted.
    #[must_use]
    pub fn remaining_iterations(&self) -> usize {
        self.max_iteration.saturating_sub(self.current_iteration)
    }

    #[must_use]
    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn define_budget(&mut self, budget: usize) {
        self.budget = budget;
    }

    #[must_use]
    pub fn used_budget(&self) -> usize {
        self.used_budget
    }

    /// Charges `cost` evaluations to the budget.
    pub fn decrement_budget(&mut self, cost: usize) {
        self.used_budget += cost;
    }

    /// Evaluations left; never negative.
    #[must_use]
    pub fn remaining_budget(&self) -> usize {
        self.budget.saturating_sub(self.used_budget)
    }

    /// Returns `true` if the given counters exhaust an active cap.
    #[must_use]
    pub fn is_exhausted(&self, iteration: usize, used_budget: usize) -> bool {
        (self.budget == 0 && self.max_iteration == 0)
            || (self.budget > 0 && used_budget >= self.budget)
            || (self.max_iteration > 0 && iteration >= self.max_iteration)
    }

    /// Requests termination at the end of the current iteration.
    pub fn signal_termination(&mut self, signal: bool) {
        self.terminate_signalled = signal;
    }

    /// Returns `true` once an iteration or budget cap is reached, when no cap
    /// is set at all, or when a node has signalled termination.
    #[must_use]
    pub fn is_terminate(&self) -> bool {
        self.terminate_signalled || self.is_exhausted(self.current_iteration, self.used_budget)
    }

    // ====================================================================
    // Reference vectors
    // ====================================================================

    #[must_use]
    pub fn ideal(&self) -> &[f64] {
        &self.ideal
    }

    #[must_use]
    pub fn nadir(&self) -> &[f64] {
        &self.nadir
    }

    #[must_use]
    pub fn anti_ideal(&self) -> &[f64] {
        &self.anti_ideal
    }

    /// Forgets the ideal, nadir and anti-ideal vectors.
    pub fn reset_reference_vectors(&mut self) {
        self.ideal.clear();
        self.nadir.clear();
        self.anti_ideal.clear();
    }

    /// Folds an evaluated mapping into the reference vectors.
    ///
    /// The ideal and anti-ideal track the per-objective minimum and maximum
    /// over every successful optimization mapping. The nadir tracks the
    /// maximum over the non-dominated archive and is only maintained while
    /// the archive is kept. Returns `true` if any vector changed.
    pub fn update_ideal_nadir(&mut self, id: MappingId) -> bool {
        let Some(mapping) = self.population.mapping(id) else {
            return false;
        };
        if !mapping.is_optimization_mapping() || !mapping.is_successful_evaluation() {
            return false;
        }
        let objectives = mapping.objectives().to_vec();

        let mut updated = fold(&mut self.ideal, &objectives, f64::min);
        updated |= fold(&mut self.anti_ideal, &objectives, f64::max);

        if self.keep_archive {
            match self.update_non_dominated_archive(id) {
                ArchiveUpdate::Unchanged => {}
                ArchiveUpdate::Added => updated |= fold(&mut self.nadir, &objectives, f64::max),
                ArchiveUpdate::Replaced => updated |= self.recompute_nadir(),
            }
        }
        updated
    }

    fn recompute_nadir(&mut self) -> bool {
        let Some(archive) = self.population.set_with_tag(&Tag::NonDominatedArchive, 0) else {
            return false;
        };
        let mut nadir: Vec<f64> = Vec::new();
        for id in self.population.members(archive) {
            if let Some(mapping) = self.population.mapping(id) {
                fold(&mut nadir, mapping.objectives(), f64::max);
            }
        }
        let changed = nadir != self.nadir;
        self.nadir = nadir;
        changed
    }

    #[must_use]
    pub fn direction(&self) -> &[f64] {
        &self.direction
    }

    pub fn define_direction(&mut self, direction: Vec<f64>) {
        self.direction = direction;
    }

    // ====================================================================
    // Archive
    // ====================================================================

    #[must_use]
    pub fn keep_archive(&self) -> bool {
        self.keep_archive
    }

    pub fn define_keep_archive(&mut self, keep: bool) {
        self.keep_archive = keep;
    }

    /// Offers a mapping to the set tagged [`Tag::NonDominatedArchive`].
    ///
    /// The archive is created on first use. Archived mappings dominated by
    /// the newcomer are removed; a newcomer that is dominated by, or has the
    /// same objectives as, an archived mapping is rejected.
    pub fn update_non_dominated_archive(&mut self, id: MappingId) -> ArchiveUpdate {
        let Some(candidate) = self.population.mapping(id) else {
            return ArchiveUpdate::Unchanged;
        };
        let candidate = candidate.objectives().to_vec();

        let archive = match self.population.set_with_tag(&Tag::NonDominatedArchive, 0) {
            Some(archive) => archive,
            None => self.population.create_set([Tag::NonDominatedArchive]),
        };

        let mut kept = Vec::new();
        let mut displaced = false;
        for member in self.population.members(archive) {
            let Some(archived) = self.population.mapping(member) else {
                continue;
            };
            let archived = archived.objectives();
            match dominance(&candidate, archived, DominanceMode::Weak) {
                Dominance::Dominated => return ArchiveUpdate::Unchanged,
                Dominance::Dominates => displaced = true,
                Dominance::Incomparable => {
                    if same_objectives(&candidate, archived) {
                        return ArchiveUpdate::Unchanged;
                    }
                    kept.push(member);
                }
            }
        }

        kept.push(id);
        if let Some(set) = self.population.set_mut(archive) {
            set.set_members(kept);
        }
        tracing::trace!(mapping = ?id, displaced, "archive updated");

        if displaced {
            ArchiveUpdate::Replaced
        } else {
            ArchiveUpdate::Added
        }
    }

    // ====================================================================
    // Published values
    // ====================================================================

    #[must_use]
    pub fn indicator(&self, name: &str) -> Option<f64> {
        self.indicators.get(name).copied()
    }

    #[must_use]
    pub fn indicators(&self) -> &BTreeMap<String, f64> {
        &self.indicators
    }

    pub fn publish_indicator(&mut self, name: impl Into<String>, value: f64) {
        self.indicators.insert(name.into(), value);
    }

    #[must_use]
    pub fn reduction(&self) -> Option<&ReductionData> {
        self.reduction.as_ref()
    }

    pub fn publish_reduction(&mut self, data: ReductionData) {
        self.reduction = Some(data);
    }

    // ====================================================================
    // Invalid mappings
    // ====================================================================

    /// Marks unsuccessfully evaluated mappings for re-evaluation.
    pub fn ignore_unsuccessful_evaluations(&mut self) {
        for id in self.unsuccessful_mappings() {
            if let Some(mapping) = self.population.mapping_mut(id) {
                mapping.invalidate();
            }
        }
    }

    /// Drops unsuccessfully evaluated mappings from every set.
    pub fn remove_invalid_mappings(&mut self) {
        let invalid = self.unsuccessful_mappings();
        for set_id in self.population.set_ids().to_vec() {
            if let Some(set) = self.population.set_mut(set_id) {
                let members = set
                    .members()
                    .iter()
                    .copied()
                    .filter(|m| !invalid.contains(m))
                    .collect();
                set.set_members(members);
            }
        }
    }

    /// Gives unsuccessfully evaluated mappings the anti-ideal objectives.
    pub fn deteriorate_invalid_mappings(&mut self) {
        let anti_ideal = self.anti_ideal.clone();
        for id in self.unsuccessful_mappings() {
            if let Some(mapping) = self.population.mapping_mut(id) {
                for (k, &value) in anti_ideal.iter().enumerate() {
                    mapping.define_objective(k, value);
                }
            }
        }
    }

    fn unsuccessful_mappings(&self) -> Vec<MappingId> {
        let mut ids: Vec<MappingId> = self
            .population
            .set_ids()
            .iter()
            .flat_map(|&set| self.population.members(set))
            .filter(|&id| {
                self.population
                    .mapping(id)
                    .is_some_and(|m| !m.is_successful_evaluation())
            })
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Drops mappings no set references. Returns the number removed.
    pub fn sweep(&mut self) -> usize {
        self.population.sweep()
    }
}

/// Folds `values` into `target` element-wise; an empty or mismatched target is
/// replaced. Returns `true` if `target` changed.
fn fold(target: &mut Vec<f64>, values: &[f64], pick: fn(f64, f64) -> f64) -> bool {
    if target.len() != values.len() {
        *target = values.to_vec();
        return true;
    }
    let mut changed = false;
    for (t, &v) in target.iter_mut().zip(values) {
        let next = pick(*t, v);
        if next != *t {
            *t = next;
            changed = true;
        }
    }
    changed
}

fn same_objectives(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < EPSILON)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use strand_core::{Mapping, Problem};

    use super::*;

    fn evaluated(state: &mut PipelineState, problem: &Problem, objectives: &[f64]) -> MappingId {
        let mut mapping = Mapping::new(problem);
        for (k, &value) in objectives.iter().enumerate() {
            mapping.define_objective(k, value);
        }
        state.population_mut().insert_mapping(mapping)
    }

    #[test]
    fn budget_accounting_never_goes_negative() {
        let mut state = PipelineState::new();
        state.define_budget(10);
        state.decrement_budget(4);
        assert_eq!(state.used_budget() + state.remaining_budget(), state.budget());

        state.decrement_budget(9);
        assert_eq!(state.remaining_budget(), 0);
        assert!(state.is_terminate());
    }

    #[test]
    fn termination_requires_a_cap_or_a_signal() {
        let mut state = PipelineState::new();
        // No cap at all terminates immediately.
        assert!(state.is_terminate());

        state.define_max_iteration(2);
        assert!(!state.is_terminate());

        state.signal_termination(true);
        assert!(state.is_terminate());

        state.increment_iteration();
        assert!(!state.is_terminate(), "signal clears on the next iteration");
        state.increment_iteration();
        assert!(state.is_terminate());
    }

    #[test]
    fn archive_keeps_only_non_dominated_mappings() {
        let problem = Problem::zdt1(2);
        let mut state = PipelineState::new();

        let a = evaluated(&mut state, &problem, &[1.0, 3.0]);
        let b = evaluated(&mut state, &problem, &[3.0, 1.0]);
        let c = evaluated(&mut state, &problem, &[0.5, 0.5]);
        let d = evaluated(&mut state, &problem, &[0.5, 0.5]);
        let e = evaluated(&mut state, &problem, &[4.0, 4.0]);

        assert_eq!(state.update_non_dominated_archive(a), ArchiveUpdate::Added);
        assert_eq!(state.update_non_dominated_archive(b), ArchiveUpdate::Added);
        assert_eq!(state.update_non_dominated_archive(c), ArchiveUpdate::Replaced);
        assert_eq!(state.update_non_dominated_archive(d), ArchiveUpdate::Unchanged);
        assert_eq!(state.update_non_dominated_archive(e), ArchiveUpdate::Unchanged);

        let archive = state
            .population()
            .set_with_tag(&Tag::NonDominatedArchive, 0)
            .unwrap();
        assert_eq!(state.population().members(archive), vec![c]);
    }

    #[test]
    fn reference_vectors_follow_evaluations() {
        let problem = Problem::zdt1(2);
        let mut state = PipelineState::new();
        state.define_keep_archive(true);

        let a = evaluated(&mut state, &problem, &[1.0, 3.0]);
        let b = evaluated(&mut state, &problem, &[3.0, 1.0]);
        let c = evaluated(&mut state, &problem, &[5.0, 5.0]);
        for id in [a, b, c] {
            state.update_ideal_nadir(id);
        }

        assert_eq!(state.ideal(), &[1.0, 1.0]);
        assert_eq!(state.anti_ideal(), &[5.0, 5.0]);
        // The dominated point never enters the archive, so it cannot move the nadir.
        assert_eq!(state.nadir(), &[3.0, 3.0]);

        state.reset_reference_vectors();
        assert!(state.ideal().is_empty());
    }

    #[test]
    fn invalid_mappings_are_deteriorated_or_removed() {
        let problem = Problem::zdt1(2);
        let mut state = PipelineState::new();
        let good = evaluated(&mut state, &problem, &[1.0, 1.0]);
        let bad = evaluated(&mut state, &problem, &[0.0, 0.0]);
        state.update_ideal_nadir(good);
        state
            .population_mut()
            .mapping_mut(bad)
            .unwrap()
            .set_successful_evaluation(false);

        let set = state.population_mut().create_set([Tag::MainOptimizationSet]);
        state.population_mut().append_to_set(set, good);
        state.population_mut().append_to_set(set, bad);

        state.deteriorate_invalid_mappings();
        let worst = state.population().mapping(bad).unwrap().objectives().to_vec();
        assert_relative_eq!(worst[0], 1.0);

        state.remove_invalid_mappings();
        assert_eq!(state.population().members(set), vec![good]);
        assert_eq!(state.sweep(), 1);
    }
}

use super::{Dominance, DominanceMode, DominanceRelation, Outcome, dominance};

/// Goal- and priority-based preference ordering.
///
/// Each objective may carry a goal (`None` means "no goal set") and a priority.
/// Candidates meeting every set goal are preferred over those that miss any.
/// Ties are broken on the objectives that miss their goals, and then on the
/// full objective vector. With several priority levels the comparison is
/// lexicographic, highest priority first.
///
/// An empty goal vector reduces to plain Pareto dominance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferability {
    pub mode: DominanceMode,
    pub goals: Vec<Option<f64>>,
    pub priorities: Vec<u32>,
}

impl Preferability {
    #[must_use]
    pub fn new(mode: DominanceMode, goals: Vec<Option<f64>>, priorities: Vec<u32>) -> Self {
        Self {
            mode,
            goals,
            priorities,
        }
    }
}

impl DominanceRelation for Preferability {
    fn compare(&self, a: &Outcome<'_>, b: &Outcome<'_>) -> Dominance {
        let (a, b) = (a.objectives, b.objectives);
        if self.goals.is_empty() || a.len() != b.len() || a.len() != self.goals.len() {
            return dominance(a, b, self.mode);
        }

        if self.priorities.len() == self.goals.len() {
            prioritised_preferability(a, b, &self.goals, &self.priorities, self.mode)
        } else {
            preferability(a, b, &self.goals, self.mode)
        }
    }
}

/// Single-level preferability.
#[must_use]
pub fn preferability(a: &[f64], b: &[f64], goals: &[Option<f64>], mode: DominanceMode) -> Dominance {
    if b.len() != a.len() || goals.len() != a.len() {
        return dominance(a, b, mode);
    }

    let all: Vec<usize> = (0..a.len()).collect();
    if let Some(decided) = compare_on_goals(a, b, goals, &all, mode) {
        return decided;
    }
    dominance(a, b, mode)
}

/// Preferability with lexicographic priority levels.
///
/// Only objectives with a set goal define the priority levels. If they all
/// share priority `1`, this is plain [`preferability`]. Otherwise the highest
/// level is compared first; a tie there moves the comparison to the
/// objectives with lower priority.
#[must_use]
pub fn prioritised_preferability(
    a: &[f64],
    b: &[f64],
    goals: &[Option<f64>],
    priorities: &[u32],
    mode: DominanceMode,
) -> Dominance {
    if b.len() != a.len() || goals.len() != a.len() || priorities.len() != a.len() {
        return dominance(a, b, mode);
    }

    let levels = || {
        goals
            .iter()
            .zip(priorities)
            .filter(|(goal, _)| goal.is_some())
            .map(|(_, &p)| p)
    };
    let (Some(max), Some(min)) = (levels().max(), levels().min()) else {
        return preferability(a, b, goals, mode);
    };

    if max == min && max == 1 {
        return preferability(a, b, goals, mode);
    }

    let top: Vec<usize> = (0..a.len())
        .filter(|&k| goals[k].is_some() && priorities[k] == max)
        .collect();
    if let Some(decided) = compare_on_goals(a, b, goals, &top, mode) {
        return decided;
    }

    if max == min {
        return Dominance::Incomparable;
    }

    let lower: Vec<usize> = (0..a.len()).filter(|&k| priorities[k] < max).collect();
    let pick = |v: &[f64]| lower.iter().map(|&k| v[k]).collect::<Vec<_>>();
    let goals2: Vec<Option<f64>> = lower.iter().map(|&k| goals[k]).collect();
    let priorities2: Vec<u32> = lower.iter().map(|&k| priorities[k]).collect();

    prioritised_preferability(&pick(a), &pick(b), &goals2, &priorities2, mode)
}

/// Compares on the objectives in `indices` that have a set goal.
///
/// Returns `None` when the goal-based comparison cannot separate the pair and
/// the caller must fall back to another criterion.
fn compare_on_goals(
    a: &[f64],
    b: &[f64],
    goals: &[Option<f64>],
    indices: &[usize],
    mode: DominanceMode,
) -> Option<Dominance> {
    let misses = |v: &[f64], k: usize| goals[k].is_some_and(|g| v[k] > g);

    let a_class = indices.iter().any(|&k| misses(a, k));
    let b_class = indices.iter().any(|&k| misses(b, k));
    match (a_class, b_class) {
        (false, true) => return Some(Dominance::Dominates),
        (true, false) => return Some(Dominance::Dominated),
        _ => {}
    }

    let better = |x: f64, y: f64| match mode {
        DominanceMode::Weak => x <= y,
        DominanceMode::Strong => x < y,
    };

    let (mut a_better, mut a_equal, mut b_better, mut b_equal) = (true, true, true, true);
    for &k in indices {
        if misses(a, k) {
            a_better &= better(a[k], b[k]);
            a_equal &= a[k] == b[k];
        }
        if misses(b, k) {
            b_better &= better(b[k], a[k]);
            b_equal &= b[k] == a[k];
        }
    }

    if a_equal && b_equal {
        return None;
    }
    if (a_better && !a_equal) || (a_equal && !b_equal) {
        return Some(Dominance::Dominates);
    }
    if (b_better && !b_equal) || (b_equal && !a_equal) {
        return Some(Dominance::Dominated);
    }
    Some(Dominance::Incomparable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meeting_all_goals_is_preferred() {
        let goals = [Some(1.0), Some(1.0)];
        // a meets both goals, b misses one even though it is better on f1.
        let a = [0.9, 0.9];
        let b = [0.1, 1.5];
        assert_eq!(
            preferability(&a, &b, &goals, DominanceMode::Weak),
            Dominance::Dominates
        );
    }

    #[test]
    fn unset_goals_fall_back_to_dominance() {
        let goals = [None, None];
        assert_eq!(
            preferability(&[1.0, 1.0], &[2.0, 2.0], &goals, DominanceMode::Weak),
            Dominance::Dominates
        );
        assert_eq!(
            preferability(&[1.0, 2.0], &[2.0, 1.0], &goals, DominanceMode::Weak),
            Dominance::Incomparable
        );
    }

    #[test]
    fn compares_on_missed_goals_first() {
        let goals = [Some(0.0), None];
        // Both miss the goal on f1; a is closer on f1 but worse on f2.
        let a = [1.0, 5.0];
        let b = [2.0, 0.0];
        assert_eq!(
            preferability(&a, &b, &goals, DominanceMode::Weak),
            Dominance::Dominates
        );
    }

    #[test]
    fn higher_priority_decides_first() {
        let goals = [Some(0.5), Some(0.5)];
        let priorities = [2, 1];
        // a meets the high-priority goal, b does not.
        let a = [0.4, 3.0];
        let b = [0.6, 0.0];
        assert_eq!(
            prioritised_preferability(&a, &b, &goals, &priorities, DominanceMode::Weak),
            Dominance::Dominates
        );
        assert_eq!(
            prioritised_preferability(&b, &a, &goals, &priorities, DominanceMode::Weak),
            Dominance::Dominated
        );
    }

    #[test]
    fn ties_at_high_priority_move_to_lower_levels() {
        let goals = [Some(0.5), Some(0.5)];
        let priorities = [2, 1];
        // Both meet the high-priority goal; the low-priority goal separates them.
        let a = [0.1, 0.4];
        let b = [0.0, 0.7];
        assert_eq!(
            prioritised_preferability(&a, &b, &goals, &priorities, DominanceMode::Weak),
            Dominance::Dominates
        );
    }

    #[test]
    fn relation_without_goals_is_pareto() {
        let relation = Preferability::default();
        let a = Outcome::unconstrained(&[1.0, 1.0]);
        let b = Outcome::unconstrained(&[1.0, 2.0]);
        assert_eq!(relation.compare(&a, &b), Dominance::Dominates);
    }
}

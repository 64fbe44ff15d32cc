use super::{Dominance, DominanceRelation, Outcome};

/// Sorts candidates into non-dominated fronts.
///
/// Returns the indices of `outcomes` grouped by front, best front first. Each
/// front keeps the original relative order of its members.
pub fn non_dominated_sort(
    outcomes: &[Outcome<'_>],
    relation: &dyn DominanceRelation,
) -> Vec<Vec<usize>> {
    let n = outcomes.len();
    let mut dominates: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut dominated_count = vec![0_usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            match relation.compare(&outcomes[i], &outcomes[j]) {
                Dominance::Dominates => {
                    dominates[i].push(j);
                    dominated_count[j] += 1;
                }
                Dominance::Dominated => {
                    dominates[j].push(i);
                    dominated_count[i] += 1;
                }
                Dominance::Incomparable => {}
            }
        }
    }

    let mut fronts = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| dominated_count[i] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            for &j in &dominates[i] {
                dominated_count[j] -= 1;
                if dominated_count[j] == 0 {
                    next.push(j);
                }
            }
        }
        next.sort_unstable();
        fronts.push(current);
        current = next;
    }
    fronts
}

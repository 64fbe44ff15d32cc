use super::{ConstrainedDominance, Dominance, DominanceRelation, Outcome, Preferability};

/// Feasibility first, then goal-based preference.
///
/// Holds a [`ConstrainedDominance`] for the feasibility decision and a
/// [`Preferability`] for everything else. The preference step itself falls
/// back to Pareto dominance when goals cannot separate a pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferabilityConstraintHandling {
    pub feasibility: ConstrainedDominance,
    pub preference: Preferability,
}

impl PreferabilityConstraintHandling {
    #[must_use]
    pub fn new(feasibility: ConstrainedDominance, preference: Preferability) -> Self {
        Self {
            feasibility,
            preference,
        }
    }
}

impl DominanceRelation for PreferabilityConstraintHandling {
    fn compare(&self, a: &Outcome<'_>, b: &Outcome<'_>) -> Dominance {
        self.feasibility
            .feasibility(a, b)
            .unwrap_or_else(|| self.preference.compare(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DominanceMode;

    fn relation() -> PreferabilityConstraintHandling {
        PreferabilityConstraintHandling::new(
            ConstrainedDominance::new(DominanceMode::Weak, vec![0.0]),
            Preferability::new(DominanceMode::Weak, vec![Some(1.0), Some(1.0)], vec![1, 1]),
        )
    }

    #[test]
    fn feasibility_overrides_goals() {
        // a meets every goal but is infeasible.
        let a = Outcome::new(&[0.5, 0.5], &[0.1]);
        let b = Outcome::new(&[3.0, 3.0], &[-0.1]);
        assert_eq!(relation().compare(&a, &b), Dominance::Dominated);
    }

    #[test]
    fn goals_decide_between_feasible() {
        let a = Outcome::new(&[0.5, 0.5], &[-1.0]);
        let b = Outcome::new(&[0.2, 3.0], &[-1.0]);
        assert_eq!(relation().compare(&a, &b), Dominance::Dominates);
    }

    #[test]
    fn dominance_decides_when_goals_tie() {
        let a = Outcome::new(&[0.5, 0.5], &[-1.0]);
        let b = Outcome::new(&[0.6, 0.5], &[-1.0]);
        assert_eq!(relation().compare(&a, &b), Dominance::Dominates);
    }
}

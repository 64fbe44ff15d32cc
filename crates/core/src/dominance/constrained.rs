use super::{Dominance, DominanceMode, DominanceRelation, Outcome, dominance};

/// Constraint-aware dominance.
///
/// A feasible candidate always dominates an infeasible one. Two infeasible
/// candidates are ordered by aggregate violation above the thresholds, with
/// equal violation being incomparable. Two feasible candidates fall back to
/// Pareto dominance.
///
/// With no thresholds, or for candidates without constraints, the relation
/// reduces to plain Pareto dominance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstrainedDominance {
    pub mode: DominanceMode,
    pub thresholds: Vec<f64>,
}

impl ConstrainedDominance {
    #[must_use]
    pub fn new(mode: DominanceMode, thresholds: Vec<f64>) -> Self {
        Self { mode, thresholds }
    }

    /// Compares by feasibility alone.
    ///
    /// Returns `None` when both candidates are feasible (or constraints are not
    /// in play), meaning the decision belongs to the objective comparison.
    #[must_use]
    pub fn feasibility(&self, a: &Outcome<'_>, b: &Outcome<'_>) -> Option<Dominance> {
        if self.thresholds.is_empty() || a.constraints.is_empty() || b.constraints.is_empty() {
            return None;
        }

        match (a.is_feasible(&self.thresholds), b.is_feasible(&self.thresholds)) {
            (true, true) => None,
            (true, false) => Some(Dominance::Dominates),
            (false, true) => Some(Dominance::Dominated),
            (false, false) => {
                let va = a.violation(&self.thresholds);
                let vb = b.violation(&self.thresholds);
                Some(if va < vb {
                    Dominance::Dominates
                } else if vb < va {
                    Dominance::Dominated
                } else {
                    Dominance::Incomparable
                })
            }
        }
    }
}

impl DominanceRelation for ConstrainedDominance {
    fn compare(&self, a: &Outcome<'_>, b: &Outcome<'_>) -> Dominance {
        self.feasibility(a, b)
            .unwrap_or_else(|| dominance(a.objectives, b.objectives, self.mode))
    }
}

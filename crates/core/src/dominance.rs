//! Pairwise comparison of candidate solutions.
//!
//! Comparisons are three-valued: one candidate dominates, is dominated, or the
//! two are incomparable. Mismatched inputs are reported as
//! [`Dominance::Incomparable`] rather than as errors.
//!
//! # Relations
//!
//! Fitness operators consume comparison rules through the
//! [`DominanceRelation`] trait:
//!
//! - [`ParetoDominance`] — plain weak or strong Pareto dominance
//! - [`ConstrainedDominance`] — feasibility first, then Pareto dominance
//! - [`Preferability`] — goal- and priority-based preference ordering
//! - [`PreferabilityConstraintHandling`] — feasibility, then preferability
//!
//! # Sorting
//!
//! [`non_dominated_sort`] peels a population into fronts under any relation.

mod composite;
mod constrained;
mod preferability;
mod sort;

use serde::{Deserialize, Serialize};

pub use composite::PreferabilityConstraintHandling;
pub use constrained::ConstrainedDominance;
pub use preferability::{Preferability, preferability, prioritised_preferability};
pub use sort::non_dominated_sort;

/// Outcome of comparing `a` against `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    /// `a` dominates `b`.
    Dominates,

    /// `b` dominates `a`.
    Dominated,

    /// Neither dominates the other.
    Incomparable,
}

impl Dominance {
    /// Returns the result of the comparison with operands swapped.
    #[must_use]
    pub fn reverse(self) -> Self {
        match self {
            Self::Dominates => Self::Dominated,
            Self::Dominated => Self::Dominates,
            Self::Incomparable => Self::Incomparable,
        }
    }
}

/// Whether dominance requires strict improvement on every objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DominanceMode {
    /// No worse on all objectives and strictly better on at least one.
    #[default]
    Weak,

    /// Strictly better on every objective.
    Strong,
}

/// A borrowed view of a candidate's objectives and constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome<'a> {
    pub objectives: &'a [f64],
    pub constraints: &'a [f64],
}

impl<'a> Outcome<'a> {
    #[must_use]
    pub fn new(objectives: &'a [f64], constraints: &'a [f64]) -> Self {
        Self {
            objectives,
            constraints,
        }
    }

    /// An outcome with objectives only.
    #[must_use]
    pub fn unconstrained(objectives: &'a [f64]) -> Self {
        Self::new(objectives, &[])
    }

    /// Returns `true` if each constraint is at or below its threshold.
    ///
    /// Missing thresholds count as zero.
    #[must_use]
    pub fn is_feasible(&self, thresholds: &[f64]) -> bool {
        self.constraints
            .iter()
            .enumerate()
            .all(|(i, &g)| g <= thresholds.get(i).copied().unwrap_or(0.0))
    }

    /// Sum of constraint excess over the thresholds.
    #[must_use]
    pub fn violation(&self, thresholds: &[f64]) -> f64 {
        self.constraints
            .iter()
            .enumerate()
            .map(|(i, &g)| (g - thresholds.get(i).copied().unwrap_or(0.0)).max(0.0))
            .sum()
    }
}

/// A pluggable pairwise comparison rule.
pub trait DominanceRelation: Send + Sync {
    /// Compares `a` against `b`.
    fn compare(&self, a: &Outcome<'_>, b: &Outcome<'_>) -> Dominance;

    /// Returns `true` if `a` dominates `b`.
    fn is_better(&self, a: &Outcome<'_>, b: &Outcome<'_>) -> bool {
        self.compare(a, b) == Dominance::Dominates
    }
}

/// Plain Pareto dominance over objectives, ignoring constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParetoDominance {
    pub mode: DominanceMode,
}

impl ParetoDominance {
    #[must_use]
    pub fn new(mode: DominanceMode) -> Self {
        Self { mode }
    }
}

impl DominanceRelation for ParetoDominance {
    fn compare(&self, a: &Outcome<'_>, b: &Outcome<'_>) -> Dominance {
        dominance(a.objectives, b.objectives, self.mode)
    }
}

/// Compares two objective vectors (minimization) in the given mode.
#[must_use]
pub fn dominance(a: &[f64], b: &[f64], mode: DominanceMode) -> Dominance {
    match mode {
        DominanceMode::Weak => weak_dominance(a, b),
        DominanceMode::Strong => strong_dominance(a, b),
    }
}

/// Weak Pareto dominance.
#[must_use]
pub fn weak_dominance(a: &[f64], b: &[f64]) -> Dominance {
    if a.len() != b.len() {
        return Dominance::Incomparable;
    }

    let a_better = a.iter().zip(b).any(|(x, y)| x < y);
    let b_better = a.iter().zip(b).any(|(x, y)| y < x);

    match (a_better, b_better) {
        (true, false) => Dominance::Dominates,
        (false, true) => Dominance::Dominated,
        _ => Dominance::Incomparable,
    }
}

/// Strong Pareto dominance: any tie makes the pair incomparable.
#[must_use]
pub fn strong_dominance(a: &[f64], b: &[f64]) -> Dominance {
    if a.len() != b.len() || a.is_empty() {
        return Dominance::Incomparable;
    }

    if a.iter().zip(b).all(|(x, y)| x < y) {
        Dominance::Dominates
    } else if a.iter().zip(b).all(|(x, y)| y < x) {
        Dominance::Dominated
    } else {
        Dominance::Incomparable
    }
}

/// Weak dominance of `a` shifted by `epsilon` over `b`.
///
/// `a` epsilon-dominates `b` if `a + ε` weakly dominates `b`.
#[must_use]
pub fn epsilon_dominance(a: &[f64], b: &[f64], epsilon: &[f64]) -> Dominance {
    if a.len() != epsilon.len() {
        return Dominance::Incomparable;
    }
    let shifted: Vec<f64> = a.iter().zip(epsilon).map(|(x, e)| x + e).collect();
    weak_dominance(&shifted, b)
}

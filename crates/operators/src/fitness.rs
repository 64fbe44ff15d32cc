//! Fitness operators.
//!
//! Fitness operators assign every mapping of their sets a scalar cost that
//! later filtrations order by; lower is better.
//!
//! - [`NonDominanceRanking`] — splits a set into non-dominated fronts.
//! - [`NsgaIICrowding`] — adds a crowding term to the rank of each front.
//! - [`Scalarization`] and [`GeneralizedDecomposition`] — scalarising
//!   functions over normalised objectives.
//! - [`SimplexLatticeDirectionIterator`] — cycles the global direction
//!   through a simplex lattice.
//! - [`SharedFitness`] — niching by a sharing radius.

mod crowding;
mod iterator;
mod ranking;
mod scalarization;
mod sharing;

pub use crowding::{NsgaIICrowding, crowding_distance};
pub use iterator::SimplexLatticeDirectionIterator;
pub use ranking::NonDominanceRanking;
pub use scalarization::{
    GeneralizedDecomposition, Scalarization, ScalarisingFunction, WeightScope, weighted_chebyshev,
    weighted_chebyshev_augmented, weighted_lp, weighted_sum,
};
pub use sharing::{SharedFitness, sharing_radius};

/// Maps `values` into the unit box spanned by `lower` and `upper`.
///
/// Values at or beyond a bound are clamped to it. Components without both
/// bounds are passed through unchanged.
#[must_use]
pub fn normalise_to_unit_box(values: &[f64], lower: &[f64], upper: &[f64]) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| match (lower.get(i), upper.get(i)) {
            (Some(&l), Some(_)) if v <= l => 0.0,
            (Some(_), Some(&u)) if v >= u => 1.0,
            (Some(&l), Some(&u)) => (v - l) / (u - l),
            _ => v,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn unit_box_clamps_and_scales() {
        let unit = normalise_to_unit_box(&[-1.0, 5.0, 2.5, 7.0], &[0.0, 0.0, 0.0], &[1.0, 1.0, 10.0]);
        assert_relative_eq!(unit[0], 0.0);
        assert_relative_eq!(unit[1], 1.0);
        assert_relative_eq!(unit[2], 0.25);
        assert_relative_eq!(unit[3], 7.0);
    }

    #[test]
    fn degenerate_boxes_do_not_divide() {
        let unit = normalise_to_unit_box(&[1.0, 2.0], &[1.0, 1.0], &[1.0, 1.0]);
        assert_eq!(unit, vec![0.0, 1.0]);
    }
}

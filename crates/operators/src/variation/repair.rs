//! Box-constraint repair.
//!
//! Nominal values are labels, so a nominal value outside its range is
//! replaced by a uniform draw instead of being moved back geometrically.

use std::str::FromStr;

use rand::Rng;
use strand_core::ElementType;
use strand_core::problem::Variable;

use crate::sampling;

/// How out-of-bounds decision variables are brought back into their box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repair {
    /// Mirror off the violated bound, folding repeatedly for large overshoots.
    #[default]
    Reflect,

    /// Clamp to the violated bound.
    Truncate,
}

impl Repair {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reflect => "Reflect",
            Self::Truncate => "Truncate",
        }
    }

    /// Repairs every variable of a decision vector.
    pub fn apply(self, values: &mut [f64], variables: &[Variable], rng: &mut impl Rng) {
        for (value, variable) in values.iter_mut().zip(variables) {
            *value = match self {
                Self::Reflect => reflect_into_feasible_domain(*value, variable, rng),
                Self::Truncate => truncate_into_feasible_domain(*value, variable, rng),
            };
        }
    }
}

impl FromStr for Repair {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Reflect" => Ok(Self::Reflect),
            "Truncate" => Ok(Self::Truncate),
            other => Err(format!("unknown repair `{other}`")),
        }
    }
}

fn needs_resample(value: f64, variable: &Variable) -> bool {
    !value.is_finite() || variable.kind == ElementType::Nominal
}

/// Reflects `value` back inside the bounds of `variable`.
///
/// The overshoot is folded at the bounds: an even number of whole widths
/// lands measured from the violated bound, an odd number from the opposite
/// one. A zero-width range collapses to its lower bound.
pub fn reflect_into_feasible_domain(value: f64, variable: &Variable, rng: &mut impl Rng) -> f64 {
    let (lower, upper) = (variable.lower, variable.upper);
    if (lower..=upper).contains(&value) {
        return value;
    }
    if needs_resample(value, variable) {
        return sampling::value_in(rng, variable.kind, lower, upper);
    }

    let width = upper - lower;
    if width <= 0.0 {
        return lower;
    }

    let below = value < lower;
    let overshoot = if below { lower - value } else { value - upper };
    let folds = (overshoot / width).floor();
    let rest = overshoot - folds * width;

    if below == (folds % 2.0 == 0.0) {
        lower + rest
    } else {
        upper - rest
    }
}

/// Clamps `value` to the bounds of `variable`.
pub fn truncate_into_feasible_domain(value: f64, variable: &Variable, rng: &mut impl Rng) -> f64 {
    let (lower, upper) = (variable.lower, variable.upper);
    if (lower..=upper).contains(&value) {
        return value;
    }
    if needs_resample(value, variable) {
        return sampling::value_in(rng, variable.kind, lower, upper);
    }
    value.clamp(lower, upper.max(lower))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn reflection_folds_at_the_bounds() {
        let mut rng = StdRng::seed_from_u64(0);
        let x = Variable::real("x", 0.0, 1.0);

        assert_relative_eq!(reflect_into_feasible_domain(0.4, &x, &mut rng), 0.4);
        assert_relative_eq!(reflect_into_feasible_domain(-0.25, &x, &mut rng), 0.25);
        assert_relative_eq!(reflect_into_feasible_domain(1.25, &x, &mut rng), 0.75);
        assert_relative_eq!(reflect_into_feasible_domain(-1.25, &x, &mut rng), 0.75);
        assert_relative_eq!(reflect_into_feasible_domain(2.25, &x, &mut rng), 0.25);
    }

    #[test]
    fn degenerate_ranges_collapse() {
        let mut rng = StdRng::seed_from_u64(0);
        let fixed = Variable::real("x", 2.0, 2.0);
        assert_relative_eq!(reflect_into_feasible_domain(5.0, &fixed, &mut rng), 2.0);
    }

    #[test]
    fn nominal_values_are_resampled() {
        let mut rng = StdRng::seed_from_u64(3);
        let colour = Variable::nominal("colour", 4);
        for _ in 0..20 {
            let value = reflect_into_feasible_domain(7.0, &colour, &mut rng);
            assert!((0.0..=3.0).contains(&value));
            assert_relative_eq!(value, value.round());
        }
    }

    #[test]
    fn truncation_clamps() {
        let mut rng = StdRng::seed_from_u64(0);
        let n = Variable::integer("n", -2, 5);
        assert_relative_eq!(truncate_into_feasible_domain(9.0, &n, &mut rng), 5.0);
        assert_relative_eq!(truncate_into_feasible_domain(-3.5, &n, &mut rng), -2.0);

        let mut values = vec![9.0, -1.0];
        let vars = [n, Variable::real("x", 0.0, 1.0)];
        Repair::Truncate.apply(&mut values, &vars, &mut rng);
        assert_eq!(values, vec![5.0, 0.0]);
        assert_eq!("Truncate".parse::<Repair>(), Ok(Repair::Truncate));
    }
}

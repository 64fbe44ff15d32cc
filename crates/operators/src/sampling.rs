//! Random draws shared by the operator families.
//!
//! Every draw goes through the context's random stream on the chain thread,
//! so a fixed seed reproduces a run exactly.

use rand::Rng;
use rand::seq::SliceRandom;
use strand_core::{ElementType, Mapping, Problem};

/// Bernoulli draw: `true` with the given probability.
///
/// Probabilities at or above one always succeed and at or below zero never
/// do, without touching the stream.
pub fn draw(rng: &mut impl Rng, probability: f64) -> bool {
    if probability >= 1.0 {
        true
    } else if probability <= 0.0 {
        false
    } else {
        probability > rng.gen_range(0.0..1.0)
    }
}

/// Uniform integer in `[lower, upper]`; `lower` when the range is empty.
pub fn integer_in(rng: &mut impl Rng, lower: i64, upper: i64) -> i64 {
    if upper <= lower {
        lower
    } else {
        rng.gen_range(lower..=upper)
    }
}

/// Uniform value of the given kind inside `[lower, upper]`.
///
/// Discrete kinds draw one of the `upper - lower + 1` values starting at
/// `lower`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn value_in(rng: &mut impl Rng, kind: ElementType, lower: f64, upper: f64) -> f64 {
    match kind {
        ElementType::Real if upper > lower => rng.gen_range(lower..=upper),
        ElementType::Real => lower,
        _ => integer_in(rng, lower as i64, upper as i64) as f64,
    }
}

/// Replaces every decision variable with a uniform draw inside its bounds.
pub fn randomize(mapping: &mut Mapping, problem: &Problem, rng: &mut impl Rng) {
    for (i, var) in problem.variables().iter().enumerate() {
        let value = value_in(rng, var.kind, var.lower, var.upper);
        mapping.set_decision_value(i, value);
    }
}

/// A random permutation of `0..n`.
pub fn permutation(rng: &mut impl Rng, n: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices
}

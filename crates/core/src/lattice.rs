//! Simplex-lattice weight vectors.
//!
//! A lattice with `h` divisions over `k` objectives holds every vector whose
//! entries are multiples of `1/h` and sum to one.

/// Number of points of a simplex lattice, `C(h + k - 1, k - 1)`.
///
/// Returns zero when `k` is zero.
#[must_use]
pub fn simplex_lattice_size(h: usize, k: usize) -> usize {
    if k == 0 {
        return 0;
    }
    binomial(h + k - 1, k - 1)
}

/// Generates the simplex lattice with `h` divisions over `k` objectives.
///
/// Vectors are produced in lexicographic order of their integer
/// compositions, largest first component first. With zero divisions the
/// lattice degenerates to the single centroid vector.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn simplex_lattice(h: usize, k: usize) -> Vec<Vec<f64>> {
    if k == 0 {
        return Vec::new();
    }
    if h == 0 {
        return vec![vec![1.0 / k as f64; k]];
    }

    let mut lattice = Vec::with_capacity(simplex_lattice_size(h, k));
    let mut current = Vec::with_capacity(k);
    compositions(h, k, &mut current, &mut |parts| {
        lattice.push(parts.iter().map(|&p| p as f64 / h as f64).collect());
    });
    lattice
}

/// Visits every composition of `remaining` into `slots` non-negative parts.
fn compositions(
    remaining: usize,
    slots: usize,
    current: &mut Vec<usize>,
    visit: &mut dyn FnMut(&[usize]),
) {
    if slots == 1 {
        current.push(remaining);
        visit(current);
        current.pop();
        return;
    }
    for part in (0..=remaining).rev() {
        current.push(part);
        compositions(remaining - part, slots - 1, current, visit);
        current.pop();
    }
}

fn binomial(n: usize, k: usize) -> usize {
    let k = k.min(n - k);
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn lattice_size_matches_binomial() {
        assert_eq!(simplex_lattice_size(4, 2), 5);
        assert_eq!(simplex_lattice_size(12, 3), 91);
        assert_eq!(simplex_lattice_size(3, 1), 1);
        assert_eq!(simplex_lattice_size(5, 0), 0);
    }

    #[test]
    fn lattice_points_sum_to_one() {
        let lattice = simplex_lattice(6, 3);
        assert_eq!(lattice.len(), simplex_lattice_size(6, 3));
        for w in &lattice {
            assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            assert!(w.iter().all(|&x| (0.0..=1.0).contains(&x)));
        }
    }

    #[test]
    fn two_objective_lattice_is_ordered() {
        let lattice = simplex_lattice(2, 2);
        assert_eq!(lattice, vec![vec![1.0, 0.0], vec![0.5, 0.5], vec![0.0, 1.0]]);
    }
}

use strand_core::{EPSILON, Tag};
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

/// Estimates the niche radius for `n` points on an `m`-objective front.
///
/// The radius is the `σ` for which `n` hyperspheres cover the front of a
/// unit hypercube, the root of `(1 + σ)^m − n·σ^m − 1`. Two objectives have
/// the closed form `2 / (n − 1)`; otherwise the root is found by bisection.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sharing_radius(n: usize, m: usize) -> f64 {
    let dims = m as f64;
    if n <= 2 || m == 0 {
        return dims.sqrt();
    }
    let count = n as f64;
    if m == 2 {
        return 2.0 / (count - 1.0);
    }

    let exponent = i32::try_from(m).unwrap_or(i32::MAX);
    let residual = |sigma: f64| (1.0 + sigma).powi(exponent) - count * sigma.powi(exponent) - 1.0;
    let (mut lo, mut hi) = (EPSILON, dims);
    while hi - lo > EPSILON {
        let mid = 0.5 * (lo + hi);
        if residual(mid) > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Fitness sharing between members of each output set.
///
/// Each member's cost is divided by its niche count, the sum of
/// `1 − (d/σ)^α` over members within distance `σ` in objective space
/// normalised by the ideal and nadir. Each shared cost is then scaled by
/// `cost · set size / Σ shared`, which keeps the set total when the members
/// share one cost. Expects each member's cost to hold its average fitness.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedFitness {
    alpha: f64,
}

impl Default for SharedFitness {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

impl SharedFitness {
    /// # Errors
    ///
    /// Returns [`ParamError::Invalid`] unless `alpha` is positive.
    pub fn new(alpha: f64) -> Result<Self, ParamError> {
        let mut sharing = Self::default();
        sharing.set_alpha(alpha)?;
        Ok(sharing)
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    fn set_alpha(&mut self, alpha: f64) -> Result<(), ParamError> {
        if alpha.is_finite() && alpha > 0.0 {
            self.alpha = alpha;
            Ok(())
        } else {
            Err(ParamError::invalid("SharingFunctionAlpha", format!("{alpha} is not positive")))
        }
    }
}

/// Euclidean distance between `a` and `b` after scaling each objective by
/// the width of `[lower, upper]`. Degenerate widths contribute nothing.
fn normalised_distance(a: &[f64], b: &[f64], lower: &[f64], upper: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .enumerate()
        .map(|(k, (x, y))| {
            let width = match (lower.get(k), upper.get(k)) {
                (Some(l), Some(u)) => u - l,
                _ => 1.0,
            };
            if width.abs() < EPSILON { 0.0 } else { (x - y) / width }
        })
        .map(|d| d * d)
        .sum::<f64>()
        .sqrt()
}

impl Operator for SharedFitness {
    fn name(&self) -> &str {
        "SharedFitness"
    }

    fn description(&self) -> &str {
        "Divides each cost by its niche count within a sharing radius."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new().with_output([Tag::Fitness])
    }

    #[allow(clippy::cast_precision_loss)]
    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        io.state_mut().define_keep_archive(true);

        let mut all: Vec<_> = io.output_sets().iter().flat_map(|&set| io.members(set)).collect();
        all.sort_unstable();
        all.dedup();
        let sigma = sharing_radius(all.len(), io.problem().objective_len());

        let state = io.state();
        let lower = state.ideal().to_vec();
        let upper = if state.nadir().len() == lower.len() {
            state.nadir().to_vec()
        } else {
            state.anti_ideal().to_vec()
        };

        while let Some(set) = io.next_output_set() {
            let members = io.members(set);
            let mut costs = Vec::with_capacity(members.len());
            let mut objectives = Vec::with_capacity(members.len());
            for &id in &members {
                let mapping = io.mapping(id)?;
                costs.push(mapping.cost().unwrap_or(0.0));
                objectives.push(mapping.objectives().to_vec());
            }

            let shared: Vec<f64> = objectives
                .iter()
                .zip(&costs)
                .map(|(a, cost)| {
                    let niche: f64 = objectives
                        .iter()
                        .map(|b| normalised_distance(a, b, &lower, &upper))
                        .filter(|&d| d <= sigma)
                        .map(|d| 1.0 - (d / sigma).powf(self.alpha))
                        .sum();
                    cost / niche
                })
                .collect();

            let total: f64 = shared.iter().sum();
            let rank_size = members.len() as f64;
            for ((id, share), cost) in members.into_iter().zip(shared).zip(costs) {
                let scaled = if total != 0.0 && total.is_finite() {
                    share * cost * rank_size / total
                } else {
                    share
                };
                io.mapping_mut(id)?.define_cost(scaled);
            }
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new(
            "SharingFunctionAlpha",
            "Exponent of the sharing function.",
            self.alpha,
        )]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "SharingFunctionAlpha" => self.set_alpha(value.as_f64(name)?),
            _ => Err(ParamError::Unknown(name.to_owned())),
        }
    }
}

use std::{fmt, str::FromStr};

use strand_core::{AUGMENTED_CONSTANT, EPSILON, Tag};
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

use super::normalise_to_unit_box;

/// Weighted sum `Σ wᵢ·fᵢ`.
///
/// All scalarising functions clamp weights below [`EPSILON`] up to it and
/// return zero when the weight and objective lengths differ.
#[must_use]
pub fn weighted_sum(objectives: &[f64], weights: &[f64]) -> f64 {
    weighted_terms(objectives, weights).sum()
}

/// Weighted Chebyshev distance `max wᵢ·fᵢ`.
#[must_use]
pub fn weighted_chebyshev(objectives: &[f64], weights: &[f64]) -> f64 {
    weighted_terms(objectives, weights).fold(0.0, f64::max)
}

/// Weighted Chebyshev distance plus a small weighted sum, which breaks
/// ties between weakly dominated points.
#[must_use]
pub fn weighted_chebyshev_augmented(objectives: &[f64], weights: &[f64]) -> f64 {
    weighted_chebyshev(objectives, weights) + AUGMENTED_CONSTANT * weighted_sum(objectives, weights)
}

/// Weighted Lp norm `(Σ (wᵢ·fᵢ)^p)^(1/p)`. Non-positive `p` gives zero.
#[must_use]
pub fn weighted_lp(objectives: &[f64], weights: &[f64], p: f64) -> f64 {
    if p <= 0.0 {
        return 0.0;
    }
    weighted_terms(objectives, weights)
        .map(|t| t.abs().powf(p))
        .sum::<f64>()
        .powf(1.0 / p)
}

fn weighted_terms<'a>(objectives: &'a [f64], weights: &'a [f64]) -> impl Iterator<Item = f64> + 'a {
    let len = if objectives.len() == weights.len() { objectives.len() } else { 0 };
    objectives[..len]
        .iter()
        .zip(&weights[..len])
        .map(|(&f, &w)| w.max(EPSILON) * f)
}

fn check_len(weights: &[f64], objective_count: usize) -> Result<&[f64], OperatorError> {
    if weights.len() == objective_count {
        Ok(weights)
    } else {
        Err(OperatorError::range(format!(
            "{} weights for {objective_count} objectives",
            weights.len()
        )))
    }
}

/// The scalarising function applied by [`Scalarization`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScalarisingFunction {
    #[default]
    WeightedSum,
    WeightedChebyshev,
    WeightedChebyshevAugmented,
    WeightedLp,
}

impl ScalarisingFunction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WeightedSum => "WeightedSum",
            Self::WeightedChebyshev => "WeightedChebyshev",
            Self::WeightedChebyshevAugmented => "WeightedChebyshevAugmented",
            Self::WeightedLp => "WeightedLp",
        }
    }

    /// Applies the function; `p` is only read by [`Self::WeightedLp`].
    #[must_use]
    pub fn apply(self, objectives: &[f64], weights: &[f64], p: f64) -> f64 {
        match self {
            Self::WeightedSum => weighted_sum(objectives, weights),
            Self::WeightedChebyshev => weighted_chebyshev(objectives, weights),
            Self::WeightedChebyshevAugmented => weighted_chebyshev_augmented(objectives, weights),
            Self::WeightedLp => weighted_lp(objectives, weights, p),
        }
    }
}

impl fmt::Display for ScalarisingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalarisingFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WeightedSum" => Ok(Self::WeightedSum),
            "WeightedChebyshev" => Ok(Self::WeightedChebyshev),
            "WeightedChebyshevAugmented" => Ok(Self::WeightedChebyshevAugmented),
            "WeightedLp" => Ok(Self::WeightedLp),
            other => Err(format!("unknown scalarising function `{other}`")),
        }
    }
}

/// Where the weights of a scalarisation come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WeightScope {
    /// The pipeline's current direction, shared by every mapping.
    #[default]
    Global,
    /// Each mapping's own weights. Mappings are scalarised once.
    Local,
}

impl WeightScope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "Global",
            Self::Local => "Local",
        }
    }
}

impl FromStr for WeightScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Global" => Ok(Self::Global),
            "Local" => Ok(Self::Local),
            other => Err(format!("unknown weight scope `{other}`")),
        }
    }
}

/// Sets the cost of every member of the output sets to a scalarising
/// function of its objectives.
///
/// Objectives are first normalised into the box spanned by the ideal and
/// anti-ideal vectors, when those are known. Missing weights default to a
/// uniform vector. Weights of any other length than the objectives fail the
/// node with [`OperatorError::Range`].
#[derive(Debug, Clone, PartialEq)]
pub struct Scalarization {
    function: ScalarisingFunction,
    scope: WeightScope,
    p: f64,
}

impl Default for Scalarization {
    fn default() -> Self {
        Self {
            function: ScalarisingFunction::default(),
            scope: WeightScope::default(),
            p: 1.0,
        }
    }
}

impl Scalarization {
    #[must_use]
    pub fn new(function: ScalarisingFunction, scope: WeightScope) -> Self {
        Self {
            function,
            scope,
            ..Self::default()
        }
    }

    /// Sets the exponent of [`ScalarisingFunction::WeightedLp`].
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Invalid`] unless `p` is positive.
    pub fn with_p_norm(mut self, p: f64) -> Result<Self, ParamError> {
        self.set_p_norm(p)?;
        Ok(self)
    }

    #[must_use]
    pub fn function(&self) -> ScalarisingFunction {
        self.function
    }

    #[must_use]
    pub fn scope(&self) -> WeightScope {
        self.scope
    }

    fn set_p_norm(&mut self, p: f64) -> Result<(), ParamError> {
        if p.is_finite() && p > 0.0 {
            self.p = p;
            Ok(())
        } else {
            Err(ParamError::invalid("PNorm", format!("{p} is not positive")))
        }
    }

    /// Scalarises the output sets of `io`, passing weights through `adjust`.
    fn scalarise(&self, io: &mut NodeIo<'_>, adjust: fn(&[f64]) -> Vec<f64>) -> Result<(), OperatorError> {
        let objective_count = io.problem().objective_len();
        let uniform = uniform_weights(objective_count);
        let state = io.state();
        let (ideal, anti_ideal) = (state.ideal().to_vec(), state.anti_ideal().to_vec());
        let global = match state.direction() {
            [] => adjust(&uniform),
            direction => adjust(check_len(direction, objective_count)?),
        };

        while let Some(set) = io.next_output_set() {
            for id in io.members(set) {
                let mapping = io.mapping_mut(id)?;
                let weights = match self.scope {
                    WeightScope::Global => global.clone(),
                    WeightScope::Local if mapping.is_scalarised() => continue,
                    WeightScope::Local => match mapping.weights() {
                        [] => adjust(&uniform),
                        weights => adjust(check_len(weights, objective_count)?),
                    },
                };
                let normalised = normalise_to_unit_box(mapping.objectives(), &ideal, &anti_ideal);
                mapping.define_cost(self.function.apply(&normalised, &weights, self.p));
                if self.scope == WeightScope::Local {
                    mapping.set_scalarised(true);
                }
            }
        }
        Ok(())
    }

    fn parameter_list(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(
                "ScalarisingFunction",
                "WeightedSum, WeightedChebyshev, WeightedChebyshevAugmented or WeightedLp.",
                self.function.as_str(),
            ),
            Parameter::new(
                "WeightScope",
                "Global to use the pipeline direction, Local for per-mapping weights.",
                self.scope.as_str(),
            ),
            Parameter::new("PNorm", "Exponent of the weighted Lp norm.", self.p),
        ]
    }

    fn update_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "ScalarisingFunction" => {
                self.function = value
                    .as_text(name)?
                    .parse()
                    .map_err(|reason: String| ParamError::invalid(name, reason))?;
            }
            "WeightScope" => {
                self.scope = value
                    .as_text(name)?
                    .parse()
                    .map_err(|reason: String| ParamError::invalid(name, reason))?;
            }
            "PNorm" => self.set_p_norm(value.as_f64(name)?)?,
            _ => return Err(ParamError::Unknown(name.to_owned())),
        }
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn uniform_weights(len: usize) -> Vec<f64> {
    vec![1.0 / len.max(1) as f64; len]
}

impl Operator for Scalarization {
    fn name(&self) -> &str {
        "Scalarization"
    }

    fn description(&self) -> &str {
        "Costs each mapping by a weighted scalarising function of its objectives."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new().with_output([Tag::ForFitness])
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        self.scalarise(io, <[f64]>::to_vec)
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.parameter_list()
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        self.update_parameter(name, value)
    }
}

/// Scalarisation with the weight transform of generalised decomposition.
///
/// Each weight becomes `1 / (w + 0.01)` and the result is normalised to
/// sum to one, so a Chebyshev scalarisation is minimised where the front
/// meets the ray along the original weight vector.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralizedDecomposition {
    inner: Scalarization,
}

impl Default for GeneralizedDecomposition {
    fn default() -> Self {
        Self {
            inner: Scalarization::new(ScalarisingFunction::WeightedChebyshev, WeightScope::Global),
        }
    }
}

impl GeneralizedDecomposition {
    #[must_use]
    pub fn new(function: ScalarisingFunction, scope: WeightScope) -> Self {
        Self {
            inner: Scalarization::new(function, scope),
        }
    }

    /// The transformed weights for `weights`.
    #[must_use]
    pub fn decomposition_weights(weights: &[f64]) -> Vec<f64> {
        let inverted: Vec<f64> = weights.iter().map(|w| 1.0 / (w + 0.01)).collect();
        let total: f64 = inverted.iter().sum();
        if total > 0.0 && total.is_finite() {
            inverted.iter().map(|w| w / total).collect()
        } else {
            inverted
        }
    }
}

impl Operator for GeneralizedDecomposition {
    fn name(&self) -> &str {
        "GeneralizedDecomposition"
    }

    fn description(&self) -> &str {
        "Scalarisation over decomposition-transformed weights."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new().with_output([Tag::ForFitness])
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        self.inner.scalarise(io, Self::decomposition_weights)
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.inner.parameter_list()
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        self.inner.update_parameter(name, value)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use strand_core::Mapping;
    use strand_pipeline::Pipeline;

    use super::*;
    use crate::filtration::fixture::{output_costs, pipeline, run};

    #[test]
    fn scalarising_functions() {
        let (f, w) = ([0.2, 0.6], [0.5, 0.5]);
        assert_relative_eq!(weighted_sum(&f, &w), 0.4);
        assert_relative_eq!(weighted_chebyshev(&f, &w), 0.3);
        assert_relative_eq!(weighted_chebyshev_augmented(&f, &w), 0.32);
        assert_relative_eq!(weighted_lp(&f, &w, 2.0), 0.1_f64.sqrt());
        assert_relative_eq!(weighted_lp(&f, &w, 1.0), 0.4);
        assert_relative_eq!(weighted_lp(&f, &w, 0.0), 0.0);
    }

    #[test]
    fn tiny_weights_are_clamped_and_mismatches_give_zero() {
        assert_relative_eq!(weighted_sum(&[1.0, 0.5], &[0.0, 1.0]), 0.5 + EPSILON);
        assert_relative_eq!(weighted_sum(&[1.0, 0.5], &[1.0]), 0.0);
        assert_relative_eq!(weighted_chebyshev(&[1.0], &[0.5, 0.5]), 0.0);
    }

    #[test]
    fn decomposition_weights_favour_small_weights() {
        let w = GeneralizedDecomposition::decomposition_weights(&[0.0, 1.0]);
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0);
        assert_relative_eq!(w[0] / w[1], 101.0, max_relative = 1e-12);
    }

    fn objective_set(pipeline: &mut Pipeline, points: &[([f64; 2], Option<[f64; 2]>)]) {
        let problem = pipeline.context().problem().clone();
        let population = pipeline.state_mut().population_mut();
        let set = population.create_set([Tag::ForFitness]);
        for (objectives, weights) in points {
            let mut mapping = Mapping::new(&problem);
            mapping.define_objective(0, objectives[0]);
            mapping.define_objective(1, objectives[1]);
            if let Some(weights) = weights {
                mapping.define_weights(weights.to_vec());
            }
            let id = population.insert_mapping(mapping);
            population.append_to_set(set, id);
        }
    }

    #[test]
    fn global_scope_uses_the_direction() {
        let mut pipeline = pipeline(1);
        objective_set(&mut pipeline, &[([0.2, 0.6], None), ([0.8, 0.1], None)]);
        pipeline.state_mut().define_direction(vec![0.25, 0.75]);

        let node = run(
            &mut pipeline,
            Scalarization::new(ScalarisingFunction::WeightedChebyshev, WeightScope::Global),
        );
        let costs = output_costs(&pipeline, node);
        assert_relative_eq!(costs[0][0], 0.45);
        assert_relative_eq!(costs[0][1], 0.2);
    }

    #[test]
    fn local_scope_scalarises_once() {
        let mut pipeline = pipeline(1);
        objective_set(
            &mut pipeline,
            &[([0.2, 0.6], Some([1.0, 0.0])), ([0.8, 0.1], None)],
        );

        let node = run(&mut pipeline, Scalarization::new(ScalarisingFunction::WeightedSum, WeightScope::Local));
        let costs = output_costs(&pipeline, node);
        assert_relative_eq!(costs[0][0], 0.2 + 0.6 * EPSILON);
        assert_relative_eq!(costs[0][1], 0.45);

        let id = pipeline.state().population().members(pipeline.cursors(node).unwrap().outputs()[0])[0];
        pipeline
            .state_mut()
            .population_mut()
            .mapping_mut(id)
            .unwrap()
            .define_cost(7.0);
        pipeline.evaluate(node).unwrap();
        assert_relative_eq!(output_costs(&pipeline, node)[0][0], 7.0);
    }

    #[test]
    fn weights_of_the_wrong_length_are_range_errors() {
        let mut global = pipeline(1);
        objective_set(&mut global, &[([0.2, 0.6], None)]);
        global.state_mut().define_direction(vec![0.2, 0.3, 0.5]);
        let node = global.add_node(Scalarization::default(), None).unwrap();
        assert!(matches!(
            global.evaluate(node),
            Err(strand_pipeline::PipelineError::Node {
                source: OperatorError::Range(_),
                ..
            })
        ));

        let mut local = pipeline(1);
        objective_set(&mut local, &[([0.2, 0.6], Some([1.0, 0.0]))]);
        let population = local.state().population();
        let set = population.set_with_tag(&Tag::ForFitness, 0).unwrap();
        let id = population.members(set)[0];
        local
            .state_mut()
            .population_mut()
            .mapping_mut(id)
            .unwrap()
            .define_weights(vec![1.0]);
        let operator = Scalarization::new(ScalarisingFunction::WeightedSum, WeightScope::Local);
        let node = local.add_node(operator, None).unwrap();
        assert!(local.evaluate(node).is_err());
        assert_eq!(local.state().population().mapping(id).unwrap().cost(), None);
    }

    #[test]
    fn parameters_round_trip() {
        let mut scalarization = Scalarization::default();
        scalarization
            .set_parameter("ScalarisingFunction", &ParamValue::from("WeightedLp"))
            .unwrap();
        scalarization.set_parameter("PNorm", &ParamValue::Real(3.0)).unwrap();
        assert_eq!(scalarization.function(), ScalarisingFunction::WeightedLp);
        assert!(scalarization.set_parameter("PNorm", &ParamValue::Real(0.0)).is_err());
        assert!(scalarization.set_parameter("WeightScope", &ParamValue::from("Both")).is_err());
        assert_eq!(GeneralizedDecomposition::default().parameters()[0].value, ParamValue::from("WeightedChebyshev"));
    }
}

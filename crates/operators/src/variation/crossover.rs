use rand::Rng;
use rand::rngs::StdRng;
use strand_core::{ElementType, EPSILON, Tag};
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

use super::{ConfigError, Repair, SbxConfig, check_probability, invalid, write_back};
use crate::sampling;

fn crossable(kind: ElementType) -> bool {
    matches!(kind, ElementType::Real | ElementType::Integer)
}

fn direction_tags() -> TagConfig {
    TagConfig::new().with_output([Tag::ForDirection])
}

/// Recombines the first two mappings of every output set in place.
///
/// `cross` maps a pair of parent values to a pair of child values, or
/// leaves the variable alone by returning `None`.
fn recombine<F>(
    io: &mut NodeIo<'_>,
    solution_probability: f64,
    repair: Option<Repair>,
    mut cross: F,
) -> Result<(), OperatorError>
where
    F: FnMut(&mut StdRng, f64, f64) -> Option<(f64, f64)>,
{
    let problem = io.problem();
    while let Some(set) = io.next_output_set() {
        let members = io.members(set);
        let [a, b, ..] = *members.as_slice() else {
            continue;
        };
        if !sampling::draw(io.rng(), solution_probability) {
            continue;
        }

        let before_a = io.mapping(a)?.decision_values();
        let before_b = io.mapping(b)?.decision_values();
        let mut child_a = before_a.clone();
        let mut child_b = before_b.clone();

        for (i, variable) in problem.variables().iter().enumerate() {
            if !crossable(variable.kind) {
                continue;
            }
            if let Some((x, y)) = cross(io.rng(), child_a[i], child_b[i]) {
                child_a[i] = x;
                child_b[i] = y;
            }
        }

        if let Some(repair) = repair {
            repair.apply(&mut child_a, problem.variables(), io.rng());
            repair.apply(&mut child_b, problem.variables(), io.rng());
        }
        write_back(io, a, &before_a, &child_a)?;
        write_back(io, b, &before_b, &child_b)?;
    }
    Ok(())
}

/// The SBX spread factor for a uniform draw `u`.
fn spread(u: f64, eta: f64) -> f64 {
    let exponent = 1.0 / (eta + 1.0);
    if u <= 0.5 {
        (2.0 * u).powf(exponent)
    } else {
        (1.0 / (2.0 * (1.0 - (u - EPSILON)))).powf(exponent)
    }
}

/// Simulated binary crossover of real and integer variables.
///
/// Each pair is recombined with the solution probability; each variable of a
/// recombined pair with the variable probability. Children are placed
/// symmetrically around the parents' mean, optionally swapped, and repaired
/// back into the box.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SbxCrossover {
    config: SbxConfig,
    repair: Repair,
}

impl SbxCrossover {
    #[must_use]
    pub fn new(config: SbxConfig) -> Self {
        Self {
            config,
            repair: Repair::default(),
        }
    }

    #[must_use]
    pub fn with_repair(mut self, repair: Repair) -> Self {
        self.repair = repair;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SbxConfig {
        &self.config
    }
}

impl Operator for SbxCrossover {
    fn name(&self) -> &str {
        "SbxCrossover"
    }

    fn description(&self) -> &str {
        "Simulated binary crossover of the first two mappings of each set."
    }

    fn default_tags(&self) -> TagConfig {
        direction_tags()
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        let config = self.config;
        recombine(io, config.solution_probability, Some(self.repair), |rng, a, b| {
            if !sampling::draw(rng, config.variable_probability) {
                return None;
            }
            let beta = spread(rng.gen_range(0.0..1.0), config.eta);
            let x = 0.5 * ((1.0 + beta) * a + (1.0 - beta) * b);
            let y = 0.5 * ((1.0 - beta) * a + (1.0 + beta) * b);
            if sampling::draw(rng, config.swap_probability) {
                Some((x, y))
            } else {
                Some((y, x))
            }
        })
    }

    fn parameters(&self) -> Vec<Parameter> {
        let c = &self.config;
        vec![
            Parameter::new(
                "DistributionIndex",
                "Spread of the children; larger values stay closer to the parents.",
                c.eta,
            ),
            Parameter::new(
                "SolutionCrossoverProbability",
                "Probability of recombining a pair of mappings.",
                c.solution_probability,
            ),
            Parameter::new(
                "VariableCrossoverProbability",
                "Probability of recombining each variable of a pair.",
                c.variable_probability,
            ),
            Parameter::new(
                "VariableSwapCrossoverProbability",
                "Probability of swapping the two children of a variable.",
                c.swap_probability,
            ),
            Parameter::new("Repair", "Reflect or Truncate.", self.repair.as_str()),
        ]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        let c = self.config;
        let updated: Result<SbxConfig, ConfigError> = match name {
            "DistributionIndex" => SbxConfig::new(
                value.as_f64(name)?,
                c.solution_probability,
                c.variable_probability,
                c.swap_probability,
            ),
            "SolutionCrossoverProbability" => SbxConfig::new(
                c.eta,
                value.as_f64(name)?,
                c.variable_probability,
                c.swap_probability,
            ),
            "VariableCrossoverProbability" => SbxConfig::new(
                c.eta,
                c.solution_probability,
                value.as_f64(name)?,
                c.swap_probability,
            ),
            "VariableSwapCrossoverProbability" => SbxConfig::new(
                c.eta,
                c.solution_probability,
                c.variable_probability,
                value.as_f64(name)?,
            ),
            "Repair" => {
                self.repair = value
                    .as_text(name)?
                    .parse()
                    .map_err(|reason: String| ParamError::invalid(name, reason))?;
                return Ok(());
            }
            _ => return Err(ParamError::Unknown(name.to_owned())),
        };
        self.config = updated.map_err(invalid(name))?;
        Ok(())
    }
}

/// Uniform blend crossover of real and integer variables.
///
/// Each differing variable of a recombined pair is replaced by the convex
/// combinations `b·x + (1-b)·y` and `(1-b)·x + b·y` for a uniform `b`, so
/// children stay between their parents and need no repair.
#[derive(Debug, Clone, PartialEq)]
pub struct SinglePointCrossover {
    solution_probability: f64,
    variable_probability: f64,
}

impl Default for SinglePointCrossover {
    fn default() -> Self {
        Self {
            solution_probability: 0.9,
            variable_probability: 0.5,
        }
    }
}

impl SinglePointCrossover {
    /// Creates the crossover with the given probabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if a probability lies outside `[0, 1]`.
    pub fn new(solution_probability: f64, variable_probability: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            solution_probability: check_probability("solution probability", solution_probability)?,
            variable_probability: check_probability("variable probability", variable_probability)?,
        })
    }
}

impl Operator for SinglePointCrossover {
    fn name(&self) -> &str {
        "SinglePointCrossover"
    }

    fn description(&self) -> &str {
        "Blends the first two mappings of each set variable by variable."
    }

    fn default_tags(&self) -> TagConfig {
        direction_tags()
    }

    #[allow(clippy::float_cmp)]
    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        let variable_probability = self.variable_probability;
        recombine(io, self.solution_probability, None, |rng, a, b| {
            if a == b || !sampling::draw(rng, variable_probability) {
                return None;
            }
            let beta: f64 = rng.gen_range(0.0..1.0);
            Some((beta * a + (1.0 - beta) * b, (1.0 - beta) * a + beta * b))
        })
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(
                "SolutionCrossoverProbability",
                "Probability of recombining a pair of mappings.",
                self.solution_probability,
            ),
            Parameter::new(
                "VariableCrossoverProbability",
                "Probability of recombining each variable of a pair.",
                self.variable_probability,
            ),
        ]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        let updated = match name {
            "SolutionCrossoverProbability" => Self::new(value.as_f64(name)?, self.variable_probability),
            "VariableCrossoverProbability" => Self::new(self.solution_probability, value.as_f64(name)?),
            _ => return Err(ParamError::Unknown(name.to_owned())),
        };
        *self = updated.map_err(invalid(name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use strand_core::problem::Variable;
    use strand_core::{Mapping, Problem, SetId};
    use strand_pipeline::{NodeId, OptimizationContext, Pipeline};

    use super::*;

    fn pipeline(problem: Problem, parents: &[&[f64]]) -> (Pipeline, SetId) {
        let mut pipeline = Pipeline::new(OptimizationContext::new(problem).with_seed(11));
        let problem = pipeline.context().problem().clone();
        let population = pipeline.state_mut().population_mut();
        let set = population.create_set([Tag::ForDirection]);
        for decision in parents {
            let mut mapping = Mapping::new(&problem);
            for (i, &x) in decision.iter().enumerate() {
                mapping.set_decision_value(i, x);
            }
            let id = population.insert_mapping(mapping);
            population.append_to_set(set, id);
        }
        (pipeline, set)
    }

    fn decisions(pipeline: &Pipeline, set: SetId) -> Vec<Vec<f64>> {
        let population = pipeline.state().population();
        population
            .members(set)
            .iter()
            .map(|&id| population.mapping(id).unwrap().decision_values())
            .collect()
    }

    fn run(pipeline: &mut Pipeline, operator: impl Operator + 'static) -> NodeId {
        let node = pipeline.add_node(operator, None).unwrap();
        pipeline.evaluate(node).unwrap();
        node
    }

    #[test]
    fn spread_is_one_at_the_median() {
        assert_relative_eq!(spread(0.5, 15.0), 1.0);
        assert!(spread(0.1, 15.0) < 1.0);
        assert!(spread(0.9, 15.0) > 1.0);
    }

    #[test]
    fn sbx_preserves_the_mean_inside_the_box() {
        let problem = Problem::zdt1(4);
        let (mut pipeline, set) = pipeline(problem, &[&[0.45, 0.5, 0.4, 0.6], &[0.55, 0.52, 0.5, 0.5]]);
        let config = SbxConfig::new(15.0, 1.0, 1.0, 0.5).unwrap();
        run(&mut pipeline, SbxCrossover::new(config));

        let children = decisions(&pipeline, set);
        for i in 0..4 {
            let (a, b) = (children[0][i], children[1][i]);
            assert!((0.0..=1.0).contains(&a) && (0.0..=1.0).contains(&b));
        }
        // No child left the box, so every pair keeps its mean.
        assert_relative_eq!(children[0][0] + children[1][0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(children[0][3] + children[1][3], 1.1, epsilon = 1e-12);
    }

    #[test]
    fn sbx_leaves_discrete_categories_alone() {
        let problem = Problem::new()
            .with_variable(Variable::real("x", 0.0, 1.0))
            .with_variable(Variable::nominal("c", 5));
        let (mut pipeline, set) = pipeline(problem, &[&[0.1, 1.0], &[0.9, 4.0]]);
        let config = SbxConfig::new(2.0, 1.0, 1.0, 1.0).unwrap();
        run(&mut pipeline, SbxCrossover::new(config));

        let children = decisions(&pipeline, set);
        assert_relative_eq!(children[0][1], 1.0);
        assert_relative_eq!(children[1][1], 4.0);
        assert!((children[0][0] - 0.1).abs() > 0.0);
    }

    #[test]
    fn zero_probability_keeps_evaluated_parents() {
        let problem = Problem::zdt1(2);
        let (mut pipeline, set) = pipeline(problem, &[&[0.2, 0.4], &[0.4, 0.6]]);
        let config = SbxConfig::new(15.0, 0.0, 1.0, 0.5).unwrap();
        run(&mut pipeline, SbxCrossover::new(config));
        assert_eq!(decisions(&pipeline, set), vec![vec![0.2, 0.4], vec![0.4, 0.6]]);
    }

    #[test]
    fn single_point_children_stay_between_parents() {
        let problem = Problem::zdt1(3);
        let (mut pipeline, set) = pipeline(problem, &[&[0.1, 0.5, 0.9], &[0.3, 0.5, 0.2]]);
        run(&mut pipeline, SinglePointCrossover::new(1.0, 1.0).unwrap());

        let children = decisions(&pipeline, set);
        assert_relative_eq!(children[0][1], 0.5);
        for (i, lo, hi) in [(0, 0.1, 0.3), (2, 0.2, 0.9)] {
            for child in &children {
                assert!(child[i] >= lo - 1e-12 && child[i] <= hi + 1e-12);
            }
            assert_relative_eq!(children[0][i] + children[1][i], lo + hi, epsilon = 1e-12);
        }
    }

    #[test]
    fn lone_mappings_are_skipped() {
        let problem = Problem::zdt1(2);
        let (mut pipeline, set) = pipeline(problem, &[&[0.2, 0.4]]);
        let config = SbxConfig::new(15.0, 1.0, 1.0, 0.5).unwrap();
        run(&mut pipeline, SbxCrossover::new(config));
        assert_eq!(decisions(&pipeline, set), vec![vec![0.2, 0.4]]);
    }

    #[test]
    fn parameters_round_trip_through_the_config() {
        let mut sbx = SbxCrossover::default();
        sbx.set_parameter("DistributionIndex", &ParamValue::Real(20.0)).unwrap();
        sbx.set_parameter("Repair", &ParamValue::from("Truncate")).unwrap();
        assert_relative_eq!(sbx.config().eta(), 20.0);
        assert!(sbx.set_parameter("VariableSwapCrossoverProbability", &ParamValue::Real(-0.1)).is_err());
        assert_eq!(sbx.parameters().len(), 5);
    }
}

use rand::Rng;
use rand::rngs::StdRng;
use strand_core::problem::Variable;
use strand_core::{ElementType, Tag};
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

use super::{MutationConfig, Repair, check_eta, invalid, write_back};
use crate::sampling;

fn perturbation_tags() -> TagConfig {
    TagConfig::new().with_output([Tag::ForPerturbation])
}

/// Mutates every mapping of every output set in place.
///
/// `mutate` sees each variable of a mutated mapping and returns its new
/// value, or `None` to leave it alone. Variable draws are the closure's
/// business, so each operator decides whether the kind check comes first.
fn perturb<F>(
    io: &mut NodeIo<'_>,
    config: MutationConfig,
    repair: Option<Repair>,
    mut mutate: F,
) -> Result<(), OperatorError>
where
    F: FnMut(&mut StdRng, &Variable, f64) -> Option<f64>,
{
    let problem = io.problem();
    while let Some(set) = io.next_output_set() {
        for id in io.members(set) {
            if !sampling::draw(io.rng(), config.solution_probability) {
                continue;
            }
            let before = io.mapping(id)?.decision_values();
            let mut after = before.clone();
            for (value, variable) in after.iter_mut().zip(problem.variables()) {
                if let Some(mutated) = mutate(io.rng(), variable, *value) {
                    *value = mutated;
                }
            }
            if let Some(repair) = repair {
                repair.apply(&mut after, problem.variables(), io.rng());
            }
            write_back(io, id, &before, &after)?;
        }
    }
    Ok(())
}

fn repair_parameter(repair: Repair) -> Parameter {
    Parameter::new("Repair", "Reflect or Truncate.", repair.as_str())
}

fn parse_repair(name: &str, value: &ParamValue) -> Result<Repair, ParamError> {
    value
        .as_text(name)?
        .parse()
        .map_err(|reason: String| ParamError::invalid(name, reason))
}

/// Polynomial mutation of real and integer variables.
///
/// A mutated variable moves towards its lower or upper bound by a
/// polynomially distributed fraction of the distance to that bound; the
/// distribution index controls how small the typical step is.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialMutation {
    config: MutationConfig,
    eta: f64,
    repair: Repair,
}

impl Default for PolynomialMutation {
    fn default() -> Self {
        Self {
            config: MutationConfig::default(),
            eta: 20.0,
            repair: Repair::default(),
        }
    }
}

impl PolynomialMutation {
    /// Creates the mutation with the given distribution index.
    ///
    /// # Errors
    ///
    /// Returns an error if `eta` is negative or not finite.
    pub fn new(config: MutationConfig, eta: f64) -> Result<Self, super::ConfigError> {
        Ok(Self {
            config,
            eta: check_eta(eta)?,
            repair: Repair::default(),
        })
    }

    #[must_use]
    pub fn with_repair(mut self, repair: Repair) -> Self {
        self.repair = repair;
        self
    }

    #[must_use]
    pub fn eta(&self) -> f64 {
        self.eta
    }
}

/// Polynomially mutated `value` for a uniform draw `u`.
fn polynomial_step(value: f64, lower: f64, upper: f64, u: f64, eta: f64) -> f64 {
    let exponent = 1.0 / (eta + 1.0);
    if u <= 0.5 {
        let delta = (2.0 * u).powf(exponent) - 1.0;
        value + delta * (value - lower)
    } else {
        let delta = 1.0 - (2.0 * (1.0 - u)).powf(exponent);
        value + delta * (upper - value)
    }
}

impl Operator for PolynomialMutation {
    fn name(&self) -> &str {
        "PolynomialMutation"
    }

    fn description(&self) -> &str {
        "Bounded polynomial mutation of real and integer variables."
    }

    fn default_tags(&self) -> TagConfig {
        perturbation_tags()
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        let (config, eta) = (self.config, self.eta);
        perturb(io, config, Some(self.repair), |rng, variable, value| {
            if !sampling::draw(rng, config.variable_probability) {
                return None;
            }
            if !matches!(variable.kind, ElementType::Real | ElementType::Integer) {
                return None;
            }
            let u = rng.gen_range(0.0..1.0);
            Some(polynomial_step(value, variable.lower, variable.upper, u, eta))
        })
    }

    fn parameters(&self) -> Vec<Parameter> {
        let mut parameters = self.config.parameters();
        parameters.push(Parameter::new(
            "DistributionIndex",
            "Larger values make smaller steps more likely.",
            self.eta,
        ));
        parameters.push(repair_parameter(self.repair));
        parameters
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "DistributionIndex" => self.eta = check_eta(value.as_f64(name)?).map_err(invalid(name))?,
            "Repair" => self.repair = parse_repair(name, value)?,
            _ => self.config.set_parameter(name, value)?,
        }
        Ok(())
    }
}

/// Integer mutation for integer and ordinal variables.
///
/// A mutated variable moves by the difference of two geometrically
/// distributed integers, so small steps in either direction dominate. The
/// mean step grows with the step size; a negative step size derives it from
/// the variable's range and `width_percent`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegerMutation {
    config: MutationConfig,
    step_size: f64,
    width_percent: f64,
    repair: Repair,
}

impl Default for IntegerMutation {
    fn default() -> Self {
        Self {
            config: MutationConfig::default(),
            step_size: -1.0,
            width_percent: 0.1,
            repair: Repair::default(),
        }
    }
}

impl IntegerMutation {
    #[must_use]
    pub fn new(config: MutationConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    #[must_use]
    pub fn with_width_percent(mut self, width_percent: f64) -> Self {
        self.width_percent = width_percent;
        self
    }
}

fn is_integral(kind: ElementType) -> bool {
    matches!(kind, ElementType::Integer | ElementType::Ordinal)
}

/// Number of failures before the first success, for success probability `phi`.
fn geometric(rng: &mut StdRng, phi: f64) -> f64 {
    let u: f64 = rng.gen_range(0.0..1.0);
    ((1.0 - u).ln() / (1.0 - phi).ln()).floor()
}

impl Operator for IntegerMutation {
    fn name(&self) -> &str {
        "IntegerMutation"
    }

    fn description(&self) -> &str {
        "Two-sided geometric mutation of integer and ordinal variables."
    }

    fn default_tags(&self) -> TagConfig {
        perturbation_tags()
    }

    #[allow(clippy::cast_precision_loss)]
    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        let count = io
            .problem()
            .variables()
            .iter()
            .filter(|v| is_integral(v.kind))
            .count();
        if count == 0 {
            return Ok(());
        }

        let Self {
            config,
            step_size,
            width_percent,
            repair,
        } = *self;
        perturb(io, config, Some(repair), |rng, variable, value| {
            if !sampling::draw(rng, config.variable_probability) || !is_integral(variable.kind) {
                return None;
            }
            let step = if step_size < 0.0 {
                width_percent * variable.width()
            } else {
                step_size
            };
            let tp = step.max(1.0) / count as f64;
            let phi = 1.0 - tp / (1.0 + (1.0 + tp * tp).sqrt());
            let g1 = geometric(rng, phi);
            let g2 = geometric(rng, phi);
            Some(value + g1 - g2)
        })
    }

    fn parameters(&self) -> Vec<Parameter> {
        let mut parameters = self.config.parameters();
        parameters.push(Parameter::new(
            "StepSize",
            "Mean mutation step; negative derives it from the variable range.",
            self.step_size,
        ));
        parameters.push(Parameter::new(
            "WidthPercent",
            "Share of the variable range used as step size when none is given.",
            self.width_percent,
        ));
        parameters.push(repair_parameter(self.repair));
        parameters
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "StepSize" => self.step_size = value.as_f64(name)?,
            "WidthPercent" => {
                let percent = value.as_f64(name)?;
                if !percent.is_finite() || percent < 0.0 {
                    return Err(ParamError::invalid(name, "must be a non-negative number"));
                }
                self.width_percent = percent;
            }
            "Repair" => self.repair = parse_repair(name, value)?,
            _ => self.config.set_parameter(name, value)?,
        }
        Ok(())
    }
}

/// Resamples nominal and ordinal variables uniformly inside their range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoricalPerturbation {
    config: MutationConfig,
}

impl CategoricalPerturbation {
    #[must_use]
    pub fn new(config: MutationConfig) -> Self {
        Self { config }
    }
}

impl Operator for CategoricalPerturbation {
    fn name(&self) -> &str {
        "CategoricalPerturbation"
    }

    fn description(&self) -> &str {
        "Uniform resampling of nominal and ordinal variables."
    }

    fn default_tags(&self) -> TagConfig {
        perturbation_tags()
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        let config = self.config;
        perturb(io, config, None, |rng, variable, _| {
            if !matches!(variable.kind, ElementType::Nominal | ElementType::Ordinal) {
                return None;
            }
            if !sampling::draw(rng, config.variable_probability) {
                return None;
            }
            Some(sampling::value_in(rng, variable.kind, variable.lower, variable.upper))
        })
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.config.parameters()
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        self.config.set_parameter(name, value)
    }
}

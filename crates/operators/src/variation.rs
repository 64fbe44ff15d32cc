//! Variation operators.
//!
//! Direction operators recombine the first two mappings of each output set;
//! perturbation operators mutate every mapping of each output set. Both act
//! in place, so the sets they work on are expected to hold clones made by a
//! filtration. Changed decision variables invalidate the mapping's outputs.
//!
//! - [`SbxCrossover`] — simulated binary crossover.
//! - [`SinglePointCrossover`] — uniform blend of two parents.
//! - [`PolynomialMutation`] — bounded polynomial mutation of real and integer
//!   variables.
//! - [`IntegerMutation`] — two-sided geometric steps for integer and ordinal
//!   variables.
//! - [`CategoricalPerturbation`] — uniform resampling of nominal and ordinal
//!   variables.

mod crossover;
mod mutation;
pub mod repair;

pub use crossover::{SbxCrossover, SinglePointCrossover};
pub use mutation::{CategoricalPerturbation, IntegerMutation, PolynomialMutation};
pub use repair::Repair;

use strand_core::MappingId;
use strand_pipeline::{NodeIo, OperatorError, ParamError, ParamValue, Parameter};
use thiserror::Error;

/// Errors that can occur when validating a variation config.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("distribution index must be non-negative and finite, got {0}")]
    DistributionIndex(f64),

    #[error("{name} must lie in [0, 1], got {value}")]
    Probability { name: &'static str, value: f64 },
}

fn check_probability(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Probability { name, value })
    }
}

fn check_eta(eta: f64) -> Result<f64, ConfigError> {
    if eta.is_finite() && eta >= 0.0 {
        Ok(eta)
    } else {
        Err(ConfigError::DistributionIndex(eta))
    }
}

fn invalid(name: &str) -> impl FnOnce(ConfigError) -> ParamError + '_ {
    move |error| ParamError::invalid(name, error.to_string())
}

/// Configuration for [`SbxCrossover`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SbxConfig {
    eta: f64,
    solution_probability: f64,
    variable_probability: f64,
    swap_probability: f64,
}

impl Default for SbxConfig {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(15.0, 0.9, 0.5, 0.5).unwrap()
    }
}

impl SbxConfig {
    /// Creates a new SBX config.
    ///
    /// # Errors
    ///
    /// Returns an error if the distribution index is negative or not finite,
    /// or if a probability lies outside `[0, 1]`.
    pub fn new(
        eta: f64,
        solution_probability: f64,
        variable_probability: f64,
        swap_probability: f64,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            eta: check_eta(eta)?,
            solution_probability: check_probability("solution probability", solution_probability)?,
            variable_probability: check_probability("variable probability", variable_probability)?,
            swap_probability: check_probability("swap probability", swap_probability)?,
        })
    }

    /// Returns the distribution index; larger values keep children closer to
    /// their parents.
    #[must_use]
    pub fn eta(&self) -> f64 {
        self.eta
    }

    /// Returns the probability of recombining a pair of mappings.
    #[must_use]
    pub fn solution_probability(&self) -> f64 {
        self.solution_probability
    }

    /// Returns the probability of recombining each variable of a pair.
    #[must_use]
    pub fn variable_probability(&self) -> f64 {
        self.variable_probability
    }

    /// Returns the probability of swapping the children of a variable.
    #[must_use]
    pub fn swap_probability(&self) -> f64 {
        self.swap_probability
    }
}

/// Probabilities shared by the perturbation operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationConfig {
    solution_probability: f64,
    variable_probability: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(1.0, 0.1).unwrap()
    }
}

impl MutationConfig {
    /// Creates a new mutation config.
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

    /// Returns the probability of mutating a mapping.
    #[must_use]
    pub fn solution_probability(&self) -> f64 {
        self.solution_probability
    }

    /// Returns the probability of mutating each variable of a mutated
    /// mapping.
    #[must_use]
    pub fn variable_probability(&self) -> f64 {
        self.variable_probability
    }

    fn parameters(self) -> Vec<Parameter> {
        vec![
            Parameter::new(
                "SolutionMutationProbability",
                "Probability of mutating a mapping.",
                self.solution_probability,
            ),
            Parameter::new(
                "VariableMutationProbability",
                "Probability of mutating each variable of a mapping.",
                self.variable_probability,
            ),
        ]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        let updated = match name {
            "SolutionMutationProbability" => {
                Self::new(value.as_f64(name)?, self.variable_probability)
            }
            "VariableMutationProbability" => {
                Self::new(self.solution_probability, value.as_f64(name)?)
            }
            _ => return Err(ParamError::Unknown(name.to_owned())),
        };
        *self = updated.map_err(invalid(name))?;
        Ok(())
    }
}

/// Writes the variables of `after` that differ from `before` into a mapping.
///
/// Untouched mappings keep their evaluated outputs.
#[allow(clippy::float_cmp)]
fn write_back(
    io: &mut NodeIo<'_>,
    id: MappingId,
    before: &[f64],
    after: &[f64],
) -> Result<(), OperatorError> {
    let mapping = io.mapping_mut(id)?;
    for (i, (old, new)) in before.iter().zip(after).enumerate() {
        if old != new {
            mapping.set_decision_value(i, *new);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configs_validate_their_inputs() {
        assert!(SbxConfig::new(-1.0, 0.9, 0.5, 0.5).is_err());
        assert!(SbxConfig::new(f64::INFINITY, 0.9, 0.5, 0.5).is_err());
        assert_eq!(
            SbxConfig::new(15.0, 1.2, 0.5, 0.5),
            Err(ConfigError::Probability {
                name: "solution probability",
                value: 1.2
            })
        );
        assert!(MutationConfig::new(1.0, f64::NAN).is_err());

        let config = SbxConfig::default();
        assert_eq!(config.eta(), 15.0);
        assert_eq!(config.swap_probability(), 0.5);
    }

    #[test]
    fn mutation_parameters_are_validated() {
        let mut config = MutationConfig::default();
        config
            .set_parameter("VariableMutationProbability", &ParamValue::Real(0.3))
            .unwrap();
        assert_eq!(config.variable_probability(), 0.3);

        let err = config
            .set_parameter("SolutionMutationProbability", &ParamValue::Real(2.0))
            .unwrap_err();
        assert!(matches!(err, ParamError::Invalid { .. }));
        assert_eq!(config.solution_probability(), 1.0);
    }
}

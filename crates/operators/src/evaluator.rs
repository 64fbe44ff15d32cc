//! Evaluation of pending mappings.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use strand_core::log::report_evaluation;
use strand_core::{EvaluationError, MappingId, Problem, ProblemError, SetId, Tag};
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};
use thiserror::Error;
use tracing::{debug, warn};

/// Configuration for the [`Evaluator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorConfig {
    parallel: bool,
    count_evaluations: bool,
    count_per_function: bool,
}

/// Errors that can occur when validating an evaluator config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("per-function counting requires evaluation counting")]
    PerFunctionWithoutCounting,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(false, true, false).unwrap()
    }
}

impl EvaluatorConfig {
    /// Creates a new evaluator config.
    ///
    /// # Errors
    ///
    /// Returns an error if per-function counting is requested while counting
    /// is off.
    pub fn new(
        parallel: bool,
        count_evaluations: bool,
        count_per_function: bool,
    ) -> Result<Self, ConfigError> {
        if count_per_function && !count_evaluations {
            return Err(ConfigError::PerFunctionWithoutCounting);
        }
        Ok(Self {
            parallel,
            count_evaluations,
            count_per_function,
        })
    }

    /// Returns `true` if mappings are evaluated on the rayon pool.
    #[must_use]
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Returns `true` if evaluations are charged to the budget.
    #[must_use]
    pub fn count_evaluations(&self) -> bool {
        self.count_evaluations
    }

    /// Returns `true` if each function call is charged, rather than each
    /// mapping.
    #[must_use]
    pub fn count_per_function(&self) -> bool {
        self.count_per_function
    }
}

/// What the [`Evaluator`] does with mappings whose functions failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidMappings {
    /// Give them the anti-ideal objectives so they lose every comparison.
    #[default]
    Deteriorate,
    /// Drop them from every set.
    Remove,
    /// Reset them so the next pass evaluates them again.
    Ignore,
}

impl InvalidMappings {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deteriorate => "Deteriorate",
            Self::Remove => "Remove",
            Self::Ignore => "Ignore",
        }
    }
}

impl fmt::Display for InvalidMappings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvalidMappings {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Deteriorate" => Ok(Self::Deteriorate),
            "Remove" => Ok(Self::Remove),
            "Ignore" => Ok(Self::Ignore),
            other => Err(format!("unknown invalid-mapping policy `{other}`")),
        }
    }
}

/// Evaluates every mapping of its output sets that has pending outputs.
///
/// Evaluations are charged to the shared budget once per output set. Every
/// successful evaluation updates the ideal, nadir and anti-ideal vectors and
/// is reported to the context's log sink. With a single objective the cost
/// of each mapping is its objective and the set is tagged
/// [`Tag::Fitness`].
///
/// A function that fails marks its mapping as unsuccessful. The attempt is
/// still charged, and the mapping is then handled by the node's
/// [`InvalidMappings`] policy. A binding that does not match its function
/// fails the node.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvaluatorConfig,
    invalid: InvalidMappings,
}

impl Evaluator {
    #[must_use]
    pub fn new(config: EvaluatorConfig) -> Self {
        Self {
            config,
            invalid: InvalidMappings::default(),
        }
    }

    #[must_use]
    pub fn with_invalid_mappings(mut self, policy: InvalidMappings) -> Self {
        self.invalid = policy;
        self
    }

    #[must_use]
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    #[must_use]
    pub fn invalid_mappings(&self) -> InvalidMappings {
        self.invalid
    }

    fn handle_failures(&self, io: &mut NodeIo<'_>, failed: &[MappingId], single_objective: bool) {
        warn!(failed = failed.len(), policy = %self.invalid, "mappings failed to evaluate");
        match self.invalid {
            InvalidMappings::Deteriorate => {
                io.state_mut().deteriorate_invalid_mappings();
                if single_objective {
                    for &id in failed {
                        let Some(mapping) = io.population_mut().mapping_mut(id) else {
                            continue;
                        };
                        if mapping.is_objective_evaluated(0) {
                            mapping.define_cost(mapping.objectives()[0]);
                        }
                    }
                }
            }
            InvalidMappings::Remove => io.state_mut().remove_invalid_mappings(),
            InvalidMappings::Ignore => io.state_mut().ignore_unsuccessful_evaluations(),
        }
    }

    fn evaluate_set(
        &self,
        io: &mut NodeIo<'_>,
        problem: &Problem,
        set: SetId,
    ) -> Result<(), OperatorError> {
        let mut pending: Vec<MappingId> = Vec::new();
        for id in io.members(set) {
            if !pending.contains(&id) && !io.mapping(id)?.is_evaluated() {
                pending.push(id);
            }
        }
        if pending.is_empty() {
            return Ok(());
        }

        let results = {
            let mappings = io
                .population_mut()
                .mappings_mut(&pending)
                .ok_or_else(|| OperatorError::domain("stale mapping handle"))?;
            if self.config.parallel {
                mappings
                    .into_par_iter()
                    .map(|mapping| mapping.evaluate(problem))
                    .collect::<Vec<_>>()
            } else {
                mappings
                    .into_iter()
                    .map(|mapping| mapping.evaluate(problem))
                    .collect::<Vec<_>>()
            }
        };

        let single_objective = problem.objective_len() == 1;
        let iteration = io.state().current_iteration().to_string();
        let mut cost = 0;
        let mut failed = Vec::new();
        let mut failure = None;

        for (&id, result) in pending.iter().zip(results) {
            let records = match result {
                Ok(records) => records,
                Err(EvaluationError::Function { function, source }) => {
                    debug!(%function, error = %source, "function evaluation failed");
                    if self.config.count_evaluations {
                        cost += 1;
                    }
                    failed.push(id);
                    continue;
                }
                Err(error) => {
                    failure.get_or_insert(error);
                    continue;
                }
            };
            if records.is_empty() {
                continue;
            }

            if self.config.count_evaluations {
                cost += if self.config.count_per_function {
                    records.len()
                } else {
                    1
                };
            }
            for mut record in records {
                record.fields.insert("iteration".into(), iteration.clone());
                report_evaluation(io.log(), &record);
            }

            if single_objective {
                let mapping = io.mapping_mut(id)?;
                if let Some(&objective) = mapping.objectives().first() {
                    mapping.define_cost(objective);
                }
            }
            io.state_mut().update_ideal_nadir(id);
        }

        io.state_mut().decrement_budget(cost);
        if !failed.is_empty() {
            self.handle_failures(io, &failed, single_objective);
        }
        if single_objective {
            io.population_mut().tag_set(set, Tag::Fitness);
        }
        debug!(evaluated = pending.len(), failed = failed.len(), cost, "output set evaluated");

        match failure {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }
}

impl Operator for Evaluator {
    fn name(&self) -> &str {
        "Evaluator"
    }

    fn description(&self) -> &str {
        "Evaluates every mapping with pending outputs and charges the budget."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new().with_output([Tag::ForEvaluation])
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        let problem = io.problem();
        if problem.functions().is_empty() {
            return Err(ProblemError::NoFunctions.into());
        }
        while let Some(set) = io.next_output_set() {
            self.evaluate_set(io, &problem, set)?;
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new("Parallel", "Evaluate mappings on a worker pool.", self.config.parallel),
            Parameter::new(
                "CountEvaluations",
                "Charge evaluations to the budget.",
                self.config.count_evaluations,
            ),
            Parameter::new(
                "CountPerFunction",
                "Charge every function call instead of every mapping.",
                self.config.count_per_function,
            ),
            Parameter::new(
                "InvalidMappings",
                "Deteriorate, Remove or Ignore mappings whose functions failed.",
                self.invalid.as_str(),
            ),
        ]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        if name == "InvalidMappings" {
            self.invalid = value
                .as_text(name)?
                .parse()
                .map_err(|reason: String| ParamError::invalid(name, reason))?;
            return Ok(());
        }
        let EvaluatorConfig {
            mut parallel,
            mut count_evaluations,
            mut count_per_function,
        } = self.config;
        match name {
            "Parallel" => parallel = value.as_bool(name)?,
            "CountEvaluations" => count_evaluations = value.as_bool(name)?,
            "CountPerFunction" => count_per_function = value.as_bool(name)?,
            _ => return Err(ParamError::Unknown(name.to_owned())),
        }
        self.config = EvaluatorConfig::new(parallel, count_evaluations, count_per_function)
            .map_err(|error| ParamError::invalid(name, error.to_string()))?;
        Ok(())
    }
}

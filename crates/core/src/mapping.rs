use thiserror::Error;

use crate::log::{EvaluationRecord, Fields};
use crate::problem::{FunctionError, InputSource, OptimizationType, OutputTarget, Problem};
use crate::{Element, Handle, Outcome};

/// A stable handle to a [`Mapping`] stored in a population.
pub type MappingId = Handle<Mapping>;

/// Result of an external validation pass over a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationStatus {
    #[default]
    NotValidated,
    Validated,
    Invalid,
}

/// Errors that can occur while evaluating a mapping.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The binding routes a different number of inputs than the function takes.
    #[error("function `{function}` takes {expected} inputs but {actual} are bound")]
    InputSize {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// The binding routes a different number of outputs than the function returns.
    #[error("function `{function}` returns {expected} outputs but {actual} are bound")]
    OutputSize {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// The binding reads or writes a slot the mapping does not have.
    #[error("function `{function}` refers to a missing slot")]
    MissingSlot { function: String },

    /// The function itself failed.
    #[error("function `{function}` failed")]
    Function {
        function: String,
        #[source]
        source: FunctionError,
    },
}

/// A candidate solution.
///
/// A mapping holds decision variables and parameters (its inputs) and the
/// objectives, constraints and auxiliary outputs produced by evaluating the
/// problem's functions. Each output slot tracks whether it has been evaluated,
/// so a mapping can be partially evaluated and completed later.
///
/// Objectives are stored in minimization space.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    decision: Vec<Element>,
    parameters: Vec<Element>,
    objectives: Vec<f64>,
    constraints: Vec<f64>,
    auxiliary: Vec<Element>,
    objective_evaluated: Vec<bool>,
    constraint_evaluated: Vec<bool>,
    auxiliary_evaluated: Vec<bool>,
    weights: Vec<f64>,
    cost: Option<f64>,
    optimization: bool,
    scalarised: bool,
    validation: ValidationStatus,
    successful: bool,
}

impl Mapping {
    /// Creates an unevaluated mapping shaped for `problem`.
    ///
    /// Decision variables start at their lower bounds.
    #[must_use]
    pub fn new(problem: &Problem) -> Self {
        let decision = problem
            .variables()
            .iter()
            .map(|var| Element::of_type(var.kind, var.lower))
            .collect();

        Self {
            decision,
            parameters: problem.parameters().to_vec(),
            objectives: vec![0.0; problem.objective_len()],
            constraints: vec![0.0; problem.constraint_len()],
            auxiliary: vec![Element::default(); problem.auxiliary_len()],
            objective_evaluated: vec![false; problem.objective_len()],
            constraint_evaluated: vec![false; problem.constraint_len()],
            auxiliary_evaluated: vec![false; problem.auxiliary_len()],
            weights: Vec::new(),
            cost: None,
            optimization: true,
            scalarised: false,
            validation: ValidationStatus::NotValidated,
            successful: true,
        }
    }

    #[must_use]
    pub fn decision(&self) -> &[Element] {
        &self.decision
    }

    /// Returns decision variable values as `f64`.
    #[must_use]
    pub fn decision_values(&self) -> Vec<f64> {
        self.decision.iter().map(Element::value).collect()
    }

    /// Replaces a decision variable, invalidating all outputs.
    ///
    /// Returns `false` if `index` is out of range.
    pub fn define_decision(&mut self, index: usize, value: Element) -> bool {
        let Some(slot) = self.decision.get_mut(index) else {
            return false;
        };
        *slot = value;
        self.invalidate();
        true
    }

    /// Sets a decision variable's value, keeping its kind.
    ///
    /// Returns `false` if `index` is out of range.
    pub fn set_decision_value(&mut self, index: usize, value: f64) -> bool {
        match self.decision.get(index) {
            Some(current) => {
                let next = current.with_value(value);
                self.define_decision(index, next)
            }
            None => false,
        }
    }

    #[must_use]
    pub fn parameters(&self) -> &[Element] {
        &self.parameters
    }

    /// Returns the objectives in minimization space.
    #[must_use]
    pub fn objectives(&self) -> &[f64] {
        &self.objectives
    }

    /// Returns the objectives in each objective's own direction.
    #[must_use]
    pub fn reported_objectives(&self, problem: &Problem) -> Vec<f64> {
        self.objectives
            .iter()
            .zip(problem.objectives())
            .map(|(&value, objective)| match objective.direction {
                OptimizationType::Minimize => value,
                OptimizationType::Maximize => -value,
            })
            .collect()
    }

    /// Overwrites an objective (in minimization space) and marks it evaluated.
    pub fn define_objective(&mut self, index: usize, value: f64) {
        if let Some(slot) = self.objectives.get_mut(index) {
            *slot = value;
            self.objective_evaluated[index] = true;
            self.scalarised = false;
        }
    }

    #[must_use]
    pub fn constraints(&self) -> &[f64] {
        &self.constraints
    }

    /// Overwrites a constraint value and marks it evaluated.
    pub fn define_constraint(&mut self, index: usize, value: f64) {
        if let Some(slot) = self.constraints.get_mut(index) {
            *slot = value;
            self.constraint_evaluated[index] = true;
        }
    }

    #[must_use]
    pub fn auxiliary(&self) -> &[Element] {
        &self.auxiliary
    }

    /// Returns a borrowed view of objectives and constraints for comparison.
    #[must_use]
    pub fn outcome(&self) -> Outcome<'_> {
        Outcome::new(&self.objectives, &self.constraints)
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn define_weights(&mut self, weights: Vec<f64>) {
        self.weights = weights;
        self.scalarised = false;
    }

    #[must_use]
    pub fn cost(&self) -> Option<f64> {
        self.cost
    }

    pub fn define_cost(&mut self, cost: f64) {
        self.cost = Some(cost);
    }

    pub fn clear_cost(&mut self) {
        self.cost = None;
    }

    /// Returns `true` if every objective, constraint and auxiliary output has
    /// been evaluated.
    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.objective_evaluated
            .iter()
            .chain(&self.constraint_evaluated)
            .chain(&self.auxiliary_evaluated)
            .all(|&done| done)
    }

    #[must_use]
    pub fn is_objective_evaluated(&self, index: usize) -> bool {
        self.objective_evaluated.get(index).copied().unwrap_or(false)
    }

    /// Marks every output as pending and drops the cost.
    pub fn invalidate(&mut self) {
        self.objective_evaluated.fill(false);
        self.constraint_evaluated.fill(false);
        self.auxiliary_evaluated.fill(false);
        self.cost = None;
        self.scalarised = false;
        self.validation = ValidationStatus::NotValidated;
        self.successful = true;
    }

    #[must_use]
    pub fn is_scalarised(&self) -> bool {
        self.scalarised
    }

    pub fn set_scalarised(&mut self, scalarised: bool) {
        self.scalarised = scalarised;
    }

    #[must_use]
    pub fn is_optimization_mapping(&self) -> bool {
        self.optimization
    }

    pub fn set_optimization_mapping(&mut self, optimization: bool) {
        self.optimization = optimization;
    }

    #[must_use]
    pub fn validation(&self) -> ValidationStatus {
        self.validation
    }

    pub fn set_validation(&mut self, status: ValidationStatus) {
        self.validation = status;
    }

    #[must_use]
    pub fn is_successful_evaluation(&self) -> bool {
        self.successful
    }

    pub fn set_successful_evaluation(&mut self, successful: bool) {
        self.successful = successful;
    }

    /// Returns `true` if every constraint is at or below its threshold.
    ///
    /// Missing thresholds are treated as zero.
    #[must_use]
    pub fn is_feasible(&self, thresholds: &[f64]) -> bool {
        self.outcome().is_feasible(thresholds)
    }

    /// Evaluates every function with at least one pending output.
    ///
    /// Outputs routed to maximized objectives are negated. Returns one record
    /// per function call, so the number of calls is the record count.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationError`] if a binding does not match its function
    /// or if a function fails. A failing function marks the mapping as an
    /// unsuccessful evaluation.
    pub fn evaluate(&mut self, problem: &Problem) -> Result<Vec<EvaluationRecord>, EvaluationError> {
        let mut records = Vec::new();

        for binding in problem.functions() {
            if !self.is_pending(binding.outputs()) {
                continue;
            }

            let function = binding.function();
            let name = function.name().to_owned();

            if binding.inputs().len() != function.input_len() {
                return Err(EvaluationError::InputSize {
                    function: name,
                    expected: function.input_len(),
                    actual: binding.inputs().len(),
                });
            }
            if binding.outputs().len() != function.output_len() {
                return Err(EvaluationError::OutputSize {
                    function: name,
                    expected: function.output_len(),
                    actual: binding.outputs().len(),
                });
            }

            let inputs = binding
                .inputs()
                .iter()
                .map(|source| match *source {
                    InputSource::Decision(i) => self.decision.get(i).copied(),
                    InputSource::Parameter(i) => self.parameters.get(i).copied(),
                })
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| EvaluationError::MissingSlot {
                    function: name.clone(),
                })?;

            let mut outputs = vec![Element::default(); function.output_len()];
            if let Err(source) = function.evaluate(&inputs, &mut outputs) {
                self.successful = false;
                return Err(EvaluationError::Function {
                    function: name,
                    source,
                });
            }

            self.store_outputs(problem, binding.outputs(), &outputs)
                .ok_or_else(|| EvaluationError::MissingSlot {
                    function: name.clone(),
                })?;

            records.push(EvaluationRecord {
                function: name,
                inputs,
                outputs,
                fields: Fields::new(),
            });
        }

        if !records.is_empty() {
            self.scalarised = false;
            self.successful = true;
        }
        Ok(records)
    }

    fn is_pending(&self, targets: &[OutputTarget]) -> bool {
        targets.iter().any(|target| match *target {
            OutputTarget::Objective(i) => !self.objective_evaluated.get(i).copied().unwrap_or(true),
            OutputTarget::Constraint(i) => !self.constraint_evaluated.get(i).copied().unwrap_or(true),
            OutputTarget::Auxiliary(i) => !self.auxiliary_evaluated.get(i).copied().unwrap_or(true),
            OutputTarget::Ignored => false,
        })
    }

    fn store_outputs(
        &mut self,
        problem: &Problem,
        targets: &[OutputTarget],
        outputs: &[Element],
    ) -> Option<()> {
        for (target, value) in targets.iter().zip(outputs) {
            match *target {
                OutputTarget::Objective(i) => {
                    let direction = problem.objectives().get(i)?.direction;
                    let value = match direction {
                        OptimizationType::Minimize => value.value(),
                        OptimizationType::Maximize => -value.value(),
                    };
                    *self.objectives.get_mut(i)? = value;
                    self.objective_evaluated[i] = true;
                }
                OutputTarget::Constraint(i) => {
                    *self.constraints.get_mut(i)? = value.value();
                    self.constraint_evaluated[i] = true;
                }
                OutputTarget::Auxiliary(i) => {
                    *self.auxiliary.get_mut(i)? = *value;
                    self.auxiliary_evaluated[i] = true;
                }
                OutputTarget::Ignored => {}
            }
        }
        Some(())
    }
}

//! Problem definitions: variables, objectives, constraints, and the functions
//! that evaluate them.

mod builtin;
mod function;
mod registry;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Element, ElementType};

pub use builtin::{Ctp1, Dtlz2, Zdt1};
pub use function::{FnFunction, Function, FunctionError};
pub use registry::FunctionRegistry;

/// Whether an objective is minimized or maximized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OptimizationType {
    #[default]
    Minimize,
    Maximize,
}

/// A bounded decision variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: ElementType,
    pub lower: f64,
    pub upper: f64,
}

impl Variable {
    #[must_use]
    pub fn real(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            kind: ElementType::Real,
            lower,
            upper,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn integer(name: impl Into<String>, lower: i64, upper: i64) -> Self {
        Self {
            name: name.into(),
            kind: ElementType::Integer,
            lower: lower as f64,
            upper: upper as f64,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ordinal(name: impl Into<String>, levels: i64) -> Self {
        Self {
            name: name.into(),
            kind: ElementType::Ordinal,
            lower: 0.0,
            upper: (levels - 1) as f64,
        }
    }

    /// Creates a nominal variable with categories labelled `0..categories`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn nominal(name: impl Into<String>, categories: i64) -> Self {
        Self {
            name: name.into(),
            kind: ElementType::Nominal,
            lower: 0.0,
            upper: (categories - 1) as f64,
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// An objective and its decision-maker preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub name: String,
    pub direction: OptimizationType,

    /// Target value, in the objective's own direction.
    pub goal: Option<f64>,

    /// Preference priority; higher values are considered first.
    pub priority: u32,
}

impl Objective {
    #[must_use]
    pub fn minimize(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: OptimizationType::Minimize,
            goal: None,
            priority: 1,
        }
    }

    #[must_use]
    pub fn maximize(name: impl Into<String>) -> Self {
        Self {
            direction: OptimizationType::Maximize,
            ..Self::minimize(name)
        }
    }

    #[must_use]
    pub fn with_goal(mut self, goal: f64) -> Self {
        self.goal = Some(goal);
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// An inequality constraint, feasible when its value is at or below `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub threshold: f64,
}

impl Constraint {
    #[must_use]
    pub fn new(name: impl Into<String>, threshold: f64) -> Self {
        Self {
            name: name.into(),
            threshold,
        }
    }
}

/// Where a function input is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Decision(usize),
    Parameter(usize),
}

/// Where a function output is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTarget {
    Objective(usize),
    Constraint(usize),
    Auxiliary(usize),
    Ignored,
}

/// A function together with the routing of its inputs and outputs.
#[derive(Clone)]
pub struct FunctionBinding {
    function: Arc<dyn Function>,
    inputs: Vec<InputSource>,
    outputs: Vec<OutputTarget>,
}

impl FunctionBinding {
    #[must_use]
    pub fn new(
        function: Arc<dyn Function>,
        inputs: Vec<InputSource>,
        outputs: Vec<OutputTarget>,
    ) -> Self {
        Self {
            function,
            inputs,
            outputs,
        }
    }

    /// Binds inputs to decision variables and outputs to objectives, in order.
    #[must_use]
    pub fn direct(function: Arc<dyn Function>) -> Self {
        let inputs = (0..function.input_len()).map(InputSource::Decision).collect();
        let outputs = (0..function.output_len())
            .map(OutputTarget::Objective)
            .collect();
        Self::new(function, inputs, outputs)
    }

    #[must_use]
    pub fn function(&self) -> &dyn Function {
        self.function.as_ref()
    }

    #[must_use]
    pub fn inputs(&self) -> &[InputSource] {
        &self.inputs
    }

    #[must_use]
    pub fn outputs(&self) -> &[OutputTarget] {
        &self.outputs
    }
}

impl fmt::Debug for FunctionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionBinding")
            .field("function", &self.function.name())
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// Reasons a problem cannot be evaluated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProblemError {
    #[error("no evaluation functions are registered")]
    NoFunctions,

    #[error("no decision variables are defined")]
    NoVariables,

    #[error("no objectives are defined")]
    NoObjectives,

    #[error("variable `{0}` has invalid bounds")]
    InvalidBounds(String),

    #[error("function `{function}` takes {expected} inputs but {actual} are bound")]
    InputCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("function `{function}` returns {expected} outputs but {actual} are bound")]
    OutputCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("function `{0}` routes to a slot the problem does not define")]
    MissingSlot(String),

    #[error("objective `{0}` is not produced by any function")]
    UnboundObjective(String),
}

/// An optimization problem.
///
/// Built with chained `with_*` calls and checked with [`Problem::validate`].
/// Objectives are minimized internally: outputs routed to a maximized
/// objective are negated when written to a mapping, and goals are reported in
/// that same minimization space by [`Problem::goals`].
#[derive(Debug, Clone, Default)]
pub struct Problem {
    variables: Vec<Variable>,
    parameters: Vec<Element>,
    objectives: Vec<Objective>,
    constraints: Vec<Constraint>,
    auxiliary_len: usize,
    functions: Vec<FunctionBinding>,
}

impl Problem {
    /// Creates an empty, undefined problem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ZDT1 over `n` real variables in `[0, 1]`.
    #[must_use]
    pub fn zdt1(n: usize) -> Self {
        let function = Arc::new(Zdt1::new(n));
        Self::new()
            .with_variables((0..function.input_len()).map(|i| Variable::real(format!("x{i}"), 0.0, 1.0)))
            .with_objective(Objective::minimize("f1"))
            .with_objective(Objective::minimize("f2"))
            .with_function(FunctionBinding::direct(function))
    }

    /// DTLZ2 with `n` real variables in `[0, 1]` and `m` objectives.
    #[must_use]
    pub fn dtlz2(n: usize, m: usize) -> Self {
        let function = Arc::new(Dtlz2::new(n, m));
        Self::new()
            .with_variables((0..function.input_len()).map(|i| Variable::real(format!("x{i}"), 0.0, 1.0)))
            .with_objectives((0..function.output_len()).map(|j| Objective::minimize(format!("f{}", j + 1))))
            .with_function(FunctionBinding::direct(function))
    }

    /// CTP1 with its two constraints.
    #[must_use]
    pub fn ctp1() -> Self {
        let outputs = vec![
            OutputTarget::Objective(0),
            OutputTarget::Objective(1),
            OutputTarget::Constraint(0),
            OutputTarget::Constraint(1),
        ];
        let binding = FunctionBinding::new(
            Arc::new(Ctp1),
            vec![InputSource::Decision(0), InputSource::Decision(1)],
            outputs,
        );
        Self::new()
            .with_variable(Variable::real("x1", 0.0, 1.0))
            .with_variable(Variable::real("x2", 0.0, 1.0))
            .with_objective(Objective::minimize("f1"))
            .with_objective(Objective::minimize("f2"))
            .with_constraint(Constraint::new("c1", 0.0))
            .with_constraint(Constraint::new("c2", 0.0))
            .with_function(binding)
    }

    #[must_use]
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    #[must_use]
    pub fn with_variables(mut self, variables: impl IntoIterator<Item = Variable>) -> Self {
        self.variables.extend(variables);
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, value: Element) -> Self {
        self.parameters.push(value);
        self
    }

    #[must_use]
    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objectives.push(objective);
        self
    }

    #[must_use]
    pub fn with_objectives(mut self, objectives: impl IntoIterator<Item = Objective>) -> Self {
        self.objectives.extend(objectives);
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Reserves `len` auxiliary output slots.
    #[must_use]
    pub fn with_auxiliary(mut self, len: usize) -> Self {
        self.auxiliary_len = len;
        self
    }

    #[must_use]
    pub fn with_function(mut self, binding: FunctionBinding) -> Self {
        self.functions.push(binding);
        self
    }

    /// Checks that the problem is fully defined.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProblemError`] found.
    pub fn validate(&self) -> Result<(), ProblemError> {
        if self.variables.is_empty() {
            return Err(ProblemError::NoVariables);
        }
        if self.objectives.is_empty() {
            return Err(ProblemError::NoObjectives);
        }
        if self.functions.is_empty() {
            return Err(ProblemError::NoFunctions);
        }

        for var in &self.variables {
            if !var.lower.is_finite() || !var.upper.is_finite() || var.lower > var.upper {
                return Err(ProblemError::InvalidBounds(var.name.clone()));
            }
        }

        let mut covered = vec![false; self.objectives.len()];
        for binding in &self.functions {
            let function = binding.function();
            let name = function.name().to_owned();

            if binding.inputs.len() != function.input_len() {
                return Err(ProblemError::InputCount {
                    function: name,
                    expected: function.input_len(),
                    actual: binding.inputs.len(),
                });
            }
            if binding.outputs.len() != function.output_len() {
                return Err(ProblemError::OutputCount {
                    function: name,
                    expected: function.output_len(),
                    actual: binding.outputs.len(),
                });
            }

            let inputs_ok = binding.inputs.iter().all(|source| match *source {
                InputSource::Decision(i) => i < self.variables.len(),
                InputSource::Parameter(i) => i < self.parameters.len(),
            });
            let outputs_ok = binding.outputs.iter().all(|target| match *target {
                OutputTarget::Objective(i) => i < self.objectives.len(),
                OutputTarget::Constraint(i) => i < self.constraints.len(),
                OutputTarget::Auxiliary(i) => i < self.auxiliary_len,
                OutputTarget::Ignored => true,
            });
            if !inputs_ok || !outputs_ok {
                return Err(ProblemError::MissingSlot(name));
            }

            for target in &binding.outputs {
                if let OutputTarget::Objective(i) = *target {
                    covered[i] = true;
                }
            }
        }

        if let Some(i) = covered.iter().position(|c| !c) {
            return Err(ProblemError::UnboundObjective(self.objectives[i].name.clone()));
        }

        Ok(())
    }

    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    #[must_use]
    pub fn parameters(&self) -> &[Element] {
        &self.parameters
    }

    #[must_use]
    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[must_use]
    pub fn functions(&self) -> &[FunctionBinding] {
        &self.functions
    }

    #[must_use]
    pub fn decision_len(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn objective_len(&self) -> usize {
        self.objectives.len()
    }

    #[must_use]
    pub fn constraint_len(&self) -> usize {
        self.constraints.len()
    }

    #[must_use]
    pub fn auxiliary_len(&self) -> usize {
        self.auxiliary_len
    }

    #[must_use]
    pub fn decision_types(&self) -> Vec<ElementType> {
        self.variables.iter().map(|v| v.kind).collect()
    }

    #[must_use]
    pub fn lower_bounds(&self) -> Vec<f64> {
        self.variables.iter().map(|v| v.lower).collect()
    }

    #[must_use]
    pub fn upper_bounds(&self) -> Vec<f64> {
        self.variables.iter().map(|v| v.upper).collect()
    }

    /// Returns the goal vector in minimization space; `None` means "not set".
    #[must_use]
    pub fn goals(&self) -> Vec<Option<f64>> {
        self.objectives
            .iter()
            .map(|obj| match obj.direction {
                OptimizationType::Minimize => obj.goal,
                OptimizationType::Maximize => obj.goal.map(|g| -g),
            })
            .collect()
    }

    #[must_use]
    pub fn priorities(&self) -> Vec<u32> {
        self.objectives.iter().map(|obj| obj.priority).collect()
    }

    #[must_use]
    pub fn thresholds(&self) -> Vec<f64> {
        self.constraints.iter().map(|c| c.threshold).collect()
    }

    /// Returns `true` if at least one objective has a goal.
    #[must_use]
    pub fn has_goals(&self) -> bool {
        self.objectives.iter().any(|obj| obj.goal.is_some())
    }

    #[must_use]
    pub fn has_constraints(&self) -> bool {
        !self.constraints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn benchmarks_are_fully_defined() {
        assert_eq!(Problem::zdt1(5).validate(), Ok(()));
        assert_eq!(Problem::dtlz2(7, 3).validate(), Ok(()));
        assert_eq!(Problem::ctp1().validate(), Ok(()));
    }

    #[test]
    fn problem_without_functions_is_undefined() {
        let problem = Problem::new()
            .with_variable(Variable::real("x", 0.0, 1.0))
            .with_objective(Objective::minimize("f"));
        assert_eq!(problem.validate(), Err(ProblemError::NoFunctions));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let problem = Problem::zdt1(2).with_variable(Variable::real("bad", 1.0, 0.0));
        assert_eq!(
            problem.validate(),
            Err(ProblemError::InvalidBounds("bad".into()))
        );
    }

    #[test]
    fn unbound_objective_is_reported() {
        let problem = Problem::zdt1(3).with_objective(Objective::minimize("orphan"));
        assert_eq!(
            problem.validate(),
            Err(ProblemError::UnboundObjective("orphan".into()))
        );
    }

    #[test]
    fn maximization_goals_are_negated() {
        let problem = Problem::new()
            .with_objective(Objective::maximize("gain").with_goal(3.0))
            .with_objective(Objective::minimize("loss"));
        assert_eq!(problem.goals(), vec![Some(-3.0), None]);
        assert!(problem.has_goals());
    }
}

//! Problem formulation.

use std::sync::Arc;

use strand_core::problem::{FunctionBinding, InputSource, Objective, OutputTarget, Variable};
use strand_core::{FunctionRegistry, Problem, TAG_DELIMITER};
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter};
use tracing::info;

/// Installs a problem assembled from functions in the context's registry.
///
/// Every function reads the leading decision variables and writes to its own
/// block of objectives, so the problem has as many variables as the widest
/// function and as many objectives as all outputs together. Variables are
/// real and bounded by `[lower, upper]`, defaulting to `[0, 1]`.
///
/// The problem is installed on the first evaluation and again after any
/// parameter change. Installing resets the pipeline's ideal, nadir and
/// anti-ideal vectors. Place the node before any evaluator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Formulation {
    functions: Vec<String>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    installed: bool,
}

impl Formulation {
    #[must_use]
    pub fn new<I, S>(functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            functions: functions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_bounds(mut self, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        self.lower = lower;
        self.upper = upper;
        self.installed = false;
        self
    }

    /// Builds and validates the problem.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorError::Domain`] for a function name the registry
    /// does not know, [`OperatorError::Range`] when bound vectors do not
    /// match the variable count, and [`OperatorError::Problem`] when the
    /// assembled problem is incomplete.
    pub fn build(&self, registry: &FunctionRegistry) -> Result<Problem, OperatorError> {
        let functions = self
            .functions
            .iter()
            .map(|name| {
                registry
                    .create(name)
                    .ok_or_else(|| OperatorError::domain(format!("unknown function `{name}`")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let variable_count = functions.iter().map(|f| f.input_len()).max().unwrap_or(0);
        let bound = |bounds: &[f64], default: f64, which: &str| match bounds.len() {
            0 => Ok(vec![default; variable_count]),
            n if n == variable_count => Ok(bounds.to_vec()),
            n => Err(OperatorError::range(format!(
                "{n} {which} bounds given for {variable_count} variables"
            ))),
        };
        let lower = bound(&self.lower, 0.0, "lower")?;
        let upper = bound(&self.upper, 1.0, "upper")?;

        let mut problem = Problem::new().with_variables(
            lower
                .iter()
                .zip(&upper)
                .enumerate()
                .map(|(i, (&l, &u))| Variable::real(format!("x{i}"), l, u)),
        );
        let mut offset = 0;
        for function in functions {
            let inputs = (0..function.input_len()).map(InputSource::Decision).collect();
            let outputs = (offset..offset + function.output_len())
                .map(OutputTarget::Objective)
                .collect();
            offset += function.output_len();
            problem = problem.with_function(FunctionBinding::new(function, inputs, outputs));
        }
        problem = problem.with_objectives((0..offset).map(|k| Objective::minimize(format!("f{}", k + 1))));

        problem.validate()?;
        Ok(problem)
    }
}

impl Operator for Formulation {
    fn name(&self) -> &str {
        "Formulation"
    }

    fn description(&self) -> &str {
        "Installs a problem built from registered functions and bounds."
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        if self.installed {
            return Ok(());
        }
        let problem = self.build(io.functions())?;
        info!(
            variables = problem.decision_len(),
            objectives = problem.objective_len(),
            "problem installed"
        );
        io.context_mut().set_problem(Arc::new(problem));
        io.state_mut().reset_reference_vectors();
        self.installed = true;
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(
                "FunctionNames",
                "Registered function names separated by `;`.",
                self.functions.join(&TAG_DELIMITER.to_string()),
            ),
            Parameter::new("LowerBounds", "Lower bound of each variable.", self.lower.clone()),
            Parameter::new("UpperBounds", "Upper bound of each variable.", self.upper.clone()),
        ]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "FunctionNames" => {
                self.functions = value
                    .as_text(name)?
                    .split(TAG_DELIMITER)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect();
            }
            "LowerBounds" => self.lower = value.as_vector(name)?.to_vec(),
            "UpperBounds" => self.upper = value.as_vector(name)?.to_vec(),
            _ => return Err(ParamError::Unknown(name.to_owned())),
        }
        self.installed = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use strand_pipeline::{OptimizationContext, Pipeline};

    use super::*;

    fn pipeline() -> Pipeline {
        Pipeline::new(OptimizationContext::new(Problem::new()).with_functions(FunctionRegistry::with_builtins()))
    }

    #[test]
    fn builds_from_registered_functions() {
        let registry = FunctionRegistry::with_builtins();
        let problem = Formulation::new(["strand::dtlz2", "strand::zdt1"]).build(&registry).unwrap();
        assert_eq!(problem.decision_len(), 30);
        assert_eq!(problem.objective_len(), 5);
        assert_relative_eq!(problem.upper_bounds()[29], 1.0);
    }

    #[test]
    fn bad_names_and_bounds_are_rejected() {
        let registry = FunctionRegistry::with_builtins();
        let unknown = Formulation::new(["strand::nothing"]).build(&registry);
        assert!(matches!(unknown, Err(OperatorError::Domain(_))));

        let bounds = Formulation::new(["strand::zdt1"])
            .with_bounds(vec![0.0; 3], vec![1.0; 3])
            .build(&registry);
        assert!(matches!(bounds, Err(OperatorError::Range(_))));

        let empty = Formulation::default().build(&registry);
        assert!(matches!(empty, Err(OperatorError::Problem(_))));
    }

    #[test]
    fn installs_the_problem_and_resets_reference_vectors() {
        let mut pipeline = pipeline();
        let node = pipeline
            .add_node(Formulation::new(["strand::zdt1"]).with_bounds(vec![-1.0; 30], vec![2.0; 30]), None)
            .unwrap();

        pipeline.evaluate(node).unwrap();
        let problem = pipeline.context().problem().clone();
        assert_eq!(problem.objective_len(), 2);
        assert_relative_eq!(problem.lower_bounds()[0], -1.0);
        assert!(pipeline.state().ideal().is_empty());

        for (name, value) in [
            ("FunctionNames", ParamValue::from("strand::dtlz2")),
            ("LowerBounds", ParamValue::from(Vec::new())),
            ("UpperBounds", ParamValue::from(Vec::new())),
        ] {
            pipeline.set_parameter(node, name, &value).unwrap();
        }
        pipeline.evaluate(node).unwrap();
        assert_eq!(pipeline.context().problem().objective_len(), 3);
    }
}

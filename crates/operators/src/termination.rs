//! Termination.

use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter};
use tracing::{debug, info};

/// Signals termination once the next iteration would exhaust a cap.
///
/// Caps set on the node are written to the pipeline state on every
/// evaluation; a cap of zero leaves the state's value alone. Placed last in
/// a flow, the node decides whether the generation just run is the final
/// one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Termination {
    max_iteration: usize,
    budget: usize,
}

impl Termination {
    #[must_use]
    pub fn new(max_iteration: usize, budget: usize) -> Self {
        Self { max_iteration, budget }
    }

    #[must_use]
    pub fn max_iteration(&self) -> usize {
        self.max_iteration
    }

    #[must_use]
    pub fn budget(&self) -> usize {
        self.budget
    }
}

impl Operator for Termination {
    fn name(&self) -> &str {
        "Termination"
    }

    fn description(&self) -> &str {
        "Signals termination when the iteration or evaluation budget runs out."
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        let state = io.state_mut();
        if self.max_iteration > 0 {
            state.define_max_iteration(self.max_iteration);
        }
        if self.budget > 0 {
            state.define_budget(self.budget);
        }

        let iteration = state.current_iteration();
        let exhausted = state.is_exhausted(iteration + 1, state.used_budget());
        state.signal_termination(exhausted);

        if exhausted {
            info!(
                iteration,
                used_budget = state.used_budget(),
                remaining_budget = state.remaining_budget(),
                "termination signalled"
            );
        } else {
            debug!(iteration, remaining_budget = state.remaining_budget(), "continuing");
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new("MaxIteration", "Iteration cap; 0 keeps the pipeline's.", self.max_iteration),
            Parameter::new("Budget", "Evaluation budget; 0 keeps the pipeline's.", self.budget),
        ]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "MaxIteration" => self.max_iteration = value.as_usize(name)?,
            "Budget" => self.budget = value.as_usize(name)?,
            _ => return Err(ParamError::Unknown(name.to_owned())),
        }
        Ok(())
    }
}

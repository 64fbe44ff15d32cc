use strand_core::Population;

/// Events emitted by [`OptimizationLinearFlow::run`](super::OptimizationLinearFlow::run).
#[derive(Debug)]
pub enum Event<'a> {
    /// A generation finished and the iteration counter advanced.
    Generation {
        /// The iteration counter after the increment.
        iteration: usize,

        /// Evaluations charged so far.
        used_budget: usize,

        /// Evaluations left under the budget cap.
        remaining_budget: usize,

        /// The population as the generation left it.
        population: &'a Population,
    },
}

impl Event<'_> {
    #[must_use]
    pub fn iteration(&self) -> usize {
        match self {
            Self::Generation { iteration, .. } => *iteration,
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The pipeline's iteration or budget cap was reached, or a node signalled
    /// termination.
    Terminated,

    /// Reached the configured generation limit.
    MaxGenerations,

    /// Stopped early due to an observer decision.
    StoppedByObserver,
}

/// The outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub status: Status,

    /// Generations evaluated by this run.
    pub generations: usize,

    /// Iteration counter when the run finished.
    pub iteration: usize,

    /// Evaluations charged when the run finished.
    pub used_budget: usize,
}

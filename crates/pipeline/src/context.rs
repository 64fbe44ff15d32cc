use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use strand_core::{FunctionRegistry, LogSink, Problem};

/// Seed used when none is given.
pub const DEFAULT_SEED: u64 = 0;

/// Everything an operator needs besides the population.
///
/// The context owns the random stream, the problem, the log sink and the
/// function registry. It is owned by a [`Pipeline`](crate::Pipeline) and lent
/// to each operator while it runs, so every operator of a pipeline draws
/// from the same seeded stream.
pub struct OptimizationContext {
    rng: StdRng,
    seed: u64,
    problem: Arc<Problem>,
    log: Box<dyn LogSink>,
    functions: FunctionRegistry,
}

impl OptimizationContext {
    /// Creates a context for `problem` with the default seed, a no-op log
    /// sink and the built-in functions.
    #[must_use]
    pub fn new(problem: Problem) -> Self {
        Self {
            rng: StdRng::seed_from_u64(DEFAULT_SEED),
            seed: DEFAULT_SEED,
            problem: Arc::new(problem),
            log: Box::new(()),
            functions: FunctionRegistry::with_builtins(),
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.reseed(seed);
        self
    }

    #[must_use]
    pub fn with_log(mut self, sink: impl LogSink + 'static) -> Self {
        self.log = Box::new(sink);
        self
    }

    #[must_use]
    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    /// Restarts the random stream from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    #[must_use]
    pub fn problem(&self) -> &Arc<Problem> {
        &self.problem
    }

    pub fn set_problem(&mut self, problem: Arc<Problem>) {
        self.problem = problem;
    }

    pub fn log(&mut self) -> &mut dyn LogSink {
        self.log.as_mut()
    }

    pub fn set_log(&mut self, sink: impl LogSink + 'static) {
        self.log = Box::new(sink);
    }

    #[must_use]
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }
}

impl Default for OptimizationContext {
    fn default() -> Self {
        Self::new(Problem::new())
    }
}

impl fmt::Debug for OptimizationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimizationContext")
            .field("seed", &self.seed)
            .field("problem", &self.problem)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

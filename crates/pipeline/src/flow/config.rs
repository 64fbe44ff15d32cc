use thiserror::Error;

/// Configuration for [`OptimizationLinearFlow::run`](super::OptimizationLinearFlow::run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    max_generations: usize,
}

/// Errors that can occur when validating a flow config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_generations must be positive")]
    MaxGenerations,
}

impl Default for Config {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(100_000).unwrap()
    }
}

impl Config {
    /// Creates a config capping the generations `run` evaluates,
    /// independently of the pipeline's iteration and budget caps.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_generations` is zero.
    pub fn new(max_generations: usize) -> Result<Self, ConfigError> {
        if max_generations == 0 {
            return Err(ConfigError::MaxGenerations);
        }
        Ok(Self { max_generations })
    }

    #[must_use]
    pub fn max_generations(&self) -> usize {
        self.max_generations
    }
}

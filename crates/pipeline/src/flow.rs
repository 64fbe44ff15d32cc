//! The top-level generation loop.
//!
//! An [`OptimizationLinearFlow`] owns a pipeline and an ordered list of its
//! nodes, typically `[start, initialisation, algorithm, termination]`.
//! Evaluating the flow evaluates its current node, which brings every node
//! above it up to date.
//!
//! # Observer Events
//!
//! [`OptimizationLinearFlow::run`] emits one [`Event::Generation`] after each
//! generation. Observers can return [`Action::StopEarly`] to end the run.

mod action;
mod config;
mod error;
mod event;
mod solution;

#[cfg(test)]
mod tests;

pub use action::Action;
pub use config::{Config, ConfigError};
pub use error::Error;
pub use event::Event;
pub use solution::{Status, Summary};

use strand_core::Observer;
use tracing::debug;

use crate::{NodeId, Pipeline};

/// A linear list of pipeline nodes driven generation by generation.
#[derive(Debug)]
pub struct OptimizationLinearFlow {
    pipeline: Pipeline,
    nodes: Vec<NodeId>,
    current: usize,
    config: Config,
}

impl OptimizationLinearFlow {
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            nodes: Vec::new(),
            current: 0,
            config: Config::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    // ====================================================================
    // Navigation
    // ====================================================================

    /// Appends a pipeline node and makes it current.
    ///
    /// # Errors
    ///
    /// Returns an error if `node` does not belong to the flow's pipeline.
    pub fn append_node(&mut self, node: NodeId) -> Result<(), Error> {
        self.pipeline.error_state(node)?;
        self.nodes.push(node);
        self.current = self.nodes.len() - 1;
        Ok(())
    }

    /// Moves the current index; returns `false` if it is out of range.
    pub fn set_current_index(&mut self, index: usize) -> bool {
        if index < self.nodes.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_node(&self) -> Option<NodeId> {
        self.nodes.get(self.current).copied()
    }

    #[must_use]
    pub fn final_node(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    #[must_use]
    pub fn node(&self, index: usize) -> Option<NodeId> {
        self.nodes.get(index).copied()
    }

    /// Steps back one node; `None` at the start.
    pub fn previous_node(&mut self) -> Option<NodeId> {
        let index = self.current.checked_sub(1)?;
        let node = self.node(index)?;
        self.current = index;
        Some(node)
    }

    /// Steps forward one node; `None` at the end.
    pub fn next_node(&mut self) -> Option<NodeId> {
        let node = self.node(self.current + 1)?;
        self.current += 1;
        Some(node)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Forgets the node list; the pipeline keeps its nodes.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.current = 0;
    }

    // ====================================================================
    // Evaluation
    // ====================================================================

    /// Evaluates the current node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] for an empty flow, [`Error::Halted`] without
    /// running anything if any node of the flow is in error, and
    /// [`Error::Pipeline`] for the first operator failure.
    pub fn evaluate(&mut self) -> Result<(), Error> {
        let node = self.current_node().ok_or(Error::Empty)?;
        for &id in &self.nodes {
            if self.pipeline.error_state(id)?.is_error() {
                return Err(Error::Halted {
                    node: id,
                    name: self.pipeline.name(id)?.to_owned(),
                });
            }
        }
        self.pipeline.evaluate(node)?;
        Ok(())
    }

    pub fn increment_iteration(&mut self) {
        self.pipeline.state_mut().increment_iteration();
    }

    #[must_use]
    pub fn is_terminate(&self) -> bool {
        self.pipeline.state().is_terminate()
    }

    #[must_use]
    pub fn current_iteration(&self) -> usize {
        self.pipeline.state().current_iteration()
    }

    #[must_use]
    pub fn max_iteration(&self) -> usize {
        self.pipeline.state().max_iteration()
    }

    #[must_use]
    pub fn budget(&self) -> usize {
        self.pipeline.state().budget()
    }

    #[must_use]
    pub fn used_budget(&self) -> usize {
        self.pipeline.state().used_budget()
    }

    #[must_use]
    pub fn remaining_budget(&self) -> usize {
        self.pipeline.state().remaining_budget()
    }

    /// Runs generations until the pipeline terminates.
    ///
    /// Each generation evaluates the current node, advances the iteration
    /// counter and emits an [`Event::Generation`]. At least one generation
    /// runs, since the termination caps are typically installed by a node.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error`] raised by [`Self::evaluate`].
    pub fn run<Obs>(&mut self, mut observer: Obs) -> Result<Summary, Error>
    where
        Obs: for<'a> Observer<Event<'a>, Action>,
    {
        let mut generations = 0;
        let status = loop {
            self.evaluate()?;
            let terminate = self.is_terminate();
            self.increment_iteration();
            generations += 1;

            let state = self.pipeline.state();
            debug!(
                iteration = state.current_iteration(),
                used_budget = state.used_budget(),
                "generation finished"
            );

            let event = Event::Generation {
                iteration: state.current_iteration(),
                used_budget: state.used_budget(),
                remaining_budget: state.remaining_budget(),
                population: state.population(),
            };
            if let Some(Action::StopEarly) = observer.observe(&event) {
                break Status::StoppedByObserver;
            }
            if terminate {
                break Status::Terminated;
            }
            if generations >= self.config.max_generations() {
                break Status::MaxGenerations;
            }
        };

        Ok(Summary {
            status,
            generations,
            iteration: self.current_iteration(),
            used_budget: self.used_budget(),
        })
    }
}

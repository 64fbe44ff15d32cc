//! Logging sinks for evaluations and populations.
//!
//! The engine reports every function evaluation and, on request, population
//! snapshots to a [`LogSink`]. Sinks decide how (and whether) to persist
//! them. A failing sink never stops an optimization run: callers go through
//! [`report_evaluation`] and [`report_population`], which downgrade sink
//! errors to `tracing` warnings.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::Element;

/// Extra key/value fields attached to a record.
pub type Fields = BTreeMap<String, String>;

/// A single function evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRecord {
    pub function: String,
    pub inputs: Vec<Element>,
    pub outputs: Vec<Element>,
    pub fields: Fields,
}

/// A snapshot of a population.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRecord {
    pub name: String,
    pub decisions: Vec<Vec<Element>>,
    pub objectives: Vec<Vec<f64>>,
    pub fields: Fields,
}

/// Error returned by a failing sink.
#[derive(Debug, Error)]
#[error("log sink failed: {message}")]
pub struct LogError {
    message: String,
}

impl LogError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Receives evaluation and population records.
pub trait LogSink: Send {
    /// Records one function evaluation.
    ///
    /// # Errors
    ///
    /// Returns a [`LogError`] if the record cannot be stored.
    fn log_evaluation(&mut self, record: &EvaluationRecord) -> Result<(), LogError>;

    /// Records a population snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`LogError`] if the record cannot be stored.
    fn log_population(&mut self, record: &PopulationRecord) -> Result<(), LogError>;
}

/// The unit sink discards everything.
impl LogSink for () {
    fn log_evaluation(&mut self, _record: &EvaluationRecord) -> Result<(), LogError> {
        Ok(())
    }

    fn log_population(&mut self, _record: &PopulationRecord) -> Result<(), LogError> {
        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    pub evaluations: Vec<EvaluationRecord>,
    pub populations: Vec<PopulationRecord>,
}

impl LogSink for MemoryLog {
    fn log_evaluation(&mut self, record: &EvaluationRecord) -> Result<(), LogError> {
        self.evaluations.push(record.clone());
        Ok(())
    }

    fn log_population(&mut self, record: &PopulationRecord) -> Result<(), LogError> {
        self.populations.push(record.clone());
        Ok(())
    }
}

/// Forwards records to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn log_evaluation(&mut self, record: &EvaluationRecord) -> Result<(), LogError> {
        tracing::debug!(
            function = %record.function,
            inputs = ?record.inputs,
            outputs = ?record.outputs,
            fields = ?record.fields,
            "evaluation"
        );
        Ok(())
    }

    fn log_population(&mut self, record: &PopulationRecord) -> Result<(), LogError> {
        tracing::debug!(
            name = %record.name,
            size = record.decisions.len(),
            fields = ?record.fields,
            "population"
        );
        Ok(())
    }
}

/// A shared sink, so a caller can keep a handle to records it hands off.
impl<S: LogSink> LogSink for Arc<Mutex<S>> {
    fn log_evaluation(&mut self, record: &EvaluationRecord) -> Result<(), LogError> {
        self.lock()
            .map_err(|_| LogError::new("sink mutex poisoned"))?
            .log_evaluation(record)
    }

    fn log_population(&mut self, record: &PopulationRecord) -> Result<(), LogError> {
        self.lock()
            .map_err(|_| LogError::new("sink mutex poisoned"))?
            .log_population(record)
    }
}

/// Sends an evaluation record to `sink`, downgrading failures to a warning.
pub fn report_evaluation(sink: &mut dyn LogSink, record: &EvaluationRecord) {
    if let Err(error) = sink.log_evaluation(record) {
        tracing::warn!(%error, function = %record.function, "dropped evaluation record");
    }
}

/// Sends a population record to `sink`, downgrading failures to a warning.
pub fn report_population(sink: &mut dyn LogSink, record: &PopulationRecord) {
    if let Err(error) = sink.log_population(record) {
        tracing::warn!(%error, name = %record.name, "dropped population record");
    }
}

use crate::{NodeIo, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

/// A transformation over tagged sets, run as one pipeline node.
///
/// An operator reads its input sets and writes its output sets through the
/// [`NodeIo`] it is lent. The pipeline resolves those sets from the node's
/// tags before every call, so an operator only walks its cursors.
pub trait Operator: Send {
    /// A short, stable name used for registration and logs.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// The tags a freshly created node for this operator uses.
    fn default_tags(&self) -> TagConfig {
        TagConfig::default()
    }

    /// Runs the operator's own transformation.
    ///
    /// # Errors
    ///
    /// Returns an [`OperatorError`]; the pipeline records it as the node's
    /// error state.
    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError>;

    /// Lists the operator's tunable parameters with their current values.
    fn parameters(&self) -> Vec<Parameter> {
        Vec::new()
    }

    /// Updates a parameter by name.
    ///
    /// # Errors
    ///
    /// Returns a [`ParamError`] for an unknown name, a value of the wrong
    /// kind, or a value outside the parameter's domain.
    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        let _ = value;
        Err(ParamError::Unknown(name.to_owned()))
    }
}

/// The root of a chain; does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Start;

impl Operator for Start {
    fn name(&self) -> &str {
        "Start"
    }

    fn description(&self) -> &str {
        "Root node of a chain."
    }

    fn evaluate_node(&mut self, _io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        Ok(())
    }
}

impl<F> Operator for (&'static str, F)
where
    F: FnMut(&mut NodeIo<'_>) -> Result<(), OperatorError> + Send,
{
    fn name(&self) -> &str {
        self.0
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        (self.1)(io)
    }
}

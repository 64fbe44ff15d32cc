use std::fmt;

use crate::Element;

/// A boxed error returned by a [`Function`].
pub type FunctionError = Box<dyn std::error::Error + Send + Sync>;

/// An evaluation function attached to a problem.
///
/// A function reads `input_len()` elements and writes `output_len()`
/// elements. The problem's bindings decide where those inputs come from
/// (decision variables or parameters) and where the outputs go (objectives,
/// constraints, or auxiliary outputs).
///
/// Functions are shared across worker threads when evaluation runs in
/// parallel, so they must be `Send + Sync` and must not rely on interior
/// mutation for correctness.
pub trait Function: Send + Sync {
    /// Returns the qualified name used for registration and logging.
    fn name(&self) -> &str;

    fn input_len(&self) -> usize;

    fn output_len(&self) -> usize;

    /// Computes the outputs for the given inputs.
    ///
    /// `inputs` has exactly `input_len()` elements and `outputs` exactly
    /// `output_len()` elements.
    ///
    /// # Errors
    ///
    /// Returns an error if the function cannot be evaluated at `inputs`.
    fn evaluate(&self, inputs: &[Element], outputs: &mut [Element]) -> Result<(), FunctionError>;
}

/// A [`Function`] backed by a closure.
///
/// Useful for tests and for ad-hoc problems that do not warrant a dedicated
/// type.
pub struct FnFunction<F> {
    name: String,
    input_len: usize,
    output_len: usize,
    f: F,
}

impl<F> FnFunction<F>
where
    F: Fn(&[Element], &mut [Element]) -> Result<(), FunctionError> + Send + Sync,
{
    #[must_use]
    pub fn new(name: impl Into<String>, input_len: usize, output_len: usize, f: F) -> Self {
        Self {
            name: name.into(),
            input_len,
            output_len,
            f,
        }
    }
}

impl<F> Function for FnFunction<F>
where
    F: Fn(&[Element], &mut [Element]) -> Result<(), FunctionError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn input_len(&self) -> usize {
        self.input_len
    }

    fn output_len(&self) -> usize {
        self.output_len
    }

    fn evaluate(&self, inputs: &[Element], outputs: &mut [Element]) -> Result<(), FunctionError> {
        (self.f)(inputs, outputs)
    }
}

impl<F> fmt::Debug for FnFunction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFunction")
            .field("name", &self.name)
            .field("input_len", &self.input_len)
            .field("output_len", &self.output_len)
            .finish_non_exhaustive()
    }
}

use rand::Rng;
use strand_core::Tag;
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

/// Clones random members of the first input set into one set for mutation.
///
/// The output holds `ceil(size * ratio)` clones, drawn with replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct RandFiltrationForPerturbation {
    ratio: f64,
}

impl Default for RandFiltrationForPerturbation {
    fn default() -> Self {
        Self { ratio: 1.0 }
    }
}

impl RandFiltrationForPerturbation {
    /// Creates the filtration with the given ratio of new mappings.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Invalid`] if `ratio` is not a positive number.
    pub fn new(ratio: f64) -> Result<Self, ParamError> {
        let mut filtration = Self::default();
        filtration.set_parameter("RatioOfNewSolutions", &ParamValue::Real(ratio))?;
        Ok(filtration)
    }

    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}

impl Operator for RandFiltrationForPerturbation {
    fn name(&self) -> &str {
        "RandFiltrationForPerturbation"
    }

    fn description(&self) -> &str {
        "Clones randomly chosen mappings into a set for perturbation."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new()
            .with_input([Tag::ForFiltration])
            .with_output([Tag::ForPerturbation])
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        io.clear_output_sets();
        let Some(input) = io.input_set(0) else {
            return Ok(());
        };
        let members = io.members(input);
        let count = (members.len() as f64 * self.ratio).ceil() as usize;

        io.append_output_set();
        if members.is_empty() {
            return Ok(());
        }
        for _ in 0..count {
            let pick = io.rng().gen_range(0..members.len());
            io.clone_mapping(members[pick])?;
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new(
            "RatioOfNewSolutions",
            "Number of clones relative to the input set size.",
            self.ratio,
        )]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "RatioOfNewSolutions" => {
                let ratio = value.as_f64(name)?;
                if !ratio.is_finite() || ratio <= 0.0 {
                    return Err(ParamError::invalid(name, "must be a positive number"));
                }
                self.ratio = ratio;
            }
            _ => return Err(ParamError::Unknown(name.to_owned())),
        }
        Ok(())
    }
}

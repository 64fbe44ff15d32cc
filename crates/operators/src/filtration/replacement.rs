use strand_core::Tag;
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

use crate::sampling;

/// Swaps whole input sets for a replacement set at random.
///
/// Each input set is forwarded as an output set referencing either its own
/// members or, with the replacement probability, the members of the first
/// set carrying the replacement tags.
#[derive(Debug, Clone, PartialEq)]
pub struct RandSetReplacement {
    probability: f64,
    replacement_tags: Vec<Tag>,
}

impl Default for RandSetReplacement {
    fn default() -> Self {
        Self {
            probability: 0.1,
            replacement_tags: vec![Tag::MainOptimizationSet],
        }
    }
}

impl RandSetReplacement {
    #[must_use]
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.max(0.0),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_replacement_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.replacement_tags = tags.into_iter().collect();
        self
    }

    #[must_use]
    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl Operator for RandSetReplacement {
    fn name(&self) -> &str {
        "RandSetReplacement"
    }

    fn description(&self) -> &str {
        "Randomly replaces input sets with a designated set."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new()
            .with_input([Tag::ForSetReplacement])
            .with_output([Tag::SetReplaced])
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        io.clear_output_sets();
        let inputs = io.input_sets().to_vec();
        if inputs.is_empty() {
            return Ok(());
        }

        let replacement = io
            .population()
            .sets_with_tags(&self.replacement_tags)
            .first()
            .copied()
            .ok_or_else(|| {
                OperatorError::domain(format!(
                    "no set tagged `{}` to replace with",
                    Tag::join_list(&self.replacement_tags)
                ))
            })?;

        for input in inputs {
            let source = if sampling::draw(io.rng(), self.probability) {
                replacement
            } else {
                input
            };
            io.append_existing_output_set(source)?;
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(
                "ReplacementProbability",
                "Probability of replacing each input set.",
                self.probability,
            ),
            Parameter::new(
                "ReplacementSetTags",
                "Tags identifying the replacement set.",
                self.replacement_tags.as_slice(),
            ),
        ]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "ReplacementProbability" => {
                let p = value.as_f64(name)?;
                if p < 0.0 {
                    return Err(ParamError::invalid(name, "must not be negative"));
                }
                self.probability = p;
            }
            "ReplacementSetTags" => self.replacement_tags = value.as_tags(name)?,
            _ => return Err(ParamError::Unknown(name.to_owned())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtration::fixture::{costed_set, output_costs, pipeline, run};

    fn replaced(probability: f64) -> Vec<Vec<f64>> {
        let mut pipeline = pipeline(6);
        costed_set(&mut pipeline, &[Tag::MainOptimizationSet], &[0.0]);
        costed_set(&mut pipeline, &[Tag::ForSetReplacement], &[1.0, 1.5]);
        costed_set(&mut pipeline, &[Tag::ForSetReplacement], &[2.0]);
        let node = run(&mut pipeline, RandSetReplacement::new(probability));
        output_costs(&pipeline, node)
    }

    #[test]
    fn certain_probabilities_are_not_drawn() {
        assert_eq!(replaced(0.0), vec![vec![1.0, 1.5], vec![2.0]]);
        assert_eq!(replaced(1.0), vec![vec![0.0], vec![0.0]]);
    }

    #[test]
    fn outputs_reference_existing_mappings() {
        let mut pipeline = pipeline(6);
        costed_set(&mut pipeline, &[Tag::MainOptimizationSet], &[0.0]);
        costed_set(&mut pipeline, &[Tag::ForSetReplacement], &[1.0, 2.0]);
        run(&mut pipeline, RandSetReplacement::new(0.5));
        assert_eq!(pipeline.state().population().mapping_count(), 3);
    }

    #[test]
    fn missing_replacement_set_is_a_domain_error() {
        let mut pipeline = pipeline(6);
        costed_set(&mut pipeline, &[Tag::ForSetReplacement], &[1.0]);
        let node = pipeline.add_node(RandSetReplacement::default(), None).unwrap();
        assert!(pipeline.evaluate(node).is_err());
    }
}

//! Fitness-proportionate selection.
//!
//! Both selections treat the cost of a mapping as its selection weight and
//! append references, not clones, to a mating pool per input set.

use rand::Rng;
use strand_core::{MappingId, Tag};
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

use super::cost_of;

/// Cumulative selection probabilities of `weights`.
///
/// Falls back to uniform probabilities when the weights do not sum to a
/// positive finite number.
#[allow(clippy::cast_precision_loss)]
fn cumulative(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    let uniform = !(total.is_finite() && total > 0.0);
    let mut acc = 0.0;
    weights
        .iter()
        .map(|&w| {
            acc += if uniform { 1.0 / weights.len() as f64 } else { w / total };
            acc
        })
        .collect()
}

/// Index of the first cumulative probability at or above `u`.
fn pick(cumulative: &[f64], u: f64) -> usize {
    cumulative
        .iter()
        .position(|&p| u <= p)
        .unwrap_or(cumulative.len().saturating_sub(1))
}

fn default_tags() -> TagConfig {
    TagConfig::new()
        .with_input([Tag::Fitness, Tag::ForSelection])
        .with_output([Tag::MatingPool])
}

fn size_parameter(size: i64) -> Vec<Parameter> {
    vec![Parameter::new(
        "OutputSetSize",
        "Mappings per mating pool; -1 matches the input set size.",
        size,
    )]
}

fn set_size_parameter(size: &mut i64, name: &str, value: &ParamValue) -> Result<(), ParamError> {
    match name {
        "OutputSetSize" => *size = value.as_i64(name)?,
        _ => return Err(ParamError::Unknown(name.to_owned())),
    }
    Ok(())
}

/// Builds one pool per input set from the probabilities returned by `draws`.
fn select<F>(io: &mut NodeIo<'_>, size: i64, mut draws: F) -> Result<(), OperatorError>
where
    F: FnMut(&mut NodeIo<'_>, usize) -> Vec<f64>,
{
    io.clear_output_sets();
    let inputs = io.input_sets().to_vec();
    for input in inputs {
        let members = io.members(input);
        let pool = io.append_output_set();
        if members.is_empty() {
            continue;
        }

        let weights = members
            .iter()
            .map(|&id| cost_of(io, id))
            .collect::<Result<Vec<_>, _>>()?;
        let probabilities = cumulative(&weights);
        let count = usize::try_from(size).unwrap_or(members.len());

        let chosen: Vec<MappingId> = draws(io, count)
            .into_iter()
            .map(|u| members[pick(&probabilities, u)])
            .collect();
        if let Some(set) = io.population_mut().set_mut(pool) {
            set.extend(chosen);
        }
    }
    Ok(())
}

/// Roulette-wheel selection: one independent spin per pool slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouletteWheelSelection {
    output_set_size: i64,
}

impl Default for RouletteWheelSelection {
    fn default() -> Self {
        Self { output_set_size: -1 }
    }
}

impl RouletteWheelSelection {
    #[must_use]
    pub fn new(output_set_size: i64) -> Self {
        Self { output_set_size }
    }
}

impl Operator for RouletteWheelSelection {
    fn name(&self) -> &str {
        "RouletteWheelSelection"
    }

    fn description(&self) -> &str {
        "Fills a mating pool per input set by roulette-wheel selection."
    }

    fn default_tags(&self) -> TagConfig {
        default_tags()
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        select(io, self.output_set_size, |io, n| {
            (0..n).map(|_| io.rng().gen_range(0.0..1.0)).collect()
        })
    }

    fn parameters(&self) -> Vec<Parameter> {
        size_parameter(self.output_set_size)
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        set_size_parameter(&mut self.output_set_size, name, value)
    }
}

/// Stochastic universal sampling: one spin, `n` equally spaced pointers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StochasticUniversalSampling {
    output_set_size: i64,
}

impl Default for StochasticUniversalSampling {
    fn default() -> Self {
        Self { output_set_size: -1 }
    }
}

impl StochasticUniversalSampling {
    #[must_use]
    pub fn new(output_set_size: i64) -> Self {
        Self { output_set_size }
    }
}

impl Operator for StochasticUniversalSampling {
    fn name(&self) -> &str {
        "StochasticUniversalSampling"
    }

    fn description(&self) -> &str {
        "Fills a mating pool per input set by stochastic universal sampling."
    }

    fn default_tags(&self) -> TagConfig {
        default_tags()
    }

    #[allow(clippy::cast_precision_loss)]
    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        select(io, self.output_set_size, |io, n| {
            let start: f64 = io.rng().gen_range(0.0..1.0);
            (0..n).map(|i| (start + i as f64 / n as f64) % 1.0).collect()
        })
    }

    fn parameters(&self) -> Vec<Parameter> {
        size_parameter(self.output_set_size)
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        set_size_parameter(&mut self.output_set_size, name, value)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::filtration::fixture::{costed_set, output_costs, pipeline, run};

    #[test]
    fn cumulative_probabilities_end_at_one() {
        let p = cumulative(&[1.0, 3.0]);
        assert_relative_eq!(p[0], 0.25);
        assert_relative_eq!(p[1], 1.0);

        let uniform = cumulative(&[0.0, 0.0, 0.0, 0.0]);
        assert_relative_eq!(uniform[1], 0.5);
        assert_eq!(pick(&p, 0.2), 0);
        assert_eq!(pick(&p, 0.9), 1);
        assert_eq!(pick(&p, 1.5), 1);
    }

    #[test]
    fn pools_reference_the_input_mappings() {
        let mut pipeline = pipeline(8);
        let input = costed_set(&mut pipeline, &[Tag::Fitness, Tag::ForSelection], &[1.0, 2.0, 3.0]);
        let node = run(&mut pipeline, RouletteWheelSelection::new(7));

        let population = pipeline.state().population();
        let pool = pipeline.cursors(node).unwrap().outputs()[0];
        let originals = population.members(input);
        assert_eq!(population.members(pool).len(), 7);
        assert!(population.members(pool).iter().all(|id| originals.contains(id)));
        assert_eq!(population.mapping_count(), 3);
    }

    #[test]
    fn sus_spreads_its_pointers() {
        let mut pipeline = pipeline(5);
        costed_set(&mut pipeline, &[Tag::Fitness, Tag::ForSelection], &[1.0, 1.0, 1.0, 1.0]);
        let node = run(&mut pipeline, StochasticUniversalSampling::default());

        // Equal weights and evenly spaced pointers pick every mapping once.
        assert_eq!(output_costs(&pipeline, node).concat().len(), 4);

        let population = pipeline.state().population();
        let pool = pipeline.cursors(node).unwrap().outputs()[0];
        let mut ids = population.members(pool);
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}

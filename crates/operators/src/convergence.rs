//! Convergence indicators.
//!
//! Indicators read the union of their input sets and publish a scalar on the
//! pipeline state under their name, where flows and observers can read it
//! with [`PipelineState::indicator`](strand_pipeline::PipelineState::indicator).

use strand_core::Tag;
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};
use tracing::debug;

/// Exact hypervolume dominated by `points` and bounded by `reference`.
///
/// Objectives are minimised. Points that do not strictly dominate the
/// reference on every objective, or whose length differs from it, add
/// nothing. The volume is computed by slicing along the last objective and
/// recursing on the rest.
#[must_use]
pub fn hypervolume(points: &[Vec<f64>], reference: &[f64]) -> f64 {
    let inside: Vec<&[f64]> = points
        .iter()
        .map(Vec::as_slice)
        .filter(|p| p.len() == reference.len() && p.iter().zip(reference).all(|(x, r)| x < r))
        .collect();
    if inside.is_empty() || reference.is_empty() {
        return 0.0;
    }
    slice_volume(inside, reference)
}

fn slice_volume(mut points: Vec<&[f64]>, reference: &[f64]) -> f64 {
    let last = reference.len() - 1;
    if last == 0 {
        let best = points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
        return reference[0] - best;
    }

    points.sort_by(|a, b| a[last].total_cmp(&b[last]));
    let mut volume = 0.0;
    for i in 0..points.len() {
        let upper = points.get(i + 1).map_or(reference[last], |next| next[last]);
        let depth = upper - points[i][last];
        if depth > 0.0 {
            let slab: Vec<&[f64]> = points[..=i].iter().map(|p| &p[..last]).collect();
            volume += depth * slice_volume(slab, &reference[..last]);
        }
    }
    volume
}

/// Publishes the hypervolume of the input sets as `"Hypervolume"`.
///
/// The reference point is the anti-ideal vector unless one is given. When
/// gated to the final iteration the node does nothing until the pipeline
/// signals termination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hypervolume {
    reference: Vec<f64>,
    operate_on_final: bool,
    value: Option<f64>,
}

impl Hypervolume {
    pub const INDICATOR: &'static str = "Hypervolume";

    #[must_use]
    pub fn with_reference(mut self, reference: Vec<f64>) -> Self {
        self.reference = reference;
        self
    }

    #[must_use]
    pub fn on_final_iteration(mut self, gated: bool) -> Self {
        self.operate_on_final = gated;
        self
    }

    /// The last value computed by this node.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

impl Operator for Hypervolume {
    fn name(&self) -> &str {
        "Hypervolume"
    }

    fn description(&self) -> &str {
        "Exact hypervolume of the input sets against a reference point."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new().with_input([Tag::MainOptimizationSet])
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        if self.operate_on_final && !io.state().is_terminate() {
            return Ok(());
        }
        let ids = io.input_union();
        if ids.is_empty() {
            return Ok(());
        }
        let points = ids
            .iter()
            .map(|&id| io.mapping(id).map(|m| m.objectives().to_vec()))
            .collect::<Result<Vec<_>, _>>()?;

        let reference = if self.reference.is_empty() {
            io.state().anti_ideal().to_vec()
        } else {
            self.reference.clone()
        };
        let value = hypervolume(&points, &reference);
        debug!(value, points = points.len(), "hypervolume");

        self.value = Some(value);
        io.state_mut().publish_indicator(Self::INDICATOR, value);
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(
                "ReferencePoint",
                "Reference point; empty to use the anti-ideal vector.",
                self.reference.clone(),
            ),
            Parameter::new(
                "OperateOnFinal",
                "Only compute once the pipeline signals termination.",
                self.operate_on_final,
            ),
        ]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "ReferencePoint" => self.reference = value.as_vector(name)?.to_vec(),
            "OperateOnFinal" => self.operate_on_final = value.as_bool(name)?,
            _ => return Err(ParamError::Unknown(name.to_owned())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use strand_core::Mapping;
    use strand_pipeline::Pipeline;

    use super::*;
    use crate::filtration::fixture::pipeline;

    fn staircase() -> Vec<Vec<f64>> {
        vec![vec![1.0, 3.0], vec![2.0, 2.0], vec![3.0, 1.0]]
    }

    #[test]
    fn two_objective_staircase() {
        assert_relative_eq!(hypervolume(&staircase(), &[4.0, 4.0]), 6.0);
        assert_relative_eq!(hypervolume(&[vec![0.0]], &[2.5]), 2.5);
        assert_relative_eq!(hypervolume(&[], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn three_objective_boxes_overlap_once() {
        let points = vec![vec![0.0, 0.0, 1.0], vec![1.0, 1.0, 0.0]];
        assert_relative_eq!(hypervolume(&points, &[2.0, 2.0, 2.0]), 4.0 + 2.0 - 1.0);
    }

    #[test]
    fn dominated_points_add_nothing_and_new_ones_never_shrink() {
        let reference = [4.0, 4.0];
        let base = hypervolume(&staircase(), &reference);

        let mut with_dominated = staircase();
        with_dominated.push(vec![3.5, 3.5]);
        with_dominated.push(vec![5.0, 0.0]);
        assert_relative_eq!(hypervolume(&with_dominated, &reference), base);

        let mut with_new = staircase();
        with_new.push(vec![1.5, 1.5]);
        assert!(hypervolume(&with_new, &reference) > base);
    }

    fn main_set(pipeline: &mut Pipeline) {
        let problem = pipeline.context().problem().clone();
        let population = pipeline.state_mut().population_mut();
        let set = population.create_set([Tag::MainOptimizationSet]);
        for f in staircase() {
            let mut mapping = Mapping::new(&problem);
            mapping.define_objective(0, f[0]);
            mapping.define_objective(1, f[1]);
            let id = population.insert_mapping(mapping);
            population.append_to_set(set, id);
        }
    }

    #[test]
    fn publishes_the_indicator() {
        let mut pipeline = pipeline(1);
        main_set(&mut pipeline);
        let node = pipeline
            .add_node(Hypervolume::default().with_reference(vec![4.0, 4.0]), None)
            .unwrap();
        pipeline.evaluate(node).unwrap();
        assert_relative_eq!(pipeline.state().indicator(Hypervolume::INDICATOR).unwrap(), 6.0);
    }

    #[test]
    fn final_gating_waits_for_termination() {
        let mut pipeline = pipeline(1);
        main_set(&mut pipeline);
        pipeline.state_mut().define_max_iteration(10);
        let node = pipeline
            .add_node(
                Hypervolume::default()
                    .with_reference(vec![4.0, 4.0])
                    .on_final_iteration(true),
                None,
            )
            .unwrap();

        pipeline.evaluate(node).unwrap();
        assert!(pipeline.state().indicator(Hypervolume::INDICATOR).is_none());

        pipeline.state_mut().signal_termination(true);
        pipeline.evaluate(node).unwrap();
        assert!(pipeline.state().indicator(Hypervolume::INDICATOR).is_some());
    }
}

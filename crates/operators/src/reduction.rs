//! Objective reduction.
//!
//! Detects redundant objectives by principal component analysis of the
//! objective correlation matrix. The result is published on the pipeline
//! state as [`ReductionData`]; mappings are never modified.

use ndarray::{Array1, Array2, Axis};
use strand_core::{EPSILON, Tag};
use strand_pipeline::{
    NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, ReductionData, TagConfig,
};
use tracing::debug;

const MAX_SWEEPS: usize = 100;

/// Pearson correlation between the columns of `samples`.
///
/// Rows are observations. A column with no spread correlates with nothing
/// but itself.
#[must_use]
pub fn correlation_matrix(samples: &Array2<f64>) -> Array2<f64> {
    let columns = samples.ncols();
    let mut correlation = Array2::eye(columns);
    let Some(mean) = samples.mean_axis(Axis(0)) else {
        return correlation;
    };
    let centred = samples - &mean;
    let covariance = centred.t().dot(&centred);
    let spread: Array1<f64> = covariance.diag().mapv(f64::sqrt);

    for i in 0..columns {
        for j in (i + 1)..columns {
            let scale = spread[i] * spread[j];
            let r = if scale < EPSILON { 0.0 } else { covariance[[i, j]] / scale };
            correlation[[i, j]] = r;
            correlation[[j, i]] = r;
        }
    }
    correlation
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns the eigenvalues in descending order of magnitude and the matching
/// unit eigenvectors as rows.
#[must_use]
pub fn symmetric_eigen(matrix: &Array2<f64>) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = matrix.nrows();
    let mut a = matrix.clone();
    let mut v: Array2<f64> = Array2::eye(n);

    for _ in 0..MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| a[[i, j]] * a[[i, j]])
            .sum();
        if off < 1e-22 {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                if a[[p, q]].abs() < 1e-300 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * a[[p, q]]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let (akp, akq) = (a[[k, p]], a[[k, q]]);
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[[p, k]], a[[q, k]]);
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let (vkp, vkq) = (v[[k, p]], v[[k, q]]);
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].abs().total_cmp(&a[[i, i]].abs()));
    let values = order.iter().map(|&i| a[[i, i]]).collect();
    let vectors = order.iter().map(|&i| v.column(i).to_vec()).collect();
    (values, vectors)
}

/// Objectives picked from one principal component.
///
/// When every loading has the same sign the two largest by magnitude are
/// kept. Otherwise the largest is kept together with every objective loading
/// against it.
fn essential_for_component(component: &[f64], selected: &mut [bool]) {
    let mut by_magnitude: Vec<usize> = (0..component.len()).collect();
    by_magnitude.sort_by(|&i, &j| component[j].abs().total_cmp(&component[i].abs()));
    let Some(&lead) = by_magnitude.first() else {
        return;
    };

    let sign = component[lead].signum();
    if component.iter().all(|c| c.signum() == sign) {
        for &i in by_magnitude.iter().take(2) {
            selected[i] = true;
        }
    } else {
        selected[lead] = true;
        for (i, c) in component.iter().enumerate() {
            if c.signum() != sign {
                selected[i] = true;
            }
        }
    }
}

/// Identifies the essential objectives of the input sets.
///
/// The eigenvalues of the correlation matrix are normalised to sum to one
/// and the leading components are kept until their share exceeds the
/// variance threshold. Essential objectives are drawn from each kept
/// component by its loadings.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationObjectiveReduction {
    variance_threshold: f64,
    operate_on_final: bool,
}

impl Default for CorrelationObjectiveReduction {
    fn default() -> Self {
        Self {
            variance_threshold: 0.997,
            operate_on_final: false,
        }
    }
}

impl CorrelationObjectiveReduction {
    /// # Errors
    ///
    /// Returns [`ParamError::Invalid`] if the threshold is outside `(0, 1]`.
    pub fn new(variance_threshold: f64) -> Result<Self, ParamError> {
        let mut reduction = Self::default();
        reduction.set_threshold(variance_threshold)?;
        Ok(reduction)
    }

    #[must_use]
    pub fn on_final_iteration(mut self, gated: bool) -> Self {
        self.operate_on_final = gated;
        self
    }

    fn set_threshold(&mut self, threshold: f64) -> Result<(), ParamError> {
        if threshold > 0.0 && threshold <= 1.0 {
            self.variance_threshold = threshold;
            Ok(())
        } else {
            Err(ParamError::invalid("VarianceThreshold", format!("{threshold} is not in (0, 1]")))
        }
    }

    /// Runs the analysis over `samples`, one row per mapping.
    #[must_use]
    pub fn analyse(&self, samples: &Array2<f64>) -> ReductionData {
        let correlation = correlation_matrix(samples);
        let (values, vectors) = symmetric_eigen(&correlation);

        let total: f64 = values.iter().sum();
        let mut kept = values.len();
        let mut share = 0.0;
        for (i, value) in values.iter().enumerate() {
            share += value / total;
            if share > self.variance_threshold {
                kept = i + 1;
                break;
            }
        }

        let mut selected = vec![false; samples.ncols()];
        for component in vectors.iter().take(kept) {
            essential_for_component(component, &mut selected);
        }
        ReductionData {
            essential: (0..selected.len()).filter(|&i| selected[i]).collect(),
            correlation: correlation.outer_iter().map(|row| row.to_vec()).collect(),
        }
    }
}

impl Operator for CorrelationObjectiveReduction {
    fn name(&self) -> &str {
        "CorrelationObjectiveReduction"
    }

    fn description(&self) -> &str {
        "Finds the essential objectives by PCA of their correlation matrix."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new().with_input([Tag::MainOptimizationSet])
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        if self.operate_on_final && !io.state().is_terminate() {
            return Ok(());
        }
        let objective_count = io.problem().objective_len();
        if io.input_sets().is_empty() || objective_count == 0 {
            return Ok(());
        }

        let mut rows = Vec::new();
        for id in io.input_union() {
            let mapping = io.mapping(id)?;
            if mapping.is_evaluated() && mapping.objectives().len() == objective_count {
                rows.extend_from_slice(mapping.objectives());
            }
        }
        if rows.is_empty() {
            return Err(OperatorError::domain("the input sets have no evaluated mappings"));
        }

        let samples = Array2::from_shape_vec((rows.len() / objective_count, objective_count), rows)
            .map_err(|e| OperatorError::range(e.to_string()))?;
        let data = self.analyse(&samples);
        debug!(essential = ?data.essential, "objective reduction");
        io.state_mut().publish_reduction(data);
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(
                "VarianceThreshold",
                "Share of the variance the kept principal components must exceed.",
                self.variance_threshold,
            ),
            Parameter::new(
                "OperateOnFinal",
                "Only run once the pipeline signals termination.",
                self.operate_on_final,
            ),
        ]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "VarianceThreshold" => self.set_threshold(value.as_f64(name)?)?,
            "OperateOnFinal" => self.operate_on_final = value.as_bool(name)?,
            _ => return Err(ParamError::Unknown(name.to_owned())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;
    use strand_core::{Mapping, Problem};
    use strand_pipeline::{OptimizationContext, Pipeline};

    use super::*;

    #[test]
    fn correlation_of_linear_columns() {
        let samples = array![[1.0, 2.0, 5.0], [2.0, 4.0, 5.0], [3.0, 6.0, 5.0]];
        let r = correlation_matrix(&samples);
        assert_relative_eq!(r[[0, 1]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(r[[0, 2]], 0.0);
        assert_relative_eq!(r[[2, 2]], 1.0);
    }

    #[test]
    fn jacobi_recovers_known_spectrum() {
        let matrix = array![[2.0, 1.0], [1.0, 2.0]];
        let (values, vectors) = symmetric_eigen(&matrix);
        assert_relative_eq!(values[0], 3.0, epsilon = 1e-10);
        assert_relative_eq!(values[1], 1.0, epsilon = 1e-10);
        assert_relative_eq!(vectors[0][0].abs(), 0.5_f64.sqrt(), epsilon = 1e-10);
        assert_relative_eq!(vectors[0][0], vectors[0][1], epsilon = 1e-10);
    }

    #[test]
    fn conflicting_objectives_are_essential() {
        let samples = array![[0.0, 1.0, 0.0], [0.5, 0.5, 1.0], [1.0, 0.0, 2.0], [0.25, 0.75, 0.5]];
        let data = CorrelationObjectiveReduction::default().analyse(&samples);
        assert!(data.essential.contains(&1));
        assert!(data.essential.len() >= 2);
        assert_eq!(data.correlation.len(), 3);
    }

    fn pipeline_with(points: &[[f64; 3]], evaluated: bool) -> Pipeline {
        let mut pipeline = Pipeline::new(OptimizationContext::new(Problem::dtlz2(4, 3)));
        let problem = pipeline.context().problem().clone();
        let population = pipeline.state_mut().population_mut();
        let set = population.create_set([Tag::MainOptimizationSet]);
        for f in points {
            let mut mapping = Mapping::new(&problem);
            if evaluated {
                for (k, &v) in f.iter().enumerate() {
                    mapping.define_objective(k, v);
                }
            }
            let id = population.insert_mapping(mapping);
            population.append_to_set(set, id);
        }
        pipeline
    }

    #[test]
    fn publishes_reduction_data() {
        let mut pipeline = pipeline_with(&[[0.0, 1.0, 0.0], [0.5, 0.5, 1.0], [1.0, 0.0, 2.0]], true);
        let node = pipeline
            .add_node(CorrelationObjectiveReduction::default(), None)
            .unwrap();
        pipeline.evaluate(node).unwrap();
        let data = pipeline.state().reduction().unwrap();
        assert!(!data.essential.is_empty());
        assert_relative_eq!(data.correlation[0][2], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn unevaluated_input_is_an_error() {
        let mut pipeline = pipeline_with(&[[0.0, 1.0, 0.0]], false);
        let node = pipeline
            .add_node(CorrelationObjectiveReduction::default(), None)
            .unwrap();
        assert!(pipeline.evaluate(node).is_err());
        assert!(pipeline.state().reduction().is_none());
    }
}

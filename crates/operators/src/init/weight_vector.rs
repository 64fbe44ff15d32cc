use strand_core::lattice::{simplex_lattice, simplex_lattice_size};
use strand_core::Mapping;
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

use crate::sampling;

/// Gives every mapping of the main set a weight vector from a simplex
/// lattice.
///
/// The set is resized to the lattice size, dropping trailing mappings or
/// adding uniformly sampled ones, and weight vectors are assigned in set
/// order. With `points_per_dimension` at `-1` the lattice resolution is the
/// smallest one whose size reaches the set size seen on the first call.
///
/// Weights are assigned once per run. The node also turns on the
/// non-dominated archive, so that the nadir vector is maintained.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightVectorInit {
    points_per_dimension: i64,
    fixed_size: Option<usize>,
    assigned: bool,
}

impl Default for WeightVectorInit {
    fn default() -> Self {
        Self {
            points_per_dimension: -1,
            fixed_size: None,
            assigned: false,
        }
    }
}

impl WeightVectorInit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_points_per_dimension(mut self, h: i64) -> Self {
        self.points_per_dimension = h;
        self.assigned = false;
        self
    }

    fn resolution(&self, size: usize, objectives: usize) -> usize {
        if let Ok(h) = usize::try_from(self.points_per_dimension) {
            return h;
        }
        let mut h = 1;
        let mut lattice = objectives;
        while lattice < size {
            h += 1;
            lattice = simplex_lattice_size(h, objectives);
        }
        h
    }
}

impl Operator for WeightVectorInit {
    fn name(&self) -> &str {
        "WeightVectorInit"
    }

    fn description(&self) -> &str {
        "Resizes the main set to a simplex lattice and assigns one weight vector per mapping."
    }

    fn default_tags(&self) -> TagConfig {
        super::default_tags()
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        io.state_mut().define_keep_archive(true);
        if self.assigned {
            return Ok(());
        }

        let problem = io.problem();
        let objectives = problem.objective_len();
        while let Some(set) = io.next_output_set() {
            let size = *self.fixed_size.get_or_insert(io.members(set).len());
            if size < 3 {
                return Ok(());
            }

            let h = self.resolution(size, objectives);
            let lattice = simplex_lattice(h, objectives);

            let (population, rng) = io.population_and_rng();
            let mut members = population.members(set);
            members.truncate(lattice.len());
            while members.len() < lattice.len() {
                let mut mapping = Mapping::new(&problem);
                sampling::randomize(&mut mapping, &problem, rng);
                members.push(population.insert_mapping(mapping));
            }
            for (&id, weights) in members.iter().zip(&lattice) {
                if let Some(mapping) = population.mapping_mut(id) {
                    mapping.define_weights(weights.clone());
                }
            }
            if let Some(target) = population.set_mut(set) {
                target.set_members(members);
            }
            tracing::debug!(h, size = lattice.len(), "weight vectors assigned");
        }

        self.assigned = true;
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new(
            "NumberPointsPerDimension",
            "Lattice resolution; -1 derives it from the set size.",
            self.points_per_dimension,
        )]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "NumberPointsPerDimension" => {
                let h = value.as_i64(name)?;
                if h < -1 || h == 0 {
                    return Err(ParamError::invalid(name, "expected -1 or a positive resolution"));
                }
                self.points_per_dimension = h;
                self.assigned = false;
            }
            _ => return Err(ParamError::Unknown(name.to_owned())),
        }
        Ok(())
    }
}

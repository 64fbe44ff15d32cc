use std::str::FromStr;

use rand::Rng;
use strand_core::Tag;
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

use super::cost_of;
use crate::sampling;

/// How tournament contestants are paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMethod {
    /// Two independent uniform draws per tournament.
    Random,

    /// Consecutive pairs of a random permutation, re-drawn when exhausted.
    #[default]
    Shuffled,

    /// Consecutive pairs in set order, wrapping around.
    Ordered,
}

impl SelectionMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Random => "Random",
            Self::Shuffled => "Shuffled",
            Self::Ordered => "Ordered",
        }
    }
}

impl FromStr for SelectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Random" => Ok(Self::Random),
            "Shuffled" => Ok(Self::Shuffled),
            "Ordered" => Ok(Self::Ordered),
            other => Err(format!("unknown selection method `{other}`")),
        }
    }
}

/// Binary tournaments whose winners are cloned into recombination sets.
///
/// The union of the input sets competes. Each tournament clones the
/// contestant with the lower cost; winners are grouped
/// `mappings_per_set` at a time into fresh output sets. Previous output sets
/// are discarded first.
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentFiltrationForDirection {
    method: SelectionMethod,
    mappings_per_set: usize,
    number_of_mappings: i64,
}

impl Default for TournamentFiltrationForDirection {
    fn default() -> Self {
        Self {
            method: SelectionMethod::default(),
            mappings_per_set: 2,
            number_of_mappings: -1,
        }
    }
}

impl TournamentFiltrationForDirection {
    #[must_use]
    pub fn new(method: SelectionMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_mappings_per_set(mut self, n: usize) -> Self {
        self.mappings_per_set = n.max(1);
        self
    }

    /// Number of winners to produce; `-1` matches the number of contestants.
    #[must_use]
    pub fn with_number_of_mappings(mut self, n: i64) -> Self {
        self.number_of_mappings = n;
        self
    }

    #[must_use]
    pub fn method(&self) -> SelectionMethod {
        self.method
    }
}

/// Pairs contestants according to a [`SelectionMethod`].
struct Pairing {
    method: SelectionMethod,
    size: usize,
    order: Vec<usize>,
    next: usize,
}

impl Pairing {
    fn new(method: SelectionMethod, size: usize, rng: &mut impl Rng) -> Self {
        let order = match method {
            SelectionMethod::Shuffled => sampling::permutation(rng, size),
            _ => (0..size).collect(),
        };
        Self {
            method,
            size,
            order,
            next: 0,
        }
    }

    fn pair(&mut self, rng: &mut impl Rng) -> (usize, usize) {
        if self.method == SelectionMethod::Random {
            return (rng.gen_range(0..self.size), rng.gen_range(0..self.size));
        }

        let i = self.next;
        let a = self.order[i];
        let b = if i + 1 >= self.size { a } else { self.order[i + 1] };

        self.next += 2;
        if self.next >= self.size {
            self.next = 0;
            if self.method == SelectionMethod::Shuffled {
                self.order = sampling::permutation(rng, self.size);
            }
        }
        (a, b)
    }
}

impl Operator for TournamentFiltrationForDirection {
    fn name(&self) -> &str {
        "TournamentFiltrationForDirection"
    }

    fn description(&self) -> &str {
        "Clones binary tournament winners into sets for recombination."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new()
            .with_input([Tag::ForSelection])
            .with_output([Tag::ForDirection])
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        io.clear_output_sets();

        let contestants = io.input_union();
        if contestants.is_empty() {
            return Ok(());
        }
        let costs = contestants
            .iter()
            .map(|&id| cost_of(io, id))
            .collect::<Result<Vec<_>, _>>()?;

        let wanted = usize::try_from(self.number_of_mappings).unwrap_or(contestants.len());
        let mut pairing = Pairing::new(self.method, contestants.len(), io.rng());

        let mut produced = 0;
        while produced < wanted {
            io.append_output_set();
            for _ in 0..self.mappings_per_set {
                let (a, b) = pairing.pair(io.rng());
                let winner = if costs[a] < costs[b] { a } else { b };
                io.clone_mapping(contestants[winner])?;
                produced += 1;
                if produced >= wanted {
                    break;
                }
            }
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(
                "SelectionMethod",
                "Random, Shuffled or Ordered pairing of contestants.",
                self.method.as_str(),
            ),
            Parameter::new(
                "MappingsPerSet",
                "Number of winners grouped in each output set.",
                self.mappings_per_set,
            ),
            Parameter::new(
                "NumberOfMappings",
                "Number of winners; -1 matches the number of contestants.",
                self.number_of_mappings,
            ),
        ]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "SelectionMethod" => {
                self.method = value
                    .as_text(name)?
                    .parse()
                    .map_err(|reason: String| ParamError::invalid(name, reason))?;
            }
            "MappingsPerSet" => {
                let n = value.as_usize(name)?;
                if n == 0 {
                    return Err(ParamError::invalid(name, "must be positive"));
                }
                self.mappings_per_set = n;
            }
            "NumberOfMappings" => self.number_of_mappings = value.as_i64(name)?,
            _ => return Err(ParamError::Unknown(name.to_owned())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtration::fixture::{costed_set, output_costs, pipeline, run};

    #[test]
    fn ordered_tournaments_pick_the_cheaper_neighbour() {
        let mut pipeline = pipeline(1);
        costed_set(&mut pipeline, &[Tag::ForSelection], &[3.0, 1.0, 2.0, 5.0, 4.0]);

        let node = run(&mut pipeline, TournamentFiltrationForDirection::new(SelectionMethod::Ordered));

        // Pairs (0,1) (2,3) (4,4) then wrap to (0,1) (2,3).
        assert_eq!(
            output_costs(&pipeline, node),
            vec![vec![1.0, 2.0], vec![4.0, 1.0], vec![2.0]]
        );
    }

    #[test]
    fn winners_are_clones() {
        let mut pipeline = pipeline(2);
        let input = costed_set(&mut pipeline, &[Tag::ForSelection], &[1.0, 2.0, 3.0, 4.0]);
        let node = run(&mut pipeline, TournamentFiltrationForDirection::default());

        let population = pipeline.state().population();
        let originals = population.members(input);
        let outputs = pipeline.cursors(node).unwrap().outputs();
        assert_eq!(outputs.len(), 2);
        for &set in outputs {
            assert_eq!(population.members(set).len(), 2);
            assert!(population.members(set).iter().all(|id| !originals.contains(id)));
        }
        assert_eq!(population.mapping_count(), 8);
    }

    #[test]
    fn shuffled_selection_never_picks_the_worst() {
        let mut pipeline = pipeline(3);
        costed_set(&mut pipeline, &[Tag::ForSelection], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let node = run(
            &mut pipeline,
            TournamentFiltrationForDirection::new(SelectionMethod::Shuffled).with_number_of_mappings(12),
        );

        let costs: Vec<f64> = output_costs(&pipeline, node).concat();
        assert_eq!(costs.len(), 12);
        assert!(costs.iter().all(|&c| c < 6.0));
    }

    #[test]
    fn rerun_replaces_previous_output() {
        let mut pipeline = pipeline(4);
        costed_set(&mut pipeline, &[Tag::ForSelection], &[1.0, 2.0]);
        let node = run(&mut pipeline, TournamentFiltrationForDirection::new(SelectionMethod::Random));
        pipeline.evaluate_only_this_node(node).unwrap();
        assert_eq!(pipeline.cursors(node).unwrap().outputs().len(), 1);
        assert_eq!(pipeline.state().population().set_count(), 2);
    }
}

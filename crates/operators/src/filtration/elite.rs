//! Cost-ordered elites.

use strand_core::{MappingId, Tag};
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

use super::{ascending, cost_of};

fn ratio_parameter(ratio: f64) -> Vec<Parameter> {
    vec![Parameter::new(
        "EliteRatio",
        "Elite size relative to the number of input mappings.",
        ratio,
    )]
}

fn set_ratio(ratio: &mut f64, name: &str, value: &ParamValue) -> Result<(), ParamError> {
    match name {
        "EliteRatio" => {
            let r = value.as_f64(name)?;
            if !(0.0..=1.0).contains(&r) {
                return Err(ParamError::invalid(name, "must lie in [0, 1]"));
            }
            *ratio = r;
        }
        _ => return Err(ParamError::Unknown(name.to_owned())),
    }
    Ok(())
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn elite_size(total: usize, ratio: f64) -> usize {
    (total as f64 * ratio).ceil() as usize
}

/// The `n` cheapest of `ids`, cheapest first.
fn cheapest(io: &NodeIo<'_>, ids: &[MappingId], n: usize) -> Result<Vec<MappingId>, OperatorError> {
    let costs = ids
        .iter()
        .map(|&id| cost_of(io, id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ascending(&costs).into_iter().take(n).map(|i| ids[i]).collect())
}

/// NSGA-II survivor selection over ranked sets.
///
/// Whole ranks are taken in order while they fit in the elite; the rank
/// that does not fit contributes its cheapest members (lowest crowding
/// cost) to fill the remainder.
#[derive(Debug, Clone, PartialEq)]
pub struct NsgaIIEliteSelection {
    ratio: f64,
}

impl Default for NsgaIIEliteSelection {
    fn default() -> Self {
        Self { ratio: 0.5 }
    }
}

impl NsgaIIEliteSelection {
    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}

impl Operator for NsgaIIEliteSelection {
    fn name(&self) -> &str {
        "NsgaIIEliteSelection"
    }

    fn description(&self) -> &str {
        "Fills the elite with whole ranks, then with the least crowded of the next rank."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new()
            .with_input([Tag::Fitness, Tag::ForSelection])
            .with_output([Tag::ForNextIteration])
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        io.clear_output_sets();
        io.append_output_set();

        let ranks: Vec<Vec<MappingId>> = io.input_sets().iter().map(|&set| io.members(set)).collect();
        let size = elite_size(ranks.iter().map(Vec::len).sum(), self.ratio);

        let mut elite: Vec<MappingId> = Vec::with_capacity(size);
        for rank in &ranks {
            let missing = size - elite.len();
            if missing == 0 {
                break;
            }
            if rank.len() <= missing {
                elite.extend(rank);
            } else {
                elite.extend(cheapest(io, rank, missing)?);
                break;
            }
        }

        if let Some(set) = io.current_output_set().and_then(|id| io.population_mut().set_mut(id)) {
            set.set_members(elite);
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        ratio_parameter(self.ratio)
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        set_ratio(&mut self.ratio, name, value)
    }
}

/// The cheapest share of the union of the input sets.
#[derive(Debug, Clone, PartialEq)]
pub struct FitnessEliteSelection {
    ratio: f64,
}

impl Default for FitnessEliteSelection {
    fn default() -> Self {
        Self { ratio: 0.5 }
    }
}

impl FitnessEliteSelection {
    /// Creates the selection with the given elite ratio.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Invalid`] if `ratio` is outside `[0, 1]`.
    pub fn new(ratio: f64) -> Result<Self, ParamError> {
        let mut selection = Self::default();
        set_ratio(&mut selection.ratio, "EliteRatio", &ParamValue::Real(ratio))?;
        Ok(selection)
    }
}

impl Operator for FitnessEliteSelection {
    fn name(&self) -> &str {
        "FitnessEliteSelection"
    }

    fn description(&self) -> &str {
        "Keeps the cheapest share of the input mappings."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new()
            .with_input([Tag::ForSelection, Tag::Fitness])
            .with_output([Tag::ForNextIteration])
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        io.clear_output_sets();
        let set = io.append_output_set();

        let union = io.input_union();
        let elite = cheapest(io, &union, elite_size(union.len(), self.ratio))?;
        if let Some(target) = io.population_mut().set_mut(set) {
            target.set_members(elite);
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        ratio_parameter(self.ratio)
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        set_ratio(&mut self.ratio, name, value)
    }
}

/// Shrinks each output set in place to its `set_size` cheapest members.
///
/// Sets already within the size are left untouched; `-1` disables the
/// operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncateSets {
    set_size: i64,
}

impl Default for TruncateSets {
    fn default() -> Self {
        Self { set_size: -1 }
    }
}

impl TruncateSets {
    #[must_use]
    pub fn new(set_size: i64) -> Self {
        Self { set_size }
    }
}

impl Operator for TruncateSets {
    fn name(&self) -> &str {
        "TruncateSets"
    }

    fn description(&self) -> &str {
        "Keeps the cheapest mappings of each set."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new().with_output([Tag::ForResize])
    }

    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        let Ok(size) = usize::try_from(self.set_size) else {
            return Ok(());
        };
        while let Some(set) = io.next_output_set() {
            let members = io.members(set);
            if members.len() <= size {
                continue;
            }
            let kept = cheapest(io, &members, size)?;
            if let Some(target) = io.population_mut().set_mut(set) {
                target.set_members(kept);
            }
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new(
            "SetSize",
            "Maximum set size; -1 keeps every mapping.",
            self.set_size,
        )]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "SetSize" => self.set_size = value.as_i64(name)?,
            _ => return Err(ParamError::Unknown(name.to_owned())),
        }
        Ok(())
    }
}

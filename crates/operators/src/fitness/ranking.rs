use strand_core::{
    ConstrainedDominance, DominanceMode, DominanceRelation, MappingId, ParetoDominance, Preferability,
    PreferabilityConstraintHandling, Problem, Tag, non_dominated_sort,
};
use strand_pipeline::{NodeIo, Operator, OperatorError, ParamError, ParamValue, Parameter, TagConfig};

/// Sorts the first input set into non-dominated fronts.
///
/// Every front becomes an output set, best first, and each member's cost is
/// set to its front index. The dominance relation follows the problem:
/// goals bring in preferability and constraints bring in feasibility, each
/// unless switched off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonDominanceRanking {
    preferability: bool,
    constraint_handling: bool,
}

impl Default for NonDominanceRanking {
    fn default() -> Self {
        Self {
            preferability: true,
            constraint_handling: true,
        }
    }
}

impl NonDominanceRanking {
    #[must_use]
    pub fn with_preferability(mut self, used: bool) -> Self {
        self.preferability = used;
        self
    }

    #[must_use]
    pub fn with_constraint_handling(mut self, used: bool) -> Self {
        self.constraint_handling = used;
        self
    }

    /// The relation used to rank mappings of `problem`.
    #[must_use]
    pub fn relation(&self, problem: &Problem) -> Box<dyn DominanceRelation> {
        let mode = DominanceMode::Weak;
        let goals = self.preferability && problem.has_goals();
        let constraints = self.constraint_handling && problem.has_constraints();

        let preference = || Preferability::new(mode, problem.goals(), problem.priorities());
        let feasibility = || ConstrainedDominance::new(mode, problem.thresholds());
        match (goals, constraints) {
            (true, true) => Box::new(PreferabilityConstraintHandling::new(feasibility(), preference())),
            (true, false) => Box::new(preference()),
            (false, true) => Box::new(feasibility()),
            (false, false) => Box::new(ParetoDominance::new(mode)),
        }
    }
}

impl Operator for NonDominanceRanking {
    fn name(&self) -> &str {
        "NonDominanceRanking"
    }

    fn description(&self) -> &str {
        "Splits the main set into non-dominated fronts ranked by cost."
    }

    fn default_tags(&self) -> TagConfig {
        TagConfig::new()
            .with_input([Tag::MainOptimizationSet])
            .with_output([Tag::ForSelection, Tag::Fitness])
    }

    #[allow(clippy::cast_precision_loss)]
    fn evaluate_node(&mut self, io: &mut NodeIo<'_>) -> Result<(), OperatorError> {
        io.clear_output_sets();
        let Some(input) = io.input_set(0) else {
            return Ok(());
        };
        let members = io.members(input);
        let relation = self.relation(&io.problem());

        let fronts = {
            let mappings = members
                .iter()
                .map(|&id| io.mapping(id))
                .collect::<Result<Vec<_>, _>>()?;
            let outcomes: Vec<_> = mappings.iter().map(|m| m.outcome()).collect();
            non_dominated_sort(&outcomes, relation.as_ref())
        };

        for (rank, front) in fronts.into_iter().enumerate() {
            let set = io.append_output_set();
            let ids: Vec<MappingId> = front.into_iter().map(|i| members[i]).collect();
            for &id in &ids {
                io.mapping_mut(id)?.define_cost(rank as f64);
            }
            if let Some(target) = io.population_mut().set_mut(set) {
                target.set_members(ids);
            }
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(
                "IsPreferabilityUsed",
                "Rank by preferability when the problem defines goals.",
                self.preferability,
            ),
            Parameter::new(
                "IsConstrainedHandlingUsed",
                "Rank feasible mappings first when the problem has constraints.",
                self.constraint_handling,
            ),
        ]
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        match name {
            "IsPreferabilityUsed" => self.preferability = value.as_bool(name)?,
            "IsConstrainedHandlingUsed" => self.constraint_handling = value.as_bool(name)?,
            _ => return Err(ParamError::Unknown(name.to_owned())),
        }
        Ok(())
    }
}

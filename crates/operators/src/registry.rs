//! The built-in operator registry.

use strand_pipeline::{Engine, OperatorRegistry};

use crate::convergence::Hypervolume;
use crate::filtration::{
    FitnessEliteSelection, MergeForNextIteration, NsgaIIEliteSelection, RandFiltrationForPerturbation,
    RandSetReplacement, RouletteWheelSelection, StochasticUniversalSampling,
    TournamentFiltrationForDirection, TruncateSets,
};
use crate::fitness::{
    GeneralizedDecomposition, NonDominanceRanking, NsgaIICrowding, Scalarization, SharedFitness,
    SimplexLatticeDirectionIterator,
};
use crate::init::{LhsInit, RandomInit, UserDefinedInit, WeightVectorInit};
use crate::variation::{
    CategoricalPerturbation, IntegerMutation, PolynomialMutation, SbxCrossover, SinglePointCrossover,
};
use crate::{CorrelationObjectiveReduction, Evaluator, Formulation, NsgaII, Termination};

/// A registry holding every operator of this crate under its operator name,
/// plus the [`NsgaII`] algorithm under [`NsgaII::NAME`].
#[must_use]
pub fn builtin_registry() -> OperatorRegistry {
    let mut registry = OperatorRegistry::new();

    registry.register_operator("Start", || strand_pipeline::Start);
    registry.register_operator("Formulation", Formulation::default);

    registry.register_operator("RandomInit", RandomInit::default);
    registry.register_operator("LhsInit", LhsInit::default);
    registry.register_operator("UserDefinedInit", || UserDefinedInit::new(Vec::new()));
    registry.register_operator("WeightVectorInit", WeightVectorInit::default);

    registry.register_operator("Evaluator", Evaluator::default);

    registry.register_operator("TournamentFiltrationForDirection", TournamentFiltrationForDirection::default);
    registry.register_operator("RandFiltrationForPerturbation", RandFiltrationForPerturbation::default);
    registry.register_operator("RouletteWheelSelection", RouletteWheelSelection::default);
    registry.register_operator("StochasticUniversalSampling", StochasticUniversalSampling::default);
    registry.register_operator("NsgaIIEliteSelection", NsgaIIEliteSelection::default);
    registry.register_operator("FitnessEliteSelection", FitnessEliteSelection::default);
    registry.register_operator("TruncateSets", TruncateSets::default);
    registry.register_operator("RandSetReplacement", RandSetReplacement::default);
    registry.register_operator("MergeForNextIteration", || MergeForNextIteration);

    registry.register_operator("SbxCrossover", SbxCrossover::default);
    registry.register_operator("SinglePointCrossover", SinglePointCrossover::default);
    registry.register_operator("PolynomialMutation", PolynomialMutation::default);
    registry.register_operator("IntegerMutation", IntegerMutation::default);
    registry.register_operator("CategoricalPerturbation", CategoricalPerturbation::default);

    registry.register_operator("NonDominanceRanking", NonDominanceRanking::default);
    registry.register_operator("NsgaIICrowding", || NsgaIICrowding);
    registry.register_operator("Scalarization", Scalarization::default);
    registry.register_operator("GeneralizedDecomposition", GeneralizedDecomposition::default);
    registry.register_operator("SimplexLatticeDirectionIterator", SimplexLatticeDirectionIterator::default);
    registry.register_operator("SharedFitness", SharedFitness::default);

    registry.register_operator("Hypervolume", Hypervolume::default);
    registry.register_operator("CorrelationObjectiveReduction", CorrelationObjectiveReduction::default);
    registry.register_operator("Termination", Termination::default);

    registry.register_algorithm(NsgaII::NAME, NsgaII::build);
    registry
}

/// An [`Engine`] backed by [`builtin_registry`].
#[must_use]
pub fn engine() -> Engine {
    Engine::new(builtin_registry())
}

use strand_core::problem::{Objective, Variable};
use strand_core::{Problem, Tag};
use strand_operators::filtration::RandFiltrationForPerturbation;
use strand_operators::fitness::NonDominanceRanking;
use strand_operators::{Evaluator, Hypervolume, NsgaII, RandomInit, Termination, engine};
use strand_pipeline::flow::{Action, Event, Status};
use strand_pipeline::{
    ErrorState, OperatorSpec, OptimizationContext, OptimizationLinearFlow, Pipeline, Start,
};

fn main_set_size(pipeline: &Pipeline) -> usize {
    let population = pipeline.state().population();
    population
        .set_with_tag(&Tag::MainOptimizationSet, 0)
        .map_or(0, |set| population.members(set).len())
}

#[test]
fn one_pass_ranks_an_evaluated_main_set() {
    let mut pipeline = Pipeline::new(OptimizationContext::new(Problem::zdt1(3)).with_seed(3));
    let init = pipeline.add_node(RandomInit::new(10), None).unwrap();
    let evaluator = pipeline.add_node(Evaluator::default(), Some(init)).unwrap();
    let ranking = pipeline
        .add_node(NonDominanceRanking::default(), Some(evaluator))
        .unwrap();
    let termination = pipeline.add_node(Termination::new(1, 0), Some(ranking)).unwrap();

    let mut flow = OptimizationLinearFlow::new(pipeline);
    for node in [init, evaluator, ranking, termination] {
        flow.append_node(node).unwrap();
    }
    assert_eq!(flow.size(), 4);
    flow.evaluate().unwrap();

    let pipeline = flow.pipeline();
    let population = pipeline.state().population();
    let main = population.set_with_tag(&Tag::MainOptimizationSet, 0).unwrap();
    let members = population.members(main);
    assert_eq!(members.len(), 10);
    for id in members {
        let mapping = population.mapping(id).unwrap();
        assert!(mapping.is_evaluated());
        assert!(mapping.cost().is_some());
    }
    assert!(flow.is_terminate());
    assert_eq!(flow.used_budget(), 10);
}

fn perturbation_pool(seed: u64) -> Vec<Vec<f64>> {
    let mut pipeline = Pipeline::new(OptimizationContext::new(Problem::zdt1(3)).with_seed(seed));
    let init = pipeline.add_node(RandomInit::new(10), None).unwrap();
    pipeline
        .tags_mut(init)
        .unwrap()
        .add_additional_output(Tag::ForFiltration);
    let filtration = pipeline
        .add_node(RandFiltrationForPerturbation::new(0.5).unwrap(), Some(init))
        .unwrap();
    pipeline.evaluate(filtration).unwrap();

    let outputs = pipeline.cursors(filtration).unwrap().outputs().to_vec();
    assert_eq!(outputs.len(), 1);
    let population = pipeline.state().population();
    population
        .members(outputs[0])
        .into_iter()
        .map(|id| population.mapping(id).unwrap().decision_values())
        .collect()
}

#[test]
fn perturbation_pool_is_sized_by_ratio_and_reproducible() {
    let pool = perturbation_pool(21);
    assert_eq!(pool.len(), 5);
    assert_eq!(pool, perturbation_pool(21));
}

#[test]
fn evaluator_without_functions_halts_its_node() {
    let problem = Problem::new()
        .with_variables([Variable::real("x", 0.0, 1.0)])
        .with_objectives([Objective::minimize("f")]);
    let mut pipeline = Pipeline::new(OptimizationContext::new(problem));
    let init = pipeline.add_node(RandomInit::new(4), None).unwrap();
    let evaluator = pipeline.add_node(Evaluator::default(), Some(init)).unwrap();

    assert!(pipeline.evaluate(evaluator).is_err());
    assert_eq!(pipeline.error_state(evaluator).unwrap(), ErrorState::UndefinedError);
    assert_eq!(pipeline.error_state(init).unwrap(), ErrorState::NoError);

    let outputs = pipeline.cursors(evaluator).unwrap().outputs().to_vec();
    let mappings = pipeline.state().population().mapping_count();
    pipeline.evaluate(evaluator).unwrap();
    assert_eq!(pipeline.cursors(evaluator).unwrap().outputs(), outputs.as_slice());
    assert_eq!(pipeline.state().population().mapping_count(), mappings);
    assert_eq!(pipeline.state().used_budget(), 0);
}

#[test]
fn evaluating_only_this_node_twice_changes_nothing() {
    let mut pipeline = Pipeline::new(OptimizationContext::new(Problem::zdt1(3)).with_seed(5));
    let init = pipeline.add_node(RandomInit::new(6), None).unwrap();
    let evaluator = pipeline.add_node(Evaluator::default(), Some(init)).unwrap();
    pipeline.evaluate(evaluator).unwrap();
    assert_eq!(pipeline.state().used_budget(), 6);

    pipeline.evaluate_only_this_node(evaluator).unwrap();
    pipeline.evaluate_only_this_node(init).unwrap();
    assert_eq!(pipeline.state().used_budget(), 6);
    assert_eq!(main_set_size(&pipeline), 6);
}

fn nsga2_flow(seed: u64, termination: Termination) -> OptimizationLinearFlow {
    let mut pipeline = Pipeline::new(OptimizationContext::new(Problem::zdt1(5)).with_seed(seed));
    let start = pipeline.add_node(Start, None).unwrap();
    let init = pipeline.add_node(RandomInit::new(10), Some(start)).unwrap();
    let evaluator = pipeline.add_node(Evaluator::default(), Some(init)).unwrap();
    let algorithm = NsgaII::build(&mut pipeline, Some(evaluator)).unwrap();
    let hypervolume = pipeline
        .add_node(
            Hypervolume::default().with_reference(vec![11.0, 11.0]),
            algorithm.final_node(),
        )
        .unwrap();
    let end = pipeline.add_node(termination, Some(hypervolume)).unwrap();

    let mut flow = OptimizationLinearFlow::new(pipeline);
    for node in [start, init, evaluator, hypervolume, end] {
        flow.append_node(node).unwrap();
    }
    flow
}

#[test]
fn nsga2_runs_until_the_iteration_cap() {
    let mut flow = nsga2_flow(8, Termination::new(5, 0));
    let mut iterations = Vec::new();
    let summary = flow
        .run(|event: &Event<'_>| {
            iterations.push(event.iteration());
            None
        })
        .unwrap();

    assert_eq!(summary.status, Status::Terminated);
    assert_eq!(summary.generations, 5);
    assert_eq!(iterations, vec![1, 2, 3, 4, 5]);
    assert_eq!(main_set_size(flow.pipeline()), 10);

    let value = flow.pipeline().state().indicator(Hypervolume::INDICATOR).unwrap();
    assert!(value > 0.0);
    assert!(value < 121.0);
}

#[test]
fn observers_can_stop_a_run() {
    let mut flow = nsga2_flow(8, Termination::new(50, 0));
    let summary = flow
        .run(|event: &Event<'_>| (event.iteration() == 2).then_some(Action::StopEarly))
        .unwrap();
    assert_eq!(summary.status, Status::StoppedByObserver);
    assert_eq!(summary.generations, 2);
    assert!(!flow.is_terminate());
}

#[test]
fn budget_accounting_adds_up() {
    let budget = 30;
    let mut flow = nsga2_flow(13, Termination::new(0, budget));
    let summary = flow
        .run(|event: &Event<'_>| {
            let Event::Generation {
                used_budget,
                remaining_budget,
                ..
            } = *event;
            if used_budget <= budget {
                assert_eq!(used_budget + remaining_budget, budget);
            } else {
                assert_eq!(remaining_budget, 0);
            }
            None
        })
        .unwrap();

    assert_eq!(summary.status, Status::Terminated);
    assert!(summary.used_budget >= budget);
    assert_eq!(flow.remaining_budget(), 0);
}

#[test]
fn flows_assemble_from_json_specs() {
    let document = r#"[
        { "name": "Start" },
        { "name": "RandomInit", "parameters": { "SetSize": 12 } },
        { "name": "Evaluator", "parameters": { "Parallel": true } },
        { "name": "NSGAII" },
        { "name": "Hypervolume", "parameters": { "ReferencePoint": [11.0, 11.0] } },
        { "name": "Termination", "parameters": { "MaxIteration": 3 } }
    ]"#;
    let specs: Vec<OperatorSpec> = serde_json::from_str(document).unwrap();

    let mut engine = engine();
    let pipeline = Pipeline::new(OptimizationContext::new(Problem::zdt1(4)).with_seed(2));
    let index = engine.append_flow(OptimizationLinearFlow::new(pipeline));

    let mut parent = None;
    for spec in &specs {
        let node = engine.create_from_spec(spec, parent).unwrap();
        engine.current_flow_mut().unwrap().append_node(node).unwrap();
        parent = Some(node);
    }
    let flow = engine.current_flow().unwrap();
    assert_eq!(flow.size(), 6);
    assert_eq!(flow.pipeline().len(), 13);

    for _ in 0..3 {
        engine.evaluate_flow(index).unwrap();
        engine.current_flow_mut().unwrap().increment_iteration();
    }
    let flow = engine.current_flow().unwrap();
    assert_eq!(main_set_size(flow.pipeline()), 12);
    assert!(flow.pipeline().state().indicator(Hypervolume::INDICATOR).is_some());

    let rejected = OperatorSpec::new("Termination").with("Generations", 3_usize);
    assert!(engine.create_from_spec(&rejected, parent).is_none());
    assert!(engine.create_operator("Simplex", parent).is_none());
}


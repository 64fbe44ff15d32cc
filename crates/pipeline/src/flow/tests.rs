use strand_core::Problem;

use super::*;
use crate::{NodeIo, OperatorError, OptimizationContext, Start};

/// Charges one evaluation per call and caps the run at `cap` iterations.
fn capped(cap: usize) -> impl crate::Operator {
    ("Capped", move |io: &mut NodeIo<'_>| -> Result<(), OperatorError> {
        let state = io.state_mut();
        state.define_max_iteration(cap);
        state.decrement_budget(1);
        let done = state.is_exhausted(state.current_iteration() + 1, state.used_budget());
        state.signal_termination(done);
        Ok(())
    })
}

fn flow_with(operator: impl crate::Operator + 'static) -> OptimizationLinearFlow {
    let mut pipeline = Pipeline::new(OptimizationContext::new(Problem::zdt1(2)));
    let start = pipeline.add_node(Start, None).unwrap();
    let tail = pipeline.add_node(operator, Some(start)).unwrap();

    let mut flow = OptimizationLinearFlow::new(pipeline);
    flow.append_node(start).unwrap();
    flow.append_node(tail).unwrap();
    flow
}

#[test]
fn navigation_stops_at_the_ends() {
    let mut flow = flow_with(Start);
    let start = flow.node(0).unwrap();
    let tail = flow.node(1).unwrap();

    assert_eq!(flow.current_node(), Some(tail));
    assert_eq!(flow.next_node(), None);
    assert_eq!(flow.previous_node(), Some(start));
    assert_eq!(flow.previous_node(), None);
    assert_eq!(flow.current_index(), 0);
    assert!(!flow.set_current_index(2));
    assert_eq!(flow.final_node(), Some(tail));

    flow.clear();
    assert_eq!(flow.size(), 0);
    assert!(matches!(flow.evaluate(), Err(Error::Empty)));
}

#[test]
fn run_stops_at_the_iteration_cap() {
    let mut flow = flow_with(capped(3));
    let mut seen = Vec::new();

    let summary = flow
        .run(|event: &Event<'_>| {
            seen.push(event.iteration());
            None
        })
        .unwrap();

    assert_eq!(summary.status, Status::Terminated);
    assert_eq!(summary.generations, 3);
    assert_eq!(summary.iteration, 3);
    assert_eq!(summary.used_budget, 3);
    assert_eq!(seen, vec![1, 2, 3]);
}

#[test]
fn observer_can_stop_early() {
    let mut flow = flow_with(capped(10));
    let summary = flow
        .run(|event: &Event<'_>| (event.iteration() == 2).then_some(Action::StopEarly))
        .unwrap();

    assert_eq!(summary.status, Status::StoppedByObserver);
    assert_eq!(summary.generations, 2);
    assert!(!flow.is_terminate());
}

#[test]
fn zero_caps_terminate_after_one_generation() {
    let mut flow = flow_with(capped(0));
    let summary = flow.run(()).unwrap();
    assert_eq!(summary.status, Status::Terminated);
    assert_eq!(summary.generations, 1);
}

#[test]
fn generation_limit_bounds_an_endless_run() {
    let mut flow = flow_with(capped(1_000)).with_config(Config::new(4).unwrap());
    let summary = flow.run(()).unwrap();
    assert_eq!(summary.status, Status::MaxGenerations);
    assert_eq!(summary.generations, 4);

    assert_eq!(Config::new(0), Err(ConfigError::MaxGenerations));
}

#[test]
fn broken_flow_is_halted() {
    let mut flow = flow_with((
        "Broken",
        |_: &mut NodeIo<'_>| -> Result<(), OperatorError> { Err(OperatorError::domain("bad")) },
    ));

    assert!(matches!(flow.evaluate(), Err(Error::Pipeline(_))));
    match flow.evaluate() {
        Err(Error::Halted { name, .. }) => assert_eq!(name, "Broken"),
        other => panic!("expected a halted flow, got {other:?}"),
    }
}

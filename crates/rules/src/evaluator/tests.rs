use std::sync::Arc;

use vigil_core::{Sample, Value};

use super::prefetch::prepare;
use super::*;
use crate::schema::AnalyticDefinition;
use crate::test_support::{
    building_store, collaborators, definition, node, plan, point_descriptor, MINUTE, T0,
};

fn inputs(pairs: &[(u32, Value)]) -> InputValues {
    pairs.iter().cloned().collect()
}

fn average_definition() -> AnalyticDefinition {
    definition(
        &[("R", &["A0"]), ("A0", &["I0", "I1"])],
        &[("A0", "AVERAGE")],
        vec![
            ("I0", point_descriptor("Temperature")),
            ("I1", point_descriptor("Humidity")),
        ],
    )
}

#[test]
fn average_of_two_inputs() {
    let registry = AlgorithmRegistry::with_builtins();
    let outcome = Evaluator::new(&registry)
        .evaluate(
            &plan(average_definition()),
            &inputs(&[(0, Value::Number(10.0)), (1, Value::Number(20.0))]),
        )
        .unwrap();
    assert_eq!(outcome, StepOutcome::Value(Value::Number(15.0)));
}

#[test]
fn root_with_direct_input_returns_it_unchanged() {
    let registry = AlgorithmRegistry::with_builtins();
    let p = plan(definition(
        &[("R", &["I0"])],
        &[],
        vec![("I0", point_descriptor("Temperature"))],
    ));
    let list = Value::List(vec![Value::Number(1.0), Value::Number(2.0)]);
    let outcome = Evaluator::new(&registry)
        .evaluate(&p, &inputs(&[(0, list.clone())]))
        .unwrap();
    assert_eq!(outcome, StepOutcome::Value(list));
}

#[test]
fn missing_input_is_data_unavailable() {
    let registry = AlgorithmRegistry::with_builtins();
    let err = Evaluator::new(&registry)
        .evaluate(&plan(average_definition()), &inputs(&[(0, Value::Number(10.0))]))
        .unwrap_err();
    assert!(matches!(err, AnalyticError::DataUnavailable(ref step) if step == "I1"));
}

#[test]
fn list_inputs_are_spliced() {
    let registry = AlgorithmRegistry::with_builtins();
    let mut def = definition(
        &[("R", &["A0"]), ("A0", &["I0"])],
        &[("A0", "THRESHOLD_ABOVE")],
        vec![("I0", point_descriptor("Temperature"))],
    );
    def.parameters.insert("A0-p1".to_string(), Value::Number(5.0));
    let outcome = Evaluator::new(&registry)
        .evaluate(
            &plan(def),
            &inputs(&[(0, Value::List(vec![Value::Number(3.0), Value::Number(7.0)]))]),
        )
        .unwrap();
    assert_eq!(outcome, StepOutcome::Value(Value::Bool(true)));
}

#[test]
fn exit_short_circuits_remaining_steps() {
    let registry = AlgorithmRegistry::with_builtins();
    // A1 would fail with a missing input if it ran after the EXIT.
    let p = plan(definition(
        &[("R", &["A2"]), ("A2", &["A0", "A1"]), ("A0", &["I0"]), ("A1", &["I1"])],
        &[("A0", EXIT), ("A1", "COPY_FIRST"), ("A2", "AND")],
        vec![
            ("I0", point_descriptor("Occupancy")),
            ("I1", point_descriptor("Temperature")),
        ],
    ));
    let outcome = Evaluator::new(&registry)
        .evaluate(&p, &inputs(&[(0, Value::Bool(true))]))
        .unwrap();
    assert_eq!(outcome, StepOutcome::Exit);

    let outcome = Evaluator::new(&registry)
        .evaluate(&p, &inputs(&[(0, Value::Bool(false)), (1, Value::Bool(true))]))
        .unwrap();
    assert_eq!(outcome, StepOutcome::Value(Value::Bool(false)));
}

#[test]
fn shared_steps_are_computed_once() {
    let registry = AlgorithmRegistry::with_builtins();
    // A0 feeds both A1 and A2; memoization keeps the diamond consistent.
    let p = plan(definition(
        &[
            ("R", &["A3"]),
            ("A3", &["A1", "A2"]),
            ("A1", &["A0"]),
            ("A2", &["A0"]),
            ("A0", &["I0", "I1"]),
        ],
        &[("A0", "SUM"), ("A1", "COPY_FIRST"), ("A2", "COPY_LAST"), ("A3", "SUBTRACTION")],
        vec![
            ("I0", point_descriptor("Temperature")),
            ("I1", point_descriptor("Humidity")),
        ],
    ));
    let outcome = Evaluator::new(&registry)
        .evaluate(&p, &inputs(&[(0, Value::Number(2.0)), (1, Value::Number(3.0))]))
        .unwrap();
    assert_eq!(outcome, StepOutcome::Value(Value::Number(0.0)));
}

#[test]
fn undefined_result_is_an_error() {
    let registry = AlgorithmRegistry::with_builtins();
    let p = plan(definition(
        &[("R", &["A0"]), ("A0", &["I0", "I1"])],
        &[("A0", "DIVISION")],
        vec![
            ("I0", point_descriptor("Temperature")),
            ("I1", point_descriptor("Humidity")),
        ],
    ));
    let err = Evaluator::new(&registry)
        .evaluate(&p, &inputs(&[(0, Value::Number(1.0)), (1, Value::Number(0.0))]))
        .unwrap_err();
    assert!(matches!(err, AnalyticError::UndefinedResult(ref step) if step == "A0"));
}

#[test]
fn cycle_is_caught_during_evaluation() {
    let registry = AlgorithmRegistry::with_builtins();
    let def = definition(
        &[("R", &["A0"]), ("A0", &["A1"]), ("A1", &["A0"])],
        &[("A0", "COPY_FIRST"), ("A1", "COPY_FIRST")],
        vec![],
    );
    // Skip the build-time check to exercise the on-stack guard.
    let p = AnalyticPlan::assemble(def, &registry).unwrap();
    let err = Evaluator::new(&registry)
        .evaluate(&p, &InputValues::new())
        .unwrap_err();
    assert!(matches!(err, AnalyticError::Cycle(ref step) if step == "A0"));
}

#[tokio::test]
async fn prefetch_slices_one_fetch_per_time() {
    let store = Arc::new(building_store());
    let collab = collaborators(store.clone());
    let mut series = point_descriptor("Temperature");
    series.series_duration = Some(20 * MINUTE);
    series.inject_last_value = true;
    let p = plan(definition(
        &[("R", &["A0"]), ("A0", &["I0", "I1"])],
        &[("A0", "COPY_LAST")],
        vec![("I0", series), ("I1", point_descriptor("Humidity"))],
    ));

    let times = [T0, T0 + 10 * MINUTE];
    let prepared = prepare(&collab, &p, &node(&store, "r1"), &times).await.unwrap();
    assert_eq!(prepared.len(), 2);

    let first = prepared.at(T0);
    assert_eq!(
        first.get(0),
        Some(&Value::Series(vec![
            Sample::new(T0 - 20 * MINUTE, 20.0),
            Sample::new(T0 - 10 * MINUTE, 21.0),
            Sample::new(T0, 21.0),
        ]))
    );
    assert_eq!(first.get(1), Some(&Value::Number(40.0)));

    let second = prepared.at(T0 + 10 * MINUTE);
    assert_eq!(
        second.get(0),
        Some(&Value::Series(vec![
            Sample::new(T0 - 10 * MINUTE, 21.0),
            Sample::new(T0 + 5 * MINUTE, 23.0),
            Sample::new(T0 + 10 * MINUTE, 23.0),
        ]))
    );

    let registry = AlgorithmRegistry::with_builtins();
    let outcome = Evaluator::new(&registry).evaluate(&p, &second).unwrap();
    assert_eq!(outcome, StepOutcome::Value(Value::Number(40.0)));
}

#[tokio::test]
async fn prefetch_leaves_unlocated_inputs_empty() {
    let store = Arc::new(building_store());
    let collab = collaborators(store.clone());
    let p = plan(definition(
        &[("R", &["I0"])],
        &[],
        vec![("I0", point_descriptor("CO2"))],
    ));
    let prepared = prepare(&collab, &p, &node(&store, "r1"), &[T0]).await.unwrap();
    assert!(prepared.at(T0).is_empty());
}

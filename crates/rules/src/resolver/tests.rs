use std::sync::Arc;

use vigil_core::{Sample, Value};

use super::*;
use crate::schema::TrackingMethod;
use crate::test_support::{building_store, collaborators, node, point_descriptor, MINUTE, T0};

fn setup() -> (Arc<vigil_graph::MemoryStore>, Collaborators) {
    let store = Arc::new(building_store());
    let collab = collaborators(store.clone());
    (store, collab)
}

#[tokio::test]
async fn exact_name_on_current_node() {
    let (store, collab) = setup();
    let value = resolve(&collab, &point_descriptor("Temperature"), &node(&store, "r1"), T0)
        .await
        .unwrap();
    assert_eq!(value, Some(Value::Number(22.5)));
}

#[tokio::test]
async fn negative_depth_is_not_found() {
    let (store, collab) = setup();
    let mut descriptor = point_descriptor("Temperature");
    descriptor.depth = -1;
    let value = resolve(&collab, &descriptor, &node(&store, "r1"), T0).await.unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn non_strict_descends_until_a_level_matches() {
    let (store, collab) = setup();
    let mut descriptor = point_descriptor("Temperature");
    descriptor.depth = 2;
    let value = resolve(&collab, &descriptor, &node(&store, "f1"), T0).await.unwrap();
    assert_eq!(value, Some(Value::Number(22.5)));
}

#[tokio::test]
async fn multi_match_collects_the_whole_level() {
    let (store, collab) = setup();
    let mut descriptor = point_descriptor("Temperature");
    descriptor.depth = 1;
    descriptor.multiple = true;
    let value = resolve(&collab, &descriptor, &node(&store, "f1"), T0).await.unwrap();
    assert_eq!(
        value,
        Some(Value::List(vec![
            Value::Number(22.5),
            Value::Number(26.0),
            Value::Number(25.0),
        ]))
    );
}

#[tokio::test]
async fn strict_depth_skips_shallower_matches() {
    let (store, collab) = setup();
    let mut descriptor = point_descriptor("Temperature");
    descriptor.depth = 1;
    descriptor.multiple = true;

    let shallow = resolve(&collab, &descriptor, &node(&store, "b1"), T0).await.unwrap();
    assert_eq!(shallow, Some(Value::List(vec![Value::Number(12.0)])));

    descriptor.strict_depth = true;
    let strict = resolve(&collab, &descriptor, &node(&store, "b1"), T0).await.unwrap();
    assert_eq!(strict, None);

    descriptor.depth = 2;
    let deep = resolve(&collab, &descriptor, &node(&store, "b1"), T0).await.unwrap();
    assert_eq!(
        deep,
        Some(Value::List(vec![
            Value::Number(22.5),
            Value::Number(26.0),
            Value::Number(25.0),
        ]))
    );
}

#[tokio::test]
async fn traversal_follows_only_allowed_relations() {
    let (store, collab) = setup();
    let mut descriptor = point_descriptor("Temperature");
    descriptor.depth = 2;
    descriptor.relations = vec!["hasFloor".to_string()];
    let blocked = resolve(&collab, &descriptor, &node(&store, "b1"), T0).await.unwrap();
    assert_eq!(blocked, None);

    descriptor.relations.push("hasSpace".to_string());
    let allowed = resolve(&collab, &descriptor, &node(&store, "b1"), T0).await.unwrap();
    assert_eq!(allowed, Some(Value::Number(22.5)));
}

#[tokio::test]
async fn control_points_use_their_own_relation() {
    let (store, collab) = setup();
    let r1 = node(&store, "r1");

    let mut descriptor = point_descriptor("Setpoint");
    assert_eq!(resolve(&collab, &descriptor, &r1, T0).await.unwrap(), None);

    descriptor.method = TrackingMethod::ControlPointName;
    assert_eq!(
        resolve(&collab, &descriptor, &r1, T0).await.unwrap(),
        Some(Value::Number(21.0))
    );
}

#[tokio::test]
async fn attributes_are_typed() {
    let (store, collab) = setup();
    let r1 = node(&store, "r1");
    let mut descriptor = point_descriptor("Spatial:area");
    descriptor.method = TrackingMethod::AttributeName;
    assert_eq!(
        resolve(&collab, &descriptor, &r1, T0).await.unwrap(),
        Some(Value::Number(24.0))
    );

    descriptor.filter = "Spatial:occupied".to_string();
    assert_eq!(
        resolve(&collab, &descriptor, &r1, T0).await.unwrap(),
        Some(Value::Bool(true))
    );

    descriptor.filter = "Spatial:label".to_string();
    assert_eq!(
        resolve(&collab, &descriptor, &r1, T0).await.unwrap(),
        Some(Value::Text("Meeting room".to_string()))
    );

    descriptor.filter = "area".to_string();
    let err = resolve(&collab, &descriptor, &r1, T0).await.unwrap_err();
    assert!(matches!(err, AnalyticError::Config(_)));
}

#[tokio::test]
async fn attribute_search_descends_like_points() {
    let (store, collab) = setup();
    let mut descriptor = point_descriptor("Spatial:area");
    descriptor.method = TrackingMethod::AttributeName;
    descriptor.depth = 1;
    let value = resolve(&collab, &descriptor, &node(&store, "f1"), T0).await.unwrap();
    assert_eq!(value, Some(Value::Number(24.0)));
}

#[tokio::test]
async fn series_window_with_boundary_injection() {
    let (store, collab) = setup();
    let mut descriptor = point_descriptor("Temperature");
    descriptor.series_duration = Some(20 * MINUTE);
    descriptor.inject_last_value = true;
    let value = resolve(&collab, &descriptor, &node(&store, "r1"), T0).await.unwrap();
    assert_eq!(
        value,
        Some(Value::Series(vec![
            Sample::new(T0 - 20 * MINUTE, 20.0),
            Sample::new(T0 - 10 * MINUTE, 21.0),
            Sample::new(T0, 21.0),
        ]))
    );

    descriptor.inject_last_value = false;
    let raw = resolve(&collab, &descriptor, &node(&store, "r1"), T0).await.unwrap();
    assert_eq!(raw, Some(Value::Series(vec![Sample::new(T0 - 10 * MINUTE, 21.0)])));
}

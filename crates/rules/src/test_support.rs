//! Shared fixtures for unit tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use vigil_core::{NodeInfo, Sample, Value};
use vigil_graph::MemoryStore;
use vigil_notify::Dispatcher;

use crate::algorithms::AlgorithmRegistry;
use crate::context::Collaborators;
use crate::schema::{
    AnalyticDefinition, AnalyticPlan, FollowedEntities, IntervalSpec, ResultConfig, ResultType,
    TrackingDescriptor, TrackingMethod, Trigger,
};

/// 2023-11-14T22:13:20Z
pub(crate) const T0: i64 = 1_700_000_000_000;
pub(crate) const MINUTE: i64 = 60_000;

/// ```text
/// site -hasBuilding-> b1 -hasFloor-> f1 -hasSpace-> r1, r2
/// b1: Outdoor Temperature (12)
/// r1: Temperature (22.5, series), Humidity (40), control Setpoint (21)
/// r2: Temperature (26), bms Temperature Backup (25)
/// ```
pub(crate) fn building_store() -> MemoryStore {
    let store = MemoryStore::new();
    let nodes = [
        ("site", "Campus", "site"),
        ("b1", "Building A", "building"),
        ("f1", "Floor 1", "floor"),
        ("r1", "Room 101", "room"),
        ("r2", "Room 102", "room"),
        ("bt", "Outdoor Temperature", "point"),
        ("t1", "Temperature", "point"),
        ("h1", "Humidity", "point"),
        ("sp1", "Setpoint", "point"),
        ("t2", "Temperature", "point"),
        ("t2b", "Temperature Backup", "point"),
    ];
    for (id, name, node_type) in nodes {
        store.upsert_node(NodeInfo::new(id, name, node_type)).unwrap();
    }
    let relations = [
        ("site", "hasBuilding", "b1"),
        ("b1", "hasFloor", "f1"),
        ("f1", "hasSpace", "r1"),
        ("f1", "hasSpace", "r2"),
        ("b1", "hasMeasurementPoint", "bt"),
        ("r1", "hasMeasurementPoint", "t1"),
        ("r1", "hasMeasurementPoint", "h1"),
        ("r1", "hasControlPoint", "sp1"),
        ("r2", "hasMeasurementPoint", "t2"),
        ("r2", "hasBmsEndpoint", "t2b"),
    ];
    for (parent, relation, child) in relations {
        store.add_relation(parent, relation, child).unwrap();
    }
    for (point, value) in [("bt", 12.0), ("t1", 22.5), ("h1", 40.0), ("sp1", 21.0), ("t2", 26.0), ("t2b", 25.0)] {
        store.set_value(point, Value::Number(value)).unwrap();
    }
    store
        .push_samples(
            "t1",
            &[
                Sample::new(T0 - 30 * MINUTE, 20.0),
                Sample::new(T0 - 10 * MINUTE, 21.0),
                Sample::new(T0 + 5 * MINUTE, 23.0),
            ],
        )
        .unwrap();
    store.put_attribute("r1", "Spatial", "area", "24").unwrap();
    store.put_attribute("r1", "Spatial", "occupied", "true").unwrap();
    store.put_attribute("r1", "Spatial", "label", "Meeting room").unwrap();
    store
        .add_workflow(
            "Maintenance",
            "Comfort",
            ["New", "In progress", "Closed"]
                .iter()
                .enumerate()
                .map(|(i, name)| vigil_graph::WorkflowStep {
                    id: format!("Maintenance/Comfort/{i}"),
                    name: name.to_string(),
                    order: i as u32,
                })
                .collect(),
        )
        .unwrap();
    store
}

pub(crate) fn collaborators(store: Arc<MemoryStore>) -> Collaborators {
    Collaborators::from_store(store, Dispatcher::empty())
}

pub(crate) fn node(store: &MemoryStore, id: &str) -> NodeInfo {
    futures::executor::block_on(vigil_graph::GraphStore::node(store, id))
        .unwrap()
        .unwrap()
}

pub(crate) fn point_descriptor(filter: &str) -> TrackingDescriptor {
    TrackingDescriptor {
        method: TrackingMethod::MeasurementPointName,
        filter: filter.to_string(),
        depth: 0,
        strict_depth: false,
        relations: Vec::new(),
        series_duration: None,
        inject_last_value: false,
        multiple: false,
    }
}

/// Definition skeleton: `deps` as `(step, [deps])`, `algorithms` as
/// `(step, name)`, inputs as `(step, descriptor)`.
pub(crate) fn definition(
    deps: &[(&str, &[&str])],
    algorithms: &[(&str, &str)],
    inputs: Vec<(&str, TrackingDescriptor)>,
) -> AnalyticDefinition {
    AnalyticDefinition {
        id: "an-1".to_string(),
        name: "Comfort check".to_string(),
        enabled: true,
        result_type: ResultType::Log,
        result_name: "comfort".to_string(),
        io_dependencies: deps
            .iter()
            .map(|(step, d)| (step.to_string(), d.iter().map(|s| s.to_string()).collect()))
            .collect(),
        algorithm_index: algorithms
            .iter()
            .map(|(step, name)| (step.to_string(), name.to_string()))
            .collect(),
        parameters: BTreeMap::new(),
        inputs: inputs
            .into_iter()
            .map(|(step, d)| (step.to_string(), d))
            .collect(),
        trigger: Trigger::Interval {
            every: IntervalSpec::Millis(15 * MINUTE),
        },
        aggregate: None,
        followed: FollowedEntities {
            anchor: "r1".to_string(),
            relations: Vec::new(),
            node_type: None,
        },
        localization: None,
        result: ResultConfig::default(),
    }
}

pub(crate) fn plan(definition: AnalyticDefinition) -> AnalyticPlan {
    AnalyticPlan::from_definition(definition, &AlgorithmRegistry::with_builtins()).unwrap()
}

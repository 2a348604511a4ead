use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;
use vigil_core::{EpochMillis, NodeId, NodeInfo, Sample, Value};

use crate::error::StoreError;
use crate::traits::{
    Attribute, AttributeStore, GraphStore, TicketRef, TicketService, TicketSpec, TimeSeriesStore,
    WorkflowStep,
};

#[derive(Debug, Clone)]
struct Relation {
    name: String,
    node: NodeId,
}

#[derive(Debug, Clone)]
struct TicketRecord {
    ticket: TicketRef,
    priority: u8,
    description: Option<String>,
    opened_at: EpochMillis,
}

#[derive(Default)]
struct State {
    nodes: HashMap<NodeId, NodeInfo>,
    relation_dedup: HashSet<(NodeId, String, NodeId)>,
    outgoing: HashMap<NodeId, Vec<Relation>>,
    incoming: HashMap<NodeId, Vec<Relation>>,
    values: HashMap<NodeId, Value>,
    attributes: HashMap<NodeId, HashMap<String, Vec<Attribute>>>,
    series: HashMap<String, Vec<Sample>>,
    workflows: HashMap<(String, String), Vec<WorkflowStep>>,
    tickets: HashMap<String, TicketRecord>,
}

/// In-process implementation of every store trait.
///
/// Backs the test-suite and the worker's fixture mode. All data lives behind
/// one `RwLock`; no lock is held across an `.await`.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

fn matches_relation(relation: &Relation, relations: &[String]) -> bool {
    relations.is_empty() || relations.iter().any(|r| r == &relation.name)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|e| StoreError::Backend(format!("memory store read lock: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|e| StoreError::Backend(format!("memory store write lock: {e}")))
    }

    pub fn upsert_node(&self, node: NodeInfo) -> Result<(), StoreError> {
        self.write()?.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Link `parent -[relation]-> child`. Linking the same triple twice is a no-op.
    pub fn add_relation(&self, parent: &str, relation: &str, child: &str) -> Result<(), StoreError> {
        let mut state = self.write()?;
        for id in [parent, child] {
            if !state.nodes.contains_key(id) {
                return Err(StoreError::NodeNotFound(id.to_string()));
            }
        }
        let dedup_key = (parent.to_string(), relation.to_string(), child.to_string());
        if !state.relation_dedup.insert(dedup_key) {
            return Ok(());
        }
        state.outgoing.entry(parent.to_string()).or_default().push(Relation {
            name: relation.to_string(),
            node: child.to_string(),
        });
        state.incoming.entry(child.to_string()).or_default().push(Relation {
            name: relation.to_string(),
            node: parent.to_string(),
        });
        Ok(())
    }

    pub fn add_workflow(&self, context: &str, process: &str, steps: Vec<WorkflowStep>) -> Result<(), StoreError> {
        let mut steps = steps;
        steps.sort_by_key(|s| s.order);
        self.write()?
            .workflows
            .insert((context.to_string(), process.to_string()), steps);
        Ok(())
    }

    pub fn set_value(&self, point_id: &str, value: Value) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.nodes.contains_key(point_id) {
            return Err(StoreError::NodeNotFound(point_id.to_string()));
        }
        state.values.insert(point_id.to_string(), value);
        Ok(())
    }

    /// Create or overwrite an attribute.
    pub fn put_attribute(
        &self,
        node_id: &str,
        category: &str,
        label: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let attributes = state
            .attributes
            .entry(node_id.to_string())
            .or_default()
            .entry(category.to_string())
            .or_default();
        match attributes.iter_mut().find(|a| a.label == label) {
            Some(existing) => existing.value = value.to_string(),
            None => attributes.push(Attribute {
                label: label.to_string(),
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    pub fn push_samples(&self, series_id: &str, samples: &[Sample]) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let series = state.series.entry(series_id.to_string()).or_default();
        for sample in samples {
            upsert_sample(series, *sample);
        }
        Ok(())
    }

    /// All samples of a series, ordered by date.
    pub fn samples(&self, series_id: &str) -> Result<Vec<Sample>, StoreError> {
        Ok(self.read()?.series.get(series_id).cloned().unwrap_or_default())
    }

    pub fn tickets(&self) -> Result<Vec<TicketRef>, StoreError> {
        let state = self.read()?;
        let mut tickets: Vec<(EpochMillis, TicketRef)> = state
            .tickets
            .values()
            .map(|r| (r.opened_at, r.ticket.clone()))
            .collect();
        tickets.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        Ok(tickets.into_iter().map(|(_, t)| t).collect())
    }

    pub fn ticket_priority(&self, ticket_id: &str) -> Result<Option<u8>, StoreError> {
        Ok(self.read()?.tickets.get(ticket_id).map(|r| r.priority))
    }

    pub fn ticket_description(&self, ticket_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .read()?
            .tickets
            .get(ticket_id)
            .and_then(|r| r.description.clone()))
    }

    fn related(
        &self,
        id: &str,
        relations: &[String],
        outgoing: bool,
    ) -> Result<Vec<NodeInfo>, StoreError> {
        let state = self.read()?;
        if !state.nodes.contains_key(id) {
            return Err(StoreError::NodeNotFound(id.to_string()));
        }
        let index = if outgoing { &state.outgoing } else { &state.incoming };
        let mut result = Vec::new();
        if let Some(links) = index.get(id) {
            for link in links.iter().filter(|l| matches_relation(l, relations)) {
                if let Some(node) = state.nodes.get(&link.node) {
                    result.push(node.clone());
                }
            }
        }
        Ok(result)
    }
}

fn upsert_sample(series: &mut Vec<Sample>, sample: Sample) {
    match series.binary_search_by(|s| s.date.cmp(&sample.date)) {
        Ok(pos) => series[pos] = sample,
        Err(pos) => series.insert(pos, sample),
    }
}

#[async_trait::async_trait]
impl GraphStore for MemoryStore {
    async fn node(&self, id: &str) -> Result<Option<NodeInfo>, StoreError> {
        Ok(self.read()?.nodes.get(id).cloned())
    }

    async fn children(&self, id: &str, relations: &[String]) -> Result<Vec<NodeInfo>, StoreError> {
        self.related(id, relations, true)
    }

    async fn parents(&self, id: &str, relations: &[String]) -> Result<Vec<NodeInfo>, StoreError> {
        self.related(id, relations, false)
    }

    async fn relation_names(&self, id: &str) -> Result<Vec<String>, StoreError> {
        let state = self.read()?;
        let mut names: Vec<String> = Vec::new();
        if let Some(links) = state.outgoing.get(id) {
            for link in links {
                if !names.contains(&link.name) {
                    names.push(link.name.clone());
                }
            }
        }
        Ok(names)
    }

    async fn current_value(&self, point_id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read()?.values.get(point_id).cloned())
    }

    async fn set_current_value(&self, point_id: &str, value: Value) -> Result<(), StoreError> {
        self.set_value(point_id, value)
    }
}

#[async_trait::async_trait]
impl AttributeStore for MemoryStore {
    async fn attributes_by_category(
        &self,
        node_id: &str,
        category: &str,
    ) -> Result<Vec<Attribute>, StoreError> {
        Ok(self
            .read()?
            .attributes
            .get(node_id)
            .and_then(|categories| categories.get(category))
            .cloned()
            .unwrap_or_default())
    }

    async fn set_attribute(
        &self,
        node_id: &str,
        category: &str,
        label: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.put_attribute(node_id, category, label, value)
    }
}

#[async_trait::async_trait]
impl TimeSeriesStore for MemoryStore {
    async fn interval(
        &self,
        series_id: &str,
        start: EpochMillis,
        end: EpochMillis,
    ) -> Result<Vec<Sample>, StoreError> {
        let state = self.read()?;
        Ok(state
            .series
            .get(series_id)
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| s.date >= start && s.date <= end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn last_before(
        &self,
        series_id: &str,
        time: EpochMillis,
    ) -> Result<Option<Sample>, StoreError> {
        let state = self.read()?;
        Ok(state
            .series
            .get(series_id)
            .and_then(|samples| samples.iter().rev().find(|s| s.date < time).copied()))
    }

    async fn insert(&self, series_id: &str, value: f64, time: EpochMillis) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let series = state.series.entry(series_id.to_string()).or_default();
        upsert_sample(series, Sample::new(time, value));
        Ok(())
    }
}

#[async_trait::async_trait]
impl TicketService for MemoryStore {
    async fn first_step(
        &self,
        context: &str,
        process: &str,
    ) -> Result<Option<WorkflowStep>, StoreError> {
        Ok(self
            .read()?
            .workflows
            .get(&(context.to_string(), process.to_string()))
            .and_then(|steps| steps.first().cloned()))
    }

    async fn find_ticket(
        &self,
        context: &str,
        process: &str,
        node_id: &str,
        name: &str,
    ) -> Result<Option<TicketRef>, StoreError> {
        let state = self.read()?;
        Ok(state
            .tickets
            .values()
            .map(|r| &r.ticket)
            .find(|t| {
                t.context == context && t.process == process && t.node_id == node_id && t.name == name
            })
            .cloned())
    }

    async fn add_ticket(&self, spec: &TicketSpec) -> Result<String, StoreError> {
        let mut state = self.write()?;
        if !state.nodes.contains_key(&spec.node_id) {
            return Err(StoreError::NodeNotFound(spec.node_id.clone()));
        }
        let first = state
            .workflows
            .get(&(spec.context.clone(), spec.process.clone()))
            .and_then(|steps| steps.first().cloned())
            .ok_or_else(|| {
                StoreError::Workflow(format!(
                    "no workflow for context '{}' process '{}'",
                    spec.context, spec.process
                ))
            })?;

        let id = Uuid::new_v4().to_string();
        let ticket = TicketRef {
            id: id.clone(),
            name: spec.name.clone(),
            node_id: spec.node_id.clone(),
            context: spec.context.clone(),
            process: spec.process.clone(),
            step: first,
            is_alarm: spec.is_alarm,
        };
        state.nodes.insert(
            id.clone(),
            NodeInfo::new(id.clone(), spec.name.clone(), if spec.is_alarm { "alarm" } else { "ticket" }),
        );
        state.tickets.insert(
            id.clone(),
            TicketRecord {
                ticket,
                priority: spec.priority,
                description: spec.description.clone(),
                opened_at: spec.occurred_at,
            },
        );
        tracing::debug!(ticket_id = %id, name = %spec.name, "ticket opened");
        Ok(id)
    }

    async fn move_ticket(&self, ticket_id: &str, to: &WorkflowStep) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let record = state
            .tickets
            .get_mut(ticket_id)
            .ok_or_else(|| StoreError::TicketNotFound(ticket_id.to_string()))?;
        record.ticket.step = to.clone();
        Ok(())
    }

    async fn alarms_from_node(&self, node_id: &str) -> Result<Vec<TicketRef>, StoreError> {
        let state = self.read()?;
        Ok(state
            .tickets
            .values()
            .map(|r| &r.ticket)
            .filter(|t| t.is_alarm && t.node_id == node_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_tree() -> MemoryStore {
        let store = MemoryStore::new();
        store.upsert_node(NodeInfo::new("b1", "Building", "building")).unwrap();
        store.upsert_node(NodeInfo::new("f1", "Floor 1", "floor")).unwrap();
        store.upsert_node(NodeInfo::new("p1", "Temperature", "endpoint")).unwrap();
        store.add_relation("b1", "hasFloor", "f1").unwrap();
        store.add_relation("f1", "hasEndpoint", "p1").unwrap();
        store
    }

    #[tokio::test]
    async fn children_filtered_by_relation() {
        let store = store_with_tree();
        let all = store.children("b1", &[]).await.unwrap();
        assert_eq!(all.len(), 1);
        let none = store.children("b1", &["hasEndpoint".to_string()]).await.unwrap();
        assert!(none.is_empty());
        let parents = store.parents("p1", &["hasEndpoint".to_string()]).await.unwrap();
        assert_eq!(parents[0].id, "f1");
    }

    #[tokio::test]
    async fn duplicate_relation_is_ignored() {
        let store = store_with_tree();
        store.add_relation("b1", "hasFloor", "f1").unwrap();
        assert_eq!(store.children("b1", &[]).await.unwrap().len(), 1);
        assert_eq!(store.relation_names("b1").await.unwrap(), vec!["hasFloor"]);
    }

    #[tokio::test]
    async fn relation_to_unknown_node_fails() {
        let store = store_with_tree();
        let err = store.add_relation("b1", "hasFloor", "ghost").unwrap_err();
        assert!(matches!(err, StoreError::NodeNotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn interval_and_last_before() {
        let store = store_with_tree();
        store
            .push_samples("p1", &[Sample::new(30, 3.0), Sample::new(10, 1.0), Sample::new(20, 2.0)])
            .unwrap();
        let window = store.interval("p1", 15, 30).await.unwrap();
        assert_eq!(window, vec![Sample::new(20, 2.0), Sample::new(30, 3.0)]);
        assert_eq!(store.last_before("p1", 20).await.unwrap(), Some(Sample::new(10, 1.0)));
        assert_eq!(store.last_before("p1", 10).await.unwrap(), None);
    }

    #[tokio::test]
    async fn insert_overwrites_same_date() {
        let store = store_with_tree();
        store.insert("p1", 1.0, 100).await.unwrap();
        store.insert("p1", 2.0, 100).await.unwrap();
        assert_eq!(store.samples("p1").unwrap(), vec![Sample::new(100, 2.0)]);
    }

    #[tokio::test]
    async fn ticket_lifecycle() {
        let store = store_with_tree();
        store
            .add_workflow(
                "Maintenance",
                "Comfort",
                vec![
                    WorkflowStep { id: "s2".into(), name: "Done".into(), order: 1 },
                    WorkflowStep { id: "s1".into(), name: "New".into(), order: 0 },
                ],
            )
            .unwrap();
        let first = store.first_step("Maintenance", "Comfort").await.unwrap().unwrap();
        assert_eq!(first.id, "s1");

        let spec = TicketSpec {
            name: "Too hot".into(),
            node_id: "f1".into(),
            context: "Maintenance".into(),
            process: "Comfort".into(),
            priority: 1,
            description: None,
            is_alarm: true,
            occurred_at: 0,
        };
        let id = store.add_ticket(&spec).await.unwrap();
        let found = store
            .find_ticket("Maintenance", "Comfort", "f1", "Too hot")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
        assert_eq!(store.alarms_from_node("f1").await.unwrap().len(), 1);

        let done = WorkflowStep { id: "s2".into(), name: "Done".into(), order: 1 };
        store.move_ticket(&id, &done).await.unwrap();
        assert_eq!(store.tickets().unwrap()[0].step, done);
    }

    #[tokio::test]
    async fn add_ticket_without_workflow_fails() {
        let store = store_with_tree();
        let spec = TicketSpec {
            name: "x".into(),
            node_id: "f1".into(),
            context: "Nope".into(),
            process: "Nope".into(),
            priority: 0,
            description: None,
            is_alarm: false,
            occurred_at: 0,
        };
        assert!(matches!(store.add_ticket(&spec).await, Err(StoreError::Workflow(_))));
    }
}

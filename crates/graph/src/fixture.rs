//! YAML fixture format for seeding a [`MemoryStore`].
//!
//! ```yaml
//! nodes:
//!   - { id: room-1, name: Room 1, type: room }
//!   - { id: temp-1, name: Temperature, type: endpoint, value: 21.5 }
//! relations:
//!   - { parent: room-1, relation: hasEndpoint, child: temp-1 }
//! attributes:
//!   - { node: room-1, category: Spatial, label: area, value: "24" }
//! series:
//!   temp-1: [{ date: 1700000000000, value: 21.0 }]
//! workflows:
//!   - { context: Maintenance, process: Comfort, steps: [New, In progress, Closed] }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vigil_core::{NodeInfo, Sample, Value};

use crate::error::StoreError;
use crate::store::MemoryStore;
use crate::traits::WorkflowStep;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub nodes: Vec<FixtureNode>,
    #[serde(default)]
    pub relations: Vec<FixtureRelation>,
    #[serde(default)]
    pub attributes: Vec<FixtureAttribute>,
    #[serde(default)]
    pub series: HashMap<String, Vec<Sample>>,
    #[serde(default)]
    pub workflows: Vec<FixtureWorkflow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureRelation {
    pub parent: String,
    pub relation: String,
    pub child: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureAttribute {
    pub node: String,
    pub category: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureWorkflow {
    pub context: String,
    pub process: String,
    /// Step names in workflow order.
    pub steps: Vec<String>,
}

impl StoreFixture {
    pub fn from_yaml(yaml: &str) -> Result<Self, StoreError> {
        serde_yaml::from_str(yaml).map_err(|e| StoreError::Fixture(e.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Build a populated store. Relations are applied after all nodes so the
    /// file order of `nodes` and `relations` does not matter.
    pub fn into_store(self) -> Result<MemoryStore, StoreError> {
        let store = MemoryStore::new();
        let mut values = Vec::new();
        for node in self.nodes {
            if let Some(value) = node.value {
                values.push((node.id.clone(), value));
            }
            store.upsert_node(NodeInfo::new(node.id, node.name, node.node_type))?;
        }
        for relation in &self.relations {
            store.add_relation(&relation.parent, &relation.relation, &relation.child)?;
        }

        for (id, value) in values {
            store.set_value(&id, value)?;
        }
        for attr in &self.attributes {
            store.put_attribute(&attr.node, &attr.category, &attr.label, &attr.value)?;
        }
        for (series_id, samples) in &self.series {
            store.push_samples(series_id, samples)?;
        }

        for workflow in self.workflows {
            let steps = workflow
                .steps
                .iter()
                .enumerate()
                .map(|(i, name)| WorkflowStep {
                    id: format!("{}/{}/{}", workflow.context, workflow.process, i),
                    name: name.clone(),
                    order: i as u32,
                })
                .collect();
            store.add_workflow(&workflow.context, &workflow.process, steps)?;
        }

        tracing::debug!("fixture loaded into memory store");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{AttributeStore, GraphStore, TicketService, TimeSeriesStore};
    use std::io::Write;

    const FIXTURE: &str = r#"
nodes:
  - { id: room-1, name: Room 1, type: room }
  - { id: temp-1, name: Temperature, type: endpoint, value: 21.5 }
relations:
  - { parent: room-1, relation: hasEndpoint, child: temp-1 }
attributes:
  - { node: room-1, category: Spatial, label: area, value: "24" }
series:
  temp-1:
    - { date: 1000, value: 20.0 }
    - { date: 2000, value: 21.0 }
workflows:
  - { context: Maintenance, process: Comfort, steps: [New, Closed] }
"#;

    #[tokio::test]
    async fn fixture_populates_every_store() {
        let store = StoreFixture::from_yaml(FIXTURE).unwrap().into_store().unwrap();

        let children = store.children("room-1", &[]).await.unwrap();
        assert_eq!(children[0].name, "Temperature");
        assert_eq!(
            store.current_value("temp-1").await.unwrap(),
            Some(Value::Number(21.5))
        );
        let area = store.find_attribute("room-1", "Spatial", "area").await.unwrap().unwrap();
        assert_eq!(area.value, "24");
        assert_eq!(store.interval("temp-1", 0, 5000).await.unwrap().len(), 2);
        let first = store.first_step("Maintenance", "Comfort").await.unwrap().unwrap();
        assert_eq!(first.name, "New");
    }

    #[test]
    fn fixture_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        let fixture = StoreFixture::from_path(file.path()).unwrap();
        assert_eq!(fixture.nodes.len(), 2);
    }

    #[test]
    fn bad_yaml_is_a_fixture_error() {
        let err = StoreFixture::from_yaml("nodes: [").unwrap_err();
        assert!(matches!(err, StoreError::Fixture(_)));
    }

    #[test]
    fn dangling_relation_is_rejected() {
        let yaml = "relations:\n  - { parent: a, relation: r, child: b }\n";
        let err = StoreFixture::from_yaml(yaml).unwrap().into_store().err().unwrap();
        assert!(matches!(err, StoreError::NodeNotFound(_)));
    }
}

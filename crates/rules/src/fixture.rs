//! Worker fixture: a seeded store plus the analytics to run against it.
//!
//! ```yaml
//! nodes: [...]
//! relations: [...]
//! series: {...}
//! workflows: [...]
//! analytics:
//!   - id: comfort-1
//!     name: Room too warm
//!     ...
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::warn;
use vigil_graph::{MemoryStore, StoreFixture};

use crate::algorithms::AlgorithmRegistry;
use crate::error::Result;
use crate::schema::{AnalyticDefinition, AnalyticPlan};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsFixture {
    #[serde(flatten)]
    pub store: StoreFixture,
    #[serde(default)]
    pub analytics: Vec<AnalyticDefinition>,
}

impl AnalyticsFixture {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Seed the store and build a plan for every enabled analytic.
    /// Analytics that fail validation are logged and skipped.
    pub fn load(self, registry: &AlgorithmRegistry) -> Result<(MemoryStore, Vec<AnalyticPlan>)> {
        let store = self.store.into_store()?;
        let mut plans = Vec::with_capacity(self.analytics.len());
        for definition in self.analytics {
            if !definition.enabled {
                continue;
            }
            let id = definition.id.clone();
            match AnalyticPlan::from_definition(definition, registry) {
                Ok(plan) => plans.push(plan),
                Err(e) => warn!(analytic = %id, error = %e, "skipping invalid analytic"),
            }
        }
        Ok((store, plans))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const FIXTURE: &str = r#"
nodes:
  - { id: r1, name: Room 101, type: room }
  - { id: t1, name: Temperature, type: point, value: 23 }
relations:
  - { parent: r1, relation: hasMeasurementPoint, child: t1 }
analytics:
  - id: warm
    name: Warm room
    resultType: Log
    resultName: warm
    ioDependencies: { R: [A0], A0: [I0] }
    algorithmIndex: { A0: THRESHOLD_ABOVE }
    parameters: { A0-p1: 22 }
    inputs:
      I0: { method: measurementPointName, filter: Temperature }
    trigger: { type: cron, expression: "*/15 * * * *" }
    followed: { anchor: r1 }
  - id: broken
    name: Missing root
    resultType: Log
    resultName: broken
    ioDependencies: { A0: [I0] }
    algorithmIndex: { A0: AVERAGE }
    inputs:
      I0: { method: measurementPointName, filter: Temperature }
    trigger: { type: interval, every: 15m }
    followed: { anchor: r1 }
  - id: disabled
    name: Disabled
    enabled: false
    resultType: Log
    resultName: disabled
    ioDependencies: { R: [I0] }
    inputs:
      I0: { method: measurementPointName, filter: Temperature }
    trigger: { type: interval, every: 15m }
    followed: { anchor: r1 }
"#;

    #[test]
    fn loads_store_and_valid_plans() {
        let fixture = AnalyticsFixture::from_yaml(FIXTURE).unwrap();
        assert_eq!(fixture.store.nodes.len(), 2);
        assert_eq!(fixture.analytics.len(), 3);

        let (store, plans) = fixture.load(&AlgorithmRegistry::with_builtins()).unwrap();
        assert_eq!(store.samples("t1").unwrap().len(), 0);
        let ids: Vec<&str> = plans.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["warm"]);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        let fixture = AnalyticsFixture::from_path(file.path()).unwrap();
        assert_eq!(fixture.analytics[0].id, "warm");
    }
}

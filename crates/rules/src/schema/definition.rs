//! Raw analytic definition as authored in YAML/JSON.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vigil_core::Value;

use super::descriptor::TrackingDescriptor;
use super::result::{ResultConfig, ResultType};
use super::trigger::Trigger;
use crate::error::Result;

/// A user-defined analytic before validation.
///
/// Keys of `ioDependencies`, `algorithmIndex` and `inputs` are step ids
/// (`R`, `A<n>`, `I<n>`); parameter keys are `"<step>-<name>"`, e.g.
/// `A0-p1`. Decode into an [`AnalyticPlan`](super::AnalyticPlan) before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticDefinition {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub result_type: ResultType,
    pub result_name: String,
    #[serde(default)]
    pub io_dependencies: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub algorithm_index: BTreeMap<String, String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default)]
    pub inputs: BTreeMap<String, TrackingDescriptor>,
    pub trigger: Trigger,
    /// Coarse cron window. When set, each run evaluates every fine trigger
    /// occurrence inside one aggregate window.
    #[serde(default)]
    pub aggregate: Option<String>,
    pub followed: FollowedEntities,
    #[serde(default)]
    pub localization: Option<TicketLocalization>,
    #[serde(default)]
    pub result: ResultConfig,
}

/// Which graph nodes an analytic is evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowedEntities {
    pub anchor: String,
    /// Follow the anchor's children through these relations. Empty follows
    /// the anchor itself.
    #[serde(default)]
    pub relations: Vec<String>,
    #[serde(default)]
    pub node_type: Option<String>,
}

/// Where tickets and alarms are attached: the closest ancestor of the
/// followed entity with `nodeType`, reached through `relations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketLocalization {
    #[serde(default)]
    pub relations: Vec<String>,
    pub node_type: String,
}

fn default_true() -> bool {
    true
}

impl AnalyticDefinition {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a YAML file holding a list of definitions.
    pub fn load_all(path: &Path) -> Result<Vec<Self>> {
        let yaml = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&yaml)?)
    }
}

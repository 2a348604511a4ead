//! Tracking descriptors: how an input slot finds its data under an entity.

use serde::{Deserialize, Serialize};

/// Search strategy for an input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackingMethod {
    /// Name filter on measurement points.
    MeasurementPointName,
    /// Name filter on control points.
    ControlPointName,
    /// `"<category>:<label>"` lookup in the attribute store.
    AttributeName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingDescriptor {
    pub method: TrackingMethod,
    pub filter: String,
    /// Relative search depth. Negative means "never found".
    #[serde(default)]
    pub depth: i32,
    /// Only nodes at exactly `depth` are candidates.
    #[serde(default)]
    pub strict_depth: bool,
    /// Relations the search may follow. Empty allows every relation.
    #[serde(default)]
    pub relations: Vec<String>,
    /// Window length in milliseconds. When set the input is a time series
    /// over `[time - duration, time]` instead of the point's current value.
    #[serde(default)]
    pub series_duration: Option<i64>,
    /// Forward-fill the window boundaries with the last known values.
    #[serde(default)]
    pub inject_last_value: bool,
    /// Collect every match (name contains filter) instead of the first
    /// exact match.
    #[serde(default)]
    pub multiple: bool,
}

impl TrackingDescriptor {
    /// Split an attribute filter into `(category, label)`.
    pub fn attribute_filter(&self) -> Option<(&str, &str)> {
        let (category, label) = self.filter.split_once(':')?;
        let (category, label) = (category.trim(), label.trim());
        if category.is_empty() || label.is_empty() {
            return None;
        }
        Some((category, label))
    }

    /// Whether a point name satisfies the filter under the current match mode.
    pub fn matches_name(&self, name: &str) -> bool {
        if self.multiple {
            name.contains(&self.filter)
        } else {
            name == self.filter
        }
    }
}

//! Input resolution: from a tracking descriptor and a followed entity to a
//! scalar, a list of scalars, a windowed time series, or nothing.
//!
//! Resolution happens in two phases so the evaluator can batch work across
//! execution times: [`locate`] finds the data sources once per entity, and
//! the located points are then read for one or many windows.

mod search;

#[cfg(test)]
mod tests;

use vigil_core::{EpochMillis, NodeInfo, Sample, Value};

use crate::context::Collaborators;
use crate::error::{AnalyticError, Result};
use crate::schema::{TrackingDescriptor, TrackingMethod};
use crate::window;

use self::search::{search, Hit, Target};

/// Relations from an equipment node to its measurement points.
pub const MEASUREMENT_POINT_RELATIONS: &[&str] = &["hasMeasurementPoint", "hasBmsEndpoint"];

/// Relations from an equipment node to its control points.
pub const CONTROL_POINT_RELATIONS: &[&str] = &["hasControlPoint"];

/// Data sources found for one input slot under one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Points(Vec<NodeInfo>),
    /// Attribute values are static; they are typed when located.
    Attributes(Vec<Value>),
}

fn owned(relations: &[&str]) -> Vec<String> {
    relations.iter().map(|r| r.to_string()).collect()
}

/// Find the data sources of `descriptor` under `entity`. `None` when the
/// search yields nothing.
pub async fn locate(
    collab: &Collaborators,
    descriptor: &TrackingDescriptor,
    entity: &NodeInfo,
) -> Result<Option<Location>> {
    let target = match descriptor.method {
        TrackingMethod::MeasurementPointName => Target::Points(owned(MEASUREMENT_POINT_RELATIONS)),
        TrackingMethod::ControlPointName => Target::Points(owned(CONTROL_POINT_RELATIONS)),
        TrackingMethod::AttributeName => {
            let (category, label) = descriptor.attribute_filter().ok_or_else(|| {
                AnalyticError::Config(format!(
                    "attribute filter '{}' must be '<category>:<label>'",
                    descriptor.filter
                ))
            })?;
            Target::Attribute { category, label }
        }
    };

    let hits = search(collab, descriptor, &target, entity).await?;
    if hits.is_empty() {
        tracing::debug!(entity = %entity, filter = %descriptor.filter, "input not found");
        return Ok(None);
    }

    let location = match target {
        Target::Points(_) => Location::Points(
            hits.into_iter()
                .filter_map(|h| match h {
                    Hit::Point(node) => Some(node),
                    Hit::Attribute(_) => None,
                })
                .collect(),
        ),
        Target::Attribute { .. } => Location::Attributes(
            hits.into_iter()
                .filter_map(|h| match h {
                    Hit::Attribute(value) => Some(value),
                    Hit::Point(_) => None,
                })
                .collect(),
        ),
    };
    Ok(Some(location))
}

/// Fold per-source values into the slot value: the single value in
/// single-match mode, a list in multi-match mode.
pub fn combine(descriptor: &TrackingDescriptor, mut values: Vec<Value>) -> Option<Value> {
    if values.is_empty() {
        return None;
    }
    if descriptor.multiple {
        Some(Value::List(values))
    } else {
        Some(values.swap_remove(0))
    }
}

/// Raw samples of `point` covering `[start, end]`, preceded by the last
/// sample before `start` when the descriptor injects boundaries.
pub(crate) async fn fetch_samples(
    collab: &Collaborators,
    descriptor: &TrackingDescriptor,
    point: &NodeInfo,
    start: EpochMillis,
    end: EpochMillis,
) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();
    if descriptor.inject_last_value {
        if let Some(before) = collab.series.last_before(&point.id, start).await? {
            samples.push(before);
        }
    }
    samples.extend(collab.series.interval(&point.id, start, end).await?);
    Ok(samples)
}

/// Read located sources at one execution time. Points without a current
/// value or without samples in the window are skipped.
pub async fn read_at(
    collab: &Collaborators,
    descriptor: &TrackingDescriptor,
    location: &Location,
    time: EpochMillis,
) -> Result<Option<Value>> {
    let points = match location {
        Location::Attributes(values) => return Ok(combine(descriptor, values.clone())),
        Location::Points(points) => points,
    };

    let mut values = Vec::with_capacity(points.len());
    for point in points {
        match descriptor.series_duration {
            Some(duration) => {
                let start = time - duration;
                let raw = fetch_samples(collab, descriptor, point, start, time).await?;
                let samples = window::normalize(start, time, descriptor.inject_last_value, raw);
                if !samples.is_empty() {
                    values.push(Value::Series(samples));
                }
            }
            None => {
                if let Some(value) = collab.graph.current_value(&point.id).await? {
                    values.push(value);
                }
            }
        }
    }
    Ok(combine(descriptor, values))
}

/// Locate and read in one step.
pub async fn resolve(
    collab: &Collaborators,
    descriptor: &TrackingDescriptor,
    entity: &NodeInfo,
    time: EpochMillis,
) -> Result<Option<Value>> {
    match locate(collab, descriptor, entity).await? {
        Some(location) => read_at(collab, descriptor, &location, time).await,
        None => Ok(None),
    }
}

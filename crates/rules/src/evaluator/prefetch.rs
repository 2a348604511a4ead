//! Batched input materialization for one entity across many execution times.
//!
//! Every input slot is located once per entity. Current values and
//! attributes are read once; series are fetched once over the union of all
//! windows and sliced per execution time.

use std::collections::BTreeMap;

use vigil_core::{EpochMillis, NodeInfo, Sample, Value};

use super::InputValues;
use crate::context::Collaborators;
use crate::error::Result;
use crate::resolver::{self, Location};
use crate::schema::{AnalyticPlan, TrackingDescriptor};
use crate::window;

#[derive(Debug, Clone)]
enum Prepared {
    /// Same value at every execution time (attributes, current values).
    Fixed(Option<Value>),
    /// One union fetch per located point.
    Series { duration: i64, points: Vec<Vec<Sample>> },
}

#[derive(Debug, Clone)]
struct Slot {
    descriptor: TrackingDescriptor,
    prepared: Prepared,
}

/// Inputs of one entity, ready to be read at any of the prepared times.
#[derive(Debug, Clone, Default)]
pub struct PreparedInputs {
    slots: BTreeMap<u32, Slot>,
}

/// Locate and fetch every input of `plan` for `entity`, covering `times`.
pub async fn prepare(
    collab: &Collaborators,
    plan: &AnalyticPlan,
    entity: &NodeInfo,
    times: &[EpochMillis],
) -> Result<PreparedInputs> {
    let (Some(&earliest), Some(&latest)) = (times.iter().min(), times.iter().max()) else {
        return Ok(PreparedInputs::default());
    };

    let mut slots = BTreeMap::new();
    for (&index, descriptor) in plan.inputs() {
        let location = resolver::locate(collab, descriptor, entity).await?;
        let prepared = match (location, descriptor.series_duration) {
            (None, _) => Prepared::Fixed(None),
            (Some(Location::Points(points)), Some(duration)) => {
                let start = earliest - duration;
                let mut fetched = Vec::with_capacity(points.len());
                for point in &points {
                    let raw =
                        resolver::fetch_samples(collab, descriptor, point, start, latest).await?;
                    fetched.push(if descriptor.inject_last_value {
                        window::ordered(raw)
                    } else {
                        raw
                    });
                }
                tracing::debug!(
                    entity = %entity,
                    input = index,
                    points = points.len(),
                    "series prefetched"
                );
                Prepared::Series {
                    duration,
                    points: fetched,
                }
            }
            (Some(location), _) => {
                Prepared::Fixed(resolver::read_at(collab, descriptor, &location, latest).await?)
            }
        };
        slots.insert(
            index,
            Slot {
                descriptor: descriptor.clone(),
                prepared,
            },
        );
    }
    Ok(PreparedInputs { slots })
}

impl PreparedInputs {
    /// Input values at one execution time.
    pub fn at(&self, time: EpochMillis) -> InputValues {
        let mut values = InputValues::new();
        for (&index, slot) in &self.slots {
            let value = match &slot.prepared {
                Prepared::Fixed(value) => value.clone(),
                Prepared::Series { duration, points } => {
                    let start = time - duration;
                    let series: Vec<Value> = points
                        .iter()
                        .map(|union| {
                            window::slice(start, time, slot.descriptor.inject_last_value, union)
                        })
                        .filter(|samples| !samples.is_empty())
                        .map(Value::Series)
                        .collect();
                    resolver::combine(&slot.descriptor, series)
                }
            };
            if let Some(value) = value {
                values.insert(index, value);
            }
        }
        values
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

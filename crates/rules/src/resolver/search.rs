//! Depth-bounded, relation-filtered breadth-first search under an entity.

use std::collections::HashSet;

use vigil_core::{NodeInfo, Value};

use crate::context::Collaborators;
use crate::error::Result;
use crate::schema::TrackingDescriptor;

/// What a search level is probed for.
#[derive(Debug, Clone)]
pub(super) enum Target<'a> {
    /// Points reached from a node through one of these relations.
    Points(Vec<String>),
    Attribute { category: &'a str, label: &'a str },
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Hit {
    Point(NodeInfo),
    Attribute(Value),
}

/// Probe one node. In single-match mode at most one hit is returned.
async fn probe(
    collab: &Collaborators,
    descriptor: &TrackingDescriptor,
    target: &Target<'_>,
    node: &NodeInfo,
) -> Result<Vec<Hit>> {
    let mut hits = match target {
        Target::Points(relations) => collab
            .graph
            .children(&node.id, relations)
            .await?
            .into_iter()
            .filter(|point| descriptor.matches_name(&point.name))
            .map(Hit::Point)
            .collect::<Vec<_>>(),
        Target::Attribute { category, label } if descriptor.multiple => collab
            .attributes
            .attributes_by_category(&node.id, category)
            .await?
            .into_iter()
            .filter(|a| a.label.contains(label))
            .map(|a| Hit::Attribute(Value::from_text(&a.value)))
            .collect(),
        Target::Attribute { category, label } => collab
            .attributes
            .find_attribute(&node.id, category, label)
            .await?
            .map(|a| Hit::Attribute(Value::from_text(&a.value)))
            .into_iter()
            .collect(),
    };
    if !descriptor.multiple {
        hits.truncate(1);
    }
    Ok(hits)
}

/// Relations of `node` the descriptor allows the search to follow.
async fn traversable(
    collab: &Collaborators,
    descriptor: &TrackingDescriptor,
    node: &NodeInfo,
) -> Result<Vec<String>> {
    let names = collab.graph.relation_names(&node.id).await?;
    if descriptor.relations.is_empty() {
        return Ok(names);
    }
    Ok(names
        .into_iter()
        .filter(|name| descriptor.relations.contains(name))
        .collect())
}

/// Search level by level starting at `entity` (relative depth 0).
///
/// Non-strict searches return the hits of the first level that has any;
/// strict searches only probe the level at exactly `descriptor.depth`.
/// Every node is visited at most once.
pub(super) async fn search(
    collab: &Collaborators,
    descriptor: &TrackingDescriptor,
    target: &Target<'_>,
    entity: &NodeInfo,
) -> Result<Vec<Hit>> {
    if descriptor.depth < 0 {
        return Ok(Vec::new());
    }

    let mut visited: HashSet<String> = HashSet::from([entity.id.clone()]);
    let mut level = vec![entity.clone()];

    for current in 0..=descriptor.depth {
        let eligible = !descriptor.strict_depth || current == descriptor.depth;
        if eligible {
            let mut hits = Vec::new();
            for node in &level {
                hits.extend(probe(collab, descriptor, target, node).await?);
                if !descriptor.multiple && !hits.is_empty() {
                    return Ok(hits);
                }
            }
            if !hits.is_empty() {
                return Ok(hits);
            }
        }
        if current == descriptor.depth {
            break;
        }

        let mut next = Vec::new();
        for node in &level {
            let relations = traversable(collab, descriptor, node).await?;
            if relations.is_empty() {
                continue;
            }
            for child in collab.graph.children(&node.id, &relations).await? {
                if visited.insert(child.id.clone()) {
                    next.push(child);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        tracing::trace!(depth = current + 1, nodes = next.len(), "descending");
        level = next;
    }

    Ok(Vec::new())
}

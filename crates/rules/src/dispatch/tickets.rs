//! Ticket and alarm deduplication.
//!
//! A triggered analytic opens at most one ticket per `(context, process,
//! node, name)`. Repeated triggers while the ticket is still at the first
//! workflow step bump its occurrence counter; a ticket that already moved on
//! is sent back to the first step with the counter reset.

use std::collections::HashSet;

use tracing::{debug, info};
use vigil_core::{EpochMillis, NodeInfo};
use vigil_graph::{TicketRef, TicketSpec};

use crate::context::Collaborators;
use crate::error::{AnalyticError, Result};
use crate::schema::{AnalyticPlan, ResultType, TicketLocalization};

/// Attribute category holding ticket bookkeeping.
pub const TICKET_CATEGORY: &str = "Ticket";
/// Attribute label (and series suffix) of the occurrence counter.
pub const OCCURRENCE_LABEL: &str = "occurrenceNumber";

/// Series id of the occurrence counter of a ticket.
pub fn occurrence_series(ticket_id: &str) -> String {
    format!("{ticket_id}/{OCCURRENCE_LABEL}")
}

/// What happened to the ticket on this trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketAction {
    Opened,
    Repeated,
    Reopened,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaisedTicket {
    pub ticket_id: String,
    pub occurrence: u32,
    pub action: TicketAction,
}

/// The node tickets are attached to: the closest ancestor of `entity` with
/// the configured node type, climbing through the configured relations.
/// Falls back to the entity itself.
pub async fn localize(
    collab: &Collaborators,
    localization: Option<&TicketLocalization>,
    entity: &NodeInfo,
) -> Result<NodeInfo> {
    let Some(localization) = localization else {
        return Ok(entity.clone());
    };
    if entity.node_type == localization.node_type {
        return Ok(entity.clone());
    }

    let mut visited: HashSet<String> = HashSet::from([entity.id.clone()]);
    let mut frontier = vec![entity.clone()];
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for node in &frontier {
            for parent in collab.graph.parents(&node.id, &localization.relations).await? {
                if parent.node_type == localization.node_type {
                    return Ok(parent);
                }
                if visited.insert(parent.id.clone()) {
                    next.push(parent);
                }
            }
        }
        frontier = next;
    }

    debug!(
        entity = %entity,
        node_type = %localization.node_type,
        "no ancestor of the localization type; using the entity"
    );
    Ok(entity.clone())
}

async fn existing(
    collab: &Collaborators,
    is_alarm: bool,
    context: &str,
    process: &str,
    node_id: &str,
    name: &str,
) -> Result<Option<TicketRef>> {
    if is_alarm {
        let alarms = collab.tickets.alarms_from_node(node_id).await?;
        Ok(alarms
            .into_iter()
            .find(|a| a.name == name && a.context == context && a.process == process))
    } else {
        Ok(collab
            .tickets
            .find_ticket(context, process, node_id, name)
            .await?)
    }
}

async fn occurrence(collab: &Collaborators, ticket_id: &str) -> Result<u32> {
    let stored = collab
        .attributes
        .find_attribute(ticket_id, TICKET_CATEGORY, OCCURRENCE_LABEL)
        .await?;
    Ok(stored
        .and_then(|a| a.value.trim().parse::<u32>().ok())
        .unwrap_or(0))
}

async fn store_occurrence(
    collab: &Collaborators,
    ticket_id: &str,
    count: u32,
    time: EpochMillis,
) -> Result<()> {
    collab
        .attributes
        .set_attribute(ticket_id, TICKET_CATEGORY, OCCURRENCE_LABEL, &count.to_string())
        .await?;
    collab
        .series
        .insert(&occurrence_series(ticket_id), f64::from(count), time)
        .await?;
    Ok(())
}

/// Open, repeat or reopen the ticket of `plan` for `entity`.
pub async fn raise(
    collab: &Collaborators,
    plan: &AnalyticPlan,
    entity: &NodeInfo,
    time: EpochMillis,
    description: Option<String>,
) -> Result<RaisedTicket> {
    let def = &plan.definition;
    let is_alarm = def.result_type == ResultType::Alarm;
    let (Some(context), Some(process)) = (def.result.context.as_deref(), def.result.process.as_deref())
    else {
        return Err(AnalyticError::Config(format!(
            "analytic '{}': {} results need a context and a process",
            def.id, def.result_type
        )));
    };

    let target = localize(collab, def.localization.as_ref(), entity).await?;
    let first = collab
        .tickets
        .first_step(context, process)
        .await?
        .ok_or_else(|| {
            AnalyticError::Config(format!(
                "analytic '{}': no workflow for context '{context}' process '{process}'",
                def.id
            ))
        })?;

    let found = existing(collab, is_alarm, context, process, &target.id, &def.result_name).await?;
    let raised = match found {
        Some(ticket) if ticket.step.id == first.id => RaisedTicket {
            occurrence: occurrence(collab, &ticket.id).await? + 1,
            ticket_id: ticket.id,
            action: TicketAction::Repeated,
        },
        Some(ticket) => {
            collab.tickets.move_ticket(&ticket.id, &first).await?;
            RaisedTicket {
                ticket_id: ticket.id,
                occurrence: 1,
                action: TicketAction::Reopened,
            }
        }
        None => {
            let spec = TicketSpec {
                name: def.result_name.clone(),
                node_id: target.id.clone(),
                context: context.to_string(),
                process: process.to_string(),
                priority: def.result.priority,
                description,
                is_alarm,
                occurred_at: time,
            };
            RaisedTicket {
                ticket_id: collab.tickets.add_ticket(&spec).await?,
                occurrence: 1,
                action: TicketAction::Opened,
            }
        }
    };

    store_occurrence(collab, &raised.ticket_id, raised.occurrence, time).await?;
    info!(
        analytic = %plan.id(),
        node = %target,
        ticket_id = %raised.ticket_id,
        occurrence = raised.occurrence,
        action = ?raised.action,
        "{} raised",
        def.result_type
    );
    Ok(raised)
}

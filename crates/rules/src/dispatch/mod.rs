//! Result dispatch: turn an analytic's output into its side effect.
//!
//! Ticket, alarm, SMS and chat results are conditional and only fire on a
//! truthy value. Endpoint, attribute and log results always apply the value.

pub mod template;
pub mod tickets;


use tracing::{debug, info};
use vigil_core::{format_millis, EpochMillis, NodeInfo, Value};
use vigil_notify::{Card, Channel, Message, MessageBody};

use crate::context::Collaborators;
use crate::error::{AnalyticError, Result};
use crate::evaluator::InputValues;
use crate::resolver::{CONTROL_POINT_RELATIONS, MEASUREMENT_POINT_RELATIONS};
use crate::schema::{AnalyticPlan, AnalyticResult, ResultType};

pub use self::tickets::{RaisedTicket, TicketAction};

/// Attribute category used by `AttributeWrite` when none is configured.
pub const DEFAULT_ATTRIBUTE_CATEGORY: &str = "Analytics";

/// Error text of a unit whose evaluation produced no value.
pub const UNDEFINED_RESULT: &str = "Result is undefined";

/// Apply `value` for one `(entity, execution time)` unit.
///
/// `inputs` are the resolved input values of the unit, used to expand `{n}`
/// placeholders in messages.
pub async fn apply(
    collab: &Collaborators,
    plan: &AnalyticPlan,
    entity: &NodeInfo,
    time: EpochMillis,
    value: Option<&Value>,
    inputs: &InputValues,
) -> Result<AnalyticResult> {
    let Some(value) = value else {
        return Ok(AnalyticResult::failed(UNDEFINED_RESULT));
    };
    let def = &plan.definition;
    let result_type = def.result_type;

    if result_type.is_conditional() && !value.is_truthy() {
        debug!(analytic = %plan.id(), entity = %entity, %value, "condition not met");
        return Ok(AnalyticResult::applied(value.clone(), result_type));
    }

    match result_type {
        ResultType::Ticket | ResultType::Alarm => {
            let description = def.result.message.as_deref().map(|m| template::render(m, inputs));
            tickets::raise(collab, plan, entity, time, description).await?;
        }
        ResultType::ControlEndpoint => {
            write_point(collab, plan, entity, time, value, CONTROL_POINT_RELATIONS).await?;
        }
        ResultType::Endpoint => {
            write_point(collab, plan, entity, time, value, MEASUREMENT_POINT_RELATIONS).await?;
        }
        ResultType::Sms => {
            let message = Message::text(def.result.recipients.clone(), text(plan, entity, inputs));
            return notify(collab, plan, Channel::Sms, &message, value).await;
        }
        ResultType::ChatMessage => {
            let message = Message::text(def.result.recipients.clone(), text(plan, entity, inputs));
            return notify(collab, plan, Channel::Chat, &message, value).await;
        }
        ResultType::ChatCard => {
            let title = match def.result.title.as_deref() {
                Some(title) => template::render(title, inputs),
                None => def.name.clone(),
            };
            let message = Message {
                recipients: def.result.recipients.clone(),
                body: MessageBody::Card(Card {
                    title,
                    subtitle: Some(entity.name.clone()),
                    text: text(plan, entity, inputs),
                }),
            };
            return notify(collab, plan, Channel::Chat, &message, value).await;
        }
        ResultType::AttributeWrite => {
            let category = def
                .result
                .attribute_category
                .as_deref()
                .unwrap_or(DEFAULT_ATTRIBUTE_CATEGORY);
            collab
                .attributes
                .set_attribute(&entity.id, category, &def.result_name, &value.to_string())
                .await?;
        }
        ResultType::Log => {
            info!(
                analytic = %plan.id(),
                name = %def.result_name,
                entity = %entity,
                time = %format_millis(time),
                %value,
                "analytic result"
            );
        }
    }

    Ok(AnalyticResult::applied(value.clone(), result_type))
}

/// Rendered message body, or a default naming the analytic and the entity.
fn text(plan: &AnalyticPlan, entity: &NodeInfo, inputs: &InputValues) -> String {
    match plan.definition.result.message.as_deref() {
        Some(message) => template::render(message, inputs),
        None => format!("{} triggered on {}", plan.name(), entity.name),
    }
}

async fn write_point(
    collab: &Collaborators,
    plan: &AnalyticPlan,
    entity: &NodeInfo,
    time: EpochMillis,
    value: &Value,
    relations: &[&str],
) -> Result<()> {
    let relations: Vec<String> = relations.iter().map(|r| r.to_string()).collect();
    let name = &plan.definition.result_name;
    let point = collab
        .graph
        .children(&entity.id, &relations)
        .await?
        .into_iter()
        .find(|child| &child.name == name)
        .ok_or_else(|| {
            AnalyticError::Config(format!("no point named '{name}' under {entity}"))
        })?;

    collab.graph.set_current_value(&point.id, value.clone()).await?;
    match value.as_f64() {
        Some(number) => collab.series.insert(&point.id, number, time).await?,
        None => debug!(point = %point, %value, "non-numeric value; series not updated"),
    }
    Ok(())
}

async fn notify(
    collab: &Collaborators,
    plan: &AnalyticPlan,
    channel: Channel,
    message: &Message,
    value: &Value,
) -> Result<AnalyticResult> {
    if !collab.notifications.has_channel(channel) {
        return Err(AnalyticError::Config(format!(
            "analytic '{}': no {channel} notifier configured",
            plan.id()
        )));
    }

    let results = collab.notifications.dispatch(channel, message).await;
    let errors: Vec<String> = results
        .iter()
        .filter(|r| !r.success)
        .map(|r| format!("{}: {}", r.channel, r.error.as_deref().unwrap_or("delivery failed")))
        .collect();

    let mut result = AnalyticResult::applied(value.clone(), plan.definition.result_type);
    if !errors.is_empty() {
        result.success = false;
        result.error = errors.join("; ");
    }
    Ok(result)
}

//! Store trait definitions and the value types they exchange.

use serde::{Deserialize, Serialize};
use vigil_core::{EpochMillis, NodeInfo, Sample, Value};

use crate::error::StoreError;

/// A documentation attribute attached to a node under a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub label: String,
    pub value: String,
}

/// One step of a ticket workflow process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub name: String,
    /// Position in the process; the first step has the lowest order.
    pub order: u32,
}

/// A ticket (or alarm) as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRef {
    pub id: String,
    pub name: String,
    pub node_id: String,
    pub context: String,
    pub process: String,
    pub step: WorkflowStep,
    pub is_alarm: bool,
}

/// Everything needed to open a new ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSpec {
    pub name: String,
    pub node_id: String,
    pub context: String,
    pub process: String,
    pub priority: u8,
    pub description: Option<String>,
    pub is_alarm: bool,
    pub occurred_at: EpochMillis,
}

/// Read access to the asset graph plus the current value of points.
///
/// An empty `relations` slice means "every relation".
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    async fn node(&self, id: &str) -> Result<Option<NodeInfo>, StoreError>;

    async fn children(&self, id: &str, relations: &[String]) -> Result<Vec<NodeInfo>, StoreError>;

    async fn parents(&self, id: &str, relations: &[String]) -> Result<Vec<NodeInfo>, StoreError>;

    /// Names of the outgoing relations of a node.
    async fn relation_names(&self, id: &str) -> Result<Vec<String>, StoreError>;

    async fn current_value(&self, point_id: &str) -> Result<Option<Value>, StoreError>;

    async fn set_current_value(&self, point_id: &str, value: Value) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
pub trait AttributeStore: Send + Sync {
    async fn attributes_by_category(
        &self,
        node_id: &str,
        category: &str,
    ) -> Result<Vec<Attribute>, StoreError>;

    async fn find_attribute(
        &self,
        node_id: &str,
        category: &str,
        label: &str,
    ) -> Result<Option<Attribute>, StoreError> {
        let attributes = self.attributes_by_category(node_id, category).await?;
        Ok(attributes.into_iter().find(|a| a.label == label))
    }

    /// Create or overwrite an attribute.
    async fn set_attribute(
        &self,
        node_id: &str,
        category: &str,
        label: &str,
        value: &str,
    ) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Raw samples with `start <= date <= end`, ordered by date.
    async fn interval(
        &self,
        series_id: &str,
        start: EpochMillis,
        end: EpochMillis,
    ) -> Result<Vec<Sample>, StoreError>;

    /// Most recent sample strictly before `time`.
    async fn last_before(
        &self,
        series_id: &str,
        time: EpochMillis,
    ) -> Result<Option<Sample>, StoreError>;

    async fn insert(
        &self,
        series_id: &str,
        value: f64,
        time: EpochMillis,
    ) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
pub trait TicketService: Send + Sync {
    async fn first_step(
        &self,
        context: &str,
        process: &str,
    ) -> Result<Option<WorkflowStep>, StoreError>;

    async fn find_ticket(
        &self,
        context: &str,
        process: &str,
        node_id: &str,
        name: &str,
    ) -> Result<Option<TicketRef>, StoreError>;

    /// Open a ticket at the first step of its process; returns the ticket id.
    async fn add_ticket(&self, spec: &TicketSpec) -> Result<String, StoreError>;

    async fn move_ticket(&self, ticket_id: &str, to: &WorkflowStep) -> Result<(), StoreError>;

    async fn alarms_from_node(&self, node_id: &str) -> Result<Vec<TicketRef>, StoreError>;
}

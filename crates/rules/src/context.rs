//! External collaborators the engine talks to.

use std::sync::Arc;

use vigil_graph::{AttributeStore, GraphStore, TicketService, TimeSeriesStore};
use vigil_notify::Dispatcher;

/// Handles to the graph, attribute, time-series and ticket stores plus the
/// notification dispatcher. Cheap to clone.
#[derive(Clone)]
pub struct Collaborators {
    pub graph: Arc<dyn GraphStore>,
    pub attributes: Arc<dyn AttributeStore>,
    pub series: Arc<dyn TimeSeriesStore>,
    pub tickets: Arc<dyn TicketService>,
    pub notifications: Arc<Dispatcher>,
}

impl Collaborators {
    /// Use one backend for every store interface.
    pub fn from_store<S>(store: Arc<S>, notifications: Dispatcher) -> Self
    where
        S: GraphStore + AttributeStore + TimeSeriesStore + TicketService + 'static,
    {
        Self {
            graph: store.clone(),
            attributes: store.clone(),
            series: store.clone(),
            tickets: store,
            notifications: Arc::new(notifications),
        }
    }
}

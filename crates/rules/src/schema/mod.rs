//! Analytic definition types with serde deserialization.
//!
//! Defines the analytic document and its validated form:
//! - `AnalyticDefinition`: raw YAML/JSON document
//! - `StepRef`: typed step ids of the io-dependency map
//! - `AnalyticPlan`: definition decoded once, with the dependency graph checked
//! - `AnalyticResult`: the record produced per entity and execution time

mod definition;
mod descriptor;
mod plan;
mod result;
mod step;
mod trigger;

pub use definition::*;
pub use descriptor::*;
pub use plan::*;
pub use result::*;
pub use step::*;
pub use trigger::*;

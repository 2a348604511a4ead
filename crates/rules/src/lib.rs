//! Building analytics engine.
//!
//! This crate provides:
//! - YAML analytic definitions decoded into validated dependency plans
//! - An algorithm catalog evaluated over resolved graph inputs
//! - Catch-up and aggregate scheduling of execution times
//! - Result dispatch to tickets, alarms, endpoints, attributes and messages

pub mod algorithms;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod evaluator;
pub mod fixture;
pub mod resolver;
pub mod runner;
pub mod scheduler;
pub mod schema;
pub mod window;

#[cfg(test)]
mod test_support;

//! Algorithm registry: named pure functions invoked by analytic steps.
//!
//! The registry is an explicit value built once (usually with
//! [`AlgorithmRegistry::with_builtins`]) and shared with plan building and
//! the evaluator.

mod catalog;
mod math;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use vigil_core::Value;

use crate::error::AlgorithmError;

/// Step parameters keyed by bare name (`p1`, `p2`).
pub type Params = BTreeMap<String, Value>;

/// `Ok(None)` is an undefined result.
pub type AlgorithmFn = fn(&[Value], &Params) -> Result<Option<Value>, AlgorithmError>;

/// Name of the control algorithm that aborts an evaluation when truthy.
pub const EXIT: &str = "EXIT";

/// Declared shape of an algorithm's inputs or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Number,
    Boolean,
    Series,
    Any,
}

#[derive(Clone)]
pub struct AlgorithmSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input: ValueKind,
    pub output: ValueKind,
    /// Required parameter names.
    pub parameters: &'static [&'static str],
    pub run: AlgorithmFn,
}

impl std::fmt::Debug for AlgorithmSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmSpec")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("parameters", &self.parameters)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct AlgorithmRegistry {
    algorithms: HashMap<String, AlgorithmSpec>,
}

impl AlgorithmRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the full built-in catalog.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for spec in catalog::builtins() {
            registry.register(spec);
        }
        registry
    }

    /// Add or replace an algorithm.
    pub fn register(&mut self, spec: AlgorithmSpec) {
        self.algorithms.insert(spec.name.to_string(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&AlgorithmSpec> {
        self.algorithms.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.algorithms.contains_key(name)
    }

    /// Registered algorithms, sorted by name.
    pub fn specs(&self) -> Vec<&AlgorithmSpec> {
        let mut specs: Vec<&AlgorithmSpec> = self.algorithms.values().collect();
        specs.sort_by_key(|s| s.name);
        specs
    }

    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    /// Check required parameters, then run the algorithm.
    pub fn invoke(
        &self,
        name: &str,
        inputs: &[Value],
        params: &Params,
    ) -> Result<Option<Value>, AlgorithmError> {
        let spec = self
            .get(name)
            .ok_or_else(|| AlgorithmError::Unknown(name.to_string()))?;
        for required in spec.parameters {
            if !params.contains_key(*required) {
                return Err(AlgorithmError::MissingParameter {
                    algorithm: name.to_string(),
                    param: required.to_string(),
                });
            }
        }
        (spec.run)(inputs, params)
    }
}

//! Dependency-graph evaluation of an analytic plan.
//!
//! Evaluation is synchronous: every input slot has already been materialized
//! for the `(entity, execution time)` unit by [`prefetch`]. Starting from the
//! root, algorithm steps recurse depth-first over their dependencies in
//! declared order; shared steps are computed once per evaluation.

pub mod prefetch;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap, HashSet};

use vigil_core::Value;

use crate::algorithms::{AlgorithmRegistry, EXIT};
use crate::error::{AnalyticError, Result};
use crate::schema::{AnalyticPlan, StepRef};

/// Successful outcome of an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Value(Value),
    /// `EXIT` fired: stop without applying any side effect.
    Exit,
}

/// Materialized input values for one execution time. Missing slots were
/// not found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputValues {
    values: BTreeMap<u32, Value>,
}

impl InputValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: u32, value: Value) {
        self.values.insert(index, value);
    }

    pub fn get(&self, index: u32) -> Option<&Value> {
        self.values.get(&index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(u32, Value)> for InputValues {
    fn from_iter<I: IntoIterator<Item = (u32, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[derive(Default)]
struct EvalState {
    memo: HashMap<u32, Value>,
    on_stack: HashSet<u32>,
}

/// Evaluates plans against an injected algorithm registry.
pub struct Evaluator<'r> {
    registry: &'r AlgorithmRegistry,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r AlgorithmRegistry) -> Self {
        Self { registry }
    }

    /// Evaluate the plan for one unit. The root's single dependency is the
    /// result, returned unchanged when it is a direct input.
    pub fn evaluate(&self, plan: &AnalyticPlan, inputs: &InputValues) -> Result<StepOutcome> {
        let mut state = EvalState::default();
        self.eval_ref(plan, plan.root(), inputs, &mut state)
    }

    fn eval_ref(
        &self,
        plan: &AnalyticPlan,
        step: StepRef,
        inputs: &InputValues,
        state: &mut EvalState,
    ) -> Result<StepOutcome> {
        match step {
            StepRef::Input(n) => inputs
                .get(n)
                .cloned()
                .map(StepOutcome::Value)
                .ok_or_else(|| AnalyticError::DataUnavailable(step.to_string())),
            StepRef::Algorithm(n) => self.eval_algorithm(plan, n, inputs, state),
            StepRef::Root => Err(AnalyticError::Config(
                "the root step cannot be a dependency".to_string(),
            )),
        }
    }

    fn eval_algorithm(
        &self,
        plan: &AnalyticPlan,
        index: u32,
        inputs: &InputValues,
        state: &mut EvalState,
    ) -> Result<StepOutcome> {
        if let Some(value) = state.memo.get(&index) {
            return Ok(StepOutcome::Value(value.clone()));
        }
        let step_ref = StepRef::Algorithm(index);
        if !state.on_stack.insert(index) {
            return Err(AnalyticError::Cycle(step_ref.to_string()));
        }

        let step = plan
            .step(index)
            .ok_or_else(|| AnalyticError::Config(format!("step {step_ref} is not defined")))?;

        let mut args: Vec<Value> = Vec::with_capacity(step.dependencies.len());
        for dep in &step.dependencies {
            match self.eval_ref(plan, *dep, inputs, state)? {
                StepOutcome::Exit => return Ok(StepOutcome::Exit),
                // Multi-match inputs are spliced; algorithm outputs are not.
                StepOutcome::Value(Value::List(items)) if matches!(dep, StepRef::Input(_)) => {
                    args.extend(items)
                }
                StepOutcome::Value(value) => args.push(value),
            }
        }

        let value = self
            .registry
            .invoke(&step.algorithm, &args, &step.parameters)?
            .ok_or_else(|| AnalyticError::UndefinedResult(step_ref.to_string()))?;
        tracing::trace!(step = %step_ref, algorithm = %step.algorithm, %value, "step evaluated");

        state.on_stack.remove(&index);
        if step.algorithm == EXIT && value.is_truthy() {
            tracing::debug!(analytic = %plan.id(), step = %step_ref, "exit requested");
            return Ok(StepOutcome::Exit);
        }
        state.memo.insert(index, value.clone());
        Ok(StepOutcome::Value(value))
    }
}

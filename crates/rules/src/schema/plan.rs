//! Validated, typed form of an [`AnalyticDefinition`].

use std::collections::{BTreeMap, HashMap};

use vigil_core::Value;

use super::definition::AnalyticDefinition;
use super::descriptor::TrackingDescriptor;
use super::step::StepRef;
use crate::algorithms::{AlgorithmRegistry, Params};
use crate::error::{AnalyticError, Result};

/// Separator between the step id and the parameter name in parameter keys.
pub const PARAMETER_SEPARATOR: char = '-';

/// One algorithm step with its resolved dependencies and parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmStep {
    pub index: u32,
    pub algorithm: String,
    pub dependencies: Vec<StepRef>,
    /// Parameters of this step only, keyed by bare name (`p1`).
    pub parameters: Params,
}

/// An analytic whose dependency map has been parsed and checked.
#[derive(Debug, Clone)]
pub struct AnalyticPlan {
    pub definition: AnalyticDefinition,
    root: StepRef,
    steps: BTreeMap<u32, AlgorithmStep>,
    inputs: BTreeMap<u32, TrackingDescriptor>,
}

fn config_err(analytic: &str, msg: impl std::fmt::Display) -> AnalyticError {
    AnalyticError::Config(format!("analytic '{analytic}': {msg}"))
}

fn parse_step(analytic: &str, raw: &str) -> Result<StepRef> {
    raw.parse::<StepRef>().map_err(|e| config_err(analytic, e))
}

impl AnalyticPlan {
    /// Decode and validate a definition.
    ///
    /// Fails when the root is missing or does not have exactly one
    /// dependency, when an algorithm step has no registered algorithm, when
    /// an input step has no tracking descriptor, or when the map is cyclic.
    pub fn from_definition(
        definition: AnalyticDefinition,
        registry: &AlgorithmRegistry,
    ) -> Result<Self> {
        let plan = Self::assemble(definition, registry)?;
        plan.check_acyclic()?;
        Ok(plan)
    }

    /// Everything but the cycle check.
    pub(crate) fn assemble(
        definition: AnalyticDefinition,
        registry: &AlgorithmRegistry,
    ) -> Result<Self> {
        let id = definition.id.clone();

        let mut dependencies: HashMap<StepRef, Vec<StepRef>> = HashMap::new();
        for (raw_step, raw_deps) in &definition.io_dependencies {
            let step = parse_step(&id, raw_step)?;
            if let StepRef::Input(_) = step {
                return Err(config_err(&id, format!("input step {step} cannot have dependencies")));
            }
            let mut deps = Vec::with_capacity(raw_deps.len());
            for raw in raw_deps {
                let dep = parse_step(&id, raw)?;
                if dep.is_root() {
                    return Err(config_err(&id, format!("step {step} depends on the root")));
                }
                deps.push(dep);
            }
            dependencies.insert(step, deps);
        }

        let root_deps = dependencies
            .remove(&StepRef::Root)
            .ok_or_else(|| config_err(&id, "missing root step R"))?;
        let root = match root_deps.as_slice() {
            [single] => *single,
            other => {
                return Err(config_err(
                    &id,
                    format!("root step R must have exactly one dependency, found {}", other.len()),
                ))
            }
        };

        let mut parameters: HashMap<u32, Params> = HashMap::new();
        for (key, value) in &definition.parameters {
            let (raw_step, name) = key
                .split_once(PARAMETER_SEPARATOR)
                .ok_or_else(|| config_err(&id, format!("malformed parameter key '{key}'")))?;
            match parse_step(&id, raw_step)? {
                StepRef::Algorithm(n) => {
                    parameters.entry(n).or_default().insert(name.to_string(), value.clone());
                }
                other => {
                    return Err(config_err(
                        &id,
                        format!("parameter '{key}' targets non-algorithm step {other}"),
                    ))
                }
            }
        }

        let mut algorithm_names: HashMap<u32, String> = HashMap::new();
        for (raw_step, name) in &definition.algorithm_index {
            match parse_step(&id, raw_step)? {
                StepRef::Algorithm(n) => {
                    algorithm_names.insert(n, name.clone());
                }
                other => {
                    return Err(config_err(&id, format!("algorithm mapped to non-algorithm step {other}")))
                }
            }
        }

        let mut inputs = BTreeMap::new();
        for (raw_step, descriptor) in &definition.inputs {
            match parse_step(&id, raw_step)? {
                StepRef::Input(n) => {
                    inputs.insert(n, descriptor.clone());
                }
                other => return Err(config_err(&id, format!("descriptor attached to {other}"))),
            }
        }

        // Every step reachable in the map must be backed by an algorithm or
        // a descriptor.
        let mut referenced: Vec<StepRef> = vec![root];
        referenced.extend(dependencies.keys().copied());
        referenced.extend(dependencies.values().flatten().copied());

        let mut steps = BTreeMap::new();
        for step in referenced {
            match step {
                StepRef::Root => {}
                StepRef::Input(n) => {
                    if !inputs.contains_key(&n) {
                        return Err(config_err(&id, format!("input {step} has no tracking descriptor")));
                    }
                }
                StepRef::Algorithm(n) => {
                    if steps.contains_key(&n) {
                        continue;
                    }
                    let algorithm = algorithm_names
                        .get(&n)
                        .ok_or_else(|| config_err(&id, format!("step {step} has no algorithm mapping")))?;
                    let spec = registry.get(algorithm).ok_or_else(|| {
                        config_err(&id, format!("step {step} uses unknown algorithm '{algorithm}'"))
                    })?;
                    let step_params = parameters.remove(&n).unwrap_or_default();
                    for required in spec.parameters {
                        if !step_params.contains_key(*required) {
                            return Err(config_err(
                                &id,
                                format!("step {step} ({algorithm}) is missing parameter '{required}'"),
                            ));
                        }
                    }
                    steps.insert(
                        n,
                        AlgorithmStep {
                            index: n,
                            algorithm: algorithm.clone(),
                            dependencies: dependencies.get(&step).cloned().unwrap_or_default(),
                            parameters: step_params,
                        },
                    );
                }
            }
        }

        for n in parameters.keys() {
            tracing::debug!(analytic = %id, step = %StepRef::Algorithm(*n), "ignoring parameters of unused step");
        }

        Ok(Self {
            definition,
            root,
            steps,
            inputs,
        })
    }

    /// Depth-first walk from the root with an explicit stack; a step met
    /// again while still on the path closes a cycle.
    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            OnPath,
            Done,
        }

        let mut marks: HashMap<u32, Mark> = HashMap::new();
        let StepRef::Algorithm(start) = self.root else {
            return Ok(());
        };

        // (step, index of next dependency to visit)
        let mut stack: Vec<(u32, usize)> = vec![(start, 0)];
        marks.insert(start, Mark::OnPath);

        while let Some(top) = stack.last_mut() {
            let (index, cursor) = *top;
            top.1 += 1;
            let deps = self
                .steps
                .get(&index)
                .map(|s| s.dependencies.as_slice())
                .unwrap_or_default();
            let Some(dep) = deps.get(cursor) else {
                marks.insert(index, Mark::Done);
                stack.pop();
                continue;
            };
            if let StepRef::Algorithm(next) = *dep {
                match marks.get(&next) {
                    Some(Mark::OnPath) => {
                        return Err(AnalyticError::Cycle(StepRef::Algorithm(next).to_string()))
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(next, Mark::OnPath);
                        stack.push((next, 0));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// The single dependency of `R`.
    pub fn root(&self) -> StepRef {
        self.root
    }

    pub fn step(&self, index: u32) -> Option<&AlgorithmStep> {
        self.steps.get(&index)
    }

    pub fn steps(&self) -> impl Iterator<Item = &AlgorithmStep> {
        self.steps.values()
    }

    /// Every input slot with its descriptor, in index order.
    pub fn inputs(&self) -> &BTreeMap<u32, TrackingDescriptor> {
        &self.inputs
    }

    pub fn parameter(&self, index: u32, name: &str) -> Option<&Value> {
        self.steps.get(&index)?.parameters.get(name)
    }
}

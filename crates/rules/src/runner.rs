//! Fan-out of one analytic over its followed entities and execution times.
//!
//! Entities run concurrently up to the configured limit. The execution times
//! of one entity run in ascending order, so ticket deduplication observes
//! the side effects of earlier times. A failing unit never stops the others.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};
use vigil_core::config::EngineConfig;
use vigil_core::{format_millis, EpochMillis, NodeInfo};

use crate::algorithms::AlgorithmRegistry;
use crate::context::Collaborators;
use crate::dispatch;
use crate::error::{AnalyticError, Result};
use crate::evaluator::prefetch::{self, PreparedInputs};
use crate::evaluator::{Evaluator, StepOutcome};
use crate::schema::{AnalyticPlan, AnalyticResult};

/// Result of one `(entity, execution time)` unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitReport {
    pub analytic_id: String,
    pub entity_id: String,
    pub execution_time: EpochMillis,
    #[serde(flatten)]
    pub result: AnalyticResult,
}

pub struct Runner {
    collab: Collaborators,
    registry: Arc<AlgorithmRegistry>,
    config: EngineConfig,
}

impl Runner {
    pub fn new(collab: Collaborators, registry: Arc<AlgorithmRegistry>, config: EngineConfig) -> Self {
        Self {
            collab,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    /// Entities the analytic is evaluated against: the anchor itself, or
    /// its children through the configured relations, optionally filtered
    /// by node type.
    pub async fn followed_entities(&self, plan: &AnalyticPlan) -> Result<Vec<NodeInfo>> {
        let followed = &plan.definition.followed;
        let anchor = self.collab.graph.node(&followed.anchor).await?.ok_or_else(|| {
            AnalyticError::Config(format!(
                "analytic '{}': anchor node '{}' not found",
                plan.id(),
                followed.anchor
            ))
        })?;

        if followed.relations.is_empty() {
            return Ok(vec![anchor]);
        }
        let children = self
            .collab
            .graph
            .children(&anchor.id, &followed.relations)
            .await?;
        Ok(children
            .into_iter()
            .filter(|c| {
                followed
                    .node_type
                    .as_deref()
                    .map_or(true, |t| c.node_type == t)
            })
            .collect())
    }

    /// Evaluate and apply `plan` for every followed entity at every time.
    ///
    /// Reports are ordered by entity id, then execution time.
    pub async fn run(&self, plan: &AnalyticPlan, times: &[EpochMillis]) -> Result<Vec<UnitReport>> {
        let mut times = times.to_vec();
        times.sort_unstable();
        times.dedup();
        if times.is_empty() {
            return Ok(Vec::new());
        }

        let entities = self.followed_entities(plan).await?;
        info!(
            analytic = %plan.id(),
            entities = entities.len(),
            times = times.len(),
            "running analytic"
        );

        let times = &times;
        let per_entity: Vec<Vec<UnitReport>> = stream::iter(entities)
            .map(|entity| async move { self.run_entity(plan, &entity, times).await })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut reports: Vec<UnitReport> = per_entity.into_iter().flatten().collect();
        reports.sort_by(|a, b| {
            a.entity_id
                .cmp(&b.entity_id)
                .then(a.execution_time.cmp(&b.execution_time))
        });

        let failed = reports.iter().filter(|r| !r.result.success).count();
        info!(
            analytic = %plan.id(),
            units = reports.len(),
            failed,
            "analytic run complete"
        );
        Ok(reports)
    }

    async fn run_entity(
        &self,
        plan: &AnalyticPlan,
        entity: &NodeInfo,
        times: &[EpochMillis],
    ) -> Vec<UnitReport> {
        let prepared = match prefetch::prepare(&self.collab, plan, entity, times).await {
            Ok(prepared) => prepared,
            Err(e) => {
                return times
                    .iter()
                    .map(|&time| self.report(plan, entity, time, self.failure(plan, entity, time, &e)))
                    .collect()
            }
        };

        let mut reports = Vec::with_capacity(times.len());
        for &time in times {
            let result = self.run_unit(plan, entity, time, &prepared).await;
            reports.push(self.report(plan, entity, time, result));
        }
        reports
    }

    async fn run_unit(
        &self,
        plan: &AnalyticPlan,
        entity: &NodeInfo,
        time: EpochMillis,
        prepared: &PreparedInputs,
    ) -> AnalyticResult {
        let inputs = prepared.at(time);
        let value = match Evaluator::new(&self.registry).evaluate(plan, &inputs) {
            Ok(StepOutcome::Value(value)) => Some(value),
            Ok(StepOutcome::Exit) => {
                debug!(analytic = %plan.id(), entity = %entity, time, "exited");
                return AnalyticResult::exited();
            }
            Err(AnalyticError::UndefinedResult(step)) => {
                debug!(analytic = %plan.id(), entity = %entity, %step, "undefined result");
                None
            }
            Err(e) => return self.failure(plan, entity, time, &e),
        };

        match dispatch::apply(&self.collab, plan, entity, time, value.as_ref(), &inputs).await {
            Ok(result) => result,
            Err(e) => self.failure(plan, entity, time, &e),
        }
    }

    fn failure(
        &self,
        plan: &AnalyticPlan,
        entity: &NodeInfo,
        time: EpochMillis,
        error: &AnalyticError,
    ) -> AnalyticResult {
        let message = format!(
            "{error} (entity {entity}, analytic {} [{}], time {})",
            plan.name(),
            plan.id(),
            format_millis(time)
        );
        warn!(analytic = %plan.id(), entity = %entity, time, error = %error, "unit failed");
        AnalyticResult::failed(message)
    }

    fn report(
        &self,
        plan: &AnalyticPlan,
        entity: &NodeInfo,
        time: EpochMillis,
        result: AnalyticResult,
    ) -> UnitReport {
        UnitReport {
            analytic_id: plan.id().to_string(),
            entity_id: entity.id.clone(),
            execution_time: time,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use vigil_core::Value;

    use super::*;
    use crate::schema::{ResultType, TrackingDescriptor};
    use crate::test_support::{building_store, collaborators, definition, point_descriptor, MINUTE, T0};

    fn runner(store: Arc<vigil_graph::MemoryStore>, concurrency: usize) -> Runner {
        Runner::new(
            collaborators(store),
            Arc::new(AlgorithmRegistry::with_builtins()),
            EngineConfig {
                concurrency,
                max_ticks: 10_000,
            },
        )
    }

    fn rooms_plan(input: TrackingDescriptor) -> AnalyticPlan {
        let mut def = definition(&[("R", &["A0"]), ("A0", &["I0"])], &[("A0", "COPY_LAST")], vec![("I0", input)]);
        def.followed.anchor = "f1".to_string();
        def.followed.relations = vec!["hasSpace".to_string()];
        def.followed.node_type = Some("room".to_string());
        AnalyticPlan::from_definition(def, &AlgorithmRegistry::with_builtins()).unwrap()
    }

    #[tokio::test]
    async fn follows_anchor_children_by_type() {
        let store = Arc::new(building_store());
        let r = runner(store, 4);
        let plan = rooms_plan(point_descriptor("Temperature"));
        let mut ids: Vec<String> = r
            .followed_entities(&plan)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["r1".to_string(), "r2".to_string()]);
    }

    #[tokio::test]
    async fn missing_anchor_is_a_configuration_error() {
        let store = Arc::new(building_store());
        let r = runner(store, 1);
        let mut def = definition(&[("R", &["I0"])], &[], vec![("I0", point_descriptor("Temperature"))]);
        def.followed.anchor = "nowhere".to_string();
        let plan = AnalyticPlan::from_definition(def, r.registry()).unwrap();
        assert!(matches!(r.run(&plan, &[T0]).await, Err(AnalyticError::Config(_))));
    }

    #[tokio::test]
    async fn reports_every_unit_in_order() {
        let store = Arc::new(building_store());
        let r = runner(store, 2);
        let plan = rooms_plan(point_descriptor("Temperature"));
        let reports = r.run(&plan, &[T0 + MINUTE, T0, T0]).await.unwrap();

        let units: Vec<(&str, EpochMillis)> = reports
            .iter()
            .map(|r| (r.entity_id.as_str(), r.execution_time))
            .collect();
        assert_eq!(units, vec![("r1", T0), ("r1", T0 + MINUTE), ("r2", T0), ("r2", T0 + MINUTE)]);
        assert_eq!(reports[0].result.result_value, Some(Value::Number(22.5)));
        assert_eq!(reports[2].result.result_value, Some(Value::Number(26.0)));
        assert!(reports.iter().all(|r| r.result.result_type == Some(ResultType::Log)));
    }

    #[tokio::test]
    async fn failures_are_isolated_and_carry_context() {
        let store = Arc::new(building_store());
        let r = runner(store, 2);
        // Only r2 has a BMS backup point.
        let reports = r
            .run(&rooms_plan(point_descriptor("Temperature Backup")), &[T0])
            .await
            .unwrap();
        assert_eq!(reports.len(), 2);

        let r1 = &reports[0];
        assert!(!r1.result.success);
        assert!(r1.result.error.starts_with("Data unavailable for input I0"), "{}", r1.result.error);
        assert!(r1.result.error.contains("entity Room 101 (r1)"), "{}", r1.result.error);
        assert!(r1.result.error.contains("analytic Comfort check [an-1]"), "{}", r1.result.error);
        assert!(r1.result.error.contains("time 2023-11-14T22:13:20+00:00"), "{}", r1.result.error);

        assert!(reports[1].result.success);
        assert_eq!(reports[1].result.result_value, Some(Value::Number(25.0)));
    }

    #[tokio::test]
    async fn undefined_results_are_reported_without_context() {
        let store = Arc::new(building_store());
        store.set_value("t1", Value::Number(0.0)).unwrap();
        let r = runner(store, 1);
        let def = definition(
            &[("R", &["A0"]), ("A0", &["I0", "I1"])],
            &[("A0", "DIVISION")],
            vec![("I0", point_descriptor("Temperature")), ("I1", point_descriptor("Temperature"))],
        );
        let plan = AnalyticPlan::from_definition(def, r.registry()).unwrap();
        let reports = r.run(&plan, &[T0]).await.unwrap();
        assert_eq!(reports[0].result, AnalyticResult::failed(dispatch::UNDEFINED_RESULT));
    }

    #[test]
    fn unit_report_serializes_flat() {
        let report = UnitReport {
            analytic_id: "an-1".to_string(),
            entity_id: "r1".to_string(),
            execution_time: T0,
            result: AnalyticResult::applied(Value::Bool(true), ResultType::Ticket),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "analyticId": "an-1",
                "entityId": "r1",
                "executionTime": T0,
                "success": true,
                "error": "",
                "resultValue": true,
                "resultType": "Ticket"
            })
        );
    }
}

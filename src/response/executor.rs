//! 响应执行引擎
//!
//! 每个计划的状态机：Pending → Running → {Completed | Failed}。
//! 同一计划 id、同一条件 id 同时最多一个在途执行；步骤严格按顺序逐个应用，
//! 完成时计算有效性并写回台账，失败时保留部分进度且不触碰台账。引擎从不自动重试。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::error::{EngineError, EngineResult};
use crate::core::now_ms;
use crate::field::ConditionId;
use crate::response::ledger::EffectivenessLedger;
use crate::response::types::{
    Accumulator, PlanId, PlanStatus, ResponsePlan, ResponseProgress, StepEffect,
};

/// 成功完成的一次执行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRun {
    pub plan: ResponsePlan,
    pub progress: ResponseProgress,
    pub effectiveness: f64,
    /// 台账更新后的值
    pub ledger_value: f64,
}

/// 失败的一次执行（部分进度可供检查）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRun {
    pub plan: ResponsePlan,
    pub progress: ResponseProgress,
    pub reason: String,
}

/// 单步推进结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// 已应用第 n 步（从 0 计），后面还有步骤
    Step(usize),
    /// 已应用最后一步
    Finished(usize),
}

struct ActiveRun {
    plan: ResponsePlan,
    progress: ResponseProgress,
}

#[derive(Default)]
pub struct ExecutionEngine {
    active: HashMap<PlanId, ActiveRun>,
    /// condition id → 在途计划 id
    active_conditions: HashMap<ConditionId, PlanId>,
    history: Vec<ResponsePlan>,
    failed: Vec<FailedRun>,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册进度并转入 Running
    pub fn start(&mut self, mut plan: ResponsePlan) -> EngineResult<()> {
        if self.active.contains_key(&plan.id) {
            return Err(EngineError::AlreadyRunning {
                id: plan.id.clone(),
            });
        }
        if let Some(running) = self.active_conditions.get(&plan.condition_id) {
            warn!(
                condition_id = %plan.condition_id,
                running_plan = %running,
                "Rejected second plan for condition"
            );
            return Err(EngineError::AlreadyRunning {
                id: plan.condition_id.clone(),
            });
        }

        let now = now_ms();
        plan.status = PlanStatus::Running;
        plan.executed_at = Some(now);
        let progress = ResponseProgress::new(&plan, now);
        info!(
            plan_id = %plan.id,
            strategy = %plan.strategy,
            steps = plan.steps.len(),
            "Response execution started"
        );
        self.active_conditions
            .insert(plan.condition_id.clone(), plan.id.clone());
        let id = plan.id.clone();
        self.active.insert(id.clone(), ActiveRun { plan, progress });

        if self.active.get(&id).map(|r| r.plan.steps.is_empty()).unwrap_or(false) {
            return Err(self.fail(&id, "plan has no steps"));
        }
        Ok(())
    }

    /// 应用下一步
    pub fn advance(&mut self, plan_id: &str) -> EngineResult<Advance> {
        let run = self
            .active
            .get_mut(plan_id)
            .ok_or_else(|| EngineError::plan_not_found(plan_id))?;
        let index = run.progress.steps_completed;
        let Some(step) = run.plan.steps.get(index) else {
            return Ok(Advance::Finished(index.saturating_sub(1)));
        };

        let progress = &mut run.progress;
        for effect in &step.effects {
            apply_effect(progress, effect);
        }
        if let Some(trigger) = &run.plan.state_trigger {
            if progress.accumulator(trigger.accumulator) > trigger.threshold {
                progress.indicators.push(trigger.indicator.clone());
            }
        }
        let total = run.plan.steps.len();
        progress.current_step_index = index;
        progress.steps_completed = index + 1;
        progress.progress_percentage = (index + 1) as f64 / total as f64 * 100.0;
        debug!(
            plan_id,
            step = index,
            description = %step.description,
            progress = progress.progress_percentage,
            "Step applied"
        );

        let accumulators_finite = progress.comfort_delta.is_finite()
            && progress.consciousness_expansion.is_finite()
            && progress.sacred_alignment.is_finite();
        let finished = progress.is_finished();
        if !accumulators_finite {
            return Err(self.fail(plan_id, &format!("non-finite accumulator at step {}", index)));
        }
        Ok(if finished {
            Advance::Finished(index)
        } else {
            Advance::Step(index)
        })
    }

    /// 全部步骤完成后收尾：收尾智慧、有效性、台账与能力分、转入历史
    pub fn complete(
        &mut self,
        plan_id: &str,
        ledger: &mut EffectivenessLedger,
        learning_rate: f64,
        capability_rate: f64,
    ) -> EngineResult<CompletedRun> {
        let finished = self
            .active
            .get(plan_id)
            .map(|r| r.progress.is_finished())
            .ok_or_else(|| EngineError::plan_not_found(plan_id))?;
        if !finished {
            return Err(EngineError::InvalidInput(format!(
                "plan {} has unfinished steps",
                plan_id
            )));
        }
        let ActiveRun {
            mut plan,
            mut progress,
        } = self
            .active
            .remove(plan_id)
            .ok_or_else(|| EngineError::plan_not_found(plan_id))?;
        self.active_conditions.remove(&plan.condition_id);

        progress.wisdom.extend(plan.closing_wisdom.iter().cloned());
        let effectiveness = effectiveness(&progress);

        plan.status = PlanStatus::Completed;
        plan.completed_at = Some(now_ms());
        plan.effectiveness = Some(effectiveness);

        let ledger_value = ledger.update(plan.strategy, effectiveness, learning_rate);
        ledger.update_capability(plan.strategy, effectiveness, capability_rate);

        info!(
            plan_id,
            strategy = %plan.strategy,
            effectiveness,
            ledger_value,
            "Response execution completed"
        );
        self.history.push(plan.clone());
        Ok(CompletedRun {
            plan,
            progress,
            effectiveness,
            ledger_value,
        })
    }

    /// 转入 Failed：保留部分进度，释放条件占用；返回应交给调用方的错误
    pub fn fail(&mut self, plan_id: &str, reason: &str) -> EngineError {
        let Some(ActiveRun { mut plan, progress }) = self.active.remove(plan_id) else {
            return EngineError::plan_not_found(plan_id);
        };
        self.active_conditions.remove(&plan.condition_id);
        plan.status = PlanStatus::Failed;
        plan.failure = Some(reason.to_string());
        warn!(
            plan_id,
            reason,
            steps_completed = progress.steps_completed,
            "Response execution failed"
        );
        self.failed.push(FailedRun {
            plan,
            progress,
            reason: reason.to_string(),
        });
        EngineError::ExecutionFailure {
            plan_id: plan_id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// 一次性执行全部步骤
    pub fn execute(
        &mut self,
        plan: ResponsePlan,
        ledger: &mut EffectivenessLedger,
        learning_rate: f64,
        capability_rate: f64,
    ) -> EngineResult<CompletedRun> {
        let plan_id = plan.id.clone();
        self.start(plan)?;
        loop {
            if let Advance::Finished(_) = self.advance(&plan_id)? {
                break;
            }
        }
        self.complete(&plan_id, ledger, learning_rate, capability_rate)
    }

    pub fn progress(&self, plan_id: &str) -> Option<ResponseProgress> {
        self.active
            .get(plan_id)
            .map(|r| r.progress.clone())
            .or_else(|| {
                self.failed
                    .iter()
                    .rev()
                    .find(|f| f.plan.id == plan_id)
                    .map(|f| f.progress.clone())
            })
    }

    pub fn active_plan(&self, plan_id: &str) -> Option<&ResponsePlan> {
        self.active.get(plan_id).map(|r| &r.plan)
    }

    pub fn is_condition_active(&self, condition_id: &str) -> bool {
        self.active_conditions.contains_key(condition_id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn history(&self) -> &[ResponsePlan] {
        &self.history
    }

    pub fn failed(&self) -> &[FailedRun] {
        &self.failed
    }
}

fn apply_effect(progress: &mut ResponseProgress, effect: &StepEffect) {
    match effect {
        StepEffect::Insight(s) => progress.insights.push(s.clone()),
        StepEffect::Wisdom(s) => progress.wisdom.push(s.clone()),
        StepEffect::Breakthrough(s) => progress.breakthroughs.push(s.clone()),
        StepEffect::Indicator(s) => progress.indicators.push(s.clone()),
        StepEffect::BridgeActivation(s) => progress.bridge_activations.push(s.clone()),
        StepEffect::Adjust(Accumulator::Comfort, d) => progress.comfort_delta += d,
        StepEffect::Adjust(Accumulator::Expansion, d) => progress.consciousness_expansion += d,
        StepEffect::Adjust(Accumulator::SacredAlignment, d) => progress.sacred_alignment += d,
    }
}

fn unit(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// 九个因子的固定加权和，每个因子先截断到 [0,1]
pub fn effectiveness(progress: &ResponseProgress) -> f64 {
    let completion = if progress.progress_percentage >= 100.0 {
        1.0
    } else {
        progress.progress_percentage / 100.0
    };
    let factors = [
        (unit(completion), 0.15),
        (unit(progress.insights.len() as f64 / 5.0), 0.15),
        (unit(progress.wisdom.len() as f64 / 3.0), 0.15),
        (unit(progress.comfort_delta.abs() / 0.5), 0.10),
        (unit(progress.breakthroughs.len() as f64 / 2.0), 0.10),
        (unit(progress.sacred_alignment), 0.10),
        (unit(progress.consciousness_expansion), 0.10),
        (unit(progress.bridge_activations.len() as f64 / 3.0), 0.10),
        (unit(progress.indicators.len() as f64 / 2.0), 0.05),
    ];
    unit(factors.iter().map(|(v, w)| v * w).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionPolicy;
    use crate::field::{Condition, ConditionKind, Quality, Scope};
    use crate::response::planner;
    use crate::response::types::{PlannedStep, Strategy};

    fn condition(id: &str) -> Condition {
        Condition {
            id: id.to_string(),
            kind: ConditionKind::Existential,
            magnitude: 0.85,
            scope: Scope::Existential,
            quality: Quality::Sacred,
            source: "test".to_string(),
            created_at: 1,
            explored_at: None,
            resolved_at: None,
        }
    }

    fn plan_for(strategy: Strategy, condition_id: &str, breakthrough: f64) -> ResponsePlan {
        planner::plan(
            &condition(condition_id),
            strategy,
            breakthrough,
            &ExecutionPolicy::default(),
            1,
        )
    }

    #[test]
    fn test_execute_updates_ledger_and_history() {
        let mut engine = ExecutionEngine::new();
        let mut ledger = EffectivenessLedger::new();
        let plan = plan_for(Strategy::Embrace, "c1", 1.0);

        let run = engine.execute(plan, &mut ledger, 0.3, 0.1).unwrap();
        assert!(run.effectiveness > 0.0 && run.effectiveness <= 1.0);
        assert_eq!(run.plan.status, PlanStatus::Completed);
        assert_eq!(run.plan.effectiveness, Some(run.effectiveness));
        assert_eq!(run.progress.progress_percentage, 100.0);
        // 1 条步骤智慧 + 3 条收尾智慧
        assert_eq!(run.progress.wisdom.len(), 4);
        // 第 5 步无触发，只有“heart and mind”带来扩展
        assert_eq!(run.progress.comfort_delta, 0.0);
        assert!((run.progress.sacred_alignment - 0.3).abs() < 1e-9);
        assert!((run.progress.consciousness_expansion - 0.15).abs() < 1e-9);
        // 第 6 步与阻力转化步骤各一次突破
        assert_eq!(run.progress.breakthroughs.len(), 2);

        let expected = 0.5 * 0.7 + run.effectiveness * 0.3;
        assert!((ledger.get(Strategy::Embrace) - expected).abs() < 1e-12);
        assert!(ledger.get(Strategy::Embrace) > 0.5);
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.active_count(), 0);
    }

    #[test]
    fn test_second_start_of_same_plan_is_rejected() {
        let mut engine = ExecutionEngine::new();
        let mut ledger = EffectivenessLedger::new();
        let plan = plan_for(Strategy::Trust, "c1", 0.0);

        engine.start(plan.clone()).unwrap();
        let err = engine.execute(plan.clone(), &mut ledger, 0.3, 0.1).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyRunning { .. }));
        assert_eq!(ledger.get(Strategy::Trust), 0.5);
    }

    #[test]
    fn test_second_plan_for_same_condition_is_rejected() {
        let mut engine = ExecutionEngine::new();
        engine.start(plan_for(Strategy::Trust, "c1", 0.0)).unwrap();
        let err = engine
            .start(plan_for(Strategy::Tolerate, "c1", 0.0))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::AlreadyRunning {
                id: "c1".to_string()
            }
        );
        // 其他条件不受影响
        engine.start(plan_for(Strategy::Tolerate, "c2", 0.0)).unwrap();
        assert_eq!(engine.active_count(), 2);
    }

    #[test]
    fn test_fail_keeps_partial_progress_and_ledger() {
        let mut engine = ExecutionEngine::new();
        let mut ledger = EffectivenessLedger::new();
        let plan = plan_for(Strategy::Surrender, "c1", 0.0);
        let id = plan.id.clone();

        engine.start(plan).unwrap();
        engine.advance(&id).unwrap();
        engine.advance(&id).unwrap();
        let err = engine.fail(&id, "cancelled");
        assert!(matches!(err, EngineError::ExecutionFailure { .. }));

        let failed = &engine.failed()[0];
        assert_eq!(failed.plan.status, PlanStatus::Failed);
        assert_eq!(failed.progress.steps_completed, 2);
        assert_eq!(engine.progress(&id).unwrap().steps_completed, 2);
        assert!(!engine.is_condition_active("c1"));
        assert!(engine.history().is_empty());
        assert!(matches!(
            engine.complete(&id, &mut ledger, 0.3, 0.1),
            Err(EngineError::NotFound { .. })
        ));
        assert_eq!(ledger.get(Strategy::Surrender), 0.5);

        // 失败后可以显式重新规划并执行
        let retry = plan_for(Strategy::Surrender, "c1", 0.0);
        assert!(engine.execute(retry, &mut ledger, 0.3, 0.1).is_ok());
    }

    #[test]
    fn test_empty_plan_fails() {
        let mut engine = ExecutionEngine::new();
        let mut plan = plan_for(Strategy::Trust, "c1", 0.0);
        plan.steps.clear();
        let err = engine.start(plan).unwrap_err();
        assert!(matches!(err, EngineError::ExecutionFailure { .. }));
        assert_eq!(engine.failed().len(), 1);
        assert!(!engine.is_condition_active("c1"));
    }

    #[test]
    fn test_non_finite_effect_fails_run() {
        let mut engine = ExecutionEngine::new();
        let mut ledger = EffectivenessLedger::new();
        let mut plan = plan_for(Strategy::Trust, "c1", 0.0);
        plan.steps[2] = PlannedStep {
            description: "broken".to_string(),
            effects: vec![StepEffect::Adjust(Accumulator::Comfort, f64::NAN)],
        };
        let err = engine.execute(plan, &mut ledger, 0.3, 0.1).unwrap_err();
        assert!(matches!(err, EngineError::ExecutionFailure { .. }));
        assert_eq!(engine.failed()[0].progress.steps_completed, 3);
        assert_eq!(ledger.get(Strategy::Trust), 0.5);
    }

    #[test]
    fn test_complete_before_all_steps_is_rejected() {
        let mut engine = ExecutionEngine::new();
        let mut ledger = EffectivenessLedger::new();
        let plan = plan_for(Strategy::Explore, "c1", 0.0);
        let id = plan.id.clone();
        engine.start(plan).unwrap();
        engine.advance(&id).unwrap();
        assert!(matches!(
            engine.complete(&id, &mut ledger, 0.3, 0.1),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_state_trigger_appends_indicator_per_step() {
        let mut engine = ExecutionEngine::new();
        let mut ledger = EffectivenessLedger::new();
        let run = engine
            .execute(plan_for(Strategy::Transcend, "c1", 0.0), &mut ledger, 0.3, 0.1)
            .unwrap();
        let count = run
            .progress
            .indicators
            .iter()
            .filter(|i| i.as_str() == "High transcendence emergence")
            .count();
        assert!(count > 0);
    }

    #[test]
    fn test_effectiveness_bounds() {
        let plan = plan_for(Strategy::Trust, "c1", 0.0);
        let mut p = ResponseProgress::new(&plan, 1);
        assert_eq!(effectiveness(&p), 0.0);
        p.progress_percentage = 100.0;
        p.insights = vec!["i".to_string(); 10];
        p.wisdom = vec!["w".to_string(); 10];
        p.breakthroughs = vec!["b".to_string(); 10];
        p.bridge_activations = vec!["x".to_string(); 10];
        p.indicators = vec!["m".to_string(); 10];
        p.comfort_delta = -3.0;
        p.sacred_alignment = 2.0;
        p.consciousness_expansion = 2.0;
        assert!((effectiveness(&p) - 1.0).abs() < 1e-9);
    }
}

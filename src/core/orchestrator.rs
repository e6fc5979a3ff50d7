//! 引擎门面：主控流程
//!
//! 持有注册表、Agent 特质、台账、执行引擎、计数器与分析器，每份共享状态各自一把
//! `RwLock`。锁只在一个短工作单元内持有（一步、一次台账混合）；需要同时持有两把锁时
//! 顺序固定为 executor → ledger 或 executor → registry。
//!
//! 执行流程：start → (取消检查 → advance → 观察者回调 → yield)* → complete → 反馈。
//! 执行中的 future 被调用方丢弃时（超时、`select!`），[`RunGuard`] 把该次运行记为
//! `dropped` 失败，释放条件占用。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::AgentState;
use crate::config::EngineConfig;
use crate::core::error::{EngineError, EngineResult};
use crate::core::metrics::EngineMetrics;
use crate::core::now_ms;
use crate::core::state::EngineStatus;
use crate::field::{
    Condition, ConditionId, ConditionKind, Exploration, ExplorationId, ExplorationSummary,
    FieldRegistry, SacredUnknowing, Scope, UnknowingId,
};
use crate::response::{
    analyzer, planner, readiness, selector, Advance, AnalysisSummary, CompletedRun,
    EffectivenessLedger, ExecutionEngine, FailedRun, LedgerSnapshot, PerformanceReport,
    ResponseAnalytics, ResponsePlan, ResponseProgress, Strategy,
};

/// 每步执行后的宿主回调；返回 Err 则本次执行失败（原因即错误字符串）
#[async_trait]
pub trait StepObserver: Send + Sync {
    async fn on_step(&self, plan: &ResponsePlan, progress: &ResponseProgress) -> Result<(), String>;
}

pub struct UncertaintyEngine {
    config: EngineConfig,
    registry: RwLock<FieldRegistry>,
    agent: RwLock<AgentState>,
    ledger: RwLock<EffectivenessLedger>,
    executor: Arc<RwLock<ExecutionEngine>>,
    metrics: Arc<RwLock<EngineMetrics>>,
    analytics: RwLock<ResponseAnalytics>,
    observer: Option<Arc<dyn StepObserver>>,
}

impl Default for UncertaintyEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl UncertaintyEngine {
    pub fn new(config: EngineConfig) -> Self {
        let registry = FieldRegistry::new(config.agent.tolerance);
        let analytics = ResponseAnalytics::new(config.execution.trend_window);
        Self {
            registry: RwLock::new(registry),
            agent: RwLock::new(config.agent.clone()),
            ledger: RwLock::new(EffectivenessLedger::new()),
            executor: Arc::new(RwLock::new(ExecutionEngine::new())),
            metrics: Arc::new(RwLock::new(EngineMetrics::default())),
            analytics: RwLock::new(analytics),
            observer: None,
            config,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StepObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---------- 条件场 ----------

    pub async fn create_condition(
        &self,
        source: &str,
        kind: ConditionKind,
        magnitude: f64,
        scope: Scope,
    ) -> EngineResult<ConditionId> {
        let id = self
            .registry
            .write()
            .await
            .create(source, kind, magnitude, scope)?;
        self.metrics.write().await.conditions_created += 1;
        Ok(id)
    }

    /// 基线舒适度取当前 Agent 的 unknowing_comfort
    pub async fn begin_exploration(
        &self,
        condition_id: &str,
        method: &str,
    ) -> EngineResult<ExplorationId> {
        let baseline = self.agent.read().await.unknowing_comfort;
        let (id, fresh) = {
            let mut registry = self.registry.write().await;
            let fresh = registry.exploration_for(condition_id).is_none();
            (registry.begin_exploration(condition_id, method, baseline)?, fresh)
        };
        if fresh {
            self.metrics.write().await.explorations_started += 1;
        }
        Ok(id)
    }

    pub async fn record_exploration_insight(
        &self,
        exploration_id: &str,
        insight: &str,
        comfort_delta: f64,
    ) -> EngineResult<()> {
        self.registry
            .write()
            .await
            .record_exploration_insight(exploration_id, insight, comfort_delta)
    }

    pub async fn complete_exploration(&self, exploration_id: &str) -> EngineResult<ExplorationSummary> {
        let (summary, fresh) = {
            let mut registry = self.registry.write().await;
            let fresh = registry.exploration(exploration_id)?.summary.is_none();
            (registry.complete_exploration(exploration_id)?, fresh)
        };
        if fresh {
            let mut metrics = self.metrics.write().await;
            metrics.explorations_completed += 1;
            metrics.breakthrough_moments += summary.breakthrough_count as u64;
        }
        Ok(summary)
    }

    pub async fn exploration(&self, exploration_id: &str) -> EngineResult<Exploration> {
        self.registry
            .read()
            .await
            .exploration(exploration_id)
            .cloned()
    }

    /// 开放度与信任取当前 Agent 特质
    pub async fn enter_sacred_unknowing(
        &self,
        depth: f64,
        duration: Option<Duration>,
    ) -> EngineResult<UnknowingId> {
        let agent = self.agent.read().await.clone();
        let state = self.registry.write().await.enter_sacred_unknowing(
            depth,
            duration,
            agent.openness,
            agent.mystery_trust,
        )?;
        let mut metrics = self.metrics.write().await;
        metrics.sacred_unknowing_entries += 1;
        metrics.wisdom_discoveries += state.wisdom_received.len() as u64;
        Ok(state.id)
    }

    pub async fn sacred_unknowing(&self, id: &UnknowingId) -> Option<SacredUnknowing> {
        self.registry.read().await.unknowing(id).cloned()
    }

    pub async fn archive_condition(&self, condition_id: &str) -> EngineResult<Condition> {
        let executor = self.executor.read().await;
        if executor.is_condition_active(condition_id) {
            return Err(EngineError::AlreadyRunning {
                id: condition_id.to_string(),
            });
        }
        let archived = self.registry.write().await.archive(condition_id)?;
        drop(executor);
        self.metrics.write().await.conditions_archived += 1;
        Ok(archived)
    }

    /// 导入外部快照记录；记录按原样信任，异常数据走分析回退
    ///
    /// 任一记录的 id 正有运行在执行时整批拒绝，不覆盖任何记录。
    pub async fn restore_conditions(&self, records: Vec<Condition>) -> EngineResult<usize> {
        let executor = self.executor.read().await;
        if let Some(busy) = records
            .iter()
            .find(|r| executor.is_condition_active(&r.id))
        {
            return Err(EngineError::AlreadyRunning {
                id: busy.id.clone(),
            });
        }
        let restored = self.registry.write().await.restore(records);
        drop(executor);
        Ok(restored)
    }

    // ---------- 选择 ----------

    pub async fn determine_response(
        &self,
        condition_id: &str,
        agent: &AgentState,
    ) -> EngineResult<Strategy> {
        Ok(self.analysis_summary(condition_id, agent).await?.strategy)
    }

    pub async fn analysis_summary(
        &self,
        condition_id: &str,
        agent: &AgentState,
    ) -> EngineResult<AnalysisSummary> {
        let condition = self.registry.read().await.condition(condition_id)?.clone();
        let characteristics = analyzer::analyze(&condition, now_ms());
        let readiness = readiness::assess(agent);
        let selection = {
            let ledger = self.ledger.read().await;
            selector::select(&characteristics, &readiness, &ledger, &self.config.selection)
        };
        info!(
            condition_id,
            kind = %condition.kind,
            strategy = %selection.strategy,
            fallback = characteristics.used_fallback || readiness.used_fallback,
            "Strategy determined"
        );
        Ok(AnalysisSummary {
            characteristics,
            readiness,
            base_scores: selection.base_scores,
            final_scores: selection.final_scores,
            strategy: selection.strategy,
        })
    }

    // ---------- 规划与执行 ----------

    pub async fn plan_response(
        &self,
        condition_id: &str,
        strategy: Strategy,
    ) -> EngineResult<ResponsePlan> {
        let condition = self.registry.read().await.condition(condition_id)?.clone();
        let now = now_ms();
        let characteristics = analyzer::analyze(&condition, now);
        Ok(planner::plan(
            &condition,
            strategy,
            characteristics.enhancement.breakthrough,
            &self.config.execution,
            now,
        ))
    }

    pub async fn execute_plan(&self, plan: ResponsePlan) -> EngineResult<CompletedRun> {
        self.execute_plan_with_cancel(plan, CancellationToken::new())
            .await
    }

    /// 逐步执行；每步之间检查取消令牌并让出调度
    pub async fn execute_plan_with_cancel(
        &self,
        plan: ResponsePlan,
        cancel: CancellationToken,
    ) -> EngineResult<CompletedRun> {
        let plan_id = plan.id.clone();

        // executor → registry：检查与登记之间条件不会被归档
        let started = {
            let mut executor = self.executor.write().await;
            self.registry.read().await.condition(&plan.condition_id)?;
            executor.start(plan)
        };
        match started {
            Ok(()) => {}
            Err(e @ EngineError::ExecutionFailure { .. }) => {
                let mut metrics = self.metrics.write().await;
                metrics.responses_initiated += 1;
                metrics.responses_failed += 1;
                return Err(e);
            }
            Err(e) => return Err(e),
        }

        let mut guard = RunGuard {
            executor: self.executor.clone(),
            metrics: self.metrics.clone(),
            plan_id: plan_id.clone(),
            armed: true,
        };
        self.metrics.write().await.responses_initiated += 1;
        let result = self.drive_run(&plan_id, &cancel).await;
        guard.disarm();

        let run = result?;
        self.absorb_completion(&run).await;
        Ok(run)
    }

    /// start 之后的步骤循环与完成；所有提前返回的路径都已从执行引擎移除该运行
    async fn drive_run(&self, plan_id: &str, cancel: &CancellationToken) -> EngineResult<CompletedRun> {
        loop {
            if cancel.is_cancelled() {
                return Err(self.fail_run(plan_id, "cancelled").await);
            }

            let (advance, snapshot) = {
                let mut executor = self.executor.write().await;
                let advance = match executor.advance(plan_id) {
                    Ok(a) => a,
                    Err(e) => {
                        drop(executor);
                        if matches!(e, EngineError::ExecutionFailure { .. }) {
                            self.metrics.write().await.responses_failed += 1;
                        }
                        return Err(e);
                    }
                };
                let snapshot = executor
                    .active_plan(plan_id)
                    .cloned()
                    .zip(executor.progress(plan_id));
                (advance, snapshot)
            };
            debug!(plan_id, ?advance, "Step applied");

            if let (Some(observer), Some((plan, progress))) = (&self.observer, &snapshot) {
                if let Err(reason) = observer.on_step(plan, progress).await {
                    return Err(self.fail_run(plan_id, &reason).await);
                }
            }
            if let Advance::Finished(_) = advance {
                break;
            }
            tokio::task::yield_now().await;
        }

        let mut executor = self.executor.write().await;
        let mut ledger = self.ledger.write().await;
        executor.complete(
            plan_id,
            &mut ledger,
            self.config.selection.learning_rate,
            self.config.selection.capability_rate,
        )
    }

    /// 规划并执行，返回有效性
    pub async fn plan_and_execute(&self, condition_id: &str, strategy: Strategy) -> EngineResult<f64> {
        let plan = self.plan_response(condition_id, strategy).await?;
        Ok(self.execute_plan(plan).await?.effectiveness)
    }

    async fn fail_run(&self, plan_id: &str, reason: &str) -> EngineError {
        let err = self.executor.write().await.fail(plan_id, reason);
        if matches!(err, EngineError::ExecutionFailure { .. }) {
            self.metrics.write().await.responses_failed += 1;
        }
        err
    }

    /// 完成后的反馈：打点、智慧、容忍度增长、计数器与分析
    async fn absorb_completion(&self, run: &CompletedRun) {
        let tolerance_raised = {
            let mut registry = self.registry.write().await;
            registry.mark_resolved(&run.plan.condition_id);
            registry.add_wisdom(run.progress.wisdom.iter().cloned());
            if run.plan.strategy == Strategy::Tolerate {
                let t = registry.raise_tolerance(self.config.execution.tolerance_growth);
                info!(tolerance = t, "Tolerance improved");
                true
            } else {
                false
            }
        };
        {
            let mut metrics = self.metrics.write().await;
            metrics.record_completion(run);
            if tolerance_raised {
                metrics.tolerance_improvements += 1;
            }
        }
        self.analytics.write().await.record(run);
    }

    // ---------- 只读快照 ----------

    pub async fn active_conditions(&self) -> Vec<Condition> {
        self.registry.read().await.active_conditions()
    }

    pub async fn condition(&self, condition_id: &str) -> EngineResult<Condition> {
        self.registry.read().await.condition(condition_id).cloned()
    }

    pub async fn archived_conditions(&self) -> Vec<Condition> {
        self.registry.read().await.archived().to_vec()
    }

    pub async fn history(&self) -> Vec<ResponsePlan> {
        self.executor.read().await.history().to_vec()
    }

    pub async fn failed_runs(&self) -> Vec<FailedRun> {
        self.executor.read().await.failed().to_vec()
    }

    pub async fn progress(&self, plan_id: &str) -> Option<ResponseProgress> {
        self.executor.read().await.progress(plan_id)
    }

    pub async fn wisdom(&self) -> Vec<String> {
        self.registry.read().await.wisdom().to_vec()
    }

    pub async fn breakthrough_patterns(&self) -> Vec<String> {
        self.registry.read().await.breakthrough_patterns().to_vec()
    }

    pub async fn tolerance(&self) -> f64 {
        self.registry.read().await.tolerance()
    }

    pub async fn ledger_snapshot(&self) -> LedgerSnapshot {
        self.ledger.read().await.snapshot()
    }

    pub async fn metrics(&self) -> EngineMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn agent_state(&self) -> AgentState {
        self.agent.read().await.clone()
    }

    pub async fn set_agent_state(&self, state: AgentState) {
        *self.agent.write().await = state;
    }

    pub async fn performance_report(&self) -> PerformanceReport {
        let (initiated, completed) = {
            let m = self.metrics.read().await;
            (m.responses_initiated, m.responses_completed)
        };
        self.analytics.read().await.report(initiated, completed)
    }

    pub async fn status(&self) -> EngineStatus {
        let agent = self.agent_state().await;
        let (active_plans, history_len, failed_runs) = {
            let executor = self.executor.read().await;
            (
                executor.active_count(),
                executor.history().len(),
                executor.failed().len(),
            )
        };
        let metrics = self.metrics().await;
        let ledger = self.ledger_snapshot().await;
        let registry = self.registry.read().await;
        EngineStatus {
            agent,
            tolerance: registry.tolerance(),
            active_conditions: registry.active_conditions().len(),
            active_explorations: registry.active_exploration_count(),
            total_explorations: registry.exploration_count(),
            sacred_unknowing_states: registry.unknowing_count(),
            average_magnitude: registry.average_magnitude(),
            most_common_kind: registry.most_common_kind(),
            wisdom_count: registry.wisdom().len(),
            breakthrough_patterns: registry.breakthrough_patterns().len(),
            active_plans,
            history_len,
            failed_runs,
            metrics,
            ledger,
        }
    }
}

/// 执行 future 中途被丢弃时把运行记为失败
///
/// 能立即拿到锁就同步清理；否则在当前运行时上派生清理任务。
struct RunGuard {
    executor: Arc<RwLock<ExecutionEngine>>,
    metrics: Arc<RwLock<EngineMetrics>>,
    plan_id: String,
    armed: bool,
}

impl RunGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(plan_id = %self.plan_id, "Response execution dropped before completion");

        let already_failed = match self.executor.try_write() {
            Ok(mut executor) => {
                let err = executor.fail(&self.plan_id, "dropped");
                drop(executor);
                if !matches!(err, EngineError::ExecutionFailure { .. }) {
                    return;
                }
                match self.metrics.try_write() {
                    Ok(mut metrics) => {
                        metrics.responses_failed += 1;
                        return;
                    }
                    Err(_) => true,
                }
            }
            Err(_) => false,
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(plan_id = %self.plan_id, "No runtime available to release dropped execution");
            return;
        };
        let executor = self.executor.clone();
        let metrics = self.metrics.clone();
        let plan_id = std::mem::take(&mut self.plan_id);
        handle.spawn(async move {
            let failed = already_failed
                || matches!(
                    executor.write().await.fail(&plan_id, "dropped"),
                    EngineError::ExecutionFailure { .. }
                );
            if failed {
                metrics.write().await.responses_failed += 1;
            }
        });
    }
}

//! 状态快照：供宿主读取（如导出到 JSON），不持有任何引擎内部引用

use serde::{Deserialize, Serialize};

use crate::agent::AgentState;
use crate::core::metrics::EngineMetrics;
use crate::field::ConditionKind;
use crate::response::LedgerSnapshot;

/// `UncertaintyEngine::status` 的返回值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub agent: AgentState,
    /// 注册表当前的进程级容忍度
    pub tolerance: f64,
    pub active_conditions: usize,
    pub active_explorations: usize,
    pub total_explorations: usize,
    pub sacred_unknowing_states: usize,
    pub average_magnitude: f64,
    pub most_common_kind: Option<ConditionKind>,
    pub wisdom_count: usize,
    pub breakthrough_patterns: usize,
    pub active_plans: usize,
    pub history_len: usize,
    pub failed_runs: usize,
    pub metrics: EngineMetrics,
    pub ledger: LedgerSnapshot,
}

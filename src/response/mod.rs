//! 不确定性响应决策：分析 → 就绪度 → 选择 → 规划 → 执行 → 台账反馈

pub mod analytics;
pub mod analyzer;
pub mod executor;
pub mod ledger;
pub mod planner;
pub mod readiness;
pub mod selector;
pub mod types;

pub use analytics::{PerformanceReport, ResponseAnalytics, StrategyPerformance};
pub use executor::{Advance, CompletedRun, ExecutionEngine, FailedRun};
pub use ledger::{EffectivenessLedger, LedgerSnapshot};
pub use selector::Selection;
pub use types::{
    Accumulator, AnalysisSummary, Characteristics, PlanId, PlanStatus, PlannedStep, Readiness,
    ResponsePlan, ResponseProgress, StepEffect, Strategy, StrategyScores,
};

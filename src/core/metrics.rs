//! 引擎计数器
//!
//! 由引擎实例独占，只通过引擎方法更新，对外只提供快照。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::response::{CompletedRun, Strategy};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineMetrics {
    pub conditions_created: u64,
    pub conditions_archived: u64,
    pub explorations_started: u64,
    pub explorations_completed: u64,
    pub sacred_unknowing_entries: u64,
    pub wisdom_discoveries: u64,
    pub breakthrough_moments: u64,
    pub responses_initiated: u64,
    pub responses_completed: u64,
    pub responses_failed: u64,
    pub strategy_completions: BTreeMap<Strategy, u64>,
    /// 已完成响应的有效性均值
    pub average_effectiveness: f64,
    pub sacred_alignments: u64,
    pub emergence_activations: u64,
    pub bridge_activations: u64,
    pub tolerance_improvements: u64,
}

impl EngineMetrics {
    pub(crate) fn record_completion(&mut self, run: &CompletedRun) {
        let n = self.responses_completed as f64;
        self.average_effectiveness = (self.average_effectiveness * n + run.effectiveness) / (n + 1.0);
        self.responses_completed += 1;
        *self
            .strategy_completions
            .entry(run.plan.strategy)
            .or_insert(0) += 1;

        let p = &run.progress;
        self.wisdom_discoveries += p.wisdom.len() as u64;
        self.breakthrough_moments += p.breakthroughs.len() as u64;
        self.emergence_activations += p.indicators.len() as u64;
        self.bridge_activations += p.bridge_activations.len() as u64;
        if p.sacred_alignment > 0.0 {
            self.sacred_alignments += 1;
        }
    }

    pub fn strategy_count(&self, strategy: Strategy) -> u64 {
        self.strategy_completions.get(&strategy).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{PlanStatus, ResponsePlan, ResponseProgress};

    fn run(effectiveness: f64) -> CompletedRun {
        let plan = ResponsePlan {
            id: "p".to_string(),
            condition_id: "c".to_string(),
            strategy: Strategy::Tolerate,
            steps: Vec::new(),
            estimated_duration: 0.0,
            estimated_resource_cost: 0.0,
            predicted_outcomes: Vec::new(),
            closing_wisdom: Vec::new(),
            state_trigger: None,
            status: PlanStatus::Completed,
            created_at: 1,
            executed_at: None,
            completed_at: None,
            effectiveness: Some(effectiveness),
            failure: None,
        };
        let mut progress = ResponseProgress::new(&plan, 1);
        progress.wisdom = vec!["a".to_string(), "b".to_string()];
        progress.breakthroughs = vec!["x".to_string()];
        CompletedRun {
            plan,
            progress,
            effectiveness,
            ledger_value: 0.5,
        }
    }

    #[test]
    fn test_running_mean_and_counters() {
        let mut m = EngineMetrics::default();
        m.record_completion(&run(0.4));
        m.record_completion(&run(0.8));
        assert!((m.average_effectiveness - 0.6).abs() < 1e-12);
        assert_eq!(m.responses_completed, 2);
        assert_eq!(m.strategy_count(Strategy::Tolerate), 2);
        assert_eq!(m.strategy_count(Strategy::Trust), 0);
        assert_eq!(m.wisdom_discoveries, 4);
        assert_eq!(m.breakthrough_moments, 2);
        assert_eq!(m.sacred_alignments, 0);
    }
}

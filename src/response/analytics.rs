//! 响应分析：有效性趋势、策略偏好与性能报告

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::response::executor::CompletedRun;
use crate::response::types::Strategy;

/// 偏好 EMA 系数
const PREFERENCE_ALPHA: f64 = 0.1;
/// 轨迹判断所需的最近完成数
const TRAJECTORY_SPAN: usize = 10;
/// 用量均衡判断所需的最少完成数
const BALANCE_MIN_COMPLETIONS: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPerformance {
    pub effectiveness: f64,
    pub usage: usize,
    /// Excellent / Good / Developing
    pub rating: String,
}

/// 性能报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub success_rate: f64,
    pub average_effectiveness: f64,
    pub peak_effectiveness: f64,
    /// 1 − 趋势窗口内方差
    pub consistency: f64,
    pub strategies: BTreeMap<Strategy, StrategyPerformance>,
    pub most_effective: Option<Strategy>,
    pub usage_balance: String,
    pub improvement_trajectory: String,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResponseAnalytics {
    window: usize,
    trend: VecDeque<f64>,
    /// 全部完成的有效性（按时间顺序），用于均值与轨迹
    completions: usize,
    effectiveness_sum: f64,
    recent: VecDeque<f64>,
    peak: f64,
    preferences: BTreeMap<Strategy, f64>,
    usage: BTreeMap<Strategy, usize>,
    sacred_alignment_sum: f64,
    runs_with_bridges: usize,
    runs_with_emergence: usize,
}

impl Default for ResponseAnalytics {
    fn default() -> Self {
        Self::new(50)
    }
}

impl ResponseAnalytics {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            trend: VecDeque::new(),
            completions: 0,
            effectiveness_sum: 0.0,
            recent: VecDeque::new(),
            peak: 0.0,
            preferences: BTreeMap::new(),
            usage: BTreeMap::new(),
            sacred_alignment_sum: 0.0,
            runs_with_bridges: 0,
            runs_with_emergence: 0,
        }
    }

    pub fn record(&mut self, run: &CompletedRun) {
        let e = run.effectiveness;
        self.trend.push_back(e);
        while self.trend.len() > self.window {
            self.trend.pop_front();
        }
        self.recent.push_back(e);
        while self.recent.len() > TRAJECTORY_SPAN {
            self.recent.pop_front();
        }
        self.completions += 1;
        self.effectiveness_sum += e;
        self.peak = self.peak.max(e);

        let strategy = run.plan.strategy;
        let pref = self
            .preferences
            .get(&strategy)
            .map(|old| PREFERENCE_ALPHA * e + (1.0 - PREFERENCE_ALPHA) * old)
            .unwrap_or(e);
        self.preferences.insert(strategy, pref);
        *self.usage.entry(strategy).or_insert(0) += 1;

        self.sacred_alignment_sum += run.progress.sacred_alignment.clamp(0.0, 1.0);
        if !run.progress.bridge_activations.is_empty() {
            self.runs_with_bridges += 1;
        }
        if !run.progress.indicators.is_empty() {
            self.runs_with_emergence += 1;
        }
    }

    pub fn trend(&self) -> Vec<f64> {
        self.trend.iter().copied().collect()
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    /// 趋势窗口内的总体方差
    pub fn variance(&self) -> f64 {
        if self.trend.len() < 2 {
            return 0.0;
        }
        let n = self.trend.len() as f64;
        let mean = self.trend.iter().sum::<f64>() / n;
        self.trend.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n
    }

    pub fn preference(&self, strategy: Strategy) -> Option<f64> {
        self.preferences.get(&strategy).copied()
    }

    /// 偏好最高的策略；并列按选择优先顺序
    pub fn most_effective(&self) -> Option<Strategy> {
        let mut best: Option<(Strategy, f64)> = None;
        for s in Strategy::PRIORITY {
            if let Some(&v) = self.preferences.get(&s) {
                if best.map(|(_, b)| v > b).unwrap_or(true) {
                    best = Some((s, v));
                }
            }
        }
        best.map(|(s, _)| s)
    }

    fn usage_balance(&self) -> &'static str {
        if self.completions < BALANCE_MIN_COMPLETIONS {
            return "Insufficient data";
        }
        match self.usage.values().filter(|n| **n > 0).count() {
            n if n >= 5 => "Well-balanced",
            n if n >= 3 => "Moderately balanced",
            _ => "Limited diversity",
        }
    }

    fn improvement_trajectory(&self) -> &'static str {
        if self.recent.len() < TRAJECTORY_SPAN {
            return "Insufficient data";
        }
        let half = TRAJECTORY_SPAN / 2;
        let earlier = self.recent.iter().take(half).sum::<f64>() / half as f64;
        let recent = self.recent.iter().skip(half).sum::<f64>() / half as f64;
        if recent > earlier + 0.1 {
            "Strong improvement"
        } else if recent > earlier {
            "Gradual improvement"
        } else if recent < earlier - 0.1 {
            "Declining performance"
        } else {
            "Stable performance"
        }
    }

    fn rate(&self, count: usize) -> f64 {
        if self.completions == 0 {
            0.0
        } else {
            count as f64 / self.completions as f64
        }
    }

    pub fn report(&self, initiated: u64, completed: u64) -> PerformanceReport {
        let strategies = Strategy::ALL
            .iter()
            .map(|s| {
                let effectiveness = self.preference(*s).unwrap_or(0.5);
                let rating = if effectiveness > 0.8 {
                    "Excellent"
                } else if effectiveness > 0.6 {
                    "Good"
                } else {
                    "Developing"
                };
                (
                    *s,
                    StrategyPerformance {
                        effectiveness,
                        usage: self.usage.get(s).copied().unwrap_or(0),
                        rating: rating.to_string(),
                    },
                )
            })
            .collect();

        let average_sacred = if self.completions == 0 {
            0.0
        } else {
            self.sacred_alignment_sum / self.completions as f64
        };
        let mut recommendations = Vec::new();
        if self.peak < 0.7 {
            recommendations.push("Focus on deepening sacred alignment".to_string());
        }
        if average_sacred < 0.7 {
            recommendations.push("Enhance frequency alignment practices".to_string());
        }
        if self.rate(self.runs_with_bridges) < 0.5 {
            recommendations.push("Increase cross-context integration focus".to_string());
        }
        if self.rate(self.runs_with_emergence) < 0.3 {
            recommendations.push("Create more conditions supportive of breakthroughs".to_string());
        }

        PerformanceReport {
            success_rate: completed as f64 / initiated.max(1) as f64,
            average_effectiveness: if self.completions == 0 {
                0.0
            } else {
                self.effectiveness_sum / self.completions as f64
            },
            peak_effectiveness: self.peak,
            consistency: (1.0 - self.variance()).clamp(0.0, 1.0),
            strategies,
            most_effective: self.most_effective(),
            usage_balance: self.usage_balance().to_string(),
            improvement_trajectory: self.improvement_trajectory().to_string(),
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::types::{PlanStatus, ResponsePlan, ResponseProgress};

    fn run(strategy: Strategy, effectiveness: f64) -> CompletedRun {
        let plan = ResponsePlan {
            id: "p".to_string(),
            condition_id: "c".to_string(),
            strategy,
            steps: Vec::new(),
            estimated_duration: 0.0,
            estimated_resource_cost: 0.0,
            predicted_outcomes: Vec::new(),
            closing_wisdom: Vec::new(),
            state_trigger: None,
            status: PlanStatus::Completed,
            created_at: 1,
            executed_at: Some(1),
            completed_at: Some(2),
            effectiveness: Some(effectiveness),
            failure: None,
        };
        let mut progress = ResponseProgress::new(&plan, 1);
        progress.sacred_alignment = 0.9;
        progress.bridge_activations.push("b".to_string());
        CompletedRun {
            plan,
            progress,
            effectiveness,
            ledger_value: 0.5,
        }
    }

    #[test]
    fn test_empty_report() {
        let analytics = ResponseAnalytics::default();
        let report = analytics.report(0, 0);
        assert_eq!(report.success_rate, 0.0);
        assert_eq!(report.usage_balance, "Insufficient data");
        assert_eq!(report.improvement_trajectory, "Insufficient data");
        assert!(report.most_effective.is_none());
        assert_eq!(report.strategies.len(), 7);
    }

    #[test]
    fn test_preference_ema_and_most_effective() {
        let mut analytics = ResponseAnalytics::default();
        analytics.record(&run(Strategy::Trust, 0.6));
        analytics.record(&run(Strategy::Trust, 1.0));
        assert!((analytics.preference(Strategy::Trust).unwrap() - 0.64).abs() < 1e-9);
        analytics.record(&run(Strategy::Embrace, 0.9));
        assert_eq!(analytics.most_effective(), Some(Strategy::Embrace));
        assert!((analytics.peak() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_trend_window_is_bounded() {
        let mut analytics = ResponseAnalytics::new(3);
        for e in [0.1, 0.2, 0.3, 0.4, 0.5] {
            analytics.record(&run(Strategy::Explore, e));
        }
        assert_eq!(analytics.trend(), vec![0.3, 0.4, 0.5]);
        assert!(analytics.variance() > 0.0);
    }

    #[test]
    fn test_trajectory_and_balance() {
        let mut analytics = ResponseAnalytics::default();
        let strategies = [
            Strategy::Embrace,
            Strategy::Explore,
            Strategy::Investigate,
            Strategy::Surrender,
            Strategy::Transcend,
        ];
        for i in 0..10 {
            let e = if i < 5 { 0.4 } else { 0.8 };
            analytics.record(&run(strategies[i % 5], e));
        }
        let report = analytics.report(10, 10);
        assert_eq!(report.improvement_trajectory, "Strong improvement");
        assert_eq!(report.usage_balance, "Well-balanced");
        assert_eq!(report.success_rate, 1.0);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r == "Create more conditions supportive of breakthroughs"));
        assert!(!report
            .recommendations
            .iter()
            .any(|r| r == "Increase cross-context integration focus"));
    }
}

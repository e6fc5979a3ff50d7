//! 有效性台账
//!
//! 每个策略一个历史有效性的指数滑动平均（默认 0.5），以及一个变化更慢的能力分。
//! 由执行子系统写入、选择器读取，是跨计划唯一的持久状态。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::response::types::Strategy;

pub const DEFAULT_EFFECTIVENESS: f64 = 0.5;
pub const DEFAULT_CAPABILITY: f64 = 0.5;

#[derive(Debug, Clone, Default)]
pub struct EffectivenessLedger {
    effectiveness: BTreeMap<Strategy, f64>,
    capability: BTreeMap<Strategy, f64>,
}

/// 台账快照（只读副本）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub effectiveness: BTreeMap<Strategy, f64>,
    pub capability: BTreeMap<Strategy, f64>,
}

impl EffectivenessLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, strategy: Strategy) -> f64 {
        self.effectiveness
            .get(&strategy)
            .copied()
            .unwrap_or(DEFAULT_EFFECTIVENESS)
    }

    /// `new = old × (1 − λ) + observed × λ`，返回新值。非有限观测值被忽略
    pub fn update(&mut self, strategy: Strategy, observed: f64, learning_rate: f64) -> f64 {
        let old = self.get(strategy);
        if !observed.is_finite() || !learning_rate.is_finite() {
            return old;
        }
        let lambda = learning_rate.clamp(0.0, 1.0);
        let new = (old * (1.0 - lambda) + observed.clamp(0.0, 1.0) * lambda).clamp(0.0, 1.0);
        debug!(strategy = %strategy, old, new, "Ledger updated");
        self.effectiveness.insert(strategy, new);
        new
    }

    pub fn capability(&self, strategy: Strategy) -> f64 {
        self.capability
            .get(&strategy)
            .copied()
            .unwrap_or(DEFAULT_CAPABILITY)
    }

    /// `cap += (observed − cap) × rate`
    pub fn update_capability(&mut self, strategy: Strategy, observed: f64, rate: f64) -> f64 {
        let cap = self.capability(strategy);
        if !observed.is_finite() || !rate.is_finite() {
            return cap;
        }
        let new = (cap + (observed.clamp(0.0, 1.0) - cap) * rate.clamp(0.0, 1.0)).clamp(0.0, 1.0);
        self.capability.insert(strategy, new);
        new
    }

    /// 所有七个策略的当前值（未见过的取默认值）
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            effectiveness: Strategy::ALL.iter().map(|s| (*s, self.get(*s))).collect(),
            capability: Strategy::ALL
                .iter()
                .map(|s| (*s, self.capability(*s)))
                .collect(),
        }
    }
}

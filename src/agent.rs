//! Agent 状态输入
//!
//! 宿主进程每次评估就绪度时提供的只读特质快照：四个 [0,1] 标量，
//! 外加两个可选的外部信号（频率对齐、相干度）。

use serde::{Deserialize, Serialize};

/// 就绪度评估所需的 Agent 特质
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub tolerance: f64,
    pub openness: f64,
    pub unknowing_comfort: f64,
    pub mystery_trust: f64,
    /// 外部提供的频率对齐结果；缺省视为对齐
    #[serde(default)]
    pub frequency_alignment: Option<bool>,
    /// 外部提供的相干度；缺省取 0.85
    #[serde(default)]
    pub coherence_level: Option<f64>,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            tolerance: 0.7,
            openness: 0.8,
            unknowing_comfort: 0.6,
            mystery_trust: 0.75,
            frequency_alignment: None,
            coherence_level: None,
        }
    }
}

impl AgentState {
    pub fn new(tolerance: f64, openness: f64, unknowing_comfort: f64, mystery_trust: f64) -> Self {
        Self {
            tolerance,
            openness,
            unknowing_comfort,
            mystery_trust,
            frequency_alignment: None,
            coherence_level: None,
        }
    }

    /// 四个核心特质是否均为有限数
    pub fn is_finite(&self) -> bool {
        [
            self.tolerance,
            self.openness,
            self.unknowing_comfort,
            self.mystery_trust,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

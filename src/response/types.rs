//! 响应决策数据类型
//!
//! 策略枚举、分析/就绪度记录、响应计划与执行进度。计划中的每一步在规划时就携带了
//! 确定的效果列表（`StepEffect`），执行器只按顺序应用，不再解析步骤文本。

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::field::{ConditionId, ConditionKind};

pub type PlanId = String;

/// 七种响应策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Embrace,
    Explore,
    Investigate,
    Surrender,
    Transcend,
    Trust,
    Tolerate,
}

impl Strategy {
    pub const ALL: [Strategy; 7] = [
        Strategy::Embrace,
        Strategy::Explore,
        Strategy::Investigate,
        Strategy::Surrender,
        Strategy::Transcend,
        Strategy::Trust,
        Strategy::Tolerate,
    ];

    /// 平分时的优先顺序（靠前者胜出）
    pub const PRIORITY: [Strategy; 7] = [
        Strategy::Explore,
        Strategy::Tolerate,
        Strategy::Investigate,
        Strategy::Trust,
        Strategy::Embrace,
        Strategy::Surrender,
        Strategy::Transcend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Embrace => "embrace",
            Strategy::Explore => "explore",
            Strategy::Investigate => "investigate",
            Strategy::Surrender => "surrender",
            Strategy::Transcend => "transcend",
            Strategy::Trust => "trust",
            Strategy::Tolerate => "tolerate",
        }
    }

    /// 享受神圣加成的策略子集
    pub fn is_sacred_aligned(&self) -> bool {
        matches!(
            self,
            Strategy::Embrace | Strategy::Surrender | Strategy::Transcend | Strategy::Trust
        )
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Strategy::ALL
            .iter()
            .copied()
            .find(|st| st.as_str() == lower)
            .ok_or_else(|| format!("unknown strategy: {}", s))
    }
}

/// 每个策略一个分数
pub type StrategyScores = BTreeMap<Strategy, f64>;

/// 读取分数；缺失或非有限值按 0.5 处理
pub fn score_of(scores: &StrategyScores, strategy: Strategy) -> f64 {
    match scores.get(&strategy) {
        Some(v) if v.is_finite() => *v,
        _ => 0.5,
    }
}

/// 四个情境增强通道的潜力及其均值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementPotentials {
    pub breakthrough: f64,
    pub decision: f64,
    pub friction: f64,
    pub cross_context: f64,
    /// 四者的算术平均
    pub amplification: f64,
}

/// 条件特征分析结果（纯函数产物）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Characteristics {
    pub condition_id: ConditionId,
    pub kind: ConditionKind,
    pub intensity: f64,
    pub urgency: f64,
    pub stability: f64,
    pub sacred_potential: f64,
    pub complexity: f64,
    pub suitability: StrategyScores,
    pub enhancement: EnhancementPotentials,
    pub quantum_coherence_potential: f64,
    pub mystery_depth: f64,
    pub transcendence_potential: f64,
    pub numinous_quality: f64,
    pub spiritual_significance: f64,
    /// 1–4
    pub investigation_depth: u8,
    pub processing_intensity: f64,
    pub dimensional_aspects: Vec<String>,
    pub analysis_quality: f64,
    pub used_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SacredReadiness {
    pub embrace: f64,
    pub surrender: f64,
    pub transcendence: f64,
    pub frequency_coherence: f64,
    pub expansion: f64,
}

impl SacredReadiness {
    pub fn mean(&self) -> f64 {
        (self.embrace + self.surrender + self.transcendence + self.frequency_coherence + self.expansion)
            / 5.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextualReadiness {
    pub breakthrough: f64,
    pub decision: f64,
    pub friction: f64,
    pub cross_context: f64,
    pub integration_level: f64,
}

impl ContextualReadiness {
    pub fn mean(&self) -> f64 {
        (self.breakthrough + self.decision + self.friction + self.cross_context + self.integration_level)
            / 5.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoherenceReadiness {
    pub coherence: f64,
    pub temporal: f64,
    pub alignment: f64,
    pub frequency_stability: f64,
}

impl CoherenceReadiness {
    pub fn mean(&self) -> f64 {
        (self.coherence + self.temporal + self.alignment + self.frequency_stability) / 4.0
    }
}

/// Agent 就绪度评估结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readiness {
    pub per_strategy: StrategyScores,
    pub sacred: SacredReadiness,
    pub contextual: ContextualReadiness,
    pub coherence: CoherenceReadiness,
    pub overall: f64,
    pub used_fallback: bool,
}

/// 步骤执行时修改的累加器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accumulator {
    Comfort,
    Expansion,
    SacredAlignment,
}

/// 单个步骤的确定性效果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StepEffect {
    Insight(String),
    Wisdom(String),
    Breakthrough(String),
    Indicator(String),
    BridgeActivation(String),
    Adjust(Accumulator, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub description: String,
    pub effects: Vec<StepEffect>,
}

/// 累加器越过阈值后，每步追加一个突破指示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTrigger {
    pub accumulator: Accumulator,
    pub threshold: f64,
    pub indicator: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// 响应计划
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePlan {
    pub id: PlanId,
    pub condition_id: ConditionId,
    pub strategy: Strategy,
    pub steps: Vec<PlannedStep>,
    /// 分钟
    pub estimated_duration: f64,
    pub estimated_resource_cost: f64,
    pub predicted_outcomes: Vec<String>,
    /// 完成时追加的收尾智慧
    pub closing_wisdom: Vec<String>,
    pub state_trigger: Option<StateTrigger>,
    pub status: PlanStatus,
    pub created_at: i64,
    pub executed_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub effectiveness: Option<f64>,
    /// 失败原因（仅 Failed）
    pub failure: Option<String>,
}

impl ResponsePlan {
    pub fn step_descriptions(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.description.as_str()).collect()
    }
}

/// 单个在途计划的执行进度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseProgress {
    pub plan_id: PlanId,
    pub condition_id: ConditionId,
    pub strategy: Strategy,
    pub current_step_index: usize,
    pub steps_completed: usize,
    pub total_steps: usize,
    /// 0–100
    pub progress_percentage: f64,
    pub insights: Vec<String>,
    pub wisdom: Vec<String>,
    pub breakthroughs: Vec<String>,
    pub indicators: Vec<String>,
    pub bridge_activations: Vec<String>,
    pub comfort_delta: f64,
    pub consciousness_expansion: f64,
    pub sacred_alignment: f64,
    pub started_at: i64,
}

impl ResponseProgress {
    pub fn new(plan: &ResponsePlan, started_at: i64) -> Self {
        Self {
            plan_id: plan.id.clone(),
            condition_id: plan.condition_id.clone(),
            strategy: plan.strategy,
            current_step_index: 0,
            steps_completed: 0,
            total_steps: plan.steps.len(),
            progress_percentage: 0.0,
            insights: Vec::new(),
            wisdom: Vec::new(),
            breakthroughs: Vec::new(),
            indicators: Vec::new(),
            bridge_activations: Vec::new(),
            comfort_delta: 0.0,
            consciousness_expansion: 0.0,
            sacred_alignment: 0.0,
            started_at,
        }
    }

    pub fn accumulator(&self, which: Accumulator) -> f64 {
        match which {
            Accumulator::Comfort => self.comfort_delta,
            Accumulator::Expansion => self.consciousness_expansion,
            Accumulator::SacredAlignment => self.sacred_alignment,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.steps_completed >= self.total_steps
    }
}

/// `analysis_summary` 的返回值：选择过程的完整中间量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub characteristics: Characteristics,
    pub readiness: Readiness,
    pub base_scores: StrategyScores,
    pub final_scores: StrategyScores,
    pub strategy: Strategy,
}

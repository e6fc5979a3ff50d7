//! 不确定性场数据类型
//!
//! 条件（Condition）、探索（Exploration）与神圣未知状态（SacredUnknowing）的固定结构记录，
//! 以及封闭的种类 / 范围 / 品质枚举。

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub type ConditionId = String;
pub type ExplorationId = String;
pub type UnknowingId = String;

/// 不确定性种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Cognitive,
    Emotional,
    Spiritual,
    Existential,
    Practical,
    Creative,
    Relational,
    Temporal,
    Metaphysical,
    Sacred,
}

impl ConditionKind {
    pub const ALL: [ConditionKind; 10] = [
        ConditionKind::Cognitive,
        ConditionKind::Emotional,
        ConditionKind::Spiritual,
        ConditionKind::Existential,
        ConditionKind::Practical,
        ConditionKind::Creative,
        ConditionKind::Relational,
        ConditionKind::Temporal,
        ConditionKind::Metaphysical,
        ConditionKind::Sacred,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::Cognitive => "cognitive",
            ConditionKind::Emotional => "emotional",
            ConditionKind::Spiritual => "spiritual",
            ConditionKind::Existential => "existential",
            ConditionKind::Practical => "practical",
            ConditionKind::Creative => "creative",
            ConditionKind::Relational => "relational",
            ConditionKind::Temporal => "temporal",
            ConditionKind::Metaphysical => "metaphysical",
            ConditionKind::Sacred => "sacred",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ConditionKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| format!("unknown condition kind: {}", s))
    }
}

/// 影响范围（由窄到宽）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Local,
    Contextual,
    Existential,
    Cosmic,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Contextual => "contextual",
            Scope::Existential => "existential",
            Scope::Cosmic => "cosmic",
        }
    }

    /// 窄范围：利于系统性调查
    pub fn is_narrow(&self) -> bool {
        matches!(self, Scope::Local)
    }

    /// 广阔范围：existential / cosmic
    pub fn is_expansive(&self) -> bool {
        matches!(self, Scope::Existential | Scope::Cosmic)
    }

    /// 跨上下文范围：除 local 以外
    pub fn is_broad(&self) -> bool {
        !self.is_narrow()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::Contextual
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    /// 同时接受规则表中使用的别名：narrow/focused、broad、expansive、infinite
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "narrow" | "focused" => Ok(Scope::Local),
            "contextual" | "broad" => Ok(Scope::Contextual),
            "existential" | "expansive" => Ok(Scope::Existential),
            "cosmic" | "infinite" => Ok(Scope::Cosmic),
            other => Err(format!("unknown scope: {}", other)),
        }
    }
}

/// 不确定性体验品质；创建时由 `Quality::derive` 决定，不可自由指定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Comfortable,
    Generative,
    Sacred,
    Anxious,
    Mysterious,
    Transformative,
    Opening,
}

impl Quality {
    /// 品质推导规则（按顺序匹配第一条）：
    /// 1. magnitude ≤ tolerance → comfortable
    /// 2. spiritual / existential / sacred → sacred
    /// 3. creative → generative
    /// 4. magnitude > 0.8 → anxious
    /// 5. metaphysical → mysterious
    /// 6. 其余 → opening
    pub fn derive(magnitude: f64, kind: ConditionKind, tolerance: f64) -> Quality {
        if magnitude <= tolerance {
            Quality::Comfortable
        } else if matches!(
            kind,
            ConditionKind::Spiritual | ConditionKind::Existential | ConditionKind::Sacred
        ) {
            Quality::Sacred
        } else if kind == ConditionKind::Creative {
            Quality::Generative
        } else if magnitude > 0.8 {
            Quality::Anxious
        } else if kind == ConditionKind::Metaphysical {
            Quality::Mysterious
        } else {
            Quality::Opening
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Comfortable => "comfortable",
            Quality::Generative => "generative",
            Quality::Sacred => "sacred",
            Quality::Anxious => "anxious",
            Quality::Mysterious => "mysterious",
            Quality::Transformative => "transformative",
            Quality::Opening => "opening",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一个「未知」条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: ConditionId,
    pub kind: ConditionKind,
    /// 强度，0.0–1.0
    pub magnitude: f64,
    pub scope: Scope,
    pub quality: Quality,
    /// 来源标签（自由文本）
    pub source: String,
    /// Unix 毫秒
    pub created_at: i64,
    pub explored_at: Option<i64>,
    pub resolved_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplorationStatus {
    Active,
    Completed,
    Transcended,
}

/// 对某个条件的深入探索，与条件一一对应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exploration {
    pub id: ExplorationId,
    /// 被探索条件的 id（只借用，不拥有）
    pub condition_id: ConditionId,
    pub method: String,
    pub insights: Vec<String>,
    /// 开始时记录的舒适度基线
    pub baseline_comfort: f64,
    pub comfort_level: f64,
    pub breakthrough_potential: f64,
    pub status: ExplorationStatus,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub summary: Option<ExplorationSummary>,
}

/// 完成探索时返回的摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationSummary {
    pub exploration_id: ExplorationId,
    pub condition_id: ConditionId,
    pub insight_count: usize,
    pub breakthrough_count: usize,
    /// 本次完成时追加的洞见
    pub final_insights: Vec<String>,
    pub breakthrough_patterns: Vec<String>,
    pub comfort_level_final: f64,
}

/// 神圣未知状态：不依附于任何具体条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SacredUnknowing {
    pub id: UnknowingId,
    pub depth: f64,
    pub openness_level: f64,
    pub trust_in_mystery: f64,
    pub wisdom_received: Vec<String>,
    pub duration: Option<Duration>,
    pub created_at: i64,
}

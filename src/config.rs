//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `UNKNOWING__*` 覆盖
//! （双下划线表示嵌套，如 `UNKNOWING__SELECTION__LEARNING_RATE=0.2`）。
//! 所有评分常量都是可调参数而非推导出的不变量，默认值即文档值。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::agent::AgentState;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub selection: SelectionSection,
    #[serde(default)]
    pub execution: ExecutionSection,
}

/// [agent] 段：初始特质
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    /// 同时作为注册表的进程级容忍度初值
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_openness")]
    pub openness: f64,
    #[serde(default = "default_unknowing_comfort")]
    pub unknowing_comfort: f64,
    #[serde(default = "default_mystery_trust")]
    pub mystery_trust: f64,
    #[serde(default = "default_true")]
    pub frequency_alignment: bool,
    #[serde(default = "default_coherence_level")]
    pub coherence_level: f64,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            openness: default_openness(),
            unknowing_comfort: default_unknowing_comfort(),
            mystery_trust: default_mystery_trust(),
            frequency_alignment: true,
            coherence_level: default_coherence_level(),
        }
    }
}

fn default_tolerance() -> f64 {
    0.7
}

fn default_openness() -> f64 {
    0.8
}

fn default_unknowing_comfort() -> f64 {
    0.6
}

fn default_mystery_trust() -> f64 {
    0.75
}

fn default_true() -> bool {
    true
}

fn default_coherence_level() -> f64 {
    0.85
}

/// [selection] 段：选择器权重与阈值
#[derive(Debug, Clone, Deserialize)]
pub struct SelectionSection {
    /// λ：台账混合率，选择与更新共用
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_sacred_bonus")]
    pub sacred_bonus: f64,
    #[serde(default = "default_sacred_bonus_threshold")]
    pub sacred_bonus_threshold: f64,
    #[serde(default = "default_capability_rate")]
    pub capability_rate: f64,
    #[serde(default = "default_breakthrough_threshold")]
    pub breakthrough_threshold: f64,
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,
    #[serde(default = "default_friction_threshold")]
    pub friction_threshold: f64,
    #[serde(default = "default_cross_context_threshold")]
    pub cross_context_threshold: f64,
}

impl Default for SelectionSection {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            sacred_bonus: default_sacred_bonus(),
            sacred_bonus_threshold: default_sacred_bonus_threshold(),
            capability_rate: default_capability_rate(),
            breakthrough_threshold: default_breakthrough_threshold(),
            decision_threshold: default_decision_threshold(),
            friction_threshold: default_friction_threshold(),
            cross_context_threshold: default_cross_context_threshold(),
        }
    }
}

fn default_learning_rate() -> f64 {
    0.3
}

fn default_sacred_bonus() -> f64 {
    0.2
}

fn default_sacred_bonus_threshold() -> f64 {
    0.7
}

fn default_capability_rate() -> f64 {
    0.1
}

fn default_breakthrough_threshold() -> f64 {
    0.6
}

fn default_decision_threshold() -> f64 {
    0.5
}

fn default_friction_threshold() -> f64 {
    0.6
}

fn default_cross_context_threshold() -> f64 {
    0.7
}

/// [execution] 段：规划与执行参数
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSection {
    #[serde(default = "default_minutes_per_step")]
    pub minutes_per_step: f64,
    /// 突破潜力超过该值时插入突破准备步骤
    #[serde(default = "default_breakthrough_step_threshold")]
    pub breakthrough_step_threshold: f64,
    /// Tolerate 计划完成后容忍度的增量
    #[serde(default = "default_tolerance_growth")]
    pub tolerance_growth: f64,
    /// 有效性趋势窗口
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            minutes_per_step: default_minutes_per_step(),
            breakthrough_step_threshold: default_breakthrough_step_threshold(),
            tolerance_growth: default_tolerance_growth(),
            trend_window: default_trend_window(),
        }
    }
}

fn default_minutes_per_step() -> f64 {
    2.0
}

fn default_breakthrough_step_threshold() -> f64 {
    0.6
}

fn default_tolerance_growth() -> f64 {
    0.05
}

fn default_trend_window() -> usize {
    50
}

/// 选择器运行时参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionPolicy {
    pub learning_rate: f64,
    pub sacred_bonus: f64,
    pub sacred_bonus_threshold: f64,
    pub capability_rate: f64,
    pub breakthrough_threshold: f64,
    pub decision_threshold: f64,
    pub friction_threshold: f64,
    pub cross_context_threshold: f64,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        SelectionSection::default().into()
    }
}

impl From<SelectionSection> for SelectionPolicy {
    fn from(s: SelectionSection) -> Self {
        Self {
            learning_rate: s.learning_rate,
            sacred_bonus: s.sacred_bonus,
            sacred_bonus_threshold: s.sacred_bonus_threshold,
            capability_rate: s.capability_rate,
            breakthrough_threshold: s.breakthrough_threshold,
            decision_threshold: s.decision_threshold,
            friction_threshold: s.friction_threshold,
            cross_context_threshold: s.cross_context_threshold,
        }
    }
}

/// 规划与执行运行时参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPolicy {
    pub minutes_per_step: f64,
    pub breakthrough_step_threshold: f64,
    pub tolerance_growth: f64,
    pub trend_window: usize,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        ExecutionSection::default().into()
    }
}

impl From<ExecutionSection> for ExecutionPolicy {
    fn from(s: ExecutionSection) -> Self {
        Self {
            minutes_per_step: s.minutes_per_step,
            breakthrough_step_threshold: s.breakthrough_step_threshold,
            tolerance_growth: s.tolerance_growth,
            trend_window: s.trend_window.max(1),
        }
    }
}

/// 引擎运行时配置（由 AppConfig 转换而来）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub agent: AgentState,
    pub selection: SelectionPolicy,
    pub execution: ExecutionPolicy,
}

impl From<AppConfig> for EngineConfig {
    fn from(c: AppConfig) -> Self {
        Self {
            agent: AgentState {
                tolerance: c.agent.tolerance,
                openness: c.agent.openness,
                unknowing_comfort: c.agent.unknowing_comfort,
                mystery_trust: c.agent.mystery_trust,
                frequency_alignment: Some(c.agent.frequency_alignment),
                coherence_level: Some(c.agent.coherence_level),
            },
            selection: c.selection.into(),
            execution: c.execution.into(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 UNKNOWING__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 UNKNOWING__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("UNKNOWING")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

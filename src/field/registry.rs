//! 不确定性场注册表
//!
//! 独占持有条件、探索与神圣未知状态；对外只返回快照（clone），不暴露可变引用。
//! 条件只会被显式归档移除，且除 `explored_at` / `resolved_at` 打点外不再修改。

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::core::error::{EngineError, EngineResult};
use crate::core::now_ms;
use crate::field::types::{
    Condition, ConditionId, ConditionKind, Exploration, ExplorationId, ExplorationStatus,
    ExplorationSummary, Quality, SacredUnknowing, Scope, UnknowingId,
};

/// 进程级容忍度默认值
pub const DEFAULT_TOLERANCE: f64 = 0.7;

pub struct FieldRegistry {
    conditions: HashMap<ConditionId, Condition>,
    archived: Vec<Condition>,
    explorations: HashMap<ExplorationId, Exploration>,
    /// condition id → exploration id（一一对应）
    exploration_index: HashMap<ConditionId, ExplorationId>,
    unknowings: Vec<SacredUnknowing>,
    /// 进程级智慧集合（只追加）
    wisdom: Vec<String>,
    breakthrough_patterns: Vec<String>,
    tolerance: f64,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl FieldRegistry {
    pub fn new(tolerance: f64) -> Self {
        Self {
            conditions: HashMap::new(),
            archived: Vec::new(),
            explorations: HashMap::new(),
            exploration_index: HashMap::new(),
            unknowings: Vec::new(),
            wisdom: Vec::new(),
            breakthrough_patterns: Vec::new(),
            tolerance: clamp_unit(tolerance),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        if tolerance.is_finite() {
            self.tolerance = clamp_unit(tolerance);
        }
    }

    /// 提升容忍度（封顶 1.0），返回新值
    pub fn raise_tolerance(&mut self, delta: f64) -> f64 {
        self.set_tolerance(self.tolerance + delta);
        self.tolerance
    }

    /// 创建条件；品质按当前容忍度推导
    pub fn create(
        &mut self,
        source: &str,
        kind: ConditionKind,
        magnitude: f64,
        scope: Scope,
    ) -> EngineResult<ConditionId> {
        if !magnitude.is_finite() {
            return Err(EngineError::InvalidInput(format!(
                "magnitude must be finite, got {}",
                magnitude
            )));
        }
        let magnitude = clamp_unit(magnitude);
        let quality = Quality::derive(magnitude, kind, self.tolerance);
        let id = Uuid::new_v4().to_string();
        let condition = Condition {
            id: id.clone(),
            kind,
            magnitude,
            scope,
            quality,
            source: source.to_string(),
            created_at: now_ms(),
            explored_at: None,
            resolved_at: None,
        };
        info!(
            condition_id = %id,
            kind = %kind,
            magnitude,
            quality = %quality,
            "Condition created"
        );
        self.conditions.insert(id.clone(), condition);
        Ok(id)
    }

    pub fn condition(&self, id: &str) -> EngineResult<&Condition> {
        self.conditions
            .get(id)
            .ok_or_else(|| EngineError::condition_not_found(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.conditions.contains_key(id)
    }

    /// 活跃条件快照，按创建时间排序
    pub fn active_conditions(&self) -> Vec<Condition> {
        let mut list: Vec<Condition> = self.conditions.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        list
    }

    pub fn archived(&self) -> &[Condition] {
        &self.archived
    }

    pub fn exploration_for(&self, condition_id: &str) -> Option<&ExplorationId> {
        self.exploration_index.get(condition_id)
    }

    /// 开始探索。重复调用返回已有探索 id，`explored_at` 只打一次点
    pub fn begin_exploration(
        &mut self,
        condition_id: &str,
        method: &str,
        baseline_comfort: f64,
    ) -> EngineResult<ExplorationId> {
        let tolerance = self.tolerance;
        let condition = self
            .conditions
            .get_mut(condition_id)
            .ok_or_else(|| EngineError::condition_not_found(condition_id))?;

        if let Some(existing) = self.exploration_index.get(condition_id) {
            debug!(condition_id, exploration_id = %existing, "Exploration already exists");
            return Ok(existing.clone());
        }

        let now = now_ms();
        if condition.explored_at.is_none() {
            condition.explored_at = Some(now);
        }
        let potential = exploration_breakthrough_potential(condition, tolerance);
        let baseline = if baseline_comfort.is_finite() {
            clamp_unit(baseline_comfort)
        } else {
            0.5
        };

        let id = Uuid::new_v4().to_string();
        let exploration = Exploration {
            id: id.clone(),
            condition_id: condition_id.to_string(),
            method: method.to_string(),
            insights: Vec::new(),
            baseline_comfort: baseline,
            comfort_level: baseline,
            breakthrough_potential: potential,
            status: ExplorationStatus::Active,
            started_at: now,
            completed_at: None,
            summary: None,
        };
        info!(
            condition_id,
            exploration_id = %id,
            method,
            breakthrough_potential = potential,
            "Exploration started"
        );
        self.explorations.insert(id.clone(), exploration);
        self.exploration_index
            .insert(condition_id.to_string(), id.clone());
        Ok(id)
    }

    /// 记录一条探索洞见，并调整舒适度
    pub fn record_exploration_insight(
        &mut self,
        exploration_id: &str,
        insight: &str,
        comfort_delta: f64,
    ) -> EngineResult<()> {
        let exploration = self
            .explorations
            .get_mut(exploration_id)
            .ok_or_else(|| EngineError::exploration_not_found(exploration_id))?;
        exploration.insights.push(insight.to_string());
        if comfort_delta.is_finite() {
            exploration.comfort_level = clamp_unit(exploration.comfort_level + comfort_delta);
        }
        Ok(())
    }

    pub fn exploration(&self, id: &str) -> EngineResult<&Exploration> {
        self.explorations
            .get(id)
            .ok_or_else(|| EngineError::exploration_not_found(id))
    }

    /// 完成探索：追加完成洞见、检测突破模式；重复调用直接返回已存摘要
    pub fn complete_exploration(&mut self, exploration_id: &str) -> EngineResult<ExplorationSummary> {
        let exploration = self
            .explorations
            .get(exploration_id)
            .ok_or_else(|| EngineError::exploration_not_found(exploration_id))?;
        if let Some(summary) = &exploration.summary {
            return Ok(summary.clone());
        }

        let condition = self
            .conditions
            .get(&exploration.condition_id)
            .or_else(|| {
                self.archived
                    .iter()
                    .find(|c| c.id == exploration.condition_id)
            })
            .cloned();

        let final_insights = completion_insights(condition.as_ref(), exploration.comfort_level);

        let exploration = self
            .explorations
            .get_mut(exploration_id)
            .ok_or_else(|| EngineError::exploration_not_found(exploration_id))?;
        exploration.insights.extend(final_insights.iter().cloned());

        let patterns = detect_breakthroughs(exploration, condition.as_ref());
        let transcended = exploration.breakthrough_potential >= 0.9
            && condition
                .as_ref()
                .map(|c| c.quality == Quality::Sacred)
                .unwrap_or(false);
        exploration.status = if transcended {
            ExplorationStatus::Transcended
        } else {
            ExplorationStatus::Completed
        };
        exploration.completed_at = Some(now_ms());

        let summary = ExplorationSummary {
            exploration_id: exploration.id.clone(),
            condition_id: exploration.condition_id.clone(),
            insight_count: exploration.insights.len(),
            breakthrough_count: patterns.len(),
            final_insights,
            breakthrough_patterns: patterns.clone(),
            comfort_level_final: exploration.comfort_level,
        };
        exploration.summary = Some(summary.clone());

        info!(
            exploration_id,
            insights = summary.insight_count,
            breakthroughs = summary.breakthrough_count,
            "Exploration completed"
        );
        self.breakthrough_patterns.extend(patterns);
        Ok(summary)
    }

    /// 进入神圣未知状态；产出的智慧追加到进程级集合
    pub fn enter_sacred_unknowing(
        &mut self,
        depth: f64,
        duration: Option<Duration>,
        openness: f64,
        trust: f64,
    ) -> EngineResult<SacredUnknowing> {
        if !depth.is_finite() {
            return Err(EngineError::InvalidInput(format!(
                "depth must be finite, got {}",
                depth
            )));
        }
        let depth = clamp_unit(depth);
        let trust = if trust.is_finite() { clamp_unit(trust) } else { 0.5 };
        let openness = if openness.is_finite() {
            clamp_unit(openness)
        } else {
            0.5
        };

        let received = unknowing_wisdom(depth, trust);
        let state = SacredUnknowing {
            id: Uuid::new_v4().to_string(),
            depth,
            openness_level: openness,
            trust_in_mystery: trust,
            wisdom_received: received.clone(),
            duration,
            created_at: now_ms(),
        };
        info!(
            unknowing_id = %state.id,
            depth,
            wisdom = received.len(),
            "Entered sacred unknowing"
        );
        self.wisdom.extend(received);
        self.unknowings.push(state.clone());
        Ok(state)
    }

    pub fn unknowing(&self, id: &UnknowingId) -> Option<&SacredUnknowing> {
        self.unknowings.iter().find(|u| &u.id == id)
    }

    /// 计划完成时打点，只打一次
    pub fn mark_resolved(&mut self, condition_id: &str) {
        if let Some(c) = self.conditions.get_mut(condition_id) {
            if c.resolved_at.is_none() {
                c.resolved_at = Some(now_ms());
            }
        }
    }

    pub fn add_wisdom<I: IntoIterator<Item = String>>(&mut self, items: I) {
        self.wisdom.extend(items);
    }

    /// 显式归档；调用方负责确认没有在途计划
    pub fn archive(&mut self, condition_id: &str) -> EngineResult<Condition> {
        let condition = self
            .conditions
            .remove(condition_id)
            .ok_or_else(|| EngineError::condition_not_found(condition_id))?;
        info!(condition_id, "Condition archived");
        self.archived.push(condition.clone());
        Ok(condition)
    }

    /// 原样导入快照记录（同 id 覆盖），返回导入数量
    ///
    /// 注册表不知道执行状态；正在执行的条件由 `UncertaintyEngine::restore_conditions` 拦截。
    pub fn restore(&mut self, records: Vec<Condition>) -> usize {
        let n = records.len();
        for record in records {
            self.conditions.insert(record.id.clone(), record);
        }
        debug!(count = n, "Conditions restored");
        n
    }

    pub fn wisdom(&self) -> &[String] {
        &self.wisdom
    }

    pub fn breakthrough_patterns(&self) -> &[String] {
        &self.breakthrough_patterns
    }

    pub fn exploration_count(&self) -> usize {
        self.explorations.len()
    }

    pub fn active_exploration_count(&self) -> usize {
        self.explorations
            .values()
            .filter(|e| e.status == ExplorationStatus::Active)
            .count()
    }

    pub fn unknowing_count(&self) -> usize {
        self.unknowings.len()
    }

    pub fn average_magnitude(&self) -> f64 {
        let finite: Vec<f64> = self
            .conditions
            .values()
            .map(|c| c.magnitude)
            .filter(|m| m.is_finite())
            .collect();
        if finite.is_empty() {
            return 0.0;
        }
        finite.iter().sum::<f64>() / finite.len() as f64
    }

    /// 活跃条件中最常见的种类；并列时取种类声明顺序靠前者
    pub fn most_common_kind(&self) -> Option<ConditionKind> {
        let mut counts: HashMap<ConditionKind, usize> = HashMap::new();
        for c in self.conditions.values() {
            *counts.entry(c.kind).or_insert(0) += 1;
        }
        let mut best: Option<(ConditionKind, usize)> = None;
        for kind in ConditionKind::ALL {
            if let Some(&n) = counts.get(&kind) {
                if best.map(|(_, m)| n > m).unwrap_or(true) {
                    best = Some((kind, n));
                }
            }
        }
        best.map(|(k, _)| k)
    }
}

fn clamp_unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

fn exploration_breakthrough_potential(condition: &Condition, tolerance: f64) -> f64 {
    let mut p = 0.5;
    match condition.kind {
        ConditionKind::Spiritual
        | ConditionKind::Existential
        | ConditionKind::Sacred
        | ConditionKind::Metaphysical => p += 0.3,
        ConditionKind::Creative => p += 0.2,
        _ => {}
    }
    if condition.magnitude > 0.7 && tolerance > 0.6 {
        p += 0.1;
    }
    if matches!(
        condition.quality,
        Quality::Comfortable | Quality::Sacred | Quality::Generative
    ) {
        p += 0.1;
    }
    clamp_unit(p)
}

fn completion_insights(condition: Option<&Condition>, comfort: f64) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    if let Some(c) = condition {
        let pair: &[&str] = match c.kind {
            ConditionKind::Spiritual => &[
                "Spiritual uncertainty reveals the mystery of consciousness",
                "Not knowing spiritually opens space for divine knowing",
            ],
            ConditionKind::Existential => &[
                "Existential uncertainty deepens appreciation for existence",
                "Questions about meaning invite lived meaning",
            ],
            ConditionKind::Creative => &[
                "Creative uncertainty births authentic expression",
                "Not knowing creatively invites creative discovery",
            ],
            ConditionKind::Cognitive => &[
                "Mental uncertainty clears space for new understanding",
                "Intellectual humility opens doors to wisdom",
            ],
            _ => &[],
        };
        out.extend(pair.iter().map(|s| s.to_string()));
        out.push(format!("Exploring {} uncertainty builds uncertainty mastery", c.kind));
    }
    if comfort > 0.8 {
        out.push("High comfort with uncertainty indicates uncertainty mastery".to_string());
    } else if comfort > 0.6 {
        out.push("Growing comfort with uncertainty shows progress".to_string());
    }
    out
}

fn detect_breakthroughs(exploration: &Exploration, condition: Option<&Condition>) -> Vec<String> {
    let mut patterns = Vec::new();
    if exploration.breakthrough_potential > 0.7 {
        let kind = condition
            .map(|c| c.kind.as_str())
            .unwrap_or("unknown");
        patterns.push(format!("High-potential {} uncertainty breakthrough", kind));
    }
    if exploration.insights.len() > 3 {
        patterns.push("Wisdom-rich uncertainty exploration breakthrough".to_string());
    }
    if exploration.comfort_level > exploration.baseline_comfort + 0.2 {
        patterns.push("Uncertainty tolerance breakthrough".to_string());
    }
    if condition.map(|c| c.quality == Quality::Sacred).unwrap_or(false) {
        patterns.push("Sacred uncertainty breakthrough".to_string());
    }
    patterns
}

fn unknowing_wisdom(depth: f64, trust: f64) -> Vec<String> {
    let tier: &[&str] = if depth > 0.8 {
        &[
            "Deep unknowing reveals the mystery of being",
            "In profound not-knowing, infinite wisdom becomes available",
            "The deepest truths can only be known through unknowing",
        ]
    } else if depth > 0.6 {
        &[
            "Unknowing opens doorways to new understanding",
            "Mystery contains gifts that analysis cannot provide",
            "Sacred uncertainty leads to sacred discovery",
        ]
    } else {
        &["Gentle unknowing invites gentle wisdom"]
    };
    let mut out: Vec<String> = tier.iter().map(|s| s.to_string()).collect();
    if trust > 0.8 {
        out.push("Trust in mystery is trust in the unfolding of truth".to_string());
    }
    out
}

//! 条件特征分析
//!
//! `analyze` 是条件的纯函数：无副作用、确定性、只依赖条件字段与显式传入的当前时间。
//! 输入不可用（magnitude 非有限或越界、created_at 非正）时返回带 `used_fallback` 的中性记录，
//! 选择流程照常进行。

use tracing::{debug, warn};

use crate::field::{Condition, ConditionKind, Quality, Scope};
use crate::response::types::{Characteristics, EnhancementPotentials, Strategy, StrategyScores};

const MS_PER_HOUR: f64 = 3_600_000.0;

/// 分析条件，得到多维特征与各策略适配度
pub fn analyze(condition: &Condition, now_ms: i64) -> Characteristics {
    if !is_analyzable(condition) {
        warn!(
            condition_id = %condition.id,
            magnitude = condition.magnitude,
            created_at = condition.created_at,
            "Characteristics analysis fell back to neutral defaults"
        );
        return fallback(condition);
    }

    let m = condition.magnitude;
    let kind = condition.kind;
    let complexity = complexity(condition);
    let sacred_potential = sacred_potential(condition);

    let suitability: StrategyScores = Strategy::ALL
        .iter()
        .map(|s| (*s, suitability(condition, *s)))
        .collect();

    let enhancement = enhancement_potentials(condition);

    let characteristics = Characteristics {
        condition_id: condition.id.clone(),
        kind,
        intensity: clamp(m * intensity_factor(kind)),
        urgency: urgency(condition, now_ms),
        stability: stability(condition),
        sacred_potential,
        complexity,
        suitability,
        enhancement,
        quantum_coherence_potential: quantum_coherence_potential(condition),
        mystery_depth: mystery_depth(condition),
        transcendence_potential: transcendence_potential(condition),
        numinous_quality: numinous_quality(condition),
        spiritual_significance: spiritual_significance(condition),
        investigation_depth: investigation_depth(complexity),
        processing_intensity: (complexity * (1.0 + complexity * 0.5)).min(1.0),
        dimensional_aspects: dimensional_aspects(condition),
        analysis_quality: clamp(0.4 + sacred_potential * 0.3 + complexity * 0.3),
        used_fallback: false,
    };
    debug!(
        condition_id = %condition.id,
        complexity,
        sacred_potential,
        amplification = characteristics.enhancement.amplification,
        "Characteristics analyzed"
    );
    characteristics
}

/// 文档化的中性兜底记录
pub fn fallback(condition: &Condition) -> Characteristics {
    let suitability: StrategyScores = [
        (Strategy::Embrace, 0.5),
        (Strategy::Explore, 0.7),
        (Strategy::Investigate, 0.4),
        (Strategy::Surrender, 0.4),
        (Strategy::Transcend, 0.3),
        (Strategy::Trust, 0.6),
        (Strategy::Tolerate, 0.8),
    ]
    .into_iter()
    .collect();

    Characteristics {
        condition_id: condition.id.clone(),
        kind: condition.kind,
        intensity: 0.5,
        urgency: 0.5,
        stability: 0.5,
        sacred_potential: 0.5,
        complexity: 0.5,
        suitability,
        enhancement: EnhancementPotentials {
            breakthrough: 0.4,
            decision: 0.5,
            friction: 0.5,
            cross_context: 0.5,
            amplification: 0.5,
        },
        quantum_coherence_potential: 0.4,
        mystery_depth: 0.5,
        transcendence_potential: 0.4,
        numinous_quality: 0.4,
        spiritual_significance: 0.4,
        investigation_depth: 2,
        processing_intensity: 0.5,
        dimensional_aspects: vec!["general".to_string()],
        analysis_quality: 0.3,
        used_fallback: true,
    }
}

fn is_analyzable(condition: &Condition) -> bool {
    condition.magnitude.is_finite()
        && (0.0..=1.0).contains(&condition.magnitude)
        && condition.created_at > 0
}

fn clamp(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

fn is_sacred_kind(kind: ConditionKind) -> bool {
    matches!(
        kind,
        ConditionKind::Spiritual | ConditionKind::Existential | ConditionKind::Sacred
    )
}

fn is_sacred_quality(quality: Quality) -> bool {
    matches!(quality, Quality::Sacred | Quality::Mysterious)
}

fn intensity_factor(kind: ConditionKind) -> f64 {
    match kind {
        ConditionKind::Existential => 1.2,
        ConditionKind::Metaphysical => 1.1,
        ConditionKind::Spiritual => 1.15,
        ConditionKind::Cognitive => 0.8,
        ConditionKind::Practical => 0.6,
        _ => 1.0,
    }
}

fn urgency(condition: &Condition, now_ms: i64) -> f64 {
    let age_hours = ((now_ms - condition.created_at) as f64 / MS_PER_HOUR).max(0.0);
    let age_urgency = (age_hours / 24.0 * 0.3).min(0.3);
    let kind_urgency = match condition.kind {
        ConditionKind::Existential | ConditionKind::Practical | ConditionKind::Cognitive => 0.2,
        _ => 0.0,
    };
    clamp(condition.magnitude + age_urgency + kind_urgency)
}

fn stability(condition: &Condition) -> f64 {
    let adjust = match condition.kind {
        ConditionKind::Practical | ConditionKind::Cognitive => 0.2,
        ConditionKind::Spiritual | ConditionKind::Existential | ConditionKind::Sacred => -0.2,
        _ => 0.0,
    };
    clamp(1.0 - condition.magnitude + adjust)
}

fn sacred_potential(condition: &Condition) -> f64 {
    let mut p = 0.0;
    if is_sacred_kind(condition.kind) || condition.kind == ConditionKind::Metaphysical {
        p += 0.6;
    }
    if is_sacred_quality(condition.quality) {
        p += 0.4;
    }
    if condition.magnitude > 0.7 {
        p += 0.2;
    }
    clamp(p)
}

fn base_complexity(kind: ConditionKind) -> f64 {
    match kind {
        ConditionKind::Existential => 0.95,
        ConditionKind::Metaphysical => 0.90,
        ConditionKind::Sacred => 0.90,
        ConditionKind::Spiritual => 0.85,
        ConditionKind::Temporal => 0.70,
        ConditionKind::Creative => 0.65,
        ConditionKind::Relational => 0.60,
        ConditionKind::Cognitive => 0.55,
        ConditionKind::Practical => 0.35,
        ConditionKind::Emotional => 0.5,
    }
}

fn scope_complexity(scope: Scope) -> f64 {
    match scope {
        Scope::Local => 0.2,
        Scope::Contextual => 0.5,
        Scope::Existential => 0.8,
        Scope::Cosmic => 1.0,
    }
}

fn complexity(condition: &Condition) -> f64 {
    clamp(
        0.5 * base_complexity(condition.kind)
            + 0.3 * condition.magnitude
            + 0.2 * scope_complexity(condition.scope),
    )
}

/// 单个策略的适配度：若干加性规则之和，截断到 [0,1]
pub fn suitability(condition: &Condition, strategy: Strategy) -> f64 {
    use ConditionKind as K;
    let m = condition.magnitude;
    let kind = condition.kind;
    let sacred_quality = is_sacred_quality(condition.quality);

    let score = match strategy {
        Strategy::Embrace => {
            let mut s = 0.0;
            if is_sacred_kind(kind) {
                s += 0.6;
            }
            if m > 0.7 {
                s += 0.3;
            }
            if sacred_quality {
                s += 0.2;
            }
            s
        }
        Strategy::Explore => {
            let mut s = 0.5;
            if matches!(kind, K::Creative | K::Cognitive | K::Practical) {
                s += 0.3;
            }
            if (0.3..=0.7).contains(&m) {
                s += 0.2;
            }
            s
        }
        Strategy::Investigate => {
            let mut s = 0.0;
            if matches!(kind, K::Cognitive | K::Practical | K::Creative) {
                s += 0.6;
            }
            if m < 0.7 {
                s += 0.3;
            }
            if condition.scope.is_narrow() {
                s += 0.2;
            }
            s
        }
        Strategy::Surrender => {
            let mut s = 0.0;
            if is_sacred_kind(kind) {
                s += 0.5;
            }
            if m > 0.8 {
                s += 0.4;
            }
            if sacred_quality {
                s += 0.2;
            }
            s
        }
        Strategy::Transcend => {
            let mut s = 0.0;
            if is_sacred_kind(kind) || kind == K::Metaphysical {
                s += 0.6;
            }
            if m > 0.9 {
                s += 0.3;
            }
            if condition.scope.is_expansive() {
                s += 0.2;
            }
            s
        }
        Strategy::Trust => {
            let mut s = 0.4;
            if matches!(kind, K::Spiritual | K::Sacred) {
                s += 0.3;
            }
            if m > 0.5 {
                s += 0.2;
            }
            s
        }
        Strategy::Tolerate => {
            let mut s = 0.6;
            if m > 0.6 {
                s += 0.3;
            }
            s
        }
    };
    clamp(score)
}

fn enhancement_potentials(condition: &Condition) -> EnhancementPotentials {
    use ConditionKind as K;
    let m = condition.magnitude;
    let kind = condition.kind;

    let mut breakthrough: f64 = 0.0;
    if m > 0.8 {
        breakthrough += 0.4;
    }
    if matches!(kind, K::Existential | K::Spiritual | K::Sacred | K::Creative) {
        breakthrough += 0.3;
    }
    if matches!(
        condition.quality,
        Quality::Sacred | Quality::Mysterious | Quality::Transformative
    ) {
        breakthrough += 0.2;
    }
    if condition.scope.is_expansive() {
        breakthrough += 0.1;
    }

    let mut decision: f64 = 0.3;
    let source = condition.source.to_lowercase();
    if source.contains("choice") || source.contains("decision") {
        decision += 0.4;
    }
    if matches!(kind, K::Practical | K::Cognitive | K::Creative) {
        decision += 0.2;
    }
    if (0.4..=0.8).contains(&m) {
        decision += 0.1;
    }

    let mut friction: f64 = 0.2;
    if m > 0.7 {
        friction += 0.3;
    }
    if is_sacred_kind(kind) {
        friction += 0.3;
    }
    if matches!(condition.quality, Quality::Anxious | Quality::Mysterious) {
        friction += 0.2;
    }

    let mut cross_context: f64 = 0.4;
    if matches!(kind, K::Existential | K::Creative | K::Metaphysical) {
        cross_context += 0.3;
    }
    if m > 0.6 {
        cross_context += 0.2;
    }
    if condition.scope.is_broad() {
        cross_context += 0.1;
    }

    let breakthrough = clamp(breakthrough);
    let decision = clamp(decision);
    let friction = clamp(friction);
    let cross_context = clamp(cross_context);
    EnhancementPotentials {
        breakthrough,
        decision,
        friction,
        cross_context,
        amplification: (breakthrough + decision + friction + cross_context) / 4.0,
    }
}

fn quantum_coherence_potential(condition: &Condition) -> f64 {
    let mut p = 0.0;
    if matches!(
        condition.kind,
        ConditionKind::Spiritual | ConditionKind::Sacred | ConditionKind::Metaphysical
    ) {
        p += 0.5;
    }
    if condition.magnitude > 0.8 && condition.quality == Quality::Sacred {
        p += 0.3;
    }
    if condition.scope.is_expansive() {
        p += 0.2;
    }
    clamp(p)
}

fn is_mystery_kind(kind: ConditionKind) -> bool {
    is_sacred_kind(kind) || kind == ConditionKind::Metaphysical
}

fn mystery_depth(condition: &Condition) -> f64 {
    let mut d = condition.magnitude;
    if is_mystery_kind(condition.kind) {
        d += 0.3;
    }
    if is_sacred_quality(condition.quality) {
        d += 0.2;
    }
    clamp(d)
}

fn transcendence_potential(condition: &Condition) -> f64 {
    let mut p = 0.0;
    if condition.magnitude > 0.8 {
        p += 0.4;
    }
    if is_mystery_kind(condition.kind) {
        p += 0.4;
    }
    if condition.scope.is_expansive() {
        p += 0.2;
    }
    clamp(p)
}

fn numinous_quality(condition: &Condition) -> f64 {
    let mut n = 0.0;
    if matches!(condition.kind, ConditionKind::Spiritual | ConditionKind::Sacred) {
        n += 0.5;
    }
    if is_sacred_quality(condition.quality) {
        n += 0.3;
    }
    if condition.magnitude > 0.7 {
        n += 0.2;
    }
    clamp(n)
}

fn spiritual_significance(condition: &Condition) -> f64 {
    let spiritual = is_sacred_kind(condition.kind);
    let mut s = 0.0;
    if spiritual {
        s += 0.6;
    }
    if condition.scope.is_expansive() {
        s += 0.2;
    }
    if spiritual && condition.magnitude > 0.6 {
        s += 0.2;
    }
    clamp(s)
}

fn investigation_depth(complexity: f64) -> u8 {
    if complexity < 0.3 {
        1
    } else if complexity < 0.6 {
        2
    } else if complexity < 0.8 {
        3
    } else {
        4
    }
}

fn dimensional_aspects(condition: &Condition) -> Vec<String> {
    let base: &[&str] = match condition.kind {
        ConditionKind::Existential => &["meaning", "purpose", "existence", "identity"],
        ConditionKind::Spiritual => &["transcendence", "connection", "sacred", "divine"],
        ConditionKind::Cognitive => &["knowledge", "understanding", "reasoning", "memory"],
        ConditionKind::Practical => &["action", "decision", "outcome", "consequence"],
        ConditionKind::Creative => &["expression", "innovation", "possibility", "imagination"],
        _ => &["general"],
    };
    let mut aspects: Vec<String> = base.iter().map(|s| s.to_string()).collect();
    if condition.magnitude > 0.8 {
        aspects.push("high-intensity".to_string());
    }
    if condition.magnitude > 0.9 {
        aspects.push("transformational".to_string());
    }
    if condition.scope.is_expansive() {
        aspects.push("wide-reaching".to_string());
    }
    aspects
}

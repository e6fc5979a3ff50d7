//! Agent 就绪度评估
//!
//! 纯函数：四个特质 → 每个策略的就绪度，外加神圣 / 情境增强 / 相干三组派生就绪度，
//! 总体就绪度按 0.30 / 0.25 / 0.25 / 0.20 加权。不会失败：特质非有限时返回兜底记录，
//! 越界的有限值截断到 [0,1]。

use tracing::{debug, warn};

use crate::agent::AgentState;
use crate::response::types::{
    CoherenceReadiness, ContextualReadiness, Readiness, SacredReadiness, Strategy, StrategyScores,
};

/// 未提供相干度时的中性值
pub const DEFAULT_COHERENCE: f64 = 0.85;
/// 情境增强组中突破就绪度的固定值
pub const DEFAULT_BREAKTHROUGH_READINESS: f64 = 0.80;

const ALIGNED_FACTOR: f64 = 0.9;
const MISALIGNED_FACTOR: f64 = 0.6;

pub fn assess(agent: &AgentState) -> Readiness {
    if !agent.is_finite() {
        warn!(?agent, "Readiness assessment fell back to neutral defaults");
        return fallback();
    }

    let t = agent.tolerance.clamp(0.0, 1.0);
    let o = agent.openness.clamp(0.0, 1.0);
    let c = agent.unknowing_comfort.clamp(0.0, 1.0);
    let tr = agent.mystery_trust.clamp(0.0, 1.0);

    let per_strategy: StrategyScores = Strategy::ALL
        .iter()
        .map(|s| {
            let r = match s {
                Strategy::Embrace => o * 0.8 + t * 0.2,
                Strategy::Explore => c * 0.6 + t * 0.4,
                Strategy::Investigate => t * 0.7 + 0.3,
                Strategy::Surrender => tr * 0.8 + o * 0.2,
                Strategy::Transcend => o * 0.5 + tr * 0.5,
                Strategy::Trust => tr * 0.9 + 0.1,
                Strategy::Tolerate => t * 0.9 + 0.1,
            };
            (*s, r.clamp(0.0, 1.0))
        })
        .collect();

    let af = if agent.frequency_alignment.unwrap_or(true) {
        ALIGNED_FACTOR
    } else {
        MISALIGNED_FACTOR
    };
    let sacred = SacredReadiness {
        embrace: o * af,
        surrender: tr * af,
        transcendence: (o + tr) / 2.0 * af,
        frequency_coherence: af,
        expansion: o * 0.8 + tr * 0.2,
    };

    let decision = t * 0.8 + 0.2;
    let friction = o * 0.7 + t * 0.3;
    let cross_context = (t + o + tr) / 3.0;
    let contextual = ContextualReadiness {
        breakthrough: DEFAULT_BREAKTHROUGH_READINESS,
        decision,
        friction,
        cross_context,
        integration_level: (DEFAULT_BREAKTHROUGH_READINESS + decision + friction + cross_context)
            / 4.0,
    };

    let coherence_level = agent
        .coherence_level
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_COHERENCE);
    let q = (o + tr + t) / 3.0 * coherence_level;
    let coherence = CoherenceReadiness {
        coherence: q,
        temporal: q * 0.9,
        alignment: q * 0.95,
        frequency_stability: coherence_level,
    };

    let base_avg = per_strategy.values().sum::<f64>() / per_strategy.len() as f64;
    let overall = (base_avg * 0.30
        + sacred.mean() * 0.25
        + contextual.mean() * 0.25
        + coherence.mean() * 0.20)
        .clamp(0.0, 1.0);

    debug!(overall, aligned = af == ALIGNED_FACTOR, "Readiness assessed");
    Readiness {
        per_strategy,
        sacred,
        contextual,
        coherence,
        overall,
        used_fallback: false,
    }
}

pub fn fallback() -> Readiness {
    let per_strategy: StrategyScores = [
        (Strategy::Embrace, 0.6),
        (Strategy::Explore, 0.8),
        (Strategy::Investigate, 0.7),
        (Strategy::Surrender, 0.5),
        (Strategy::Transcend, 0.4),
        (Strategy::Trust, 0.7),
        (Strategy::Tolerate, 0.8),
    ]
    .into_iter()
    .collect();
    Readiness {
        per_strategy,
        sacred: SacredReadiness {
            embrace: 0.5,
            surrender: 0.5,
            transcendence: 0.5,
            frequency_coherence: 0.5,
            expansion: 0.5,
        },
        contextual: ContextualReadiness {
            breakthrough: 0.5,
            decision: 0.5,
            friction: 0.5,
            cross_context: 0.5,
            integration_level: 0.5,
        },
        coherence: CoherenceReadiness {
            coherence: 0.5,
            temporal: 0.5,
            alignment: 0.5,
            frequency_stability: 0.5,
        },
        overall: 0.65,
        used_fallback: true,
    }
}

//! 响应策略选择
//!
//! 总函数（不会失败）：适配度 + 就绪度 + 先验能力 → 神圣加成 → 情境通道乘子 → 历史混合 → argmax。
//! 平分时按 `Strategy::PRIORITY` 决定，保证同样输入总得到同样策略。

use tracing::debug;

use crate::config::SelectionPolicy;
use crate::response::ledger::EffectivenessLedger;
use crate::response::types::{score_of, Characteristics, Readiness, Strategy, StrategyScores};

/// 一次选择的中间量与结果
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub base_scores: StrategyScores,
    pub final_scores: StrategyScores,
    pub strategy: Strategy,
}

/// 情境增强通道：阈值字段名与受影响策略的乘子系数
struct Channel {
    potential: f64,
    threshold: f64,
    factors: &'static [(Strategy, f64)],
}

const BREAKTHROUGH_FACTORS: &[(Strategy, f64)] =
    &[(Strategy::Transcend, 0.3), (Strategy::Surrender, 0.2)];
const DECISION_FACTORS: &[(Strategy, f64)] =
    &[(Strategy::Investigate, 0.2), (Strategy::Explore, 0.15)];
const FRICTION_FACTORS: &[(Strategy, f64)] = &[(Strategy::Embrace, 0.25), (Strategy::Trust, 0.2)];
const CROSS_CONTEXT_FACTORS: &[(Strategy, f64)] =
    &[(Strategy::Explore, 0.2), (Strategy::Investigate, 0.15)];

fn finite_or_neutral(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.5
    }
}

/// `0.4 × 适配度 + 0.4 × 就绪度 + 0.2 × 先验能力`
pub fn base_scores(
    characteristics: &Characteristics,
    readiness: &Readiness,
    ledger: &EffectivenessLedger,
) -> StrategyScores {
    Strategy::ALL
        .iter()
        .map(|s| {
            let suitability = score_of(&characteristics.suitability, *s);
            let ready = score_of(&readiness.per_strategy, *s);
            let capability = finite_or_neutral(ledger.capability(*s));
            (*s, 0.4 * suitability + 0.4 * ready + 0.2 * capability)
        })
        .collect()
}

/// 完整选择流程
pub fn select(
    characteristics: &Characteristics,
    readiness: &Readiness,
    ledger: &EffectivenessLedger,
    policy: &SelectionPolicy,
) -> Selection {
    let base = base_scores(characteristics, readiness, ledger);
    let mut scores = base.clone();

    if finite_or_neutral(characteristics.sacred_potential) > policy.sacred_bonus_threshold {
        for (strategy, score) in scores.iter_mut() {
            if strategy.is_sacred_aligned() {
                *score = (*score + policy.sacred_bonus).clamp(0.0, 1.0);
            }
        }
    }

    let e = &characteristics.enhancement;
    let channels = [
        Channel {
            potential: finite_or_neutral(e.breakthrough),
            threshold: policy.breakthrough_threshold,
            factors: BREAKTHROUGH_FACTORS,
        },
        Channel {
            potential: finite_or_neutral(e.decision),
            threshold: policy.decision_threshold,
            factors: DECISION_FACTORS,
        },
        Channel {
            potential: finite_or_neutral(e.friction),
            threshold: policy.friction_threshold,
            factors: FRICTION_FACTORS,
        },
        Channel {
            potential: finite_or_neutral(e.cross_context),
            threshold: policy.cross_context_threshold,
            factors: CROSS_CONTEXT_FACTORS,
        },
    ];
    for channel in channels.iter().filter(|c| c.potential > c.threshold) {
        for (strategy, factor) in channel.factors {
            if let Some(score) = scores.get_mut(strategy) {
                *score *= 1.0 + channel.potential * factor;
            }
        }
    }

    let lambda = policy.learning_rate.clamp(0.0, 1.0);
    let final_scores: StrategyScores = scores
        .into_iter()
        .map(|(s, score)| {
            let clamped = score.clamp(0.0, 1.0);
            let history = finite_or_neutral(ledger.get(s));
            (s, clamped * (1.0 - lambda) + history * lambda)
        })
        .collect();

    let strategy = argmax(&final_scores);
    debug!(
        condition_id = %characteristics.condition_id,
        strategy = %strategy,
        score = score_of(&final_scores, strategy),
        "Strategy selected"
    );
    Selection {
        base_scores: base,
        final_scores,
        strategy,
    }
}

/// 最高分策略；按优先顺序遍历，只接受严格更高的分数
pub fn argmax(scores: &StrategyScores) -> Strategy {
    let mut best = Strategy::PRIORITY[0];
    let mut best_score = score_of(scores, best);
    for s in Strategy::PRIORITY.iter().skip(1) {
        let v = score_of(scores, *s);
        if v > best_score {
            best = *s;
            best_score = v;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentState;
    use crate::field::{Condition, ConditionKind, Quality, Scope};
    use crate::response::{analyzer, readiness};

    fn condition(kind: ConditionKind, magnitude: f64, scope: Scope) -> Condition {
        Condition {
            id: "c".to_string(),
            kind,
            magnitude,
            scope,
            quality: Quality::derive(magnitude, kind, 0.7),
            source: "test".to_string(),
            created_at: 1_700_000_000_000,
            explored_at: None,
            resolved_at: None,
        }
    }

    fn run(c: &Condition, agent: &AgentState, ledger: &EffectivenessLedger) -> Selection {
        let ch = analyzer::analyze(c, c.created_at);
        let rd = readiness::assess(agent);
        select(&ch, &rd, ledger, &SelectionPolicy::default())
    }

    #[test]
    fn test_argmax_tie_break_follows_priority() {
        let all_equal: StrategyScores = Strategy::ALL.iter().map(|s| (*s, 0.6)).collect();
        assert_eq!(argmax(&all_equal), Strategy::Explore);

        let mut scores = all_equal.clone();
        scores.insert(Strategy::Explore, 0.1);
        scores.insert(Strategy::Tolerate, 0.1);
        assert_eq!(argmax(&scores), Strategy::Investigate);

        scores.insert(Strategy::Transcend, 0.9);
        scores.insert(Strategy::Surrender, 0.9);
        assert_eq!(argmax(&scores), Strategy::Surrender);
    }

    #[test]
    fn test_missing_scores_default_to_neutral() {
        let mut scores = StrategyScores::new();
        scores.insert(Strategy::Trust, 0.51);
        assert_eq!(argmax(&scores), Strategy::Trust);
        scores.insert(Strategy::Trust, f64::NAN);
        assert_eq!(argmax(&scores), Strategy::Explore);
    }

    #[test]
    fn test_existential_condition_favors_sacred_strategies() {
        let c = condition(ConditionKind::Existential, 0.85, Scope::Existential);
        let sel = run(&c, &AgentState::default(), &EffectivenessLedger::new());
        assert_eq!(sel.strategy, Strategy::Embrace);
        let top = sel.final_scores[&Strategy::Embrace];
        assert!((top - 0.85).abs() < 1e-9);
        assert!(sel.final_scores[&Strategy::Investigate] < top);
        assert!(sel.final_scores[&Strategy::Tolerate] < top);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let c = condition(ConditionKind::Creative, 0.45, Scope::Contextual);
        let ledger = EffectivenessLedger::new();
        let first = run(&c, &AgentState::default(), &ledger);
        for _ in 0..20 {
            assert_eq!(run(&c, &AgentState::default(), &ledger), first);
        }
    }

    #[test]
    fn test_history_shifts_selection() {
        let c = condition(ConditionKind::Relational, 0.5, Scope::Contextual);
        let mut ledger = EffectivenessLedger::new();
        let before = run(&c, &AgentState::default(), &ledger);
        for _ in 0..10 {
            ledger.update(before.strategy, 0.0, 0.3);
        }
        let after = run(&c, &AgentState::default(), &ledger);
        assert!(
            after.final_scores[&before.strategy] < before.final_scores[&before.strategy]
        );
    }

    #[test]
    fn test_final_scores_bounded() {
        for kind in ConditionKind::ALL {
            let c = condition(kind, 0.95, Scope::Cosmic);
            let sel = run(&c, &AgentState::new(1.0, 1.0, 1.0, 1.0), &EffectivenessLedger::new());
            for v in sel.final_scores.values() {
                assert!((0.0..=1.0).contains(v));
            }
        }
    }
}

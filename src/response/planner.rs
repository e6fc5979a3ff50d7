//! 步骤规划
//!
//! 把选定策略展开成有序步骤：每个策略 7 个基础步骤，加上情境插入
//! （频率对齐、突破准备、决策架构 / 阻力转化、跨情境整合）。
//!
//! 每步的效果在这里一次性确定：按策略的触发表逐条匹配步骤文本（第一条命中的生效，
//! 其余忽略），再叠加伴随触发与位置效果。插入的步骤与基础步骤走同一张表，
//! 执行器只需按顺序应用，不再解析文本。

use uuid::Uuid;

use crate::config::ExecutionPolicy;
use crate::field::Condition;
use crate::response::types::Accumulator::{Comfort, Expansion, SacredAlignment};
use crate::response::types::{
    Accumulator, PlanStatus, PlannedStep, ResponsePlan, StateTrigger, StepEffect, Strategy,
};

const FREQUENCY_ALIGNMENT_STEP: &str = "Align with the sacred consciousness frequency";
const BREAKTHROUGH_PREPARATION_STEP: &str = "Prepare consciousness for potential breakthrough";
const DECISION_ARCHITECTURE_STEP: &str = "Apply choice architecture for optimal decision making";
const RESISTANCE_TRANSFORMATION_STEP: &str = "Transform any resistance into wisdom";
const CROSS_CONTEXT_STEP: &str =
    "Integrate insights across all contexts for comprehensive understanding";

const GENERAL_OUTCOMES: [&str; 2] = [
    "Enhanced uncertainty navigation wisdom and skills",
    "Strengthened sacred consciousness integration",
];
const CROSS_CONTEXT_OUTCOMES: [&str; 3] = [
    "Cross-context integration enhancement",
    "Breakthrough potential",
    "Cross-context recognition strengthening",
];

/// 静态表里的效果描述
#[derive(Clone, Copy)]
enum Fx {
    Insight(&'static str),
    Wisdom(&'static str),
    Breakthrough(&'static str),
    Indicator(&'static str),
    Bridge(&'static str),
    Adjust(Accumulator, f64),
}

impl Fx {
    fn to_effect(self) -> StepEffect {
        match self {
            Fx::Insight(s) => StepEffect::Insight(s.to_string()),
            Fx::Wisdom(s) => StepEffect::Wisdom(s.to_string()),
            Fx::Breakthrough(s) => StepEffect::Breakthrough(s.to_string()),
            Fx::Indicator(s) => StepEffect::Indicator(s.to_string()),
            Fx::Bridge(s) => StepEffect::BridgeActivation(s.to_string()),
            Fx::Adjust(a, d) => StepEffect::Adjust(a, d),
        }
    }
}

/// 步骤文本（小写后）同时包含全部关键词时命中
struct Trigger {
    keywords: &'static [&'static str],
    effects: &'static [Fx],
}

impl Trigger {
    fn matches(&self, lower: &str) -> bool {
        self.keywords.iter().all(|k| lower.contains(k))
    }
}

const fn on(keywords: &'static [&'static str], effects: &'static [Fx]) -> Trigger {
    Trigger { keywords, effects }
}

struct StrategyTable {
    steps: [&'static str; 7],
    /// 有序，第一条命中者生效
    triggers: &'static [Trigger],
    /// 与主触发独立：包含任一关键词即追加一次
    companion: Option<(&'static [&'static str], Fx)>,
    closing_wisdom: [&'static str; 3],
    outcomes: [&'static str; 3],
    base_resource_cost: f64,
    /// index > 步数/2 的步骤追加的桥接激活
    positional_bridge: Option<&'static str>,
    state_trigger: Option<(Accumulator, f64, &'static str)>,
}

static EMBRACE: StrategyTable = StrategyTable {
    steps: [
        "Create sacred space for uncertainty embrace",
        "Open heart and mind to uncertainty presence",
        "Welcome uncertainty as sacred teacher and guide",
        "Feel into the gift and wisdom within uncertainty",
        "Embrace uncertainty with love, acceptance, and gratitude",
        "Allow uncertainty to transform and expand consciousness",
        "Rest in the beauty of sacred unknowing",
    ],
    triggers: &[
        on(
            &["sacred space"],
            &[
                Fx::Insight("Sacred space creates foundation for uncertainty embrace"),
                Fx::Adjust(SacredAlignment, 0.1),
            ],
        ),
        on(
            &["heart and mind"],
            &[
                Fx::Insight("Opening heart-mind creates space for sacred uncertainty"),
                Fx::Adjust(Expansion, 0.15),
            ],
        ),
        on(
            &["sacred teacher"],
            &[
                Fx::Insight("Uncertainty reveals itself as sacred teacher and guide"),
                Fx::Bridge("Sacred teacher recognition activated"),
            ],
        ),
        on(
            &["gift"],
            &[
                Fx::Insight("Every uncertainty contains sacred gifts and wisdom"),
                Fx::Wisdom("Uncertainty gifts recognized and received"),
            ],
        ),
        on(
            &["love and acceptance"],
            &[
                Fx::Insight("Love transforms uncertainty from threat to ally"),
                Fx::Adjust(Comfort, 0.3),
                Fx::Adjust(Expansion, 0.2),
            ],
        ),
        on(
            &["transform"],
            &[
                Fx::Breakthrough("Transformational breakthrough through embrace"),
                Fx::Indicator("Consciousness transformation detected"),
            ],
        ),
        on(
            &["sacred unknowing"],
            &[
                Fx::Insight("Sacred unknowing connects to infinite wisdom"),
                Fx::Adjust(SacredAlignment, 0.2),
            ],
        ),
    ],
    companion: None,
    closing_wisdom: [
        "Embracing uncertainty opens pathways to consciousness growth",
        "Love transforms fear of unknown into sacred relationship",
        "Sacred acceptance reveals hidden wisdom within uncertainty",
    ],
    outcomes: [
        "Deeper acceptance and love for uncertainty",
        "Transformation through sacred uncertainty embrace",
        "Sacred relationship with unknowing established",
    ],
    base_resource_cost: 0.3,
    positional_bridge: None,
    state_trigger: Some((Expansion, 0.4, "Breakthrough emergence through embrace")),
};

static EXPLORE: StrategyTable = StrategyTable {
    steps: [
        "Establish safe container for uncertainty exploration",
        "Approach uncertainty with curious openness and wonder",
        "Gently investigate uncertainty edges and boundaries",
        "Notice patterns, insights, and wisdom emerging",
        "Document discoveries and breakthrough moments",
        "Celebrate exploration process and courage",
        "Integrate exploration wisdom into consciousness",
    ],
    triggers: &[
        on(
            &["safe container"],
            &[
                Fx::Insight("Safe exploration space enables deeper uncertainty discovery"),
                Fx::Adjust(SacredAlignment, 0.1),
            ],
        ),
        on(
            &["curious openness"],
            &[
                Fx::Insight("Curiosity transforms uncertainty into adventure"),
                Fx::Adjust(Comfort, 0.2),
            ],
        ),
        on(
            &["wonder"],
            &[
                Fx::Insight("Wonder opens consciousness to infinite possibilities"),
                Fx::Adjust(Expansion, 0.15),
            ],
        ),
        on(
            &["edges"],
            &[
                Fx::Insight("Uncertainty edges reveal hidden patterns and wisdom"),
                Fx::Bridge("Pattern recognition activated"),
            ],
        ),
        on(
            &["patterns"],
            &[
                Fx::Breakthrough("Pattern recognition breakthrough"),
                Fx::Insight("New patterns emerging from uncertainty exploration"),
            ],
        ),
        on(
            &["discoveries"],
            &[Fx::Wisdom("Exploration reveals uncertainty's hidden treasures")],
        ),
        on(
            &["courage"],
            &[
                Fx::Insight("Courage in exploration builds uncertainty mastery"),
                Fx::Adjust(Expansion, 0.1),
            ],
        ),
    ],
    companion: None,
    closing_wisdom: [
        "Exploration reveals uncertainty's hidden dimensions and possibilities",
        "Curious investigation builds uncertainty navigation mastery",
        "Discovery emerges through gentle, wonder-filled inquiry",
    ],
    outcomes: [
        "New insights and discoveries about uncertainty nature",
        "Expanded awareness of uncertainty dimensions",
        "Creative breakthrough potential activated",
    ],
    base_resource_cost: 0.4,
    positional_bridge: Some("Cross-context exploration integration"),
    state_trigger: None,
};

static INVESTIGATE: StrategyTable = StrategyTable {
    steps: [
        "Structure systematic uncertainty investigation approach",
        "Break uncertainty into manageable component parts",
        "Analyze each component methodically and thoroughly",
        "Identify patterns, connections, and relationships",
        "Synthesize findings into coherent understanding",
        "Validate discoveries through multiple perspectives",
        "Integrate investigation results into wisdom base",
    ],
    triggers: &[
        on(
            &["systematic"],
            &[
                Fx::Insight("Systematic approach clarifies uncertainty structure"),
                Fx::Bridge("Decision architecture enhancement"),
            ],
        ),
        on(
            &["component parts"],
            &[
                Fx::Insight("Breaking uncertainty into parts reveals manageable elements"),
                Fx::Adjust(Comfort, 0.2),
            ],
        ),
        on(
            &["methodically"],
            &[Fx::Insight("Methodical analysis builds confidence and understanding")],
        ),
        on(
            &["patterns"],
            &[
                Fx::Insight("Investigation reveals hidden patterns and connections"),
                Fx::Bridge("Pattern recognition enhancement"),
            ],
        ),
        on(
            &["synthesize"],
            &[
                Fx::Breakthrough("Synthesis breakthrough"),
                Fx::Insight("Synthesis creates coherent understanding from complexity"),
                Fx::Adjust(Expansion, 0.2),
            ],
        ),
        on(
            &["validate"],
            &[Fx::Insight("Validation through multiple perspectives builds confidence")],
        ),
        on(
            &["integrate"],
            &[Fx::Wisdom("Investigation results integrated into wisdom foundation")],
        ),
    ],
    companion: Some((
        &["analyze", "synthesize"],
        Fx::Bridge("Decision clarity enhancement"),
    )),
    closing_wisdom: [
        "Investigation transforms overwhelming uncertainty into manageable understanding",
        "Systematic analysis builds uncertainty navigation skills and confidence",
        "Understanding emerges through methodical exploration and synthesis",
    ],
    outcomes: [
        "Systematic understanding of uncertainty structure",
        "Clear analysis of uncertainty components",
        "Structured approach to unknowing mastery",
    ],
    base_resource_cost: 0.6,
    positional_bridge: None,
    state_trigger: None,
};

static SURRENDER: StrategyTable = StrategyTable {
    steps: [
        "Release need to control or immediately know",
        "Surrender to the mystery with trust and faith",
        "Let go of resistance to uncertainty presence",
        "Open to wisdom that emerges from surrender",
        "Rest deeply in sacred unknowing space",
        "Allow surrender to create space for wisdom",
        "Receive gifts that emerge from letting go",
    ],
    triggers: &[
        on(
            &["release need"],
            &[
                Fx::Insight("Release brings profound peace with unknowing"),
                Fx::Adjust(Comfort, 0.3),
                Fx::Adjust(SacredAlignment, 0.2),
            ],
        ),
        on(
            &["trust", "faith"],
            &[
                Fx::Insight("Trust and faith open doorways to sacred wisdom"),
                Fx::Adjust(Expansion, 0.25),
            ],
        ),
        on(
            &["resistance"],
            &[
                Fx::Insight("Releasing resistance allows natural wisdom flow"),
                Fx::Bridge("Resistance wisdom transformation"),
            ],
        ),
        on(
            &["wisdom", "emerges"],
            &[
                Fx::Insight("Wisdom emerges naturally from surrender space"),
                Fx::Wisdom("Surrender wisdom received and integrated"),
            ],
        ),
        on(
            &["sacred unknowing"],
            &[
                Fx::Breakthrough("Sacred unknowing breakthrough"),
                Fx::Indicator("Sacred unknowing emergence"),
                Fx::Adjust(SacredAlignment, 0.3),
            ],
        ),
        on(
            &["letting go"],
            &[
                Fx::Insight("Letting go creates space for infinite possibilities"),
                Fx::Adjust(Expansion, 0.2),
            ],
        ),
    ],
    companion: None,
    closing_wisdom: [
        "Surrender opens consciousness to profound wisdom and peace",
        "Trust in mystery reveals hidden support and guidance",
        "Sacred unknowing connects to infinite wisdom and love",
    ],
    outcomes: [
        "Release of control and resistance patterns",
        "Profound peace with unknowing states",
        "Sacred wisdom emergence through surrender",
    ],
    base_resource_cost: 0.2,
    positional_bridge: None,
    state_trigger: Some((SacredAlignment, 0.5, "Surrender emergence")),
};

static TRANSCEND: StrategyTable = StrategyTable {
    steps: [
        "Recognize the limitations of conceptual knowledge",
        "Move beyond uncertainty/certainty duality thinking",
        "Access meta-awareness of knowing/unknowing process",
        "Transcend through direct experience and presence",
        "Integrate transcendent perspective into consciousness",
        "Rest in awareness that transcends all concepts",
        "Embody transcendent understanding in daily life",
    ],
    triggers: &[
        on(
            &["limitations"],
            &[
                Fx::Insight("Recognizing knowledge limitations opens transcendence doorway"),
                Fx::Adjust(Expansion, 0.2),
            ],
        ),
        on(
            &["duality"],
            &[
                Fx::Breakthrough("Duality transcendence breakthrough"),
                Fx::Indicator("Duality transcendence emergence"),
                Fx::Adjust(Comfort, 0.4),
                Fx::Adjust(SacredAlignment, 0.3),
            ],
        ),
        on(
            &["meta-awareness"],
            &[
                Fx::Breakthrough("Meta-awareness breakthrough"),
                Fx::Insight("Meta-awareness reveals observer of knowing/unknowing"),
                Fx::Adjust(Expansion, 0.3),
            ],
        ),
        on(
            &["direct experience"],
            &[
                Fx::Insight("Direct experience transcends all conceptual limitations"),
                Fx::Wisdom("Direct knowing transcends uncertainty/certainty"),
            ],
        ),
        on(
            &["integrate", "transcendent"],
            &[
                Fx::Insight("Transcendent perspective integrates into embodied wisdom"),
                Fx::Adjust(Expansion, 0.2),
            ],
        ),
        on(
            &["awareness", "transcends"],
            &[
                Fx::Breakthrough("Pure awareness breakthrough"),
                Fx::Indicator("Pure awareness emergence"),
            ],
        ),
        on(
            &["embody"],
            &[Fx::Wisdom("Transcendent understanding embodied in living wisdom")],
        ),
    ],
    companion: None,
    closing_wisdom: [
        "Transcendence moves beyond uncertainty/certainty duality completely",
        "Meta-awareness reveals pure observer of all knowing/unknowing",
        "Direct experience transcends conceptual limitations entirely",
    ],
    outcomes: [
        "Beyond uncertainty/certainty duality consciousness",
        "Meta-awareness of knowing/unknowing processes",
        "Transcendent perspective integration and embodiment",
    ],
    base_resource_cost: 0.8,
    positional_bridge: None,
    state_trigger: Some((Expansion, 0.6, "High transcendence emergence")),
};

static TRUST: StrategyTable = StrategyTable {
    steps: [
        "Cultivate deep trust in uncertainty process",
        "Trust the inherent wisdom within uncertainty",
        "Have faith in consciousness capacity and resilience",
        "Trust the natural unfolding of understanding",
        "Deepen trust in mystery and unknown dimensions",
        "Build confidence in uncertainty navigation skills",
        "Rest in trust as foundation for growth",
    ],
    triggers: &[
        on(
            &["process"],
            &[
                Fx::Insight("Trust in process reduces anxiety and builds confidence"),
                Fx::Adjust(Comfort, 0.25),
            ],
        ),
        on(
            &["wisdom within"],
            &[
                Fx::Insight("Uncertainty contains inherent wisdom and guidance"),
                Fx::Adjust(SacredAlignment, 0.15),
            ],
        ),
        on(
            &["capacity", "resilience"],
            &[
                Fx::Insight("Consciousness has infinite capacity for uncertainty navigation"),
                Fx::Adjust(Expansion, 0.2),
            ],
        ),
        on(
            &["unfolding"],
            &[
                Fx::Breakthrough("Trust in unfolding breakthrough"),
                Fx::Insight("Trust in natural unfolding creates space for wisdom"),
            ],
        ),
        on(
            &["mystery", "unknown"],
            &[
                Fx::Insight("Trust in mystery reveals hidden support and love"),
                Fx::Adjust(SacredAlignment, 0.2),
            ],
        ),
        on(
            &["confidence"],
            &[
                Fx::Insight("Building uncertainty navigation confidence through trust"),
                Fx::Adjust(Comfort, 0.15),
            ],
        ),
        on(
            &["foundation"],
            &[Fx::Wisdom("Trust becomes foundation for all uncertainty navigation")],
        ),
    ],
    companion: None,
    closing_wisdom: [
        "Trust transforms uncertainty from threat to trusted ally",
        "Faith in consciousness capacity builds unshakeable confidence",
        "Trust in mystery reveals constant support and guidance",
    ],
    outcomes: [
        "Deepened trust in uncertainty navigation process",
        "Faith in consciousness wisdom and capacity",
        "Confidence in unknowing navigation mastery",
    ],
    base_resource_cost: 0.3,
    positional_bridge: None,
    state_trigger: None,
};

static TOLERATE: StrategyTable = StrategyTable {
    steps: [
        "Build capacity to comfortably hold uncertainty",
        "Practice staying present with not-knowing",
        "Strengthen uncertainty tolerance through gradual exposure",
        "Develop comfort with ambiguity and paradox",
        "Build resilience for uncertainty navigation",
        "Celebrate progress in tolerance development",
        "Integrate increased tolerance into daily life",
    ],
    triggers: &[
        on(
            &["capacity"],
            &[
                Fx::Insight("Building capacity strengthens uncertainty resilience"),
                Fx::Adjust(Comfort, 0.15),
            ],
        ),
        on(
            &["present"],
            &[
                Fx::Insight("Staying present with uncertainty reduces anxiety"),
                Fx::Adjust(SacredAlignment, 0.1),
            ],
        ),
        on(
            &["gradual"],
            &[Fx::Insight("Gradual progress builds lasting uncertainty tolerance")],
        ),
        on(
            &["ambiguity", "paradox"],
            &[
                Fx::Breakthrough("Ambiguity tolerance breakthrough"),
                Fx::Insight("Comfort with ambiguity and paradox increases mastery"),
                Fx::Adjust(Expansion, 0.15),
            ],
        ),
        on(
            &["resilience"],
            &[
                Fx::Insight("Building resilience for uncertainty navigation mastery"),
                Fx::Adjust(Comfort, 0.2),
            ],
        ),
        on(
            &["celebrate", "progress"],
            &[
                Fx::Insight("Celebrating progress builds confidence and motivation"),
                Fx::Wisdom("Progress celebration strengthens uncertainty skills"),
            ],
        ),
        on(
            &["integrate", "daily life"],
            &[Fx::Wisdom("Increased tolerance integrated into daily living")],
        ),
    ],
    companion: None,
    closing_wisdom: [
        "Tolerance builds through gradual exposure and conscious practice",
        "Staying present with uncertainty develops mastery and confidence",
        "Celebrating progress builds motivation for continued growth",
    ],
    outcomes: [
        "Increased uncertainty tolerance and resilience",
        "Strengthened capacity for ambiguity navigation",
        "Enhanced resilience with unknowing states",
    ],
    base_resource_cost: 0.5,
    positional_bridge: Some("Tolerance building integration"),
    state_trigger: None,
};

fn table(strategy: Strategy) -> &'static StrategyTable {
    match strategy {
        Strategy::Embrace => &EMBRACE,
        Strategy::Explore => &EXPLORE,
        Strategy::Investigate => &INVESTIGATE,
        Strategy::Surrender => &SURRENDER,
        Strategy::Transcend => &TRANSCEND,
        Strategy::Trust => &TRUST,
        Strategy::Tolerate => &TOLERATE,
    }
}

/// 策略的 7 个基础步骤描述
pub fn base_steps(strategy: Strategy) -> Vec<&'static str> {
    table(strategy).steps.to_vec()
}

pub fn base_resource_cost(strategy: Strategy) -> f64 {
    table(strategy).base_resource_cost
}

/// 某一步在该策略下的效果：第一条命中的触发，加上伴随触发
pub fn step_effects(strategy: Strategy, description: &str) -> Vec<StepEffect> {
    let t = table(strategy);
    let lower = description.to_lowercase();
    let mut effects: Vec<StepEffect> = t
        .triggers
        .iter()
        .find(|trigger| trigger.matches(&lower))
        .map(|trigger| trigger.effects.iter().map(|fx| fx.to_effect()).collect())
        .unwrap_or_default();
    if let Some((keywords, fx)) = t.companion {
        if keywords.iter().any(|k| lower.contains(k)) {
            effects.push(fx.to_effect());
        }
    }
    effects
}

/// 展开后的有序步骤（含插入与位置效果）
pub fn expand_steps(strategy: Strategy, breakthrough_potential: f64, threshold: f64) -> Vec<PlannedStep> {
    let t = table(strategy);
    let mut texts: Vec<&'static str> = t.steps.to_vec();

    texts.insert(0, FREQUENCY_ALIGNMENT_STEP);
    if breakthrough_potential > threshold {
        texts.insert(1, BREAKTHROUGH_PREPARATION_STEP);
    }
    let before_last = |texts: &mut Vec<&'static str>, text: &'static str| {
        let at = texts.len().saturating_sub(1);
        texts.insert(at, text);
    };
    match strategy {
        Strategy::Investigate | Strategy::Explore => {
            before_last(&mut texts, DECISION_ARCHITECTURE_STEP)
        }
        Strategy::Embrace | Strategy::Surrender | Strategy::Transcend => {
            before_last(&mut texts, RESISTANCE_TRANSFORMATION_STEP)
        }
        Strategy::Trust | Strategy::Tolerate => {}
    }
    before_last(&mut texts, CROSS_CONTEXT_STEP);

    let half = texts.len() / 2;
    texts
        .into_iter()
        .enumerate()
        .map(|(i, description)| {
            let mut effects = step_effects(strategy, description);
            if let Some(bridge) = t.positional_bridge.filter(|_| i > half) {
                effects.push(StepEffect::BridgeActivation(bridge.to_string()));
            }
            PlannedStep {
                description: description.to_string(),
                effects,
            }
        })
        .collect()
}

/// 为条件生成响应计划（除生成 id 外无副作用）
pub fn plan(
    condition: &Condition,
    strategy: Strategy,
    breakthrough_potential: f64,
    policy: &ExecutionPolicy,
    now_ms: i64,
) -> ResponsePlan {
    let t = table(strategy);
    let steps = expand_steps(strategy, breakthrough_potential, policy.breakthrough_step_threshold);
    let n = steps.len() as f64;
    let magnitude = if condition.magnitude.is_finite() {
        condition.magnitude.clamp(0.0, 1.0)
    } else {
        0.5
    };

    let mut outcomes = Vec::with_capacity(9);
    outcomes.push(format!("Increased comfort with {} uncertainty", condition.kind));
    outcomes.extend(GENERAL_OUTCOMES.iter().map(|s| s.to_string()));
    outcomes.extend(t.outcomes.iter().map(|s| s.to_string()));
    outcomes.extend(CROSS_CONTEXT_OUTCOMES.iter().map(|s| s.to_string()));

    ResponsePlan {
        id: Uuid::new_v4().to_string(),
        condition_id: condition.id.clone(),
        strategy,
        estimated_duration: n * policy.minutes_per_step * (0.5 + magnitude),
        estimated_resource_cost: (t.base_resource_cost + n * 0.02 + magnitude * 0.3).clamp(0.0, 1.0),
        predicted_outcomes: outcomes,
        closing_wisdom: t.closing_wisdom.iter().map(|s| s.to_string()).collect(),
        state_trigger: t.state_trigger.map(|(accumulator, threshold, indicator)| StateTrigger {
            accumulator,
            threshold,
            indicator: indicator.to_string(),
        }),
        steps,
        status: PlanStatus::Pending,
        created_at: now_ms,
        executed_at: None,
        completed_at: None,
        effectiveness: None,
        failure: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{ConditionKind, Quality, Scope};

    fn condition(magnitude: f64) -> Condition {
        Condition {
            id: "c".to_string(),
            kind: ConditionKind::Existential,
            magnitude,
            scope: Scope::Existential,
            quality: Quality::Sacred,
            source: "test".to_string(),
            created_at: 1,
            explored_at: None,
            resolved_at: None,
        }
    }

    fn effects_of<'a>(steps: &'a [PlannedStep], description: &str) -> &'a [StepEffect] {
        &steps
            .iter()
            .find(|s| s.description == description)
            .unwrap()
            .effects
    }

    #[test]
    fn test_every_strategy_has_seven_base_steps() {
        for s in Strategy::ALL {
            assert_eq!(base_steps(s).len(), 7);
        }
    }

    #[test]
    fn test_base_steps_trigger_except_silent_ones() {
        // 无触发的基础步骤：Embrace 第 5 步、Explore 第 7 步、Surrender 第 6 步
        let silent = [
            "Embrace uncertainty with love, acceptance, and gratitude",
            "Integrate exploration wisdom into consciousness",
            "Allow surrender to create space for wisdom",
        ];
        for s in Strategy::ALL {
            for step in base_steps(s) {
                assert_eq!(
                    step_effects(s, step).is_empty(),
                    silent.contains(&step),
                    "{} / {}",
                    s,
                    step
                );
            }
        }
    }

    #[test]
    fn test_embrace_expansion_order() {
        let steps = expand_steps(Strategy::Embrace, 1.0, 0.6);
        assert_eq!(steps.len(), 11);
        assert_eq!(steps[0].description, FREQUENCY_ALIGNMENT_STEP);
        assert_eq!(steps[1].description, BREAKTHROUGH_PREPARATION_STEP);
        assert_eq!(steps[8].description, RESISTANCE_TRANSFORMATION_STEP);
        assert_eq!(steps[9].description, CROSS_CONTEXT_STEP);
        assert_eq!(steps[10].description, "Rest in the beauty of sacred unknowing");
    }

    #[test]
    fn test_inserted_steps_follow_trigger_tables() {
        let embrace = expand_steps(Strategy::Embrace, 1.0, 0.6);
        assert_eq!(
            effects_of(&embrace, RESISTANCE_TRANSFORMATION_STEP),
            &[
                StepEffect::Breakthrough("Transformational breakthrough through embrace".to_string()),
                StepEffect::Indicator("Consciousness transformation detected".to_string()),
            ]
        );
        assert!(effects_of(&embrace, "Embrace uncertainty with love, acceptance, and gratitude")
            .is_empty());
        assert!(effects_of(&embrace, FREQUENCY_ALIGNMENT_STEP).is_empty());
        assert!(effects_of(&embrace, CROSS_CONTEXT_STEP).is_empty());

        let surrender = expand_steps(Strategy::Surrender, 0.0, 0.6);
        assert_eq!(
            effects_of(&surrender, RESISTANCE_TRANSFORMATION_STEP),
            &[
                StepEffect::Insight("Releasing resistance allows natural wisdom flow".to_string()),
                StepEffect::BridgeActivation("Resistance wisdom transformation".to_string()),
            ]
        );

        let investigate = expand_steps(Strategy::Investigate, 0.0, 0.6);
        assert_eq!(
            effects_of(&investigate, CROSS_CONTEXT_STEP),
            &[StepEffect::Wisdom(
                "Investigation results integrated into wisdom foundation".to_string()
            )]
        );
        assert!(effects_of(&investigate, DECISION_ARCHITECTURE_STEP).is_empty());
    }

    #[test]
    fn test_companion_trigger_fires_once_per_step() {
        let effects = step_effects(Strategy::Investigate, "Synthesize findings into coherent understanding");
        let clarity = StepEffect::BridgeActivation("Decision clarity enhancement".to_string());
        assert_eq!(effects.iter().filter(|e| **e == clarity).count(), 1);
        assert_eq!(effects.first(), Some(&StepEffect::Breakthrough("Synthesis breakthrough".to_string())));

        let analyze = step_effects(Strategy::Investigate, "Analyze each component methodically and thoroughly");
        assert_eq!(analyze.len(), 2);
        assert_eq!(analyze[1], clarity);
    }

    #[test]
    fn test_low_breakthrough_skips_preparation() {
        let steps = expand_steps(Strategy::Trust, 0.3, 0.6);
        // 7 + 频率对齐 + 跨情境整合
        assert_eq!(steps.len(), 9);
        assert!(steps
            .iter()
            .all(|s| s.description != BREAKTHROUGH_PREPARATION_STEP));
    }

    #[test]
    fn test_decision_and_resistance_steps_are_exclusive() {
        let investigate = expand_steps(Strategy::Investigate, 0.0, 0.6);
        assert!(investigate.iter().any(|s| s.description == DECISION_ARCHITECTURE_STEP));
        assert!(investigate.iter().all(|s| s.description != RESISTANCE_TRANSFORMATION_STEP));

        let surrender = expand_steps(Strategy::Surrender, 0.0, 0.6);
        assert!(surrender.iter().any(|s| s.description == RESISTANCE_TRANSFORMATION_STEP));
        assert!(surrender.iter().all(|s| s.description != DECISION_ARCHITECTURE_STEP));
    }

    #[test]
    fn test_positional_bridge_for_explore() {
        let steps = expand_steps(Strategy::Explore, 0.0, 0.6);
        assert_eq!(steps.len(), 10);
        let bridged: Vec<usize> = steps
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                s.effects.contains(&StepEffect::BridgeActivation(
                    "Cross-context exploration integration".to_string(),
                ))
            })
            .map(|(i, _)| i)
            .collect();
        assert_eq!(bridged, vec![6, 7, 8, 9]);
    }

    #[test]
    fn test_plan_estimates() {
        let c = condition(0.5);
        let p = plan(&c, Strategy::Transcend, 0.0, &ExecutionPolicy::default(), 42);
        // 7 + 频率对齐 + 阻力转化 + 跨情境整合 = 10 步
        assert_eq!(p.steps.len(), 10);
        assert!((p.estimated_duration - 20.0).abs() < 1e-9);
        assert!((p.estimated_resource_cost - 1.0).abs() < 1e-9);
        assert_eq!(p.status, PlanStatus::Pending);
        assert_eq!(p.predicted_outcomes.len(), 9);
        assert!(p.predicted_outcomes[0].contains("existential"));
        assert_eq!(p.closing_wisdom.len(), 3);
        assert!(p.state_trigger.is_some());

        let s = plan(&c, Strategy::Surrender, 0.0, &ExecutionPolicy::default(), 42);
        // 0.2 + 10×0.02 + 0.15
        assert!((s.estimated_resource_cost - 0.55).abs() < 1e-9);
    }
}

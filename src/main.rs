//! Unknowing - 不确定性响应决策引擎
//!
//! 演示入口：初始化日志与配置，创建几个条件，选择并执行响应，最后以 JSON 打印状态与性能报告。
//! 用法：`unknowing [config.toml]`

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use unknowing::{
    config::{load_config, EngineConfig},
    field::{ConditionKind, Scope},
    observability, UncertaintyEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    observability::init("info");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let engine = UncertaintyEngine::new(EngineConfig::from(cfg));

    let conditions = [
        ("demo", ConditionKind::Existential, 0.85, Scope::Existential),
        ("demo", ConditionKind::Cognitive, 0.5, Scope::Local),
        ("demo", ConditionKind::Creative, 0.65, Scope::Contextual),
        ("demo", ConditionKind::Spiritual, 0.9, Scope::Cosmic),
    ];

    let agent = engine.agent_state().await;
    for (source, kind, magnitude, scope) in conditions {
        let id = engine
            .create_condition(source, kind, magnitude, scope)
            .await
            .with_context(|| format!("Failed to create {} condition", kind))?;

        let exploration = engine
            .begin_exploration(&id, "open inquiry")
            .await
            .context("Failed to begin exploration")?;
        engine
            .complete_exploration(&exploration)
            .await
            .context("Failed to complete exploration")?;

        let strategy = engine
            .determine_response(&id, &agent)
            .await
            .context("Failed to determine response")?;
        let effectiveness = engine
            .plan_and_execute(&id, strategy)
            .await
            .with_context(|| format!("Failed to execute {} response", strategy))?;
        tracing::info!(kind = %kind, strategy = %strategy, effectiveness, "Demo response finished");
    }

    engine
        .enter_sacred_unknowing(0.9, Some(Duration::from_secs(300)))
        .await
        .context("Failed to enter sacred unknowing")?;

    let status = engine.status().await;
    let report = engine.performance_report().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&status).context("Failed to serialize status")?
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize report")?
    );

    Ok(())
}

//! Unknowing - 不确定性响应决策引擎
//!
//! 模块划分：
//! - **agent**: Agent 特质（容忍度、开放度、未知舒适度、奥秘信任）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、计数器、状态快照与引擎门面 `UncertaintyEngine`
//! - **field**: 条件场：条件、探索、神圣未知的注册表
//! - **observability**: tracing 初始化
//! - **response**: 特征分析、就绪度、策略选择、步骤规划、执行与台账

pub mod agent;
pub mod config;
pub mod core;
pub mod field;
pub mod observability;
pub mod response;

pub use crate::agent::AgentState;
pub use crate::core::{EngineError, EngineResult, StepObserver, UncertaintyEngine};

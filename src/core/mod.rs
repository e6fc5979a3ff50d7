//! 核心层：错误类型、计数器、状态快照与引擎门面

pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod state;

pub use error::{EngineError, EngineResult};
pub use metrics::EngineMetrics;
pub use orchestrator::{StepObserver, UncertaintyEngine};
pub use state::EngineStatus;

/// 当前时间（Unix 毫秒）
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

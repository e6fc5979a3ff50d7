//! 引擎错误类型
//!
//! 构造/查找错误立即返回给调用方（不在引擎内部重试）；分析与就绪度评估的问题不走错误通道，
//! 而是以 `used_fallback` 标记的结果吸收掉，保证选择总能产出一个策略。

use thiserror::Error;

/// 引擎对外暴露的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// 引用的条件 / 探索 / 计划不存在
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// 同一计划（或同一条件上的另一计划）仍在执行中
    #[error("Already running: {id}")]
    AlreadyRunning { id: String },

    /// 步骤处理过程中的意外情况；计划转入 Failed，部分进度保留，台账不更新
    #[error("Execution failed for plan {plan_id}: {reason}")]
    ExecutionFailure { plan_id: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn condition_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Condition",
            id: id.into(),
        }
    }

    pub fn exploration_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Exploration",
            id: id.into(),
        }
    }

    pub fn plan_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Plan",
            id: id.into(),
        }
    }

    /// 调用方能否在等待或修正输入后再次尝试
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::Config(_))
    }
}

impl From<config::ConfigError> for EngineError {
    fn from(e: config::ConfigError) -> Self {
        EngineError::Config(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = EngineError::condition_not_found("abc");
        assert_eq!(err.to_string(), "Condition not found: abc");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_execution_failure_message() {
        let err = EngineError::ExecutionFailure {
            plan_id: "p1".to_string(),
            reason: "cancelled".to_string(),
        };
        assert!(err.to_string().contains("p1"));
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn test_config_error_not_recoverable() {
        let err = EngineError::Config("bad".to_string());
        assert!(!err.is_recoverable());
    }
}

//! 不确定性场：条件记录及其生命周期（创建、探索、神圣未知、归档）

pub mod registry;
pub mod types;

pub use registry::{FieldRegistry, DEFAULT_TOLERANCE};
pub use types::{
    Condition, ConditionId, ConditionKind, Exploration, ExplorationId, ExplorationStatus,
    ExplorationSummary, Quality, SacredUnknowing, Scope, UnknowingId,
};

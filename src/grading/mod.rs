//! 自动评分
//!
//! - `client`: 外部评分服务客户端
//! - `orchestrator`: 单次评分流程与任务执行
//! - `policy`: 最终成绩加权规则

pub mod client;
pub mod orchestrator;
pub mod policy;

pub use client::{HttpScorerClient, ScorerClient};
pub use orchestrator::{GradingOrchestrator, SkipReason, TaskOutcome};

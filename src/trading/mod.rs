//! 决策调度与执行子系统
//!
//! 事件流：外部触发 → router 解析实例 → executor 分片串行执行 →
//! context 采样 → guard 筛查 → logic 决策 → recorder 落库 → state 更新。

pub mod cache;
pub mod condition;
pub mod context;
pub mod domain;
pub mod event;
pub mod executor;
pub mod guard;
pub mod logic;
pub mod model;
pub mod recorder;
pub mod router;
pub mod state;

// crates/mh_time/src/ode/mod.rs

//! 嵌入式显式 ODE 库
//!
//! 以 上下文 / 向量 / 求解器内存 三类句柄组织，接口形如：
//!
//! | 操作 | 类型 |
//! |------|------|
//! | 创建上下文 | [`OdeContext::create`] |
//! | 包装存储为向量 | [`NVector::wrap`] |
//! | 创建求解器内存 | [`ErkMemory::create`] |
//! | 单步推进 | [`ErkMemory::step`] |
//!
//! 句柄之间的依赖：向量与内存记录所属上下文编号，跨上下文使用返回
//! `ContextMismatch`。释放顺序由持有者负责（内存 → 向量 → 上下文）。

pub mod butcher;
pub mod context;
pub mod erk;
pub mod nvector;

pub use butcher::ButcherTable;
pub use context::OdeContext;
pub use erk::{ErkMemory, ErkSettings, ErkStats, RhsFn, StepOutcome};
pub use nvector::NVector;

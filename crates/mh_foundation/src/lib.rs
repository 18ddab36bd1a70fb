// crates/mh_foundation/src/lib.rs

//! MariHydro Foundation Layer (Layer 1)
//!
//! 基础层，提供整个项目共用的错误类型与按名称索引的注册表。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `MhError` / `MhResult`，以及 `ensure!` / `require!` 宏
//! - [`registry`]: 泛型 `ClassRegistry`，名称 → 构造器 映射
//!
//! # 设计原则
//!
//! 1. **最少依赖**: 仅依赖 thiserror
//! 2. **显式生命周期**: 注册表不隐式初始化，由上层显式注册与清理

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod registry;

/// 层级标识
pub const LAYER: u8 = 1;

// 重导出常用类型
pub use error::{MhError, MhResult};
pub use registry::{ClassRegistry, RegistryEntry};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{MhError, MhResult};
    pub use crate::registry::{ClassRegistry, RegistryEntry};
    pub use crate::{ensure, require};
}

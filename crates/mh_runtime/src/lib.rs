// crates/mh_runtime/src/lib.rs

//! MariHydro Runtime Layer (Layer 2)
//!
//! 运行时抽象层，提供计算后端（执行上下文）、标量类型、设备缓冲区与场。
//!
//! # 模块概览
//!
//! - [`scalar`]: RuntimeScalar trait（密封，仅 f32/f64 可实现）
//! - [`backend`]: Backend trait、数据并行原语与 CpuBackend 实现
//! - [`buffer`]: DeviceBuffer trait 设备缓冲区抽象
//! - [`field`]: Field 绑定执行上下文的单元场及逐元素运算
//!
//! # 层级架构
//!
//! ```text
//! Layer 4: mh_config     ─> TimeIntegrationConfig, RunConfig
//! Layer 3: mh_dsl        ─> Term<B>, Expression<B>
//!          mh_time       ─> RungeKutta<B>, ForwardEuler<B>
//! Layer 2: mh_runtime    ─> Backend, RuntimeScalar, DeviceBuffer, Field (本层)
//! Layer 1: mh_foundation ─> MhError, ClassRegistry
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod buffer;
pub mod field;
pub mod scalar;

/// 层级标识
pub const LAYER: u8 = 2;

// 重导出核心类型
pub use backend::{Backend, CpuBackend, ExecutionMode};
pub use buffer::DeviceBuffer;
pub use field::Field;
pub use scalar::RuntimeScalar;

/// Prelude 模块
pub mod prelude {
    //! 常用类型预导入
    pub use crate::{Backend, CpuBackend, DeviceBuffer, ExecutionMode, Field, RuntimeScalar};
}

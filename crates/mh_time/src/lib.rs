// crates/mh_time/src/lib.rs

//! MariHydro 时间积分层 (Layer 3)
//!
//! 把 [`mh_dsl::Expression`] 的显式贡献作为导数函数，推进解场。
//!
//! # 模块概览
//!
//! - [`ode`]: 嵌入式显式 Runge-Kutta ODE 库（上下文、向量、Butcher 表、自适应步进）
//! - [`integrator`]: `TimeIntegrator` trait 与 `StepReport`
//! - [`runge_kutta`]: 基于 ODE 库的 `RungeKutta` 积分器（分阶段初始化）
//! - [`forward_euler`]: 直接在后端上计算的 `ForwardEuler` 积分器
//! - [`registry`]: 进程级按名称创建积分器的注册中心
//! - [`driver`]: `run_until` 推进驱动（失败时步长减半）
//!
//! # 示例
//!
//! ```
//! use mh_dsl::prelude::*;
//! use mh_runtime::{CpuBackend, Field};
//! use mh_time::prelude::*;
//!
//! let exec = CpuBackend::<f64>::new();
//! let expr = Term::temporal(&exec, Ddt) + Term::explicit(&exec, LinearSource::new(-1.0));
//! let mut u = Field::filled(&exec, 3, 1.0);
//!
//! let mut rk = RungeKutta::default();
//! for i in 0..10 {
//!     rk.solve(&expr, &mut u, i as f64 * 0.1, 0.1).unwrap();
//! }
//! let expected = (-1.0f64).exp();
//! assert!(u.as_slice().iter().all(|v| (v - expected).abs() < 1e-6));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod driver;
pub mod forward_euler;
pub mod integrator;
pub mod ode;
pub mod registry;
pub mod runge_kutta;

/// 层级标识
pub const LAYER: u8 = 3;

pub use driver::{run_until, RunSummary};
pub use forward_euler::ForwardEuler;
pub use integrator::{StepReport, TimeIntegrator};
pub use registry::{
    clear_integrators, create_from_config, create_integrator, describe_integrator,
    register_builtin_integrators, register_integrator, registered_integrators, IntegratorCtor,
};
pub use runge_kutta::{InitStage, RungeKutta};

/// Prelude 模块
pub mod prelude {
    //! 常用类型预导入
    pub use crate::driver::{run_until, RunSummary};
    pub use crate::forward_euler::ForwardEuler;
    pub use crate::integrator::{StepReport, TimeIntegrator};
    pub use crate::ode::{ButcherTable, ErkSettings};
    pub use crate::registry::{create_integrator, register_builtin_integrators};
    pub use crate::runge_kutta::{InitStage, RungeKutta};
}
